use crate::context::{
    BASE_CONTEXTS, BR_CONTEXTS, COEFF_BASE_RANGE, CoeffContexts, DC_SIGN_CONTEXTS,
    EOB_FLAG_CONTEXTS, EOB_TOKENS, GOLOMB_START, NUM_BASE_LEVELS, NZ_MAP_CONTEXTS,
    TXB_SKIP_CONTEXTS, eob_context, eob_offset_bits, eob_pos_token,
};

pub const PROB_COST_SHIFT: u32 = 9;

/// Cost of one equiprobable bit.
pub const BIT_COST: i32 = 1 << PROB_COST_SHIFT;

const PROB_BITS: u32 = 15;
const PROB_ONE: u32 = 1 << PROB_BITS;

#[inline]
pub const fn literal_cost(bits: u32) -> i32 {
    bits as i32 * BIT_COST
}

/// Cost of the Exp-Golomb remainder for a magnitude past the bitplane range.
pub fn golomb_cost(abs: u32) -> i32 {
    if abs < GOLOMB_START {
        return 0;
    }
    let r = abs - COEFF_BASE_RANGE as u32 - NUM_BASE_LEVELS as u32;
    let len = 32 - r.leading_zeros();
    literal_cost(2 * len - 1)
}

/// Costs of coding `false` / `true` when `p_zero` (15-bit) is the probability of `false`.
pub fn bool_cost(p_zero: u16) -> [i32; 2] {
    let p0 = (p_zero as u32).clamp(1, PROB_ONE - 1);
    [symbol_cost(p0), symbol_cost(PROB_ONE - p0)]
}

fn symbol_cost(p: u32) -> i32 {
    let bits = PROB_BITS as f64 - (p as f64).log2();
    (bits * BIT_COST as f64).round() as i32
}

/// Context-indexed coefficient costs for one optimization pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoeffCostTables {
    pub txb_skip: [[i32; 2]; TXB_SKIP_CONTEXTS],
    pub nz_map: [[i32; 2]; NZ_MAP_CONTEXTS],
    pub base: [[[i32; 2]; BASE_CONTEXTS]; NUM_BASE_LEVELS],
    pub lps: [[i32; COEFF_BASE_RANGE + 1]; BR_CONTEXTS],
    pub dc_sign: [[i32; 2]; DC_SIGN_CONTEXTS],
    pub eob_flag: [[i32; 2]; EOB_FLAG_CONTEXTS],
    pub eob_extra: [[i32; 2]; EOB_TOKENS],
}

impl CoeffCostTables {
    /// Every entry set to `cost`.
    pub fn flat(cost: i32) -> Self {
        Self {
            txb_skip: [[cost; 2]; TXB_SKIP_CONTEXTS],
            nz_map: [[cost; 2]; NZ_MAP_CONTEXTS],
            base: [[[cost; 2]; BASE_CONTEXTS]; NUM_BASE_LEVELS],
            lps: [[cost; COEFF_BASE_RANGE + 1]; BR_CONTEXTS],
            dc_sign: [[cost; 2]; DC_SIGN_CONTEXTS],
            eob_flag: [[cost; 2]; EOB_FLAG_CONTEXTS],
            eob_extra: [[cost; 2]; EOB_TOKENS],
        }
    }

    /// Fills every entry from `entry`, table by table in declaration order.
    pub fn from_fn(mut entry: impl FnMut() -> i32) -> Self {
        let mut t = Self::flat(0);
        let tables: [&mut [i32]; 7] = [
            t.txb_skip.as_flattened_mut(),
            t.nz_map.as_flattened_mut(),
            t.base.as_flattened_mut().as_flattened_mut(),
            t.lps.as_flattened_mut(),
            t.dc_sign.as_flattened_mut(),
            t.eob_flag.as_flattened_mut(),
            t.eob_extra.as_flattened_mut(),
        ];
        for table in tables {
            table.iter_mut().for_each(|c| *c = entry());
        }
        t
    }

    /// Binary decisions from a probability of `false`; bitplane symbols cost
    /// one decision per step with the final step implied.
    pub fn from_probability(p_zero: u16) -> Self {
        let b = bool_cost(p_zero);
        let mut lps = [0i32; COEFF_BASE_RANGE + 1];
        for (k, entry) in lps.iter_mut().enumerate() {
            let steps = k as i32;
            *entry = steps * b[1] + if k < COEFF_BASE_RANGE { b[0] } else { 0 };
        }
        Self {
            txb_skip: [b; TXB_SKIP_CONTEXTS],
            nz_map: [b; NZ_MAP_CONTEXTS],
            base: [[b; BASE_CONTEXTS]; NUM_BASE_LEVELS],
            lps: [lps; BR_CONTEXTS],
            dc_sign: [b; DC_SIGN_CONTEXTS],
            eob_flag: [b; EOB_FLAG_CONTEXTS],
            eob_extra: [b; EOB_TOKENS],
        }
    }

    #[inline]
    pub fn skip_cost(&self, txb_skip_ctx: usize, skip: bool) -> i32 {
        self.txb_skip[txb_skip_ctx][skip as usize]
    }

    /// Rate of signaling `eob` in a block whose largest EOB is `max_eob`.
    pub fn eob_cost(&self, eob: usize, max_eob: usize) -> i32 {
        if eob == 0 {
            return 0;
        }
        let (token, offset) = eob_pos_token(eob);
        let (max_token, _) = eob_pos_token(max_eob);
        let mut cost = 0;
        for i in 1..max_token {
            cost += self.eob_flag[eob_context(i)][(token == i) as usize];
            if token == i {
                break;
            }
        }
        let bits = eob_offset_bits(token);
        if bits > 0 {
            let hi = (offset >> (bits - 1)) & 1;
            cost += self.eob_extra[token][hi] + literal_cost(bits - 1);
        }
        cost
    }

    /// Sign of a nonzero level; only the DC sign is context coded.
    #[inline]
    pub fn sign_cost(&self, level: i32, pos: usize, dc_sign_ctx: usize) -> i32 {
        if pos == 0 {
            self.dc_sign[dc_sign_ctx][(level < 0) as usize]
        } else {
            BIT_COST
        }
    }

    #[inline]
    pub fn base_cost(&self, abs: u32, base_idx: usize, ctx: usize) -> i32 {
        debug_assert!(abs > base_idx as u32);
        self.base[base_idx][ctx][(abs == base_idx as u32 + 1) as usize]
    }

    /// Bitplane symbol plus Golomb tail for `abs > NUM_BASE_LEVELS`.
    #[inline]
    pub fn br_cost(&self, abs: u32, ctx: usize) -> i32 {
        let k = (abs as usize - NUM_BASE_LEVELS - 1).min(COEFF_BASE_RANGE);
        self.lps[ctx][k] + golomb_cost(abs)
    }

    /// Full rate of `level` at raster `pos`; the significance flag is charged
    /// only when `nz_coded` (every coded position but the last).
    pub fn coeff_cost(
        &self,
        level: i32,
        pos: usize,
        ctxs: &CoeffContexts,
        nz_coded: bool,
        dc_sign_ctx: usize,
    ) -> i32 {
        let mut cost = 0;
        if nz_coded {
            cost += self.nz_map[ctxs.nz][(level != 0) as usize];
        }
        if level == 0 {
            return cost;
        }
        let abs = level.unsigned_abs();
        cost += self.sign_cost(level, pos, dc_sign_ctx);
        for k in 0..NUM_BASE_LEVELS {
            if abs > k as u32 {
                cost += self.base_cost(abs, k, ctxs.base[k]);
            }
        }
        if abs > NUM_BASE_LEVELS as u32 {
            cost += self.br_cost(abs, ctxs.br);
        }
        cost
    }
}
