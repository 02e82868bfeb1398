//! Rate deltas of lowering one coefficient by a quantization step.
//!
//! Every `try_*` function is a what-if over the current view and cache and
//! leaves both untouched; [`commit_level_down`] applies an evaluated trial.

use tracing::trace;

use crate::cache::{TxbCache, dependents};
use crate::context::{
    BASE_REF_OFFSETS, BR_REF_OFFSETS, COEFF_BASE_RANGE, FAST_LEVEL_NEIGHBORS, FAST_SIG_NEIGHBORS,
    GOLOMB_START, NUM_BASE_LEVELS, RefOffset, SIG_REF_OFFSETS, base_ctx_from_count_mag,
    br_ctx_from_count_mag, is_causal, nz_ctx_from_count,
};
use crate::cost::{CoeffCostTables, golomb_cost};
use crate::rdo::rd_cost;
use crate::view::TxbView;

const BR_FIRST: u32 = NUM_BASE_LEVELS as u32 + 1;

/// Neighbor search breadth for level-down trials.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    #[default]
    Full,
    /// Only the nearest template neighbors are re-costed.
    Fast,
}

impl SearchMode {
    fn sig_offsets(self) -> &'static [RefOffset] {
        match self {
            SearchMode::Full => &SIG_REF_OFFSETS,
            SearchMode::Fast => &SIG_REF_OFFSETS[..FAST_SIG_NEIGHBORS],
        }
    }

    fn base_offsets(self) -> &'static [RefOffset] {
        match self {
            SearchMode::Full => &BASE_REF_OFFSETS,
            SearchMode::Fast => &BASE_REF_OFFSETS[..FAST_LEVEL_NEIGHBORS],
        }
    }

    fn br_offsets(self) -> &'static [RefOffset] {
        match self {
            SearchMode::Full => &BR_REF_OFFSETS,
            SearchMode::Fast => &BR_REF_OFFSETS[..FAST_LEVEL_NEIGHBORS],
        }
    }
}

/// Rate side of a level-down trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDown {
    pub low_qc: i32,
    /// Set when the trial also moves the EOB.
    pub new_eob: Option<usize>,
    pub cost_diff: i64,
}

/// A fully evaluated trial: rate, distortion and the RD verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelDownStats {
    pub low_qc: i32,
    pub new_eob: Option<usize>,
    pub cost_diff: i64,
    pub dist_diff: i64,
    pub rd_diff: i64,
    pub update: bool,
}

/// One quantization step toward zero.
#[inline]
pub fn lower_level(level: i32) -> i32 {
    level - level.signum()
}

/// Lowering from `abs` changes significance counts.
#[inline]
pub fn affects_nz(abs: u32) -> bool {
    abs == 1
}

/// Lowering from `abs` can change a base-level count or magnitude flag.
#[inline]
pub fn affects_base(abs: u32) -> bool {
    (1..=BR_FIRST).contains(&abs)
}

/// Lowering from `abs` can change a bitplane count or magnitude flag.
#[inline]
pub fn affects_br(abs: u32) -> bool {
    abs == BR_FIRST || abs == BR_FIRST + 1
}

/// Rate of `level` at scan position `si`, contexts from the cache.
pub fn cached_coeff_cost(
    view: &TxbView<'_>,
    cache: &TxbCache,
    tables: &CoeffCostTables,
    si: usize,
    level: i32,
) -> i32 {
    let pos = view.scan().pos(si);
    tables.coeff_cost(
        level,
        pos,
        &cache.contexts(pos),
        si + 1 < view.eob(),
        view.txb_ctx().dc_sign_ctx,
    )
}

/// Own rate change of lowering the level at `pos`, EOB unchanged.
pub fn try_self_level_down(
    view: &TxbView<'_>,
    cache: &TxbCache,
    tables: &CoeffCostTables,
    pos: usize,
) -> i64 {
    let level = view.level(pos);
    assert!(level != 0, "level down of a zero coefficient at {pos}");
    let abs = level.unsigned_abs();
    let diff = match abs {
        1 => {
            let mut d = -tables.base_cost(1, 0, cache.base_ctx(pos, 0))
                - tables.sign_cost(level, pos, view.txb_ctx().dc_sign_ctx);
            if !view.is_last(view.scan().scan_idx(pos)) {
                let nz = &tables.nz_map[cache.nz_ctx(pos)];
                d += nz[0] - nz[1];
            }
            d
        }
        2 => {
            let ctx0 = cache.base_ctx(pos, 0);
            tables.base_cost(1, 0, ctx0)
                - tables.base_cost(2, 0, ctx0)
                - tables.base_cost(2, 1, cache.base_ctx(pos, 1))
        }
        BR_FIRST => {
            let ctx1 = cache.base_ctx(pos, 1);
            tables.base_cost(2, 1, ctx1)
                - tables.base_cost(3, 1, ctx1)
                - tables.lps[cache.br_ctx(pos)][0]
        }
        _ => {
            let lps = &tables.lps[cache.br_ctx(pos)];
            if abs < GOLOMB_START {
                let k = (abs - BR_FIRST) as usize;
                lps[k - 1] - lps[k]
            } else if abs == GOLOMB_START {
                lps[COEFF_BASE_RANGE - 1] - lps[COEFF_BASE_RANGE] - golomb_cost(abs)
            } else {
                golomb_cost(abs - 1) - golomb_cost(abs)
            }
        }
    };
    diff as i64
}

/// Significance-flag change at `nb` when the level-1 coefficient it
/// references drops to zero. Zero unless `nb` codes that flag under `eob`.
pub fn try_neighbor_level_down_nz(
    view: &TxbView<'_>,
    cache: &TxbCache,
    tables: &CoeffCostTables,
    nb: usize,
    eob: usize,
) -> i64 {
    if view.scan().scan_idx(nb) + 1 >= eob {
        return 0;
    }
    let (row, col) = view.tx_size().row_col(nb);
    let count = cache.stats(nb).nz_count;
    assert!(count > 0, "nz count underflow at {nb}");
    let is_nz = (view.level(nb) != 0) as usize;
    let new_ctx = nz_ctx_from_count(row, col, count - 1);
    (tables.nz_map[new_ctx][is_nz] - tables.nz_map[cache.nz_ctx(nb)][is_nz]) as i64
}

/// Base-level change at `nb` when its template neighbor at offset `off`
/// drops from `trigger_abs`.
pub fn try_neighbor_level_down_base(
    view: &TxbView<'_>,
    cache: &TxbCache,
    tables: &CoeffCostTables,
    nb: usize,
    off: RefOffset,
    trigger_abs: u32,
    eob: usize,
) -> i64 {
    let nb_abs = view.abs_level(nb);
    if nb_abs == 0 || view.scan().scan_idx(nb) >= eob {
        return 0;
    }
    let s = cache.stats(nb);
    let (row, col) = view.tx_size().row_col(nb);
    let max = lowered_max(s.base_mag.max, s.base_mag.ties, off, trigger_abs);
    let mut diff = 0;
    for k in 0..NUM_BASE_LEVELS {
        if nb_abs <= k as u32 {
            break;
        }
        let mut count = s.base_count[k];
        if trigger_abs == k as u32 + 1 {
            assert!(count > 0, "base count underflow at {nb}");
            count -= 1;
        }
        let new_ctx = base_ctx_from_count_mag(row, col, count, max, k);
        diff += tables.base_cost(nb_abs, k, new_ctx) - tables.base_cost(nb_abs, k, cache.base_ctx(nb, k));
    }
    diff as i64
}

/// Bitplane change at `nb` when its template neighbor drops from `trigger_abs`.
pub fn try_neighbor_level_down_br(
    view: &TxbView<'_>,
    cache: &TxbCache,
    tables: &CoeffCostTables,
    nb: usize,
    off: RefOffset,
    trigger_abs: u32,
    eob: usize,
) -> i64 {
    let nb_abs = view.abs_level(nb);
    if nb_abs < BR_FIRST || view.scan().scan_idx(nb) >= eob {
        return 0;
    }
    let s = cache.stats(nb);
    let (row, col) = view.tx_size().row_col(nb);
    let max = lowered_max(s.br_mag.max, s.br_mag.ties, off, trigger_abs);
    let mut count = s.br_count;
    if trigger_abs == BR_FIRST {
        assert!(count > 0, "br count underflow at {nb}");
        count -= 1;
    }
    let new_ctx = br_ctx_from_count_mag(row, col, count, max);
    let k = ((nb_abs - BR_FIRST) as usize).min(COEFF_BASE_RANGE);
    (tables.lps[new_ctx][k] - tables.lps[cache.br_ctx(nb)][k]) as i64
}

/// Causal max after its unique holder drops one step; the runner-up can be
/// at most that lowered value.
fn lowered_max(max: u32, ties: u8, off: RefOffset, trigger_abs: u32) -> u32 {
    if is_causal(off) && trigger_abs == max && ties == 1 {
        max - 1
    } else {
        max
    }
}

/// Rate change of every neighbor whose context reads `pos`, with `eob` as
/// the EOB in effect after the trial.
pub fn neighbor_level_down_diff(
    view: &TxbView<'_>,
    cache: &TxbCache,
    tables: &CoeffCostTables,
    pos: usize,
    eob: usize,
    mode: SearchMode,
) -> i64 {
    let abs = view.abs_level(pos);
    let tx_size = view.tx_size();
    let mut diff = 0;
    if affects_nz(abs) {
        for (nb, _) in dependents(tx_size, pos, mode.sig_offsets()) {
            diff += try_neighbor_level_down_nz(view, cache, tables, nb, eob);
        }
    }
    if affects_base(abs) {
        for (nb, off) in dependents(tx_size, pos, mode.base_offsets()) {
            diff += try_neighbor_level_down_base(view, cache, tables, nb, off, abs, eob);
        }
    }
    if affects_br(abs) {
        for (nb, off) in dependents(tx_size, pos, mode.br_offsets()) {
            diff += try_neighbor_level_down_br(view, cache, tables, nb, off, abs, eob);
        }
    }
    diff
}

/// Rate change of lowering `pos`, moving the EOB when `pos` is the last
/// coefficient and drops to zero.
pub fn try_level_down(
    view: &TxbView<'_>,
    cache: &TxbCache,
    tables: &CoeffCostTables,
    pos: usize,
    mode: SearchMode,
) -> LevelDown {
    let level = view.level(pos);
    assert!(level != 0, "level down of a zero coefficient at {pos}");
    if level.unsigned_abs() == 1 && view.is_last(view.scan().scan_idx(pos)) {
        return try_change_eob(view, cache, tables, pos, mode);
    }
    let cost_diff = try_self_level_down(view, cache, tables, pos)
        + neighbor_level_down_diff(view, cache, tables, pos, view.eob(), mode);
    LevelDown {
        low_qc: lower_level(level),
        new_eob: None,
        cost_diff,
    }
}

/// Rate change of dropping the last coefficient (magnitude 1) and pulling
/// the EOB back to the previous nonzero one, or to an empty block.
pub fn try_change_eob(
    view: &TxbView<'_>,
    cache: &TxbCache,
    tables: &CoeffCostTables,
    pos: usize,
    mode: SearchMode,
) -> LevelDown {
    let level = view.level(pos);
    let scan = view.scan();
    let si = scan.scan_idx(pos);
    assert!(
        level.unsigned_abs() == 1 && view.is_last(si),
        "eob change from {level} at scan {si}, eob {}",
        view.eob()
    );
    let txb_ctx = view.txb_ctx();
    let old_eob = view.eob();

    let mut cost_diff = -(tables.base_cost(1, 0, cache.base_ctx(pos, 0))
        + tables.sign_cost(level, pos, txb_ctx.dc_sign_ctx)) as i64;

    let mut new_eob = 0;
    for j in (0..si).rev() {
        let p = scan.pos(j);
        if view.level(p) != 0 {
            new_eob = j + 1;
            break;
        }
        cost_diff -= tables.nz_map[cache.nz_ctx(p)][0] as i64;
    }
    if new_eob > 0 {
        let last = scan.pos(new_eob - 1);
        cost_diff -= tables.nz_map[cache.nz_ctx(last)][1] as i64;
    }

    cost_diff += neighbor_level_down_diff(view, cache, tables, pos, new_eob, mode);

    let old_eob_cost = tables.eob_cost(old_eob, view.max_eob()) as i64;
    cost_diff += if new_eob == 0 {
        (tables.skip_cost(txb_ctx.txb_skip_ctx, true) - tables.skip_cost(txb_ctx.txb_skip_ctx, false))
            as i64
            - old_eob_cost
    } else {
        tables.eob_cost(new_eob, view.max_eob()) as i64 - old_eob_cost
    };

    LevelDown {
        low_qc: 0,
        new_eob: Some(new_eob),
        cost_diff,
    }
}

/// Runs a trial and weighs its rate change against the exact distortion change.
pub fn evaluate_level_down(
    view: &TxbView<'_>,
    cache: &TxbCache,
    tables: &CoeffCostTables,
    pos: usize,
    mode: SearchMode,
) -> LevelDownStats {
    let trial = try_level_down(view, cache, tables, pos, mode);
    let dist_diff = view.coeff_dist(pos, trial.low_qc) - view.coeff_dist(pos, view.level(pos));
    let rd_diff = rd_cost(view.rdmult(), trial.cost_diff, dist_diff);
    LevelDownStats {
        low_qc: trial.low_qc,
        new_eob: trial.new_eob,
        cost_diff: trial.cost_diff,
        dist_diff,
        rd_diff,
        update: rd_diff < 0,
    }
}

/// Applies an evaluated trial to the view and brings the cache along.
pub fn commit_level_down(
    view: &mut TxbView<'_>,
    cache: &mut TxbCache,
    pos: usize,
    stats: &LevelDownStats,
) {
    debug_assert_eq!(stats.low_qc, lower_level(view.level(pos)));
    let old_eob = view.eob();
    view.set_level(pos, stats.low_qc);
    if let Some(new_eob) = stats.new_eob {
        view.set_eob(new_eob);
        cache.truncate(view, old_eob);
    }
    cache.update_level_down(view, pos);
    trace!(
        "level down at {}: {} (eob {:?}, rd {})",
        pos, stats.low_qc, stats.new_eob, stats.rd_diff
    );
}
