//! Transform block fixtures and cost tables for integration tests.
//!
//! Random blocks look like quantizer output: significant coefficients
//! concentrated early in scan order, mostly small magnitudes with an
//! occasional large one, and original coefficients within half a step of
//! their reconstruction.

#![allow(dead_code)]

use coefopt::rdo::qcoeff_to_dqcoeff;
use coefopt::view::eob_from_levels;
use coefopt::{CoeffCostTables, QuantParams, ScanOrder, TxSize, TxbCtx, TxbParams, TxbView};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const TEST_SIZES: [TxSize; 6] = [
    TxSize::Tx4x4,
    TxSize::Tx8x8,
    TxSize::Tx8x4,
    TxSize::Tx4x16,
    TxSize::Tx16x8,
    TxSize::Tx16x16,
];

#[derive(Debug, Clone)]
pub struct BlockFixture {
    pub scan: ScanOrder,
    pub qcoeff: Vec<i32>,
    pub dqcoeff: Vec<i32>,
    pub tcoeff: Vec<i32>,
    pub eob: usize,
    pub params: TxbParams,
}

impl BlockFixture {
    pub fn new(scan: ScanOrder, qcoeff: Vec<i32>, tcoeff: Vec<i32>, params: TxbParams) -> Self {
        let q = params.quant;
        let dqcoeff = qcoeff
            .iter()
            .enumerate()
            .map(|(pos, &l)| qcoeff_to_dqcoeff(l, q.dequant(pos), q.shift))
            .collect();
        let eob = eob_from_levels(&qcoeff, &scan);
        Self {
            scan,
            qcoeff,
            dqcoeff,
            tcoeff,
            eob,
            params,
        }
    }

    pub fn view(&mut self) -> TxbView<'_> {
        TxbView::new(
            &mut self.qcoeff,
            &mut self.dqcoeff,
            &self.tcoeff,
            &self.scan,
            self.eob,
            self.params,
        )
        .expect("fixture is consistent")
    }

    pub fn with_levels(&self, qcoeff: Vec<i32>) -> Self {
        Self::new(self.scan.clone(), qcoeff, self.tcoeff.clone(), self.params)
    }

    /// Raster positions of the nonzero levels.
    pub fn nonzero_positions(&self) -> Vec<usize> {
        (0..self.qcoeff.len()).filter(|&p| self.qcoeff[p] != 0).collect()
    }
}

pub fn params(tx_size: TxSize, dc_dequant: i32, ac_dequant: i32, rdmult: i64) -> TxbParams {
    TxbParams {
        tx_size,
        quant: QuantParams::new(dc_dequant, ac_dequant, tx_size),
        txb_ctx: TxbCtx::default(),
        rdmult,
    }
}

/// Independent entries everywhere, so every context change moves the rate.
pub fn random_tables(rng: &mut StdRng) -> CoeffCostTables {
    CoeffCostTables::from_fn(|| rng.gen_range(30..2000))
}

/// Tables close to context-free: a fair coin plus a few units of jitter.
pub fn near_uniform_tables(rng: &mut StdRng) -> CoeffCostTables {
    let base = CoeffCostTables::from_probability(16384);
    let mut jitter = CoeffCostTables::from_fn(|| rng.gen_range(0..8));
    for (j, b) in jitter.txb_skip.iter_mut().zip(base.txb_skip.iter()) {
        add_pair(j, b);
    }
    for (j, b) in jitter.nz_map.iter_mut().zip(base.nz_map.iter()) {
        add_pair(j, b);
    }
    for (jt, bt) in jitter.base.iter_mut().zip(base.base.iter()) {
        for (j, b) in jt.iter_mut().zip(bt.iter()) {
            add_pair(j, b);
        }
    }
    for (j, b) in jitter.lps.iter_mut().zip(base.lps.iter()) {
        for (x, y) in j.iter_mut().zip(b.iter()) {
            *x += y;
        }
    }
    for (j, b) in jitter.dc_sign.iter_mut().zip(base.dc_sign.iter()) {
        add_pair(j, b);
    }
    for (j, b) in jitter.eob_flag.iter_mut().zip(base.eob_flag.iter()) {
        add_pair(j, b);
    }
    for (j, b) in jitter.eob_extra.iter_mut().zip(base.eob_extra.iter()) {
        add_pair(j, b);
    }
    jitter
}

fn add_pair(dst: &mut [i32; 2], src: &[i32; 2]) {
    dst[0] += src[0];
    dst[1] += src[1];
}

fn random_magnitude(rng: &mut StdRng) -> i32 {
    match rng.gen_range(0..20) {
        0..=10 => 1,
        11..=15 => 2,
        16..=17 => rng.gen_range(3..6),
        18 => rng.gen_range(6..15),
        _ => rng.gen_range(15..40),
    }
}

pub fn random_block(rng: &mut StdRng, tx_size: TxSize) -> BlockFixture {
    let area = tx_size.area();
    let scan = ScanOrder::zigzag(tx_size);
    let dc_dequant = rng.gen_range(4..64);
    let ac_dequant = rng.gen_range(4..64);
    let rdmult = rng.gen_range(200..400_000);
    let params = params(tx_size, dc_dequant, ac_dequant, rdmult);
    let shift = params.quant.shift;

    let span = rng.gen_range(1..=area.min(40));
    let density = rng.gen_range(0.2..0.9);
    let mut qcoeff = vec![0i32; area];
    for si in 0..span {
        if rng.gen_bool(density) {
            let sign = if rng.gen_bool(0.5) { -1 } else { 1 };
            qcoeff[scan.pos(si)] = sign * random_magnitude(rng);
        }
    }

    if qcoeff.iter().all(|&l| l == 0) {
        qcoeff[scan.pos(span - 1)] = 1;
    }

    let tcoeff = (0..area)
        .map(|pos| {
            let dequant = params.quant.dequant(pos);
            let recon = qcoeff_to_dqcoeff(qcoeff[pos], dequant, shift);
            let half = (dequant >> (shift + 1)).max(1);
            recon + rng.gen_range(-half..=half)
        })
        .collect();

    BlockFixture::new(scan, qcoeff, tcoeff, params)
}

/// A random block together with random tables, reproducible from the seed.
pub fn block_case(seed: u64, tx_size: TxSize) -> (BlockFixture, CoeffCostTables) {
    let mut rng = StdRng::seed_from_u64(seed);
    let tables = random_tables(&mut rng);
    (random_block(&mut rng, tx_size), tables)
}

pub fn tx_size_strategy() -> impl Strategy<Value = TxSize> {
    prop::sample::select(TEST_SIZES.to_vec())
}
