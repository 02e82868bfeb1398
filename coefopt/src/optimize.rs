//! Backward greedy coefficient optimization of one transform block.
//!
//! The pass walks the coded range from the last coefficient to DC. At each
//! nonzero coefficient it first asks whether ending the block right there is
//! cheaper than everything accumulated behind it, then whether one step lower
//! wins on RD. Decisions are never revisited, so the result is an
//! approximation of the exact trellis minimum; the block-level oracle check
//! at the end keeps only results that actually improve the block.

use tracing::{debug, trace};

use crate::cache::TxbCache;
use crate::cost::CoeffCostTables;
use crate::oracle::block_rd_cost;
use crate::rdo::rd_cost;
use crate::trial::{
    LevelDownStats, SearchMode, cached_coeff_cost, commit_level_down, evaluate_level_down,
    lower_level,
};
use crate::view::TxbView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RunMode {
    /// Write the optimized block back to the caller's buffers.
    #[default]
    Commit,
    /// Report the outcome without touching the caller's buffers.
    DryRun,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptimizeConfig {
    pub fast_mode: bool,
    pub run_mode: RunMode,
}

impl OptimizeConfig {
    pub fn search_mode(&self) -> SearchMode {
        if self.fast_mode {
            SearchMode::Fast
        } else {
            SearchMode::Full
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptimizeOutcome {
    /// Any level or the EOB differs from the input.
    pub changed: bool,
    pub eob: usize,
}

/// Rates and distortions of one coded position, distortion relative to a
/// zero level.
struct PositionStats {
    rate: i64,
    rate_low: i64,
    dist: i64,
    dist_low: i64,
    nz_rate: i64,
    lower: Option<LevelDownStats>,
}

fn position_stats(
    view: &TxbView<'_>,
    cache: &TxbCache,
    tables: &CoeffCostTables,
    si: usize,
    mode: SearchMode,
) -> PositionStats {
    let pos = view.scan().pos(si);
    let level = view.level(pos);
    let low_qc = lower_level(level);
    let dist0 = view.coeff_dist(pos, 0);
    let not_last = si + 1 < view.eob();

    // The last coefficient only drops to zero through an EOB move.
    let lower = (low_qc != 0 || not_last).then(|| evaluate_level_down(view, cache, tables, pos, mode));
    let nz_rate = if not_last {
        let to_zero = low_qc == 0 && lower.is_some_and(|l| l.update);
        tables.nz_map[cache.nz_ctx(pos)][usize::from(!to_zero)] as i64
    } else {
        0
    };

    PositionStats {
        rate: cached_coeff_cost(view, cache, tables, si, level) as i64,
        rate_low: cached_coeff_cost(view, cache, tables, si, low_qc) as i64,
        dist: view.coeff_dist(pos, level) - dist0,
        dist_low: view.coeff_dist(pos, low_qc) - dist0,
        nz_rate,
        lower,
    }
}

/// Zeroes every coded position from scan `new_eob` on.
fn truncate_eob(view: &mut TxbView<'_>, cache: &mut TxbCache, new_eob: usize) {
    let old_eob = view.eob();
    view.set_eob(new_eob);
    cache.truncate(view, old_eob);
    for si in new_eob..old_eob {
        let pos = view.scan().pos(si);
        let old_abs = view.abs_level(pos);
        if old_abs != 0 {
            view.set_level(pos, 0);
            cache.apply_change(view, pos, old_abs, 0);
        }
    }
    trace!("eob truncated {} -> {}", old_eob, new_eob);
}

fn greedy_pass(view: &mut TxbView<'_>, tables: &CoeffCostTables, mode: SearchMode) {
    let init_eob = view.eob();
    let max_eob = view.max_eob();
    let rdmult = view.rdmult();
    let mut cache = TxbCache::build(view);

    let mut accu_rate = tables.eob_cost(init_eob, max_eob) as i64;
    let mut accu_dist = 0i64;

    for si in (0..init_eob).rev() {
        debug_assert!(si < view.eob());
        let pos = view.scan().pos(si);
        if view.level(pos) == 0 {
            accu_rate += cached_coeff_cost(view, &cache, tables, si, 0) as i64;
            continue;
        }

        let mut stats = position_stats(view, &cache, tables, si, mode);
        if si + 1 < view.eob() {
            let eob_rate = tables.eob_cost(si + 1, max_eob) as i64;
            let end_here = rd_cost(rdmult, eob_rate, 0);
            let keep_tail = rd_cost(rdmult, accu_rate + stats.nz_rate, accu_dist);
            if end_here <= keep_tail {
                truncate_eob(view, &mut cache, si + 1);
                accu_rate = eob_rate;
                accu_dist = 0;
                stats = position_stats(view, &cache, tables, si, mode);
            }
        }

        match stats.lower {
            Some(lower) if lower.update => {
                commit_level_down(view, &mut cache, pos, &lower);
                accu_rate += stats.rate_low;
                accu_dist += stats.dist_low;
            }
            _ => {
                accu_rate += stats.rate;
                accu_dist += stats.dist;
            }
        }
    }

    let skip_ctx = view.txb_ctx().txb_skip_ctx;
    let zero_blk = rd_cost(rdmult, tables.skip_cost(skip_ctx, true) as i64, 0);
    let coded_blk = rd_cost(
        rdmult,
        accu_rate + tables.skip_cost(skip_ctx, false) as i64,
        accu_dist,
    );
    if zero_blk <= coded_blk {
        truncate_eob(view, &mut cache, 0);
    }

    debug_assert!(cache.matches_build(view), "neighbor cache drifted from levels");
}

/// Optimizes the levels and EOB of one block.
///
/// The pass runs on a private copy of the levels. Its result is kept only
/// when it lowers the block's oracle RD cost; with [`RunMode::Commit`] the
/// kept result is written back into `view`.
pub fn optimize_txb(
    view: &mut TxbView<'_>,
    tables: &CoeffCostTables,
    config: &OptimizeConfig,
) -> OptimizeOutcome {
    let init_eob = view.eob();
    if init_eob == 0 {
        return OptimizeOutcome {
            changed: false,
            eob: 0,
        };
    }

    let baseline_rd = block_rd_cost(view, tables);
    let mut qcoeff = view.qcoeff().to_vec();
    let mut dqcoeff = view.dqcoeff().to_vec();
    let (final_eob, final_rd, modified) = {
        let mut scratch = view.with_buffers(&mut qcoeff, &mut dqcoeff);
        greedy_pass(&mut scratch, tables, config.search_mode());
        let modified = scratch.eob() != init_eob || scratch.qcoeff() != view.qcoeff();
        (scratch.eob(), block_rd_cost(&scratch, tables), modified)
    };
    let accepted = modified && final_rd < baseline_rd;

    debug!(
        "txb {:?}: eob {} -> {}, rd {} -> {}, accepted {}",
        view.tx_size(),
        init_eob,
        final_eob,
        baseline_rd,
        final_rd,
        accepted
    );

    if !accepted {
        return OptimizeOutcome {
            changed: false,
            eob: init_eob,
        };
    }
    if config.run_mode == RunMode::Commit {
        view.load(&qcoeff, &dqcoeff, final_eob);
    }
    OptimizeOutcome {
        changed: true,
        eob: final_eob,
    }
}
