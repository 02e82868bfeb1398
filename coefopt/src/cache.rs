//! Per-position neighbor statistics, kept in step with single-level edits.

use crate::context::{
    BASE_REF_OFFSETS, BR_REF_OFFSETS, CoeffContexts, NUM_BASE_LEVELS, NeighborMag, RefOffset,
    SIG_REF_OFFSETS, base_ctx_from_count_mag, br_ctx_from_count_mag, causal_mag, is_causal,
    neighbor_count, nz_ctx_from_count,
};
use crate::txsize::TxSize;
use crate::view::TxbView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborStats {
    pub nz_count: u8,
    pub base_count: [u8; NUM_BASE_LEVELS],
    pub base_mag: NeighborMag,
    pub br_count: u8,
    pub br_mag: NeighborMag,
}

impl NeighborStats {
    fn compute(levels: &[i32], tx_size: TxSize, pos: usize) -> Self {
        let mut base_count = [0u8; NUM_BASE_LEVELS];
        for (k, count) in base_count.iter_mut().enumerate() {
            *count = neighbor_count(levels, tx_size, pos, &BASE_REF_OFFSETS, k as u32);
        }
        Self {
            nz_count: neighbor_count(levels, tx_size, pos, &SIG_REF_OFFSETS, 0),
            base_count,
            base_mag: causal_mag(levels, tx_size, pos, &BASE_REF_OFFSETS),
            br_count: neighbor_count(levels, tx_size, pos, &BR_REF_OFFSETS, NUM_BASE_LEVELS as u32),
            br_mag: causal_mag(levels, tx_size, pos, &BR_REF_OFFSETS),
        }
    }
}

/// Neighbor statistics for every coded position of one block.
///
/// Entries at scan positions at or past the EOB stay zeroed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxbCache {
    tx_size: TxSize,
    stats: Vec<NeighborStats>,
}

impl TxbCache {
    pub fn build(view: &TxbView<'_>) -> Self {
        let tx_size = view.tx_size();
        let mut stats = vec![NeighborStats::default(); tx_size.area()];
        let levels = view.qcoeff();
        for si in 0..view.eob() {
            let pos = view.scan().pos(si);
            stats[pos] = NeighborStats::compute(levels, tx_size, pos);
        }
        Self { tx_size, stats }
    }

    #[inline]
    pub fn stats(&self, pos: usize) -> &NeighborStats {
        &self.stats[pos]
    }

    #[inline]
    pub fn nz_ctx(&self, pos: usize) -> usize {
        let (row, col) = self.tx_size.row_col(pos);
        nz_ctx_from_count(row, col, self.stats[pos].nz_count)
    }

    #[inline]
    pub fn base_ctx(&self, pos: usize, base_idx: usize) -> usize {
        let (row, col) = self.tx_size.row_col(pos);
        let s = &self.stats[pos];
        base_ctx_from_count_mag(row, col, s.base_count[base_idx], s.base_mag.max, base_idx)
    }

    #[inline]
    pub fn br_ctx(&self, pos: usize) -> usize {
        let (row, col) = self.tx_size.row_col(pos);
        let s = &self.stats[pos];
        br_ctx_from_count_mag(row, col, s.br_count, s.br_mag.max)
    }

    pub fn contexts(&self, pos: usize) -> CoeffContexts {
        CoeffContexts {
            nz: self.nz_ctx(pos),
            base: [self.base_ctx(pos, 0), self.base_ctx(pos, 1)],
            br: self.br_ctx(pos),
        }
    }

    /// Follows up a one-step decrement already written to `view` at `pos`.
    pub fn update_level_down(&mut self, view: &TxbView<'_>, pos: usize) {
        let new_abs = view.abs_level(pos);
        self.apply_change(view, pos, new_abs + 1, new_abs);
    }

    /// Follows up a magnitude decrease `old_abs -> new_abs` already written to
    /// `view` at `pos`, touching only coded neighbors whose templates reach `pos`.
    pub fn apply_change(&mut self, view: &TxbView<'_>, pos: usize, old_abs: u32, new_abs: u32) {
        debug_assert!(new_abs < old_abs);
        debug_assert_eq!(view.abs_level(pos), new_abs);
        let tx_size = self.tx_size;
        let levels = view.qcoeff();
        let coded = |nb: usize| view.scan().scan_idx(nb) < view.eob();

        if old_abs > 0 && new_abs == 0 {
            for (nb, _) in dependents(tx_size, pos, &SIG_REF_OFFSETS) {
                if !coded(nb) {
                    continue;
                }
                let s = &mut self.stats[nb];
                assert!(s.nz_count > 0, "nz count underflow at {nb}");
                s.nz_count -= 1;
            }
        }

        for (nb, off) in dependents(tx_size, pos, &BASE_REF_OFFSETS) {
            if !coded(nb) {
                continue;
            }
            let s = &mut self.stats[nb];
            for k in 0..NUM_BASE_LEVELS {
                if old_abs > k as u32 && new_abs <= k as u32 {
                    assert!(s.base_count[k] > 0, "base count underflow at {nb}");
                    s.base_count[k] -= 1;
                }
            }
            if is_causal(off) {
                lower_mag(&mut s.base_mag, old_abs, || {
                    causal_mag(levels, tx_size, nb, &BASE_REF_OFFSETS)
                });
            }
        }

        let br_threshold = NUM_BASE_LEVELS as u32;
        for (nb, _) in dependents(tx_size, pos, &BR_REF_OFFSETS) {
            if !coded(nb) {
                continue;
            }
            let s = &mut self.stats[nb];
            if old_abs > br_threshold && new_abs <= br_threshold {
                assert!(s.br_count > 0, "br count underflow at {nb}");
                s.br_count -= 1;
            }
            lower_mag(&mut s.br_mag, old_abs, || {
                causal_mag(levels, tx_size, nb, &BR_REF_OFFSETS)
            });
        }
    }

    /// Clears entries cut off by an EOB move from `old_eob` down to `view.eob()`.
    pub fn truncate(&mut self, view: &TxbView<'_>, old_eob: usize) {
        for si in view.eob()..old_eob {
            self.stats[view.scan().pos(si)] = NeighborStats::default();
        }
    }

    /// Whether the incremental state equals a fresh build.
    pub fn matches_build(&self, view: &TxbView<'_>) -> bool {
        *self == Self::build(view)
    }
}

/// Positions whose template, at offset `off`, lands on `pos`.
pub(crate) fn dependents(
    tx_size: TxSize,
    pos: usize,
    offsets: &[RefOffset],
) -> impl Iterator<Item = (usize, RefOffset)> + '_ {
    offsets.iter().filter_map(move |&off| {
        tx_size
            .offset(pos, -(off.0 as i32), -(off.1 as i32))
            .map(|nb| (nb, off))
    })
}

fn lower_mag(mag: &mut NeighborMag, old_abs: u32, recount: impl FnOnce() -> NeighborMag) {
    assert!(old_abs <= mag.max, "neighbor above cached max {}", mag.max);
    if old_abs != mag.max {
        return;
    }
    assert!(mag.ties > 0, "max {} without holders", mag.max);
    if mag.ties > 1 {
        mag.ties -= 1;
    } else {
        *mag = recount();
    }
}
