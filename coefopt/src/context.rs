//! Context derivation for the level-map coefficient coder.
//!
//! Every context is a pure function of the neighboring levels. The same
//! helpers feed both the [`TxbCache`](crate::cache::TxbCache) build and the
//! cache-free oracle, which keeps the two bit-identical.

use crate::txsize::TxSize;

pub const NUM_BASE_LEVELS: usize = 2;
pub const COEFF_BASE_RANGE: usize = 12;
pub const BR_MAG_OFFSET: u32 = 1;

/// Lowest magnitude whose remainder goes through the Golomb tail.
pub const GOLOMB_START: u32 = (1 + NUM_BASE_LEVELS + COEFF_BASE_RANGE) as u32;

pub const COUNT_BUCKETS: usize = 5;
const POS_CLASSES: usize = 4;

pub const NZ_MAP_CONTEXTS: usize = POS_CLASSES * COUNT_BUCKETS;
pub const BASE_CONTEXTS: usize = POS_CLASSES * 2 * COUNT_BUCKETS;
pub const BR_CONTEXTS: usize = POS_CLASSES * 2 * COUNT_BUCKETS;
pub const TXB_SKIP_CONTEXTS: usize = 13;
pub const DC_SIGN_CONTEXTS: usize = 3;
pub const EOB_TOKENS: usize = 12;
pub const EOB_FLAG_CONTEXTS: usize = EOB_TOKENS - 2;

/// (row, col) displacement from the coded position to a neighbor.
pub type RefOffset = (i8, i8);

pub const SIG_REF_OFFSETS: [RefOffset; 5] = [(0, 1), (1, 0), (1, 1), (0, 2), (2, 0)];
pub const BASE_REF_OFFSETS: [RefOffset; 5] = [(0, 1), (1, 0), (0, -1), (-1, 0), (1, 1)];
pub const BR_REF_OFFSETS: [RefOffset; 5] = [(0, 1), (1, 0), (1, 1), (1, 2), (2, 1)];

/// Templates are ordered nearest first; fast search keeps only a prefix.
pub const FAST_SIG_NEIGHBORS: usize = 2;
pub const FAST_LEVEL_NEIGHBORS: usize = 4;

pub const EOB_GROUP_START: [usize; EOB_TOKENS] = [0, 1, 2, 3, 5, 9, 17, 33, 65, 129, 257, 513];

/// Neighbors below and to the right are coded before the current position.
#[inline]
pub const fn is_causal(off: RefOffset) -> bool {
    off.0 >= 0 && off.1 >= 0
}

/// Largest causal neighbor magnitude and how many neighbors share it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NeighborMag {
    pub max: u32,
    pub ties: u8,
}

/// Counts template neighbors of `pos` whose magnitude exceeds `threshold`.
pub fn neighbor_count(
    levels: &[i32],
    tx_size: TxSize,
    pos: usize,
    offsets: &[RefOffset],
    threshold: u32,
) -> u8 {
    offsets
        .iter()
        .filter_map(|&(dr, dc)| tx_size.offset(pos, dr as i32, dc as i32))
        .filter(|&nb| levels[nb].unsigned_abs() > threshold)
        .count() as u8
}

pub fn causal_mag(levels: &[i32], tx_size: TxSize, pos: usize, offsets: &[RefOffset]) -> NeighborMag {
    let mut mag = NeighborMag::default();
    for &off in offsets.iter().filter(|&&off| is_causal(off)) {
        let Some(nb) = tx_size.offset(pos, off.0 as i32, off.1 as i32) else {
            continue;
        };
        let abs = levels[nb].unsigned_abs();
        if abs == 0 {
            continue;
        }
        if abs > mag.max {
            mag = NeighborMag { max: abs, ties: 1 };
        } else if abs == mag.max {
            mag.ties += 1;
        }
    }
    mag
}

/// Contexts of every symbol a coefficient at one position may code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoeffContexts {
    pub nz: usize,
    pub base: [usize; NUM_BASE_LEVELS],
    pub br: usize,
}

#[inline]
fn pos_class(row: usize, col: usize) -> usize {
    (usize::from(row != 0) << 1) | usize::from(col != 0)
}

#[inline]
fn count_bucket(count: u8) -> usize {
    (count as usize).min(COUNT_BUCKETS - 1)
}

#[inline]
pub fn nz_ctx_from_count(row: usize, col: usize, count: u8) -> usize {
    pos_class(row, col) * COUNT_BUCKETS + count_bucket(count)
}

/// `max` is the causal neighbor magnitude; the flag tests it against level `base_idx + 1`.
#[inline]
pub fn base_ctx_from_count_mag(row: usize, col: usize, count: u8, max: u32, base_idx: usize) -> usize {
    let mag_flag = usize::from(max > base_idx as u32 + 1);
    (pos_class(row, col) * 2 + mag_flag) * COUNT_BUCKETS + count_bucket(count)
}

#[inline]
pub fn br_ctx_from_count_mag(row: usize, col: usize, count: u8, max: u32) -> usize {
    let mag_flag = usize::from(max > NUM_BASE_LEVELS as u32 + BR_MAG_OFFSET);
    (pos_class(row, col) * 2 + mag_flag) * COUNT_BUCKETS + count_bucket(count)
}

pub fn nz_context(levels: &[i32], tx_size: TxSize, pos: usize) -> usize {
    let (row, col) = tx_size.row_col(pos);
    let count = neighbor_count(levels, tx_size, pos, &SIG_REF_OFFSETS, 0);
    nz_ctx_from_count(row, col, count)
}

pub fn base_context(levels: &[i32], tx_size: TxSize, pos: usize, base_idx: usize) -> usize {
    let (row, col) = tx_size.row_col(pos);
    let count = neighbor_count(levels, tx_size, pos, &BASE_REF_OFFSETS, base_idx as u32);
    let mag = causal_mag(levels, tx_size, pos, &BASE_REF_OFFSETS);
    base_ctx_from_count_mag(row, col, count, mag.max, base_idx)
}

pub fn br_context(levels: &[i32], tx_size: TxSize, pos: usize) -> usize {
    let (row, col) = tx_size.row_col(pos);
    let count = neighbor_count(levels, tx_size, pos, &BR_REF_OFFSETS, NUM_BASE_LEVELS as u32);
    let mag = causal_mag(levels, tx_size, pos, &BR_REF_OFFSETS);
    br_ctx_from_count_mag(row, col, count, mag.max)
}

pub fn coeff_contexts(levels: &[i32], tx_size: TxSize, pos: usize) -> CoeffContexts {
    CoeffContexts {
        nz: nz_context(levels, tx_size, pos),
        base: [
            base_context(levels, tx_size, pos, 0),
            base_context(levels, tx_size, pos, 1),
        ],
        br: br_context(levels, tx_size, pos),
    }
}

/// Exponential bucket of the last significant scan position.
pub fn eob_to_bin(last: usize) -> usize {
    (usize::BITS - last.leading_zeros()) as usize
}

/// EOB token and the offset of `eob` inside the token's group.
pub fn eob_pos_token(eob: usize) -> (usize, usize) {
    if eob == 0 {
        return (0, 0);
    }
    let token = 1 + eob_to_bin(eob - 1);
    (token, eob - EOB_GROUP_START[token])
}

pub fn eob_offset_bits(token: usize) -> u32 {
    token.saturating_sub(2) as u32
}

/// Context of the "EOB falls in this token" flag.
#[inline]
pub fn eob_context(token: usize) -> usize {
    debug_assert!(token >= 1);
    token - 1
}
