use crate::error::TxbError;
use crate::txsize::TxSize;

pub const DEFAULT_SCAN_4X4: [u16; 16] = [
     0,  4,  1,  2,
     5,  8, 12,  9,
     6,  3,  7, 10,
    13, 14, 11, 15,
];

pub const DEFAULT_SCAN_8X8: [u16; 64] = [
     0,  8,  1,  2,  9, 16, 24, 17,
    10,  3,  4, 11, 18, 25, 32, 40,
    33, 26, 19, 12,  5,  6, 13, 20,
    27, 34, 41, 48, 56, 49, 42, 35,
    28, 21, 14,  7, 15, 22, 29, 36,
    43, 50, 57, 58, 51, 44, 37, 30,
    23, 31, 38, 45, 52, 59, 60, 53,
    46, 39, 47, 54, 61, 62, 55, 63,
];

/// Forward scan (scan position -> raster position) and its inverse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOrder {
    scan: Vec<u16>,
    iscan: Vec<u16>,
}

impl ScanOrder {
    /// Builds a scan order from a caller table, which must be a permutation of `0..len`.
    pub fn new(scan: &[u16]) -> Result<Self, TxbError> {
        let mut iscan = vec![u16::MAX; scan.len()];
        for (si, &rc) in scan.iter().enumerate() {
            let rc = rc as usize;
            if rc >= scan.len() || iscan[rc] != u16::MAX {
                return Err(TxbError::InvalidScan { scan_idx: si, pos: rc });
            }
            iscan[rc] = si as u16;
        }
        Ok(Self {
            scan: scan.to_vec(),
            iscan,
        })
    }

    pub fn raster(tx_size: TxSize) -> Self {
        let scan: Vec<u16> = (0..tx_size.area() as u16).collect();
        Self {
            iscan: scan.clone(),
            scan,
        }
    }

    /// Zig-zag over anti-diagonals: odd diagonals run up-right from the left
    /// column, even diagonals run down-left from the top row.
    pub fn zigzag(tx_size: TxSize) -> Self {
        let w = tx_size.width();
        let h = tx_size.height();
        let mut scan = Vec::with_capacity(tx_size.area());
        for d in 0..(w + h - 1) {
            let lo = d.saturating_sub(w - 1);
            let hi = d.min(h - 1);
            if d % 2 == 1 {
                for row in (lo..=hi).rev() {
                    scan.push(((row << tx_size.bwl()) + d - row) as u16);
                }
            } else {
                for row in lo..=hi {
                    scan.push(((row << tx_size.bwl()) + d - row) as u16);
                }
            }
        }
        let mut iscan = vec![0u16; scan.len()];
        for (si, &rc) in scan.iter().enumerate() {
            iscan[rc as usize] = si as u16;
        }
        Self { scan, iscan }
    }

    pub fn len(&self) -> usize {
        self.scan.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scan.is_empty()
    }

    /// Raster position coded at scan index `si`.
    #[inline]
    pub fn pos(&self, si: usize) -> usize {
        self.scan[si] as usize
    }

    /// Scan index of raster position `pos`.
    #[inline]
    pub fn scan_idx(&self, pos: usize) -> usize {
        self.iscan[pos] as usize
    }

    pub fn scan(&self) -> &[u16] {
        &self.scan
    }

    pub fn iscan(&self) -> &[u16] {
        &self.iscan
    }
}
