/// Largest transform area handled by the optimizer (32x32).
pub const MAX_TX_SQUARE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxSize {
    Tx4x4,
    Tx8x8,
    Tx16x16,
    Tx32x32,
    Tx4x8,
    Tx8x4,
    Tx8x16,
    Tx16x8,
    Tx16x32,
    Tx32x16,
    Tx4x16,
    Tx16x4,
    Tx8x32,
    Tx32x8,
}

impl TxSize {
    pub const ALL: [TxSize; 14] = [
        TxSize::Tx4x4,
        TxSize::Tx8x8,
        TxSize::Tx16x16,
        TxSize::Tx32x32,
        TxSize::Tx4x8,
        TxSize::Tx8x4,
        TxSize::Tx8x16,
        TxSize::Tx16x8,
        TxSize::Tx16x32,
        TxSize::Tx32x16,
        TxSize::Tx4x16,
        TxSize::Tx16x4,
        TxSize::Tx8x32,
        TxSize::Tx32x8,
    ];

    /// log2 of the block width; raster index = (row << bwl) + col.
    pub const fn bwl(self) -> u32 {
        match self {
            TxSize::Tx4x4 | TxSize::Tx4x8 | TxSize::Tx4x16 => 2,
            TxSize::Tx8x8 | TxSize::Tx8x4 | TxSize::Tx8x16 | TxSize::Tx8x32 => 3,
            TxSize::Tx16x16 | TxSize::Tx16x8 | TxSize::Tx16x32 | TxSize::Tx16x4 => 4,
            TxSize::Tx32x32 | TxSize::Tx32x16 | TxSize::Tx32x8 => 5,
        }
    }

    pub const fn width(self) -> usize {
        1 << self.bwl()
    }

    pub const fn height(self) -> usize {
        match self {
            TxSize::Tx4x4 | TxSize::Tx8x4 | TxSize::Tx16x4 => 4,
            TxSize::Tx8x8 | TxSize::Tx4x8 | TxSize::Tx16x8 | TxSize::Tx32x8 => 8,
            TxSize::Tx16x16 | TxSize::Tx8x16 | TxSize::Tx32x16 | TxSize::Tx4x16 => 16,
            TxSize::Tx32x32 | TxSize::Tx16x32 | TxSize::Tx8x32 => 32,
        }
    }

    pub const fn area(self) -> usize {
        self.width() * self.height()
    }

    /// Highest EOB a block of this size can signal.
    pub const fn max_eob(self) -> usize {
        self.area()
    }

    /// Quantizer scale shift applied to large transforms.
    pub const fn tx_scale(self) -> u32 {
        let pels = self.area();
        (pels > 256) as u32 + (pels > 1024) as u32
    }

    #[inline]
    pub const fn row_col(self, pos: usize) -> (usize, usize) {
        let row = pos >> self.bwl();
        (row, pos - (row << self.bwl()))
    }

    /// Raster position of `pos` displaced by `(drow, dcol)`, or `None` outside the block.
    #[inline]
    pub fn offset(self, pos: usize, drow: i32, dcol: i32) -> Option<usize> {
        let (row, col) = self.row_col(pos);
        let r = row as i32 + drow;
        let c = col as i32 + dcol;
        if r < 0 || c < 0 || r as usize >= self.height() || c as usize >= self.width() {
            return None;
        }
        Some(((r as usize) << self.bwl()) + c as usize)
    }
}
