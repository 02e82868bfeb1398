use crate::context::{DC_SIGN_CONTEXTS, TXB_SKIP_CONTEXTS};
use crate::error::TxbError;
use crate::rdo::{coeff_dist, qcoeff_to_dqcoeff};
use crate::scan::ScanOrder;
use crate::txsize::TxSize;

const COEFF_CONTEXT_MASK: u32 = 63;
const DC_SIGN_SHIFT: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantParams {
    pub dc_dequant: i32,
    pub ac_dequant: i32,
    pub shift: u32,
}

impl QuantParams {
    /// Dequantizers with the default scale shift for `tx_size`.
    pub fn new(dc_dequant: i32, ac_dequant: i32, tx_size: TxSize) -> Self {
        Self {
            dc_dequant,
            ac_dequant,
            shift: tx_size.tx_scale(),
        }
    }

    #[inline]
    pub fn dequant(&self, pos: usize) -> i32 {
        if pos == 0 { self.dc_dequant } else { self.ac_dequant }
    }
}

/// Contexts derived from the neighboring blocks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TxbCtx {
    pub txb_skip_ctx: usize,
    pub dc_sign_ctx: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxbParams {
    pub tx_size: TxSize,
    pub quant: QuantParams,
    pub txb_ctx: TxbCtx,
    pub rdmult: i64,
}

/// EOB implied by a level array: one past the last nonzero scan position.
pub fn eob_from_levels(levels: &[i32], scan: &ScanOrder) -> usize {
    (0..scan.len())
        .rev()
        .find(|&si| levels[scan.pos(si)] != 0)
        .map_or(0, |si| si + 1)
}

/// One transform block under optimization, borrowed from the caller.
#[derive(Debug)]
pub struct TxbView<'a> {
    qcoeff: &'a mut [i32],
    dqcoeff: &'a mut [i32],
    tcoeff: &'a [i32],
    scan: &'a ScanOrder,
    eob: usize,
    params: TxbParams,
}

impl<'a> TxbView<'a> {
    pub fn new(
        qcoeff: &'a mut [i32],
        dqcoeff: &'a mut [i32],
        tcoeff: &'a [i32],
        scan: &'a ScanOrder,
        eob: usize,
        params: TxbParams,
    ) -> Result<Self, TxbError> {
        let tx_size = params.tx_size;
        let area = tx_size.area();
        for (buffer, len) in [
            ("qcoeff", qcoeff.len()),
            ("dqcoeff", dqcoeff.len()),
            ("tcoeff", tcoeff.len()),
        ] {
            if len < area {
                return Err(TxbError::BufferTooSmall {
                    buffer,
                    len,
                    needed: area,
                });
            }
        }
        if scan.len() != area {
            return Err(TxbError::ScanSizeMismatch {
                len: scan.len(),
                area,
            });
        }
        if eob > tx_size.max_eob() {
            return Err(TxbError::EobOutOfRange {
                eob,
                max_eob: tx_size.max_eob(),
            });
        }
        let quant = params.quant;
        if quant.dc_dequant <= 0 || quant.ac_dequant <= 0 {
            return Err(TxbError::InvalidDequant {
                dc: quant.dc_dequant,
                ac: quant.ac_dequant,
            });
        }
        let ctx = params.txb_ctx;
        if ctx.txb_skip_ctx >= TXB_SKIP_CONTEXTS {
            return Err(TxbError::ContextOutOfRange {
                name: "txb_skip",
                ctx: ctx.txb_skip_ctx,
                limit: TXB_SKIP_CONTEXTS,
            });
        }
        if ctx.dc_sign_ctx >= DC_SIGN_CONTEXTS {
            return Err(TxbError::ContextOutOfRange {
                name: "dc_sign",
                ctx: ctx.dc_sign_ctx,
                limit: DC_SIGN_CONTEXTS,
            });
        }

        let qcoeff = &mut qcoeff[..area];
        let expected = eob_from_levels(qcoeff, scan);
        if expected != eob {
            return Err(TxbError::EobMismatch { eob, expected });
        }

        Ok(Self {
            qcoeff,
            dqcoeff: &mut dqcoeff[..area],
            tcoeff: &tcoeff[..area],
            scan,
            eob,
            params,
        })
    }

    /// Same block and parameters over another pair of level buffers, which
    /// must hold a copy of this view's levels.
    pub fn with_buffers<'b>(&'b self, qcoeff: &'b mut [i32], dqcoeff: &'b mut [i32]) -> TxbView<'b> {
        TxbView {
            qcoeff,
            dqcoeff,
            tcoeff: self.tcoeff,
            scan: self.scan,
            eob: self.eob,
            params: self.params,
        }
    }

    pub fn params(&self) -> &TxbParams {
        &self.params
    }

    pub fn tx_size(&self) -> TxSize {
        self.params.tx_size
    }

    pub fn rdmult(&self) -> i64 {
        self.params.rdmult
    }

    pub fn txb_ctx(&self) -> TxbCtx {
        self.params.txb_ctx
    }

    pub fn quant(&self) -> QuantParams {
        self.params.quant
    }

    pub fn scan(&self) -> &ScanOrder {
        self.scan
    }

    pub fn eob(&self) -> usize {
        self.eob
    }

    pub fn max_eob(&self) -> usize {
        self.params.tx_size.max_eob()
    }

    pub fn qcoeff(&self) -> &[i32] {
        self.qcoeff
    }

    pub fn dqcoeff(&self) -> &[i32] {
        self.dqcoeff
    }

    pub fn tcoeff(&self) -> &[i32] {
        self.tcoeff
    }

    #[inline]
    pub fn level(&self, pos: usize) -> i32 {
        self.qcoeff[pos]
    }

    #[inline]
    pub fn abs_level(&self, pos: usize) -> u32 {
        self.qcoeff[pos].unsigned_abs()
    }

    /// Writes a level and its dequantized value.
    ///
    /// The EOB is not adjusted; callers moving the last coefficient follow up
    /// with an EOB update.
    pub fn set_level(&mut self, pos: usize, level: i32) {
        let q = self.params.quant;
        self.qcoeff[pos] = level;
        self.dqcoeff[pos] = qcoeff_to_dqcoeff(level, q.dequant(pos), q.shift);
    }

    pub(crate) fn set_eob(&mut self, eob: usize) {
        debug_assert!(eob <= self.max_eob());
        self.eob = eob;
    }

    /// Overwrites levels, dequantized values and EOB with a finished result.
    pub(crate) fn load(&mut self, qcoeff: &[i32], dqcoeff: &[i32], eob: usize) {
        self.qcoeff.copy_from_slice(qcoeff);
        self.dqcoeff.copy_from_slice(dqcoeff);
        self.set_eob(eob);
    }

    /// Distortion of coding `level` at raster `pos`.
    #[inline]
    pub fn coeff_dist(&self, pos: usize, level: i32) -> i64 {
        let q = self.params.quant;
        let dq = qcoeff_to_dqcoeff(level, q.dequant(pos), q.shift);
        coeff_dist(self.tcoeff[pos], dq, q.shift)
    }

    /// True when scan position `si` is the last coded one.
    #[inline]
    pub fn is_last(&self, si: usize) -> bool {
        si + 1 == self.eob
    }

    /// Context value the neighboring blocks derive their skip and DC sign
    /// contexts from.
    pub fn entropy_context(&self) -> u8 {
        if self.eob == 0 {
            return 0;
        }
        let cul_level = (0..self.eob)
            .map(|si| self.abs_level(self.scan.pos(si)))
            .fold(0u32, |acc, abs| acc.saturating_add(abs))
            .min(COEFF_CONTEXT_MASK);
        let dc = self.qcoeff[0];
        let tagged = if dc < 0 {
            cul_level | (1 << DC_SIGN_SHIFT)
        } else if dc > 0 {
            cul_level + (2 << DC_SIGN_SHIFT)
        } else {
            cul_level
        };
        tagged as u8
    }
}
