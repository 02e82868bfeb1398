//! Cache-free block costs, derived straight from the live level array.

use crate::context::coeff_contexts;
use crate::cost::CoeffCostTables;
use crate::rdo::rd_cost;
use crate::view::TxbView;

/// Rate of `level` placed at scan position `si`, with the other levels as
/// they currently are.
pub fn single_coeff_cost(view: &TxbView<'_>, tables: &CoeffCostTables, level: i32, si: usize) -> i32 {
    let pos = view.scan().pos(si);
    let ctxs = coeff_contexts(view.qcoeff(), view.tx_size(), pos);
    tables.coeff_cost(
        level,
        pos,
        &ctxs,
        si + 1 < view.eob(),
        view.txb_ctx().dc_sign_ctx,
    )
}

pub fn total_block_cost(view: &TxbView<'_>, tables: &CoeffCostTables) -> i64 {
    let skip_ctx = view.txb_ctx().txb_skip_ctx;
    let eob = view.eob();
    if eob == 0 {
        return tables.skip_cost(skip_ctx, true) as i64;
    }
    let mut cost = (tables.skip_cost(skip_ctx, false) + tables.eob_cost(eob, view.max_eob())) as i64;
    for si in 0..eob {
        let level = view.level(view.scan().pos(si));
        cost += single_coeff_cost(view, tables, level, si) as i64;
    }
    cost
}

/// Squared error of the whole block, uncoded positions included.
pub fn block_distortion(view: &TxbView<'_>) -> i64 {
    (0..view.tx_size().area())
        .map(|pos| view.coeff_dist(pos, view.level(pos)))
        .sum()
}

pub fn block_rd_cost(view: &TxbView<'_>, tables: &CoeffCostTables) -> i64 {
    rd_cost(view.rdmult(), total_block_cost(view, tables), block_distortion(view))
}
