use coefopt::oracle::{block_rd_cost, total_block_cost};
use coefopt::rdo::plane_rdmult;
use coefopt::scan::DEFAULT_SCAN_8X8;
use coefopt::{
    CoeffCostTables, OptimizeConfig, OptimizeOutcome, RunMode, ScanOrder, TxSize, TxbCtx, TxbError,
    TxbView, optimize_txb,
};

mod support;

use support::blocks::{BlockFixture, params};

const DEQUANT: i32 = 16;

/// DC level 5 sitting exactly on its reconstruction, plus a magnitude-1
/// tail coefficient at raster 2 whose original value is closer to zero.
fn tail_block(rdmult: i64) -> BlockFixture {
    let mut q = vec![0i32; 16];
    q[0] = 5;
    q[2] = 1;
    let mut t = vec![0i32; 16];
    t[0] = 5 * DEQUANT;
    t[2] = 9;
    BlockFixture::new(
        ScanOrder::raster(TxSize::Tx4x4),
        q,
        t,
        params(TxSize::Tx4x4, DEQUANT, DEQUANT, rdmult),
    )
}

fn rd_of(fixture: &BlockFixture, tables: &CoeffCostTables) -> i64 {
    let mut f = fixture.clone();
    let view = f.view();
    block_rd_cost(&view, tables)
}

fn optimize(fixture: &mut BlockFixture, tables: &CoeffCostTables) -> OptimizeOutcome {
    let mut view = fixture.view();
    let outcome = optimize_txb(&mut view, tables, &OptimizeConfig::default());
    assert_eq!(view.eob(), outcome.eob);
    fixture.eob = outcome.eob;
    outcome
}

#[test]
fn tail_coefficient_dropped_under_large_lambda() {
    let tables = CoeffCostTables::flat(300);
    let mut fixture = tail_block(4096);
    assert_eq!(fixture.eob, 3);

    let mut dropped = fixture.qcoeff.clone();
    dropped[2] = 0;
    let alternative = fixture.with_levels(dropped);
    assert!(rd_of(&alternative, &tables) < rd_of(&fixture, &tables));

    let outcome = optimize(&mut fixture, &tables);
    assert_eq!(outcome, OptimizeOutcome { changed: true, eob: 1 });
    assert_eq!(fixture.qcoeff[2], 0);
    assert_eq!(fixture.dqcoeff[2], 0);
    assert_eq!(fixture.qcoeff[0], 5);
    assert_eq!(rd_of(&fixture, &tables), rd_of(&alternative, &tables));
}

#[test]
fn tail_coefficient_kept_under_small_lambda() {
    let tables = CoeffCostTables::flat(300);
    let mut fixture = tail_block(16);
    let original = fixture.qcoeff.clone();

    let mut dropped = fixture.qcoeff.clone();
    dropped[2] = 0;
    let alternative = fixture.with_levels(dropped);
    assert!(rd_of(&alternative, &tables) > rd_of(&fixture, &tables));

    let outcome = optimize(&mut fixture, &tables);
    assert_eq!(outcome, OptimizeOutcome { changed: false, eob: 3 });
    assert_eq!(fixture.qcoeff, original);
}

#[test]
fn optimized_block_is_a_fixed_point() {
    let tables = CoeffCostTables::flat(300);
    for rdmult in [16, 4096] {
        let mut fixture = tail_block(rdmult);
        optimize(&mut fixture, &tables);
        let first = fixture.qcoeff.clone();
        let outcome = optimize(&mut fixture, &tables);
        assert!(!outcome.changed, "rdmult {rdmult}");
        assert_eq!(fixture.qcoeff, first);
    }
}

#[test]
fn empty_block_costs_only_the_skip_flag() {
    let mut tables = CoeffCostTables::flat(300);
    tables.txb_skip[0] = [700, 45];
    let mut fixture = BlockFixture::new(
        ScanOrder::zigzag(TxSize::Tx8x8),
        vec![0; 64],
        vec![3; 64],
        params(TxSize::Tx8x8, DEQUANT, DEQUANT, 1 << 10),
    );
    assert_eq!(fixture.eob, 0);
    let outcome = optimize(&mut fixture, &tables);
    assert_eq!(outcome, OptimizeOutcome { changed: false, eob: 0 });
    let view = fixture.view();
    assert_eq!(total_block_cost(&view, &tables), 45);
    assert_eq!(view.entropy_context(), 0);
}

#[test]
fn prohibitive_lambda_skips_default_scan_block() {
    let tables = CoeffCostTables::flat(400);
    let scan = ScanOrder::new(&DEFAULT_SCAN_8X8).expect("default scan is a permutation");
    let mut q = vec![0i32; 64];
    q[0] = -3;
    q[1] = 2;
    q[8] = 1;
    q[9] = -1;
    let t: Vec<i32> = q.iter().map(|&l| l * DEQUANT + 2).collect();
    let mut fixture = BlockFixture::new(scan, q, t, params(TxSize::Tx8x8, DEQUANT, DEQUANT, 1 << 30));

    let outcome = optimize(&mut fixture, &tables);
    assert_eq!(outcome, OptimizeOutcome { changed: true, eob: 0 });
    assert!(fixture.qcoeff.iter().all(|&l| l == 0));
    assert!(fixture.dqcoeff.iter().all(|&d| d == 0));
}

#[test]
fn entropy_context_reflects_optimized_levels() {
    let tables = CoeffCostTables::flat(300);
    let mut fixture = tail_block(4096);
    assert_eq!(fixture.view().entropy_context(), 6 + 128);
    optimize(&mut fixture, &tables);
    assert_eq!(fixture.view().entropy_context(), 5 + 128);

    let mut negative = fixture.with_levels({
        let mut q = fixture.qcoeff.clone();
        q[0] = -5;
        q
    });
    assert_eq!(negative.view().entropy_context(), 5 | 64);
}

#[test]
fn chroma_multiplier_changes_the_decision() {
    let tables = CoeffCostTables::flat(300);
    // Intra chroma scales by 13/4, intra luma by 17/4.
    assert_eq!(plane_rdmult(1000, false, 1), 3250);
    assert_eq!(plane_rdmult(1000, false, 0), 4250);

    let mut luma = tail_block(plane_rdmult(100, false, 0));
    let mut chroma = tail_block(plane_rdmult(100, true, 1));
    assert_eq!(luma.params.rdmult, 425);
    assert_eq!(chroma.params.rdmult, 250);
    // Neither is large enough to pay for 32 units of squared error.
    assert!(!optimize(&mut luma, &tables).changed);
    assert!(!optimize(&mut chroma, &tables).changed);

    let mut strong = tail_block(plane_rdmult(1000, false, 0));
    assert!(optimize(&mut strong, &tables).changed);
    assert_eq!(strong.eob, 1);
}

#[test]
fn dry_run_reports_without_writing() {
    let tables = CoeffCostTables::flat(300);
    let mut fixture = tail_block(4096);
    let before = fixture.clone();
    let outcome = {
        let mut view = fixture.view();
        let config = OptimizeConfig {
            fast_mode: false,
            run_mode: RunMode::DryRun,
        };
        optimize_txb(&mut view, &tables, &config)
    };
    assert_eq!(outcome, OptimizeOutcome { changed: true, eob: 1 });
    assert_eq!(fixture.qcoeff, before.qcoeff);
    assert_eq!(fixture.dqcoeff, before.dqcoeff);
}

#[test]
fn malformed_blocks_are_rejected() {
    let scan = ScanOrder::raster(TxSize::Tx4x4);
    let p = params(TxSize::Tx4x4, DEQUANT, DEQUANT, 512);
    let t = [0i32; 16];

    let mut q = [0i32; 16];
    q[4] = 2;
    let mut dq = [0i32; 16];
    let err = TxbView::new(&mut q, &mut dq, &t, &scan, 2, p).unwrap_err();
    assert_eq!(err, TxbError::EobMismatch { eob: 2, expected: 5 });

    let mut short = [0i32; 8];
    let err = TxbView::new(&mut short, &mut dq, &t, &scan, 0, p).unwrap_err();
    assert!(matches!(err, TxbError::BufferTooSmall { buffer: "qcoeff", len: 8, needed: 16 }));

    let mut q = [0i32; 16];
    let bad_ctx = coefopt::TxbParams {
        txb_ctx: TxbCtx {
            txb_skip_ctx: 13,
            dc_sign_ctx: 0,
        },
        ..p
    };
    let err = TxbView::new(&mut q, &mut dq, &t, &scan, 0, bad_ctx).unwrap_err();
    assert_eq!(err.to_string(), "txb_skip context 13 out of range (limit 13)");

    let err = ScanOrder::new(&[0, 1, 1, 3]).unwrap_err();
    assert!(matches!(err, TxbError::InvalidScan { .. }));
}
