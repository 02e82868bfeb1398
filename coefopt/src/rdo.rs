use crate::cost::PROB_COST_SHIFT;

/// Distortion is scaled up by this many bits before adding the rate term.
pub const RDDIV_BITS: u32 = 7;

const PLANE_RD_MULT: [[i64; 2]; 2] = [[17, 13], [16, 10]];

/// Fixed-point RD cost `J = lambda * R + D`, rate in cost units.
#[inline]
pub fn rd_cost(rdmult: i64, rate: i64, dist: i64) -> i64 {
    ((rate * rdmult + (1 << (PROB_COST_SHIFT - 1))) >> PROB_COST_SHIFT) + (dist << RDDIV_BITS)
}

/// Scales the frame RD multiplier for a plane (0 = luma, otherwise chroma).
#[inline]
pub fn plane_rdmult(rdmult: i64, is_inter: bool, plane: usize) -> i64 {
    let factor = PLANE_RD_MULT[is_inter as usize][(plane > 0) as usize];
    (rdmult * factor + 2) >> 2
}

#[inline]
pub fn qcoeff_to_dqcoeff(level: i32, dequant: i32, shift: u32) -> i32 {
    let dq = ((level.unsigned_abs() as i64 * dequant as i64) >> shift) as i32;
    if level < 0 { -dq } else { dq }
}

/// Squared reconstruction error in the transform domain.
#[inline]
pub fn coeff_dist(tcoeff: i32, dqcoeff: i32, shift: u32) -> i64 {
    let diff = (tcoeff as i64 - dqcoeff as i64) << shift;
    diff * diff
}
