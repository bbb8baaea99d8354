use qmatvec::config::EngineConfig;
use qmatvec::layout::MatrixRef;
use qmatvec::ops::{mat_x_vec, QuantParams};
use qmatvec::quant::{QuantElem, QuantizedMultiplier};

fn run<M: QuantElem, V: QuantElem, O: QuantElem>(mat: &[M], vec: &[V], rows: usize, q: QuantParams<'_>) -> Vec<O> {
    let m = MatrixRef::dense(mat, rows, vec.len());
    let mut out = vec![O::default(); rows];
    mat_x_vec(&mut out, &m, vec, None::<&[i32]>, &q, &EngineConfig::default()).unwrap();
    out
}

#[test]
fn extreme_i8_saturates_both_ways() {
    let mat = [127i8; 64].iter().chain([-128i8; 64].iter()).copied().collect::<Vec<_>>();
    let vec = [127i8; 64];
    let out: Vec<i8> = run(&mat, &vec, 2, QuantParams::per_tensor(QuantizedMultiplier::IDENTITY));
    assert_eq!(out, vec![127, -128]);
}

#[test]
fn sixteen_bit_extremes_clamp_in_i16() {
    let mat = [i16::MIN; 16];
    let vec = [i16::MIN; 16];
    // 16 * 2^30 = 2^34 overflows i32 before the clamp into i16
    let out: Vec<i16> = run(&mat, &vec, 1, QuantParams::per_tensor(QuantizedMultiplier::IDENTITY));
    assert_eq!(out, vec![i16::MAX]);
    let neg = [i16::MAX; 16];
    let out: Vec<i16> = run(&mat, &neg, 1, QuantParams::per_tensor(QuantizedMultiplier::IDENTITY));
    assert_eq!(out, vec![i16::MIN]);
}

#[test]
fn asym8_output_clamps_to_u8_range() {
    let mat = [255u8, 255, 0, 0];
    let vec = [255u8, 255];
    let q = QuantParams::per_tensor(QuantizedMultiplier::from_real(0.001).unwrap()).with_zero_points(-128, -128, 200);
    // row 0: 2 * 127 * 127 * 0.001 = 32.3 -> 32 + 200 = 232
    // row 1: 2 * -128 * 127 * 0.001 = -32.512 -> -33 + 200 = 167
    let out: Vec<u8> = run(&mat, &vec, 2, q);
    assert_eq!(out, vec![232, 167]);

    let big = QuantParams::per_tensor(QuantizedMultiplier::IDENTITY).with_zero_points(-128, -128, 128);
    let out: Vec<u8> = run(&mat, &vec, 2, big);
    assert_eq!(out, vec![255, 0]);
}

#[test]
fn out_zero_point_shifts_before_clamp() {
    let mat = [1i8, 1];
    let vec = [60i8, 60];
    let q = QuantParams::per_tensor(QuantizedMultiplier::IDENTITY).with_zero_points(0, 0, 10);
    let out: Vec<i8> = run(&mat, &vec, 1, q);
    assert_eq!(out, vec![127]);
    let q = QuantParams::per_tensor(QuantizedMultiplier::IDENTITY).with_zero_points(0, 0, -128);
    let out: Vec<i8> = run(&mat, &vec, 1, q);
    assert_eq!(out, vec![-8]);
}
