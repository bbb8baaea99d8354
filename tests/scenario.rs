use qmatvec::config::EngineConfig;
use qmatvec::layout::MatrixRef;
use qmatvec::ops::{mat_x_vec, QuantParams};
use qmatvec::quant::QuantizedMultiplier;

#[test]
fn two_by_four_identity_scenario() {
    let mat: [i8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];
    let vec: [i8; 4] = [1, 1, 1, 1];
    let bias = [0i32, 0];
    let m = MatrixRef::new(&mat, 2, 4, 4);
    for q in [QuantizedMultiplier::IDENTITY, QuantizedMultiplier::new(i32::MAX, 0)] {
        for cfg in [EngineConfig::default(), EngineConfig::generic(), EngineConfig::detect()] {
            let mut out = [0i8; 2];
            mat_x_vec(&mut out, &m, &vec, Some(&bias[..]), &QuantParams::per_tensor(q), &cfg).unwrap();
            assert_eq!(out, [10, 26], "multiplier {:?} cfg {:?}", q, cfg);
        }
    }
}

#[test]
fn scenario_into_sixteen_bit_output() {
    let mat: [i8; 8] = [1, 2, 3, 4, 5, 6, 7, 8];
    let vec: [i8; 4] = [1, 1, 1, 1];
    let m = MatrixRef::dense(&mat, 2, 4);
    let mut out = [0i16; 2];
    mat_x_vec(&mut out, &m, &vec, None::<&[i32]>, &QuantParams::per_tensor(QuantizedMultiplier::IDENTITY), &EngineConfig::default()).unwrap();
    assert_eq!(out, [10, 26]);
}
