mod common;

use common::{random_bias, random_elems, rng};
use qmatvec::config::{EngineConfig, Strategy};
use qmatvec::layout::{MatrixRef, OutputLayout, VectorBatch};
use qmatvec::ops::{mat_x_vec_batch, QuantParams};
use qmatvec::quant::{QuantElem, QuantizedMultiplier, RescaleMode, Rounding};
use qmatvec::reference;

const ROWS: [usize; 8] = [1, 2, 3, 4, 7, 8, 9, 16];
const COLS: [usize; 4] = [4, 8, 12, 17];

fn sweep<M: QuantElem, V: QuantElem, O: QuantElem>(seed: u64, q: QuantizedMultiplier) {
    let mut rng = rng(seed);
    let modes = [
        EngineConfig::default(),
        EngineConfig::default().with_rescale(RescaleMode::SingleRounding, Rounding::HalfToEven),
        EngineConfig::default().with_rescale(RescaleMode::DoubleRounding, Rounding::HalfAwayFromZero),
    ];
    for &rows in &ROWS {
        for &cols in &COLS {
            for count in 1..=3usize {
                let mat_data = random_elems::<M>(&mut rng, rows * cols);
                let vec_data = random_elems::<V>(&mut rng, count * cols);
                let bias = random_bias(&mut rng, rows, 1 << 16);
                let mat = MatrixRef::dense(&mat_data, rows, cols);
                let vecs = VectorBatch::new(&vec_data, cols, count, cols);
                let params = QuantParams::per_tensor(q).with_zero_points(M::ZP_MAX.min(3), V::ZP_MIN.max(-2), 0);

                for base in modes {
                    let expected: Vec<O> = reference::mat_x_vec_batch(&mat, &vecs, Some(bias.as_slice()), &params, &base);
                    let configs = [
                        EngineConfig { strategy: Strategy::Generic, ..base },
                        EngineConfig { strategy: Strategy::Tiled, max_row_tile: 1, ..base },
                        EngineConfig { strategy: Strategy::Tiled, max_row_tile: 2, ..base },
                        EngineConfig { strategy: Strategy::Tiled, max_row_tile: 4, ..base },
                        EngineConfig { strategy: Strategy::Tiled, max_row_tile: 8, ..base },
                        EngineConfig { strategy: Strategy::Auto, max_row_tile: 8, ..base },
                    ];
                    for cfg in configs {
                        let mut out = vec![O::default(); rows * count];
                        mat_x_vec_batch(&mut out, OutputLayout::vector_major(rows), &mat, &vecs, Some(bias.as_slice()), &params, &cfg)
                            .unwrap();
                        assert_eq!(out, expected, "rows={} cols={} count={} cfg={:?}", rows, cols, count, cfg);
                    }
                }
            }
        }
    }
}

#[test]
fn parity_8x8_8() { sweep::<i8, i8, i8>(1, QuantizedMultiplier::from_real(1.0 / 300.0).unwrap()); }

#[test]
fn parity_8x8_16() { sweep::<i8, i8, i16>(2, QuantizedMultiplier::from_real(0.05).unwrap()); }

#[test]
fn parity_asym8() { sweep::<u8, u8, u8>(3, QuantizedMultiplier::from_real(1.0 / 1024.0).unwrap()); }

#[test]
fn parity_8x16_16() { sweep::<i8, i16, i16>(4, QuantizedMultiplier::from_real(1.0 / 4096.0).unwrap()); }

#[test]
fn parity_16x16_16() { sweep::<i16, i16, i16>(5, QuantizedMultiplier::from_real(1.0 / 65536.0).unwrap()); }

#[test]
fn padded_strides_match_dense() {
    let mut rng = rng(99);
    let (rows, cols, stride, count, offset) = (9, 13, 16, 3, 20);
    let mat_data = random_elems::<i8>(&mut rng, rows * stride);
    let vec_data = random_elems::<i8>(&mut rng, count * offset);
    let dense_mat: Vec<i8> = (0..rows).flat_map(|r| mat_data[r * stride..r * stride + cols].to_vec()).collect();
    let dense_vec: Vec<i8> = (0..count).flat_map(|v| vec_data[v * offset..v * offset + cols].to_vec()).collect();
    let params = QuantParams::per_tensor(QuantizedMultiplier::from_real(0.01).unwrap());
    let cfg = EngineConfig { strategy: Strategy::Tiled, max_row_tile: 8, ..EngineConfig::default() };

    let mut padded = vec![0i8; rows * count];
    let mut dense = vec![0i8; rows * count];
    mat_x_vec_batch(&mut padded, OutputLayout::vector_major(rows), &MatrixRef::new(&mat_data, rows, cols, stride),
        &VectorBatch::new(&vec_data, cols, count, offset), None::<&[i32]>, &params, &cfg).unwrap();
    mat_x_vec_batch(&mut dense, OutputLayout::vector_major(rows), &MatrixRef::dense(&dense_mat, rows, cols),
        &VectorBatch::new(&dense_vec, cols, count, cols), None::<&[i32]>, &params, &EngineConfig::generic()).unwrap();
    assert_eq!(padded, dense);
}

#[test]
fn sliding_window_vectors() {
    let ones = [1i8; 4];
    let window = [1i8, 2, 3, 4, 5, 6];
    let mut out = [0i16; 2];
    mat_x_vec_batch(&mut out, OutputLayout::vector_major(1), &MatrixRef::dense(&ones, 1, 4),
        &VectorBatch::new(&window, 4, 2, 2), None::<&[i32]>,
        &QuantParams::per_tensor(QuantizedMultiplier::IDENTITY), &EngineConfig::default()).unwrap();
    assert_eq!(out, [10, 18]);
}

#[test]
fn overlapping_vectors_match_reference_on_every_path() {
    let mut rng = rng(42);
    for &(rows, cols, count, offset) in &[(9usize, 16usize, 5usize, 4usize), (7, 17, 4, 3), (16, 12, 3, 1)] {
        let mat_data = random_elems::<i8>(&mut rng, rows * cols);
        let vec_data = random_elems::<i16>(&mut rng, (count - 1) * offset + cols);
        let bias = random_bias(&mut rng, rows, 1 << 12);
        let mat = MatrixRef::dense(&mat_data, rows, cols);
        let vecs = VectorBatch::new(&vec_data, cols, count, offset);
        let params = QuantParams::per_tensor(QuantizedMultiplier::from_real(1.0 / 2048.0).unwrap()).with_zero_points(1, -3, 2);
        let base = EngineConfig::default();
        let expected: Vec<i16> = reference::mat_x_vec_batch(&mat, &vecs, Some(bias.as_slice()), &params, &base);

        for cfg in [
            EngineConfig { strategy: Strategy::Generic, ..base },
            EngineConfig { strategy: Strategy::Tiled, max_row_tile: 8, ..base },
            EngineConfig { strategy: Strategy::Auto, max_row_tile: 8, ..base },
        ] {
            let mut out = vec![0i16; rows * count];
            mat_x_vec_batch(&mut out, OutputLayout::vector_major(rows), &mat, &vecs, Some(bias.as_slice()), &params, &cfg).unwrap();
            assert_eq!(out, expected, "rows={} cols={} offset={} cfg={:?}", rows, cols, offset, cfg);
        }
    }
}
