//! Straight-line model of the engine, used to cross-check the tiled and generic paths.
//!
//! No validation, no tiling: three nested loops over the textbook formula.
use crate::config::EngineConfig;
use crate::layout::{MatrixRef, VectorBatch};
use crate::ops::QuantParams;
use crate::quant::{saturate, QuantElem};

/// Output in vector-major order: element `(r, v)` at `v * rows + r`.
pub fn mat_x_vec_batch<M, V, O, B>(
    mat: &MatrixRef<'_, M>,
    vecs: &VectorBatch<'_, V>,
    bias: Option<&[B]>,
    q: &QuantParams<'_>,
    cfg: &EngineConfig,
) -> Vec<O>
where
    M: QuantElem,
    V: QuantElem,
    O: QuantElem,
    B: Copy + Into<i64>,
{
    let mut out = vec![O::default(); mat.rows * vecs.count];
    for v in 0..vecs.count {
        for r in 0..mat.rows {
            let mut acc: i64 = bias.map_or(0, |b| b[r].into());
            for c in 0..mat.cols {
                let m = mat.data[r * mat.row_stride + c].widen() as i64 + q.mat_zero_point as i64;
                let x = vecs.data[v * vecs.offset + c].widen() as i64 + q.vec_zero_point as i64;
                acc += m * x;
            }
            let y = q.rescale.at(r).apply(acc, cfg.rescale, cfg.rounding);
            out[v * mat.rows + r] = saturate::<O>(y, q.out_zero_point);
        }
    }
    out
}
