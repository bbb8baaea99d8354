//! Flat call-level contract: plain integer arguments in, integer status out.
//!
//! `0` is success; see [`Status`](crate::error::Status) for the negative codes. Precision
//! combinations outside [`SHIPPED`](crate::precision::SHIPPED) return `NotImplemented`.
use crate::config::EngineConfig;
use crate::error::{status_of, KernelError, KernelResult};
use crate::layout::{MatrixRef, OutputLayout, VectorBatch};
use crate::precision::Precision;
use crate::quant::{QuantElem, QuantizedMultiplier};

use super::{mat_x_vec_batch, QuantParams, Rescale};

/// Geometry of one flat call, as signed integers from the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlatShape {
    pub rows: i32,
    pub cols: i32,
    pub row_stride: i32,
    pub vec_count: i32,
    pub vec_offset: i32,
    pub out_offset: i32,
    pub out_stride: i32,
}

impl FlatShape {
    /// Single vector with dense rows and a contiguous output.
    pub fn dense(rows: i32, cols: i32) -> Self {
        Self { rows, cols, row_stride: cols, vec_count: 1, vec_offset: cols, out_offset: rows, out_stride: 1 }
    }
}

fn dim(name: &str, v: i32) -> KernelResult<usize> {
    if v <= 0 { return Err(KernelError::shape(format!("{} must be > 0, got {}", name, v))); }
    Ok(v as usize)
}

#[allow(clippy::too_many_arguments)]
fn call<M, V, O, B>(
    out: &mut [O],
    mat: &[M],
    vec: &[V],
    bias: Option<&[B]>,
    shape: &FlatShape,
    mat_zero_point: i32,
    vec_zero_point: i32,
    rescale: Rescale<'_>,
    out_zero_point: i32,
    cfg: &EngineConfig,
) -> KernelResult<()>
where
    M: QuantElem,
    V: QuantElem,
    O: QuantElem,
    B: Copy + Into<i64>,
{
    let rows = dim("rows", shape.rows)?;
    let cols = dim("cols", shape.cols)?;
    let row_stride = dim("row_stride", shape.row_stride)?;
    let vec_count = dim("vec_count", shape.vec_count)?;
    let vec_offset = dim("vec_offset", shape.vec_offset)?;
    let out_offset = dim("out_offset", shape.out_offset)?;
    let out_stride = dim("out_stride", shape.out_stride)?;
    Precision::of::<M, V, O>().ensure_shipped()?;

    let m = MatrixRef::new(mat, rows, cols, row_stride);
    let vecs = VectorBatch::new(vec, cols, vec_count, vec_offset);
    let q = QuantParams { mat_zero_point, vec_zero_point, out_zero_point, rescale };
    mat_x_vec_batch(out, OutputLayout::new(out_offset, out_stride), &m, &vecs, bias, &q, cfg)
}

/// Per-tensor rescale with a signed `out_shift`.
#[allow(clippy::too_many_arguments)]
pub fn matxvec<M, V, O, B>(
    out: &mut [O],
    mat: &[M],
    vec: &[V],
    bias: Option<&[B]>,
    shape: &FlatShape,
    mat_zero_point: i32,
    vec_zero_point: i32,
    out_multiplier: i32,
    out_shift: i32,
    out_zero_point: i32,
    cfg: &EngineConfig,
) -> i32
where
    M: QuantElem,
    V: QuantElem,
    O: QuantElem,
    B: Copy + Into<i64>,
{
    let rescale = Rescale::PerTensor(QuantizedMultiplier::new(out_multiplier, out_shift));
    status_of(&call(out, mat, vec, bias, shape, mat_zero_point, vec_zero_point, rescale, out_zero_point, cfg))
}

/// Per-channel rescale: `out_multiplier` and `out_shift` carry one entry per row.
#[allow(clippy::too_many_arguments)]
pub fn matxvec_per_channel<M, V, O, B>(
    out: &mut [O],
    mat: &[M],
    vec: &[V],
    bias: Option<&[B]>,
    shape: &FlatShape,
    mat_zero_point: i32,
    vec_zero_point: i32,
    out_multiplier: &[i32],
    out_shift: &[i32],
    out_zero_point: i32,
    cfg: &EngineConfig,
) -> i32
where
    M: QuantElem,
    V: QuantElem,
    O: QuantElem,
    B: Copy + Into<i64>,
{
    let rescale = Rescale::PerChannel { multipliers: out_multiplier, shifts: out_shift };
    status_of(&call(out, mat, vec, bias, shape, mat_zero_point, vec_zero_point, rescale, out_zero_point, cfg))
}
