//! Entry points: validate everything, pick a path once, then drive the dispatcher.
//!
//! Every function here either writes each output element exactly once and returns `Ok`, or
//! returns an error without touching the output.
pub mod flat;

use log::trace;

use crate::config::EngineConfig;
use crate::error::{KernelError, KernelResult};
use crate::kernels::{run, select_path, Operand};
use crate::layout::{check_len, MatrixRef, OutputLayout, VectorBatch};
use crate::quant::{saturate, QuantElem, QuantizedMultiplier};

/// Per-tensor or per-channel rescale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rescale<'a> {
    PerTensor(QuantizedMultiplier),
    /// One multiplier and one signed shift per output row.
    PerChannel { multipliers: &'a [i32], shifts: &'a [i32] },
}

impl<'a> Rescale<'a> {
    #[inline(always)]
    pub fn at(&self, row: usize) -> QuantizedMultiplier {
        match self {
            Rescale::PerTensor(q) => *q,
            Rescale::PerChannel { multipliers, shifts } => QuantizedMultiplier::new(multipliers[row], shifts[row]),
        }
    }

    pub fn validate(&self, rows: usize) -> KernelResult<()> {
        match self {
            Rescale::PerTensor(q) => q.validate(),
            Rescale::PerChannel { multipliers, shifts } => {
                if multipliers.len() != rows || shifts.len() != rows {
                    return Err(KernelError::quant(format!(
                        "per-channel arrays have {} multipliers and {} shifts for {} rows",
                        multipliers.len(), shifts.len(), rows
                    )));
                }
                for r in 0..rows {
                    self.at(r).validate().map_err(|e| KernelError::quant(format!("row {}: {}", r, e)))?;
                }
                Ok(())
            }
        }
    }
}

/// Zero-points and rescale of a single-operand call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantParams<'a> {
    pub mat_zero_point: i32,
    pub vec_zero_point: i32,
    pub out_zero_point: i32,
    pub rescale: Rescale<'a>,
}

impl<'a> QuantParams<'a> {
    pub fn per_tensor(q: QuantizedMultiplier) -> Self {
        Self { mat_zero_point: 0, vec_zero_point: 0, out_zero_point: 0, rescale: Rescale::PerTensor(q) }
    }

    pub fn per_channel(multipliers: &'a [i32], shifts: &'a [i32]) -> Self {
        Self { mat_zero_point: 0, vec_zero_point: 0, out_zero_point: 0, rescale: Rescale::PerChannel { multipliers, shifts } }
    }

    pub fn with_zero_points(mut self, mat: i32, vec: i32, out: i32) -> Self {
        self.mat_zero_point = mat;
        self.vec_zero_point = vec;
        self.out_zero_point = out;
        self
    }
}

pub(crate) fn check_zero_point<T: QuantElem>(what: &str, zp: i32) -> KernelResult<()> {
    if zp < T::ZP_MIN || zp > T::ZP_MAX {
        return Err(KernelError::quant(format!(
            "{} zero-point {} outside [{}, {}] for {}", what, zp, T::ZP_MIN, T::ZP_MAX, T::KIND
        )));
    }
    Ok(())
}

pub(crate) fn check_out_zero_point<O: QuantElem>(zp: i32) -> KernelResult<()> {
    if zp < O::MIN || zp > O::MAX {
        return Err(KernelError::quant(format!("out zero-point {} outside [{}, {}] for {}", zp, O::MIN, O::MAX, O::KIND)));
    }
    Ok(())
}

/// Shape, buffer and zero-point checks shared by every operand-driven call.
fn validate_operands<M: QuantElem, V: QuantElem>(ops: &[Operand<'_, M, V>]) -> KernelResult<(usize, usize)> {
    let first = ops.first().ok_or_else(|| KernelError::shape("no operands"))?;
    let (rows, count) = (first.mat.rows, first.vecs.count);
    for op in ops {
        op.mat.validate("mat")?;
        op.vecs.validate("vec", op.mat.cols)?;
        if op.mat.rows != rows {
            return Err(KernelError::shape(format!("operand rows {} != {}", op.mat.rows, rows)));
        }
        if op.vecs.count != count {
            return Err(KernelError::shape(format!("operand vec_count {} != {}", op.vecs.count, count)));
        }
    }
    Ok((rows, count))
}

fn validate_quant_operands<M: QuantElem, V: QuantElem>(ops: &[Operand<'_, M, V>]) -> KernelResult<()> {
    for op in ops {
        check_zero_point::<M>("mat", op.mat_zero_point)?;
        check_zero_point::<V>("vec", op.vec_zero_point)?;
    }
    Ok(())
}

fn check_bias<B>(bias: Option<&[B]>, rows: usize) -> KernelResult<()> {
    match bias {
        Some(b) => check_len("bias", rows, b.len()),
        None => Ok(()),
    }
}

/// `out[(r, v)] = saturate(rescale_r(bias[r] + sum over operands), out_zp)`.
#[allow(clippy::too_many_arguments)]
fn requantized<M, V, O, B>(
    out: &mut [O],
    layout: OutputLayout,
    ops: &[Operand<'_, M, V>],
    bias: Option<&[B]>,
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
    let (rows, count) = validate_operands(ops)?;
    layout.validate(rows, count, out.len())?;
    check_bias(bias, rows)?;
    validate_quant_operands(ops)?;
    check_out_zero_point::<O>(out_zero_point)?;
    rescale.validate(rows)?;
    cfg.validate()?;

    let (mode, rounding) = (cfg.rescale, cfg.rounding);
    let path = select_path(ops, cfg);
    run(path, ops, |r, v, acc| {
        let b: i64 = bias.map_or(0, |b| b[r].into());
        let y = rescale.at(r).apply(acc.saturating_add(b), mode, rounding);
        out[layout.index(r, v)] = saturate::<O>(y, out_zero_point);
    });
    trace!("requantized {} x {} outputs", rows, count);
    Ok(())
}

/// Single vector: `out[r] = requantize(bias[r] + mat[r, :] · vec)`.
pub fn mat_x_vec<M, V, O, B>(
    out: &mut [O],
    mat: &MatrixRef<'_, M>,
    vec: &[V],
    bias: Option<&[B]>,
    q: &QuantParams<'_>,
    cfg: &EngineConfig,
) -> KernelResult<()>
where
    M: QuantElem,
    V: QuantElem,
    O: QuantElem,
    B: Copy + Into<i64>,
{
    let vecs = VectorBatch::single(vec, mat.cols);
    mat_x_vec_batch(out, OutputLayout::vector_major(mat.rows), mat, &vecs, bias, q, cfg)
}

/// A batch of vectors against the same matrix rows.
pub fn mat_x_vec_batch<M, V, O, B>(
    out: &mut [O],
    layout: OutputLayout,
    mat: &MatrixRef<'_, M>,
    vecs: &VectorBatch<'_, V>,
    bias: Option<&[B]>,
    q: &QuantParams<'_>,
    cfg: &EngineConfig,
) -> KernelResult<()>
where
    M: QuantElem,
    V: QuantElem,
    O: QuantElem,
    B: Copy + Into<i64>,
{
    let op = Operand::new(*mat, *vecs).with_zero_points(q.mat_zero_point, q.vec_zero_point);
    requantized(out, layout, &[op], bias, q.rescale, q.out_zero_point, cfg)
}

/// `out = requantize(bias + mat1 · mat2ᵀ)`, written row-major as `mat1.rows x mat2.rows`.
///
/// Each row of `mat2` is one vector; `mat2.row_stride` plays the role of `vec_offset`.
pub fn matmul<M, V, O, B>(
    out: &mut [O],
    mat1: &MatrixRef<'_, M>,
    mat2: &MatrixRef<'_, V>,
    bias: Option<&[B]>,
    q: &QuantParams<'_>,
    cfg: &EngineConfig,
) -> KernelResult<()>
where
    M: QuantElem,
    V: QuantElem,
    O: QuantElem,
    B: Copy + Into<i64>,
{
    mat2.validate("mat2")?;
    if mat2.cols != mat1.cols {
        return Err(KernelError::shape(format!("mat2 cols {} != mat1 cols {}", mat2.cols, mat1.cols)));
    }
    let vecs = VectorBatch::new(mat2.data, mat2.cols, mat2.rows, mat2.row_stride);
    mat_x_vec_batch(out, OutputLayout::row_major(mat2.rows), mat1, &vecs, bias, q, cfg)
}

/// Two products summed before one requantization: `bias + mat1 · vec1 + mat2 · vec2`.
///
/// Both operands share `rows` and vector count; `cols` and strides may differ. This is the
/// gate pre-activation of a recurrent cell (input weights · x plus recurrent weights · h).
#[allow(clippy::too_many_arguments)]
pub fn mat_x_vec_dual<M, V, O, B>(
    out: &mut [O],
    layout: OutputLayout,
    first: Operand<'_, M, V>,
    second: Operand<'_, M, V>,
    bias: Option<&[B]>,
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
    requantized(out, layout, &[first, second], bias, rescale, out_zero_point, cfg)
}

/// Bias-adjusted accumulators without requantization, at `layout` positions in `acc_out`.
#[allow(clippy::too_many_arguments)]
pub fn mat_x_vec_raw<M, V, B>(
    acc_out: &mut [i64],
    layout: OutputLayout,
    mat: &MatrixRef<'_, M>,
    vecs: &VectorBatch<'_, V>,
    bias: Option<&[B]>,
    mat_zero_point: i32,
    vec_zero_point: i32,
    cfg: &EngineConfig,
) -> KernelResult<()>
where
    M: QuantElem,
    V: QuantElem,
    B: Copy + Into<i64>,
{
    let op = Operand::new(*mat, *vecs).with_zero_points(mat_zero_point, vec_zero_point);
    let ops = [op];
    let (rows, count) = validate_operands(&ops)?;
    layout.validate(rows, count, acc_out.len())?;
    check_bias(bias, rows)?;
    validate_quant_operands(&ops)?;
    cfg.validate()?;

    let path = select_path(&ops, cfg);
    run(path, &ops, |r, v, acc| {
        let b: i64 = bias.map_or(0, |b| b[r].into());
        acc_out[layout.index(r, v)] = acc.saturating_add(b);
    });
    Ok(())
}

/// Requantize and saturate accumulators laid out in blocks of `rows` (element `i` belongs
/// to row `i % rows`).
pub fn requantize_accumulators<O: QuantElem>(
    out: &mut [O],
    acc: &[i64],
    rows: usize,
    rescale: Rescale<'_>,
    out_zero_point: i32,
    cfg: &EngineConfig,
) -> KernelResult<()> {
    if rows == 0 { return Err(KernelError::shape("rows must be > 0")); }
    if acc.is_empty() || acc.len() % rows != 0 {
        return Err(KernelError::shape(format!("{} accumulators is not a whole number of {}-row blocks", acc.len(), rows)));
    }
    check_len("out", acc.len(), out.len())?;
    check_out_zero_point::<O>(out_zero_point)?;
    rescale.validate(rows)?;
    cfg.validate()?;

    for (i, (&a, o)) in acc.iter().zip(out.iter_mut()).enumerate() {
        let y = rescale.at(i % rows).apply(a, cfg.rescale, cfg.rounding);
        *o = saturate::<O>(y, out_zero_point);
    }
    Ok(())
}
