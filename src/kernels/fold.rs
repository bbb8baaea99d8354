//! Folding the vector zero-point into the bias.
//!
//! `sum((m + mzp) * (v + vzp)) + b == sum((m + mzp) * v) + (b + vzp * sum(m + mzp))`, so a
//! bias precomputed once per weight matrix lets every later call run with `vec_zero_point = 0`
//! and produce the same bits. Recurrent layers reuse one folded bias across timesteps.
use std::mem::size_of;

use crate::error::{KernelError, KernelResult};
use crate::layout::{check_len, MatrixRef};
use crate::ops::check_zero_point;
use crate::quant::QuantElem;

/// Bytes the folded-bias buffer for `rows` outputs occupies. This is a hard bound.
pub fn folded_bias_scratch_bytes(rows: usize) -> KernelResult<usize> {
    if rows == 0 { return Err(KernelError::shape("rows must be > 0")); }
    rows.checked_mul(size_of::<i64>()).ok_or_else(|| KernelError::shape("rows overflow scratch size"))
}

/// Write `bias[r] + vec_zp * sum(mat[r, :] + mat_zp)` into `out[r]`.
///
/// `V` is the vector element type the folded bias will later be used with; it only bounds
/// `vec_zero_point`.
pub fn fold_bias<M, V, B>(
    out: &mut [i64],
    mat: &MatrixRef<'_, M>,
    bias: Option<&[B]>,
    mat_zero_point: i32,
    vec_zero_point: i32,
) -> KernelResult<()>
where
    M: QuantElem,
    V: QuantElem,
    B: Copy + Into<i64>,
{
    mat.validate("mat")?;
    check_len("folded bias", mat.rows, out.len())?;
    if let Some(b) = bias { check_len("bias", mat.rows, b.len())?; }
    check_zero_point::<M>("mat", mat_zero_point)?;
    check_zero_point::<V>("vec", vec_zero_point)?;

    for (r, slot) in out.iter_mut().take(mat.rows).enumerate() {
        let row_sum: i64 = mat.row(r).iter().map(|&m| (m.widen() + mat_zero_point) as i64).sum();
        let b = bias.map_or(0, |b| b[r].into());
        *slot = b + vec_zero_point as i64 * row_sum;
    }
    Ok(())
}
