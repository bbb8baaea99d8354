//! Strided views over caller-owned buffers and the shape checks shared by every entry point.
use crate::error::{KernelError, KernelResult};

/// Row-major matrix with an explicit row stride (`row_stride >= cols`).
#[derive(Debug, Clone, Copy)]
pub struct MatrixRef<'a, T> {
    pub data: &'a [T],
    pub rows: usize,
    pub cols: usize,
    pub row_stride: usize,
}

impl<'a, T> MatrixRef<'a, T> {
    pub fn new(data: &'a [T], rows: usize, cols: usize, row_stride: usize) -> Self {
        Self { data, rows, cols, row_stride }
    }

    pub fn dense(data: &'a [T], rows: usize, cols: usize) -> Self { Self::new(data, rows, cols, cols) }

    /// Elements needed to hold the last row.
    pub fn required_len(&self) -> Option<usize> { span(self.rows, self.row_stride, self.cols) }

    #[inline(always)]
    pub fn row(&self, r: usize) -> &'a [T] {
        let start = r * self.row_stride;
        &self.data[start..start + self.cols]
    }

    pub(crate) fn validate(&self, what: &'static str) -> KernelResult<()> {
        if self.rows == 0 { return Err(KernelError::shape(format!("{}: rows must be > 0", what))); }
        if self.cols == 0 { return Err(KernelError::shape(format!("{}: cols must be > 0", what))); }
        if self.row_stride < self.cols {
            return Err(KernelError::shape(format!("{}: row_stride {} < cols {}", what, self.row_stride, self.cols)));
        }
        let needed = self.required_len().ok_or_else(|| KernelError::shape(format!("{}: extent overflows", what)))?;
        check_len(what, needed, self.data.len())
    }
}

/// One or more vectors of `len` elements spaced `offset` apart.
#[derive(Debug, Clone, Copy)]
pub struct VectorBatch<'a, T> {
    pub data: &'a [T],
    pub len: usize,
    pub count: usize,
    pub offset: usize,
}

impl<'a, T> VectorBatch<'a, T> {
    pub fn new(data: &'a [T], len: usize, count: usize, offset: usize) -> Self {
        Self { data, len, count, offset }
    }

    pub fn single(data: &'a [T], len: usize) -> Self { Self::new(data, len, 1, len) }

    pub fn required_len(&self) -> Option<usize> { span(self.count, self.offset, self.len) }

    #[inline(always)]
    pub fn vector(&self, v: usize) -> &'a [T] {
        let start = v * self.offset;
        &self.data[start..start + self.len]
    }

    pub(crate) fn validate(&self, what: &'static str, cols: usize) -> KernelResult<()> {
        if self.count == 0 { return Err(KernelError::shape(format!("{}: vec_count must be > 0", what))); }
        if self.len != cols {
            return Err(KernelError::shape(format!("{}: vector length {} != cols {}", what, self.len, cols)));
        }
        if self.offset == 0 { return Err(KernelError::shape(format!("{}: vec_offset must be nonzero", what))); }
        let needed = self.required_len().ok_or_else(|| KernelError::shape(format!("{}: extent overflows", what)))?;
        check_len(what, needed, self.data.len())
    }
}

/// Output addressing: element `(row, vec)` lives at `vec * offset + row * stride`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLayout {
    pub offset: usize,
    pub stride: usize,
}

impl OutputLayout {
    pub fn new(offset: usize, stride: usize) -> Self { Self { offset, stride } }

    /// Each vector's results stored contiguously, one block of `rows` per vector.
    pub fn vector_major(rows: usize) -> Self { Self { offset: rows.max(1), stride: 1 } }

    /// `rows x count` row-major result, as a matmul output with `count` columns.
    pub fn row_major(count: usize) -> Self { Self { offset: 1, stride: count.max(1) } }

    #[inline(always)]
    pub fn index(&self, row: usize, vec: usize) -> usize { vec * self.offset + row * self.stride }

    pub fn required_len(&self, rows: usize, count: usize) -> Option<usize> {
        let last = (count.checked_sub(1)?).checked_mul(self.offset)?
            .checked_add((rows.checked_sub(1)?).checked_mul(self.stride)?)?;
        last.checked_add(1)
    }

    /// Every `(row, vec)` pair must map to its own slot.
    ///
    /// Two pairs collide when `dv * offset == dr * stride` for some `0 < dv < count` and
    /// `0 < dr < rows`. The smallest such pair is `(stride / g, offset / g)` with
    /// `g = gcd(offset, stride)`, so one comparison decides it.
    pub(crate) fn validate(&self, rows: usize, count: usize, out_len: usize) -> KernelResult<()> {
        if self.offset == 0 { return Err(KernelError::shape("out_offset must be nonzero")); }
        if self.stride == 0 && rows > 1 { return Err(KernelError::shape("out_stride must be nonzero")); }
        if self.stride > 0 {
            let g = gcd(self.offset, self.stride);
            if self.stride / g < count && self.offset / g < rows {
                return Err(KernelError::shape(format!(
                    "output layout offset={} stride={} overlaps for {} rows x {} vectors", self.offset, self.stride, rows, count
                )));
            }
        }
        let needed = self.required_len(rows, count).ok_or_else(|| KernelError::shape("output extent overflows"))?;
        check_len("out", needed, out_len)
    }
}

/// `(count - 1) * step + extent`, `None` on overflow or empty.
pub fn span(count: usize, step: usize, extent: usize) -> Option<usize> {
    count.checked_sub(1)?.checked_mul(step)?.checked_add(extent)
}

fn gcd(mut a: usize, mut b: usize) -> usize {
    while b != 0 { (a, b) = (b, a % b); }
    a
}

pub(crate) fn check_len(what: &'static str, needed: usize, got: usize) -> KernelResult<()> {
    if got < needed { Err(KernelError::MissingBuffer { what, needed, got }) } else { Ok(()) }
}
