//! Row/vector tiling.
//!
//! The path is chosen once per call from static properties of the operands. The tiled
//! family walks rows in tiles of 8, 4, 2 and finally 1 (capped by the configured maximum)
//! and, inside each row tile, vectors in pairs and then singly. Every `(row, vec)` pair is
//! handed to the sink exactly once on either path.
use log::debug;
use std::mem::size_of;

use super::dot::{dot_generic, dot_tile, CHUNK};
use crate::config::{EngineConfig, Strategy};
use crate::layout::{MatrixRef, VectorBatch};
use crate::quant::QuantElem;

/// One `mat · vecs` product contributing to the accumulator.
#[derive(Debug, Clone, Copy)]
pub struct Operand<'a, M, V> {
    pub mat: MatrixRef<'a, M>,
    pub vecs: VectorBatch<'a, V>,
    pub mat_zero_point: i32,
    pub vec_zero_point: i32,
}

impl<'a, M, V> Operand<'a, M, V> {
    pub fn new(mat: MatrixRef<'a, M>, vecs: VectorBatch<'a, V>) -> Self {
        Self { mat, vecs, mat_zero_point: 0, vec_zero_point: 0 }
    }

    pub fn with_zero_points(mut self, mat_zero_point: i32, vec_zero_point: i32) -> Self {
        self.mat_zero_point = mat_zero_point;
        self.vec_zero_point = vec_zero_point;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Path {
    Tiled { max_row_tile: usize },
    Generic,
}

#[inline]
fn aligned<T>(s: &[T]) -> bool {
    (s.as_ptr() as usize) % (CHUNK * size_of::<T>()) == 0
}

/// Whether an operand meets the alignment and divisibility the tiled family expects.
pub fn tiled_eligible<M, V>(op: &Operand<'_, M, V>) -> bool {
    op.mat.cols % CHUNK == 0
        && op.mat.row_stride % CHUNK == 0
        && (op.vecs.count == 1 || op.vecs.offset % CHUNK == 0)
        && aligned(op.mat.data)
        && aligned(op.vecs.data)
}

pub fn select_path<M, V>(ops: &[Operand<'_, M, V>], cfg: &EngineConfig) -> Path {
    let tiled = Path::Tiled { max_row_tile: cfg.max_row_tile };
    let path = match cfg.strategy {
        Strategy::Generic => Path::Generic,
        Strategy::Tiled => tiled,
        Strategy::Auto => {
            if ops.iter().all(tiled_eligible) { tiled } else { Path::Generic }
        }
    };
    if let Some(op) = ops.first() {
        debug!(
            "dispatch {:?}: rows={} cols={} vecs={} operands={}",
            path, op.mat.rows, op.mat.cols, op.vecs.count, ops.len()
        );
    }
    path
}

/// Visit every `(row, vec)` pair of the shared iteration space, passing the summed
/// accumulator of all operands. Operands must already be validated and agree on `rows`
/// and vector count.
pub fn run<M, V, F>(path: Path, ops: &[Operand<'_, M, V>], mut sink: F)
where
    M: QuantElem,
    V: QuantElem,
    F: FnMut(usize, usize, i64),
{
    let Some(first) = ops.first() else { return };
    let rows = first.mat.rows;
    let count = first.vecs.count;
    match path {
        Path::Generic => {
            for r in 0..rows {
                for v in 0..count {
                    let acc: i64 = ops.iter().map(|op| {
                        dot_generic(op.mat.row(r), op.vecs.vector(v), op.mat_zero_point, op.vec_zero_point)
                    }).sum();
                    sink(r, v, acc);
                }
            }
        }
        Path::Tiled { max_row_tile } => {
            let mut r = 0;
            if max_row_tile >= 8 { while rows - r >= 8 { vec_tiles::<M, V, F, 8>(ops, r, count, &mut sink); r += 8; } }
            if max_row_tile >= 4 { while rows - r >= 4 { vec_tiles::<M, V, F, 4>(ops, r, count, &mut sink); r += 4; } }
            if max_row_tile >= 2 { while rows - r >= 2 { vec_tiles::<M, V, F, 2>(ops, r, count, &mut sink); r += 2; } }
            while r < rows { vec_tiles::<M, V, F, 1>(ops, r, count, &mut sink); r += 1; }
        }
    }
}

#[inline]
fn vec_tiles<M, V, F, const R: usize>(ops: &[Operand<'_, M, V>], r0: usize, count: usize, sink: &mut F)
where
    M: QuantElem,
    V: QuantElem,
    F: FnMut(usize, usize, i64),
{
    let mut v = 0;
    while count - v >= 2 { tile::<M, V, F, R, 2>(ops, r0, v, sink); v += 2; }
    while v < count { tile::<M, V, F, R, 1>(ops, r0, v, sink); v += 1; }
}

#[inline]
fn tile<M, V, F, const R: usize, const NV: usize>(ops: &[Operand<'_, M, V>], r0: usize, v0: usize, sink: &mut F)
where
    M: QuantElem,
    V: QuantElem,
    F: FnMut(usize, usize, i64),
{
    let mut total = [[0i64; NV]; R];
    for op in ops {
        let rows: [&[M]; R] = std::array::from_fn(|i| op.mat.row(r0 + i));
        let vecs: [&[V]; NV] = std::array::from_fn(|j| op.vecs.vector(v0 + j));
        let acc = dot_tile::<M, V, R, NV>(&rows, &vecs, op.mat_zero_point, op.vec_zero_point);
        for i in 0..R {
            for j in 0..NV { total[i][j] += acc[i][j]; }
        }
    }
    for i in 0..R {
        for j in 0..NV { sink(r0 + i, v0 + j, total[i][j]); }
    }
}
