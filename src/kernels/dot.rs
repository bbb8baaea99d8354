//! Integer dot products with wide accumulation.
//!
//! Both variants compute `sum((mat[i] + mat_zp) * (vec[i] + vec_zp))` into an `i64`. The
//! tiled variant handles `R` matrix rows against `NV` vectors per pass, walking the columns
//! in chunks of [`CHUNK`] and finishing the tail element by element. Integer addition is
//! associative, so the tiled variant returns the same bits as [`dot_generic`].
use crate::quant::QuantElem;

/// Inner-loop width of the tiled kernel.
pub const CHUNK: usize = 4;

#[inline(always)]
fn term<M: QuantElem, V: QuantElem>(m: M, v: V, mzp: i32, vzp: i32) -> i64 {
    (m.widen() + mzp) as i64 * (v.widen() + vzp) as i64
}

/// Element-at-a-time path.
#[inline]
pub fn dot_generic<M: QuantElem, V: QuantElem>(mat: &[M], vec: &[V], mzp: i32, vzp: i32) -> i64 {
    let mut acc = 0i64;
    for (&m, &v) in mat.iter().zip(vec) {
        acc += term(m, v, mzp, vzp);
    }
    acc
}

/// `R` rows against `NV` vectors. All slices must share one length.
///
/// Each vector chunk is widened once and reused by every row in the tile, and each row
/// chunk once for every vector.
#[inline]
pub fn dot_tile<M: QuantElem, V: QuantElem, const R: usize, const NV: usize>(
    rows: &[&[M]; R],
    vecs: &[&[V]; NV],
    mzp: i32,
    vzp: i32,
) -> [[i64; NV]; R] {
    let cols = vecs[0].len();
    debug_assert!(rows.iter().all(|r| r.len() == cols));
    debug_assert!(vecs.iter().all(|v| v.len() == cols));
    let main = cols - cols % CHUNK;
    let mut acc = [[0i64; NV]; R];

    let mut c = 0;
    while c < main {
        let mut vw = [[0i32; CHUNK]; NV];
        for j in 0..NV {
            for k in 0..CHUNK { vw[j][k] = vecs[j][c + k].widen() + vzp; }
        }
        for i in 0..R {
            let mut mw = [0i32; CHUNK];
            for k in 0..CHUNK { mw[k] = rows[i][c + k].widen() + mzp; }
            for j in 0..NV {
                let mut part = 0i64;
                for k in 0..CHUNK { part += mw[k] as i64 * vw[j][k] as i64; }
                acc[i][j] += part;
            }
        }
        c += CHUNK;
    }

    // Remainder
    for c in main..cols {
        for i in 0..R {
            for j in 0..NV { acc[i][j] += term(rows[i][c], vecs[j][c], mzp, vzp); }
        }
    }
    acc
}
