//! Initial coordinates.

use crate::distance::Pivots;
use crate::rng::XorShift64Star;
use nalgebra::{DMatrix, DVector};

/// Axis-major coordinates: `x[k][i]` is node `i` on axis `k`.
pub(crate) type Coords = Vec<DVector<f64>>;

const POWER_ITERATIONS: usize = 300;
const POWER_TOL: f64 = 1e-9;

pub(crate) fn random(n: usize, dim: usize, rng: &mut XorShift64Star) -> Coords {
    let mut x = vec![DVector::zeros(n); dim];
    for i in 0..n {
        for axis in x.iter_mut() {
            axis[i] = rng.next_f64_unit();
        }
    }
    center(&mut x);
    x
}

/// Nodes on a circle whose circumference gives neighbours about one unit of room.
pub(crate) fn regular(n: usize, dim: usize) -> Coords {
    let mut x = vec![DVector::zeros(n); dim];
    let r = (n as f64 / std::f64::consts::TAU).max(1.0);
    for i in 0..n {
        let a = std::f64::consts::TAU * i as f64 / n as f64;
        x[0][i] = r * a.cos();
        x[1][i] = r * a.sin();
    }
    x
}

pub(crate) fn center(x: &mut Coords) {
    for axis in x.iter_mut() {
        let n = axis.len();
        if n == 0 {
            continue;
        }
        let mean = axis.sum() / n as f64;
        axis.add_scalar_mut(-mean);
    }
}

/// High-dimensional embedding: each node's coordinates are its distances to the pivots. The
/// embedding is projected on its `dim` principal axes, found by power iteration on the
/// covariance matrix.
pub(crate) fn pivot_mds(p: &Pivots, n: usize, dim: usize, rng: &mut XorShift64Star) -> Option<Coords> {
    let k = p.ids.len();
    if k < dim {
        return None;
    }
    let mut emb = DMatrix::<f64>::from_fn(n, k, |i, c| p.dist[c][i]);
    for mut col in emb.column_iter_mut() {
        let mean = col.sum() / n as f64;
        col.add_scalar_mut(-mean);
    }
    let cov = emb.tr_mul(&emb);
    let mut axes: Vec<DVector<f64>> = Vec::with_capacity(dim);
    for _ in 0..dim {
        let v = principal_axis(&cov, &axes, rng)?;
        axes.push(v);
    }
    let x: Coords = axes.iter().map(|v| &emb * v).collect();
    if x.iter().any(|axis| axis.norm() < 1e-12 || axis.iter().any(|v| !v.is_finite())) {
        return None;
    }
    Some(x)
}

fn principal_axis(
    cov: &DMatrix<f64>,
    found: &[DVector<f64>],
    rng: &mut XorShift64Star,
) -> Option<DVector<f64>> {
    let k = cov.nrows();
    let mut v = DVector::<f64>::from_fn(k, |_, _| rng.next_f64_signed());
    orthogonalize(&mut v, found);
    if !normalize(&mut v) {
        return None;
    }
    for _ in 0..POWER_ITERATIONS {
        let mut next = cov * &v;
        orthogonalize(&mut next, found);
        if !normalize(&mut next) {
            return None;
        }
        let settled = next.dot(&v).abs() > 1.0 - POWER_TOL;
        v = next;
        if settled {
            break;
        }
    }
    Some(v)
}

fn orthogonalize(v: &mut DVector<f64>, found: &[DVector<f64>]) {
    for u in found {
        let proj = u.dot(v);
        v.axpy(-proj, u, 1.0);
    }
}

fn normalize(v: &mut DVector<f64>) -> bool {
    let norm = v.norm();
    if norm.is_finite() && norm > 1e-12 {
        *v /= norm;
        true
    } else {
        false
    }
}

/// Scales each axis into `[-1, 1]` and adds a tiny jitter so no two nodes coincide.
pub(crate) fn shrink_with_jitter(x: &mut Coords, rng: &mut XorShift64Star) {
    for axis in x.iter_mut() {
        let max = axis.iter().fold(1.0_f64, |m, v| m.max(v.abs()));
        *axis /= max;
        for v in axis.iter_mut() {
            *v += 1e-6 * rng.next_f64_signed();
        }
    }
    center(x);
}
