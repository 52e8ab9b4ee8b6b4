//! Stress majorization.
//!
//! Each iteration builds `L^Z(x)`, forms `b = L^Z(x) x` and solves `L^w y = b` per axis with
//! conjugate gradients. The same code serves the dense model (every pair present) and the sparse
//! one (2-hop neighbourhoods plus pivots); only the number of terms per row differs.

use crate::distance::PairSet;
use crate::init::Coords;
use crate::rng::XorShift64Star;
use nalgebra::DVector;

/// Below this, two nodes count as coincident and get pushed apart.
const COINCIDENT: f64 = 1e-9;
const JITTER: f64 = 1e-3;

pub(crate) struct Params<'a> {
    pub max_iter: usize,
    pub epsilon: f64,
    pub exp: u8,
    pub cg_tol: f64,
    pub pinned: &'a [bool],
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Outcome {
    pub iterations: usize,
    pub stress: f64,
}

pub(crate) fn weight(d: f64, exp: u8) -> f64 {
    if exp == 1 { 1.0 / d } else { 1.0 / (d * d) }
}

pub(crate) fn dist(x: &Coords, i: usize, j: usize) -> f64 {
    x.iter()
        .map(|axis| {
            let t = axis[i] - axis[j];
            t * t
        })
        .sum::<f64>()
        .sqrt()
}

pub(crate) fn stress(pairs: &PairSet, x: &Coords, exp: u8) -> f64 {
    pairs
        .pairs()
        .map(|(i, j, d)| {
            let e = dist(x, i, j) - d;
            weight(d, exp) * e * e
        })
        .sum()
}

/// Sparse symmetric matrix with an explicit diagonal.
struct Laplacian {
    diag: Vec<f64>,
    off: Vec<Vec<(usize, f64)>>,
}

impl Laplacian {
    fn mul(&self, v: &DVector<f64>) -> DVector<f64> {
        DVector::from_fn(v.len(), |i, _| {
            self.diag[i] * v[i] + self.off[i].iter().map(|&(j, a)| a * v[j]).sum::<f64>()
        })
    }

    fn weights(pairs: &PairSet, exp: u8) -> Laplacian {
        let off: Vec<Vec<(usize, f64)>> = pairs
            .rows
            .iter()
            .map(|row| row.iter().map(|&(j, d)| (j, -weight(d, exp))).collect())
            .collect();
        let diag = off.iter().map(|row| -row.iter().map(|(_, a)| a).sum::<f64>()).collect();
        Laplacian { diag, off }
    }
}

/// Solves `a x = b` starting from `x`, keeping the `fixed` entries of `x` as they are: the
/// system restricted to the free entries. Returns the number of iterations used.
fn conjugate_gradient(
    a: &Laplacian,
    x: &mut DVector<f64>,
    b: &DVector<f64>,
    fixed: &[bool],
    tol: f64,
    max_iter: usize,
) -> usize {
    let mask = |v: &mut DVector<f64>| {
        for (e, &f) in v.iter_mut().zip(fixed) {
            if f {
                *e = 0.0;
            }
        }
    };
    let mut r = b - a.mul(x);
    mask(&mut r);
    let mut p = r.clone();
    let mut rr = r.dot(&r);
    for it in 0..max_iter {
        if rr.sqrt() < tol {
            return it;
        }
        let mut ap = a.mul(&p);
        mask(&mut ap);
        let pap = p.dot(&ap);
        if pap <= 0.0 || !pap.is_finite() {
            return it;
        }
        let alpha = rr / pap;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);
        let next = r.dot(&r);
        p = &r + &p * (next / rr);
        rr = next;
    }
    max_iter
}

/// Runs majorization on `x` in place.
pub(crate) fn majorize(pairs: &PairSet, x: &mut Coords, params: &Params<'_>, rng: &mut XorShift64Star) -> Outcome {
    let n = pairs.len();
    if n < 2 || params.max_iter == 0 {
        return Outcome {
            iterations: 0,
            stress: stress(pairs, x, params.exp),
        };
    }
    let lw = Laplacian::weights(pairs, params.exp);
    let mut old = stress(pairs, x, params.exp);
    let mut iterations = 0;
    while iterations < params.max_iter {
        iterations += 1;
        let (lz, coincident) = distance_laplacian(pairs, x, params.exp);
        for axis in x.iter_mut() {
            let b = lz.mul(axis);
            conjugate_gradient(&lw, axis, &b, params.pinned, params.cg_tol, n);
        }
        for &i in coincident.iter().filter(|&&i| !params.pinned[i]) {
            for axis in x.iter_mut() {
                axis[i] += JITTER * rng.next_f64_signed();
            }
        }
        let new = stress(pairs, x, params.exp);
        tracing::trace!(iteration = iterations, stress = new, "majorization step");
        let converged = old <= 0.0 || (old - new).abs() / old < params.epsilon;
        old = new;
        if converged && coincident.is_empty() {
            break;
        }
    }
    Outcome {
        iterations,
        stress: old,
    }
}

/// `L^Z(x)`, plus the nodes found sitting on a partner.
fn distance_laplacian(pairs: &PairSet, x: &Coords, exp: u8) -> (Laplacian, Vec<usize>) {
    let mut coincident = Vec::new();
    let off: Vec<Vec<(usize, f64)>> = pairs
        .rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.iter()
                .map(|&(j, d)| {
                    let dx = dist(x, i, j);
                    if dx < COINCIDENT {
                        coincident.push(j);
                        (j, 0.0)
                    } else {
                        (j, -weight(d, exp) * d / dx)
                    }
                })
                .collect()
        })
        .collect();
    let diag = off.iter().map(|row| -row.iter().map(|(_, a)| a).sum::<f64>()).collect();
    coincident.sort_unstable();
    coincident.dedup();
    (Laplacian { diag, off }, coincident)
}
