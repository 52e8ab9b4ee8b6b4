//! Kamada-Kawai: spring energy with stiffness `d^-2` and rest length `d`, minimised one node at a
//! time. Each step picks the free node with the largest gradient and moves it by one
//! Newton-Raphson step.

use crate::distance::PairSet;
use crate::init::Coords;
use crate::majorize::{Outcome, stress};
use nalgebra::{DMatrix, DVector};

const COINCIDENT: f64 = 1e-9;

pub(crate) struct Params<'a> {
    pub max_iter: usize,
    pub epsilon: f64,
    pub pinned: &'a [bool],
}

/// Gradient of the spring between `a` and `b` with respect to `a`.
fn spring(a: &[f64], b: &[f64], d: f64) -> Vec<f64> {
    let delta: Vec<f64> = a.iter().zip(b).map(|(p, q)| p - q).collect();
    let len = norm(&delta);
    if len < COINCIDENT {
        return vec![0.0; a.len()];
    }
    let f = (1.0 - d / len) / (d * d);
    delta.into_iter().map(|t| f * t).collect()
}

fn position(x: &Coords, i: usize) -> Vec<f64> {
    x.iter().map(|axis| axis[i]).collect()
}

fn gradient(pairs: &PairSet, x: &Coords, m: usize) -> Vec<f64> {
    let at = position(x, m);
    let mut g = vec![0.0; x.len()];
    for &(i, d) in &pairs.rows[m] {
        for (o, s) in g.iter_mut().zip(spring(&at, &position(x, i), d)) {
            *o += s;
        }
    }
    g
}

fn norm(g: &[f64]) -> f64 {
    g.iter().map(|t| t * t).sum::<f64>().sqrt()
}

fn hessian(pairs: &PairSet, x: &Coords, m: usize) -> DMatrix<f64> {
    let dim = x.len();
    let mut h = DMatrix::<f64>::zeros(dim, dim);
    for &(i, d) in &pairs.rows[m] {
        let delta: Vec<f64> = x.iter().map(|axis| axis[m] - axis[i]).collect();
        let len = norm(&delta);
        if len < COINCIDENT {
            continue;
        }
        let k = 1.0 / (d * d);
        let l3 = len * len * len;
        for a in 0..dim {
            h[(a, a)] += k * (1.0 - d / len);
            for b in 0..dim {
                h[(a, b)] += k * d * delta[a] * delta[b] / l3;
            }
        }
    }
    h
}

pub(crate) fn kamada_kawai(pairs: &PairSet, x: &mut Coords, params: &Params<'_>) -> Outcome {
    let n = pairs.len();
    let mut grads: Vec<Vec<f64>> = (0..n).map(|m| gradient(pairs, x, m)).collect();
    let mut iterations = 0;
    while iterations < params.max_iter {
        let Some((m, g)) = (0..n)
            .filter(|&m| !params.pinned[m])
            .map(|m| (m, norm(&grads[m])))
            .max_by(|a, b| a.1.total_cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        else {
            break;
        };
        if g < params.epsilon {
            break;
        }
        iterations += 1;

        let h = hessian(pairs, x, m);
        let rhs = -DVector::from_column_slice(&grads[m]);
        let Some(step) = h.lu().solve(&rhs) else {
            tracing::trace!(node = m, "singular Kamada-Kawai Hessian");
            break;
        };
        if step.iter().any(|s| !s.is_finite()) {
            break;
        }

        let old = position(x, m);
        for (axis, s) in x.iter_mut().zip(step.iter()) {
            axis[m] += s;
        }
        let new = position(x, m);
        // Only the springs attached to `m` changed in the other nodes' gradients.
        for &(i, d) in &pairs.rows[m] {
            let at = position(x, i);
            let before = spring(&at, &old, d);
            let after = spring(&at, &new, d);
            for ((gi, a), b) in grads[i].iter_mut().zip(after).zip(before) {
                *gi += a - b;
            }
        }
        grads[m] = gradient(pairs, x, m);
        tracing::trace!(iteration = iterations, node = m, gradient = g, "kamada-kawai step");
    }
    Outcome {
        iterations,
        stress: stress(pairs, x, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::all_pairs;
    use crate::majorize::dist;
    use crate::options::Model;
    use crate::rng::XorShift64Star;

    #[test]
    fn a_triangle_settles_to_unit_sides() {
        let adj: crate::graph::Adjacency = vec![
            vec![(1, 1.0), (2, 1.0)],
            vec![(0, 1.0), (2, 1.0)],
            vec![(0, 1.0), (1, 1.0)],
        ];
        let pairs = all_pairs(&adj, Model::ShortPath).unwrap();
        let mut rng = XorShift64Star::new(4);
        let mut x = crate::init::random(3, 2, &mut rng);
        let pinned = vec![false; 3];
        let params = Params {
            max_iter: 1000,
            epsilon: 1e-6,
            pinned: &pinned,
        };
        kamada_kawai(&pairs, &mut x, &params);
        for (i, j) in [(0, 1), (1, 2), (0, 2)] {
            assert!((dist(&x, i, j) - 1.0).abs() < 1e-3, "{}", dist(&x, i, j));
        }
    }
}
