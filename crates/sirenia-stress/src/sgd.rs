//! Stochastic gradient descent on the stress terms: every epoch visits each pair once in a
//! shuffled order and moves both ends toward their ideal distance, with a step size that decays
//! exponentially from `1 / w_min` to `epsilon / w_max`.

use crate::distance::PairSet;
use crate::init::Coords;
use crate::majorize::{Outcome, dist, stress, weight};
use crate::rng::XorShift64Star;

const COINCIDENT: f64 = 1e-9;

pub(crate) struct Params<'a> {
    pub max_iter: usize,
    pub epsilon: f64,
    pub pinned: &'a [bool],
}

struct Term {
    i: usize,
    j: usize,
    d: f64,
    w: f64,
}

fn schedule(terms: &[Term], epochs: usize, epsilon: f64) -> Vec<f64> {
    let (w_min, w_max) = terms
        .iter()
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), t| (lo.min(t.w), hi.max(t.w)));
    let eta_max = 1.0 / w_min;
    let eta_min = epsilon / w_max;
    if epochs <= 1 {
        return vec![eta_max; epochs];
    }
    let lambda = (eta_max / eta_min).ln() / (epochs - 1) as f64;
    (0..epochs).map(|t| eta_max * (-lambda * t as f64).exp()).collect()
}

pub(crate) fn sgd(pairs: &PairSet, x: &mut Coords, params: &Params<'_>, rng: &mut XorShift64Star) -> Outcome {
    let mut terms: Vec<Term> = pairs
        .pairs()
        .filter(|&(i, j, _)| !(params.pinned[i] && params.pinned[j]))
        .map(|(i, j, d)| Term { i, j, d, w: weight(d, 2) })
        .collect();
    let mut iterations = 0;
    if terms.is_empty() {
        return Outcome {
            iterations,
            stress: stress(pairs, x, 2),
        };
    }
    for eta in schedule(&terms, params.max_iter, params.epsilon) {
        iterations += 1;
        rng.shuffle(&mut terms);
        let mut moved = 0.0_f64;
        for t in &terms {
            let len = dist(x, t.i, t.j);
            if len < COINCIDENT {
                for axis in x.iter_mut() {
                    if !params.pinned[t.j] {
                        axis[t.j] += 1e-3 * rng.next_f64_signed();
                    }
                }
                continue;
            }
            let mu = (t.w * eta).min(1.0);
            let r = mu * (len - t.d) / (2.0 * len);
            let (si, sj) = match (params.pinned[t.i], params.pinned[t.j]) {
                (true, _) => (0.0, 2.0 * r),
                (_, true) => (2.0 * r, 0.0),
                _ => (r, r),
            };
            for axis in x.iter_mut() {
                let delta = axis[t.i] - axis[t.j];
                axis[t.i] -= si * delta;
                axis[t.j] += sj * delta;
            }
            moved = moved.max(r.abs() * len);
        }
        tracing::trace!(epoch = iterations, eta, moved, "sgd epoch");
        if moved < params.epsilon {
            break;
        }
    }
    Outcome {
        iterations,
        stress: stress(pairs, x, 2),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_sizes_decay_from_max_to_min() {
        let terms = vec![
            Term { i: 0, j: 1, d: 1.0, w: 1.0 },
            Term { i: 0, j: 2, d: 2.0, w: 0.25 },
        ];
        let eta = schedule(&terms, 5, 0.01);
        assert!((eta[0] - 4.0).abs() < 1e-12);
        assert!((eta[4] - 0.01).abs() < 1e-12);
        assert!(eta.windows(2).all(|w| w[0] > w[1]));
    }
}
