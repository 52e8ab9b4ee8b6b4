use crate::coarsen::{self, coarsen, multilevel};
use crate::distance::{all_pairs, pivots, sparse_pairs};
use crate::error::{Error, Result};
use crate::graph::{Adjacency, StressGraph, StressLayout, components, induced};
use crate::init::{self, Coords};
use crate::kk;
use crate::majorize::{self, Outcome};
use crate::options::{MAX_DIM, Mode, Model, Start, StressOptions};
use crate::rng::XorShift64Star;
use crate::sgd;
use nalgebra::DVector;

const POINTS_PER_INCH: f64 = 72.0;
/// Space left between packed components, in inches.
const COMPONENT_GAP: f64 = 1.0;
/// Sparse iterations run on the pivot-MDS start before the main solver takes over.
const SMART_INIT_ITERATIONS: usize = 50;

/// Lays `graph` out by minimising stress, one connected component at a time.
pub fn layout(graph: &StressGraph, opts: &StressOptions) -> Result<StressLayout> {
    graph.validate()?;
    let n = graph.nodes.len();
    if n == 0 {
        return Err(Error::EmptyGraph);
    }
    if opts.dim < 2 || opts.dim > MAX_DIM {
        return Err(Error::InvalidDimension(opts.dim));
    }

    let adj = graph.adjacency();
    let comps = components(&adj);
    let pinned: Vec<bool> = graph.nodes.iter().map(|v| v.pinned && v.pos.is_some()).collect();
    let pack = comps.len() > 1 && !pinned.iter().any(|&p| p);
    let mut rng = XorShift64Star::new(opts.seed());
    let mut out = StressLayout {
        coords: vec![vec![0.0; opts.dim]; n],
        ..StressLayout::default()
    };

    tracing::debug!(nodes = n, edges = graph.edges.len(), components = comps.len(), "stress layout");
    let mut offset = 0.0;
    for comp in &comps {
        let local = induced(&adj, comp);
        let comp_pinned: Vec<bool> = comp.iter().map(|&v| pinned[v]).collect();
        let mut x = solve_component(graph, comp, &local, &comp_pinned, opts, &mut rng, &mut out)?;
        if pack {
            offset = place(&mut x, offset);
        }
        for (i, &v) in comp.iter().enumerate() {
            for (k, axis) in x.iter().enumerate() {
                out.coords[v][k] = axis[i] * POINTS_PER_INCH;
            }
        }
    }
    for (v, node) in graph.nodes.iter().enumerate() {
        if pinned[v]
            && let Some(pos) = &node.pos
        {
            for (k, c) in out.coords[v].iter_mut().enumerate() {
                *c = pos.get(k).copied().unwrap_or(0.0);
            }
        }
    }
    Ok(out)
}

/// Moves a component so its lower-left corner sits at `(offset, 0)`. Returns where the next one
/// starts.
fn place(x: &mut Coords, offset: f64) -> f64 {
    let mut right = offset;
    for (k, axis) in x.iter_mut().enumerate() {
        let lo = axis.min();
        let target = if k == 0 { offset } else { 0.0 };
        axis.add_scalar_mut(target - lo);
        if k == 0 {
            right = axis.max();
        }
    }
    right + COMPONENT_GAP
}

fn solve_component(
    graph: &StressGraph,
    comp: &[usize],
    adj: &Adjacency,
    pinned: &[bool],
    opts: &StressOptions,
    rng: &mut XorShift64Star,
    out: &mut StressLayout,
) -> Result<Coords> {
    let m = comp.len();
    let dim = opts.dim;
    if m == 1 {
        let mut x = vec![DVector::zeros(1); dim];
        if let Some(pos) = &graph.nodes[comp[0]].pos {
            for (k, axis) in x.iter_mut().enumerate() {
                axis[0] = pos.get(k).copied().unwrap_or(0.0) / POINTS_PER_INCH;
            }
        }
        return Ok(x);
    }

    let mode = opts.resolved_mode(m);
    let max_iter = opts.max_iter_for(mode, m);
    let epsilon = opts.epsilon_for(mode, m);
    let major = majorize::Params {
        max_iter,
        epsilon,
        exp: opts.stress_exp,
        cg_tol: opts.cg_tol,
        pinned,
    };

    let mut x = initial(graph, comp, adj, pinned, opts, rng, out);

    let outcome = match mode {
        Mode::Major => {
            let pairs = all_pairs(adj, opts.model)?;
            majorize::majorize(&pairs, &mut x, &major, rng)
        }
        Mode::Sparse => {
            if opts.model == Model::Circuit {
                out.notes
                    .push("circuit model is not available in sparse mode; using shortest paths".to_string());
            }
            let p = pivots(adj, opts.model, opts.pivots);
            let pairs = sparse_pairs(adj, opts.model, &p);
            majorize::majorize(&pairs, &mut x, &major, rng)
        }
        Mode::KamadaKawai => {
            let pairs = all_pairs(adj, opts.model)?;
            let params = kk::Params {
                max_iter,
                epsilon,
                pinned,
            };
            kk::kamada_kawai(&pairs, &mut x, &params)
        }
        Mode::Sgd => {
            let pairs = all_pairs(adj, opts.model)?;
            let params = sgd::Params {
                max_iter,
                epsilon,
                pinned,
            };
            sgd::sgd(&pairs, &mut x, &params, rng)
        }
    };
    tracing::debug!(
        nodes = m,
        ?mode,
        iterations = outcome.iterations,
        stress = outcome.stress,
        "component laid out"
    );
    out.iterations += outcome.iterations;
    out.stress += outcome.stress;
    Ok(x)
}

fn initial(
    graph: &StressGraph,
    comp: &[usize],
    adj: &Adjacency,
    pinned: &[bool],
    opts: &StressOptions,
    rng: &mut XorShift64Star,
    out: &mut StressLayout,
) -> Coords {
    let m = comp.len();
    match opts.start {
        Some(Start::Keep) => return user_positions(graph, comp, opts.dim, rng),
        Some(Start::Regular) => return init::regular(m, opts.dim),
        Some(Start::Random(_)) => return init::random(m, opts.dim, rng),
        None => {}
    }
    if comp.iter().any(|&v| graph.nodes[v].pos.is_some()) {
        return user_positions(graph, comp, opts.dim, rng);
    }
    if opts.levels > 0
        && !pinned.iter().any(|&p| p)
        && let Some(x) = coarsened(adj, opts, rng, out)
    {
        return x;
    }
    if m >= 3
        && let Some(x) = smart(adj, opts, rng)
    {
        return x;
    }
    init::random(m, opts.dim, rng)
}

/// User positions in inches; nodes without one start at random.
fn user_positions(graph: &StressGraph, comp: &[usize], dim: usize, rng: &mut XorShift64Star) -> Coords {
    let mut x = init::random(comp.len(), dim, rng);
    for (i, &v) in comp.iter().enumerate() {
        if let Some(pos) = &graph.nodes[v].pos {
            for (k, axis) in x.iter_mut().enumerate() {
                axis[i] = pos.get(k).copied().unwrap_or(0.0) / POINTS_PER_INCH;
            }
        }
    }
    x
}

/// Pivot-MDS followed by a short run of sparse majorization.
fn smart(adj: &Adjacency, opts: &StressOptions, rng: &mut XorShift64Star) -> Option<Coords> {
    let p = pivots(adj, opts.model, opts.pivots);
    let mut x = init::pivot_mds(&p, adj.len(), opts.dim, rng)?;
    init::shrink_with_jitter(&mut x, rng);
    let pairs = sparse_pairs(adj, opts.model, &p);
    let free = vec![false; adj.len()];
    let params = majorize::Params {
        max_iter: SMART_INIT_ITERATIONS,
        epsilon: opts.epsilon_for(Mode::Sparse, adj.len()),
        exp: opts.stress_exp,
        cg_tol: opts.cg_tol,
        pinned: &free,
    };
    majorize::majorize(&pairs, &mut x, &params, rng);
    Some(x)
}

fn coarsened(adj: &Adjacency, opts: &StressOptions, rng: &mut XorShift64Star, out: &mut StressLayout) -> Option<Coords> {
    let levels = coarsen(adj, opts.levels);
    let params = coarsen::Params {
        model: opts.model,
        max_iter: opts.max_iter_for(Mode::Sparse, adj.len()),
        epsilon: opts.epsilon_for(Mode::Sparse, adj.len()),
        exp: opts.stress_exp,
        cg_tol: opts.cg_tol,
        pivots: opts.pivots,
    };
    let (x, outcome): (Coords, Outcome) = multilevel(adj, &levels, opts.dim, &params, rng)?;
    tracing::debug!(levels = levels.len(), iterations = outcome.iterations, "multilevel start");
    out.iterations += outcome.iterations;
    Some(x)
}
