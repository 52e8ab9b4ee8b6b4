use sirenia_stress::coarsen::{MIN_NODES, coarsen};
use sirenia_stress::{StressGraph, StressOptions, layout};

fn grid(w: usize, h: usize) -> StressGraph {
    let mut g = StressGraph::new();
    for i in 0..w * h {
        g.add_node(format!("n{i}"));
    }
    for y in 0..h {
        for x in 0..w {
            let v = y * w + x;
            if x + 1 < w {
                g.add_edge(v, v + 1);
            }
            if y + 1 < h {
                g.add_edge(v, v + w);
            }
        }
    }
    g
}

#[test]
fn each_level_merges_matched_neighbours() {
    let adj = grid(10, 10).adjacency();
    let levels = coarsen(&adj, 5);
    assert!(!levels.is_empty());

    let first = &levels[0];
    assert_eq!(first.parent.len(), 100);
    assert!(first.len() <= 75);
    let mut members = vec![Vec::new(); first.len()];
    for (v, &p) in first.parent.iter().enumerate() {
        members[p].push(v);
    }
    for group in &members {
        assert!(matches!(group.len(), 1 | 2), "{group:?}");
        if let [a, b] = group[..] {
            assert!(adj[a].iter().any(|(u, _)| *u == b), "{a} and {b} are not neighbours");
        }
    }
}

#[test]
fn coarse_graphs_stay_symmetric() {
    let adj = grid(12, 8).adjacency();
    for level in coarsen(&adj, 4) {
        for (a, row) in level.adj.iter().enumerate() {
            for &(b, len) in row {
                assert_ne!(a, b);
                assert!(level.adj[b].iter().any(|&(c, l)| c == a && l == len));
            }
            assert_eq!(row.len(), level.weights[a].len());
        }
    }
}

#[test]
fn coarsening_stops_at_small_graphs() {
    let small = grid(5, 5).adjacency();
    assert!(coarsen(&small, 10).is_empty());

    let adj = grid(20, 20).adjacency();
    let levels = coarsen(&adj, 10);
    let last = levels.last().unwrap();
    // Only the final level may drop below the threshold.
    for level in &levels[..levels.len() - 1] {
        assert!(level.len() >= MIN_NODES);
    }
    assert!(last.len() < 400);
    assert_eq!(coarsen(&adj, 1).len(), 1);
}

#[test]
fn multilevel_start_lays_out_a_large_grid() {
    let g = grid(10, 10);
    let opts = StressOptions {
        levels: 3,
        ..StressOptions::default()
    };
    let l = layout(&g, &opts).unwrap();
    let mean = g
        .edges
        .iter()
        .map(|e| {
            let (ax, ay) = l.xy(e.a);
            let (bx, by) = l.xy(e.b);
            (ax - bx).hypot(ay - by)
        })
        .sum::<f64>()
        / g.edges.len() as f64;
    assert!(mean > 0.7 * 72.0 && mean < 1.3 * 72.0, "{mean}");
    assert!(l.coords.iter().flatten().all(|c| c.is_finite()));
}
