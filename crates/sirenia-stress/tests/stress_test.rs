use sirenia_stress::{Error, Mode, Model, Start, StressGraph, StressLayout, StressOptions, layout};

fn cycle(n: usize) -> StressGraph {
    let mut g = StressGraph::new();
    for i in 0..n {
        g.add_node(format!("n{i}"));
    }
    for i in 0..n {
        g.add_edge(i, (i + 1) % n);
    }
    g
}

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

fn dist(l: &StressLayout, a: usize, b: usize) -> f64 {
    let (ax, ay) = l.xy(a);
    let (bx, by) = l.xy(b);
    (ax - bx).hypot(ay - by)
}

fn assert_hexagon(l: &StressLayout) {
    let sides: Vec<f64> = (0..6).map(|i| dist(l, i, (i + 1) % 6)).collect();
    let mean = sides.iter().sum::<f64>() / 6.0;
    for s in &sides {
        assert!((s / mean - 1.0).abs() < 0.05, "sides {sides:?}");
    }
    for i in 0..6 {
        let two = dist(l, i, (i + 2) % 6) / mean;
        assert!((two / 3f64.sqrt() - 1.0).abs() < 0.05, "two hops {two}");
    }
    for i in 0..3 {
        let three = dist(l, i, i + 3) / mean;
        assert!((three / 2.0 - 1.0).abs() < 0.05, "three hops {three}");
    }
}

#[test]
fn six_cycle_becomes_a_regular_hexagon() {
    let opts = StressOptions {
        mode: Some(Mode::Major),
        start: Some(Start::Random(0)),
        ..StressOptions::default()
    };
    let l = layout(&cycle(6), &opts).unwrap();
    assert_hexagon(&l);
    // The optimum side is a little over one inch.
    let side = dist(&l, 0, 1);
    assert!(side > 72.0 && side < 90.0, "{side}");
}

#[test]
fn regular_start_keeps_the_hexagon() {
    let opts = StressOptions {
        start: Some(Start::Regular),
        ..StressOptions::default()
    };
    assert_hexagon(&layout(&cycle(6), &opts).unwrap());
}

#[test]
fn kamada_kawai_finds_the_hexagon_from_a_circle() {
    let opts = StressOptions {
        mode: Some(Mode::KamadaKawai),
        start: Some(Start::Regular),
        ..StressOptions::default()
    };
    let l = layout(&cycle(6), &opts).unwrap();
    assert_hexagon(&l);
    assert!(l.iterations > 0);
}

#[test]
fn sgd_finds_the_hexagon() {
    let opts = StressOptions {
        mode: Some(Mode::Sgd),
        start: Some(Start::Random(0)),
        ..StressOptions::default()
    };
    assert_hexagon(&layout(&cycle(6), &opts).unwrap());
}

#[test]
fn default_start_spreads_a_grid() {
    let g = grid(3, 3);
    let l = layout(&g, &StressOptions::default()).unwrap();
    let edges: Vec<f64> = g.edges.iter().map(|e| dist(&l, e.a, e.b)).collect();
    let longest = edges.iter().copied().fold(0.0, f64::max);
    assert!(dist(&l, 0, 8) > longest, "{edges:?}");
    assert!(dist(&l, 2, 6) > longest);
}

#[test]
fn sparse_mode_lays_out_a_grid() {
    let g = grid(5, 5);
    let opts = StressOptions {
        mode: Some(Mode::Sparse),
        ..StressOptions::default()
    };
    let l = layout(&g, &opts).unwrap();
    let mean = g.edges.iter().map(|e| dist(&l, e.a, e.b)).sum::<f64>() / g.edges.len() as f64;
    assert!(mean > 0.7 * 72.0 && mean < 1.3 * 72.0, "{mean}");
    assert!(dist(&l, 0, 24) > 3.0 * 72.0);
}

#[test]
fn components_are_packed_side_by_side() {
    let mut g = StressGraph::new();
    for id in ["a", "b", "c", "d"] {
        g.add_node(id);
    }
    g.add_edge(0, 1);
    g.add_edge(2, 3);
    let l = layout(&g, &StressOptions::default()).unwrap();
    let right_of_first = l.xy(0).0.max(l.xy(1).0);
    let left_of_second = l.xy(2).0.min(l.xy(3).0);
    assert!(left_of_second >= right_of_first + 72.0 - 1e-6);
    assert!((dist(&l, 0, 1) - 72.0).abs() < 1.0);
}

#[test]
fn isolated_nodes_still_get_positions() {
    let mut g = StressGraph::new();
    g.add_node("a");
    g.add_node("b");
    let l = layout(&g, &StressOptions::default()).unwrap();
    assert_eq!(l.coords.len(), 2);
    assert!(dist(&l, 0, 1) >= 72.0 - 1e-6);
}

#[test]
fn pinned_nodes_do_not_move() {
    let mut g = StressGraph::new();
    for id in ["a", "b", "c"] {
        g.add_node(id);
    }
    g.add_edge(0, 1);
    g.add_edge(1, 2);
    g.nodes[0].pos = Some(vec![100.0, 200.0]);
    g.nodes[0].pinned = true;
    let l = layout(&g, &StressOptions::default()).unwrap();
    assert_eq!(l.xy(0), (100.0, 200.0));
    assert!((dist(&l, 0, 1) / 72.0 - 1.0).abs() < 0.05);
    assert!((dist(&l, 0, 2) / 144.0 - 1.0).abs() < 0.05);
}

#[test]
fn edge_lengths_drive_the_mds_model() {
    let mut g = StressGraph::new();
    for id in ["a", "b", "c"] {
        g.add_node(id);
    }
    g.add_edge_with_len(0, 1, 1.0);
    g.add_edge_with_len(1, 2, 3.0);
    let opts = StressOptions {
        model: Model::Mds,
        ..StressOptions::default()
    };
    let l = layout(&g, &opts).unwrap();
    assert!(dist(&l, 1, 2) > 2.0 * dist(&l, 0, 1));
}

#[test]
fn circuit_and_subset_models_run() {
    for model in [Model::Circuit, Model::Subset] {
        let opts = StressOptions {
            model,
            ..StressOptions::default()
        };
        let l = layout(&grid(3, 2), &opts).unwrap();
        assert!(l.coords.iter().flatten().all(|c| c.is_finite()));
        assert!(l.notes.is_empty());
    }
}

#[test]
fn circuit_in_sparse_mode_leaves_a_note() {
    let opts = StressOptions {
        mode: Some(Mode::Sparse),
        model: Model::Circuit,
        ..StressOptions::default()
    };
    let l = layout(&cycle(5), &opts).unwrap();
    assert_eq!(l.notes.len(), 1);
}

#[test]
fn three_dimensional_layouts_have_three_coordinates() {
    let opts = StressOptions {
        dim: 3,
        ..StressOptions::default()
    };
    let l = layout(&grid(3, 3), &opts).unwrap();
    assert!(l.coords.iter().all(|c| c.len() == 3));
}

#[test]
fn layouts_are_repeatable() {
    let g = grid(4, 3);
    let opts = StressOptions::default();
    let a = layout(&g, &opts).unwrap();
    let b = layout(&g, &opts).unwrap();
    assert_eq!(a.coords, b.coords);
}

#[test]
fn bad_inputs_are_rejected() {
    assert_eq!(layout(&StressGraph::new(), &StressOptions::default()).unwrap_err(), Error::EmptyGraph);

    let flat = StressOptions {
        dim: 1,
        ..StressOptions::default()
    };
    assert_eq!(layout(&cycle(3), &flat).unwrap_err(), Error::InvalidDimension(1));

    let mut g = cycle(3);
    g.add_edge(0, 7);
    assert_eq!(
        layout(&g, &StressOptions::default()).unwrap_err(),
        Error::MissingEndpoint { edge: 3 }
    );
}
