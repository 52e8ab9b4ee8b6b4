#![forbid(unsafe_code)]

//! Graph containers, geometry and shape plumbing shared by the `sirenia` layout engines.
//!
//! Two graph representations live here:
//!
//! - [`Graph`]: the attributed user graph. Engines read attributes from it and write their
//!   results into the per-object layout records.
//! - [`FastGraph`]: an index arena with per-node in/out edge lists, used by the layout passes
//!   for virtual nodes, edge reversal and edge merging.

pub mod alg;
pub mod attrs;
pub mod clip;
pub mod error;
pub mod fast;
pub mod geom;
pub mod graph;
pub mod shape;
pub mod text;
pub mod warn;

pub use attrs::Attrs;
pub use error::{Error, Result};
pub use fast::{FEdge, FNode, FastEdge, FastGraph, FastNode, NodeKind};
pub use geom::{BBox, Bezier, Point, sides};
pub use graph::{
    ClusterLayout, Edge, EdgeId, EdgeLayout, Graph, Label, Node, NodeId, NodeLayout, Subgraph,
    SubgraphId,
};
pub use shape::{NamedPort, Port, Shape, ShapeDesc, ShapeKind};
pub use text::{EstimateMeasurer, FontSpec, TextMeasurer};
pub use warn::{WarningKind, Warnings};

/// Points per inch; user sizes are given in inches.
pub const POINTS_PER_INCH: f64 = 72.0;
