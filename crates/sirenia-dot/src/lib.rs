#![forbid(unsafe_code)]

//! Hierarchical ("dot") layout.
//!
//! The pipeline runs in four phases over a [`Graph`](sirenia_graph::Graph) whose nodes are
//! already sized:
//!
//! 1. [`rank::dot_rank`] assigns integer ranks with [`network_simplex::rank`];
//! 2. [`class2::build`] turns the ranked graph into a proper layered graph and
//!    [`mincross::dot_mincross`] orders each rank;
//! 3. [`position::dot_position`] assigns coordinates;
//! 4. [`splines::dot_splines`] routes the edges.
//!
//! [`dot_layout`] runs them all and writes the results back onto the graph's layout records.

pub mod acyclic;
pub mod class2;
pub mod conc;
pub mod config;
pub mod init;
pub mod layout;
pub mod mincross;
pub mod model;
pub mod network_simplex;
mod newrank;
pub mod position;
pub mod rank;
pub mod splines;

pub use config::{ClusterRank, DotConfig, Ordering, RankDir, Ratio, Splines};
pub use init::DotGraph;
pub use layout::{DotStats, Phase, dot_layout};
pub use model::Layered;
pub use network_simplex::{Balance, NsOptions, NsStats, TbBalance};
pub use rank::Ranking;
