#![forbid(unsafe_code)]

//! Metric graph layout by stress minimisation.
//!
//! Given ideal distances `d_ij` (graph-theoretic by default), [`layout`] places nodes so that
//! `Σ w_ij (‖x_i − x_j‖ − d_ij)²` with `w_ij = d_ij^-p` is small. Solvers: dense or sparse stress
//! majorization, Kamada-Kawai and stochastic gradient descent. Large graphs can be started from a
//! multilevel coarsening. Everything runs on the caller's thread and all randomness comes from a
//! seeded [`XorShift64Star`].

pub mod coarsen;
pub mod distance;
pub mod error;
pub mod graph;
mod init;
mod kk;
mod layout;
mod majorize;
pub mod options;
mod rng;
mod sgd;

pub use error::{Error, Result};
pub use graph::{StressEdge, StressGraph, StressLayout, StressNode};
pub use layout::layout;
pub use options::{Mode, Model, Start, StressOptions};
pub use rng::XorShift64Star;
