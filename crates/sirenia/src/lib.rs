#![forbid(unsafe_code)]

//! `sirenia` lays out attributed graphs.
//!
//! [`layout`] initialises nodes, edges and clusters from their attributes ([`init`]), runs one
//! of the engines and finishes with [`postproc`]. Everything is computed on a copy of the graph
//! and written back only when the run succeeds; warnings are kept either way.
//!
//! # Engines
//!
//! - [`Engine::Dot`]: hierarchical layout ([`sirenia_dot`]).
//! - [`Engine::Stress`]: metric layout by stress minimisation ([`sirenia_stress`]).

pub mod init;
pub mod postproc;
mod stress;

use std::sync::Arc;

pub use sirenia_dot as dot;
pub use sirenia_graph::{
    BBox, Bezier, EdgeId, EstimateMeasurer, FontSpec, Graph, Label, NodeId, Point, SubgraphId,
    TextMeasurer, WarningKind, Warnings,
};
pub use sirenia_html as html;
pub use sirenia_html::{ImageSizer, NoImages};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Layout(#[from] sirenia_graph::Error),
    #[error(transparent)]
    Stress(#[from] sirenia_stress::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    #[default]
    Dot,
    Stress,
}

impl Engine {
    /// `dot`, or `neato`/`stress` for the metric engine.
    pub fn parse(name: &str) -> Option<Engine> {
        match name.trim().to_ascii_lowercase().as_str() {
            "dot" => Some(Engine::Dot),
            "neato" | "stress" => Some(Engine::Stress),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct LayoutOptions {
    pub engine: Engine,
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
    pub image_sizer: Arc<dyn ImageSizer + Send + Sync>,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            engine: Engine::Dot,
            text_measurer: Arc::new(EstimateMeasurer),
            image_sizer: Arc::new(NoImages),
        }
    }
}

impl LayoutOptions {
    pub fn new(engine: Engine) -> Self {
        Self {
            engine,
            ..Self::default()
        }
    }
}

/// Lays `g` out with `engine` and the default measurer.
pub fn layout(g: &mut Graph, engine: Engine) -> Result<()> {
    layout_with(g, &LayoutOptions::new(engine))
}

pub fn layout_with(g: &mut Graph, options: &LayoutOptions) -> Result<()> {
    let mut work = g.clone();
    work.warnings = Warnings::new();
    match run(&mut work, options) {
        Ok(()) => {
            let warnings = std::mem::take(&mut g.warnings);
            *g = work;
            let fresh = std::mem::replace(&mut g.warnings, warnings);
            g.warnings.absorb(fresh);
            Ok(())
        }
        Err(err) => {
            g.warnings.absorb(work.warnings);
            Err(err)
        }
    }
}

fn run(g: &mut Graph, options: &LayoutOptions) -> Result<()> {
    g.validate()?;
    init::init_graph(g, options.text_measurer.as_ref(), options.image_sizer.as_ref());
    match options.engine {
        Engine::Dot => {
            let stats = sirenia_dot::dot_layout(g)?;
            if stats.phase < sirenia_dot::Phase::Position {
                return Ok(());
            }
        }
        Engine::Stress => stress::stress_layout(g)?,
    }
    postproc::dot_postprocess(g);
    tracing::debug!(
        engine = ?options.engine,
        nodes = g.node_count(),
        edges = g.edge_count(),
        width = g.bb.width(),
        height = g.bb.height(),
        "layout done"
    );
    Ok(())
}
