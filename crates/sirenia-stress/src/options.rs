/// Above this many nodes a component switches to sparse majorization unless a mode is forced.
pub const SPARSE_THRESHOLD: usize = 500;
pub const MAX_DIM: usize = 10;
/// Pivots kept by the sparse model and the smart initial layout.
pub const DEFAULT_PIVOTS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Major,
    Sparse,
    KamadaKawai,
    Sgd,
}

impl Mode {
    /// Parses `mode`. `hier` and `ipsep` are not recognised here; callers map them to a fallback.
    pub fn parse(s: &str) -> Option<Mode> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Some(Mode::Major),
            "sparse" => Some(Mode::Sparse),
            "kk" => Some(Mode::KamadaKawai),
            "sgd" => Some(Mode::Sgd),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Model {
    #[default]
    ShortPath,
    Mds,
    Circuit,
    Subset,
}

impl Model {
    pub fn parse(s: &str) -> Option<Model> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shortpath" => Some(Model::ShortPath),
            "mds" => Some(Model::Mds),
            "circuit" => Some(Model::Circuit),
            "subset" => Some(Model::Subset),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Start {
    /// Use the nodes' own positions; nodes without one start at random.
    Keep,
    /// Evenly spaced on a circle.
    Regular,
    Random(u64),
}

impl Start {
    pub const DEFAULT_SEED: u64 = 1;

    /// Parses `start`: `self`, `regular`, `random`, `randomN` or a bare seed.
    pub fn parse(s: &str) -> Option<Start> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "self" => return Some(Start::Keep),
            "regular" => return Some(Start::Regular),
            "random" => return Some(Start::Random(Self::DEFAULT_SEED)),
            _ => {}
        }
        let digits = s.strip_prefix("random").unwrap_or(&s);
        digits.parse::<u64>().ok().map(Start::Random)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StressOptions {
    /// `None` picks [`Mode::Major`], or [`Mode::Sparse`] above [`SPARSE_THRESHOLD`] nodes.
    pub mode: Option<Mode>,
    pub model: Model,
    /// `None` uses the per-mode default.
    pub max_iter: Option<usize>,
    /// Convergence threshold; `None` uses the per-mode default.
    pub epsilon: Option<f64>,
    /// `None` keeps user positions when there are any and otherwise uses the smart start.
    pub start: Option<Start>,
    /// Exponent `p` of the weights `d^-p`, 1 or 2.
    pub stress_exp: u8,
    pub dim: usize,
    /// Maximum number of coarsening levels; 0 disables the multilevel scheme.
    pub levels: usize,
    /// Residual tolerance of the conjugate-gradient solves.
    pub cg_tol: f64,
    pub pivots: usize,
}

impl Default for StressOptions {
    fn default() -> Self {
        Self {
            mode: None,
            model: Model::ShortPath,
            max_iter: None,
            epsilon: None,
            start: None,
            stress_exp: 2,
            dim: 2,
            levels: 0,
            cg_tol: 1e-3,
            pivots: DEFAULT_PIVOTS,
        }
    }
}

impl StressOptions {
    pub fn resolved_mode(&self, n: usize) -> Mode {
        self.mode.unwrap_or(if n > SPARSE_THRESHOLD {
            Mode::Sparse
        } else {
            Mode::Major
        })
    }

    pub fn seed(&self) -> u64 {
        match self.start {
            Some(Start::Random(s)) => s,
            _ => Start::DEFAULT_SEED,
        }
    }

    pub(crate) fn max_iter_for(&self, mode: Mode, n: usize) -> usize {
        self.max_iter.unwrap_or(match mode {
            Mode::Major | Mode::Sparse => 200,
            Mode::KamadaKawai => 100 * n,
            Mode::Sgd => 30,
        })
    }

    pub(crate) fn epsilon_for(&self, mode: Mode, n: usize) -> f64 {
        self.epsilon.unwrap_or(match mode {
            Mode::Major | Mode::Sparse => 1e-3,
            Mode::KamadaKawai => 1e-4 * n as f64,
            Mode::Sgd => 0.01,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_accepts_seeds_in_every_spelling() {
        assert_eq!(Start::parse("random"), Some(Start::Random(1)));
        assert_eq!(Start::parse("random42"), Some(Start::Random(42)));
        assert_eq!(Start::parse("7"), Some(Start::Random(7)));
        assert_eq!(Start::parse("Self"), Some(Start::Keep));
        assert_eq!(Start::parse("randomx"), None);
    }

    #[test]
    fn large_graphs_default_to_sparse() {
        let opts = StressOptions::default();
        assert_eq!(opts.resolved_mode(10), Mode::Major);
        assert_eq!(opts.resolved_mode(SPARSE_THRESHOLD + 1), Mode::Sparse);
        let forced = StressOptions {
            mode: Some(Mode::Major),
            ..StressOptions::default()
        };
        assert_eq!(forced.resolved_mode(10_000), Mode::Major);
    }
}
