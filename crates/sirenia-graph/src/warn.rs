//! Once-per-kind warning stream.
//!
//! A graph with many similar problems (say, a hundred malformed `pos` values) should produce one
//! diagnostic, not a hundred. The first warning of each [`WarningKind`] is forwarded to `tracing`;
//! later ones are only counted.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum WarningKind {
    MalformedAttribute,
    MalformedPos,
    CellTooSmall,
    TableTooSmall,
    Unsupported,
    ImageSize,
    HtmlLabel,
    UnknownPort,
    Layout,
    /// The layout had to bend its own constraints to finish.
    InternalConsistency,
}

impl WarningKind {
    fn bit(self) -> u32 {
        1u32 << (self as u32)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Warnings {
    seen: u32,
    messages: Vec<(WarningKind, String)>,
    suppressed: usize,
}

impl Warnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning. Returns `true` if this is the first warning of its kind.
    pub fn warn(&mut self, kind: WarningKind, message: impl Into<String>) -> bool {
        if self.seen & kind.bit() != 0 {
            self.suppressed += 1;
            return false;
        }
        let message = message.into();
        tracing::warn!(kind = ?kind, "{message}");
        self.seen |= kind.bit();
        self.messages.push((kind, message));
        true
    }

    pub fn has(&self, kind: WarningKind) -> bool {
        self.seen & kind.bit() != 0
    }

    pub fn messages(&self) -> &[(WarningKind, String)] {
        &self.messages
    }

    pub fn suppressed(&self) -> usize {
        self.suppressed
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Folds warnings gathered by a nested context into this stream, keeping the once-per-kind rule.
    pub fn absorb(&mut self, other: Warnings) {
        for (kind, msg) in other.messages {
            self.warn(kind, msg);
        }
        self.suppressed += other.suppressed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_kinds_are_suppressed() {
        let mut w = Warnings::new();
        assert!(w.warn(WarningKind::MalformedPos, "bad pos on a"));
        assert!(!w.warn(WarningKind::MalformedPos, "bad pos on b"));
        assert!(w.warn(WarningKind::CellTooSmall, "cell too small"));
        assert_eq!(w.messages().len(), 2);
        assert_eq!(w.suppressed(), 1);
        assert!(w.has(WarningKind::MalformedPos));
        assert!(!w.has(WarningKind::Unsupported));
    }
}
