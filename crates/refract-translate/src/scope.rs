//! Scope tracking for the namespace and package-class wrappers.
//!
//! The wrappers are opened once, on the first top-level declaration, and
//! closed once at the end of the walk. Closing is independent of how many
//! declarations were emitted in between.

use crate::emit::EmissionBuffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// `namespace go.a.b`
    Namespace,
    /// `public static partial class c_package`
    Container,
}

#[derive(Debug, Default)]
pub struct ScopeTracker {
    open: Vec<ScopeKind>,
}

impl ScopeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        !self.open.is_empty()
    }

    /// Number of closing braces currently owed.
    pub fn owed(&self) -> usize {
        self.open.len()
    }

    /// Indent level for text written inside the innermost scope.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Write `header` and an opening brace, and record the owed closer.
    pub fn open(&mut self, buffer: &mut EmissionBuffer, kind: ScopeKind, header: &str) {
        let indent = self.depth();
        buffer.line(indent, header);
        buffer.line(indent, "{");
        self.open.push(kind);
    }

    /// Emit every owed closer, innermost first.
    pub fn close_all(&mut self, buffer: &mut EmissionBuffer) {
        while self.open.pop().is_some() {
            buffer.line(self.depth(), "}");
        }
    }
}
