//! Non-fatal diagnostics collected while translating one file.

use serde::Serialize;
use std::fmt;
use tree_sitter::Node;

/// A warning located in a source file. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file, self.line, self.column, self.message
        )
    }
}

/// Append-only diagnostics sink for one file.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    file: String,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            entries: Vec::new(),
        }
    }

    pub fn warn(&mut self, line: usize, column: usize, message: impl Into<String>) {
        self.entries.push(Diagnostic {
            file: self.file.clone(),
            line,
            column,
            message: message.into(),
        });
    }

    /// Warn at the start of a node.
    pub fn warn_at(&mut self, node: Node<'_>, message: impl Into<String>) {
        let pos = node.start_position();
        self.warn(pos.row + 1, pos.column + 1, message);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_format() {
        let mut diags = Diagnostics::new("main.go");
        diags.warn(3, 7, "unsupported statement");
        let rendered: Vec<String> = diags.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["main.go:3:7: unsupported statement"]);
    }

    #[test]
    fn test_append_order_preserved() {
        let mut diags = Diagnostics::new("a.go");
        diags.warn(2, 1, "first");
        diags.warn(1, 1, "second");
        let messages: Vec<_> = diags.into_vec().into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["first", "second"]);
    }
}
