//! Append-only emission buffer with deferred markers.
//!
//! Text is written while the tree is walked. Content that depends on the
//! whole file (the `using` directives the output ends up needing) is
//! represented by a marker token written once near the top and substituted
//! in [`EmissionBuffer::finalize`].

use std::collections::BTreeSet;

const INDENT: &str = "    ";

/// Placeholder for text decided after the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeferredMarker {
    /// One `using` line per required target namespace.
    Usings,
}

impl DeferredMarker {
    /// The token written into the buffer. NUL bytes cannot occur in Go
    /// source, so the token cannot collide with translated text.
    pub fn token(self) -> &'static str {
        match self {
            DeferredMarker::Usings => "\u{0}refract:usings\u{0}",
        }
    }
}

/// Output text for one file.
#[derive(Debug, Default)]
pub struct EmissionBuffer {
    text: String,
    markers: Vec<DeferredMarker>,
    required: BTreeSet<String>,
}

impl EmissionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, text: &str) {
        self.text.push_str(text);
    }

    /// Write one line at the given indent level.
    pub fn line(&mut self, indent: usize, line: &str) {
        if !line.is_empty() {
            for _ in 0..indent {
                self.text.push_str(INDENT);
            }
            self.text.push_str(line);
        }
        self.text.push('\n');
    }

    pub fn blank(&mut self) {
        self.text.push('\n');
    }

    /// Write a marker. A marker already present is not written twice.
    pub fn defer(&mut self, marker: DeferredMarker) {
        if self.markers.contains(&marker) {
            return;
        }
        self.markers.push(marker);
        self.text.push_str(marker.token());
    }

    /// Record that the output needs `using <namespace>;`.
    pub fn require(&mut self, namespace: impl Into<String>) {
        self.required.insert(namespace.into());
    }

    pub fn required(&self) -> impl Iterator<Item = &str> {
        self.required.iter().map(String::as_str)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Resolve every marker and return the final text.
    ///
    /// The marker token is always stripped, including when nothing was
    /// required.
    pub fn finalize(self) -> String {
        let mut text = self.text;
        for marker in &self.markers {
            let replacement = match marker {
                DeferredMarker::Usings => self
                    .required
                    .iter()
                    .map(|ns| format!("\nusing {};", ns))
                    .collect::<String>(),
            };
            text = text.replacen(marker.token(), &replacement, 1);
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_stripped_when_nothing_required() {
        let mut buf = EmissionBuffer::new();
        buf.push_str("using static go.builtin;");
        buf.defer(DeferredMarker::Usings);
        buf.blank();
        let out = buf.finalize();
        assert_eq!(out, "using static go.builtin;\n");
        assert!(!out.contains('\u{0}'));
    }

    #[test]
    fn test_each_requirement_inserted_once() {
        let mut buf = EmissionBuffer::new();
        buf.push_str("header");
        buf.defer(DeferredMarker::Usings);
        buf.blank();
        buf.line(1, "body");
        for _ in 0..5 {
            buf.require("System");
            buf.require("System.Runtime.CompilerServices");
        }
        let out = buf.finalize();
        assert_eq!(out.matches("using System;").count(), 1);
        assert_eq!(
            out.matches("using System.Runtime.CompilerServices;").count(),
            1
        );
        assert!(out.starts_with("header\nusing System;\nusing System.Runtime"));
        assert!(out.ends_with("    body\n"));
    }

    #[test]
    fn test_marker_written_once() {
        let mut buf = EmissionBuffer::new();
        buf.defer(DeferredMarker::Usings);
        buf.defer(DeferredMarker::Usings);
        assert_eq!(buf.as_str().matches(DeferredMarker::Usings.token()).count(), 1);
    }
}
