//! Listener-driven tree walk.

use tree_sitter::{Node, Tree};

/// What the walker should do after entering a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    /// Descend into the node's children.
    Children,
    /// Do not descend; the listener has handled the whole subtree.
    Skip,
}

/// Callbacks invoked while walking a parse tree.
pub trait Listener {
    fn enter(&mut self, node: Node<'_>) -> Visit;

    fn exit(&mut self, _node: Node<'_>) {}
}

/// Walk the tree depth-first, pre-order, exactly once.
///
/// Every entered node receives exactly one matching `exit`, including
/// nodes whose children were skipped.
pub fn walk<L: Listener + ?Sized>(tree: &Tree, listener: &mut L) {
    let mut cursor = tree.walk();
    loop {
        let node = cursor.node();
        let descend = listener.enter(node) == Visit::Children;
        if descend && cursor.goto_first_child() {
            continue;
        }
        listener.exit(node);

        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return;
            }
            listener.exit(cursor.node());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_source;

    #[derive(Default)]
    struct Recorder {
        entered: Vec<String>,
        exited: usize,
        skip: &'static str,
    }

    impl Listener for Recorder {
        fn enter(&mut self, node: Node<'_>) -> Visit {
            if node.is_named() {
                self.entered.push(node.kind().to_string());
            }
            if node.kind() == self.skip {
                Visit::Skip
            } else {
                Visit::Children
            }
        }

        fn exit(&mut self, _node: Node<'_>) {
            self.exited += 1;
        }
    }

    #[test]
    fn test_enter_exit_balanced() {
        let parsed = parse_source("package main\n\nfunc a() {}\nfunc b() {}\n").unwrap();
        let mut rec = Recorder::default();
        walk(parsed.tree(), &mut rec);
        assert_eq!(rec.entered.first().map(String::as_str), Some("source_file"));
        assert_eq!(
            rec.entered
                .iter()
                .filter(|k| *k == "function_declaration")
                .count(),
            2
        );

        let mut all = Recorder::default();
        all.skip = "";
        walk(parsed.tree(), &mut all);
        // One exit per enter, named or not.
        let mut count = 0;
        let mut cursor = parsed.tree().walk();
        'outer: loop {
            count += 1;
            if cursor.goto_first_child() {
                continue;
            }
            loop {
                if cursor.goto_next_sibling() {
                    break;
                }
                if !cursor.goto_parent() {
                    break 'outer;
                }
            }
        }
        assert_eq!(all.exited, count);
    }

    #[test]
    fn test_skip_prunes_subtree() {
        let parsed = parse_source("package main\n\nfunc a() { b() }\n").unwrap();
        let mut rec = Recorder {
            skip: "function_declaration",
            ..Default::default()
        };
        walk(parsed.tree(), &mut rec);
        assert!(rec.entered.contains(&"function_declaration".to_string()));
        assert!(!rec.entered.contains(&"call_expression".to_string()));
    }
}
