//! EXPLAIN output formatting
//!
//! Renders a plan tree as indented text for display to users: pre-order,
//! one node per line, children indented one unit deeper than their parent.
//! Rendering never mutates the tree.

use std::fmt::Write;

use crate::plan::node::PlanNode;
use crate::plan::tree::PlanTree;

/// Indent unit prepended once per tree depth level
const INDENT: &str = "  ";

/// Format a plan tree for EXPLAIN output
pub struct ExplainRenderer;

impl ExplainRenderer {
    /// Format a whole tree as a string
    pub fn render(tree: &PlanTree) -> String {
        let mut output = String::new();
        Self::render_node(tree.root(), 0, &mut output);
        output
    }

    fn render_node(node: &PlanNode, indent: usize, out: &mut String) {
        writeln!(out, "{}{}", INDENT.repeat(indent), node.explain_text()).unwrap();
        for child in node.children() {
            Self::render_node(child, indent + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::node::{Operator, PlanNode};

    fn scan(id: u32, table: &str) -> PlanNode {
        PlanNode::new(
            id,
            Operator::TableScan {
                table: table.to_string(),
                filter: None,
            },
        )
    }

    #[test]
    fn test_render_indents_by_depth() {
        let tree = PlanTree::new(
            PlanNode::new(
                3,
                Operator::Limit {
                    limit: Some(10),
                    offset: None,
                },
            )
            .with_child(
                PlanNode::new(
                    2,
                    Operator::Projection {
                        expressions: vec![],
                    },
                )
                .with_child(scan(1, "users")),
            ),
        )
        .unwrap();

        let text = ExplainRenderer::render(&tree);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Limit: limit=10");
        assert_eq!(lines[1], "  Projection: []");
        assert_eq!(lines[2], "    TableScan: users");
    }

    #[test]
    fn test_render_siblings_in_stored_order() {
        let tree = PlanTree::new(
            PlanNode::new(
                3,
                Operator::Join {
                    join_type: crate::plan::node::JoinType::Inner,
                    condition: None,
                },
            )
            .with_child(scan(1, "users"))
            .with_child(scan(2, "orders")),
        )
        .unwrap();

        let text = ExplainRenderer::render(&tree);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[1], "  TableScan: users");
        assert_eq!(lines[2], "  TableScan: orders");
    }
}
