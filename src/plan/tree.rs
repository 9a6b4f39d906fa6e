//! Plan tree - root ownership and the tree-wide compilation passes
//!
//! ## Pipeline
//!
//! ```text
//! planner-built tree (unresolved)
//!   → PlanTree::generate_output_schemas()   (pass 1, bottom-up)
//!   → PlanTree::resolve_column_indexes()    (pass 2, whole tree)
//!   → PlanTree::to_document()               (ship to replicas)
//! ```
//!
//! The passes are strictly ordered: pass 2 refuses to start until every node
//! in the tree carries a finalized output schema, because binding a column
//! reference needs the finalized schema of the child that produces it.

use std::collections::HashSet;

use tracing::debug;

use crate::catalog::Catalog;
use crate::plan::error::{ColumnResolutionError, InvariantViolation, PlanError, SchemaError};
use crate::plan::explain::ExplainRenderer;
use crate::plan::node::{NodeId, PlanNode, PlanNodeType};

/// A rooted, ordered tree of plan nodes
///
/// Owns the root (and through it the whole tree). Node ids are validated to
/// be unique at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanTree {
    pub(crate) root: PlanNode,
    pub(crate) resolved: bool,
}

impl PlanTree {
    /// Take ownership of a planner-built tree
    ///
    /// Fails fast on a node id collision - that is a planner bug, not a
    /// recoverable input error.
    pub fn new(root: PlanNode) -> Result<Self, InvariantViolation> {
        if let Some(id) = duplicate_id(&root) {
            return Err(InvariantViolation::DuplicateNodeId { id });
        }
        Ok(Self {
            root,
            resolved: false,
        })
    }

    /// The root node
    pub fn root(&self) -> &PlanNode {
        &self.root
    }

    /// Whether both compilation passes have completed
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    /// Pass 1: compute every node's output schema, bottom-up
    ///
    /// On failure no node keeps a schema - the tree is restored to its
    /// pre-pass state so a later retry (e.g. against refreshed catalog
    /// metadata) starts clean.
    pub fn generate_output_schemas(&mut self, catalog: &Catalog) -> Result<(), SchemaError> {
        fn walk(node: &mut PlanNode, catalog: &Catalog) -> Result<(), SchemaError> {
            for child in &mut node.children {
                walk(child, catalog)?;
            }
            node.generate_output_schema(catalog)?;
            node.compute_determinism();
            Ok(())
        }

        match walk(&mut self.root, catalog) {
            Ok(()) => {
                debug!(nodes = self.node_count(), "generated plan output schemas");
                Ok(())
            }
            Err(err) => {
                self.clear_output_schemas();
                Err(err)
            }
        }
    }

    /// Pass 2: bind every column reference to an input row position
    ///
    /// Requires pass 1 to have completed for the whole tree; fails before
    /// binding anything if any node lacks a schema.
    pub fn resolve_column_indexes(&mut self) -> Result<(), ColumnResolutionError> {
        fn check_schemas(node: &PlanNode) -> Result<(), ColumnResolutionError> {
            if node.output_schema.is_none() {
                return Err(ColumnResolutionError::SchemaNotGenerated { node_id: node.id });
            }
            for child in &node.children {
                check_schemas(child)?;
            }
            Ok(())
        }

        fn walk(node: &mut PlanNode) -> Result<(), ColumnResolutionError> {
            node.resolve_column_indexes()?;
            for child in &mut node.children {
                walk(child)?;
            }
            Ok(())
        }

        check_schemas(&self.root)?;
        walk(&mut self.root)?;
        self.resolved = true;
        debug!(nodes = self.node_count(), "resolved plan column indexes");
        Ok(())
    }

    /// Run both passes in order
    pub fn compile(&mut self, catalog: &Catalog) -> Result<(), PlanError> {
        self.generate_output_schemas(catalog)?;
        self.resolve_column_indexes()?;
        Ok(())
    }

    /// Render the tree as indented EXPLAIN text
    pub fn explain(&self) -> String {
        ExplainRenderer::render(self)
    }

    /// Find a node by id
    pub fn find_node(&self, id: NodeId) -> Option<&PlanNode> {
        fn find(node: &PlanNode, id: NodeId) -> Option<&PlanNode> {
            if node.id == id {
                return Some(node);
            }
            node.children.iter().find_map(|c| find(c, id))
        }
        find(&self.root, id)
    }

    /// Collect every node of a given operator kind, in pre-order
    pub fn nodes_of_type(&self, node_type: PlanNodeType) -> Vec<&PlanNode> {
        fn collect<'a>(node: &'a PlanNode, node_type: PlanNodeType, out: &mut Vec<&'a PlanNode>) {
            if node.node_type() == node_type {
                out.push(node);
            }
            for child in &node.children {
                collect(child, node_type, out);
            }
        }
        let mut out = Vec::new();
        collect(&self.root, node_type, &mut out);
        out
    }

    /// Total number of nodes
    pub fn node_count(&self) -> usize {
        fn count(node: &PlanNode) -> usize {
            1 + node.children.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }

    /// Depth of the tree (a lone root has depth 1)
    pub fn depth(&self) -> usize {
        fn depth(node: &PlanNode) -> usize {
            1 + node.children.iter().map(depth).max().unwrap_or(0)
        }
        depth(&self.root)
    }

    fn clear_output_schemas(&mut self) {
        fn clear(node: &mut PlanNode) {
            node.output_schema = None;
            for child in &mut node.children {
                clear(child);
            }
        }
        clear(&mut self.root);
        self.resolved = false;
    }
}

/// First id that appears more than once in the subtree, if any
pub(crate) fn duplicate_id(root: &PlanNode) -> Option<NodeId> {
    fn walk(node: &PlanNode, seen: &mut HashSet<NodeId>) -> Option<NodeId> {
        if !seen.insert(node.id) {
            return Some(node.id);
        }
        node.children.iter().find_map(|c| walk(c, seen))
    }
    let mut seen = HashSet::new();
    walk(root, &mut seen)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ColumnDef, DataType, TableDef};
    use crate::plan::node::Operator;

    fn test_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        let users = TableDef::new("users")
            .column(ColumnDef::new("id", DataType::Int).nullable(false))
            .column(ColumnDef::new("name", DataType::Varchar(100)));
        catalog.create_table(users).unwrap();
        catalog
    }

    fn scan(id: NodeId, table: &str) -> PlanNode {
        PlanNode::new(
            id,
            Operator::TableScan {
                table: table.to_string(),
                filter: None,
            },
        )
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let tree = PlanTree::new(
            PlanNode::new(
                1,
                Operator::Limit {
                    limit: Some(1),
                    offset: None,
                },
            )
            .with_child(scan(1, "users")),
        );
        assert!(matches!(
            tree,
            Err(InvariantViolation::DuplicateNodeId { id: 1 })
        ));
    }

    #[test]
    fn test_resolution_requires_pass_one() {
        let mut tree = PlanTree::new(scan(1, "users")).unwrap();
        let err = tree.resolve_column_indexes().unwrap_err();
        assert!(matches!(
            err,
            ColumnResolutionError::SchemaNotGenerated { node_id: 1 }
        ));
        assert!(!tree.is_resolved());
    }

    #[test]
    fn test_failed_pass_one_leaves_no_schemas() {
        let catalog = test_catalog();
        // Left child resolves, right child names a missing table
        let mut tree = PlanTree::new(
            PlanNode::new(
                3,
                Operator::Join {
                    join_type: crate::plan::node::JoinType::Inner,
                    condition: None,
                },
            )
            .with_child(scan(1, "users"))
            .with_child(scan(2, "missing")),
        )
        .unwrap();

        assert!(tree.generate_output_schemas(&catalog).is_err());

        // The users scan succeeded before the failure but was rolled back
        assert!(tree.find_node(1).unwrap().output_schema().is_none());
        assert!(tree.find_node(2).unwrap().output_schema().is_none());
        assert!(tree.find_node(3).unwrap().output_schema().is_none());
    }

    #[test]
    fn test_tree_helpers() {
        let mut tree = PlanTree::new(
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

        assert_eq!(tree.node_count(), 3);
        assert_eq!(tree.depth(), 3);
        assert_eq!(tree.find_node(2).unwrap().id(), 2);
        assert!(tree.find_node(99).is_none());
        assert_eq!(tree.nodes_of_type(PlanNodeType::TableScan).len(), 1);
        assert_eq!(tree.nodes_of_type(PlanNodeType::Join).len(), 0);

        let catalog = test_catalog();
        // Projection with no expressions still compiles; the point here is
        // that compile() runs both passes in order
        tree.compile(&catalog).unwrap();
        assert!(tree.is_resolved());
    }
}
