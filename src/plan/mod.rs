//! Plan representation
//!
//! The tree of typed operator nodes the planner produces, the two-pass
//! protocol that turns it into an executable plan, and the document codec
//! that ships it to replicas.
//!
//! ## Pipeline
//!
//! ```text
//! PlanTree::new(root)                      planner hands over the tree
//!   → tree.generate_output_schemas(&catalog)   pass 1: schemas, bottom-up
//!   → tree.resolve_column_indexes()            pass 2: bind column refs
//!   → tree.to_document()                       serialize for execution
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use corvodb_plan::plan::{Operator, PlanNode, PlanTree};
//!
//! let scan = PlanNode::new(1, Operator::TableScan { table: "t".into(), filter: None });
//! let mut tree = PlanTree::new(scan)?;
//! tree.compile(&catalog)?;
//! let doc = tree.to_document()?;
//! ```

pub mod determinism;
pub mod document;
pub mod error;
pub mod explain;
pub mod node;
pub mod schema;
pub mod tree;

pub use determinism::Determinism;
pub use document::{NodeDocument, PlanDocument, SchemaColumnDocument, PLAN_DOCUMENT_VERSION};
pub use error::{
    ColumnResolutionError, InvariantViolation, MalformedPlanError, PlanError, PlanResult,
    SchemaError,
};
pub use explain::ExplainRenderer;
pub use node::{JoinType, NodeId, Operator, PlanNode, PlanNodeType};
pub use schema::{ColumnLookup, InputSchema, NodeSchema, SchemaColumn};
pub use tree::PlanTree;
