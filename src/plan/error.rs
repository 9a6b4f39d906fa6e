//! Plan compilation and codec error types

use thiserror::Error;

use crate::plan::node::{NodeId, PlanNodeType};

/// Errors raised while generating output schemas (pass 1)
///
/// Any of these aborts compilation of the whole tree; no node is left with a
/// partially generated schema.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Referenced base table is absent from the catalog
    #[error("node {node_id}: table '{table}' not found in catalog")]
    TableNotFound { node_id: NodeId, table: String },

    /// Index scan names an index that does not exist on the scanned table
    #[error("node {node_id}: index '{index}' not found on table '{table}'")]
    UnknownIndex {
        node_id: NodeId,
        index: String,
        table: String,
    },

    /// Node has the wrong number of children for its operator
    #[error("node {node_id}: {node_type} expects {expected} children, got {actual}")]
    ChildArity {
        node_id: NodeId,
        node_type: PlanNodeType,
        expected: usize,
        actual: usize,
    },

    /// Aggregate output expression is not an aggregate call
    #[error("node {node_id}: output '{alias}' is not an aggregate call")]
    NotAnAggregate { node_id: NodeId, alias: String },
}

/// Errors raised while binding column references (pass 2)
#[derive(Error, Debug)]
pub enum ColumnResolutionError {
    /// Resolution was attempted before schema generation completed
    #[error("node {node_id}: output schema not generated; run schema generation first")]
    SchemaNotGenerated { node_id: NodeId },

    /// Reference matches no input column
    #[error("node {node_id}: column '{column}' does not match any input column")]
    ColumnNotFound { node_id: NodeId, column: String },

    /// Reference matches more than one input column
    #[error("node {node_id}: column '{column}' matches more than one input column")]
    AmbiguousColumn { node_id: NodeId, column: String },
}

/// Errors raised while loading a plan document
///
/// Loading aborts without constructing a partially-initialized node.
#[derive(Error, Debug)]
pub enum MalformedPlanError {
    /// Variant tag not in the closed operator set
    #[error("unknown plan node type tag '{tag}'")]
    UnknownNodeType { tag: String },

    /// Required per-variant field absent from the node record
    #[error("node {node_id}: missing required field '{field}'")]
    MissingField { node_id: NodeId, field: &'static str },

    /// Two node records share an id
    #[error("duplicate node id {id} in plan document")]
    DuplicateNodeId { id: NodeId },

    /// Determinism flag pair violates the flag invariants
    #[error("node {node_id}: determinism flags are inconsistent")]
    InconsistentDeterminism { node_id: NodeId },

    /// Output schema column descriptors are malformed
    #[error("node {node_id}: malformed output schema: {detail}")]
    MalformedSchema { node_id: NodeId, detail: String },

    /// Document is a diagnostic dump, not an executable plan
    #[error("plan document is a diagnostic dump, not executable")]
    NotExecutionReady,

    /// Document version is not understood by this build
    #[error("unsupported plan document version {version}")]
    UnsupportedVersion { version: u32 },

    /// Underlying JSON was unreadable
    #[error("plan document JSON error: {0}")]
    Json(String),
}

/// Internal invariant breaches - programming faults, not recoverable input
/// errors
#[derive(Error, Debug)]
pub enum InvariantViolation {
    /// Two nodes in one tree share an id
    #[error("duplicate node id {id} in plan tree")]
    DuplicateNodeId { id: NodeId },

    /// Serialization for execution requested on an unresolved tree
    #[error("plan tree is not resolved; refusing to serialize for execution")]
    UnresolvedPlan,
}

/// Any error the plan layer can produce
#[derive(Error, Debug)]
pub enum PlanError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Resolution(#[from] ColumnResolutionError),
    #[error(transparent)]
    Malformed(#[from] MalformedPlanError),
    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}

/// Result type for whole-pipeline plan operations
pub type PlanResult<T> = Result<T, PlanError>;
