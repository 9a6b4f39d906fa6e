//! CorvoDB plan representation
//!
//! The plan layer sits between the query planner, the catalog, and the
//! execution engine. The planner hands it an unresolved tree of operator
//! nodes; this crate runs the two compilation passes (output schema
//! generation, then column index resolution) and serializes the resolved
//! tree into the plan document shipped to every replica. Replicas executing
//! the same document must produce row-identical results, so the tree also
//! tracks order/content determinism per node.
//!
//! Features:
//! - Typed plan node tree with a closed set of operator variants
//! - Two-pass schema generation and column index resolution
//! - Determinism flag propagation for cross-replica consistency
//! - Lossless JSON plan document codec
//! - EXPLAIN text rendering

pub mod catalog;
pub mod expr;
pub mod plan;
