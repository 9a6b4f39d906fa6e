//! Plan document codec
//!
//! The plan document is the on-the-wire and on-disk form of a plan tree: a
//! self-describing JSON record stored in the catalog's plan cache and
//! shipped to every replica that will execute the statement. Each node
//! record carries its variant tag, id, nested child records, output schema,
//! and determinism flags; decoding dispatches purely on the tag and rejects
//! anything it does not recognize.
//!
//! The codec is lossless: decoding a document and re-encoding it yields an
//! equal document, and the decoded tree is structurally equal to the tree
//! that produced it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::expr::Expression;
use crate::plan::determinism::Determinism;
use crate::plan::error::{InvariantViolation, MalformedPlanError};
use crate::plan::node::{JoinType, NodeId, Operator, PlanNode, PlanNodeType};
use crate::plan::schema::{NodeSchema, SchemaColumn};
use crate::plan::tree::{duplicate_id, PlanTree};

/// Current plan document format version
pub const PLAN_DOCUMENT_VERSION: u32 = 1;

/// Serialized plan tree
///
/// `execution_ready` distinguishes executable plans from diagnostic dumps of
/// unresolved trees; only the former may be loaded for execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDocument {
    pub version: u32,
    pub execution_ready: bool,
    pub root: NodeDocument,
}

impl PlanDocument {
    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String, MalformedPlanError> {
        serde_json::to_string_pretty(self).map_err(|e| MalformedPlanError::Json(e.to_string()))
    }

    /// Parse from JSON text
    pub fn from_json(text: &str) -> Result<Self, MalformedPlanError> {
        serde_json::from_str(text).map_err(|e| MalformedPlanError::Json(e.to_string()))
    }
}

/// One output column descriptor in a node record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaColumnDocument {
    pub table: String,
    pub column: String,
    pub alias: String,
    pub index: usize,
    pub expression: Expression,
}

/// An (expression, alias) pair in a node record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AliasedExpressionDocument {
    pub expression: Expression,
    pub alias: String,
}

/// A sort key in a node record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKeyDocument {
    pub expression: Expression,
    pub ascending: bool,
}

/// An UPDATE assignment in a node record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentDocument {
    pub column: String,
    pub value: Expression,
}

/// One node record
///
/// `type`, `id`, `children` and the determinism fields are present on every
/// record; `output_schema` is present whenever schema generation has run
/// (always, for executable plans). Which payload fields are required depends
/// on the variant tag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeDocument {
    #[serde(rename = "type")]
    pub node_type: String,
    pub id: NodeId,
    pub children: Vec<NodeDocument>,
    /// Absent only in diagnostic dumps of trees that never ran pass 1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Vec<SchemaColumnDocument>>,
    pub order_deterministic: bool,
    pub content_deterministic: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nondeterminism_detail: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expressions: Option<Vec<AliasedExpressionDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_by: Option<Vec<Expression>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregates: Option<Vec<AliasedExpressionDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_type: Option<JoinType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Expression>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_by: Option<Vec<SortKeyDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignments: Option<Vec<AssignmentDocument>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub columns: Option<Vec<AliasedExpressionDocument>>,
}

fn aliased_docs(pairs: &[(Expression, String)]) -> Vec<AliasedExpressionDocument> {
    pairs
        .iter()
        .map(|(expression, alias)| AliasedExpressionDocument {
            expression: expression.clone(),
            alias: alias.clone(),
        })
        .collect()
}

fn aliased_pairs(docs: Vec<AliasedExpressionDocument>) -> Vec<(Expression, String)> {
    docs.into_iter().map(|d| (d.expression, d.alias)).collect()
}

fn require<T>(field: Option<T>, node_id: NodeId, name: &'static str) -> Result<T, MalformedPlanError> {
    field.ok_or(MalformedPlanError::MissingField {
        node_id,
        field: name,
    })
}

impl PlanNode {
    /// Encode this node and its subtree as a document record
    pub fn to_document(&self) -> NodeDocument {
        let output_schema = self.output_schema.as_ref().map(|schema| {
            schema
                .columns()
                .iter()
                .map(|col| SchemaColumnDocument {
                    table: col.table.clone(),
                    column: col.column.clone(),
                    alias: col.alias.clone(),
                    index: col.position,
                    expression: col.expression.clone(),
                })
                .collect()
        });

        let mut doc = NodeDocument {
            node_type: self.node_type().tag().to_string(),
            id: self.id,
            children: self.children.iter().map(PlanNode::to_document).collect(),
            output_schema,
            order_deterministic: self.determinism.is_order_deterministic(),
            content_deterministic: self.determinism.is_content_deterministic(),
            nondeterminism_detail: self
                .determinism
                .nondeterminism_detail()
                .map(|s| s.to_string()),
            ..Default::default()
        };

        match &self.op {
            Operator::TableScan { table, filter } => {
                doc.table = Some(table.clone());
                doc.filter = filter.clone();
            }
            Operator::IndexScan {
                table,
                index,
                filter,
            } => {
                doc.table = Some(table.clone());
                doc.index = Some(index.clone());
                doc.filter = filter.clone();
            }
            Operator::Projection { expressions } => {
                doc.expressions = Some(aliased_docs(expressions));
            }
            Operator::Aggregate {
                group_by,
                aggregates,
            } => {
                doc.group_by = Some(group_by.clone());
                doc.aggregates = Some(aliased_docs(aggregates));
            }
            Operator::Join {
                join_type,
                condition,
            } => {
                doc.join_type = Some(*join_type);
                doc.condition = condition.clone();
            }
            Operator::Limit { limit, offset } => {
                doc.limit = *limit;
                doc.offset = *offset;
            }
            Operator::Sort { order_by } => {
                doc.order_by = Some(
                    order_by
                        .iter()
                        .map(|(expression, ascending)| SortKeyDocument {
                            expression: expression.clone(),
                            ascending: *ascending,
                        })
                        .collect(),
                );
            }
            Operator::Send | Operator::Receive => {}
            Operator::Insert { table } | Operator::Delete { table } => {
                doc.table = Some(table.clone());
            }
            Operator::Update { table, assignments } => {
                doc.table = Some(table.clone());
                doc.assignments = Some(
                    assignments
                        .iter()
                        .map(|(column, value)| AssignmentDocument {
                            column: column.clone(),
                            value: value.clone(),
                        })
                        .collect(),
                );
            }
            Operator::Materialize { columns } => {
                doc.columns = Some(aliased_docs(columns));
            }
        }

        doc
    }

    /// Decode a node record and its nested children
    ///
    /// Dispatches on the variant tag; an unknown tag or a missing required
    /// field aborts without constructing anything.
    pub fn from_document(doc: &NodeDocument) -> Result<PlanNode, MalformedPlanError> {
        let node_type = PlanNodeType::from_tag(&doc.node_type).ok_or_else(|| {
            MalformedPlanError::UnknownNodeType {
                tag: doc.node_type.clone(),
            }
        })?;
        let id = doc.id;

        let op = match node_type {
            PlanNodeType::TableScan => Operator::TableScan {
                table: require(doc.table.clone(), id, "table")?,
                filter: doc.filter.clone(),
            },
            PlanNodeType::IndexScan => Operator::IndexScan {
                table: require(doc.table.clone(), id, "table")?,
                index: require(doc.index.clone(), id, "index")?,
                filter: doc.filter.clone(),
            },
            PlanNodeType::Projection => Operator::Projection {
                expressions: aliased_pairs(require(doc.expressions.clone(), id, "expressions")?),
            },
            PlanNodeType::Aggregate => Operator::Aggregate {
                group_by: require(doc.group_by.clone(), id, "group_by")?,
                aggregates: aliased_pairs(require(doc.aggregates.clone(), id, "aggregates")?),
            },
            PlanNodeType::Join => Operator::Join {
                join_type: require(doc.join_type, id, "join_type")?,
                condition: doc.condition.clone(),
            },
            PlanNodeType::Limit => Operator::Limit {
                limit: doc.limit,
                offset: doc.offset,
            },
            PlanNodeType::Sort => Operator::Sort {
                order_by: require(doc.order_by.clone(), id, "order_by")?
                    .into_iter()
                    .map(|k| (k.expression, k.ascending))
                    .collect(),
            },
            PlanNodeType::Send => Operator::Send,
            PlanNodeType::Receive => Operator::Receive,
            PlanNodeType::Insert => Operator::Insert {
                table: require(doc.table.clone(), id, "table")?,
            },
            PlanNodeType::Update => Operator::Update {
                table: require(doc.table.clone(), id, "table")?,
                assignments: require(doc.assignments.clone(), id, "assignments")?
                    .into_iter()
                    .map(|a| (a.column, a.value))
                    .collect(),
            },
            PlanNodeType::Delete => Operator::Delete {
                table: require(doc.table.clone(), id, "table")?,
            },
            PlanNodeType::Materialize => Operator::Materialize {
                columns: aliased_pairs(require(doc.columns.clone(), id, "columns")?),
            },
        };

        let determinism = Determinism::from_flags(
            doc.order_deterministic,
            doc.content_deterministic,
            doc.nondeterminism_detail.clone(),
        )
        .ok_or(MalformedPlanError::InconsistentDeterminism { node_id: id })?;

        let output_schema = match &doc.output_schema {
            Some(columns) => Some(decode_schema(columns, id)?),
            None => None,
        };

        let children = doc
            .children
            .iter()
            .map(PlanNode::from_document)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PlanNode {
            id,
            op,
            children,
            output_schema,
            determinism,
        })
    }
}

fn decode_schema(
    columns: &[SchemaColumnDocument],
    node_id: NodeId,
) -> Result<NodeSchema, MalformedPlanError> {
    let mut decoded = Vec::with_capacity(columns.len());
    for (i, col) in columns.iter().enumerate() {
        if col.index != i {
            return Err(MalformedPlanError::MalformedSchema {
                node_id,
                detail: format!("column '{}' at position {} has index {}", col.alias, i, col.index),
            });
        }
        decoded.push(SchemaColumn::new(
            col.table.clone(),
            col.column.clone(),
            col.alias.clone(),
            col.index,
            col.expression.clone(),
        ));
    }
    Ok(NodeSchema::from_columns(decoded))
}

impl PlanTree {
    /// Serialize a resolved tree for execution
    ///
    /// Refuses unresolved trees: a plan whose column references are not all
    /// bound must never reach the execution engine.
    pub fn to_document(&self) -> Result<PlanDocument, InvariantViolation> {
        if !self.resolved {
            return Err(InvariantViolation::UnresolvedPlan);
        }
        Ok(PlanDocument {
            version: PLAN_DOCUMENT_VERSION,
            execution_ready: true,
            root: self.root.to_document(),
        })
    }

    /// Serialize the tree in any state for diagnostics
    ///
    /// The result is marked not execution-ready and will be refused by
    /// [`PlanTree::from_document`].
    pub fn to_diagnostic_document(&self) -> PlanDocument {
        PlanDocument {
            version: PLAN_DOCUMENT_VERSION,
            execution_ready: false,
            root: self.root.to_document(),
        }
    }

    /// Load an execution-ready document back into a tree
    pub fn from_document(doc: &PlanDocument) -> Result<PlanTree, MalformedPlanError> {
        if doc.version != PLAN_DOCUMENT_VERSION {
            return Err(MalformedPlanError::UnsupportedVersion {
                version: doc.version,
            });
        }
        if !doc.execution_ready {
            return Err(MalformedPlanError::NotExecutionReady);
        }

        let root = PlanNode::from_document(&doc.root)?;

        if let Some(id) = duplicate_id(&root) {
            return Err(MalformedPlanError::DuplicateNodeId { id });
        }

        // An execution-ready document must carry a schema on every node
        fn check_schemas(node: &PlanNode) -> Result<(), MalformedPlanError> {
            if node.output_schema.is_none() {
                return Err(MalformedPlanError::MissingField {
                    node_id: node.id,
                    field: "output_schema",
                });
            }
            for child in node.children() {
                check_schemas(child)?;
            }
            Ok(())
        }
        check_schemas(&root)?;

        debug!(root = root.id(), "loaded plan document");
        Ok(PlanTree {
            root,
            resolved: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_doc(node_type: &str) -> NodeDocument {
        NodeDocument {
            node_type: node_type.to_string(),
            id: 1,
            order_deterministic: true,
            content_deterministic: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let doc = minimal_doc("shuffle");
        let err = PlanNode::from_document(&doc).unwrap_err();
        assert!(matches!(
            err,
            MalformedPlanError::UnknownNodeType { ref tag } if tag == "shuffle"
        ));
    }

    #[test]
    fn test_missing_field_rejected() {
        // A table scan record without its table
        let doc = minimal_doc("table_scan");
        let err = PlanNode::from_document(&doc).unwrap_err();
        assert!(matches!(
            err,
            MalformedPlanError::MissingField {
                node_id: 1,
                field: "table"
            }
        ));
    }

    #[test]
    fn test_inconsistent_determinism_rejected() {
        let mut doc = minimal_doc("send");
        doc.content_deterministic = false;
        let err = PlanNode::from_document(&doc).unwrap_err();
        assert!(matches!(
            err,
            MalformedPlanError::InconsistentDeterminism { node_id: 1 }
        ));
    }

    #[test]
    fn test_schema_index_mismatch_rejected() {
        let mut doc = minimal_doc("table_scan");
        doc.table = Some("users".to_string());
        doc.output_schema = Some(vec![SchemaColumnDocument {
            table: "users".to_string(),
            column: "id".to_string(),
            alias: "id".to_string(),
            index: 3,
            expression: Expression::Column(crate::expr::ColumnRef::bound("users", "id", 3)),
        }]);
        let err = PlanNode::from_document(&doc).unwrap_err();
        assert!(matches!(
            err,
            MalformedPlanError::MalformedSchema { node_id: 1, .. }
        ));
    }

    #[test]
    fn test_json_parse_error_mapped() {
        let err = PlanDocument::from_json("not json").unwrap_err();
        assert!(matches!(err, MalformedPlanError::Json(_)));
    }
}
