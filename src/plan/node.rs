//! Plan node types and per-variant behavior
//!
//! A plan node is one operator in a compiled query plan. The operator kind
//! and its payload live in [`Operator`]; everything an operator kind needs
//! to define - arity, output schema generation, column binding, determinism
//! behavior, explain text - is an exhaustive match over that enum, so adding
//! an operator is a compile-time-checked exercise.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::expr::{ColumnRef, Expression};
use crate::plan::determinism::Determinism;
use crate::plan::error::{ColumnResolutionError, SchemaError};
use crate::plan::schema::{ColumnLookup, InputSchema, NodeSchema};

/// Node identifier, unique within one plan tree
pub type NodeId = u32;

/// Operator kind - the closed set of plan node variants
///
/// The tag strings returned by [`PlanNodeType::tag`] are the serialization
/// contract; they never change once released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanNodeType {
    TableScan,
    IndexScan,
    Projection,
    Aggregate,
    Join,
    Limit,
    Sort,
    Send,
    Receive,
    Insert,
    Update,
    Delete,
    Materialize,
}

impl PlanNodeType {
    /// Stable tag string used in plan documents
    pub fn tag(&self) -> &'static str {
        match self {
            PlanNodeType::TableScan => "table_scan",
            PlanNodeType::IndexScan => "index_scan",
            PlanNodeType::Projection => "projection",
            PlanNodeType::Aggregate => "aggregate",
            PlanNodeType::Join => "join",
            PlanNodeType::Limit => "limit",
            PlanNodeType::Sort => "sort",
            PlanNodeType::Send => "send",
            PlanNodeType::Receive => "receive",
            PlanNodeType::Insert => "insert",
            PlanNodeType::Update => "update",
            PlanNodeType::Delete => "delete",
            PlanNodeType::Materialize => "materialize",
        }
    }

    /// Parse a tag string back into an operator kind
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "table_scan" => Some(PlanNodeType::TableScan),
            "index_scan" => Some(PlanNodeType::IndexScan),
            "projection" => Some(PlanNodeType::Projection),
            "aggregate" => Some(PlanNodeType::Aggregate),
            "join" => Some(PlanNodeType::Join),
            "limit" => Some(PlanNodeType::Limit),
            "sort" => Some(PlanNodeType::Sort),
            "send" => Some(PlanNodeType::Send),
            "receive" => Some(PlanNodeType::Receive),
            "insert" => Some(PlanNodeType::Insert),
            "update" => Some(PlanNodeType::Update),
            "delete" => Some(PlanNodeType::Delete),
            "materialize" => Some(PlanNodeType::Materialize),
            _ => None,
        }
    }
}

impl fmt::Display for PlanNodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PlanNodeType::TableScan => "TableScan",
            PlanNodeType::IndexScan => "IndexScan",
            PlanNodeType::Projection => "Projection",
            PlanNodeType::Aggregate => "Aggregate",
            PlanNodeType::Join => "Join",
            PlanNodeType::Limit => "Limit",
            PlanNodeType::Sort => "Sort",
            PlanNodeType::Send => "Send",
            PlanNodeType::Receive => "Receive",
            PlanNodeType::Insert => "Insert",
            PlanNodeType::Update => "Update",
            PlanNodeType::Delete => "Delete",
            PlanNodeType::Materialize => "Materialize",
        };
        write!(f, "{}", name)
    }
}

/// JOIN type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JoinType::Inner => "Inner",
            JoinType::Left => "Left",
            JoinType::Right => "Right",
            JoinType::Full => "Full",
        };
        write!(f, "{}", name)
    }
}

/// Operator variant and payload
#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    /// Sequential scan of a base table, with an optional pushed-down filter
    TableScan {
        table: String,
        filter: Option<Expression>,
    },

    /// Scan of a base table through a named index
    IndexScan {
        table: String,
        index: String,
        filter: Option<Expression>,
    },

    /// Compute output columns from input rows
    Projection {
        /// (expression, alias)
        expressions: Vec<(Expression, String)>,
    },

    /// Aggregate with optional grouping
    Aggregate {
        group_by: Vec<Expression>,
        /// (aggregate call, output alias)
        aggregates: Vec<(Expression, String)>,
    },

    /// Join two inputs; output is left columns then right columns
    Join {
        join_type: JoinType,
        condition: Option<Expression>,
    },

    /// Limit rows returned
    Limit {
        limit: Option<u64>,
        offset: Option<u64>,
    },

    /// Sort rows
    Sort {
        /// (expression, ascending)
        order_by: Vec<(Expression, bool)>,
    },

    /// Ship rows from a partition to the coordinator
    Send,

    /// Merge row streams arriving from partitions
    Receive,

    /// INSERT rows produced by the child into a table
    Insert { table: String },

    /// UPDATE rows produced by the child
    Update {
        table: String,
        /// (column name, new value)
        assignments: Vec<(String, Expression)>,
    },

    /// DELETE rows produced by the child
    Delete { table: String },

    /// Produce literal rows computed from expressions (e.g. INSERT VALUES)
    Materialize {
        /// (expression, alias)
        columns: Vec<(Expression, String)>,
    },
}

/// Per-operator determinism behavior, applied after folding in the children
#[derive(Debug, Clone, Copy)]
pub(crate) enum DeterminismEffect {
    /// Conjunction of children only
    Inherit,
    /// Source yields rows in no guaranteed order
    Unordered(&'static str),
    /// Imposes a total order on content-deterministic input
    ImposesOrder,
    /// Keeps an arbitrary row subset when input order is not fixed
    OrderSensitive(&'static str),
}

impl Operator {
    /// The operator kind of this payload
    pub fn node_type(&self) -> PlanNodeType {
        match self {
            Operator::TableScan { .. } => PlanNodeType::TableScan,
            Operator::IndexScan { .. } => PlanNodeType::IndexScan,
            Operator::Projection { .. } => PlanNodeType::Projection,
            Operator::Aggregate { .. } => PlanNodeType::Aggregate,
            Operator::Join { .. } => PlanNodeType::Join,
            Operator::Limit { .. } => PlanNodeType::Limit,
            Operator::Sort { .. } => PlanNodeType::Sort,
            Operator::Send => PlanNodeType::Send,
            Operator::Receive => PlanNodeType::Receive,
            Operator::Insert { .. } => PlanNodeType::Insert,
            Operator::Update { .. } => PlanNodeType::Update,
            Operator::Delete { .. } => PlanNodeType::Delete,
            Operator::Materialize { .. } => PlanNodeType::Materialize,
        }
    }

    /// Number of children this operator requires
    pub fn expected_children(&self) -> usize {
        match self {
            Operator::TableScan { .. }
            | Operator::IndexScan { .. }
            | Operator::Materialize { .. } => 0,
            Operator::Join { .. } => 2,
            _ => 1,
        }
    }

    pub(crate) fn determinism_effect(&self) -> DeterminismEffect {
        match self {
            Operator::TableScan { .. } => {
                DeterminismEffect::Unordered("sequential scan returns rows in no guaranteed order")
            }
            // An index imposes a total order on the rows it yields
            Operator::IndexScan { .. } => DeterminismEffect::ImposesOrder,
            Operator::Sort { .. } => DeterminismEffect::ImposesOrder,
            Operator::Receive => DeterminismEffect::Unordered(
                "rows from partitions arrive in nondeterministic order",
            ),
            Operator::Limit { .. } => DeterminismEffect::OrderSensitive(
                "limit/offset over unordered input keeps an arbitrary subset of rows",
            ),
            _ => DeterminismEffect::Inherit,
        }
    }
}

/// One operator node in a plan tree
///
/// Owns its children; destroying a node tears down its whole subtree. The
/// output schema is absent until schema generation runs.
#[derive(Debug, Clone, PartialEq)]
pub struct PlanNode {
    pub(crate) id: NodeId,
    pub(crate) op: Operator,
    pub(crate) children: Vec<PlanNode>,
    pub(crate) output_schema: Option<NodeSchema>,
    pub(crate) determinism: Determinism,
}

impl PlanNode {
    /// Create an unresolved node with no children
    pub fn new(id: NodeId, op: Operator) -> Self {
        Self {
            id,
            op,
            children: Vec::new(),
            output_schema: None,
            determinism: Determinism::deterministic(),
        }
    }

    /// Append a child
    #[must_use]
    pub fn with_child(mut self, child: PlanNode) -> Self {
        self.children.push(child);
        self
    }

    /// Node id
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Operator payload
    pub fn operator(&self) -> &Operator {
        &self.op
    }

    /// Operator kind
    pub fn node_type(&self) -> PlanNodeType {
        self.op.node_type()
    }

    /// Children in execution order
    pub fn children(&self) -> &[PlanNode] {
        &self.children
    }

    /// Output schema, present once schema generation has run
    pub fn output_schema(&self) -> Option<&NodeSchema> {
        self.output_schema.as_ref()
    }

    /// Determinism flags
    pub fn determinism(&self) -> &Determinism {
        &self.determinism
    }

    /// Whether repeated execution yields rows in the same order
    pub fn is_order_deterministic(&self) -> bool {
        self.determinism.is_order_deterministic()
    }

    /// Whether repeated execution yields the same rows, order aside
    pub fn is_content_deterministic(&self) -> bool {
        self.determinism.is_content_deterministic()
    }

    /// Why this node is nondeterministic, if it is
    pub fn nondeterminism_detail(&self) -> Option<&str> {
        self.determinism.nondeterminism_detail()
    }

    /// Set the order determinism flag (see [`Determinism`])
    pub fn set_order_determinism(&mut self, flag: bool, explanation: &str) {
        self.determinism.set_order_determinism(flag, explanation);
    }

    /// Set the content determinism flag (see [`Determinism`])
    pub fn set_content_determinism(&mut self, flag: bool, explanation: &str) {
        self.determinism.set_content_determinism(flag, explanation);
    }

    fn check_arity(&self) -> Result<(), SchemaError> {
        let expected = self.op.expected_children();
        if self.children.len() != expected {
            return Err(SchemaError::ChildArity {
                node_id: self.id,
                node_type: self.op.node_type(),
                expected,
                actual: self.children.len(),
            });
        }
        Ok(())
    }

    fn child_schema(&self, index: usize) -> &NodeSchema {
        self.children[index]
            .output_schema
            .as_ref()
            .expect("child schema generated before parent")
    }

    /// Compute this node's output schema
    ///
    /// Called bottom-up by the tree pass: every child already carries a
    /// finalized schema.
    pub(crate) fn generate_output_schema(&mut self, catalog: &Catalog) -> Result<(), SchemaError> {
        self.check_arity()?;

        let schema = match &self.op {
            Operator::TableScan { table, .. } | Operator::IndexScan { table, .. } => {
                let def = catalog
                    .get_table(table)
                    .ok_or_else(|| SchemaError::TableNotFound {
                        node_id: self.id,
                        table: table.clone(),
                    })?;

                if let Operator::IndexScan { index, .. } = &self.op {
                    let known = catalog
                        .get_index(index)
                        .map(|idx| idx.table == *table)
                        .unwrap_or(false);
                    if !known {
                        return Err(SchemaError::UnknownIndex {
                            node_id: self.id,
                            index: index.clone(),
                            table: table.clone(),
                        });
                    }
                }

                let mut schema = NodeSchema::new();
                for (i, col) in def.columns.iter().enumerate() {
                    schema.push_column(
                        table.clone(),
                        col.name.clone(),
                        col.name.clone(),
                        Expression::Column(ColumnRef::bound(table.clone(), col.name.clone(), i)),
                    );
                }
                schema
            }

            Operator::Projection { expressions } => schema_from_aliased(expressions),

            Operator::Aggregate {
                group_by,
                aggregates,
            } => {
                for (expr, alias) in aggregates {
                    if !matches!(expr, Expression::Aggregate { .. }) {
                        return Err(SchemaError::NotAnAggregate {
                            node_id: self.id,
                            alias: alias.clone(),
                        });
                    }
                }
                aggregate_schema(group_by, aggregates)
            }

            Operator::Join { .. } => {
                NodeSchema::concat(&[self.child_schema(0), self.child_schema(1)])
            }

            Operator::Limit { .. } | Operator::Sort { .. } | Operator::Send | Operator::Receive => {
                self.child_schema(0).pass_through()
            }

            Operator::Insert { .. } | Operator::Update { .. } | Operator::Delete { .. } => {
                modified_tuples_schema()
            }

            Operator::Materialize { columns } => schema_from_aliased(columns),
        };

        self.output_schema = Some(schema);
        Ok(())
    }

    /// Recompute determinism from the children and this operator's effect
    ///
    /// Degrades only: an explicit nondeterminism set by the planner before
    /// compilation survives, and a sort can restore order determinism only
    /// over content-deterministic input.
    pub(crate) fn compute_determinism(&mut self) {
        for child in &self.children {
            self.determinism.combine(&child.determinism);
        }
        match self.op.determinism_effect() {
            DeterminismEffect::Inherit => {}
            DeterminismEffect::Unordered(detail) => {
                if self.determinism.is_order_deterministic() {
                    self.determinism.set_order_determinism(false, detail);
                }
            }
            DeterminismEffect::ImposesOrder => {
                if self.determinism.is_content_deterministic() {
                    self.determinism.set_order_determinism(true, "");
                }
            }
            DeterminismEffect::OrderSensitive(detail) => {
                if !self.determinism.is_order_deterministic() {
                    self.determinism.set_content_determinism(false, detail);
                }
            }
        }
    }

    /// Bind every column reference this node's expressions hold
    ///
    /// Internal nodes bind against the concatenation of their children's
    /// output schemas; leaves (scan filters) bind against their own output,
    /// which mirrors the scanned table.
    pub(crate) fn resolve_column_indexes(&mut self) -> Result<(), ColumnResolutionError> {
        let node_id = self.id;

        let parts: Vec<&NodeSchema> = if self.children.is_empty() {
            match &self.output_schema {
                Some(schema) => vec![schema],
                None => return Err(ColumnResolutionError::SchemaNotGenerated { node_id }),
            }
        } else {
            let mut parts = Vec::with_capacity(self.children.len());
            for child in &self.children {
                match &child.output_schema {
                    Some(schema) => parts.push(schema),
                    None => {
                        return Err(ColumnResolutionError::SchemaNotGenerated { node_id: child.id })
                    }
                }
            }
            parts
        };
        let input = InputSchema::new(parts);

        let mut bind = |col: &mut ColumnRef| -> Result<(), ColumnResolutionError> {
            match input.find(col.table.as_deref(), &col.column) {
                ColumnLookup::Found(index) => {
                    col.index = Some(index);
                    Ok(())
                }
                ColumnLookup::Missing => Err(ColumnResolutionError::ColumnNotFound {
                    node_id,
                    column: col.qualified_name(),
                }),
                ColumnLookup::Ambiguous => Err(ColumnResolutionError::AmbiguousColumn {
                    node_id,
                    column: col.qualified_name(),
                }),
            }
        };

        match &mut self.op {
            Operator::TableScan { filter, .. } | Operator::IndexScan { filter, .. } => {
                if let Some(filter) = filter {
                    filter.try_bind_columns(&mut bind)?;
                }
            }
            Operator::Projection { expressions } | Operator::Materialize { columns: expressions } => {
                for (expr, _) in expressions {
                    expr.try_bind_columns(&mut bind)?;
                }
            }
            Operator::Aggregate {
                group_by,
                aggregates,
            } => {
                for expr in group_by {
                    expr.try_bind_columns(&mut bind)?;
                }
                for (expr, _) in aggregates {
                    expr.try_bind_columns(&mut bind)?;
                }
            }
            Operator::Join { condition, .. } => {
                if let Some(condition) = condition {
                    condition.try_bind_columns(&mut bind)?;
                }
            }
            Operator::Sort { order_by } => {
                for (expr, _) in order_by {
                    expr.try_bind_columns(&mut bind)?;
                }
            }
            Operator::Update { assignments, .. } => {
                for (_, expr) in assignments {
                    expr.try_bind_columns(&mut bind)?;
                }
            }
            Operator::Limit { .. }
            | Operator::Send
            | Operator::Receive
            | Operator::Insert { .. }
            | Operator::Delete { .. } => {}
        }

        // Schemas built from payload expressions cloned them before binding;
        // rebuild so their copies carry the same bindings
        match &self.op {
            Operator::Projection { expressions } => {
                self.output_schema = Some(schema_from_aliased(expressions));
            }
            Operator::Materialize { columns } => {
                self.output_schema = Some(schema_from_aliased(columns));
            }
            Operator::Aggregate {
                group_by,
                aggregates,
            } => {
                self.output_schema = Some(aggregate_schema(group_by, aggregates));
            }
            _ => {}
        }

        Ok(())
    }

    /// One-line description of this node, without children
    pub fn explain_text(&self) -> String {
        match &self.op {
            Operator::TableScan { table, filter } => match filter {
                Some(f) => format!("TableScan: {}, filter: {}", table, f),
                None => format!("TableScan: {}", table),
            },
            Operator::IndexScan {
                table,
                index,
                filter,
            } => match filter {
                Some(f) => format!("IndexScan: {} via {}, filter: {}", table, index, f),
                None => format!("IndexScan: {} via {}", table, index),
            },
            Operator::Projection { expressions } => {
                let aliases: Vec<_> = expressions.iter().map(|(_, a)| a.as_str()).collect();
                format!("Projection: [{}]", aliases.join(", "))
            }
            Operator::Aggregate {
                group_by,
                aggregates,
            } => {
                let aggs: Vec<_> = aggregates
                    .iter()
                    .map(|(expr, alias)| format!("{} AS {}", expr, alias))
                    .collect();
                let mut text = format!("Aggregate: [{}]", aggs.join(", "));
                if !group_by.is_empty() {
                    let keys: Vec<_> = group_by.iter().map(|e| e.to_string()).collect();
                    text.push_str(&format!(" group by [{}]", keys.join(", ")));
                }
                text
            }
            Operator::Join {
                join_type,
                condition,
            } => match condition {
                Some(c) => format!("Join: {}, condition: {}", join_type, c),
                None => format!("Join: {}", join_type),
            },
            Operator::Limit { limit, offset } => {
                let mut parts = Vec::new();
                if let Some(l) = limit {
                    parts.push(format!("limit={}", l));
                }
                if let Some(o) = offset {
                    parts.push(format!("offset={}", o));
                }
                format!("Limit: {}", parts.join(", "))
            }
            Operator::Sort { order_by } => {
                let keys: Vec<_> = order_by
                    .iter()
                    .map(|(expr, asc)| format!("{} {}", expr, if *asc { "ASC" } else { "DESC" }))
                    .collect();
                format!("Sort: [{}]", keys.join(", "))
            }
            Operator::Send => "Send".to_string(),
            Operator::Receive => "Receive".to_string(),
            Operator::Insert { table } => format!("Insert: {}", table),
            Operator::Update { table, .. } => format!("Update: {}", table),
            Operator::Delete { table } => format!("Delete: {}", table),
            Operator::Materialize { columns } => {
                let exprs: Vec<_> = columns.iter().map(|(e, _)| e.to_string()).collect();
                format!("Materialize: [{}]", exprs.join(", "))
            }
        }
    }
}

/// Schema built from an (expression, alias) list - projections and
/// materialized rows
fn schema_from_aliased(expressions: &[(Expression, String)]) -> NodeSchema {
    let mut schema = NodeSchema::new();
    for (expr, alias) in expressions {
        let (table, column) = match expr {
            Expression::Column(col) => {
                (col.table.clone().unwrap_or_default(), col.column.clone())
            }
            _ => (String::new(), alias.clone()),
        };
        schema.push_column(table, column, alias.clone(), expr.clone());
    }
    schema
}

/// Schema of an aggregate node: group keys first, then aggregate outputs
fn aggregate_schema(group_by: &[Expression], aggregates: &[(Expression, String)]) -> NodeSchema {
    let mut schema = NodeSchema::new();
    for (i, expr) in group_by.iter().enumerate() {
        let (table, column) = match expr {
            Expression::Column(col) => {
                (col.table.clone().unwrap_or_default(), col.column.clone())
            }
            _ => (String::new(), format!("group_{}", i)),
        };
        let alias = column.clone();
        schema.push_column(table, column, alias, expr.clone());
    }
    for (expr, alias) in aggregates {
        schema.push_column("", alias.clone(), alias.clone(), expr.clone());
    }
    schema
}

/// The single-column schema every DML node produces: the count of rows the
/// statement modified
fn modified_tuples_schema() -> NodeSchema {
    let mut schema = NodeSchema::new();
    schema.push_column(
        "",
        "modified_tuples",
        "modified_tuples",
        Expression::Column(ColumnRef {
            table: None,
            column: "modified_tuples".to_string(),
            index: Some(0),
        }),
    );
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ColumnDef, DataType, TableDef};
    use crate::expr::{BinaryOp, Literal};

    fn test_catalog() -> Catalog {
        let mut catalog = Catalog::new();
        let users = TableDef::new("users")
            .column(ColumnDef::new("id", DataType::Int).nullable(false))
            .column(ColumnDef::new("name", DataType::Varchar(100)))
            .column(ColumnDef::new("age", DataType::Int));
        catalog.create_table(users).unwrap();
        catalog
    }

    #[test]
    fn test_tag_round_trip() {
        for node_type in [
            PlanNodeType::TableScan,
            PlanNodeType::IndexScan,
            PlanNodeType::Projection,
            PlanNodeType::Aggregate,
            PlanNodeType::Join,
            PlanNodeType::Limit,
            PlanNodeType::Sort,
            PlanNodeType::Send,
            PlanNodeType::Receive,
            PlanNodeType::Insert,
            PlanNodeType::Update,
            PlanNodeType::Delete,
            PlanNodeType::Materialize,
        ] {
            assert_eq!(PlanNodeType::from_tag(node_type.tag()), Some(node_type));
        }
        assert_eq!(PlanNodeType::from_tag("no_such_operator"), None);
    }

    #[test]
    fn test_scan_schema_from_catalog() {
        let catalog = test_catalog();
        let mut node = PlanNode::new(
            1,
            Operator::TableScan {
                table: "users".to_string(),
                filter: None,
            },
        );
        node.generate_output_schema(&catalog).unwrap();

        let schema = node.output_schema().unwrap();
        assert_eq!(schema.len(), 3);
        let age = schema.get(2).unwrap();
        assert_eq!(age.table, "users");
        assert_eq!(age.column, "age");
        assert_eq!(age.alias, "age");
        assert_eq!(age.position, 2);
    }

    #[test]
    fn test_scan_unknown_table() {
        let catalog = test_catalog();
        let mut node = PlanNode::new(
            1,
            Operator::TableScan {
                table: "missing".to_string(),
                filter: None,
            },
        );
        let err = node.generate_output_schema(&catalog).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TableNotFound { node_id: 1, ref table } if table == "missing"
        ));
        assert!(node.output_schema().is_none());
    }

    #[test]
    fn test_join_arity_enforced() {
        let catalog = test_catalog();
        let scan = PlanNode::new(
            1,
            Operator::TableScan {
                table: "users".to_string(),
                filter: None,
            },
        );
        let mut join = PlanNode::new(
            2,
            Operator::Join {
                join_type: JoinType::Inner,
                condition: None,
            },
        )
        .with_child(scan);

        // Children are generated first in the real pass; arity still fails
        join.children[0].generate_output_schema(&catalog).unwrap();
        let err = join.generate_output_schema(&catalog).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::ChildArity {
                node_id: 2,
                node_type: PlanNodeType::Join,
                expected: 2,
                actual: 1,
            }
        ));
    }

    #[test]
    fn test_dml_schema_is_modified_tuples() {
        let catalog = test_catalog();
        let mut scan = PlanNode::new(
            1,
            Operator::TableScan {
                table: "users".to_string(),
                filter: None,
            },
        );
        scan.generate_output_schema(&catalog).unwrap();

        let mut delete = PlanNode::new(
            2,
            Operator::Delete {
                table: "users".to_string(),
            },
        )
        .with_child(scan);
        delete.generate_output_schema(&catalog).unwrap();

        let schema = delete.output_schema().unwrap();
        assert_eq!(schema.len(), 1);
        assert_eq!(schema.get(0).unwrap().alias, "modified_tuples");
    }

    #[test]
    fn test_aggregate_rejects_plain_expression() {
        let catalog = test_catalog();
        let mut scan = PlanNode::new(
            1,
            Operator::TableScan {
                table: "users".to_string(),
                filter: None,
            },
        );
        scan.generate_output_schema(&catalog).unwrap();

        let mut agg = PlanNode::new(
            2,
            Operator::Aggregate {
                group_by: vec![],
                aggregates: vec![(
                    Expression::Literal(Literal::Integer(1)),
                    "n".to_string(),
                )],
            },
        )
        .with_child(scan);

        let err = agg.generate_output_schema(&catalog).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::NotAnAggregate { node_id: 2, ref alias } if alias == "n"
        ));
    }

    #[test]
    fn test_scan_filter_binds_against_own_schema() {
        let catalog = test_catalog();
        let mut scan = PlanNode::new(
            1,
            Operator::TableScan {
                table: "users".to_string(),
                filter: Some(Expression::binary(
                    Expression::column(ColumnRef::unqualified("age")),
                    BinaryOp::Gt,
                    Expression::literal(Literal::Integer(18)),
                )),
            },
        );
        scan.generate_output_schema(&catalog).unwrap();
        scan.resolve_column_indexes().unwrap();

        match scan.operator() {
            Operator::TableScan {
                filter: Some(filter),
                ..
            } => {
                let refs = filter.column_refs();
                assert_eq!(refs.len(), 1);
                assert_eq!(refs[0].index, Some(2));
            }
            other => panic!("unexpected operator {:?}", other),
        }
    }

    #[test]
    fn test_explain_text() {
        let node = PlanNode::new(
            1,
            Operator::Limit {
                limit: Some(10),
                offset: Some(5),
            },
        );
        assert_eq!(node.explain_text(), "Limit: limit=10, offset=5");

        let node = PlanNode::new(
            2,
            Operator::Sort {
                order_by: vec![(Expression::column(ColumnRef::unqualified("age")), false)],
            },
        );
        assert_eq!(node.explain_text(), "Sort: [age DESC]");

        let node = PlanNode::new(
            3,
            Operator::IndexScan {
                table: "users".to_string(),
                index: "idx_age".to_string(),
                filter: None,
            },
        );
        assert_eq!(node.explain_text(), "IndexScan: users via idx_age");
    }
}
