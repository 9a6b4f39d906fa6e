//! Node output schemas
//!
//! Every plan node, once schema generation has run, carries an ordered list
//! of the columns its execution produces. Column resolution later matches
//! symbolic references against these lists to find input row positions.

use crate::expr::{ColumnRef, Expression};

/// One output column of a plan node
///
/// Records where the column came from (origin table and column), the name it
/// is exposed under (alias), its position in the output row, and the
/// expression that produces its value. Structural equality; immutable once
/// added to a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaColumn {
    /// Origin table name; empty for computed columns
    pub table: String,
    /// Origin column name; the alias for computed columns
    pub column: String,
    /// Name this column is exposed under
    pub alias: String,
    /// Zero-based position in the output row
    pub position: usize,
    /// Expression producing the column value
    pub expression: Expression,
}

impl SchemaColumn {
    /// Create a new schema column
    pub fn new(
        table: impl Into<String>,
        column: impl Into<String>,
        alias: impl Into<String>,
        position: usize,
        expression: Expression,
    ) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
            alias: alias.into(),
            position,
            expression,
        }
    }

    /// Whether a symbolic reference matches this column
    ///
    /// A qualifier must equal the origin table; the name may match either the
    /// alias or the origin column name.
    pub fn matches(&self, table: Option<&str>, name: &str) -> bool {
        if let Some(t) = table {
            if self.table != t {
                return false;
            }
        }
        name == self.alias || name == self.column
    }
}

/// Outcome of a column lookup against a schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLookup {
    /// No column matched
    Missing,
    /// Exactly one column matched, at this position
    Found(usize),
    /// More than one column matched
    Ambiguous,
}

/// Ordered output schema of one plan node
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NodeSchema {
    columns: Vec<SchemaColumn>,
}

impl NodeSchema {
    /// Create an empty schema
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
        }
    }

    /// Build a schema from pre-positioned columns
    pub fn from_columns(columns: Vec<SchemaColumn>) -> Self {
        Self { columns }
    }

    /// Append a column at the next position
    pub fn push_column(
        &mut self,
        table: impl Into<String>,
        column: impl Into<String>,
        alias: impl Into<String>,
        expression: Expression,
    ) {
        let position = self.columns.len();
        self.columns
            .push(SchemaColumn::new(table, column, alias, position, expression));
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// All columns in output order
    pub fn columns(&self) -> &[SchemaColumn] {
        &self.columns
    }

    /// Column at a position
    pub fn get(&self, position: usize) -> Option<&SchemaColumn> {
        self.columns.get(position)
    }

    /// Look up a symbolic reference
    pub fn find(&self, table: Option<&str>, name: &str) -> ColumnLookup {
        let mut found = ColumnLookup::Missing;
        for col in &self.columns {
            if col.matches(table, name) {
                found = match found {
                    ColumnLookup::Missing => ColumnLookup::Found(col.position),
                    _ => return ColumnLookup::Ambiguous,
                };
            }
        }
        found
    }

    /// Concatenate schemas into one, renumbering positions 0..N and pointing
    /// each column's expression at its input position
    ///
    /// This is how pass-through operators (limit, sort, send, receive) and
    /// joins derive their output from child schemas: origin and alias are
    /// kept, the producing expression becomes a direct reference to the
    /// corresponding input column.
    pub fn concat(parts: &[&NodeSchema]) -> NodeSchema {
        let mut schema = NodeSchema::new();
        for part in parts {
            for col in &part.columns {
                let table = if col.table.is_empty() {
                    None
                } else {
                    Some(col.table.clone())
                };
                let position = schema.len();
                let expression = Expression::Column(ColumnRef {
                    table,
                    column: col.alias.clone(),
                    index: Some(position),
                });
                schema.push_column(
                    col.table.clone(),
                    col.column.clone(),
                    col.alias.clone(),
                    expression,
                );
            }
        }
        schema
    }

    /// Copy this schema with positions renumbered and expressions rebound
    pub fn pass_through(&self) -> NodeSchema {
        NodeSchema::concat(&[self])
    }
}

/// Lookup view over the input row a node receives from its children
///
/// A node with one child sees that child's output; a join sees the
/// concatenation of both children's outputs, left columns first. Positions
/// returned by [`InputSchema::find`] are global across all parts.
pub struct InputSchema<'a> {
    parts: Vec<&'a NodeSchema>,
}

impl<'a> InputSchema<'a> {
    /// Build a view over child output schemas, in child order
    pub fn new(parts: Vec<&'a NodeSchema>) -> Self {
        Self { parts }
    }

    /// Total number of input columns
    pub fn len(&self) -> usize {
        self.parts.iter().map(|p| p.len()).sum()
    }

    /// Whether there are no input columns
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a symbolic reference across all parts
    pub fn find(&self, table: Option<&str>, name: &str) -> ColumnLookup {
        let mut found = ColumnLookup::Missing;
        let mut offset = 0;
        for part in &self.parts {
            for col in part.columns() {
                if col.matches(table, name) {
                    found = match found {
                        ColumnLookup::Missing => ColumnLookup::Found(offset + col.position),
                        _ => return ColumnLookup::Ambiguous,
                    };
                }
            }
            offset += part.len();
        }
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::Literal;

    fn scan_schema(table: &str, cols: &[&str]) -> NodeSchema {
        let mut schema = NodeSchema::new();
        for (i, name) in cols.iter().enumerate() {
            schema.push_column(
                table,
                *name,
                *name,
                Expression::Column(ColumnRef::bound(table, *name, i)),
            );
        }
        schema
    }

    #[test]
    fn test_push_assigns_positions() {
        let schema = scan_schema("t", &["a", "b", "c"]);
        assert_eq!(schema.len(), 3);
        assert_eq!(schema.get(1).unwrap().column, "b");
        assert_eq!(schema.get(1).unwrap().position, 1);
    }

    #[test]
    fn test_find_qualified_and_unqualified() {
        let schema = scan_schema("t", &["a", "b"]);
        assert_eq!(schema.find(None, "a"), ColumnLookup::Found(0));
        assert_eq!(schema.find(Some("t"), "b"), ColumnLookup::Found(1));
        assert_eq!(schema.find(Some("other"), "a"), ColumnLookup::Missing);
        assert_eq!(schema.find(None, "missing"), ColumnLookup::Missing);
    }

    #[test]
    fn test_find_matches_alias() {
        let mut schema = NodeSchema::new();
        schema.push_column("t", "a", "renamed", Expression::Literal(Literal::Null));
        assert_eq!(schema.find(None, "renamed"), ColumnLookup::Found(0));
        assert_eq!(schema.find(None, "a"), ColumnLookup::Found(0));
    }

    #[test]
    fn test_input_schema_ambiguity_across_parts() {
        let left = scan_schema("l", &["id", "name"]);
        let right = scan_schema("r", &["id", "total"]);
        let input = InputSchema::new(vec![&left, &right]);

        assert_eq!(input.len(), 4);
        // Unqualified "id" exists on both sides
        assert_eq!(input.find(None, "id"), ColumnLookup::Ambiguous);
        // Qualification disambiguates; right-side positions are offset
        assert_eq!(input.find(Some("l"), "id"), ColumnLookup::Found(0));
        assert_eq!(input.find(Some("r"), "id"), ColumnLookup::Found(2));
        assert_eq!(input.find(None, "total"), ColumnLookup::Found(3));
    }

    #[test]
    fn test_concat_renumbers_and_rebinds() {
        let left = scan_schema("l", &["a"]);
        let right = scan_schema("r", &["b"]);
        let joined = NodeSchema::concat(&[&left, &right]);

        assert_eq!(joined.len(), 2);
        let b = joined.get(1).unwrap();
        assert_eq!(b.table, "r");
        assert_eq!(b.position, 1);
        match &b.expression {
            Expression::Column(col) => assert_eq!(col.index, Some(1)),
            other => panic!("expected column expression, got {:?}", other),
        }
    }

    #[test]
    fn test_computed_column_concat_keeps_unqualified_ref() {
        let mut schema = NodeSchema::new();
        schema.push_column("", "n", "n", Expression::Literal(Literal::Integer(1)));
        let passed = schema.pass_through();
        match &passed.get(0).unwrap().expression {
            Expression::Column(col) => {
                assert_eq!(col.table, None);
                assert_eq!(col.index, Some(0));
            }
            other => panic!("expected column expression, got {:?}", other),
        }
    }
}
