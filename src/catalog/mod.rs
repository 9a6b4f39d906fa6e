//! Catalog - schema metadata consumed during plan compilation
//!
//! The catalog supplies table definitions (column names, positions, types)
//! and index metadata. Plan compilation only reads it: schema generation
//! looks up base tables for scan nodes, and index scans verify that the
//! index they name actually exists on the scanned table. Catalog maintenance
//! (DDL, persistence) happens elsewhere in the system.

use std::collections::HashMap;

/// SQL data types supported by the database
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataType {
    /// Boolean (true/false)
    Boolean,
    /// 8-bit signed integer
    TinyInt,
    /// 16-bit signed integer
    SmallInt,
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    BigInt,
    /// 32-bit floating point
    Float,
    /// 64-bit floating point
    Double,
    /// Variable-length string with max length
    Varchar(u32),
    /// Unlimited text
    Text,
    /// Timestamp (date and time)
    Timestamp,
}

impl DataType {
    /// Check if this type is numeric
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            DataType::TinyInt
                | DataType::SmallInt
                | DataType::Int
                | DataType::BigInt
                | DataType::Float
                | DataType::Double
        )
    }

    /// Check if this type is a string type
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::Varchar(_) | DataType::Text)
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    /// Column name
    pub name: String,
    /// Data type
    pub data_type: DataType,
    /// Whether NULL values are allowed
    pub nullable: bool,
}

impl ColumnDef {
    /// Create a new column definition
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable: true,
        }
    }

    /// Set nullable
    #[must_use]
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }
}

/// Table definition
#[derive(Debug, Clone)]
pub struct TableDef {
    /// Table name
    pub name: String,
    /// Column definitions, in declaration order
    pub columns: Vec<ColumnDef>,
}

impl TableDef {
    /// Create a new table definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
        }
    }

    /// Add a column
    #[must_use]
    pub fn column(mut self, col: ColumnDef) -> Self {
        self.columns.push(col);
        self
    }

    /// Get column by name
    pub fn get_column(&self, name: &str) -> Option<&ColumnDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Get column position by name
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }
}

/// Index definition
#[derive(Debug, Clone)]
pub struct IndexDef {
    /// Index name
    pub name: String,
    /// Table this index belongs to
    pub table: String,
    /// Columns in the index
    pub columns: Vec<String>,
    /// Whether this is a unique index
    pub unique: bool,
}

impl IndexDef {
    /// Create a new index definition
    pub fn new(name: impl Into<String>, table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns,
            unique: false,
        }
    }

    /// Set unique
    #[must_use]
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }
}

/// Catalog error
#[derive(Debug, Clone)]
pub enum CatalogError {
    /// Table already exists
    TableExists(String),
    /// Table not found
    TableNotFound(String),
    /// Index already exists
    IndexExists(String),
    /// Column not found
    ColumnNotFound(String, String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::TableExists(name) => write!(f, "Table '{}' already exists", name),
            CatalogError::TableNotFound(name) => write!(f, "Table '{}' not found", name),
            CatalogError::IndexExists(name) => write!(f, "Index '{}' already exists", name),
            CatalogError::ColumnNotFound(table, col) => {
                write!(f, "Column '{}' not found in table '{}'", col, table)
            }
        }
    }
}

impl std::error::Error for CatalogError {}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Database catalog - stores schema metadata
///
/// Plan compilation holds a shared reference and never mutates; independent
/// statements may read one catalog concurrently.
#[derive(Debug, Default)]
pub struct Catalog {
    /// Tables by name
    tables: HashMap<String, TableDef>,
    /// Indexes by name
    indexes: HashMap<String, IndexDef>,
}

impl Catalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            indexes: HashMap::new(),
        }
    }

    /// Create a table
    pub fn create_table(&mut self, def: TableDef) -> CatalogResult<()> {
        if self.tables.contains_key(&def.name) {
            return Err(CatalogError::TableExists(def.name.clone()));
        }
        self.tables.insert(def.name.clone(), def);
        Ok(())
    }

    /// Create an index
    pub fn create_index(&mut self, def: IndexDef) -> CatalogResult<()> {
        if !self.tables.contains_key(&def.table) {
            return Err(CatalogError::TableNotFound(def.table.clone()));
        }

        let table = &self.tables[&def.table];
        for col in &def.columns {
            if table.get_column(col).is_none() {
                return Err(CatalogError::ColumnNotFound(def.table.clone(), col.clone()));
            }
        }

        if self.indexes.contains_key(&def.name) {
            return Err(CatalogError::IndexExists(def.name.clone()));
        }
        self.indexes.insert(def.name.clone(), def);
        Ok(())
    }

    /// Get a table definition
    pub fn get_table(&self, name: &str) -> Option<&TableDef> {
        self.tables.get(name)
    }

    /// Check if a table exists
    pub fn table_exists(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Get an index definition
    pub fn get_index(&self, name: &str) -> Option<&IndexDef> {
        self.indexes.get(name)
    }

    /// Get all indexes for a table
    pub fn get_indexes_for_table(&self, table: &str) -> Vec<&IndexDef> {
        self.indexes
            .values()
            .filter(|idx| idx.table == table)
            .collect()
    }

    /// Check whether a column participates in any index on its table
    ///
    /// Used by variant-specific legality checks (e.g. index scans).
    pub fn column_is_indexed(&self, table: &str, column: &str) -> bool {
        self.indexes
            .values()
            .any(|idx| idx.table == table && idx.columns.iter().any(|c| c == column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_create_table() {
        let mut catalog = Catalog::new();

        let table = TableDef::new("users")
            .column(ColumnDef::new("id", DataType::Int).nullable(false))
            .column(ColumnDef::new("name", DataType::Varchar(255)));

        catalog.create_table(table).unwrap();
        assert!(catalog.table_exists("users"));

        // Duplicate should fail
        let table2 = TableDef::new("users");
        assert!(matches!(
            catalog.create_table(table2),
            Err(CatalogError::TableExists(_))
        ));

        let t = catalog.get_table("users").unwrap();
        assert_eq!(t.columns.len(), 2);
        assert_eq!(t.get_column_index("name"), Some(1));
        assert!(t.get_column("nonexistent").is_none());
    }

    #[test]
    fn test_catalog_indexes() {
        let mut catalog = Catalog::new();

        let table = TableDef::new("users")
            .column(ColumnDef::new("id", DataType::Int))
            .column(ColumnDef::new("email", DataType::Varchar(255)))
            .column(ColumnDef::new("name", DataType::Varchar(100)));

        catalog.create_table(table).unwrap();

        let idx = IndexDef::new("idx_email", "users", vec!["email".to_string()]).unique();
        catalog.create_index(idx).unwrap();

        let i = catalog.get_index("idx_email").unwrap();
        assert!(i.unique);
        assert_eq!(i.columns, vec!["email".to_string()]);

        assert!(catalog.column_is_indexed("users", "email"));
        assert!(!catalog.column_is_indexed("users", "name"));
        assert!(!catalog.column_is_indexed("orders", "email"));

        assert_eq!(catalog.get_indexes_for_table("users").len(), 1);

        // Duplicate index should fail
        let idx2 = IndexDef::new("idx_email", "users", vec!["name".to_string()]);
        assert!(matches!(
            catalog.create_index(idx2),
            Err(CatalogError::IndexExists(_))
        ));

        // Index on non-existent table should fail
        let idx3 = IndexDef::new("idx_bad", "nonexistent", vec!["col".to_string()]);
        assert!(matches!(
            catalog.create_index(idx3),
            Err(CatalogError::TableNotFound(_))
        ));

        // Index on non-existent column should fail
        let idx4 = IndexDef::new("idx_bad2", "users", vec!["missing".to_string()]);
        assert!(matches!(
            catalog.create_index(idx4),
            Err(CatalogError::ColumnNotFound(_, _))
        ));
    }

    #[test]
    fn test_data_type_helpers() {
        assert!(DataType::Int.is_numeric());
        assert!(DataType::Double.is_numeric());
        assert!(DataType::Varchar(100).is_string());
        assert!(DataType::Text.is_string());
        assert!(!DataType::Boolean.is_numeric());
    }
}
