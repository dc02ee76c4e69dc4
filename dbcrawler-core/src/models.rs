//! Catalog entity model.
//!
//! A [`Catalog`] owns its schemas, schemas own tables and procedures, and
//! tables own columns, indexes, foreign keys, check constraints and
//! triggers. Foreign keys refer to other tables by name only; use
//! [`Catalog::table`] and [`Catalog::column`] to follow them.
//!
//! `PartialEq` on every entity is deep structural equality. Identity of a
//! table is its [`TableRef`] (schema plus name), available via
//! [`Table::key`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Database product information recorded with the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub product_name: String,
    pub product_version: Option<String>,
}

impl DatabaseInfo {
    /// Creates database information for a named product.
    pub fn new(product_name: impl Into<String>) -> Self {
        Self {
            product_name: product_name.into(),
            product_version: None,
        }
    }

    /// Builder method to set the product version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.product_version = Some(version.into());
        self
    }
}

/// Immutable snapshot of a database's structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub database_info: DatabaseInfo,
    /// Schemas ordered by name
    pub schemas: Vec<Schema>,
}

impl Catalog {
    /// Looks up a schema by name.
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    /// Iterates over every table and view in schema order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.schemas.iter().flat_map(|s| s.tables.iter())
    }

    /// Iterates over every procedure in schema order.
    pub fn procedures(&self) -> impl Iterator<Item = &Procedure> {
        self.schemas.iter().flat_map(|s| s.procedures.iter())
    }

    /// Resolves a table reference.
    pub fn table(&self, key: &TableRef) -> Option<&Table> {
        self.schema(&key.schema).and_then(|s| s.table(&key.name))
    }

    /// Resolves a column reference.
    pub fn column(&self, reference: &ColumnReference) -> Option<&Column> {
        self.table(&reference.table_ref())
            .and_then(|t| t.column(&reference.column))
    }

    /// Foreign keys that involve `key`, either as the referencing table
    /// (imported keys) or as the referenced table (exported keys).
    ///
    /// Imported keys come first, in the table's own order, followed by
    /// exported keys in catalog order. A self-referencing key is listed once.
    pub fn foreign_keys_involving(&self, key: &TableRef) -> Vec<&ForeignKey> {
        let imported: Vec<&ForeignKey> = self
            .table(key)
            .map(|t| t.foreign_keys.iter().collect())
            .unwrap_or_default();

        let exported = self
            .tables()
            .filter(|t| t.key() != *key)
            .flat_map(|t| t.foreign_keys.iter())
            .filter(|fk| fk.references(key));

        imported.into_iter().chain(exported).collect()
    }
}

/// A named schema and the objects it owns.
///
/// Table and procedure names are independent namespaces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    /// Tables and views ordered by name
    pub tables: Vec<Table>,
    /// Procedures ordered by name
    pub procedures: Vec<Procedure>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            procedures: Vec::new(),
        }
    }

    /// Full name of a schema is its name.
    pub fn full_name(&self) -> &str {
        &self.name
    }

    /// Looks up a table or view by name.
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Looks up a procedure by name.
    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures.iter().find(|p| p.name == name)
    }
}

/// Identity of a table: schema plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableRef {
    pub schema: String,
    pub name: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.name)
    }
}

/// Table or view discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableKind {
    Table,
    View {
        /// Definition text, absent when no query supplied it
        definition: Option<String>,
    },
}

/// A table or view and the objects it owns.
///
/// `==` compares the whole subtree. Two tables are the same table when
/// their [`Table::key`] values are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub schema_name: String,
    pub name: String,
    pub kind: TableKind,
    /// Columns ordered by ordinal, which runs densely from 1
    pub columns: Vec<Column>,
    pub indexes: Vec<Index>,
    pub foreign_keys: Vec<ForeignKey>,
    pub check_constraints: Vec<CheckConstraint>,
    pub triggers: Vec<Trigger>,
}

impl Table {
    /// `schema.name`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.name)
    }

    /// Identity of the table: schema name plus table name.
    pub fn key(&self) -> TableRef {
        TableRef::new(&self.schema_name, &self.name)
    }

    pub fn is_view(&self) -> bool {
        matches!(self.kind, TableKind::View { .. })
    }

    /// View definition text. Always `None` for tables.
    pub fn definition(&self) -> Option<&str> {
        match &self.kind {
            TableKind::View { definition } => definition.as_deref(),
            TableKind::Table => None,
        }
    }

    /// Upper-case type label, `TABLE` or `VIEW`.
    pub fn type_label(&self) -> &'static str {
        if self.is_view() { "VIEW" } else { "TABLE" }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|i| i.name == name)
    }

    pub fn trigger(&self, name: &str) -> Option<&Trigger> {
        self.triggers.iter().find(|t| t.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub schema_name: String,
    pub table_name: String,
    pub name: String,
    /// 1-based position within the owning table
    pub ordinal: u32,
    /// Generic declared type name
    pub type_name: String,
    /// Type name as reported by the database
    pub database_specific_type_name: String,
    pub nullable: bool,
    pub default_value: Option<String>,
}

impl Column {
    /// `schema.table.column`
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}", self.schema_name, self.table_name, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "ascending"),
            SortDirection::Descending => write!(f, "descending"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexColumn {
    pub name: String,
    /// `None` when the database does not report a direction
    pub direction: Option<SortDirection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Index {
    pub name: String,
    /// Key columns in index order
    pub columns: Vec<IndexColumn>,
    pub unique: bool,
}

/// A column addressed by schema, table and column name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnReference {
    pub schema: String,
    pub table: String,
    pub column: String,
}

impl ColumnReference {
    pub fn new(
        schema: impl Into<String>,
        table: impl Into<String>,
        column: impl Into<String>,
    ) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn table_ref(&self) -> TableRef {
        TableRef::new(&self.schema, &self.table)
    }

    /// `schema.table.column`
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}", self.schema, self.table, self.column)
    }
}

/// One (referencing column, referenced column) pair of a foreign key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyColumn {
    /// Column of the owning table
    pub column: String,
    pub referenced: ColumnReference,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    /// Column pairs in key sequence order
    pub columns: Vec<ForeignKeyColumn>,
    /// True when every referenced column exists in the crawled catalog
    pub resolved: bool,
}

impl ForeignKey {
    /// The referenced table, taken from the first column pair.
    pub fn referenced_table(&self) -> Option<TableRef> {
        self.columns.first().map(|c| c.referenced.table_ref())
    }

    /// True if any column pair points at `key`.
    pub fn references(&self, key: &TableRef) -> bool {
        self.columns
            .iter()
            .any(|c| c.referenced.schema == key.schema && c.referenced.table == key.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConstraint {
    pub name: String,
    pub definition: String,
}

/// Data manipulation event that fires a trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventManipulationType {
    Insert,
    Update,
    Delete,
    Unknown,
}

impl EventManipulationType {
    /// Parses an event name, ignoring case and surrounding whitespace.
    pub fn from_text(text: &str) -> Self {
        match text.trim().to_ascii_uppercase().as_str() {
            "INSERT" => Self::Insert,
            "UPDATE" => Self::Update,
            "DELETE" => Self::Delete,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for EventManipulationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

/// When a trigger fires relative to its event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTiming {
    Before,
    After,
    InsteadOf,
    Unknown,
}

impl fmt::Display for ActionTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Before => "before",
            Self::After => "after",
            Self::InsteadOf => "instead of",
            Self::Unknown => "unknown",
        };
        f.write_str(text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub schema_name: String,
    pub table_name: String,
    pub name: String,
    pub event: EventManipulationType,
    pub timing: ActionTiming,
    /// Timing text exactly as the database reported it
    pub timing_text: Option<String>,
    pub action_statement: Option<String>,
}

impl Trigger {
    /// `schema.table.trigger`
    pub fn full_name(&self) -> String {
        format!("{}.{}.{}", self.schema_name, self.table_name, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Procedure {
    pub schema_name: String,
    pub name: String,
    /// Present only when an override query supplies the text
    pub definition: Option<String>,
}

impl Procedure {
    /// `schema.name`
    pub fn full_name(&self) -> String {
        format!("{}.{}", self.schema_name, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(schema: &str, name: &str, foreign_keys: Vec<ForeignKey>) -> Table {
        Table {
            schema_name: schema.to_string(),
            name: name.to_string(),
            kind: TableKind::Table,
            columns: vec![Column {
                schema_name: schema.to_string(),
                table_name: name.to_string(),
                name: "ID".to_string(),
                ordinal: 1,
                type_name: "INTEGER".to_string(),
                database_specific_type_name: "INTEGER".to_string(),
                nullable: false,
                default_value: None,
            }],
            indexes: Vec::new(),
            foreign_keys,
            check_constraints: Vec::new(),
            triggers: Vec::new(),
        }
    }

    fn fk(name: &str, column: &str, target: (&str, &str, &str)) -> ForeignKey {
        ForeignKey {
            name: name.to_string(),
            columns: vec![ForeignKeyColumn {
                column: column.to_string(),
                referenced: ColumnReference::new(target.0, target.1, target.2),
            }],
            resolved: true,
        }
    }

    fn catalog() -> Catalog {
        let mut public = Schema::new("PUBLIC");
        public.tables = vec![
            table("PUBLIC", "CUSTOMER", Vec::new()),
            table(
                "PUBLIC",
                "INVOICE",
                vec![fk("FK_INVOICE_CUSTOMER", "CUSTOMERID", ("PUBLIC", "CUSTOMER", "ID"))],
            ),
        ];
        let mut other = Schema::new("ARCHIVE");
        other.tables = vec![table(
            "ARCHIVE",
            "OLD_INVOICE",
            vec![fk("FK_OLD_CUSTOMER", "CUSTOMERID", ("PUBLIC", "CUSTOMER", "ID"))],
        )];
        Catalog {
            database_info: DatabaseInfo::new("Fixture").with_version("1.0"),
            schemas: vec![other, public],
        }
    }

    #[test]
    fn test_full_names() {
        let catalog = catalog();
        let invoice = catalog
            .table(&TableRef::new("PUBLIC", "INVOICE"))
            .unwrap();
        assert_eq!(invoice.full_name(), "PUBLIC.INVOICE");
        assert_eq!(invoice.columns[0].full_name(), "PUBLIC.INVOICE.ID");

        let trigger = Trigger {
            schema_name: "PUBLIC".to_string(),
            table_name: "CUSTOMER".to_string(),
            name: "SCTRIGGER".to_string(),
            event: EventManipulationType::Delete,
            timing: ActionTiming::After,
            timing_text: Some("AFTER".to_string()),
            action_statement: None,
        };
        assert_eq!(trigger.full_name(), "PUBLIC.CUSTOMER.SCTRIGGER");
    }

    #[test]
    fn test_foreign_keys_involving_counts_both_directions() {
        let catalog = catalog();
        let customer = TableRef::new("PUBLIC", "CUSTOMER");
        let invoice = TableRef::new("PUBLIC", "INVOICE");

        let names: Vec<&str> = catalog
            .foreign_keys_involving(&customer)
            .iter()
            .map(|fk| fk.name.as_str())
            .collect();
        assert_eq!(names, vec!["FK_OLD_CUSTOMER", "FK_INVOICE_CUSTOMER"]);

        assert_eq!(catalog.foreign_keys_involving(&invoice).len(), 1);
    }

    #[test]
    fn test_column_lookup_across_schemas() {
        let catalog = catalog();
        let reference = ColumnReference::new("PUBLIC", "CUSTOMER", "ID");
        assert!(catalog.column(&reference).is_some());
        assert!(
            catalog
                .column(&ColumnReference::new("PUBLIC", "CUSTOMER", "MISSING"))
                .is_none()
        );
    }

    #[test]
    fn test_structural_equality() {
        let a = table("PUBLIC", "CUSTOMER", Vec::new());
        let b = table("PUBLIC", "CUSTOMER", Vec::new());
        let c = table("PUBLIC", "SUPPLIER", Vec::new());

        assert_eq!(a, b);
        assert_eq!(a.key(), b.key());
        assert_ne!(a, c);

        // Same identity, different contents
        let mut d = a.clone();
        d.kind = TableKind::View { definition: None };
        assert_ne!(a, d);
        assert_eq!(a.key(), d.key());
    }

    #[test]
    fn test_view_definition_only_on_views() {
        let mut view = table("PUBLIC", "CUSTOMERLIST", Vec::new());
        view.kind = TableKind::View {
            definition: Some("SELECT ID FROM CUSTOMER".to_string()),
        };
        assert!(view.is_view());
        assert_eq!(view.type_label(), "VIEW");
        assert_eq!(view.definition(), Some("SELECT ID FROM CUSTOMER"));

        let plain = table("PUBLIC", "CUSTOMER", Vec::new());
        assert_eq!(plain.definition(), None);
        assert_eq!(plain.type_label(), "TABLE");
    }

    #[test]
    fn test_event_manipulation_parsing() {
        assert_eq!(
            EventManipulationType::from_text(" delete "),
            EventManipulationType::Delete
        );
        assert_eq!(
            EventManipulationType::from_text("INSERT"),
            EventManipulationType::Insert
        );
        assert_eq!(
            EventManipulationType::from_text("TRUNCATE"),
            EventManipulationType::Unknown
        );
    }

    #[test]
    fn test_catalog_serializes_with_kind_tag() {
        let catalog = catalog();
        let json = serde_json::to_value(&catalog).unwrap();
        assert_eq!(json["schemas"][1]["tables"][0]["kind"]["kind"], "table");
    }
}
