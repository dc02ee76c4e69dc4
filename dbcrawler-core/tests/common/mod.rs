//! In-process fixture database for crawl tests.
//!
//! Models a small sales database with two schemas:
//! - `PUBLIC`: `CUSTOMER`, `CUSTOMERLIST` (view), `INVOICE`, `ITEM`,
//!   `PRODUCT`, `SUPPLIER`, plus two routines
//! - `SCHEMACRAWLER`: `ITEM`, `PRODUCT2`
//!
//! Generic metadata requests answer like a JDBC-style driver. View and
//! routine definitions are only available through the override queries
//! below, the way an engine that hides them from driver metadata behaves.

#![allow(dead_code, clippy::unwrap_used)]

use async_trait::async_trait;
use dbcrawler_core::{
    CrawlError, DatabaseInfo, MetadataCategory, MetadataConnection, MetadataRequest, MetadataRow,
    Result, TableRef, TableType,
};
use std::collections::HashSet;
use std::sync::Mutex;

pub const VIEW_DEFINITIONS_SQL: &str =
    "SELECT TABLE_SCHEMA, TABLE_NAME, VIEW_DEFINITION FROM INFORMATION_SCHEMA.SYSTEM_VIEWS";
pub const ROUTINES_SQL: &str =
    "SELECT ROUTINE_SCHEMA, ROUTINE_NAME, ROUTINE_DEFINITION FROM INFORMATION_SCHEMA.ROUTINES";
pub const TRIGGERS_SQL: &str = "SELECT * FROM INFORMATION_SCHEMA.TRIGGERS";
pub const CHECK_CONSTRAINTS_SQL: &str =
    "SELECT * FROM INFORMATION_SCHEMA.CHECK_CONSTRAINTS";
/// Shaped like a catalog-wide constraint view: one row names no table.
pub const SCHEMA_CHECK_CONSTRAINTS_SQL: &str =
    "SELECT CONSTRAINT_SCHEMA, CONSTRAINT_NAME, CHECK_CLAUSE FROM INFORMATION_SCHEMA.CHECK_CONSTRAINTS";

struct FixtureColumn {
    name: &'static str,
    type_name: &'static str,
    type_code: &'static str,
    nullable: bool,
}

const fn col(
    name: &'static str,
    type_name: &'static str,
    type_code: &'static str,
    nullable: bool,
) -> FixtureColumn {
    FixtureColumn {
        name,
        type_name,
        type_code,
        nullable,
    }
}

struct FixtureIndex {
    name: &'static str,
    unique: bool,
    columns: &'static [&'static str],
}

struct FixtureForeignKey {
    name: &'static str,
    column: &'static str,
    referenced: (&'static str, &'static str, &'static str),
}

struct FixtureTable {
    schema: &'static str,
    name: &'static str,
    view: bool,
    columns: Vec<FixtureColumn>,
    indexes: Vec<FixtureIndex>,
    foreign_keys: Vec<FixtureForeignKey>,
}

fn fixture_tables() -> Vec<FixtureTable> {
    vec![
        FixtureTable {
            schema: "PUBLIC",
            name: "CUSTOMER",
            view: false,
            columns: vec![
                col("ID", "INTEGER", "4", false),
                col("FIRSTNAME", "VARCHAR", "12", false),
                col("LASTNAME", "VARCHAR", "12", false),
                col("STREET", "VARCHAR", "12", true),
                col("CITY", "VARCHAR", "12", true),
            ],
            indexes: vec![],
            foreign_keys: vec![],
        },
        FixtureTable {
            schema: "PUBLIC",
            name: "CUSTOMERLIST",
            view: true,
            columns: vec![
                col("ID", "INTEGER", "4", true),
                col("FIRSTNAME", "VARCHAR", "12", true),
                col("LASTNAME", "VARCHAR", "12", true),
            ],
            indexes: vec![],
            foreign_keys: vec![],
        },
        FixtureTable {
            schema: "PUBLIC",
            name: "INVOICE",
            view: false,
            columns: vec![
                col("ID", "INTEGER", "4", false),
                col("CUSTOMERID", "INTEGER", "4", false),
                col("TOTAL", "DECIMAL", "3", true),
            ],
            indexes: vec![
                FixtureIndex {
                    name: "SYS_IDX_46",
                    unique: true,
                    columns: &["ID"],
                },
                FixtureIndex {
                    name: "SYS_IDX_FK_INVOICE_CUSTOMER",
                    unique: false,
                    columns: &["CUSTOMERID"],
                },
            ],
            foreign_keys: vec![FixtureForeignKey {
                name: "FK_INVOICE_CUSTOMER",
                column: "CUSTOMERID",
                referenced: ("PUBLIC", "CUSTOMER", "ID"),
            }],
        },
        FixtureTable {
            schema: "PUBLIC",
            name: "ITEM",
            view: false,
            columns: vec![
                col("INVOICEID", "INTEGER", "4", false),
                col("ITEM", "INTEGER", "4", false),
                col("PRODUCTID", "INTEGER", "4", false),
                col("QUANTITY", "INTEGER", "4", true),
                col("COST", "DECIMAL", "3", true),
            ],
            indexes: vec![
                FixtureIndex {
                    name: "SYS_IDX_51",
                    unique: true,
                    columns: &["INVOICEID", "ITEM"],
                },
                FixtureIndex {
                    name: "SYS_IDX_FK_ITEM_INVOICE",
                    unique: false,
                    columns: &["INVOICEID"],
                },
                FixtureIndex {
                    name: "SYS_IDX_FK_ITEM_PRODUCT",
                    unique: false,
                    columns: &["PRODUCTID"],
                },
                FixtureIndex {
                    name: "IDX_ITEM_QUANTITY",
                    unique: false,
                    columns: &["QUANTITY"],
                },
            ],
            foreign_keys: vec![
                FixtureForeignKey {
                    name: "FK_ITEM_INVOICE",
                    column: "INVOICEID",
                    referenced: ("PUBLIC", "INVOICE", "ID"),
                },
                FixtureForeignKey {
                    name: "FK_ITEM_PRODUCT",
                    column: "PRODUCTID",
                    referenced: ("PUBLIC", "PRODUCT", "ID"),
                },
            ],
        },
        FixtureTable {
            schema: "PUBLIC",
            name: "PRODUCT",
            view: false,
            columns: vec![
                col("ID", "INTEGER", "4", false),
                col("NAME", "VARCHAR", "12", false),
                col("PRICE", "DECIMAL", "3", true),
            ],
            indexes: vec![],
            foreign_keys: vec![],
        },
        FixtureTable {
            schema: "PUBLIC",
            name: "SUPPLIER",
            view: false,
            columns: vec![
                col("SUPPLIER_ID", "INTEGER", "4", false),
                col("SUPPLIER_NAME", "VARCHAR", "12", false),
            ],
            indexes: vec![
                FixtureIndex {
                    name: "SYS_IDX_58",
                    unique: true,
                    columns: &["SUPPLIER_ID"],
                },
                FixtureIndex {
                    name: "IDX_SUPPLIER_NAME",
                    unique: true,
                    columns: &["SUPPLIER_NAME"],
                },
            ],
            foreign_keys: vec![],
        },
        FixtureTable {
            schema: "SCHEMACRAWLER",
            name: "ITEM",
            view: false,
            columns: vec![
                col("ID", "INTEGER", "4", false),
                col("NAME", "VARCHAR", "12", true),
            ],
            indexes: vec![FixtureIndex {
                name: "SYS_IDX_63",
                unique: true,
                columns: &["ID"],
            }],
            foreign_keys: vec![],
        },
        FixtureTable {
            schema: "SCHEMACRAWLER",
            name: "PRODUCT2",
            view: false,
            columns: vec![
                col("ID", "INTEGER", "4", false),
                col("ITEMID", "INTEGER", "4", true),
                col("PRICE", "DECIMAL", "3", true),
            ],
            indexes: vec![],
            foreign_keys: vec![FixtureForeignKey {
                name: "FK_PRODUCT2_ITEM",
                column: "ITEMID",
                referenced: ("SCHEMACRAWLER", "ITEM", "ID"),
            }],
        },
    ]
}

fn fixture_schemas() -> [&'static str; 2] {
    ["PUBLIC", "SCHEMACRAWLER"]
}

/// Builder-configured fixture connection that records every call.
pub struct FixtureDatabase {
    tables: Vec<FixtureTable>,
    failures: HashSet<(MetadataCategory, String)>,
    column_gaps: HashSet<String>,
    fail_schemas: bool,
    fail_database_info: bool,
    dangling_foreign_key: bool,
    log: Mutex<Vec<String>>,
}

impl Default for FixtureDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureDatabase {
    pub fn new() -> Self {
        Self {
            tables: fixture_tables(),
            failures: HashSet::new(),
            column_gaps: HashSet::new(),
            fail_schemas: false,
            fail_database_info: false,
            dangling_foreign_key: false,
            log: Mutex::new(Vec::new()),
        }
    }

    /// Makes the generic request for `category` on `object` fail.
    pub fn failing(mut self, category: MetadataCategory, object: &str) -> Self {
        self.failures.insert((category, object.to_string()));
        self
    }

    /// Reports column ordinals 1, 2, 4, ... for `table`.
    pub fn with_column_gap(mut self, table: &str) -> Self {
        self.column_gaps.insert(table.to_string());
        self
    }

    pub fn failing_schema_list(mut self) -> Self {
        self.fail_schemas = true;
        self
    }

    pub fn failing_database_info(mut self) -> Self {
        self.fail_database_info = true;
        self
    }

    /// Adds a foreign key from `PUBLIC.SUPPLIER` to a table that does not exist.
    pub fn with_dangling_foreign_key(mut self) -> Self {
        self.dangling_foreign_key = true;
        self
    }

    /// Every request and query issued so far.
    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn count_matching(&self, prefix: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.starts_with(prefix))
            .count()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn table(&self, key: &TableRef) -> Option<&FixtureTable> {
        self.tables
            .iter()
            .find(|t| t.schema == key.schema && t.name == key.name)
    }

    fn schema_rows(&self) -> Vec<MetadataRow> {
        fixture_schemas()
            .iter()
            .map(|schema| {
                MetadataRow::new()
                    .with("TABLE_SCHEM", *schema)
                    .with_null("TABLE_CATALOG")
            })
            .collect()
    }

    fn table_rows(&self, schema: &str, types: &[TableType]) -> Vec<MetadataRow> {
        self.tables
            .iter()
            .filter(|t| t.schema == schema)
            .filter(|t| {
                let table_type = if t.view { TableType::View } else { TableType::Table };
                types.contains(&table_type)
            })
            .map(|t| {
                MetadataRow::new()
                    .with("TABLE_SCHEM", t.schema)
                    .with("TABLE_NAME", t.name)
                    .with("TABLE_TYPE", if t.view { "VIEW" } else { "TABLE" })
            })
            .collect()
    }

    fn column_rows(&self, key: &TableRef) -> Vec<MetadataRow> {
        let gap = self.column_gaps.contains(&key.to_string());
        self.table(key)
            .map(|t| {
                t.columns
                    .iter()
                    .enumerate()
                    .map(|(index, c)| {
                        let ordinal = if gap && index > 1 { index + 2 } else { index + 1 };
                        MetadataRow::new()
                            .with("TABLE_SCHEM", t.schema)
                            .with("TABLE_NAME", t.name)
                            .with("COLUMN_NAME", c.name)
                            .with("ORDINAL_POSITION", ordinal.to_string())
                            .with("DATA_TYPE", c.type_code)
                            .with("TYPE_NAME", c.type_name)
                            .with("IS_NULLABLE", if c.nullable { "YES" } else { "NO" })
                            .with_null("COLUMN_DEF")
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn index_rows(&self, key: &TableRef) -> Vec<MetadataRow> {
        self.table(key)
            .map(|t| {
                t.indexes
                    .iter()
                    .flat_map(|index| {
                        index.columns.iter().enumerate().map(move |(position, column)| {
                            MetadataRow::new()
                                .with("TABLE_SCHEM", t.schema)
                                .with("TABLE_NAME", t.name)
                                .with("NON_UNIQUE", if index.unique { "false" } else { "true" })
                                .with("INDEX_NAME", index.name)
                                .with("ORDINAL_POSITION", (position + 1).to_string())
                                .with("COLUMN_NAME", *column)
                                .with("ASC_OR_DESC", "A")
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn foreign_key_rows(&self, key: &TableRef) -> Vec<MetadataRow> {
        let mut rows: Vec<MetadataRow> = self
            .table(key)
            .map(|t| {
                t.foreign_keys
                    .iter()
                    .map(|fk| {
                        MetadataRow::new()
                            .with("PKTABLE_SCHEM", fk.referenced.0)
                            .with("PKTABLE_NAME", fk.referenced.1)
                            .with("PKCOLUMN_NAME", fk.referenced.2)
                            .with("FKTABLE_SCHEM", t.schema)
                            .with("FKTABLE_NAME", t.name)
                            .with("FKCOLUMN_NAME", fk.column)
                            .with("KEY_SEQ", "1")
                            .with("FK_NAME", fk.name)
                    })
                    .collect()
            })
            .unwrap_or_default();

        if self.dangling_foreign_key && key.schema == "PUBLIC" && key.name == "SUPPLIER" {
            rows.push(
                MetadataRow::new()
                    .with("PKTABLE_SCHEM", "ARCHIVE")
                    .with("PKTABLE_NAME", "VENDOR")
                    .with("PKCOLUMN_NAME", "ID")
                    .with("FKCOLUMN_NAME", "SUPPLIER_ID")
                    .with("KEY_SEQ", "1")
                    .with("FK_NAME", "FK_SUPPLIER_VENDOR"),
            );
        }
        rows
    }

    fn check_constraint_rows(&self, key: &TableRef) -> Vec<MetadataRow> {
        if key.schema == "PUBLIC" && key.name == "PRODUCT" {
            vec![
                MetadataRow::new()
                    .with("CONSTRAINT_SCHEMA", "PUBLIC")
                    .with("TABLE_NAME", "PRODUCT")
                    .with("CONSTRAINT_NAME", "CHECK_PRICE")
                    .with("CHECK_CLAUSE", "PRICE >= 0"),
            ]
        } else {
            Vec::new()
        }
    }

    fn trigger_rows(&self, schema: Option<&str>, table: Option<&str>) -> Vec<MetadataRow> {
        let matches = schema.is_none_or(|s| s == "PUBLIC") && table.is_none_or(|t| t == "CUSTOMER");
        if !matches {
            return Vec::new();
        }
        vec![
            MetadataRow::new()
                .with("TRIGGER_SCHEMA", "PUBLIC")
                .with("TRIGGER_NAME", "SCTRIGGER")
                .with("EVENT_MANIPULATION", "DELETE")
                .with("EVENT_OBJECT_SCHEMA", "PUBLIC")
                .with("EVENT_OBJECT_TABLE", "CUSTOMER")
                .with("CONDITION_TIMING", "AFTER")
                .with("ACTION_STATEMENT", "DELETE FROM INVOICE WHERE CUSTOMERID = OLD.ID"),
        ]
    }

    fn procedure_rows(&self, schema: &str) -> Vec<MetadataRow> {
        if schema != "PUBLIC" {
            return Vec::new();
        }
        ["CUSTADD", "NEW_CUSTOMER"]
            .iter()
            .map(|name| {
                MetadataRow::new()
                    .with("ROUTINE_SCHEMA", "PUBLIC")
                    .with("ROUTINE_NAME", *name)
            })
            .collect()
    }

    fn override_rows(&self, sql: &str) -> Option<Vec<MetadataRow>> {
        match sql {
            VIEW_DEFINITIONS_SQL => Some(vec![
                MetadataRow::new()
                    .with("TABLE_SCHEMA", "PUBLIC")
                    .with("TABLE_NAME", "CUSTOMERLIST")
                    .with(
                        "VIEW_DEFINITION",
                        "SELECT ID, FIRSTNAME, LASTNAME FROM PUBLIC.CUSTOMER",
                    ),
            ]),
            ROUTINES_SQL => Some(vec![
                MetadataRow::new()
                    .with("ROUTINE_SCHEMA", "PUBLIC")
                    .with("ROUTINE_NAME", "CUSTADD")
                    .with("ROUTINE_DEFINITION", "BEGIN ATOMIC INSERT INTO CUSTOMER VALUES (1); END"),
                MetadataRow::new()
                    .with("ROUTINE_SCHEMA", "PUBLIC")
                    .with("ROUTINE_NAME", "NEW_CUSTOMER")
                    .with("ROUTINE_DEFINITION", "BEGIN ATOMIC END"),
            ]),
            TRIGGERS_SQL => Some(self.trigger_rows(None, None)),
            CHECK_CONSTRAINTS_SQL => Some(self.check_constraint_rows(&TableRef::new("PUBLIC", "PRODUCT"))),
            SCHEMA_CHECK_CONSTRAINTS_SQL => {
                let mut rows = self.check_constraint_rows(&TableRef::new("PUBLIC", "PRODUCT"));
                rows.push(
                    MetadataRow::new()
                        .with("CONSTRAINT_SCHEMA", "PUBLIC")
                        .with("CONSTRAINT_NAME", "CK_PRICE")
                        .with("CHECK_CLAUSE", "PRICE > 0"),
                );
                Some(rows)
            }
            _ => None,
        }
    }
}

#[async_trait]
impl MetadataConnection for FixtureDatabase {
    async fn metadata(&self, request: &MetadataRequest) -> Result<Vec<MetadataRow>> {
        let object = request.object();
        let label = request
            .category()
            .map_or_else(|| "schemas".to_string(), |c| c.to_string());
        self.record(format!("metadata:{}:{}", label, object));

        if let Some(category) = request.category()
            && self.failures.contains(&(category, object.clone()))
        {
            return Err(CrawlError::query_failed(
                format!("Failed to collect {} for '{}'", category, object),
                std::io::Error::other("feature not supported"),
            ));
        }

        Ok(match request {
            MetadataRequest::Schemas => {
                if self.fail_schemas {
                    return Err(CrawlError::query_failed(
                        "Failed to enumerate schemas",
                        std::io::Error::other("connection reset"),
                    ));
                }
                self.schema_rows()
            }
            MetadataRequest::Tables { schema, types } => self.table_rows(schema, types),
            MetadataRequest::Columns(table) => self.column_rows(table),
            MetadataRequest::Indexes(table) => self.index_rows(table),
            MetadataRequest::ForeignKeys(table) => self.foreign_key_rows(table),
            MetadataRequest::CheckConstraints(table) => self.check_constraint_rows(table),
            MetadataRequest::Triggers(table) => {
                self.trigger_rows(Some(&table.schema), Some(&table.name))
            }
            MetadataRequest::Procedures { schema } => self.procedure_rows(schema),
            MetadataRequest::ViewDefinitions { .. } => Vec::new(),
        })
    }

    async fn query(&self, sql: &str) -> Result<Vec<MetadataRow>> {
        self.record(format!("query:{}", sql));
        self.override_rows(sql).ok_or_else(|| {
            CrawlError::query_failed(
                "Failed to execute metadata query",
                std::io::Error::other(format!("unexpected token in: {}", sql)),
            )
        })
    }

    async fn database_info(&self) -> Result<DatabaseInfo> {
        if self.fail_database_info {
            return Err(CrawlError::query_failed(
                "Failed to get product version",
                std::io::Error::other("not supported"),
            ));
        }
        Ok(DatabaseInfo::new("Fixture Database").with_version("2.7.1"))
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }
}
