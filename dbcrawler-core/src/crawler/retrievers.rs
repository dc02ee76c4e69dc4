//! Category retrievers.
//!
//! A retriever turns one category request into raw rows. When the category
//! has an override query, the query runs once per schema and its
//! catalog-wide result is filtered down to the requested schema and table;
//! otherwise the generic metadata request is issued. Retrievers never build
//! entities.

use super::{MetadataCategory, MetadataViewOverrides};
use crate::Result;
use crate::adapters::{MetadataConnection, MetadataRequest, MetadataRow, TableType};
use crate::error::CrawlError;
use crate::models::TableRef;
use std::collections::HashMap;

/// Fields that may carry the schema name in an override result.
fn schema_fields(category: MetadataCategory) -> &'static [&'static str] {
    match category {
        MetadataCategory::Triggers => &[
            "EVENT_OBJECT_SCHEMA",
            "TRIGGER_SCHEMA",
            "TABLE_SCHEM",
            "TABLE_SCHEMA",
        ],
        MetadataCategory::Procedures => &[
            "ROUTINE_SCHEMA",
            "PROCEDURE_SCHEM",
            "SPECIFIC_SCHEMA",
        ],
        MetadataCategory::ForeignKeys => &["FKTABLE_SCHEM", "TABLE_SCHEM", "TABLE_SCHEMA"],
        _ => &["TABLE_SCHEM", "TABLE_SCHEMA", "CONSTRAINT_SCHEMA"],
    }
}

/// Fields that may carry the table name in an override result.
fn table_fields(category: MetadataCategory) -> &'static [&'static str] {
    match category {
        MetadataCategory::Triggers => &["EVENT_OBJECT_TABLE", "TABLE_NAME"],
        MetadataCategory::ForeignKeys => &["FKTABLE_NAME", "TABLE_NAME"],
        _ => &["TABLE_NAME"],
    }
}

/// A row with no identifying value for `fields` is not filtered out.
/// Only schema matching is this lenient.
fn row_matches(row: &MetadataRow, fields: &[&str], value: &str) -> bool {
    row.get_any(fields).is_none_or(|found| found == value)
}

/// A per-table row must name its table; one that does not has no owner.
fn row_owned_by(
    category: MetadataCategory,
    row: &MetadataRow,
    fields: &[&str],
    table: &str,
) -> bool {
    match row.get_any(fields) {
        Some(found) => found == table,
        None => {
            tracing::debug!(
                "Dropping {} override row without a table name: {:?}",
                category,
                row
            );
            false
        }
    }
}

/// Runs category requests against one connection.
///
/// Holds the per-schema cache of override results, so one retriever must
/// serve exactly one crawl.
pub(crate) struct Retriever<'a> {
    connection: &'a dyn MetadataConnection,
    overrides: &'a MetadataViewOverrides,
    /// Override results per (category, schema); a failure is kept as its message
    override_rows: HashMap<(MetadataCategory, String), std::result::Result<Vec<MetadataRow>, String>>,
}

impl<'a> Retriever<'a> {
    pub(crate) fn new(
        connection: &'a dyn MetadataConnection,
        overrides: &'a MetadataViewOverrides,
    ) -> Self {
        Self {
            connection,
            overrides,
            override_rows: HashMap::new(),
        }
    }

    /// Schema list. A failure here is fatal for the crawl.
    pub(crate) async fn schemas(&self) -> Result<Vec<MetadataRow>> {
        self.connection
            .metadata(&MetadataRequest::Schemas)
            .await
            .map_err(|e| match e {
                CrawlError::Connection { .. } | CrawlError::Configuration { .. } => e,
                other => CrawlError::Connection {
                    context: "Failed to retrieve the schema list".to_string(),
                    source: Box::new(other),
                },
            })
    }

    pub(crate) async fn tables(
        &mut self,
        schema: &str,
        types: &[TableType],
    ) -> Result<Vec<MetadataRow>> {
        let request = MetadataRequest::Tables {
            schema: schema.to_string(),
            types: types.to_vec(),
        };
        self.retrieve(MetadataCategory::Tables, schema, None, request)
            .await
    }

    pub(crate) async fn columns(&mut self, table: &TableRef) -> Result<Vec<MetadataRow>> {
        self.per_table(MetadataCategory::Columns, table).await
    }

    pub(crate) async fn indexes(&mut self, table: &TableRef) -> Result<Vec<MetadataRow>> {
        self.per_table(MetadataCategory::Indexes, table).await
    }

    pub(crate) async fn foreign_keys(&mut self, table: &TableRef) -> Result<Vec<MetadataRow>> {
        self.per_table(MetadataCategory::ForeignKeys, table).await
    }

    pub(crate) async fn check_constraints(
        &mut self,
        table: &TableRef,
    ) -> Result<Vec<MetadataRow>> {
        self.per_table(MetadataCategory::CheckConstraints, table)
            .await
    }

    pub(crate) async fn triggers(&mut self, table: &TableRef) -> Result<Vec<MetadataRow>> {
        self.per_table(MetadataCategory::Triggers, table).await
    }

    pub(crate) async fn procedures(&mut self, schema: &str) -> Result<Vec<MetadataRow>> {
        let request = MetadataRequest::Procedures {
            schema: schema.to_string(),
        };
        self.retrieve(MetadataCategory::Procedures, schema, None, request)
            .await
    }

    pub(crate) async fn view_definitions(&mut self, schema: &str) -> Result<Vec<MetadataRow>> {
        let request = MetadataRequest::ViewDefinitions {
            schema: schema.to_string(),
        };
        self.retrieve(MetadataCategory::ViewDefinitions, schema, None, request)
            .await
    }

    async fn per_table(
        &mut self,
        category: MetadataCategory,
        table: &TableRef,
    ) -> Result<Vec<MetadataRow>> {
        let Some(request) = MetadataRequest::for_table(category, table.clone()) else {
            return Err(CrawlError::configuration(format!(
                "{} is not retrieved per table",
                category
            )));
        };
        self.retrieve(category, &table.schema, Some(&table.name), request)
            .await
    }

    async fn retrieve(
        &mut self,
        category: MetadataCategory,
        schema: &str,
        table: Option<&str>,
        request: MetadataRequest,
    ) -> Result<Vec<MetadataRow>> {
        let object = match table {
            Some(table) => format!("{}.{}", schema, table),
            None => schema.to_string(),
        };

        if self.overrides.get(category).is_none() {
            tracing::debug!("Retrieving {} for {}", category, object);
            return self
                .connection
                .metadata(&request)
                .await
                .map_err(|e| CrawlError::retrieval_failed(category, &object, e));
        }

        let rows = self.override_rows(category, schema, &object).await?;
        let schema_fields = schema_fields(category);
        let table_fields = table_fields(category);

        Ok(rows
            .iter()
            .filter(|row| row_matches(row, schema_fields, schema))
            .filter(|row| {
                table.is_none_or(|name| row_owned_by(category, row, table_fields, name))
            })
            .cloned()
            .collect())
    }

    /// Runs the override for `category` the first time `schema` asks for it.
    async fn override_rows(
        &mut self,
        category: MetadataCategory,
        schema: &str,
        object: &str,
    ) -> Result<&[MetadataRow]> {
        let key = (category, schema.to_string());

        if !self.override_rows.contains_key(&key) {
            let Some(sql) = self.overrides.get(category) else {
                return Ok(&[]);
            };
            tracing::debug!("Running {} override for schema {}", category, schema);
            let result = self
                .connection
                .query(sql)
                .await
                .map_err(|e| e.to_string());
            if let Err(message) = &result {
                tracing::debug!("{} override failed: {}", category, message);
            }
            self.override_rows.insert(key.clone(), result);
        }

        match self.override_rows.get(&key) {
            Some(Ok(rows)) => Ok(rows.as_slice()),
            Some(Err(message)) => Err(CrawlError::malformed_metadata(
                category,
                object,
                format!("Override query failed: {}", message),
            )),
            None => Ok(&[]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DatabaseInfo;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Answers every override with fixed rows and counts the calls.
    struct CountingConnection {
        override_rows: Vec<MetadataRow>,
        fail_overrides: bool,
        queries: Mutex<usize>,
    }

    impl CountingConnection {
        fn new(override_rows: Vec<MetadataRow>) -> Self {
            Self {
                override_rows,
                fail_overrides: false,
                queries: Mutex::new(0),
            }
        }

        fn query_count(&self) -> usize {
            *self.queries.lock().unwrap()
        }
    }

    #[async_trait]
    impl MetadataConnection for CountingConnection {
        async fn metadata(&self, request: &MetadataRequest) -> Result<Vec<MetadataRow>> {
            match request {
                MetadataRequest::Schemas => Err(CrawlError::query_failed(
                    "schemas",
                    std::io::Error::other("catalog unavailable"),
                )),
                _ => Ok(vec![MetadataRow::new().with("GENERIC", "yes")]),
            }
        }

        async fn query(&self, _sql: &str) -> Result<Vec<MetadataRow>> {
            *self.queries.lock().unwrap() += 1;
            if self.fail_overrides {
                return Err(CrawlError::query_failed(
                    "override",
                    std::io::Error::other("syntax error"),
                ));
            }
            Ok(self.override_rows.clone())
        }

        async fn database_info(&self) -> Result<DatabaseInfo> {
            Ok(DatabaseInfo::new("Counting"))
        }

        async fn test_connection(&self) -> Result<()> {
            Ok(())
        }
    }

    fn trigger_row(schema: &str, table: &str, name: &str) -> MetadataRow {
        MetadataRow::new()
            .with("TRIGGER_SCHEMA", schema)
            .with("EVENT_OBJECT_SCHEMA", schema)
            .with("EVENT_OBJECT_TABLE", table)
            .with("TRIGGER_NAME", name)
    }

    #[tokio::test]
    async fn test_override_runs_once_per_schema_and_filters() {
        let connection = CountingConnection::new(vec![
            trigger_row("PUBLIC", "CUSTOMER", "A"),
            trigger_row("PUBLIC", "INVOICE", "B"),
            trigger_row("OTHER", "CUSTOMER", "C"),
        ]);
        let overrides =
            MetadataViewOverrides::new().with_query(MetadataCategory::Triggers, "SELECT triggers");
        let mut retriever = Retriever::new(&connection, &overrides);

        let customer = retriever
            .triggers(&TableRef::new("PUBLIC", "CUSTOMER"))
            .await
            .unwrap();
        let invoice = retriever
            .triggers(&TableRef::new("PUBLIC", "INVOICE"))
            .await
            .unwrap();
        assert_eq!(customer.len(), 1);
        assert_eq!(customer[0].get("TRIGGER_NAME"), Some("A"));
        assert_eq!(invoice[0].get("TRIGGER_NAME"), Some("B"));
        assert_eq!(connection.query_count(), 1);

        let other = retriever
            .triggers(&TableRef::new("OTHER", "CUSTOMER"))
            .await
            .unwrap();
        assert_eq!(other[0].get("TRIGGER_NAME"), Some("C"));
        assert_eq!(connection.query_count(), 2);
    }

    #[tokio::test]
    async fn test_generic_request_without_override() {
        let connection = CountingConnection::new(Vec::new());
        let overrides = MetadataViewOverrides::new().with_query(MetadataCategory::Triggers, " ");
        let mut retriever = Retriever::new(&connection, &overrides);

        let rows = retriever
            .triggers(&TableRef::new("PUBLIC", "CUSTOMER"))
            .await
            .unwrap();
        assert_eq!(rows[0].get("GENERIC"), Some("yes"));
        assert_eq!(connection.query_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_override_is_retrieval_error_for_every_table() {
        let mut connection = CountingConnection::new(Vec::new());
        connection.fail_overrides = true;
        let overrides =
            MetadataViewOverrides::new().with_query(MetadataCategory::Indexes, "SELEC broken");
        let mut retriever = Retriever::new(&connection, &overrides);

        for table in ["CUSTOMER", "INVOICE"] {
            let error = retriever
                .indexes(&TableRef::new("PUBLIC", table))
                .await
                .unwrap_err();
            assert!(matches!(
                error,
                CrawlError::CategoryRetrieval {
                    category: MetadataCategory::Indexes,
                    ..
                }
            ));
            assert!(error.to_string().contains(table));
        }
        assert_eq!(connection.query_count(), 1);
    }

    #[tokio::test]
    async fn test_schema_failure_is_fatal() {
        let connection = CountingConnection::new(Vec::new());
        let overrides = MetadataViewOverrides::new();
        let retriever = Retriever::new(&connection, &overrides);

        let error = retriever.schemas().await.unwrap_err();
        assert!(matches!(error, CrawlError::Connection { .. }));
        assert!(error.is_fatal());
    }

    #[test]
    fn test_rows_without_schema_fields_are_kept() {
        let row = MetadataRow::new().with("CONSTRAINT_NAME", "CK_1");
        assert!(row_matches(&row, &["TABLE_SCHEMA"], "PUBLIC"));

        let row = MetadataRow::new().with("table_schema", "PUBLIC");
        assert!(row_matches(&row, &["TABLE_SCHEM", "TABLE_SCHEMA"], "PUBLIC"));
        assert!(!row_matches(&row, &["TABLE_SCHEM", "TABLE_SCHEMA"], "OTHER"));
    }

    #[test]
    fn test_per_table_rows_need_a_table_name() {
        let category = MetadataCategory::CheckConstraints;
        let fields = table_fields(category);

        let row = MetadataRow::new()
            .with("CONSTRAINT_SCHEMA", "PUBLIC")
            .with("CONSTRAINT_NAME", "CK_1");
        assert!(!row_owned_by(category, &row, fields, "CUSTOMER"));

        let row = row.with("TABLE_NAME", "CUSTOMER");
        assert!(row_owned_by(category, &row, fields, "CUSTOMER"));
        assert!(!row_owned_by(category, &row, fields, "INVOICE"));
    }
}
