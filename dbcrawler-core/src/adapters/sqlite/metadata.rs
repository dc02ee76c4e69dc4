//! SQLite metadata queries.
//!
//! Every request is answered from `sqlite_master` or the table-valued
//! `PRAGMA` functions, aliased to the usual driver metadata field names.
//!
//! # SQLite System Tables
//! - `sqlite_master`: definitions of tables, views and triggers
//! - `pragma_table_info()`: columns of a table
//! - `pragma_index_list()` / `pragma_index_xinfo()`: indexes and their key columns
//! - `pragma_foreign_key_list()`: foreign keys

use crate::Result;
use crate::adapters::{MetadataRow, TableType};
use crate::error::CrawlError;
use crate::models::TableRef;
use regex::Regex;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row, Sqlite, SqlitePool, ValueRef};
use std::sync::OnceLock;

/// Quotes an identifier for use as a schema qualifier.
fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Decodes every field of a row to nullable text.
fn decode_row(row: &SqliteRow) -> MetadataRow {
    row.columns()
        .iter()
        .map(|column| {
            let index = column.ordinal();
            (column.name().to_string(), decode_value(row, index))
        })
        .collect()
}

fn decode_value(row: &SqliteRow, index: usize) -> Option<String> {
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => {}
        _ => return None,
    }

    if let Ok(value) = row.try_get::<String, _>(index) {
        return Some(value);
    }
    if let Ok(value) = row.try_get::<i64, _>(index) {
        return Some(value.to_string());
    }
    if let Ok(value) = row.try_get::<f64, _>(index) {
        return Some(value.to_string());
    }
    row.try_get::<Vec<u8>, _>(index)
        .ok()
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
}

async fn fetch<'q>(
    pool: &SqlitePool,
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    context: impl Into<String>,
) -> Result<Vec<MetadataRow>> {
    let rows = query
        .fetch_all(pool)
        .await
        .map_err(|e| CrawlError::query_failed(context, e))?;
    Ok(rows.iter().map(decode_row).collect())
}

pub(super) async fn raw_query(pool: &SqlitePool, sql: &str) -> Result<Vec<MetadataRow>> {
    fetch(pool, sqlx::query(sql), "Failed to execute metadata query").await
}

pub(super) async fn schemas(pool: &SqlitePool) -> Result<Vec<MetadataRow>> {
    let query = sqlx::query(
        "SELECT name AS TABLE_SCHEM FROM pragma_database_list WHERE name <> 'temp' ORDER BY seq",
    );
    fetch(pool, query, "Failed to enumerate attached databases").await
}

pub(super) async fn tables(
    pool: &SqlitePool,
    schema: &str,
    types: &[TableType],
) -> Result<Vec<MetadataRow>> {
    let type_list = types
        .iter()
        .map(|table_type| match table_type {
            TableType::Table => "'table'",
            TableType::View => "'view'",
        })
        .collect::<Vec<_>>()
        .join(", ");
    if type_list.is_empty() {
        return Ok(Vec::new());
    }

    let sql = format!(
        r#"
        SELECT ?1 AS TABLE_SCHEM, name AS TABLE_NAME, upper(type) AS TABLE_TYPE
        FROM {}.sqlite_master
        WHERE type IN ({})
        AND name NOT LIKE 'sqlite_%'
        ORDER BY name
        "#,
        quote_identifier(schema),
        type_list
    );

    fetch(
        pool,
        sqlx::query(&sql).bind(schema),
        format!("Failed to enumerate tables in '{}'", schema),
    )
    .await
}

pub(super) async fn columns(pool: &SqlitePool, table: &TableRef) -> Result<Vec<MetadataRow>> {
    // Primary key columns count as not nullable even without NOT NULL
    let query = sqlx::query(
        r#"
        SELECT ?1 AS TABLE_SCHEM, ?2 AS TABLE_NAME, name AS COLUMN_NAME,
            cid + 1 AS ORDINAL_POSITION,
            type AS TYPE_NAME,
            upper(trim(CASE WHEN instr(type, '(') > 0
                THEN substr(type, 1, instr(type, '(') - 1)
                ELSE type END)) AS DATA_TYPE,
            CASE WHEN "notnull" = 0 AND pk = 0 THEN 'YES' ELSE 'NO' END AS IS_NULLABLE,
            dflt_value AS COLUMN_DEF
        FROM pragma_table_info(?2, ?1)
        ORDER BY cid
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name);

    fetch(
        pool,
        query,
        format!("Failed to collect columns for table '{}'", table),
    )
    .await
}

pub(super) async fn indexes(pool: &SqlitePool, table: &TableRef) -> Result<Vec<MetadataRow>> {
    let query = sqlx::query(
        r#"
        SELECT ?1 AS TABLE_SCHEM, ?2 AS TABLE_NAME, il.name AS INDEX_NAME,
            CASE WHEN il."unique" = 1 THEN '0' ELSE '1' END AS NON_UNIQUE,
            ix.seqno + 1 AS ORDINAL_POSITION,
            ix.name AS COLUMN_NAME,
            CASE WHEN ix."desc" = 1 THEN 'D' ELSE 'A' END AS ASC_OR_DESC
        FROM pragma_index_list(?2, ?1) AS il
        JOIN pragma_index_xinfo(il.name, ?1) AS ix ON ix.key = 1
        ORDER BY il.name, ix.seqno
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name);

    fetch(
        pool,
        query,
        format!("Failed to collect indexes for table '{}'", table),
    )
    .await
}

/// Foreign keys are unnamed in SQLite; `FK_NAME` is derived from the
/// constraint id. A reference without target columns points at the
/// referenced table's primary key.
pub(super) async fn foreign_keys(pool: &SqlitePool, table: &TableRef) -> Result<Vec<MetadataRow>> {
    let query = sqlx::query(
        r#"
        SELECT ?1 AS FKTABLE_SCHEM, ?2 AS FKTABLE_NAME,
            ?2 || '_fk' || fk.id AS FK_NAME,
            fk.seq + 1 AS KEY_SEQ,
            fk."from" AS FKCOLUMN_NAME,
            ?1 AS PKTABLE_SCHEM,
            fk."table" AS PKTABLE_NAME,
            COALESCE(fk."to", (
                SELECT p.name FROM pragma_table_info(fk."table", ?1) AS p
                WHERE p.pk = fk.seq + 1
            )) AS PKCOLUMN_NAME
        FROM pragma_foreign_key_list(?2, ?1) AS fk
        ORDER BY fk.id, fk.seq
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name);

    fetch(
        pool,
        query,
        format!("Failed to collect foreign keys for table '{}'", table),
    )
    .await
}

/// Triggers of one table. Event, timing and body are parsed from the
/// stored `CREATE TRIGGER` statement.
pub(super) async fn triggers(pool: &SqlitePool, table: &TableRef) -> Result<Vec<MetadataRow>> {
    let sql = format!(
        r#"
        SELECT name, sql
        FROM {}.sqlite_master
        WHERE type = 'trigger' AND tbl_name = ?1
        ORDER BY name
        "#,
        quote_identifier(&table.schema)
    );

    let rows = sqlx::query(&sql)
        .bind(&table.name)
        .fetch_all(pool)
        .await
        .map_err(|e| {
            CrawlError::query_failed(
                format!("Failed to collect triggers for table '{}'", table),
                e,
            )
        })?;

    let mut triggers = Vec::with_capacity(rows.len());
    for row in &rows {
        let name: String = row
            .try_get("name")
            .map_err(|e| CrawlError::parse_field("name", Some(&table.to_string()), e))?;
        let definition: Option<String> = row.try_get("sql").ok().flatten();
        let parsed = definition.as_deref().map(parse_trigger_definition);

        let mut trigger = MetadataRow::new()
            .with("TRIGGER_SCHEMA", table.schema.as_str())
            .with("TRIGGER_NAME", name)
            .with("EVENT_OBJECT_SCHEMA", table.schema.as_str())
            .with("EVENT_OBJECT_TABLE", table.name.as_str());
        match parsed {
            Some(parsed) => {
                trigger.push("EVENT_MANIPULATION", parsed.event);
                trigger.push("ACTION_TIMING", Some(parsed.timing));
                trigger.push("ACTION_STATEMENT", parsed.body);
            }
            None => {
                trigger.push("EVENT_MANIPULATION", None);
                trigger.push("ACTION_TIMING", None);
                trigger.push("ACTION_STATEMENT", None);
            }
        }
        triggers.push(trigger);
    }

    Ok(triggers)
}

pub(super) async fn view_definitions(pool: &SqlitePool, schema: &str) -> Result<Vec<MetadataRow>> {
    let sql = format!(
        r#"
        SELECT ?1 AS TABLE_SCHEM, name AS TABLE_NAME, sql AS VIEW_DEFINITION
        FROM {}.sqlite_master
        WHERE type = 'view'
        ORDER BY name
        "#,
        quote_identifier(schema)
    );

    fetch(
        pool,
        sqlx::query(&sql).bind(schema),
        format!("Failed to collect view definitions in '{}'", schema),
    )
    .await
}

#[derive(Debug, PartialEq, Eq)]
struct ParsedTrigger {
    event: Option<String>,
    timing: String,
    body: Option<String>,
}

struct TriggerPatterns {
    header: Regex,
    body: Regex,
}

fn trigger_patterns() -> &'static TriggerPatterns {
    static PATTERNS: OnceLock<TriggerPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| TriggerPatterns {
        header: Regex::new(
            r"(?is)^\s*CREATE\s+(?:TEMP\s+|TEMPORARY\s+)?TRIGGER\s.*?\s(BEFORE\s+|AFTER\s+|INSTEAD\s+OF\s+)?(INSERT|UPDATE|DELETE)\b",
        )
        .expect("Invalid trigger header pattern"),
        body: Regex::new(r"(?is)\bBEGIN\b(.*)\bEND\b\s*;?\s*$").expect("Invalid trigger body pattern"),
    })
}

/// Parses a stored `CREATE TRIGGER` statement.
///
/// SQLite fires triggers without an explicit timing `BEFORE` the event.
fn parse_trigger_definition(sql: &str) -> ParsedTrigger {
    let patterns = trigger_patterns();

    let (timing, event) = match patterns.header.captures(sql) {
        Some(captures) => {
            let timing = captures
                .get(1)
                .map(|m| {
                    m.as_str()
                        .split_whitespace()
                        .collect::<Vec<_>>()
                        .join(" ")
                        .to_ascii_uppercase()
                })
                .unwrap_or_else(|| "BEFORE".to_string());
            let event = captures.get(2).map(|m| m.as_str().to_ascii_uppercase());
            (timing, event)
        }
        None => ("BEFORE".to_string(), None),
    };

    let body = patterns
        .body
        .captures(sql)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|body| !body.is_empty());

    ParsedTrigger {
        event,
        timing,
        body,
    }
}
