//! PostgreSQL metadata queries.
//!
//! Every column is cast to `text` and aliased to the driver metadata field
//! name, so all rows decode uniformly.

use crate::Result;
use crate::adapters::{MetadataRow, TableType};
use crate::error::CrawlError;
use crate::models::TableRef;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgPool, Postgres, Row, TypeInfo, ValueRef};

/// Decodes every field of a row to nullable text.
fn decode_row(row: &PgRow) -> MetadataRow {
    row.columns()
        .iter()
        .map(|column| {
            let index = column.ordinal();
            (column.name().to_string(), decode_value(row, index))
        })
        .collect()
}

/// Best-effort text rendering of an arbitrary result value.
fn decode_value(row: &PgRow, index: usize) -> Option<String> {
    let type_name = match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => raw.type_info().name().to_string(),
        _ => return None,
    };

    if let Ok(value) = row.try_get::<String, _>(index) {
        return Some(value);
    }
    if let Ok(value) = row.try_get::<i64, _>(index) {
        return Some(value.to_string());
    }
    if let Ok(value) = row.try_get::<i32, _>(index) {
        return Some(value.to_string());
    }
    if let Ok(value) = row.try_get::<i16, _>(index) {
        return Some(value.to_string());
    }
    if let Ok(value) = row.try_get::<f64, _>(index) {
        return Some(value.to_string());
    }
    if let Ok(value) = row.try_get::<f32, _>(index) {
        return Some(value.to_string());
    }
    if let Ok(value) = row.try_get::<bool, _>(index) {
        return Some(value.to_string());
    }
    if let Ok(value) = row.try_get::<chrono::DateTime<chrono::Utc>, _>(index) {
        return Some(value.to_rfc3339());
    }
    if let Ok(value) = row.try_get::<chrono::NaiveDateTime, _>(index) {
        return Some(value.to_string());
    }
    if let Ok(value) = row.try_get::<chrono::NaiveDate, _>(index) {
        return Some(value.to_string());
    }

    tracing::debug!(
        "Cannot decode column {} of type {}; cast it to text in the query",
        index,
        type_name
    );
    Some(format!("<{}>", type_name))
}

async fn fetch<'q>(
    pool: &PgPool,
    query: Query<'q, Postgres, PgArguments>,
    context: impl Into<String>,
) -> Result<Vec<MetadataRow>> {
    let rows = query
        .fetch_all(pool)
        .await
        .map_err(|e| CrawlError::query_failed(context, e))?;
    Ok(rows.iter().map(decode_row).collect())
}

pub(super) async fn raw_query(pool: &PgPool, sql: &str) -> Result<Vec<MetadataRow>> {
    fetch(pool, sqlx::query(sql), "Failed to execute metadata query").await
}

pub(super) async fn schemas(pool: &PgPool) -> Result<Vec<MetadataRow>> {
    let query = sqlx::query(
        r#"
        SELECT nspname::text AS "TABLE_SCHEM"
        FROM pg_catalog.pg_namespace
        WHERE nspname NOT IN ('pg_catalog', 'information_schema')
        AND nspname NOT LIKE 'pg\_toast%'
        AND nspname NOT LIKE 'pg\_temp\_%'
        ORDER BY nspname
        "#,
    );
    fetch(pool, query, "Failed to enumerate schemas").await
}

pub(super) async fn tables(
    pool: &PgPool,
    schema: &str,
    types: &[TableType],
) -> Result<Vec<MetadataRow>> {
    let reported: Vec<String> = types
        .iter()
        .map(|table_type| match table_type {
            TableType::Table => "BASE TABLE".to_string(),
            TableType::View => "VIEW".to_string(),
        })
        .collect();

    let query = sqlx::query(
        r#"
        SELECT table_schema::text AS "TABLE_SCHEM",
            table_name::text AS "TABLE_NAME",
            (CASE table_type WHEN 'BASE TABLE' THEN 'TABLE' ELSE table_type END)::text AS "TABLE_TYPE"
        FROM information_schema.tables
        WHERE table_schema = $1
        AND table_type = ANY($2)
        ORDER BY table_name
        "#,
    )
    .bind(schema)
    .bind(reported);

    fetch(
        pool,
        query,
        format!("Failed to enumerate tables in '{}'", schema),
    )
    .await
}

/// Ordinals are renumbered densely; dropped columns leave gaps in `attnum`.
pub(super) async fn columns(pool: &PgPool, table: &TableRef) -> Result<Vec<MetadataRow>> {
    let query = sqlx::query(
        r#"
        SELECT table_schema::text AS "TABLE_SCHEM",
            table_name::text AS "TABLE_NAME",
            column_name::text AS "COLUMN_NAME",
            (row_number() OVER (ORDER BY ordinal_position))::text AS "ORDINAL_POSITION",
            udt_name::text AS "TYPE_NAME",
            upper(data_type)::text AS "DATA_TYPE",
            is_nullable::text AS "IS_NULLABLE",
            column_default::text AS "COLUMN_DEF"
        FROM information_schema.columns
        WHERE table_schema = $1 AND table_name = $2
        ORDER BY ordinal_position
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

/// Key columns of every index; expression entries have a null `COLUMN_NAME`.
pub(super) async fn indexes(pool: &PgPool, table: &TableRef) -> Result<Vec<MetadataRow>> {
    let query = sqlx::query(
        r#"
        SELECT n.nspname::text AS "TABLE_SCHEM",
            t.relname::text AS "TABLE_NAME",
            i.relname::text AS "INDEX_NAME",
            CASE WHEN ix.indisunique THEN '0' ELSE '1' END AS "NON_UNIQUE",
            k.ord::text AS "ORDINAL_POSITION",
            a.attname::text AS "COLUMN_NAME",
            CASE WHEN (ix.indoption[k.ord - 1] & 1) = 1 THEN 'D' ELSE 'A' END AS "ASC_OR_DESC"
        FROM pg_catalog.pg_index ix
        JOIN pg_catalog.pg_class t ON t.oid = ix.indrelid
        JOIN pg_catalog.pg_class i ON i.oid = ix.indexrelid
        JOIN pg_catalog.pg_namespace n ON n.oid = t.relnamespace
        CROSS JOIN LATERAL unnest(ix.indkey::int2[]) WITH ORDINALITY AS k(attnum, ord)
        LEFT JOIN pg_catalog.pg_attribute a
            ON a.attrelid = t.oid AND a.attnum = k.attnum AND k.attnum > 0
        WHERE n.nspname = $1 AND t.relname = $2
        AND k.ord <= ix.indnkeyatts
        ORDER BY i.relname, k.ord
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

pub(super) async fn foreign_keys(pool: &PgPool, table: &TableRef) -> Result<Vec<MetadataRow>> {
    let query = sqlx::query(
        r#"
        SELECT fns.nspname::text AS "PKTABLE_SCHEM",
            fcl.relname::text AS "PKTABLE_NAME",
            fa.attname::text AS "PKCOLUMN_NAME",
            ns.nspname::text AS "FKTABLE_SCHEM",
            cl.relname::text AS "FKTABLE_NAME",
            a.attname::text AS "FKCOLUMN_NAME",
            k.ord::text AS "KEY_SEQ",
            con.conname::text AS "FK_NAME"
        FROM pg_catalog.pg_constraint con
        JOIN pg_catalog.pg_class cl ON cl.oid = con.conrelid
        JOIN pg_catalog.pg_namespace ns ON ns.oid = cl.relnamespace
        JOIN pg_catalog.pg_class fcl ON fcl.oid = con.confrelid
        JOIN pg_catalog.pg_namespace fns ON fns.oid = fcl.relnamespace
        CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(attnum, fattnum, ord)
        JOIN pg_catalog.pg_attribute a ON a.attrelid = con.conrelid AND a.attnum = k.attnum
        JOIN pg_catalog.pg_attribute fa ON fa.attrelid = con.confrelid AND fa.attnum = k.fattnum
        WHERE con.contype = 'f'
        AND ns.nspname = $1 AND cl.relname = $2
        ORDER BY con.conname, k.ord
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

pub(super) async fn check_constraints(pool: &PgPool, table: &TableRef) -> Result<Vec<MetadataRow>> {
    let query = sqlx::query(
        r#"
        SELECT ns.nspname::text AS "CONSTRAINT_SCHEMA",
            cl.relname::text AS "TABLE_NAME",
            con.conname::text AS "CONSTRAINT_NAME",
            pg_get_constraintdef(con.oid, true)::text AS "CHECK_CLAUSE"
        FROM pg_catalog.pg_constraint con
        JOIN pg_catalog.pg_class cl ON cl.oid = con.conrelid
        JOIN pg_catalog.pg_namespace ns ON ns.oid = cl.relnamespace
        WHERE con.contype = 'c'
        AND ns.nspname = $1 AND cl.relname = $2
        ORDER BY con.conname
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name);

    fetch(
        pool,
        query,
        format!("Failed to collect check constraints for table '{}'", table),
    )
    .await
}

/// One row per trigger and event; the crawler keeps the first row per name.
pub(super) async fn triggers(pool: &PgPool, table: &TableRef) -> Result<Vec<MetadataRow>> {
    let query = sqlx::query(
        r#"
        SELECT trigger_schema::text AS "TRIGGER_SCHEMA",
            trigger_name::text AS "TRIGGER_NAME",
            event_manipulation::text AS "EVENT_MANIPULATION",
            event_object_schema::text AS "EVENT_OBJECT_SCHEMA",
            event_object_table::text AS "EVENT_OBJECT_TABLE",
            action_statement::text AS "ACTION_STATEMENT",
            action_timing::text AS "ACTION_TIMING"
        FROM information_schema.triggers
        WHERE event_object_schema = $1 AND event_object_table = $2
        ORDER BY trigger_name, action_order, event_manipulation
        "#,
    )
    .bind(&table.schema)
    .bind(&table.name);

    fetch(
        pool,
        query,
        format!("Failed to collect triggers for table '{}'", table),
    )
    .await
}

pub(super) async fn procedures(pool: &PgPool, schema: &str) -> Result<Vec<MetadataRow>> {
    let query = sqlx::query(
        r#"
        SELECT routine_schema::text AS "ROUTINE_SCHEMA",
            routine_name::text AS "ROUTINE_NAME",
            routine_type::text AS "ROUTINE_TYPE"
        FROM information_schema.routines
        WHERE routine_schema = $1
        ORDER BY routine_name
        "#,
    )
    .bind(schema);

    fetch(
        pool,
        query,
        format!("Failed to enumerate routines in '{}'", schema),
    )
    .await
}

pub(super) async fn view_definitions(pool: &PgPool, schema: &str) -> Result<Vec<MetadataRow>> {
    let query = sqlx::query(
        r#"
        SELECT table_schema::text AS "TABLE_SCHEM",
            table_name::text AS "TABLE_NAME",
            view_definition::text AS "VIEW_DEFINITION"
        FROM information_schema.views
        WHERE table_schema = $1
        ORDER BY table_name
        "#,
    )
    .bind(schema);

    fetch(
        pool,
        query,
        format!("Failed to collect view definitions in '{}'", schema),
    )
    .await
}
