//! Row to entity mapping.
//!
//! Field names follow the driver metadata spelling with information-schema
//! alternatives accepted where vendors differ. Entities are de-duplicated
//! by name within their owner, first row wins.

use super::{MetadataCategory, TriggerTimingRules};
use crate::Result;
use crate::adapters::{MetadataRow, TableType};
use crate::error::CrawlError;
use crate::models::{
    CheckConstraint, Column, ColumnReference, EventManipulationType, ForeignKey,
    ForeignKeyColumn, Index, IndexColumn, Procedure, SortDirection, TableRef, Trigger,
};
use std::collections::{BTreeSet, HashMap, HashSet};

/// Placeholder column name for index entries on expressions.
pub(crate) const EXPRESSION_COLUMN: &str = "<expression>";

fn parse_number(value: Option<&str>) -> Option<u32> {
    value.and_then(|v| v.trim().parse::<u32>().ok())
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

/// Distinct schema names in name order.
pub(crate) fn schema_names(rows: &[MetadataRow]) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get_any(&["TABLE_SCHEM", "TABLE_SCHEMA", "SCHEMA_NAME"]))
        .map(ToString::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Table names with their kind, in name order.
///
/// A missing `TABLE_TYPE` counts as a table; other reported kinds such as
/// sequences are dropped.
pub(crate) fn table_entries(rows: &[MetadataRow]) -> Vec<(String, TableType)> {
    let mut entries: Vec<(String, TableType)> = Vec::new();
    for row in rows {
        let Some(name) = row.get("TABLE_NAME") else {
            continue;
        };
        let table_type = match row.get("TABLE_TYPE") {
            Some(text) => match TableType::from_metadata(text) {
                Some(table_type) => table_type,
                None => {
                    tracing::debug!("Skipping {} of type {}", name, text);
                    continue;
                }
            },
            None => TableType::Table,
        };
        if entries.iter().all(|(existing, _)| existing != name) {
            entries.push((name.to_string(), table_type));
        }
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    entries
}

/// Columns ordered by ordinal.
///
/// # Errors
/// Returns a retrieval error when a row lacks a name or ordinal, or when
/// the ordinals are not exactly `1..=n`.
pub(crate) fn columns(table: &TableRef, rows: &[MetadataRow]) -> Result<Vec<Column>> {
    let object = table.to_string();
    let mut columns: Vec<Column> = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(name) = row.get("COLUMN_NAME") else {
            return Err(CrawlError::malformed_metadata(
                MetadataCategory::Columns,
                &object,
                "Column row without COLUMN_NAME",
            ));
        };
        if columns.iter().any(|c| c.name == name) {
            continue;
        }

        let ordinal = parse_number(row.get("ORDINAL_POSITION")).ok_or_else(|| {
            CrawlError::malformed_metadata(
                MetadataCategory::Columns,
                &object,
                format!("Column {} has no valid ORDINAL_POSITION", name),
            )
        })?;

        let specific = row
            .get_any(&["TYPE_NAME", "DATA_TYPE"])
            .unwrap_or_default()
            .to_string();
        // Driver metadata reports DATA_TYPE as a numeric type code
        let generic = row
            .get("DATA_TYPE")
            .filter(|t| !t.is_empty() && !t.chars().all(|c| c.is_ascii_digit()))
            .map_or_else(|| specific.clone(), ToString::to_string);

        let nullable = match row.get("IS_NULLABLE") {
            Some(text) => !text.trim().eq_ignore_ascii_case("NO"),
            None => row.get("NULLABLE").is_none_or(|n| n.trim() != "0"),
        };

        columns.push(Column {
            schema_name: table.schema.clone(),
            table_name: table.name.clone(),
            name: name.to_string(),
            ordinal,
            type_name: generic,
            database_specific_type_name: specific,
            nullable,
            default_value: row.get("COLUMN_DEF").map(ToString::to_string),
        });
    }

    columns.sort_by_key(|c| c.ordinal);

    let dense = columns
        .iter()
        .zip(1u32..)
        .all(|(column, expected)| column.ordinal == expected);
    if !dense {
        let ordinals: Vec<String> = columns.iter().map(|c| c.ordinal.to_string()).collect();
        return Err(CrawlError::malformed_metadata(
            MetadataCategory::Columns,
            &object,
            format!(
                "Column ordinals are not dense from 1: [{}]",
                ordinals.join(", ")
            ),
        ));
    }

    Ok(columns)
}

/// Indexes in retrieval order, key columns ordered by position.
pub(crate) fn indexes(rows: &[MetadataRow]) -> Vec<Index> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, (bool, Vec<(u32, IndexColumn)>)> = HashMap::new();

    for (position, row) in rows.iter().enumerate() {
        // Table statistics rows carry no index name
        let Some(name) = row.get("INDEX_NAME") else {
            continue;
        };
        let unique = row.get("NON_UNIQUE").is_some_and(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "0" | "false" | "f" | "no"
            )
        });
        let direction = match row.get("ASC_OR_DESC").map(str::trim) {
            Some(d) if d.eq_ignore_ascii_case("A") => Some(SortDirection::Ascending),
            Some(d) if d.eq_ignore_ascii_case("D") => Some(SortDirection::Descending),
            _ => None,
        };
        let ordinal = parse_number(row.get("ORDINAL_POSITION"))
            .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX));
        let column = IndexColumn {
            name: row
                .get("COLUMN_NAME")
                .unwrap_or(EXPRESSION_COLUMN)
                .to_string(),
            direction,
        };

        let entry = grouped.entry(name.to_string()).or_insert_with(|| {
            order.push(name.to_string());
            (unique, Vec::new())
        });
        entry.1.push((ordinal, column));
    }

    order
        .into_iter()
        .filter_map(|name| {
            grouped.remove(&name).map(|(unique, mut columns)| {
                columns.sort_by_key(|(ordinal, _)| *ordinal);
                Index {
                    name,
                    columns: columns.into_iter().map(|(_, column)| column).collect(),
                    unique,
                }
            })
        })
        .collect()
}

/// Foreign keys of `owner` in retrieval order, all unresolved.
///
/// A missing `PKTABLE_SCHEM` means the referenced table lives in the
/// owner's schema.
pub(crate) fn foreign_keys(owner: &TableRef, rows: &[MetadataRow]) -> Vec<ForeignKey> {
    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<(u32, ForeignKeyColumn)>> = HashMap::new();

    for (position, row) in rows.iter().enumerate() {
        let (Some(column), Some(pk_table), Some(pk_column)) = (
            row.get("FKCOLUMN_NAME"),
            row.get("PKTABLE_NAME"),
            row.get("PKCOLUMN_NAME"),
        ) else {
            tracing::debug!("Skipping incomplete foreign key row for {}", owner);
            continue;
        };
        let pk_schema = row
            .get_any(&["PKTABLE_SCHEM", "PKTABLE_SCHEMA"])
            .unwrap_or(owner.schema.as_str());
        let name = row
            .get("FK_NAME")
            .map_or_else(|| format!("{}_{}_fk", owner.name, pk_table), ToString::to_string);
        let sequence = parse_number(row.get("KEY_SEQ"))
            .unwrap_or_else(|| u32::try_from(position).unwrap_or(u32::MAX));

        let pairs = grouped.entry(name.clone()).or_insert_with(|| {
            order.push(name);
            Vec::new()
        });
        pairs.push((
            sequence,
            ForeignKeyColumn {
                column: column.to_string(),
                referenced: ColumnReference::new(pk_schema, pk_table, pk_column),
            },
        ));
    }

    order
        .into_iter()
        .filter_map(|name| {
            grouped.remove(&name).map(|mut pairs| {
                pairs.sort_by_key(|(sequence, _)| *sequence);
                ForeignKey {
                    name,
                    columns: pairs.into_iter().map(|(_, pair)| pair).collect(),
                    resolved: false,
                }
            })
        })
        .collect()
}

pub(crate) fn check_constraints(rows: &[MetadataRow]) -> Vec<CheckConstraint> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| {
            let name = row.get("CONSTRAINT_NAME")?;
            let definition = row
                .get_any(&["CHECK_CLAUSE", "CHECK_CONDITION"])
                .unwrap_or_default();
            seen.insert(name.to_string()).then(|| CheckConstraint {
                name: name.to_string(),
                definition: definition.to_string(),
            })
        })
        .collect()
}

pub(crate) fn triggers(
    table: &TableRef,
    rows: &[MetadataRow],
    rules: &TriggerTimingRules,
) -> Vec<Trigger> {
    let mut seen = HashSet::new();
    rows.iter()
        .filter_map(|row| {
            let name = row.get("TRIGGER_NAME")?;
            if !seen.insert(name.to_string()) {
                return None;
            }
            let timing_text = row.get_any(&["ACTION_TIMING", "CONDITION_TIMING"]);
            Some(Trigger {
                schema_name: table.schema.clone(),
                table_name: table.name.clone(),
                name: name.to_string(),
                event: row
                    .get("EVENT_MANIPULATION")
                    .map_or(EventManipulationType::Unknown, EventManipulationType::from_text),
                timing: rules.classify(timing_text),
                timing_text: timing_text.map(ToString::to_string),
                action_statement: row.get("ACTION_STATEMENT").map(ToString::to_string),
            })
        })
        .collect()
}

/// Procedures in name order. A later row for the same name can still
/// supply a missing definition.
pub(crate) fn procedures(schema: &str, rows: &[MetadataRow]) -> Vec<Procedure> {
    let mut procedures: Vec<Procedure> = Vec::new();
    for row in rows {
        let Some(name) = row.get_any(&["ROUTINE_NAME", "PROCEDURE_NAME"]) else {
            continue;
        };
        let definition = non_blank(row.get("ROUTINE_DEFINITION"));
        match procedures.iter_mut().find(|p| p.name == name) {
            Some(existing) => {
                if existing.definition.is_none() {
                    existing.definition = definition;
                }
            }
            None => procedures.push(Procedure {
                schema_name: schema.to_string(),
                name: name.to_string(),
                definition,
            }),
        }
    }
    procedures.sort_by(|a, b| a.name.cmp(&b.name));
    procedures
}

/// Non-blank view definitions keyed by view name.
pub(crate) fn view_definitions(rows: &[MetadataRow]) -> HashMap<String, String> {
    let mut definitions = HashMap::new();
    for row in rows {
        let (Some(name), Some(definition)) = (
            row.get_any(&["TABLE_NAME", "VIEW_NAME"]),
            non_blank(row.get("VIEW_DEFINITION")),
        ) else {
            continue;
        };
        definitions.entry(name.to_string()).or_insert(definition);
    }
    definitions
}
