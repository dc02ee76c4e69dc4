//! Schema report rendering.
//!
//! Walks a crawled [`Catalog`](dbcrawler_core::Catalog) schema by schema
//! and emits one line per report row through a [`ReportFormatter`]. Text
//! and CSV reports separate table sections with an empty row; HTML reports
//! wrap each section in its own `<table>` inside a minimal document.

use dbcrawler_core::render::escape_html;
use dbcrawler_core::{
    Cell, Column, CrawlOutcome, ForeignKey, Index, OutputFormat, Procedure, ReportFormatter, Row,
    Table, Trigger,
};

/// How a report is laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    pub format: OutputFormat,
    /// Adds a "Crawled at" row to the header section. Without it, two
    /// crawls of the same catalog give byte-identical reports.
    pub timestamp: bool,
}

impl ReportOptions {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            timestamp: true,
        }
    }

    pub fn without_timestamp(mut self) -> Self {
        self.timestamp = false;
        self
    }
}

/// Renders the full schema report for a crawl, with the crawl time.
pub fn render_report(outcome: &CrawlOutcome, format: OutputFormat) -> String {
    render_report_with(outcome, ReportOptions::new(format))
}

pub fn render_report_with(outcome: &CrawlOutcome, options: ReportOptions) -> String {
    ReportWriter::new(options).write(outcome)
}

struct ReportWriter {
    formatter: ReportFormatter,
    timestamp: bool,
    lines: Vec<String>,
}

impl ReportWriter {
    fn new(options: ReportOptions) -> Self {
        Self {
            formatter: ReportFormatter::new(options.format),
            timestamp: options.timestamp,
            lines: Vec::new(),
        }
    }

    fn is_html(&self) -> bool {
        self.formatter.format() == OutputFormat::Html
    }

    fn write(mut self, outcome: &CrawlOutcome) -> String {
        let catalog = &outcome.catalog;
        let product = match &catalog.database_info.product_version {
            Some(version) => format!("{} {}", catalog.database_info.product_name, version),
            None => catalog.database_info.product_name.clone(),
        };

        if self.is_html() {
            self.lines.push(format!(
                "<!DOCTYPE html>\n<html>\n<head>\n<meta charset='utf-8'>\n<title>{}</title>\n</head>\n<body>",
                escape_html(&product)
            ));
        }

        self.section(|w| {
            let database = w.formatter.name_value_row("Database", &product);
            w.lines.push(database);
            if w.timestamp {
                let crawled_at = w
                    .formatter
                    .name_value_row("Crawled at", &outcome.info.crawled_at.to_rfc3339());
                w.lines.push(crawled_at);
            }
        });

        for schema in &catalog.schemas {
            self.title(&schema.name);
            for table in &schema.tables {
                self.section(|w| w.table(table));
            }
            for procedure in &schema.procedures {
                self.section(|w| w.procedure(procedure));
            }
        }

        if self.is_html() {
            self.lines.push("</body>\n</html>".to_string());
        }

        let mut report = self.lines.join("\n");
        report.push('\n');
        report
    }

    fn section(&mut self, build: impl FnOnce(&mut Self)) {
        if self.is_html() {
            self.lines.push("<table>".to_string());
            build(self);
            self.lines.push("</table>".to_string());
        } else {
            build(self);
            self.lines.push(self.formatter.empty_row());
        }
    }

    fn title(&mut self, schema: &str) {
        let line = if self.is_html() {
            format!("<h2>{}</h2>", escape_html(schema))
        } else {
            self.formatter.name_value_row("Schema", schema)
        };
        self.lines.push(line);
    }

    /// A heading spanning the detail columns.
    fn heading(&mut self, text: &str) {
        let format = self.formatter.format();
        let row = Row::new(format).with_cell(
            Cell::new(text, format)
                .with_colspan(3)
                .with_style("heading"),
        );
        self.lines.push(row.render());
    }

    fn table(&mut self, table: &Table) {
        let kind = format!("[{}]", table.type_label().to_ascii_lowercase());
        self.lines
            .push(self.formatter.name_row(&table.full_name(), &kind));

        for column in &table.columns {
            self.lines.push(self.formatter.detail_row(
                &column.ordinal.to_string(),
                &column.name,
                &column_type(column),
            ));
        }

        if !table.indexes.is_empty() {
            self.heading("Indexes");
            for index in &table.indexes {
                self.index(index);
            }
        }

        if !table.foreign_keys.is_empty() {
            self.heading("Foreign Keys");
            for foreign_key in &table.foreign_keys {
                self.foreign_key(foreign_key);
            }
        }

        if !table.check_constraints.is_empty() {
            self.heading("Table Constraints");
            for constraint in &table.check_constraints {
                self.lines.push(
                    self.formatter
                        .name_value_row(&constraint.name, &constraint.definition),
                );
            }
        }

        if !table.triggers.is_empty() {
            self.heading("Triggers");
            for trigger in &table.triggers {
                self.trigger(trigger);
            }
        }

        if let Some(definition) = table.definition() {
            self.heading("Definition");
            self.lines.push(self.formatter.definition_row(definition));
        }
    }

    fn index(&mut self, index: &Index) {
        let kind = if index.unique {
            "[unique index]"
        } else {
            "[non-unique index]"
        };
        self.lines.push(self.formatter.name_row(&index.name, kind));
        for column in &index.columns {
            let direction = column
                .direction
                .map(|d| d.to_string())
                .unwrap_or_default();
            self.lines
                .push(self.formatter.detail_row("", &column.name, &direction));
        }
    }

    fn foreign_key(&mut self, foreign_key: &ForeignKey) {
        self.lines
            .push(self.formatter.name_row(&foreign_key.name, "[foreign key]"));
        for column in &foreign_key.columns {
            self.lines.push(self.formatter.detail_row(
                "",
                &column.column,
                &format!("--> {}", column.referenced.full_name()),
            ));
        }
    }

    fn trigger(&mut self, trigger: &Trigger) {
        let timing = match &trigger.timing_text {
            Some(text) if trigger.timing == dbcrawler_core::ActionTiming::Unknown => text.clone(),
            _ => trigger.timing.to_string(),
        };
        self.lines.push(
            self.formatter
                .name_value_row(&trigger.name, &format!("{} {}", timing, trigger.event)),
        );
        if let Some(action) = &trigger.action_statement {
            self.lines.push(self.formatter.definition_row(action));
        }
    }

    fn procedure(&mut self, procedure: &Procedure) {
        self.lines
            .push(self.formatter.name_row(&procedure.full_name(), "[procedure]"));
        if let Some(definition) = &procedure.definition {
            self.lines.push(self.formatter.definition_row(definition));
        }
    }
}

fn column_type(column: &Column) -> String {
    let type_name = if column.database_specific_type_name.is_empty() {
        &column.type_name
    } else {
        &column.database_specific_type_name
    };
    if column.nullable {
        type_name.clone()
    } else {
        format!("{} not null", type_name)
    }
}
