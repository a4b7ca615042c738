//! `Document` to text

use chrono::SecondsFormat;

use super::NOTES_INDENT;
use crate::document::{Document, Unit};
use crate::record::Record;

/// Render a document back to text
///
/// Records that still carry their raw span are written verbatim; all
/// others use the canonical layout.
pub fn render(doc: &Document) -> String {
    let mut out = String::new();

    for unit in doc.units() {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
        match unit {
            Unit::Record(record) => match &record.raw_span {
                Some(span) => out.push_str(&span.text),
                None => write_record(record, &mut out),
            },
            Unit::Passthrough(block) => out.push_str(&block.text),
        }
    }

    out
}

/// Render one record in canonical form
pub fn render_record(record: &Record) -> String {
    let mut out = String::new();
    write_record(record, &mut out);
    out
}

fn write_record(record: &Record, out: &mut String) {
    push_line(out, &format!("[{}] {}", record.id, record.url));

    if let Some(title) = &record.title {
        push_field(out, "title", title);
    }
    if !record.tags.is_empty() {
        push_field(out, "tags", &record.tags.joined());
    }
    if let Some(added) = &record.added {
        push_field(out, "added", &added.to_rfc3339_opts(SecondsFormat::AutoSi, true));
    }
    for field in &record.extra {
        push_field(out, &field.key, &field.value);
    }
    if let Some(notes) = &record.notes {
        push_line(out, "notes:");
        for line in notes.lines() {
            if line.is_empty() {
                out.push('\n');
            } else {
                out.push_str(NOTES_INDENT);
                push_line(out, line);
            }
        }
    }
}

fn push_field(out: &mut String, key: &str, value: &str) {
    if value.is_empty() {
        push_line(out, &format!("{}:", key));
    } else {
        push_line(out, &format!("{}: {}", key, value));
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}
