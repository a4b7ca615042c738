//! Text to `Document`

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::{FormatError, ParseWarning, Parsed, WarningKind, FORMAT_VERSION, VERSION_PREFIX};
use crate::record::{is_field_name, validate, validate_extra, Draft, RawSpan, Record, RecordId};

/// One physical line of input
struct Line<'a> {
    /// The line including its terminator
    raw: &'a str,
    /// The line without `\n` or `\r\n`
    content: &'a str,
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    text.split_inclusive('\n')
        .map(|raw| {
            let content = raw.strip_suffix('\n').unwrap_or(raw);
            let content = content.strip_suffix('\r').unwrap_or(content);
            Line { raw, content }
        })
        .collect()
}

fn is_blank(content: &str) -> bool {
    content.trim().is_empty()
}

fn is_comment(content: &str) -> bool {
    content.starts_with('#')
}

fn is_header(content: &str) -> bool {
    content.starts_with('[')
}

fn is_indented(content: &str) -> bool {
    content.starts_with([' ', '\t'])
}

/// Split `key: value`, returning the key and the trimmed value
fn split_field(content: &str) -> Option<(&str, &str)> {
    let (key, rest) = content.split_once(':')?;
    if !is_field_name(key) {
        return None;
    }
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some((key, rest.trim()))
}

/// Parse `[<id>] <url>`
fn split_header(content: &str) -> Option<(RecordId, &str)> {
    let rest = content.strip_prefix('[')?;
    let (id, url) = rest.split_once(']')?;
    if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if !url.starts_with([' ', '\t']) {
        return None;
    }
    let url = url.trim();
    if url.is_empty() {
        return None;
    }
    Some((RecordId(id.parse().ok()?), url))
}

/// Remove notes indentation: one tab, or up to four spaces
fn strip_indent(content: &str) -> &str {
    if let Some(rest) = content.strip_prefix('\t') {
        return rest;
    }
    let spaces = content.bytes().take(4).take_while(|b| *b == b' ').count();
    &content[spaces..]
}

/// Reject files written by a newer format version
fn check_version(lines: &[Line<'_>]) -> Result<(), FormatError> {
    let Some(first) = lines.iter().find(|l| !is_blank(l.content)) else {
        return Ok(());
    };
    let Some(version) = first.content.trim_end().strip_prefix(VERSION_PREFIX) else {
        return Ok(());
    };
    match version.parse::<u32>() {
        Ok(found) if found > FORMAT_VERSION => Err(FormatError::UnsupportedVersion {
            found,
            supported: FORMAT_VERSION,
        }),
        _ => Ok(()),
    }
}

/// Index one past the last line of the entry starting at `start`
fn entry_end(lines: &[Line<'_>], start: usize) -> usize {
    let mut in_notes = false;
    let mut i = start + 1;

    while i < lines.len() {
        let content = lines[i].content;

        if is_blank(content) {
            if in_notes {
                let next = (i + 1..lines.len())
                    .find(|&k| !is_blank(lines[k].content))
                    .unwrap_or(lines.len());
                if next < lines.len() && is_indented(lines[next].content) {
                    i = next;
                    continue;
                }
            }
            break;
        }
        if is_comment(content) || is_header(content) {
            break;
        }
        if !is_indented(content) {
            in_notes = matches!(split_field(content), Some(("notes", _)));
        }
        i += 1;
    }

    i
}

/// Parse the lines of one entry; `first_line` is the 1-based line number
fn parse_entry(lines: &[Line<'_>], first_line: usize) -> Result<Record, ParseWarning> {
    let warning = |line: usize, kind: WarningKind, message: String| ParseWarning {
        line,
        kind,
        message,
    };

    let header = lines[0].content;
    let (id, url) = split_header(header).ok_or_else(|| {
        warning(
            first_line,
            WarningKind::BadHeader,
            format!("expected `[<id>] <url>`, found `{}`", header),
        )
    })?;

    let mut draft = Draft::new(url);
    let mut added: Option<DateTime<Utc>> = None;
    let mut extra = Vec::new();
    let mut notes: Option<Vec<&str>> = None;
    let mut in_notes = false;
    let mut seen: Vec<&str> = Vec::new();

    for (offset, line) in lines.iter().enumerate().skip(1) {
        let line_no = first_line + offset;
        let content = line.content;

        if in_notes && (is_blank(content) || is_indented(content)) {
            if let Some(notes) = notes.as_mut() {
                notes.push(if is_blank(content) { "" } else { strip_indent(content) });
            }
            continue;
        }
        if is_blank(content) || is_indented(content) {
            return Err(warning(
                line_no,
                WarningKind::UnrecognizedLine,
                "indented line outside of notes".to_string(),
            ));
        }

        let Some((key, value)) = split_field(content) else {
            return Err(warning(
                line_no,
                WarningKind::UnrecognizedLine,
                format!("expected `key: value`, found `{}`", content),
            ));
        };
        if seen.contains(&key) {
            return Err(warning(
                line_no,
                WarningKind::DuplicateField,
                format!("field `{}` appears more than once", key),
            ));
        }
        seen.push(key);
        in_notes = false;

        match key {
            "title" => draft.title = Some(value.to_string()),
            "tags" => draft.tags = value.split(',').map(str::to_string).collect(),
            "added" => {
                let parsed = DateTime::parse_from_rfc3339(value).map_err(|e| {
                    warning(
                        line_no,
                        WarningKind::InvalidField,
                        format!("invalid `added` timestamp `{}`: {}", value, e),
                    )
                })?;
                added = Some(parsed.with_timezone(&Utc));
            }
            "notes" => {
                in_notes = true;
                notes = Some(if value.is_empty() { Vec::new() } else { vec![value] });
            }
            _ => extra.push(validate_extra(key, value).map_err(|e| {
                warning(line_no, WarningKind::InvalidField, e.to_string())
            })?),
        }
    }

    draft.notes = notes.map(|lines| lines.join("\n"));
    let mut record = validate(draft, id)
        .map_err(|e| warning(first_line, WarningKind::InvalidField, e.to_string()))?;
    record.added = added;
    record.extra = extra;
    record.raw_span = Some(RawSpan {
        start_line: first_line,
        end_line: first_line + lines.len() - 1,
        text: lines.iter().map(|l| l.raw).collect(),
    });

    Ok(record)
}

/// Parse a bookmark file
///
/// Entries that fail to parse are kept as passthrough text and reported as
/// warnings. Only problems that make the whole file untrustworthy, like a
/// duplicate id, are errors.
pub fn parse(text: &str) -> Result<Parsed, FormatError> {
    let lines = split_lines(text);
    check_version(&lines)?;

    let mut parsed = Parsed::default();
    let mut first_seen: HashMap<RecordId, usize> = HashMap::new();
    let mut in_stray_run = false;
    let mut i = 0;

    while i < lines.len() {
        let content = lines[i].content;

        if is_header(content) {
            in_stray_run = false;
            let end = entry_end(&lines, i);
            match parse_entry(&lines[i..end], i + 1) {
                Ok(record) => {
                    if let Some(&first_line) = first_seen.get(&record.id) {
                        return Err(FormatError::DuplicateId {
                            id: record.id,
                            line: i + 1,
                            first_line,
                        });
                    }
                    first_seen.insert(record.id, i + 1);
                    parsed.document.push_record(record);
                }
                Err(warning) => {
                    if let Some((id, _)) = split_header(content) {
                        parsed.reserved_max_id = parsed.reserved_max_id.max(Some(id));
                    }
                    parsed.warnings.push(warning);
                    for line in &lines[i..end] {
                        parsed.document.push_passthrough(line.raw);
                    }
                }
            }
            i = end;
            continue;
        }

        let stray = !is_blank(content) && !is_comment(content);
        if stray && !in_stray_run {
            parsed.warnings.push(ParseWarning {
                line: i + 1,
                kind: WarningKind::StrayLine,
                message: format!("text outside of any entry: `{}`", content.trim()),
            });
        }
        in_stray_run = stray;
        parsed.document.push_passthrough(lines[i].raw);
        i += 1;
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Unit;
    use crate::format::render;

    const SAMPLE: &str = "\
# plainmark v1

[1] https://example.com/
title: Example Domain
tags: Reference, web
added: 2026-10-18T09:30:00Z
notes:
    First paragraph.

    Second paragraph.

# reading list
[2] https://rust-lang.org
title: Rust
rating: 5
";

    #[test]
    fn test_parse_sample() {
        let parsed = parse(SAMPLE).unwrap();
        assert!(parsed.warnings.is_empty());

        let records: Vec<_> = parsed.document.records().collect();
        assert_eq!(records.len(), 2);

        let first = records[0];
        assert_eq!(first.id, RecordId(1));
        assert_eq!(first.url, "https://example.com/");
        assert_eq!(first.title.as_deref(), Some("Example Domain"));
        assert_eq!(first.tags.joined(), "reference, web");
        assert_eq!(
            first.notes.as_deref(),
            Some("First paragraph.\n\nSecond paragraph.")
        );
        assert_eq!(
            first.added.unwrap().to_rfc3339(),
            "2026-10-18T09:30:00+00:00"
        );
        let span = first.raw_span.as_ref().unwrap();
        assert_eq!(span.start_line, 3);
        assert_eq!(span.end_line, 10);

        let second = records[1];
        assert_eq!(second.extra.len(), 1);
        assert_eq!(second.extra[0].key, "rating");
        assert_eq!(second.extra[0].value, "5");
    }

    #[test]
    fn test_parse_keeps_layout() {
        let parsed = parse(SAMPLE).unwrap();
        let units = parsed.document.units();
        assert_eq!(units.len(), 4);
        assert!(matches!(&units[0], Unit::Passthrough(p) if p.text == "# plainmark v1\n\n"));
        assert!(matches!(&units[2], Unit::Passthrough(p) if p.text == "\n# reading list\n"));
        assert_eq!(render(&parsed.document), SAMPLE);
    }

    #[test]
    fn test_crlf_is_preserved() {
        let text = "[1] https://a.com\r\ntitle: A\r\n\r\n# c\r\n";
        let parsed = parse(text).unwrap();
        let record = parsed.document.records().next().unwrap();
        assert_eq!(record.title.as_deref(), Some("A"));
        assert_eq!(render(&parsed.document), text);
    }

    #[test]
    fn test_malformed_entry_becomes_passthrough() {
        let text = "[1] https://a.com\nthis is not a field\n\n[2] https://b.com\n";
        let parsed = parse(text).unwrap();

        assert_eq!(parsed.document.records().count(), 1);
        assert_eq!(parsed.warnings.len(), 1);
        assert_eq!(parsed.warnings[0].line, 2);
        assert_eq!(parsed.warnings[0].kind, WarningKind::UnrecognizedLine);
        assert_eq!(render(&parsed.document), text);
    }

    #[test]
    fn test_malformed_entry_keeps_its_id_reserved() {
        let text = "[7] https://a.com\nbogus line\n\n[2] https://b.com\n\n[x] https://c.com\n";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.document.max_id(), Some(RecordId(2)));
        assert_eq!(parsed.reserved_max_id, Some(RecordId(7)));

        let parsed = parse("[x] https://c.com\n[3] https://d.com\n").unwrap();
        assert_eq!(parsed.reserved_max_id, None);
    }

    #[test]
    fn test_bad_headers() {
        for header in ["[x] https://a.com", "[1]https://a.com", "[1]", "[] https://a.com", "[1"] {
            let parsed = parse(&format!("{}\n", header)).unwrap();
            assert_eq!(parsed.document.records().count(), 0, "{}", header);
            assert_eq!(parsed.warnings[0].kind, WarningKind::BadHeader, "{}", header);
        }
    }

    #[test]
    fn test_duplicate_field_is_warning() {
        let parsed = parse("[1] https://a.com\ntitle: a\ntitle: b\n").unwrap();
        assert_eq!(parsed.warnings[0].kind, WarningKind::DuplicateField);
        assert_eq!(parsed.warnings[0].line, 3);
    }

    #[test]
    fn test_invalid_field_values_are_warnings() {
        let parsed = parse("[1] https://a.com\nadded: yesterday\n").unwrap();
        assert_eq!(parsed.warnings[0].kind, WarningKind::InvalidField);

        let parsed = parse("[1] https://a.com with spaces\n").unwrap();
        assert_eq!(parsed.warnings[0].kind, WarningKind::InvalidField);
        assert_eq!(parsed.warnings[0].line, 1);
    }

    #[test]
    fn test_stray_lines_warn_once_per_run() {
        let text = "just some text\nmore text\n\n[1] https://a.com\n\n    orphan\n";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.document.records().count(), 1);
        let lines: Vec<_> = parsed.warnings.iter().map(|w| w.line).collect();
        assert_eq!(lines, vec![1, 6]);
        assert!(parsed.warnings.iter().all(|w| w.kind == WarningKind::StrayLine));
        assert_eq!(render(&parsed.document), text);
    }

    #[test]
    fn test_indented_line_outside_notes() {
        let parsed = parse("[1] https://a.com\ntitle: A\n    stray\n").unwrap();
        assert_eq!(parsed.warnings[0].kind, WarningKind::UnrecognizedLine);
        assert_eq!(parsed.warnings[0].line, 3);
    }

    #[test]
    fn test_notes_inline_and_tabs() {
        let text = "[1] https://a.com\nnotes: first\n\tsecond\n      deeper\n";
        let parsed = parse(text).unwrap();
        let record = parsed.document.records().next().unwrap();
        assert_eq!(record.notes.as_deref(), Some("first\nsecond\n  deeper"));
    }

    #[test]
    fn test_notes_end_at_blank_line_without_indent() {
        let text = "[1] https://a.com\nnotes:\n    one\n\n\n[2] https://b.com\n";
        let parsed = parse(text).unwrap();
        let records: Vec<_> = parsed.document.records().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].notes.as_deref(), Some("one"));
        assert_eq!(records[0].raw_span.as_ref().unwrap().end_line, 3);
    }

    #[test]
    fn test_fields_after_notes() {
        let text = "[1] https://a.com\nnotes:\n    one\ntitle: A\n";
        let parsed = parse(text).unwrap();
        let record = parsed.document.records().next().unwrap();
        assert_eq!(record.notes.as_deref(), Some("one"));
        assert_eq!(record.title.as_deref(), Some("A"));
    }

    #[test]
    fn test_url_line_is_not_a_field() {
        let parsed = parse("[1] https://a.com\nhttps://b.com\n").unwrap();
        assert_eq!(parsed.warnings[0].kind, WarningKind::UnrecognizedLine);
    }

    #[test]
    fn test_duplicate_id_is_error() {
        let text = "[1] https://a.com\n\n[1] https://b.com\n";
        let err = parse(text).unwrap_err();
        assert_eq!(
            err,
            FormatError::DuplicateId {
                id: RecordId(1),
                line: 3,
                first_line: 1
            }
        );
    }

    #[test]
    fn test_unsupported_version() {
        let err = parse("\n# plainmark v2\n[1] https://a.com\n").unwrap_err();
        assert_eq!(
            err,
            FormatError::UnsupportedVersion {
                found: 2,
                supported: 1
            }
        );

        assert!(parse("# plainmark v1\n").is_ok());
        assert!(parse("# plainmark vNext\n").is_ok());
    }

    #[test]
    fn test_missing_trailing_newline() {
        let text = "# c\n[1] https://a.com\ntitle: A";
        let parsed = parse(text).unwrap();
        assert_eq!(parsed.document.records().next().unwrap().title.as_deref(), Some("A"));
        assert_eq!(render(&parsed.document), text);
    }

    #[test]
    fn test_empty_input() {
        let parsed = parse("").unwrap();
        assert!(parsed.document.is_empty());
        assert!(parsed.warnings.is_empty());
    }
}
