//! Pure alert-message parsing: no I/O, deterministic.

use std::collections::BTreeMap;
use tradewatch_common::types::FieldSet;

/// Scans the message text for each expected field label and returns a map
/// from lower-cased field name to the extracted value, or `None` when the
/// label does not appear. A missing field is data, not an error.
///
/// For each label, the first line containing it wins; the value is whatever
/// follows the label's last occurrence on that line, with a leading colon
/// and surrounding whitespace stripped.
pub fn extract_fields(text: &str, fields: &FieldSet) -> BTreeMap<String, Option<String>> {
    let lines: Vec<&str> = text
        .split('\n')
        .filter(|line| *line != "\r")
        .map(|line| line.trim_matches('\r'))
        .collect();

    let mut info = BTreeMap::new();
    for label in fields.labels() {
        let value = lines.iter().find_map(|line| {
            line.rfind(label.as_str()).map(|idx| {
                line[idx + label.len()..]
                    .trim_start_matches(':')
                    .trim()
                    .to_string()
            })
        });
        info.insert(label.to_lowercase(), value);
    }
    info
}

/// Reorders an extraction map into the configured field order, for storage.
pub fn values_in_order(
    info: &BTreeMap<String, Option<String>>,
    fields: &FieldSet,
) -> Vec<Option<String>> {
    fields
        .columns()
        .iter()
        .map(|column| info.get(column).cloned().flatten())
        .collect()
}

/// Locates the alert text inside the HTML body. The fragment opens at the
/// start marker `">{first_label}: ` (the attribute-close prefix the alert
/// template emits before the field list) and closes at the next `</p>`.
/// Returns `None` when either marker is missing, rather than slicing blind.
pub fn extract_fragment<'a>(html: &'a str, first_label: &str) -> Option<&'a str> {
    let start_marker = format!("\">{first_label}: ");
    let start = html.find(&start_marker)?;
    // Keep the field list itself; drop the two attribute-close characters.
    let rest = &html[start + 2..];
    let end = rest.find("</p>")?;
    Some(rest[..end].trim())
}

/// Derives the short alert label from a message subject by removing the
/// `"{prefix}: "` tag when present.
pub fn alert_name_from_subject(subject: &str, prefix: &str) -> String {
    let tag = format!("{prefix}: ");
    subject.strip_prefix(&tag).unwrap_or(subject).to_string()
}
