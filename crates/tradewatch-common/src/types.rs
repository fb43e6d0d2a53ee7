use serde::{Deserialize, Serialize};

/// The ordered set of strategy field labels an alert message is expected to
/// carry, fixed at configuration time.
///
/// Labels keep their configured casing for display; the corresponding store
/// column names are the lower-cased labels. The first label doubles as the
/// start marker for locating the alert fragment inside the email body.
///
/// # Examples
///
/// ```
/// use tradewatch_common::types::FieldSet;
///
/// let fields = FieldSet::new(vec!["Timestamp".into(), "Ticker".into()]).unwrap();
/// assert_eq!(fields.first_label(), "Timestamp");
/// assert_eq!(fields.columns(), vec!["timestamp", "ticker"]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSet {
    labels: Vec<String>,
}

impl FieldSet {
    /// Validates and builds a field set from configured labels.
    ///
    /// Labels must be non-empty, consist of ASCII alphanumerics and
    /// underscores (they become SQL column names), and be unique after
    /// lower-casing.
    pub fn new(labels: Vec<String>) -> Result<Self, String> {
        if labels.is_empty() {
            return Err("strategy field list must not be empty".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for label in &labels {
            if label.is_empty() {
                return Err("strategy field labels must not be empty".to_string());
            }
            if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(format!(
                    "strategy field label '{label}' contains characters not allowed in a column name"
                ));
            }
            if !seen.insert(label.to_lowercase()) {
                return Err(format!("duplicate strategy field label '{label}'"));
            }
        }
        Ok(Self { labels })
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Lower-cased column names, in configured order.
    pub fn columns(&self) -> Vec<String> {
        self.labels.iter().map(|l| l.to_lowercase()).collect()
    }

    pub fn first_label(&self) -> &str {
        &self.labels[0]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A fully ingested alert row, as read back from the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Store-assigned monotonic sequence number; the change-detection cursor
    /// orders by this, never by `message_id`.
    pub seq: i64,
    pub message_id: String,
    /// Source-reported timestamp (the message `Date` header), as provided.
    pub timestamp: String,
    pub alert_name: String,
    /// Field values aligned with the configured [`FieldSet`] order.
    pub fields: Vec<Option<String>>,
}

/// An alert about to be inserted; the store assigns `seq`.
#[derive(Debug, Clone)]
pub struct NewAlert {
    pub message_id: String,
    pub timestamp: String,
    pub alert_name: String,
    /// Field values aligned with the configured [`FieldSet`] order.
    pub fields: Vec<Option<String>>,
}

/// Capitalize a label the way notification lines render field names:
/// first character upper-cased, the rest lower-cased.
///
/// # Examples
///
/// ```
/// use tradewatch_common::types::capitalize;
///
/// assert_eq!(capitalize("ticker"), "Ticker");
/// assert_eq!(capitalize("entryPrice"), "Entryprice");
/// assert_eq!(capitalize(""), "");
/// ```
pub fn capitalize(label: &str) -> String {
    let mut chars = label.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase(),
        None => String::new(),
    }
}
