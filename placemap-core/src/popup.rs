//! Popup content for a resolved point.

use serde::Serialize;

use crate::types::Row;

/// A popup cell: plain text, or a URL shown as a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum PopupValue {
    Text(String),
    Link(String),
}

impl PopupValue {
    pub fn from_cell(text: &str) -> Self {
        if is_http_url(text) {
            Self::Link(text.to_string())
        } else {
            Self::Text(text.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupRow {
    pub label: String,
    #[serde(flatten)]
    pub value: PopupValue,
}

/// One popup row per label, in label order. Missing columns show as empty text.
pub fn popup_rows(row: &Row, labels: &[String]) -> Vec<PopupRow> {
    labels
        .iter()
        .map(|label| PopupRow {
            label: label.clone(),
            value: PopupValue::from_cell(row.get(label).unwrap_or_default()),
        })
        .collect()
}

fn is_http_url(text: &str) -> bool {
    text.starts_with("http://") || text.starts_with("https://")
}
