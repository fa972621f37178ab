//! Decoding of Notion's typed property envelopes into plain values.
//!
//! Every property arrives as `{"type": "<kind>", "<kind>": <payload>}`. Only the
//! kinds a catalog row needs are decoded; anything else reads as absent.

use serde_json::{Map, Value};

/// A decoded property value.
#[derive(Debug, Clone, PartialEq)]
pub enum PlainValue {
    Text(String),
    Number(f64),
    Checkbox(bool),
    Url(String),
    Files(Vec<String>),
}

impl PlainValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PlainValue::Text(s) | PlainValue::Url(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PlainValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlainValue::Checkbox(b) => Some(*b),
            _ => None,
        }
    }
}

/// Decode one property envelope. Returns `None` for unsupported kinds and
/// for empty `number`, `url`, `select` and `status` values.
pub fn decode(prop: &Value) -> Option<PlainValue> {
    let kind = prop.get("type")?.as_str()?;
    let payload = prop.get(kind)?;
    match kind {
        "title" | "rich_text" => Some(PlainValue::Text(plain_text(payload))),
        "number" => payload.as_f64().map(PlainValue::Number),
        "checkbox" => Some(PlainValue::Checkbox(payload.as_bool().unwrap_or(false))),
        "url" => payload.as_str().map(|s| PlainValue::Url(s.to_string())),
        "select" | "status" => payload
            .get("name")
            .and_then(|n| n.as_str())
            .map(|s| PlainValue::Text(s.to_string())),
        "files" => Some(PlainValue::Files(file_urls(payload))),
        _ => None,
    }
}

fn plain_text(payload: &Value) -> String {
    payload
        .as_array()
        .map(|parts| {
            parts
                .iter()
                .filter_map(|t| t.get("plain_text").and_then(|s| s.as_str()))
                .collect::<String>()
        })
        .unwrap_or_default()
}

// External links, Notion-hosted files (time-limited URLs) and uploads.
fn file_urls(payload: &Value) -> Vec<String> {
    let Some(items) = payload.as_array() else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            ["external", "file", "file_upload"].iter().find_map(|k| {
                item.get(*k)
                    .and_then(|m| m.get("url"))
                    .and_then(|u| u.as_str())
                    .filter(|u| !u.is_empty())
                    .map(str::to_string)
            })
        })
        .collect()
}

/// First alias present on the page, decoded.
pub fn lookup(properties: &Map<String, Value>, aliases: &[String]) -> Option<PlainValue> {
    aliases
        .iter()
        .find_map(|name| properties.get(name))
        .and_then(decode)
}

/// Name of the first alias present on the page.
pub fn resolve_name<'a>(properties: &Map<String, Value>, aliases: &'a [String]) -> Option<&'a str> {
    aliases
        .iter()
        .find(|name| properties.contains_key(name.as_str()))
        .map(String::as_str)
}

/// Non-blank text (title, rich text, url, select or status).
pub fn text(properties: &Map<String, Value>, aliases: &[String]) -> Option<String> {
    lookup(properties, aliases)
        .as_ref()
        .and_then(PlainValue::as_text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn number(properties: &Map<String, Value>, aliases: &[String]) -> Option<f64> {
    lookup(properties, aliases)
        .as_ref()
        .and_then(PlainValue::as_number)
        .filter(|n| n.is_finite())
}

pub fn checkbox(properties: &Map<String, Value>, aliases: &[String]) -> bool {
    lookup(properties, aliases)
        .as_ref()
        .and_then(PlainValue::as_bool)
        .unwrap_or(false)
}

/// File URLs held by one column; empty when the column is missing or not `files`.
pub fn files(properties: &Map<String, Value>, column: &str) -> Vec<String> {
    match properties.get(column).and_then(decode) {
        Some(PlainValue::Files(urls)) => urls,
        _ => Vec::new(),
    }
}
