//! Generic INI-like tokenizer.
//!
//! Supports `#`-comments, `[section]` headers, `key=value` pairs, and a
//! multi-line list value introduced by `key=[[[[` and closed by a line
//! that is exactly `]]]]`, one item per line in between. Trailing
//! whitespace on scalar values and list items is trimmed.

use std::collections::BTreeMap;

use gasfs_core::GasFsError;

/// A single value in a parsed INI document: either a plain scalar or a
/// multi-line list (the `[[[[ ... ]]]]` form).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// A `key=value` scalar, trailing whitespace trimmed.
    Scalar(String),
    /// A `key=[[[[ ... ]]]]` multi-line list, one trimmed item per line.
    List(Vec<String>),
}

impl Value {
    /// View this value as a scalar string, if it is one.
    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s),
            Value::List(_) => None,
        }
    }

    /// View this value as a list of items, if it is one.
    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            Value::List(items) => Some(items),
            Value::Scalar(_) => None,
        }
    }
}

/// A parsed INI document: section name (without brackets) → ordered
/// key → value.
#[derive(Debug, Clone, Default)]
pub struct Document {
    sections: Vec<(String, BTreeMap<String, Value>)>,
}

impl Document {
    /// Look up a key within a named section.
    pub fn get(&self, section: &str, key: &str) -> Option<&Value> {
        self.sections
            .iter()
            .find(|(name, _)| name == section)
            .and_then(|(_, kv)| kv.get(key))
    }

    /// Iterate over section names in file order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|(name, _)| name.as_str())
    }

    /// Parse an INI document from its textual source.
    pub fn parse(source: &str) -> Result<Self, GasFsError> {
        let mut doc = Document::default();
        let mut current: Option<(String, BTreeMap<String, Value>)> = None;

        let mut lines = source.lines().peekable();
        while let Some(raw_line) = lines.next() {
            let line = raw_line.trim_end();
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(section) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                if let Some(finished) = current.take() {
                    doc.sections.push(finished);
                }
                current = Some((section.to_string(), BTreeMap::new()));
                continue;
            }

            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(GasFsError::ManifestError(format!(
                    "expected key=value, got: {trimmed}"
                )));
            };
            let key = key.trim().to_string();
            let value = value.trim_end();

            let parsed_value = if value.trim_start() == "[[[[" {
                let mut items = Vec::new();
                loop {
                    let Some(item_line) = lines.next() else {
                        return Err(GasFsError::ManifestError(format!(
                            "unterminated list for key {key}"
                        )));
                    };
                    let item_trimmed = item_line.trim();
                    if item_trimmed == "]]]]" {
                        break;
                    }
                    if item_trimmed.is_empty() || item_trimmed.starts_with('#') {
                        continue;
                    }
                    items.push(item_trimmed.to_string());
                }
                Value::List(items)
            } else {
                Value::Scalar(value.trim().to_string())
            };

            let Some((_, kv)) = current.as_mut() else {
                return Err(GasFsError::ManifestError(format!(
                    "key {key} outside of any [section]"
                )));
            };
            kv.insert(key, parsed_value);
        }

        if let Some(finished) = current.take() {
            doc.sections.push(finished);
        }

        Ok(doc)
    }
}
