//! Output schema declarations
//!
//! Every agent declares its structured output type alongside its prompt, in
//! a `return_type.json` file. The file is either a document with a
//! `definitions` object (schema names to JSON-Schema fragments, selected by
//! the config's `return_type`) or a single flat schema.

use crate::error::{Error, Result};
use serde_json::Value;
use std::path::Path;

/// A compiled output schema for one agent.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    pub name: String,
    pub schema: Value,
}

impl OutputSchema {
    /// A permissive schema accepting any JSON object.
    pub fn any(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: serde_json::json!({ "type": "object", "additionalProperties": true }),
        }
    }

    /// Load the schema named `name` from a `return_type.json` document.
    ///
    /// With a `definitions` object the name selects the fragment; a flat
    /// document must either carry a matching `title` or no title at all.
    pub fn from_file(path: &Path, name: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::schema(format!("cannot read {}: {}", path.display(), e))
        })?;
        let doc: Value = serde_json::from_str(&raw)
            .map_err(|e| Error::schema(format!("{}: {}", path.display(), e)))?;

        if let Some(definitions) = doc.get("definitions").and_then(|d| d.as_object()) {
            let schema = definitions.get(name).ok_or_else(|| {
                Error::schema(format!(
                    "{} does not define '{}' (has: {})",
                    path.display(),
                    name,
                    definitions.keys().cloned().collect::<Vec<_>>().join(", ")
                ))
            })?;
            return Ok(Self {
                name: name.to_string(),
                schema: schema.clone(),
            });
        }

        if let Some(title) = doc.get("title").and_then(|t| t.as_str()) {
            if title != name {
                return Err(Error::schema(format!(
                    "{} defines '{}', config names '{}'",
                    path.display(),
                    title,
                    name
                )));
            }
        }

        Ok(Self {
            name: name.to_string(),
            schema: doc,
        })
    }

    /// Whether the schema's top-level `properties` declare the given field.
    pub fn has_field(&self, field: &str) -> bool {
        self.schema
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|p| p.contains_key(field))
            .unwrap_or(false)
    }
}
