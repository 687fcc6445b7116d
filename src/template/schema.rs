//! Section schema blocks.
//!
//! Theme authors hand-write the `{% schema %}` JSON, so parsing tolerates
//! comments and trailing commas through a repair pass before giving up.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::TemplateError;
use super::value::JsonMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SectionSchema {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub settings: Vec<SettingField>,
    #[serde(default)]
    pub blocks: Vec<BlockSchema>,
    #[serde(default)]
    pub presets: Vec<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingField {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub default: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BlockSchema {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub settings: Vec<SettingField>,
}

impl SectionSchema {
    /// Default values declared by the schema, used as the base layer under
    /// any per-template setting overrides.
    pub fn settings_defaults(&self) -> JsonMap {
        let mut defaults = Map::new();
        for field in &self.settings {
            if let Some(default) = &field.default {
                defaults.insert(field.id.clone(), default.clone());
            }
        }
        defaults
    }
}

pub fn parse_schema(raw: &str) -> Result<SectionSchema, TemplateError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(SectionSchema::default());
    }
    match serde_json::from_str(raw) {
        Ok(schema) => Ok(schema),
        Err(first_error) => {
            let repaired = repair_json(raw);
            serde_json::from_str(&repaired)
                .map_err(|_| TemplateError::schema(first_error.to_string()))
        }
    }
}

/// Best-effort cleanup of author JSON: strips `//` and `/* */` comments and
/// trailing commas, leaving string contents untouched.
fn repair_json(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = String::with_capacity(raw.len());
    let mut i = 0usize;
    let mut in_string = false;

    while i < bytes.len() {
        let ch = bytes[i] as char;
        if in_string {
            out.push(ch);
            if ch == '\\' && i + 1 < bytes.len() {
                out.push(bytes[i + 1] as char);
                i += 2;
                continue;
            }
            if ch == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
                i += 1;
            }
            '/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            '/' if bytes.get(i + 1) == Some(&b'*') => {
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i = (i + 2).min(bytes.len());
            }
            ',' => {
                // Drop the comma when the next significant char closes a scope.
                let mut j = i + 1;
                while j < bytes.len() && (bytes[j] as char).is_whitespace() {
                    j += 1;
                }
                if !matches!(bytes.get(j), Some(b'}') | Some(b']')) {
                    out.push(',');
                }
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn clean_schema_parses_directly() {
        let schema = parse_schema(
            r#"{
                "name": "Header",
                "settings": [
                    { "id": "logo_text", "type": "text", "default": "Vetrina" }
                ]
            }"#,
        )
        .expect("schema");
        assert_eq!(schema.name.as_deref(), Some("Header"));
        assert_eq!(
            schema.settings_defaults().get("logo_text"),
            Some(&json!("Vetrina"))
        );
    }

    #[test]
    fn repair_strips_comments_and_trailing_commas() {
        let schema = parse_schema(
            r#"{
                // section name
                "name": "Hero",
                "settings": [
                    { "id": "title", "type": "text", "default": "Hi // not a comment", },
                ],
            }"#,
        )
        .expect("repaired schema");
        assert_eq!(schema.name.as_deref(), Some("Hero"));
        assert_eq!(
            schema.settings_defaults().get("title"),
            Some(&json!("Hi // not a comment"))
        );
    }

    #[test]
    fn unrepairable_schema_is_a_schema_error() {
        let err = parse_schema("{ name: [unclosed").expect_err("must fail");
        assert!(matches!(err, TemplateError::Schema(_)));
    }

    #[test]
    fn empty_schema_block_yields_defaults() {
        let schema = parse_schema("   ").expect("empty schema");
        assert!(schema.settings.is_empty());
    }
}
