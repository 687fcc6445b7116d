//! Render-time value model.
//!
//! Contexts are plain JSON trees; variable resolution walks a scope stack
//! from the innermost frame outward.

use std::sync::LazyLock;

use serde_json::{Map, Value};

pub type JsonMap = Map<String, Value>;

/// Lexical scope stack for one render. The bottom frame is the request
/// context; tags push frames for loop variables and isolated includes.
#[derive(Debug, Clone, Default)]
pub struct Scopes {
    frames: Vec<JsonMap>,
}

impl Scopes {
    pub fn new(root: JsonMap) -> Self {
        Self { frames: vec![root] }
    }

    pub fn push(&mut self, frame: JsonMap) {
        self.frames.push(frame);
    }

    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Sets a variable in the innermost frame.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value);
        }
    }

    /// Resolves a dotted path, trying each frame from innermost outward for
    /// the first segment.
    pub fn lookup(&self, path: &[String]) -> Value {
        let Some(first) = path.first() else {
            return Value::Null;
        };
        for frame in self.frames.iter().rev() {
            if let Some(root) = frame.get(first) {
                return path[1..]
                    .iter()
                    .fold(root.clone(), |value, segment| dig(&value, segment));
            }
        }
        Value::Null
    }

    /// Root-frame view, used to pull request-scoped configuration such as the
    /// tenant currency format.
    pub fn root(&self) -> &JsonMap {
        self.frames.first().map_or(&*EMPTY_MAP, |frame| frame)
    }
}

static EMPTY_MAP: LazyLock<JsonMap> = LazyLock::new(JsonMap::new);

fn dig(value: &Value, segment: &str) -> Value {
    match value {
        Value::Object(map) => map.get(segment).cloned().unwrap_or(Value::Null),
        Value::Array(items) => match segment {
            "first" => items.first().cloned().unwrap_or(Value::Null),
            "last" => items.last().cloned().unwrap_or(Value::Null),
            "size" => Value::from(items.len()),
            _ => segment
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index).cloned())
                .unwrap_or(Value::Null),
        },
        Value::String(text) if segment == "size" => Value::from(text.chars().count()),
        _ => Value::Null,
    }
}

/// Liquid truthiness: only `null` and `false` are falsy.
pub fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

/// String form used when a value lands in output.
pub fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(items) => items.iter().map(display).collect(),
        Value::Object(_) => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scopes() -> Scopes {
        let Value::Object(root) = json!({
            "shop": { "name": "Vetrina Demo", "currency": "USD" },
            "products": [ { "name": "First" }, { "name": "Second" } ],
        }) else {
            unreachable!()
        };
        Scopes::new(root)
    }

    fn path(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn lookup_walks_objects_and_arrays() {
        let scopes = scopes();
        assert_eq!(
            scopes.lookup(&path(&["shop", "name"])),
            json!("Vetrina Demo")
        );
        assert_eq!(
            scopes.lookup(&path(&["products", "1", "name"])),
            json!("Second")
        );
        assert_eq!(scopes.lookup(&path(&["products", "size"])), json!(2));
        assert_eq!(scopes.lookup(&path(&["missing", "deep"])), Value::Null);
    }

    #[test]
    fn inner_frames_shadow_outer_ones() {
        let mut scopes = scopes();
        let mut frame = JsonMap::new();
        frame.insert("shop".to_string(), json!("overridden"));
        scopes.push(frame);
        assert_eq!(scopes.lookup(&path(&["shop"])), json!("overridden"));
        scopes.pop();
        assert_eq!(
            scopes.lookup(&path(&["shop", "currency"])),
            json!("USD")
        );
    }

    #[test]
    fn empty_string_and_zero_are_truthy() {
        assert!(is_truthy(&json!("")));
        assert!(is_truthy(&json!(0)));
        assert!(!is_truthy(&Value::Null));
        assert!(!is_truthy(&json!(false)));
    }

    #[test]
    fn display_renders_scalars_plainly() {
        assert_eq!(display(&json!("x")), "x");
        assert_eq!(display(&json!(12)), "12");
        assert_eq!(display(&Value::Null), "");
    }
}
