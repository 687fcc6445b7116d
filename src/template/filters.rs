//! Output filters.
//!
//! The filter set is assembled once at startup and shared immutably by every
//! render. Anything tenant-specific (the money format) travels in
//! [`FilterContext`], built per request from the render context, so no
//! request can ever see another tenant's formatting.

use std::collections::HashMap;

use serde_json::Value;
use slug::slugify;

use super::error::TemplateError;
use super::value::{JsonMap, display, is_truthy};

/// Tenant currency formatting, resolved from the `shop` view of the render
/// context at the start of each render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoneyFormat {
    /// Display template containing an `{{amount}}` placeholder.
    pub format: String,
    pub decimal_places: u8,
}

impl Default for MoneyFormat {
    fn default() -> Self {
        Self {
            format: "${{amount}}".to_string(),
            decimal_places: 2,
        }
    }
}

impl MoneyFormat {
    pub fn from_context_root(root: &JsonMap) -> Self {
        let shop = root.get("shop").and_then(Value::as_object);
        let format = shop
            .and_then(|shop| shop.get("money_format"))
            .and_then(Value::as_str)
            .unwrap_or("${{amount}}")
            .to_string();
        let decimal_places = shop
            .and_then(|shop| shop.get("decimal_places"))
            .and_then(Value::as_u64)
            .map_or(2, |places| places.min(6) as u8);
        Self {
            format,
            decimal_places,
        }
    }

    /// Formats an amount given in minor units.
    pub fn render(&self, minor_units: i64) -> String {
        let scale = 10i64.pow(u32::from(self.decimal_places));
        let sign = if minor_units < 0 { "-" } else { "" };
        let magnitude = minor_units.unsigned_abs();
        let whole = magnitude / scale.unsigned_abs();
        let amount = if self.decimal_places == 0 {
            format!("{sign}{whole}")
        } else {
            let fraction = magnitude % scale.unsigned_abs();
            format!(
                "{sign}{whole}.{fraction:0width$}",
                width = self.decimal_places as usize
            )
        };
        self.format
            .replace("{{amount}}", &amount)
            .replace("{{ amount }}", &amount)
    }
}

/// Per-request data available to filters.
#[derive(Debug, Clone, Default)]
pub struct FilterContext {
    pub money: MoneyFormat,
}

pub type FilterFn = fn(&Value, &[Value], &FilterContext) -> Result<Value, TemplateError>;

/// Named filter registry, immutable once the compiler is built.
#[derive(Default)]
pub struct FilterSet {
    filters: HashMap<String, FilterFn>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The filter set every storefront render uses.
    pub fn storefront() -> Self {
        let mut set = Self::new();
        set.register("upcase", |input, _, _| {
            Ok(Value::from(display(input).to_uppercase()))
        });
        set.register("downcase", |input, _, _| {
            Ok(Value::from(display(input).to_lowercase()))
        });
        set.register("capitalize", |input, _, _| {
            let text = display(input);
            let mut chars = text.chars();
            Ok(Value::from(match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }))
        });
        set.register("strip", |input, _, _| {
            Ok(Value::from(display(input).trim().to_string()))
        });
        set.register("escape", |input, _, _| Ok(Value::from(escape_html(&display(input)))));
        set.register("handleize", |input, _, _| {
            Ok(Value::from(slugify(display(input))))
        });
        set.register("append", |input, args, _| {
            Ok(Value::from(display(input) + &arg_str(args, 0)))
        });
        set.register("prepend", |input, args, _| {
            Ok(Value::from(arg_str(args, 0) + &display(input)))
        });
        set.register("replace", |input, args, _| {
            Ok(Value::from(
                display(input).replace(&arg_str(args, 0), &arg_str(args, 1)),
            ))
        });
        set.register("truncate", |input, args, _| {
            let text = display(input);
            let limit = args
                .first()
                .and_then(Value::as_u64)
                .unwrap_or(50) as usize;
            if text.chars().count() <= limit {
                return Ok(Value::from(text));
            }
            let cut: String = text.chars().take(limit.saturating_sub(3)).collect();
            Ok(Value::from(cut + "..."))
        });
        set.register("split", |input, args, _| {
            let separator = arg_str(args, 0);
            let parts: Vec<Value> = display(input)
                .split(separator.as_str())
                .map(Value::from)
                .collect();
            Ok(Value::from(parts))
        });
        set.register("join", |input, args, _| {
            let separator = if args.is_empty() {
                " ".to_string()
            } else {
                arg_str(args, 0)
            };
            match input {
                Value::Array(items) => Ok(Value::from(
                    items.iter().map(display).collect::<Vec<_>>().join(&separator),
                )),
                other => Ok(Value::from(display(other))),
            }
        });
        set.register("first", |input, _, _| match input {
            Value::Array(items) => Ok(items.first().cloned().unwrap_or(Value::Null)),
            other => Ok(other.clone()),
        });
        set.register("last", |input, _, _| match input {
            Value::Array(items) => Ok(items.last().cloned().unwrap_or(Value::Null)),
            other => Ok(other.clone()),
        });
        set.register("size", |input, _, _| match input {
            Value::Array(items) => Ok(Value::from(items.len())),
            Value::String(text) => Ok(Value::from(text.chars().count())),
            Value::Object(map) => Ok(Value::from(map.len())),
            _ => Ok(Value::from(0)),
        });
        set.register("default", |input, args, _| {
            if is_truthy(input) && *input != Value::String(String::new()) {
                Ok(input.clone())
            } else {
                Ok(args.first().cloned().unwrap_or(Value::Null))
            }
        });
        set.register("json", |input, _, _| {
            serde_json::to_string(input)
                .map(Value::from)
                .map_err(|err| TemplateError::render(format!("json filter: {err}")))
        });
        set.register("money", |input, _, ctx| {
            let minor_units = as_minor_units(input)
                .ok_or_else(|| TemplateError::render("money filter expects a number"))?;
            Ok(Value::from(ctx.money.render(minor_units)))
        });
        set
    }

    pub fn register(&mut self, name: impl Into<String>, filter: FilterFn) {
        self.filters.insert(name.into(), filter);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    pub fn apply(
        &self,
        name: &str,
        input: &Value,
        args: &[Value],
        ctx: &FilterContext,
    ) -> Result<Value, TemplateError> {
        let filter = self
            .filters
            .get(name)
            .ok_or_else(|| TemplateError::render(format!("unknown filter `{name}`")))?;
        filter(input, args, ctx)
    }
}

fn arg_str(args: &[Value], index: usize) -> String {
    args.get(index).map(display).unwrap_or_default()
}

fn as_minor_units(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|float| float.round() as i64)),
        Value::String(text) => text.parse().ok(),
        _ => None,
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> FilterContext {
        FilterContext::default()
    }

    #[test]
    fn money_uses_tenant_format_from_context() {
        let ctx = FilterContext {
            money: MoneyFormat {
                format: "COP {{amount}}".to_string(),
                decimal_places: 0,
            },
        };
        let set = FilterSet::storefront();
        let formatted = set
            .apply("money", &json!(125000), &[], &ctx)
            .expect("money");
        assert_eq!(formatted, json!("COP 125000"));
    }

    #[test]
    fn money_defaults_to_two_decimal_dollars() {
        let set = FilterSet::storefront();
        assert_eq!(
            set.apply("money", &json!(1999), &[], &ctx()).expect("money"),
            json!("$19.99")
        );
        assert_eq!(
            set.apply("money", &json!(-50), &[], &ctx()).expect("money"),
            json!("$-0.50")
        );
    }

    #[test]
    fn default_filter_fills_missing_values() {
        let set = FilterSet::storefront();
        assert_eq!(
            set.apply("default", &Value::Null, &[json!("fallback")], &ctx())
                .expect("default"),
            json!("fallback")
        );
        assert_eq!(
            set.apply("default", &json!("set"), &[json!("fallback")], &ctx())
                .expect("default"),
            json!("set")
        );
    }

    #[test]
    fn escape_neutralizes_markup() {
        let set = FilterSet::storefront();
        assert_eq!(
            set.apply("escape", &json!("<b>&</b>"), &[], &ctx())
                .expect("escape"),
            json!("&lt;b&gt;&amp;&lt;/b&gt;")
        );
    }

    #[test]
    fn unknown_filter_is_a_render_error() {
        let set = FilterSet::storefront();
        assert!(set.apply("nope", &json!(1), &[], &ctx()).is_err());
    }
}
