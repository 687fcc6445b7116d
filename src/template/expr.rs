//! Output expressions and conditions.
//!
//! An expression is an operand plus a filter chain; filter names are checked
//! against the registry while parsing, so an unknown filter fails the compile
//! rather than the request.

use serde_json::Value;

use super::error::TemplateError;
use super::filters::{FilterContext, FilterSet};
use super::value::{Scopes, is_truthy};

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Path(Vec<String>),
}

impl Operand {
    pub fn eval(&self, scopes: &Scopes) -> Value {
        match self {
            Operand::Literal(value) => value.clone(),
            Operand::Path(path) => scopes.lookup(path),
        }
    }

    /// The last path segment, used by tags that rebind the iterated variable.
    pub fn leaf_name(&self) -> Option<&str> {
        match self {
            Operand::Path(path) => path.last().map(String::as_str),
            Operand::Literal(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FilterCall {
    pub name: String,
    pub args: Vec<Operand>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub operand: Operand,
    pub filters: Vec<FilterCall>,
}

impl Expr {
    pub fn eval(
        &self,
        scopes: &Scopes,
        filters: &FilterSet,
        ctx: &FilterContext,
    ) -> Result<Value, TemplateError> {
        let mut value = self.operand.eval(scopes);
        for call in &self.filters {
            let args: Vec<Value> = call.args.iter().map(|arg| arg.eval(scopes)).collect();
            value = filters.apply(&call.name, &value, &args, ctx)?;
        }
        Ok(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Truthy(Expr),
    Compare {
        lhs: Expr,
        op: CompareOp,
        rhs: Expr,
    },
}

impl Condition {
    pub fn eval(
        &self,
        scopes: &Scopes,
        filters: &FilterSet,
        ctx: &FilterContext,
    ) -> Result<bool, TemplateError> {
        match self {
            Condition::Truthy(expr) => Ok(is_truthy(&expr.eval(scopes, filters, ctx)?)),
            Condition::Compare { lhs, op, rhs } => {
                let left = lhs.eval(scopes, filters, ctx)?;
                let right = rhs.eval(scopes, filters, ctx)?;
                Ok(compare(&left, *op, &right))
            }
        }
    }
}

fn compare(left: &Value, op: CompareOp, right: &Value) -> bool {
    match op {
        CompareOp::Eq => left == right,
        CompareOp::Ne => left != right,
        CompareOp::Contains => match (left, right) {
            (Value::String(haystack), needle) => {
                haystack.contains(needle.as_str().unwrap_or_default())
            }
            (Value::Array(items), needle) => items.contains(needle),
            _ => false,
        },
        ordered => {
            let (Some(left), Some(right)) = (left.as_f64(), right.as_f64()) else {
                return false;
            };
            match ordered {
                CompareOp::Gt => left > right,
                CompareOp::Lt => left < right,
                CompareOp::Ge => left >= right,
                CompareOp::Le => left <= right,
                _ => unreachable!(),
            }
        }
    }
}

/// Splits `input` on a top-level delimiter, respecting quoted strings.
pub fn split_top(input: &str, delimiter: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in input.chars() {
        match quote {
            Some(open) => {
                current.push(ch);
                if ch == open {
                    quote = None;
                }
            }
            None if ch == '\'' || ch == '"' => {
                current.push(ch);
                quote = Some(ch);
            }
            None if ch == delimiter => {
                parts.push(current.trim().to_string());
                current.clear();
            }
            None => current.push(ch),
        }
    }
    parts.push(current.trim().to_string());
    parts
}

pub fn parse_operand(input: &str) -> Result<Operand, TemplateError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TemplateError::parse("empty expression"));
    }
    if (input.starts_with('\'') && input.ends_with('\'') && input.len() >= 2)
        || (input.starts_with('"') && input.ends_with('"') && input.len() >= 2)
    {
        return Ok(Operand::Literal(Value::from(&input[1..input.len() - 1])));
    }
    match input {
        "true" => return Ok(Operand::Literal(Value::Bool(true))),
        "false" => return Ok(Operand::Literal(Value::Bool(false))),
        "nil" | "null" | "blank" | "empty" => return Ok(Operand::Literal(Value::Null)),
        _ => {}
    }
    if let Ok(int) = input.parse::<i64>() {
        return Ok(Operand::Literal(Value::from(int)));
    }
    if let Ok(float) = input.parse::<f64>() {
        return Ok(Operand::Literal(Value::from(float)));
    }
    let path: Vec<String> = input.split('.').map(str::to_string).collect();
    if path.iter().any(String::is_empty) {
        return Err(TemplateError::parse(format!("malformed path `{input}`")));
    }
    Ok(Operand::Path(path))
}

pub fn parse_expr(input: &str, filters: &FilterSet) -> Result<Expr, TemplateError> {
    let mut parts = split_top(input, '|').into_iter();
    let operand = parse_operand(&parts.next().unwrap_or_default())?;
    let mut calls = Vec::new();
    for part in parts {
        let (name, raw_args) = match part.split_once(':') {
            Some((name, args)) => (name.trim().to_string(), args.trim().to_string()),
            None => (part.trim().to_string(), String::new()),
        };
        if !filters.contains(&name) {
            return Err(TemplateError::parse(format!("unknown filter `{name}`")));
        }
        let args = if raw_args.is_empty() {
            Vec::new()
        } else {
            split_top(&raw_args, ',')
                .iter()
                .map(|arg| parse_operand(arg))
                .collect::<Result<_, _>>()?
        };
        calls.push(FilterCall { name, args });
    }
    Ok(Expr {
        operand,
        filters: calls,
    })
}

pub fn parse_condition(input: &str, filters: &FilterSet) -> Result<Condition, TemplateError> {
    const OPS: [(&str, CompareOp); 7] = [
        ("==", CompareOp::Eq),
        ("!=", CompareOp::Ne),
        (">=", CompareOp::Ge),
        ("<=", CompareOp::Le),
        (">", CompareOp::Gt),
        ("<", CompareOp::Lt),
        (" contains ", CompareOp::Contains),
    ];
    for (symbol, op) in OPS {
        if let Some((lhs, rhs)) = input.split_once(symbol) {
            return Ok(Condition::Compare {
                lhs: parse_expr(lhs.trim(), filters)?,
                op,
                rhs: parse_expr(rhs.trim(), filters)?,
            });
        }
    }
    Ok(Condition::Truthy(parse_expr(input.trim(), filters)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scopes() -> Scopes {
        let Value::Object(root) = json!({
            "product": { "name": "Red Shoe", "price": 1999, "tags": ["sale", "new"] },
        }) else {
            unreachable!()
        };
        Scopes::new(root)
    }

    #[test]
    fn expr_applies_filter_chain_in_order() {
        let filters = FilterSet::storefront();
        let expr = parse_expr("product.name | upcase | append: '!'", &filters).expect("parse");
        let value = expr
            .eval(&scopes(), &filters, &FilterContext::default())
            .expect("eval");
        assert_eq!(value, json!("RED SHOE!"));
    }

    #[test]
    fn unknown_filter_fails_at_parse_time() {
        let filters = FilterSet::storefront();
        let err = parse_expr("product.name | sparkle", &filters).expect_err("must fail");
        assert!(matches!(err, TemplateError::Parse(_)));
    }

    #[test]
    fn quoted_pipe_does_not_split_filters() {
        let filters = FilterSet::storefront();
        let expr = parse_expr("product.name | append: ' | tail'", &filters).expect("parse");
        let value = expr
            .eval(&scopes(), &filters, &FilterContext::default())
            .expect("eval");
        assert_eq!(value, json!("Red Shoe | tail"));
    }

    #[test]
    fn conditions_compare_and_contain() {
        let filters = FilterSet::storefront();
        let ctx = FilterContext::default();
        let scopes = scopes();
        for (input, expected) in [
            ("product.price > 1000", true),
            ("product.price <= 1000", false),
            ("product.name == 'Red Shoe'", true),
            ("product.tags contains 'sale'", true),
            ("product.missing", false),
        ] {
            let condition = parse_condition(input, &filters).expect("parse");
            assert_eq!(
                condition.eval(&scopes, &filters, &ctx).expect("eval"),
                expected,
                "condition {input}"
            );
        }
    }
}
