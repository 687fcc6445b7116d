//! Compiled template tree and its executor.
//!
//! Execution is purely synchronous: every sub-template is inlined at compile
//! time, so running a compiled template never touches storage.

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::assets::AssetBundle;
use super::error::TemplateError;
use super::expr::{Condition, Expr};
use super::filters::{FilterContext, FilterSet, MoneyFormat};
use super::value::{JsonMap, Scopes, display};

/// Render hook for custom tag nodes.
pub trait TagRender: Send + Sync {
    fn render(&self, state: &mut RenderState, out: &mut String) -> Result<(), TemplateError>;
}

pub enum Node {
    Text(String),
    Output(Expr),
    If {
        branches: Vec<(Condition, Vec<Node>)>,
        otherwise: Option<Vec<Node>>,
    },
    For {
        var: String,
        iterable: Expr,
        body: Vec<Node>,
    },
    Assign {
        target: String,
        value: Expr,
    },
    Custom(Arc<dyn TagRender>),
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Node::Output(expr) => f.debug_tuple("Output").field(expr).finish(),
            Node::If {
                branches,
                otherwise,
            } => f
                .debug_struct("If")
                .field("branches", branches)
                .field("otherwise", otherwise)
                .finish(),
            Node::For {
                var,
                iterable,
                body,
            } => f
                .debug_struct("For")
                .field("var", var)
                .field("iterable", iterable)
                .field("body", body)
                .finish(),
            Node::Assign { target, value } => f
                .debug_struct("Assign")
                .field("target", target)
                .field("value", value)
                .finish(),
            Node::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Mutable state threaded through one render.
pub struct RenderState<'a> {
    pub scopes: Scopes,
    pub assets: AssetBundle,
    pub filters: &'a FilterSet,
    pub filter_ctx: FilterContext,
    /// Stack of enclosing section ids; keys asset capture.
    pub sections: Vec<String>,
}

impl<'a> RenderState<'a> {
    pub fn new(root: JsonMap, filters: &'a FilterSet) -> Self {
        let filter_ctx = FilterContext {
            money: MoneyFormat::from_context_root(&root),
        };
        // Working frame above the request context; keeps template-local
        // assigns out of the root so isolated includes never see them.
        let mut scopes = Scopes::new(root);
        scopes.push(Map::new());
        Self {
            scopes,
            assets: AssetBundle::new(),
            filters,
            filter_ctx,
            sections: Vec::new(),
        }
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, TemplateError> {
        expr.eval(&self.scopes, self.filters, &self.filter_ctx)
    }

    /// Key under which the current scope's captured assets are stored.
    pub fn asset_key(&self) -> String {
        self.sections
            .last()
            .cloned()
            .unwrap_or_else(|| "template".to_string())
    }
}

pub fn render_nodes(
    nodes: &[Node],
    state: &mut RenderState,
    out: &mut String,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::Output(expr) => {
                let value = state.eval(expr)?;
                out.push_str(&display(&value));
            }
            Node::If {
                branches,
                otherwise,
            } => {
                let mut taken = false;
                for (condition, body) in branches {
                    if condition.eval(&state.scopes, state.filters, &state.filter_ctx)? {
                        render_nodes(body, state, out)?;
                        taken = true;
                        break;
                    }
                }
                if !taken && let Some(body) = otherwise {
                    render_nodes(body, state, out)?;
                }
            }
            Node::For {
                var,
                iterable,
                body,
            } => {
                let items = match state.eval(iterable)? {
                    Value::Array(items) => items,
                    Value::Null => Vec::new(),
                    single => vec![single],
                };
                let length = items.len();
                for (index, item) in items.into_iter().enumerate() {
                    let mut frame = Map::new();
                    frame.insert(var.clone(), item);
                    frame.insert("forloop".to_string(), forloop_meta(index, length));
                    state.scopes.push(frame);
                    let result = render_nodes(body, state, out);
                    state.scopes.pop();
                    result?;
                }
            }
            Node::Assign { target, value } => {
                let value = state.eval(value)?;
                state.scopes.set(target.clone(), value);
            }
            Node::Custom(tag) => tag.render(state, out)?,
        }
    }
    Ok(())
}

fn forloop_meta(index: usize, length: usize) -> Value {
    serde_json::json!({
        "index": index + 1,
        "index0": index,
        "first": index == 0,
        "last": index + 1 == length,
        "length": length,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::expr::parse_expr;
    use serde_json::json;

    #[test]
    fn for_loop_exposes_forloop_meta_and_pops_scope() {
        let filters = FilterSet::storefront();
        let Value::Object(root) = json!({ "items": ["a", "b"] }) else {
            unreachable!()
        };
        let mut state = RenderState::new(root, &filters);
        let nodes = vec![Node::For {
            var: "item".to_string(),
            iterable: parse_expr("items", &filters).expect("expr"),
            body: vec![
                Node::Output(parse_expr("forloop.index", &filters).expect("expr")),
                Node::Text(":".to_string()),
                Node::Output(parse_expr("item", &filters).expect("expr")),
                Node::Text(" ".to_string()),
            ],
        }];
        let mut out = String::new();
        render_nodes(&nodes, &mut state, &mut out).expect("render");
        assert_eq!(out, "1:a 2:b ");
        // Loop variables do not leak past the loop.
        assert_eq!(
            state.scopes.lookup(&["item".to_string()]),
            Value::Null
        );
    }

    #[test]
    fn assign_writes_into_current_scope() {
        let filters = FilterSet::storefront();
        let mut state = RenderState::new(Map::new(), &filters);
        let nodes = vec![
            Node::Assign {
                target: "greeting".to_string(),
                value: parse_expr("'hi'", &filters).expect("expr"),
            },
            Node::Output(parse_expr("greeting | upcase", &filters).expect("expr")),
        ];
        let mut out = String::new();
        render_nodes(&nodes, &mut state, &mut out).expect("render");
        assert_eq!(out, "HI");
    }
}
