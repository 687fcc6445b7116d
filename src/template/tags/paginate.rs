//! `{% paginate items by n %}`.
//!
//! Slices the target collection to the current page and exposes a `paginate`
//! object to the body. The current page arrives through the render context
//! (`current_page`), fed from the request query string.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::template::ast::{Node, RenderState, TagRender, render_nodes};
use crate::template::error::TemplateError;
use crate::template::expr::{Expr, Operand, parse_expr, parse_operand};
use crate::template::lexer::TokenStream;
use crate::template::parser::{Parser, TagFactory};

const DEFAULT_PAGE_SIZE: u64 = 20;

pub struct PaginateTagFactory;

impl TagFactory for PaginateTagFactory {
    fn parse(
        &self,
        args: &str,
        stream: &mut TokenStream,
        parser: &Parser,
    ) -> Result<Node, TemplateError> {
        let Some((target, size)) = args.split_once(" by ") else {
            return Err(TemplateError::parse(format!(
                "malformed paginate tag `{args}`, expected `collection by size`"
            )));
        };
        let source = parse_expr(target.trim(), parser.filters())?;
        let page_size = parse_operand(size.trim())?;
        let body_tokens = stream.take_block("paginate")?;
        let mut body_stream = TokenStream::new(body_tokens);
        let (body, terminator) = parser.parse_until(&mut body_stream, &[])?;
        if let Some((name, _)) = terminator {
            return Err(TemplateError::parse(format!("unexpected `{name}`")));
        }
        Ok(Node::Custom(Arc::new(PaginateNode {
            source,
            page_size,
            body,
        })))
    }
}

struct PaginateNode {
    source: Expr,
    page_size: Operand,
    body: Vec<Node>,
}

impl TagRender for PaginateNode {
    fn render(&self, state: &mut RenderState, out: &mut String) -> Result<(), TemplateError> {
        let items = match state.eval(&self.source)? {
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        let page_size = self
            .page_size
            .eval(&state.scopes)
            .as_u64()
            .filter(|size| *size > 0)
            .unwrap_or(DEFAULT_PAGE_SIZE) as usize;

        let total = items.len();
        let pages = total.div_ceil(page_size).max(1);
        let current = state
            .scopes
            .lookup(&["current_page".to_string()])
            .as_u64()
            .filter(|page| *page >= 1)
            .unwrap_or(1)
            .min(pages as u64) as usize;

        let start = (current - 1) * page_size;
        let slice: Vec<Value> = items.into_iter().skip(start).take(page_size).collect();

        let mut frame = Map::new();
        frame.insert(
            "paginate".to_string(),
            json!({
                "current_page": current,
                "page_size": page_size,
                "pages": pages,
                "items": total,
                "previous": page_link(current, pages, -1),
                "next": page_link(current, pages, 1),
            }),
        );
        // Rebind the iterated name so the body sees only the current page.
        if let Some(leaf) = self.source.operand.leaf_name() {
            frame.insert(leaf.to_string(), Value::Array(slice));
        }
        state.scopes.push(frame);
        let result = render_nodes(&self.body, state, out);
        state.scopes.pop();
        result
    }
}

fn page_link(current: usize, pages: usize, step: i64) -> Value {
    let target = current as i64 + step;
    if target < 1 || target > pages as i64 {
        return Value::Null;
    }
    json!({ "page": target, "url": format!("?page={target}") })
}
