//! `{% form 'type' %}` blocks.
//!
//! Wraps the body in a `<form>` bound to the named storefront action and
//! injects the hidden fields the submission endpoint expects. Submission
//! handling itself lives outside the renderer.

use std::sync::Arc;

use serde_json::Value;

use crate::template::ast::{Node, RenderState, TagRender, render_nodes};
use crate::template::error::TemplateError;
use crate::template::expr::{Operand, parse_operand, split_top};
use crate::template::lexer::TokenStream;
use crate::template::parser::{Parser, TagFactory};
use crate::template::value::display;

pub struct FormTagFactory;

impl TagFactory for FormTagFactory {
    fn parse(
        &self,
        args: &str,
        stream: &mut TokenStream,
        parser: &Parser,
    ) -> Result<Node, TemplateError> {
        let mut parts = split_top(args, ',').into_iter();
        let kind = match parts.next().map(|part| parse_operand(&part)) {
            Some(Ok(Operand::Literal(Value::String(kind)))) => kind,
            _ => return Err(TemplateError::parse("form tag expects a quoted form type")),
        };

        let mut subject = None;
        let mut attributes = Vec::new();
        for part in parts {
            match part.split_once(':') {
                Some((key, value)) => {
                    let Operand::Literal(literal) = parse_operand(value.trim())? else {
                        return Err(TemplateError::parse(format!(
                            "form attribute `{}` expects a literal value",
                            key.trim()
                        )));
                    };
                    attributes.push((key.trim().to_string(), display(&literal)));
                }
                None if subject.is_none() => subject = Some(parse_operand(&part)?),
                None => {
                    return Err(TemplateError::parse(format!(
                        "unexpected form argument `{part}`"
                    )));
                }
            }
        }

        let body_tokens = stream.take_block("form")?;
        let mut body_stream = TokenStream::new(body_tokens);
        let (body, terminator) = parser.parse_until(&mut body_stream, &[])?;
        if let Some((name, _)) = terminator {
            return Err(TemplateError::parse(format!("unexpected `{name}`")));
        }
        Ok(Node::Custom(Arc::new(FormNode {
            kind,
            subject,
            attributes,
            body,
        })))
    }
}

struct FormNode {
    kind: String,
    subject: Option<Operand>,
    attributes: Vec<(String, String)>,
    body: Vec<Node>,
}

impl FormNode {
    fn action(&self) -> &'static str {
        match self.kind.as_str() {
            "newsletter" => "/newsletter",
            "product" => "/cart/add",
            "login" => "/account/login",
            "register" => "/account/register",
            "recover_password" => "/account/recover",
            "customer" => "/customer",
            "storefront_password" => "/password",
            _ => "/contact",
        }
    }

    fn css_class(&self) -> String {
        match self.kind.as_str() {
            "contact" | "newsletter" | "product" | "login" | "register" | "customer" => {
                format!("{}-form", self.kind)
            }
            "recover_password" => "recover-form".to_string(),
            _ => "form".to_string(),
        }
    }
}

impl TagRender for FormNode {
    fn render(&self, state: &mut RenderState, out: &mut String) -> Result<(), TemplateError> {
        out.push_str(&format!(
            "<form action=\"{}\" method=\"post\" class=\"{}\"",
            self.action(),
            self.css_class()
        ));
        for (key, value) in &self.attributes {
            out.push_str(&format!(" {key}=\"{value}\""));
        }
        out.push('>');
        out.push_str(&format!(
            "<input type=\"hidden\" name=\"form_type\" value=\"{}\">",
            self.kind
        ));
        if let Some(subject) = &self.subject {
            let value = subject.eval(&state.scopes);
            let id = match &value {
                Value::Object(map) => map.get("id").map(display).unwrap_or_default(),
                other => display(other),
            };
            if !id.is_empty() {
                out.push_str(&format!(
                    "<input type=\"hidden\" name=\"id\" value=\"{id}\">"
                ));
            }
        }
        render_nodes(&self.body, state, out)?;
        out.push_str("</form>");
        Ok(())
    }
}
