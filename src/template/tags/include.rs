//! Sub-template inclusion: `section`, `render` and `include`.
//!
//! All three inline the named partial at compile time; the difference is
//! scoping. `render` gets an isolated scope seeded only with the request
//! globals and explicitly passed arguments, `include` shares the caller's
//! scope, and `section` shares it plus a `section` object built from the
//! partial's schema and any per-template setting overrides.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use crate::template::ast::{Node, RenderState, TagRender, render_nodes};
use crate::template::error::TemplateError;
use crate::template::expr::{Operand, parse_operand, split_top};
use crate::template::lexer::TokenStream;
use crate::template::parser::{Parser, TagFactory};
use crate::template::value::{JsonMap, Scopes};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncludeMode {
    Section,
    Render,
    Include,
}

pub struct IncludeTagFactory {
    mode: IncludeMode,
}

impl IncludeTagFactory {
    pub fn new(mode: IncludeMode) -> Self {
        Self { mode }
    }
}

impl TagFactory for IncludeTagFactory {
    fn parse(
        &self,
        args: &str,
        _stream: &mut TokenStream,
        parser: &Parser,
    ) -> Result<Node, TemplateError> {
        let mut parts = split_top(args, ',').into_iter();
        let name = match parts.next().map(|part| parse_operand(&part)) {
            Some(Ok(Operand::Literal(Value::String(name)))) => name,
            _ => {
                return Err(TemplateError::parse(
                    "inclusion tag expects a quoted sub-template name",
                ));
            }
        };

        let mut passed = Vec::new();
        for part in parts {
            let Some((key, value)) = part.split_once(':') else {
                return Err(TemplateError::parse(format!(
                    "malformed argument `{part}`, expected `key: value`"
                )));
            };
            passed.push((key.trim().to_string(), parse_operand(value.trim())?));
        }

        let parsed = match self.mode {
            IncludeMode::Section => parser.parse_section_partial(&name)?,
            _ => parser.parse_partial(&name)?.map(|nodes| (nodes, None)),
        };
        let Some((nodes, schema)) = parsed else {
            // Missing partials degrade to a marker instead of failing the page.
            return Ok(Node::Text(format!("<!-- Section '{name}' not found -->")));
        };

        let defaults = schema.map(|schema| schema.settings_defaults()).unwrap_or_default();
        Ok(Node::Custom(Arc::new(SubTemplateNode {
            name,
            mode: self.mode,
            nodes,
            defaults,
            passed,
        })))
    }
}

struct SubTemplateNode {
    name: String,
    mode: IncludeMode,
    nodes: Vec<Node>,
    /// Schema setting defaults; only populated for sections.
    defaults: JsonMap,
    passed: Vec<(String, Operand)>,
}

impl SubTemplateNode {
    fn passed_frame(&self, scopes: &Scopes) -> JsonMap {
        let mut frame = Map::new();
        for (key, operand) in &self.passed {
            frame.insert(key.clone(), operand.eval(scopes));
        }
        frame
    }

    fn section_object(&self, state: &RenderState) -> Value {
        let config_path: Vec<String> = [
            "template_config",
            "sections",
            self.name.as_str(),
            "settings",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let mut settings = self.defaults.clone();
        if let Value::Object(overrides) = state.scopes.lookup(&config_path) {
            settings.extend(overrides);
        }
        let blocks_path: Vec<String> =
            ["template_config", "sections", self.name.as_str(), "blocks"]
                .iter()
                .map(|s| s.to_string())
                .collect();
        let blocks = match state.scopes.lookup(&blocks_path) {
            Value::Array(blocks) => Value::Array(blocks),
            _ => Value::Array(Vec::new()),
        };
        json!({ "id": self.name, "settings": settings, "blocks": blocks })
    }
}

impl TagRender for SubTemplateNode {
    fn render(&self, state: &mut RenderState, out: &mut String) -> Result<(), TemplateError> {
        match self.mode {
            IncludeMode::Section => {
                let mut frame = self.passed_frame(&state.scopes);
                frame.insert("section".to_string(), self.section_object(state));
                state.sections.push(self.name.clone());
                state.scopes.push(frame);
                let result = render_nodes(&self.nodes, state, out);
                state.scopes.pop();
                state.sections.pop();
                result
            }
            IncludeMode::Render => {
                let frame = self.passed_frame(&state.scopes);
                let isolated = Scopes::new(state.scopes.root().clone());
                let saved = std::mem::replace(&mut state.scopes, isolated);
                state.scopes.push(frame);
                let result = render_nodes(&self.nodes, state, out);
                state.scopes = saved;
                result
            }
            IncludeMode::Include => {
                state.scopes.push(self.passed_frame(&state.scopes));
                let result = render_nodes(&self.nodes, state, out);
                state.scopes.pop();
                result
            }
        }
    }
}
