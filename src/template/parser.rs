//! Token-to-tree parser.
//!
//! Core control flow (`if`, `for`, `assign`, `comment`) is built in; every
//! other block construct comes from the pluggable [`TagRegistry`]. Named
//! sub-templates are inlined here, at compile time, so the executable form
//! is self-contained.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::Arc;

use super::ast::Node;
use super::error::TemplateError;
use super::expr::{parse_condition, parse_expr};
use super::filters::FilterSet;
use super::lexer::{Token, TokenStream, tokenize};
use super::schema::SectionSchema;

/// Sub-template nesting limit; breaks include cycles at compile time.
const MAX_PARTIAL_DEPTH: usize = 8;

/// Compile hook for one registered tag. The factory owns consumption of the
/// tag's body tokens, including nesting rules.
pub trait TagFactory: Send + Sync {
    fn parse(
        &self,
        args: &str,
        stream: &mut TokenStream,
        parser: &Parser,
    ) -> Result<Node, TemplateError>;
}

/// Named tag table, immutable once the compiler is built.
#[derive(Default)]
pub struct TagRegistry {
    tags: HashMap<String, Arc<dyn TagFactory>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: Arc<dyn TagFactory>) {
        self.tags.insert(name.into(), factory);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn TagFactory>> {
        self.tags.get(name)
    }
}

/// One compile run. Holds the shared registry plus the partial sources this
/// template may inline.
pub struct Parser<'a> {
    registry: &'a TagRegistry,
    filters: &'a FilterSet,
    partials: &'a HashMap<String, String>,
    partial_depth: Cell<usize>,
    captured_schema: RefCell<Option<SectionSchema>>,
}

impl<'a> Parser<'a> {
    pub fn new(
        registry: &'a TagRegistry,
        filters: &'a FilterSet,
        partials: &'a HashMap<String, String>,
    ) -> Self {
        Self {
            registry,
            filters,
            partials,
            partial_depth: Cell::new(0),
            captured_schema: RefCell::new(None),
        }
    }

    pub fn filters(&self) -> &FilterSet {
        self.filters
    }

    pub fn parse_source(&self, source: &str) -> Result<Vec<Node>, TemplateError> {
        let mut stream = TokenStream::new(tokenize(source)?);
        let (nodes, terminator) = self.parse_until(&mut stream, &[])?;
        if let Some((name, _)) = terminator {
            return Err(TemplateError::parse(format!("unexpected `{name}`")));
        }
        Ok(nodes)
    }

    /// Parses until one of `terminators` (consumed) or end of input.
    pub fn parse_until(
        &self,
        stream: &mut TokenStream,
        terminators: &[&str],
    ) -> Result<(Vec<Node>, Option<(String, String)>), TemplateError> {
        let mut nodes = Vec::new();
        while let Some(token) = stream.next() {
            match token {
                Token::Text(text) => nodes.push(Node::Text(text)),
                Token::Output(expr) => {
                    nodes.push(Node::Output(parse_expr(&expr, self.filters)?));
                }
                Token::Tag { name, args } => {
                    if terminators.contains(&name.as_str()) {
                        return Ok((nodes, Some((name, args))));
                    }
                    nodes.push(self.parse_tag(&name, &args, stream)?);
                }
            }
        }
        Ok((nodes, None))
    }

    fn parse_tag(
        &self,
        name: &str,
        args: &str,
        stream: &mut TokenStream,
    ) -> Result<Node, TemplateError> {
        match name {
            "if" | "unless" => self.parse_if(name, args, stream),
            "for" => self.parse_for(args, stream),
            "assign" => self.parse_assign(args),
            "comment" => {
                stream.take_block("comment")?;
                Ok(Node::Text(String::new()))
            }
            other => match self.registry.get(other) {
                Some(factory) => factory.parse(args, stream, self),
                None => Err(TemplateError::parse(format!("unknown tag `{other}`"))),
            },
        }
    }

    fn parse_if(
        &self,
        name: &str,
        args: &str,
        stream: &mut TokenStream,
    ) -> Result<Node, TemplateError> {
        let end: &str = if name == "unless" { "endunless" } else { "endif" };
        let mut branches = Vec::new();
        let mut otherwise = None;
        let mut condition = parse_condition(args, self.filters)?;
        loop {
            let (body, terminator) = self.parse_until(stream, &["elsif", "else", end])?;
            match terminator {
                Some((tag, next_args)) if tag == "elsif" => {
                    branches.push((condition, body));
                    condition = parse_condition(&next_args, self.filters)?;
                }
                Some((tag, _)) if tag == "else" => {
                    branches.push((condition, body));
                    let (else_body, terminator) = self.parse_until(stream, &[end])?;
                    if terminator.is_none() {
                        return Err(TemplateError::parse(format!("`{name}` not closed")));
                    }
                    otherwise = Some(else_body);
                    break;
                }
                Some(_) => {
                    branches.push((condition, body));
                    break;
                }
                None => return Err(TemplateError::parse(format!("`{name}` not closed"))),
            }
        }
        if name == "unless" {
            // unless x == if x (empty) else (body)
            let (first_condition, body) = branches.remove(0);
            return Ok(Node::If {
                branches: vec![(first_condition, otherwise.unwrap_or_default())],
                otherwise: Some(body),
            });
        }
        Ok(Node::If {
            branches,
            otherwise,
        })
    }

    fn parse_for(&self, args: &str, stream: &mut TokenStream) -> Result<Node, TemplateError> {
        let Some((var, rest)) = args.split_once(" in ") else {
            return Err(TemplateError::parse(format!(
                "malformed for tag `{args}`, expected `item in collection`"
            )));
        };
        let iterable = parse_expr(rest.trim(), self.filters)?;
        let (body, terminator) = self.parse_until(stream, &["endfor"])?;
        if terminator.is_none() {
            return Err(TemplateError::parse("`for` not closed"));
        }
        Ok(Node::For {
            var: var.trim().to_string(),
            iterable,
            body,
        })
    }

    fn parse_assign(&self, args: &str) -> Result<Node, TemplateError> {
        let Some((target, value)) = args.split_once('=') else {
            return Err(TemplateError::parse(format!(
                "malformed assign `{args}`, expected `name = value`"
            )));
        };
        Ok(Node::Assign {
            target: target.trim().to_string(),
            value: parse_expr(value.trim(), self.filters)?,
        })
    }

    pub fn partial_source(&self, name: &str) -> Option<&str> {
        self.partials.get(name).map(String::as_str)
    }

    /// Compiles a named partial for inlining. `Ok(None)` means the partial is
    /// unknown; callers degrade to a placeholder comment.
    pub fn parse_partial(&self, name: &str) -> Result<Option<Vec<Node>>, TemplateError> {
        let Some(source) = self.partials.get(name) else {
            return Ok(None);
        };
        let depth = self.partial_depth.get();
        if depth >= MAX_PARTIAL_DEPTH {
            return Err(TemplateError::parse(format!(
                "sub-template nesting exceeds {MAX_PARTIAL_DEPTH} at `{name}`"
            )));
        }
        self.partial_depth.set(depth + 1);
        let result = self.parse_source(source);
        self.partial_depth.set(depth);
        result.map(Some)
    }

    /// Like [`Parser::parse_partial`] but also returns the section's schema
    /// when the partial declares one.
    pub fn parse_section_partial(
        &self,
        name: &str,
    ) -> Result<Option<(Vec<Node>, Option<SectionSchema>)>, TemplateError> {
        let outer = self.captured_schema.replace(None);
        let parsed = self.parse_partial(name);
        let schema = self.captured_schema.replace(outer);
        parsed.map(|nodes| nodes.map(|nodes| (nodes, schema)))
    }

    /// Records the schema declared by the block currently being parsed.
    pub(super) fn capture_schema(&self, schema: SectionSchema) {
        *self.captured_schema.borrow_mut() = Some(schema);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::ast::{RenderState, render_nodes};
    use serde_json::{Value, json};

    fn render(source: &str, context: Value) -> String {
        let registry = TagRegistry::new();
        let filters = FilterSet::storefront();
        let partials = HashMap::new();
        let parser = Parser::new(&registry, &filters, &partials);
        let nodes = parser.parse_source(source).expect("parse");
        let Value::Object(root) = context else {
            panic!("context must be an object")
        };
        let mut state = RenderState::new(root, &filters);
        let mut out = String::new();
        render_nodes(&nodes, &mut state, &mut out).expect("render");
        out
    }

    #[test]
    fn if_elsif_else_picks_first_true_branch() {
        let source = "{% if n > 10 %}big{% elsif n > 5 %}mid{% else %}small{% endif %}";
        assert_eq!(render(source, json!({ "n": 20 })), "big");
        assert_eq!(render(source, json!({ "n": 7 })), "mid");
        assert_eq!(render(source, json!({ "n": 1 })), "small");
    }

    #[test]
    fn unless_inverts_the_condition() {
        let source = "{% unless sold_out %}buy{% endunless %}";
        assert_eq!(render(source, json!({ "sold_out": false })), "buy");
        assert_eq!(render(source, json!({ "sold_out": true })), "");
    }

    #[test]
    fn nested_for_loops_render() {
        let source = "{% for row in grid %}{% for cell in row %}{{ cell }}{% endfor %};{% endfor %}";
        assert_eq!(
            render(source, json!({ "grid": [[1, 2], [3]] })),
            "12;3;"
        );
    }

    #[test]
    fn comment_blocks_produce_no_output() {
        let source = "a{% comment %}{{ hidden }} {% if x %}{% endif %}{% endcomment %}b";
        assert_eq!(render(source, json!({})), "ab");
    }

    #[test]
    fn unknown_tag_is_a_parse_error() {
        let registry = TagRegistry::new();
        let filters = FilterSet::storefront();
        let partials = HashMap::new();
        let parser = Parser::new(&registry, &filters, &partials);
        let err = parser
            .parse_source("{% widget %}")
            .expect_err("must fail");
        assert!(matches!(err, TemplateError::Parse(_)));
    }

    #[test]
    fn unclosed_if_is_a_parse_error() {
        let registry = TagRegistry::new();
        let filters = FilterSet::storefront();
        let partials = HashMap::new();
        let parser = Parser::new(&registry, &filters, &partials);
        assert!(parser.parse_source("{% if x %}body").is_err());
    }

    #[test]
    fn partial_cycles_fail_at_compile_time() {
        let registry = TagRegistry::new();
        let filters = FilterSet::storefront();
        let mut partials = HashMap::new();
        partials.insert("a".to_string(), "loop".to_string());
        let parser = Parser::new(&registry, &filters, &partials);
        // Drive the depth guard directly; tag factories call parse_partial
        // recursively in exactly this way.
        for _ in 0..MAX_PARTIAL_DEPTH {
            let depth = parser.partial_depth.get();
            parser.partial_depth.set(depth + 1);
        }
        assert!(parser.parse_partial("a").is_err());
    }
}
