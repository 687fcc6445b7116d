//! `{% schema %}` blocks.
//!
//! The JSON body never reaches the output; it is parsed (with repair) and
//! recorded on the compile run so section inclusion can pick up the declared
//! setting defaults.

use crate::template::ast::Node;
use crate::template::error::TemplateError;
use crate::template::lexer::{Token, TokenStream};
use crate::template::parser::{Parser, TagFactory};
use crate::template::schema::parse_schema;

pub struct SchemaTagFactory;

impl TagFactory for SchemaTagFactory {
    fn parse(
        &self,
        _args: &str,
        stream: &mut TokenStream,
        parser: &Parser,
    ) -> Result<Node, TemplateError> {
        let body = stream.take_block("schema")?;
        let raw: String = body.iter().map(Token::to_source).collect();
        let schema = parse_schema(&raw)?;
        parser.capture_schema(schema);
        Ok(Node::Text(String::new()))
    }
}
