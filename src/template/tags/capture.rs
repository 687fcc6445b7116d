//! Asset capture tags: `style`/`stylesheet` and `script`/`javascript`.
//!
//! The body renders like any other template fragment but the result is
//! diverted into the asset bundle instead of the document, keyed by the
//! enclosing section and a digest of the rendered content.

use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::template::assets::AssetKind;
use crate::template::ast::{Node, RenderState, TagRender, render_nodes};
use crate::template::error::TemplateError;
use crate::template::lexer::TokenStream;
use crate::template::parser::{Parser, TagFactory};

pub struct CaptureTagFactory {
    kind: AssetKind,
    tag_name: &'static str,
}

impl CaptureTagFactory {
    pub fn css(tag_name: &'static str) -> Self {
        Self {
            kind: AssetKind::Css,
            tag_name,
        }
    }

    pub fn js(tag_name: &'static str) -> Self {
        Self {
            kind: AssetKind::Js,
            tag_name,
        }
    }
}

impl TagFactory for CaptureTagFactory {
    fn parse(
        &self,
        _args: &str,
        stream: &mut TokenStream,
        parser: &Parser,
    ) -> Result<Node, TemplateError> {
        let body = stream.take_block(self.tag_name)?;
        let mut body_stream = TokenStream::new(body);
        let (nodes, terminator) = parser.parse_until(&mut body_stream, &[])?;
        if let Some((name, _)) = terminator {
            return Err(TemplateError::parse(format!("unexpected `{name}`")));
        }
        Ok(Node::Custom(Arc::new(CaptureNode {
            kind: self.kind,
            nodes,
        })))
    }
}

struct CaptureNode {
    kind: AssetKind,
    nodes: Vec<Node>,
}

impl TagRender for CaptureNode {
    fn render(&self, state: &mut RenderState, _out: &mut String) -> Result<(), TemplateError> {
        let mut captured = String::new();
        render_nodes(&self.nodes, state, &mut captured)?;
        let content = captured.trim().to_string();
        if content.is_empty() {
            return Ok(());
        }
        let key = format!("{}-{}", state.asset_key(), digest(&content));
        state.assets.add(self.kind, key, content);
        Ok(())
    }
}

fn digest(content: &str) -> String {
    let hash = Sha256::digest(content.as_bytes());
    // Eight hex chars are plenty for de-duplication keys.
    hash.iter().take(4).map(|byte| format!("{byte:02x}")).collect()
}
