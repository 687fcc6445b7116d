//! The template compiler facade.
//!
//! One [`TemplateCompiler`] is built at startup and shared by every request;
//! it holds only the tag registry and filter set, both immutable, so
//! concurrent multi-tenant renders can never observe each other. Everything
//! tenant-specific flows through the render context.

use std::collections::HashMap;

use crate::template::ast::{Node, RenderState, render_nodes};
use crate::template::assets::AssetBundle;
use crate::template::error::TemplateError;
use crate::template::filters::FilterSet;
use crate::template::parser::{Parser, TagRegistry};
use crate::template::tags::storefront_registry;
use crate::template::value::JsonMap;

/// Executable form of one template. Self-contained: all referenced
/// sub-templates were inlined at compile time.
#[derive(Debug)]
pub struct CompiledTemplate {
    nodes: Vec<Node>,
    /// Page-template configuration (section settings, static linklists) when
    /// the template was synthesized from a JSON page definition.
    config: Option<serde_json::Value>,
}

impl CompiledTemplate {
    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = Some(config);
        self
    }

    pub fn config(&self) -> Option<&serde_json::Value> {
        self.config.as_ref()
    }
}

/// Result of executing a compiled template.
#[derive(Debug)]
pub struct RenderOutput {
    pub html: String,
    pub assets: AssetBundle,
}

pub struct TemplateCompiler {
    registry: TagRegistry,
    filters: FilterSet,
}

impl TemplateCompiler {
    /// Compiler with the storefront tag and filter set.
    pub fn storefront() -> Self {
        Self::new(storefront_registry(), FilterSet::storefront())
    }

    pub fn new(registry: TagRegistry, filters: FilterSet) -> Self {
        Self { registry, filters }
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    /// Compiles `source`, inlining any partial referenced by inclusion tags
    /// from `partials` (name to source).
    pub fn compile(
        &self,
        source: &str,
        partials: &HashMap<String, String>,
    ) -> Result<CompiledTemplate, TemplateError> {
        let parser = Parser::new(&self.registry, &self.filters, partials);
        let nodes = parser.parse_source(source)?;
        Ok(CompiledTemplate {
            nodes,
            config: None,
        })
    }

    /// Executes a compiled template against a context. No partial output:
    /// the first failure aborts the whole render.
    pub fn render(
        &self,
        template: &CompiledTemplate,
        context: JsonMap,
    ) -> Result<RenderOutput, TemplateError> {
        let mut state = RenderState::new(context, &self.filters);
        let mut html = String::new();
        render_nodes(&template.nodes, &mut state, &mut html)?;
        Ok(RenderOutput {
            html,
            assets: state.assets,
        })
    }
}
