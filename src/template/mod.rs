//! Liquid-style template compiler.
//!
//! `compile` turns source text plus its partials into a self-contained
//! executable tree; `render` runs that tree against a JSON context and
//! yields HTML plus the captured asset bundle. The compiler itself carries
//! no tenant state.

mod assets;
mod ast;
mod engine;
mod error;
mod expr;
mod filters;
mod lexer;
mod parser;
mod schema;
mod tags;
mod value;

pub use assets::{AssetBundle, AssetKind};
pub use ast::{Node, RenderState, TagRender, render_nodes};
pub use engine::{CompiledTemplate, RenderOutput, TemplateCompiler};
pub use error::TemplateError;
pub use expr::{Expr, Operand};
pub use filters::{FilterContext, FilterFn, FilterSet, MoneyFormat};
pub use lexer::{Token, TokenStream};
pub use parser::{Parser, TagFactory, TagRegistry};
pub use schema::{SectionSchema, SettingField, parse_schema};
pub use value::{JsonMap, Scopes};
