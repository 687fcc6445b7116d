//! Storefront custom tags.

mod capture;
mod form;
mod include;
mod paginate;
mod schema;

use std::sync::Arc;

use crate::template::parser::TagRegistry;

pub use include::IncludeMode;

/// Tag table used by the storefront compiler: section inclusion, schema
/// blocks, asset capture, pagination and forms.
pub fn storefront_registry() -> TagRegistry {
    let mut registry = TagRegistry::new();
    registry.register(
        "section",
        Arc::new(include::IncludeTagFactory::new(IncludeMode::Section)),
    );
    registry.register(
        "render",
        Arc::new(include::IncludeTagFactory::new(IncludeMode::Render)),
    );
    registry.register(
        "include",
        Arc::new(include::IncludeTagFactory::new(IncludeMode::Include)),
    );
    registry.register("schema", Arc::new(schema::SchemaTagFactory));
    registry.register("style", Arc::new(capture::CaptureTagFactory::css("style")));
    registry.register(
        "stylesheet",
        Arc::new(capture::CaptureTagFactory::css("stylesheet")),
    );
    registry.register("script", Arc::new(capture::CaptureTagFactory::js("script")));
    registry.register(
        "javascript",
        Arc::new(capture::CaptureTagFactory::js("javascript")),
    );
    registry.register("paginate", Arc::new(paginate::PaginateTagFactory));
    registry.register("form", Arc::new(form::FormTagFactory));
    registry
}
