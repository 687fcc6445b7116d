use thiserror::Error;

/// Failures raised while compiling or executing a template.
///
/// Compile and execute failures map onto the render error class upstream;
/// schema failures map onto validation since they indicate malformed
/// theme JSON rather than broken markup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template parse failed: {0}")]
    Parse(String),

    #[error("template render failed: {0}")]
    Render(String),

    #[error("section schema invalid: {0}")]
    Schema(String),
}

impl TemplateError {
    pub fn parse(message: impl Into<String>) -> Self {
        TemplateError::Parse(message.into())
    }

    pub fn render(message: impl Into<String>) -> Self {
        TemplateError::Render(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        TemplateError::Schema(message.into())
    }
}
