//! Template tokenizer.
//!
//! Splits source into literal text, `{{ output }}` expressions and
//! `{% tag %}` markers. Block tags consume their body tokens themselves
//! through [`TokenStream`], which lets every tag own its nesting rules.

use super::error::TemplateError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Text(String),
    /// Inner expression text of `{{ ... }}`.
    Output(String),
    /// Tag name plus the raw argument text after it.
    Tag { name: String, args: String },
}

impl Token {
    /// Reconstructs the source form of the token. Used by tags that
    /// capture raw bodies.
    pub fn to_source(&self) -> String {
        match self {
            Token::Text(text) => text.clone(),
            Token::Output(expr) => format!("{{{{ {expr} }}}}"),
            Token::Tag { name, args } if args.is_empty() => format!("{{% {name} %}}"),
            Token::Tag { name, args } => format!("{{% {name} {args} %}}"),
        }
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = source;

    while !rest.is_empty() {
        let output_at = rest.find("{{");
        let tag_at = rest.find("{%");
        let next = match (output_at, tag_at) {
            (Some(o), Some(t)) => Some(o.min(t)),
            (Some(o), None) => Some(o),
            (None, Some(t)) => Some(t),
            (None, None) => None,
        };

        let Some(at) = next else {
            tokens.push(Token::Text(rest.to_string()));
            break;
        };
        if at > 0 {
            tokens.push(Token::Text(rest[..at].to_string()));
        }

        let is_output = rest[at..].starts_with("{{");
        let closer = if is_output { "}}" } else { "%}" };
        let inner_start = at + 2;
        let Some(close_rel) = rest[inner_start..].find(closer) else {
            let opener = if is_output { "{{" } else { "{%" };
            return Err(TemplateError::parse(format!("unclosed `{opener}`")));
        };
        let inner = rest[inner_start..inner_start + close_rel]
            .trim()
            .trim_matches('-')
            .trim();

        if is_output {
            tokens.push(Token::Output(inner.to_string()));
        } else {
            let (name, args) = match inner.split_once(char::is_whitespace) {
                Some((name, args)) => (name.to_string(), args.trim().to_string()),
                None => (inner.to_string(), String::new()),
            };
            if name.is_empty() {
                return Err(TemplateError::parse("empty tag"));
            }
            tokens.push(Token::Tag { name, args });
        }
        rest = &rest[inner_start + close_rel + 2..];
    }

    Ok(tokens)
}

/// Forward-only cursor over a token list.
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    /// Consumes tokens up to the matching `end{name}`, tracking the depth of
    /// nested same-named tags. The end tag itself is consumed and dropped.
    pub fn take_block(&mut self, name: &str) -> Result<Vec<Token>, TemplateError> {
        let end = format!("end{name}");
        let mut depth = 0usize;
        let mut body = Vec::new();
        while let Some(token) = self.next() {
            if let Token::Tag { name: tag, .. } = &token {
                if tag == name {
                    depth += 1;
                } else if tag == &end {
                    if depth == 0 {
                        return Ok(body);
                    }
                    depth -= 1;
                }
            }
            body.push(token);
        }
        Err(TemplateError::parse(format!("tag `{name}` not closed")))
    }
}
