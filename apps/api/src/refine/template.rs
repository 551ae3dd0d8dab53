//! Prompt templates with a fixed, per-template set of named placeholders.
//!
//! Templates are parsed once at construction. Substituted values are never
//! re-scanned, so braces inside resume text are passed through untouched.

use std::fmt;

use crate::errors::ConfigurationError;

/// Which step of the refine chain a template drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateId {
    Initial,
    Refine,
}

impl TemplateId {
    /// Placeholders this template may reference.
    pub fn placeholders(&self) -> &'static [&'static str] {
        match self {
            TemplateId::Initial => &["text"],
            TemplateId::Refine => &["existing_answer", "text"],
        }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateId::Initial => f.write_str("initial"),
            TemplateId::Refine => f.write_str("refine"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Literal(String),
    Placeholder(&'static str),
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    id: TemplateId,
    pieces: Vec<Piece>,
}

impl PromptTemplate {
    pub fn parse(id: TemplateId, source: &str) -> Result<Self, ConfigurationError> {
        let mut pieces = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' if matches!(chars.peek(), Some((_, '{'))) => {
                    chars.next();
                    literal.push('{');
                }
                '}' if matches!(chars.peek(), Some((_, '}'))) => {
                    chars.next();
                    literal.push('}');
                }
                '}' => {
                    return Err(ConfigurationError::UnmatchedClosingBrace {
                        template: id,
                        position: pos,
                    });
                }
                '{' => {
                    let rest = &source[pos + 1..];
                    let Some(close) = rest.find('}') else {
                        return Err(ConfigurationError::UnterminatedPlaceholder {
                            template: id,
                            position: pos,
                        });
                    };
                    let name = &rest[..close];
                    let known = id
                        .placeholders()
                        .iter()
                        .find(|p| **p == name)
                        .ok_or_else(|| ConfigurationError::UnknownPlaceholder {
                            template: id,
                            placeholder: name.to_string(),
                        })?;

                    if !literal.is_empty() {
                        pieces.push(Piece::Literal(std::mem::take(&mut literal)));
                    }
                    pieces.push(Piece::Placeholder(*known));

                    // Skip the name and the closing brace.
                    while let Some((p, _)) = chars.peek() {
                        if *p > pos + 1 + close {
                            break;
                        }
                        chars.next();
                    }
                }
                _ => literal.push(c),
            }
        }

        if !literal.is_empty() {
            pieces.push(Piece::Literal(literal));
        }

        Ok(Self { id, pieces })
    }

    /// Placeholders the template text actually uses, in order of appearance.
    pub fn used_placeholders(&self) -> Vec<&'static str> {
        let mut used: Vec<&'static str> = Vec::new();
        for piece in &self.pieces {
            if let Piece::Placeholder(name) = piece {
                if !used.contains(name) {
                    used.push(*name);
                }
            }
        }
        used
    }

    /// Substitutes named values. Every placeholder the template uses must be
    /// supplied; this is checked before any output is built.
    pub fn render(&self, values: &[(&str, &str)]) -> Result<String, ConfigurationError> {
        let lookup = |name: &str| {
            values
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        };

        if let Some(missing) = self
            .used_placeholders()
            .into_iter()
            .find(|name| lookup(*name).is_none())
        {
            return Err(ConfigurationError::MissingValue {
                template: self.id,
                placeholder: missing.to_string(),
            });
        }

        let mut out = String::new();
        for piece in &self.pieces {
            match piece {
                Piece::Literal(text) => out.push_str(text),
                Piece::Placeholder(name) => out.push_str(lookup(*name).unwrap_or_default()),
            }
        }
        Ok(out)
    }
}
