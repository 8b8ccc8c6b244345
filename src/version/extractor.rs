//! Version extraction from raw release and tag names
//!
//! An [`Extraction`] pairs a regular expression with a result template. The
//! template may reference capture groups as `$1`, `${1}`, `$name` or
//! `${name}`; `$$` is a literal `$`.

use regex::{Captures, Regex};

use crate::version::error::ResolveError;

/// Compiled extraction pattern with its result template
#[derive(Debug, Clone)]
pub struct Extraction {
    pattern: Regex,
    template: String,
}

impl Extraction {
    /// Compile an extraction pattern
    pub fn new(pattern: &str, template: &str) -> Result<Self, ResolveError> {
        let regex = Regex::new(pattern).map_err(|source| ResolveError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        Ok(Self {
            pattern: regex,
            template: template.to_string(),
        })
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Extract a normalized version from `input`.
    ///
    /// Returns `None` when the pattern does not match, or when the template
    /// references a group the pattern does not define. A group that exists
    /// but did not take part in the match expands to an empty string.
    pub fn extract(&self, input: &str) -> Option<String> {
        let captures = self.pattern.captures(input)?;
        expand(&self.pattern, &self.template, &captures)
    }
}

/// A back-reference in a result template
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Index(usize),
    Name(&'a str),
}

fn expand(pattern: &Regex, template: &str, captures: &Captures<'_>) -> Option<String> {
    let mut result = String::with_capacity(template.len());
    for segment in segments(template) {
        let group = match segment {
            Segment::Literal(text) => {
                result.push_str(text);
                continue;
            }
            Segment::Index(i) if i < pattern.captures_len() => captures.get(i),
            Segment::Name(name) if pattern.capture_names().any(|n| n == Some(name)) => {
                captures.name(name)
            }
            _ => return None,
        };
        result.push_str(group.map_or("", |m| m.as_str()));
    }
    Some(result)
}

/// Split a template into literal text and group references
fn segments(template: &str) -> Vec<Segment<'_>> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(pos) = rest.find('$') {
        if pos > 0 {
            segments.push(Segment::Literal(&rest[..pos]));
        }
        let after = &rest[pos + 1..];

        if let Some(stripped) = after.strip_prefix('$') {
            segments.push(Segment::Literal("$"));
            rest = stripped;
            continue;
        }

        let (reference, remainder) = match after.strip_prefix('{') {
            Some(braced) => match braced.find('}') {
                Some(end) => (&braced[..end], &braced[end + 1..]),
                None => ("", after),
            },
            None => {
                let end = after
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                    .unwrap_or(after.len());
                (&after[..end], &after[end..])
            }
        };

        if reference.is_empty() {
            // Lone `$` is kept as-is
            segments.push(Segment::Literal("$"));
        } else if let Ok(index) = reference.parse::<usize>() {
            segments.push(Segment::Index(index));
        } else {
            segments.push(Segment::Name(reference));
        }
        rest = remainder;
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    segments
}
