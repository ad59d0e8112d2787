use std::sync::OnceLock;

use regex::Regex;

/// One element of a rule template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    /// Literal SQL text, emitted verbatim
    Text(String),
    /// Reference to the child at this 0-based position
    Child(usize),
}

/// SQL assembly template: literal text interleaved with child references.
///
/// Templates are written as text with 1-based `{n}` references:
///
/// ```text
/// (case when {1} is null then 1 else 0 end)
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pieces: Vec<Piece>,
}

fn reference_regex() -> &'static Regex {
    static REFERENCE_REGEX: OnceLock<Regex> = OnceLock::new();
    REFERENCE_REGEX.get_or_init(|| Regex::new(r"\{(\d+)\}").expect("valid child reference regex"))
}

impl Template {
    /// Parse a template for a rule with `arity` children
    pub fn parse(text: &str, arity: usize) -> Result<Template, String> {
        let mut pieces = Vec::new();
        let mut last = 0;
        for captures in reference_regex().captures_iter(text) {
            let Some(whole) = captures.get(0) else {
                continue;
            };
            if whole.start() > last {
                pieces.push(Piece::Text(text[last..whole.start()].to_string()));
            }
            let index: usize = captures[1]
                .parse()
                .map_err(|_| format!("reference {} is not a valid index", whole.as_str()))?;
            if index == 0 || index > arity {
                return Err(format!(
                    "reference {} out of range for {} operand(s) in `{}`",
                    whole.as_str(),
                    arity,
                    text
                ));
            }
            pieces.push(Piece::Child(index - 1));
            last = whole.end();
        }
        if last < text.len() {
            pieces.push(Piece::Text(text[last..].to_string()));
        }
        Ok(Template { pieces })
    }

    pub fn from_pieces(pieces: Vec<Piece>) -> Template {
        Template { pieces }
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Rewrite child references, sending child `i` to `mapping[i]`
    pub fn remap(&self, mapping: &[usize]) -> Template {
        let pieces = self
            .pieces
            .iter()
            .map(|piece| match piece {
                Piece::Child(i) => Piece::Child(mapping.get(*i).copied().unwrap_or(*i)),
                Piece::Text(text) => Piece::Text(text.clone()),
            })
            .collect();
        Template { pieces }
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for piece in &self.pieces {
            match piece {
                Piece::Text(text) => f.write_str(text)?,
                Piece::Child(i) => write!(f, "{{{}}}", i + 1)?,
            }
        }
        Ok(())
    }
}
