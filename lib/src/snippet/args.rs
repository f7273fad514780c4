use crate::snippet::SnippetError;

/// The arguments of a `snippet` tag: a single file path, relative to the
/// document containing the tag, optionally wrapped in `'` or `"` quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetArgs {
    pub file_ref: String,
}

impl SnippetArgs {
    pub fn parse(markup: &str) -> Result<Self, SnippetError> {
        let invalid = |reason| SnippetError::InvalidArguments {
            markup: markup.to_string(),
            reason,
        };

        let input = markup.trim();
        let (file_ref, rest) = match input.chars().next() {
            None => return Err(invalid("missing file path")),
            Some(q @ ('"' | '\'')) => {
                let body = &input[1..];
                let end = body.find(q).ok_or_else(|| invalid("unterminated quote"))?;
                (&body[..end], &body[end + 1..])
            }
            Some(_) => match input.find(char::is_whitespace) {
                Some(i) => (&input[..i], &input[i..]),
                None => (input, ""),
            },
        };

        if file_ref.is_empty() {
            return Err(invalid("empty file path"));
        }

        if !rest.trim().is_empty() {
            return Err(invalid("unexpected argument after file path"));
        }

        Ok(SnippetArgs { file_ref: file_ref.to_string() })
    }
}
