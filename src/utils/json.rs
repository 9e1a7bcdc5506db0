//! Recovering JSON from free-form model output
//!
//! Models asked for JSON frequently wrap it in prose or code fences. The
//! extractor first tries the whole text, then walks backward over balanced
//! `{...}` / `[...]` candidates, right-most first, until one parses.

use serde::de::DeserializeOwned;

use crate::error::LlmError;

/// A parsed value together with the exact text it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedJson<T> {
    pub value: T,
    pub json: String,
}

/// Parse `text`, or the right-most balanced fragment of it that `parser`
/// accepts.
///
/// When nothing parses, the error from parsing the whole text is returned,
/// never an error from one of the fragments.
pub fn extract_and_parse_json<T, E, F>(text: &str, parser: F) -> Result<ParsedJson<T>, E>
where
    F: Fn(&str) -> Result<T, E>,
{
    let original = match parser(text) {
        Ok(value) => {
            return Ok(ParsedJson {
                value,
                json: text.to_string(),
            });
        }
        Err(err) => err,
    };

    let bytes = text.as_bytes();
    let mut end = bytes.len();
    while let Some(close) = bytes[..end].iter().rposition(|&b| b == b'}' || b == b']') {
        let open_byte = if bytes[close] == b'}' { b'{' } else { b'[' };
        let Some(open) = matching_opener(&bytes[..close], open_byte, bytes[close]) else {
            end = close;
            continue;
        };

        // Both ends are ASCII, so the slice falls on char boundaries.
        let candidate = &text[open..=close];
        if let Ok(value) = parser(candidate) {
            tracing::trace!("Recovered JSON fragment at {}..={}", open, close);
            return Ok(ParsedJson {
                value,
                json: candidate.to_string(),
            });
        }
        end = open;
    }

    Err(original)
}

/// Position of the opener matching a closer located just past `prefix`.
///
/// Walks backward: every further closer of the same kind must be matched
/// first, so the first opener seen at depth zero is the match.
fn matching_opener(prefix: &[u8], open: u8, close: u8) -> Option<usize> {
    let mut depth = 0usize;
    for (i, &b) in prefix.iter().enumerate().rev() {
        if b == close {
            depth += 1;
        } else if b == open {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
        }
    }
    None
}

/// [`extract_and_parse_json`] with `serde_json` as the parser.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<ParsedJson<T>, LlmError> {
    extract_and_parse_json(text, |candidate| {
        serde_json::from_str::<T>(candidate).map_err(LlmError::from)
    })
}
