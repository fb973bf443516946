//! JSON extraction for LLM responses.
//!
//! Models wrap structured output in prose, markdown fences, or both. The
//! functions here locate the first well-formed JSON object or array in such
//! text.
//!
//! # Extraction order
//!
//! 1. Body of a ```` ```json ```` (or bare ```` ``` ````) fence, when it parses
//! 2. The first balanced `{...}` or `[...]` span, scanning left to right and
//!    skipping spans that do not parse (e.g. `[sic]` in prose)
//! 3. Otherwise the content is reported as truncated (unclosed brackets) or
//!    not found
//!
//! # Example
//!
//! ```
//! use reel_forge::utils::json_extraction::extract_json_from_response;
//!
//! let response = "Here you go: {\"beats\": [\"Meet Acme.\"]} Enjoy!";
//! assert_eq!(extract_json_from_response(response), "{\"beats\": [\"Meet Acme.\"]}");
//!
//! // Nothing balanced: the input comes back untouched.
//! assert_eq!(extract_json_from_response("no json here"), "no json here");
//! ```

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Error type for JSON extraction failures
#[derive(Debug, Clone, Error, PartialEq)]
pub enum JsonExtractionError {
    #[error("JSON appears truncated: {unclosed_braces} unclosed braces, {unclosed_brackets} unclosed brackets. Partial: {partial_preview}...")]
    Truncated {
        partial_preview: String,
        unclosed_braces: usize,
        unclosed_brackets: usize,
    },
    #[error("No JSON content found in response. Content starts with: '{content_preview}'")]
    NotFound { content_preview: String },
}

/// Result of a JSON extraction attempt
#[derive(Debug, Clone, PartialEq)]
pub enum JsonExtractionResult {
    /// A span that parses as JSON
    Success(String),
    /// JSON started but never closed
    Truncated {
        partial_json: String,
        unclosed_braces: usize,
        unclosed_brackets: usize,
    },
    /// No JSON-like content
    NotFound,
}

impl JsonExtractionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, JsonExtractionResult::Success(_))
    }

    pub fn is_truncated(&self) -> bool {
        matches!(self, JsonExtractionResult::Truncated { .. })
    }

    /// The extracted JSON for the Success case
    pub fn json(&self) -> Option<&str> {
        match self {
            JsonExtractionResult::Success(json) => Some(json),
            _ => None,
        }
    }

    /// Converts to a `Result`, using `content` for the not-found preview.
    pub fn into_result_with_context(self, content: &str) -> Result<String, JsonExtractionError> {
        match self {
            JsonExtractionResult::Success(json) => Ok(json),
            JsonExtractionResult::Truncated {
                partial_json,
                unclosed_braces,
                unclosed_brackets,
            } => Err(JsonExtractionError::Truncated {
                partial_preview: preview(&partial_json, 100),
                unclosed_braces,
                unclosed_brackets,
            }),
            JsonExtractionResult::NotFound => Err(JsonExtractionError::NotFound {
                content_preview: preview(content.trim(), 50),
            }),
        }
    }
}

/// Bracket balance of a piece of text.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonStructureAnalysis {
    /// Number of '{' without a matching '}'
    pub unclosed_braces: usize,
    /// Number of '[' without a matching ']'
    pub unclosed_brackets: usize,
    /// Whether the text ends inside a string literal
    pub in_string: bool,
    /// Byte offset of the first '{' or '['
    pub json_start: Option<usize>,
}

/// Counts unclosed braces and brackets outside string literals.
pub fn analyze_json_structure(s: &str) -> JsonStructureAnalysis {
    let mut brace_depth: isize = 0;
    let mut bracket_depth: isize = 0;
    let mut in_string = false;
    let mut escape_next = false;
    let mut json_start: Option<usize> = None;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' if json_start.is_some() => in_string = !in_string,
            '{' if !in_string => {
                json_start.get_or_insert(i);
                brace_depth += 1;
            }
            '}' if !in_string => brace_depth -= 1,
            '[' if !in_string => {
                json_start.get_or_insert(i);
                bracket_depth += 1;
            }
            ']' if !in_string => bracket_depth -= 1,
            _ => {}
        }
    }

    JsonStructureAnalysis {
        unclosed_braces: brace_depth.max(0) as usize,
        unclosed_brackets: bracket_depth.max(0) as usize,
        in_string,
        json_start,
    }
}

/// Locates the first well-formed JSON object or array in `content`.
pub fn try_extract_json_from_response(content: &str) -> JsonExtractionResult {
    let trimmed = content.trim();

    if let Some(json) = extract_from_code_block(trimmed) {
        return JsonExtractionResult::Success(json);
    }

    if let Some(json) = first_balanced_json(trimmed) {
        return JsonExtractionResult::Success(json.to_string());
    }

    let analysis = analyze_json_structure(trimmed);
    match analysis.json_start {
        Some(start)
            if analysis.unclosed_braces > 0
                || analysis.unclosed_brackets > 0
                || analysis.in_string =>
        {
            JsonExtractionResult::Truncated {
                partial_json: trimmed[start..].to_string(),
                unclosed_braces: analysis.unclosed_braces,
                unclosed_brackets: analysis.unclosed_brackets,
            }
        }
        _ => JsonExtractionResult::NotFound,
    }
}

/// Returns the extracted JSON, or `content` unchanged when none is found.
pub fn extract_json_from_response(content: &str) -> String {
    match try_extract_json_from_response(content) {
        JsonExtractionResult::Success(json) => json,
        _ => content.to_string(),
    }
}

/// Index of the delimiter closing the one `s` starts with.
///
/// `s` must start with `{` or `[`. String literals and escapes are skipped;
/// the other bracket kind is ignored, which is fine because the candidate is
/// validated with `serde_json` afterwards.
pub fn find_matching_close(s: &str) -> Option<usize> {
    let open = s.chars().next()?;
    let close = match open {
        '{' => '}',
        '[' => ']',
        _ => return None,
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            c if c == open && !in_string => depth += 1,
            c if c == close && !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// First `{...}` / `[...]` span, left to right, that parses as JSON.
fn first_balanced_json(content: &str) -> Option<&str> {
    content
        .char_indices()
        .filter(|(_, c)| *c == '{' || *c == '[')
        .find_map(|(start, _)| {
            let candidate = &content[start..];
            let end = find_matching_close(candidate)?;
            let span = &candidate[..=end];
            serde_json::from_str::<serde_json::Value>(span)
                .ok()
                .map(|_| span)
        })
}

fn code_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"```(?:json|JSON)?[ \t]*\r?\n?([\s\S]*?)```").expect("static regex is valid")
    })
}

/// JSON inside the first markdown fence that contains any.
fn extract_from_code_block(content: &str) -> Option<String> {
    code_block_regex().captures_iter(content).find_map(|caps| {
        let body = caps.get(1)?.as_str().trim();
        first_balanced_json(body).map(str::to_string)
    })
}

fn preview(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
