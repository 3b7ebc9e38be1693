//! Reference scanner for the substitution engine.
//!
//! Produces a flat token sequence over input text in a single pass. Two
//! reference forms are recognized inside `{{ ... }}` spans:
//!
//! - `{{ name }}` — a variable reference
//! - `{{ read_file("path") }}` / `{{ read_file_raw("path") }}` — an inline
//!   include directive; the path is single- or double-quoted and an optional
//!   `fit_headings=N` keyword argument targets a heading level
//!
//! Anything else is literal text. Unterminated `{{` spans and spans that do
//! not parse as either form are preserved verbatim (the engine warns about
//! the latter); the exact source span is kept on every reference token so
//! unresolved references can be left untouched in the output.

/// An inline include directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeCall {
    /// The path argument, possibly containing further variable references.
    pub path: String,
    /// True for `read_file_raw`: content is never substituted.
    pub raw: bool,
    /// Target heading level for the included Markdown, when requested.
    pub fit_headings: Option<u8>,
}

/// One scanned token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// Plain text, emitted as-is.
    Literal(&'a str),
    /// A `{{ name }}` variable reference.
    Variable {
        /// The referenced variable name.
        name: &'a str,
        /// The exact `{{ ... }}` source span.
        source: &'a str,
    },
    /// A `{{ read_file(...) }}` include directive.
    Include {
        /// The parsed call.
        call: IncludeCall,
        /// The exact `{{ ... }}` source span.
        source: &'a str,
    },
    /// A `{{ ... }}` span that is neither a variable nor a valid include
    /// call. Preserved verbatim; the engine surfaces the reason as a
    /// warning.
    Malformed {
        /// Why the span did not parse.
        reason: String,
        /// The exact `{{ ... }}` source span.
        source: &'a str,
    },
}

/// Scan `text` into a token sequence.
pub fn scan(text: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("{{") {
        if open > 0 {
            tokens.push(Token::Literal(&rest[..open]));
        }
        let span = &rest[open..];

        let Some(close) = find_balanced_close(span) else {
            // Unterminated opener: the remainder is literal.
            tokens.push(Token::Literal(span));
            return tokens;
        };

        let source = &span[..close + 2];
        let inner = span[2..close].trim();
        tokens.push(classify(inner, source));
        rest = &span[close + 2..];
    }

    if !rest.is_empty() {
        tokens.push(Token::Literal(rest));
    }
    tokens
}

/// Find the byte offset of the `}}` matching the `{{` at the start of
/// `span`, honoring nested `{{ ... }}` pairs (include paths may embed
/// variable references).
fn find_balanced_close(span: &str) -> Option<usize> {
    let bytes = span.as_bytes();
    let mut depth = 0usize;
    let mut i = 2; // skip the opener
    while i + 1 < bytes.len() {
        if bytes[i] == b'{' && bytes[i + 1] == b'{' {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'}' && bytes[i + 1] == b'}' {
            if depth == 0 {
                return Some(i);
            }
            depth -= 1;
            i += 2;
        } else {
            i += 1;
        }
    }
    None
}

fn classify<'a>(inner: &'a str, source: &'a str) -> Token<'a> {
    if is_identifier(inner) {
        return Token::Variable {
            name: inner,
            source,
        };
    }

    if inner.starts_with("read_file") {
        return match parse_include(inner) {
            Ok(call) => Token::Include { call, source },
            Err(reason) => Token::Malformed { reason, source },
        };
    }

    Token::Malformed {
        reason: format!("'{}' is not a variable name or include directive", inner),
        source,
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Parse a `read_file(...)` / `read_file_raw(...)` call body.
fn parse_include(inner: &str) -> Result<IncludeCall, String> {
    let (raw, args) = if let Some(rest) = inner.strip_prefix("read_file_raw") {
        (true, rest)
    } else if let Some(rest) = inner.strip_prefix("read_file") {
        (false, rest)
    } else {
        return Err(format!("'{}' is not an include directive", inner));
    };

    let args = args.trim();
    let args = args
        .strip_prefix('(')
        .and_then(|a| a.strip_suffix(')'))
        .ok_or_else(|| format!("include directive '{}' is missing parentheses", inner))?
        .trim();

    let (path, remainder) = parse_quoted(args)
        .ok_or_else(|| format!("include directive '{}' needs a quoted path argument", inner))?;

    let mut fit_headings = None;
    for part in remainder.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let Some((key, value)) = part.split_once('=') else {
            return Err(format!(
                "unexpected argument '{}' in include directive '{}'",
                part, inner
            ));
        };
        match key.trim() {
            "fit_headings" => {
                let level: u8 = value.trim().parse().map_err(|_| {
                    format!(
                        "fit_headings needs an integer level, got '{}' in '{}'",
                        value.trim(),
                        inner
                    )
                })?;
                fit_headings = Some(level);
            }
            other => {
                return Err(format!(
                    "unknown argument '{}' in include directive '{}'",
                    other, inner
                ));
            }
        }
    }

    Ok(IncludeCall {
        path,
        raw,
        fit_headings,
    })
}

/// Parse a leading quoted string; returns the content and the text after
/// the closing quote.
fn parse_quoted(s: &str) -> Option<(String, &str)> {
    let s = s.trim_start();
    let quote = s.chars().next().filter(|c| *c == '\'' || *c == '"')?;
    let body = &s[1..];
    let end = body.find(quote)?;
    Some((body[..end].to_string(), &body[end + 1..]))
}
