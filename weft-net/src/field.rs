use crate::HeaderConsumer;

/// Options for parsing structured header field values.
///
/// By default quoted strings are processed (quotes removed, backslash
/// escapes honored), parenthesized comments are processed and dropped,
/// and the part before the first unquoted `;` is the primary value with
/// named attributes following. Each behavior can be switched off
/// independently; `Cookie`-style headers, for example, are all named
/// values with no quote or comment processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseMode {
    no_comments: bool,
    no_quotes: bool,
    no_primary: bool,
}

impl ParseMode {
    /// Default mode: comments, quotes and a primary value.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            no_comments: false,
            no_quotes: false,
            no_primary: false,
        }
    }

    /// Treat `(` and `)` as ordinary characters.
    #[must_use]
    pub const fn without_comments(mut self) -> Self {
        self.no_comments = true;
        self
    }

    /// Treat `"` and `\` as ordinary characters.
    #[must_use]
    pub const fn without_quotes(mut self) -> Self {
        self.no_quotes = true;
        self
    }

    /// The value consists of named attributes only, no primary value.
    #[must_use]
    pub const fn without_primary(mut self) -> Self {
        self.no_primary = true;
        self
    }
}

/// One header field: a name and its raw value.
///
/// The raw value is kept verbatim; the structured accessors interpret
/// it on demand. For a value such as `text/html; charset=UTF-8` the
/// primary value is `text/html` and `charset` is a secondary value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderField {
    name: String,
    value: String,
}

impl HeaderField {
    /// Create a field from name and raw value.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Field name, exactly as stored.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw field value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Replace the raw value.
    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    /// The value up to the first unquoted `;`, trimmed.
    #[must_use]
    pub fn primary_value(&self, mode: ParseMode) -> String {
        let mut pos = 0;
        extract_part(&self.value, &mut pos, mode).trim().to_string()
    }

    /// Look up a secondary value by name (ASCII case-insensitive).
    #[must_use]
    pub fn secondary_value(&self, name: &str, mode: ParseMode) -> Option<String> {
        let mut found = None;
        self.enumerate_secondary_values(
            &mut |key: &str, value: &str| {
                if found.is_none() && key.eq_ignore_ascii_case(name) {
                    found = Some(value.to_string());
                }
            },
            mode,
        );
        found
    }

    /// Enumerate all secondary values in order.
    pub fn enumerate_secondary_values(
        &self,
        consumer: &mut impl HeaderConsumer,
        mode: ParseMode,
    ) {
        let mut pos = 0;
        if !mode.no_primary {
            extract_part(&self.value, &mut pos, mode);
        }
        while pos < self.value.len() {
            let part = extract_part(&self.value, &mut pos, mode);
            match part.find('=') {
                Some(eq) => consumer.handle_header(part[..eq].trim(), part[eq + 1..].trim()),
                None => consumer.handle_header(part.trim(), ""),
            }
        }
    }

    /// Extract the address from a `From`-style field.
    ///
    /// Accepts `addr`, `addr (comment)` and `Name <addr>` shapes, taking
    /// the first element of an address list. The address must contain
    /// `@` and no whitespace.
    #[must_use]
    pub fn address_value(&self) -> Option<String> {
        let first = self.value.split(',').next().unwrap_or("");
        let mut pos = 0;
        let part = extract_part(first, &mut pos, ParseMode::new());
        let part = part.trim();

        let addr = match (part.find('<'), part.rfind('>')) {
            (Some(start), Some(end)) if start < end => part[start + 1..end].trim(),
            _ => part,
        };
        if !addr.is_empty() && addr.contains('@') && !addr.contains(char::is_whitespace) {
            Some(addr.to_string())
        } else {
            None
        }
    }
}

#[derive(Clone, Copy)]
enum PartState {
    Raw,
    DoubleQuote,
    DoubleQuoteEscape,
    Comment,
    CommentEscape,
}

/// Extract one `;`-delimited part of a structured value, starting at
/// `*pos` and leaving `*pos` on the byte after the separator.
fn extract_part(value: &str, pos: &mut usize, mode: ParseMode) -> String {
    let bytes = value.as_bytes();
    let mut result = Vec::new();
    let mut state = PartState::Raw;
    while *pos < bytes.len() {
        let byte = bytes[*pos];
        *pos += 1;
        match state {
            PartState::Raw => {
                if byte == b'"' && !mode.no_quotes {
                    state = PartState::DoubleQuote;
                } else if byte == b'(' && !mode.no_comments {
                    state = PartState::Comment;
                } else if byte == b';' {
                    break;
                } else {
                    result.push(byte);
                }
            }
            PartState::DoubleQuote => {
                if byte == b'\\' {
                    state = PartState::DoubleQuoteEscape;
                } else if byte == b'"' {
                    state = PartState::Raw;
                } else {
                    result.push(byte);
                }
            }
            PartState::DoubleQuoteEscape => {
                result.push(byte);
                state = PartState::DoubleQuote;
            }
            PartState::Comment => {
                if byte == b')' {
                    state = PartState::Raw;
                } else if byte == b'\\' {
                    state = PartState::CommentEscape;
                }
            }
            PartState::CommentEscape => {
                state = PartState::Comment;
            }
        }
    }
    String::from_utf8_lossy(&result).into_owned()
}
