use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

/// Everything except ASCII alphanumerics and `*`, `-`, `.`, `_` is
/// escaped; space is handled separately (it becomes `+`).
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'*')
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b' ');

/// Decode a percent-encoded URL component.
///
/// One decoder serves URLs, query arguments and form fields alike:
/// `%XX` escapes are resolved and `+` means space. Escapes that do not
/// form valid UTF-8 are replaced rather than rejected.
#[must_use]
pub fn decode_component(value: &str) -> String {
    let value = value.replace('+', " ");
    percent_decode_str(&value).decode_utf8_lossy().into_owned()
}

/// Percent-encode a URL component, space as `+`.
#[must_use]
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT)
        .to_string()
        .replace(' ', "+")
}
