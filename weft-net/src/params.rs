use crate::{HeaderConsumer, encode_component};

/// Builds a query string from enumerated name/value pairs.
///
/// Feed it through anything that enumerates into a [`HeaderConsumer`]
/// (a [`HeaderTable`][crate::HeaderTable], for instance) and it appends
/// `first_delimiter`-then-`&`-separated `name=value` pairs to the
/// target string, both sides form-encoded.
pub struct ParameterEncoder<'a> {
    result: &'a mut String,
    first_delimiter: Option<char>,
    first: bool,
}

impl<'a> ParameterEncoder<'a> {
    /// Append pairs to `result`, starting with `?`.
    pub fn new(result: &'a mut String) -> Self {
        Self::with_first_delimiter(result, Some('?'))
    }

    /// Append pairs to `result`, starting with the given delimiter
    /// (`None` to start with the first pair directly).
    pub fn with_first_delimiter(result: &'a mut String, first_delimiter: Option<char>) -> Self {
        Self {
            result,
            first_delimiter,
            first: true,
        }
    }
}

impl HeaderConsumer for ParameterEncoder<'_> {
    fn handle_header(&mut self, name: &str, value: &str) {
        if self.first {
            if let Some(delimiter) = self.first_delimiter {
                self.result.push(delimiter);
            }
            self.first = false;
        } else {
            self.result.push('&');
        }
        self.result.push_str(&encode_component(name));
        self.result.push('=');
        self.result.push_str(&encode_component(value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeaderTable;

    #[test]
    fn empty_enumeration_appends_nothing() {
        let mut out = String::new();
        let table = HeaderTable::new();
        table.enumerate_headers(&mut ParameterEncoder::new(&mut out));
        assert_eq!(out, "");
    }

    #[test]
    fn encodes_pairs_with_delimiters() {
        let mut table = HeaderTable::new();
        table.add("a", "a");
        table.add("c", "a+b");
        table.add("d", "x%y");
        table.add("e", "p&q");
        table.add("f", "m=n");
        table.add("g", "hi there");

        let mut out = String::new();
        table.enumerate_headers(&mut ParameterEncoder::new(&mut out));
        assert_eq!(out, "?a=a&c=a%2Bb&d=x%25y&e=p%26q&f=m%3Dn&g=hi+there");
    }

    #[test]
    fn custom_first_delimiter() {
        let mut table = HeaderTable::new();
        table.add("k", "v");

        let mut out = String::from("/page?fixed=1");
        table.enumerate_headers(&mut ParameterEncoder::with_first_delimiter(
            &mut out,
            Some('&'),
        ));
        assert_eq!(out, "/page?fixed=1&k=v");

        let mut bare = String::new();
        table.enumerate_headers(&mut ParameterEncoder::with_first_delimiter(&mut bare, None));
        assert_eq!(bare, "k=v");
    }
}
