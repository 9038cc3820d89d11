use weft_error::BoxError;
use weft_io::DataSink;

use crate::{HeaderConsumer, HeaderField};

/// An ordered collection of header fields.
///
/// Fields keep their insertion order and their original name casing;
/// lookups compare names ASCII case-insensitively. Duplicate names are
/// preserved — [`HeaderTable::get`] finds the first, iteration sees
/// them all.
#[derive(Debug, Clone, Default)]
pub struct HeaderTable {
    fields: Vec<HeaderField>,
}

impl HeaderTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field unconditionally.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push(HeaderField::new(name, value));
    }

    /// Append an existing field unconditionally.
    pub fn add_field(&mut self, field: HeaderField) {
        self.fields.push(field);
    }

    /// Update the first matching field, or append a new one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .fields
            .iter()
            .position(|field| field.name().eq_ignore_ascii_case(&name))
        {
            Some(index) => self.fields[index].set_value(value),
            None => self.add(name, value),
        }
    }

    /// The first field with a matching name, if any.
    ///
    /// The reference stays valid until the table is next mutated.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderField> {
        self.fields
            .iter()
            .find(|field| field.name().eq_ignore_ascii_case(name))
    }

    /// Mutable access to the first field with a matching name.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut HeaderField> {
        self.fields
            .iter_mut()
            .find(|field| field.name().eq_ignore_ascii_case(name))
    }

    /// Remove all fields.
    pub fn clear(&mut self) {
        self.fields.clear();
    }

    /// Number of fields, duplicates included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// `true` when the table holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterate over all fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &HeaderField> {
        self.fields.iter()
    }

    /// Feed every field to `consumer`, in insertion order.
    pub fn enumerate_headers(&self, consumer: &mut dyn HeaderConsumer) {
        for field in &self.fields {
            consumer.handle_header(field.name(), field.value());
        }
    }

    /// Write all fields as `name: value\r\n` lines.
    pub fn write_headers(&self, sink: &mut dyn DataSink) -> Result<(), BoxError> {
        for field in &self.fields {
            let line = format!("{}: {}\r\n", field.name(), field.value());
            sink.handle_full_data(line.as_bytes())?;
        }
        Ok(())
    }
}

impl HeaderConsumer for HeaderTable {
    fn handle_header(&mut self, name: &str, value: &str) {
        self.add(name, value);
    }
}

impl<'a> IntoIterator for &'a HeaderTable {
    type Item = &'a HeaderField;
    type IntoIter = std::slice::Iter<'a, HeaderField>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
