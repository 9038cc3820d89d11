/// Receiver for parsed name/value pairs.
///
/// One callback shape serves every producer of such pairs: MIME header
/// fields, URL query arguments, form fields, cookie attributes. Pairs
/// arrive in wire order.
pub trait HeaderConsumer {
    /// Accept one name/value pair.
    fn handle_header(&mut self, name: &str, value: &str);
}

impl<F: FnMut(&str, &str)> HeaderConsumer for F {
    fn handle_header(&mut self, name: &str, value: &str) {
        self(name, value);
    }
}
