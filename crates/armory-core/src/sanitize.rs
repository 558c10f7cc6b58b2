//! Field sanitization for the comma-separated record format (§9: "CSV as schema").
//!
//! Every write path that inserts a descriptive field into an entity record
//! must pass it through [`sanitize`] first, so the persisted file never
//! contains an ambiguous record separator. This is a single, shared function
//! so the property is easy to assert in tests rather than re-implemented at
//! every call site.

/// Strip commas and newlines from a field before it is written to a record.
///
/// Commas would be indistinguishable from the field separator; newlines
/// would split one record into two. Both are removed rather than escaped —
/// the store's persisted format (§6) has no quoting convention.
#[must_use]
pub fn sanitize(field: &str) -> String {
    field.chars().filter(|&c| c != ',' && c != '\n' && c != '\r').collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_commas() {
        assert_eq!(sanitize("hello, world"), "hello world");
    }

    #[test]
    fn strips_newlines() {
        assert_eq!(sanitize("line one\nline two\r\n"), "line oneline two");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(sanitize("plain description"), "plain description");
    }
}
