//! # Fixed Limits
//!
//! Hardcoded runtime constants for the ledgerbook core.
//!
//! These are compiled into the binary and immutable at runtime. Backends and
//! handlers read them directly; nothing here is configurable per request.

/// Number of entries a cursor pulls from its backend per page.
///
/// - Cursors never hold more than one page of decoded entries at a time.
/// - A page is fetched only when the previous one has been consumed.
pub const QUERY_PAGE_SIZE: usize = 64;

/// Upper bound on the `limit` field of a rich-query expression.
///
/// Expressions asking for more are clamped, not rejected.
pub const MAX_QUERY_LIMIT: usize = 100_000;

/// Maximum size of a record payload accepted by `SaveEntity` (1 MiB).
///
/// Checked before any JSON parsing so an oversized argument costs nothing.
pub const MAX_PAYLOAD_LENGTH: usize = 1024 * 1024;

/// Name of the discriminant field carried by every stored record.
pub const DISCRIMINANT_FIELD: &str = "docType";

/// Name of the identifier field carried by every stored record.
pub const IDENTIFIER_FIELD: &str = "id";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_bounded() {
        assert!(QUERY_PAGE_SIZE > 0);
        assert!(QUERY_PAGE_SIZE <= MAX_QUERY_LIMIT);
    }

    #[test]
    fn field_names() {
        assert_eq!(DISCRIMINANT_FIELD, "docType");
        assert_eq!(IDENTIFIER_FIELD, "id");
    }
}
