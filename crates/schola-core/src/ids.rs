//! ID prefix constants.
//!
//! IDs are `<prefix>-<8 hex chars>`, generated by the storage adapter.

pub const PREFIX_ENTRY: &str = "sch";
pub const PREFIX_SECTION: &str = "sec";
pub const PREFIX_ENROLLMENT: &str = "enr";
pub const PREFIX_FACT: &str = "fct";
pub const PREFIX_SUBJECT: &str = "sub";

/// Every prefix in use, for adapters that pre-validate IDs.
pub const ALL_PREFIXES: &[&str] = &[
    PREFIX_ENTRY,
    PREFIX_SECTION,
    PREFIX_ENROLLMENT,
    PREFIX_FACT,
    PREFIX_SUBJECT,
];

/// Whether `id` looks like `<prefix>-<hex>` for the given prefix.
#[must_use]
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_check_accepts_generated_shape() {
        assert!(has_prefix("sch-a3f8b2c1", PREFIX_ENTRY));
        assert!(!has_prefix("sec-a3f8b2c1", PREFIX_ENTRY));
        assert!(!has_prefix("sch-", PREFIX_ENTRY));
        assert!(!has_prefix("sch-zzzz", PREFIX_ENTRY));
    }

    #[test]
    fn prefixes_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for prefix in ALL_PREFIXES {
            assert!(seen.insert(*prefix), "duplicate prefix {prefix}");
        }
    }
}
