//! Identifier tags for automated tests
//!
//! A test is tagged either explicitly through the `tags` setting (keyed by
//! full test name) or by naming convention: a final path segment starting
//! with `tc` and a number, such as `tc016_crud_10_tasks`, carries id `16`.

use std::collections::BTreeMap;

use tally_core::settings::TestTag;

#[derive(Debug, Default, Clone)]
pub struct Tagger {
    explicit: BTreeMap<String, TestTag>,
}

impl Tagger {
    pub fn new(explicit: BTreeMap<String, TestTag>) -> Self {
        Self { explicit }
    }

    /// Identifier and description for a test, by full name
    pub fn tag(&self, name: &str) -> (Option<String>, Option<String>) {
        if let Some(tag) = self.explicit.get(name) {
            return (Some(tag.id.clone()), tag.description.clone());
        }
        (conventional_id(name), None)
    }
}

/// Extracts the id from a `tc<digits>` prefixed final path segment
pub fn conventional_id(name: &str) -> Option<String> {
    let segment = name.rsplit("::").next()?;
    let rest = segment
        .strip_prefix("tc")
        .or_else(|| segment.strip_prefix("TC"))?;

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }
    let (digits, tail) = rest.split_at(digits_len);
    if !(tail.is_empty() || tail.starts_with('_')) {
        return None;
    }

    let trimmed = digits.trim_start_matches('0');
    Some(if trimmed.is_empty() { "0" } else { trimmed }.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conventional_id() {
        assert_eq!(conventional_id("tasks::tests::tc016_crud"), Some("16".to_string()));
        assert_eq!(conventional_id("tc17"), Some("17".to_string()));
        assert_eq!(conventional_id("e2e::TC003_login"), Some("3".to_string()));
        assert_eq!(conventional_id("tests::tc000"), Some("0".to_string()));
    }

    #[test]
    fn test_conventional_id_rejects() {
        assert_eq!(conventional_id("tasks::tests::test_home_page"), None);
        assert_eq!(conventional_id("tc_home"), None);
        assert_eq!(conventional_id("tc12abc"), None);
        assert_eq!(conventional_id("tc12::helper"), None);
        assert_eq!(conventional_id(""), None);
    }

    #[test]
    fn test_explicit_tag_wins() {
        let mut explicit = BTreeMap::new();
        explicit.insert(
            "tasks::tests::tc016_crud".to_string(),
            TestTag {
                id: "42".to_string(),
                description: Some("CRUD cycle".to_string()),
            },
        );
        let tagger = Tagger::new(explicit);

        assert_eq!(
            tagger.tag("tasks::tests::tc016_crud"),
            (Some("42".to_string()), Some("CRUD cycle".to_string()))
        );
        assert_eq!(
            tagger.tag("tasks::tests::tc017_cross"),
            (Some("17".to_string()), None)
        );
        assert_eq!(tagger.tag("tasks::tests::other"), (None, None));
    }
}
