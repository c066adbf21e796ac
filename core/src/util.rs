use serde::{Deserialize, Deserializer};

/// Test identifiers are written as strings by some producers and as bare
/// integers by others (`id: 16` in YAML, `"test_number": "16"` in JSON).
#[derive(Deserialize)]
#[serde(untagged)]
enum RawIdent {
    Text(String),
    Int(i64),
}

impl From<RawIdent> for String {
    fn from(value: RawIdent) -> Self {
        match value {
            RawIdent::Text(s) => s,
            RawIdent::Int(i) => i.to_string(),
        }
    }
}

pub(crate) fn deserialize_ident<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    RawIdent::deserialize(deserializer).map(String::from)
}

pub(crate) fn deserialize_opt_ident<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawIdent>::deserialize(deserializer)?.map(String::from))
}

/// Percentage of `count` in `total`, zero when there is nothing to divide by
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(deserialize_with = "deserialize_ident")]
        id: String,
        #[serde(default, deserialize_with = "deserialize_opt_ident")]
        other: Option<String>,
    }

    #[test]
    fn test_ident_from_string_and_int() {
        let h: Holder = serde_json::from_str(r#"{"id": "TC1", "other": 17}"#).unwrap();
        assert_eq!(h.id, "TC1");
        assert_eq!(h.other.as_deref(), Some("17"));

        let h: Holder = serde_json::from_str(r#"{"id": 4, "other": null}"#).unwrap();
        assert_eq!(h.id, "4");
        assert_eq!(h.other, None);

        let h: Holder = serde_json::from_str(r#"{"id": "x"}"#).unwrap();
        assert_eq!(h.other, None);
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(5, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
        assert_eq!(percentage(3, 3), 100.0);
    }
}
