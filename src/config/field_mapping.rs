use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Logical profile field name -> path in the upstream payload.
///
/// Paths use `.` to walk nested objects (`"player.stats.level"`). A logical
/// field with no entry is looked up under its own name.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct FieldMapping {
    paths: HashMap<String, String>,
}

impl FieldMapping {
    pub fn new(paths: HashMap<String, String>) -> Self {
        Self { paths }
    }

    /// Source path configured for a logical field
    pub fn path_for<'a>(&'a self, field: &'a str) -> &'a str {
        self.paths.get(field).map(String::as_str).unwrap_or(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unmapped_field_uses_own_name() {
        let mapping = FieldMapping::default();
        assert_eq!(mapping.path_for("level"), "level");
    }

    #[test]
    fn test_mapped_field() {
        let mapping: FieldMapping =
            serde_json::from_str(r#"{ "nickname": "basicInfo.nickname" }"#).unwrap();
        assert_eq!(mapping.path_for("nickname"), "basicInfo.nickname");
        assert_eq!(mapping.path_for("region"), "region");
    }
}
