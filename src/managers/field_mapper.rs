use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt;

use crate::config::FieldMapping;

/// Placeholder shown for fields that cannot be resolved
pub const SENTINEL: &str = "N/A";

/// Result of resolving one source path
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<'a> {
    Found(&'a Value),
    Missing,
}

impl fmt::Display for FieldValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Missing => f.write_str(SENTINEL),
            FieldValue::Found(Value::String(s)) => f.write_str(s),
            FieldValue::Found(Value::Array(items)) => {
                let parts: Vec<String> = items
                    .iter()
                    .map(|item| FieldValue::Found(item).to_string())
                    .collect();
                f.write_str(&parts.join(", "))
            }
            FieldValue::Found(other) => write!(f, "{}", other),
        }
    }
}

/// Walk `path` (keys separated by `.`) through nested objects.
///
/// Missing keys, non-object intermediates, `null`, `""` and `"N/A"` all
/// resolve to `FieldValue::Missing`.
pub fn resolve<'a>(payload: &'a Value, path: &str) -> FieldValue<'a> {
    if path.is_empty() {
        return FieldValue::Missing;
    }

    let mut current = payload;
    for key in path.split('.') {
        match current.as_object().and_then(|object| object.get(key)) {
            Some(next) => current = next,
            None => return FieldValue::Missing,
        }
    }

    match current {
        Value::Null => FieldValue::Missing,
        Value::String(s) if s.is_empty() || s == SENTINEL => FieldValue::Missing,
        value => FieldValue::Found(value),
    }
}

/// (logical field, label) pairs per profile section
const PLAYER_FIELDS: &[(&str, &str)] = &[
    ("nickname", "✨ **Name:**"),
    ("uid", "🆔 **UID:**"),
    ("level", "📊 **Level:**"),
    ("likes", "❤️ **Likes:**"),
    ("region", "🌍 **Region:**"),
    ("guild", "🏰 **Guild:**"),
    ("badges", "🎖️ **Badges:**"),
    ("honor_score", "🛡️ **Honor Score:**"),
];

const RANK_FIELDS: &[(&str, &str)] = &[
    ("br_rank", "🥇 **BR Rank:**"),
    ("cs_rank", "🥈 **CS Rank:**"),
];

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━";

/// Renders upstream payloads as profile cards
pub struct FieldMapper {
    mapping: FieldMapping,
    owner_username: String,
    bot_name: String,
}

impl FieldMapper {
    pub fn new(mapping: FieldMapping, owner_username: &str, bot_name: &str) -> Self {
        Self {
            mapping,
            owner_username: owner_username.to_string(),
            bot_name: bot_name.to_string(),
        }
    }

    pub fn value<'a>(&self, payload: &'a Value, field: &str) -> FieldValue<'a> {
        resolve(payload, self.mapping.path_for(field))
    }

    /// Render the profile card, or None if the payload is not an object.
    ///
    /// The UID line always shows the identifier that was looked up.
    pub fn format(&self, payload: &Value, identifier: &str, now: DateTime<Utc>) -> Option<String> {
        if !payload.is_object() {
            return None;
        }

        let line = |field: &str, label: &str| {
            if field == "uid" {
                format!("{} {}\n", label, identifier)
            } else {
                format!("{} {}\n", label, self.value(payload, field))
            }
        };

        let mut text = String::from("🎮 **PLAYER INFO**\n\n");
        text.push_str(&format!("{RULE}\n👤 **PLAYER DETAILS**\n{RULE}\n"));
        for &(field, label) in PLAYER_FIELDS {
            text.push_str(&line(field, label));
        }

        text.push_str(&format!("\n{RULE}\n🏆 **RANKINGS**\n{RULE}\n"));
        for &(field, label) in RANK_FIELDS {
            text.push_str(&line(field, label));
        }

        text.push_str(&format!(
            "\n{RULE}\n⏰ **Last Update:** {}\n\n{RULE}\n👑 **Developer:** @{}\n⚡ **Powered by:** {}\n",
            now.format("%d %b %Y, %I:%M %p"),
            self.owner_username,
            self.bot_name
        ));

        Some(text)
    }
}
