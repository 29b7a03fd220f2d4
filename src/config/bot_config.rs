use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Upper bound for `check_interval_secs` (30 days)
pub const MAX_CHECK_INTERVAL_SECS: u64 = 30 * 24 * 60 * 60;

use super::field_mapping::FieldMapping;
use crate::error::BotError;

/// Bot configuration
/// Loaded from data/bot.json (or the path given by --config / CONFIG_PATH)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BotConfig {
    /// Discord user ID allowed to run owner commands
    pub owner_id: u64,

    /// Shown in the footer of rendered profiles and broadcasts
    pub owner_username: String,

    #[serde(default = "default_bot_name")]
    pub bot_name: String,

    /// Guilds a user must be a member of before lookups are allowed
    #[serde(default)]
    pub required_channels: Vec<ChannelRequirement>,

    pub api: ApiConfig,

    /// Logical field name -> source path in the upstream payload
    #[serde(default)]
    pub field_mapping: FieldMapping,

    /// Seconds a cached membership result stays valid
    #[serde(default = "default_check_interval_secs")]
    pub check_interval_secs: u64,

    #[serde(default = "default_database_file")]
    pub database_file: String,

    #[serde(default = "default_min_identifier_len")]
    pub min_identifier_len: usize,

    #[serde(default = "default_max_identifier_len")]
    pub max_identifier_len: usize,

    /// Pause between two broadcast DMs
    #[serde(default = "default_broadcast_delay_ms")]
    pub broadcast_delay_ms: u64,

    #[serde(default = "default_command_prefix")]
    pub command_prefix: String,
}

/// A guild the user has to join
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelRequirement {
    /// Guild ID
    pub id: u64,

    /// Invite link shown on the join button
    pub url: String,

    /// Display name
    pub name: String,
}

/// Upstream profile API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,

    #[serde(default)]
    pub endpoint: String,

    /// Query parameter that carries the looked-up identifier
    #[serde(default = "default_identifier_param")]
    pub identifier_param: String,

    /// Static query parameters sent with every request
    #[serde(default)]
    pub params: BTreeMap<String, String>,

    #[serde(default = "default_success_key")]
    pub success_key: String,

    #[serde(default = "default_data_key")]
    pub data_key: String,

    #[serde(default = "default_error_key")]
    pub error_key: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    /// Full request URL without query
    pub fn url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.endpoint)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl BotConfig {
    /// Load from a JSON file
    pub fn load_from_file(path: &str) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BotError::ConfigLoad {
            path: path.to_string(),
            source: e,
        })?;

        let config: Self = serde_json::from_str(&content).map_err(|e| BotError::ConfigParse {
            path: path.to_string(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject values the bot cannot run with
    pub fn validate(&self) -> crate::error::Result<()> {
        let invalid = |message: &str| {
            Err(BotError::ConfigValidation {
                message: message.to_string(),
            })
        };

        if self.owner_id == 0 {
            return invalid("owner_id must be set");
        }
        if self.api.base_url.trim().is_empty() {
            return invalid("api.base_url must not be empty");
        }
        if self.api.identifier_param.trim().is_empty() {
            return invalid("api.identifier_param must not be empty");
        }
        if self.api.timeout_secs == 0 {
            return invalid("api.timeout_secs must be greater than 0");
        }
        if self.check_interval_secs == 0 {
            return invalid("check_interval_secs must be greater than 0");
        }
        if self.check_interval_secs > MAX_CHECK_INTERVAL_SECS {
            return Err(BotError::ConfigValidation {
                message: format!(
                    "check_interval_secs must be at most {}",
                    MAX_CHECK_INTERVAL_SECS
                ),
            });
        }
        if self.command_prefix.trim().is_empty() {
            return invalid("command_prefix must not be empty");
        }
        if self.min_identifier_len == 0 || self.min_identifier_len > self.max_identifier_len {
            return invalid("identifier length range is empty");
        }
        if let Some(channel) = self.required_channels.iter().find(|c| c.id == 0) {
            return Err(BotError::ConfigValidation {
                message: format!("required channel '{}' has no guild id", channel.name),
            });
        }
        Ok(())
    }

    /// How long a cached membership result stays valid
    pub fn check_interval(&self) -> chrono::Duration {
        let secs = self.check_interval_secs.min(MAX_CHECK_INTERVAL_SECS);
        chrono::Duration::seconds(secs as i64)
    }

    pub fn broadcast_delay(&self) -> Duration {
        Duration::from_millis(self.broadcast_delay_ms)
    }

    /// Profile link for the owner button
    pub fn owner_url(&self) -> String {
        format!("https://discord.com/users/{}", self.owner_id)
    }
}

fn default_bot_name() -> String {
    "Player Info Bot".to_string()
}

fn default_check_interval_secs() -> u64 {
    300
}

fn default_database_file() -> String {
    "state/users.json".to_string()
}

fn default_min_identifier_len() -> usize {
    5
}

fn default_max_identifier_len() -> usize {
    15
}

fn default_broadcast_delay_ms() -> u64 {
    50
}

fn default_command_prefix() -> String {
    "!".to_string()
}

fn default_identifier_param() -> String {
    "uid".to_string()
}

fn default_success_key() -> String {
    "success".to_string()
}

fn default_data_key() -> String {
    "data".to_string()
}

fn default_error_key() -> String {
    "error".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let json = r##"{
            "owner_id": 6678577936,
            "owner_username": "owner",
            "api": { "base_url": "https://api.example.com/" }
        }"##;

        let config: BotConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.check_interval_secs, 300);
        assert_eq!(config.min_identifier_len, 5);
        assert_eq!(config.max_identifier_len, 15);
        assert_eq!(config.api.timeout_secs, 15);
        assert_eq!(config.api.identifier_param, "uid");
        assert_eq!(config.api.url(), "https://api.example.com");
        assert!(config.required_channels.is_empty());
    }

    #[test]
    fn test_parse_full_config() {
        let json = r##"{
            "owner_id": 42,
            "owner_username": "owner",
            "required_channels": [
                { "id": 1001, "url": "https://discord.gg/one", "name": "One" },
                { "id": 1002, "url": "https://discord.gg/two", "name": "Two" }
            ],
            "api": {
                "base_url": "https://api.example.com",
                "endpoint": "/accinfo",
                "params": { "key": "secret" },
                "timeout_secs": 5
            },
            "field_mapping": { "nickname": "player.name" },
            "check_interval_secs": 60
        }"##;

        let config: BotConfig = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.required_channels.len(), 2);
        assert_eq!(config.api.url(), "https://api.example.com/accinfo");
        assert_eq!(config.api.params.get("key"), Some(&"secret".to_string()));
        assert_eq!(config.field_mapping.path_for("nickname"), "player.name");
        assert_eq!(config.check_interval(), chrono::Duration::seconds(60));
    }

    #[test]
    fn test_validate_rejects_bad_length_range() {
        let json = r##"{
            "owner_id": 42,
            "owner_username": "owner",
            "api": { "base_url": "https://api.example.com" },
            "min_identifier_len": 10,
            "max_identifier_len": 5
        }"##;

        let config: BotConfig = serde_json::from_str(json).unwrap();
        assert!(matches!(
            config.validate(),
            Err(BotError::ConfigValidation { .. })
        ));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let json = r##"{
            "owner_id": 42,
            "owner_username": "owner",
            "api": { "base_url": "https://api.example.com" },
            "bogus": true
        }"##;

        assert!(serde_json::from_str::<BotConfig>(json).is_err());
    }

    #[test]
    fn test_sample_config_is_valid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.json");
        std::fs::write(&path, include_str!("../../data/bot.json.example")).unwrap();

        let config = BotConfig::load_from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.required_channels.len(), 2);
        assert_eq!(config.command_prefix, "!");
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            BotConfig::load_from_file("/nonexistent/bot.json"),
            Err(BotError::ConfigLoad { .. })
        ));
    }

    fn base_config() -> BotConfig {
        serde_json::from_str(
            r##"{
                "owner_id": 42,
                "owner_username": "owner",
                "api": { "base_url": "https://api.example.com" }
            }"##,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_rejects_empty_prefix() {
        let mut config = base_config();
        config.command_prefix = String::new();
        assert!(matches!(
            config.validate(),
            Err(BotError::ConfigValidation { .. })
        ));

        config.command_prefix = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_caps_check_interval() {
        let mut config = base_config();
        config.check_interval_secs = MAX_CHECK_INTERVAL_SECS;
        assert!(config.validate().is_ok());
        assert_eq!(config.check_interval(), chrono::Duration::days(30));

        config.check_interval_secs = u64::MAX;
        assert!(matches!(
            config.validate(),
            Err(BotError::ConfigValidation { .. })
        ));
        assert_eq!(config.check_interval(), chrono::Duration::days(30));
    }
}
