pub mod bot_config;
pub mod field_mapping;

pub use bot_config::{ApiConfig, BotConfig, ChannelRequirement};
pub use field_mapping::FieldMapping;
