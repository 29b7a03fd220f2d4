// src/messages.rs

use chrono::{DateTime, Utc};

use crate::config::BotConfig;
use crate::state::UserStats;

pub const EXAMPLE_UID: &str = "1484443876";

pub fn join_prompt_message() -> String {
    "🔒 **VERIFICATION REQUIRED**\n\n\
    To use this bot, you must join all servers below.\n\n\
    📌 After joining, click **\"I've Joined - Verify\"**."
        .to_string()
}

pub fn verification_failed_message() -> String {
    "❌ **Verification Failed!**\n\n\
    You haven't joined all required servers yet.\n\
    Please join them and try again.\n\n"
        .to_string()
}

pub fn verification_success_message() -> String {
    format!(
        "✅ **Verification Successful!**\n\n\
        You can now use the bot.\n\
        Send any player UID to get info, e.g. `{}`.",
        EXAMPLE_UID
    )
}

pub fn welcome_message(name: &str, bot_name: &str) -> String {
    format!(
        "👋 **Welcome {}!**\n\n\
        I'm **{}** and I can fetch any player's profile using their UID.\n\n\
        📌 **How to use:**\n\
        Just send me any **UID** in a direct message (example: `{}`)\n\n\
        📢 **Commands:**\n\
        `/start` - Show this message\n\
        `/help` - Get help & info\n\
        `/about` - About this bot\n\
        `/stats` - Bot statistics (owner only)",
        name, bot_name, EXAMPLE_UID
    )
}

pub fn help_message(owner_username: &str) -> String {
    format!(
        "❓ **HOW TO USE**\n\n\
        1️⃣ **Join Servers:** join every required server\n\
        2️⃣ **Send UID:** message me any player UID, e.g. `{}`\n\
        3️⃣ **Get Info:** I fetch the profile and show it here\n\n\
        **What info you get:**\n\
        ✅ Player name & level\n\
        ✅ UID & region\n\
        ✅ Likes & badges\n\
        ✅ Guild info\n\
        ✅ BR & CS ranks\n\
        ✅ Honor score\n\n\
        **Need help?** Contact: @{}",
        EXAMPLE_UID, owner_username
    )
}

pub fn new_search_message() -> String {
    format!("🔍 **Send any player UID**\n\nExample: `{}`", EXAMPLE_UID)
}

pub fn verifying_message() -> String {
    "🔄 **Checking your membership...**\n⏳ Please wait...".to_string()
}

pub fn searching_message(uid: &str) -> String {
    format!("🔍 **Searching for UID:** `{}`\n⏳ Please wait...", uid)
}

pub fn refreshing_message(uid: &str) -> String {
    format!("🔄 **Refreshing data for UID:** `{}`\n⏳ Please wait...", uid)
}

pub fn lookup_failed_message(uid: &str, reason: &str) -> String {
    format!(
        "❌ **Error fetching data for UID:** `{}`\n\n\
        🔴 **Reason:** {}\n\n\
        💡 Please check the UID and try again.",
        uid, reason
    )
}

pub fn format_failed_message(uid: &str) -> String {
    format!(
        "❌ **Failed to format data for UID:** `{}`\n\
        This might be due to API format mismatch.",
        uid
    )
}

pub fn access_denied_message() -> String {
    "❌ **Access Denied!**\nThis command is for owner only.".to_string()
}

pub fn about_message(config: &BotConfig, stats: &UserStats) -> String {
    let mut text = format!(
        "ℹ️ **ABOUT THIS BOT**\n\n\
        🤖 **Bot Name:** {}\n\
        👨‍💻 **Developer:** @{}\n\
        📊 **Version:** {}\n\n\
        **Statistics:**\n\
        👥 Total Users: {}\n\
        ✅ Verified Users: {}\n\n\
        **Required Servers:**\n",
        config.bot_name,
        config.owner_username,
        env!("CARGO_PKG_VERSION"),
        stats.total,
        stats.verified
    );
    for channel in &config.required_channels {
        text.push_str(&format!("📢 {}\n", channel.name));
    }
    text
}

pub fn stats_message(config: &BotConfig, stats: &UserStats, now: DateTime<Utc>) -> String {
    format!(
        "📊 **BOT STATISTICS**\n\n\
        👥 **Users:**\n\
        ├ Total: {}\n\
        ├ Verified: {}\n\
        ├ Unverified: {}\n\
        └ Active (24h): {}\n\n\
        ⚙️ **System:**\n\
        ├ Check Interval: {}s\n\
        ├ API URL: {}\n\
        ├ Endpoint: {}\n\
        └ Database: {}\n\n\
        ⏰ **Last Update:** {}",
        stats.total,
        stats.verified,
        stats.unverified,
        stats.active_24h,
        config.check_interval_secs,
        config.api.base_url,
        config.api.endpoint,
        config.database_file,
        now.format("%d %b %Y, %I:%M %p")
    )
}

pub fn broadcast_usage_message(prefix: &str) -> String {
    format!(
        "Usage: `{0}broadcast Your message here`\n\n\
        Example: `{0}broadcast Bot will be down for maintenance`",
        prefix
    )
}

pub fn broadcast_started_message(targets: usize, message: &str) -> String {
    format!(
        "📢 **Broadcasting to {} users...**\n\n\
        Message: {}\n\n\
        This may take a few minutes.",
        targets, message
    )
}

pub fn broadcast_message(message: &str, owner_username: &str) -> String {
    format!("📢 **BROADCAST MESSAGE**\n\n{}\n\n- @{}", message, owner_username)
}

pub fn broadcast_complete_message(sent: usize, failed: usize, total_users: usize) -> String {
    format!(
        "✅ **Broadcast Complete!**\n\n\
        📨 Sent: {}\n\
        ❌ Failed: {}\n\
        👥 Total users: {}",
        sent, failed, total_users
    )
}

pub fn user_removed_message(name: &str, removed: bool) -> String {
    if removed {
        format!("🗑️ Removed **{}** from the user database.", name)
    } else {
        format!("**{}** is not in the user database.", name)
    }
}
