//! Outgoing message model shared by commands and event handlers.
//!
//! The dispatcher produces `Reply` values; the conversions below turn them
//! into serenity/poise builders right before sending.

use poise::serenity_prelude as serenity;

/// Discord allows at most five buttons per action row
const MAX_BUTTONS_PER_ROW: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum Button {
    /// Routed back to the dispatcher via its custom id
    Action { label: String, custom_id: String },
    /// Opens an external URL
    Link { label: String, url: String },
}

impl Button {
    pub fn action(label: &str, custom_id: impl Into<String>) -> Self {
        Button::Action {
            label: label.to_string(),
            custom_id: custom_id.into(),
        }
    }

    pub fn link(label: impl Into<String>, url: &str) -> Self {
        Button::Link {
            label: label.into(),
            url: url.to_string(),
        }
    }

    fn to_builder(&self) -> serenity::CreateButton {
        match self {
            Button::Action { label, custom_id } => serenity::CreateButton::new(custom_id)
                .label(label)
                .style(serenity::ButtonStyle::Primary),
            Button::Link { label, url } => serenity::CreateButton::new_link(url).label(label),
        }
    }
}

/// Text plus rows of buttons
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Reply {
    pub content: String,
    pub rows: Vec<Vec<Button>>,
}

impl Reply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<Button>) -> Self {
        if !row.is_empty() {
            self.rows.push(row);
        }
        self
    }

    /// Custom ids of every action button, in display order
    #[cfg(test)]
    pub fn action_ids(&self) -> Vec<&str> {
        self.rows
            .iter()
            .flatten()
            .filter_map(|button| match button {
                Button::Action { custom_id, .. } => Some(custom_id.as_str()),
                Button::Link { .. } => None,
            })
            .collect()
    }

    fn components(&self) -> Vec<serenity::CreateActionRow> {
        self.rows
            .iter()
            .flat_map(|row| row.chunks(MAX_BUTTONS_PER_ROW))
            .map(|chunk| {
                serenity::CreateActionRow::Buttons(chunk.iter().map(Button::to_builder).collect())
            })
            .collect()
    }

    pub fn to_create_message(&self) -> serenity::CreateMessage {
        serenity::CreateMessage::new()
            .content(&self.content)
            .components(self.components())
    }

    pub fn to_edit_message(&self) -> serenity::EditMessage {
        serenity::EditMessage::new()
            .content(&self.content)
            .components(self.components())
    }

    pub fn to_interaction_message(&self) -> serenity::CreateInteractionResponseMessage {
        serenity::CreateInteractionResponseMessage::new()
            .content(&self.content)
            .components(self.components())
    }

    pub fn to_edit_interaction(&self) -> serenity::EditInteractionResponse {
        serenity::EditInteractionResponse::new()
            .content(&self.content)
            .components(self.components())
    }

    pub fn to_create_reply(&self) -> poise::CreateReply {
        poise::CreateReply::default()
            .content(&self.content)
            .components(self.components())
    }
}
