//! Persisted sticky configuration.

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
};

/// Footer used when no custom footer template is configured.
pub const DEFAULT_FOOTER: &str = "📌 This is a sticky message";

/// Card color used when none (or an unrecognized one) is given.
pub const DEFAULT_COLOR: &str = "#FFFF00";

/// One sticky message per channel, keyed by channel ID in the store.
///
/// Field names on disk are camelCase. The `alias` entries accept snapshots
/// written by the earlier bot (`messageId`, `useEmbed`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StickyConfig {
    /// Template text, may contain `{placeholder}` variables.
    pub content: String,
    pub channel_id: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
    /// Most recently posted sticky message; `None` means nothing is tracked.
    #[serde(default, alias = "messageId")]
    pub last_message_id: Option<String>,
    #[serde(default = "default_rich_card", alias = "useEmbed")]
    pub render_as_rich_card: bool,
    #[serde(default, alias = "customFooter")]
    pub custom_footer_template: Option<String>,
    #[serde(default = "default_color", alias = "embedColor")]
    pub card_color: String,
}

fn default_rich_card() -> bool {
    true
}

fn default_color() -> String {
    DEFAULT_COLOR.to_string()
}

impl StickyConfig {
    /// A fresh config with default rendering options and nothing posted yet.
    pub fn new(
        channel_id: impl Into<String>,
        content: impl Into<String>,
        author_id: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            channel_id: channel_id.into(),
            author_id: author_id.into(),
            created_at: Utc::now(),
            last_message_id: None,
            render_as_rich_card: true,
            custom_footer_template: None,
            card_color: default_color(),
        }
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_camel_case() {
        let mut cfg = StickyConfig::new("10", "hello", "7");
        cfg.last_message_id = Some("99".into());
        let value = serde_json::to_value(&cfg).unwrap();
        assert_eq!(value["channelId"], "10");
        assert_eq!(value["lastMessageId"], "99");
        assert_eq!(value["renderAsRichCard"], true);
        assert_eq!(value["cardColor"], DEFAULT_COLOR);
        assert!(value["customFooterTemplate"].is_null());
    }

    #[test]
    fn reads_legacy_field_names() {
        let json = r##"{
            "content": "Welcome!",
            "channelId": "123",
            "authorId": "456",
            "createdAt": "2025-01-02T03:04:05.000Z",
            "messageId": "789",
            "useEmbed": false,
            "customFooter": "Read the rules",
            "embedColor": "#FF0000"
        }"##;
        let cfg: StickyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.last_message_id.as_deref(), Some("789"));
        assert!(!cfg.render_as_rich_card);
        assert_eq!(cfg.custom_footer_template.as_deref(), Some("Read the rules"));
        assert_eq!(cfg.card_color, "#FF0000");
    }

    #[test]
    fn missing_optional_fields_use_defaults() {
        let json = r#"{
            "content": "x",
            "channelId": "1",
            "authorId": "2",
            "createdAt": "2025-01-02T03:04:05Z",
            "messageId": null
        }"#;
        let cfg: StickyConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.last_message_id, None);
        assert!(cfg.render_as_rich_card);
        assert_eq!(cfg.card_color, DEFAULT_COLOR);
    }
}
