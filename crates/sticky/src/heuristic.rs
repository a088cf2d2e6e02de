//! Recognizes earlier sticky posts in a channel's history.
//!
//! The matching rules are a contract with every post the bot has ever made
//! (including posts from older builds), so they change only deliberately.

use crate::{platform::ChannelMessage, types::StickyConfig};

const PIN: &str = "📌";
const FOOTER_PHRASE: &str = "This is a sticky message";
const TEXT_PIN_MARKER: &str = "*📌";
const TEXT_DEFAULT_FOOTER: &str = "📌 This is a sticky message";
const TEXT_ITALIC_MARKER: &str = "*sticky message*";

/// Number of leading template characters that identify a stale copy.
pub const CONTENT_PREFIX_CHARS: usize = 30;

/// Whether `message` looks like a sticky post for `config`'s channel.
///
/// A message is sticky-like when either:
/// - its first card has a footer containing 📌, "sticky" (any case), or
///   "This is a sticky message"; or
/// - its text contains `*📌`, "📌 This is a sticky message",
///   "*sticky message*" (any case), or the first 30 characters of the
///   current template.
///
/// Authorship is not checked here; callers only pass self-authored messages.
pub fn is_sticky_like(message: &ChannelMessage, config: &StickyConfig) -> bool {
    card_footer_matches(message) || text_matches(&message.content, &config.content)
}

fn card_footer_matches(message: &ChannelMessage) -> bool {
    let Some(first) = message.card_footers.first() else {
        return false;
    };
    let footer = first.as_deref().unwrap_or_default();
    footer.contains(PIN)
        || footer.to_lowercase().contains("sticky")
        || footer.contains(FOOTER_PHRASE)
}

fn text_matches(content: &str, template: &str) -> bool {
    if content.is_empty() {
        return false;
    }
    if content.contains(TEXT_PIN_MARKER)
        || content.contains(TEXT_DEFAULT_FOOTER)
        || content.to_lowercase().contains(TEXT_ITALIC_MARKER)
    {
        return true;
    }
    let prefix = template_prefix(template);
    !prefix.is_empty() && content.contains(prefix)
}

/// First [`CONTENT_PREFIX_CHARS`] characters of `template`.
fn template_prefix(template: &str) -> &str {
    match template.char_indices().nth(CONTENT_PREFIX_CHARS) {
        Some((idx, _)) => &template[..idx],
        None => template,
    }
}
