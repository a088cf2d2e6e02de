//! Placeholder expansion for sticky templates.
//!
//! Recognized placeholders (matched case-insensitively):
//! `{server_name}`, `{time}`, `{date}`, `{datetime}`, `{channel_name}`,
//! `{member_count}`. Anything else in braces passes through untouched.

use std::sync::LazyLock;

use {
    chrono::{Local, NaiveDateTime},
    regex::{Captures, Regex},
};

use crate::platform::ChannelInfo;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\{(server_name|time|date|datetime|channel_name|member_count)\}")
        .unwrap_or_else(|e| panic!("placeholder regex is invalid: {e}"))
});

const TIME_FORMAT: &str = "%-I:%M:%S %p";
const DATE_FORMAT: &str = "%-m/%-d/%Y";
const DATETIME_FORMAT: &str = "%-m/%-d/%Y, %-I:%M:%S %p";

/// Values substituted into a template.
#[derive(Debug, Clone)]
pub struct RenderContext {
    pub server_name: String,
    pub channel_name: String,
    pub member_count: u64,
    /// Local wall-clock time used for `{time}`, `{date}` and `{datetime}`.
    pub now: NaiveDateTime,
}

impl RenderContext {
    /// Context for `channel` at the current local time.
    pub fn for_channel(channel: &ChannelInfo) -> Self {
        Self {
            server_name: channel.guild_name.clone(),
            channel_name: channel.name.clone(),
            member_count: channel.member_count,
            now: Local::now().naive_local(),
        }
    }
}

/// Expand every recognized placeholder in `template`.
pub fn render(template: &str, ctx: &RenderContext) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            match caps[1].to_ascii_lowercase().as_str() {
                "server_name" => ctx.server_name.clone(),
                "time" => ctx.now.format(TIME_FORMAT).to_string(),
                "date" => ctx.now.format(DATE_FORMAT).to_string(),
                "datetime" => ctx.now.format(DATETIME_FORMAT).to_string(),
                "channel_name" => ctx.channel_name.clone(),
                "member_count" => ctx.member_count.to_string(),
                _ => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use {super::*, chrono::NaiveDate, rstest::rstest};

    fn ctx() -> RenderContext {
        RenderContext {
            server_name: "Rustaceans".into(),
            channel_name: "general".into(),
            member_count: 42,
            now: NaiveDate::from_ymd_opt(2025, 3, 7)
                .unwrap()
                .and_hms_opt(15, 4, 9)
                .unwrap(),
        }
    }

    #[rstest]
    #[case("{channel_name} has {member_count} members", "general has 42 members")]
    #[case("Welcome to {server_name}!", "Welcome to Rustaceans!")]
    #[case("{SERVER_NAME} / {Channel_Name} / {MEMBER_COUNT}", "Rustaceans / general / 42")]
    #[case("now {time}", "now 3:04:09 PM")]
    #[case("today {date}", "today 3/7/2025")]
    #[case("{DateTime}", "3/7/2025, 3:04:09 PM")]
    #[case("{foo} stays", "{foo} stays")]
    #[case("{channel_name", "{channel_name")]
    #[case("", "")]
    fn renders(#[case] template: &str, #[case] expected: &str) {
        assert_eq!(render(template, &ctx()), expected);
    }

    #[test]
    fn repeated_placeholders_all_expand() {
        assert_eq!(
            render("{channel_name}{channel_name}", &ctx()),
            "generalgeneral"
        );
    }

    #[test]
    fn does_not_mutate_input() {
        let template = String::from("#{channel_name}");
        let rendered = render(&template, &ctx());
        assert_eq!(template, "#{channel_name}");
        assert_eq!(rendered, "#general");
    }
}
