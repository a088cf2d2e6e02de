use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The channel no longer exists (deleted, or the bot lost access).
    #[error("channel not found: {channel_id}")]
    ChannelNotFound { channel_id: String },

    #[error("message not found: {message_id}")]
    MessageNotFound { message_id: String },

    /// Network or rate-limit failure reported by the messaging platform.
    #[error("platform request failed: {context}: {source}")]
    Platform {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("no sticky message configured for channel {channel_id}")]
    ConfigAbsent { channel_id: String },

    #[error("missing permission: {permission}")]
    PermissionDenied { permission: String },

    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// The platform client is not connected yet.
    #[error("unavailable: {message}")]
    Unavailable { message: String },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn channel_not_found(channel_id: impl Into<String>) -> Self {
        Self::ChannelNotFound {
            channel_id: channel_id.into(),
        }
    }

    #[must_use]
    pub fn message_not_found(message_id: impl Into<String>) -> Self {
        Self::MessageNotFound {
            message_id: message_id.into(),
        }
    }

    #[must_use]
    pub fn config_absent(channel_id: impl Into<String>) -> Self {
        Self::ConfigAbsent {
            channel_id: channel_id.into(),
        }
    }

    #[must_use]
    pub fn permission_denied(permission: impl Into<String>) -> Self {
        Self::PermissionDenied {
            permission: permission.into(),
        }
    }

    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Platform {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether the referenced channel or message is gone. Callers treat this as benign.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ChannelNotFound { .. } | Self::MessageNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_classification() {
        assert!(Error::channel_not_found("1").is_not_found());
        assert!(Error::message_not_found("2").is_not_found());
        assert!(!Error::config_absent("1").is_not_found());
        assert!(!Error::message("boom").is_not_found());
    }

    #[test]
    fn external_error_keeps_context() {
        let io = std::io::Error::other("reset by peer");
        let err = Error::external("send message", io);
        assert_eq!(
            err.to_string(),
            "platform request failed: send message: reset by peer"
        );
    }
}
