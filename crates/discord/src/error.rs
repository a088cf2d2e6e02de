use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Serenity(#[from] serenity::Error),

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
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serenity_errors_convert() {
        let err: Error = serenity::Error::Other("gateway closed").into();
        assert!(matches!(err, Error::Serenity(_)));
        assert_eq!(Error::message("no token").to_string(), "no token");
    }
}
