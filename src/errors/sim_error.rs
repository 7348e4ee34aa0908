//! Custom error types for the simulator

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Upstream fetch error: {message}")]
    UpstreamFetch {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
        retry_count: u32,
    },

    #[error("No price available for {token}")]
    DataUnavailable {
        token: String,
    },

    #[error("Storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Engine state error: {reason}")]
    EngineState {
        reason: String,
    },
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    pub fn upstream(message: impl Into<String>) -> Self {
        SimError::UpstreamFetch {
            message: message.into(),
            source: None,
            retry_count: 0,
        }
    }

    pub fn storage(context: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        SimError::Storage {
            context: context.into(),
            source: source.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_context() {
        let err = SimError::InvalidConfig {
            field: "tick_interval_ms".to_string(),
            reason: "must be greater than zero".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid configuration: tick_interval_ms - must be greater than zero"
        );

        let err = SimError::storage("writing settings", anyhow::anyhow!("disk full"));
        assert_eq!(err.to_string(), "Storage error: writing settings");
        assert!(std::error::Error::source(&err).is_some());
    }
}
