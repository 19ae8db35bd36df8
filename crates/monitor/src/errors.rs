use thiserror::Error;

/// Typed error hierarchy for the lending monitor.
///
/// Library-internal errors use specific variants; application code wraps with
/// `anyhow::Context` for propagation. Only `Config` is fatal, and only at startup.
#[derive(Error, Debug)]
pub enum MonitorError {
    // -- Chain node ---------------------------------------------------------
    #[error("transport error during {context}: {reason}")]
    Transport { context: String, reason: String },

    #[error("decode error during {context}: {reason}")]
    Decode { context: String, reason: String },

    // -- Configuration ------------------------------------------------------
    #[error("configuration error: {0}")]
    Config(String),

    // -- Alert sink ---------------------------------------------------------
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    // -- Metrics ------------------------------------------------------------
    #[error("metrics registry error: {0}")]
    Metrics(#[from] prometheus::Error),

    // -- Forwarded errors ---------------------------------------------------
    #[error(transparent)]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    pub fn transport(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transport {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    pub fn decode(context: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            context: context.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failure to hand an alert to the sink. Never retried by the sink itself.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("failed to serialize alert: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook responded with status {status}")]
    Rejected { status: u16 },
}
