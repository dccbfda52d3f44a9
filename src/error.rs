use thiserror::Error;

/// Failures that prevent the export loop from starting.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("invalid host url '{host}': {source}")]
    InvalidHost {
        host: String,
        #[source]
        source: url::ParseError,
    },
    #[error("unsupported url scheme '{0}', expected http or https")]
    UnsupportedScheme(String),
    #[error("database name must not be empty")]
    EmptyDatabase,
    #[error("export interval must be non-zero")]
    ZeroInterval,
}

/// A failed batch submission. Never fatal to the export loop.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("influxdb responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("transport error: {0}")]
    Transport(#[source] Box<ureq::Transport>),
}
