use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),
    #[error("variable '{0}' is defined more than once")]
    DuplicateVariable(String),
    #[error("variable '{name}' has invalid step {step}; step must be finite and non-zero")]
    InvalidStep { name: String, step: f64 },
    #[error("variable '{name}' has min {min} greater than max {max}")]
    InvertedRange { name: String, min: f64, max: f64 },
    #[error("integer variable '{name}' has non-integral bound {bound}")]
    FractionalBound { name: String, bound: f64 },
    #[error("variable '{name}' has non-finite {field} {value}")]
    NonFinite {
        name: String,
        field: &'static str,
        value: f64,
    },
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is not open")]
    NotOpen,
    #[error("failed to connect to {url}: {source}")]
    Connect {
        url: String,
        #[source]
        source: tokio_tungstenite::tungstenite::Error,
    },
    #[error("invalid transport url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}
