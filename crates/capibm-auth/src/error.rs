use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("only IAM authenticator is supported, got auth type {0:?}")]
    UnsupportedAuthType(String),

    #[error("missing credential property: {0}")]
    MissingProperty(String),

    #[error("failed to read credential file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
