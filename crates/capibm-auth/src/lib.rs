//! capibm-auth
//!
//! Credential configuration for IBM Cloud. Only IAM API keys are
//! supported; every other authenticator kind is rejected when the
//! configuration is loaded, before any resource operation runs.

pub mod credentials;
pub mod error;

pub use crate::credentials::{CredentialSource, load_credentials};
pub use crate::error::AuthError;
