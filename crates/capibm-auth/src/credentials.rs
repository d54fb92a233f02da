use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Prefix of every credential property, e.g. `IBMCLOUD_APIKEY`.
pub const SERVICE_PREFIX: &str = "IBMCLOUD";

/// Environment variable naming an explicit credential file.
pub const CREDENTIALS_FILE_ENV: &str = "IBM_CREDENTIALS_FILE";

/// File name searched for in the home and working directories.
pub const CREDENTIALS_FILE_NAME: &str = "ibm-credentials.env";

/// Supported credential kinds. Anything not listed here is rejected at
/// load time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSource {
    Iam {
        api_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        auth_url: Option<String>,
    },
}

impl CredentialSource {
    /// Redacted description safe to log.
    pub fn hint(&self) -> String {
        match self {
            CredentialSource::Iam { api_key, auth_url } => {
                let url = auth_url.as_deref().unwrap_or("default endpoint");
                format!("iam ({}, {url})", redact(api_key))
            }
        }
    }

    /// Build a source from `IBMCLOUD_*` properties.
    ///
    /// A missing auth type defaults to IAM when an API key is present.
    pub fn from_properties(props: &BTreeMap<String, String>) -> Result<Self, AuthError> {
        let get = |suffix: &str| {
            props
                .get(&format!("{SERVICE_PREFIX}_{suffix}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(auth_type) = get("AUTH_TYPE")
            && !auth_type.eq_ignore_ascii_case("iam")
        {
            return Err(AuthError::UnsupportedAuthType(auth_type));
        }

        let api_key = get("APIKEY")
            .or_else(|| get("API_KEY"))
            .ok_or_else(|| AuthError::MissingProperty(format!("{SERVICE_PREFIX}_APIKEY")))?;

        Ok(CredentialSource::Iam {
            api_key,
            auth_url: get("AUTH_URL"),
        })
    }
}

/// Load credentials from the environment of this process.
///
/// Search order: `$IBM_CREDENTIALS_FILE`, `<home>/ibm-credentials.env`,
/// `<cwd>/ibm-credentials.env`, then process environment variables.
pub fn load_credentials() -> Result<CredentialSource, AuthError> {
    let vars: BTreeMap<String, String> = std::env::vars()
        .filter(|(k, _)| k.starts_with(SERVICE_PREFIX) || k == CREDENTIALS_FILE_ENV)
        .collect();
    let cwd = std::env::current_dir().ok();
    load_from(&vars, dirs::home_dir().as_deref(), cwd.as_deref())
}

/// Same as [`load_credentials`] with the environment passed in explicitly.
pub fn load_from(
    env: &BTreeMap<String, String>,
    home: Option<&Path>,
    cwd: Option<&Path>,
) -> Result<CredentialSource, AuthError> {
    for path in search_path(env, home, cwd) {
        if !path.is_file() {
            continue;
        }
        let contents = std::fs::read_to_string(&path).map_err(|source| AuthError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let source = CredentialSource::from_properties(&parse_env_file(&contents))?;
        tracing::info!(
            path = %path.display(),
            credential = %source.hint(),
            "loaded credentials from file"
        );
        return Ok(source);
    }

    let source = CredentialSource::from_properties(env)?;
    tracing::info!(credential = %source.hint(), "loaded credentials from environment");
    Ok(source)
}

fn search_path(
    env: &BTreeMap<String, String>,
    home: Option<&Path>,
    cwd: Option<&Path>,
) -> Vec<PathBuf> {
    let mut paths = Vec::with_capacity(3);
    if let Some(explicit) = env.get(CREDENTIALS_FILE_ENV).filter(|p| !p.is_empty()) {
        paths.push(PathBuf::from(explicit));
    }
    if let Some(home) = home {
        paths.push(home.join(CREDENTIALS_FILE_NAME));
    }
    if let Some(cwd) = cwd {
        paths.push(cwd.join(CREDENTIALS_FILE_NAME));
    }
    paths
}

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped;
/// surrounding quotes on values are stripped.
pub fn parse_env_file(contents: &str) -> BTreeMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .map(|(k, v)| {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|s| s.strip_suffix('"'))
                .unwrap_or(v);
            (k.trim().to_string(), v.to_string())
        })
        .collect()
}

fn redact(key: &str) -> String {
    if key.chars().count() <= 8 {
        return "****".to_string();
    }
    let prefix: String = key.chars().take(4).collect();
    let mut suffix: Vec<char> = key.chars().rev().take(4).collect();
    suffix.reverse();
    let suffix: String = suffix.into_iter().collect();
    format!("{prefix}...{suffix}")
}
