//! API-key resolution for the two external services.
//!
//! Each key is resolved through an ordered lookup chain, first match wins:
//!
//! 1. explicit value on [`crate::config::ReportConfig`]
//! 2. process environment (`OPENAI_API_KEY`, `TAVILY_API_KEY`)
//! 3. a TOML secrets file — `$TRLSCOPE_SECRETS` if set, else
//!    `./secrets.toml`
//!
//! Resolution happens before any HTTP client is constructed, so a missing
//! key fails the run before the first network call.

use crate::error::ReportError;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
pub const TAVILY_KEY_ENV: &str = "TAVILY_API_KEY";
pub const SECRETS_PATH_ENV: &str = "TRLSCOPE_SECRETS";

const DEFAULT_SECRETS_FILE: &str = "secrets.toml";

/// The two resolved API keys.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub openai_api_key: String,
    pub tavily_api_key: String,
}

/// Keys as they appear in the secrets file. Field names mirror the
/// environment variables so one snippet documents both sources:
///
/// ```toml
/// OPENAI_API_KEY = "sk-..."
/// TAVILY_API_KEY = "tvly-..."
/// ```
#[derive(Debug, Default, Deserialize)]
struct SecretsFile {
    #[serde(rename = "OPENAI_API_KEY")]
    openai_api_key: Option<String>,
    #[serde(rename = "TAVILY_API_KEY")]
    tavily_api_key: Option<String>,
}

/// Resolve both keys, or fail naming every key that could not be found.
pub fn resolve(
    explicit_openai: Option<&str>,
    explicit_tavily: Option<&str>,
) -> Result<Credentials, ReportError> {
    let store = read_secrets_file(&secrets_file_path());

    let openai = lookup_chain(
        explicit_openai,
        env_value(OPENAI_KEY_ENV),
        store.openai_api_key.clone(),
    );
    let tavily = lookup_chain(
        explicit_tavily,
        env_value(TAVILY_KEY_ENV),
        store.tavily_api_key.clone(),
    );

    match (openai, tavily) {
        (Some(openai_api_key), Some(tavily_api_key)) => Ok(Credentials {
            openai_api_key,
            tavily_api_key,
        }),
        (openai, tavily) => {
            let mut missing = Vec::new();
            if openai.is_none() {
                missing.push(OPENAI_KEY_ENV);
            }
            if tavily.is_none() {
                missing.push(TAVILY_KEY_ENV);
            }
            Err(ReportError::MissingCredentials {
                hint: format!(
                    "{} not found.\nSet the environment variable(s), or add them to {}.",
                    missing.join(" and "),
                    secrets_file_path().display()
                ),
            })
        }
    }
}

/// First non-empty value wins: explicit → environment → secrets file.
fn lookup_chain(
    explicit: Option<&str>,
    env_value: Option<String>,
    file_value: Option<String>,
) -> Option<String> {
    explicit
        .map(str::to_string)
        .filter(|v| !v.is_empty())
        .or(env_value)
        .or(file_value.filter(|v| !v.is_empty()))
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn secrets_file_path() -> PathBuf {
    std::env::var(SECRETS_PATH_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_SECRETS_FILE))
}

/// A missing or unparseable secrets file is not an error — the chain simply
/// falls through to "not found".
fn read_secrets_file(path: &Path) -> SecretsFile {
    std::fs::read_to_string(path)
        .ok()
        .and_then(|text| toml::from_str(&text).ok())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn explicit_value_beats_env_and_file() {
        let v = lookup_chain(Some("cfg"), Some("env".into()), Some("file".into()));
        assert_eq!(v.as_deref(), Some("cfg"));
    }

    #[test]
    fn env_beats_file() {
        let v = lookup_chain(None, Some("env".into()), Some("file".into()));
        assert_eq!(v.as_deref(), Some("env"));
    }

    #[test]
    fn file_is_last_resort() {
        let v = lookup_chain(None, None, Some("file".into()));
        assert_eq!(v.as_deref(), Some("file"));
    }

    #[test]
    fn empty_strings_do_not_count() {
        let v = lookup_chain(Some(""), None, Some("".into()));
        assert_eq!(v, None);
    }

    #[test]
    fn secrets_file_parses_both_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "OPENAI_API_KEY = \"sk-test\"").unwrap();
        writeln!(file, "TAVILY_API_KEY = \"tvly-test\"").unwrap();

        let store = read_secrets_file(file.path());
        assert_eq!(store.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(store.tavily_api_key.as_deref(), Some("tvly-test"));
    }

    #[test]
    fn missing_secrets_file_yields_defaults() {
        let store = read_secrets_file(Path::new("/definitely/not/a/real/secrets.toml"));
        assert!(store.openai_api_key.is_none());
        assert!(store.tavily_api_key.is_none());
    }

    #[test]
    fn unparseable_secrets_file_yields_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml = = =").unwrap();
        let store = read_secrets_file(file.path());
        assert!(store.openai_api_key.is_none());
    }
}
