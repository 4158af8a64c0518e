//! Endpoint and credentials for the Climate Data Store.
//!
//! Resolution follows the official `cdsapi` client: explicit values first, then the
//! `CDSAPI_URL` / `CDSAPI_KEY` environment variables, then the rc file named by
//! `CDSAPI_RC` or `~/.cdsapirc`.

use crate::fetch::error::FetchError;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CDS_URL: &str = "https://cds.climate.copernicus.eu/api";
const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(120);

const ENV_URL: &str = "CDSAPI_URL";
const ENV_KEY: &str = "CDSAPI_KEY";
const ENV_RC: &str = "CDSAPI_RC";
const RC_FILE_NAME: &str = ".cdsapirc";

/// Connection settings for [`crate::CdsClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct CdsConfig {
    /// Base API URL, e.g. `https://cds.climate.copernicus.eu/api`.
    pub url: String,
    /// Personal access token, sent as `PRIVATE-TOKEN`.
    pub key: String,
    /// Upper bound for the growing delay between job status checks.
    pub max_poll_interval: Duration,
}

#[derive(Debug, Default, PartialEq)]
struct RcEntries {
    url: Option<String>,
    key: Option<String>,
}

impl CdsConfig {
    pub fn new(url: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: key.into(),
            max_poll_interval: DEFAULT_MAX_POLL_INTERVAL,
        }
    }

    pub fn with_max_poll_interval(mut self, max_poll_interval: Duration) -> Self {
        self.max_poll_interval = max_poll_interval;
        self
    }

    /// Reads the configuration from the environment and the rc file.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::MissingApiKey`] if no key is found anywhere, and
    /// [`FetchError::ConfigRead`] if the rc file exists but cannot be read.
    pub fn from_env() -> Result<Self, FetchError> {
        Self::resolve(
            env::var(ENV_URL).ok(),
            env::var(ENV_KEY).ok(),
            Self::rc_path().as_deref(),
        )
    }

    fn rc_path() -> Option<PathBuf> {
        env::var_os(ENV_RC)
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(RC_FILE_NAME)))
    }

    fn resolve(
        url: Option<String>,
        key: Option<String>,
        rc_path: Option<&Path>,
    ) -> Result<Self, FetchError> {
        let mut url = url.filter(|value| !value.trim().is_empty());
        let mut key = key.filter(|value| !value.trim().is_empty());

        if url.is_none() || key.is_none() {
            if let Some(path) = rc_path.filter(|path| path.is_file()) {
                let contents = std::fs::read_to_string(path)
                    .map_err(|e| FetchError::ConfigRead(path.to_path_buf(), e))?;
                let entries = parse_rc(&contents);
                url = url.or(entries.url);
                key = key.or(entries.key);
            }
        }

        let key = key.ok_or(FetchError::MissingApiKey)?;
        let url = url.unwrap_or_else(|| DEFAULT_CDS_URL.to_string());
        Ok(Self::new(url, key))
    }
}

/// Parses `name: value` lines; only `url` and `key` are kept.
fn parse_rc(contents: &str) -> RcEntries {
    let mut entries = RcEntries::default();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        if value.is_empty() {
            continue;
        }
        match name.trim() {
            "url" => entries.url = Some(value.to_string()),
            "key" => entries.key = Some(value.to_string()),
            _ => {}
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_rc_skips_comments_and_unknown_keys() {
        let entries = parse_rc(
            "# personal token\n\nurl: https://cds.example.org/api\nkey: 'abcd-1234'\nverify: 0\n",
        );
        assert_eq!(
            entries,
            RcEntries {
                url: Some("https://cds.example.org/api".to_string()),
                key: Some("abcd-1234".to_string()),
            }
        );
    }

    #[test]
    fn test_explicit_values_win_over_rc_file() -> Result<(), FetchError> {
        let mut rc = NamedTempFile::new().unwrap();
        writeln!(rc, "url: https://rc.example.org/api\nkey: rc-key").unwrap();

        let config = CdsConfig::resolve(
            Some("https://env.example.org/api".to_string()),
            Some("env-key".to_string()),
            Some(rc.path()),
        )?;
        assert_eq!(config.url, "https://env.example.org/api");
        assert_eq!(config.key, "env-key");
        Ok(())
    }

    #[test]
    fn test_rc_file_fills_missing_values() -> Result<(), FetchError> {
        let mut rc = NamedTempFile::new().unwrap();
        writeln!(rc, "key: rc-key").unwrap();

        let config = CdsConfig::resolve(None, Some(String::new()), Some(rc.path()))?;
        assert_eq!(config.url, DEFAULT_CDS_URL);
        assert_eq!(config.key, "rc-key");
        assert_eq!(config.max_poll_interval, Duration::from_secs(120));
        Ok(())
    }

    #[test]
    fn test_missing_key_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-rc");
        let result = CdsConfig::resolve(None, None, Some(&missing));
        assert!(matches!(result, Err(FetchError::MissingApiKey)));
    }
}
