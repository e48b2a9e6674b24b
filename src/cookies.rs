//! Cookie persistence for Google Scholar sessions.
//!
//! Scholar answers anonymous traffic with CAPTCHAs fairly quickly; cookies
//! exported from a browser session are stored here and attached by the HTTP
//! fetcher to every Scholar request.

use crate::error::{LeadsError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const COOKIE_FILE: &str = ".scholarleads_cookies.json";

/// Default cookie file path: `~/.scholarleads_cookies.json`
fn default_cookie_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(COOKIE_FILE))
        .ok_or_else(|| LeadsError::Config("Cannot determine home directory".to_string()))
}

/// Cookie entry in the browser export format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, alias = "httpOnly")]
    pub http_only: bool,
    #[serde(default, alias = "expirationDate")]
    pub expires: Option<f64>,
}

/// Loads and stores the cookie file
pub struct CookieManager {
    path: PathBuf,
}

impl CookieManager {
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_cookie_path()?,
        })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// The given cookie file, or the default one under the home directory.
    pub fn resolve(path: Option<PathBuf>) -> Self {
        path.map(Self::with_path).unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load cookies from file
    ///
    /// Returns empty vec if file doesn't exist or is invalid
    pub fn load(&self) -> Vec<Cookie> {
        if !self.path.exists() {
            debug!("Cookie file not found: {:?}", self.path);
            return Vec::new();
        }

        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<Vec<Cookie>>(&content) {
                Ok(cookies) => cookies,
                Err(e) => {
                    warn!("Failed to parse cookies: {}", e);
                    Vec::new()
                }
            },
            Err(e) => {
                warn!("Failed to read cookie file: {}", e);
                Vec::new()
            }
        }
    }

    /// `Cookie:` header value for cookies whose domain contains `domain`.
    pub fn header_for(&self, domain: &str) -> String {
        self.load()
            .iter()
            .filter(|c| c.domain.contains(domain))
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn save(&self, cookies: &[Cookie]) -> Result<()> {
        let content = serde_json::to_string_pretty(cookies)?;
        std::fs::write(&self.path, content)?;
        info!("Saved {} cookies to {:?}", cookies.len(), self.path);
        Ok(())
    }

    /// Validate and store a browser cookie export.
    pub fn import(&self, source: &Path) -> Result<usize> {
        let content = std::fs::read_to_string(source)?;
        let cookies: Vec<Cookie> = serde_json::from_str(&content)?;
        if cookies.is_empty() {
            return Err(LeadsError::Validation(format!(
                "No cookies found in {:?}",
                source
            )));
        }
        self.save(&cookies)?;
        Ok(cookies.len())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("Cleared cookies at {:?}", self.path);
        }
        Ok(())
    }
}

impl Default for CookieManager {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self {
            path: PathBuf::from(COOKIE_FILE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn cookie(name: &str, domain: &str) -> Cookie {
        Cookie {
            name: name.to_string(),
            value: format!("{}-value", name),
            domain: domain.to_string(),
            path: "/".to_string(),
            secure: true,
            http_only: false,
            expires: None,
        }
    }

    #[test]
    fn test_load_missing_file() {
        let manager = CookieManager::with_path(PathBuf::from("/nonexistent/path"));
        assert!(manager.load().is_empty());
        assert_eq!(manager.header_for("google"), "");
    }

    #[test]
    fn test_header_filters_domain() -> Result<()> {
        let temp = NamedTempFile::new()?;
        let manager = CookieManager::with_path(temp.path().to_path_buf());
        manager.save(&[cookie("NID", ".google.com"), cookie("other", ".example.com")])?;

        assert_eq!(manager.header_for("google"), "NID=NID-value");
        Ok(())
    }

    #[test]
    fn test_import_browser_export() -> Result<()> {
        let mut export = NamedTempFile::new()?;
        write!(
            export,
            r#"[{{"name":"GSP","value":"x","domain":".scholar.google.com","httpOnly":true}}]"#
        )?;
        let target = NamedTempFile::new()?;
        let manager = CookieManager::with_path(target.path().to_path_buf());

        assert_eq!(manager.import(export.path())?, 1);
        let loaded = manager.load();
        assert!(loaded[0].http_only);
        assert_eq!(loaded[0].domain, ".scholar.google.com");
        Ok(())
    }

    #[test]
    fn test_resolve_custom_path() -> Result<()> {
        let mut export = NamedTempFile::new()?;
        write!(export, r#"[{{"name":"NID","value":"n","domain":".google.com"}}]"#)?;
        let target = NamedTempFile::new()?;

        let manager = CookieManager::resolve(Some(target.path().to_path_buf()));
        assert_eq!(manager.path(), target.path());
        manager.import(export.path())?;

        let reopened = CookieManager::with_path(target.path().to_path_buf());
        assert_eq!(reopened.header_for("google"), "NID=n");

        assert_eq!(CookieManager::resolve(None).path(), CookieManager::default().path());
        Ok(())
    }

    #[test]
    fn test_import_rejects_empty() -> Result<()> {
        let mut export = NamedTempFile::new()?;
        write!(export, "[]")?;
        let manager = CookieManager::with_path(PathBuf::from("/nonexistent/cookies.json"));
        assert!(matches!(manager.import(export.path()), Err(LeadsError::Validation(_))));
        Ok(())
    }
}
