//! Runtime configuration
//!
//! Read once at startup from environment variables:
//!
//! - `TOC_DATABASE_PATH`: libsql database file (default: ~/.toc/database/toc.db)
//! - `TOC_JSON_PATH`: fallback import template (default: study_template.json)
//! - `TOC_SERVER_PORT`: listen port on 127.0.0.1 (default: 8000)
//! - `TOC_IMPORT_MODE`: `replace` or `append` (default: replace)
//! - `TOC_INFER_DOTTED_PARENTS`: derive parents from dotted keys (default: false)
//! - `CORS_ALLOW_ORIGIN`: single allowed origin (default: the Vite dev origins)

use anyhow::{anyhow, Context, Result};
use axum::http::HeaderValue;
use std::path::PathBuf;
use toc_core::{ImportMode, ImportOptions};

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_JSON_PATH: &str = "study_template.json";
const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];

/// Server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_path: PathBuf,
    pub json_path: PathBuf,
    pub port: u16,
    pub import_mode: ImportMode,
    pub infer_dotted_parents: bool,
    pub cors_origins: Vec<HeaderValue>,
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let database_path = match var("TOC_DATABASE_PATH") {
            Some(path) => PathBuf::from(path),
            None => dirs::home_dir()
                .ok_or_else(|| anyhow!("Failed to get home directory"))?
                .join(".toc")
                .join("database")
                .join("toc.db"),
        };

        let port = match var("TOC_SERVER_PORT") {
            Some(port) => port
                .trim()
                .parse::<u16>()
                .with_context(|| format!("Invalid TOC_SERVER_PORT '{}'", port))?,
            None => DEFAULT_PORT,
        };

        let import_mode = match var("TOC_IMPORT_MODE") {
            Some(mode) => mode.parse::<ImportMode>().map_err(|e| anyhow!(e))?,
            None => ImportMode::default(),
        };

        let infer_dotted_parents = var("TOC_INFER_DOTTED_PARENTS")
            .map(|flag| parse_bool_flag(&flag))
            .unwrap_or(false);

        let cors_origins = match var("CORS_ALLOW_ORIGIN") {
            Some(origin) => vec![origin
                .trim()
                .parse::<HeaderValue>()
                .with_context(|| format!("Invalid CORS_ALLOW_ORIGIN '{}'", origin))?],
            None => DEFAULT_CORS_ORIGINS
                .iter()
                .map(|origin| HeaderValue::from_static(origin))
                .collect(),
        };

        Ok(Self {
            database_path,
            json_path: PathBuf::from(
                var("TOC_JSON_PATH").unwrap_or_else(|| DEFAULT_JSON_PATH.to_string()),
            ),
            port,
            import_mode,
            infer_dotted_parents,
            cors_origins,
        })
    }

    /// Defaults with an explicit database path
    pub fn for_database(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            json_path: PathBuf::from(DEFAULT_JSON_PATH),
            port: DEFAULT_PORT,
            import_mode: ImportMode::default(),
            infer_dotted_parents: false,
            cors_origins: DEFAULT_CORS_ORIGINS
                .iter()
                .map(|origin| HeaderValue::from_static(origin))
                .collect(),
        }
    }

    /// Import options for a request, honouring an optional mode override
    pub fn import_options(&self, mode: Option<ImportMode>) -> ImportOptions {
        ImportOptions {
            mode: mode.unwrap_or(self.import_mode),
            infer_dotted_parents: self.infer_dotted_parents,
        }
    }
}

fn parse_bool_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("TOC_DATABASE_PATH", "/tmp/toc.db")]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/toc.db"));
        assert_eq!(config.json_path, PathBuf::from("study_template.json"));
        assert_eq!(config.port, 8000);
        assert_eq!(config.import_mode, ImportMode::Replace);
        assert!(!config.infer_dotted_parents);
        assert_eq!(config.cors_origins.len(), 2);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("TOC_DATABASE_PATH", "/data/toc.db"),
            ("TOC_JSON_PATH", "/data/template.json"),
            ("TOC_SERVER_PORT", "9100"),
            ("TOC_IMPORT_MODE", "append"),
            ("TOC_INFER_DOTTED_PARENTS", "true"),
            ("CORS_ALLOW_ORIGIN", "http://localhost:3000"),
        ])
        .unwrap();

        assert_eq!(config.json_path, PathBuf::from("/data/template.json"));
        assert_eq!(config.port, 9100);
        assert_eq!(config.import_mode, ImportMode::Append);
        assert!(config.infer_dotted_parents);
        assert_eq!(config.cors_origins, vec![HeaderValue::from_static("http://localhost:3000")]);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let db = ("TOC_DATABASE_PATH", "/tmp/x.db");
        assert!(config_from(&[db, ("TOC_SERVER_PORT", "http")]).is_err());
        assert!(config_from(&[db, ("TOC_IMPORT_MODE", "merge")]).is_err());
    }

    #[test]
    fn test_import_options_override() {
        let config = ServerConfig::for_database("/tmp/toc.db");
        assert_eq!(config.import_options(None).mode, ImportMode::Replace);
        assert_eq!(
            config.import_options(Some(ImportMode::Append)).mode,
            ImportMode::Append
        );
    }
}
