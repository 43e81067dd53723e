//! Configuration loader
//!
//! Resolves [`Settings`] from, in decreasing precedence:
//!
//! 1. `STOCKBRIDGE_*` environment variables (a `.env` file is read first),
//! 2. a config file (JSON or TOML, detected by extension),
//! 3. built-in defaults.
//!
//! ## Environment Variables
//! - `STOCKBRIDGE_DIRECT_ENABLED`: use the direct catalog transport (true/false)
//! - `STOCKBRIDGE_CATALOG_ROOT`, `STOCKBRIDGE_ACCESS_TOKEN`: direct transport credentials
//! - `STOCKBRIDGE_GATEWAY_URL`: root of the local gateway
//! - `STOCKBRIDGE_CACHE_ENABLED`, `STOCKBRIDGE_CACHE_DURATION_MS`, `STOCKBRIDGE_MAX_CACHE_SIZE`
//! - `STOCKBRIDGE_RETRY_ATTEMPTS`, `STOCKBRIDGE_RETRY_DELAY_MS`, `STOCKBRIDGE_TIMEOUT_MS`
//! - `STOCKBRIDGE_BATCH_SIZE`, `STOCKBRIDGE_BATCH_CONCURRENCY`, `STOCKBRIDGE_INTER_BATCH_DELAY_MS`
//! - `STOCKBRIDGE_DEFAULT_BRANCH`, `STOCKBRIDGE_DEFAULT_SOURCE_FILTER`
//! - `STOCKBRIDGE_LOG_LEVEL`, `STOCKBRIDGE_LOG_JSON`
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./stockbridge.toml`, `./stockbridge.json`
//! 2. `./config.toml`, `./config.json`
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use stockbridge_domain::{BridgeError, Result, Settings};
use url::Url;

const FILE_NAMES: [&str; 4] =
    ["stockbridge.toml", "stockbridge.json", "config.toml", "config.json"];

/// Load settings from the environment, the first config file found and the
/// defaults.
///
/// # Errors
/// Returns `BridgeError::Config` if a file or variable cannot be parsed or
/// the resulting settings are invalid.
pub fn load() -> Result<Settings> {
    load_from(None)
}

/// Like [`load`], reading `path` instead of probing for a file.
///
/// # Errors
/// Returns `BridgeError::Config` if `path` does not exist or any source is
/// invalid.
pub fn load_from(path: Option<PathBuf>) -> Result<Settings> {
    match dotenvy::dotenv() {
        Ok(env_file) => tracing::debug!(path = %env_file.display(), "Loaded .env file"),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable .env file"),
    }

    let base = match path {
        Some(path) => load_from_file(Some(path))?,
        None => match probe_config_paths() {
            Some(found) => load_from_file(Some(found))?,
            None => {
                tracing::debug!("No config file found, starting from defaults");
                Settings::default()
            }
        },
    };

    let settings = apply_env(base)?;
    validate(&settings)?;
    tracing::info!(
        direct_enabled = settings.direct_enabled,
        gateway_url = %settings.gateway_url,
        "Configuration loaded"
    );
    Ok(settings)
}

/// Defaults overridden by `STOCKBRIDGE_*` variables only.
///
/// # Errors
/// Returns `BridgeError::Config` if a variable has an invalid value.
pub fn load_from_env() -> Result<Settings> {
    let settings = apply_env(Settings::default())?;
    validate(&settings)?;
    Ok(settings)
}

/// Load settings from a file
///
/// If `path` is `None`, probes the standard locations.
///
/// # Errors
/// Returns `BridgeError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<Settings> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(BridgeError::Config(format!("Config file not found: {}", p.display())));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            BridgeError::Config("No config file found in any of the standard locations".to_string())
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| BridgeError::Config(format!("Failed to read config file: {}", e)))?;

    parse_config(&contents, &config_path)
}

/// Parse settings, detecting the format from the file extension.
fn parse_config(contents: &str, path: &Path) -> Result<Settings> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| BridgeError::Config(format!("Invalid TOML format: {}", e))),
        "json" => serde_json::from_str(contents)
            .map_err(|e| BridgeError::Config(format!("Invalid JSON format: {}", e))),
        _ => Err(BridgeError::Config(format!("Unsupported config format: {}", extension))),
    }
}

/// First existing config file among the standard locations.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();
    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd);
    }
    if let Some(exe_dir) =
        std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        dirs.push(exe_dir);
    }

    dirs.iter()
        .flat_map(|dir| FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

fn apply_env(mut settings: Settings) -> Result<Settings> {
    settings.direct_enabled = env_bool("STOCKBRIDGE_DIRECT_ENABLED", settings.direct_enabled);
    if let Some(root) = env_var("STOCKBRIDGE_CATALOG_ROOT") {
        settings.catalog_root = Some(root);
    }
    if let Some(token) = env_var("STOCKBRIDGE_ACCESS_TOKEN") {
        settings.access_token = Some(token);
    }
    if let Some(gateway) = env_var("STOCKBRIDGE_GATEWAY_URL") {
        settings.gateway_url = gateway;
    }

    settings.cache_enabled = env_bool("STOCKBRIDGE_CACHE_ENABLED", settings.cache_enabled);
    override_parsed(&mut settings.cache_duration_ms, "STOCKBRIDGE_CACHE_DURATION_MS")?;
    override_parsed(&mut settings.max_cache_size, "STOCKBRIDGE_MAX_CACHE_SIZE")?;
    override_parsed(&mut settings.retry_attempts, "STOCKBRIDGE_RETRY_ATTEMPTS")?;
    override_parsed(&mut settings.retry_delay_ms, "STOCKBRIDGE_RETRY_DELAY_MS")?;
    override_parsed(&mut settings.timeout_ms, "STOCKBRIDGE_TIMEOUT_MS")?;
    override_parsed(&mut settings.batch_size, "STOCKBRIDGE_BATCH_SIZE")?;
    override_parsed(&mut settings.batch_concurrency, "STOCKBRIDGE_BATCH_CONCURRENCY")?;
    override_parsed(&mut settings.inter_batch_delay_ms, "STOCKBRIDGE_INTER_BATCH_DELAY_MS")?;

    if let Some(branch) = env_var("STOCKBRIDGE_DEFAULT_BRANCH") {
        settings.default_branch = branch;
    }
    if let Some(source) = env_var("STOCKBRIDGE_DEFAULT_SOURCE_FILTER") {
        settings.default_source_filter = source;
    }
    if let Some(level) = env_var("STOCKBRIDGE_LOG_LEVEL") {
        settings.log_level = level;
    }
    settings.log_json = env_bool("STOCKBRIDGE_LOG_JSON", settings.log_json);
    Ok(settings)
}

/// Structural checks plus URL syntax.
///
/// # Errors
/// Returns `BridgeError::Config` describing the first problem found.
pub fn validate(settings: &Settings) -> Result<()> {
    settings.validate()?;
    Url::parse(&settings.gateway_url).map_err(|e| {
        BridgeError::Config(format!("Invalid gatewayUrl '{}': {}", settings.gateway_url, e))
    })?;
    if let Some(root) = settings.catalog_root.as_deref().filter(|r| !r.trim().is_empty()) {
        Url::parse(root)
            .map_err(|e| BridgeError::Config(format!("Invalid catalogRoot '{}': {}", root, e)))?;
    }
    Ok(())
}

/// Non-empty environment variable.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn override_parsed<T>(slot: &mut T, key: &str) -> Result<()>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = env_var(key) {
        *slot = raw
            .parse()
            .map_err(|e| BridgeError::Config(format!("Invalid value for {}: {}", key, e)))?;
    }
    Ok(())
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::Mutex;

    use once_cell::sync::Lazy;
    use tempfile::NamedTempFile;

    use super::*;

    static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

    const ALL_VARS: [&str; 17] = [
        "STOCKBRIDGE_DIRECT_ENABLED",
        "STOCKBRIDGE_CATALOG_ROOT",
        "STOCKBRIDGE_ACCESS_TOKEN",
        "STOCKBRIDGE_GATEWAY_URL",
        "STOCKBRIDGE_CACHE_ENABLED",
        "STOCKBRIDGE_CACHE_DURATION_MS",
        "STOCKBRIDGE_MAX_CACHE_SIZE",
        "STOCKBRIDGE_RETRY_ATTEMPTS",
        "STOCKBRIDGE_RETRY_DELAY_MS",
        "STOCKBRIDGE_TIMEOUT_MS",
        "STOCKBRIDGE_BATCH_SIZE",
        "STOCKBRIDGE_BATCH_CONCURRENCY",
        "STOCKBRIDGE_INTER_BATCH_DELAY_MS",
        "STOCKBRIDGE_DEFAULT_BRANCH",
        "STOCKBRIDGE_DEFAULT_SOURCE_FILTER",
        "STOCKBRIDGE_LOG_LEVEL",
        "STOCKBRIDGE_LOG_JSON",
    ];

    fn clear_env() {
        for key in ALL_VARS {
            std::env::remove_var(key);
        }
    }

    fn temp_config(contents: &str, extension: &str) -> PathBuf {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(contents.as_bytes()).unwrap();
        let path = temp_file.path().with_extension(extension);
        std::fs::copy(temp_file.path(), &path).unwrap();
        path
    }

    #[test]
    fn test_env_bool_parsing() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");

        std::env::set_var("TEST_SB_BOOL_ON", "On");
        std::env::set_var("TEST_SB_BOOL_OFF", "0");
        assert!(env_bool("TEST_SB_BOOL_ON", false));
        assert!(!env_bool("TEST_SB_BOOL_OFF", true));

        std::env::remove_var("TEST_SB_BOOL_MISSING");
        assert!(env_bool("TEST_SB_BOOL_MISSING", true));

        std::env::remove_var("TEST_SB_BOOL_ON");
        std::env::remove_var("TEST_SB_BOOL_OFF");
    }

    #[test]
    fn test_load_from_env_overrides_defaults() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STOCKBRIDGE_DIRECT_ENABLED", "true");
        std::env::set_var("STOCKBRIDGE_CATALOG_ROOT", "https://shop.example.com");
        std::env::set_var("STOCKBRIDGE_ACCESS_TOKEN", "token-123");
        std::env::set_var("STOCKBRIDGE_BATCH_SIZE", "50");
        std::env::set_var("STOCKBRIDGE_INTER_BATCH_DELAY_MS", "0");

        let settings = load_from_env().unwrap();
        assert!(settings.direct_enabled);
        assert_eq!(settings.catalog_root.as_deref(), Some("https://shop.example.com"));
        assert_eq!(settings.access_token.as_deref(), Some("token-123"));
        assert_eq!(settings.batch_size, 50);
        assert_eq!(settings.inter_batch_delay_ms, 0);
        assert_eq!(settings.retry_attempts, 3);

        clear_env();
    }

    #[test]
    fn test_load_from_env_invalid_number() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STOCKBRIDGE_RETRY_ATTEMPTS", "many");
        let err = load_from_env().unwrap_err();
        assert!(matches!(
            err,
            BridgeError::Config(ref msg) if msg.contains("STOCKBRIDGE_RETRY_ATTEMPTS")
        ));

        clear_env();
    }

    #[test]
    fn test_direct_without_root_is_rejected() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();

        std::env::set_var("STOCKBRIDGE_DIRECT_ENABLED", "1");
        assert!(matches!(load_from_env(), Err(BridgeError::Config(_))));

        clear_env();
    }

    #[test]
    fn test_load_from_file_json() {
        let path =
            temp_config(r#"{ "batchSize": 20, "retryDelay": 250, "cacheEnabled": false }"#, "json");

        let settings = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(settings.batch_size, 20);
        assert_eq!(settings.retry_delay_ms, 250);
        assert!(!settings.cache_enabled);
        assert_eq!(settings.default_branch, "16");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_toml() {
        let path = temp_config(
            "gatewayUrl = \"http://gateway.local:8080\"\ninterBatchDelay = 500\n",
            "toml",
        );

        let settings = load_from_file(Some(path.clone())).unwrap();
        assert_eq!(settings.gateway_url, "http://gateway.local:8080");
        assert_eq!(settings.inter_batch_delay_ms, 500);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_env_beats_file() {
        let _guard = ENV_LOCK.lock().expect("env mutex poisoned");
        clear_env();
        let path = temp_config(r#"{ "batchSize": 20, "defaultBranch": "21" }"#, "json");

        std::env::set_var("STOCKBRIDGE_BATCH_SIZE", "5");
        let settings = load_from(Some(path.clone())).unwrap();
        assert_eq!(settings.batch_size, 5);
        assert_eq!(settings.default_branch, "21");

        clear_env();
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_from_file_not_found() {
        let result = load_from_file(Some(PathBuf::from("/nonexistent/stockbridge.json")));
        assert!(matches!(result, Err(BridgeError::Config(_))));
    }

    #[test]
    fn test_parse_config_unsupported_format() {
        let result = parse_config("batchSize: 3", &PathBuf::from("stockbridge.yaml"));
        assert!(result.is_err(), "Should fail with unsupported format");
    }

    #[test]
    fn test_validate_rejects_bad_urls() {
        let settings = Settings { gateway_url: "not a url".into(), ..Settings::default() };
        assert!(matches!(validate(&settings), Err(BridgeError::Config(_))));
    }
}
