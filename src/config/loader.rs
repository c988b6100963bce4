//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::HieConfig;
use super::secret::secret_string;
use crate::domain::errors::HieError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (${VAR} syntax)
/// 3. Parses the TOML into HieConfig
/// 4. Applies environment variable overrides (HIE_* prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns `HieError::Configuration` if the file cannot be read, a referenced
/// variable is unset, parsing fails or validation fails.
///
/// # Examples
///
/// ```no_run
/// use hie_orchestrator::config::loader::load_config;
///
/// let config = load_config("hie-orchestrator.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<HieConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(HieError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        HieError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let contents = substitute_env_vars(&contents)?;

    let mut config: HieConfig = toml::from_str(&contents)
        .map_err(|e| HieError::Configuration(format!("Failed to parse TOML: {}", e)))?;

    apply_env_overrides(&mut config);

    config.validate().map_err(|e| {
        HieError::Configuration(format!("Configuration validation failed: {}", e))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format ${VAR_NAME}
///
/// Comment lines are left untouched.
///
/// # Errors
///
/// Returns an error listing every referenced variable that is not set
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| HieError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut result = String::with_capacity(input.len());
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{}}}", var_name);
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        result.push_str(&processed_line);
        result.push('\n');
    }

    if !missing_vars.is_empty() {
        return Err(HieError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(result)
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Applies environment variable overrides using the HIE_* prefix
///
/// Variables follow the pattern `HIE_<SECTION>_<KEY>`, for example
/// `HIE_CAREQUALITY_BASE_URL` or `HIE_DISCOVERY_STALE_LOOKBACK_HOURS`.
/// Unparseable numeric or boolean values are ignored.
fn apply_env_overrides(config: &mut HieConfig) {
    if let Ok(val) = std::env::var("HIE_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    if let Some(ref mut pg) = config.postgresql {
        if let Ok(val) = std::env::var("HIE_POSTGRESQL_CONNECTION_STRING") {
            pg.connection_string = secret_string(val);
        }
        if let Some(val) = env_parse("HIE_POSTGRESQL_MAX_CONNECTIONS") {
            pg.max_connections = val;
        }
    }

    if let Some(val) = env_parse("HIE_CAREQUALITY_ENABLED") {
        config.carequality.enabled = val;
    }
    if let Ok(val) = std::env::var("HIE_CAREQUALITY_BASE_URL") {
        config.carequality.base_url = val;
    }
    if let Ok(val) = std::env::var("HIE_CAREQUALITY_API_KEY") {
        config.carequality.api_key = Some(secret_string(val));
    }
    if let Some(val) = env_parse("HIE_CAREQUALITY_POLL_INTERVAL_MS") {
        config.carequality.poll_interval_ms = val;
    }
    if let Some(val) = env_parse("HIE_CAREQUALITY_MAX_POLL_SECONDS") {
        config.carequality.max_poll_seconds = val;
    }

    if let Some(val) = env_parse("HIE_COMMONWELL_ENABLED") {
        config.commonwell.enabled = val;
    }
    if let Ok(val) = std::env::var("HIE_COMMONWELL_BASE_URL") {
        config.commonwell.base_url = val;
    }
    if let Ok(val) = std::env::var("HIE_COMMONWELL_API_KEY") {
        config.commonwell.api_key = Some(secret_string(val));
    }
    if let Some(val) = env_parse("HIE_COMMONWELL_MAX_RETRIES") {
        config.commonwell.retry.max_retries = val;
    }

    if let Ok(val) = std::env::var("HIE_DOC_QUERY_BASE_URL") {
        config.doc_query.base_url = val;
    }

    if let Some(val) = env_parse("HIE_DISCOVERY_STALE_LOOKBACK_HOURS") {
        config.discovery.stale_lookback_hours = val;
    }
    if let Some(val) = env_parse("HIE_DISCOVERY_STALE_CHECK_ALL_CX") {
        config.discovery.stale_check_all_cx = val;
    }

    if let Some(val) = env_parse("HIE_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val;
    }
    if let Ok(val) = std::env::var("HIE_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }
}
