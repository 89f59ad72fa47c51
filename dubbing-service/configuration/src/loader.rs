use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::{Table, Value};

use crate::DubbingConfig;

/// Environment overrides look like `DUBBING_SERVICE__SERVICE__JOBS__TIMEOUT_SECS=120`.
pub const ENV_PREFIX: &str = "DUBBING_SERVICE";
const ENV_SEPARATOR: &str = "__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Loads `.env`, then layers defaults, `config/default.toml`,
/// `config/{RUN_ENV}.toml` and `DUBBING_SERVICE__*` variables.
pub fn load_config() -> Result<DubbingConfig, ConfigError> {
    // A missing .env is the normal case outside local development.
    let _ = dotenvy::dotenv();
    let config_dir = std::env::var("DUBBING_CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
    let run_env = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());
    load_config_from(Path::new(&config_dir), &run_env, std::env::vars())
}

pub fn load_config_from(
    config_dir: &Path,
    run_env: &str,
    vars: impl IntoIterator<Item = (String, String)>,
) -> Result<DubbingConfig, ConfigError> {
    let mut merged = Value::try_from(DubbingConfig::default())
        .map_err(|err| ConfigError::Invalid(format!("defaults not serializable: {err}")))?;

    for file in [
        config_dir.join("default.toml"),
        config_dir.join(format!("{run_env}.toml")),
    ] {
        if let Some(layer) = read_layer(&file)? {
            merge(&mut merged, Value::Table(layer));
        }
    }

    let mut hf_token = None;
    for (key, raw) in vars {
        if key == "HF_TOKEN" {
            hf_token = Some(raw);
            continue;
        }
        let Some(path) = env_path(&key) else {
            continue;
        };
        apply_override(&mut merged, &path, &raw)?;
    }

    let mut config: DubbingConfig = merged
        .try_into()
        .map_err(|err: toml::de::Error| ConfigError::Invalid(err.to_string()))?;
    if config.service.speech.hf_token.is_none() {
        config.service.speech.hf_token = hf_token.filter(|token| !token.is_empty());
    }
    validate(&config)?;
    Ok(config)
}

fn read_layer(path: &Path) -> Result<Option<Table>, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    toml::from_str::<Table>(&contents)
        .map(Some)
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
}

fn merge(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Table(base), Value::Table(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn env_path(key: &str) -> Option<Vec<String>> {
    let rest = key.strip_prefix(ENV_PREFIX)?.strip_prefix(ENV_SEPARATOR)?;
    let path: Vec<String> = rest
        .split(ENV_SEPARATOR)
        .map(|segment| segment.to_ascii_lowercase())
        .collect();
    if path.iter().any(String::is_empty) {
        return None;
    }
    Some(path)
}

fn apply_override(root: &mut Value, path: &[String], raw: &str) -> Result<(), ConfigError> {
    let Some((leaf, parents)) = path.split_last() else {
        return Ok(());
    };
    let mut cursor = root;
    for segment in parents {
        let Value::Table(table) = cursor else {
            return Err(ConfigError::Invalid(format!(
                "`{}` is not a section",
                path.join(".")
            )));
        };
        cursor = table
            .entry(segment.clone())
            .or_insert_with(|| Value::Table(Table::new()));
    }
    let Value::Table(table) = cursor else {
        return Err(ConfigError::Invalid(format!(
            "`{}` is not a section",
            path.join(".")
        )));
    };
    let existing = table.get(leaf);
    let value = parse_env_value(raw, existing);
    table.insert(leaf.clone(), value);
    Ok(())
}

/// Reads a TOML scalar when possible. Comma lists fill array-typed keys;
/// anything else stays a string.
fn parse_env_value(raw: &str, existing: Option<&Value>) -> Value {
    if matches!(existing, Some(Value::String(_))) {
        return Value::String(raw.to_string());
    }
    if let Ok(mut table) = toml::from_str::<Table>(&format!("value = {raw}")) {
        if let Some(value) = table.remove("value") {
            return value;
        }
    }
    if matches!(existing, Some(Value::Array(_))) {
        return Value::Array(
            raw.split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| Value::String(item.to_string()))
                .collect(),
        );
    }
    Value::String(raw.to_string())
}

fn validate(config: &DubbingConfig) -> Result<(), ConfigError> {
    let service = &config.service;
    if service.jobs.timeout_secs == 0 {
        return Err(ConfigError::Invalid(
            "service.jobs.timeout_secs must be positive".to_string(),
        ));
    }
    if service.jobs.max_concurrent_jobs == 0 {
        return Err(ConfigError::Invalid(
            "service.jobs.max_concurrent_jobs must be positive".to_string(),
        ));
    }
    if service.rate_limit.window_secs == 0 {
        return Err(ConfigError::Invalid(
            "service.rate_limit.window_secs must be positive".to_string(),
        ));
    }
    if service.gender.fmin_hz <= 0.0 || service.gender.fmin_hz >= service.gender.fmax_hz {
        return Err(ConfigError::Invalid(
            "service.gender pitch band must satisfy 0 < fmin_hz < fmax_hz".to_string(),
        ));
    }
    if service.cloning.output_sample_rate_hz == 0 {
        return Err(ConfigError::Invalid(
            "service.cloning.output_sample_rate_hz must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RateStoreBackend;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config_from(dir.path(), "development", vars(&[])).expect("config");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.service.rate_limit.backend, RateStoreBackend::Memory);
    }

    #[test]
    fn environment_file_overrides_default_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("default.toml"),
            "[server]\nport = 9000\n\n[service.storage]\nbucket = \"videos\"\n",
        )
        .expect("write default");
        std::fs::write(
            dir.path().join("production.toml"),
            "[server]\nport = 9443\n\n[service.rate_limit]\nbackend = \"redis\"\n",
        )
        .expect("write production");

        let config = load_config_from(dir.path(), "production", vars(&[])).expect("config");

        assert_eq!(config.server.port, 9443);
        assert_eq!(config.service.storage.bucket, "videos");
        assert_eq!(config.service.rate_limit.backend, RateStoreBackend::Redis);
        assert_eq!(config.service.storage.result_prefix, "dubbed");
    }

    #[test]
    fn prefixed_variables_override_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config_from(
            dir.path(),
            "development",
            vars(&[
                ("DUBBING_SERVICE__SERVER__PORT", "7000"),
                ("DUBBING_SERVICE__SERVICE__JOBS__WORK_DIR", "/var/jobs"),
                ("DUBBING_SERVICE__SERVICE__CLONING__LANGUAGES", "en, fr"),
                ("DUBBING_SERVICE__SERVICE__STORAGE__BUCKET", "1234"),
                ("HF_TOKEN", "hf_secret"),
                ("UNRELATED", "ignored"),
            ]),
        )
        .expect("config");

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.service.jobs.work_dir, "/var/jobs");
        assert_eq!(config.service.cloning.languages, vec!["en", "fr"]);
        assert_eq!(config.service.storage.bucket, "1234");
        assert_eq!(config.service.speech.hf_token.as_deref(), Some("hf_secret"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = load_config_from(
            dir.path(),
            "development",
            vars(&[("DUBBING_SERVICE__SERVICE__JOBS__TIMEOUT_SECS", "0")]),
        );
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("default.toml"), "[server\nport = ").expect("write");
        let result = load_config_from(dir.path(), "development", vars(&[]));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
