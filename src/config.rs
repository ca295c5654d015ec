use crate::domain::Decimal;
use crate::engine::tax::{ProvisioningTable, TaxTables};
use crate::movements::SettlementRules;
use crate::orchestration::RetryPolicy;
use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub alert_email: String,
    pub alert_webhook_url: Option<String>,
    pub job_max_retries: u32,
    pub job_retry_delay_secs: u64,
    pub delinquency_threshold_pct: Decimal,
    pub report_dir: Option<PathBuf>,
    pub tax: TaxTables,
    pub provisioning: ProvisioningTable,
    pub settlement: SettlementRules,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = parse_or(&env_map, "PORT", 8080u16, "must be a valid u16")?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let alert_email = env_map
            .get("ALERT_EMAIL")
            .cloned()
            .unwrap_or_else(|| "admin@exemplo.com".to_string());

        let alert_webhook_url = non_empty(&env_map, "ALERT_WEBHOOK_URL");
        if let Some(url) = &alert_webhook_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::InvalidValue(
                    "ALERT_WEBHOOK_URL".to_string(),
                    format!("must be an http(s) URL, got {}", url),
                ));
            }
        }

        let job_max_retries = parse_or(&env_map, "JOB_MAX_RETRIES", 3u32, "must be a valid u32")?;
        let job_retry_delay_secs = parse_or(
            &env_map,
            "JOB_RETRY_DELAY_SECS",
            300u64,
            "must be a number of seconds",
        )?;

        let delinquency_threshold_pct = parse_or(
            &env_map,
            "DELINQUENCY_THRESHOLD_PCT",
            Decimal::from(5),
            "must be a decimal percentage",
        )?;
        if delinquency_threshold_pct.is_sign_negative() {
            return Err(ConfigError::InvalidValue(
                "DELINQUENCY_THRESHOLD_PCT".to_string(),
                "must not be negative".to_string(),
            ));
        }

        let report_dir = non_empty(&env_map, "REPORT_DIR").map(PathBuf::from);

        Ok(Config {
            port,
            database_path,
            alert_email,
            alert_webhook_url,
            job_max_retries,
            job_retry_delay_secs,
            delinquency_threshold_pct,
            report_dir,
            tax: TaxTables::default(),
            provisioning: ProvisioningTable::default(),
            settlement: SettlementRules::default(),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.job_max_retries,
            Duration::from_secs(self.job_retry_delay_secs),
        )
    }
}

fn parse_or<T: FromStr>(
    env_map: &HashMap<String, String>,
    key: &str,
    default: T,
    expected: &str,
) -> Result<T, ConfigError> {
    match env_map.get(key) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue(key.to_string(), expected.to_string())),
    }
}

fn non_empty(env_map: &HashMap<String, String>, key: &str) -> Option<String> {
    env_map
        .get(key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.alert_email, "admin@exemplo.com");
        assert!(config.alert_webhook_url.is_none());
        assert_eq!(config.delinquency_threshold_pct, dec!(5));
        assert!(config.report_dir.is_none());

        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay, Duration::from_secs(300));
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        let result = Config::from_env_map(env_map);
        match result {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_threshold() {
        let mut env_map = setup_required_env();
        env_map.insert("DELINQUENCY_THRESHOLD_PCT".to_string(), "-1".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "DELINQUENCY_THRESHOLD_PCT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_invalid_webhook_url() {
        let mut env_map = setup_required_env();
        env_map.insert("ALERT_WEBHOOK_URL".to_string(), "smtp.local".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "ALERT_WEBHOOK_URL"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_overrides() {
        let mut env_map = setup_required_env();
        env_map.insert("JOB_MAX_RETRIES".to_string(), "0".to_string());
        env_map.insert("JOB_RETRY_DELAY_SECS".to_string(), "1".to_string());
        env_map.insert("DELINQUENCY_THRESHOLD_PCT".to_string(), "7.5".to_string());
        env_map.insert("REPORT_DIR".to_string(), "/var/reports".to_string());
        env_map.insert("ALERT_WEBHOOK_URL".to_string(), " ".to_string());

        let config = Config::from_env_map(env_map).unwrap();
        assert_eq!(config.job_max_retries, 0);
        assert_eq!(config.retry_policy().delay, Duration::from_secs(1));
        assert_eq!(config.delinquency_threshold_pct, dec!(7.5));
        assert_eq!(config.report_dir, Some(PathBuf::from("/var/reports")));
        assert!(config.alert_webhook_url.is_none());
    }
}
