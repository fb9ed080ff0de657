/// Runtime settings resolution
///
/// Precedence: command-line flag, then environment (including .env), then
/// ~/.config/dockmon/config.toml, then the default compiled in by build.rs.

use anyhow::{anyhow, bail, Context, Result};
use std::fmt;
use std::time::Duration;

use crate::core::poller::MIN_POLL_INTERVAL;
use crate::utils::{
    AppConfig, BUILD_DEFAULT_API_BASE_URL, DEFAULT_POINTS_PER_HOST, DEFAULT_POLL_INTERVAL_MS, MAX_POINTS_PER_HOST,
    ENV_API_BASE_URL, ENV_POLL_INTERVAL,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Flag,
    Environment,
    ConfigFile,
    Default,
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValueSource::Flag => "command line",
            ValueSource::Environment => "environment",
            ValueSource::ConfigFile => "config file",
            ValueSource::Default => "built-in default",
        };
        f.write_str(label)
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub api_base_url: Option<String>,
    pub poll_interval: Option<String>,
    pub points_per_host: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_base_url: String,
    pub api_base_url_source: ValueSource,
    pub poll_interval: Duration,
    pub poll_interval_source: ValueSource,
    pub points_per_host: usize,
}

/// Parse "5s", "1500ms", "1m" or a bare number of milliseconds
pub fn parse_interval(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let interval = match raw.parse::<u64>() {
        Ok(ms) => Duration::from_millis(ms),
        Err(_) => humantime::parse_duration(raw)
            .with_context(|| format!("Invalid poll interval `{}`", raw))?,
    };

    if interval < MIN_POLL_INTERVAL {
        bail!(
            "Poll interval {} is below the minimum of {}",
            humantime::format_duration(interval),
            humantime::format_duration(MIN_POLL_INTERVAL)
        );
    }

    Ok(interval)
}

fn normalize_url(raw: &str) -> Result<String> {
    let url = raw.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(anyhow!("API base URL must start with http:// or https:// (got `{}`)", raw));
    }
    Ok(url.to_string())
}

fn pick<T>(flag: Option<T>, env: Option<T>, file: Option<T>) -> Option<(T, ValueSource)> {
    flag.map(|v| (v, ValueSource::Flag))
        .or_else(|| env.map(|v| (v, ValueSource::Environment)))
        .or_else(|| file.map(|v| (v, ValueSource::ConfigFile)))
}

impl Settings {
    /// Resolve settings from explicit sources; `env` looks up a variable
    pub fn resolve<F>(overrides: &SettingsOverrides, env: F, file: &AppConfig) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |v: String| if v.trim().is_empty() { None } else { Some(v) };

        let (raw_url, api_base_url_source) = pick(
            overrides.api_base_url.clone(),
            env(ENV_API_BASE_URL).and_then(non_empty),
            file.api_base_url.clone(),
        )
        .unwrap_or_else(|| (BUILD_DEFAULT_API_BASE_URL.to_string(), ValueSource::Default));
        let api_base_url = normalize_url(&raw_url)?;

        let (poll_interval, poll_interval_source) = match pick(
            overrides.poll_interval.clone(),
            env(ENV_POLL_INTERVAL).and_then(non_empty),
            file.poll_interval.clone(),
        ) {
            Some((raw, source)) => (
                parse_interval(&raw).with_context(|| format!("from {}", source))?,
                source,
            ),
            None => (Duration::from_millis(DEFAULT_POLL_INTERVAL_MS), ValueSource::Default),
        };

        let points_per_host = overrides
            .points_per_host
            .or(file.points_per_host)
            .unwrap_or(DEFAULT_POINTS_PER_HOST);
        if points_per_host == 0 {
            bail!("points per host must be at least 1");
        }
        if points_per_host > MAX_POINTS_PER_HOST {
            bail!("points per host must be at most {}", MAX_POINTS_PER_HOST);
        }

        Ok(Self {
            api_base_url,
            api_base_url_source,
            poll_interval,
            poll_interval_source,
            points_per_host,
        })
    }

    /// Resolve from the process environment and the user config file
    pub fn load(overrides: &SettingsOverrides) -> Result<Self> {
        // A missing .env is fine
        dotenv::dotenv().ok();

        let file = match AppConfig::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable config file");
                AppConfig::default()
            }
        };

        Self::resolve(overrides, |key| std::env::var(key).ok(), &file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&SettingsOverrides::default(), env_of(&[]), &AppConfig::default()).unwrap();
        assert_eq!(settings.api_base_url, BUILD_DEFAULT_API_BASE_URL.trim_end_matches('/'));
        assert_eq!(settings.api_base_url_source, ValueSource::Default);
        assert_eq!(settings.poll_interval, Duration::from_millis(5000));
        assert_eq!(settings.points_per_host, 20);
    }

    #[test]
    fn test_precedence_flag_env_file() {
        let file = AppConfig {
            api_base_url: Some("http://file:9090".to_string()),
            poll_interval: Some("10s".to_string()),
            points_per_host: Some(30),
        };
        let env = env_of(&[("DOCKMON_API_BASE_URL", "http://env:9090/")]);

        let settings = Settings::resolve(&SettingsOverrides::default(), &env, &file).unwrap();
        assert_eq!(settings.api_base_url, "http://env:9090");
        assert_eq!(settings.api_base_url_source, ValueSource::Environment);
        assert_eq!(settings.poll_interval, Duration::from_secs(10));
        assert_eq!(settings.poll_interval_source, ValueSource::ConfigFile);
        assert_eq!(settings.points_per_host, 30);

        let overrides = SettingsOverrides {
            api_base_url: Some("https://flag".to_string()),
            poll_interval: Some("750ms".to_string()),
            points_per_host: None,
        };
        let settings = Settings::resolve(&overrides, &env, &file).unwrap();
        assert_eq!(settings.api_base_url, "https://flag");
        assert_eq!(settings.api_base_url_source, ValueSource::Flag);
        assert_eq!(settings.poll_interval, Duration::from_millis(750));
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let file = AppConfig {
            api_base_url: Some("http://file:9090".to_string()),
            ..AppConfig::default()
        };
        let settings = Settings::resolve(
            &SettingsOverrides::default(),
            env_of(&[("DOCKMON_API_BASE_URL", "  ")]),
            &file,
        )
        .unwrap();
        assert_eq!(settings.api_base_url_source, ValueSource::ConfigFile);
    }

    #[test]
    fn test_rejects_bad_values() {
        let bad_url = SettingsOverrides {
            api_base_url: Some("prometheus:9090".to_string()),
            ..SettingsOverrides::default()
        };
        assert!(Settings::resolve(&bad_url, env_of(&[]), &AppConfig::default()).is_err());

        let zero_points = SettingsOverrides {
            points_per_host: Some(0),
            ..SettingsOverrides::default()
        };
        assert!(Settings::resolve(&zero_points, env_of(&[]), &AppConfig::default()).is_err());
    }

    #[test]
    fn test_points_per_host_upper_limit() {
        let at_limit = SettingsOverrides {
            points_per_host: Some(MAX_POINTS_PER_HOST),
            ..SettingsOverrides::default()
        };
        let settings = Settings::resolve(&at_limit, env_of(&[]), &AppConfig::default()).unwrap();
        assert_eq!(settings.points_per_host, MAX_POINTS_PER_HOST);

        let file = AppConfig {
            points_per_host: Some(usize::MAX),
            ..AppConfig::default()
        };
        let err = Settings::resolve(&SettingsOverrides::default(), env_of(&[]), &file).unwrap_err();
        assert!(err.to_string().contains("at most"));
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_interval("2500").unwrap(), Duration::from_millis(2500));
        assert!(parse_interval("10ms").is_err());
        assert!(parse_interval("soon").is_err());
    }
}
