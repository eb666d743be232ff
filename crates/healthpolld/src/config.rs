//! Daemon configuration: an optional TOML file overlaid by command-line
//! options.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use healthpoll_probe::{DEFAULT_MAX_DELAY, DEFAULT_SERVICE};

/// Contents of the config file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub endpoints: Vec<String>,
    pub service: Option<String>,
    pub max_delay_ms: Option<u64>,
    pub diagnostics: Option<bool>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Effective settings after merging file and command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Endpoint addresses in the order given: file first, then arguments.
    pub endpoints: Vec<String>,
    pub service: String,
    pub max_delay: Duration,
    pub diagnostics: bool,
}

/// Command-line values that take part in the merge.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoints: Vec<String>,
    pub service: Option<String>,
    pub max_delay_ms: Option<u64>,
    pub no_diagnostics: bool,
}

impl Settings {
    pub fn merge(file: FileConfig, cli: Overrides) -> Self {
        let mut endpoints = file.endpoints;
        endpoints.extend(cli.endpoints);

        let max_delay = cli
            .max_delay_ms
            .or(file.max_delay_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_MAX_DELAY);

        Self {
            endpoints,
            service: cli
                .service
                .or(file.service)
                .unwrap_or_else(|| DEFAULT_SERVICE.to_string()),
            max_delay,
            diagnostics: !cli.no_diagnostics && file.diagnostics.unwrap_or(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_file_or_flags() {
        let settings = Settings::merge(FileConfig::default(), Overrides::default());
        assert!(settings.endpoints.is_empty());
        assert_eq!(settings.service, "live");
        assert_eq!(settings.max_delay, Duration::from_secs(1200));
        assert!(settings.diagnostics);
    }

    #[test]
    fn parse_full_file() {
        let file = FileConfig::parse(
            r#"
endpoints = ["http://10.0.0.1:50051", "https://api.example.com"]
service = "ready"
max_delay_ms = 60000
diagnostics = false
"#,
        )
        .unwrap();

        assert_eq!(file.endpoints.len(), 2);
        assert_eq!(file.service.as_deref(), Some("ready"));
        assert_eq!(file.max_delay_ms, Some(60_000));
        assert_eq!(file.diagnostics, Some(false));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::parse("endpoint = \"a:1\"").is_err());
    }

    #[test]
    fn command_line_appends_endpoints_and_overrides_scalars() {
        let file = FileConfig {
            endpoints: vec!["a:1".into()],
            service: Some("ready".into()),
            max_delay_ms: Some(5_000),
            diagnostics: Some(true),
        };
        let cli = Overrides {
            endpoints: vec!["b:2".into()],
            service: None,
            max_delay_ms: Some(1_000),
            no_diagnostics: true,
        };

        let settings = Settings::merge(file, cli);
        assert_eq!(settings.endpoints, vec!["a:1", "b:2"]);
        assert_eq!(settings.service, "ready");
        assert_eq!(settings.max_delay, Duration::from_secs(1));
        assert!(!settings.diagnostics);
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = FileConfig::from_file(Path::new("/nonexistent/healthpoll.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("reading config file"));
    }
}
