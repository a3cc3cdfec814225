//! Server configuration via CLI args and environment variables.

use clap::{ArgAction, Parser, ValueEnum};

/// HTTP proxy that runs DAX query batches against XMLA endpoints.
#[derive(Parser, Debug, Clone)]
#[command(name = "xmla-proxy", version, about)]
pub struct Config {
    /// Bind address.
    #[arg(long, default_value = "0.0.0.0", env = "XMLA_PROXY_HOST")]
    pub host: String,

    /// Bind port.
    #[arg(long, default_value_t = 8080, env = "XMLA_PROXY_PORT")]
    pub port: u16,

    /// CORS allowed origins (comma-separated). Empty for no CORS.
    #[arg(long, env = "XMLA_PROXY_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Vec<String>,

    /// Largest accepted request body in bytes.
    #[arg(long, default_value_t = xmla_http::state::DEFAULT_MAX_BODY_BYTES, env = "XMLA_PROXY_MAX_BODY_BYTES")]
    pub max_body_bytes: usize,

    /// Pretty-print JSON responses.
    #[arg(long, default_value_t = true, action = ArgAction::Set, env = "XMLA_PROXY_PRETTY_JSON")]
    pub pretty_json: bool,

    /// Log level.
    #[arg(long, default_value = "info", env = "XMLA_PROXY_LOG_LEVEL")]
    pub log_level: String,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, env = "XMLA_PROXY_LOG_FORMAT")]
    pub log_format: LogFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Config {
    /// Parses configuration from CLI args and env vars.
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["xmla-proxy"]).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert!(config.cors_origins.is_empty());
        assert!(config.pretty_json);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "xmla-proxy",
            "--port",
            "9000",
            "--cors-origins",
            "https://a.example,https://b.example",
            "--pretty-json",
            "false",
            "--log-format",
            "json",
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.cors_origins.len(), 2);
        assert!(!config.pretty_json);
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
