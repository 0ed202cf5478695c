use clap::{Parser, ValueEnum};
use std::time::Duration;

// Placeholders the gateway used to ship with. Only accepted behind
// --allow-insecure-defaults.
pub const PLACEHOLDER_API_KEY: &str = "your_api_key";
pub const PLACEHOLDER_OPENAI_API_KEY: &str = "YOUR_OPENAI_API_KEY";

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

// CLI argument structure
#[derive(Parser, Debug, Clone)]
#[command(name = "search-gateway")]
#[command(about = "Prompt-to-search gateway: LLM completion fed into a browser-driven site search")]
pub struct Args {
    // Interface to bind
    #[arg(long, env = "GATEWAY_HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "GATEWAY_PORT", default_value_t = 8000)]
    pub port: u16,

    // Shared secret callers send in X-API-KEY
    #[arg(long, env = "API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    // Credential for the completion service
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_base_url: String,

    // Completion model
    #[arg(short, long, env = "COMPLETION_MODEL", default_value = "gpt-3.5-turbo-instruct")]
    pub model: String,

    // Max tokens generated per prompt
    #[arg(long, default_value_t = 100)]
    pub max_tokens: u32,

    // Rate limit max requests per window
    #[arg(long, default_value_t = 60)]
    pub rate_limit: usize,

    // Rate limit window in seconds
    #[arg(long, default_value_t = 60)]
    pub rate_window: u64,

    // How often idle rate windows are swept, in seconds
    #[arg(long, default_value_t = 60)]
    pub sweep_interval: u64,

    // WebDriver endpoint (chromedriver by default)
    #[arg(long, env = "WEBDRIVER_URL", default_value = "http://localhost:9515")]
    pub webdriver_url: String,

    // Upper bound on live browser sessions
    #[arg(long, default_value_t = 4)]
    pub max_browser_sessions: usize,

    // Completion call timeout in seconds
    #[arg(long, default_value_t = 30)]
    pub completion_timeout: u64,

    // Browser search timeout in seconds
    #[arg(long, default_value_t = 60)]
    pub search_timeout: u64,

    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    // Fall back to placeholder secrets instead of refusing to start
    #[arg(long, default_value_t = false)]
    pub allow_insecure_defaults: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is not set (pass --allow-insecure-defaults to run with a placeholder)")]
    MissingSecret(&'static str),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),
}

// Secrets resolved at startup
#[derive(Debug, Clone)]
pub struct Secrets {
    pub api_key: String,
    pub openai_api_key: String,
    pub insecure: bool,
}

impl Args {
    pub fn rate_window(&self) -> Duration {
        Duration::from_secs(self.rate_window)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("--rate-limit", self.rate_limit as u64),
            ("--rate-window", self.rate_window),
            ("--sweep-interval", self.sweep_interval),
            ("--max-browser-sessions", self.max_browser_sessions as u64),
            ("--completion-timeout", self.completion_timeout),
            ("--search-timeout", self.search_timeout),
        ];
        for (name, value) in checks {
            if value == 0 {
                return Err(ConfigError::Zero(name));
            }
        }
        Ok(())
    }

    pub fn secrets(&self) -> Result<Secrets, ConfigError> {
        let resolve = |value: &Option<String>, name: &'static str, placeholder: &str| {
            match value.as_deref().map(str::trim) {
                Some(v) if !v.is_empty() => Ok((v.to_string(), false)),
                _ if self.allow_insecure_defaults => Ok((placeholder.to_string(), true)),
                _ => Err(ConfigError::MissingSecret(name)),
            }
        };

        let (api_key, a) = resolve(&self.api_key, "API_KEY", PLACEHOLDER_API_KEY)?;
        let (openai_api_key, b) =
            resolve(&self.openai_api_key, "OPENAI_API_KEY", PLACEHOLDER_OPENAI_API_KEY)?;

        Ok(Secrets {
            api_key,
            openai_api_key,
            insecure: a || b,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec!["search-gateway"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_documented_values() {
        let args = parse(&["--api-key", "k", "--openai-api-key", "o"]);
        assert_eq!(args.max_tokens, 100);
        assert_eq!(args.rate_limit, 60);
        assert_eq!(args.rate_window(), Duration::from_secs(60));
        assert_eq!(args.max_browser_sessions, 4);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn explicit_secrets_are_used() {
        let args = parse(&["--api-key", "secret", "--openai-api-key", "sk-test"]);
        let secrets = args.secrets().unwrap();
        assert_eq!(secrets.api_key, "secret");
        assert_eq!(secrets.openai_api_key, "sk-test");
        assert!(!secrets.insecure);
    }

    #[test]
    fn blank_secret_is_rejected_without_opt_in() {
        let args = parse(&["--api-key", "  ", "--openai-api-key", "sk-test"]);
        assert_eq!(args.secrets().unwrap_err(), ConfigError::MissingSecret("API_KEY"));
    }

    #[test]
    fn placeholders_require_opt_in() {
        let args = parse(&[
            "--api-key",
            "",
            "--openai-api-key",
            "",
            "--allow-insecure-defaults",
        ]);
        let secrets = args.secrets().unwrap();
        assert_eq!(secrets.api_key, PLACEHOLDER_API_KEY);
        assert_eq!(secrets.openai_api_key, PLACEHOLDER_OPENAI_API_KEY);
        assert!(secrets.insecure);
    }

    #[test]
    fn zero_budget_is_invalid() {
        let args = parse(&["--rate-limit", "0"]);
        assert_eq!(args.validate().unwrap_err(), ConfigError::Zero("--rate-limit"));
    }
}
