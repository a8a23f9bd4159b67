use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

/// Web server settings. Every flag can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "sheet-review", version, about = "Review spreadsheet rows one at a time")]
pub struct Config {
    /// Address to listen on
    #[arg(long, env = "SHEET_REVIEW_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Largest accepted upload, in megabytes
    #[arg(long, env = "SHEET_REVIEW_MAX_UPLOAD_MB", default_value_t = 25)]
    pub max_upload_mb: usize,

    /// Minutes a browser session may stay idle before it is dropped
    #[arg(long, env = "SHEET_REVIEW_SESSION_TTL_MINS", default_value_t = 240)]
    pub session_ttl_mins: u64,

    /// Default log filter; RUST_LOG takes precedence
    #[arg(long, env = "SHEET_REVIEW_LOG", default_value = "info")]
    pub log_level: String,
}

impl Config {
    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_mins.saturating_mul(60))
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            max_upload_mb: 25,
            session_ttl_mins: 240,
            log_level: "info".to_string(),
        }
    }
}

/// Initialise env_logger with `default_level` unless RUST_LOG is set
pub fn init_logging(default_level: &str) {
    let env = env_logger::Env::default().default_filter_or(default_level);
    // A second init (tests, embedding) is harmless
    let _ = env_logger::Builder::from_env(env).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["sheet-review"]).unwrap();
        assert_eq!(config.bind.port(), 3000);
        assert_eq!(config.max_upload_bytes(), 25 * 1024 * 1024);
        assert_eq!(config.session_ttl(), Duration::from_secs(240 * 60));
    }

    #[test]
    fn test_flags() {
        let config = Config::try_parse_from([
            "sheet-review",
            "--bind",
            "0.0.0.0:8080",
            "--max-upload-mb",
            "2",
            "--session-ttl-mins",
            "5",
        ])
        .unwrap();
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.max_upload_bytes(), 2 * 1024 * 1024);
        assert_eq!(config.session_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_bad_address_rejected() {
        assert!(Config::try_parse_from(["sheet-review", "--bind", "nowhere"]).is_err());
    }
}
