use std::{env, fmt, path::PathBuf, time::Duration};

/// Deployment flavour. Only affects defaults and how metadata write failures are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            _ => Environment::Development,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub metadata_dir: PathBuf,
    pub blob_dir: PathBuf,
    pub public_base_url: String,
    pub blob_api_url: Option<String>,
    pub blob_token: Option<String>,
    pub cleanup_secret: Option<String>,
    pub retention: Duration,
    pub max_file_size: usize,
    pub cors_origins: Vec<String>,
    pub request_timeout_seconds: u64,
    pub cleanup_interval_seconds: Option<u64>,
}

pub const DEFAULT_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            environment: Environment::Development,
            metadata_dir: PathBuf::from("data/metadata"),
            blob_dir: PathBuf::from("data/blobs"),
            public_base_url: "http://localhost:3000".to_string(),
            blob_api_url: None,
            blob_token: None,
            cleanup_secret: None,
            retention: DEFAULT_RETENTION,
            max_file_size: 50 * 1024 * 1024, // 50MB
            cors_origins: vec!["*".to_string()],
            request_timeout_seconds: 30,
            cleanup_interval_seconds: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(app_env) = env::var("APP_ENV") {
            config.environment = Environment::parse(&app_env);
        }

        if config.environment == Environment::Production {
            config.metadata_dir = PathBuf::from("/tmp/metadata");
        }

        if let Ok(host) = env::var("HOST") {
            config.host = host;
        }

        if let Ok(port) = env::var("PORT") {
            if let Ok(port_num) = port.parse::<u16>() {
                config.port = port_num;
                config.public_base_url = format!("http://localhost:{}", port_num);
            }
        }

        if let Ok(dir) = env::var("METADATA_DIR") {
            config.metadata_dir = PathBuf::from(dir);
        }

        if let Ok(dir) = env::var("BLOB_DIR") {
            config.blob_dir = PathBuf::from(dir);
        }

        if let Ok(url) = env::var("PUBLIC_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        config.blob_api_url = non_empty_var("BLOB_API_URL");
        config.blob_token = non_empty_var("BLOB_READ_WRITE_TOKEN");
        config.cleanup_secret = non_empty_var("CRON_SECRET");

        if let Ok(retention) = env::var("RETENTION_SECONDS") {
            if let Ok(secs) = retention.parse::<u64>() {
                config.retention = Duration::from_secs(secs);
            }
        }

        if let Ok(max_size) = env::var("MAX_FILE_SIZE") {
            if let Ok(size) = max_size.parse::<usize>() {
                config.max_file_size = size;
            }
        }

        if let Ok(origins) = env::var("CORS_ORIGINS") {
            config.cors_origins = origins.split(',').map(|s| s.trim().to_string()).collect();
        }

        if let Ok(timeout) = env::var("REQUEST_TIMEOUT_SECONDS") {
            if let Ok(timeout_num) = timeout.parse::<u64>() {
                config.request_timeout_seconds = timeout_num;
            }
        }

        if let Ok(interval) = env::var("CLEANUP_INTERVAL_SECONDS") {
            config.cleanup_interval_seconds = interval.parse::<u64>().ok().filter(|secs| *secs > 0);
        }

        config
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// In production a failed metadata write after a successful blob upload is
    /// logged and the upload still reports success.
    pub fn tolerates_metadata_failures(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Whether uploads go to a remote object store instead of `blob_dir`.
    pub fn uses_remote_blob_store(&self) -> bool {
        self.blob_api_url.is_some() && self.blob_token.is_some()
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |secret: &Option<String>| secret.as_ref().map(|_| "<redacted>");
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("metadata_dir", &self.metadata_dir)
            .field("blob_dir", &self.blob_dir)
            .field("public_base_url", &self.public_base_url)
            .field("blob_api_url", &self.blob_api_url)
            .field("blob_token", &redact(&self.blob_token))
            .field("cleanup_secret", &redact(&self.cleanup_secret))
            .field("retention", &self.retention)
            .field("max_file_size", &self.max_file_size)
            .field("cors_origins", &self.cors_origins)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .field("cleanup_interval_seconds", &self.cleanup_interval_seconds)
            .finish()
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_single_retention_window() {
        let config = AppConfig::default();
        assert_eq!(config.retention, Duration::from_secs(86_400));
        assert!(!config.tolerates_metadata_failures());
        assert!(!config.uses_remote_blob_store());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse(" PROD "), Environment::Production);
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse("anything"), Environment::Development);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AppConfig {
            blob_token: Some("vercel_blob_rw_secret".to_string()),
            cleanup_secret: Some("cron-secret".to_string()),
            ..AppConfig::default()
        };
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("vercel_blob_rw_secret"));
        assert!(!rendered.contains("cron-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
