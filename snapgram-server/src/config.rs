use config::{Config, ConfigError, File};
use serde::Deserialize;
use std::path::PathBuf;

/// Signing secret used when none is configured. Only suitable for local development.
pub const DEV_JWT_SECRET: &str = "snapgram-dev-secret-change-me";

/// Upload ceiling: 5 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// Argon2 memory cost in KiB
    pub hash_memory_kib: u32,
    /// Argon2 time cost (passes over memory)
    pub hash_iterations: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadSettings {
    pub dir: String,
    /// URL prefix the upload directory is mounted under
    pub public_path: String,
    pub max_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub auth: AuthSettings,
    pub uploads: UploadSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        // 1. Try to load from settings.toml (optional for deployment)
        let config_file_name = "settings.toml";

        let current_dir_path = PathBuf::from(config_file_name);
        if current_dir_path.exists() {
            builder = builder.add_source(File::from(current_dir_path).required(false));
        }

        // Check in snapgram-server directory (for development)
        let dev_path = PathBuf::from("snapgram-server").join(config_file_name);
        if dev_path.exists() {
            builder = builder.add_source(File::from(dev_path).required(false));
        }

        builder = Self::with_defaults(builder)?;

        // 2. Override with environment variables (highest priority)
        let overrides = [
            ("DATABASE_PATH", "database.path"),
            ("PORT", "server.port"),
            ("HOST", "server.host"),
            ("UPLOAD_DIR", "uploads.dir"),
            ("JWT_SECRET", "auth.jwt_secret"),
            ("TOKEN_TTL_HOURS", "auth.token_ttl_hours"),
        ];
        for (var, key) in overrides {
            if let Ok(value) = std::env::var(var) {
                builder = builder.set_override(key, value)?;
            }
        }

        builder.build()?.try_deserialize()
    }

    fn with_defaults(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        builder
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.path", "snapgram.db")?
            .set_default("auth.jwt_secret", DEV_JWT_SECRET)?
            .set_default("auth.token_ttl_hours", 24)?
            .set_default("auth.hash_memory_kib", 19 * 1024)?
            .set_default("auth.hash_iterations", 2)?
            .set_default("uploads.dir", "uploads")?
            .set_default("uploads.public_path", "/uploads")?
            .set_default("uploads.max_bytes", DEFAULT_MAX_UPLOAD_BYTES as u64)
    }

    /// Settings for tests: in-memory database, cheap hashing, caller-chosen upload dir.
    pub fn for_tests(upload_dir: &str) -> Self {
        Self {
            server: Server {
                host: "127.0.0.1".to_string(),
                port: 0,
            },
            database: Database {
                path: ":memory:".to_string(),
            },
            auth: AuthSettings {
                jwt_secret: "test-secret".to_string(),
                token_ttl_hours: 1,
                hash_memory_kib: 64,
                hash_iterations: 1,
            },
            uploads: UploadSettings {
                dir: upload_dir.to_string(),
                public_path: "/uploads".to_string(),
                max_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            },
        }
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_deserialize() {
        let settings: Settings = Settings::with_defaults(Config::builder())
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.database.path, "snapgram.db");
        assert_eq!(settings.uploads.max_bytes, 5 * 1024 * 1024);
        assert_eq!(settings.uploads.public_path, "/uploads");
        assert!(settings.uses_dev_secret());
    }

    #[test]
    fn test_for_tests_uses_memory_database() {
        let settings = Settings::for_tests("/tmp/uploads");
        assert_eq!(settings.database.path, ":memory:");
        assert!(!settings.uses_dev_secret());
    }
}
