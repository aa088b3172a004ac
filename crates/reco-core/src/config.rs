use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration (loaded from reco.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoConfig {
    pub log: LogConfig,
    pub paths: PathsConfig,
    pub crypto: CryptoConfig,
    pub storage: StorageConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level or EnvFilter directive (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root for local state; the other paths resolve under it when relative
    pub data_dir: PathBuf,
    /// Metadata store file
    pub db_file: PathBuf,
    /// Encrypted cloud settings file
    pub settings_file: PathBuf,
    /// Plaintext blob cache
    pub cache_dir: PathBuf,
    /// Thumbnail cache
    pub thumb_dir: PathBuf,
}

/// Argon2id parameters used when creating an account
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB)
    pub argon2_mem_cost_kib: u32,
    /// Argon2id time cost (iterations, default: 3)
    pub argon2_time_cost: u32,
    /// Argon2id parallelism (default: 4)
    pub argon2_parallelism: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Per-operation timeout for cloud calls
    pub timeout_secs: u64,
    /// Retry limit for transient cloud failures (0 disables retries)
    pub max_retries: usize,
    /// Reject plaintext http:// S3 endpoints instead of warning
    pub enforce_tls: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum plaintext cache size in MB (0 = unbounded)
    pub max_mb: u64,
    /// Longest thumbnail edge in pixels
    pub thumb_size: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("~/.local/share/reco"),
            db_file: PathBuf::from("reco.db"),
            settings_file: PathBuf::from("cloud.settings"),
            cache_dir: PathBuf::from("cache"),
            thumb_dir: PathBuf::from("thumbs"),
        }
    }
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            argon2_mem_cost_kib: 65536,
            argon2_time_cost: 3,
            argon2_parallelism: 4,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            max_retries: 3,
            enforce_tls: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_mb: 2048,
            thumb_size: 256,
        }
    }
}

impl PathsConfig {
    /// All paths rooted at `dir`, keeping the default file names.
    pub fn under(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.data_dir)
    }

    pub fn db_path(&self) -> PathBuf {
        self.resolve(&self.db_file)
    }

    pub fn settings_path(&self) -> PathBuf {
        self.resolve(&self.settings_file)
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.resolve(&self.cache_dir)
    }

    pub fn thumb_dir(&self) -> PathBuf {
        self.resolve(&self.thumb_dir)
    }

    fn resolve(&self, p: &Path) -> PathBuf {
        let p = expand_tilde(p);
        if p.is_absolute() {
            p
        } else {
            self.data_dir().join(p)
        }
    }
}

/// Expand a leading `~` to $HOME. Paths without one are returned unchanged.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
