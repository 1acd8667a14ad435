use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Policy deciding when a source takes the multipart path, supplied by the
/// caller with each submission (the hosting environment owns these numbers,
/// not the pool).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MultipartPolicy {
    /// Sources strictly larger than this many bytes are hashed multipart.
    pub multipart_threshold: u64,
    /// Fixed part size in bytes for multipart hashing.
    pub part_size: u64,
}

impl Default for MultipartPolicy {
    fn default() -> Self {
        Self {
            multipart_threshold: 8 * 1024 * 1024,
            part_size: 5 * 1024 * 1024,
        }
    }
}

impl MultipartPolicy {
    /// Whether a source of `size` bytes takes the multipart path.
    /// The comparison is strict: a source exactly at the threshold is
    /// hashed single-shot.
    pub fn is_multipart(&self, size: u64) -> bool {
        size > self.multipart_threshold
    }
}

/// Pool tuning, fixed at pool construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of live workers.
    pub max_workers: usize,
    /// Tasks a worker may complete before it is recycled.
    pub max_tasks_per_worker: u32,
    /// Idle time after which a worker is evicted (queue empty).
    pub idle_timeout_ms: u64,
    /// Interval between stuck-worker scans.
    pub health_check_interval_ms: u64,
    /// Time a dispatched task may run before its worker is replaced.
    pub task_timeout_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_workers: 5,
            max_tasks_per_worker: 50,
            idle_timeout_ms: 30_000,
            health_check_interval_ms: 10_000,
            task_timeout_ms: 120_000,
        }
    }
}

impl PoolConfig {
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms.max(1))
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    /// Inactivity age beyond which the health check treats a worker as
    /// stuck, regardless of its nominal status.
    pub fn stuck_after(&self) -> Duration {
        self.task_timeout() * 2
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("hashpool")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load pool configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PoolConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = PoolConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: PoolConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = PoolConfig::default();
        assert_eq!(cfg.max_workers, 5);
        assert_eq!(cfg.max_tasks_per_worker, 50);
        assert_eq!(cfg.idle_timeout_ms, 30_000);
        assert_eq!(cfg.health_check_interval_ms, 10_000);
        assert_eq!(cfg.task_timeout_ms, 120_000);
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = PoolConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: PoolConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.max_workers, cfg.max_workers);
        assert_eq!(parsed.max_tasks_per_worker, cfg.max_tasks_per_worker);
        assert_eq!(parsed.idle_timeout_ms, cfg.idle_timeout_ms);
        assert_eq!(parsed.task_timeout_ms, cfg.task_timeout_ms);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            max_workers = 2
            max_tasks_per_worker = 10
            idle_timeout_ms = 5000
            health_check_interval_ms = 1000
            task_timeout_ms = 60000
        "#;
        let cfg: PoolConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.max_workers, 2);
        assert_eq!(cfg.max_tasks_per_worker, 10);
        assert_eq!(cfg.idle_timeout_ms, 5000);
        assert_eq!(cfg.stuck_after(), Duration::from_secs(120));
    }

    #[test]
    fn multipart_threshold_is_strict() {
        let policy = MultipartPolicy {
            multipart_threshold: 1024,
            part_size: 512,
        };
        assert!(!policy.is_multipart(0));
        assert!(!policy.is_multipart(1024));
        assert!(policy.is_multipart(1025));
    }
}
