use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Validation failure for a loaded [`TrafficConfig`].
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ConfigError {
    #[error("min_speed ({min}) must not exceed max_speed ({max})")]
    SpeedRange { min: f64, max: f64 },
    #[error("speeds must be finite (got {0})")]
    NonFiniteSpeed(f64),
    #[error("speeds must be non-negative (got {0})")]
    NegativeSpeed(f64),
    #[error("max_concurrency must be at least 1")]
    ZeroConcurrency,
    #[error("min_interval_sec ({min}) must not exceed max_interval_sec ({max})")]
    IntervalRange { min: u64, max: u64 },
    #[error("min_bytes_per_download ({min}) must not exceed max_bytes_per_download ({max})")]
    ByteRange { min: u64, max: u64 },
    #[error("invalid endpoint {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Traffic generator configuration loaded from `~/.config/tgen/config.toml`
/// (or the path given with `--config`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficConfig {
    /// Endpoint pool. Order is irrelevant; at least two are needed to run.
    pub urls: Vec<String>,
    /// Lower bound of the per-transfer speed, in megabits per second.
    pub min_speed: f64,
    /// Upper bound of the per-transfer speed, in megabits per second.
    pub max_speed: f64,
    /// Maximum number of transfers in flight at once.
    pub max_concurrency: usize,
    /// Hourly traffic log. Parent directories are created on first write.
    pub log_file: PathBuf,
    /// Declared lower bound per download. Advisory only, never enforced.
    pub min_bytes_per_download: u64,
    /// Declared upper bound per download. Advisory only, never enforced.
    pub max_bytes_per_download: u64,
    /// Lower bound of the pause between scheduling rounds, in seconds.
    pub min_interval_sec: u64,
    /// Upper bound of the pause between scheduling rounds, in seconds.
    pub max_interval_sec: u64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            min_speed: 1.0,
            max_speed: 10.0,
            max_concurrency: 4,
            log_file: PathBuf::from("logs/traffic.log"),
            min_bytes_per_download: 1024 * 1024,
            max_bytes_per_download: 100 * 1024 * 1024,
            min_interval_sec: 5,
            max_interval_sec: 30,
        }
    }
}

impl TrafficConfig {
    /// Checks ranges and endpoint syntax. Fewer than two endpoints is not an
    /// error here; the scheduler reports that condition itself.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for speed in [self.min_speed, self.max_speed] {
            if !speed.is_finite() {
                return Err(ConfigError::NonFiniteSpeed(speed));
            }
            if speed < 0.0 {
                return Err(ConfigError::NegativeSpeed(speed));
            }
        }
        if self.min_speed > self.max_speed {
            return Err(ConfigError::SpeedRange {
                min: self.min_speed,
                max: self.max_speed,
            });
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.min_interval_sec > self.max_interval_sec {
            return Err(ConfigError::IntervalRange {
                min: self.min_interval_sec,
                max: self.max_interval_sec,
            });
        }
        if self.min_bytes_per_download > self.max_bytes_per_download {
            return Err(ConfigError::ByteRange {
                min: self.min_bytes_per_download,
                max: self.max_bytes_per_download,
            });
        }
        for raw in &self.urls {
            let parsed = url::Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
                url: raw.clone(),
                reason: e.to_string(),
            })?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(ConfigError::InvalidUrl {
                    url: raw.clone(),
                    reason: format!("unsupported scheme {}", parsed.scheme()),
                });
            }
        }
        Ok(())
    }

    /// Uniform sample from `[min_speed, max_speed]` in Mbps.
    pub fn sample_speed_mbps<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.max_speed <= self.min_speed {
            return self.min_speed;
        }
        rng.gen_range(self.min_speed..=self.max_speed)
    }

    /// Uniform sample from `[min_interval_sec, max_interval_sec]`, whole seconds inclusive.
    pub fn sample_interval<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        let secs = if self.max_interval_sec <= self.min_interval_sec {
            self.min_interval_sec
        } else {
            rng.gen_range(self.min_interval_sec..=self.max_interval_sec)
        };
        Duration::from_secs(secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tgen")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Reads and validates the configuration at `path`.
pub fn load(path: &Path) -> Result<TrafficConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let cfg: TrafficConfig = toml::from_str(&data)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init(path: &Path) -> Result<TrafficConfig> {
    if !path.exists() {
        let default_cfg = TrafficConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn default_config_values() {
        let cfg = TrafficConfig::default();
        assert!(cfg.urls.is_empty());
        assert_eq!(cfg.max_concurrency, 4);
        assert_eq!(cfg.min_interval_sec, 5);
        assert_eq!(cfg.max_interval_sec, 30);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            urls = ["http://a.example/x", "https://b.example/y"]
            min_speed = 2.5
            max_speed = 8.0
            max_concurrency = 3
            log_file = "/var/log/tgen/traffic.log"
            min_interval_sec = 1
            max_interval_sec = 2
        "#;
        let cfg: TrafficConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.urls.len(), 2);
        assert!((cfg.min_speed - 2.5).abs() < 1e-9);
        assert!((cfg.max_speed - 8.0).abs() < 1e-9);
        assert_eq!(cfg.max_concurrency, 3);
        assert_eq!(cfg.log_file, PathBuf::from("/var/log/tgen/traffic.log"));
        // unspecified keys keep their defaults
        assert_eq!(cfg.min_bytes_per_download, 1024 * 1024);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_ranges() {
        let mut cfg = TrafficConfig::default();
        cfg.min_speed = 5.0;
        cfg.max_speed = 1.0;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::SpeedRange { min: 5.0, max: 1.0 })
        );

        let mut cfg = TrafficConfig::default();
        cfg.min_interval_sec = 10;
        cfg.max_interval_sec = 3;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::IntervalRange { min: 10, max: 3 })
        );

        let mut cfg = TrafficConfig::default();
        cfg.max_concurrency = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroConcurrency));

        let mut cfg = TrafficConfig::default();
        cfg.max_speed = f64::INFINITY;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::NonFiniteSpeed(f64::INFINITY))
        );

        let mut cfg = TrafficConfig::default();
        cfg.min_speed = f64::NAN;
        assert!(matches!(cfg.validate(), Err(ConfigError::NonFiniteSpeed(_))));
    }

    #[test]
    fn load_rejects_infinite_speed_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "urls = [\"http://a.example/\", \"http://b.example/\"]\nmax_speed = inf\n",
        )
        .unwrap();
        let err = load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("finite"), "{:#}", err);
    }

    #[test]
    fn validate_rejects_bad_urls() {
        let mut cfg = TrafficConfig::default();
        cfg.urls = vec!["http://ok.example/".into(), "ftp://nope.example/".into()];
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
        cfg.urls = vec!["not a url".into()];
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn samples_stay_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut cfg = TrafficConfig::default();
        cfg.min_speed = 2.0;
        cfg.max_speed = 3.0;
        cfg.min_interval_sec = 4;
        cfg.max_interval_sec = 6;
        for _ in 0..200 {
            let s = cfg.sample_speed_mbps(&mut rng);
            assert!((2.0..=3.0).contains(&s));
            let d = cfg.sample_interval(&mut rng).as_secs();
            assert!((4..=6).contains(&d));
        }
    }

    #[test]
    fn degenerate_ranges_sample_the_single_value() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut cfg = TrafficConfig::default();
        cfg.min_speed = 1.0;
        cfg.max_speed = 1.0;
        cfg.min_interval_sec = 0;
        cfg.max_interval_sec = 0;
        assert_eq!(cfg.sample_speed_mbps(&mut rng), 1.0);
        assert_eq!(cfg.sample_interval(&mut rng), Duration::ZERO);
    }

    #[test]
    fn load_or_init_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let cfg = load_or_init(&path).unwrap();
        assert_eq!(cfg, TrafficConfig::default());
        assert!(path.exists());
        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded, cfg);
    }

    #[test]
    fn load_reports_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_concurrency = 0\n").unwrap();
        let err = load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("max_concurrency"));
    }
}
