//! Exporter configuration.
//!
//! ```toml
//! namespace = "canal"
//!
//! [web]
//! listen_address = "0.0.0.0:9311"
//! timeout_secs = 60
//! metrics_path = "/metrics"
//!
//! [zk]
//! timeout_ms = 5000
//!
//! [log]
//! level = "info"
//!
//! [clusters.shard1]
//! endpoint = "10.0.0.1:2181"
//! chroot = "/canal"
//! filter = ["inst2"]
//! ```
//!
//! Each `[clusters.<name>]` section describes one monitored ZooKeeper; the
//! section name is the `cluster` label. `zk` is accepted as an alias of
//! `endpoint`.

use std::collections::BTreeSet;
use std::fmt::Write;
use std::net::SocketAddr;
use std::time::Duration;

use canalzk_config::{value, Config, ConfigError};
use canalzk_logging::LogConfig;

pub const DEFAULT_NAMESPACE: &str = "canal";

/// One monitored coordination-store deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterDescriptor {
    pub name: String,
    pub endpoint: String,
    /// Root path prefix under which canal keeps its tree.
    pub chroot: String,
    /// Destinations to skip.
    pub filter: BTreeSet<String>,
}

impl ClusterDescriptor {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            chroot: "/".into(),
            filter: BTreeSet::new(),
        }
    }

    pub fn with_chroot(mut self, chroot: impl Into<String>) -> Self {
        self.chroot = chroot.into();
        self
    }

    pub fn with_filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn excludes(&self, destination: &str) -> bool {
        self.filter.contains(destination)
    }

    fn from_section(name: &str, section: &toml::Value) -> Result<Self, ConfigError> {
        let field = |key: &str| format!("clusters.{}.{}", name, key);

        let endpoint = match value::get_str(section, "endpoint", &field("endpoint"))? {
            Some(e) => e,
            None => value::get_str(section, "zk", &field("zk"))?
                .ok_or_else(|| ConfigError::Missing(field("endpoint")))?,
        };
        let mut cluster = ClusterDescriptor::new(name, endpoint);
        if let Some(chroot) = value::get_str(section, "chroot", &field("chroot"))? {
            if !chroot.is_empty() {
                cluster.chroot = chroot;
            }
        }
        if let Some(filter) = value::get_str_list(section, "filter", &field("filter"))? {
            cluster = cluster.with_filter(filter);
        }
        Ok(cluster)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WebConfig {
    /// `host:port`; a bare `:port` listens on all interfaces.
    pub listen_address: String,
    /// Upper bound on serving one HTTP request.
    pub timeout: Duration,
    pub metrics_path: String,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            listen_address: "0.0.0.0:9311".into(),
            timeout: Duration::from_secs(60),
            metrics_path: "/metrics".into(),
        }
    }
}

impl WebConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        };
        addr.parse().map_err(|e| ConfigError::Invalid {
            field: "web.listen_address".into(),
            reason: format!("{}: {}", self.listen_address, e),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ZkConfig {
    /// Bound on each connect, list and read call.
    pub timeout: Duration,
}

impl Default for ZkConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExporterConfig {
    pub namespace: String,
    pub web: WebConfig,
    pub zk: ZkConfig,
    pub log: LogConfig,
    /// Ordered by section name.
    pub clusters: Vec<ClusterDescriptor>,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.into(),
            web: WebConfig::default(),
            zk: ZkConfig::default(),
            log: LogConfig::default(),
            clusters: Vec::new(),
        }
    }
}

impl Config for ExporterConfig {
    fn from_toml(v: &toml::Value) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Some(ns) = value::get_str(v, "namespace", "namespace")? {
            cfg.namespace = ns;
        }

        if let Some(web) = value::get_table(v, "web", "web")? {
            let web = toml::Value::Table(web.clone());
            if let Some(addr) = value::get_str(&web, "listen_address", "web.listen_address")? {
                cfg.web.listen_address = addr;
            }
            if let Some(secs) = value::get_u64(&web, "timeout_secs", "web.timeout_secs")? {
                cfg.web.timeout = Duration::from_secs(secs);
            }
            if let Some(path) = value::get_str(&web, "metrics_path", "web.metrics_path")? {
                cfg.web.metrics_path = path;
            }
        }

        if let Some(zk) = value::get_table(v, "zk", "zk")? {
            let zk = toml::Value::Table(zk.clone());
            if let Some(ms) = value::get_u64(&zk, "timeout_ms", "zk.timeout_ms")? {
                cfg.zk.timeout = Duration::from_millis(ms);
            }
        }

        if let Some(log) = value::get_table(v, "log", "log")? {
            cfg.log = toml::Value::Table(log.clone()).try_into()?;
        }

        if let Some(clusters) = value::get_table(v, "clusters", "clusters")? {
            let mut sections: Vec<(&String, &toml::Value)> = clusters.iter().collect();
            sections.sort_by(|a, b| a.0.cmp(b.0));
            for (name, section) in sections {
                if !section.is_table() {
                    return Err(ConfigError::TypeMismatch {
                        field: format!("clusters.{}", name),
                        expected: "table".into(),
                    });
                }
                cfg.clusters.push(ClusterDescriptor::from_section(name, section)?);
            }
        }

        Ok(cfg)
    }

    fn hot_update(&mut self, other: &Self) {
        self.clusters = other.clusters.clone();
        self.zk = other.zk.clone();
    }

    fn render(&self) -> String {
        let s = |v: &str| toml::Value::String(v.to_string()).to_string();
        let mut out = String::new();

        let _ = writeln!(out, "namespace = {}\n", s(&self.namespace));

        let _ = writeln!(out, "[web]");
        let _ = writeln!(out, "listen_address = {}", s(&self.web.listen_address));
        let _ = writeln!(out, "timeout_secs = {}", self.web.timeout.as_secs());
        let _ = writeln!(out, "metrics_path = {}\n", s(&self.web.metrics_path));

        let _ = writeln!(out, "[zk]");
        let _ = writeln!(out, "timeout_ms = {}\n", self.zk.timeout.as_millis());

        let _ = writeln!(out, "[log]");
        let _ = writeln!(out, "level = {}", s(&self.log.level));
        if let Some(dir) = &self.log.log_dir {
            let _ = writeln!(out, "log_dir = {}", s(&dir.to_string_lossy()));
        }
        let _ = writeln!(out, "file_prefix = {}", s(&self.log.file_prefix));
        let _ = writeln!(out, "rotation = {}", s(self.log.rotation.as_str()));
        let _ = writeln!(out, "json_format = {}", self.log.json_format);
        let _ = writeln!(out, "console_output = {}", self.log.console_output);

        for cluster in &self.clusters {
            let filter: Vec<String> = cluster.filter.iter().map(|f| s(f)).collect();
            let _ = writeln!(out, "\n[clusters.{}]", s(&cluster.name));
            let _ = writeln!(out, "endpoint = {}", s(&cluster.endpoint));
            let _ = writeln!(out, "chroot = {}", s(&cluster.chroot));
            let _ = writeln!(out, "filter = [{}]", filter.join(", "));
        }
        out
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !is_metric_name(&self.namespace) {
            return Err(ConfigError::Invalid {
                field: "namespace".into(),
                reason: format!("{:?} is not a valid metric name prefix", self.namespace),
            });
        }
        self.web.socket_addr()?;
        if self.web.timeout < Duration::from_secs(1) {
            return Err(ConfigError::OutOfRange {
                field: "web.timeout_secs".into(),
                value: self.web.timeout.as_secs().to_string(),
                min: Some("1".into()),
                max: None,
            });
        }
        if !self.web.metrics_path.starts_with('/') || self.web.metrics_path == "/" {
            return Err(ConfigError::Invalid {
                field: "web.metrics_path".into(),
                reason: format!("{:?} must be an absolute path other than /", self.web.metrics_path),
            });
        }
        if self.zk.timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                field: "zk.timeout_ms".into(),
                value: "0".into(),
                min: Some("1".into()),
                max: None,
            });
        }
        for cluster in &self.clusters {
            if cluster.endpoint.trim().is_empty() {
                return Err(ConfigError::Missing(format!("clusters.{}.endpoint", cluster.name)));
            }
        }
        Ok(())
    }
}

fn is_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        None => true,
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        Some(_) => false,
    }
}
