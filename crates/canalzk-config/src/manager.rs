use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::{Config, ConfigError};

/// Adjustments applied on top of the file, e.g. command line flags.
type Overrides<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// Manages a configuration with hot-update support.
pub struct ConfigManager<T: Config> {
    config: ArcSwap<T>,
    path: Option<PathBuf>,
    overrides: Option<Overrides<T>>,
}

impl<T: Config> ConfigManager<T> {
    pub fn new(config: T) -> Self {
        Self {
            config: ArcSwap::from_pointee(config),
            path: None,
            overrides: None,
        }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let config = read_config::<T>(path)?;
        Ok(Self {
            config: ArcSwap::from_pointee(config),
            path: Some(path.to_path_buf()),
            overrides: None,
        })
    }

    pub fn get(&self) -> arc_swap::Guard<Arc<T>> {
        self.config.load()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn update(&self, new_config: T) -> Result<(), ConfigError> {
        new_config.validate()?;
        self.config.store(Arc::new(new_config));
        Ok(())
    }
}

impl<T: Config + Clone> ConfigManager<T> {
    /// Apply `overrides` to the current config now and again after every
    /// [`reload`](Self::reload), so they keep precedence over the file.
    pub fn with_overrides<F>(mut self, overrides: F) -> Result<Self, ConfigError>
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let mut current = (*self.config.load_full()).clone();
        overrides(&mut current);
        current.validate()?;
        self.config.store(Arc::new(current));
        self.overrides = Some(Box::new(overrides));
        Ok(self)
    }

    /// Re-read the backing file and apply its hot-updatable fields.
    ///
    /// On any error the current configuration is left untouched.
    pub fn reload(&self) -> Result<(), ConfigError> {
        if let Some(ref path) = self.path {
            let new_config = read_config::<T>(path)?;

            let mut current = (*self.config.load_full()).clone();
            current.hot_update(&new_config);
            if let Some(overrides) = &self.overrides {
                overrides(&mut current);
            }
            current.validate()?;
            self.config.store(Arc::new(current));

            tracing::info!(path = %path.display(), "config reloaded");
        }
        Ok(())
    }

    pub fn snapshot(&self) -> T {
        (*self.config.load_full()).clone()
    }
}

fn read_config<T: Config>(path: &Path) -> Result<T, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    let config = T::from_toml(&value)?;
    config.validate()?;
    Ok(config)
}
