use serde::Deserialize;

use crate::error::ConfigError;

fn default_name() -> String {
    "cache".to_string()
}

/// Geometry of one simulated cache. Immutable for the length of a run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_name")]
    pub name: String,
    /// Set-index bits; there are `2^s` sets.
    pub s: u32,
    /// Lines per set.
    #[serde(rename = "E")]
    pub e: usize,
    /// Block-offset bits; blocks are `2^b` bytes.
    pub b: u32,
}

impl CacheConfig {
    pub fn new(s: u32, e: usize, b: u32) -> Result<Self, ConfigError> {
        let config = CacheConfig {
            name: default_name(),
            s,
            e,
            b,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.e == 0 {
            return Err(ConfigError::ZeroAssociativity);
        }
        if self.s.checked_add(self.b).map_or(true, |bits| bits > 64) {
            return Err(ConfigError::AddressBits {
                s: self.s,
                b: self.b,
            });
        }
        Ok(())
    }

    pub fn set_num(&self) -> u128 {
        1u128 << self.s
    }

    pub fn block_size(&self) -> u128 {
        1u128 << self.b
    }
}

/// Several caches to run side by side over one trace.
#[derive(Debug, Clone, Deserialize)]
pub struct Layout {
    pub caches: Vec<CacheConfig>,
}

impl Layout {
    pub fn from_json(json: &str) -> Result<Self, crate::Error> {
        let layout: Layout = serde_json::from_str(json)?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.caches.is_empty() {
            return Err(ConfigError::EmptyLayout);
        }
        for cache in &self.caches {
            cache.validate().map_err(|err| ConfigError::Invalid {
                name: cache.name.clone(),
                source: Box::new(err),
            })?;
        }
        Ok(())
    }
}
