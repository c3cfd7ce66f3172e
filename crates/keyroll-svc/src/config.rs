//! Configuration loading and validation for the sealing service.
//!
//! All values are read from environment variables at startup. The process
//! exits with a clear error message if any required variable is missing or
//! invalid.

use std::collections::HashSet;
use std::fmt;

use anyhow::{Context, Result};
use keyroll::{KeyProfileRegistry, KeyProfileSpec};
use serde::Deserialize;

use crate::server::middleware::REQUEST_TIMEOUT;

/// Validated service configuration.
#[derive(Clone, Deserialize)]
pub struct Config {
    /// JSON array of key profiles: `[{"name": .., "key": <base64>, "rolled": ..}]`.
    /// **Required.**
    pub key_profiles: String,

    /// Name of the default key profile. Defaults to the first configured one.
    #[serde(default)]
    pub default_key_profile: Option<String>,

    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// OTLP endpoint for span export. Export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_listen_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    REQUEST_TIMEOUT.as_secs()
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any required variable is absent or cannot be parsed.
    pub fn from_env() -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Environment::default())
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Parse `KEY_PROFILES` into profile specs.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is not a JSON array of profile objects.
    pub fn profile_specs(&self) -> Result<Vec<KeyProfileSpec>> {
        serde_json::from_str(&self.key_profiles)
            .context("KEY_PROFILES must be a JSON array of {name, key, rolled} objects")
    }

    /// Build the key profile registry described by this configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a key cannot be decoded or the default is unknown.
    pub fn build_registry(&self) -> Result<KeyProfileRegistry> {
        let specs = self.profile_specs()?;
        KeyProfileRegistry::from_specs(&specs, self.default_key_profile.as_deref())
            .context("failed to build key profile registry")
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        let specs = self.profile_specs()?;
        if specs.is_empty() {
            anyhow::bail!("KEY_PROFILES must configure at least one key profile");
        }

        let mut seen = HashSet::new();
        for spec in &specs {
            if spec.name.trim().is_empty() {
                anyhow::bail!("KEY_PROFILES contains a profile with an empty name");
            }
            if !seen.insert(spec.name.as_str()) {
                anyhow::bail!("KEY_PROFILES contains duplicate profile name '{}'", spec.name);
            }
            spec.to_profile()
                .with_context(|| format!("KEY_PROFILES entry '{}' has an unusable key", spec.name))?;
        }

        if let Some(default) = &self.default_key_profile {
            if !seen.contains(default.as_str()) {
                anyhow::bail!("DEFAULT_KEY_PROFILE '{default}' is not listed in KEY_PROFILES");
            }
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be > 0");
        }
        Ok(())
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // KEY_PROFILES carries key material.
        f.debug_struct("Config")
            .field("key_profiles", &"[REDACTED]")
            .field("default_key_profile", &self.default_key_profile)
            .field("listen_port", &self.listen_port)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("otel_exporter_otlp_endpoint", &self.otel_exporter_otlp_endpoint)
            .field("log_level", &self.log_level)
            .finish()
    }
}
