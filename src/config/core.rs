use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::Serialize;
use std::path::Path;

use super::BenchConfig;

// Embed the default config at compile time
const DEFAULT_CONFIG: &str = include_str!("../../default-config.toml");

/// Repository-level config picked up from the working directory
const REPO_CONFIG: &str = "rangebench.toml";

const ENV_PREFIX: &str = "RANGEBENCH_";

impl BenchConfig {
    /// Load the merged configuration.
    ///
    /// `cli_overrides` is any serializable tree mirroring the config layout;
    /// `null` entries are dropped so unset flags never mask lower layers.
    pub fn load<T: Serialize>(custom_config: Option<&str>, cli_overrides: Option<T>) -> Result<Self> {
        let config: BenchConfig = Self::figment(custom_config, cli_overrides)?
            .extract()
            .context("Failed to parse configuration")?;

        config.validate()?;

        tracing::debug!(
            workers = config.engine.workers,
            queue_capacity = config.engine.queue_capacity,
            input = %config.input.path.display(),
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Build the provider chain without extracting, for `config show`
    pub fn figment<T: Serialize>(custom_config: Option<&str>, cli_overrides: Option<T>) -> Result<Figment> {
        let mut figment = Figment::new()
            .merge(Toml::string(DEFAULT_CONFIG)) // 1. Defaults (lowest)
            .merge(Toml::file(REPO_CONFIG)); // 2. Repo config

        if let Some(path) = custom_config {
            // 3. Custom config must exist when explicitly requested
            if !Path::new(path).is_file() {
                anyhow::bail!("Config file not found: {}", path);
            }
            figment = figment.merge(Toml::file(path));
        }

        // 4. Environment variables
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        // 5. CLI (highest priority)
        if let Some(overrides) = cli_overrides {
            let value = serde_json::to_value(overrides).context("Failed to serialize CLI overrides")?;
            tracing::trace!("CONFIG LOAD: Applying CLI overrides {}", value);
            figment = figment.merge(Serialized::defaults(prune_nulls(value)));
        }

        Ok(figment)
    }
}

/// Remove `null` leaves and any objects left empty by their removal
fn prune_nulls(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .filter_map(|(key, value)| match prune_nulls(value) {
                    serde_json::Value::Null => None,
                    serde_json::Value::Object(inner) if inner.is_empty() => None,
                    pruned => Some((key, pruned)),
                })
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_prune_nulls_drops_unset_flags() {
        let pruned = prune_nulls(json!({
            "engine": { "workers": null, "queue_capacity": 4 },
            "input": { "path": null },
            "output": { "format": "json" }
        }));

        assert_eq!(
            pruned,
            json!({
                "engine": { "queue_capacity": 4 },
                "output": { "format": "json" }
            })
        );
    }

    #[test]
    fn test_embedded_defaults_match_struct_defaults() {
        let from_toml: BenchConfig = Figment::new()
            .merge(Toml::string(DEFAULT_CONFIG))
            .extract()
            .unwrap();
        assert_eq!(from_toml, BenchConfig::default());
    }
}
