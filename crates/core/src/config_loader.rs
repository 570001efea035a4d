use crate::config::AppConfig;
use anyhow::Result;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};

/// Prefix for environment overrides. Nested keys use `__`, e.g.
/// `KALSHI_EDGE_TRADING__STOP_LOSS_PERCENT=15`.
pub const ENV_PREFIX: &str = "KALSHI_EDGE_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads application configuration: built-in defaults, then
    /// `config/Config.toml`, then `KALSHI_EDGE_` environment variables, with
    /// `config/Config.json` filling any remaining gaps.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the merged
    /// configuration fails validation.
    pub fn load() -> Result<AppConfig> {
        Self::extract(Self::figment())
    }

    /// Loads application configuration with a profile file layered over
    /// `config/Config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration files cannot be parsed or the merged
    /// configuration fails validation.
    pub fn load_with_profile(profile: &str) -> Result<AppConfig> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config/Config.toml"))
            .merge(Toml::file(format!("config/Config.{profile}.toml")))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .join(Json::file("config/Config.json"));

        Self::extract(figment)
    }

    /// Loads from an explicit TOML file instead of `config/Config.toml`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or the merged
    /// configuration fails validation.
    pub fn load_from(path: &str) -> Result<AppConfig> {
        let figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));

        Self::extract(figment)
    }

    #[must_use]
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config/Config.toml"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .join(Json::file("config/Config.json"))
    }

    /// Extracts and validates an [`AppConfig`] from any figment.
    ///
    /// # Errors
    ///
    /// Returns an error if extraction or validation fails.
    pub fn extract(figment: Figment) -> Result<AppConfig> {
        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }
}
