use crate::opportunity::{Confidence, Strength};
use crate::sizing::{PositionSizer, SizingMethod};
use anyhow::Result;
use kalshi_edge_exchange::{KalshiAuthConfig, KalshiClientConfig, KALSHI_DEMO_URL, KALSHI_PROD_URL};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub exchange: ExchangeSettings,
    #[serde(default)]
    pub trading: TradeManagerConfig,
}

impl AppConfig {
    /// # Errors
    ///
    /// Returns an error if either section is inconsistent.
    pub fn validate(&self) -> Result<()> {
        self.exchange.validate()?;
        self.trading.validate()
    }
}

/// Exchange connection settings as they appear in config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeSettings {
    /// Use the demo environment instead of production.
    pub demo: bool,
    /// Overrides the environment's base URL.
    pub base_url: Option<String>,
    pub requests_per_second: f64,
    pub burst: Option<f64>,
    pub cache_ttl_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub timeout_secs: u64,
    pub api_key_env: String,
    pub private_key_env: String,
    pub private_key_path_env: String,
}

impl Default for ExchangeSettings {
    fn default() -> Self {
        let client = KalshiClientConfig::default();
        let auth = KalshiAuthConfig::default();
        Self {
            demo: false,
            base_url: None,
            requests_per_second: client.requests_per_second,
            burst: client.burst,
            cache_ttl_secs: client.cache_ttl.as_secs(),
            max_retries: client.max_retries,
            backoff_base_ms: millis(client.backoff_base),
            backoff_max_ms: millis(client.backoff_max),
            timeout_secs: client.timeout_secs,
            api_key_env: auth.api_key_env,
            private_key_env: auth.private_key_env,
            private_key_path_env: auth.private_key_path_env,
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl ExchangeSettings {
    /// Resolves the base URL from `base_url` or the `demo` flag.
    #[must_use]
    pub fn resolved_base_url(&self) -> String {
        match &self.base_url {
            Some(url) => url.clone(),
            None if self.demo => KALSHI_DEMO_URL.to_string(),
            None => KALSHI_PROD_URL.to_string(),
        }
    }

    #[must_use]
    pub fn client_config(&self) -> KalshiClientConfig {
        let mut config = KalshiClientConfig::default()
            .with_base_url(self.resolved_base_url())
            .with_rate_limit(self.requests_per_second)
            .with_cache_ttl(Duration::from_secs(self.cache_ttl_secs))
            .with_max_retries(self.max_retries)
            .with_backoff(
                Duration::from_millis(self.backoff_base_ms),
                Duration::from_millis(self.backoff_max_ms),
            )
            .with_timeout_secs(self.timeout_secs);
        if let Some(burst) = self.burst {
            config = config.with_burst(burst);
        }
        config
    }

    #[must_use]
    pub fn auth_config(&self) -> KalshiAuthConfig {
        KalshiAuthConfig {
            api_key_env: self.api_key_env.clone(),
            private_key_env: self.private_key_env.clone(),
            private_key_path_env: self.private_key_path_env.clone(),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the derived client configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        self.client_config().validate()?;
        Ok(())
    }
}

/// Risk and sizing parameters for the portfolio engine. Money is in cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradeManagerConfig {
    /// Starting cash.
    pub initial_capital: Decimal,
    /// Cap on any single position's value.
    pub max_position_size: Decimal,
    /// Fraction of capital allowed at risk (0.0-1.0). Reported, not enforced.
    pub max_portfolio_risk: Decimal,

    pub min_confidence: Option<Confidence>,
    pub min_strength: Option<Strength>,
    pub min_edge_cents: Decimal,
    pub min_edge_percent: Decimal,

    /// Loss from entry, in percent, that closes a position.
    pub stop_loss_percent: Decimal,
    /// Gain from entry, in percent, that closes a position.
    pub take_profit_percent: Decimal,
    pub max_positions: usize,

    pub sizing_method: SizingMethod,
    /// Base position value for the fixed and confidence-scaled policies.
    pub base_position_size: Decimal,
}

impl Default for TradeManagerConfig {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::new(10_000, 0),
            max_position_size: Decimal::new(1_000, 0),
            max_portfolio_risk: Decimal::new(5, 1),
            min_confidence: None,
            min_strength: None,
            min_edge_cents: Decimal::new(5, 0),
            min_edge_percent: Decimal::new(2, 0),
            stop_loss_percent: Decimal::new(20, 0),
            take_profit_percent: Decimal::new(50, 0),
            max_positions: 10,
            sizing_method: SizingMethod::Fixed,
            base_position_size: Decimal::new(500, 0),
        }
    }
}

impl TradeManagerConfig {
    /// High-confidence, hard signals only, small sizes and tight stops.
    #[must_use]
    pub fn conservative() -> Self {
        Self {
            max_position_size: Decimal::new(500, 0),
            max_portfolio_risk: Decimal::new(25, 2),
            min_confidence: Some(Confidence::High),
            min_strength: Some(Strength::Hard),
            min_edge_cents: Decimal::new(8, 0),
            min_edge_percent: Decimal::new(5, 0),
            stop_loss_percent: Decimal::new(10, 0),
            take_profit_percent: Decimal::new(30, 0),
            max_positions: 5,
            base_position_size: Decimal::new(250, 0),
            ..Self::default()
        }
    }

    /// Any signal with a small edge, Kelly sizing and wide stops.
    #[must_use]
    pub fn aggressive() -> Self {
        Self {
            max_position_size: Decimal::new(2_000, 0),
            max_portfolio_risk: Decimal::new(8, 1),
            min_edge_cents: Decimal::new(2, 0),
            min_edge_percent: Decimal::ONE,
            stop_loss_percent: Decimal::new(35, 0),
            take_profit_percent: Decimal::new(100, 0),
            max_positions: 20,
            sizing_method: SizingMethod::Kelly,
            base_position_size: Decimal::new(1_000, 0),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_initial_capital(mut self, cents: Decimal) -> Self {
        self.initial_capital = cents;
        self
    }

    #[must_use]
    pub fn with_sizing(mut self, method: SizingMethod, base: Decimal, max: Decimal) -> Self {
        self.sizing_method = method;
        self.base_position_size = base;
        self.max_position_size = max;
        self
    }

    #[must_use]
    pub fn with_min_confidence(mut self, confidence: Confidence) -> Self {
        self.min_confidence = Some(confidence);
        self
    }

    #[must_use]
    pub fn with_min_strength(mut self, strength: Strength) -> Self {
        self.min_strength = Some(strength);
        self
    }

    #[must_use]
    pub fn with_min_edge(mut self, cents: Decimal, percent: Decimal) -> Self {
        self.min_edge_cents = cents;
        self.min_edge_percent = percent;
        self
    }

    #[must_use]
    pub fn with_stops(mut self, stop_loss_percent: Decimal, take_profit_percent: Decimal) -> Self {
        self.stop_loss_percent = stop_loss_percent;
        self.take_profit_percent = take_profit_percent;
        self
    }

    #[must_use]
    pub fn with_max_positions(mut self, max_positions: usize) -> Self {
        self.max_positions = max_positions;
        self
    }

    #[must_use]
    pub fn sizer(&self) -> PositionSizer {
        PositionSizer::new(
            self.sizing_method,
            self.base_position_size,
            self.max_position_size,
        )
    }

    /// # Errors
    ///
    /// Returns an error if any amount is negative, the risk fraction is
    /// outside 0-1, or a stop percentage is not positive.
    pub fn validate(&self) -> Result<()> {
        if self.initial_capital < Decimal::ZERO {
            anyhow::bail!("initial_capital must not be negative");
        }
        if self.max_position_size <= Decimal::ZERO {
            anyhow::bail!("max_position_size must be positive");
        }
        if self.base_position_size <= Decimal::ZERO {
            anyhow::bail!("base_position_size must be positive");
        }
        if self.max_portfolio_risk < Decimal::ZERO || self.max_portfolio_risk > Decimal::ONE {
            anyhow::bail!("max_portfolio_risk must be between 0 and 1");
        }
        if self.stop_loss_percent <= Decimal::ZERO {
            anyhow::bail!("stop_loss_percent must be positive");
        }
        if self.take_profit_percent <= Decimal::ZERO {
            anyhow::bail!("take_profit_percent must be positive");
        }
        if self.max_positions == 0 {
            anyhow::bail!("max_positions must be at least 1");
        }
        Ok(())
    }
}
