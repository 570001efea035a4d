//! Position sizing policies.
//!
//! Every policy produces a position value in cents, clamped to the
//! configured maximum. The engine divides that value by the entry price to
//! get a contract count.

use crate::opportunity::{Confidence, Opportunity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Sizing policy selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizingMethod {
    /// Always the base size.
    #[default]
    Fixed,
    /// Base size scaled by confidence tier.
    ConfidenceScaled,
    /// Fraction of portfolio value, using edge percent as the Kelly proxy.
    Kelly,
}

/// Upper bound on the Kelly fraction (25% of portfolio value).
#[must_use]
pub fn kelly_cap() -> Decimal {
    Decimal::new(25, 2)
}

/// Size multiplier for a confidence tier.
#[must_use]
pub fn confidence_multiplier(confidence: Confidence) -> Decimal {
    match confidence {
        Confidence::Low => Decimal::new(5, 1),
        Confidence::Medium => Decimal::new(75, 2),
        Confidence::High => Decimal::ONE,
    }
}

/// Sizes positions according to a [`SizingMethod`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSizer {
    pub method: SizingMethod,
    /// Base position value in cents.
    pub base_size: Decimal,
    /// Hard cap on any position value in cents.
    pub max_size: Decimal,
}

impl PositionSizer {
    #[must_use]
    pub fn new(method: SizingMethod, base_size: Decimal, max_size: Decimal) -> Self {
        Self {
            method,
            base_size,
            max_size,
        }
    }

    /// Returns the position value in cents for an opportunity.
    ///
    /// `portfolio_value` is only read by the Kelly policy. The result is
    /// never negative and never above `max_size`.
    ///
    /// # Examples
    /// ```
    /// use kalshi_edge_core::sizing::{PositionSizer, SizingMethod};
    /// use kalshi_edge_core::{Confidence, Opportunity, OpportunityType, Strength};
    /// use rust_decimal_macros::dec;
    ///
    /// let sizer = PositionSizer::new(SizingMethod::ConfidenceScaled, dec!(500), dec!(1000));
    /// let opp = Opportunity::new(OpportunityType::Mispricing, Confidence::Low, Strength::Soft, "T");
    ///
    /// assert_eq!(sizer.size(&opp, dec!(10000)), dec!(250));
    /// ```
    #[must_use]
    pub fn size(&self, opportunity: &Opportunity, portfolio_value: Decimal) -> Decimal {
        let raw = match self.method {
            SizingMethod::Fixed => self.base_size,
            SizingMethod::ConfidenceScaled => {
                self.base_size * confidence_multiplier(opportunity.confidence)
            }
            SizingMethod::Kelly => {
                let fraction =
                    (opportunity.estimated_edge_percent / Decimal::ONE_HUNDRED).min(kelly_cap());
                portfolio_value * fraction
            }
        };

        raw.min(self.max_size).max(Decimal::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opportunity::{OpportunityType, Strength};
    use rust_decimal_macros::dec;

    fn opportunity(confidence: Confidence, edge_percent: Decimal) -> Opportunity {
        Opportunity::new(OpportunityType::WideSpread, confidence, Strength::Hard, "T")
            .with_edge(dec!(10), edge_percent)
    }

    // ==================== Fixed ====================

    #[test]
    fn test_fixed_uses_base_size() {
        let sizer = PositionSizer::new(SizingMethod::Fixed, dec!(500), dec!(1000));
        assert_eq!(sizer.size(&opportunity(Confidence::Low, dec!(5)), dec!(10000)), dec!(500));
    }

    #[test]
    fn test_fixed_clamped_to_max() {
        let sizer = PositionSizer::new(SizingMethod::Fixed, dec!(1500), dec!(1000));
        assert_eq!(sizer.size(&opportunity(Confidence::High, dec!(5)), dec!(10000)), dec!(1000));
    }

    // ==================== Confidence Scaled ====================

    #[test]
    fn test_confidence_scaled_multipliers() {
        let sizer = PositionSizer::new(SizingMethod::ConfidenceScaled, dec!(500), dec!(1000));
        assert_eq!(sizer.size(&opportunity(Confidence::Low, dec!(5)), dec!(0)), dec!(250));
        assert_eq!(sizer.size(&opportunity(Confidence::Medium, dec!(5)), dec!(0)), dec!(375));
        assert_eq!(sizer.size(&opportunity(Confidence::High, dec!(5)), dec!(0)), dec!(500));
    }

    #[test]
    fn test_confidence_scaled_clamped_to_max() {
        let sizer = PositionSizer::new(SizingMethod::ConfidenceScaled, dec!(2000), dec!(1000));
        assert_eq!(sizer.size(&opportunity(Confidence::High, dec!(5)), dec!(0)), dec!(1000));
    }

    // ==================== Kelly ====================

    #[test]
    fn test_kelly_uses_edge_percent_fraction() {
        let sizer = PositionSizer::new(SizingMethod::Kelly, dec!(500), dec!(5000));
        // 4% of 10000
        assert_eq!(sizer.size(&opportunity(Confidence::High, dec!(4)), dec!(10000)), dec!(400));
    }

    #[test]
    fn test_kelly_fraction_capped_at_quarter() {
        let sizer = PositionSizer::new(SizingMethod::Kelly, dec!(500), dec!(100000));
        assert_eq!(sizer.size(&opportunity(Confidence::High, dec!(80)), dec!(10000)), dec!(2500));
    }

    #[test]
    fn test_kelly_clamped_to_max() {
        let sizer = PositionSizer::new(SizingMethod::Kelly, dec!(500), dec!(1000));
        assert_eq!(sizer.size(&opportunity(Confidence::High, dec!(20)), dec!(10000)), dec!(1000));
    }

    #[test]
    fn test_kelly_negative_edge_sizes_zero() {
        let sizer = PositionSizer::new(SizingMethod::Kelly, dec!(500), dec!(1000));
        assert_eq!(sizer.size(&opportunity(Confidence::High, dec!(-5)), dec!(10000)), Decimal::ZERO);
    }

    #[test]
    fn test_sizing_method_serde_names() {
        let method: SizingMethod = serde_json::from_str("\"confidence_scaled\"").unwrap();
        assert_eq!(method, SizingMethod::ConfidenceScaled);
        assert_eq!(serde_json::to_string(&SizingMethod::Kelly).unwrap(), "\"kelly\"");
    }
}
