use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongSell,
    Sell,
    Hold,
    Buy,
    StrongBuy,
}

impl Recommendation {
    pub fn from_score(score: u8, bands: &RecommendationBands) -> Self {
        let score = f64::from(score);
        match score {
            s if s < bands.strong_sell_below => Recommendation::StrongSell,
            s if s < bands.sell_below => Recommendation::Sell,
            s if s < bands.hold_below => Recommendation::Hold,
            s if s < bands.buy_below => Recommendation::Buy,
            _ => Recommendation::StrongBuy,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongSell => "strong_sell",
            Recommendation::Sell => "sell",
            Recommendation::Hold => "hold",
            Recommendation::Buy => "buy",
            Recommendation::StrongBuy => "strong_buy",
        }
    }

    /// Human-readable label
    pub fn to_label(&self) -> &'static str {
        match self {
            Recommendation::StrongSell => "Strong Sell",
            Recommendation::Sell => "Sell",
            Recommendation::Hold => "Hold",
            Recommendation::Buy => "Buy",
            Recommendation::StrongBuy => "Strong Buy",
        }
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upper (exclusive) score bound of each band; anything at or above
/// `buy_below` is a strong buy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationBands {
    pub strong_sell_below: f64,
    pub sell_below: f64,
    pub hold_below: f64,
    pub buy_below: f64,
}

impl Default for RecommendationBands {
    fn default() -> Self {
        Self {
            strong_sell_below: 20.0,
            sell_below: 40.0,
            hold_below: 60.0,
            buy_below: 80.0,
        }
    }
}

impl RecommendationBands {
    /// Bands must be strictly increasing inside (0, 100]
    pub fn is_monotonic(&self) -> bool {
        let bounds = [self.strong_sell_below, self.sell_below, self.hold_below, self.buy_below];
        bounds.iter().all(|b| b.is_finite() && *b > 0.0 && *b <= 100.0)
            && bounds.windows(2).all(|w| w[0] < w[1])
    }
}
