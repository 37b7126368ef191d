//! Heuristic probability of a positive PnL, used to rank opportunities.

use crate::domain::{Recommendation, Regime};

/// Adjusts confidence by signal, regime and risk/reward into a 1-99 score.
pub fn estimate_positive_pnl_probability(rec: &Recommendation) -> u32 {
    let mut probability = f64::from(rec.confidence);

    probability += if rec.is_actionable() { 4.0 } else { -30.0 };
    probability += match rec.regime {
        Regime::Choppy => -14.0,
        Regime::Tradeable => 3.0,
    };

    let rr = rec.risk_reward_ratio;
    if rr >= 2.0 {
        probability += 9.0;
    } else if rr >= 1.5 {
        probability += 5.0;
    } else if rr < 1.2 {
        probability -= 16.0;
    } else if rr < 1.4 {
        probability -= 8.0;
    }

    probability.clamp(1.0, 99.0).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicators::sample_indicators;
    use crate::domain::{Action, PerpMarketSnapshot, Signal};

    fn rec(signal: Signal, regime: Regime, confidence: u32, rr: f64) -> Recommendation {
        Recommendation {
            pair: "BTC-USD".into(),
            signal,
            action: Action::from(signal),
            regime,
            entry: 100.0,
            stop_loss: 99.0,
            take_profit: 102.0,
            leverage: None,
            position_size_usd: None,
            estimated_pnl_at_stop_loss: None,
            estimated_pnl_at_take_profit: None,
            risk_reward_ratio: rr,
            daily_target_usd: 100.0,
            trades_to_daily_target: None,
            objective: None,
            confidence,
            rationale: Vec::new(),
            indicators: sample_indicators(),
            perp: PerpMarketSnapshot::neutral("BTC_USDC_PERP", 100.0),
        }
    }

    #[test]
    fn strong_long_is_capped() {
        assert_eq!(
            estimate_positive_pnl_probability(&rec(Signal::Long, Regime::Tradeable, 100, 5.0)),
            99
        );
    }

    #[test]
    fn rr_bands() {
        let p = |rr| estimate_positive_pnl_probability(&rec(Signal::Long, Regime::Tradeable, 60, rr));
        assert_eq!(p(2.0), 76);
        assert_eq!(p(1.5), 72);
        assert_eq!(p(1.45), 67);
        assert_eq!(p(1.3), 59);
        assert_eq!(p(1.0), 51);
    }

    #[test]
    fn choppy_no_trade_floors_at_one() {
        assert_eq!(
            estimate_positive_pnl_probability(&rec(Signal::NoTrade, Regime::Choppy, 25, 0.0)),
            1
        );
    }
}
