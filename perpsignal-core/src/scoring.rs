//! Signal scorer — weighted multi-factor vote between long and short.
//!
//! The factors form a fixed rule table. Each factor is an ordered list of
//! branches; the first branch whose predicate holds awards its points and
//! contributes its note to the rationale. Every factor ends in a catch-all
//! branch, so the rationale length depends only on which optional inputs
//! (the higher-timeframe bias) were supplied.
//!
//! After the table: direction resolution, confidence mapping, the chop
//! penalty, and finally the VWAP-proximity filter. The two regime penalties
//! stack when both apply.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::config::ScoringConfig;
use crate::domain::{Direction, IndicatorSnapshot, PerpMarketSnapshot, Regime};

/// Higher-timeframe trend supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HtfBias {
    pub direction: Direction,
    /// Timeframe label for the rationale, e.g. `"15m"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl HtfBias {
    pub fn new(direction: Direction, label: impl Into<String>) -> Self {
        Self {
            direction,
            label: Some(label.into()),
        }
    }

    fn label(&self) -> &str {
        self.label.as_deref().unwrap_or("HTF")
    }
}

/// Everything the scorer looks at.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub indicators: &'a IndicatorSnapshot,
    pub perp: &'a PerpMarketSnapshot,
    pub last_price: f64,
    pub bias: Option<&'a HtfBias>,
}

/// Scorer output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub direction: Direction,
    pub confidence: u32,
    pub regime: Regime,
    pub rationale: Vec<String>,
    pub long_score: u32,
    pub short_score: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Award {
    Neutral,
    Long(u32),
    Short(u32),
    Both(u32),
    Choppy,
}

impl Award {
    fn to(direction: Direction, points: u32) -> Self {
        match direction {
            Direction::Long => Award::Long(points),
            Direction::Short => Award::Short(points),
        }
    }
}

#[derive(Debug)]
struct Branch {
    when: bool,
    award: Award,
    note: Cow<'static, str>,
}

fn when(cond: bool, award: Award, note: impl Into<Cow<'static, str>>) -> Branch {
    Branch {
        when: cond,
        award,
        note: note.into(),
    }
}

fn otherwise(award: Award, note: impl Into<Cow<'static, str>>) -> Branch {
    when(true, award, note)
}

type Factor = Vec<Branch>;

/// Builds the ordered factor table for one input.
fn rule_table(input: &ScoringInput<'_>, cfg: &ScoringConfig) -> Vec<Factor> {
    let ind = input.indicators;
    let perp = input.perp;
    let price = input.last_price;
    let w = &cfg.weights;
    let t = &cfg.thresholds;
    let trend_side = if ind.trend_is_up() {
        Direction::Long
    } else {
        Direction::Short
    };

    let mut table = vec![
        vec![
            when(
                ind.ema20 > ind.ema50,
                Award::Long(w.ema_trend),
                "EMA20 is above EMA50 (bullish trend).",
            ),
            otherwise(
                Award::Short(w.ema_trend),
                "EMA20 is below EMA50 (bearish trend).",
            ),
        ],
        vec![
            when(
                ind.adx14 >= t.adx_strong,
                Award::to(trend_side, w.adx_strength),
                "ADX confirms a strong trend regime.",
            ),
            when(
                ind.adx14 < t.adx_choppy,
                Award::Choppy,
                "ADX is very low; market is likely choppy.",
            ),
            otherwise(Award::Neutral, "ADX indicates a moderate trend regime."),
        ],
        vec![
            when(
                ind.macd_histogram > 0.0 && ind.macd > ind.macd_signal,
                Award::Long(w.macd_momentum),
                "MACD momentum is positive.",
            ),
            when(
                ind.macd_histogram < 0.0 && ind.macd < ind.macd_signal,
                Award::Short(w.macd_momentum),
                "MACD momentum is negative.",
            ),
            otherwise(Award::Neutral, "MACD momentum is mixed."),
        ],
        vec![
            when(
                ind.rsi14 > t.rsi_bull_floor && ind.rsi14 < t.rsi_overbought,
                Award::Long(w.rsi_continuation),
                "RSI supports continuation to the upside.",
            ),
            when(
                ind.rsi14 < t.rsi_bear_ceiling && ind.rsi14 > t.rsi_oversold,
                Award::Short(w.rsi_continuation),
                "RSI supports continuation to the downside.",
            ),
            when(
                ind.rsi14 >= t.rsi_overbought,
                Award::Short(w.rsi_reversal),
                "RSI is overbought; upside may be exhausted.",
            ),
            when(
                ind.rsi14 <= t.rsi_oversold,
                Award::Long(w.rsi_reversal),
                "RSI is oversold; rebound risk is elevated.",
            ),
            otherwise(Award::Neutral, "RSI is neutral."),
        ],
        vec![
            when(
                ind.stoch_rsi_k > ind.stoch_rsi_d && ind.stoch_rsi_k < t.stoch_rsi_upper,
                Award::Long(w.stoch_rsi_timing),
                "StochRSI timing is aligned for long continuation.",
            ),
            when(
                ind.stoch_rsi_k < ind.stoch_rsi_d && ind.stoch_rsi_k > t.stoch_rsi_lower,
                Award::Short(w.stoch_rsi_timing),
                "StochRSI timing is aligned for short continuation.",
            ),
            otherwise(Award::Neutral, "StochRSI timing is neutral."),
        ],
        vec![
            when(
                price >= ind.vwap,
                Award::Long(w.vwap_side),
                "Price is above VWAP (intraday buyer control).",
            ),
            otherwise(
                Award::Short(w.vwap_side),
                "Price is below VWAP (intraday seller control).",
            ),
        ],
        vec![
            when(
                price > ind.bb_upper,
                Award::Short(w.bollinger_stretch),
                "Price is stretched above Bollinger upper band.",
            ),
            when(
                price < ind.bb_lower,
                Award::Long(w.bollinger_stretch),
                "Price is stretched below Bollinger lower band.",
            ),
            otherwise(Award::Neutral, "Price is inside Bollinger bands."),
        ],
        vec![
            when(
                perp.funding_rate > t.funding_rate && perp.funding_rate_avg > 0.0,
                Award::Short(w.funding_crowding),
                "Funding is persistently positive (long crowding risk).",
            ),
            when(
                perp.funding_rate < -t.funding_rate && perp.funding_rate_avg < 0.0,
                Award::Long(w.funding_crowding),
                "Funding is persistently negative (short crowding risk).",
            ),
            otherwise(Award::Neutral, "Funding is neutral."),
        ],
        vec![
            when(
                perp.premium_pct > t.premium_pct,
                Award::Short(w.premium_crowding),
                "Mark trades at a premium to index (possible long overheating).",
            ),
            when(
                perp.premium_pct < -t.premium_pct,
                Award::Long(w.premium_crowding),
                "Mark trades at a discount to index (possible short exhaustion).",
            ),
            otherwise(Award::Neutral, "Mark/index premium is balanced."),
        ],
    ];

    if let Some(bias) = input.bias {
        let mood = match bias.direction {
            Direction::Long => "bullish",
            Direction::Short => "bearish",
        };
        table.push(vec![otherwise(
            Award::to(bias.direction, w.htf_bias),
            format!("Higher-timeframe bias ({}) is {mood}.", bias.label()),
        )]);
    }

    let atr_pct = ind.atr_pct();
    table.push(vec![
        when(
            atr_pct < t.atr_pct_choppy,
            Award::Choppy,
            "ATR is very low for intraday; avoid chop-heavy entries.",
        ),
        when(
            atr_pct < t.atr_pct_elevated,
            Award::Both(w.stable_volatility),
            "ATR indicates controlled intraday volatility.",
        ),
        otherwise(
            Award::Neutral,
            "ATR indicates elevated volatility; execution risk rises.",
        ),
    ]);

    table
}

/// Scores one snapshot into a direction, confidence and regime.
///
/// Pure and deterministic: identical inputs give identical output,
/// rationale included.
pub fn score_signal(input: &ScoringInput<'_>, cfg: &ScoringConfig) -> ScoreCard {
    let mut long_score = 0u32;
    let mut short_score = 0u32;
    let mut regime = Regime::Tradeable;
    let mut rationale = Vec::new();

    for factor in rule_table(input, cfg) {
        let Some(branch) = factor.into_iter().find(|b| b.when) else {
            continue;
        };
        match branch.award {
            Award::Neutral => {}
            Award::Long(points) => long_score = long_score.saturating_add(points),
            Award::Short(points) => short_score = short_score.saturating_add(points),
            Award::Both(points) => {
                long_score = long_score.saturating_add(points);
                short_score = short_score.saturating_add(points);
            }
            Award::Choppy => regime = Regime::Choppy,
        }
        rationale.push(branch.note.into_owned());
    }

    let direction = if long_score > short_score {
        Direction::Long
    } else if short_score > long_score {
        Direction::Short
    } else {
        rationale.push("Scores are tied; trend direction used as tie-breaker.".into());
        if input.indicators.trend_is_up() {
            Direction::Long
        } else {
            Direction::Short
        }
    };

    let c = &cfg.confidence;
    let diff = long_score.abs_diff(short_score);
    let mut confidence = if diff >= c.strong_diff {
        c.strong_base.saturating_add(diff).min(c.ceiling)
    } else {
        rationale.push("Indicator confluence is weak; confidence is reduced.".into());
        c.weak_base.saturating_add(diff).max(c.weak_floor)
    };

    if regime == Regime::Choppy {
        confidence = confidence.saturating_sub(c.choppy_penalty).max(c.floor);
        rationale.push("Regime filter reduced confidence due to intraday chop risk.".into());
    }

    let vwap_distance_pct =
        (input.last_price - input.indicators.vwap).abs() / input.indicators.vwap.max(1.0) * 100.0;
    if vwap_distance_pct < cfg.thresholds.vwap_proximity_pct {
        regime = Regime::Choppy;
        confidence = confidence.saturating_sub(c.vwap_penalty).max(c.floor);
        rationale.push(format!(
            "VWAP filter: price is within {}% of VWAP; no clear intraday edge.",
            cfg.thresholds.vwap_proximity_pct
        ));
    }

    ScoreCard {
        direction,
        confidence: confidence.min(c.ceiling).max(c.floor),
        regime,
        rationale,
        long_score,
        short_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicators::sample_indicators;

    fn perp() -> PerpMarketSnapshot {
        PerpMarketSnapshot::neutral("BTC_USDC_PERP", 50_000.0)
    }

    fn score(ind: &IndicatorSnapshot, perp: &PerpMarketSnapshot, price: f64) -> ScoreCard {
        score_signal(
            &ScoringInput {
                indicators: ind,
                perp,
                last_price: price,
                bias: None,
            },
            &ScoringConfig::default(),
        )
    }

    /// Indicators with no directional content apart from what a test sets.
    fn flat() -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi14: 50.0,
            ema20: 50_000.0,
            ema50: 50_000.0,
            macd: 0.0,
            macd_signal: 0.0,
            macd_histogram: 0.0,
            atr14: 2_000.0,
            adx14: 20.0,
            bb_upper: 51_000.0,
            bb_middle: 50_000.0,
            bb_lower: 49_000.0,
            stoch_rsi_k: 50.0,
            stoch_rsi_d: 50.0,
            vwap: 49_000.0,
        }
    }

    #[test]
    fn bullish_confluence_scores_long() {
        let card = score(&sample_indicators(), &perp(), 50_000.0);
        // EMA 28 + ADX 10 + MACD 18 + RSI 4 + StochRSI 3 + stable ATR 3
        assert_eq!(card.long_score, 66);
        // below VWAP 10 + stable ATR 3
        assert_eq!(card.short_score, 13);
        assert_eq!(card.direction, Direction::Long);
        assert_eq!(card.confidence, 100);
        assert_eq!(card.regime, Regime::Tradeable);
    }

    #[test]
    fn rationale_has_one_line_per_factor() {
        let card = score(&sample_indicators(), &perp(), 50_000.0);
        assert_eq!(card.rationale.len(), 10);
        assert_eq!(card.rationale[0], "EMA20 is above EMA50 (bullish trend).");
        assert_eq!(card.rationale[9], "ATR indicates controlled intraday volatility.");
    }

    #[test]
    fn bias_adds_points_and_names_timeframe() {
        let ind = sample_indicators();
        let p = perp();
        let bias = HtfBias::new(Direction::Short, "15m");
        let card = score_signal(
            &ScoringInput {
                indicators: &ind,
                perp: &p,
                last_price: 50_000.0,
                bias: Some(&bias),
            },
            &ScoringConfig::default(),
        );
        assert_eq!(card.short_score, 29);
        assert!(card
            .rationale
            .iter()
            .any(|l| l == "Higher-timeframe bias (15m) is bearish."));
        assert_eq!(card.rationale.len(), 11);
    }

    #[test]
    fn bias_without_label_says_htf() {
        let ind = sample_indicators();
        let p = perp();
        let bias = HtfBias {
            direction: Direction::Long,
            label: None,
        };
        let card = score_signal(
            &ScoringInput {
                indicators: &ind,
                perp: &p,
                last_price: 50_000.0,
                bias: Some(&bias),
            },
            &ScoringConfig::default(),
        );
        assert!(card.rationale.iter().any(|l| l.contains("(HTF) is bullish")));
    }

    #[test]
    fn adx_strength_goes_to_trend_side() {
        let mut ind = flat();
        ind.ema20 = 49_000.0;
        ind.adx14 = 30.0;
        let card = score(&ind, &perp(), 50_000.0);
        // EMA short 28 + ADX short 10; VWAP long 10
        assert_eq!(card.short_score, 38);
        assert_eq!(card.long_score, 10);
    }

    #[test]
    fn low_adx_forces_choppy_with_penalty() {
        let mut ind = flat();
        ind.ema20 = 50_100.0;
        ind.adx14 = 12.0;
        let card = score(&ind, &perp(), 50_000.0);
        assert_eq!(card.regime, Regime::Choppy);
        // long 28 + 10 = 38 → 88, then -18
        assert_eq!(card.confidence, 70);
        assert!(card
            .rationale
            .iter()
            .any(|l| l.starts_with("Regime filter reduced confidence")));
    }

    #[test]
    fn rsi_bands() {
        // (rsi, long points, short points) on top of the flat baseline
        let cases = [
            (60.0, 4, 0),
            (40.0, 0, 4),
            (75.0, 0, 5),
            (70.0, 0, 5),
            (25.0, 5, 0),
            (30.0, 5, 0),
            (50.0, 0, 0),
        ];
        for (rsi, long, short) in cases {
            let mut ind = flat();
            ind.rsi14 = rsi;
            let card = score(&ind, &perp(), 50_000.0);
            // flat baseline: EMA tie goes short 28, price above VWAP goes long 10
            assert_eq!(card.long_score, 10 + long, "rsi {rsi}");
            assert_eq!(card.short_score, 28 + short, "rsi {rsi}");
        }
    }

    #[test]
    fn stoch_rsi_bounds() {
        let mut ind = flat();
        ind.stoch_rsi_k = 85.0;
        ind.stoch_rsi_d = 70.0;
        let card = score(&ind, &perp(), 50_000.0);
        assert!(card.rationale.contains(&"StochRSI timing is neutral.".to_string()));

        ind.stoch_rsi_k = 30.0;
        ind.stoch_rsi_d = 40.0;
        let card = score(&ind, &perp(), 50_000.0);
        assert_eq!(card.short_score, 28 + 3);
    }

    #[test]
    fn funding_and_premium_are_contrarian() {
        let ind = flat();
        let crowded_longs = PerpMarketSnapshot::new("P", 0.0001, 0.00008, 0.0, 50_100.0, 50_000.0);
        let card = score(&ind, &crowded_longs, 50_000.0);
        assert_eq!(card.short_score, 28 + 4 + 4);

        let crowded_shorts =
            PerpMarketSnapshot::new("P", -0.0001, -0.00002, 0.0, 49_900.0, 50_000.0);
        let card = score(&ind, &crowded_shorts, 50_000.0);
        assert_eq!(card.long_score, 10 + 4 + 4);
    }

    #[test]
    fn funding_needs_matching_average() {
        let ind = flat();
        let mixed = PerpMarketSnapshot::new("P", 0.0001, -0.00001, 0.0, 50_000.0, 50_000.0);
        let card = score(&ind, &mixed, 50_000.0);
        assert!(card.rationale.contains(&"Funding is neutral.".to_string()));
    }

    #[test]
    fn bollinger_stretch() {
        let ind = flat();
        let card = score(&ind, &perp(), 52_000.0);
        assert!(card
            .rationale
            .contains(&"Price is stretched above Bollinger upper band.".to_string()));
        assert_eq!(card.short_score, 28 + 3);
    }

    #[test]
    fn tie_breaks_toward_trend() {
        // EMA tie (short 28) vs VWAP long 10 + MACD long 18 = 28
        let mut ind = flat();
        ind.macd = 2.0;
        ind.macd_signal = 1.0;
        ind.macd_histogram = 1.0;
        let card = score(&ind, &perp(), 50_000.0);
        assert_eq!(card.long_score, card.short_score);
        assert_eq!(card.direction, Direction::Long);
        assert!(card
            .rationale
            .iter()
            .any(|l| l.starts_with("Scores are tied")));
        assert_eq!(card.confidence, 45);
    }

    #[test]
    fn weak_confluence_floor() {
        let mut ind = flat();
        ind.ema20 = 50_100.0;
        ind.vwap = 51_000.0;
        ind.stoch_rsi_k = 40.0;
        ind.stoch_rsi_d = 45.0;
        ind.rsi14 = 40.0;
        let card = score(&ind, &perp(), 50_000.0);
        // long 28; short 10 + 3 + 4 = 17; diff 11 → 56
        assert_eq!(card.confidence, 56);
        assert!(card
            .rationale
            .iter()
            .any(|l| l.starts_with("Indicator confluence is weak")));
    }

    #[test]
    fn stable_volatility_boosts_both_sides() {
        let mut ind = flat();
        ind.atr14 = 200.0;
        let card = score(&ind, &perp(), 50_000.0);
        assert_eq!(card.long_score, 13);
        assert_eq!(card.short_score, 31);
    }

    #[test]
    fn tiny_atr_is_choppy() {
        let mut ind = flat();
        ind.atr14 = 10.0;
        let card = score(&ind, &perp(), 50_000.0);
        assert_eq!(card.regime, Regime::Choppy);
    }

    #[test]
    fn vwap_proximity_stacks_with_chop_penalty() {
        let mut ind = flat();
        ind.ema20 = 50_100.0;
        ind.adx14 = 12.0;
        ind.vwap = 50_000.0;
        let card = score(&ind, &perp(), 50_001.0);
        // long 38 → 88, chop -18 → 70, vwap -12 → 58
        assert_eq!(card.confidence, 58);
        assert_eq!(card.regime, Regime::Choppy);
        assert!(card.rationale.last().unwrap().starts_with("VWAP filter"));
    }

    #[test]
    fn penalties_respect_floor() {
        let mut ind = flat();
        ind.atr14 = 10.0;
        ind.adx14 = 10.0;
        ind.vwap = 50_000.0;
        ind.macd = 2.0;
        ind.macd_signal = 1.0;
        ind.macd_histogram = 1.0;
        // EMA tie short 28, VWAP long 10 + MACD 18 = 28 → tie → 45, -18 → 27, -12 → 25
        let card = score(&ind, &perp(), 50_000.0);
        assert_eq!(card.confidence, 25);
    }

    #[test]
    fn extreme_weights_saturate() {
        let mut cfg = ScoringConfig::default();
        cfg.weights.ema_trend = u32::MAX;
        cfg.weights.vwap_side = u32::MAX;
        cfg.confidence.strong_base = u32::MAX;
        let ind = sample_indicators();
        let card = score_signal(
            &ScoringInput {
                indicators: &ind,
                perp: &perp(),
                last_price: 50_000.0,
                bias: None,
            },
            &cfg,
        );
        assert!(card.long_score == u32::MAX || card.short_score == u32::MAX);
        assert!(card.confidence <= cfg.confidence.ceiling);
    }

    #[test]
    fn deterministic_output() {
        let ind = sample_indicators();
        let p = perp();
        let a = score(&ind, &p, 50_000.0);
        let b = score(&ind, &p, 50_000.0);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
