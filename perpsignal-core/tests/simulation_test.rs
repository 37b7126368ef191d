//! Integration tests: recommendation → paper trade → simulated outcome.

use perpsignal_core::{
    evaluate_paper_trade, BuildRequest, Candle, ErrorKind, ExitKind, IndicatorSnapshot,
    OutcomeStatus, PaperTrade, PerpMarketSnapshot, RecommendationEngine, SimulationError,
};

fn indicators() -> IndicatorSnapshot {
    IndicatorSnapshot {
        rsi14: 58.0,
        ema20: 50_500.0,
        ema50: 50_000.0,
        macd: 20.0,
        macd_signal: 10.0,
        macd_histogram: 5.0,
        atr14: 150.0,
        adx14: 30.0,
        bb_upper: 51_000.0,
        bb_middle: 50_000.0,
        bb_lower: 49_000.0,
        stoch_rsi_k: 60.0,
        stoch_rsi_d: 50.0,
        vwap: 50_200.0,
    }
}

fn minute_candles(opened_at: i64, closes: &[(f64, f64, f64)]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &(high, low, close))| Candle {
            timestamp: opened_at + (i as i64 + 1) * 60_000,
            open: close,
            high,
            low,
            close,
            volume: 10.0,
        })
        .collect()
}

#[test]
fn long_recommendation_hits_take_profit() {
    // GIVEN a LONG recommendation with ATR levels (SL 49820, TP 51000)
    let rec = RecommendationEngine::default()
        .build(&BuildRequest::new(
            "BTC-USD",
            50_000.0,
            indicators(),
            PerpMarketSnapshot::neutral("BTC_USDC_PERP", 50_000.0),
        ))
        .unwrap();
    let opened_at = 1_700_000_000_000;
    let trade = PaperTrade::from_recommendation(&rec, opened_at).unwrap();

    // AND a path that grinds up through the target
    let candles = minute_candles(
        opened_at,
        &[
            (50_100.0, 49_900.0, 50_050.0),
            (50_600.0, 50_000.0, 50_550.0),
            (51_050.0, 50_500.0, 51_000.0),
        ],
    );

    // WHEN evaluated over a 15 minute horizon
    let out = evaluate_paper_trade(&trade, &candles, trade.horizon_end_ms(15)).unwrap();

    // THEN take-profit wins at +2%
    assert_eq!(out.status, OutcomeStatus::Success);
    assert_eq!(out.exit_kind, ExitKind::TakeProfit);
    assert_eq!(out.exit_price, 51_000.0);
    assert!((out.pnl_pct - 2.0).abs() < 1e-9);
}

#[test]
fn no_trade_cannot_be_simulated() {
    let mut ind = indicators();
    ind.adx14 = 10.0;
    let rec = RecommendationEngine::default()
        .build(&BuildRequest::new(
            "BTC-USD",
            50_000.0,
            ind,
            PerpMarketSnapshot::neutral("BTC_USDC_PERP", 50_000.0),
        ))
        .unwrap();
    let err = PaperTrade::from_recommendation(&rec, 0).unwrap_err();
    assert!(matches!(err, SimulationError::NotTradeable { .. }));
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn horizon_close_is_time_stop() {
    // GIVEN a short that never reaches either level
    let trade = PaperTrade {
        direction: perpsignal_core::Direction::Short,
        entry: 2_000.0,
        stop_loss: 2_030.0,
        take_profit: 1_950.0,
        opened_at_ms: 0,
    };
    let candles = minute_candles(
        0,
        &[
            (2_010.0, 1_990.0, 2_005.0),
            (2_015.0, 1_995.0, 1_990.0),
            (2_040.0, 1_900.0, 1_920.0),
        ],
    );

    // WHEN the horizon ends before the third candle
    let out = evaluate_paper_trade(&trade, &candles, 120_000).unwrap();

    // THEN the position closes at the last in-window close, in profit
    assert_eq!(out.exit_kind, ExitKind::TimeStop);
    assert_eq!(out.exit_price, 1_990.0);
    assert_eq!(out.status, OutcomeStatus::Success);
    assert!((out.pnl_pct - 0.5).abs() < 1e-9);
}

#[test]
fn outcome_json_is_stable() {
    let trade = PaperTrade {
        direction: perpsignal_core::Direction::Long,
        entry: 100.0,
        stop_loss: 99.0,
        take_profit: 102.0,
        opened_at_ms: 0,
    };
    let candles = minute_candles(0, &[(102.5, 98.5, 100.0)]);
    let out = evaluate_paper_trade(&trade, &candles, 60_000).unwrap();
    let json = serde_json::to_value(&out).unwrap();
    assert_eq!(json["status"], "FAILURE");
    assert_eq!(json["exit_kind"], "ambiguous_stop_loss");
}
