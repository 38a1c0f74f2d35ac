//! Signal scenarios: indicator engine feeding the rule engine end to end.

use chrono::{DateTime, Duration, Utc};
use papertrade_core::config::{IndicatorConfig, SignalConfig, SignalSourceKind};
use papertrade_core::domain::{Candle, SignalDirection, SignalOrigin};
use papertrade_core::indicators::IndicatorEngine;
use papertrade_core::rng::RngHierarchy;
use papertrade_core::signal::{build_source, FallbackSource, RuleEngine, SignalSource};

fn candles(closes: &[f64]) -> Vec<Candle> {
    let base = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let start = base + Duration::seconds(5 * i as i64);
            Candle {
                start_time: start,
                end_time: start + Duration::seconds(5),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 100.0,
                synthetic: false,
            }
        })
        .collect()
}

fn rising(n: usize) -> Vec<Candle> {
    let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
    candles(&closes)
}

#[test]
fn rising_series_of_30_yields_buy_call() {
    let snapshot = IndicatorEngine::compute(&IndicatorConfig::default(), &rising(30)).unwrap();
    assert!(snapshot.rsi.unwrap() > 99.0);
    assert!(snapshot.ma_slow.is_none());

    let signal = RuleEngine::new(SignalConfig::default()).evaluate(&snapshot);
    assert_eq!(signal.direction, SignalDirection::BuyCall);
    assert!(signal.net_score >= 1.5);
    assert!(signal.confidence > 0.0);
    assert!(signal
        .rationale
        .iter()
        .any(|r| r == "MACD line above signal line"));
    assert!(signal.rationale.last().unwrap().starts_with("Strong trend"));
}

#[test]
fn long_rising_series_has_fast_above_slow() {
    let snapshot = IndicatorEngine::compute(&IndicatorConfig::default(), &rising(130)).unwrap();
    assert!(snapshot.ma_fast.unwrap() > snapshot.ma_slow.unwrap());

    let signal = RuleEngine::new(SignalConfig::default()).evaluate(&snapshot);
    assert_eq!(signal.direction, SignalDirection::BuyCall);
    assert!(signal.rationale.iter().any(|r| r == "Fast MA above slow MA"));
}

#[test]
fn falling_series_yields_buy_put() {
    let closes: Vec<f64> = (0..130).map(|i| 500.0 - i as f64).collect();
    let snapshot = IndicatorEngine::compute(&IndicatorConfig::default(), &candles(&closes)).unwrap();
    let signal = RuleEngine::new(SignalConfig::default()).evaluate(&snapshot);
    assert_eq!(signal.direction, SignalDirection::BuyPut);
    assert!(signal.net_score <= -1.5);
}

#[test]
fn history_one_short_of_fast_window_is_hold_zero() {
    let config = IndicatorConfig::default();
    let snapshot =
        IndicatorEngine::compute(&config, &candles(&vec![250.0; config.ma_fast - 1])).unwrap();
    assert!(snapshot.ma_fast.is_none());
    assert!(snapshot.ma_slow.is_none());

    let signal = RuleEngine::new(SignalConfig::default()).evaluate(&snapshot);
    assert_eq!(signal.direction, SignalDirection::Hold);
    assert_eq!(signal.confidence, 0.0);
    assert!(signal.rationale.is_empty());
}

#[test]
fn history_one_short_of_slow_window_has_no_ma_rationale() {
    let config = IndicatorConfig::default();
    let snapshot =
        IndicatorEngine::compute(&config, &candles(&vec![250.0; config.ma_slow - 1])).unwrap();
    assert!(snapshot.ma_slow.is_none());

    let signal = RuleEngine::new(SignalConfig::default()).evaluate(&snapshot);
    assert_eq!(signal.direction, SignalDirection::Hold);
    assert_eq!(signal.confidence, 0.0);
    assert!(!signal.rationale.iter().any(|r| r.contains("MA")));
}

#[test]
fn same_snapshot_same_signal() {
    let snapshot = IndicatorEngine::compute(&IndicatorConfig::default(), &rising(60)).unwrap();
    let engine = RuleEngine::new(SignalConfig::default());
    assert_eq!(engine.evaluate(&snapshot), engine.evaluate(&snapshot));
}

#[test]
fn external_source_falls_back_when_rate_limited() {
    let mut config = SignalConfig {
        source: SignalSourceKind::SimulatedExternal,
        ..SignalConfig::default()
    };
    config.external.request_limit = 1;
    let rules = RuleEngine::new(config.clone());
    let mut source = FallbackSource::new(build_source(&config, &RngHierarchy::new(42)), rules.clone());

    let history = rising(30);
    let snapshot = IndicatorEngine::compute(&IndicatorConfig::default(), &history).unwrap();

    let first = source.produce(&snapshot, &history).unwrap();
    assert_eq!(first.origin, SignalOrigin::SimulatedExternal);

    let second = source.produce(&snapshot, &history).unwrap();
    assert_eq!(second.origin, SignalOrigin::RulesFallback);
    assert_eq!(second.direction, rules.evaluate(&snapshot).direction);
    assert!(second
        .fallback_reason
        .as_deref()
        .unwrap()
        .contains("request limit reached"));
}
