//! Criterion benchmarks for papertrade hot paths.
//!
//! Benchmarks:
//! 1. Pipeline step loop on a simulated clock
//! 2. Indicator engine replay over a candle history
//! 3. Rule evaluation of a complete snapshot

use chrono::{DateTime, Duration, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use papertrade_core::config::{IndicatorConfig, PipelineConfig, SignalConfig};
use papertrade_core::domain::Candle;
use papertrade_core::indicators::IndicatorEngine;
use papertrade_core::signal::RuleEngine;
use papertrade_core::sink::NullSink;
use papertrade_core::Pipeline;

// ── Helpers ──────────────────────────────────────────────────────────

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn make_candles(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = 60_000.0 + (i as f64 * 0.1).sin() * 250.0;
            let open = close - 3.0;
            let start = t0() + Duration::seconds(5 * i as i64);
            Candle {
                start_time: start,
                end_time: start + Duration::seconds(5),
                open,
                high: close + 15.0,
                low: open - 15.0,
                close,
                volume: 500.0,
                synthetic: false,
            }
        })
        .collect()
}

// ── 1. Pipeline steps ────────────────────────────────────────────────

fn bench_pipeline_steps(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_steps");
    for steps in [500_i64, 5_000] {
        group.bench_with_input(BenchmarkId::from_parameter(steps), &steps, |b, &steps| {
            b.iter(|| {
                let mut pipeline =
                    Pipeline::new(PipelineConfig::default(), Box::new(NullSink)).unwrap();
                for i in 0..steps {
                    let out = pipeline.step(t0() + Duration::seconds(2 * i)).unwrap();
                    black_box(out);
                }
            })
        });
    }
    group.finish();
}

// ── 2. Indicator replay ──────────────────────────────────────────────

fn bench_indicator_replay(c: &mut Criterion) {
    let config = IndicatorConfig::default();
    let candles = make_candles(1_000);
    c.bench_function("indicator_replay_1000", |b| {
        b.iter(|| IndicatorEngine::compute(black_box(&config), black_box(&candles)))
    });
}

// ── 3. Rule evaluation ───────────────────────────────────────────────

fn bench_rule_evaluation(c: &mut Criterion) {
    let snapshot = IndicatorEngine::compute(&IndicatorConfig::default(), &make_candles(200)).unwrap();
    let engine = RuleEngine::new(SignalConfig::default());
    c.bench_function("rule_evaluate", |b| {
        b.iter(|| engine.evaluate(black_box(&snapshot)))
    });
}

criterion_group!(
    benches,
    bench_pipeline_steps,
    bench_indicator_replay,
    bench_rule_evaluation
);
criterion_main!(benches);
