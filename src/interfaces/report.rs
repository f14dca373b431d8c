//! Text rendering of evaluation cycles

use crate::application::signals::{CycleReport, NotificationOutcome};
use crate::domain::market::PivotPoint;
use std::fmt::Write;
use tracing::info;

/// Pivots of each kind listed in a summary
pub const LISTED_PIVOTS: usize = 5;

/// Presents the outcome of a cycle to whoever watches the process
pub trait Renderer: Send + Sync {
    fn render(&self, report: &CycleReport);
}

/// Logs a multi-line dashboard summary for every cycle
#[derive(Debug, Clone, Copy, Default)]
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn render(&self, report: &CycleReport) {
        info!("\n{}", render_summary(report));
    }
}

fn value(v: Option<f64>, precision: usize) -> String {
    v.map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "n/a".to_string())
}

fn pivot_list(pivots: &[PivotPoint]) -> String {
    if pivots.is_empty() {
        return "none".to_string();
    }
    pivots
        .iter()
        .rev()
        .map(|p| format!("{:.2}", p.price))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Dashboard text for one cycle: latest values, structure and signal
pub fn render_summary(report: &CycleReport) -> String {
    let snapshot = &report.snapshot;
    let pivots = &report.structure.pivots;
    let mut out = String::new();

    let latest = report
        .latest_candle()
        .and_then(|c| c.open_time_utc())
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "n/a".to_string());

    let _ = writeln!(
        out,
        "=== {} | {} candles | last {} UTC ===",
        report.symbol,
        report.series.len(),
        latest
    );
    let _ = writeln!(out, "Close:    {}", value(snapshot.close, 2));
    if snapshot.ready {
        let _ = writeln!(out, "Trend:    {}", snapshot.trend);
    } else {
        let _ = writeln!(out, "Trend:    indicators warming up");
    }
    let _ = writeln!(out, "RSI:      {}", value(snapshot.rsi, 2));
    let _ = writeln!(out, "MACD:     {}", value(snapshot.macd_histogram, 4));
    let _ = writeln!(
        out,
        "Volume:   {} vs avg {}",
        value(snapshot.volume, 2),
        value(snapshot.volume_average, 2)
    );
    let _ = writeln!(out, "BOS:      {}", snapshot.bos);
    let _ = writeln!(out, "Sweep:    {}", snapshot.sweep);
    let _ = writeln!(
        out,
        "Supports:    {}",
        pivot_list(pivots.recent_supports(LISTED_PIVOTS))
    );
    let _ = writeln!(
        out,
        "Resistances: {}",
        pivot_list(pivots.recent_resistances(LISTED_PIVOTS))
    );

    let _ = write!(out, "Signal:   {}", snapshot.classification);
    match report.notification {
        NotificationOutcome::None => {}
        NotificationOutcome::Sent(_) => out.push_str(" (alert sent)"),
        NotificationOutcome::Failed(_) => out.push_str(" (alert failed, will retry)"),
        NotificationOutcome::Suppressed(_) => out.push_str(" (already alerted)"),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::market_data::{IndicatorEngine, IndicatorParams};
    use crate::application::signals::SignalPipeline;
    use crate::infrastructure::mock::buy_confluence_series;
    use crate::infrastructure::notifications::LogNotifier;
    use std::sync::Arc;

    fn report(len: usize) -> CycleReport {
        let engine = IndicatorEngine::new(IndicatorParams::default()).unwrap();
        let pipeline = SignalPipeline::new("BTCUSDT", engine, Arc::new(LogNotifier));
        let series = buy_confluence_series(0, 60_000);
        pipeline.evaluate(series[..len].to_vec().into())
    }

    #[test]
    fn test_summary_for_strong_buy() {
        let summary = render_summary(&report(500));

        assert!(summary.starts_with("=== BTCUSDT | 500 candles"));
        assert!(summary.contains("Close:    100.03"));
        assert!(summary.contains("Trend:    Uptrend"));
        assert!(summary.contains("BOS:      BOS Up"));
        assert!(summary.contains("Sweep:    Sweep Below Support"));
        assert!(summary.contains("Supports:    99.99"));
        assert!(summary.ends_with("Signal:   STRONG BUY"));
    }

    #[test]
    fn test_summary_while_warming_up() {
        let summary = render_summary(&report(5));

        assert!(summary.contains("Trend:    indicators warming up"));
        assert!(summary.contains("RSI:      n/a"));
        assert!(summary.contains("BOS:      Not enough data for BOS"));
        assert!(summary.contains("Supports:    none"));
        assert!(summary.ends_with("Signal:   HOLD"));
    }
}
