use crate::application::market_data::indicator_engine::IndicatorRow;
use crate::domain::market::{BosState, Candle, LiquiditySweep, StructureState};
use crate::domain::signal::{Classification, SignalSnapshot, Trend};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalThresholds {
    pub rsi_oversold: f64,
    pub rsi_overbought: f64,
    /// Close must be at or below `lower_band * bollinger_buy_factor`
    pub bollinger_buy_factor: f64,
    /// Close must be at or above `upper_band * bollinger_sell_factor`
    pub bollinger_sell_factor: f64,
    pub volume_window: usize,
}

impl Default for SignalThresholds {
    fn default() -> Self {
        Self {
            rsi_oversold: 30.0,
            rsi_overbought: 70.0,
            bollinger_buy_factor: 1.005,
            bollinger_sell_factor: 0.995,
            volume_window: 20,
        }
    }
}

/// Fuses trend, indicators and structure into a classification.
///
/// A strong signal needs all seven conditions of its side at once; anything
/// else, including a not-ready indicator, is `Hold`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalEvaluator {
    thresholds: SignalThresholds,
}

impl SignalEvaluator {
    pub fn new(thresholds: SignalThresholds) -> Self {
        Self { thresholds }
    }

    /// Evaluate the last candle of `series` against its indicator row
    pub fn evaluate_series(
        &self,
        series: &[Candle],
        rows: &[IndicatorRow],
        structure: &StructureState,
    ) -> SignalSnapshot {
        match (series.last(), rows.last()) {
            (Some(latest), Some(row)) => {
                let volume_average = rolling_volume_mean(series, self.thresholds.volume_window);
                self.evaluate(latest, row, volume_average, structure)
            }
            _ => SignalSnapshot::not_ready(structure.bos, structure.sweep),
        }
    }

    pub fn evaluate(
        &self,
        latest: &Candle,
        row: &IndicatorRow,
        volume_average: Option<f64>,
        structure: &StructureState,
    ) -> SignalSnapshot {
        let (
            Some(sma),
            Some(ema),
            Some(upper),
            Some(lower),
            Some(macd_hist),
            Some(rsi),
            Some(volume_average),
        ) = (
            row.sma20,
            row.ema20,
            row.boll_upper,
            row.boll_lower,
            row.macd_hist,
            row.rsi14,
            volume_average,
        )
        else {
            debug!("SignalEvaluator: Indicators not ready, holding");
            let mut snapshot = SignalSnapshot::not_ready(structure.bos, structure.sweep);
            snapshot.close = Some(latest.close);
            snapshot.volume = Some(latest.volume);
            snapshot.rsi = row.rsi14;
            snapshot.macd_histogram = row.macd_hist;
            snapshot.volume_average = volume_average;
            return snapshot;
        };

        let close = latest.close;
        let t = &self.thresholds;

        let trend = if close > sma && close > ema {
            Trend::Uptrend
        } else if close < sma && close < ema {
            Trend::Downtrend
        } else {
            Trend::Sideways
        };

        let rsi_buy = rsi < t.rsi_oversold;
        let rsi_sell = rsi > t.rsi_overbought;
        let macd_buy = macd_hist > 0.0;
        let macd_sell = macd_hist < 0.0;
        let bollinger_buy = close <= lower * t.bollinger_buy_factor;
        let bollinger_sell = close >= upper * t.bollinger_sell_factor;
        let high_volume = latest.volume > volume_average;

        let strong_buy = trend == Trend::Uptrend
            && rsi_buy
            && macd_buy
            && bollinger_buy
            && high_volume
            && structure.bos == BosState::BosUp
            && structure.sweep == LiquiditySweep::BelowSupport;

        let strong_sell = trend == Trend::Downtrend
            && rsi_sell
            && macd_sell
            && bollinger_sell
            && high_volume
            && structure.bos == BosState::BosDown
            && structure.sweep == LiquiditySweep::AboveResistance;

        let classification = if strong_buy {
            Classification::StrongBuy
        } else if strong_sell {
            Classification::StrongSell
        } else {
            Classification::Hold
        };

        SignalSnapshot {
            classification,
            ready: true,
            trend,
            rsi_buy,
            rsi_sell,
            macd_buy,
            macd_sell,
            bollinger_buy,
            bollinger_sell,
            high_volume,
            bos: structure.bos,
            sweep: structure.sweep,
            close: Some(close),
            rsi: Some(rsi),
            macd_histogram: Some(macd_hist),
            volume: Some(latest.volume),
            volume_average: Some(volume_average),
        }
    }
}

/// Mean volume of the last `window` candles, `None` with fewer candles
pub fn rolling_volume_mean(series: &[Candle], window: usize) -> Option<f64> {
    if window == 0 || series.len() < window {
        return None;
    }
    let tail = &series[series.len() - window..];
    Some(tail.iter().map(|c| c.volume).sum::<f64>() / window as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(close: f64, volume: f64) -> Candle {
        Candle::new(0, close, close + 1.0, close - 1.0, close, volume)
    }

    fn buy_row() -> IndicatorRow {
        IndicatorRow {
            sma20: Some(99.0),
            ema20: Some(99.5),
            boll_upper: Some(102.0),
            boll_lower: Some(99.8),
            macd_hist: Some(0.2),
            rsi14: Some(25.0),
            volume_sma20: Some(1000.0),
        }
    }

    fn sell_row() -> IndicatorRow {
        IndicatorRow {
            sma20: Some(101.0),
            ema20: Some(100.5),
            boll_upper: Some(100.2),
            boll_lower: Some(98.0),
            macd_hist: Some(-0.2),
            rsi14: Some(75.0),
            volume_sma20: Some(1000.0),
        }
    }

    fn structure(bos: BosState, sweep: LiquiditySweep) -> StructureState {
        StructureState { bos, sweep }
    }

    #[test]
    fn test_full_buy_confluence() {
        let snapshot = SignalEvaluator::default().evaluate(
            &candle(100.0, 2000.0),
            &buy_row(),
            Some(1000.0),
            &structure(BosState::BosUp, LiquiditySweep::BelowSupport),
        );

        assert_eq!(snapshot.classification, Classification::StrongBuy);
        assert!(snapshot.ready);
        assert_eq!(snapshot.trend, Trend::Uptrend);
        assert!(snapshot.rsi_buy && snapshot.macd_buy && snapshot.bollinger_buy);
        assert!(snapshot.high_volume);
    }

    #[test]
    fn test_full_sell_confluence() {
        let snapshot = SignalEvaluator::default().evaluate(
            &candle(100.0, 2000.0),
            &sell_row(),
            Some(1000.0),
            &structure(BosState::BosDown, LiquiditySweep::AboveResistance),
        );

        assert_eq!(snapshot.classification, Classification::StrongSell);
        assert_eq!(snapshot.trend, Trend::Downtrend);
    }

    #[test]
    fn test_any_missing_condition_holds() {
        let evaluator = SignalEvaluator::default();
        let good = structure(BosState::BosUp, LiquiditySweep::BelowSupport);

        // low volume
        let snapshot = evaluator.evaluate(&candle(100.0, 500.0), &buy_row(), Some(1000.0), &good);
        assert_eq!(snapshot.classification, Classification::Hold);
        assert!(!snapshot.high_volume);

        // no BOS
        let snapshot = evaluator.evaluate(
            &candle(100.0, 2000.0),
            &buy_row(),
            Some(1000.0),
            &structure(BosState::NoBos, LiquiditySweep::BelowSupport),
        );
        assert_eq!(snapshot.classification, Classification::Hold);

        // opposite sweep
        let snapshot = evaluator.evaluate(
            &candle(100.0, 2000.0),
            &buy_row(),
            Some(1000.0),
            &structure(BosState::BosUp, LiquiditySweep::AboveResistance),
        );
        assert_eq!(snapshot.classification, Classification::Hold);

        // RSI not oversold
        let row = IndicatorRow {
            rsi14: Some(30.0),
            ..buy_row()
        };
        let snapshot = evaluator.evaluate(&candle(100.0, 2000.0), &row, Some(1000.0), &good);
        assert_eq!(snapshot.classification, Classification::Hold);
        assert!(!snapshot.rsi_buy);
    }

    #[test]
    fn test_insufficient_bos_counts_as_no_bos() {
        let snapshot = SignalEvaluator::default().evaluate(
            &candle(100.0, 2000.0),
            &buy_row(),
            Some(1000.0),
            &structure(BosState::InsufficientData, LiquiditySweep::BelowSupport),
        );
        assert_eq!(snapshot.classification, Classification::Hold);
    }

    #[test]
    fn test_not_ready_indicator_forces_hold() {
        let row = IndicatorRow {
            macd_hist: None,
            ..buy_row()
        };
        let snapshot = SignalEvaluator::default().evaluate(
            &candle(100.0, 2000.0),
            &row,
            Some(1000.0),
            &structure(BosState::BosUp, LiquiditySweep::BelowSupport),
        );

        assert_eq!(snapshot.classification, Classification::Hold);
        assert!(!snapshot.ready);
        assert_eq!(snapshot.rsi, Some(25.0));
        assert_eq!(snapshot.macd_histogram, None);
    }

    #[test]
    fn test_missing_volume_average_forces_hold() {
        let snapshot = SignalEvaluator::default().evaluate(
            &candle(100.0, 2000.0),
            &buy_row(),
            None,
            &structure(BosState::BosUp, LiquiditySweep::BelowSupport),
        );
        assert_eq!(snapshot.classification, Classification::Hold);
        assert!(!snapshot.ready);
    }

    #[test]
    fn test_trend_sideways_when_averages_disagree() {
        let row = IndicatorRow {
            sma20: Some(99.0),
            ema20: Some(101.0),
            ..buy_row()
        };
        let snapshot = SignalEvaluator::default().evaluate(
            &candle(100.0, 2000.0),
            &row,
            Some(1000.0),
            &StructureState::default(),
        );
        assert_eq!(snapshot.trend, Trend::Sideways);
    }

    #[test]
    fn test_rolling_volume_mean() {
        let series: Vec<Candle> = (0..25).map(|i| candle(100.0, i as f64)).collect();
        let expected = (5..25).sum::<i32>() as f64 / 20.0;
        assert_eq!(rolling_volume_mean(&series, 20), Some(expected));
        assert_eq!(rolling_volume_mean(&series[..19], 20), None);
    }

    #[test]
    fn test_evaluate_series_empty() {
        let snapshot = SignalEvaluator::default().evaluate_series(&[], &[], &StructureState::default());
        assert_eq!(snapshot.classification, Classification::Hold);
        assert!(!snapshot.ready);
    }
}
