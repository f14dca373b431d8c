//! Rolling-window indicators over a candle series.
//!
//! Every column is `None` until its window is full. Values are recomputed
//! over the whole series on each call.

use crate::domain::errors::IndicatorError;
use crate::domain::market::Candle;
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Distribution};
use ta::Next;
use ta::indicators::{ExponentialMovingAverage, SimpleMovingAverage};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    pub sma_period: usize,
    pub ema_period: usize,
    pub bollinger_period: usize,
    pub bollinger_std_dev: f64,
    pub macd_fast_period: usize,
    pub macd_slow_period: usize,
    pub macd_signal_period: usize,
    pub rsi_period: usize,
    pub volume_sma_period: usize,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            sma_period: 20,
            ema_period: 20,
            bollinger_period: 20,
            bollinger_std_dev: 2.0,
            macd_fast_period: 12,
            macd_slow_period: 26,
            macd_signal_period: 9,
            rsi_period: 14,
            volume_sma_period: 20,
        }
    }
}

impl IndicatorParams {
    /// Candles needed before every column of the latest row is defined
    pub fn warmup_len(&self) -> usize {
        [
            self.sma_period,
            self.ema_period,
            self.bollinger_period,
            self.macd_slow_period + self.macd_signal_period - 1,
            self.rsi_period + 1,
            self.volume_sma_period,
        ]
        .into_iter()
        .max()
        .unwrap_or(0)
    }
}

/// Indicator values aligned with one candle of the series
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorRow {
    pub sma20: Option<f64>,
    pub ema20: Option<f64>,
    pub boll_upper: Option<f64>,
    pub boll_lower: Option<f64>,
    pub macd_hist: Option<f64>,
    pub rsi14: Option<f64>,
    pub volume_sma20: Option<f64>,
}

impl IndicatorRow {
    pub fn is_ready(&self) -> bool {
        self.sma20.is_some()
            && self.ema20.is_some()
            && self.boll_upper.is_some()
            && self.boll_lower.is_some()
            && self.macd_hist.is_some()
            && self.rsi14.is_some()
            && self.volume_sma20.is_some()
    }
}

/// Computes [`IndicatorRow`]s for a series.
///
/// Holds freshly built indicator prototypes; `compute` clones them so the
/// engine itself stays immutable and every call is a pure function of its input.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    params: IndicatorParams,
    sma: SimpleMovingAverage,
    ema: ExponentialMovingAverage,
    macd_fast: ExponentialMovingAverage,
    macd_slow: ExponentialMovingAverage,
    macd_signal: ExponentialMovingAverage,
    volume_sma: SimpleMovingAverage,
}

impl IndicatorEngine {
    pub fn new(params: IndicatorParams) -> Result<Self, IndicatorError> {
        let periods = [
            ("sma", params.sma_period),
            ("ema", params.ema_period),
            ("macd_fast", params.macd_fast_period),
            ("macd_slow", params.macd_slow_period),
            ("macd_signal", params.macd_signal_period),
            ("rsi", params.rsi_period),
            ("volume_sma", params.volume_sma_period),
        ];
        if let Some((indicator, period)) = periods.into_iter().find(|(_, p)| *p == 0) {
            return Err(IndicatorError::InvalidPeriod { indicator, period });
        }
        // Sample deviation needs at least two points
        if params.bollinger_period < 2 {
            return Err(IndicatorError::InvalidPeriod {
                indicator: "bollinger",
                period: params.bollinger_period,
            });
        }
        if params.macd_fast_period >= params.macd_slow_period {
            return Err(IndicatorError::InvalidPeriod {
                indicator: "macd_fast",
                period: params.macd_fast_period,
            });
        }

        Ok(Self {
            params,
            sma: sma("sma", params.sma_period)?,
            ema: ema("ema", params.ema_period)?,
            macd_fast: ema("macd_fast", params.macd_fast_period)?,
            macd_slow: ema("macd_slow", params.macd_slow_period)?,
            macd_signal: ema("macd_signal", params.macd_signal_period)?,
            volume_sma: sma("volume_sma", params.volume_sma_period)?,
        })
    }

    pub fn params(&self) -> &IndicatorParams {
        &self.params
    }

    pub fn compute(&self, series: &[Candle]) -> Vec<IndicatorRow> {
        let closes: Vec<f64> = series.iter().map(|c| c.close).collect();
        let volumes: Vec<f64> = series.iter().map(|c| c.volume).collect();

        let sma20 = rolling(self.sma.clone(), &closes, self.params.sma_period);
        let ema20 = rolling(self.ema.clone(), &closes, self.params.ema_period);
        let volume_sma20 = rolling(
            self.volume_sma.clone(),
            &volumes,
            self.params.volume_sma_period,
        );
        let (boll_upper, boll_lower) = self.bollinger(&closes);
        let macd_hist = self.macd_histogram(&closes);
        let rsi14 = wilder_rsi(&closes, self.params.rsi_period);

        (0..series.len())
            .map(|i| IndicatorRow {
                sma20: sma20[i],
                ema20: ema20[i],
                boll_upper: boll_upper[i],
                boll_lower: boll_lower[i],
                macd_hist: macd_hist[i],
                rsi14: rsi14[i],
                volume_sma20: volume_sma20[i],
            })
            .collect()
    }

    /// SMA plus/minus `k` sample standard deviations (N-1 denominator)
    fn bollinger(&self, closes: &[f64]) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
        let period = self.params.bollinger_period;
        let k = self.params.bollinger_std_dev;
        let mut upper = vec![None; closes.len()];
        let mut lower = vec![None; closes.len()];

        for end in period..=closes.len() {
            let window = &closes[end - period..end];
            let mean = window.iter().sum::<f64>() / period as f64;
            let Some(std_dev) = Data::new(window.to_vec())
                .std_dev()
                .filter(|v| v.is_finite())
            else {
                continue;
            };
            upper[end - 1] = Some(mean + k * std_dev);
            lower[end - 1] = Some(mean - k * std_dev);
        }

        (upper, lower)
    }

    /// MACD line minus its signal EMA.
    ///
    /// The signal EMA is seeded with the first defined MACD value, so the
    /// histogram needs `slow + signal - 1` closes.
    fn macd_histogram(&self, closes: &[f64]) -> Vec<Option<f64>> {
        let slow_period = self.params.macd_slow_period;
        let signal_period = self.params.macd_signal_period;
        let mut fast = self.macd_fast.clone();
        let mut slow = self.macd_slow.clone();
        let mut signal = self.macd_signal.clone();
        let mut signal_count = 0;

        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| {
                let macd_line = fast.next(close) - slow.next(close);
                if i + 1 < slow_period {
                    return None;
                }
                let signal_value = signal.next(macd_line);
                signal_count += 1;
                (signal_count >= signal_period).then_some(macd_line - signal_value)
            })
            .collect()
    }
}

fn sma(indicator: &'static str, period: usize) -> Result<SimpleMovingAverage, IndicatorError> {
    SimpleMovingAverage::new(period).map_err(|e| IndicatorError::Construction {
        indicator,
        reason: format!("{:?}", e),
    })
}

fn ema(indicator: &'static str, period: usize) -> Result<ExponentialMovingAverage, IndicatorError> {
    ExponentialMovingAverage::new(period).map_err(|e| IndicatorError::Construction {
        indicator,
        reason: format!("{:?}", e),
    })
}

/// Feed every value through `indicator`, masking outputs before the window is full
fn rolling<I>(mut indicator: I, values: &[f64], period: usize) -> Vec<Option<f64>>
where
    I: Next<f64, Output = f64>,
{
    values
        .iter()
        .enumerate()
        .map(|(i, &value)| {
            let output = indicator.next(value);
            (i + 1 >= period).then_some(output)
        })
        .collect()
}

/// RSI with Wilder smoothing, seeded by the simple mean of the first `period` changes.
///
/// Defined from index `period`; 100 when there are no losses.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let (mut gain_sum, mut loss_sum) = (0.0, 0.0);
    for w in closes[..=period].windows(2) {
        let change = w[1] - w[0];
        if change > 0.0 {
            gain_sum += change;
        } else {
            loss_sum -= change;
        }
    }

    let n = period as f64;
    let mut avg_gain = gain_sum / n;
    let mut avg_loss = loss_sum / n;
    out[period] = Some(rsi_value(avg_gain, avg_loss));

    for i in (period + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (n - 1.0) + gain) / n;
        avg_loss = (avg_loss * (n - 1.0) + loss) / n;
        out[i] = Some(rsi_value(avg_gain, avg_loss));
    }

    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64 * 60_000, c, c + 0.5, c - 0.5, c, 100.0 + i as f64))
            .collect()
    }

    fn engine() -> IndicatorEngine {
        IndicatorEngine::new(IndicatorParams::default()).unwrap()
    }

    #[test]
    fn test_moving_averages_undefined_before_window() {
        let closes: Vec<f64> = (0..19).map(|i| 100.0 + i as f64).collect();
        let rows = engine().compute(&series(&closes));

        assert_eq!(rows.len(), 19);
        assert!(rows.iter().all(|r| r.sma20.is_none()));
        assert!(rows.iter().all(|r| r.ema20.is_none()));
        assert!(rows.iter().all(|r| r.boll_upper.is_none() && r.boll_lower.is_none()));
        assert!(rows.iter().all(|r| r.volume_sma20.is_none()));
    }

    #[test]
    fn test_moving_averages_defined_at_exactly_window() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let rows = engine().compute(&series(&closes));
        let last = rows[19];

        let expected_sma = closes.iter().sum::<f64>() / 20.0;
        assert!((last.sma20.unwrap() - expected_sma).abs() < 1e-9);
        assert!(last.ema20.is_some());
        assert!(last.boll_upper.is_some());
        assert!(last.volume_sma20.is_some());
        // MACD still warming up
        assert!(last.macd_hist.is_none());
        assert!(!last.is_ready());
    }

    #[test]
    fn test_bollinger_uses_sample_std_dev() {
        let closes: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 99.0 } else { 101.0 }).collect();
        let rows = engine().compute(&series(&closes));
        let last = rows[19];

        // mean 100, squared deviations sum to 20, sample variance 20/19
        let std_dev = (20.0_f64 / 19.0).sqrt();
        assert!((last.boll_upper.unwrap() - (100.0 + 2.0 * std_dev)).abs() < 1e-9);
        assert!((last.boll_lower.unwrap() - (100.0 - 2.0 * std_dev)).abs() < 1e-9);
    }

    #[test]
    fn test_ema_seeded_with_first_close() {
        let mut closes = vec![100.0; 20];
        closes[0] = 120.0;
        let rows = engine().compute(&series(&closes));

        let k = 2.0 / 21.0;
        let expected = 100.0 + 20.0 * (1.0_f64 - k).powi(19);
        assert!((rows[19].ema20.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_macd_histogram_readiness() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        let rows = engine().compute(&series(&closes));

        assert!(rows[32].macd_hist.is_none());
        assert!(rows[33].macd_hist.is_some());
        assert!(rows[33].is_ready());
        assert_eq!(IndicatorParams::default().warmup_len(), 34);
    }

    #[test]
    fn test_macd_flat_series_is_zero() {
        let rows = engine().compute(&series(&[50.0; 60]));
        assert!(rows[59].macd_hist.unwrap().abs() < 1e-12);
    }

    #[test]
    fn test_rsi_monotonic_increase_is_100() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let rsi = wilder_rsi(&closes, 14);

        assert!(rsi[13].is_none());
        assert_eq!(rsi[14], Some(100.0));
        assert_eq!(rsi[29], Some(100.0));
    }

    #[test]
    fn test_rsi_monotonic_decrease_is_0() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 - i as f64).collect();
        let rsi = wilder_rsi(&closes, 14);
        assert_eq!(rsi[29], Some(0.0));
    }

    #[test]
    fn test_rsi_stays_in_range() {
        let closes: Vec<f64> = (0..200)
            .map(|i| 100.0 + 10.0 * (i as f64 * 0.7).sin() + (i % 7) as f64)
            .collect();
        let rsi = wilder_rsi(&closes, 14);

        for value in rsi.into_iter().flatten() {
            assert!((0.0..=100.0).contains(&value), "RSI out of range: {}", value);
        }
    }

    #[test]
    fn test_rsi_wilder_first_value() {
        // 14 changes: 7 gains of 1, 7 losses of 1
        let closes: Vec<f64> = (0..15).map(|i| if i % 2 == 0 { 10.0 } else { 11.0 }).collect();
        let rsi = wilder_rsi(&closes, 14);
        assert!((rsi[14].unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_volume_sma() {
        let rows = engine().compute(&series(&[10.0; 25]));
        // volumes are 100 + i
        let expected = (5..25).map(|i| 100.0 + i as f64).sum::<f64>() / 20.0;
        assert!((rows[24].volume_sma20.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = IndicatorParams {
            rsi_period: 0,
            ..IndicatorParams::default()
        };
        assert!(matches!(
            IndicatorEngine::new(params),
            Err(IndicatorError::InvalidPeriod { indicator: "rsi", .. })
        ));

        let params = IndicatorParams {
            macd_fast_period: 30,
            ..IndicatorParams::default()
        };
        assert!(IndicatorEngine::new(params).is_err());
    }

    #[test]
    fn test_empty_series() {
        assert!(engine().compute(&[]).is_empty());
    }
}
