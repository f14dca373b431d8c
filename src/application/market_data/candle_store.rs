use crate::domain::market::{Candle, CandleSeries};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Default buffer length (matches the REST history limit)
pub const DEFAULT_CAPACITY: usize = 500;

/// What a single ingest did to the buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Buffer length right after a historical replacement, if one happened
    pub history_len: Option<usize>,
    pub live_appended: bool,
    pub replaced_last: bool,
    /// Candles dropped for being late, duplicated or malformed
    pub rejected: usize,
    /// Oldest candles discarded to respect the capacity
    pub evicted: usize,
}

/// Rolling buffer of closed candles, strictly ascending by open time.
///
/// REST history replaces the buffer wholesale (minus its provisional newest
/// candle); live closed candles are appended on top.
#[derive(Debug, Clone)]
pub struct CandleStore {
    capacity: usize,
    candles: VecDeque<Candle>,
    last_live: Option<Candle>,
}

impl Default for CandleStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl CandleStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            candles: VecDeque::with_capacity(capacity),
            last_live: None,
        }
    }

    /// Merge REST history and an optional live candle.
    ///
    /// A non-empty `historical` replaces the buffer except its last element,
    /// which is still forming and never trusted. `live` is appended when newer
    /// than the current last candle, replaces it when it shares its open time,
    /// and is rejected otherwise.
    pub fn ingest(&mut self, historical: &[Candle], live: Option<Candle>) -> IngestOutcome {
        let mut outcome = IngestOutcome::default();

        if let Some((_provisional, trusted)) = historical.split_last() {
            self.candles.clear();
            for candle in trusted {
                if !candle.is_well_formed() {
                    outcome.rejected += 1;
                    continue;
                }
                match self.candles.back() {
                    Some(last) if candle.open_time <= last.open_time => {
                        outcome.rejected += 1;
                    }
                    _ => self.candles.push_back(*candle),
                }
            }
            outcome.history_len = Some(self.candles.len());
            debug!(
                "CandleStore: Replaced history with {} candles ({} dropped)",
                self.candles.len(),
                outcome.rejected
            );
        }

        if let Some(candle) = live {
            self.merge_live(candle, &mut outcome);
        }

        outcome.evicted = self.enforce_capacity();
        outcome
    }

    /// Backfill from REST, re-merging the most recent live candle on top
    pub fn apply_history(&mut self, historical: &[Candle]) -> IngestOutcome {
        self.ingest(historical, self.last_live)
    }

    pub fn apply_live(&mut self, candle: Candle) -> IngestOutcome {
        self.ingest(&[], Some(candle))
    }

    fn merge_live(&mut self, candle: Candle, outcome: &mut IngestOutcome) {
        if !candle.is_well_formed() {
            warn!(
                "CandleStore: Dropping malformed live candle at {}",
                candle.open_time
            );
            outcome.rejected += 1;
            return;
        }

        if self
            .last_live
            .is_none_or(|previous| candle.open_time >= previous.open_time)
        {
            self.last_live = Some(candle);
        }

        match self.candles.back_mut() {
            Some(last) if candle.open_time == last.open_time => {
                *last = candle;
                outcome.replaced_last = true;
            }
            Some(last) if candle.open_time < last.open_time => {
                debug!(
                    "CandleStore: Rejecting late candle {} (last is {})",
                    candle.open_time, last.open_time
                );
                outcome.rejected += 1;
            }
            _ => {
                self.candles.push_back(candle);
                outcome.live_appended = true;
            }
        }
    }

    fn enforce_capacity(&mut self) -> usize {
        let mut evicted = 0;
        while self.candles.len() > self.capacity {
            self.candles.pop_front();
            evicted += 1;
        }
        evicted
    }

    /// Immutable copy of the buffer for one evaluation cycle
    pub fn snapshot(&self) -> CandleSeries {
        self.candles.iter().copied().collect()
    }

    /// At least one closed live candle has been received
    pub fn has_live(&self) -> bool {
        self.last_live.is_some()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.back()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
