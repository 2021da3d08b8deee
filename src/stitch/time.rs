//! Per-record time adjustment used while stitching.

use crate::fragment::{Event, EventClock, Sample};
use crate::utils::error::StitchError;

/// A record carrying a timestamp that stitching may need to move
pub trait TimedRecord {
    /// How the record's time is read and written
    type Clock;

    /// Timestamp relative to the owning fragment's origin
    fn relative_ns(&self, clock: &Self::Clock) -> u64;

    /// Shift the record by `delta_ns`, reading with `source` and writing
    /// with `target`
    fn rebase(
        &mut self,
        source: &Self::Clock,
        target: &Self::Clock,
        delta_ns: i64,
    ) -> Result<(), StitchError>;
}

/// Samples carry absolute epoch timestamps, so fragments share an origin
impl TimedRecord for Sample {
    type Clock = ();

    fn relative_ns(&self, _clock: &()) -> u64 {
        self.timestamp_ns()
    }

    fn rebase(&mut self, _source: &(), _target: &(), delta_ns: i64) -> Result<(), StitchError> {
        if delta_ns != 0 {
            let ts = shift_ns(self.timestamp_ns(), delta_ns)?;
            self.timestamp = ts as f64 / 1e9;
        }
        Ok(())
    }
}

impl TimedRecord for Event {
    type Clock = EventClock;

    fn relative_ns(&self, clock: &EventClock) -> u64 {
        clock.timestamp_ns(&self.time)
    }

    fn rebase(
        &mut self,
        source: &EventClock,
        target: &EventClock,
        delta_ns: i64,
    ) -> Result<(), StitchError> {
        let ts = shift_ns(source.timestamp_ns(&self.time), delta_ns)?;
        target.set_timestamp_ns(&mut self.time, ts);
        Ok(())
    }
}

/// Add a signed delta to a timestamp, refusing to go below zero
pub fn shift_ns(timestamp_ns: u64, delta_ns: i64) -> Result<u64, StitchError> {
    let shifted = if delta_ns >= 0 {
        timestamp_ns.checked_add(delta_ns.unsigned_abs())
    } else {
        timestamp_ns.checked_sub(delta_ns.unsigned_abs())
    };
    shifted.ok_or(StitchError::NegativeTimestamp { timestamp_ns, delta_ns })
}
