//! Stitching time-adjacent fragments into one.
//!
//! Fragments carry locally scoped indices (frame 0 of one chunk has
//! nothing to do with frame 0 of the next). Stitching concatenates the
//! tables, rewrites every reference by the running offset, keeps only the
//! records inside the requested window and moves event times onto a single
//! origin.

pub mod event;
pub mod sample;
pub mod time;

pub use event::{stitch_events, StitchContext};
pub use sample::stitch_samples;
pub use time::{shift_ns, TimedRecord};

use crate::fragment::Fragment;
use crate::slice::Interval;
use crate::utils::error::StitchError;
use log::info;

/// Stitch fragments of one encoding into a single fragment covering `window`
///
/// # Arguments
/// * `fragments` - Fragments in any order, all sample- or all event-encoded
/// * `window` - Absolute `[start, end)` range in nanoseconds to keep
///
/// # Errors
/// * `StitchError::NoFragments` - nothing to stitch
/// * `StitchError::MixedEncodings` - both encodings in the input
/// * `StitchError::ClockMismatch` - event fragments use different clocks
/// * `StitchError::NegativeTimestamp` - a time would move before zero
pub fn stitch(fragments: Vec<Fragment>, window: Interval) -> Result<Fragment, StitchError> {
    info!(
        "Stitching {} fragments over [{}, {})",
        fragments.len(),
        window.start_ns,
        window.end_ns
    );

    let mut samples = Vec::new();
    let mut events = Vec::new();
    for fragment in fragments {
        match fragment {
            Fragment::Sample(f) => samples.push(f),
            Fragment::Event(f) => events.push(f),
        }
    }

    match (samples.is_empty(), events.is_empty()) {
        (true, true) => Err(StitchError::NoFragments),
        (false, false) => Err(StitchError::MixedEncodings),
        (false, true) => stitch_samples(samples, window).map(Fragment::Sample),
        (true, false) => stitch_events(events, window).map(Fragment::Event),
    }
}

/// Keep the records whose absolute time falls in `window`, moving each by
/// `delta_ns` onto the merged origin
///
/// Returns the kept records and the latest time among them, relative to
/// the merged origin.
pub(crate) fn collect_in_window<R: TimedRecord>(
    records: Vec<R>,
    source: &R::Clock,
    target: &R::Clock,
    fragment_origin_ns: u64,
    delta_ns: i64,
    window: Interval,
) -> Result<(Vec<R>, u64), StitchError> {
    let mut kept = Vec::with_capacity(records.len());
    let mut max_ns = 0;
    for mut record in records {
        let relative = record.relative_ns(source);
        let absolute = fragment_origin_ns.saturating_add(relative);
        if !window.contains(absolute) {
            continue;
        }
        record.rebase(source, target, delta_ns)?;
        max_ns = max_ns.max(record.relative_ns(target));
        kept.push(record);
    }
    Ok((kept, max_ns))
}

/// Signed difference `to - from`
pub(crate) fn delta_between(from_ns: u64, to_ns: u64) -> i64 {
    if to_ns >= from_ns {
        i64::try_from(to_ns - from_ns).unwrap_or(i64::MAX)
    } else {
        i64::try_from(from_ns - to_ns).map_or(i64::MIN, |d| -d)
    }
}
