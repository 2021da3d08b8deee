//! Time intervals and overlap arithmetic.

use crate::nodetree::Node;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Half-open time range `[start_ns, end_ns)`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Interval {
    pub start_ns: u64,
    pub end_ns: u64,
}

impl Interval {
    pub fn new(start_ns: u64, end_ns: u64) -> Self {
        Self { start_ns, end_ns }
    }

    /// Whether `ts` falls inside the interval
    pub fn contains(&self, ts: u64) -> bool {
        self.start_ns <= ts && ts < self.end_ns
    }

    pub fn duration_ns(&self) -> u64 {
        self.end_ns.saturating_sub(self.start_ns)
    }
}

/// `START:END` in nanoseconds, as accepted on the command line
impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once(':')
            .ok_or_else(|| format!("expected START:END, got {s:?}"))?;
        let start_ns = start
            .trim()
            .parse()
            .map_err(|e| format!("invalid interval start {start:?}: {e}"))?;
        let end_ns = end
            .trim()
            .parse()
            .map_err(|e| format!("invalid interval end {end:?}: {e}"))?;
        if end_ns < start_ns {
            return Err(format!("interval ends before it starts: {s}"));
        }
        Ok(Self { start_ns, end_ns })
    }
}

/// Anything occupying a span of time
pub trait Span {
    fn start_ns(&self) -> u64;
    fn end_ns(&self) -> u64;
}

impl Span for Interval {
    fn start_ns(&self) -> u64 {
        self.start_ns
    }

    fn end_ns(&self) -> u64 {
        self.end_ns
    }
}

impl Span for Node {
    fn start_ns(&self) -> u64 {
        self.start_ns
    }

    fn end_ns(&self) -> u64 {
        self.end_ns
    }
}

/// Symmetric overlap test: `max(starts) <= min(ends)`
pub fn overlaps(a: &impl Span, b: &impl Span) -> bool {
    a.start_ns().max(b.start_ns()) <= a.end_ns().min(b.end_ns())
}

/// Length of the intersection of two spans, zero when disjoint
pub fn overlapping_duration(a: &impl Span, b: &impl Span) -> u64 {
    let start = a.start_ns().max(b.start_ns());
    let end = a.end_ns().min(b.end_ns());
    end.saturating_sub(start)
}

/// Sort by `(start, end)` and merge every interval starting at or before
/// the running end
pub fn merge_intervals(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.sort();
    let mut merged: Vec<Interval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.start_ns <= last.end_ns => {
                last.end_ns = last.end_ns.max(interval.end_ns);
            }
            _ => merged.push(interval),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_intervals() {
        let merged = merge_intervals(vec![
            Interval::new(8, 11),
            Interval::new(3, 6),
            Interval::new(7, 12),
            Interval::new(1, 3),
        ]);
        assert_eq!(merged, vec![Interval::new(1, 6), Interval::new(7, 12)]);
        assert_eq!(merge_intervals(merged.clone()), merged);
    }

    #[test]
    fn test_merge_contained_interval() {
        let merged = merge_intervals(vec![Interval::new(0, 100), Interval::new(10, 20)]);
        assert_eq!(merged, vec![Interval::new(0, 100)]);
    }

    #[test]
    fn test_overlapping_duration() {
        let a = Interval::new(0, 10);
        assert_eq!(overlapping_duration(&a, &Interval::new(5, 20)), 5);
        assert_eq!(overlapping_duration(&a, &Interval::new(20, 30)), 0);
        assert_eq!(overlapping_duration(&a, &Interval::new(2, 3)), 1);
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!("10:20".parse::<Interval>(), Ok(Interval::new(10, 20)));
        assert!("20:10".parse::<Interval>().is_err());
        assert!("10".parse::<Interval>().is_err());
    }
}
