//! Offset ↔ time arithmetic for sample streams.
//!
//! [`StreamOffsetModel`] is the one place sample indices, elapsed durations,
//! and absolute timestamps are converted into each other. Sample index 0
//! corresponds exactly to the start time; converting a duration or absolute
//! time back to a sample count rounds half to even.

use chrono::{DateTime, TimeDelta, Utc};

use crate::{BasebandError, Result};

/// Affine map between sample offsets and time, at a fixed sample rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamOffsetModel {
    sample_rate: f64,
    start_time: DateTime<Utc>,
}

impl StreamOffsetModel {
    /// Build a model; the rate is complete samples per second and must be
    /// positive and finite.
    pub fn new(sample_rate: f64, start_time: DateTime<Utc>) -> Result<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(BasebandError::InvalidSampleRate { rate: sample_rate });
        }
        Ok(Self {
            sample_rate,
            start_time,
        })
    }

    /// Complete samples per second.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// The time of sample 0.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Elapsed time from sample 0 to `offset`.
    pub fn duration_at(&self, offset: i64) -> TimeDelta {
        let nanos = offset as f64 / self.sample_rate * 1e9;
        TimeDelta::nanoseconds(nanos.round() as i64)
    }

    /// Absolute time of sample `offset`.
    pub fn time_at(&self, offset: i64) -> DateTime<Utc> {
        self.start_time + self.duration_at(offset)
    }

    /// Sample count closest to `duration`, rounding half to even.
    pub fn offset_for(&self, duration: TimeDelta) -> i64 {
        let seconds = duration.num_nanoseconds().unwrap_or_else(|| {
            // Beyond ~292 years; saturate rather than wrap.
            if duration > TimeDelta::zero() {
                i64::MAX
            } else {
                i64::MIN
            }
        }) as f64
            / 1e9;
        (seconds * self.sample_rate).round_ties_even() as i64
    }

    /// Sample offset whose time is closest to `time`.
    pub fn offset_at(&self, time: DateTime<Utc>) -> i64 {
        self.offset_for(time - self.start_time)
    }
}

/// Absolute time for an integer-seconds-since-Unix-epoch header field.
pub fn unix_timestamp(seconds: u64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(seconds as i64, 0).ok_or(BasebandError::MalformedBuffer {
        reason: format!("header seconds {seconds} outside the representable time range"),
    })
}
