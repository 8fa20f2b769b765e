//! Embargo window computation
//!
//! An EXCLUSIVE tip grants its first claimant a time-limited exclusivity
//! window. The deadline (`embargo_ends`) is written once, by the claim that
//! wins the race; everything else about the window is derived at read time
//! from that stored instant. There is no background job flipping state when
//! the window lapses, so a crashed or slow sweep can never leave a tip
//! "stuck exclusive": expiry is a pure function of the clock.
//!
//! # Example
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use tipline_common::embargo::embargo_status;
//! use tipline_common::models::Visibility;
//!
//! let now = Utc::now();
//! let ends = Some(now + Duration::hours(48));
//!
//! let status = embargo_status(Visibility::Exclusive, ends, now).unwrap();
//! assert!(status.active);
//! assert!(status.hours_remaining > 47.9 && status.hours_remaining <= 48.0);
//!
//! // OPEN tips never carry a window.
//! assert!(embargo_status(Visibility::Open, ends, now).is_none());
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Visibility;

/// Derived view of a tip's exclusivity window, embedded in API responses.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmbargoStatus {
    /// True while `now < embargo_ends`.
    pub active: bool,
    /// Fractional hours until the deadline; 0.0 once expired.
    pub hours_remaining: f64,
    /// The stored deadline, echoed for clients that render countdowns.
    pub embargo_ends: DateTime<Utc>,
}

/// Compute the embargo state of a tip at `now`.
///
/// Returns `None` when no window applies: the tip is OPEN, or it is
/// EXCLUSIVE but unclaimed (no deadline armed yet). The deadline instant
/// itself is exclusive: a tip whose window ends exactly at `now` is
/// already expired.
pub fn embargo_status(
    visibility: Visibility,
    embargo_ends: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<EmbargoStatus> {
    if visibility != Visibility::Exclusive {
        return None;
    }
    let ends = embargo_ends?;
    let remaining_ms = (ends - now).num_milliseconds();
    if remaining_ms > 0 {
        Some(EmbargoStatus {
            active: true,
            hours_remaining: remaining_ms as f64 / 3_600_000.0,
            embargo_ends: ends,
        })
    } else {
        Some(EmbargoStatus {
            active: false,
            hours_remaining: 0.0,
            embargo_ends: ends,
        })
    }
}

/// True while the tip's window is still running.
pub fn is_embargo_active(
    visibility: Visibility,
    embargo_ends: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> bool {
    embargo_status(visibility, embargo_ends, now)
        .map(|s| s.active)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn open_tips_have_no_window() {
        let now = Utc::now();
        assert_eq!(
            embargo_status(Visibility::Open, Some(now + Duration::hours(48)), now),
            None
        );
        assert_eq!(embargo_status(Visibility::Open, None, now), None);
    }

    #[test]
    fn unclaimed_exclusive_has_no_window() {
        let now = Utc::now();
        assert_eq!(embargo_status(Visibility::Exclusive, None, now), None);
        assert!(!is_embargo_active(Visibility::Exclusive, None, now));
    }

    #[test]
    fn active_window_reports_remaining_hours() {
        let now = Utc::now();
        let ends = now + Duration::hours(48);
        let status = embargo_status(Visibility::Exclusive, Some(ends), now).unwrap();
        assert!(status.active);
        assert!((status.hours_remaining - 48.0).abs() < 0.001);
        assert_eq!(status.embargo_ends, ends);
    }

    #[test]
    fn expired_window_is_inactive_with_zero_remaining() {
        let now = Utc::now();
        let ends = now - Duration::hours(1);
        let status = embargo_status(Visibility::Exclusive, Some(ends), now).unwrap();
        assert!(!status.active);
        assert_eq!(status.hours_remaining, 0.0);
    }

    #[test]
    fn deadline_instant_counts_as_expired() {
        let now = Utc::now();
        let status = embargo_status(Visibility::Exclusive, Some(now), now).unwrap();
        assert!(!status.active);
        assert_eq!(status.hours_remaining, 0.0);
    }

    #[test]
    fn partial_hours_are_fractional() {
        let now = Utc::now();
        let ends = now + Duration::minutes(90);
        let status = embargo_status(Visibility::Exclusive, Some(ends), now).unwrap();
        assert!(status.active);
        assert!((status.hours_remaining - 1.5).abs() < 0.001);
    }
}
