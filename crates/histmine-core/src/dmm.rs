//! Delta Maintainability Model.
//!
//! A change is scored by how it moves lines of code between low-risk and
//! high-risk methods. Per file we compute `(delta_low, delta_high)`; a commit
//! sums those over every file in a supported language and turns the sums into
//! the proportion of "good" change.

use crate::method::{DmmProperty, Method};

/// Lines of code in low-risk and high-risk methods.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskProfile {
    pub low: i64,
    pub high: i64,
}

impl RiskProfile {
    /// Sum `nloc` of `methods`, split by risk under `property`.
    pub fn of(methods: &[Method], property: DmmProperty) -> Self {
        methods.iter().fold(Self::default(), |mut acc, method| {
            let nloc = method.nloc as i64;
            if method.is_low_risk(property) {
                acc.low += nloc;
            } else {
                acc.high += nloc;
            }
            acc
        })
    }
}

/// Net change of low-risk and high-risk lines between two snapshots of a file.
///
/// Methods present unchanged in both snapshots contribute equally to both
/// sides and cancel out, so only added, removed or altered methods move the
/// result.
pub fn delta_risk_profile(
    before: &[Method],
    after: &[Method],
    property: DmmProperty,
) -> (i64, i64) {
    let old = RiskProfile::of(before, property);
    let new = RiskProfile::of(after, property);
    (new.low - old.low, new.high - old.high)
}

/// Proportion of good change in `[0, 1]`, `None` when nothing moved.
pub fn good_change_proportion(delta_low: i64, delta_high: i64) -> Option<f64> {
    let mut good = 0;
    let mut bad = 0;

    if delta_low >= 0 {
        good += delta_low;
    } else {
        bad -= delta_low;
    }
    if delta_high < 0 {
        good -= delta_high;
    } else {
        bad += delta_high;
    }

    let total = good + bad;
    if total == 0 {
        None
    } else {
        Some(good as f64 / total as f64)
    }
}

/// Aggregate per-file deltas of a commit.
///
/// Only files in a supported language should be passed in. No files at all
/// means the value is undefined.
pub fn commit_dmm<I>(file_deltas: I) -> Option<f64>
where
    I: IntoIterator<Item = (i64, i64)>,
{
    let mut seen = false;
    let (low, high) = file_deltas
        .into_iter()
        .inspect(|_| seen = true)
        .fold((0, 0), |(low, high), (dl, dh)| (low + dl, high + dh));

    if !seen {
        return None;
    }
    good_change_proportion(low, high)
}
