//! Footprint-based version estimation for add-on packages.
//!
//! Older installs carry no `.version` marker. For those the installed version
//! is inferred from the unpacked size of the add-on directory, compared
//! against a curated [`SizeHistoryTable`]. This is a best-effort guess and is
//! never consulted when a marker exists.

use semver::Version;

use crate::package::{Locale, SizeHistoryTable};

/// Safety offset subtracted from every reference size before comparison.
///
/// Unpacked sizes vary between filesystems and between patch levels of the
/// same release; an install is attributed to a version when it is at most
/// this much smaller than that version's recorded footprint.
pub const SLACK_MARGIN_BYTES: u64 = 512 * 1024 * 1024;

/// Predict the next value of a series using a weighted moving average of
/// successive ratios.
///
/// `values` is ordered oldest to newest. The ratio `v[i+1] / v[i]` gets weight
/// `n - 1 - i`.
///
/// - no values → 0
/// - one value → that value
/// - two values → `v1 * (v1 / v0)`
pub fn predict_next(values: &[f64]) -> f64 {
    match values {
        [] => 0.0,
        [only] => *only,
        [first, second] => second * (second / first),
        _ => {
            let n = values.len();
            let mut weighted_sum = 0.0;
            let mut weight_total = 0.0;

            for (i, pair) in values.windows(2).enumerate() {
                let weight = (n - 1 - i) as f64;
                weighted_sum += pair[1] / pair[0] * weight;
                weight_total += weight;
            }

            values[n - 1] * weighted_sum / weight_total
        }
    }
}

/// Estimates installed add-on versions from their on-disk footprint.
#[derive(Debug, Clone)]
pub struct FootprintVersionEstimator {
    table: SizeHistoryTable,
    slack_bytes: u64,
}

impl Default for FootprintVersionEstimator {
    fn default() -> Self {
        Self::new(SizeHistoryTable::builtin())
    }
}

impl FootprintVersionEstimator {
    /// Create an estimator over `table` with the default slack margin.
    pub fn new(table: SizeHistoryTable) -> Self {
        Self {
            table,
            slack_bytes: SLACK_MARGIN_BYTES,
        }
    }

    /// Override the slack margin.
    pub fn with_slack(mut self, slack_bytes: u64) -> Self {
        self.slack_bytes = slack_bytes;
        self
    }

    pub fn table(&self) -> &SizeHistoryTable {
        &self.table
    }

    /// Reference footprints for `locale`, newest first, extended with a
    /// predicted entry for `latest_known` when the table lags behind it.
    pub fn reference_series(&self, locale: Locale, latest_known: &Version) -> Vec<(Version, u64)> {
        let mut series = self.table.series(locale);

        let lagging = series
            .first()
            .map(|(version, _)| version != latest_known)
            .unwrap_or(true);

        if lagging {
            let oldest_first: Vec<f64> = series.iter().rev().map(|(_, size)| *size as f64).collect();
            let predicted = predict_next(&oldest_first).round().max(0.0) as u64;
            series.insert(0, (latest_known.clone(), predicted));
        }

        series
    }

    /// Estimate the installed version of `locale` from `observed_bytes`.
    ///
    /// Returns the newest version whose footprint minus the slack margin is
    /// below the observed size, or `None` when the install is smaller than
    /// every known footprint.
    pub fn estimate(
        &self,
        locale: Locale,
        observed_bytes: u64,
        latest_known: &Version,
    ) -> Option<Version> {
        let slack = i128::from(self.slack_bytes);
        let observed = i128::from(observed_bytes);

        self.reference_series(locale, latest_known)
            .into_iter()
            .find(|(_, size)| i128::from(*size) - slack < observed)
            .map(|(version, _)| version)
    }
}

/// Estimate with the default slack margin over `table`.
pub fn estimate(
    table: &SizeHistoryTable,
    locale: Locale,
    observed_bytes: u64,
    latest_known: &Version,
) -> Option<Version> {
    FootprintVersionEstimator::new(table.clone()).estimate(locale, observed_bytes, latest_known)
}
