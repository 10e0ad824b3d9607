//! Plot to time series conversion.

use crate::compute::{Plot, Timestamp};
use crate::response::TimeSeries;

/// Converts a successful plot into a named series.
///
/// Pairs are zipped up to the shorter of the two input arrays. Shapes other
/// than numeric and bucketed numeric yield an empty series. Points whose
/// timestamp cannot be represented are dropped.
pub fn plot_to_series(name: &str, plot: &Plot) -> TimeSeries {
    match plot {
        Plot::Numeric(numeric) => collect(
            name,
            numeric
                .timestamps
                .iter()
                .zip(numeric.values.iter().copied()),
        ),
        Plot::BucketedNumeric(bucketed) => collect(
            name,
            bucketed
                .timestamps
                .iter()
                .zip(bucketed.buckets.iter().map(|bucket| bucket.mean)),
        ),
        Plot::Unknown { .. } => TimeSeries::empty(name),
    }
}

fn collect<'a>(name: &str, points: impl Iterator<Item = (&'a Timestamp, f64)>) -> TimeSeries {
    let mut series = TimeSeries::empty(name);
    for (ts, value) in points {
        if let Some(time) = ts.to_datetime() {
            series.times.push(time);
            series.values.push(value);
        }
    }
    series
}
