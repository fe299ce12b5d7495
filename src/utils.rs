//! Utility functions for data processing and formatting

use std::collections::{BTreeMap, HashMap};
use time::macros::format_description;
use time::OffsetDateTime;

use crate::models::{AverageData, Measurement};

/// Format a timestamp for human-readable logging
///
/// Converts an OffsetDateTime to DD.MM.YYYY - HH:MM:SS format
/// Falls back to default string representation if formatting fails.
pub fn format_datetime(dt: &OffsetDateTime) -> String {
    let format = format_description!("[day].[month].[year] - [hour]:[minute]:[second]");
    dt.format(format).unwrap_or_else(|_| dt.to_string())
}

/// Convert a time::Duration to seconds as u64, clamping negative spans to 0
pub fn duration_to_seconds(duration: time::Duration) -> u64 {
    u64::try_from(duration.whole_seconds()).unwrap_or(0)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Average every quantity over the measurements collected for each sensor
///
/// Unavailable values are left out of the average of their quantity. A
/// sample where nothing could be read counts as failed. Sensors without a
/// single successful reading are not reported.
pub fn calculate_averages(
    measurements: &HashMap<String, Vec<Measurement>>,
) -> HashMap<String, AverageData> {
    let mut averages = HashMap::new();

    for (label, samples) in measurements {
        let mut sums: BTreeMap<_, (f64, u32)> = BTreeMap::new();
        let mut failed = 0;

        for sample in samples {
            if sample.is_unavailable() {
                failed += 1;
            }
            for (quantity, value) in sample.iter() {
                if let Some(value) = value {
                    let entry = sums.entry(quantity).or_insert((0.0, 0));
                    entry.0 += value;
                    entry.1 += 1;
                }
            }
        }

        if sums.is_empty() {
            continue;
        }

        let values = sums
            .into_iter()
            .map(|(quantity, (sum, count))| (quantity, round2(sum / f64::from(count))))
            .collect();

        averages.insert(
            label.clone(),
            AverageData {
                values,
                time: OffsetDateTime::now_utc(),
                name: label.clone(),
                samples: samples.len() as i32,
                failed_samples: failed,
            },
        );
    }

    averages
}
