//! Report Merger (C8): a pure fold of one or more `Report`s into a single
//! canonical `Report`. Grounded on the teacher's
//! `distributed/summary.rs::merge_summaries` pointwise-sum pattern,
//! generalized from its fixed `MetricsSummary` fields to this crate's
//! `BTreeMap`-based distributions.
use crate::domain::{Report, now_epoch_ms};
use crate::metrics::LatencyHistogram;

/// Folds `reports` into one `Report` following §4.8: counters and
/// distribution maps add pointwise, `fastest`/`slowest` take the extreme
/// across inputs, `duration_ms` takes the max (wall time of the
/// longest-running participant), and derived fields (`mean_ms`, `rps`) are
/// recomputed from the merged totals. `output` is inherited from the first
/// input whose `output` is meaningful; an empty `reports` slice yields a
/// fresh default `Report`.
///
/// Commutative and associative (P7): every per-field combinator here is
/// itself commutative/associative (`+`, `max`, `min`), so folding in any
/// order or grouping produces the same result.
#[must_use]
pub fn merge(reports: &[Report]) -> Report {
    let Some(first) = reports.first() else {
        return Report::default();
    };

    let mut merged = Report {
        output: first.output,
        ..Report::default()
    };

    let mut merged_histogram: Option<LatencyHistogram> = None;
    for report in reports {
        merged.successful = merged.successful.saturating_add(report.successful);
        merged.errors = merged.errors.saturating_add(report.errors);
        merged.latency_sum_ms = merged.latency_sum_ms.saturating_add(report.latency_sum_ms);
        merged.bytes_total = merged.bytes_total.saturating_add(report.bytes_total);
        merged.fastest_ms = merged.fastest_ms.min(report.fastest_ms);
        merged.slowest_ms = merged.slowest_ms.max(report.slowest_ms);
        merged.duration_ms = merged.duration_ms.max(report.duration_ms);
        merged.last_sample_ms = merged.last_sample_ms.max(report.last_sample_ms);
        merged.terminal = merged.terminal || report.terminal;

        for (status, count) in &report.status_dist {
            merged
                .status_dist
                .entry(*status)
                .and_modify(|total| *total = total.saturating_add(*count))
                .or_insert(*count);
        }
        for (message, count) in &report.error_dist {
            merged
                .error_dist
                .entry(message.clone())
                .and_modify(|total| *total = total.saturating_add(*count))
                .or_insert(*count);
        }
        for (bucket, count) in &report.latency_buckets {
            merged
                .latency_buckets
                .entry(*bucket)
                .and_modify(|total| *total = total.saturating_add(*count))
                .or_insert(*count);
        }

        if report.error_code != 0 && merged.error_code == 0 {
            merged.error_code = report.error_code;
            merged.error_message.clone_from(&report.error_message);
        }

        if !report.histogram_b64.is_empty()
            && let Ok(decoded) = LatencyHistogram::decode_base64(&report.histogram_b64)
        {
            match merged_histogram.as_mut() {
                Some(accumulator) => {
                    let _ = accumulator.merge(&decoded);
                }
                None => merged_histogram = Some(decoded),
            }
        }
    }

    if merged.successful == 0 {
        merged.fastest_ms = 0;
    }
    if let Some(histogram) = &merged_histogram
        && let Ok(encoded) = histogram.encode_base64()
    {
        merged.histogram_b64 = encoded;
    }
    merged.finalize_derived();
    merged.last_sample_ms = merged.last_sample_ms.max(now_epoch_ms());
    merged
}
