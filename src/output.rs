//! Report rendering for the three `OutputFormat`s (§3 DATA MODEL,
//! `Report.output`). Grounded on the teacher's `distributed/summary.rs
//! ::print_summary` plain-text layout and `app/export.rs`'s CSV/JSON
//! writer idiom, retargeted at this crate's `Report` shape.
use std::fmt::Write as _;

use crate::domain::Report;

/// Renders a `_x100` fixed-point value (see `Report::rps_x100`) as
/// `whole.fraction`, e.g. `1234` -> `"12.34"`. `100` is a compile-time
/// nonzero literal, so the division/remainder below can't panic.
fn format_fixed2(value_x100: u64) -> String {
    format!("{}.{:02}", value_x100 / 100, value_x100 % 100)
}

/// Renders `report` per `report.output`.
#[must_use]
pub fn render(report: &Report) -> String {
    match report.output {
        crate::domain::OutputFormat::Summary => render_summary(report),
        crate::domain::OutputFormat::Csv => render_csv(report),
        crate::domain::OutputFormat::Html => render_html(report),
    }
}

/// Human-readable summary, printed even for a partial (early-stopped)
/// report (§7 ERROR HANDLING DESIGN: "on early stop, the summary still
/// prints what was collected").
#[must_use]
pub fn render_summary(report: &Report) -> String {
    let mut out = String::new();
    let total = report.total();
    let success_rate_x100 = if total > 0 {
        report.successful.saturating_mul(10_000).checked_div(total).unwrap_or(0)
    } else {
        0
    };

    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "  Total:          {total}");
    let _ = writeln!(
        out,
        "  Successful:     {} ({}%)",
        report.successful,
        format_fixed2(success_rate_x100)
    );
    let _ = writeln!(out, "  Errors:         {}", report.errors);
    let _ = writeln!(out, "  Duration:       {} ms", report.duration_ms);
    let _ = writeln!(out, "  Requests/sec:   {}", format_fixed2(report.rps_x100));
    let _ = writeln!(out, "  Fastest:        {} ms", report.fastest_ms);
    let _ = writeln!(out, "  Slowest:        {} ms", report.slowest_ms);
    let _ = writeln!(out, "  Mean:           {} ms", report.mean_ms);
    let _ = writeln!(out, "  Total bytes:    {}", report.bytes_total);

    if !report.status_dist.is_empty() {
        let _ = writeln!(out, "\nStatus code distribution:");
        for (status, count) in &report.status_dist {
            let _ = writeln!(out, "  [{status}]\t{count} responses");
        }
    }
    if !report.error_dist.is_empty() {
        let _ = writeln!(out, "\nError distribution:");
        for (message, count) in &report.error_dist {
            let _ = writeln!(out, "  [{count}]\t{message}");
        }
    }
    if report.error_code != 0 {
        let _ = writeln!(
            out,
            "\nControl-plane error {}: {}",
            report.error_code, report.error_message
        );
    }
    out
}

/// CSV of the latency distribution: `duration,count` rows (§7: "CSV output
/// prints `duration,count` rows even for partial data"), `duration` being
/// the per-millisecond latency bucket key.
#[must_use]
pub fn render_csv(report: &Report) -> String {
    let mut out = String::from("duration,count\n");
    for (bucket_ms, count) in &report.latency_buckets {
        let _ = writeln!(out, "{bucket_ms},{count}");
    }
    out
}

/// A minimal static HTML report (the dashboard's HTML page is a separate,
/// out-of-scope external asset; see `dashboard::PLACEHOLDER_HTML`).
#[must_use]
pub fn render_html(report: &Report) -> String {
    let mut rows = String::new();
    for (status, count) in &report.status_dist {
        let _ = writeln!(rows, "<tr><td>{status}</td><td>{count}</td></tr>");
    }
    format!(
        "<!DOCTYPE html>\n<html><head><title>strest report</title></head><body>\n\
         <h1>strest report</h1>\n\
         <table>\n\
         <tr><th>Successful</th><td>{}</td></tr>\n\
         <tr><th>Errors</th><td>{}</td></tr>\n\
         <tr><th>RPS</th><td>{}</td></tr>\n\
         <tr><th>Mean (ms)</th><td>{}</td></tr>\n\
         <tr><th>Fastest (ms)</th><td>{}</td></tr>\n\
         <tr><th>Slowest (ms)</th><td>{}</td></tr>\n\
         <tr><th>Bytes</th><td>{}</td></tr>\n\
         </table>\n\
         <h2>Status codes</h2>\n\
         <table>{rows}</table>\n\
         </body></html>\n",
        report.successful,
        report.errors,
        format_fixed2(report.rps_x100),
        report.mean_ms,
        report.fastest_ms,
        report.slowest_ms,
        report.bytes_total,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OutputFormat;

    fn sample_report() -> Report {
        let mut report = Report {
            output: OutputFormat::Summary,
            ..Report::default()
        };
        report.successful = 9;
        report.errors = 1;
        report.duration_ms = 1000;
        report.status_dist.insert(200, 9);
        report.error_dist.insert("timeout".to_owned(), 1);
        report.latency_buckets.insert(5, 4);
        report.latency_buckets.insert(6, 5);
        report.finalize_derived();
        report
    }

    #[test]
    fn summary_reports_totals_even_when_partial() {
        let report = sample_report();
        let text = render_summary(&report);
        assert!(text.contains("Total:          10"));
        assert!(text.contains("[200]"));
        assert!(text.contains("timeout"));
    }

    #[test]
    fn csv_emits_duration_count_header_and_rows() {
        let report = sample_report();
        let csv = render_csv(&report);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("duration,count"));
        assert_eq!(lines.next(), Some("5,4"));
        assert_eq!(lines.next(), Some("6,5"));
    }

    #[test]
    fn csv_is_well_formed_for_an_empty_report() {
        let report = Report::default();
        assert_eq!(render_csv(&report), "duration,count\n");
    }

    #[test]
    fn html_embeds_status_distribution() {
        let report = sample_report();
        let html = render_html(&report);
        assert!(html.contains("<td>200</td><td>9</td>"));
    }

    #[test]
    fn render_dispatches_on_output_format() {
        let mut report = sample_report();
        report.output = OutputFormat::Csv;
        assert!(render(&report).starts_with("duration,count"));
    }
}
