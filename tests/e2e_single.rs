mod support_single;

use std::time::{Duration, Instant};

use support_single::{
    parse_summary_metric, run_strest, spawn_echo_server, spawn_mirror_server,
    spawn_slow_echo_server,
};

fn assert_success(output: &std::process::Output) {
    assert!(
        output.status.success(),
        "strest exited non-zero.\nstdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Scenario 1 (spec.md §8): fixed N against a local 200/"ok" echo server.
#[test]
fn scenario_fixed_n_smoke_test() -> Result<(), String> {
    let (url, _server) = spawn_echo_server()?;
    let output = run_strest(["-u", &url, "-n", "10", "-c", "2", "-m", "GET"])
        .map_err(|err| err.to_string())?;
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let successful = parse_summary_metric(&stdout, "Successful:")?;
    assert_eq!(successful, 10);
    assert!(stdout.contains("[200]"));
    assert!(!stdout.contains("Error distribution:"));
    Ok(())
}

/// Scenario 3 (spec.md §8): a QPS cap bounds successful requests within a
/// fixed wall duration, with slack for in-flight requests (P9).
#[test]
fn scenario_qps_cap_bounds_throughput() -> Result<(), String> {
    let (url, _server) = spawn_echo_server()?;
    let output = run_strest(["-u", &url, "-c", "10", "-q", "100", "-d", "1s"])
        .map_err(|err| err.to_string())?;
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let successful = parse_summary_metric(&stdout, "Successful:")?;
    assert!(
        (90..=110).contains(&successful),
        "successful={successful} outside the expected QPS-cap band"
    );
    Ok(())
}

/// Scenario 4 (spec.md §8): a hex-encoded body mirrored back by the server
/// yields a `contentLength` of 5 bytes per successful response.
#[test]
fn scenario_hex_body_mirrors_content_length() -> Result<(), String> {
    let (url, _server) = spawn_mirror_server()?;
    let output = run_strest([
        "-u",
        &url,
        "-n",
        "5",
        "-c",
        "1",
        "-m",
        "POST",
        "--bodytype",
        "hex",
        "--body",
        "68656c6c6f",
    ])
    .map_err(|err| err.to_string())?;
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let successful = parse_summary_metric(&stdout, "Successful:")?;
    assert_eq!(successful, 5);
    let total_bytes = parse_summary_metric(&stdout, "Total bytes:")?;
    assert_eq!(total_bytes, 5 * successful);
    Ok(())
}

/// Scenario 5 (spec.md §8): a target that never accepts connections drives
/// the error rate past 50%, tripping the circuit breaker (P8) well before
/// `N=1000` requests would otherwise complete serially.
#[test]
fn scenario_circuit_breaker_trips_on_unreachable_target() -> Result<(), String> {
    let started = Instant::now();
    let output = run_strest(["-u", "http://127.0.0.1:1/", "-n", "1000", "-c", "4"])
        .map_err(|err| err.to_string())?;
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let successful = parse_summary_metric(&stdout, "Successful:")?;
    assert_eq!(successful, 0);
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "circuit breaker should have ended the run well before completing 1000 requests serially"
    );
    Ok(())
}

/// Scenario 2 variant (spec.md §8, "early stop"): a slow server combined
/// with a short per-request timeout keeps the run bounded even though N is
/// large, exercising the same "partial report still prints" path as an
/// external Stop.
#[test]
fn scenario_early_termination_reports_partial_results() -> Result<(), String> {
    let (url, _server) = spawn_slow_echo_server(Duration::from_millis(50));
    let output = run_strest([
        "-u", &url, "-n", "100", "-c", "1", "-d", "150ms", "-t", "500",
    ])
    .map_err(|err| err.to_string())?;
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);

    let successful = parse_summary_metric(&stdout, "Successful:")?;
    assert!(successful < 100, "expected an early, partial stop");
    Ok(())
}

/// The CSV output format always emits the `duration,count` header, even
/// when every reported bucket is empty (§7, "partial data").
#[test]
fn csv_output_emits_duration_count_rows() -> Result<(), String> {
    let (url, _server) = spawn_echo_server()?;
    let output = run_strest(["-u", &url, "-n", "3", "-c", "1", "-o", "csv"])
        .map_err(|err| err.to_string())?;
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("duration,count"));
    Ok(())
}

/// A config/parse error before any run exits non-zero (§6 Exit codes):
/// `N>0 && N<C` is rejected by `RunSpec::validate`.
#[test]
fn rejects_request_count_below_concurrency() -> Result<(), String> {
    let output = run_strest(["-u", "http://127.0.0.1:1/", "-n", "1", "-c", "5"])
        .map_err(|err| err.to_string())?;
    assert!(!output.status.success());
    Ok(())
}
