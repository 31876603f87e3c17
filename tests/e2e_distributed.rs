mod support_single;

use std::thread;
use std::time::Duration;

use strestbench::domain::{
    BodyEncoding, CommandKind, HttpMethod, OutputFormat, ProtocolKind, Report, RunSpec,
};
use support_distributed::{pick_port, spawn_strest, spawn_strest_with_output, wait_for_exit};

fn worker_addr(port: u16) -> String {
    format!("127.0.0.1:{port}")
}

fn sample_spec(seq: i64, target_url: &str) -> RunSpec {
    RunSpec {
        seq,
        command: CommandKind::Start,
        protocol: ProtocolKind::Http1,
        method: HttpMethod::Get,
        url: target_url.to_owned(),
        body: String::new(),
        body_encoding: BodyEncoding::Plain,
        n: 1000,
        c: 1,
        duration_ms: 0,
        timeout_ms: 5000,
        qps: 0,
        disable_compression: false,
        disable_keepalive: false,
        headers: Vec::new(),
        proxy: None,
        output: OutputFormat::Summary,
        origin: "e2e-distributed".to_owned(),
    }
}

/// Scenario 2 (spec.md §8, "early stop") exercised through the control
/// plane's own wire contract (§4.7) rather than OS signals: a `Start`
/// request blocks the connection until the run ends, and a concurrent
/// `Stop` request against the same worker ends it early, with the `Start`
/// response's `error_code`/`error_message` set per the `GetResult`
/// "stopped" contract (§4.4).
#[tokio::test(flavor = "multi_thread")]
async fn stop_request_ends_a_running_worker_early() -> Result<(), String> {
    let port = pick_port()?;
    let mut worker = spawn_strest(["-listen", &worker_addr(port)])?;

    // give the listener a moment to bind before sending requests.
    thread::sleep(Duration::from_millis(200));

    let client = reqwest::Client::new();
    let base = format!("http://{}", worker_addr(port));
    let start_spec = sample_spec(1, "http://127.0.0.1:1/");

    let start_client = client.clone();
    let start_base = base.clone();
    let start_spec_clone = start_spec.clone();
    let start_task = tokio::spawn(async move {
        start_client
            .post(format!("{start_base}/api"))
            .json(&start_spec_clone)
            .send()
            .await
    });

    tokio::time::sleep(Duration::from_millis(150)).await;

    let mut stop_spec = start_spec.clone();
    stop_spec.command = CommandKind::Stop;
    let stop_response = client
        .post(format!("{base}/api"))
        .json(&stop_spec)
        .send()
        .await
        .map_err(|err| format!("stop request failed: {err}"))?;
    assert!(stop_response.status().is_success());

    let start_response = start_task
        .await
        .map_err(|err| format!("start task panicked: {err}"))?
        .map_err(|err| format!("start request failed: {err}"))?;
    assert!(start_response.status().is_success());
    let report: Report = start_response
        .json()
        .await
        .map_err(|err| format!("start response body invalid: {err}"))?;
    assert_eq!(report.error_code, 1);
    assert_eq!(report.error_message, "stopped");

    drop(worker.kill());
    drop(worker.wait());
    Ok(())
}

/// A multi-worker distributed run (§4.7): the coordinator fans the same
/// `RunSpec` out to two `-listen` workers unmodified and merges their
/// reports (§4.8), so the merged successful count is the sum of what each
/// worker ran on its own (N per worker, not N split across workers).
#[test]
fn coordinator_merges_reports_from_two_workers() -> Result<(), String> {
    let port_a = pick_port()?;
    let port_b = pick_port()?;
    let mut worker_a = spawn_strest(["-listen", &worker_addr(port_a)])?;
    let mut worker_b = spawn_strest(["-listen", &worker_addr(port_b)])?;
    thread::sleep(Duration::from_millis(200));

    let (echo_url, _echo_server) = support_single::spawn_echo_server()?;

    let mut child = spawn_strest_with_output([
        "-u",
        &echo_url,
        "-n",
        "20",
        "-c",
        "2",
        "-W",
        &format!("http://{}", worker_addr(port_a)),
        "-W",
        &format!("http://{}", worker_addr(port_b)),
    ])?;

    let status = wait_for_exit(&mut child, Duration::from_secs(20))?;
    let (stdout, stderr) = support_distributed::read_child_output(&mut child)
        .unwrap_or_else(|_| (String::new(), String::new()));

    drop(worker_a.kill());
    drop(worker_a.wait());
    drop(worker_b.kill());
    drop(worker_b.wait());

    assert!(
        status.success(),
        "coordinator exited non-zero.\nstdout: {stdout}\nstderr: {stderr}"
    );
    let successful = support_single::parse_summary_metric(&stdout, "Successful:")?;
    assert_eq!(successful, 40);
    Ok(())
}
