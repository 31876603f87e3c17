use std::ffi::OsStr;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::process::{Command, Output};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub struct ServerHandle {
    shutdown: mpsc::Sender<()>,
    thread: Option<thread::JoinHandle<()>>,
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        let _send_result = self.shutdown.send(());
        if let Some(handle) = self.thread.take() {
            drop(handle.join());
        }
    }
}

fn spawn_server<F>(handler: F) -> Result<(String, ServerHandle), String>
where
    F: Fn(TcpStream) + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("bind test server failed: {}", err))?;
    let addr = listener
        .local_addr()
        .map_err(|err| format!("server addr failed: {}", err))?;
    listener
        .set_nonblocking(true)
        .map_err(|err| format!("set_nonblocking failed: {}", err))?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel();
    let handler = std::sync::Arc::new(handler);

    let handle = thread::spawn(move || {
        loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            match listener.accept() {
                Ok((stream, _)) => {
                    let handler = std::sync::Arc::clone(&handler);
                    thread::spawn(move || handler(stream));
                }
                Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(10));
                }
                Err(_) => break,
            }
        }
    });

    Ok((
        format!("http://{}", addr),
        ServerHandle {
            shutdown: shutdown_tx,
            thread: Some(handle),
        },
    ))
}

/// Spawns a server that replies `200 OK` with a fixed 2-byte body, ignoring
/// the request (scenario 1, "fixed N smoke test").
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_echo_server() -> Result<(String, ServerHandle), String> {
    spawn_server(|mut stream| {
        let mut buffer = [0u8; 1024];
        if stream.read(&mut buffer).is_err() {
            return;
        }
        let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
        let _ = stream.flush();
        drop(stream.shutdown(Shutdown::Both));
    })
}

/// Spawns a server that sleeps `delay` before replying `200 OK` (scenario
/// 2, "early stop").
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_slow_echo_server(delay: Duration) -> Result<(String, ServerHandle), String> {
    spawn_server(move |mut stream| {
        let mut buffer = [0u8; 1024];
        if stream.read(&mut buffer).is_err() {
            return;
        }
        thread::sleep(delay);
        let _ = stream.write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
        let _ = stream.flush();
        drop(stream.shutdown(Shutdown::Both));
    })
}

/// Spawns a server that reads the request body and mirrors its length back
/// as the response body (scenario 4, "hex body").
///
/// # Errors
///
/// Returns an error if the listener cannot be created or configured.
pub fn spawn_mirror_server() -> Result<(String, ServerHandle), String> {
    spawn_server(|mut stream| {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 1024];
        let Ok(bytes) = stream.read(&mut chunk) else {
            return;
        };
        buffer.extend_from_slice(chunk.get(..bytes).unwrap_or_default());
        let content_length = std::str::from_utf8(&buffer)
            .ok()
            .and_then(|text| {
                text.lines()
                    .find_map(|line| line.strip_prefix("Content-Length:"))
            })
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let body = "x".repeat(content_length);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.flush();
        drop(stream.shutdown(Shutdown::Both));
    })
}

/// Run the `strest` binary and capture output.
///
/// # Errors
///
/// Returns an error if the binary cannot be executed.
pub fn run_strest<I, S>(args: I) -> Result<Output, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = strest_bin()?;
    Command::new(bin)
        .args(args)
        .env("RUST_LOG", "error")
        .output()
        .map_err(|err| format!("run strest failed: {}", err))
}

/// Extracts the integer value following `label` from a rendered summary
/// report, e.g. `parse_summary_metric(text, "Successful:")`.
///
/// # Errors
///
/// Returns an error if `label` is not found or its value does not parse.
pub fn parse_summary_metric(output: &str, label: &str) -> Result<u64, String> {
    for line in output.lines() {
        if let Some(rest) = line.trim_start().strip_prefix(label) {
            let number_str = rest.trim().split_whitespace().next().unwrap_or("");
            return number_str
                .parse::<u64>()
                .map_err(|err| format!("failed to parse {}: {}", label, err));
        }
    }
    Err(format!("missing {} in output", label))
}

fn strest_bin() -> Result<String, String> {
    option_env!("CARGO_BIN_EXE_strest").map_or_else(
        || Err("CARGO_BIN_EXE_strest missing at compile time.".to_owned()),
        |path| Ok(path.to_owned()),
    )
}
