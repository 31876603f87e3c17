//! CLI & Config Layer (C10, ambient): the flag surface of spec.md §6,
//! parsed with `clap`'s derive API the way the teacher's `args/cli/tester.rs`
//! builds `TesterArgs`, then assembled into a `RunSpec`.
use clap::Parser;

use crate::domain::{
    BodyEncoding, CommandKind, HttpMethod, OutputFormat, ProtocolKind, RunSpec,
};
use crate::error::ValidationError;

/// `CliArgs::timeout_ms`'s CLI default; also the config-overlay "unset"
/// sentinel for that field (same convention as `n == 0`/`c == 1` below).
const DEFAULT_TIMEOUT_MS: u64 = 20_000;

/// Drives a configurable volume of HTTP/1.1, HTTP/2, HTTP/3, or WebSocket
/// traffic against a target and reports throughput, latency, and error
/// statistics.
#[derive(Debug, Parser, Clone)]
#[command(name = "strest", version, about)]
pub struct CliArgs {
    /// Target URL (may also be given positionally).
    #[arg(long = "url", short = 'u')]
    pub url: Option<String>,

    /// Target URL, given positionally instead of via -url.
    #[arg(value_name = "URL")]
    pub url_positional: Option<String>,

    /// Read target(s) from a file: a `###`-delimited `.http` script or a
    /// newline-separated URL list (autodetected).
    #[arg(long = "file")]
    pub file: Option<String>,

    /// Total number of requests to issue (0 = unbounded until duration/Stop).
    #[arg(long = "n", short = 'n', default_value_t = 0)]
    pub n: u64,

    /// Number of concurrent workers.
    #[arg(long = "c", short = 'c', default_value_t = 1)]
    pub c: u64,

    /// Queries per second cap across all workers (0 = no cap).
    #[arg(long = "q", short = 'q', default_value_t = 0)]
    pub qps: u64,

    /// Run duration, e.g. `30s`, `500ms`, `5m`, `1h`, `1d`, `1w` (bare
    /// number = seconds). 0 = unbounded until N is reached or Stop.
    #[arg(long = "d", short = 'd', default_value = "0", value_parser = parse_duration_ms)]
    pub duration_ms: u64,

    /// Per-request timeout, in milliseconds.
    #[arg(long = "t", short = 't', default_value_t = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// HTTP method.
    #[arg(long = "m", short = 'm', default_value = "GET", value_parser = parse_method)]
    pub method: HttpMethod,

    /// A request header `Key: Value` (repeatable).
    #[arg(long = "H", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Request body (template).
    #[arg(long = "body", default_value = "")]
    pub body: String,

    /// Body encoding: `string` or `hex`.
    #[arg(long = "bodytype", default_value = "string", value_parser = parse_body_encoding)]
    pub body_encoding: BodyEncoding,

    /// Basic auth `user:pass`, sent as `Authorization: Basic <base64>`.
    #[arg(long = "a", short = 'a')]
    pub basic_auth: Option<String>,

    /// Protocol: http1, http2, http3, ws, or wss.
    #[arg(long = "http", default_value = "http1", value_parser = parse_protocol)]
    pub protocol: ProtocolKind,

    /// Proxy address `host:port`.
    #[arg(long = "x")]
    pub proxy: Option<String>,

    /// Disable response compression negotiation.
    #[arg(long = "disable-compression")]
    pub disable_compression: bool,

    /// Close the connection after every request.
    #[arg(long = "disable-keepalive")]
    pub disable_keepalive: bool,

    /// Number of OS threads the Tokio runtime should use (defaults to available cores).
    #[arg(long = "cpus")]
    pub cpus: Option<usize>,

    /// Output format: summary, csv, or html.
    #[arg(long = "o", short = 'o', default_value = "summary", value_parser = parse_output_format)]
    pub output: OutputFormat,

    /// Verbosity: 0=ERROR, 1=INFO, 2=DEBUG, 3=TRACE.
    #[arg(long = "verbose", default_value_t = 0)]
    pub verbose: u8,

    /// Run as dashboard + worker, listening on `host:port`.
    #[arg(long = "listen")]
    pub listen: Option<String>,

    /// A remote worker `host:port` to fan this run out to (repeatable).
    /// When set, this process acts as the coordinator.
    #[arg(long = "W")]
    pub workers: Vec<String>,

    /// Load CLI defaults from a TOML or JSON config file; explicit flags
    /// above still take precedence over values found there.
    #[arg(long = "config")]
    pub config: Option<String>,

    /// A tag recorded on the RunSpec's `origin` field for this invocation.
    #[arg(long = "origin", default_value = "cli")]
    pub origin: String,
}

impl CliArgs {
    /// Overlays config-file values under any flag the user didn't set
    /// explicitly on the command line (CLI always wins).
    pub fn apply_config(&mut self, config: &crate::config::ConfigFile) {
        if self.url.is_none() {
            self.url = config.url.clone();
        }
        if self.file.is_none() {
            self.file = config.file.clone();
        }
        if self.n == 0 {
            self.n = config.n.unwrap_or(0);
        }
        if self.c == 1 {
            self.c = config.c.unwrap_or(1);
        }
        if self.qps == 0 {
            self.qps = config.qps.unwrap_or(0);
        }
        if self.proxy.is_none() {
            self.proxy = config.proxy.clone();
        }
        if self.basic_auth.is_none() {
            self.basic_auth = config.basic_auth.clone();
        }
        if self.listen.is_none() {
            self.listen = config.listen.clone();
        }
        if self.workers.is_empty() {
            self.workers = config.workers.clone().unwrap_or_default();
        }
        if let Some(headers) = &config.headers {
            if self.headers.is_empty() {
                self.headers = headers
                    .iter()
                    .filter_map(|raw| parse_header(raw).ok())
                    .collect();
            }
        }
        if self.body.is_empty() {
            if let Some(body) = &config.body {
                self.body = body.clone();
            }
        }
        if self.cpus.is_none() {
            self.cpus = config.cpus;
        }
        if self.method == HttpMethod::Get {
            if let Some(parsed) = config.method.as_deref().and_then(|raw| raw.parse().ok()) {
                self.method = parsed;
            }
        }
        if self.protocol == ProtocolKind::Http1 {
            if let Some(parsed) = config.protocol.as_deref().and_then(|raw| raw.parse().ok()) {
                self.protocol = parsed;
            }
        }
        if self.body_encoding == BodyEncoding::Plain {
            if let Some(parsed) = config
                .bodytype
                .as_deref()
                .and_then(|raw| parse_body_encoding(raw).ok())
            {
                self.body_encoding = parsed;
            }
        }
        if self.duration_ms == 0 {
            if let Some(parsed) = config.duration.as_deref().and_then(|raw| parse_duration_ms(raw).ok()) {
                self.duration_ms = parsed;
            }
        }
        if self.timeout_ms == DEFAULT_TIMEOUT_MS {
            if let Some(timeout_ms) = config.timeout_ms {
                self.timeout_ms = timeout_ms;
            }
        }
        if !self.disable_compression {
            self.disable_compression = config.disable_compression.unwrap_or(false);
        }
        if !self.disable_keepalive {
            self.disable_keepalive = config.disable_keepalive.unwrap_or(false);
        }
        if self.output == OutputFormat::Summary {
            if let Some(parsed) = config.output.as_deref().and_then(|raw| raw.parse().ok()) {
                self.output = parsed;
            }
        }
        if self.verbose == 0 {
            self.verbose = config.verbose.unwrap_or(0);
        }
    }

    /// Resolves the configured target into a single URL: `-url`, the
    /// positional argument, or the first line/block of `-file`.
    #[must_use]
    pub fn resolve_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| self.url_positional.clone())
            .or_else(|| self.file.as_deref().and_then(crate::httpfile::first_url))
    }

    /// Builds the immutable `RunSpec` for this invocation, assigning
    /// `seq` as its sequence id.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the URL is missing or the §3
    /// invariants (`C >= 1`, `N>0 || duration>0`, `N>0 && N<C` rejected)
    /// are violated.
    pub fn build_run_spec(&self, seq: i64) -> Result<RunSpec, ValidationError> {
        let url = self.resolve_url().ok_or(ValidationError::MissingUrl)?;
        let mut headers = self.headers.clone();
        if let Some(pair) = &self.basic_auth {
            let (user, pass) = pair
                .split_once(':')
                .ok_or(ValidationError::AuthPairInvalidFormat)?;
            let encoded = base64::Engine::encode(
                &base64::engine::general_purpose::STANDARD,
                format!("{user}:{pass}"),
            );
            headers.push(("Authorization".to_owned(), format!("Basic {encoded}")));
        }

        let spec = RunSpec {
            seq,
            command: CommandKind::Start,
            protocol: self.protocol,
            method: self.method,
            url,
            body: self.body.clone(),
            body_encoding: self.body_encoding,
            n: self.n,
            c: self.c,
            duration_ms: self.duration_ms,
            timeout_ms: self.timeout_ms,
            qps: self.qps,
            disable_compression: self.disable_compression,
            disable_keepalive: self.disable_keepalive,
            headers,
            proxy: self.proxy.clone(),
            output: self.output,
            origin: self.origin.clone(),
        };
        spec.validate()?;
        Ok(spec)
    }
}

fn parse_header(value: &str) -> Result<(String, String), ValidationError> {
    value
        .split_once(':')
        .map(|(key, val)| (key.trim().to_owned(), val.trim().to_owned()))
        .ok_or_else(|| ValidationError::InvalidHeaderFormat {
            value: value.to_owned(),
        })
}

fn parse_method(value: &str) -> Result<HttpMethod, String> {
    value.parse().map_err(|err: ValidationError| err.to_string())
}

fn parse_protocol(value: &str) -> Result<ProtocolKind, String> {
    value.parse().map_err(|err: ValidationError| err.to_string())
}

fn parse_output_format(value: &str) -> Result<OutputFormat, String> {
    value.parse().map_err(|err: ValidationError| err.to_string())
}

fn parse_body_encoding(value: &str) -> Result<BodyEncoding, String> {
    match value.to_ascii_lowercase().as_str() {
        "string" | "plain" => Ok(BodyEncoding::Plain),
        "hex" => Ok(BodyEncoding::Hex),
        other => Err(format!("Invalid body type '{other}'. Use string or hex.")),
    }
}

/// Parses a duration with suffix `ms|s|m|h|d|w`; a bare number is seconds.
/// Grounded on the teacher's `args/parsers.rs::parse_duration_arg`,
/// extended with the `d`/`w` suffixes spec.md §6 adds.
fn parse_duration_ms(value: &str) -> Result<u64, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("Duration must not be empty.".to_owned());
    }
    let digits_len = trimmed.chars().take_while(char::is_ascii_digit).count();
    if digits_len == 0 {
        return Err(format!("Invalid duration '{trimmed}'."));
    }
    let (num_part, unit_part) = trimmed.split_at(digits_len);
    let number: u64 = num_part
        .parse()
        .map_err(|err| format!("Invalid duration '{trimmed}': {err}"))?;
    let unit = if unit_part.is_empty() { "s" } else { unit_part };
    let ms = match unit {
        "ms" => Some(number),
        "s" => number.checked_mul(1_000),
        "m" => number.checked_mul(60_000),
        "h" => number.checked_mul(3_600_000),
        "d" => number.checked_mul(86_400_000),
        "w" => number.checked_mul(604_800_000),
        other => return Err(format!("Invalid duration unit '{other}'.")),
    };
    ms.ok_or_else(|| "Duration overflow.".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            url: Some("http://127.0.0.1:1/".to_owned()),
            url_positional: None,
            file: None,
            n: 10,
            c: 2,
            qps: 0,
            duration_ms: 0,
            timeout_ms: 1000,
            method: HttpMethod::Get,
            headers: Vec::new(),
            body: String::new(),
            body_encoding: BodyEncoding::Plain,
            basic_auth: None,
            protocol: ProtocolKind::Http1,
            proxy: None,
            disable_compression: false,
            disable_keepalive: false,
            cpus: None,
            output: OutputFormat::Summary,
            verbose: 0,
            listen: None,
            workers: Vec::new(),
            config: None,
            origin: "test".to_owned(),
        }
    }

    #[test]
    fn parses_bare_seconds() {
        assert_eq!(parse_duration_ms("5").unwrap(), 5_000);
    }

    #[test]
    fn parses_all_suffixes() {
        assert_eq!(parse_duration_ms("250ms").unwrap(), 250);
        assert_eq!(parse_duration_ms("2s").unwrap(), 2_000);
        assert_eq!(parse_duration_ms("1m").unwrap(), 60_000);
        assert_eq!(parse_duration_ms("1h").unwrap(), 3_600_000);
        assert_eq!(parse_duration_ms("1d").unwrap(), 86_400_000);
        assert_eq!(parse_duration_ms("1w").unwrap(), 604_800_000);
    }

    #[test]
    fn rejects_unknown_unit() {
        assert!(parse_duration_ms("5x").is_err());
    }

    #[test]
    fn build_run_spec_resolves_basic_auth_header() {
        let mut args = base_args();
        args.basic_auth = Some("alice:secret".to_owned());
        let spec = args.build_run_spec(1).unwrap();
        assert!(
            spec.headers
                .iter()
                .any(|(key, value)| key == "Authorization" && value.starts_with("Basic "))
        );
    }

    #[test]
    fn build_run_spec_rejects_missing_url() {
        let mut args = base_args();
        args.url = None;
        assert!(matches!(
            args.build_run_spec(1),
            Err(ValidationError::MissingUrl)
        ));
    }

    #[test]
    fn build_run_spec_propagates_invariant_violations() {
        let mut args = base_args();
        args.n = 1;
        args.c = 5;
        assert!(matches!(
            args.build_run_spec(1),
            Err(ValidationError::RequestCountBelowConcurrency { n: 1, c: 5 })
        ));
    }

    #[test]
    fn apply_config_only_fills_unset_fields() {
        let mut args = base_args();
        args.url = None;
        args.n = 0;
        let config = crate::config::ConfigFile {
            url: Some("http://example.invalid/".to_owned()),
            n: Some(50),
            c: Some(9),
            ..crate::config::ConfigFile::default()
        };
        args.apply_config(&config);
        assert_eq!(args.url.as_deref(), Some("http://example.invalid/"));
        assert_eq!(args.n, 50);
        // c was explicitly left at its CLI default of 1 in base_args, so the
        // config overlay rule (n==0/c==1 are "unset") fills it in too.
        assert_eq!(args.c, 9);
    }

    #[test]
    fn apply_config_wires_method_protocol_and_output_fields() {
        let mut args = base_args();
        let config = crate::config::ConfigFile {
            method: Some("post".to_owned()),
            protocol: Some("ws".to_owned()),
            bodytype: Some("hex".to_owned()),
            duration: Some("30s".to_owned()),
            timeout_ms: Some(5_000),
            disable_compression: Some(true),
            disable_keepalive: Some(true),
            output: Some("csv".to_owned()),
            verbose: Some(2),
            ..crate::config::ConfigFile::default()
        };
        args.apply_config(&config);
        assert_eq!(args.method, HttpMethod::Post);
        assert_eq!(args.protocol, ProtocolKind::Ws);
        assert_eq!(args.body_encoding, BodyEncoding::Hex);
        assert_eq!(args.duration_ms, 30_000);
        assert_eq!(args.timeout_ms, 5_000);
        assert!(args.disable_compression);
        assert!(args.disable_keepalive);
        assert_eq!(args.output, OutputFormat::Csv);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn apply_config_does_not_override_explicit_cli_flags() {
        let mut args = base_args();
        args.method = HttpMethod::Put;
        args.timeout_ms = 9_999;
        let config = crate::config::ConfigFile {
            method: Some("get".to_owned()),
            timeout_ms: Some(1_000),
            ..crate::config::ConfigFile::default()
        };
        args.apply_config(&config);
        assert_eq!(args.method, HttpMethod::Put);
        assert_eq!(args.timeout_ms, 9_999);
    }
}
