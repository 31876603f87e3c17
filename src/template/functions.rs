//! The fixed template function library (spec.md §4.1).
use std::fmt::Write as _;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use once_cell::sync::OnceCell;
use sha1::Sha1;
use sha2::{Digest, Sha256};

use crate::error::TemplateError;
use crate::template::random;

static PROCESS_UUID: OnceCell<String> = OnceCell::new();

fn err_invalid(name: &str, reason: impl Into<String>) -> TemplateError {
    TemplateError::InvalidArgument {
        name: name.to_owned(),
        reason: reason.into(),
    }
}

fn arity(name: &str, args: &[String], expected: usize) -> Result<(), TemplateError> {
    if args.len() != expected {
        return Err(TemplateError::ArgCountMismatch {
            name: name.to_owned(),
            expected: expected.to_string(),
            got: args.len(),
        });
    }
    Ok(())
}

fn arg_f64(name: &str, args: &[String], index: usize) -> Result<f64, TemplateError> {
    args.get(index)
        .ok_or_else(|| err_invalid(name, format!("missing argument {index}")))?
        .parse::<f64>()
        .map_err(|err| err_invalid(name, err.to_string()))
}

fn arg_u64(name: &str, args: &[String], index: usize) -> Result<u64, TemplateError> {
    args.get(index)
        .ok_or_else(|| err_invalid(name, format!("missing argument {index}")))?
        .parse::<u64>()
        .map_err(|err| err_invalid(name, err.to_string()))
}

fn arg(name: &str, args: &[String], index: usize) -> Result<&str, TemplateError> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| err_invalid(name, format!("missing argument {index}")))
}

/// Dispatches a single function call by name.
///
/// # Errors
///
/// Returns a `TemplateError` when the function is unknown, the argument
/// count doesn't match, an argument fails to parse, or the function itself
/// fails (e.g. malformed hex/base64 input).
pub fn call(name: &str, args: &[String]) -> Result<String, TemplateError> {
    match name {
        // numeric
        "intSum" => {
            let mut total: i64 = 0;
            for value in args {
                let parsed: i64 = value
                    .parse()
                    .map_err(|err: std::num::ParseIntError| err_invalid(name, err.to_string()))?;
                total = total.saturating_add(parsed);
            }
            Ok(total.to_string())
        }
        "random" => {
            arity(name, args, 2)?;
            let min = arg_u64(name, args, 0)?;
            let max = arg_u64(name, args, 1)?;
            Ok(random::gen_range_u64(min, max).to_string())
        }
        "randomFloat" => {
            arity(name, args, 2)?;
            let min = arg_f64(name, args, 0)?;
            let max = arg_f64(name, args, 1)?;
            Ok(format_f64(random::gen_range_f64(min, max)))
        }
        "round" => {
            arity(name, args, 1)?;
            Ok(format_f64(arg_f64(name, args, 0)?.round()))
        }
        "ceil" => {
            arity(name, args, 1)?;
            Ok(format_f64(arg_f64(name, args, 0)?.ceil()))
        }
        "floor" => {
            arity(name, args, 1)?;
            Ok(format_f64(arg_f64(name, args, 0)?.floor()))
        }
        "abs" => {
            arity(name, args, 1)?;
            Ok(format_f64(arg_f64(name, args, 0)?.abs()))
        }
        "pow" => {
            arity(name, args, 2)?;
            let base = arg_f64(name, args, 0)?;
            let exp = arg_f64(name, args, 1)?;
            Ok(format_f64(base.powf(exp)))
        }
        "max" => numeric_fold(name, args, f64::max),
        "min" => numeric_fold(name, args, f64::min),
        "increment" => {
            arity(name, args, 1)?;
            #[expect(clippy::float_arithmetic, reason = "this function's entire purpose is user-facing float math")]
            let result = arg_f64(name, args, 0)? + 1.0;
            Ok(format_f64(result))
        }
        "decrement" => {
            arity(name, args, 1)?;
            #[expect(clippy::float_arithmetic, reason = "this function's entire purpose is user-facing float math")]
            let result = arg_f64(name, args, 0)? - 1.0;
            Ok(format_f64(result))
        }

        // strings
        "randomString" => {
            arity(name, args, 1)?;
            let n = usize::try_from(arg_u64(name, args, 0)?).unwrap_or(0);
            Ok(random_alnum_string(n))
        }
        "randomNum" => {
            arity(name, args, 1)?;
            let n = usize::try_from(arg_u64(name, args, 0)?).unwrap_or(0);
            Ok(random_digit_string(n))
        }
        "substring" => {
            arity(name, args, 3)?;
            let s = arg(name, args, 0)?;
            let start = usize::try_from(arg_u64(name, args, 1)?).unwrap_or(0);
            let end = usize::try_from(arg_u64(name, args, 2)?).unwrap_or(0);
            let chars: Vec<char> = s.chars().collect();
            let end = end.min(chars.len());
            let start = start.min(end);
            Ok(chars[start..end].iter().collect())
        }
        "replace" => {
            arity(name, args, 3)?;
            Ok(arg(name, args, 0)?.replace(arg(name, args, 1)?, arg(name, args, 2)?))
        }
        "upper" => {
            arity(name, args, 1)?;
            Ok(arg(name, args, 0)?.to_uppercase())
        }
        "lower" => {
            arity(name, args, 1)?;
            Ok(arg(name, args, 0)?.to_lowercase())
        }
        "trim" => {
            arity(name, args, 1)?;
            Ok(arg(name, args, 0)?.trim().to_owned())
        }
        "join" => {
            let sep = arg(name, args, 0)?;
            Ok(args[1..].join(sep))
        }
        "split" => {
            arity(name, args, 3)?;
            let s = arg(name, args, 0)?;
            let sep = arg(name, args, 1)?;
            let index = usize::try_from(arg_u64(name, args, 2)?).unwrap_or(0);
            Ok(s.split(sep).nth(index).unwrap_or("").to_owned())
        }
        "contains" => {
            arity(name, args, 2)?;
            Ok((arg(name, args, 0)?.contains(arg(name, args, 1)?)).to_string())
        }
        "startsWith" => {
            arity(name, args, 2)?;
            Ok((arg(name, args, 0)?.starts_with(arg(name, args, 1)?)).to_string())
        }
        "endsWith" => {
            arity(name, args, 2)?;
            Ok((arg(name, args, 0)?.ends_with(arg(name, args, 1)?)).to_string())
        }
        "repeat" => {
            arity(name, args, 2)?;
            let n = usize::try_from(arg_u64(name, args, 1)?).unwrap_or(0);
            Ok(arg(name, args, 0)?.repeat(n))
        }
        "reverse" => {
            arity(name, args, 1)?;
            Ok(arg(name, args, 0)?.chars().rev().collect())
        }
        "length" => {
            arity(name, args, 1)?;
            Ok(arg(name, args, 0)?.chars().count().to_string())
        }
        "default" => {
            arity(name, args, 2)?;
            let value = arg(name, args, 0)?;
            if value.is_empty() {
                Ok(arg(name, args, 1)?.to_owned())
            } else {
                Ok(value.to_owned())
            }
        }
        "ternary" => {
            arity(name, args, 3)?;
            let cond = is_truthy(arg(name, args, 0)?);
            Ok(arg(name, args, if cond { 1 } else { 2 })?.to_owned())
        }
        "toString" => {
            arity(name, args, 1)?;
            Ok(arg(name, args, 0)?.to_owned())
        }

        // time
        "date" => {
            arity(name, args, 1)?;
            Ok(format_time(Utc::now(), arg(name, args, 0)?))
        }
        "randomDate" => {
            arity(name, args, 1)?;
            let secs = random::gen_range_u64(0, 4_102_444_800);
            let time =
                DateTime::<Utc>::from_timestamp(i64::try_from(secs).unwrap_or(0), 0).unwrap_or_else(Utc::now);
            Ok(format_time(time, arg(name, args, 0)?))
        }
        "timestamp" => {
            arity(name, args, 0)?;
            Ok(Utc::now().timestamp().to_string())
        }
        "timestampMs" => {
            arity(name, args, 0)?;
            Ok(Utc::now().timestamp_millis().to_string())
        }
        "timestampNano" => {
            arity(name, args, 0)?;
            Ok(Utc::now()
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_string())
        }

        // identifiers & randomness
        "UUID" => {
            arity(name, args, 0)?;
            Ok(process_uuid().clone())
        }
        "randomIP" => {
            arity(name, args, 0)?;
            let bytes = random::gen_bytes(4);
            Ok(format!("{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3]))
        }
        "randomMAC" => {
            arity(name, args, 0)?;
            let bytes = random::gen_bytes(6);
            let mut out = String::with_capacity(17);
            for (index, byte) in bytes.iter().enumerate() {
                if index > 0 {
                    out.push(':');
                }
                let _ = write!(out, "{byte:02x}");
            }
            Ok(out)
        }
        "randomPort" => {
            arity(name, args, 0)?;
            Ok(random::gen_range_u64(1024, 65535).to_string())
        }
        "randomChoice" => {
            if args.is_empty() {
                return Err(err_invalid(name, "requires at least one argument"));
            }
            let index = random::choose_index(args.len());
            Ok(args[index].clone())
        }
        "randomBoolean" => {
            arity(name, args, 0)?;
            Ok(random::gen_bool().to_string())
        }
        "randomEmail" => {
            arity(name, args, 0)?;
            Ok(format!("{}@{}.com", random_alnum_string(8), random_alnum_string(6)))
        }
        "randomPhone" => {
            arity(name, args, 0)?;
            Ok(format!("+1{}", random_digit_string(10)))
        }
        "randomUsername" => {
            arity(name, args, 0)?;
            Ok(format!("user_{}", random_alnum_string(8)))
        }
        "randomUserAgent" => {
            arity(name, args, 0)?;
            const AGENTS: [&str; 3] = [
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36",
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15",
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
            ];
            Ok(AGENTS[random::choose_index(AGENTS.len())].to_owned())
        }
        "randomHTTPMethod" => {
            arity(name, args, 0)?;
            const METHODS: [&str; 5] = ["GET", "POST", "PUT", "PATCH", "DELETE"];
            Ok(METHODS[random::choose_index(METHODS.len())].to_owned())
        }

        // encodings
        "base64Encode" => {
            arity(name, args, 1)?;
            Ok(B64.encode(arg(name, args, 0)?.as_bytes()))
        }
        "base64Decode" => {
            arity(name, args, 1)?;
            let bytes = B64
                .decode(arg(name, args, 0)?)
                .map_err(|err| TemplateError::FunctionFailed {
                    name: name.to_owned(),
                    reason: err.to_string(),
                })?;
            String::from_utf8(bytes).map_err(|err| TemplateError::FunctionFailed {
                name: name.to_owned(),
                reason: err.to_string(),
            })
        }
        "hexToString" => {
            arity(name, args, 1)?;
            let bytes = decode_hex(arg(name, args, 0)?).map_err(|err| TemplateError::FunctionFailed {
                name: name.to_owned(),
                reason: err,
            })?;
            String::from_utf8(bytes).map_err(|err| TemplateError::FunctionFailed {
                name: name.to_owned(),
                reason: err.to_string(),
            })
        }
        "stringToHex" => {
            arity(name, args, 1)?;
            Ok(encode_hex(arg(name, args, 0)?.as_bytes()))
        }
        "urlEncode" => {
            arity(name, args, 1)?;
            Ok(url::form_urlencoded::byte_serialize(arg(name, args, 0)?.as_bytes()).collect())
        }
        "urlDecode" => {
            arity(name, args, 1)?;
            Ok(url::form_urlencoded::parse(arg(name, args, 0)?.as_bytes())
                .map(|(key, value)| if value.is_empty() { key.into_owned() } else { format!("{key}={value}") })
                .collect::<Vec<_>>()
                .join("&"))
        }
        "escape" => {
            arity(name, args, 1)?;
            Ok(serde_json::to_string(arg(name, args, 0)?).unwrap_or_default())
        }

        // crypto
        "md5" => {
            arity(name, args, 1)?;
            Ok(encode_hex(&md5::compute(arg(name, args, 0)?.as_bytes()).0))
        }
        "sha1" => {
            arity(name, args, 1)?;
            let mut hasher = Sha1::new();
            hasher.update(arg(name, args, 0)?.as_bytes());
            Ok(encode_hex(&hasher.finalize()))
        }
        "sha256" => {
            arity(name, args, 1)?;
            let mut hasher = Sha256::new();
            hasher.update(arg(name, args, 0)?.as_bytes());
            Ok(encode_hex(&hasher.finalize()))
        }
        "hmac" => {
            if args.len() != 2 && args.len() != 3 {
                return Err(TemplateError::ArgCountMismatch {
                    name: name.to_owned(),
                    expected: "2 or 3".to_owned(),
                    got: args.len(),
                });
            }
            let key = arg(name, args, 0)?;
            let msg = arg(name, args, 1)?;
            let alg = args.get(2).map(String::as_str).unwrap_or("sha256");
            hmac_digest(name, alg, key, msg)
        }

        // structural
        "jsonEncode" => {
            arity(name, args, 1)?;
            Ok(serde_json::to_string(arg(name, args, 0)?).unwrap_or_default())
        }
        "jsonDecode" => {
            arity(name, args, 1)?;
            let value: serde_json::Value = serde_json::from_str(arg(name, args, 0)?)
                .map_err(|err| TemplateError::FunctionFailed {
                    name: name.to_owned(),
                    reason: err.to_string(),
                })?;
            Ok(json_value_to_string(&value))
        }
        "jsonGet" => {
            arity(name, args, 2)?;
            let value: serde_json::Value = serde_json::from_str(arg(name, args, 0)?)
                .map_err(|err| TemplateError::FunctionFailed {
                    name: name.to_owned(),
                    reason: err.to_string(),
                })?;
            let mut cursor = &value;
            for key in arg(name, args, 1)?.split('.') {
                cursor = cursor.get(key).ok_or_else(|| TemplateError::FunctionFailed {
                    name: name.to_owned(),
                    reason: format!("no such path component '{key}'"),
                })?;
            }
            Ok(json_value_to_string(cursor))
        }
        "urlParse" => {
            arity(name, args, 2)?;
            let parsed = url::Url::parse(arg(name, args, 0)?).map_err(|err| {
                TemplateError::FunctionFailed {
                    name: name.to_owned(),
                    reason: err.to_string(),
                }
            })?;
            Ok(match arg(name, args, 1)? {
                "scheme" => parsed.scheme().to_owned(),
                "host" => parsed.host_str().unwrap_or_default().to_owned(),
                "hostname" => parsed.host_str().unwrap_or_default().to_owned(),
                "port" => parsed.port_or_known_default().unwrap_or(0).to_string(),
                "path" => parsed.path().to_owned(),
                "query" => parsed.query().unwrap_or_default().to_owned(),
                "fragment" => parsed.fragment().unwrap_or_default().to_owned(),
                other => {
                    return Err(err_invalid(name, format!("unknown component '{other}'")));
                }
            })
        }
        "queryBuild" => {
            if args.len() % 2 != 0 {
                return Err(err_invalid(name, "expects key,value pairs"));
            }
            let mut serializer = url::form_urlencoded::Serializer::new(String::new());
            for pair in args.chunks(2) {
                serializer.append_pair(&pair[0], &pair[1]);
            }
            Ok(serializer.finish())
        }

        other => Err(TemplateError::UnknownFunction {
            name: other.to_owned(),
        }),
    }
}

fn numeric_fold(
    name: &str,
    args: &[String],
    op: impl Fn(f64, f64) -> f64,
) -> Result<String, TemplateError> {
    if args.is_empty() {
        return Err(err_invalid(name, "requires at least one argument"));
    }
    let mut acc = arg_f64(name, args, 0)?;
    for index in 1..args.len() {
        acc = op(acc, arg_f64(name, args, index)?);
    }
    Ok(format_f64(acc))
}

fn format_f64(value: f64) -> String {
    if value.fract().abs() < f64::EPSILON && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        let mut text = format!("{value}");
        if !text.contains('.') {
            text.push_str(".0");
        }
        text
    }
}

fn is_truthy(value: &str) -> bool {
    !(value.is_empty() || value.eq_ignore_ascii_case("false") || value == "0")
}

fn random_alnum_string(n: usize) -> String {
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    (0..n)
        .map(|_| ALPHABET[random::choose_index(ALPHABET.len())] as char)
        .collect()
}

fn random_digit_string(n: usize) -> String {
    (0..n)
        .map(|_| char::from(b'0'.saturating_add(u8::try_from(random::gen_range_u64(0, 9)).unwrap_or(0))))
        .collect()
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().saturating_mul(2));
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

fn decode_hex(s: &str) -> Result<Vec<u8>, String> {
    if s.len() % 2 != 0 {
        return Err("odd-length hex string".to_owned());
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            let end = i.saturating_add(2);
            let pair = s.get(i..end).ok_or_else(|| "hex index out of range".to_owned())?;
            u8::from_str_radix(pair, 16).map_err(|err| err.to_string())
        })
        .collect()
}

fn format_time(time: DateTime<Utc>, fmt: &str) -> String {
    match fmt {
        "YMD" => time.format("%Y-%m-%d").to_string(),
        "HMS" => time.format("%H:%M:%S").to_string(),
        "YMDHMS" => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        "YMDHMSMS" => time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        "RFC3339" => time.to_rfc3339(),
        "RFC822" => time.to_rfc2822(),
        other => time.format(other).to_string(),
    }
}

fn process_uuid() -> &'static String {
    PROCESS_UUID.get_or_init(|| {
        let bytes = random::gen_bytes(16);
        let mut bytes: [u8; 16] = bytes.try_into().unwrap_or([0_u8; 16]);
        bytes[6] = (bytes[6] & 0x0f) | 0x40;
        bytes[8] = (bytes[8] & 0x3f) | 0x80;
        format!(
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
            bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15],
        )
    })
}

fn json_value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn hmac_digest(name: &str, alg: &str, key: &str, msg: &str) -> Result<String, TemplateError> {
    match alg {
        "md5" => {
            let mut mac = Hmac::<md5::Md5>::new_from_slice(key.as_bytes())
                .map_err(|err| TemplateError::FunctionFailed {
                    name: name.to_owned(),
                    reason: err.to_string(),
                })?;
            mac.update(msg.as_bytes());
            Ok(encode_hex(&mac.finalize().into_bytes()))
        }
        "sha1" => {
            let mut mac = Hmac::<Sha1>::new_from_slice(key.as_bytes())
                .map_err(|err| TemplateError::FunctionFailed {
                    name: name.to_owned(),
                    reason: err.to_string(),
                })?;
            mac.update(msg.as_bytes());
            Ok(encode_hex(&mac.finalize().into_bytes()))
        }
        "sha256" | "" => {
            let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
                .map_err(|err| TemplateError::FunctionFailed {
                    name: name.to_owned(),
                    reason: err.to_string(),
                })?;
            mac.update(msg.as_bytes());
            Ok(encode_hex(&mac.finalize().into_bytes()))
        }
        other => Err(err_invalid(name, format!("unknown hmac algorithm '{other}'"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_functions() {
        assert_eq!(call("round", &["1.6".to_owned()]).unwrap(), "2");
        assert_eq!(call("abs", &["-3".to_owned()]).unwrap(), "3");
        assert_eq!(
            call("max", &["1".to_owned(), "5".to_owned(), "2".to_owned()]).unwrap(),
            "5"
        );
    }

    #[test]
    fn string_functions() {
        assert_eq!(call("upper", &["abc".to_owned()]).unwrap(), "ABC");
        assert_eq!(
            call("join", &["-".to_owned(), "a".to_owned(), "b".to_owned()]).unwrap(),
            "a-b"
        );
        assert_eq!(
            call("contains", &["hello".to_owned(), "ell".to_owned()]).unwrap(),
            "true"
        );
    }

    #[test]
    fn uuid_is_stable_within_process() {
        let first = call("UUID", &[]).unwrap();
        let second = call("UUID", &[]).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn crypto_functions_produce_expected_digests() {
        assert_eq!(
            call("sha256", &["abc".to_owned()]).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"[..64]
        );
        assert_eq!(call("md5", &["".to_owned()]).unwrap(), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn hex_round_trips() {
        let hex = call("stringToHex", &["hi".to_owned()]).unwrap();
        assert_eq!(call("hexToString", &[hex]).unwrap(), "hi");
    }

    #[test]
    fn json_get_walks_dotted_path() {
        let json = r#"{"a":{"b":"c"}}"#.to_owned();
        assert_eq!(call("jsonGet", &[json, "a.b".to_owned()]).unwrap(), "c");
    }

    #[test]
    fn unknown_function_errors() {
        assert!(matches!(
            call("nope", &[]),
            Err(TemplateError::UnknownFunction { .. })
        ));
    }
}
