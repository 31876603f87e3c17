//! `-file` target parsing (spec.md §6, Design Note 9b): a single flag that
//! autodetects a `###`-delimited `.http` script versus a bare
//! newline-separated URL list, by sniffing for the `###` delimiter. This is
//! external-collaborator glue (spec.md §1 lists "`.http`-file and URL-file
//! parsing" as out of scope) kept minimal: it only has to resolve a target
//! for C1/C5, not fully model `.http` request chaining.
use crate::error::ConfigError;

/// One parsed target: an HTTP method, a URL, headers, and a body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    pub method: Option<String>,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Parses `path` as either a `.http` script or a newline-separated URL
/// list, returning every target found.
///
/// # Errors
///
/// Returns a `ConfigError` if `path` cannot be read, or is empty.
pub fn parse(path: &str) -> Result<Vec<FileTarget>, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.into(),
        source,
    })?;
    if content.trim().is_empty() {
        return Err(ConfigError::FileEmpty { path: path.into() });
    }
    if looks_like_http_script(&content) {
        Ok(parse_http_script(&content))
    } else {
        Ok(parse_url_list(&content))
    }
}

/// Convenience used by the CLI layer to resolve just the first target's
/// URL when no `-url` flag was given.
#[must_use]
pub fn first_url(path: &str) -> Option<String> {
    parse(path)
        .ok()
        .and_then(|targets| targets.into_iter().next())
        .map(|target| target.url)
}

fn looks_like_http_script(content: &str) -> bool {
    content
        .lines()
        .take(20)
        .any(|line| line.trim_start().starts_with("###"))
}

fn parse_url_list(content: &str) -> Vec<FileTarget> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|url| FileTarget {
            method: None,
            url: url.to_owned(),
            headers: Vec::new(),
            body: String::new(),
        })
        .collect()
}

fn parse_http_script(content: &str) -> Vec<FileTarget> {
    content
        .split("###")
        .filter_map(parse_http_block)
        .collect()
}

fn parse_http_block(block: &str) -> Option<FileTarget> {
    let mut lines = block.lines().map(str::trim_end);
    let request_line = lines.find(|line| !line.trim().is_empty())?;
    let mut parts = request_line.split_whitespace();
    let first = parts.next()?;
    let (method, url) = match parts.next() {
        Some(url_part) => (Some(first.to_ascii_uppercase()), url_part.to_owned()),
        None => (None, first.to_owned()),
    };

    let mut headers = Vec::new();
    let mut body_lines = Vec::new();
    let mut in_body = false;
    for line in lines {
        if !in_body {
            if line.trim().is_empty() {
                in_body = true;
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                headers.push((key.trim().to_owned(), value.trim().to_owned()));
                continue;
            }
        }
        in_body = true;
        body_lines.push(line);
    }

    Some(FileTarget {
        method,
        url,
        headers,
        body: body_lines.join("\n").trim().to_owned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn detects_and_parses_url_list() {
        let path = write_temp(
            "strest_httpfile_urls.txt",
            "http://a.example/\nhttp://b.example/\n",
        );
        let targets = parse(path.to_string_lossy().as_ref()).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].url, "http://a.example/");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn detects_and_parses_http_script() {
        let script = "### first\nGET http://a.example/ HTTP/1.1\nX-Test: 1\n\nbody-one\n### second\nPOST http://b.example/\nContent-Type: text/plain\n\nbody-two\n";
        let path = write_temp("strest_httpfile_script.http", script);
        let targets = parse(path.to_string_lossy().as_ref()).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].method.as_deref(), Some("GET"));
        assert_eq!(targets[0].url, "http://a.example/");
        assert_eq!(targets[0].body, "body-one");
        assert_eq!(targets[1].method.as_deref(), Some("POST"));
        assert_eq!(targets[1].body, "body-two");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn empty_file_is_rejected() {
        let path = write_temp("strest_httpfile_empty.txt", "   \n");
        assert!(matches!(
            parse(path.to_string_lossy().as_ref()),
            Err(ConfigError::FileEmpty { .. })
        ));
        let _ = std::fs::remove_file(&path);
    }
}
