//! nginx upstream block editing
//!
//! Pure text transformations over an nginx config. Only the body of the
//! selected `upstream` block is rewritten; every other byte of the file is
//! preserved. Statements sharing a line are split onto their own lines
//! before editing, so the body always ends up one directive per line:
//!
//! ```text
//! upstream backend {
//!     server localhost:7001;
//!     server localhost:7002 down;
//! }
//! ```

use crate::domain::entities::Backend;
use crate::domain::ports::PoolError;
use crate::domain::value_objects::BackendAddress;

const UPSTREAM_KEYWORD: &[u8] = b"upstream";
const DOWN_PARAM: &str = "down";

/// Location of an upstream block inside the config text.
#[derive(Debug)]
struct UpstreamBlock<'a> {
    name: &'a str,
    /// Byte offset just past the opening brace
    body_start: usize,
    /// Byte offset of the closing brace
    body_end: usize,
    /// Whitespace preceding the `upstream` keyword on its line
    indent: &'a str,
}

/// A parsed `server <address> [params];` line.
#[derive(Debug, Clone, PartialEq)]
struct ServerLine {
    indent: String,
    address: String,
    params: Vec<String>,
    comment: Option<String>,
}

impl ServerLine {
    fn parse(line: &str) -> Option<Self> {
        let (code, comment) = match line.find('#') {
            Some(pos) => (&line[..pos], Some(line[pos..].trim_end().to_string())),
            None => (line, None),
        };
        let statement = code.trim().strip_suffix(';')?;
        let mut tokens = statement.split_whitespace();
        if tokens.next()? != "server" {
            return None;
        }
        let address = tokens.next()?.to_string();
        let params = tokens.map(str::to_string).collect();
        let indent = line[..line.len() - line.trim_start().len()].to_string();

        Some(Self {
            indent,
            address,
            params,
            comment,
        })
    }

    fn render(&self) -> String {
        let mut out = format!("{}server {}", self.indent, self.address);
        for param in &self.params {
            out.push(' ');
            out.push_str(param);
        }
        out.push(';');
        if let Some(comment) = &self.comment {
            out.push(' ');
            out.push_str(comment);
        }
        out
    }

    fn enabled(&self) -> bool {
        !self.params.iter().any(|p| p == DOWN_PARAM)
    }

    fn set_enabled(&mut self, enabled: bool) {
        if enabled {
            self.params.retain(|p| p != DOWN_PARAM);
        } else if self.enabled() {
            self.params.push(DOWN_PARAM.to_string());
        }
    }

    fn to_backend(&self) -> Backend {
        Backend::new(BackendAddress::new(self.address.clone()), self.enabled())
    }
}

/// List the servers of an upstream block in file order.
///
/// `upstream` selects a block by name; `None` picks the first block.
pub fn list_servers(text: &str, upstream: Option<&str>) -> Result<Vec<Backend>, PoolError> {
    let block = find_block(text, upstream)?;
    let body = &text[block.body_start..block.body_end];
    Ok(body
        .split('\n')
        .flat_map(split_statements)
        .filter_map(|line| ServerLine::parse(&line))
        .map(|s| s.to_backend())
        .collect())
}

/// Append an enabled server after the last existing one.
pub fn add_server(
    text: &str,
    upstream: Option<&str>,
    address: &BackendAddress,
) -> Result<String, PoolError> {
    edit_block(text, upstream, |lines, server_indent| {
        if find_server(lines, address).is_some() {
            return Err(PoolError::AlreadyExists(address.clone()));
        }
        let insert_at = lines
            .iter()
            .rposition(|l| ServerLine::parse(l).is_some())
            .map(|i| i + 1)
            .unwrap_or(lines.len() - 1);
        let line = ServerLine {
            indent: server_indent.to_string(),
            address: address.as_str().to_string(),
            params: Vec::new(),
            comment: None,
        };
        lines.insert(insert_at, line.render());
        Ok(())
    })
}

/// Drop the server line for `address`.
pub fn remove_server(
    text: &str,
    upstream: Option<&str>,
    address: &BackendAddress,
) -> Result<String, PoolError> {
    edit_block(text, upstream, |lines, _| {
        let (index, _) =
            find_server(lines, address).ok_or_else(|| PoolError::NotFound(address.clone()))?;
        lines.remove(index);
        Ok(())
    })
}

/// Add or strip the `down` parameter on the server line for `address`.
pub fn set_server_enabled(
    text: &str,
    upstream: Option<&str>,
    address: &BackendAddress,
    enabled: bool,
) -> Result<String, PoolError> {
    edit_block(text, upstream, |lines, _| {
        let (index, mut server) =
            find_server(lines, address).ok_or_else(|| PoolError::NotFound(address.clone()))?;
        server.set_enabled(enabled);
        lines[index] = server.render();
        Ok(())
    })
}

fn find_server(lines: &[String], address: &BackendAddress) -> Option<(usize, ServerLine)> {
    lines.iter().enumerate().find_map(|(i, line)| {
        ServerLine::parse(line)
            .filter(|s| s.address == address.as_str())
            .map(|s| (i, s))
    })
}

/// Apply `edit` to the lines of the block body and splice the result back.
///
/// After normalisation the first line is whatever follows `{` and the last
/// line is whatever precedes `}`, so inserts before the last line stay
/// inside the block.
fn edit_block<F>(text: &str, upstream: Option<&str>, edit: F) -> Result<String, PoolError>
where
    F: FnOnce(&mut Vec<String>, &str) -> Result<(), PoolError>,
{
    let block = find_block(text, upstream)?;
    let body = &text[block.body_start..block.body_end];

    let default_indent = format!("{}    ", block.indent);
    let raw: Vec<&str> = body.split('\n').collect();
    let raw: Vec<String> = match raw[..] {
        // `upstream x { ... }` on a single line
        [only] => {
            let mut lines = vec![String::new()];
            let inner = only.trim();
            if !inner.is_empty() {
                lines.push(format!("{}{}", default_indent, inner));
            }
            lines.push(block.indent.to_string());
            lines
        }
        _ => raw.iter().map(|l| l.to_string()).collect(),
    };
    let mut lines: Vec<String> = raw.iter().flat_map(|l| split_statements(l)).collect();

    let server_indent = lines
        .iter()
        .find_map(|l| ServerLine::parse(l))
        .map(|s| s.indent)
        .unwrap_or(default_indent);

    edit(&mut lines, &server_indent)?;

    let mut out = String::with_capacity(text.len() + 64);
    out.push_str(&text[..block.body_start]);
    out.push_str(&lines.join("\n"));
    out.push_str(&text[block.body_end..]);
    Ok(out)
}

/// Break a line holding several `;`-terminated statements into one line per
/// statement, keeping its indent. A trailing comment stays with the last one.
fn split_statements(line: &str) -> Vec<String> {
    let (code, comment) = match line.find('#') {
        Some(pos) => (&line[..pos], Some(line[pos..].trim_end())),
        None => (line, None),
    };
    let statements: Vec<&str> = code
        .split_inclusive(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if statements.len() <= 1 {
        return vec![line.to_string()];
    }

    let indent = &line[..line.len() - line.trim_start().len()];
    let last = statements.len() - 1;
    statements
        .iter()
        .enumerate()
        .map(|(i, statement)| match comment {
            Some(comment) if i == last => format!("{}{} {}", indent, statement, comment),
            _ => format!("{}{}", indent, statement),
        })
        .collect()
}

fn find_block<'a>(text: &'a str, upstream: Option<&str>) -> Result<UpstreamBlock<'a>, PoolError> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'#' => {
                i = skip_comment(bytes, i);
                continue;
            }
            b'u' if is_keyword_at(bytes, i) => {
                if let Some(block) = parse_block_header(text, i)? {
                    if upstream.map_or(true, |name| name == block.name) {
                        return Ok(block);
                    }
                    i = block.body_end + 1;
                    continue;
                }
            }
            _ => {}
        }
        i += 1;
    }

    Err(PoolError::UpstreamNotFound(
        upstream.unwrap_or("<any>").to_string(),
    ))
}

fn is_keyword_at(bytes: &[u8], i: usize) -> bool {
    if !bytes[i..].starts_with(UPSTREAM_KEYWORD) {
        return false;
    }
    let boundary_before = i == 0
        || matches!(bytes[i - 1], b';' | b'{' | b'}')
        || bytes[i - 1].is_ascii_whitespace();
    let boundary_after = bytes
        .get(i + UPSTREAM_KEYWORD.len())
        .map_or(false, |c| c.is_ascii_whitespace());
    boundary_before && boundary_after
}

fn parse_block_header(text: &str, start: usize) -> Result<Option<UpstreamBlock<'_>>, PoolError> {
    let bytes = text.as_bytes();
    let mut j = skip_whitespace(bytes, start + UPSTREAM_KEYWORD.len());

    let name_start = j;
    while j < bytes.len() && !bytes[j].is_ascii_whitespace() && bytes[j] != b'{' {
        j += 1;
    }
    let name = &text[name_start..j];
    if name.is_empty() {
        return Ok(None);
    }

    j = skip_whitespace(bytes, j);
    if bytes.get(j) != Some(&b'{') {
        return Ok(None);
    }

    let close = find_closing_brace(bytes, j).ok_or_else(|| {
        PoolError::Malformed(format!("upstream block {:?} is not terminated", name))
    })?;

    let line_start = text[..start].rfind('\n').map_or(0, |p| p + 1);
    let prefix = &text[line_start..start];
    let indent = if prefix.chars().all(char::is_whitespace) {
        prefix
    } else {
        ""
    };

    Ok(Some(UpstreamBlock {
        name,
        body_start: j + 1,
        body_end: close,
        indent,
    }))
}

fn find_closing_brace(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut k = open;
    while k < bytes.len() {
        match bytes[k] {
            b'#' => {
                k = skip_comment(bytes, k);
                continue;
            }
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(k);
                }
            }
            _ => {}
        }
        k += 1;
    }
    None
}

fn skip_comment(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i] != b'\n' {
        i += 1;
    }
    i
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
        i += 1;
    }
    i
}
