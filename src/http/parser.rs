use crate::http::headers::Headers;
use crate::http::request::{Method, Request};
use crate::http::response::ResponseHead;

/// Upper bound on a request or response head, terminator included.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    InvalidRequest,
    InvalidMethod,
    InvalidVersion,
    InvalidHeader,
    InvalidContentLength,
    InvalidStatus,
    HeadTooLarge,
    Incomplete,
}

/// Parses a request head from the start of `buf`.
///
/// Returns the request and the number of bytes the head occupied, blank line
/// included. Any body bytes that follow are left for the caller to stream.
pub fn parse_http_request(buf: &[u8]) -> Result<(Request, usize), ParseError> {
    let (head, consumed) = split_head(buf)?;
    let mut lines = head.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let path = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;

    if parts.next().is_some() {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_str(method_str).ok_or(ParseError::InvalidMethod)?;
    check_version(version)?;

    let headers = parse_header_lines(lines)?;

    let request = Request {
        method,
        path: path.to_string(),
        version: version.to_string(),
        headers,
    };

    Ok((request, consumed))
}

/// Parses a response head (status line + headers) from the start of `buf`.
pub fn parse_http_response_head(buf: &[u8]) -> Result<(ResponseHead, usize), ParseError> {
    let (head, consumed) = split_head(buf)?;
    let mut lines = head.split("\r\n");

    let status_line = lines.next().ok_or(ParseError::InvalidStatus)?;
    let mut parts = status_line.splitn(3, ' ');

    let version = parts.next().ok_or(ParseError::InvalidStatus)?;
    check_version(version)?;

    let code = parts.next().ok_or(ParseError::InvalidStatus)?;
    if code.len() != 3 {
        return Err(ParseError::InvalidStatus);
    }
    let status: u16 = code.parse().map_err(|_| ParseError::InvalidStatus)?;
    if !(100..=999).contains(&status) {
        return Err(ParseError::InvalidStatus);
    }

    let reason = parts.next().unwrap_or("").to_string();
    let headers = parse_header_lines(lines)?;

    let head = ResponseHead {
        version: version.to_string(),
        status,
        reason,
        headers,
    };

    Ok((head, consumed))
}

fn split_head(buf: &[u8]) -> Result<(&str, usize), ParseError> {
    let headers_end = match find_headers_end(buf) {
        Some(end) => end,
        None if buf.len() >= MAX_HEAD_SIZE => return Err(ParseError::HeadTooLarge),
        None => return Err(ParseError::Incomplete),
    };

    if headers_end + 4 > MAX_HEAD_SIZE {
        return Err(ParseError::HeadTooLarge);
    }

    let head = std::str::from_utf8(&buf[..headers_end]).map_err(|_| ParseError::InvalidRequest)?;
    Ok((head, headers_end + 4))
}

fn check_version(version: &str) -> Result<(), ParseError> {
    match version {
        "HTTP/1.1" | "HTTP/1.0" => Ok(()),
        _ => Err(ParseError::InvalidVersion),
    }
}

fn parse_header_lines<'a>(lines: impl Iterator<Item = &'a str>) -> Result<Headers, ParseError> {
    let mut headers = Headers::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        // Folded continuation lines are obsolete and refused.
        if line.starts_with(' ') || line.starts_with('\t') {
            return Err(ParseError::InvalidHeader);
        }

        let (key, value) = line.split_once(':').ok_or(ParseError::InvalidHeader)?;
        let key = key.trim();
        if key.is_empty() || key.contains(char::is_whitespace) {
            return Err(ParseError::InvalidHeader);
        }

        headers.append(key, value.trim());
    }

    // Every Content-Length value, repeated or comma-listed, must agree.
    let mut length: Option<u64> = None;
    for value in headers
        .get_all("Content-Length")
        .flat_map(|v| v.split(','))
    {
        let n = value
            .trim()
            .parse::<u64>()
            .map_err(|_| ParseError::InvalidContentLength)?;
        match length {
            Some(seen) if seen != n => return Err(ParseError::InvalidContentLength),
            _ => length = Some(n),
        }
    }

    Ok(headers)
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}
