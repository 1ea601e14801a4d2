//! Bridge between tiny_http and the manager.

use std::io::Cursor;

use anyhow::Result;
use tiny_http::{Header, Method, Request, Response, StatusCode};

use crate::manager::{BufferedResponse, Manager, ManagerError, RequestDescriptor};
use crate::utils::mime::types::PLAIN;
use crate::{debug, log};

/// Serve one request through the manager.
pub fn respond(request: Request, manager: &Manager, prefix_matches: bool) -> Result<()> {
    // tiny_http drops the body of HEAD responses itself.
    if !matches!(request.method(), Method::Get | Method::Head) {
        return send_text(request, 405, "method not allowed");
    }
    if !prefix_matches {
        return send_text(request, 404, "not found");
    }

    let descriptor = RequestDescriptor::parse(request.url())
        .with_accepts_gzip(accepts_gzip(&request));

    let mut buffered = BufferedResponse::new();
    match manager.process(&descriptor, &mut buffered) {
        Ok(()) => {
            if let Some(etag) = buffered.header("ETag")
                && header_value(&request, "If-None-Match").is_some_and(|v| v == etag)
            {
                return send_not_modified(request, etag);
            }
            send_buffered(request, buffered)
        }
        Err(err) => {
            let status = err.status_code();
            log_failure(request.url(), &err);
            send_text(request, status, &err.to_string())
        }
    }
}

/// Plain-text 503 for requests arriving during shutdown.
pub fn respond_unavailable(request: Request) -> Result<()> {
    send_text(request, 503, "server is shutting down")
}

fn log_failure(url: &str, err: &ManagerError) {
    match err.status_code() {
        404 | 403 => debug!("serve"; "{} {}", err.status_code(), url),
        status => log!("error"; "{} {}: {}", status, url, err.describe()),
    }
}

fn accepts_gzip(request: &Request) -> bool {
    header_value(request, "Accept-Encoding").is_some_and(|value| {
        value
            .split(',')
            .filter_map(|part| part.split(';').next())
            .any(|coding| coding.trim().eq_ignore_ascii_case("gzip"))
    })
}

fn header_value<'a>(request: &'a Request, name: &str) -> Option<&'a str> {
    request
        .headers()
        .iter()
        .find(|h| h.field.as_str().as_str().eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

fn send_buffered(request: Request, buffered: BufferedResponse) -> Result<()> {
    let (content_type, headers, body) = buffered.into_parts();

    let mut response_headers: Vec<Header> = headers
        .iter()
        .filter_map(|(name, value)| Header::from_bytes(name.as_bytes(), value.as_bytes()).ok())
        .collect();
    if let Some(content_type) = content_type
        && let Ok(header) = Header::from_bytes("Content-Type", content_type.as_bytes())
    {
        response_headers.push(header);
    }

    let length = body.len();
    let response = Response::new(
        StatusCode(200),
        response_headers,
        Cursor::new(body),
        Some(length),
        None,
    );
    request.respond(response)?;
    Ok(())
}

fn send_not_modified(request: Request, etag: &str) -> Result<()> {
    let mut response = Response::empty(StatusCode(304));
    if let Ok(header) = Header::from_bytes("ETag", etag.as_bytes()) {
        response.add_header(header);
    }
    request.respond(response)?;
    Ok(())
}

fn send_text(request: Request, status: u16, body: &str) -> Result<()> {
    let mut response = Response::from_string(body).with_status_code(status);
    if let Ok(header) = Header::from_bytes("Content-Type", PLAIN) {
        response.add_header(header);
    }
    request.respond(response)?;
    Ok(())
}
