use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Deserializer};

use crate::error::GlycoError;

pub fn build_client(service: &'static str, timeout: Duration) -> Result<Client, GlycoError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(&format!("glyco-enrich/{}", env!("CARGO_PKG_VERSION")))
            .map_err(|err| GlycoError::Filesystem(err.to_string()))?,
    );
    Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .map_err(|err| GlycoError::Http {
            service,
            message: err.to_string(),
        })
}

pub fn send(
    service: &'static str,
    request: reqwest::blocking::RequestBuilder,
) -> Result<Response, GlycoError> {
    let response = request.send().map_err(|err| GlycoError::Http {
        service,
        message: err.to_string(),
    })?;
    handle_status(service, response)
}

fn handle_status(service: &'static str, response: Response) -> Result<Response, GlycoError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let message = response
        .text()
        .unwrap_or_else(|_| format!("{service} request failed"));
    Err(GlycoError::Status {
        service,
        status,
        message: truncate(&message, 200),
    })
}

pub fn decode_err(service: &'static str, err: impl std::fmt::Display) -> GlycoError {
    GlycoError::Decode {
        service,
        message: err.to_string(),
    }
}

/// Treats an explicit JSON `null` like a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn truncate(message: &str, limit: usize) -> String {
    match message.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &message[..idx]),
        None => message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_long_bodies() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdef", 3), "abc...");
    }
}
