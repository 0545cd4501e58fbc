//! Request building and status code dispatch shared by every endpoint.

use {
    crate::{
        dto::{PendingTransaction, value_text},
        error::Error,
    },
    reqwest::{Method, StatusCode},
    serde::de::DeserializeOwned,
    std::time::Duration,
    url::Url,
};

/// Application URL used when none is configured.
pub const DEFAULT_APP_URL: &str = "https://api.xooa.com/api/v1/";

/// How long the gateway may block on a request before answering with a
/// pending result instead.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeout(Duration);

impl Timeout {
    pub const DEFAULT: Self = Self(Duration::from_millis(3000));
    /// Timeout the gateway gets for requests asking for a pending result.
    pub const PENDING: Self = Self(Duration::from_millis(1000));

    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }

    pub fn as_duration(&self) -> Duration {
        self.0
    }

    fn as_millis(&self) -> u128 {
        self.0.as_millis()
    }
}

impl Default for Timeout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl From<Duration> for Timeout {
    fn from(duration: Duration) -> Self {
        Self(duration)
    }
}

/// Whether the gateway should wait for the result or hand out a pending
/// transaction right away.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    Blocking(Timeout),
    Pending(Timeout),
}

impl Mode {
    pub fn query(&self) -> [(&'static str, String); 2] {
        let (is_async, timeout) = match self {
            Self::Blocking(timeout) => ("false", timeout),
            Self::Pending(timeout) => ("true", timeout),
        };
        [
            ("async", is_async.to_string()),
            ("timeout", timeout.as_millis().to_string()),
        ]
    }
}

/// Result of a blocking gateway call.
///
/// The gateway answers `200` with the final result when it finished within
/// the timeout and `202` with a [`PendingTransaction`] otherwise.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome<T> {
    Ready(T),
    Pending(PendingTransaction),
}

impl<T> Outcome<T> {
    pub fn ready(self) -> Option<T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Pending(_) => None,
        }
    }

    pub fn pending(&self) -> Option<&PendingTransaction> {
        match self {
            Self::Ready(_) => None,
            Self::Pending(pending) => Some(pending),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Ready(value) => Outcome::Ready(f(value)),
            Self::Pending(pending) => Outcome::Pending(pending),
        }
    }

    /// Converts into a `Result` that carries the pending transaction as the
    /// error value.
    pub fn into_result(self) -> Result<T, PendingTransaction> {
        match self {
            Self::Ready(value) => Ok(value),
            Self::Pending(pending) => Err(pending),
        }
    }
}

/// A single gateway request.
#[derive(Clone, Debug)]
pub(crate) struct Request<'a> {
    /// Stable name of the endpoint, used for logs and metrics.
    pub endpoint: &'static str,
    pub method: Method,
    pub segments: Vec<&'a str>,
    pub mode: Mode,
    pub body: Option<serde_json::Value>,
}

impl<'a> Request<'a> {
    pub fn get(endpoint: &'static str, segments: Vec<&'a str>, mode: Mode) -> Self {
        Self {
            endpoint,
            method: Method::GET,
            segments,
            mode,
            body: None,
        }
    }

    pub fn post(
        endpoint: &'static str,
        segments: Vec<&'a str>,
        mode: Mode,
        body: Option<serde_json::Value>,
    ) -> Self {
        Self {
            endpoint,
            method: Method::POST,
            segments,
            mode,
            body,
        }
    }

    pub fn delete(endpoint: &'static str, segments: Vec<&'a str>, mode: Mode) -> Self {
        Self {
            endpoint,
            method: Method::DELETE,
            segments,
            mode,
            body: None,
        }
    }

    /// Appends the percent-encoded path segments to the application URL.
    pub fn url(&self, base: &Url) -> Result<Url, Error> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidArgument("app url cannot be a base"))?
            .pop_if_empty()
            .extend(&self.segments);
        Ok(url)
    }
}

/// Rejects empty and whitespace-only identifiers.
pub(crate) fn non_blank<'a>(value: &'a str, name: &'static str) -> Result<&'a str, Error> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(name));
    }
    Ok(value)
}

/// Rejects identifiers that cannot be sent as a single path segment. Dot
/// segments would be dropped from the URL and address another resource.
pub(crate) fn path_segment<'a>(value: &'a str, name: &'static str) -> Result<&'a str, Error> {
    match non_blank(value, name)? {
        "." | ".." => Err(Error::InvalidArgument(name)),
        value => Ok(value),
    }
}

/// Maps a response of a blocking call to its outcome.
pub(crate) fn classify<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
) -> Result<Outcome<T>, Error> {
    match status {
        StatusCode::OK => parse(body).map(Outcome::Ready),
        StatusCode::ACCEPTED => parse(body).map(Outcome::Pending),
        _ => Err(api_error(status, body)),
    }
}

/// Maps a response of a call that asked for a pending result.
pub(crate) fn classify_pending(status: StatusCode, body: &str) -> Result<PendingTransaction, Error> {
    match status {
        StatusCode::ACCEPTED => parse(body),
        _ => Err(api_error(status, body)),
    }
}

fn parse<T: DeserializeOwned>(body: &str) -> Result<T, Error> {
    serde_json::from_str(body).map_err(|err| Error::Deserialize(err, body.to_string()))
}

fn api_error(status: StatusCode, body: &str) -> Error {
    let message = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(mut object)) if object.contains_key("error") => {
            value_text(object.remove("error").unwrap_or_default())
        }
        _ if body.trim().is_empty() => status.canonical_reason().unwrap_or_default().to_string(),
        _ => body.to_string(),
    };
    Error::Api { status, message }
}
