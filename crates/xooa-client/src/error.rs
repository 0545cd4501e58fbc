use {reqwest::StatusCode, thiserror::Error};

/// Failure of a gateway call.
#[derive(Error, Debug)]
pub enum Error {
    /// The call was rejected before anything was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The gateway answered with a status other than the ones the endpoint
    /// defines a result for.
    #[error("gateway responded with {status}: {message}")]
    Api { status: StatusCode, message: String },

    /// Carries the undecodable response body, which is not part of the
    /// message.
    #[error("failed to decode gateway response: {0}")]
    Deserialize(serde_json::Error, String),

    // Recovered response but failed reading its body
    #[error(transparent)]
    TextFetch(reqwest::Error),

    // Connectivity or non-response error
    #[error("failed on send")]
    Send(#[source] reqwest::Error),

    #[error("invalid gateway url")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// HTTP status of an error reported by the gateway, `None` for failures
    /// that happened before or after the exchange.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short name used as metric label.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Api { .. } => "api_error",
            Self::Deserialize(..) => "deserialize_error",
            Self::TextFetch(_) => "text_fetch_error",
            Self::Send(_) => "send_error",
            Self::Url(_) => "url_error",
        }
    }
}
