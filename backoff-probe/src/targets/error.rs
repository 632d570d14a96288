use error_backoff::{FingerprintError, TrackerError};

#[derive(Debug, thiserror::Error)]
pub(crate) enum ProbeError {
    #[error("Failed to build client for target: {0}")]
    ClientBuild(reqwest::Error),
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum RequestError {
    #[error(
        "Request failed. status: {status}, timeout: {timeout}, request: {request}, connection: {connection}"
    )]
    RequestFailure {
        status: String,
        timeout: bool,
        request: bool,
        connection: bool,
    },
}

impl From<reqwest::Error> for RequestError {
    fn from(e: reqwest::Error) -> Self {
        Self::RequestFailure {
            status: e
                .status()
                .map(|s| s.as_str().to_owned())
                .unwrap_or("None".to_owned()),
            timeout: e.is_timeout(),
            request: e.is_request(),
            connection: e.is_connect(),
        }
    }
}
