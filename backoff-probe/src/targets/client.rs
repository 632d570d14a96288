use std::time::Duration;

use log::trace;
use reqwest::{Client, StatusCode};

use crate::{
    config::TargetConfig,
    targets::error::{ProbeError, RequestError},
};

pub(crate) struct ProbeClient {
    client: Client,
    target: String,
}

impl ProbeClient {
    pub(crate) fn new(target_config: &TargetConfig) -> Result<Self, ProbeError> {
        trace!("Creating client with target: {}", target_config.target);

        let client = Client::builder()
            .timeout(target_config.client_timeout())
            .tcp_keepalive(Some(Duration::from_millis(10000)))
            .build()
            .map_err(ProbeError::ClientBuild)?;

        Ok(Self {
            client,
            target: target_config.target.clone(),
        })
    }

    pub(crate) fn target(&self) -> &str {
        &self.target
    }

    /// Any transport error or non-success status counts as a failure.
    pub(crate) async fn get(&self) -> Result<StatusCode, RequestError> {
        let response = self
            .client
            .get(self.target.as_str())
            .send()
            .await?
            .error_for_status()?;

        let status = response.status();
        response.bytes().await?;

        trace!("Received response code: {status}");

        Ok(status)
    }
}
