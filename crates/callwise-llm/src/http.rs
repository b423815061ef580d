//! JSON-over-HTTPS plumbing shared by the providers

use crate::error::{Error, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

pub(crate) fn client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| Error::Network(e.to_string()))
}

/// Send `body`, hand non-2xx answers to `classify`, decode the rest
pub(crate) async fn post_json<B, T>(
    request: RequestBuilder,
    body: &B,
    timeout: Duration,
    classify: impl FnOnce(u16, &str) -> Error,
) -> Result<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = request.json(body).send().await.map_err(|e| {
        if e.is_timeout() {
            Error::Timeout(timeout.as_millis() as u64)
        } else {
            Error::Network(e.to_string())
        }
    })?;

    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    if !status.is_success() {
        return Err(classify(status.as_u16(), &text));
    }
    serde_json::from_str(&text).map_err(|e| Error::InvalidResponse(e.to_string()))
}
