//! HTTP boundary to the elevator backend.

use async_trait::async_trait;
use futures::{stream::BoxStream, StreamExt};
use reqwest::{header, Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    error::ApiError,
    protocol::{Configuration, FloorCallRequest, FloorSelectionSubmission, RiderServiceRequest},
};
use url::Url;

use crate::error::ConsoleError;

pub type PushByteStream = BoxStream<'static, Result<Vec<u8>, ConsoleError>>;

#[async_trait]
pub trait BackendApi: Send + Sync {
    async fn fetch_configuration(&self) -> Result<Configuration, ConsoleError>;
    async fn submit_call(
        &self,
        request: &FloorCallRequest,
    ) -> Result<RiderServiceRequest, ConsoleError>;
    async fn submit_floors(
        &self,
        submission: &FloorSelectionSubmission,
    ) -> Result<FloorSelectionSubmission, ConsoleError>;
    /// Opens the long-lived server-sent-events stream and yields raw body
    /// chunks as they arrive.
    async fn open_push_stream(&self) -> Result<PushByteStream, ConsoleError>;
}

pub struct HttpBackend {
    http: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(server_url: &str) -> Result<Self, ConsoleError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, ConsoleError> {
        Ok(Self {
            http,
            base_url: parse_base_url(server_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ConsoleError> {
        self.base_url
            .join(path)
            .map_err(|source| ConsoleError::InvalidServerUrl {
                url: format!("{}{path}", self.base_url),
                source,
            })
    }

    /// Appends path segments, percent-encoding each one. Backend ids are
    /// opaque and may contain characters that are not path-safe.
    fn endpoint_segments(&self, segments: &[&str]) -> Result<Url, ConsoleError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ConsoleError::InvalidServerUrl {
                url: self.base_url.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn post_json<B, R>(&self, url: Url, body: &B) -> Result<R, ConsoleError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let res = self
            .http
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|source| ConsoleError::Transport {
                endpoint: url.to_string(),
                source,
            })?;
        decode_json(url.as_str(), res).await
    }
}

#[async_trait]
impl BackendApi for HttpBackend {
    async fn fetch_configuration(&self) -> Result<Configuration, ConsoleError> {
        let url = self.endpoint("configuration")?;
        let res = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| ConsoleError::Transport {
                endpoint: url.to_string(),
                source,
            })?;
        decode_json(url.as_str(), res).await
    }

    async fn submit_call(
        &self,
        request: &FloorCallRequest,
    ) -> Result<RiderServiceRequest, ConsoleError> {
        let url = self.endpoint("service")?;
        self.post_json(url, request).await
    }

    async fn submit_floors(
        &self,
        submission: &FloorSelectionSubmission,
    ) -> Result<FloorSelectionSubmission, ConsoleError> {
        let id = submission.rider_service_request.id.as_str();
        let url = self.endpoint_segments(&["service", id, "floors"])?;
        self.post_json(url, submission).await
    }

    async fn open_push_stream(&self) -> Result<PushByteStream, ConsoleError> {
        let url = self.endpoint("service/events")?;
        let endpoint = url.to_string();
        let res = self
            .http
            .get(url)
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|source| ConsoleError::Transport {
                endpoint: endpoint.clone(),
                source,
            })?;
        let res = ensure_success(&endpoint, res).await?;

        let stream = res.bytes_stream().map(move |chunk| {
            chunk
                .map(|bytes| bytes.to_vec())
                .map_err(|source| ConsoleError::Transport {
                    endpoint: endpoint.clone(),
                    source,
                })
        });
        Ok(stream.boxed())
    }
}

/// Accepts `host:port` shorthand and makes sure relative joins keep any path
/// prefix the backend is mounted under.
pub fn parse_base_url(server_url: &str) -> Result<Url, ConsoleError> {
    let trimmed = server_url.trim();
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    let with_slash = if with_scheme.ends_with('/') {
        with_scheme
    } else {
        format!("{with_scheme}/")
    };
    Url::parse(&with_slash).map_err(|source| ConsoleError::InvalidServerUrl {
        url: server_url.to_string(),
        source,
    })
}

async fn ensure_success(endpoint: &str, res: Response) -> Result<Response, ConsoleError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let detail = res
        .json::<ApiError>()
        .await
        .ok()
        .and_then(|body| body.summary());
    Err(ConsoleError::UnexpectedStatus {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        detail,
    })
}

async fn decode_json<R: DeserializeOwned>(endpoint: &str, res: Response) -> Result<R, ConsoleError> {
    let res = ensure_success(endpoint, res).await?;
    res.json::<R>()
        .await
        .map_err(|source| ConsoleError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
