//! A client for the target API that records every request it makes.

use std::time::{Duration, Instant};

use bytes::Bytes;
use reqwest::header::{AUTHORIZATION, HeaderValue};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::metrics::{Recorder, RequestKey};

const USER_AGENT: &str = concat!("loadtest/", env!("CARGO_PKG_VERSION"));

/// Client of the target API, as seen by a single virtual user.
///
/// Cloning is cheap: clones share the connection pool and the [`Recorder`], but each clone carries
/// its own bearer token, see [`ApiClient::with_bearer_token`].
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    host: String,
    authorization: Option<HeaderValue>,
    recorder: Recorder,
}

impl ApiClient {
    /// Creates a client for the API at `host`, with the given timeout applied to every request.
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        url::Url::parse(host).map_err(|source| Error::InvalidHost {
            host: host.to_owned(),
            source,
        })?;

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            host: host.trim_end_matches('/').to_owned(),
            authorization: None,
            recorder: Recorder::default(),
        })
    }

    /// Returns a client that sends `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(self, token: &str) -> Result<Self> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))?;
        value.set_sensitive(true);

        Ok(Self {
            authorization: Some(value),
            ..self
        })
    }

    /// The `Authorization` header sent with every request, if any.
    pub fn authorization(&self) -> Option<&HeaderValue> {
        self.authorization.as_ref()
    }

    /// The recorder collecting statistics of all requests made through this client.
    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Issues a `GET` request, recorded under its path.
    pub async fn get(&self, path: &str) -> ApiResponse {
        self.send(Method::GET, path, path, None::<&()>).await
    }

    /// Issues a `GET` request, recorded under `name`.
    pub async fn get_named(&self, path: &str, name: &str) -> ApiResponse {
        self.send(Method::GET, path, name, None::<&()>).await
    }

    /// Issues a `POST` request with a JSON body, recorded under its path.
    pub async fn post<T: Serialize + ?Sized>(&self, path: &str, body: &T) -> ApiResponse {
        self.send(Method::POST, path, path, Some(body)).await
    }

    /// Issues a `POST` request with a JSON body, recorded under `name`.
    pub async fn post_named<T: Serialize + ?Sized>(
        &self,
        path: &str,
        name: &str,
        body: &T,
    ) -> ApiResponse {
        self.send(Method::POST, path, name, Some(body)).await
    }

    async fn send<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        name: &str,
        body: Option<&T>,
    ) -> ApiResponse {
        let key = RequestKey::new(&method, name);
        let url = format!("{}{path}", self.host);

        let mut request = self.client.request(method, url);
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization.clone());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let start = Instant::now();
        let result = match request.send().await {
            Ok(response) => {
                let status = response.status();
                response.bytes().await.map(|body| (status, body))
            }
            Err(err) => Err(err),
        };
        let elapsed = start.elapsed();

        match result {
            Ok((status, body)) => {
                tracing::debug!(request = %key, %status, ?elapsed);
                if status.is_success() {
                    self.recorder.success(key.clone(), elapsed);
                } else {
                    self.recorder.failure(key.clone(), status.to_string());
                }
                ApiResponse {
                    key,
                    outcome: Outcome::Received(status, body),
                }
            }
            Err(err) => {
                tracing::debug!(request = %key, error = %err, ?elapsed);
                let message = err.to_string();
                self.recorder.failure(key.clone(), message.clone());
                ApiResponse {
                    key,
                    outcome: Outcome::Failed(message),
                }
            }
        }
    }
}

#[derive(Debug)]
enum Outcome {
    Received(StatusCode, Bytes),
    Failed(String),
}

/// The response to a request made by an [`ApiClient`].
///
/// Failed requests are already recorded when this is returned. Callers that do not use the body
/// can drop it.
#[derive(Debug)]
pub struct ApiResponse {
    key: RequestKey,
    outcome: Outcome,
}

impl ApiResponse {
    /// The status code, if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self.outcome {
            Outcome::Received(status, _) => Some(status),
            Outcome::Failed(_) => None,
        }
    }

    /// Whether a response with a `2xx` status was received.
    pub fn is_success(&self) -> bool {
        self.status().is_some_and(|status| status.is_success())
    }

    /// Decodes the JSON body of a successful response.
    ///
    /// Fails if the request failed, the status is not `2xx`, or the body is not a `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        match &self.outcome {
            Outcome::Received(status, body) if status.is_success() => serde_json::from_slice(body)
                .map_err(|source| Error::Json {
                    request: self.key.to_string(),
                    source,
                }),
            Outcome::Received(status, _) => Err(Error::Status {
                request: self.key.to_string(),
                status: *status,
            }),
            Outcome::Failed(message) => Err(Error::Transport {
                request: self.key.to_string(),
                message: message.clone(),
            }),
        }
    }
}
