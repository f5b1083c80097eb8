//! State of a single virtual user.

use secrecy::ExposeSecret;
use uuid::Uuid;

use crate::api::{self, LoginRequest, LoginResponse};
use crate::config::Credentials;
use crate::error::Result;
use crate::http::ApiClient;

/// Sequence numbers of the entities a virtual user created so far.
///
/// Each counter only ever increases, so that names derived from it never repeat within one
/// virtual user. Counters start at zero for every new [`Session`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Counters {
    /// Users created from the admin panel.
    pub users: u64,
    /// Companies created.
    pub companies: u64,
    /// Projects created.
    pub projects: u64,
}

/// A logged-in virtual user.
#[derive(Debug)]
pub struct Session {
    pub(crate) api: ApiClient,
    user_id: String,
    pub(crate) counters: Counters,
}

impl Session {
    /// Logs in with credentials from the environment.
    ///
    /// See [`Credentials::from_env`] and [`Session::bootstrap`].
    pub async fn start(client: ApiClient) -> Result<Self> {
        let credentials = Credentials::from_env()?;
        Self::bootstrap(client, &credentials).await
    }

    /// Logs in with the given credentials and attaches the returned bearer token to all further
    /// requests of this session.
    ///
    /// There is no retry: if the login request fails, the virtual user cannot proceed.
    pub async fn bootstrap(client: ApiClient, credentials: &Credentials) -> Result<Self> {
        let login = LoginRequest {
            username: &credentials.username,
            password: credentials.password.expose_secret(),
        };
        let LoginResponse { token } = client.post(api::LOGIN, &login).await.json()?;

        let user_id = Uuid::new_v4().to_string();
        tracing::info!(%user_id, "logged in");

        Ok(Self {
            api: client.with_bearer_token(&token)?,
            user_id,
            counters: Counters::default(),
        })
    }

    /// The client used for all requests of this session.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Random identifier of this virtual user, used to namespace the entities it creates.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The entities created so far.
    pub fn counters(&self) -> Counters {
        self.counters
    }
}
