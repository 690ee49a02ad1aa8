/// Refreshable login session
///
/// Holds the access/refresh token pair and the owning DID, persisted to the
/// key-value store under the same keys every time they change. When a call
/// fails with an expired token, exactly one refresh runs; every request that
/// hit the expiry meanwhile awaits that same refresh and then replays once.
use crate::{
    api::{methods, ApiClient, Params, PostOutput, Xrpc},
    error::{ClientError, ClientResult, RefreshError},
    store::KvStore,
};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const ACCESS_TOKEN_KEY: &str = "accessToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const USER_DID_KEY: &str = "userDID";

/// Tokens and identity returned by createSession/refreshSession
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub access_jwt: String,
    pub refresh_jwt: String,
    pub did: String,
    #[serde(default)]
    pub handle: Option<String>,
}

type RefreshTask = Shared<BoxFuture<'static, Result<Session, RefreshError>>>;

/// Where the session currently stands
#[derive(Clone)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(Session),
    /// A refresh is in flight; waiters share this task
    Refreshing(RefreshTask),
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unauthenticated => f.write_str("Unauthenticated"),
            SessionState::Authenticated(s) => f
                .debug_struct("Authenticated")
                .field("did", &s.did)
                .finish_non_exhaustive(),
            SessionState::Refreshing(_) => f.write_str("Refreshing"),
        }
    }
}

/// Owns the session state machine
pub struct SessionManager {
    api: ApiClient,
    store: Arc<dyn KvStore>,
    state: Mutex<SessionState>,
}

impl SessionManager {
    pub fn new(api: ApiClient, store: Arc<dyn KvStore>) -> Self {
        Self {
            api,
            store,
            state: Mutex::new(SessionState::Unauthenticated),
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub async fn state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    /// Load a previously saved session from the store
    pub async fn restore(&self) -> ClientResult<Option<Session>> {
        let access = self.store.get(ACCESS_TOKEN_KEY).await?;
        let refresh = self.store.get(REFRESH_TOKEN_KEY).await?;
        let did = self.store.get(USER_DID_KEY).await?;

        let session = match (access, refresh, did) {
            (Some(access_jwt), Some(refresh_jwt), Some(did))
                if !access_jwt.is_empty() && !refresh_jwt.is_empty() && !did.is_empty() =>
            {
                Session {
                    access_jwt,
                    refresh_jwt,
                    did,
                    handle: None,
                }
            }
            _ => return Ok(None),
        };

        debug!("Restored session for {}", session.did);
        *self.state.lock().await = SessionState::Authenticated(session.clone());
        Ok(Some(session))
    }

    /// Log in with a handle/email and an (app) password
    pub async fn login(&self, identifier: &str, password: &str) -> ClientResult<Session> {
        let body = json!({ "identifier": identifier, "password": password });
        let output = self
            .api
            .post_with_auth(methods::CREATE_SESSION, Some(&body), None)
            .await?;

        let session = session_from_output(output)?;
        persist(self.store.as_ref(), &session).await?;

        info!("Logged in as {}", session.did);
        *self.state.lock().await = SessionState::Authenticated(session.clone());
        Ok(session)
    }

    /// Drop the session and clear the stored tokens
    pub async fn logout(&self) -> ClientResult<()> {
        *self.state.lock().await = SessionState::Unauthenticated;
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_DID_KEY] {
            self.store.set(key, "").await?;
        }
        Ok(())
    }

    /// Current access token, waiting out an in-flight refresh
    pub async fn access_token(&self) -> ClientResult<String> {
        let state = self.state.lock().await.clone();
        match state {
            SessionState::Unauthenticated => Err(ClientError::NotAuthenticated),
            SessionState::Authenticated(session) => Ok(session.access_jwt),
            SessionState::Refreshing(task) => {
                let session = self.settle(&task, task.clone().await).await?;
                Ok(session.access_jwt)
            }
        }
    }

    /// Replace `stale_access` with a fresh token.
    ///
    /// Returns the current session without a network call if the token has
    /// already been replaced, and joins the in-flight refresh if there is one.
    pub async fn refresh(&self, stale_access: &str) -> ClientResult<Session> {
        let task = {
            let mut state = self.state.lock().await;
            match &*state {
                SessionState::Unauthenticated => return Err(ClientError::NotAuthenticated),
                SessionState::Authenticated(session) if session.access_jwt != stale_access => {
                    return Ok(session.clone());
                }
                SessionState::Authenticated(session) => {
                    info!("Refreshing access token");
                    let task = self.start_refresh(session.refresh_jwt.clone());
                    *state = SessionState::Refreshing(task.clone());
                    task
                }
                SessionState::Refreshing(task) => task.clone(),
            }
        };

        let result = task.clone().await;
        self.settle(&task, result).await
    }

    fn start_refresh(&self, refresh_jwt: String) -> RefreshTask {
        let api = self.api.clone();
        let store = Arc::clone(&self.store);

        async move {
            let result: ClientResult<Session> = async {
                let output = api
                    .post_with_auth(methods::REFRESH_SESSION, None, Some(&refresh_jwt))
                    .await?;
                let session = session_from_output(output)?;
                persist(store.as_ref(), &session).await?;
                Ok(session)
            }
            .await;

            result.map_err(|e| {
                warn!("Session refresh failed: {}", e);
                RefreshError::from(&e)
            })
        }
        .boxed()
        .shared()
    }

    /// Move out of `Refreshing` once, whichever waiter of `task` gets here
    /// first. A newer refresh that has since replaced `task` is left alone.
    async fn settle(
        &self,
        task: &RefreshTask,
        result: Result<Session, RefreshError>,
    ) -> ClientResult<Session> {
        let mut state = self.state.lock().await;
        if matches!(&*state, SessionState::Refreshing(current) if Shared::ptr_eq(current, task)) {
            *state = match &result {
                Ok(session) => SessionState::Authenticated(session.clone()),
                Err(_) => SessionState::Unauthenticated,
            };
        }
        Ok(result?)
    }
}

fn session_from_output(output: PostOutput) -> ClientResult<Session> {
    let value = output.into_json().ok_or(ClientError::MissingField("accessJwt"))?;
    Ok(serde_json::from_value(value)?)
}

async fn persist(store: &dyn KvStore, session: &Session) -> ClientResult<()> {
    store.set(ACCESS_TOKEN_KEY, &session.access_jwt).await?;
    store.set(REFRESH_TOKEN_KEY, &session.refresh_jwt).await?;
    store.set(USER_DID_KEY, &session.did).await?;
    Ok(())
}

/// XRPC client that authorizes every call with the session's access token
#[derive(Clone)]
pub struct AuthenticatedClient {
    session: Arc<SessionManager>,
}

impl AuthenticatedClient {
    pub fn new(session: Arc<SessionManager>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }
}

#[async_trait]
impl Xrpc for AuthenticatedClient {
    async fn get(&self, method: &str, params: &Params) -> ClientResult<Option<Value>> {
        let api = self.session.api();
        let token = self.session.access_token().await?;

        match api.get_with_auth(method, params, Some(&token)).await {
            Err(ClientError::Api(err)) if err.is_expired_token() => {
                let session = self.session.refresh(&token).await?;
                api.get_with_auth(method, params, Some(&session.access_jwt))
                    .await
            }
            other => other,
        }
    }

    async fn post(&self, method: &str, data: Option<&Value>) -> ClientResult<PostOutput> {
        let api = self.session.api();
        let token = self.session.access_token().await?;

        match api.post_with_auth(method, data, Some(&token)).await {
            Err(ClientError::Api(err)) if err.is_expired_token() => {
                let session = self.session.refresh(&token).await?;
                api.post_with_auth(method, data, Some(&session.access_jwt))
                    .await
            }
            other => other,
        }
    }
}
