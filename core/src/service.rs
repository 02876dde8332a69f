//! Verb-oriented entry points tying the pieces together.
//!
//! # Design
//! Every operation follows the same template: connectivity check, build,
//! execute, decode. Failures at any stage come back as `ApiError` in the same
//! `Result` as success. There are no retries, no caching, and the model's
//! patch is never reset implicitly.

use std::sync::Arc;
use std::time::Duration;

use crate::builder::RequestBuilder;
use crate::config::ServiceConfig;
use crate::credentials::{CredentialStore, MemoryStore, SecureStore};
use crate::decoder::{decode_list, decode_object};
use crate::error::ApiError;
use crate::http::HttpResponse;
use crate::model::{ParameterEncoding, RequestModel};
use crate::transport::{Connectivity, ReqwestTransport, TcpProbe, Transport};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-call overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallOptions {
    /// Overrides `ServiceConfig::auto_parse` for this call.
    pub auto_parse: Option<bool>,
}

impl CallOptions {
    /// Hand back the raw response instead of decoding it.
    pub fn raw() -> Self {
        Self {
            auto_parse: Some(false),
        }
    }

    pub fn parsed() -> Self {
        Self {
            auto_parse: Some(true),
        }
    }
}

/// Outcome of a successful exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    /// Decoded from a 200/201 response.
    Parsed(T),
    /// Auto-parse was off; the response is returned whatever its status.
    Raw(HttpResponse),
}

impl<T> Reply<T> {
    pub fn parsed(self) -> Option<T> {
        match self {
            Reply::Parsed(value) => Some(value),
            Reply::Raw(_) => None,
        }
    }

    pub fn raw(self) -> Option<HttpResponse> {
        match self {
            Reply::Parsed(_) => None,
            Reply::Raw(response) => Some(response),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Auth {
    /// Attach the stored token when valid.
    Stored,
    /// Login/registration: no token, parameters in a form body.
    Anonymous,
}

/// Issues model requests over a `Transport` and decodes the replies.
pub struct WebService {
    builder: RequestBuilder,
    credentials: CredentialStore,
    transport: Arc<dyn Transport>,
    connectivity: Arc<dyn Connectivity>,
}

impl WebService {
    pub fn new(
        config: ServiceConfig,
        store: Arc<dyn SecureStore>,
        transport: Arc<dyn Transport>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        let credentials =
            CredentialStore::new(store, &config.keychain_identifier, &config.date_format);
        let builder = RequestBuilder::new(Arc::new(config), credentials.clone());
        Self {
            builder,
            credentials,
            transport,
            connectivity,
        }
    }

    /// reqwest transport, in-memory credentials, TCP probe against the base
    /// URL's host.
    pub fn with_reqwest(config: ServiceConfig) -> Result<Self, ApiError> {
        let transport = ReqwestTransport::new()?;
        let probe = TcpProbe::for_base_url(&config.base_url, PROBE_TIMEOUT)?;
        Ok(Self::new(
            config,
            Arc::new(MemoryStore::new()),
            Arc::new(transport),
            Arc::new(probe),
        ))
    }

    pub fn config(&self) -> &ServiceConfig {
        self.builder.config()
    }

    pub fn credentials(&self) -> &CredentialStore {
        &self.credentials
    }

    pub fn request_builder(&self) -> &RequestBuilder {
        &self.builder
    }

    pub async fn get_object<M: RequestModel>(
        &self,
        model: &M,
        options: CallOptions,
    ) -> Result<Reply<M>, ApiError> {
        self.object_call(model, options, Auth::Stored).await
    }

    pub async fn get_objects<M: RequestModel>(
        &self,
        model: &M,
        options: CallOptions,
    ) -> Result<Reply<Vec<M>>, ApiError> {
        let response = self.dispatch(model, Auth::Stored).await?;
        if !self.auto_parse(options) {
            return Ok(Reply::Raw(response));
        }
        decode_list(&response).map(Reply::Parsed)
    }

    pub async fn post_object<M: RequestModel>(
        &self,
        model: &M,
        options: CallOptions,
    ) -> Result<Reply<M>, ApiError> {
        self.object_call(model, options, Auth::Stored).await
    }

    pub async fn delete_object<M: RequestModel>(
        &self,
        model: &M,
        options: CallOptions,
    ) -> Result<Reply<M>, ApiError> {
        self.object_call(model, options, Auth::Stored).await
    }

    /// Log in. A parsed reply carrying `auth_token()` is persisted.
    pub async fn authenticate_user<M: RequestModel>(
        &self,
        user: &M,
        options: CallOptions,
    ) -> Result<Reply<M>, ApiError> {
        let reply = self.object_call(user, options, Auth::Anonymous).await?;
        self.remember_token(&reply);
        Ok(reply)
    }

    /// Sign up. A parsed reply carrying `auth_token()` is persisted.
    pub async fn register_user<M: RequestModel>(
        &self,
        user: &M,
        options: CallOptions,
    ) -> Result<Reply<M>, ApiError> {
        let reply = self.object_call(user, options, Auth::Anonymous).await?;
        self.remember_token(&reply);
        Ok(reply)
    }

    pub fn set_auth_token(&self, token: Option<&str>, expiration: Option<&str>) {
        self.credentials.set_auth_token(token, expiration);
    }

    pub fn user_auth_token_exists(&self) -> bool {
        self.credentials.token_exists()
    }

    pub fn user_auth_token_expired(&self) -> bool {
        self.credentials.token_expired()
    }

    pub fn clear_user_auth_token(&self) {
        self.credentials.clear();
    }

    async fn object_call<M: RequestModel>(
        &self,
        model: &M,
        options: CallOptions,
        auth: Auth,
    ) -> Result<Reply<M>, ApiError> {
        let response = self.dispatch(model, auth).await?;
        if !self.auto_parse(options) {
            return Ok(Reply::Raw(response));
        }
        decode_object(&response).map(Reply::Parsed)
    }

    async fn dispatch<M: RequestModel>(
        &self,
        model: &M,
        auth: Auth,
    ) -> Result<HttpResponse, ApiError> {
        if !self.connectivity.is_reachable().await {
            tracing::warn!(path = %model.path(), "no network connection, request not sent");
            return Err(ApiError::no_connection());
        }

        let request = match auth {
            Auth::Stored => self.builder.build(model)?,
            Auth::Anonymous => self
                .builder
                .build_unauthenticated(model, ParameterEncoding::FormBody)?,
        };

        tracing::debug!(method = %request.method, url = %request.url, ?auth, "dispatching");
        Ok(self.transport.execute(request).await?)
    }

    fn auto_parse(&self, options: CallOptions) -> bool {
        options.auto_parse.unwrap_or(self.config().auto_parse)
    }

    fn remember_token<M: RequestModel>(&self, reply: &Reply<M>) {
        if let Reply::Parsed(user) = reply {
            if let Some(token) = user.auth_token() {
                tracing::debug!("storing auth token from login response");
                self.credentials
                    .set_auth_token(Some(&token.token), token.expiration.as_deref());
            }
        }
    }
}

impl std::fmt::Debug for WebService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebService")
            .field("builder", &self.builder)
            .finish_non_exhaustive()
    }
}
