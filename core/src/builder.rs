//! Turns a `RequestModel` into a fully formed `HttpRequest`.
//!
//! # Design
//! The builder performs no I/O. It reads the shared `ServiceConfig` and the
//! credential store, so building the same unmodified model twice yields
//! identical requests.
//!
//! Order of assembly:
//! 1. base URL + model path (the base's path only; its query is kept)
//! 2. method
//! 3. auth header, when a non-expired token is stored
//! 4. global headers, then model headers (appended, never replaced)
//! 5. global query parameters
//! 6. patch body, or else body parameters in the chosen encoding

use std::sync::Arc;

use reqwest::header::{HeaderName, HeaderValue};
use serde_json::{Map, Value};
use url::form_urlencoded;
use url::Url;

use crate::config::ServiceConfig;
use crate::credentials::CredentialStore;
use crate::error::BuildError;
use crate::http::HttpRequest;
use crate::model::{ParameterEncoding, RequestModel};

const CONTENT_TYPE: &str = "Content-Type";
const APPLICATION_JSON: &str = "application/json";
const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Builds `HttpRequest`s from models using the shared config and credentials.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    config: Arc<ServiceConfig>,
    credentials: CredentialStore,
}

impl RequestBuilder {
    pub fn new(config: Arc<ServiceConfig>, credentials: CredentialStore) -> Self {
        Self {
            config,
            credentials,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn build<M: RequestModel>(&self, model: &M) -> Result<HttpRequest, BuildError> {
        let token = self.credentials.valid_token();
        self.assemble(model, token, None)
    }

    /// Build without the stored credential and with a forced parameter
    /// encoding. Login and registration go out this way.
    pub fn build_unauthenticated<M: RequestModel>(
        &self,
        model: &M,
        encoding: ParameterEncoding,
    ) -> Result<HttpRequest, BuildError> {
        self.assemble(model, None, Some(encoding))
    }

    fn assemble<M: RequestModel>(
        &self,
        model: &M,
        token: Option<String>,
        forced_encoding: Option<ParameterEncoding>,
    ) -> Result<HttpRequest, BuildError> {
        let mut url = self.resolve_url(&model.path())?;
        let method = model.method();

        let mut request = HttpRequest {
            method,
            url: String::new(),
            headers: Vec::new(),
            body: None,
        };

        if let Some(token) = token {
            let value = format!("{}{}", self.config.auth_prefix, token);
            push_header(&mut request, &self.config.auth_header, &value)?;
        }

        for (name, value) in &self.config.headers {
            push_header(&mut request, name, value)?;
        }
        for (name, value) in model.headers().unwrap_or_default() {
            push_header(&mut request, &name, &value)?;
        }

        append_query(&mut url, &self.config.queries);

        match model.patch().filter(|patch| !patch.is_empty()) {
            Some(patch) => {
                let body = serde_json::to_vec(&patch.operations())
                    .map_err(|e| BuildError::EncodingFailed(e.to_string()))?;
                request.body = Some(body);
                request.set_header(CONTENT_TYPE, APPLICATION_JSON);
            }
            None => {
                if let Some(params) = model.body_parameters() {
                    let encoding = forced_encoding
                        .or_else(|| model.encoding())
                        .unwrap_or_else(|| ParameterEncoding::default_for(method));
                    match encoding {
                        ParameterEncoding::QueryString => {
                            append_query(&mut url, &flatten_parameters(as_object(&params)?));
                        }
                        ParameterEncoding::JsonBody => {
                            let body = serde_json::to_vec(&params)
                                .map_err(|e| BuildError::EncodingFailed(e.to_string()))?;
                            request.body = Some(body);
                            if request.header(CONTENT_TYPE).is_none() {
                                request.add_header(CONTENT_TYPE, APPLICATION_JSON);
                            }
                        }
                        ParameterEncoding::FormBody => {
                            let body = form_urlencoded::Serializer::new(String::new())
                                .extend_pairs(flatten_parameters(as_object(&params)?))
                                .finish();
                            request.body = Some(body.into_bytes());
                            if request.header(CONTENT_TYPE).is_none() {
                                request.add_header(CONTENT_TYPE, FORM_URLENCODED);
                            }
                        }
                    }
                }
            }
        }

        request.url = url.into();
        tracing::debug!(method = %request.method, url = %request.url, "built request");
        Ok(request)
    }

    fn resolve_url(&self, path: &str) -> Result<Url, BuildError> {
        let mut url = self.config.parsed_base_url()?;
        let path = path.trim_start_matches('/');
        if !path.is_empty() {
            let joined = format!("{}/{}", url.path().trim_end_matches('/'), path);
            url.set_path(&joined);
        }
        Ok(url)
    }
}

fn as_object(params: &Value) -> Result<&Map<String, Value>, BuildError> {
    params.as_object().ok_or_else(|| {
        BuildError::EncodingFailed("encoded parameters must be a JSON object".to_string())
    })
}

fn push_header(request: &mut HttpRequest, name: &str, value: &str) -> Result<(), BuildError> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| BuildError::EncodingFailed(format!("invalid header name {name:?}")))?;
    HeaderValue::from_str(value)
        .map_err(|_| BuildError::EncodingFailed(format!("invalid value for header {name}")))?;
    request.add_header(name, value);
    Ok(())
}

fn append_query(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        return;
    }
    url.query_pairs_mut().extend_pairs(pairs);
}

/// Flatten a JSON object into form pairs: `a[]=1` for arrays, `a[b]=1` for
/// nested objects, empty string for null.
fn flatten_parameters(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, value) in params {
        flatten_value(key.clone(), value, &mut out);
    }
    out
}

fn flatten_value(key: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (sub, v) in map {
                flatten_value(format!("{key}[{sub}]"), v, out);
            }
        }
        Value::Array(items) => {
            for v in items {
                flatten_value(format!("{key}[]"), v, out);
            }
        }
        Value::String(s) => out.push((key, s.clone())),
        Value::Null => out.push((key, String::new())),
        other => out.push((key, other.to_string())),
    }
}
