//! The contract every request/domain object implements.
//!
//! # Design
//! A model is both the description of an HTTP call and the type the response
//! decodes into, so the trait requires `DeserializeOwned`. Only `method` and
//! `path` are mandatory; the rest default to "nothing to add".

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::http::HttpMethod;
use crate::patch::PatchSet;

/// How body parameters are put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterEncoding {
    /// Appended to the URL as `key=value` pairs.
    QueryString,
    /// Serialized as the JSON request body.
    JsonBody,
    /// `key=value` pairs in an `application/x-www-form-urlencoded` body.
    FormBody,
}

impl ParameterEncoding {
    /// GET carries parameters in the URL; everything else in a JSON body.
    pub fn default_for(method: HttpMethod) -> Self {
        if method == HttpMethod::Get {
            ParameterEncoding::QueryString
        } else {
            ParameterEncoding::JsonBody
        }
    }
}

/// A token handed back by an authentication or registration endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthToken {
    pub token: String,
    pub expiration: Option<String>,
}

/// A domain object that knows how to describe its own HTTP call.
pub trait RequestModel: DeserializeOwned {
    fn method(&self) -> HttpMethod;

    /// Endpoint sub-path, e.g. `/api/user`.
    fn path(&self) -> String;

    /// `None` for parameterless requests such as a plain GET.
    fn body_parameters(&self) -> Option<Value> {
        None
    }

    /// Extra headers appended after the configured global headers.
    fn headers(&self) -> Option<Vec<(String, String)>> {
        None
    }

    /// Overrides the method-derived encoding when set.
    fn encoding(&self) -> Option<ParameterEncoding> {
        None
    }

    /// Pending partial update. A non-empty patch replaces `body_parameters`.
    fn patch(&self) -> Option<&PatchSet> {
        None
    }

    /// Credential carried by a decoded login/registration response.
    fn auth_token(&self) -> Option<AuthToken> {
        None
    }
}
