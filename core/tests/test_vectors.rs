//! Verify the builder and decoder against JSON test vectors stored in
//! `test-vectors/`.
//!
//! Each build vector describes a model, optional global configuration and the
//! expected request; each decode vector a simulated response and the expected
//! result or error. Bodies are compared as parsed JSON so field ordering in
//! the vector files does not matter.

use std::sync::Arc;

use efnet_core::{
    decode_list, decode_object, ApiError, CredentialStore, ErrorKind, HttpMethod, HttpResponse,
    MemoryStore, ParameterEncoding, PatchSet, RequestBuilder, RequestModel, ServiceConfig,
};
use serde::Deserialize;
use serde_json::Value;

/// Parse the method string from test vectors into `HttpMethod`.
fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|h| {
                    let arr = h.as_array().unwrap();
                    (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

/// A model whose every aspect comes from the vector file.
#[derive(Debug, Deserialize)]
struct VectorModel {
    method: String,
    path: String,
    #[serde(default)]
    params: Option<Value>,
    #[serde(default)]
    headers: Option<Vec<(String, String)>>,
    #[serde(default)]
    encoding: Option<ParameterEncoding>,
    #[serde(default)]
    patch_adds: serde_json::Map<String, Value>,
    #[serde(default)]
    patch_removes: Vec<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(skip)]
    patch: PatchSet,
}

impl VectorModel {
    fn load_patch(&mut self) {
        for (field, value) in &self.patch_adds {
            self.patch.record_change(field, None, Some(value.clone()));
        }
        for field in &self.patch_removes {
            self.patch.record_change(field, Some(Value::Null), None);
        }
    }
}

impl RequestModel for VectorModel {
    fn method(&self) -> HttpMethod {
        parse_method(&self.method)
    }
    fn path(&self) -> String {
        self.path.clone()
    }
    fn body_parameters(&self) -> Option<Value> {
        self.params.clone()
    }
    fn headers(&self) -> Option<Vec<(String, String)>> {
        self.headers.clone()
    }
    fn encoding(&self) -> Option<ParameterEncoding> {
        self.encoding
    }
    fn patch(&self) -> Option<&PatchSet> {
        Some(&self.patch)
    }
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

#[test]
fn build_test_vectors() {
    let raw = include_str!("../../test-vectors/build.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let base_url = vectors["base_url"].as_str().unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut model: VectorModel = serde_json::from_value(case["input"].clone()).unwrap();
        model.load_patch();

        let mut config = ServiceConfig::new(base_url);
        config.headers = pairs(&case["global_headers"]);
        config.queries = pairs(&case["global_queries"]);
        let creds = CredentialStore::new(
            Arc::new(MemoryStore::new()),
            &config.keychain_identifier,
            &config.date_format,
        );
        if let Some(token) = &model.token {
            creds.set_auth_token(Some(token.as_str()), Some("2999-01-01T00:00:00+0000"));
        }
        let builder = RequestBuilder::new(Arc::new(config), creds);

        let expected = &case["expected_request"];
        let req = builder.build(&model).unwrap();
        assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
        assert_eq!(req.url, expected["url"].as_str().unwrap(), "{name}: url");
        assert_eq!(req.headers, pairs(&expected["headers"]), "{name}: headers");

        match &req.body {
            Some(body) => {
                let body: Value = serde_json::from_slice(body).unwrap();
                assert_eq!(body, expected["body"], "{name}: body");
            }
            None => assert!(expected["body"].is_null(), "{name}: body should be None"),
        }
    }
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, PartialEq)]
struct Item {
    id: u32,
    name: String,
}

fn kind_from_str(s: &str) -> ErrorKind {
    match s {
        "NoConnection" => ErrorKind::NoConnection,
        "BadRequest" => ErrorKind::BadRequest,
        "Unauthorized" => ErrorKind::Unauthorized,
        "Forbidden" => ErrorKind::Forbidden,
        "NotFound" => ErrorKind::NotFound,
        "BadCredentials" => ErrorKind::BadCredentials,
        "InternalError" => ErrorKind::InternalError,
        "ProcessingError" => ErrorKind::ProcessingError,
        "UnknownError" => ErrorKind::UnknownError,
        other => panic!("unknown error kind: {other}"),
    }
}

#[test]
fn decode_test_vectors() {
    let raw = include_str!("../../test-vectors/decode.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let sim = &case["response"];
        let response = HttpResponse::new(
            sim["status"].as_u64().unwrap() as u16,
            sim["body"].as_str().unwrap(),
        );

        let result: Result<Value, ApiError> = if case["list"].as_bool().unwrap() {
            decode_list::<Item>(&response).map(|items| {
                Value::Array(
                    items
                        .into_iter()
                        .map(|i| serde_json::json!({"id": i.id, "name": i.name}))
                        .collect(),
                )
            })
        } else {
            decode_object::<Item>(&response).map(|i| serde_json::json!({"id": i.id, "name": i.name}))
        };

        match result {
            Ok(value) => assert_eq!(value, case["expected_result"], "{name}: parsed result"),
            Err(err) => {
                let expected = &case["expected_error"];
                assert!(!expected.is_null(), "{name}: unexpected error {err}");
                assert_eq!(err.kind(), kind_from_str(expected["kind"].as_str().unwrap()), "{name}: kind");
                assert_eq!(err.message(), expected["message"].as_str().unwrap(), "{name}: message");
            }
        }
    }
}
