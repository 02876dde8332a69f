//! Generic network-model client core.
//!
//! # Overview
//! A domain type implements `RequestModel` to describe its own HTTP call.
//! `RequestBuilder` turns it into a plain-data `HttpRequest`, a `Transport`
//! executes it, and the decoder maps the `HttpResponse` back into typed
//! objects or an `ApiError`. `WebService` strings these together behind
//! get/post/delete/list/auth verbs.
//!
//! # Design
//! - Building and decoding never touch the network (host-does-IO pattern);
//!   only `Transport` and `Connectivity` implementations do.
//! - Configuration is an explicit `ServiceConfig` shared through `Arc`.
//! - The auth token lives in a `SecureStore` behind `CredentialStore`.
//! - Partial updates are tracked by a `PatchSet` owned by the model.

pub mod builder;
pub mod config;
pub mod credentials;
pub mod decoder;
pub mod error;
pub mod http;
pub mod model;
pub mod patch;
pub mod service;
pub mod transport;

pub use builder::RequestBuilder;
pub use config::ServiceConfig;
pub use credentials::{CredentialStore, MemoryStore, SecureStore};
pub use decoder::{decode_error, decode_list, decode_object};
pub use error::{ApiError, BuildError, ErrorKind, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use model::{AuthToken, ParameterEncoding, RequestModel};
pub use patch::{PatchOp, PatchOperation, PatchSet};
pub use service::{CallOptions, Reply, WebService};
pub use transport::{AlwaysOnline, Connectivity, ReqwestTransport, TcpProbe, Transport};
