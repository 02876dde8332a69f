use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const TOKEN_EXPIRATION: &str = "2999-01-01T00:00:00+0000";

const NOT_FOUND: &str = "Object Not Found";
const BAD_CREDENTIALS: &str = "Incorrect Username or Password";
const UNAUTHORIZED: &str = "Unauthorized";

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
}

/// A user plus the session token issued at login or registration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    #[serde(flatten)]
    pub user: User,
    pub token: String,
    pub expiration: String,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub email: String,
    pub nickname: Option<String>,
    pub age: Option<u32>,
}

#[derive(Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    pub field: String,
    #[serde(default)]
    pub value: Option<Value>,
}

#[derive(Default)]
pub struct Store {
    users: HashMap<Uuid, User>,
    passwords: HashMap<String, (Uuid, String)>,
    tokens: HashMap<String, Uuid>,
}

pub type Db = Arc<RwLock<Store>>;

type Failure = (StatusCode, String);

fn fail(status: StatusCode, message: &str) -> Failure {
    (status, message.to_string())
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(patch_user).delete(delete_user),
        )
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/me", get(me))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    let store = db.read().await;
    let mut users: Vec<User> = store.users.values().cloned().collect();
    users.sort_by(|a, b| a.email.cmp(&b.email));
    Json(users)
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<CreateUser>,
) -> Result<(StatusCode, Json<User>), Failure> {
    if input.email.is_empty() {
        return Err(fail(StatusCode::BAD_REQUEST, "email is required"));
    }
    let user = User {
        id: Uuid::new_v4(),
        email: input.email,
        nickname: input.nickname,
        age: input.age,
    };
    db.write().await.users.insert(user.id, user.clone());
    tracing::debug!(id = %user.id, "created user");
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<User>, Failure> {
    let store = db.read().await;
    store
        .users
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, NOT_FOUND))
}

async fn patch_user(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(ops): Json<Vec<PatchOperation>>,
) -> Result<Json<User>, Failure> {
    let mut store = db.write().await;
    let user = store
        .users
        .get_mut(&id)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, NOT_FOUND))?;
    let mut patched = user.clone();
    for op in &ops {
        apply(&mut patched, op)?;
    }
    *user = patched.clone();
    tracing::debug!(%id, ops = ops.len(), "patched user");
    Ok(Json(patched))
}

fn apply(user: &mut User, op: &PatchOperation) -> Result<(), Failure> {
    let bad = || fail(StatusCode::BAD_REQUEST, &format!("cannot {} {}", op.op, op.field));
    match (op.op.as_str(), op.field.as_str(), &op.value) {
        ("add", "email", Some(Value::String(email))) => user.email = email.clone(),
        ("add", "nickname", Some(Value::String(nick))) => user.nickname = Some(nick.clone()),
        ("add", "age", Some(Value::Number(n))) => {
            user.age = Some(n.as_u64().and_then(|v| u32::try_from(v).ok()).ok_or_else(bad)?)
        }
        ("remove", "nickname", _) => user.nickname = None,
        ("remove", "age", _) => user.age = None,
        _ => return Err(bad()),
    }
    Ok(())
}

async fn delete_user(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<Json<User>, Failure> {
    let mut store = db.write().await;
    store
        .users
        .remove(&id)
        .map(Json)
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, NOT_FOUND))
}

async fn register(
    State(db): State<Db>,
    Form(creds): Form<Credentials>,
) -> Result<(StatusCode, Json<Session>), Failure> {
    let mut store = db.write().await;
    if store.passwords.contains_key(&creds.email) {
        return Err(fail(StatusCode::BAD_REQUEST, "email already registered"));
    }
    let user = User {
        id: Uuid::new_v4(),
        email: creds.email.clone(),
        nickname: None,
        age: None,
    };
    store.users.insert(user.id, user.clone());
    store.passwords.insert(creds.email, (user.id, creds.password));
    let session = issue_session(&mut store, user);
    Ok((StatusCode::CREATED, Json(session)))
}

async fn login(
    State(db): State<Db>,
    Form(creds): Form<Credentials>,
) -> Result<Json<Session>, Failure> {
    let mut store = db.write().await;
    let id = match store.passwords.get(&creds.email) {
        Some((id, password)) if *password == creds.password => *id,
        _ => return Err(fail(StatusCode::PAYMENT_REQUIRED, BAD_CREDENTIALS)),
    };
    let user = store
        .users
        .get(&id)
        .cloned()
        .ok_or_else(|| fail(StatusCode::NOT_FOUND, NOT_FOUND))?;
    Ok(Json(issue_session(&mut store, user)))
}

async fn me(State(db): State<Db>, headers: HeaderMap) -> Result<Json<User>, Failure> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| fail(StatusCode::FORBIDDEN, UNAUTHORIZED))?;
    let store = db.read().await;
    store
        .tokens
        .get(token)
        .and_then(|id| store.users.get(id))
        .cloned()
        .map(Json)
        .ok_or_else(|| fail(StatusCode::FORBIDDEN, UNAUTHORIZED))
}

fn issue_session(store: &mut Store, user: User) -> Session {
    let token = Uuid::new_v4().simple().to_string();
    store.tokens.insert(token.clone(), user.id);
    Session {
        user,
        token,
        expiration: TOKEN_EXPIRATION.to_string(),
    }
}
