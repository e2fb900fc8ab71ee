use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Geo {
    pub lat: String,
    pub lng: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub suite: String,
    pub city: String,
    pub zipcode: String,
    pub geo: Geo,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub catch_phrase: String,
    pub bs: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u32,
    pub name: String,
    pub username: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub address: Address,
    pub company: Company,
    pub active: bool,
    pub roles: Vec<String>,
}

#[derive(Deserialize)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
}

#[derive(Deserialize)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// What `/echo` saw on the wire.
#[derive(Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub type Db = Arc<RwLock<Vec<User>>>;

/// Ten users, ids 1 through 10.
pub fn seed_users() -> Vec<User> {
    (1..=10)
        .map(|id| User {
            id,
            name: format!("User {id}"),
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            phone: format!("555-01{id:02}"),
            website: format!("user{id}.example.com"),
            address: Address {
                street: format!("{id} Main Street"),
                suite: format!("Apt. {}", id * 100),
                city: "Springfield".to_string(),
                zipcode: format!("{:05}", 10000 + id),
                geo: Geo {
                    lat: format!("{}.{id}", 40 + id),
                    lng: format!("-{}.{id}", 70 + id),
                },
            },
            company: Company {
                name: format!("Company {id}"),
                catch_phrase: "Multi-layered client-server neural-net".to_string(),
                bs: "harness real-time e-markets".to_string(),
            },
            active: id % 2 == 1,
            roles: if id == 1 {
                vec!["admin".to_string(), "user".to_string()]
            } else {
                vec!["user".to_string()]
            },
        })
        .collect()
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(seed_users()));
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{id}", get(get_user).patch(update_user).delete(delete_user))
        .route("/broken-users", get(broken_users))
        .route("/slow-users", get(slow_users))
        .route("/large/{bytes}", get(large))
        .route("/status/{code}", any(status))
        .route("/echo", any(echo))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_users(State(db): State<Db>) -> Json<Vec<User>> {
    Json(db.read().await.clone())
}

async fn create_user(
    State(db): State<Db>,
    Json(input): Json<NewUser>,
) -> (StatusCode, Json<User>) {
    let mut users = db.write().await;
    let user = User {
        id: users.iter().map(|u| u.id).max().unwrap_or(0) + 1,
        name: input.name,
        username: input.username,
        email: input.email,
        phone: String::new(),
        website: String::new(),
        address: Address::default(),
        company: Company::default(),
        active: true,
        roles: vec!["user".to_string()],
    };
    users.push(user.clone());
    tracing::debug!(id = user.id, "user created");
    (StatusCode::CREATED, Json(user))
}

async fn get_user(State(db): State<Db>, Path(id): Path<u32>) -> Result<Json<User>, StatusCode> {
    let users = db.read().await;
    users.iter().find(|u| u.id == id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn update_user(
    State(db): State<Db>,
    Path(id): Path<u32>,
    Json(input): Json<UpdateUser>,
) -> Result<Json<User>, StatusCode> {
    let mut users = db.write().await;
    let user = users.iter_mut().find(|u| u.id == id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        user.name = name;
    }
    if let Some(email) = input.email {
        user.email = email;
    }
    Ok(Json(user.clone()))
}

async fn delete_user(
    State(db): State<Db>,
    Path(id): Path<u32>,
) -> Result<Json<serde_json::Value>, StatusCode> {
    let mut users = db.write().await;
    let index = users.iter().position(|u| u.id == id).ok_or(StatusCode::NOT_FOUND)?;
    users.remove(index);
    Ok(Json(serde_json::json!({})))
}

/// Users with the `email` field stripped.
async fn broken_users(State(db): State<Db>) -> Json<Vec<serde_json::Value>> {
    let users = db.read().await;
    Json(
        users
            .iter()
            .map(|u| {
                let mut value = serde_json::json!(u);
                if let Some(fields) = value.as_object_mut() {
                    fields.remove("email");
                }
                value
            })
            .collect(),
    )
}

async fn slow_users(State(db): State<Db>) -> Json<Vec<User>> {
    tokio::time::sleep(Duration::from_millis(300)).await;
    Json(db.read().await.clone())
}

/// A JSON string of `bytes` characters.
async fn large(Path(bytes): Path<usize>) -> Json<String> {
    Json("x".repeat(bytes))
}

async fn status(Path(code): Path<u16>) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn echo(
    method: Method,
    Query(query): Query<BTreeMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();
    Json(Echo {
        method: method.to_string(),
        query,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}
