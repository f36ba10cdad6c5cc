//! Test support for Sokoni integration tests.
//!
//! [`StubBackend`] is an in-process REST backend plus object-storage stub,
//! bound to an ephemeral port. It serves the `/api/v1` surface the console
//! talks to and a Firebase-style `/v0/b/{bucket}/o` storage surface, keeps
//! per-route hit counters, and exposes failure knobs, so tests can assert
//! not just what the console returned but exactly which requests it issued.
//!
//! # Usage
//!
//! ```rust,ignore
//! let backend = StubBackend::spawn().await;
//! let api = ApiClient::new(&backend.api_base_url());
//! // ... drive the stores, then assert on backend.me_hits() etc.
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

use sokoni_console::config::MediaConfig;

/// In-process backend stub. Dropping the handle leaves the spawned server
/// task running until the test runtime shuts down, which is fine for tests.
pub struct StubBackend {
    base_url: String,
    state: Arc<StubState>,
}

impl StubBackend {
    /// Bind an ephemeral port and start serving.
    pub async fn spawn() -> Self {
        let state = Arc::new(StubState {
            products: seed_products(),
            users: Mutex::new(HashMap::new()),
            access_tokens: Mutex::new(HashMap::new()),
            refresh_tokens: Mutex::new(HashMap::new()),
            objects: Mutex::new(HashMap::new()),
            serial: AtomicU32::new(0),
            fail_refresh: AtomicBool::new(false),
            rotate_refresh: AtomicBool::new(false),
            hits: Hits::default(),
        });

        let app = router(Arc::clone(&state));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind stub listener");
        let addr = listener.local_addr().expect("Failed to read stub address");

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Base URL of the REST surface, for `ApiClient::new`.
    #[must_use]
    pub fn api_base_url(&self) -> String {
        format!("{}/api/v1", self.base_url)
    }

    /// Storage configuration pointing at the stub, for `MediaClient::new`.
    #[must_use]
    pub fn media_config(&self) -> MediaConfig {
        MediaConfig {
            base_url: self.base_url.clone(),
            bucket: "stub-bucket".to_owned(),
            token: None,
        }
    }

    // =========================================================================
    // Knobs
    // =========================================================================

    /// Invalidate every outstanding access token. Refresh tokens stay
    /// valid, so the next authenticated request meets a 401 but a refresh
    /// succeeds.
    pub fn expire_access_tokens(&self) {
        lock(&self.state.access_tokens).clear();
    }

    /// Make the refresh endpoint reject every request.
    pub fn fail_refresh(&self, fail: bool) {
        self.state.fail_refresh.store(fail, Ordering::Relaxed);
    }

    /// Rotate the refresh token on every successful refresh.
    pub fn rotate_refresh(&self, rotate: bool) {
        self.state.rotate_refresh.store(rotate, Ordering::Relaxed);
    }

    // =========================================================================
    // Observations
    // =========================================================================

    #[must_use]
    pub fn me_hits(&self) -> u32 {
        self.state.hits.me.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn refresh_hits(&self) -> u32 {
        self.state.hits.refresh.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn search_hits(&self) -> u32 {
        self.state.hits.search.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn product_hits(&self) -> u32 {
        self.state.hits.product.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn upload_hits(&self) -> u32 {
        self.state.hits.upload.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn delete_hits(&self) -> u32 {
        self.state.hits.delete.load(Ordering::Relaxed)
    }

    /// Bytes of a stored object, if present.
    #[must_use]
    pub fn object(&self, path: &str) -> Option<Vec<u8>> {
        lock(&self.state.objects).get(path).cloned()
    }

    /// Paths of every stored object, sorted.
    #[must_use]
    pub fn object_names(&self) -> Vec<String> {
        let mut names: Vec<String> = lock(&self.state.objects).keys().cloned().collect();
        names.sort();
        names
    }
}

// =============================================================================
// State
// =============================================================================

struct StoredUser {
    id: String,
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    phone: Option<String>,
    address: Option<String>,
}

#[derive(Default)]
struct Hits {
    products: AtomicU32,
    product: AtomicU32,
    search: AtomicU32,
    category: AtomicU32,
    me: AtomicU32,
    refresh: AtomicU32,
    upload: AtomicU32,
    delete: AtomicU32,
}

struct StubState {
    products: Vec<Value>,
    users: Mutex<HashMap<String, StoredUser>>,
    /// Access token -> email.
    access_tokens: Mutex<HashMap<String, String>>,
    /// Refresh token -> email.
    refresh_tokens: Mutex<HashMap<String, String>>,
    /// Object path -> stored bytes.
    objects: Mutex<HashMap<String, Vec<u8>>>,
    serial: AtomicU32,
    fail_refresh: AtomicBool,
    rotate_refresh: AtomicBool,
    hits: Hits,
}

impl StubState {
    fn next_serial(&self) -> u32 {
        self.serial.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn issue_access(&self, email: &str) -> String {
        let access = format!("acc-{}", self.next_serial());
        lock(&self.access_tokens).insert(access.clone(), email.to_owned());
        access
    }

    fn issue_refresh(&self, email: &str) -> String {
        let refresh = format!("ref-{}", self.next_serial());
        lock(&self.refresh_tokens).insert(refresh.clone(), email.to_owned());
        refresh
    }

    /// Email of the bearer of a valid access token, if any.
    fn bearer_email(&self, headers: &HeaderMap) -> Option<String> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        lock(&self.access_tokens).get(token).cloned()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

// =============================================================================
// Routes
// =============================================================================

fn router(state: Arc<StubState>) -> Router {
    Router::new()
        .route("/api/v1/users/register", post(register))
        .route("/api/v1/users/login", post(login))
        .route("/api/v1/users/refresh", post(refresh))
        .route("/api/v1/users/me", get(me))
        .route("/api/v1/users/{id}", put(update_user))
        .route("/api/v1/products", get(list_products))
        .route("/api/v1/products/search", get(search_products))
        .route("/api/v1/products/category/{category}", get(category_products))
        .route("/api/v1/products/{id}", get(get_product))
        .route("/v0/b/{bucket}/o", post(upload_object))
        .route("/v0/b/{bucket}/o/{object}", delete(delete_object))
        .with_state(state)
}

#[derive(Deserialize)]
struct RegisterBody {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
    phone: Option<String>,
    address: Option<String>,
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct RefreshBody {
    refresh_token: String,
}

#[derive(Deserialize)]
struct UpdateBody {
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    address: Option<String>,
}

#[derive(Deserialize)]
struct PageQuery {
    page: Option<u32>,
    page_size: Option<u32>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: Option<String>,
    page: Option<u32>,
    page_size: Option<u32>,
}

#[derive(Deserialize)]
struct UploadQuery {
    name: String,
}

async fn register(
    State(state): State<Arc<StubState>>,
    Json(body): Json<RegisterBody>,
) -> Response {
    let mut users = lock(&state.users);
    if users.contains_key(&body.email) {
        return error_response(StatusCode::CONFLICT, "Email already registered");
    }

    let user = StoredUser {
        id: format!("u-{}", state.next_serial()),
        first_name: body.first_name,
        last_name: body.last_name,
        email: body.email,
        password: body.password,
        phone: body.phone,
        address: body.address,
    };
    let email = user.email.clone();
    let profile = user_json(&user);
    users.insert(email.clone(), user);
    drop(users);

    let access = state.issue_access(&email);
    let refresh = state.issue_refresh(&email);
    // Auth responses use the backend's historical `token` key.
    (
        StatusCode::CREATED,
        Json(json!({ "token": access, "refresh_token": refresh, "user": profile })),
    )
        .into_response()
}

async fn login(State(state): State<Arc<StubState>>, Json(body): Json<LoginBody>) -> Response {
    let users = lock(&state.users);
    let Some(user) = users.get(&body.email).filter(|u| u.password == body.password) else {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid email or password");
    };
    let profile = user_json(user);
    let email = user.email.clone();
    drop(users);

    let access = state.issue_access(&email);
    let refresh = state.issue_refresh(&email);
    Json(json!({ "token": access, "refresh_token": refresh, "user": profile })).into_response()
}

async fn refresh(State(state): State<Arc<StubState>>, Json(body): Json<RefreshBody>) -> Response {
    state.hits.refresh.fetch_add(1, Ordering::Relaxed);

    if state.fail_refresh.load(Ordering::Relaxed) {
        return error_response(StatusCode::UNAUTHORIZED, "Refresh token rejected");
    }
    let Some(email) = lock(&state.refresh_tokens).get(&body.refresh_token).cloned() else {
        return error_response(StatusCode::UNAUTHORIZED, "Refresh token rejected");
    };

    let access = state.issue_access(&email);
    if state.rotate_refresh.load(Ordering::Relaxed) {
        lock(&state.refresh_tokens).remove(&body.refresh_token);
        let rotated = state.issue_refresh(&email);
        return Json(json!({ "access_token": access, "refresh_token": rotated })).into_response();
    }
    Json(json!({ "access_token": access })).into_response()
}

async fn me(State(state): State<Arc<StubState>>, headers: HeaderMap) -> Response {
    state.hits.me.fetch_add(1, Ordering::Relaxed);

    let Some(email) = state.bearer_email(&headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid or expired token");
    };
    let users = lock(&state.users);
    match users.get(&email) {
        Some(user) => Json(json!({ "user": user_json(user) })).into_response(),
        None => error_response(StatusCode::UNAUTHORIZED, "Invalid or expired token"),
    }
}

async fn update_user(
    State(state): State<Arc<StubState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<UpdateBody>,
) -> Response {
    if state.bearer_email(&headers).is_none() {
        return error_response(StatusCode::UNAUTHORIZED, "Invalid or expired token");
    }

    let mut users = lock(&state.users);
    let Some(user) = users.values_mut().find(|u| u.id == id) else {
        return error_response(StatusCode::NOT_FOUND, "User not found");
    };
    if let Some(first_name) = body.first_name {
        user.first_name = first_name;
    }
    if let Some(last_name) = body.last_name {
        user.last_name = last_name;
    }
    if let Some(phone) = body.phone {
        user.phone = Some(phone);
    }
    if let Some(address) = body.address {
        user.address = Some(address);
    }
    Json(json!({ "user": user_json(user) })).into_response()
}

async fn list_products(
    State(state): State<Arc<StubState>>,
    Query(query): Query<PageQuery>,
) -> Response {
    state.hits.products.fetch_add(1, Ordering::Relaxed);
    page_response(&state.products, query.page, query.page_size)
}

async fn search_products(
    State(state): State<Arc<StubState>>,
    Query(query): Query<SearchQuery>,
) -> Response {
    state.hits.search.fetch_add(1, Ordering::Relaxed);

    let needle = query.q.unwrap_or_default().to_lowercase();
    let matching: Vec<Value> = state
        .products
        .iter()
        .filter(|product| {
            product
                .get("name")
                .and_then(Value::as_str)
                .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .cloned()
        .collect();
    page_response(&matching, query.page, query.page_size)
}

async fn category_products(
    State(state): State<Arc<StubState>>,
    Path(category): Path<String>,
    Query(query): Query<PageQuery>,
) -> Response {
    state.hits.category.fetch_add(1, Ordering::Relaxed);

    let matching: Vec<Value> = state
        .products
        .iter()
        .filter(|product| product.get("category").and_then(Value::as_str) == Some(category.as_str()))
        .cloned()
        .collect();
    page_response(&matching, query.page, query.page_size)
}

async fn get_product(State(state): State<Arc<StubState>>, Path(id): Path<String>) -> Response {
    state.hits.product.fetch_add(1, Ordering::Relaxed);

    match state
        .products
        .iter()
        .find(|product| product.get("id").and_then(Value::as_str) == Some(id.as_str()))
    {
        Some(product) => Json(json!({ "product": product })).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "Product not found"),
    }
}

async fn upload_object(
    State(state): State<Arc<StubState>>,
    Path(_bucket): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Response {
    state.hits.upload.fetch_add(1, Ordering::Relaxed);

    lock(&state.objects).insert(query.name.clone(), body.to_vec());
    Json(json!({ "name": query.name, "downloadTokens": "stub-token" })).into_response()
}

async fn delete_object(
    State(state): State<Arc<StubState>>,
    Path((_bucket, object)): Path<(String, String)>,
) -> Response {
    state.hits.delete.fetch_add(1, Ordering::Relaxed);

    if lock(&state.objects).remove(&object).is_some() {
        StatusCode::NO_CONTENT.into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "code": 404, "message": "Not Found." } })),
        )
            .into_response()
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn user_json(user: &StoredUser) -> Value {
    json!({
        "id": user.id,
        "first_name": user.first_name,
        "last_name": user.last_name,
        "email": user.email,
        "phone": user.phone,
        "address": user.address,
    })
}

fn page_response(matching: &[Value], page: Option<u32>, page_size: Option<u32>) -> Response {
    let page = page.unwrap_or(1).max(1);
    let size = page_size.unwrap_or(20).max(1);
    let start = usize::try_from(u64::from(page - 1) * u64::from(size)).unwrap_or(usize::MAX);
    let take = usize::try_from(size).unwrap_or(usize::MAX);

    let products: Vec<Value> = matching.iter().skip(start).take(take).cloned().collect();
    Json(json!({ "products": products, "total": matching.len() })).into_response()
}

/// Forty-five products: `p-1` through `p-45`, price equal to the index,
/// categories cycling, with a couple of named entries for search tests.
fn seed_products() -> Vec<Value> {
    let categories = ["shoes", "shirts", "accessories"];
    (1_usize..=45)
        .map(|i| {
            let (name, discount) = match i {
                7 => ("Trail Running Shoes".to_owned(), 20),
                8 => ("Road Running Shoes".to_owned(), 0),
                _ => (format!("Product {i}"), 0),
            };
            let price = i;
            let final_price = price - price * discount / 100;
            let stock = if i == 3 { 0 } else { 5 + i % 10 };
            json!({
                "id": format!("p-{i}"),
                "name": name,
                "description": format!("Stub product {i}"),
                "price": price,
                "category": categories.get((i - 1) % 3).copied().unwrap_or("shoes"),
                "stock": stock,
                "brand": "Sokoni",
                "discount_percentage": discount,
                "final_price": final_price,
                "in_stock": stock > 0,
                "is_active": true,
            })
        })
        .collect()
}
