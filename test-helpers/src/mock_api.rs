//! In-memory stand-in for the learning-platform backend.
//!
//! Implements just enough of the REST surface for the client runtime to be
//! exercised over real HTTP: token-based auth, profile reads and edits, and
//! a paginated course catalog. Error responses carry a JSON `message`
//! envelope, except for the legacy fixtures at the bottom.

use std::collections::HashMap;
use std::sync::Mutex;

use actix_web::{
    HttpRequest, HttpResponse, Responder, ResponseError, body::BoxBody,
    dev::HttpServiceFactory, get, patch, post, web,
};
use jiff::Timestamp;
use uuid::Uuid;

use payloads::{CourseId, UserId, requests, responses};

pub fn api_services() -> impl HttpServiceFactory {
    web::scope("/api")
        .service(health_check)
        .service(register)
        .service(login)
        .service(me)
        .service(logout)
        .service(update_profile)
        .service(list_courses)
        .service(unavailable)
        .service(legacy_error)
}

struct UserRecord {
    profile: responses::UserProfile,
    password: String,
}

#[derive(Default)]
struct MockState {
    users: Vec<UserRecord>,
    tokens: HashMap<String, UserId>,
    courses: Vec<responses::Course>,
}

/// Mutable world behind the mock routes.
#[derive(Default)]
pub struct MockApi {
    state: Mutex<MockState>,
}

impl MockApi {
    /// Replace the course catalog with `count` synthetic courses.
    pub fn seed_courses(&self, count: usize) {
        let mut state = self.state.lock().unwrap();
        state.courses = (0..count)
            .map(|index| responses::Course {
                course_id: CourseId(Uuid::new_v4()),
                title: format!("Course {index}"),
                subject: "mathematics".to_string(),
                teacher_name: "Ms. Honey".to_string(),
                updated_at: Timestamp::now(),
            })
            .collect();
    }

    /// Revoke every outstanding token, as if they had all expired.
    pub fn revoke_tokens(&self) {
        self.state.lock().unwrap().tokens.clear();
    }
}

#[derive(Debug, thiserror::Error)]
pub enum APIError {
    #[error("Authentication failed")]
    AuthError(#[source] anyhow::Error),
    #[error("Conflict")]
    Conflict(#[source] anyhow::Error),
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        let message = match self {
            Self::AuthError(e) => format!("{self}: {e}"),
            Self::Conflict(e) => format!("{self}: {e}"),
        };
        let mut response = match self {
            Self::AuthError(_) => HttpResponse::Unauthorized(),
            Self::Conflict(_) => HttpResponse::Conflict(),
        };
        response.json(serde_json::json!({ "message": message }))
    }
}

/// Resolve the bearer token on a request to a user id.
fn bearer_identity(
    request: &HttpRequest,
    state: &MockState,
) -> Result<UserId, APIError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            APIError::AuthError(anyhow::anyhow!("missing bearer token"))
        })?;
    state.tokens.get(token).copied().ok_or_else(|| {
        APIError::AuthError(anyhow::anyhow!("invalid or expired token"))
    })
}

fn issue_token(state: &mut MockState, user_id: UserId) -> String {
    let token = Uuid::new_v4().to_string();
    state.tokens.insert(token.clone(), user_id);
    token
}

#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("healthy")
}

#[post("/auth/register")]
pub async fn register(
    details: web::Json<requests::CreateAccount>,
    api: web::Data<MockApi>,
) -> Result<HttpResponse, APIError> {
    let details = details.into_inner();
    let mut state = api.state.lock().unwrap();
    if state
        .users
        .iter()
        .any(|user| user.profile.email == details.email)
    {
        return Err(APIError::Conflict(anyhow::anyhow!(
            "an account with this email already exists"
        )));
    }

    let profile = responses::UserProfile {
        user_id: UserId(Uuid::new_v4()),
        username: details.username,
        email: details.email,
        role: details.role,
        created_at: Timestamp::now(),
        last_login: None,
    };
    state.users.push(UserRecord {
        profile: profile.clone(),
        password: details.password,
    });
    let token = issue_token(&mut state, profile.user_id);
    Ok(HttpResponse::Ok()
        .json(responses::AuthResponse { token, user: profile }))
}

#[post("/auth/login")]
pub async fn login(
    credentials: web::Json<requests::LoginCredentials>,
    api: web::Data<MockApi>,
) -> Result<HttpResponse, APIError> {
    let credentials = credentials.into_inner();
    let mut state = api.state.lock().unwrap();
    let Some(user) = state.users.iter_mut().find(|user| {
        user.profile.email == credentials.email
            && user.password == credentials.password
    }) else {
        return Err(APIError::AuthError(anyhow::anyhow!(
            "invalid credentials"
        )));
    };
    user.profile.last_login = Some(Timestamp::now());
    let profile = user.profile.clone();
    let token = issue_token(&mut state, profile.user_id);
    Ok(HttpResponse::Ok()
        .json(responses::AuthResponse { token, user: profile }))
}

#[get("/auth/me")]
pub async fn me(
    request: HttpRequest,
    api: web::Data<MockApi>,
) -> Result<HttpResponse, APIError> {
    let state = api.state.lock().unwrap();
    let user_id = bearer_identity(&request, &state)?;
    let user = state
        .users
        .iter()
        .find(|user| user.profile.user_id == user_id)
        .ok_or_else(|| APIError::AuthError(anyhow::anyhow!("unknown user")))?;
    Ok(HttpResponse::Ok().json(user.profile.clone()))
}

#[post("/auth/logout")]
pub async fn logout(
    request: HttpRequest,
    api: web::Data<MockApi>,
) -> Result<HttpResponse, APIError> {
    let mut state = api.state.lock().unwrap();
    if let Some(token) = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        state.tokens.remove(token);
    }
    Ok(HttpResponse::Ok().finish())
}

#[patch("/profile")]
pub async fn update_profile(
    request: HttpRequest,
    details: web::Json<requests::UpdateProfile>,
    api: web::Data<MockApi>,
) -> Result<HttpResponse, APIError> {
    let mut state = api.state.lock().unwrap();
    let user_id = bearer_identity(&request, &state)?;
    let details = details.into_inner();
    let user = state
        .users
        .iter_mut()
        .find(|user| user.profile.user_id == user_id)
        .ok_or_else(|| APIError::AuthError(anyhow::anyhow!("unknown user")))?;
    if let Some(username) = details.username {
        user.profile.username = username;
    }
    if let Some(email) = details.email {
        user.profile.email = email;
    }
    Ok(HttpResponse::Ok().json(user.profile.clone()))
}

#[get("/courses")]
pub async fn list_courses(
    query: web::Query<requests::PageQuery>,
    api: web::Data<MockApi>,
) -> Result<HttpResponse, APIError> {
    let state = api.state.lock().unwrap();
    let page = query.page.max(1);
    let page_size = query.page_size.max(1);
    let total_items = state.courses.len() as u64;
    let total_pages = total_items.div_ceil(page_size as u64).max(1) as u32;
    let start = ((page - 1) * page_size) as usize;
    let items: Vec<_> = state
        .courses
        .iter()
        .skip(start)
        .take(page_size as usize)
        .cloned()
        .collect();
    Ok(HttpResponse::Ok().json(responses::Page {
        items,
        total_pages,
        total_items,
    }))
}

/// Fixture: an outage-style failure with nothing useful in the body.
#[get("/unavailable")]
pub async fn unavailable() -> impl Responder {
    HttpResponse::InternalServerError().finish()
}

/// Fixture: a legacy endpoint that reports errors as plain text.
#[get("/legacy_error")]
pub async fn legacy_error() -> impl Responder {
    HttpResponse::BadRequest().body("legacy error body")
}
