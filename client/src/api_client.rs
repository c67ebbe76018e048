use std::sync::{Arc, Mutex};

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;

use payloads::{requests, responses};

use crate::storage::{AUTH_TOKEN_KEY, StorageBackend};

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// An API client for interfacing with the backend.
///
/// The single point of outbound HTTP traffic. Holds the bearer credential
/// used on authenticated calls and mirrors it into durable storage, so a
/// page reload finds the same credential again.
#[derive(Clone)]
pub struct APIClient {
    pub address: String,
    inner_client: reqwest::Client,
    token: Arc<Mutex<Option<String>>>,
    storage: Arc<dyn StorageBackend>,
}

impl APIClient {
    pub fn new(
        address: impl Into<String>,
        storage: Arc<dyn StorageBackend>,
    ) -> Self {
        Self {
            address: address.into(),
            inner_client: reqwest::Client::new(),
            token: Arc::new(Mutex::new(None)),
            storage,
        }
    }

    /// Replace the credential used for subsequent calls. The durable copy
    /// is written or removed within the same call.
    pub fn set_token(&self, token: Option<&str>) {
        match token {
            Some(token) => self.storage.set(AUTH_TOKEN_KEY, token),
            None => self.storage.remove(AUTH_TOKEN_KEY),
        }
        *self.token.lock().unwrap() = token.map(str::to_owned);
    }

    pub fn token(&self) -> Option<String> {
        self.token.lock().unwrap().clone()
    }
}

/// Helper methods for http actions
impl APIClient {
    fn format_url(&self, path: &str) -> String {
        format!("{}/api/{path}", &self.address)
    }

    fn builder(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let request = self.inner_client.request(method, self.format_url(path));
        match self.token.lock().unwrap().as_deref() {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send_empty(&self, method: Method, path: &str) -> ReqwestResult {
        self.builder(method, path).send().await
    }

    async fn send_json(
        &self,
        method: Method,
        path: &str,
        body: &impl Serialize,
    ) -> ReqwestResult {
        self.builder(method, path).json(body).send().await
    }

    async fn send_query(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ReqwestResult {
        // reqwest leaves the query string off entirely when params is empty
        self.builder(Method::GET, path).query(params).send().await
    }
}

/// Untyped verbs for endpoints without a dedicated method.
impl APIClient {
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Body, ClientError> {
        let response = match body {
            Some(body) => self.send_json(method, path, body).await?,
            None => self.send_empty(method, path).await?,
        };
        decode_body(response).await
    }

    pub async fn get(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Body, ClientError> {
        let response = self.send_query(path, params).await?;
        decode_body(response).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Body, ClientError> {
        let response = self.send_json(Method::POST, path, body).await?;
        decode_body(response).await
    }

    pub async fn put(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Body, ClientError> {
        let response = self.send_json(Method::PUT, path, body).await?;
        decode_body(response).await
    }

    pub async fn patch(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<Body, ClientError> {
        let response = self.send_json(Method::PATCH, path, body).await?;
        decode_body(response).await
    }

    pub async fn delete(&self, path: &str) -> Result<Body, ClientError> {
        let response = self.send_empty(Method::DELETE, path).await?;
        decode_body(response).await
    }
}

/// Methods on the backend API
impl APIClient {
    pub async fn health_check(&self) -> Result<(), ClientError> {
        let response = self.send_empty(Method::GET, "health_check").await?;
        ok_empty(response).await
    }

    /// Exchange credentials for a session token and identity.
    pub async fn login(
        &self,
        details: &requests::LoginCredentials,
    ) -> Result<responses::AuthResponse, ClientError> {
        let response =
            self.send_json(Method::POST, "auth/login", details).await?;
        ok_body(response).await
    }

    /// Create an account; the response carries a session for it.
    pub async fn create_account(
        &self,
        details: &requests::CreateAccount,
    ) -> Result<responses::AuthResponse, ClientError> {
        let response =
            self.send_json(Method::POST, "auth/register", details).await?;
        ok_body(response).await
    }

    /// Invalidate the current session token server-side.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let response = self.send_empty(Method::POST, "auth/logout").await?;
        ok_empty(response).await
    }

    /// Fetch the identity the server associates with the current token.
    pub async fn current_user(
        &self,
    ) -> Result<responses::UserProfile, ClientError> {
        let response = self.send_empty(Method::GET, "auth/me").await?;
        ok_body(response).await
    }

    pub async fn update_profile(
        &self,
        details: &requests::UpdateProfile,
    ) -> Result<responses::UserProfile, ClientError> {
        let response =
            self.send_json(Method::PATCH, "profile", details).await?;
        ok_body(response).await
    }

    pub async fn list_courses(
        &self,
        query: &requests::PageQuery,
    ) -> Result<responses::Page<responses::Course>, ClientError> {
        let params = [
            ("page", query.page.to_string()),
            ("page_size", query.page_size.to_string()),
        ];
        let response = self.send_query("courses", &params).await?;
        ok_body(response).await
    }
}

/// A decoded response body: JSON when the server says so, text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    Json(Value),
    Text(String),
}

impl Body {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Json(_) => None,
            Self::Text(text) => Some(text),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing the server's message.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

fn is_json(response: &reqwest::Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

/// Decode a response into `Body`, normalizing non-2xx statuses into errors.
async fn decode_body(response: reqwest::Response) -> Result<Body, ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await?);
    }
    if is_json(&response) {
        Ok(Body::Json(response.json().await?))
    } else {
        Ok(Body::Text(response.text().await?))
    }
}

/// Deserialize a successful response into the desired type, or return an
/// appropriate error.
async fn ok_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await?);
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a ClientError if not.
async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(api_error(response).await?);
    }
    Ok(())
}

/// Build the error for a non-2xx response. The server's `message` field is
/// preferred, then the raw body text, then the bare status code.
async fn api_error(
    response: reqwest::Response,
) -> Result<ClientError, reqwest::Error> {
    let status = response.status();
    let text = response.text().await?;
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|value| value.get("message")?.as_str().map(str::to_owned))
        .unwrap_or(text);
    let message = if message.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        message
    };
    Ok(ClientError::APIError(status, message))
}
