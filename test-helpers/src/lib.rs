//! Spawns the in-memory mock of the learning-platform API on an
//! OS-assigned port and hands back a [`TestApp`] with a ready client, for
//! integration tests of the session and request runtime.

use std::sync::Arc;

use actix_web::web;
use reqwest::StatusCode;

use client::storage::{MemoryStorage, StorageBackend};
use client::{APIClient, ClientError};
use payloads::{Role, requests, responses};

pub mod mock_api;

use mock_api::MockApi;

pub struct TestApp {
    #[allow(unused)]
    pub port: u16,
    pub client: APIClient,
    pub storage: MemoryStorage,
    pub api: web::Data<MockApi>,
}

impl TestApp {
    /// Register alice, leaving the established session on the client.
    pub async fn create_alice_user(
        &self,
    ) -> anyhow::Result<responses::AuthResponse> {
        let details = requests::CreateAccount {
            username: "alice".into(),
            email: "alice@example.com".into(),
            password: "a-password".into(),
            role: Role::Student,
        };
        let auth = self.client.create_account(&details).await?;
        self.client.set_token(Some(&auth.token));
        Ok(auth)
    }

    /// Register alice without keeping a session on the client, for tests
    /// that drive authentication themselves.
    pub async fn seed_alice(&self) -> anyhow::Result<()> {
        self.create_alice_user().await?;
        self.client.set_token(None);
        Ok(())
    }

    /// Credentials matching [`TestApp::seed_alice`].
    pub fn alice_credentials(&self) -> requests::LoginCredentials {
        requests::LoginCredentials {
            email: "alice@example.com".into(),
            password: "a-password".into(),
        }
    }

    /// Put `count` synthetic courses in the catalog.
    pub fn seed_courses(&self, count: usize) {
        self.api.seed_courses(count);
    }
}

/// Spawn the mock API on an OS-assigned port for parallel testing.
pub async fn spawn_app() -> TestApp {
    let api = web::Data::new(MockApi::default());

    let listener = std::net::TcpListener::bind("127.0.0.1:0")
        .expect("failed to bind test port");
    let port = listener.local_addr().unwrap().port();

    let server = {
        let api = api.clone();
        actix_web::HttpServer::new(move || {
            actix_web::App::new()
                .app_data(api.clone())
                .service(mock_api::api_services())
        })
        .workers(1)
        .listen(listener)
        .expect("failed to listen on test port")
        .run()
    };
    tokio::spawn(server);

    let storage = MemoryStorage::default();
    let client = APIClient::new(
        format!("http://127.0.0.1:{port}"),
        Arc::new(storage.clone()) as Arc<dyn StorageBackend>,
    );

    TestApp {
        port,
        client,
        storage,
        api,
    }
}

/// Assert that the result of an API action results in a specific status code.
pub fn assert_status_code<T>(
    result: Result<T, ClientError>,
    expected: StatusCode,
) {
    match result {
        Err(ClientError::APIError(code, _)) => assert_eq!(code, expected),
        _ => panic!("Expected APIError"),
    };
}
