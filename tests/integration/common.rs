use rocket::local::blocking::Client;

/// Wrapper around `Client` that deletes its temp DB file(s) on drop, so
/// repeated test runs don't accumulate files under `/tmp`.
pub struct TestClient {
    client: Option<Client>,
    db_path: String,
}

impl Drop for TestClient {
    fn drop(&mut self) {
        drop(self.client.take());
        let _ = std::fs::remove_file(&self.db_path);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_path));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_path));
    }
}

impl std::ops::Deref for TestClient {
    type Target = Client;
    fn deref(&self) -> &Client {
        self.client.as_ref().unwrap()
    }
}

pub fn test_client() -> TestClient {
    let db_path = format!(
        "/tmp/ubl_core_test_{}.db",
        uuid::Uuid::new_v4().to_string().split('-').next().unwrap()
    );
    let config = ubl_core::config::Config {
        database_path: db_path.clone(),
        ..ubl_core::config::Config::default()
    };
    let rocket = ubl_core::rocket_with_config(config);
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestClient { client: Some(client), db_path }
}

pub fn test_client_with_config(mut config: ubl_core::config::Config) -> TestClient {
    let db_path = format!(
        "/tmp/ubl_core_test_{}.db",
        uuid::Uuid::new_v4().to_string().split('-').next().unwrap()
    );
    config.database_path = db_path.clone();
    let rocket = ubl_core::rocket_with_config(config);
    let client = Client::tracked(rocket).expect("valid rocket instance");
    TestClient { client: Some(client), db_path }
}

/// Standard request headers for user `user_id` at `email`.
pub fn identity_headers(user_id: &str, email: &str) -> Vec<rocket::http::Header<'static>> {
    vec![
        rocket::http::Header::new("X-User-Id", user_id.to_string()),
        rocket::http::Header::new("X-User-Email", email.to_string()),
    ]
}
