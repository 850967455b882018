//! Smoke tests against a running server
//!
//! Start the server (the memory backend is enough), then:
//! `JWT_SECRET=... cargo test --test live_api -- --ignored`

use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};

use libris_server::models::staff::{StaffClaims, StaffRole};

const BASE_URL: &str = "http://localhost:8080/api/v1";

fn staff_token() -> String {
    let secret = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "change-this-secret-in-production".to_string());
    StaffClaims {
        sub: 1,
        name: "smoke".to_string(),
        role: StaffRole::Admin,
        exp: (Utc::now().timestamp() + 600) as usize,
    }
    .create_token(&secret)
    .expect("Failed to sign token")
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_lend_and_return() {
    let client = Client::new();
    let token = staff_token();
    let cpf = format!("{:011}", Utc::now().timestamp() % 100_000_000_000);

    let response = client
        .post(format!("{}/readers", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Smoke Reader",
            "email": format!("{}@example.com", cpf),
            "cpf": cpf,
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let reader: Value = response.json().await.expect("Failed to parse response");
    let reader_id = reader["data"]["id"].as_i64().expect("No reader ID");

    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "title": "Smoke Book",
            "author": "Nobody",
            "genres": "test",
            "synopsis": "",
            "publication_date": "2020-01-01",
            "stock": 1,
        }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let book: Value = response.json().await.expect("Failed to parse response");
    let book_id = book["data"]["id"].as_i64().expect("No book ID");

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({ "reader_cpf": cpf, "book_ids": [book_id] }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(response.status(), 201);
    let loans: Value = response.json().await.expect("Failed to parse response");
    let loan_id = loans["data"][0]["id"].as_i64().expect("No loan ID");

    let response = client
        .patch(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(response.status().is_success());

    // Cleanup: deleting the reader and book takes the loan with them
    for uri in [
        format!("{}/readers/{}", BASE_URL, reader_id),
        format!("{}/books/{}", BASE_URL, book_id),
    ] {
        let response = client
            .delete(uri)
            .bearer_auth(&token)
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), 204);
    }
}

#[tokio::test]
#[ignore]
async fn test_unauthorized_access() {
    let client = Client::new();

    let response = client
        .post(format!("{}/loans", BASE_URL))
        .json(&json!({ "reader_cpf": "00000000000", "book_ids": [1] }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), 401);
}
