//! API integration tests against a running server.
//!
//! Start the server with RUN_MODE=testing (bootstrap admin admin/admin), then
//! run: cargo test --test api_tests -- --ignored

use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Helper to get an authenticated admin token
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

fn unique(tag: &str) -> String {
    format!("{}-{}", tag, Utc::now().timestamp_nanos_opt().unwrap_or_default())
}

async fn create_borrower(client: &Client, token: &str) -> i64 {
    let response = client
        .post(format!("{}/users", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "login": unique("reader"),
            "password": "reader-pass",
            "firstname": "Lucía",
            "lastname": "García",
            "account_type": "borrower"
        }))
        .send()
        .await
        .expect("Failed to create borrower");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    body["id"].as_i64().expect("No user id")
}

async fn create_book(client: &Client, token: &str, copies: i32) -> i64 {
    let response = client
        .post(format!("{}/books", BASE_URL))
        .bearer_auth(token)
        .json(&json!({
            "title": unique("Rayuela"),
            "author": "Julio Cortázar",
            "total_copies": copies
        }))
        .send()
        .await
        .expect("Failed to create book");
    assert_eq!(response.status(), StatusCode::CREATED);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["available_copies"], copies);
    body["id"].as_i64().expect("No book id")
}

async fn open_loan(client: &Client, token: &str, user_id: i64, book_id: i64) -> reqwest::Response {
    client
        .post(format!("{}/loans", BASE_URL))
        .bearer_auth(token)
        .json(&json!({ "user_id": user_id, "book_id": book_id }))
        .send()
        .await
        .expect("Failed to open loan")
}

async fn get_book(client: &Client, token: &str, book_id: i64) -> Value {
    client
        .get(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to get book")
        .json()
        .await
        .unwrap()
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
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["account_type"], "admin");
    assert!(body["user"].get("password").is_none());
}

#[tokio::test]
#[ignore]
async fn test_login_with_wrong_password() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": "admin",
            "password": "not-the-password"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore]
async fn test_loan_lifecycle() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let user_id = create_borrower(&client, &token).await;
    let book_id = create_book(&client, &token, 1).await;

    let response = open_loan(&client, &token, user_id, book_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let loan: Value = response.json().await.unwrap();
    assert_eq!(loan["status"], "open");
    assert_eq!(get_book(&client, &token, book_id).await["available_copies"], 0);

    // Last copy is out
    let other = create_borrower(&client, &token).await;
    let response = open_loan(&client, &token, other, book_id).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let loan_id = loan["id"].as_i64().unwrap();
    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "returned");
    assert_eq!(body["loan"]["status"], "closed");
    assert_eq!(get_book(&client, &token, book_id).await["available_copies"], 1);

    let response = client
        .post(format!("{}/loans/{}/return", BASE_URL, loan_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
#[ignore]
async fn test_unknown_book_is_not_found() {
    let client = Client::new();
    let token = get_auth_token(&client).await;
    let user_id = create_borrower(&client, &token).await;

    let response = open_loan(&client, &token, user_id, i32::MAX as i64).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore]
async fn test_book_with_loans_cannot_be_deleted() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let user_id = create_borrower(&client, &token).await;
    let book_id = create_book(&client, &token, 2).await;
    let response = open_loan(&client, &token, user_id, book_id).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = client
        .delete(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // Cannot shrink below the copy on loan
    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .json(&json!({ "total_copies": 0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = client
        .put(format!("{}/books/{}", BASE_URL, book_id))
        .bearer_auth(&token)
        .json(&json!({ "total_copies": 4 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["total_copies"], 4);
    assert_eq!(body["available_copies"], 3);
}

#[tokio::test]
#[ignore]
async fn test_ledger_consistency_report() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/stats/consistency", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["consistent"], true);
}
