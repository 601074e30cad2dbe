mod common;

use rocket::http::Status;
use rocket::tokio;
use serde_json::json;

use common::*;

#[tokio::test]
async fn test_login_success() {
    let client = client().await;

    let response = client
        .post("/api/1/login")
        .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
        .dispatch()
        .await;

    assert_eq!(response.status(), Status::Ok);
    assert!(response.cookies().get("session").is_some());
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["email"], ADMIN_EMAIL);
    assert_eq!(body["role"], "admin");
    assert!(body["grants"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_login_is_case_insensitive_on_email() {
    let client = client().await;
    login(&client, "SuperAdmin@Example.com", ADMIN_PASSWORD).await;
}

#[tokio::test]
async fn test_bad_credentials() {
    let client = client().await;

    for (email, password) in [
        ("nobody@example.com", "admin"),
        (ADMIN_EMAIL, "wrong_password"),
    ] {
        let response = client
            .post("/api/1/login")
            .json(&json!({ "email": email, "password": password }))
            .dispatch()
            .await;
        assert_eq!(response.status(), Status::Unauthorized);
        let body: serde_json::Value = response.into_json().await.unwrap();
        assert_eq!(body["error"], "Invalid credentials");
    }

    let response = client
        .post("/api/1/login")
        .json(&json!({ "email": "", "password": "admin" }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::BadRequest);
}

#[tokio::test]
async fn test_hello_requires_session() {
    let client = client().await;
    let response = client.get("/api/1/hello").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["status"], 401);
    assert_eq!(body["path"], "/api/1/hello");
}

#[tokio::test]
async fn test_logout_revokes_session() {
    let client = client().await;
    let session = admin_login(&client).await;

    let (status, _) = get(&client, &session, "/api/1/hello").await;
    assert_eq!(status, Status::Ok);

    let response = client
        .post("/api/1/logout")
        .cookie(session.clone())
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok);

    let (status, _) = get(&client, &session, "/api/1/hello").await;
    assert_eq!(status, Status::Unauthorized);
}

#[tokio::test]
async fn test_user_management_is_admin_only() {
    let client = client().await;
    let admin = admin_login(&client).await;
    create_user(&client, &admin, "lead@plant.example", "pw").await;

    let lead = login(&client, "lead@plant.example", "pw").await;
    let (status, _) = get(&client, &lead, "/api/1/Users").await;
    assert_eq!(status, Status::Forbidden);

    let (status, users) = get(&client, &admin, "/api/1/Users").await;
    assert_eq!(status, Status::Ok);
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));
}

#[tokio::test]
async fn test_user_rules() {
    let client = client().await;
    let admin = admin_login(&client).await;
    let id = create_user(&client, &admin, "lead@plant.example", "pw").await;

    let (status, _) = post(
        &client,
        &admin,
        "/api/1/Users",
        json!({ "email": "LEAD@plant.example", "password": "pw" }),
    )
    .await;
    assert_eq!(status, Status::Conflict);

    let (status, _) = post(
        &client,
        &admin,
        "/api/1/Users",
        json!({ "email": "not-an-email", "password": "pw" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);

    let (_, me) = get(&client, &admin, "/api/1/hello").await;
    let admin_id = me["user_id"].as_i64().unwrap();
    let (status, _) = put(
        &client,
        &admin,
        &format!("/api/1/Users/{admin_id}"),
        json!({ "role": "user" }),
    )
    .await;
    assert_eq!(status, Status::BadRequest);

    let status = delete(&client, &admin, &format!("/api/1/Users/{admin_id}")).await;
    assert_eq!(status, Status::BadRequest);

    let (status, updated) = put(
        &client,
        &admin,
        &format!("/api/1/Users/{id}"),
        json!({ "role": "admin" }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(updated["role"], "admin");

    let status = delete(&client, &admin, &format!("/api/1/Users/{id}")).await;
    assert_eq!(status, Status::NoContent);
    let status = delete(&client, &admin, &format!("/api/1/Users/{id}")).await;
    assert_eq!(status, Status::NotFound);
}
