#![allow(dead_code)]

use rocket::http::{Cookie, Status};
use rocket::local::asynchronous::Client;
use serde_json::{Value, json};

use skillmatrix_api::orm::testing::test_rocket;

pub const ADMIN_EMAIL: &str = "superadmin@example.com";
pub const ADMIN_PASSWORD: &str = "admin";

pub async fn client() -> Client {
    Client::tracked(test_rocket())
        .await
        .expect("valid rocket instance")
}

pub async fn login(client: &Client, email: &str, password: &str) -> Cookie<'static> {
    let response = client
        .post("/api/1/login")
        .json(&json!({ "email": email, "password": password }))
        .dispatch()
        .await;
    assert_eq!(response.status(), Status::Ok, "login failed for {email}");
    response
        .cookies()
        .get("session")
        .expect("Session cookie should be set after login")
        .clone()
}

pub async fn admin_login(client: &Client) -> Cookie<'static> {
    login(client, ADMIN_EMAIL, ADMIN_PASSWORD).await
}

pub async fn post(client: &Client, cookie: &Cookie<'static>, url: &str, body: Value) -> (Status, Value) {
    let response = client
        .post(url.to_string())
        .cookie(cookie.clone())
        .json(&body)
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

pub async fn put(client: &Client, cookie: &Cookie<'static>, url: &str, body: Value) -> (Status, Value) {
    let response = client
        .put(url.to_string())
        .cookie(cookie.clone())
        .json(&body)
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

pub async fn get(client: &Client, cookie: &Cookie<'static>, url: &str) -> (Status, Value) {
    let response = client
        .get(url.to_string())
        .cookie(cookie.clone())
        .dispatch()
        .await;
    let status = response.status();
    (status, response.into_json().await.unwrap_or(Value::Null))
}

pub async fn delete(client: &Client, cookie: &Cookie<'static>, url: &str) -> Status {
    client
        .delete(url.to_string())
        .cookie(cookie.clone())
        .dispatch()
        .await
        .status()
}

/// Ids of a department -> line -> team chain plus one station.
pub struct Hierarchy {
    pub department_id: i64,
    pub line_id: i64,
    pub team_id: i64,
    pub station_id: i64,
}

pub async fn create_hierarchy(client: &Client, admin: &Cookie<'static>, prefix: &str) -> Hierarchy {
    let (status, dept) = post(
        client,
        admin,
        "/api/1/Departments",
        json!({ "name": format!("{prefix} Department") }),
    )
    .await;
    assert_eq!(status, Status::Created);
    let department_id = dept["id"].as_i64().unwrap();

    let (status, line) = post(
        client,
        admin,
        "/api/1/ProductionLines",
        json!({ "name": format!("{prefix} Line"), "department_id": department_id }),
    )
    .await;
    assert_eq!(status, Status::Created);
    let line_id = line["id"].as_i64().unwrap();

    let (status, team) = post(
        client,
        admin,
        "/api/1/Teams",
        json!({ "name": format!("{prefix} Team"), "production_line_id": line_id }),
    )
    .await;
    assert_eq!(status, Status::Created);
    let team_id = team["id"].as_i64().unwrap();

    let (status, station) = post(
        client,
        admin,
        &format!("/api/1/Departments/{department_id}/Stations"),
        json!({ "name": format!("{prefix} Station") }),
    )
    .await;
    assert_eq!(status, Status::Created);
    let station_id = station["id"].as_i64().unwrap();

    Hierarchy {
        department_id,
        line_id,
        team_id,
        station_id,
    }
}

pub async fn create_user(client: &Client, admin: &Cookie<'static>, email: &str, password: &str) -> i64 {
    let (status, user) = post(
        client,
        admin,
        "/api/1/Users",
        json!({ "email": email, "password": password, "role": "user" }),
    )
    .await;
    assert_eq!(status, Status::Created);
    user["id"].as_i64().unwrap()
}

pub async fn create_employee(
    client: &Client,
    cookie: &Cookie<'static>,
    team_id: i64,
    first: &str,
    role: &str,
    contract: &str,
) -> i64 {
    let (status, employee) = post(
        client,
        cookie,
        &format!("/api/1/Teams/{team_id}/Employees"),
        json!({
            "first_name": first,
            "last_name": "Tester",
            "role": role,
            "contract_type": contract
        }),
    )
    .await;
    assert_eq!(status, Status::Created);
    employee["id"].as_i64().unwrap()
}

pub async fn grant(
    client: &Client,
    admin: &Cookie<'static>,
    user_id: i64,
    team_id: i64,
    can_read: bool,
    can_write: bool,
) -> Value {
    let (status, body) = put(
        client,
        admin,
        &format!("/api/1/Users/{user_id}/TeamAccess/{team_id}"),
        json!({ "can_read": can_read, "can_write": can_write }),
    )
    .await;
    assert_eq!(status, Status::Ok);
    body
}
