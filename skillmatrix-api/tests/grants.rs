mod common;

use rocket::http::Status;
use rocket::tokio;
use serde_json::json;

use common::*;

#[tokio::test]
async fn test_write_grant_implies_read() {
    let client = client().await;
    let admin = admin_login(&client).await;
    let h = create_hierarchy(&client, &admin, "Assembly").await;
    let user_id = create_user(&client, &admin, "lead@plant.example", "pw").await;

    let stored = grant(&client, &admin, user_id, h.team_id, false, true).await;
    assert_eq!(stored["can_read"], true);
    assert_eq!(stored["can_write"], true);

    grant(&client, &admin, user_id, h.team_id, true, true).await;
    let (status, rows) = get(
        &client,
        &admin,
        &format!("/api/1/Users/{user_id}/TeamAccess"),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert_eq!(rows.as_array().unwrap().len(), 1);

    let lead = login(&client, "lead@plant.example", "pw").await;
    let (status, employees) = get(
        &client,
        &lead,
        &format!("/api/1/Teams/{}/Employees", h.team_id),
    )
    .await;
    assert_eq!(status, Status::Ok);
    assert!(employees.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_grant_requires_known_user_and_team() {
    let client = client().await;
    let admin = admin_login(&client).await;
    let h = create_hierarchy(&client, &admin, "Assembly").await;
    let user_id = create_user(&client, &admin, "lead@plant.example", "pw").await;

    let (status, _) = put(
        &client,
        &admin,
        &format!("/api/1/Users/9999/TeamAccess/{}", h.team_id),
        json!({ "can_read": true }),
    )
    .await;
    assert_eq!(status, Status::NotFound);

    let (status, _) = put(
        &client,
        &admin,
        &format!("/api/1/Users/{user_id}/TeamAccess/9999"),
        json!({ "can_read": true }),
    )
    .await;
    assert_eq!(status, Status::NotFound);
}

#[tokio::test]
async fn test_read_only_grant_cannot_edit() {
    let client = client().await;
    let admin = admin_login(&client).await;
    let h = create_hierarchy(&client, &admin, "Assembly").await;
    let employee = create_employee(&client, &admin, h.team_id, "Ann", "Operator", "Permanent").await;
    let user_id = create_user(&client, &admin, "viewer@plant.example", "pw").await;
    grant(&client, &admin, user_id, h.team_id, true, false).await;
    let viewer = login(&client, "viewer@plant.example", "pw").await;

    let (status, matrix) = get(&client, &viewer, &format!("/api/1/Teams/{}/Matrix", h.team_id)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(matrix["employees"].as_array().unwrap().len(), 1);

    let (status, _) = put(
        &client,
        &viewer,
        "/api/1/Ratings",
        json!({ "employee_id": employee, "station_id": h.station_id, "rating": 3 }),
    )
    .await;
    assert_eq!(status, Status::Forbidden);

    let (status, _) = post(
        &client,
        &viewer,
        &format!("/api/1/Teams/{}/Employees", h.team_id),
        json!({ "first_name": "Bob", "last_name": "Doe", "role": "Operator", "contract_type": "Temporary" }),
    )
    .await;
    assert_eq!(status, Status::Forbidden);

    let (status, _) = post(
        &client,
        &viewer,
        "/api/1/Teams",
        json!({ "name": "Shadow", "production_line_id": h.line_id }),
    )
    .await;
    assert_eq!(status, Status::Forbidden);
}

#[tokio::test]
async fn test_revoke_takes_effect_on_next_request() {
    let client = client().await;
    let admin = admin_login(&client).await;
    let h = create_hierarchy(&client, &admin, "Assembly").await;
    let user_id = create_user(&client, &admin, "lead@plant.example", "pw").await;
    grant(&client, &admin, user_id, h.team_id, true, true).await;
    let lead = login(&client, "lead@plant.example", "pw").await;

    let url = format!("/api/1/Teams/{}/Employees", h.team_id);
    let (status, _) = get(&client, &lead, &url).await;
    assert_eq!(status, Status::Ok);

    let status = delete(
        &client,
        &admin,
        &format!("/api/1/Users/{user_id}/TeamAccess/{}", h.team_id),
    )
    .await;
    assert_eq!(status, Status::NoContent);

    let (status, _) = get(&client, &lead, &url).await;
    assert_eq!(status, Status::Forbidden);

    let (_, teams) = get(&client, &lead, "/api/1/Teams").await;
    assert!(teams.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_team_access_listing_is_self_or_admin() {
    let client = client().await;
    let admin = admin_login(&client).await;
    let h = create_hierarchy(&client, &admin, "Assembly").await;
    let first = create_user(&client, &admin, "first@plant.example", "pw").await;
    let second = create_user(&client, &admin, "second@plant.example", "pw").await;
    grant(&client, &admin, first, h.team_id, true, false).await;
    let session = login(&client, "first@plant.example", "pw").await;

    let (status, rows) = get(&client, &session, &format!("/api/1/Users/{first}/TeamAccess")).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(rows[0]["team_id"], h.team_id);

    let (status, _) = get(&client, &session, &format!("/api/1/Users/{second}/TeamAccess")).await;
    assert_eq!(status, Status::Forbidden);

    let (status, _) = put(
        &client,
        &session,
        &format!("/api/1/Users/{first}/TeamAccess/{}", h.team_id),
        json!({ "can_write": true }),
    )
    .await;
    assert_eq!(status, Status::Forbidden);
}

#[tokio::test]
async fn test_login_reports_grants() {
    let client = client().await;
    let admin = admin_login(&client).await;
    let h = create_hierarchy(&client, &admin, "Assembly").await;
    let user_id = create_user(&client, &admin, "lead@plant.example", "pw").await;
    grant(&client, &admin, user_id, h.team_id, false, true).await;

    let response = client
        .post("/api/1/login")
        .json(&json!({ "email": "lead@plant.example", "password": "pw" }))
        .dispatch()
        .await;
    let body: serde_json::Value = response.into_json().await.unwrap();
    assert_eq!(body["role"], "user");
    assert_eq!(
        body["grants"],
        json!([{ "team_id": h.team_id, "can_read": true, "can_write": true }])
    );
}

#[tokio::test]
async fn test_single_grant_matrix_over_http() {
    let client = client().await;
    let admin = admin_login(&client).await;
    let mine = create_hierarchy(&client, &admin, "Press").await;
    let theirs = create_hierarchy(&client, &admin, "Forge").await;
    create_employee(&client, &admin, mine.team_id, "Ann", "Hancho", "Permanent").await;
    let user_id = create_user(&client, &admin, "hancho@plant.example", "pw").await;
    grant(&client, &admin, user_id, mine.team_id, true, true).await;
    let hancho = login(&client, "hancho@plant.example", "pw").await;

    let (status, context) = get(&client, &hancho, "/api/1/Matrix/Context").await;
    assert_eq!(status, Status::Ok);
    assert_eq!(
        context["auto_selection"],
        json!({
            "department_id": mine.department_id,
            "production_line_id": mine.line_id,
            "team_id": mine.team_id
        })
    );
    assert_eq!(context["departments"].as_array().unwrap().len(), 1);

    let (status, matrix) = get(&client, &hancho, &format!("/api/1/Teams/{}/Matrix", mine.team_id)).await;
    assert_eq!(status, Status::Ok);
    assert_eq!(matrix["placement"]["team_id"], mine.team_id);
    assert_eq!(matrix["placement"]["department_id"], mine.department_id);
    assert_eq!(matrix["employees"].as_array().unwrap().len(), 1);
    assert_eq!(matrix["stations"].as_array().unwrap().len(), 1);

    let (status, _) = get(&client, &hancho, &format!("/api/1/Teams/{}/Matrix", theirs.team_id)).await;
    assert_eq!(status, Status::Forbidden);
}
