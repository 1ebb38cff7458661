//! Access control
//!
//! The route allow-list (who reaches a handler) and the ownership checks
//! (which records they may touch once there), exercised over HTTP.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{id_of, TestApp};
use serde_json::json;
use tower::ServiceExt;

// =============================================================================
// Allow-list
// =============================================================================

#[tokio::test]
async fn test_missing_and_bad_tokens() {
    let app = TestApp::new();

    let (status, body) = app
        .request(Method::GET, "/api/auth/me", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 401);
    assert!(body["error"].is_string());

    let (status, _) = app.get("/api/auth/me", "not-a-token").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Public routes need nothing
    let (status, health) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "ok");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let app = TestApp::new();
    let (student, _) = app.student("s@school.edu", None).await;

    let (status, body) = app.get("/api/nowhere", &student).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);

    // Known path, unlisted method
    let (status, _) = app
        .request(Method::PUT, "/api/jobs", Some(student.as_str()), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_role_restricted_routes() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let (teacher, _) = app.teacher(&admin, "t@school.edu").await;
    let (student, student_id) = app.student("s@school.edu", None).await;

    let cases = [
        (Method::GET, "/api/users".to_string(), &student),
        (Method::GET, "/api/invites".to_string(), &teacher),
        (Method::GET, "/api/stats/overview".to_string(), &teacher),
        (Method::GET, "/api/stats/weaknesses".to_string(), &student),
        (Method::GET, format!("/api/checklists/{}", student_id), &student),
        (Method::GET, "/api/checklists/me".to_string(), &teacher),
    ];
    for (method, path, token) in cases {
        let (status, _) = app.request(method.clone(), &path, Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN, "{} {}", method, path);
    }

    let (status, _) = app
        .post("/api/sections", &teacher, json!({ "name": "Mine" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            "/api/submissions",
            &teacher,
            json!({ "kind": "resume", "title": "x", "content": "y" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_deleted_user_token_is_stale() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let (student, student_id) = app.student("s@school.edu", None).await;

    let (status, _) = app
        .delete(&format!("/api/users/{}", student_id), &admin)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get("/api/auth/me", &student).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_role_change_invalidates_token() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let (student, student_id) = app.student("s@school.edu", None).await;

    let (status, _) = app
        .patch(
            &format!("/api/users/{}", student_id),
            &admin,
            json!({ "role": "teacher" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get("/api/auth/me", &student).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cors_preflight_bypasses_auth() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/jobs")
        .header(header::ORIGIN, "http://localhost:5173")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
}

// =============================================================================
// Ownership
// =============================================================================

#[tokio::test]
async fn test_teacher_limited_to_own_students() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let (teacher_a, teacher_a_id) = app.teacher(&admin, "a@school.edu").await;
    let (_, teacher_b_id) = app.teacher(&admin, "b@school.edu").await;
    let (section_a, code_a) = app.section(&admin, "A", &teacher_a_id).await;
    let (section_b, code_b) = app.section(&admin, "B", &teacher_b_id).await;

    let (mine, mine_id) = app.student("mine@school.edu", Some(code_a.as_str())).await;
    let (theirs, theirs_id) = app.student("theirs@school.edu", Some(code_b.as_str())).await;

    for student in [&mine, &theirs] {
        let (status, _) = app
            .post(
                "/api/submissions",
                student,
                json!({ "kind": "resume", "title": "Resume", "content": "Text" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, users) = app.get("/api/users", &teacher_a).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users["total"], 1);
    assert_eq!(users["users"][0]["id"], mine_id.as_str());

    let (status, _) = app
        .get(&format!("/api/users/{}", theirs_id), &teacher_a)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, submissions) = app.get("/api/submissions", &teacher_a).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(submissions["total"], 1);
    assert_eq!(submissions["submissions"][0]["student_id"], mine_id.as_str());

    let (status, _) = app
        .get(&format!("/api/checklists/{}", theirs_id), &teacher_a)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(&format!("/api/sections/{}", section_b), &teacher_a)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .get(
            &format!("/api/stats/weaknesses?section_id={}", section_b),
            &teacher_a,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Jobs can only target sections the teacher leads
    let (status, _) = app
        .post(
            "/api/jobs",
            &teacher_a,
            json!({
                "title": "Intern",
                "company": "Acme",
                "description": "Summer",
                "section_id": section_b,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .post(
            &format!("/api/sections/{}/students", section_a),
            &teacher_a,
            json!({ "student_id": theirs_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_students_see_only_their_own_work() {
    let app = TestApp::new();
    let (alice, _) = app.student("alice@school.edu", None).await;
    let (bob, _) = app.student("bob@school.edu", None).await;

    let (_, submission) = app
        .post(
            "/api/submissions",
            &alice,
            json!({ "kind": "cover_letter", "title": "Letter", "content": "Dear team" }),
        )
        .await;
    let submission_id = id_of(&submission);

    let (status, _) = app
        .get(&format!("/api/submissions/{}", submission_id), &bob)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .put(
            &format!("/api/submissions/{}/feedback", submission_id),
            &bob,
            json!({ "feedback": { "score": 100 } }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .delete(&format!("/api/submissions/{}", submission_id), &bob)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, list) = app.get("/api/submissions", &bob).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 0);

    let (status, _) = app
        .delete(&format!("/api/submissions/{}", submission_id), &alice)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_section_scoped_jobs_are_hidden() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let (teacher, teacher_id) = app.teacher(&admin, "t@school.edu").await;
    let (section_id, code) = app.section(&admin, "A", &teacher_id).await;

    let (_, scoped) = app
        .post(
            "/api/jobs",
            &teacher,
            json!({
                "title": "Scoped",
                "company": "Acme",
                "description": "Only for A",
                "section_id": section_id,
            }),
        )
        .await;
    let (status, _) = app
        .post(
            "/api/jobs",
            &teacher,
            json!({ "title": "Open", "company": "Acme", "description": "Everyone" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let scoped_id = id_of(&scoped);

    let (insider, _) = app.student("in@school.edu", Some(code.as_str())).await;
    let (outsider, _) = app.student("out@school.edu", None).await;

    let (_, jobs) = app.get("/api/jobs", &insider).await;
    assert_eq!(jobs["total"], 2);
    let (_, jobs) = app.get("/api/jobs", &outsider).await;
    assert_eq!(jobs["total"], 1);

    let (status, _) = app
        .get(&format!("/api/jobs/{}", scoped_id), &outsider)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .post(
            "/api/submissions",
            &outsider,
            json!({ "kind": "resume", "title": "R", "content": "C", "job_id": scoped_id }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Input validation
// =============================================================================

#[tokio::test]
async fn test_malformed_bodies_are_400() {
    let app = TestApp::new();
    let (student, _) = app.student("s@school.edu", None).await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/submissions")
        .header(header::AUTHORIZATION, format!("Bearer {}", student))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/submissions",
            &student,
            json!({ "kind": "resume", "title": "   ", "content": "C" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            "/api/submissions",
            &student,
            json!({ "kind": "poem", "title": "T", "content": "C" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "X", "email": "not-an-email", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "name": "X", "email": "s@school.edu", "password": "password123" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_malformed_path_and_query_are_json_400() {
    let app = TestApp::new();
    let admin = app.admin().await;
    let (student, _) = app.student("s@school.edu", None).await;

    for path in [
        "/api/jobs/not-a-uuid",
        "/api/submissions/12345",
        "/api/submissions/not-a-uuid/prompt",
    ] {
        let (status, body) = app.get(path, &student).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(body["code"], 400, "{}", path);
        assert!(body["error"].is_string(), "{}", path);
    }

    // Both segments of a two-id route are checked
    let (status, body) = app
        .delete(
            &format!("/api/sections/{}/students/nope", uuid::Uuid::new_v4()),
            &admin,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 400);

    for path in [
        "/api/submissions?status=bogus",
        "/api/submissions?kind=poem",
        "/api/users?role=wizard",
        "/api/stats/weaknesses?limit=many",
    ] {
        let (status, body) = app.get(path, &admin).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", path);
        assert_eq!(body["code"], 400, "{}", path);
    }

    // Well-formed ids still reach the handler
    let (status, body) = app
        .get(&format!("/api/jobs/{}", uuid::Uuid::new_v4()), &student)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], 404);
}

#[tokio::test]
async fn test_invite_for_existing_account_conflicts() {
    let app = TestApp::new();
    let admin = app.admin().await;
    app.student("s@school.edu", None).await;

    let (status, _) = app
        .post("/api/invites", &admin, json!({ "email": "s@school.edu" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Wrong address for the code
    let (status, _) = app
        .post("/api/invites", &admin, json!({ "email": "t@school.edu" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let code = app.last_invite_code("t@school.edu");

    let (status, _) = app
        .request(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Sneaky",
                "email": "sneaky@school.edu",
                "password": "password123",
                "invite_code": code,
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, list) = app.get("/api/invites", &admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["total"], 1);
    assert_eq!(list["invites"][0]["status"], "pending");
}
