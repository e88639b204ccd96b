use axum::{
  Router,
  body::Body,
  http::{HeaderMap, Request, StatusCode, header},
};
use readtrack_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use super::*;

async fn make_app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(AppState::new(store, AuthSettings::default()))
}

struct Reply {
  status:  StatusCode,
  headers: HeaderMap,
  body:    Value,
}

async fn send_raw(
  app: &Router,
  method: &str,
  uri: &str,
  headers: Vec<(header::HeaderName, String)>,
  body: &str,
) -> Reply {
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = builder.body(Body::from(body.to_string())).unwrap();
  let resp = app.clone().oneshot(req).await.unwrap();

  let status = resp.status();
  let headers = resp.headers().clone();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
  Reply { status, headers, body }
}

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> Reply {
  let mut headers = Vec::new();
  if let Some(token) = token {
    headers.push((header::AUTHORIZATION, format!("Bearer {token}")));
  }
  let body = match body {
    Some(body) => {
      headers.push((header::CONTENT_TYPE, "application/json".to_string()));
      body.to_string()
    }
    None => String::new(),
  };
  send_raw(app, method, uri, headers, &body).await
}

/// Register and log in `email`; returns the session token and user id.
async fn sign_in(app: &Router, email: &str) -> (String, i64) {
  let reply = send(
    app,
    "POST",
    "/book/registerUser",
    None,
    Some(json!({ "email": email, "password": "correct horse" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);

  let reply = send(
    app,
    "POST",
    "/book/loginUser",
    None,
    Some(json!({ "email": email, "password": "correct horse" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
  let token = reply.body["user"]["token"].as_str().unwrap().to_string();
  let user_id = reply.body["user"]["user_id"].as_i64().unwrap();
  (token, user_id)
}

async fn add_book(app: &Router, token: &str, total_page: i64, status: &str) -> Value {
  let reply = send(
    app,
    "POST",
    "/book/addBook",
    Some(token),
    Some(json!({
      "title": "Dune",
      "author": "Frank Herbert",
      "total_page": total_page,
      "status": status,
      "page_read": 0,
    })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
  reply.body["book"].clone()
}

fn book_uri(path: &str, book: &Value) -> String {
  format!("/book/{path}/{}", book["id"].as_i64().unwrap())
}

// ── Accounts ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn register_and_login_issue_a_session_cookie() {
  let app = make_app().await;
  let reply = send(
    &app,
    "POST",
    "/book/registerUser",
    None,
    Some(json!({ "email": "ada@example.com", "password": "correct horse" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::CREATED);
  assert_eq!(reply.body["user"]["email"], "ada@example.com");
  assert!(reply.body["user"].get("password_hash").is_none());

  let reply = send(
    &app,
    "POST",
    "/book/loginUser",
    None,
    Some(json!({ "email": "ada@example.com", "password": "correct horse" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::OK);
  let token = reply.body["user"]["token"].as_str().unwrap();
  let cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
  assert!(cookie.starts_with(&format!("token={token};")), "cookie: {cookie}");
  assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn duplicate_registration_conflicts() {
  let app = make_app().await;
  sign_in(&app, "ada@example.com").await;
  let reply = send(
    &app,
    "POST",
    "/book/registerUser",
    None,
    Some(json!({ "email": "ADA@example.com", "password": "another secret" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn registration_validates_input() {
  let app = make_app().await;
  for body in [
    json!({ "email": "ada@example.com" }),
    json!({ "email": "ada@example.com", "password": "short" }),
    json!({ "email": "not-an-email", "password": "correct horse" }),
    json!({ "email": "ada@example.com", "password": "correct horse", "utc_offset_minutes": 900 }),
  ] {
    let reply = send(&app, "POST", "/book/registerUser", None, Some(body.clone())).await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST, "body: {body}");
  }
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
  let app = make_app().await;
  sign_in(&app, "ada@example.com").await;

  for (email, password) in [
    ("ada@example.com", "wrong password"),
    ("nobody@example.com", "correct horse"),
  ] {
    let reply = send(
      &app,
      "POST",
      "/book/loginUser",
      None,
      Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(reply.body["message"], "Invalid email or password.");
  }
}

#[tokio::test]
async fn missing_token_is_401_and_bad_token_is_403() {
  let app = make_app().await;

  let reply = send(&app, "GET", "/book/viewBooks", None, None).await;
  assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
  assert_eq!(reply.body["message"], "Access denied. No token provided.");

  let reply = send(&app, "GET", "/book/viewBooks", Some("forged"), None).await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
  assert_eq!(reply.body["message"], "Invalid token. Please log in again.");
}

#[tokio::test]
async fn session_cookie_authenticates() {
  let app = make_app().await;
  let (token, _) = sign_in(&app, "ada@example.com").await;

  let reply = send_raw(
    &app,
    "GET",
    "/book/viewBooks",
    vec![(header::COOKIE, format!("token={token}"))],
    "",
  )
  .await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["books"], json!([]));
}

#[tokio::test]
async fn logout_ends_the_session() {
  let app = make_app().await;
  let (token, _) = sign_in(&app, "ada@example.com").await;

  let reply = send(&app, "POST", "/book/logout", Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::OK);
  let cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
  assert!(cookie.contains("Max-Age=0"));

  let reply = send(&app, "GET", "/book/viewBooks", Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

// ── Books ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn add_book_accepts_numeric_strings_and_computes_percentage() {
  let app = make_app().await;
  let (token, user_id) = sign_in(&app, "ada@example.com").await;

  let reply = send(
    &app,
    "POST",
    "/book/addBook",
    Some(&token),
    Some(json!({
      "title": "Dune",
      "author": "Frank Herbert",
      "total_page": "200",
      "status": "Current Read",
      "page_read": "50",
      "user_id": user_id,
    })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::CREATED);
  assert_eq!(reply.body["book"]["percentage_completed"], json!(25.0));
  assert_eq!(reply.body["book"]["status"], "Current Read");
  assert_eq!(reply.body["book"]["user_id"], json!(user_id));
}

#[tokio::test]
async fn add_book_rejects_bad_input() {
  let app = make_app().await;
  let (token, user_id) = sign_in(&app, "ada@example.com").await;

  let missing = json!({ "title": "Dune", "author": "Frank Herbert" });
  let reply = send(&app, "POST", "/book/addBook", Some(&token), Some(missing)).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["message"], "Missing required fields");

  let bad_status = json!({
    "title": "Dune", "author": "Frank Herbert",
    "total_page": 10, "page_read": 0, "status": "Abandoned",
  });
  let reply = send(&app, "POST", "/book/addBook", Some(&token), Some(bad_status)).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);

  let other_owner = json!({
    "title": "Dune", "author": "Frank Herbert",
    "total_page": 10, "page_read": 0, "status": "To Be Read",
    "user_id": user_id + 1,
  });
  let reply = send(&app, "POST", "/book/addBook", Some(&token), Some(other_owner)).await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
  let app = make_app().await;
  let (token, _) = sign_in(&app, "ada@example.com").await;

  let reply = send_raw(
    &app,
    "POST",
    "/book/addBook",
    vec![
      (header::AUTHORIZATION, format!("Bearer {token}")),
      (header::CONTENT_TYPE, "application/json".to_string()),
    ],
    "{not json",
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert!(reply.body["message"].is_string());
}

#[tokio::test]
async fn books_are_private_to_their_owner() {
  let app = make_app().await;
  let (ada, _) = sign_in(&app, "ada@example.com").await;
  let (bob, _) = sign_in(&app, "bob@example.com").await;
  let book = add_book(&app, &ada, 100, "To Be Read").await;

  let reply = send(&app, "GET", &book_uri("viewBook", &book), Some(&bob), None).await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);

  let reply = send(&app, "GET", "/book/viewBooks", Some(&bob), None).await;
  assert_eq!(reply.body["books"], json!([]));

  let reply = send(&app, "GET", &book_uri("viewBook", &book), Some(&ada), None).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["book"], book);
}

#[tokio::test]
async fn non_numeric_book_id_is_a_bad_request() {
  let app = make_app().await;
  let (token, _) = sign_in(&app, "ada@example.com").await;
  let reply = send(&app, "GET", "/book/viewBook/abc", Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn status_transitions_are_guarded() {
  let app = make_app().await;
  let (token, _) = sign_in(&app, "ada@example.com").await;
  let book = add_book(&app, &token, 100, "To Be Read").await;

  let reply = send(&app, "PUT", &book_uri("closeBook", &book), Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);
  assert_eq!(reply.body["message"], "Book not found or not currently being read");

  let reply = send(&app, "PUT", &book_uri("startReading", &book), Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["book"]["status"], "Current Read");

  let reply = send(&app, "PUT", &book_uri("startReading", &book), Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);
  assert_eq!(reply.body["message"], "Book not found or already in progress");

  let reply = send(&app, "PUT", &book_uri("closeBook", &book), Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["book"]["status"], "To Be Read");
}

#[tokio::test]
async fn update_book_recomputes_percentage() {
  let app = make_app().await;
  let (token, _) = sign_in(&app, "ada@example.com").await;
  let book = add_book(&app, &token, 100, "To Be Read").await;
  let uri = book_uri("updateProgress", &book);
  send(&app, "PUT", &uri, Some(&token), Some(json!({ "initialPage": 0, "lastPage": 50 }))).await;

  let reply = send(
    &app,
    "PUT",
    &book_uri("updateBook", &book),
    Some(&token),
    Some(json!({ "title": "Dune Messiah", "author": "Frank Herbert", "total_pages": 200 })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["book"]["title"], "Dune Messiah");
  assert_eq!(reply.body["book"]["total_page"], json!(200));
  assert_eq!(reply.body["book"]["percentage_completed"], json!(25.0));

  let reply = send(
    &app,
    "PUT",
    &book_uri("updateBook", &book),
    Some(&token),
    Some(json!({ "title": "Dune Messiah" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_notes_and_delete() {
  let app = make_app().await;
  let (token, _) = sign_in(&app, "ada@example.com").await;
  let book = add_book(&app, &token, 100, "To Be Read").await;

  let reply = send(
    &app,
    "PUT",
    &book_uri("updateNotes", &book),
    Some(&token),
    Some(json!({ "notes": "spice must flow" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["book"]["notes"], "spice must flow");

  let reply = send(&app, "DELETE", &book_uri("deleteBook", &book), Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["deletedBook"]["notes"], "spice must flow");

  let reply = send(&app, "DELETE", &book_uri("deleteBook", &book), Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);
  let reply = send(&app, "GET", &book_uri("viewBook", &book), Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

// ── Progress ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn progress_updates_percentage_then_finishes_the_book() {
  let app = make_app().await;
  let (token, _) = sign_in(&app, "ada@example.com").await;
  let book = add_book(&app, &token, 100, "To Be Read").await;
  send(&app, "PUT", &book_uri("startReading", &book), Some(&token), None).await;
  let uri = book_uri("updateProgress", &book);

  let reply = send(&app, "PUT", &uri, Some(&token), Some(json!({ "initialPage": 0, "lastPage": 60 })))
    .await;
  assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
  assert_eq!(reply.body["book"]["page_read"], json!(60));
  assert_eq!(reply.body["book"]["percentage_completed"], json!(60.0));
  assert_eq!(reply.body["book"]["status"], "Current Read");

  let reply = send(
    &app,
    "PUT",
    &uri,
    Some(&token),
    Some(json!({ "initialPage": "60", "lastPage": "100" })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
  assert_eq!(reply.body["book"]["percentage_completed"], json!(100.0));
  assert_eq!(reply.body["book"]["status"], "Finish");

  let reply = send(&app, "GET", "/book/readingHistory", Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::OK);
  let records = reply.body["readingRecords"].as_array().unwrap();
  assert_eq!(records.len(), 1);
  assert_eq!(records[0]["start_page"], json!(0));
  assert_eq!(records[0]["end_page"], json!(100));
  assert_eq!(records[0]["book_title"], "Dune");
  assert_eq!(records[0]["date"].as_str().unwrap().len(), "2024-06-01".len());

  // A finished book cannot be started again.
  let reply = send(&app, "PUT", &book_uri("startReading", &book), Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn progress_rejects_invalid_pages() {
  let app = make_app().await;
  let (token, _) = sign_in(&app, "ada@example.com").await;
  let book = add_book(&app, &token, 100, "Current Read").await;
  let uri = book_uri("updateProgress", &book);

  let reply = send(&app, "PUT", &uri, Some(&token), Some(json!({ "initialPage": 0, "lastPage": "ten" })))
    .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["message"], "Invalid parameters.");

  let reply = send(&app, "PUT", &uri, Some(&token), Some(json!({ "initialPage": "abc", "lastPage": 10 })))
    .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["message"], "Invalid initialPage, it must be an integer.");

  // The rejected session left the book untouched.
  let reply = send(&app, "GET", &book_uri("viewBook", &book), Some(&token), None).await;
  assert_eq!(reply.body["book"]["page_read"], json!(0));

  let reply = send(
    &app,
    "PUT",
    "/book/updateProgress/abc",
    Some(&token),
    Some(json!({ "initialPage": 0, "lastPage": 10 })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
  assert_eq!(reply.body["message"], "Invalid parameters.");
}

#[tokio::test]
async fn progress_on_a_missing_book_is_404() {
  let app = make_app().await;
  let (token, _) = sign_in(&app, "ada@example.com").await;
  let reply = send(
    &app,
    "PUT",
    "/book/updateProgress/999",
    Some(&token),
    Some(json!({ "initialPage": 0, "lastPage": 10 })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);
  assert_eq!(reply.body["message"], "Book not found");

  let reply = send(&app, "GET", "/book/readingHistory", Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn storage_failure_during_progress_reports_the_cause() {
  let conn = tokio_rusqlite::Connection::open_in_memory().await.unwrap();
  let store = SqliteStore::from_connection(conn.clone()).await.unwrap();
  let app = api_router(AppState::new(store, AuthSettings::default()));
  let (token, _) = sign_in(&app, "ada@example.com").await;
  let book = add_book(&app, &token, 100, "Current Read").await;

  conn
    .call(|conn| {
      conn.execute_batch(
        "CREATE TRIGGER history_unavailable BEFORE INSERT ON reading_history
         BEGIN SELECT RAISE(ABORT, 'history unavailable'); END;",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let reply = send(
    &app,
    "PUT",
    &book_uri("updateProgress", &book),
    Some(&token),
    Some(json!({ "initialPage": 0, "lastPage": 100 })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(reply.body["message"], "Failed to update progress");
  let error = reply.body["error"].as_str().unwrap();
  assert!(error.contains("history unavailable"), "error: {error}");

  // The book row was rolled back along with the history insert.
  let reply = send(&app, "GET", &book_uri("viewBook", &book), Some(&token), None).await;
  assert_eq!(reply.body["book"]["page_read"], json!(0));
  assert_eq!(reply.body["book"]["status"], "Current Read");
}

#[tokio::test]
async fn progress_rejects_another_users_id() {
  let app = make_app().await;
  let (token, user_id) = sign_in(&app, "ada@example.com").await;
  let book = add_book(&app, &token, 100, "Current Read").await;
  let reply = send(
    &app,
    "PUT",
    &book_uri("updateProgress", &book),
    Some(&token),
    Some(json!({ "initialPage": 0, "lastPage": 10, "userId": user_id + 7 })),
  )
  .await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
}

// ── History ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn history_is_scoped_and_survives_deletion() {
  let app = make_app().await;
  let (token, user_id) = sign_in(&app, "ada@example.com").await;

  let reply = send(&app, "GET", "/book/readingHistory", Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);
  assert_eq!(reply.body["message"], "No reading records found");

  let book = add_book(&app, &token, 300, "Current Read").await;
  send(
    &app,
    "PUT",
    &book_uri("updateProgress", &book),
    Some(&token),
    Some(json!({ "initialPage": 0, "lastPage": 30 })),
  )
  .await;
  send(&app, "DELETE", &book_uri("deleteBook", &book), Some(&token), None).await;

  let uri = format!("/book/readingHistory?userId={user_id}");
  let reply = send(&app, "GET", &uri, Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["readingRecords"].as_array().unwrap().len(), 1);

  let uri = format!("/book/readingHistory?userId={}", user_id + 1);
  let reply = send(&app, "GET", &uri, Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);

  let reply = send(&app, "GET", "/book/readingHistory?userId=abc", Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

// ── Learning list ───────────────────────────────────────────────────────────

#[tokio::test]
async fn learning_list_is_created_then_updated() {
  let app = make_app().await;
  let (token, user_id) = sign_in(&app, "ada@example.com").await;
  let uri = format!("/book/learning/{user_id}");

  let reply = send(&app, "GET", "/book/learning", Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::NOT_FOUND);

  let reply = send(&app, "PUT", &uri, Some(&token), Some(json!({ "learning_list": "Rust" }))).await;
  assert_eq!(reply.status, StatusCode::CREATED);
  let id = reply.body["learningItem"]["id"].clone();

  let reply = send(&app, "PUT", &uri, Some(&token), Some(json!({ "learning_list": "Rust, SQL" })))
    .await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["learningItem"]["id"], id);

  let reply = send(&app, "GET", "/book/learning", Some(&token), None).await;
  assert_eq!(reply.status, StatusCode::OK);
  assert_eq!(reply.body["learningItem"]["learning_list"], "Rust, SQL");

  let reply = send(&app, "PUT", &uri, Some(&token), Some(json!({}))).await;
  assert_eq!(reply.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn learning_list_of_another_user_is_forbidden() {
  let app = make_app().await;
  let (token, user_id) = sign_in(&app, "ada@example.com").await;
  let uri = format!("/book/learning/{}", user_id + 1);
  let reply = send(&app, "PUT", &uri, Some(&token), Some(json!({ "learning_list": "Rust" }))).await;
  assert_eq!(reply.status, StatusCode::FORBIDDEN);
}
