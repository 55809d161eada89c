mod common;

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use solutions_portal::{
    entity::user::Role,
    http::{self, ProxyAuth, IDENTITY_HEADER, NAME_HEADER, SECRET_HEADER},
    settings, users, Identity, MaintenanceSetting, PortalContext, SeaOrmStore,
};
use tower::ServiceExt;
use tower_sessions::SessionManagerLayer;

use common::{context, seed_seat, FakeStorage};

const SECRET: &str = "proxy-secret";
const BOUNDARY: &str = "portal-test-boundary";

/// One browser: keeps the session cookie between requests.
struct Client {
    app: Router,
    cookie: Option<String>,
}

impl Client {
    async fn new() -> (Self, PortalContext, Arc<FakeStorage>) {
        let (ctx, storage) = context().await;
        let app = http::router(ctx.clone(), ProxyAuth::new(SECRET))
            .layer(SessionManagerLayer::new(SeaOrmStore::new(ctx.db().clone())));
        (Self { app, cookie: None }, ctx, storage)
    }

    async fn send(&mut self, mut req: Request<Body>) -> (StatusCode, Value) {
        if let Some(cookie) = &self.cookie {
            req.headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }

        let response = self.app.clone().oneshot(req).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn sign_in(&mut self, identity_id: &str) -> (StatusCode, Value) {
        let req = Request::post("/api/session")
            .header(SECRET_HEADER, SECRET)
            .header(IDENTITY_HEADER, identity_id)
            .header(NAME_HEADER, identity_id.to_uppercase())
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn json(&mut self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let req = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(req).await
    }
}

async fn teacher(ctx: &PortalContext, id: &str) {
    let identity = Identity {
        identity_id: id.to_string(),
        display_name: None,
        email: None,
        photo_url: None,
    };
    users::sign_in(ctx, &identity).await.unwrap();
    users::set_role(ctx, id, Role::Teacher).await.unwrap();
}

fn multipart(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::post("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn gated_routes_need_a_session() {
    let (mut client, _, _) = Client::new().await;

    let (status, body) = client.get("/api/subjects").await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], "error");
}

#[tokio::test]
async fn sign_in_ignores_identity_in_request_body() {
    let (mut client, ctx, _) = Client::new().await;
    teacher(&ctx, "tina").await;

    let (status, _) = client
        .json(
            Method::POST,
            "/api/session",
            json!({ "identity_id": "tina", "display_name": "Tina" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = Request::post("/api/session")
        .header(SECRET_HEADER, "guess")
        .header(IDENTITY_HEADER, "tina")
        .body(Body::empty())
        .unwrap();
    let (status, _) = client.send(forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = client.get("/api/admin/maintenance").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn proxy_sign_in_opens_the_catalog() {
    let (mut client, _, _) = Client::new().await;

    let (status, body) = client.sign_in("alice").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["principal"]["identity_id"], "alice");
    assert_eq!(body["principal"]["role"], "student");
    assert_eq!(body["admission"], json!({ "decision": "allow" }));

    let (status, body) = client.get("/api/subjects").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = client.get("/api/session").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["principal"]["display_name"], "ALICE");
}

#[tokio::test]
async fn maintenance_turns_students_away_with_notice() {
    let (mut client, ctx, _) = Client::new().await;
    settings::save_maintenance(ctx.db(), &MaintenanceSetting::new(true, []))
        .await
        .unwrap();

    let (status, body) = client.sign_in("rob").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "maintenance");
    assert_eq!(body["message"], http::MAINTENANCE_NOTICE);
    assert_eq!(
        body["admission"],
        json!({ "decision": "deny", "reason": "maintenance" })
    );

    let (status, body) = client.get("/api/solutions").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "maintenance");
}

#[tokio::test]
async fn students_cannot_reach_teacher_routes() {
    let (mut client, ctx, _) = Client::new().await;
    seed_seat(&ctx, 1, "Ada").await;
    client.sign_in("alice").await;

    let (status, _) = client
        .send(
            Request::delete("/api/seats/1/binding")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = client
        .json(
            Method::PUT,
            "/api/admin/maintenance",
            json!({ "active": true, "testers": [] }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = client
        .json(
            Method::POST,
            "/api/seats/1/binding",
            json!({ "identity_id": "someone-else" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(settings::load_maintenance(ctx.db()).await.unwrap().is_none());
}

#[tokio::test]
async fn self_bind_refreshes_session_principal() {
    let (mut client, ctx, _) = Client::new().await;
    seed_seat(&ctx, 3, "Ada").await;
    client.sign_in("alice").await;

    let (status, body) = client
        .json(
            Method::POST,
            "/api/seats/3/binding",
            json!({ "identity_id": "alice" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bound"], true);

    let (_, body) = client.get("/api/session").await;
    assert_eq!(body["principal"]["seat"], 3);
}

#[tokio::test]
async fn teacher_upload_reports_stored_file() {
    let (mut client, ctx, storage) = Client::new().await;
    teacher(&ctx, "tina").await;
    client.sign_in("tina").await;

    let (status, body) = client
        .send(multipart(
            &[("subject", "Math"), ("title", "Week 1")],
            Some(("week1.pdf", b"%PDF-1.4")),
        ))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["fileId"], "R-1");
    assert_eq!(body["url"], "https://files.example/R-1");
    assert!(body["id"].is_string());
    assert_eq!(storage.stored_names().len(), 1);

    let (_, listed) = client.get("/api/solutions?subject=Math").await;
    assert_eq!(listed[0]["title"], "Week 1");
    assert_eq!(listed[0]["view_count"], 0);
}

#[tokio::test]
async fn upload_without_title_is_rejected_before_storing() {
    let (mut client, ctx, storage) = Client::new().await;
    teacher(&ctx, "tina").await;
    client.sign_in("tina").await;

    let (status, body) = client
        .send(multipart(
            &[("subject", "Math")],
            Some(("week1.pdf", b"%PDF-1.4")),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["status"], "error");
    assert!(storage.stored_names().is_empty());
}
