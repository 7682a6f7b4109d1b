//! End-to-end flows against a gateway bound to an ephemeral port with the
//! in-memory store: accounts, event lifecycle, joining, live location
//! fan-out over WebSocket and incident reports.

#![allow(clippy::panic)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use eventsafe_gateway::app_state::AppState;
use eventsafe_gateway::auth::TokenIssuer;
use eventsafe_gateway::domain::EventBus;
use eventsafe_gateway::persistence::Repositories;
use eventsafe_gateway::server::build_app;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    addr: SocketAddr,
    client: reqwest::Client,
}

impl TestServer {
    async fn start() -> Self {
        let tokens = Arc::new(TokenIssuer::new(
            "integration-secret",
            Duration::from_secs(300),
            Duration::from_secs(3600),
        ));
        let state = AppState::new(&Repositories::in_memory(), EventBus::new(256), tokens);
        let app = build_app(state, Duration::from_secs(10));
        let Ok(listener) = tokio::net::TcpListener::bind("127.0.0.1:0").await else {
            panic!("failed to bind ephemeral port");
        };
        let Ok(addr) = listener.local_addr() else {
            panic!("no local address");
        };
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            addr,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}/api/v1{path}", self.addr)
    }

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        let Ok(response) = request.send().await else {
            panic!("request to {path} failed");
        };
        let status = response.status();
        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(reqwest::Method::POST, path, token, Some(body)).await
    }

    async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(reqwest::Method::GET, path, token, None).await
    }

    /// Registers an account and returns its access token.
    async fn register(&self, email: &str, role: &str) -> String {
        let (status, body) = self
            .post(
                "/auth/register",
                None,
                json!({ "email": email, "password": "correct-horse", "name": "Test", "role": role }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        let Some(token) = body
            .pointer("/data/tokens/accessToken")
            .and_then(Value::as_str)
        else {
            panic!("no access token in {body}");
        };
        token.to_string()
    }

    async fn connect_ws(&self) -> Socket {
        let url = format!("ws://{}/ws", self.addr);
        let Ok((socket, _)) = tokio_tungstenite::connect_async(url).await else {
            panic!("ws connect failed");
        };
        socket
    }
}

fn str_at<'a>(body: &'a Value, pointer: &str) -> &'a str {
    let Some(value) = body.pointer(pointer).and_then(Value::as_str) else {
        panic!("missing {pointer} in {body}");
    };
    value
}

async fn next_json(socket: &mut Socket, wait: Duration) -> Option<Value> {
    loop {
        match tokio::time::timeout(wait, socket.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => {
                return serde_json::from_str(text.as_str()).ok();
            }
            Ok(Some(Ok(_))) => {}
            _ => return None,
        }
    }
}

async fn create_published_event(server: &TestServer, token: &str) -> String {
    let start = Utc::now() + chrono::Duration::hours(1);
    let end = start + chrono::Duration::hours(1);
    let (status, body) = server
        .post(
            "/events",
            Some(token),
            json!({
                "name": "Harbour Festival",
                "startDate": start,
                "endDate": end,
                "locationName": "Pier 4",
                "latitude": 10.0,
                "longitude": 20.0,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "create event failed: {body}");
    assert_eq!(str_at(&body, "/data/status"), "DRAFT");
    let event_id = str_at(&body, "/data/id").to_string();

    let (status, body) = server
        .post(&format!("/events/{event_id}/publish"), Some(token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK, "publish failed: {body}");
    assert_eq!(str_at(&body, "/data/status"), "PUBLISHED");
    event_id
}

#[tokio::test]
async fn login_issues_tokens_and_rejects_wrong_password() {
    let server = TestServer::start().await;
    server.register("ana@example.com", "PARTICIPANT").await;

    let (status, body) = server
        .post(
            "/auth/login",
            None,
            json!({ "email": "ana@example.com", "password": "correct-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(!str_at(&body, "/data/tokens/accessToken").is_empty());
    assert!(!str_at(&body, "/data/tokens/refreshToken").is_empty());

    let (status, body) = server
        .post(
            "/auth/login",
            None,
            json!({ "email": "ana@example.com", "password": "wrong-horse" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body.pointer("/data").is_none());

    let (status, _) = server
        .post(
            "/auth/register",
            None,
            json!({ "email": "ana@example.com", "password": "another-pass", "name": "Dup" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn publish_only_from_draft() {
    let server = TestServer::start().await;
    let organizer = server.register("org@example.com", "EVENT_ORGANIZER").await;
    let event_id = create_published_event(&server, &organizer).await;

    let (status, _) = server
        .post(&format!("/events/{event_id}/publish"), Some(&organizer), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = server.get(&format!("/events/{event_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(str_at(&body, "/data/status"), "PUBLISHED");

    let stranger = server.register("other@example.com", "EVENT_ORGANIZER").await;
    let (status, _) = server
        .post(&format!("/events/{event_id}/start"), Some(&stranger), json!({}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn single_location_is_broadcast_but_batch_is_not() {
    let server = TestServer::start().await;
    let organizer = server.register("org@example.com", "EVENT_ORGANIZER").await;
    let staff = server.register("guard@example.com", "SECURITY_STAFF").await;
    let event_id = create_published_event(&server, &organizer).await;

    let (status, body) = server
        .post(
            "/zones",
            Some(&organizer),
            json!({
                "eventId": event_id,
                "name": "Main stage",
                "riskLevel": "HIGH",
                "polygon": [
                    { "latitude": 9.0, "longitude": 19.0 },
                    { "latitude": 9.0, "longitude": 21.0 },
                    { "latitude": 11.0, "longitude": 21.0 },
                    { "latitude": 11.0, "longitude": 19.0 },
                ],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "zone failed: {body}");
    let zone_id = str_at(&body, "/data/id").to_string();

    let mut socket = server.connect_ws().await;
    let subscribe = json!({ "id": "s1", "command": "subscribe", "eventIds": [event_id] });
    let Ok(()) = socket.send(Message::text(subscribe.to_string())).await else {
        panic!("ws send failed");
    };
    let Some(ack) = next_json(&mut socket, Duration::from_secs(2)).await else {
        panic!("no subscribe ack");
    };
    assert_eq!(str_at(&ack, "/type"), "response");
    assert_eq!(ack.pointer("/payload/count"), Some(&json!(1)));

    let (status, body) = server
        .post(
            "/participants/join",
            None,
            json!({ "eventId": event_id, "deviceId": "device-42", "name": "Guest" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "join failed: {body}");
    let participant_id = str_at(&body, "/data/id").to_string();
    let joined_seen = str_at(&body, "/data/lastSeenAt").to_string();

    let (status, body) = server
        .post(
            "/locations",
            None,
            json!({ "participantId": participant_id, "latitude": 10.0, "longitude": 20.0 }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "location failed: {body}");
    assert_eq!(str_at(&body, "/data/zoneId"), zone_id);

    let Some(push) = next_json(&mut socket, Duration::from_secs(2)).await else {
        panic!("no location update pushed");
    };
    assert_eq!(str_at(&push, "/type"), "event");
    assert_eq!(str_at(&push, "/payload/event"), "locationUpdate");
    assert_eq!(str_at(&push, "/payload/eventId"), event_id);
    assert_eq!(str_at(&push, "/payload/participantOrUserId"), participant_id);
    assert_eq!(str_at(&push, "/payload/resolvedZone/riskLevel"), "HIGH");
    assert_eq!(push.pointer("/payload/latitude"), Some(&json!(10.0)));
    assert_eq!(push.pointer("/payload/longitude"), Some(&json!(20.0)));
    let stored_at = str_at(&body, "/data/timestamp").to_string();

    let (_, body) = server
        .get(&format!("/participants/{participant_id}"), None)
        .await;
    let parse = |raw: &str| {
        let Ok(at) = chrono::DateTime::parse_from_rfc3339(raw) else {
            panic!("bad timestamp {raw}");
        };
        at
    };
    assert_eq!(parse(str_at(&push, "/payload/timestamp")), parse(&stored_at));
    assert!(parse(str_at(&body, "/data/lastSeenAt")) >= parse(&joined_seen));

    let (status, body) = server
        .post(
            "/locations/batch",
            Some(&staff),
            json!({ "locations": [
                { "participantId": participant_id, "latitude": 10.0, "longitude": 20.0 },
            ] }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "batch failed: {body}");
    assert_eq!(body.pointer("/data/stored"), Some(&json!(1)));
    assert!(next_json(&mut socket, Duration::from_millis(300)).await.is_none());

    let (status, body) = server
        .get(&format!("/zones/{zone_id}/density"), Some(&staff))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.pointer("/data/participantCount"), Some(&json!(1)));
}

#[tokio::test]
async fn reports_get_keyword_priority() {
    let server = TestServer::start().await;
    let organizer = server.register("org@example.com", "EVENT_ORGANIZER").await;
    let staff = server.register("guard@example.com", "SECURITY_STAFF").await;
    let event_id = create_published_event(&server, &organizer).await;

    let (status, body) = server
        .post(
            "/reports",
            None,
            json!({ "eventId": event_id, "title": "Crowd", "message": "Fire near the lost and found" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "report failed: {body}");
    assert_eq!(str_at(&body, "/data/priority"), "EMERGENCY");
    assert_eq!(str_at(&body, "/data/status"), "PENDING");

    let (status, body) = server
        .get(&format!("/events/{event_id}/reports/emergency"), Some(&staff))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.pointer("/data").and_then(Value::as_array).map(Vec::len), Some(1));

    let (status, _) = server
        .get(&format!("/events/{event_id}/reports"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn optional_auth_ignores_invalid_tokens() {
    let server = TestServer::start().await;
    let organizer = server.register("org@example.com", "EVENT_ORGANIZER").await;
    let guest = server.register("guest@example.com", "PARTICIPANT").await;
    let event_id = create_published_event(&server, &organizer).await;
    let bogus = "not-a-valid-token";
    let unset = |body: &Value, pointer: &str| body.pointer(pointer).is_none_or(Value::is_null);

    let (status, body) = server
        .post(
            "/participants/join",
            Some(bogus),
            json!({ "eventId": event_id, "deviceId": "anon-device" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "join failed: {body}");
    assert!(unset(&body, "/data/userId"));

    let (status, body) = server
        .post(
            "/participants/join",
            Some(&guest),
            json!({ "eventId": event_id, "deviceId": "known-device" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "join failed: {body}");
    assert!(!unset(&body, "/data/userId"));

    let (status, body) = server
        .post(
            "/reports",
            Some(bogus),
            json!({ "eventId": event_id, "message": "lost a bag" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "report failed: {body}");
    assert!(unset(&body, "/data/userId"));
}
