//! HTTP API integration tests.
//!
//! Boots the real router over the in-memory stores on an ephemeral
//! port and drives it with a plain HTTP client, verifying routing,
//! identity extraction, status-code mapping, and response bodies.
//!
//! Run with: `cargo test --test http_api_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use chrono::Utc;
use qrcs::lifecycle::LifecycleService;
use qrcs::mocks::{MockNotificationStore, MockStore};
use qrcs::server::{build_router, AppState};
use qrcs::types::{
    Incident, IncidentId, IncidentStatus, Resource, ResourceCategory, ResourceId, ResourceStatus,
    Severity, UserId, UserRole,
};
use serde_json::{json, Value};
use std::sync::Arc;

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    store: MockStore,
    notifications: MockNotificationStore,
    admin_id: UserId,
    reporter_id: UserId,
}

impl TestServer {
    async fn start() -> Self {
        let store = MockStore::new();
        let notifications = MockNotificationStore::new();
        let lifecycle = Arc::new(LifecycleService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(notifications.clone()),
        ));
        let state = AppState::new(
            lifecycle,
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(notifications.clone()),
        );
        let app = build_router(state, None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind ephemeral port");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("server run");
        });

        let admin_id = UserId::new();
        let reporter_id = UserId::new();
        notifications.register_user(admin_id, UserRole::Admin).unwrap();
        notifications
            .register_user(reporter_id, UserRole::Reporter)
            .unwrap();

        Self {
            base_url: format!("http://{addr}"),
            client: reqwest::Client::new(),
            store,
            notifications,
            admin_id,
            reporter_id,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn as_admin(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("x-user-id", self.admin_id.to_string())
            .header("x-user-role", "admin")
    }

    fn as_reporter(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("x-user-id", self.reporter_id.to_string())
            .header("x-user-role", "reporter")
    }

    fn seed_incident(&self, status: IncidentStatus) -> IncidentId {
        let incident = Incident {
            id: IncidentId::new(),
            title: "Road accident".to_string(),
            description: "Two vehicles, lane blocked".to_string(),
            location: "Ring Rd exit 4".to_string(),
            latitude: 25.3,
            longitude: 51.5,
            severity: Severity::Medium,
            status,
            reported_by: self.reporter_id,
            reported_at: Utc::now(),
            resolved_at: None,
            details: None,
        };
        let id = incident.id;
        self.store.seed_incident(incident).unwrap();
        id
    }

    fn seed_resource(&self, name: &str, status: ResourceStatus) -> ResourceId {
        let resource = Resource {
            id: ResourceId::new(),
            name: name.to_string(),
            category: ResourceCategory::Vehicle,
            description: String::new(),
            status,
            location: None,
            assigned_to: None,
            created_at: Utc::now(),
        };
        let id = resource.id;
        self.store.seed_resource(resource).unwrap();
        id
    }
}

#[tokio::test]
async fn health_and_ready_respond_ok() {
    let server = TestServer::start().await;

    let health = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    let body: Value = health.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    let ready = server.client.get(server.url("/ready")).send().await.unwrap();
    assert_eq!(ready.status(), 200);
}

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
    let server = TestServer::start().await;

    let resp = server
        .client
        .get(server.url("/api/incidents"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Malformed user id is rejected too.
    let resp = server
        .client
        .get(server.url("/api/incidents"))
        .header("x-user-id", "not-a-uuid")
        .header("x-user-role", "admin")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn reporting_creates_an_incident_and_alerts_admins() {
    let server = TestServer::start().await;

    let resp = server
        .as_reporter(server.client.post(server.url("/api/incidents")))
        .json(&json!({
            "title": "Power line down",
            "description": "Sparking cable across the road",
            "location": "7 Oak St",
            "latitude": 25.31,
            "longitude": 51.49,
            "severity": "high"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "reported");
    assert_eq!(body["severity"], "high");

    let admin_feed = server.notifications.sent_to(server.admin_id).unwrap();
    assert_eq!(admin_feed.len(), 1);
    assert_eq!(admin_feed[0].title, "New High Emergency");
}

#[tokio::test]
async fn report_validation_failures_are_422() {
    let server = TestServer::start().await;

    let resp = server
        .as_reporter(server.client.post(server.url("/api/incidents")))
        .json(&json!({
            "title": "",
            "description": "x",
            "location": "y",
            "latitude": 0.0,
            "longitude": 0.0,
            "severity": "low"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn lifecycle_commands_require_admin() {
    let server = TestServer::start().await;
    let id = server.seed_incident(IncidentStatus::Reported);

    let resp = server
        .as_reporter(server.client.post(server.url(&format!("/api/incidents/{id}/approve"))))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "FORBIDDEN");
}

#[tokio::test]
async fn approve_then_repeat_approve_conflicts() {
    let server = TestServer::start().await;
    let id = server.seed_incident(IncidentStatus::Reported);
    let url = server.url(&format!("/api/incidents/{id}/approve"));

    let resp = server.as_admin(server.client.post(&url)).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "active");

    let resp = server.as_admin(server.client.post(&url)).send().await.unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_TRANSITION");
}

#[tokio::test]
async fn unknown_incident_is_404() {
    let server = TestServer::start().await;
    let id = IncidentId::new();

    let resp = server
        .as_admin(server.client.get(server.url(&format!("/api/incidents/{id}"))))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn dispatch_flow_over_http() {
    let server = TestServer::start().await;
    let id = server.seed_incident(IncidentStatus::Active);
    let free = server.seed_resource("Ambulance 7", ResourceStatus::Available);
    let busy = server.seed_resource("Crane 2", ResourceStatus::Maintenance);

    // Empty selection is a validation error; incident untouched.
    let resp = server
        .as_admin(server.client.post(server.url(&format!("/api/incidents/{id}/dispatch"))))
        .json(&json!({ "resources": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "NO_RESOURCES_SELECTED");

    // A real dispatch assigns the available resource and skips the rest.
    let resp = server
        .as_admin(server.client.post(server.url(&format!("/api/incidents/{id}/dispatch"))))
        .json(&json!({ "resources": [free.to_string(), busy.to_string()] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "responding");
    assert_eq!(body["assigned_resources"], json!(["Ambulance 7"]));

    // Dispatching again conflicts: the incident is already responding.
    let resp = server
        .as_admin(server.client.post(server.url(&format!("/api/incidents/{id}/dispatch"))))
        .json(&json!({ "resources": [free.to_string()] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn resolve_over_http_releases_resources() {
    let server = TestServer::start().await;
    let id = server.seed_incident(IncidentStatus::Active);
    let unit = server.seed_resource("Unit 4", ResourceStatus::Available);

    server
        .as_admin(server.client.post(server.url(&format!("/api/incidents/{id}/dispatch"))))
        .json(&json!({ "resources": [unit.to_string()] }))
        .send()
        .await
        .unwrap();

    let resp = server
        .as_admin(server.client.post(server.url(&format!("/api/incidents/{id}/resolve"))))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "resolved");

    // The resource shows up as available again.
    let resp = server
        .as_admin(server.client.get(server.url("/api/resources/available")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["resources"][0]["name"], "Unit 4");
}

#[tokio::test]
async fn incident_listing_filters_by_status_and_owner() {
    let server = TestServer::start().await;
    server.seed_incident(IncidentStatus::Reported);
    server.seed_incident(IncidentStatus::Active);
    server.seed_incident(IncidentStatus::Resolved);

    let resp = server
        .as_admin(server.client.get(server.url("/api/incidents?status=active")))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["incidents"][0]["status"], "active");

    // ?mine=true scopes the listing to the caller's reports.
    let resp = server
        .as_admin(server.client.get(server.url("/api/incidents?mine=true")))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 0);

    let resp = server
        .as_reporter(server.client.get(server.url("/api/incidents?mine=true")))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 3);

    // Unknown status values are rejected rather than ignored.
    let resp = server
        .as_admin(server.client.get(server.url("/api/incidents?status=bogus")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn resource_administration_over_http() {
    let server = TestServer::start().await;

    // Create.
    let resp = server
        .as_admin(server.client.post(server.url("/api/resources")))
        .json(&json!({
            "name": "Field Hospital",
            "category": "facility",
            "description": "20-bed mobile unit",
            "status": "available",
            "location": "Depot B"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    let id = body["id"].as_str().unwrap().to_string();

    // Direct in_use is refused.
    let resp = server
        .as_admin(server.client.post(server.url(&format!("/api/resources/{id}/status"))))
        .json(&json!({ "status": "in_use" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "INVALID_RESOURCE_STATUS");

    // Maintenance is fine.
    let resp = server
        .as_admin(server.client.post(server.url(&format!("/api/resources/{id}/status"))))
        .json(&json!({ "status": "maintenance" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "maintenance");

    // Delete.
    let resp = server
        .as_admin(server.client.delete(server.url(&format!("/api/resources/{id}"))))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);
}

#[tokio::test]
async fn deleting_an_assigned_resource_conflicts() {
    let server = TestServer::start().await;
    let id = server.seed_incident(IncidentStatus::Active);
    let unit = server.seed_resource("Unit 12", ResourceStatus::Available);

    server
        .as_admin(server.client.post(server.url(&format!("/api/incidents/{id}/dispatch"))))
        .json(&json!({ "resources": [unit.to_string()] }))
        .send()
        .await
        .unwrap();

    let resp = server
        .as_admin(server.client.delete(server.url(&format!("/api/resources/{unit}"))))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["code"], "RESOURCE_ASSIGNED");
}

#[tokio::test]
async fn notification_feed_over_http() {
    let server = TestServer::start().await;
    let id = server.seed_incident(IncidentStatus::Reported);

    // Approving notifies the reporter.
    server
        .as_admin(server.client.post(server.url(&format!("/api/incidents/{id}/approve"))))
        .send()
        .await
        .unwrap();

    let resp = server
        .as_reporter(server.client.get(server.url("/api/notifications")))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["total"], 1);
    assert_eq!(body["notifications"][0]["title"], "Emergency Report Approved");
    let notification_id = body["notifications"][0]["id"].as_str().unwrap().to_string();

    let resp = server
        .as_reporter(server.client.get(server.url("/api/notifications/unread-count")))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["unread"], 1);

    // The admin cannot mark the reporter's notification.
    let resp = server
        .as_admin(
            server
                .client
                .post(server.url(&format!("/api/notifications/{notification_id}/read"))),
        )
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["marked"], 0);

    // The reporter can.
    let resp = server
        .as_reporter(
            server
                .client
                .post(server.url(&format!("/api/notifications/{notification_id}/read"))),
        )
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["marked"], 1);

    let resp = server
        .as_reporter(server.client.get(server.url("/api/notifications/unread-count")))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["unread"], 0);
}
