//! Unit tests for the lifecycle service, run against the in-memory
//! mock stores.

#![allow(clippy::unwrap_used, clippy::expect_used)] // Test code

use super::*;
use crate::mocks::{MockNotificationStore, MockStore};
use crate::types::UserId;
use chrono::Utc;

fn service() -> (LifecycleService, MockStore, MockNotificationStore) {
    let store = MockStore::new();
    let notifications = MockNotificationStore::new();
    let svc = LifecycleService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(notifications.clone()),
    );
    (svc, store, notifications)
}

fn admin() -> RequestContext {
    RequestContext::new(UserId::new(), UserRole::Admin)
}

fn reporter() -> RequestContext {
    RequestContext::new(UserId::new(), UserRole::Reporter)
}

fn incident_with_status(status: IncidentStatus, reported_by: UserId) -> Incident {
    Incident {
        id: IncidentId::new(),
        title: "Warehouse fire".to_string(),
        description: "Smoke visible from the street".to_string(),
        location: "12 Dock Rd".to_string(),
        latitude: 25.28,
        longitude: 51.53,
        severity: Severity::High,
        status,
        reported_by,
        reported_at: Utc::now(),
        resolved_at: None,
        details: None,
    }
}

fn resource_with_status(name: &str, status: ResourceStatus, assigned_to: Option<IncidentId>) -> Resource {
    Resource {
        id: ResourceId::new(),
        name: name.to_string(),
        category: ResourceCategory::Vehicle,
        description: "test resource".to_string(),
        status,
        location: None,
        assigned_to,
        created_at: Utc::now(),
    }
}

fn sample_report() -> NewReport {
    NewReport {
        title: "Flooded underpass".to_string(),
        description: "Water rising quickly".to_string(),
        location: "Corniche St".to_string(),
        latitude: 25.3,
        longitude: 51.52,
        severity: Severity::Critical,
        details: None,
    }
}

// ============================================================================
// Approve / reject
// ============================================================================

#[tokio::test]
async fn approve_moves_reported_to_active_and_notifies_reporter() {
    let (svc, store, notifications) = service();
    let reporter_id = UserId::new();
    let incident = incident_with_status(IncidentStatus::Reported, reporter_id);
    let id = incident.id;
    store.seed_incident(incident).unwrap();

    let outcome = svc.approve(admin(), id).await.unwrap();

    assert_eq!(outcome.status, Some(IncidentStatus::Active));
    let stored = store.incident(id).unwrap().unwrap();
    assert_eq!(stored.status, IncidentStatus::Active);

    let sent = notifications.sent_to(reporter_id).unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "Emergency Report Approved");
}

#[tokio::test]
async fn approve_is_not_repeatable() {
    let (svc, store, notifications) = service();
    let reporter_id = UserId::new();
    let incident = incident_with_status(IncidentStatus::Reported, reporter_id);
    let id = incident.id;
    store.seed_incident(incident).unwrap();

    svc.approve(admin(), id).await.unwrap();
    let err = svc.approve(admin(), id).await.unwrap_err();

    assert_eq!(
        err,
        Error::InvalidTransition {
            status: IncidentStatus::Active,
            operation: "approve",
        }
    );
    // The failing call must not send a second notification.
    assert_eq!(notifications.sent_to(reporter_id).unwrap().len(), 1);
}

#[tokio::test]
async fn approve_on_terminal_incident_changes_nothing() {
    let (svc, store, _) = service();
    let incident = incident_with_status(IncidentStatus::Resolved, UserId::new());
    let id = incident.id;
    store.seed_incident(incident).unwrap();

    let err = svc.approve(admin(), id).await.unwrap_err();

    assert!(matches!(err, Error::InvalidTransition { .. }));
    let stored = store.incident(id).unwrap().unwrap();
    assert_eq!(stored.status, IncidentStatus::Resolved);
}

#[tokio::test]
async fn approve_unknown_incident_is_not_found() {
    let (svc, _, _) = service();
    let err = svc.approve(admin(), IncidentId::new()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: "incident", .. }));
}

#[tokio::test]
async fn approve_requires_admin_role() {
    let (svc, store, _) = service();
    let incident = incident_with_status(IncidentStatus::Reported, UserId::new());
    let id = incident.id;
    store.seed_incident(incident).unwrap();

    let err = svc.approve(reporter(), id).await.unwrap_err();
    assert_eq!(err, Error::Forbidden { required: "admin" });
}

#[tokio::test]
async fn reject_moves_reported_to_rejected() {
    let (svc, store, notifications) = service();
    let reporter_id = UserId::new();
    let incident = incident_with_status(IncidentStatus::Reported, reporter_id);
    let id = incident.id;
    store.seed_incident(incident).unwrap();

    let outcome = svc.reject(admin(), id).await.unwrap();

    assert_eq!(outcome.status, Some(IncidentStatus::Rejected));
    let sent = notifications.sent_to(reporter_id).unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "Emergency Report Rejected");
}

#[tokio::test]
async fn notification_failure_does_not_fail_the_transition() {
    let (svc, store, notifications) = service();
    let incident = incident_with_status(IncidentStatus::Reported, UserId::new());
    let id = incident.id;
    store.seed_incident(incident).unwrap();
    notifications.fail_sends(true);

    let outcome = svc.approve(admin(), id).await.unwrap();

    assert_eq!(outcome.status, Some(IncidentStatus::Active));
    assert_eq!(store.incident(id).unwrap().unwrap().status, IncidentStatus::Active);
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn dispatch_assigns_available_and_skips_in_use() {
    let (svc, store, notifications) = service();
    let reporter_id = UserId::new();
    let incident = incident_with_status(IncidentStatus::Active, reporter_id);
    let id = incident.id;
    store.seed_incident(incident).unwrap();

    let elsewhere = IncidentId::new();
    let free = resource_with_status("Ambulance 1", ResourceStatus::Available, None);
    let busy = resource_with_status("Ambulance 2", ResourceStatus::InUse, Some(elsewhere));
    store.seed_resource(free.clone()).unwrap();
    store.seed_resource(busy.clone()).unwrap();

    let outcome = svc.dispatch(admin(), id, &[free.id, busy.id]).await.unwrap();

    assert_eq!(outcome.status, Some(IncidentStatus::Responding));
    assert_eq!(outcome.assigned_resources, vec!["Ambulance 1".to_string()]);

    let stored_free = store.resource(free.id).unwrap().unwrap();
    assert_eq!(stored_free.status, ResourceStatus::InUse);
    assert_eq!(stored_free.assigned_to, Some(id));

    // The busy resource keeps serving its original incident.
    let stored_busy = store.resource(busy.id).unwrap().unwrap();
    assert_eq!(stored_busy.assigned_to, Some(elsewhere));

    // One notification, listing only the assigned resource's name.
    let sent = notifications.sent_to(reporter_id).unwrap();
    assert_eq!(sent.len(), 1);
    assert!(sent[0].message.contains("Ambulance 1"));
    assert!(!sent[0].message.contains("Ambulance 2"));
}

#[tokio::test]
async fn dispatch_with_empty_selection_is_rejected() {
    let (svc, store, _) = service();
    let incident = incident_with_status(IncidentStatus::Active, UserId::new());
    let id = incident.id;
    store.seed_incident(incident).unwrap();

    let err = svc.dispatch(admin(), id, &[]).await.unwrap_err();

    assert_eq!(err, Error::NoResourcesSelected);
    assert_eq!(store.incident(id).unwrap().unwrap().status, IncidentStatus::Active);
}

#[tokio::test]
async fn dispatch_aborts_when_nothing_is_available() {
    let (svc, store, notifications) = service();
    let reporter_id = UserId::new();
    let incident = incident_with_status(IncidentStatus::Active, reporter_id);
    let id = incident.id;
    store.seed_incident(incident).unwrap();

    let busy = resource_with_status("Pump 1", ResourceStatus::Maintenance, None);
    store.seed_resource(busy.clone()).unwrap();

    let err = svc.dispatch(admin(), id, &[busy.id]).await.unwrap_err();

    assert!(matches!(err, Error::DispatchFailed { .. }));
    // Whole transaction aborted: incident stays active, resource untouched.
    assert_eq!(store.incident(id).unwrap().unwrap().status, IncidentStatus::Active);
    assert_eq!(
        store.resource(busy.id).unwrap().unwrap().status,
        ResourceStatus::Maintenance
    );
    assert!(notifications.sent_to(reporter_id).unwrap().is_empty());
}

#[tokio::test]
async fn dispatch_requires_active_status() {
    let (svc, store, _) = service();
    let incident = incident_with_status(IncidentStatus::Reported, UserId::new());
    let id = incident.id;
    store.seed_incident(incident).unwrap();
    let free = resource_with_status("Truck 1", ResourceStatus::Available, None);
    store.seed_resource(free.clone()).unwrap();

    let err = svc.dispatch(admin(), id, &[free.id]).await.unwrap_err();

    assert_eq!(
        err,
        Error::InvalidTransition {
            status: IncidentStatus::Reported,
            operation: "dispatch",
        }
    );
    assert_eq!(
        store.resource(free.id).unwrap().unwrap().status,
        ResourceStatus::Available
    );
}

#[tokio::test]
async fn dispatch_is_atomic_under_storage_failure() {
    let (svc, store, notifications) = service();
    let reporter_id = UserId::new();
    let incident = incident_with_status(IncidentStatus::Active, reporter_id);
    let id = incident.id;
    store.seed_incident(incident).unwrap();
    let free = resource_with_status("Ambulance 1", ResourceStatus::Available, None);
    store.seed_resource(free.clone()).unwrap();

    store.fail_dispatch(true);
    let err = svc.dispatch(admin(), id, &[free.id]).await.unwrap_err();

    assert!(matches!(err, Error::Storage(_)));
    // Everything rolled back: incident and resource as before the call.
    assert_eq!(store.incident(id).unwrap().unwrap().status, IncidentStatus::Active);
    let stored = store.resource(free.id).unwrap().unwrap();
    assert_eq!(stored.status, ResourceStatus::Available);
    assert_eq!(stored.assigned_to, None);
    assert!(notifications.sent_to(reporter_id).unwrap().is_empty());

    // Re-issuing the same dispatch after the failure clears succeeds.
    store.fail_dispatch(false);
    let outcome = svc.dispatch(admin(), id, &[free.id]).await.unwrap();
    assert_eq!(outcome.assigned_resources.len(), 1);
}

#[tokio::test]
async fn concurrent_dispatches_assign_a_resource_exactly_once() {
    let (svc, store, _) = service();
    let first = incident_with_status(IncidentStatus::Active, UserId::new());
    let second = incident_with_status(IncidentStatus::Active, UserId::new());
    let (first_id, second_id) = (first.id, second.id);
    store.seed_incident(first).unwrap();
    store.seed_incident(second).unwrap();

    let contested = resource_with_status("Engine 7", ResourceStatus::Available, None);
    store.seed_resource(contested.clone()).unwrap();

    let contested_ids = [contested.id];
    let (a, b) = tokio::join!(
        svc.dispatch(admin(), first_id, &contested_ids),
        svc.dispatch(admin(), second_id, &contested_ids),
    );

    // Exactly one dispatch wins the resource; the loser aborts with
    // DispatchFailed because nothing else was selected.
    assert_ne!(a.is_ok(), b.is_ok());
    let winner = if a.is_ok() { first_id } else { second_id };
    let loser = if a.is_ok() { second_id } else { first_id };

    let stored = store.resource(contested.id).unwrap().unwrap();
    assert_eq!(stored.status, ResourceStatus::InUse);
    assert_eq!(stored.assigned_to, Some(winner));

    assert_eq!(
        store.incident(loser).unwrap().unwrap().status,
        IncidentStatus::Active
    );
}

// ============================================================================
// Resolve
// ============================================================================

#[tokio::test]
async fn resolve_is_atomic_under_storage_failure() {
    let (svc, store, notifications) = service();
    let reporter_id = UserId::new();
    let incident = incident_with_status(IncidentStatus::Responding, reporter_id);
    let id = incident.id;
    store.seed_incident(incident).unwrap();
    let unit = resource_with_status("Unit 12", ResourceStatus::InUse, Some(id));
    store.seed_resource(unit.clone()).unwrap();

    store.fail_resolve(true);
    let err = svc.resolve(admin(), id).await.unwrap_err();

    assert!(matches!(err, Error::Storage(_)));
    let stored = store.incident(id).unwrap().unwrap();
    assert_eq!(stored.status, IncidentStatus::Responding);
    assert!(stored.resolved_at.is_none());
    let resource = store.resource(unit.id).unwrap().unwrap();
    assert_eq!(resource.status, ResourceStatus::InUse);
    assert_eq!(resource.assigned_to, Some(id));
    assert!(notifications.sent_to(reporter_id).unwrap().is_empty());

    store.fail_resolve(false);
    let outcome = svc.resolve(admin(), id).await.unwrap();
    assert_eq!(outcome.status, Some(IncidentStatus::Resolved));
}

#[tokio::test]
async fn resolve_releases_every_assigned_resource() {
    let (svc, store, notifications) = service();
    let reporter_id = UserId::new();
    let incident = incident_with_status(IncidentStatus::Responding, reporter_id);
    let id = incident.id;
    store.seed_incident(incident).unwrap();

    let r1 = resource_with_status("Unit 20", ResourceStatus::InUse, Some(id));
    let r2 = resource_with_status("Unit 21", ResourceStatus::InUse, Some(id));
    let unrelated = resource_with_status("Unit 99", ResourceStatus::InUse, Some(IncidentId::new()));
    store.seed_resource(r1.clone()).unwrap();
    store.seed_resource(r2.clone()).unwrap();
    store.seed_resource(unrelated.clone()).unwrap();

    let outcome = svc.resolve(admin(), id).await.unwrap();
    assert_eq!(outcome.status, Some(IncidentStatus::Resolved));

    let stored = store.incident(id).unwrap().unwrap();
    assert_eq!(stored.status, IncidentStatus::Resolved);
    assert!(stored.resolved_at.is_some());

    for rid in [r1.id, r2.id] {
        let resource = store.resource(rid).unwrap().unwrap();
        assert_eq!(resource.status, ResourceStatus::Available);
        assert_eq!(resource.assigned_to, None);
    }
    // Resources serving other incidents are untouched.
    assert_eq!(
        store.resource(unrelated.id).unwrap().unwrap().status,
        ResourceStatus::InUse
    );

    let sent = notifications.sent_to(reporter_id).unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title, "Emergency Resolved");
}

#[tokio::test]
async fn resolve_works_from_active_without_dispatch() {
    let (svc, store, _) = service();
    let incident = incident_with_status(IncidentStatus::Active, UserId::new());
    let id = incident.id;
    store.seed_incident(incident).unwrap();

    let outcome = svc.resolve(admin(), id).await.unwrap();
    assert_eq!(outcome.status, Some(IncidentStatus::Resolved));
}

#[tokio::test]
async fn resolve_rejects_terminal_incidents() {
    let (svc, store, _) = service();
    let incident = incident_with_status(IncidentStatus::Rejected, UserId::new());
    let id = incident.id;
    store.seed_incident(incident).unwrap();

    let err = svc.resolve(admin(), id).await.unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { .. }));
}

// ============================================================================
// Delete
// ============================================================================

#[tokio::test]
async fn delete_removes_incident_without_releasing_resources() {
    let (svc, store, _) = service();
    let incident = incident_with_status(IncidentStatus::Responding, UserId::new());
    let id = incident.id;
    store.seed_incident(incident).unwrap();
    let assigned = resource_with_status("Unit 5", ResourceStatus::InUse, Some(id));
    store.seed_resource(assigned.clone()).unwrap();

    let outcome = svc.delete(admin(), id).await.unwrap();
    assert_eq!(outcome.status, None);
    assert!(store.incident(id).unwrap().is_none());

    // The resource stays in_use; only its dangling reference is cleared.
    let stored = store.resource(assigned.id).unwrap().unwrap();
    assert_eq!(stored.status, ResourceStatus::InUse);
    assert_eq!(stored.assigned_to, None);
}

#[tokio::test]
async fn delete_unknown_incident_is_not_found() {
    let (svc, _, _) = service();
    let err = svc.delete(admin(), IncidentId::new()).await.unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: "incident", .. }));
}

// ============================================================================
// Reporting
// ============================================================================

#[tokio::test]
async fn report_creates_reported_incident_and_alerts_admins() {
    let (svc, _, notifications) = service();
    let admin_id = UserId::new();
    let other_reporter = UserId::new();
    notifications.register_user(admin_id, UserRole::Admin).unwrap();
    notifications.register_user(other_reporter, UserRole::Reporter).unwrap();

    let ctx = reporter();
    let incident = svc.report(ctx, sample_report()).await.unwrap();

    assert_eq!(incident.status, IncidentStatus::Reported);
    assert_eq!(incident.reported_by, ctx.user_id);

    let to_admin = notifications.sent_to(admin_id).unwrap();
    assert_eq!(to_admin.len(), 1);
    assert_eq!(to_admin[0].kind, NotificationKind::Emergency);
    assert_eq!(to_admin[0].title, "New Critical Emergency");
    assert!(notifications.sent_to(other_reporter).unwrap().is_empty());
}

#[tokio::test]
async fn report_validates_coordinates() {
    let (svc, _, _) = service();
    let mut report = sample_report();
    report.latitude = 123.0;

    let err = svc.report(reporter(), report).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

// ============================================================================
// Resource administration
// ============================================================================

#[tokio::test]
async fn resources_cannot_be_marked_in_use_directly() {
    let (svc, store, _) = service();
    let free = resource_with_status("Ladder 3", ResourceStatus::Available, None);
    store.seed_resource(free.clone()).unwrap();

    let err = svc
        .set_resource_status(admin(), free.id, ResourceStatus::InUse)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        Error::InvalidResourceStatus {
            status: ResourceStatus::InUse,
        }
    );
}

#[tokio::test]
async fn marking_a_resource_available_clears_its_assignment() {
    let (svc, store, _) = service();
    let stuck = resource_with_status("Unit 5", ResourceStatus::InUse, Some(IncidentId::new()));
    store.seed_resource(stuck.clone()).unwrap();

    let updated = svc
        .set_resource_status(admin(), stuck.id, ResourceStatus::Available)
        .await
        .unwrap();

    assert_eq!(updated.status, ResourceStatus::Available);
    assert_eq!(updated.assigned_to, None);
}

#[tokio::test]
async fn editing_an_assigned_resource_to_available_clears_its_assignment() {
    let (svc, store, _) = service();
    let incident = incident_with_status(IncidentStatus::Responding, UserId::new());
    let incident_id = incident.id;
    store.seed_incident(incident).unwrap();
    let assigned = resource_with_status("Unit 8", ResourceStatus::InUse, Some(incident_id));
    store.seed_resource(assigned.clone()).unwrap();

    let updated = svc
        .update_resource(
            admin(),
            assigned.id,
            ResourceUpdate {
                name: "Unit 8".to_string(),
                category: ResourceCategory::Vehicle,
                description: "back from the field".to_string(),
                status: ResourceStatus::Available,
                location: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.status, ResourceStatus::Available);
    assert_eq!(updated.assigned_to, None);
    let stored = store.resource(assigned.id).unwrap().unwrap();
    assert_eq!(stored.assigned_to, None);

    // A non-available edit keeps the assignment in place.
    let other = resource_with_status("Unit 9", ResourceStatus::InUse, Some(incident_id));
    store.seed_resource(other.clone()).unwrap();
    let updated = svc
        .update_resource(
            admin(),
            other.id,
            ResourceUpdate {
                name: "Unit 9".to_string(),
                category: ResourceCategory::Vehicle,
                description: String::new(),
                status: ResourceStatus::InUse,
                location: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.assigned_to, Some(incident_id));
}

#[tokio::test]
async fn assigned_resources_cannot_be_deleted() {
    let (svc, store, _) = service();
    let assigned = resource_with_status("Unit 6", ResourceStatus::InUse, Some(IncidentId::new()));
    store.seed_resource(assigned.clone()).unwrap();

    let err = svc.delete_resource(admin(), assigned.id).await.unwrap_err();
    assert_eq!(err, Error::ResourceAssigned);
    assert!(store.resource(assigned.id).unwrap().is_some());
}

#[tokio::test]
async fn status_change_fans_out_to_admins() {
    let (svc, store, notifications) = service();
    let admin_id = UserId::new();
    notifications.register_user(admin_id, UserRole::Admin).unwrap();
    let pump = resource_with_status("Pump 2", ResourceStatus::Available, None);
    store.seed_resource(pump.clone()).unwrap();

    svc.set_resource_status(admin(), pump.id, ResourceStatus::Maintenance)
        .await
        .unwrap();

    let sent = notifications.sent_to(admin_id).unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].kind, NotificationKind::ResourceUpdate);
    assert!(sent[0].message.contains("Pump 2"));
    assert!(sent[0].message.contains("maintenance"));
}
