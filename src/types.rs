//! Domain types for the QRCS emergency coordination system.
//!
//! This module contains the value objects and entities shared by the
//! lifecycle service, the stores, and the HTTP API: identifiers, the
//! incident and resource entities, and their status enums.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an incident
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IncidentId(Uuid);

impl IncidentId {
    /// Creates a new random `IncidentId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `IncidentId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for IncidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for IncidentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a deployable resource
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(Uuid);

impl ResourceId {
    /// Creates a new random `ResourceId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `ResourceId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ResourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a user.
///
/// Users themselves (credentials, profile, sessions) are owned by the
/// upstream identity provider; the lifecycle service only ever sees the
/// id and role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `UserId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a stored notification
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NotificationId(Uuid);

impl NotificationId {
    /// Creates a new random `NotificationId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a `NotificationId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for NotificationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Incident severity, ordered from least to most urgent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Minor incident, no immediate danger
    Low,
    /// Moderate incident
    Medium,
    /// Serious incident requiring prompt response
    High,
    /// Life-threatening incident
    Critical,
}

impl Severity {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incident lifecycle status.
///
/// The canonical state set. Legacy rows may still carry the synonyms
/// `pending` (for `reported`) and `closed` (for `resolved`); those are
/// collapsed at the storage boundary — reads accept them, writes always
/// emit the canonical value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    /// Submitted by a reporter, awaiting triage
    Reported,
    /// Approved by an administrator, awaiting dispatch
    Active,
    /// Resources dispatched, response underway
    Responding,
    /// Terminal: the emergency has been handled
    Resolved,
    /// Terminal: the report was rejected during triage
    Rejected,
}

impl IncidentStatus {
    /// Canonical storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Reported => "reported",
            Self::Active => "active",
            Self::Responding => "responding",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        }
    }

    /// Parse a stored status value, collapsing legacy synonyms.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reported" | "pending" => Some(Self::Reported),
            "active" => Some(Self::Active),
            "responding" => Some(Self::Responding),
            "resolved" | "closed" => Some(Self::Resolved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// All storage values that read back as this status, including
    /// legacy synonyms. Conditional updates match against this set so
    /// that legacy rows still satisfy status preconditions.
    #[must_use]
    pub fn storage_values(&self) -> Vec<String> {
        let values: &[&str] = match self {
            Self::Reported => &["reported", "pending"],
            Self::Active => &["active"],
            Self::Responding => &["responding"],
            Self::Resolved => &["resolved", "closed"],
            Self::Rejected => &["rejected"],
        };
        values.iter().map(ToString::to_string).collect()
    }

    /// Whether this status is terminal for the lifecycle.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }
}

impl fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resource availability status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceStatus {
    /// Ready for dispatch
    Available,
    /// Assigned to an incident
    InUse,
    /// Taken out of service by an administrator
    Unavailable,
    /// Undergoing maintenance
    Maintenance,
}

impl ResourceStatus {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::InUse => "in_use",
            Self::Unavailable => "unavailable",
            Self::Maintenance => "maintenance",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "available" => Some(Self::Available),
            "in_use" => Some(Self::InUse),
            "unavailable" => Some(Self::Unavailable),
            "maintenance" => Some(Self::Maintenance),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a deployable resource.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceCategory {
    /// Ambulances, fire trucks, patrol cars
    Vehicle,
    /// Pumps, generators, medical kits
    Equipment,
    /// Response teams and individual responders
    Personnel,
    /// Shelters, staging areas, hospitals
    Facility,
    /// Anything that doesn't fit the above
    Other,
}

impl ResourceCategory {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Vehicle => "vehicle",
            Self::Equipment => "equipment",
            Self::Personnel => "personnel",
            Self::Facility => "facility",
            Self::Other => "other",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "vehicle" => Some(Self::Vehicle),
            "equipment" => Some(Self::Equipment),
            "personnel" => Some(Self::Personnel),
            "facility" => Some(Self::Facility),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Role of a user, as asserted by the upstream identity provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Can triage, dispatch, resolve and delete incidents
    Admin,
    /// Field responder
    Responder,
    /// Ordinary citizen reporting emergencies
    Reporter,
}

impl UserRole {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Responder => "responder",
            Self::Reporter => "reporter",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "responder" => Some(Self::Responder),
            "reporter" | "user" => Some(Self::Reporter),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A new emergency was reported
    Emergency,
    /// An incident the user reported changed status
    IncidentUpdate,
    /// A resource changed status
    ResourceUpdate,
    /// Operational announcement
    System,
}

impl NotificationKind {
    /// Storage representation
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::IncidentUpdate => "incident_update",
            Self::ResourceUpdate => "resource_update",
            Self::System => "system",
        }
    }

    /// Parse the storage representation.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "emergency" => Some(Self::Emergency),
            "incident_update" => Some(Self::IncidentUpdate),
            "resource_update" => Some(Self::ResourceUpdate),
            "system" => Some(Self::System),
            _ => None,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Entities
// ============================================================================

/// Structured details attached to an incident report beyond the core
/// fields. Persisted as a JSON column.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentDetails {
    /// Estimated number of people affected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_people: Option<u32>,
    /// Nearest landmark to the incident location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landmark: Option<String>,
    /// Callback phone number for the reporter
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_phone: Option<String>,
    /// Resource categories the reporter believes are needed
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requested_resources: Vec<ResourceCategory>,
}

impl IncidentDetails {
    /// True when no field carries information.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.affected_people.is_none()
            && self.landmark.is_none()
            && self.contact_phone.is_none()
            && self.requested_resources.is_empty()
    }
}

/// A reported emergency event requiring triage and response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Unique incident identifier
    pub id: IncidentId,
    /// Short title / category of the emergency
    pub title: String,
    /// Free-text description
    pub description: String,
    /// Human-readable location
    pub location: String,
    /// Latitude of the incident site
    pub latitude: f64,
    /// Longitude of the incident site
    pub longitude: f64,
    /// Severity as assessed by the reporter
    pub severity: Severity,
    /// Current lifecycle status
    pub status: IncidentStatus,
    /// User who reported the incident
    pub reported_by: UserId,
    /// When the incident was reported
    pub reported_at: DateTime<Utc>,
    /// When the incident was resolved, if it has been
    pub resolved_at: Option<DateTime<Utc>>,
    /// Additional structured data from the report form
    pub details: Option<IncidentDetails>,
}

/// Fields required to create an incident. The id, status, and
/// timestamps are assigned by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewIncident {
    /// Short title / category of the emergency
    pub title: String,
    /// Free-text description
    pub description: String,
    /// Human-readable location
    pub location: String,
    /// Latitude of the incident site
    pub latitude: f64,
    /// Longitude of the incident site
    pub longitude: f64,
    /// Severity as assessed by the reporter
    pub severity: Severity,
    /// User who reported the incident
    pub reported_by: UserId,
    /// Additional structured data from the report form
    pub details: Option<IncidentDetails>,
}

/// A deployable asset that can be assigned to an incident.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    /// Unique resource identifier
    pub id: ResourceId,
    /// Resource name (e.g. "Ambulance 3")
    pub name: String,
    /// Resource category
    pub category: ResourceCategory,
    /// Free-text description
    pub description: String,
    /// Availability status
    pub status: ResourceStatus,
    /// Where the resource is stationed
    pub location: Option<String>,
    /// Incident the resource is currently serving, if any.
    /// Weak reference only — clearing it never deletes the incident.
    pub assigned_to: Option<IncidentId>,
    /// When the resource was registered
    pub created_at: DateTime<Utc>,
}

/// Fields required to register a resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewResource {
    /// Resource name
    pub name: String,
    /// Resource category
    pub category: ResourceCategory,
    /// Free-text description
    pub description: String,
    /// Initial availability status
    pub status: ResourceStatus,
    /// Where the resource is stationed
    pub location: Option<String>,
}

/// A stored notification addressed to one user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification identifier
    pub id: NotificationId,
    /// Recipient
    pub user_id: UserId,
    /// Notification category
    pub kind: NotificationKind,
    /// Short title
    pub title: String,
    /// Message body
    pub message: String,
    /// Optional link to more details
    pub link: Option<String>,
    /// Whether the recipient has read it
    pub is_read: bool,
    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Request context
// ============================================================================

/// Identity of the caller for a single request.
///
/// Passed explicitly into every lifecycle operation rather than read
/// from ambient session state. Authentication itself happens upstream;
/// this type only carries the already-verified id and role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestContext {
    /// The authenticated user
    pub user_id: UserId,
    /// The user's role
    pub role: UserRole,
}

impl RequestContext {
    /// Creates a new request context.
    #[must_use]
    pub const fn new(user_id: UserId, role: UserRole) -> Self {
        Self { user_id, role }
    }

    /// Whether the caller is an administrator.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }
}
