//! Domain records the authorization core reads from its collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::GroupId;
use crate::tuple::{Entity, Kind};

/// Domain suffix carried by service account identities
pub const SERVICE_ACCOUNT_DOMAIN: &str = "serviceaccount";

/// A persisted user or service account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    /// The identity as a tuple subject; service accounts are users too
    pub fn entity(&self) -> Entity {
        Entity::user(self.name.clone())
    }

    pub fn is_service_account(&self) -> bool {
        self.name
            .rsplit_once('@')
            .is_some_and(|(_, domain)| domain == SERVICE_ACCOUNT_DOMAIN)
    }
}

/// A named set of identities that can hold entitlements collectively
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: GroupId::new(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Reference to the resource that owns another resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceParent {
    pub kind: Kind,
    pub id: String,
    pub name: String,
}

/// A row of the cross-kind resource listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub kind: Kind,
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<ResourceParent>,
}

/// Result of a successful browser-session check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserSession {
    pub identity: String,
    /// Replacement `Set-Cookie` value when the session was refreshed
    pub refreshed_cookie: Option<String>,
}
