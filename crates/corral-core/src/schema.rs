//! Static table of the relations exposed to administrators
//!
//! The authorization model itself lives in the tuple store. This table only
//! lists which `(kind, relation, subject)` combinations may be listed and
//! granted through the admin surface, kept by hand so that structural
//! relations stay visible without being grantable to users.

use serde::Serialize;

use crate::tuple::{Kind, Relation};

/// One grantable combination: `subject` may hold `entitlement` on a `kind`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EntitlementSchemaEntry {
    #[serde(rename = "entitlement_type")]
    pub entitlement: Relation,
    /// Subject type: `user`, `user:*`, `group#member` or a parent kind
    #[serde(rename = "entity_name")]
    pub subject: &'static str,
    #[serde(rename = "entity_type")]
    pub kind: Kind,
}

const fn entry(entitlement: Relation, subject: &'static str, kind: Kind) -> EntitlementSchemaEntry {
    EntitlementSchemaEntry {
        entitlement,
        subject,
        kind,
    }
}

pub static ENTITLEMENT_SCHEMA: &[EntitlementSchemaEntry] = &[
    // applicationoffer
    entry(Relation::Administrator, "user", Kind::ApplicationOffer),
    entry(Relation::Administrator, "user:*", Kind::ApplicationOffer),
    entry(Relation::Administrator, "group#member", Kind::ApplicationOffer),
    entry(Relation::Consumer, "user", Kind::ApplicationOffer),
    entry(Relation::Consumer, "user:*", Kind::ApplicationOffer),
    entry(Relation::Consumer, "group#member", Kind::ApplicationOffer),
    entry(Relation::Reader, "user", Kind::ApplicationOffer),
    entry(Relation::Reader, "user:*", Kind::ApplicationOffer),
    entry(Relation::Reader, "group#member", Kind::ApplicationOffer),
    entry(Relation::Model, "model", Kind::ApplicationOffer),
    // cloud
    entry(Relation::Administrator, "user", Kind::Cloud),
    entry(Relation::Administrator, "user:*", Kind::Cloud),
    entry(Relation::Administrator, "group#member", Kind::Cloud),
    entry(Relation::CanAddModel, "user", Kind::Cloud),
    entry(Relation::CanAddModel, "user:*", Kind::Cloud),
    entry(Relation::CanAddModel, "group#member", Kind::Cloud),
    entry(Relation::Controller, "controller", Kind::Cloud),
    // controller
    entry(Relation::Administrator, "user", Kind::Controller),
    entry(Relation::Administrator, "user:*", Kind::Controller),
    entry(Relation::Administrator, "group#member", Kind::Controller),
    entry(Relation::AuditLogViewer, "user", Kind::Controller),
    entry(Relation::AuditLogViewer, "user:*", Kind::Controller),
    entry(Relation::AuditLogViewer, "group#member", Kind::Controller),
    // group
    entry(Relation::Member, "user", Kind::Group),
    entry(Relation::Member, "user:*", Kind::Group),
    entry(Relation::Member, "group#member", Kind::Group),
    // model
    entry(Relation::Administrator, "user", Kind::Model),
    entry(Relation::Administrator, "user:*", Kind::Model),
    entry(Relation::Administrator, "group#member", Kind::Model),
    entry(Relation::Reader, "user", Kind::Model),
    entry(Relation::Reader, "user:*", Kind::Model),
    entry(Relation::Reader, "group#member", Kind::Model),
    entry(Relation::Writer, "user", Kind::Model),
    entry(Relation::Writer, "user:*", Kind::Model),
    entry(Relation::Writer, "group#member", Kind::Model),
    entry(Relation::Controller, "controller", Kind::Model),
    // serviceaccount
    entry(Relation::Administrator, "user", Kind::ServiceAccount),
    entry(Relation::Administrator, "user:*", Kind::ServiceAccount),
    entry(Relation::Administrator, "group#member", Kind::ServiceAccount),
];

/// Whether users and group members may be granted `relation` on `kind`
pub fn is_grantable(kind: Kind, relation: Relation) -> bool {
    ENTITLEMENT_SCHEMA
        .iter()
        .any(|e| e.kind == kind && e.entitlement == relation && e.subject == "user")
}
