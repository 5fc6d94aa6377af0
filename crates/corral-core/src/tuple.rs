//! Relationship tuples and the typed entity references they connect

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CorralError, Result};

/// Type tag of an entity reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    User,
    Group,
    Cloud,
    Controller,
    Model,
    #[serde(rename = "applicationoffer")]
    ApplicationOffer,
    #[serde(rename = "serviceaccount")]
    ServiceAccount,
}

impl Kind {
    pub const ALL: [Kind; 7] = [
        Kind::User,
        Kind::Group,
        Kind::Cloud,
        Kind::Controller,
        Kind::Model,
        Kind::ApplicationOffer,
        Kind::ServiceAccount,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::User => "user",
            Kind::Group => "group",
            Kind::Cloud => "cloud",
            Kind::Controller => "controller",
            Kind::Model => "model",
            Kind::ApplicationOffer => "applicationoffer",
            Kind::ServiceAccount => "serviceaccount",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = CorralError;

    fn from_str(s: &str) -> Result<Self> {
        Kind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CorralError::invalid_input(format!("unknown entity type {:?}", s)))
    }
}

/// Relation names understood by the authorization model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Relation {
    #[serde(rename = "member")]
    Member,
    #[serde(rename = "administrator")]
    Administrator,
    #[serde(rename = "controller")]
    Controller,
    #[serde(rename = "model")]
    Model,
    #[serde(rename = "consumer")]
    Consumer,
    #[serde(rename = "reader")]
    Reader,
    #[serde(rename = "writer")]
    Writer,
    #[serde(rename = "can_addmodel")]
    CanAddModel,
    #[serde(rename = "audit_log_viewer")]
    AuditLogViewer,
}

impl Relation {
    pub const ALL: [Relation; 9] = [
        Relation::Member,
        Relation::Administrator,
        Relation::Controller,
        Relation::Model,
        Relation::Consumer,
        Relation::Reader,
        Relation::Writer,
        Relation::CanAddModel,
        Relation::AuditLogViewer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::Member => "member",
            Relation::Administrator => "administrator",
            Relation::Controller => "controller",
            Relation::Model => "model",
            Relation::Consumer => "consumer",
            Relation::Reader => "reader",
            Relation::Writer => "writer",
            Relation::CanAddModel => "can_addmodel",
            Relation::AuditLogViewer => "audit_log_viewer",
        }
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Relation {
    type Err = CorralError;

    fn from_str(s: &str) -> Result<Self> {
        Relation::ALL
            .iter()
            .copied()
            .find(|relation| relation.as_str() == s)
            .ok_or_else(|| CorralError::invalid_input(format!("unknown relation {:?}", s)))
    }
}

/// A typed reference such as `model:<uuid>` or the userset `group:<uuid>#member`.
///
/// An empty `id` denotes every entity of the kind and is only meaningful as a
/// read filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Entity {
    pub kind: Kind,
    pub id: String,
    pub relation: Option<Relation>,
}

impl Entity {
    pub fn new(kind: Kind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
            relation: None,
        }
    }

    pub fn user(name: impl Into<String>) -> Self {
        Self::new(Kind::User, name)
    }

    /// Every entity of `kind`
    pub fn of_kind(kind: Kind) -> Self {
        Self::new(kind, "")
    }

    pub fn with_relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }

    /// The userset of a group's members
    pub fn group_members(group_id: impl Into<String>) -> Self {
        Self::new(Kind::Group, group_id).with_relation(Relation::Member)
    }

    pub fn is_kind_only(&self) -> bool {
        self.id.is_empty()
    }

    /// The same entity without the userset relation
    pub fn without_relation(&self) -> Self {
        Self::new(self.kind, self.id.clone())
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)?;
        if let Some(relation) = &self.relation {
            write!(f, "#{}", relation)?;
        }
        Ok(())
    }
}

impl FromStr for Entity {
    type Err = CorralError;

    fn from_str(s: &str) -> Result<Self> {
        let (kind, rest) = s
            .split_once(':')
            .ok_or_else(|| CorralError::invalid_input(format!("malformed entity {:?}", s)))?;
        let kind: Kind = kind.parse()?;
        let (id, relation) = match rest.rsplit_once('#') {
            Some((id, relation)) => (id, Some(relation.parse::<Relation>()?)),
            None => (rest, None),
        };
        Ok(Self {
            kind,
            id: id.to_string(),
            relation,
        })
    }
}

impl Serialize for Entity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The atomic authorization fact: `object` has `relation` to `target`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tuple {
    pub object: Entity,
    pub relation: Relation,
    pub target: Entity,
}

impl Tuple {
    pub fn new(object: Entity, relation: Relation, target: Entity) -> Self {
        Self {
            object,
            relation,
            target,
        }
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.object, self.relation, self.target)
    }
}

/// A partial tuple used to read relations; unset fields match anything.
///
/// A target with an empty id restricts results to that kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TupleFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object: Option<Entity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relation: Option<Relation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<Entity>,
}

impl TupleFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object(mut self, object: Entity) -> Self {
        self.object = Some(object);
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relation = Some(relation);
        self
    }

    pub fn target(mut self, target: Entity) -> Self {
        self.target = Some(target);
        self
    }

    /// Whether `tuple` satisfies every populated field of the filter
    pub fn matches(&self, tuple: &Tuple) -> bool {
        if let Some(object) = &self.object {
            if object != &tuple.object {
                return false;
            }
        }
        if let Some(relation) = &self.relation {
            if *relation != tuple.relation {
                return false;
            }
        }
        if let Some(target) = &self.target {
            if target.kind != tuple.target.kind {
                return false;
            }
            if !target.is_kind_only() && target.id != tuple.target.id {
                return false;
            }
        }
        true
    }
}

/// One page of tuples read from the store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadResponse {
    pub tuples: Vec<Tuple>,
    /// Store cursor for the next page, empty once the filter is exhausted
    pub continuation_token: String,
}
