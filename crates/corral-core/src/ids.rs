//! Strongly-typed identifiers for UUID-keyed entities

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::tuple::{Entity, Kind};

/// Macro to generate UUID wrappers that know which entity kind they name
macro_rules! define_id {
    ($name:ident, $kind:expr) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// The tuple-store entity this id refers to
            pub fn entity(&self) -> Entity {
                Entity::new($kind, self.0.to_string())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

define_id!(GroupId, Kind::Group);
define_id!(ControllerId, Kind::Controller);
define_id!(ModelId, Kind::Model);
define_id!(OfferId, Kind::ApplicationOffer);

impl GroupId {
    /// The `group:<uuid>#member` userset
    pub fn members(&self) -> Entity {
        Entity::group_members(self.0.to_string())
    }
}
