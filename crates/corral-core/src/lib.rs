//! Corral Core - authorization model, pagination and capability checks for
//! the controller fleet control plane

pub mod entitlement;
pub mod error;
pub mod ids;
pub mod models;
pub mod pagination;
pub mod principal;
pub mod schema;
pub mod singleflight;
pub mod traits;
pub mod tuple;

pub use entitlement::*;
pub use error::*;
pub use ids::*;
pub use models::*;
pub use pagination::*;
pub use principal::*;
pub use schema::*;
pub use singleflight::SingleFlight;
pub use traits::*;
pub use tuple::*;
