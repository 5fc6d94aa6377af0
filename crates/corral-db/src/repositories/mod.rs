//! Repository implementations

pub mod group;
pub mod identity;
pub mod resource;

pub use group::*;
pub use identity::*;
pub use resource::*;

use corral_core::LimitOffsetPagination;

/// Apply an offset filter to rows already in order
pub(crate) fn page<T: Clone>(rows: impl Iterator<Item = T>, filter: &LimitOffsetPagination) -> Vec<T> {
    rows.skip(filter.offset() as usize)
        .take(filter.limit() as usize)
        .collect()
}
