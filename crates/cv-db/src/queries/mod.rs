//! Query modules, one per entity.

pub mod recordings;
pub mod users;
