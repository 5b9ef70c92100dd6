//! sea-orm entities.

pub mod session;
pub mod user;
