//! Account flows: credential check, registration, password reset, Google
//! sign-in and the access gate.

pub mod credentials;
pub mod gate;
pub mod google;
pub mod password;
pub mod registration;
pub mod reset;

pub use credentials::{authenticate, normalize_email};
pub use gate::{CurrentUser, require_auth};
pub use password::{hash_password, verify_password};
