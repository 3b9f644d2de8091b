//! Router Module Index
//!
//! Routes are split by access level so that authentication is applied once, as a
//! layer, on the whole protected group.

/// Routes accessible without a token: health, login and refresh.
pub mod public;

/// Routes behind the bearer-token layer: logout, current user and `/v1/articles`.
pub mod authenticated;
