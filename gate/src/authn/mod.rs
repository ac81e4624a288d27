//! Request actors and API-token authentication

pub mod actor;
pub mod tokens;
