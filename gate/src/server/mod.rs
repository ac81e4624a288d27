//! HTTP resource layer over the deployment service

pub mod context;
pub mod convert;
pub mod error;
pub mod handlers;
pub mod serve;
pub mod state;
