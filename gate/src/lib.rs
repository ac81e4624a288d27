//! stagegate library
//!
//! Staged, approval-gated file deployments: validation, isolated staging,
//! backup-before-overwrite apply, rollback and the record state machine.

pub mod app;
pub mod authn;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod guard;
pub mod logs;
pub mod models;
pub mod server;
pub mod service;
pub mod storage;
pub mod store;
pub mod utils;
pub mod validate;
pub mod workers;
