//! Staging, apply and rollback

pub mod cleanup;
pub mod engine;
pub mod fsm;
pub mod manifest;
pub mod staging;
pub mod targets;
