//! Data model

pub mod deployment;
pub mod target;
pub mod validation;
