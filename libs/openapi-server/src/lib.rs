//! Wire models for the stagegate HTTP API

pub mod models;
