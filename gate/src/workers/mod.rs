//! Background workers

pub mod cleanup;
