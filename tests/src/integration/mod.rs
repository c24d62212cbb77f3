//! # Integration Scenarios

pub mod handshake;
pub mod hierarchy;
pub mod policy;
