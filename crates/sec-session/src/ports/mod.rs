//! Ports: the contract every security participant exposes to its peers.

pub mod entity;

pub use entity::{SecurityEntity, SessionProposal};
