//! # Trust Substrate Test Suite
//!
//! Cross-crate scenarios: managers talking to each other through the
//! `SecurityEntity` contract, policy hierarchies and persisted policy.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Certificate hierarchies, rule sets, tracing
//! └── integration/
//!     ├── handshake.rs  # Session establishment and sealed traffic
//!     ├── hierarchy.rs  # Parent managers and containers
//!     └── policy.rs     # Rule resolution end to end
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sec-tests
//! RUST_LOG=sec_session=debug cargo test -p sec-tests integration::handshake
//! ```

#[cfg(test)]
pub mod fixtures;
pub mod integration;
