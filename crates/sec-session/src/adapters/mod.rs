//! # Adapter Implementations
//!
//! Concrete [`SecurityEntity`](crate::ports::SecurityEntity) implementations
//! other than the manager itself.

pub mod endpoint;
pub mod loopback;

pub use endpoint::SecurityEndpoint;
pub use loopback::LoopbackEntity;
