//! File service
//!
//! Router, worker and publisher wired together behind one owning object.

pub mod core;
pub mod publisher;
pub mod router;
pub mod worker;

pub use self::core::{DEFAULT_CAPACITY, FileService, ServiceOptions};
pub use publisher::{Outbound, Publisher};
pub use router::{Pending, Router};
pub use worker::WorkerOptions;
