// Application layer - use cases and orchestration.
// The CLI (or any other front end) talks to the bank only through here.

pub mod error;
pub mod ids;
pub mod service;

pub use error::*;
pub use ids::*;
pub use service::*;
