//! Retrieval-augmented answering over the course catalog.
//!
//! [`AiGenerator`] drives the model and its tool calls, [`SessionStore`]
//! keeps per-session history, and [`RagSystem`] ties them to the vector
//! store.

pub mod generator;
pub mod session;
pub mod system;

pub use generator::{AiGenerator, FALLBACK_ANSWER};
pub use session::{Session, SessionStore, Turn};
pub use system::{QueryAnswer, RagSystem};
