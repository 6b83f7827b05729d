//! Crate-level tests spanning several modules.

pub(crate) mod support;

mod rag_flow;
