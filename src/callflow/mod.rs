//! Remote call-flow documents: fetch, parse, evaluate.

pub mod document;
pub mod fetch;
pub mod interpreter;

pub use document::{CallFlowDocument, Command};
pub use fetch::{DocumentFetcher, HttpFetcher, QueryParams};
pub use interpreter::Interpreter;
