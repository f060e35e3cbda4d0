//! Request orchestration: resolve a company's document set, extract, index,
//! fan out principle scoring, aggregate and persist the evaluation.

pub mod error;
pub mod types;
pub mod fingerprint;
pub mod runner;
pub mod background;


pub use error::*;
pub use types::*;
pub use fingerprint::*;
pub use runner::*;
pub use background::*;
