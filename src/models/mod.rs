pub mod enums;
pub mod document;
pub mod chunk;
pub mod evaluation;

pub use enums::*;
pub use document::*;
pub use chunk::*;
pub use evaluation::*;
