pub mod document;
pub mod error;
pub mod result;

pub use document::*;
pub use error::*;
pub use result::*;
