pub mod error;
pub mod memory;
pub mod names;
pub mod node;
pub mod result;
pub mod walker;

pub use error::*;
pub use memory::{DoctypeSpec, DocumentSpec, DocumentTree, MemoryDocument, NodeSpec};
pub use node::*;
pub use result::*;
pub use walker::*;
