pub mod parser;
pub mod remap;
pub mod schema;

pub use parser::FileKind;
