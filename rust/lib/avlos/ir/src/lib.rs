//! Avlos device-spec Intermediate Representation (IR)
//!
//! Data structures shared between:
//! - parser (spec mapping → typed tree)
//! - codegen library (tree + endpoint list → artifacts)
//!
//! Four pieces:
//! 1. DataType: closed registry of primitive wire types
//! 2. Node: the typed device tree
//! 3. Endpoint: canonical depth-first endpoint enumeration
//! 4. Kind: endpoint classification for metadata tables

pub mod datatype;
pub mod endpoint;
pub mod kind;
pub mod node;

pub use datatype::*;
pub use endpoint::*;
pub use kind::*;
pub use node::*;
