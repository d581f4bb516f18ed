//! Avlos spec parser
//!
//! Turns a YAML device spec into a [`DeviceTree`]. Used by:
//! - the codegen binary (reads spec files)
//! - tests (inline specs)

pub mod deserializer;
pub mod error;
pub mod ids;
pub mod util;

use std::path::Path;

use avlos_ir::DeviceTree;
use tracing::info;

pub use deserializer::deserialize;
pub use error::SchemaError;
pub use ids::IdAllocator;

/// Parse a spec from YAML text.
pub fn from_str(yaml: &str) -> Result<DeviceTree, SchemaError> {
    let value: serde_yaml::Value =
        serde_yaml::from_str(yaml).map_err(|e| SchemaError::Syntax(e.to_string()))?;
    deserialize(&value)
}

/// Read and parse a spec file.
pub fn from_path(path: &Path) -> Result<DeviceTree, SchemaError> {
    let text = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let tree = from_str(&text)?;
    info!(
        "loaded spec '{}' from {} ({} endpoints)",
        tree.name(),
        path.display(),
        tree.endpoints().len()
    );
    Ok(tree)
}
