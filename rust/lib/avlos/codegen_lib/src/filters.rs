/// Naming and formatting helpers shared by the generators

use std::path::Path;

use avlos_ir::{DataType, DeviceTree, Endpoint, EndpointKind};

/// Render a C include target: bare names get `<>`, already-delimited ones
/// are kept as-is.
pub fn as_include(input: &str) -> String {
    let quoted = input.len() >= 2 && input.starts_with('"') && input.ends_with('"');
    let angled = input.starts_with('<') && input.ends_with('>');
    if quoted || angled {
        input.to_string()
    } else {
        format!("<{}>", input)
    }
}

/// Base file name of a path, for `#include "..."` between generated files.
pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `controller.state` → `controller_state`
pub fn c_symbol(full_name: &str) -> String {
    full_name.replace('.', "_")
}

/// `controller.state` → `CONTROLLER_STATE`
pub fn c_constant(full_name: &str) -> String {
    c_symbol(full_name).to_uppercase()
}

/// `Avlos_EndpointKind` constant for an endpoint kind.
pub fn ep_kind_name(kind: EndpointKind) -> String {
    format!("AVLOS_EP_KIND_{}", kind.name())
}

/// `Avlos_Dtype` constant. The metadata set is smaller than the registry,
/// so wide integers narrow to 32 bits and `double` to `float`.
pub fn metadata_dtype_name(dtype: DataType) -> &'static str {
    match dtype {
        DataType::Void => "AVLOS_DTYPE_VOID",
        DataType::Bool => "AVLOS_DTYPE_BOOL",
        DataType::UInt8 | DataType::Int8 => "AVLOS_DTYPE_UINT8",
        DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => "AVLOS_DTYPE_UINT32",
        DataType::Int16 | DataType::Int32 | DataType::Int64 => "AVLOS_DTYPE_INT32",
        DataType::Float | DataType::Double => "AVLOS_DTYPE_FLOAT",
        DataType::Str => "AVLOS_DTYPE_STRING",
    }
}

/// Names of the metadata dtype set, in enum order.
pub const METADATA_DTYPES: [&str; 7] = [
    "AVLOS_DTYPE_VOID",
    "AVLOS_DTYPE_BOOL",
    "AVLOS_DTYPE_UINT8",
    "AVLOS_DTYPE_UINT32",
    "AVLOS_DTYPE_INT32",
    "AVLOS_DTYPE_FLOAT",
    "AVLOS_DTYPE_STRING",
];

/// CRC32 over the optional salt and every endpoint's signature in
/// canonical order. Any change to ids, names, kinds or types changes it.
pub fn protocol_hash(tree: &DeviceTree, endpoints: &[Endpoint<'_>], salt: Option<&str>) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    if let Some(salt) = salt {
        hasher.update(salt.as_bytes());
    }
    for ep in endpoints {
        let args: Vec<&str> = ep.arguments().iter().map(|a| a.dtype.name()).collect();
        let signature = format!(
            "{}:{}:{}:{}({});",
            ep.ep_id(),
            tree.full_name(ep.info()),
            ep.kind(),
            ep.dtype(),
            args.join(",")
        );
        hasher.update(signature.as_bytes());
    }
    hasher.finalize()
}

/// Escape text for use inside a C string literal or comment.
pub fn c_escape(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("*/", "* /")
        .replace('\n', " ")
}
