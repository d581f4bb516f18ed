//! Spec mapping → typed device tree.
//!
//! A node's variant is decided once, here, from the markers it carries:
//!
//! | marker present               | variant          |
//! |------------------------------|------------------|
//! | `caller_name`                | function         |
//! | `options`                    | enum             |
//! | `flags`                      | bitmask          |
//! | `getter_name`/`setter_name`  | attribute        |
//! | `remote_attributes`          | interior (recurse) |
//!
//! More than one of `caller_name`/`options`/`flags` on the same node is an
//! error, as is mixing any endpoint marker with `remote_attributes`.
//! Enums and bitmasks still need a getter or setter.
//! Ids are handed out while the tree is built, depth-first pre-order, so
//! `ep_id` always equals the endpoint's position in the canonical list.

use std::collections::HashSet;

use avlos_ir::{
    endpoint_function_name, Access, Argument, AttributeEndpoint, BitmaskEndpoint, BitmaskFlag,
    DataType, DeviceTree, EndpointInfo, EnumEndpoint, EnumOption, FunctionEndpoint, InteriorNode,
    Node, NodeId, RootNode, Scope,
};
use serde_yaml::{Mapping, Value};
use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::ids::IdAllocator;
use crate::util::{
    check_identifier, meta, optional_dtype, optional_int, optional_seq, optional_str,
    required_str,
};

const ROOT_PATH: &str = "<root>";

/// Keys a node may carry. Anything else is reported and ignored.
const KNOWN_KEYS: &[&str] = &[
    "name",
    "summary",
    "dtype",
    "unit",
    "meta",
    "getter_name",
    "setter_name",
    "caller_name",
    "arguments",
    "options",
    "flags",
    "remote_attributes",
    "rst_target",
];

/// Build a device tree from a parsed spec.
///
/// Each call owns its own id allocators, so ids always start at 0.
pub fn deserialize(spec: &Value) -> Result<DeviceTree, SchemaError> {
    Deserializer::new().build(spec)
}

struct Deserializer {
    ep_ids: IdAllocator,
    scope_ids: IdAllocator,
    scopes: Vec<Scope>,
    /// Names from the root's children down to the node being built.
    path: Vec<String>,
}

impl Deserializer {
    fn new() -> Self {
        Self {
            ep_ids: IdAllocator::new(),
            scope_ids: IdAllocator::new(),
            scopes: Vec::new(),
            path: Vec::new(),
        }
    }

    fn build(mut self, spec: &Value) -> Result<DeviceTree, SchemaError> {
        let map = spec
            .as_mapping()
            .ok_or_else(|| SchemaError::Syntax("spec root must be a mapping".into()))?;

        let name = required_str(map, "name", ROOT_PATH)?;
        check_identifier(ROOT_PATH, &name)?;
        let version = match map.get("version") {
            Some(Value::Number(n)) if n.is_f64() => {
                return Err(SchemaError::InvalidField {
                    path: ROOT_PATH.to_string(),
                    field: "version",
                    reason: format!("must be quoted, '{}' reads as a number", n),
                })
            }
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => optional_str(map, "version", ROOT_PATH)?,
        };
        let summary = optional_str(map, "summary", ROOT_PATH)?;

        let root_id = self.open_scope(&name, None);
        let children = match map.get("remote_attributes") {
            None | Some(Value::Null) => Vec::new(),
            Some(value) => self.children(value, root_id)?,
        };

        debug!(
            "deserialized spec '{}': {} endpoints, {} scopes",
            name,
            self.ep_ids.issued(),
            self.scopes.len()
        );

        let root = RootNode {
            name,
            version,
            summary,
            children,
        };
        Ok(DeviceTree::new(root, self.scopes))
    }

    fn open_scope(&mut self, name: &str, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.scope_ids.next());
        self.scopes.push(Scope {
            name: name.to_string(),
            parent,
        });
        id
    }

    fn display_path(&self) -> String {
        if self.path.is_empty() {
            ROOT_PATH.to_string()
        } else {
            self.path.join(".")
        }
    }

    /// Build all children of one scope, in declaration order.
    fn children(&mut self, value: &Value, parent: NodeId) -> Result<Vec<Node>, SchemaError> {
        let entries = self.child_entries(value)?;
        let mut seen = HashSet::with_capacity(entries.len());
        let mut nodes = Vec::with_capacity(entries.len());
        for (name, body) in entries {
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateName {
                    path: self.display_path(),
                    what: "child",
                    name,
                });
            }
            self.path.push(name);
            let node = self.node(body, parent);
            self.path.pop();
            nodes.push(node?);
        }
        Ok(nodes)
    }

    /// Accepts both `{child: {...}}` and `[{name: child, ...}]` forms.
    fn child_entries<'v>(&self, value: &'v Value) -> Result<Vec<(String, &'v Mapping)>, SchemaError> {
        let path = self.display_path();
        let not_a_node = |what: String| SchemaError::InvalidField {
            path: path.clone(),
            field: "remote_attributes",
            reason: what,
        };
        match value {
            Value::Mapping(map) => map
                .iter()
                .map(|(key, body)| -> Result<(String, &'v Mapping), SchemaError> {
                    let name = key
                        .as_str()
                        .ok_or_else(|| not_a_node("child names must be strings".into()))?;
                    let body = body
                        .as_mapping()
                        .ok_or_else(|| not_a_node(format!("child '{name}' must be a mapping")))?;
                    Ok((name.to_string(), body))
                })
                .collect(),
            Value::Sequence(items) => items
                .iter()
                .map(|item| -> Result<(String, &'v Mapping), SchemaError> {
                    let body = item
                        .as_mapping()
                        .ok_or_else(|| not_a_node("list entries must be mappings".into()))?;
                    let name = required_str(body, "name", &path)?;
                    Ok((name, body))
                })
                .collect(),
            _ => Err(not_a_node("must be a mapping or a list".into())),
        }
    }

    fn node(&mut self, body: &Mapping, parent: NodeId) -> Result<Node, SchemaError> {
        let path = self.display_path();
        let name = self.path.last().cloned().unwrap_or_default();
        check_identifier(&path, &name)?;

        for key in body.keys() {
            match key.as_str() {
                Some(k) if KNOWN_KEYS.contains(&k) => {}
                _ => warn!("{}: ignoring unknown key {:?}", path, key),
            }
        }

        let has = |key: &str| !matches!(body.get(key), None | Some(Value::Null));
        let has_accessor = has("getter_name") || has("setter_name");

        let mut markers: Vec<&'static str> = ["caller_name", "options", "flags"]
            .into_iter()
            .filter(|m| has(*m))
            .collect();
        if markers.len() > 1 {
            return Err(SchemaError::ConflictingMarkers { path, markers });
        }
        if has("caller_name") && has_accessor {
            markers.extend(["getter_name", "setter_name"].into_iter().filter(|m| has(*m)));
            return Err(SchemaError::ConflictingMarkers { path, markers });
        }
        if has("remote_attributes") && (has_accessor || !markers.is_empty()) {
            markers.extend(["getter_name", "setter_name"].into_iter().filter(|m| has(*m)));
            markers.push("remote_attributes");
            return Err(SchemaError::ConflictingMarkers { path, markers });
        }

        if has("caller_name") {
            self.function(body, name, parent, &path).map(Node::Function)
        } else if has("options") {
            self.enumeration(body, name, parent, &path).map(Node::Enum)
        } else if has("flags") {
            self.bitmask(body, name, parent, &path).map(Node::Bitmask)
        } else if has_accessor {
            self.attribute(body, name, parent, &path).map(Node::Attribute)
        } else if has("remote_attributes") {
            self.interior(body, name, parent, &path).map(Node::Interior)
        } else {
            Err(SchemaError::MissingAccessor { path })
        }
    }

    fn interior(
        &mut self,
        body: &Mapping,
        name: String,
        parent: NodeId,
        path: &str,
    ) -> Result<InteriorNode, SchemaError> {
        let summary = optional_str(body, "summary", path)?;
        let id = self.open_scope(&name, Some(parent));
        let children = match body.get("remote_attributes") {
            Some(value) => self.children(value, id)?,
            None => Vec::new(),
        };
        Ok(InteriorNode {
            id,
            name,
            summary,
            children,
        })
    }

    /// Assign the next `ep_id` and collect fields shared by all endpoints.
    fn endpoint_info(
        &mut self,
        body: &Mapping,
        name: String,
        parent: NodeId,
        path: &str,
    ) -> Result<EndpointInfo, SchemaError> {
        let summary = optional_str(body, "summary", path)?;
        let unit = optional_str(body, "unit", path)?;
        let meta = meta(body, path)?;
        let segments: Vec<&str> = self.path.iter().map(String::as_str).collect();
        let info = EndpointInfo {
            ep_id: self.ep_ids.next(),
            endpoint_function_name: endpoint_function_name(&segments),
            name,
            parent,
            summary,
            unit,
            meta,
        };
        debug!("endpoint {} -> ep_id {}", path, info.ep_id);
        Ok(info)
    }

    fn attribute(
        &mut self,
        body: &Mapping,
        name: String,
        parent: NodeId,
        path: &str,
    ) -> Result<AttributeEndpoint, SchemaError> {
        let dtype = optional_dtype(body, "dtype", path)?.ok_or_else(|| SchemaError::MissingField {
            path: path.to_string(),
            field: "dtype",
        })?;
        if dtype == DataType::Void {
            return Err(SchemaError::InvalidField {
                path: path.to_string(),
                field: "dtype",
                reason: "cannot be void for an attribute".into(),
            });
        }
        let getter = optional_str(body, "getter_name", path)?;
        let setter = optional_str(body, "setter_name", path)?;
        let access = Access::from_parts(getter, setter).ok_or_else(|| SchemaError::MissingAccessor {
            path: path.to_string(),
        })?;
        let info = self.endpoint_info(body, name, parent, path)?;
        Ok(AttributeEndpoint {
            info,
            dtype,
            access,
        })
    }

    fn function(
        &mut self,
        body: &Mapping,
        name: String,
        parent: NodeId,
        path: &str,
    ) -> Result<FunctionEndpoint, SchemaError> {
        let caller_name = required_str(body, "caller_name", path)?;
        let dtype = optional_dtype(body, "dtype", path)?.unwrap_or(DataType::Void);

        let mut seen = HashSet::new();
        let mut arguments = Vec::new();
        for item in optional_seq(body, "arguments", path)? {
            let arg = item.as_mapping().ok_or_else(|| SchemaError::InvalidField {
                path: path.to_string(),
                field: "arguments",
                reason: "entries must be mappings".into(),
            })?;
            let arg_name = required_str(arg, "name", path)?;
            check_identifier(path, &arg_name)?;
            if !seen.insert(arg_name.clone()) {
                return Err(SchemaError::DuplicateName {
                    path: path.to_string(),
                    what: "argument",
                    name: arg_name,
                });
            }
            let arg_dtype = optional_dtype(arg, "dtype", path)?.ok_or_else(|| {
                SchemaError::MissingField {
                    path: format!("{path}({arg_name})"),
                    field: "dtype",
                }
            })?;
            if arg_dtype == DataType::Void {
                return Err(SchemaError::InvalidField {
                    path: format!("{path}({arg_name})"),
                    field: "dtype",
                    reason: "cannot be void for an argument".into(),
                });
            }
            arguments.push(Argument {
                name: arg_name,
                dtype: arg_dtype,
                unit: optional_str(arg, "unit", path)?,
            });
        }

        let info = self.endpoint_info(body, name, parent, path)?;
        Ok(FunctionEndpoint {
            info,
            dtype,
            caller_name,
            arguments,
        })
    }

    fn enumeration(
        &mut self,
        body: &Mapping,
        name: String,
        parent: NodeId,
        path: &str,
    ) -> Result<EnumEndpoint, SchemaError> {
        require_uint8(body, path)?;
        let (getter_name, setter_name) = accessors(body, path)?;
        let entries = named_entries(body, "options", "value", path)?;
        let mut options = Vec::with_capacity(entries.len());
        let mut names = HashSet::new();
        let mut values = HashSet::new();
        for (option, value) in entries {
            check_identifier(path, &option)?;
            let value = in_range(path, "option", value, 0, u8::MAX as i64)?;
            if !names.insert(option.clone()) {
                return Err(SchemaError::DuplicateName {
                    path: path.to_string(),
                    what: "option",
                    name: option,
                });
            }
            if !values.insert(value) {
                return Err(SchemaError::DuplicateValue {
                    path: path.to_string(),
                    what: "option",
                    value: value as i64,
                });
            }
            options.push(EnumOption {
                name: option,
                value,
            });
        }

        let info = self.endpoint_info(body, name, parent, path)?;
        Ok(EnumEndpoint {
            info,
            options,
            getter_name,
            setter_name,
        })
    }

    fn bitmask(
        &mut self,
        body: &Mapping,
        name: String,
        parent: NodeId,
        path: &str,
    ) -> Result<BitmaskEndpoint, SchemaError> {
        require_uint8(body, path)?;
        let (getter_name, setter_name) = accessors(body, path)?;
        let entries = named_entries(body, "flags", "bit", path)?;
        let mut flags = Vec::with_capacity(entries.len());
        let mut names = HashSet::new();
        let mut bits = HashSet::new();
        for (flag, bit) in entries {
            check_identifier(path, &flag)?;
            let bit = in_range(path, "flag", bit, 0, 7)?;
            if !names.insert(flag.clone()) {
                return Err(SchemaError::DuplicateName {
                    path: path.to_string(),
                    what: "flag",
                    name: flag,
                });
            }
            if !bits.insert(bit) {
                return Err(SchemaError::DuplicateValue {
                    path: path.to_string(),
                    what: "flag",
                    value: bit as i64,
                });
            }
            flags.push(BitmaskFlag { name: flag, bit });
        }

        let info = self.endpoint_info(body, name, parent, path)?;
        Ok(BitmaskEndpoint {
            info,
            flags,
            getter_name,
            setter_name,
        })
    }
}

/// Enums and bitmasks are only reachable through their accessors, so at
/// least one of them must be named.
fn accessors(
    body: &Mapping,
    path: &str,
) -> Result<(Option<String>, Option<String>), SchemaError> {
    let getter = optional_str(body, "getter_name", path)?;
    let setter = optional_str(body, "setter_name", path)?;
    if getter.is_none() && setter.is_none() {
        return Err(SchemaError::MissingAccessor {
            path: path.to_string(),
        });
    }
    Ok((getter, setter))
}

/// Enums and bitmasks are always `uint8`; an explicit dtype must agree.
fn require_uint8(body: &Mapping, path: &str) -> Result<(), SchemaError> {
    match optional_dtype(body, "dtype", path)? {
        None | Some(DataType::UInt8) => Ok(()),
        Some(other) => Err(SchemaError::InvalidField {
            path: path.to_string(),
            field: "dtype",
            reason: format!("must be uint8, found {other}"),
        }),
    }
}

/// Read `options`/`flags`: either bare names (numbered by position) or
/// `{name, <value_key>}` mappings.
fn named_entries(
    body: &Mapping,
    field: &'static str,
    value_key: &'static str,
    path: &str,
) -> Result<Vec<(String, i64)>, SchemaError> {
    optional_seq(body, field, path)?
        .iter()
        .enumerate()
        .map(|(position, item)| match item {
            Value::String(name) => Ok((name.clone(), position as i64)),
            Value::Mapping(entry) => {
                let name = required_str(entry, "name", path)?;
                let value = optional_int(entry, value_key, path)?.unwrap_or(position as i64);
                Ok((name, value))
            }
            _ => Err(SchemaError::InvalidField {
                path: path.to_string(),
                field,
                reason: "entries must be names or mappings".into(),
            }),
        })
        .collect()
}

fn in_range(path: &str, what: &'static str, value: i64, min: i64, max: i64) -> Result<u8, SchemaError> {
    if (min..=max).contains(&value) {
        Ok(value as u8)
    } else {
        Err(SchemaError::OutOfRange {
            path: path.to_string(),
            what,
            value,
            min,
            max,
        })
    }
}
