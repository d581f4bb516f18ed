//! Node model: the typed device tree built from a spec.
//!
//! Ownership flows strictly downward: the root owns its children, every
//! interior node owns its children. Upward links are plain `NodeId`s that
//! index into the tree's scope table, so they never keep anything alive.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::datatype::DataType;
use crate::endpoint::{self, Endpoint};

/// Prefix of every generated endpoint function symbol.
pub const ENDPOINT_FUNCTION_PREFIX: &str = "avlos_";

/// Identifier of a scope (the root or an interior node).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Free-form scalar attached to an endpoint under `meta`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetaValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MetaValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

pub type Meta = BTreeMap<String, MetaValue>;

/// Fields every endpoint variant carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointInfo {
    /// Dense traversal-order id, unique within one tree.
    pub ep_id: u32,
    pub name: String,
    /// `avlos_` + dotted path with `.` replaced by `_`.
    pub endpoint_function_name: String,
    /// Scope that owns this endpoint (non-owning).
    pub parent: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: Meta,
}

impl EndpointInfo {
    /// Whether `meta.<key>` is set to `true`.
    pub fn flag(&self, key: &str) -> bool {
        self.meta.get(key).and_then(MetaValue::as_bool).unwrap_or(false)
    }
}

/// How an attribute is reached from the host. At least one accessor is
/// always present, so an accessor-less attribute cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Read { getter: String },
    Write { setter: String },
    ReadWrite { getter: String, setter: String },
}

impl Access {
    /// Build from the two optional spec fields; `None` if both are absent.
    pub fn from_parts(getter: Option<String>, setter: Option<String>) -> Option<Access> {
        match (getter, setter) {
            (Some(getter), Some(setter)) => Some(Access::ReadWrite { getter, setter }),
            (Some(getter), None) => Some(Access::Read { getter }),
            (None, Some(setter)) => Some(Access::Write { setter }),
            (None, None) => None,
        }
    }

    pub fn getter(&self) -> Option<&str> {
        match self {
            Access::Read { getter } | Access::ReadWrite { getter, .. } => Some(getter),
            Access::Write { .. } => None,
        }
    }

    pub fn setter(&self) -> Option<&str> {
        match self {
            Access::Write { setter } | Access::ReadWrite { setter, .. } => Some(setter),
            Access::Read { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeEndpoint {
    pub info: EndpointInfo,
    pub dtype: DataType,
    pub access: Access,
}

impl AttributeEndpoint {
    pub fn getter_name(&self) -> Option<&str> {
        self.access.getter()
    }

    pub fn setter_name(&self) -> Option<&str> {
        self.access.setter()
    }
}

/// One positional argument of a callable endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub dtype: DataType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionEndpoint {
    pub info: EndpointInfo,
    /// Return type; `void` when the spec omits it.
    pub dtype: DataType,
    pub caller_name: String,
    pub arguments: Vec<Argument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnumOption {
    pub name: String,
    pub value: u8,
}

/// Enumerated value endpoint. Its wire type is always `uint8`.
///
/// The getter/setter names are the firmware functions the rendered code
/// forwards to; they do not change how the endpoint is classified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumEndpoint {
    pub info: EndpointInfo,
    pub options: Vec<EnumOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub getter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setter_name: Option<String>,
}

impl EnumEndpoint {
    pub const DTYPE: DataType = DataType::UInt8;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitmaskFlag {
    pub name: String,
    /// Bit position, `0..8`.
    pub bit: u8,
}

impl BitmaskFlag {
    pub fn mask(&self) -> u8 {
        1u8 << self.bit
    }
}

/// Bit-flag set endpoint. Its wire type is always `uint8`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitmaskEndpoint {
    pub info: EndpointInfo,
    pub flags: Vec<BitmaskFlag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub getter_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setter_name: Option<String>,
}

impl BitmaskEndpoint {
    pub const DTYPE: DataType = DataType::UInt8;
}

/// Grouping node. Holds children in declaration order and no endpoint fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteriorNode {
    pub id: NodeId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub children: Vec<Node>,
}

/// A non-root node of the device tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Interior(InteriorNode),
    Attribute(AttributeEndpoint),
    Function(FunctionEndpoint),
    Enum(EnumEndpoint),
    Bitmask(BitmaskEndpoint),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Interior(n) => &n.name,
            Node::Attribute(a) => &a.info.name,
            Node::Function(f) => &f.info.name,
            Node::Enum(e) => &e.info.name,
            Node::Bitmask(b) => &b.info.name,
        }
    }

    /// Borrow this node as an endpoint, or `None` for interior nodes.
    pub fn as_endpoint(&self) -> Option<Endpoint<'_>> {
        match self {
            Node::Interior(_) => None,
            Node::Attribute(a) => Some(Endpoint::Attribute(a)),
            Node::Function(f) => Some(Endpoint::Function(f)),
            Node::Enum(e) => Some(Endpoint::Enum(e)),
            Node::Bitmask(b) => Some(Endpoint::Bitmask(b)),
        }
    }

    pub fn as_interior(&self) -> Option<&InteriorNode> {
        match self {
            Node::Interior(n) => Some(n),
            _ => None,
        }
    }
}

/// Look up a direct child by name.
pub(crate) fn find_child<'a>(children: &'a [Node], name: &str) -> Option<&'a Node> {
    children.iter().find(|c| c.name() == name)
}

impl InteriorNode {
    pub fn child(&self, name: &str) -> Option<&Node> {
        find_child(&self.children, name)
    }
}

/// The single root of a device tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub children: Vec<Node>,
}

impl RootNode {
    pub fn child(&self, name: &str) -> Option<&Node> {
        find_child(&self.children, name)
    }
}

/// Back-reference entry for one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub name: String,
    /// `None` only for the root scope.
    pub parent: Option<NodeId>,
}

/// A fully built, immutable device tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceTree {
    pub root: RootNode,
    /// Indexed by `NodeId`; entry 0 is the root.
    scopes: Vec<Scope>,
}

impl DeviceTree {
    /// Assemble a tree. `scopes[0]` must describe the root and every
    /// `NodeId` referenced by the tree must index into `scopes`.
    pub fn new(root: RootNode, scopes: Vec<Scope>) -> Self {
        debug_assert!(scopes.first().is_some_and(|s| s.parent.is_none()));
        Self { root, scopes }
    }

    pub fn name(&self) -> &str {
        &self.root.name
    }

    pub fn scope(&self, id: NodeId) -> Option<&Scope> {
        self.scopes.get(id.index())
    }

    /// Names from just below the root down to `id`, inclusive.
    pub fn scope_path(&self, id: NodeId) -> Vec<&str> {
        let mut path = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let Some(scope) = self.scope(current) else { break };
            if scope.parent.is_none() {
                break;
            }
            path.push(scope.name.as_str());
            cursor = scope.parent;
        }
        path.reverse();
        path
    }

    /// Dot-joined path of an endpoint, e.g. `controller.position.setpoint`.
    pub fn full_name(&self, info: &EndpointInfo) -> String {
        let mut parts = self.scope_path(info.parent);
        parts.push(&info.name);
        parts.join(".")
    }

    /// Canonical endpoint list; see [`endpoint::enumerate`].
    pub fn endpoints(&self) -> Vec<Endpoint<'_>> {
        endpoint::enumerate(&self.root)
    }

    /// Resolve a dotted path such as `controller.position` to a node.
    pub fn find(&self, path: &str) -> Option<&Node> {
        let mut segments = path.split('.');
        let mut node = self.root.child(segments.next()?)?;
        for segment in segments {
            node = node.as_interior()?.child(segment)?;
        }
        Some(node)
    }

    /// Every interior node in canonical order, root excluded.
    pub fn interior_nodes(&self) -> Vec<&InteriorNode> {
        fn walk<'a>(children: &'a [Node], out: &mut Vec<&'a InteriorNode>) {
            for child in children {
                if let Node::Interior(n) = child {
                    out.push(n);
                    walk(&n.children, out);
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.root.children, &mut out);
        out
    }
}

/// Derive the generated function symbol from a dotted path.
pub fn endpoint_function_name(path: &[&str]) -> String {
    format!("{}{}", ENDPOINT_FUNCTION_PREFIX, path.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(ep_id: u32, name: &str, parent: NodeId, path: &[&str]) -> EndpointInfo {
        EndpointInfo {
            ep_id,
            name: name.into(),
            endpoint_function_name: endpoint_function_name(path),
            parent,
            summary: None,
            unit: None,
            meta: Meta::new(),
        }
    }

    fn sample() -> DeviceTree {
        let setpoint = Node::Attribute(AttributeEndpoint {
            info: info(0, "setpoint", NodeId(2), &["controller", "position", "setpoint"]),
            dtype: DataType::Float,
            access: Access::ReadWrite {
                getter: "get_sp".into(),
                setter: "set_sp".into(),
            },
        });
        let position = Node::Interior(InteriorNode {
            id: NodeId(2),
            name: "position".into(),
            summary: None,
            children: vec![setpoint],
        });
        let controller = Node::Interior(InteriorNode {
            id: NodeId(1),
            name: "controller".into(),
            summary: None,
            children: vec![position],
        });
        let root = RootNode {
            name: "tm".into(),
            version: None,
            summary: None,
            children: vec![controller],
        };
        let scopes = vec![
            Scope { name: "tm".into(), parent: None },
            Scope { name: "controller".into(), parent: Some(NodeId::ROOT) },
            Scope { name: "position".into(), parent: Some(NodeId(1)) },
        ];
        DeviceTree::new(root, scopes)
    }

    #[test]
    fn full_name_follows_parent_links() {
        let tree = sample();
        let node = tree.find("controller.position.setpoint").unwrap();
        let ep = node.as_endpoint().unwrap();
        assert_eq!(tree.full_name(ep.info()), "controller.position.setpoint");
        assert_eq!(
            ep.info().endpoint_function_name,
            "avlos_controller_position_setpoint"
        );
    }

    #[test]
    fn find_rejects_paths_through_endpoints() {
        let tree = sample();
        assert!(tree.find("controller.position.setpoint.x").is_none());
        assert!(tree.find("missing").is_none());
        assert_eq!(tree.interior_nodes().len(), 2);
    }

    #[test]
    fn access_from_parts() {
        assert_eq!(Access::from_parts(None, None), None);
        let w = Access::from_parts(None, Some("set".into())).unwrap();
        assert_eq!(w.getter(), None);
        assert_eq!(w.setter(), Some("set"));
    }

    #[test]
    fn bitmask_flag_mask() {
        let flag = BitmaskFlag { name: "X".into(), bit: 3 };
        assert_eq!(flag.mask(), 0b1000);
    }
}
