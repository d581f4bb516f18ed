//! Canonical endpoint enumeration.
//!
//! Every artifact (enum headers, endpoint tables, metadata, client bindings)
//! iterates the list produced here, so position `i` in any artifact refers to
//! the endpoint with `ep_id == i`.

use crate::datatype::DataType;
use crate::kind::{self, EndpointKind};
use crate::node::{
    Argument, AttributeEndpoint, BitmaskEndpoint, EndpointInfo, EnumEndpoint, FunctionEndpoint,
    Node, RootNode,
};

/// Borrowed view of one endpoint-variant node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Endpoint<'a> {
    Attribute(&'a AttributeEndpoint),
    Function(&'a FunctionEndpoint),
    Enum(&'a EnumEndpoint),
    Bitmask(&'a BitmaskEndpoint),
}

impl<'a> Endpoint<'a> {
    pub fn info(&self) -> &'a EndpointInfo {
        match *self {
            Endpoint::Attribute(a) => &a.info,
            Endpoint::Function(f) => &f.info,
            Endpoint::Enum(e) => &e.info,
            Endpoint::Bitmask(b) => &b.info,
        }
    }

    pub fn ep_id(&self) -> u32 {
        self.info().ep_id
    }

    pub fn name(&self) -> &'a str {
        &self.info().name
    }

    pub fn endpoint_function_name(&self) -> &'a str {
        &self.info().endpoint_function_name
    }

    /// Value type: the attribute type, the function return type, or
    /// `uint8` for enums and bitmasks.
    pub fn dtype(&self) -> DataType {
        match *self {
            Endpoint::Attribute(a) => a.dtype,
            Endpoint::Function(f) => f.dtype,
            Endpoint::Enum(_) => EnumEndpoint::DTYPE,
            Endpoint::Bitmask(_) => BitmaskEndpoint::DTYPE,
        }
    }

    pub fn getter_name(&self) -> Option<&'a str> {
        match *self {
            Endpoint::Attribute(a) => a.getter_name(),
            Endpoint::Function(_) => None,
            Endpoint::Enum(e) => e.getter_name.as_deref(),
            Endpoint::Bitmask(b) => b.getter_name.as_deref(),
        }
    }

    pub fn setter_name(&self) -> Option<&'a str> {
        match *self {
            Endpoint::Attribute(a) => a.setter_name(),
            Endpoint::Function(_) => None,
            Endpoint::Enum(e) => e.setter_name.as_deref(),
            Endpoint::Bitmask(b) => b.setter_name.as_deref(),
        }
    }

    pub fn caller_name(&self) -> Option<&'a str> {
        match *self {
            Endpoint::Function(f) => Some(&f.caller_name),
            _ => None,
        }
    }

    /// Call arguments; empty for everything but functions.
    pub fn arguments(&self) -> &'a [Argument] {
        match *self {
            Endpoint::Function(f) => &f.arguments,
            _ => &[],
        }
    }

    pub fn kind(&self) -> EndpointKind {
        kind::classify(*self)
    }
}

/// Flatten the tree into its endpoints, depth-first pre-order, children in
/// declaration order. Interior nodes are descended into but not emitted.
pub fn enumerate(root: &RootNode) -> Vec<Endpoint<'_>> {
    let mut out = Vec::new();
    collect(&root.children, &mut out);
    out
}

fn collect<'a>(children: &'a [Node], out: &mut Vec<Endpoint<'a>>) {
    for child in children {
        match child {
            Node::Interior(n) => collect(&n.children, out),
            other => {
                if let Some(ep) = other.as_endpoint() {
                    out.push(ep);
                }
            }
        }
    }
}

/// Enum endpoints, in canonical order.
pub fn enum_endpoints<'a>(endpoints: &[Endpoint<'a>]) -> Vec<&'a EnumEndpoint> {
    endpoints
        .iter()
        .filter_map(|ep| match *ep {
            Endpoint::Enum(e) => Some(e),
            _ => None,
        })
        .collect()
}

/// Bitmask endpoints, in canonical order.
pub fn bitmask_endpoints<'a>(endpoints: &[Endpoint<'a>]) -> Vec<&'a BitmaskEndpoint> {
    endpoints
        .iter()
        .filter_map(|ep| match *ep {
            Endpoint::Bitmask(b) => Some(b),
            _ => None,
        })
        .collect()
}
