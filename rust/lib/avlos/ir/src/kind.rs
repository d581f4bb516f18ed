//! Endpoint classification used by metadata generation.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::endpoint::Endpoint;
use crate::node::Access;

/// How a host interacts with an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointKind {
    ReadOnly,
    WriteOnly,
    ReadWrite,
    CallNoArgs,
    CallWithArgs,
}

impl EndpointKind {
    pub const ALL: [EndpointKind; 5] = [
        EndpointKind::ReadOnly,
        EndpointKind::WriteOnly,
        EndpointKind::ReadWrite,
        EndpointKind::CallNoArgs,
        EndpointKind::CallWithArgs,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EndpointKind::ReadOnly => "READ_ONLY",
            EndpointKind::WriteOnly => "WRITE_ONLY",
            EndpointKind::ReadWrite => "READ_WRITE",
            EndpointKind::CallNoArgs => "CALL_NO_ARGS",
            EndpointKind::CallWithArgs => "CALL_WITH_ARGS",
        }
    }

    pub fn is_call(self) -> bool {
        matches!(self, EndpointKind::CallNoArgs | EndpointKind::CallWithArgs)
    }
}

impl fmt::Display for EndpointKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify an endpoint. Enums and bitmasks are always read-only.
pub fn classify(ep: Endpoint<'_>) -> EndpointKind {
    match ep {
        Endpoint::Function(f) if f.arguments.is_empty() => EndpointKind::CallNoArgs,
        Endpoint::Function(_) => EndpointKind::CallWithArgs,
        Endpoint::Attribute(a) => match a.access {
            Access::Read { .. } => EndpointKind::ReadOnly,
            Access::Write { .. } => EndpointKind::WriteOnly,
            Access::ReadWrite { .. } => EndpointKind::ReadWrite,
        },
        Endpoint::Enum(_) | Endpoint::Bitmask(_) => EndpointKind::ReadOnly,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatype::DataType;
    use crate::node::{
        Argument, AttributeEndpoint, BitmaskEndpoint, BitmaskFlag, EndpointInfo, EnumEndpoint,
        EnumOption, FunctionEndpoint, Meta, NodeId,
    };

    fn info() -> EndpointInfo {
        EndpointInfo {
            ep_id: 0,
            name: "x".into(),
            endpoint_function_name: "avlos_x".into(),
            parent: NodeId::ROOT,
            summary: None,
            unit: None,
            meta: Meta::new(),
        }
    }

    fn attribute(getter: Option<&str>, setter: Option<&str>) -> AttributeEndpoint {
        AttributeEndpoint {
            info: info(),
            dtype: DataType::Float,
            access: Access::from_parts(getter.map(Into::into), setter.map(Into::into)).unwrap(),
        }
    }

    #[test]
    fn attribute_access() {
        let ro = attribute(Some("g"), None);
        let wo = attribute(None, Some("s"));
        let rw = attribute(Some("g"), Some("s"));
        assert_eq!(classify(Endpoint::Attribute(&ro)), EndpointKind::ReadOnly);
        assert_eq!(classify(Endpoint::Attribute(&wo)), EndpointKind::WriteOnly);
        assert_eq!(classify(Endpoint::Attribute(&rw)), EndpointKind::ReadWrite);
    }

    #[test]
    fn functions_by_arity() {
        let mut f = FunctionEndpoint {
            info: info(),
            dtype: DataType::Void,
            caller_name: "do_it".into(),
            arguments: vec![],
        };
        assert_eq!(classify(Endpoint::Function(&f)), EndpointKind::CallNoArgs);
        f.arguments.push(Argument {
            name: "pos".into(),
            dtype: DataType::Float,
            unit: None,
        });
        assert_eq!(classify(Endpoint::Function(&f)), EndpointKind::CallWithArgs);
    }

    #[test]
    fn enums_and_bitmasks_are_read_only_even_with_setter() {
        let e = EnumEndpoint {
            info: info(),
            options: vec![EnumOption { name: "IDLE".into(), value: 0 }],
            getter_name: Some("get_state".into()),
            setter_name: Some("set_state".into()),
        };
        let b = BitmaskEndpoint {
            info: info(),
            flags: vec![BitmaskFlag { name: "FAULT".into(), bit: 0 }],
            getter_name: None,
            setter_name: Some("clear".into()),
        };
        assert_eq!(classify(Endpoint::Enum(&e)), EndpointKind::ReadOnly);
        assert_eq!(classify(Endpoint::Bitmask(&b)), EndpointKind::ReadOnly);
    }

    #[test]
    fn kind_names() {
        let names: Vec<&str> = EndpointKind::ALL.iter().map(|k| k.name()).collect();
        assert_eq!(
            names,
            ["READ_ONLY", "WRITE_ONLY", "READ_WRITE", "CALL_NO_ARGS", "CALL_WITH_ARGS"]
        );
    }
}
