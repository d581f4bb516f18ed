/// C++ host client generator
///
/// One class per scope. Every class derives from `Node`, which frames
/// requests by `ep_id` through user-supplied send/recv callbacks.

use avlos_ir::{DataType, DeviceTree, Endpoint, InteriorNode, Node, NodeId};
use anyhow::{bail, Result};

use crate::c_firmware::banner;
use crate::config::GeneratorConfig;
use crate::filters::{as_include, c_escape, capitalize_first, file_name, protocol_hash};
use crate::{GeneratedCode, Generator};

pub const OUTPUT_HELPERS: &str = "output_helpers";
pub const OUTPUT_HEADER: &str = "output_header";
pub const OUTPUT_IMPL: &str = "output_impl";

/// `ep_id` travels in the low byte of the arbitration id.
const MAX_ENDPOINTS: usize = 256;

const CTOR_PARAMS: &str = "uint8_t _can_node_id, send_callback _send_cb, recv_callback _recv_cb, delay_us_callback _delay_us_cb, uint32_t _delay_us_value";
const CTOR_ARGS: &str = "_can_node_id, _send_cb, _recv_cb, _delay_us_cb, _delay_us_value";

pub struct CppClientGenerator;

impl Generator for CppClientGenerator {
    fn name(&self) -> &str {
        "generator_cpp"
    }

    fn required_paths(&self) -> &[&'static str] {
        &[OUTPUT_HELPERS, OUTPUT_HEADER, OUTPUT_IMPL]
    }

    fn generate(
        &self,
        tree: &DeviceTree,
        endpoints: &[Endpoint<'_>],
        config: &GeneratorConfig,
    ) -> Result<GeneratedCode> {
        if endpoints.len() > MAX_ENDPOINTS {
            bail!(
                "spec '{}' has {} endpoints; the client addresses at most {}",
                tree.name(),
                endpoints.len(),
                MAX_ENDPOINTS
            );
        }
        for ep in endpoints {
            if let Some(arg) = ep.arguments().iter().find(|a| a.dtype == DataType::Str) {
                bail!(
                    "{}: string argument '{}' is not supported",
                    tree.full_name(ep.info()),
                    arg.name
                );
            }
            if ep.caller_name().is_some() && ep.dtype() == DataType::Str {
                bail!("{}: string return values are not supported", tree.full_name(ep.info()));
            }
        }

        let helpers_path = config.require(OUTPUT_HELPERS)?;
        let header_path = config.require(OUTPUT_HEADER)?;
        let hash = protocol_hash(tree, endpoints, config.hash_string.as_deref());

        let mut code = GeneratedCode::default();
        code.push(helpers_path, generate_helpers(tree, hash));
        code.push(
            header_path,
            generate_header(tree, endpoints, config, &file_name(helpers_path)),
        );
        code.push(
            config.require(OUTPUT_IMPL)?,
            generate_impl(tree, endpoints, &file_name(header_path)),
        );
        Ok(code)
    }
}

fn cpp_type(dtype: DataType) -> &'static str {
    match dtype {
        DataType::Str => "std::string",
        other => other.c_name(),
    }
}

/// `controller.position` → `Controller_Position_`; the root uses its own name.
fn class_name(tree: &DeviceTree, id: NodeId) -> String {
    let path = tree.scope_path(id);
    if path.is_empty() {
        return capitalize_first(tree.name());
    }
    let parts: Vec<String> = path.iter().map(|p| capitalize_first(p)).collect();
    format!("{}_", parts.join("_"))
}

fn generate_helpers(tree: &DeviceTree, hash: u32) -> String {
    let mut output = banner(tree);
    output.push_str("#pragma once\n\n");
    output.push_str("#include <cstdint>\n#include <cstring>\n#include <string>\n\n");
    output.push_str(&format!("static const uint32_t avlos_proto_hash = 0x{:08X};\n\n", hash));
    output.push_str(
        "typedef void (*send_callback)(uint32_t arbitration_id, uint8_t *data, uint8_t dlc, bool rtr);\n\
         typedef bool (*recv_callback)(uint32_t *arbitration_id, uint8_t *data, uint8_t *dlc);\n\
         typedef void (*delay_us_callback)(uint32_t us);\n\n",
    );
    output.push_str(
        "template<typename T>\n\
         inline size_t read_le(T* value, const uint8_t* buffer)\n\
         {\n    memcpy(value, buffer, sizeof(T));\n    return sizeof(T);\n}\n\n\
         template<typename T>\n\
         inline T read_le(const uint8_t* buffer)\n\
         {\n    T value;\n    memcpy(&value, buffer, sizeof(T));\n    return value;\n}\n\n\
         template<typename T>\n\
         inline size_t write_le(T value, uint8_t* buffer)\n\
         {\n    memcpy(buffer, &value, sizeof(T));\n    return sizeof(T);\n}\n\n",
    );
    output.push_str(
        "class Node\n{\npublic:\n\
         \x20   Node(uint8_t _can_node_id, send_callback _send_cb, recv_callback _recv_cb, delay_us_callback _delay_us_cb, uint32_t _delay_us_value):\n\
         \x20       can_node_id(_can_node_id), send_cb(_send_cb), recv_cb(_recv_cb), delay_us_cb(_delay_us_cb), delay_us_value(_delay_us_value) {}\n\n\
         protected:\n\
         \x20   uint8_t can_node_id;\n\
         \x20   send_callback send_cb;\n\
         \x20   recv_callback recv_cb;\n\
         \x20   delay_us_callback delay_us_cb;\n\
         \x20   uint32_t delay_us_value;\n\
         \x20   uint8_t _data[8];\n\
         \x20   uint8_t _dlc;\n\n\
         \x20   uint32_t get_arbitration_id(uint8_t ep_id)\n\
         \x20   {\n        return ((uint32_t)can_node_id << 8) | ep_id;\n    }\n\n\
         \x20   void send(uint8_t ep_id, uint8_t *data, uint8_t dlc, bool rtr)\n\
         \x20   {\n        send_cb(get_arbitration_id(ep_id), data, dlc, rtr);\n    }\n\n\
         \x20   bool recv(uint8_t ep_id, uint8_t *data, uint8_t *dlc)\n\
         \x20   {\n        uint32_t arbitration_id = get_arbitration_id(ep_id);\n        delay_us_cb(delay_us_value);\n        return recv_cb(&arbitration_id, data, dlc);\n    }\n};\n",
    );
    output
}

/// Scopes in an order where every class is declared before its parent.
fn scopes_children_first(tree: &DeviceTree) -> Vec<&InteriorNode> {
    let mut nodes = tree.interior_nodes();
    nodes.reverse();
    nodes
}

#[derive(Clone, Copy)]
enum Method {
    Get,
    Set,
    Call,
}

fn methods(ep: Endpoint<'_>) -> Vec<Method> {
    if ep.caller_name().is_some() {
        return vec![Method::Call];
    }
    let mut methods = Vec::new();
    if ep.getter_name().is_some() {
        methods.push(Method::Get);
    }
    if ep.setter_name().is_some() && ep.dtype() != DataType::Str {
        methods.push(Method::Set);
    }
    methods
}

/// Method signature, optionally qualified with its class.
fn signature(ep: Endpoint<'_>, method: Method, class: Option<&str>) -> String {
    let scope = class.map(|c| format!("{}::", c)).unwrap_or_default();
    let name = ep.name();
    match method {
        Method::Get => format!("{} {}get_{}(void)", cpp_type(ep.dtype()), scope, name),
        Method::Set => format!("void {}set_{}({} value)", scope, name, cpp_type(ep.dtype())),
        Method::Call => {
            let args: Vec<String> = ep
                .arguments()
                .iter()
                .map(|a| format!("{} {}", cpp_type(a.dtype), a.name))
                .collect();
            format!("{} {}{}({})", cpp_type(ep.dtype()), scope, name, args.join(", "))
        }
    }
}

fn class_decl(tree: &DeviceTree, id: NodeId, children: &[Node]) -> String {
    let class = class_name(tree, id);
    let child_scopes: Vec<&InteriorNode> =
        children.iter().filter_map(|c| c.as_interior()).collect();

    let mut output = format!("class {} : Node\n{{\npublic:\n", class);
    output.push_str(&format!("    {}({}):\n        Node({})", class, CTOR_PARAMS, CTOR_ARGS));
    for child in &child_scopes {
        output.push_str(&format!("\n        , {}({})", child.name, CTOR_ARGS));
    }
    output.push_str(" {}\n\n");

    for ep in children.iter().filter_map(|c| c.as_endpoint()) {
        if let Some(summary) = &ep.info().summary {
            output.push_str(&format!("    /* {} */\n", c_escape(summary)));
        }
        for method in methods(ep) {
            output.push_str(&format!("    {};\n", signature(ep, method, None)));
        }
    }
    for child in &child_scopes {
        output.push_str(&format!("    {} {};\n", class_name(tree, child.id), child.name));
    }
    output.push_str("};\n\n");
    output
}

fn generate_header(
    tree: &DeviceTree,
    endpoints: &[Endpoint<'_>],
    config: &GeneratorConfig,
    helpers_name: &str,
) -> String {
    let mut output = banner(tree);
    output.push_str("#pragma once\n\n");
    output.push_str(&format!("#include \"{}\"\n", helpers_name));
    for include in &config.header_includes {
        output.push_str(&format!("#include {}\n", as_include(include)));
    }
    output.push_str(&format!("\n// {} endpoints\n\n", endpoints.len()));

    for node in scopes_children_first(tree) {
        output.push_str(&class_decl(tree, node.id, &node.children));
    }
    output.push_str(&class_decl(tree, NodeId::ROOT, &tree.root.children));
    output
}

fn method_body(ep: Endpoint<'_>, method: Method) -> String {
    let id = ep.ep_id();
    let ty = cpp_type(ep.dtype());
    match method {
        Method::Get if ep.dtype() == DataType::Str => format!(
            "    char buffer[9] = {{0}};\n    this->send({id}, this->_data, 0, true);\n    if (this->recv({id}, this->_data, &(this->_dlc)))\n    {{\n        memcpy(buffer, this->_data, this->_dlc);\n    }}\n    return std::string(buffer);\n"
        ),
        Method::Get => format!(
            "    {ty} value = 0;\n    this->send({id}, this->_data, 0, true);\n    if (this->recv({id}, this->_data, &(this->_dlc)))\n    {{\n        read_le(&value, this->_data);\n    }}\n    return value;\n"
        ),
        Method::Set => format!(
            "    write_le(value, this->_data);\n    this->send({id}, this->_data, sizeof({ty}), false);\n"
        ),
        // Arguments are method parameters, so the body declares no locals.
        Method::Call => {
            let mut body = String::from("    this->_dlc = 0;\n");
            for arg in ep.arguments() {
                body.push_str(&format!(
                    "    this->_dlc += ::write_le<{}>({}, this->_data + this->_dlc);\n",
                    cpp_type(arg.dtype),
                    arg.name
                ));
            }
            body.push_str(&format!("    this->send({id}, this->_data, this->_dlc, false);\n"));
            if ep.dtype() != DataType::Void {
                body.push_str(&format!(
                    "    if (this->recv({id}, this->_data, &(this->_dlc)))\n    {{\n        return ::read_le<{ty}>(this->_data);\n    }}\n    return 0;\n"
                ));
            }
            body
        }
    }
}

fn generate_impl(tree: &DeviceTree, endpoints: &[Endpoint<'_>], header_name: &str) -> String {
    let mut output = banner(tree);
    output.push_str(&format!("#include \"{}\"\n\n", header_name));
    for ep in endpoints {
        let class = class_name(tree, ep.info().parent);
        for method in methods(*ep) {
            output.push_str(&signature(*ep, method, Some(&class)));
            output.push_str("\n{\n");
            output.push_str(&method_body(*ep, method));
            output.push_str("}\n\n");
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    const SPEC: &str = r#"
name: tm
remote_attributes:
  fw_version: {dtype: string, getter_name: get_fw}
  reset: {caller_name: system_reset}
  controller:
    remote_attributes:
      state:
        getter_name: get_state
        setter_name: set_state
        options: [IDLE, CL_CONTROL]
      position:
        remote_attributes:
          setpoint: {dtype: float, getter_name: g, setter_name: s}
      set_pos_vel:
        caller_name: spv
        dtype: float
        arguments: [{name: pos, dtype: float}, {name: vel, dtype: float}]
"#;

    fn generate() -> GeneratedCode {
        let tree = avlos_parser::from_str(SPEC).unwrap();
        let eps = tree.endpoints();
        CppClientGenerator.generate(&tree, &eps, &config()).unwrap()
    }

    #[test]
    fn classes_declared_children_first() {
        let code = generate();
        let hpp = &code.file(Path::new("/out/tm.hpp")).unwrap().content;
        let position = hpp.find("class Controller_Position_ : Node").unwrap();
        let controller = hpp.find("class Controller_ : Node").unwrap();
        let root = hpp.find("class Tm : Node").unwrap();
        assert!(position < controller && controller < root);
        assert!(hpp.contains("    Controller_Position_ position;"));
        assert!(hpp.contains("    float set_pos_vel(float pos, float vel);"));
        assert!(hpp.contains("    uint8_t get_state(void);"));
        assert!(hpp.contains("    void set_state(uint8_t value);"));
    }

    #[test]
    fn methods_address_ep_ids() {
        let code = generate();
        let cpp = &code.file(Path::new("/out/tm.cpp")).unwrap().content;
        assert!(cpp.contains("std::string Tm::get_fw_version(void)"));
        assert!(cpp.contains("void Tm::reset()\n{\n    this->_dlc = 0;\n    this->send(1, this->_data, this->_dlc, false);\n}"));
        assert!(cpp.contains("float Controller_Position_::get_setpoint(void)"));
        assert!(cpp.contains("this->send(3, this->_data, 0, true);"));
        assert!(cpp.contains("this->_dlc += ::write_le<float>(vel, this->_data + this->_dlc);"));
        assert!(cpp.contains("return ::read_le<float>(this->_data);"));
    }

    #[test]
    fn helpers_carry_hash() {
        let code = generate();
        let helpers = &code.files[0].content;
        assert!(helpers.contains("static const uint32_t avlos_proto_hash = 0x"));
        assert!(helpers.contains("class Node"));
    }

    fn config() -> GeneratorConfig {
        GeneratorConfig::with_paths([
            (OUTPUT_HELPERS, "/out/helpers.hpp"),
            (OUTPUT_HEADER, "/out/tm.hpp"),
            (OUTPUT_IMPL, "/out/tm.cpp"),
        ])
    }

    #[test]
    fn argument_names_do_not_clash_with_body() {
        let tree = avlos_parser::from_str(
            "name: dev\nremote_attributes:\n  f:\n    caller_name: f\n    dtype: int32\n    arguments: [{name: value, dtype: int32}, {name: data_len, dtype: uint8}]\n",
        )
        .unwrap();
        let eps = tree.endpoints();
        let code = CppClientGenerator.generate(&tree, &eps, &config()).unwrap();
        let cpp = &code.files[2].content;
        assert!(cpp.contains("int32_t Dev::f(int32_t value, uint8_t data_len)\n{\n    this->_dlc = 0;\n"));
        assert!(cpp.contains("::write_le<int32_t>(value, this->_data + this->_dlc);"));
        assert!(cpp.contains("::write_le<uint8_t>(data_len, this->_data + this->_dlc);"));
    }

    #[test]
    fn rejects_more_endpoints_than_fit_a_byte() {
        let mut yaml = String::from("name: dev\nremote_attributes:\n");
        for i in 0..300 {
            yaml.push_str(&format!("  v{i}: {{dtype: uint8, getter_name: get_v{i}}}\n"));
        }
        let tree = avlos_parser::from_str(&yaml).unwrap();
        let eps = tree.endpoints();
        let err = CppClientGenerator.generate(&tree, &eps, &config()).unwrap_err();
        assert!(err.to_string().contains("at most 256"));

        let mut yaml = String::from("name: dev\nremote_attributes:\n");
        for i in 0..256 {
            yaml.push_str(&format!("  v{i}: {{dtype: uint8, getter_name: get_v{i}}}\n"));
        }
        let tree = avlos_parser::from_str(&yaml).unwrap();
        let eps = tree.endpoints();
        let code = CppClientGenerator.generate(&tree, &eps, &config()).unwrap();
        assert!(code.files[2].content.contains("this->send(255, this->_data, 0, true);"));
    }
}
