/// C firmware generator: enum header, endpoint header, endpoint implementation,
/// and (optionally) the endpoint metadata table.

use avlos_ir::{
    bitmask_endpoints, enum_endpoints, DataType, DeviceTree, Endpoint, FunctionEndpoint,
};
use anyhow::{bail, Result};
use tracing::{debug, warn};

use crate::config::GeneratorConfig;
use crate::filters::{as_include, c_constant, c_escape, c_symbol, file_name, protocol_hash};
use crate::{c_metadata, GeneratedCode, Generator};

pub const OUTPUT_ENUMS: &str = "output_enums";
pub const OUTPUT_HEADER: &str = "output_header";
pub const OUTPUT_IMPL: &str = "output_impl";
pub const OUTPUT_METADATA_HEADER: &str = "output_metadata_header";
pub const OUTPUT_METADATA_IMPL: &str = "output_metadata_impl";

/// Largest string payload an endpoint can carry in one frame.
const MAX_STRING_LEN: usize = 8;

const ENDPOINT_SIGNATURE: &str = "(uint8_t * buffer, uint8_t * buffer_len, Avlos_Command cmd)";

pub struct CFirmwareGenerator;

impl Generator for CFirmwareGenerator {
    fn name(&self) -> &str {
        "generator_c"
    }

    fn required_paths(&self) -> &[&'static str] {
        &[OUTPUT_ENUMS, OUTPUT_HEADER, OUTPUT_IMPL]
    }

    fn optional_paths(&self) -> &[&'static str] {
        &[OUTPUT_METADATA_HEADER, OUTPUT_METADATA_IMPL]
    }

    fn generate(
        &self,
        tree: &DeviceTree,
        endpoints: &[Endpoint<'_>],
        config: &GeneratorConfig,
    ) -> Result<GeneratedCode> {
        if endpoints.is_empty() {
            bail!("spec '{}' declares no endpoints", tree.name());
        }
        for ep in endpoints {
            check_supported(tree, *ep)?;
        }

        let enums_path = config.require(OUTPUT_ENUMS)?;
        let header_path = config.require(OUTPUT_HEADER)?;
        let includes = [file_name(header_path), file_name(enums_path)];
        let hash = protocol_hash(tree, endpoints, config.hash_string.as_deref());

        let mut code = GeneratedCode::default();
        code.push(enums_path, generate_enums(tree, endpoints));
        code.push(header_path, generate_header(tree, endpoints, config, hash));
        code.push(
            config.require(OUTPUT_IMPL)?,
            generate_impl(tree, endpoints, config, &includes),
        );

        match (config.path(OUTPUT_METADATA_HEADER), config.path(OUTPUT_METADATA_IMPL)) {
            (Some(meta_header), Some(meta_impl)) => {
                code.push(meta_header, c_metadata::generate_header(endpoints));
                code.push(
                    meta_impl,
                    c_metadata::generate_impl(tree, endpoints, &file_name(meta_header)),
                );
            }
            (None, None) => debug!("metadata paths not configured, skipping metadata"),
            _ => warn!(
                "both {} and {} are needed for metadata output, skipping",
                OUTPUT_METADATA_HEADER, OUTPUT_METADATA_IMPL
            ),
        }

        Ok(code)
    }
}

/// String values only travel as whole getter results; they can't be
/// arguments, return values or written.
fn check_supported(tree: &DeviceTree, ep: Endpoint<'_>) -> Result<()> {
    let name = tree.full_name(ep.info());
    if let Some(arg) = ep.arguments().iter().find(|a| a.dtype == DataType::Str) {
        bail!("{}: string argument '{}' is not supported", name, arg.name);
    }
    if ep.dtype() == DataType::Str {
        if ep.caller_name().is_some() {
            bail!("{}: string return values are not supported", name);
        }
        if ep.setter_name().is_some() {
            bail!("{}: string setters are not supported", name);
        }
    }
    Ok(())
}

pub(crate) fn banner(tree: &DeviceTree) -> String {
    let version = tree
        .root
        .version
        .as_deref()
        .map(|v| format!(" v{}", v))
        .unwrap_or_default();
    format!(
        "/*\n * Generated by avlos-codegen from device spec '{}'{}.\n *\n * Any changes to this file will be overwritten when\n * content is regenerated.\n */\n\n",
        tree.name(),
        version
    )
}

fn generate_enums(tree: &DeviceTree, endpoints: &[Endpoint<'_>]) -> String {
    let mut output = banner(tree);
    output.push_str("#pragma once\n\n");

    for ep in enum_endpoints(endpoints) {
        let full_name = tree.full_name(&ep.info);
        let prefix = c_constant(&full_name);
        output.push_str("typedef enum\n{\n");
        for option in &ep.options {
            output.push_str(&format!("    {}_{} = {},\n", prefix, option.name, option.value));
        }
        output.push_str(&format!("}} {}_options;\n\n", c_symbol(&full_name)));
    }

    for ep in bitmask_endpoints(endpoints) {
        let full_name = tree.full_name(&ep.info);
        let prefix = c_constant(&full_name);
        output.push_str("typedef enum\n{\n");
        output.push_str(&format!("    {}_NONE = 0,\n", prefix));
        for flag in &ep.flags {
            output.push_str(&format!("    {}_{} = (1 << {}),\n", prefix, flag.name, flag.bit));
        }
        output.push_str(&format!("}} {}_flags;\n\n", c_symbol(&full_name)));
    }

    output
}

fn generate_header(
    tree: &DeviceTree,
    endpoints: &[Endpoint<'_>],
    config: &GeneratorConfig,
    hash: u32,
) -> String {
    let mut output = banner(tree);
    output.push_str("#pragma once\n\n");
    output.push_str("#include <stdint.h>\n#include <stdbool.h>\n#include <stddef.h>\n");
    for include in &config.header_includes {
        output.push_str(&format!("#include {}\n", as_include(include)));
    }
    output.push('\n');

    output.push_str(
        "typedef enum\n{\n    AVLOS_RET_NOACTION = 0,\n    AVLOS_RET_READ = 1,\n    AVLOS_RET_WRITE = 2,\n    AVLOS_RET_CALL = 3\n} Avlos_Return;\n\n",
    );
    output.push_str(
        "typedef enum\n{\n    AVLOS_CMD_WRITE = 0,\n    AVLOS_CMD_READ = 1\n} Avlos_Command;\n\n",
    );
    output.push_str(&format!("#define AVLOS_EP_COUNT ({})\n\n", endpoints.len()));
    output.push_str(&format!(
        "extern uint8_t (*avlos_endpoints[AVLOS_EP_COUNT]){};\n",
        ENDPOINT_SIGNATURE
    ));
    output.push_str("extern uint32_t _avlos_get_proto_hash(void);\n\n");
    output.push_str(&format!(
        "static inline uint32_t avlos_get_hash(void) {{ return 0x{:08X}; }}\n\n",
        hash
    ));

    for ep in endpoints {
        let summary = ep.info().summary.as_deref().map(c_escape).unwrap_or_default();
        output.push_str(&format!(
            "/*\n * {} ({}), ep_id {}\n * {}\n */\n",
            tree.full_name(ep.info()),
            ep.kind(),
            ep.ep_id(),
            summary
        ));
        output.push_str(&format!(
            "uint8_t {}{};\n\n",
            ep.endpoint_function_name(),
            ENDPOINT_SIGNATURE
        ));
    }

    output
}

fn generate_impl(
    tree: &DeviceTree,
    endpoints: &[Endpoint<'_>],
    config: &GeneratorConfig,
    local_includes: &[String],
) -> String {
    let mut output = banner(tree);
    output.push_str("#include <string.h>\n");
    for include in local_includes {
        output.push_str(&format!("#include \"{}\"\n", include));
    }
    for include in &config.impl_includes {
        output.push_str(&format!("#include {}\n", as_include(include)));
    }
    output.push('\n');

    if endpoints.iter().any(|ep| ep.dtype() == DataType::Str) {
        output.push_str(&format!(
            "static uint8_t _avlos_getter_string(const char * value, uint8_t * buffer)\n{{\n    uint8_t len = 0;\n    while (len < {max} && value[len] != '\\0')\n    {{\n        buffer[len] = (uint8_t)value[len];\n        len++;\n    }}\n    return len;\n}}\n\n",
            max = MAX_STRING_LEN
        ));
    }

    output.push_str(&format!(
        "uint8_t (*avlos_endpoints[AVLOS_EP_COUNT]){} =\n{{\n",
        ENDPOINT_SIGNATURE
    ));
    for ep in endpoints {
        output.push_str(&format!("    &{},\n", ep.endpoint_function_name()));
    }
    output.push_str("};\n\n");

    output.push_str("uint32_t _avlos_get_proto_hash(void)\n{\n    return avlos_get_hash();\n}\n\n");

    for ep in endpoints {
        output.push_str(&endpoint_body(tree, *ep));
        output.push('\n');
    }

    output
}

fn endpoint_body(tree: &DeviceTree, ep: Endpoint<'_>) -> String {
    let mut body = format!("uint8_t {}{}\n{{\n", ep.endpoint_function_name(), ENDPOINT_SIGNATURE);
    match ep {
        Endpoint::Function(f) => body.push_str(&call_body(f)),
        _ if ep.dtype() == DataType::Str => {
            if let Some(getter) = ep.getter_name() {
                body.push_str(&format!(
                    "    if (AVLOS_CMD_READ == cmd)\n    {{\n        *buffer_len = _avlos_getter_string({}(), buffer);\n        return AVLOS_RET_READ;\n    }}\n",
                    getter
                ));
            }
            body.push_str("    return AVLOS_RET_NOACTION;\n");
        }
        _ => body.push_str(&value_body(tree, ep)),
    }
    body.push_str("}\n");
    body
}

fn value_body(tree: &DeviceTree, ep: Endpoint<'_>) -> String {
    let c_type = ep.dtype().c_name();
    let mut body = format!("    {} v;\n", c_type);
    if let Some(getter) = ep.getter_name() {
        body.push_str(&format!(
            "    if (AVLOS_CMD_READ == cmd)\n    {{\n        v = ({}){}();\n        *buffer_len = sizeof(v);\n        memcpy(buffer, &v, sizeof(v));\n        return AVLOS_RET_READ;\n    }}\n",
            c_type, getter
        ));
    }
    if let Some(setter) = ep.setter_name() {
        let cast = match ep {
            Endpoint::Enum(_) => format!("({}_options)", c_symbol(&tree.full_name(ep.info()))),
            Endpoint::Bitmask(_) => format!("({}_flags)", c_symbol(&tree.full_name(ep.info()))),
            _ => String::new(),
        };
        body.push_str(&format!(
            "    if (AVLOS_CMD_WRITE == cmd)\n    {{\n        memcpy(&v, buffer, sizeof(v));\n        {}({}v);\n        return AVLOS_RET_WRITE;\n    }}\n",
            setter, cast
        ));
    }
    body.push_str("    return AVLOS_RET_NOACTION;\n");
    body
}

/// Argument locals carry an `arg_` prefix so they can't shadow the
/// endpoint parameters or `ret_val`.
fn call_body(f: &FunctionEndpoint) -> String {
    let mut body = String::new();
    let mut offset = 0;
    for arg in &f.arguments {
        body.push_str(&format!(
            "    {ty} arg_{name};\n    memcpy(&arg_{name}, buffer + {offset}, sizeof(arg_{name}));\n",
            ty = arg.dtype.c_name(),
            name = arg.name,
        ));
        offset += arg.dtype.size();
    }
    let args: Vec<String> = f.arguments.iter().map(|a| format!("arg_{}", a.name)).collect();
    let call = format!("{}({})", f.caller_name, args.join(", "));
    if f.dtype == DataType::Void {
        body.push_str(&format!("    {};\n    *buffer_len = 0;\n", call));
    } else {
        body.push_str(&format!(
            "    {} ret_val = {};\n    memcpy(buffer, &ret_val, sizeof(ret_val));\n    *buffer_len = sizeof(ret_val);\n",
            f.dtype.c_name(),
            call
        ));
    }
    body.push_str("    return AVLOS_RET_CALL;\n");
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(yaml: &str) -> DeviceTree {
        avlos_parser::from_str(yaml).unwrap()
    }

    fn config() -> GeneratorConfig {
        GeneratorConfig::with_paths([
            (OUTPUT_ENUMS, "/out/enums.h"),
            (OUTPUT_HEADER, "/out/fw_endpoints.h"),
            (OUTPUT_IMPL, "/out/fw_endpoints.c"),
        ])
    }

    const SPEC: &str = r#"
name: dev
remote_attributes:
  sn: {dtype: uint32, getter_name: get_sn}
  fw_version: {dtype: string, getter_name: get_fw_version}
  mode:
    getter_name: get_mode
    setter_name: set_mode
    options: [IDLE, RUN]
  move_to:
    caller_name: do_move
    dtype: float
    arguments:
      - {name: pos, dtype: float}
      - {name: vel, dtype: int16}
"#;

    #[test]
    fn emits_three_files_without_metadata() {
        let tree = tree(SPEC);
        let eps = tree.endpoints();
        let code = CFirmwareGenerator.generate(&tree, &eps, &config()).unwrap();
        assert_eq!(code.files.len(), 3);
    }

    #[test]
    fn impl_contents() {
        let tree = tree(SPEC);
        let eps = tree.endpoints();
        let code = CFirmwareGenerator.generate(&tree, &eps, &config()).unwrap();
        let c = &code.file(std::path::Path::new("/out/fw_endpoints.c")).unwrap().content;
        assert!(c.contains("#include \"fw_endpoints.h\""));
        assert!(c.contains("_avlos_getter_string"));
        assert!(c.contains("    &avlos_sn,\n    &avlos_fw_version,\n    &avlos_mode,\n    &avlos_move_to,\n"));
        assert!(c.contains("memcpy(&arg_vel, buffer + 4, sizeof(arg_vel));"));
        assert!(c.contains("float ret_val = do_move(arg_pos, arg_vel);"));
        assert!(c.contains("set_mode((mode_options)v);"));
    }

    #[test]
    fn enum_header_contents() {
        let tree = tree(SPEC);
        let eps = tree.endpoints();
        let code = CFirmwareGenerator.generate(&tree, &eps, &config()).unwrap();
        let h = &code.files[0].content;
        assert!(h.contains("MODE_IDLE = 0,"));
        assert!(h.contains("MODE_RUN = 1,"));
        assert!(h.contains("} mode_options;"));
    }

    #[test]
    fn rejects_string_arguments() {
        let tree = tree(
            "name: dev\nremote_attributes:\n  say:\n    caller_name: say\n    arguments: [{name: text, dtype: string}]\n",
        );
        let eps = tree.endpoints();
        let err = CFirmwareGenerator.generate(&tree, &eps, &config()).unwrap_err();
        assert!(err.to_string().contains("string argument 'text'"));
    }

    #[test]
    fn arguments_named_like_parameters() {
        let tree = tree(
            "name: dev\nremote_attributes:\n  f:\n    caller_name: f\n    dtype: int32\n    arguments:\n      - {name: buffer, dtype: uint8}\n      - {name: cmd, dtype: uint8}\n      - {name: ret_val, dtype: uint16}\n",
        );
        let eps = tree.endpoints();
        let code = CFirmwareGenerator.generate(&tree, &eps, &config()).unwrap();
        let c = &code.files[2].content;
        assert!(c.contains("    uint8_t arg_buffer;\n    memcpy(&arg_buffer, buffer + 0, sizeof(arg_buffer));"));
        assert!(c.contains("memcpy(&arg_ret_val, buffer + 2, sizeof(arg_ret_val));"));
        assert!(c.contains("int32_t ret_val = f(arg_buffer, arg_cmd, arg_ret_val);"));
    }

    #[test]
    fn hash_string_changes_hash() {
        let tree = tree(SPEC);
        let eps = tree.endpoints();
        let plain = CFirmwareGenerator.generate(&tree, &eps, &config()).unwrap();
        let mut salted_config = config();
        salted_config.hash_string = Some("0xSALT".into());
        let salted = CFirmwareGenerator.generate(&tree, &eps, &salted_config).unwrap();
        assert_ne!(plain.files[1].content, salted.files[1].content);
        assert_eq!(plain.files[0], salted.files[0]);
    }
}
