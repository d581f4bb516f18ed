/// Endpoint metadata table (header + implementation).
///
/// Describes each endpoint's kind, value type and argument types so firmware
/// can parse ASCII commands without a hand-maintained table. Row `i` of the
/// table is the endpoint with `ep_id == i`.

use avlos_ir::{DeviceTree, Endpoint, EndpointKind};

use crate::filters::{ep_kind_name, metadata_dtype_name, METADATA_DTYPES};

const HEADER_BANNER: &str = "/*\n * Generated by avlos-codegen.\n *\n * Any changes to this file will be overwritten when\n * content is regenerated.\n */\n\n";

/// Size of each row's `arg_dtypes` array; at least 1 so the array is valid C.
fn max_args(endpoints: &[Endpoint<'_>]) -> usize {
    endpoints
        .iter()
        .map(|ep| ep.arguments().len())
        .max()
        .unwrap_or(0)
        .max(1)
}

pub fn generate_header(endpoints: &[Endpoint<'_>]) -> String {
    let mut output = String::from(HEADER_BANNER);
    output.push_str("#pragma once\n\n#include <stdint.h>\n\n");
    output.push_str(&format!("#define AVLOS_META_MAX_ARGS ({})\n\n", max_args(endpoints)));

    output.push_str("typedef enum\n{\n");
    for (i, kind) in EndpointKind::ALL.iter().enumerate() {
        output.push_str(&format!("    {} = {},\n", ep_kind_name(*kind), i));
    }
    output.push_str("} Avlos_EndpointKind;\n\n");

    output.push_str("typedef enum\n{\n");
    for (i, dtype) in METADATA_DTYPES.iter().enumerate() {
        output.push_str(&format!("    {} = {},\n", dtype, i));
    }
    output.push_str("} Avlos_Dtype;\n\n");

    output.push_str(
        "typedef struct\n{\n    const char * name;\n    Avlos_EndpointKind kind;\n    Avlos_Dtype value_dtype;\n    uint8_t num_args;\n    Avlos_Dtype arg_dtypes[AVLOS_META_MAX_ARGS];\n} Avlos_EndpointMeta;\n\n",
    );
    output.push_str("extern const Avlos_EndpointMeta avlos_endpoint_meta[];\n");
    output.push_str("extern const uint32_t avlos_endpoint_meta_count;\n");
    output
}

pub fn generate_impl(tree: &DeviceTree, endpoints: &[Endpoint<'_>], header_name: &str) -> String {
    let mut output = String::from(HEADER_BANNER);
    output.push_str(&format!("#include \"{}\"\n\n", header_name));
    output.push_str("const Avlos_EndpointMeta avlos_endpoint_meta[] =\n{\n");

    for ep in endpoints {
        let arg_dtypes: Vec<&str> = ep
            .arguments()
            .iter()
            .map(|a| metadata_dtype_name(a.dtype))
            .collect();
        let arg_dtypes = if arg_dtypes.is_empty() {
            "AVLOS_DTYPE_VOID".to_string()
        } else {
            arg_dtypes.join(", ")
        };
        output.push_str(&format!(
            "    /* {}: {} */\n    {{\n        .name = \"{}\",\n        .kind = {},\n        .value_dtype = {},\n        .num_args = {},\n        .arg_dtypes = {{ {} }},\n    }},\n",
            ep.ep_id(),
            ep.endpoint_function_name(),
            tree.full_name(ep.info()),
            ep_kind_name(ep.kind()),
            metadata_dtype_name(ep.dtype()),
            ep.arguments().len(),
            arg_dtypes
        ));
    }

    output.push_str("};\n\n");
    output.push_str(
        "const uint32_t avlos_endpoint_meta_count = sizeof(avlos_endpoint_meta) / sizeof(avlos_endpoint_meta[0]);\n",
    );
    output
}
