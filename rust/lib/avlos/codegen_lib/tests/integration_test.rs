/// Integration test for the full device-spec pipeline

use std::path::{Path, PathBuf};

use avlos_codegen_lib::*;
use avlos_ir::DeviceTree;

fn device() -> DeviceTree {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../parser/tests/data/good_device.yaml");
    avlos_parser::from_path(&path).unwrap()
}

fn config(out: &Path) -> RunConfig {
    let yaml = r#"
generators:
  generator_c:
    enabled: true
    hash_string: "0xTINYMOVR"
    paths:
      output_enums: c/tm_enums.h
      output_header: c/fw_endpoints.h
      output_impl: c/fw_endpoints.c
      output_metadata_header: c/fw_metadata.h
      output_metadata_impl: c/fw_metadata.c
    header_includes: [src/common.h]
  generator_cpp:
    enabled: true
    paths:
      output_helpers: cpp/helpers.hpp
      output_header: cpp/tm.hpp
      output_impl: cpp/tm.cpp
"#;
    RunConfig::from_str(yaml, out).unwrap()
}

#[test]
fn test_full_device_codegen() {
    let tree = device();
    let endpoints = tree.endpoints();
    let out = Path::new("/tmp/avlos-out");

    let code = Dispatcher::default()
        .run(&tree, &endpoints, &config(out))
        .into_result()
        .unwrap();

    // 5 C files (with metadata) + 3 C++ files
    assert_eq!(code.files.len(), 8);

    let file = |rel: &str| &code.file(&out.join(rel)).unwrap().content;

    let enums = file("c/tm_enums.h");
    assert!(enums.contains("CONTROLLER_STATE_IDLE = 0,"));
    assert!(enums.contains("CONTROLLER_MODE_HOMING = 4,"));
    assert!(enums.contains("ERRORS_UNDERVOLTAGE = (1 << 0),"));
    assert!(enums.contains("SCHEDULER_WARNINGS_CONTROL_BLOCK_REENTERED = (1 << 0),"));

    let header = file("c/fw_endpoints.h");
    assert!(header.contains("#include <src/common.h>"));
    assert!(header.contains("#define AVLOS_EP_COUNT (17)"));
    assert!(header.contains("uint8_t avlos_controller_position_setpoint(uint8_t * buffer"));

    let c = file("c/fw_endpoints.c");
    assert!(c.contains("avlos_endpoints["));
    assert!(c.contains("_avlos_get_proto_hash"));
    assert!(c.contains("_avlos_getter_string"));
    assert!(c.contains("controller_set_state((controller_state_options)v);"));
    assert!(c.contains("Watchdog_set_timeout_seconds(v);"));

    let meta = file("c/fw_metadata.c");
    assert!(meta.contains("#include \"fw_metadata.h\""));
    assert_eq!(meta.matches(".name = ").count(), 17);
    assert!(meta.contains(".name = \"protocol_hash\""));
    assert!(meta.contains(".name = \"controller.set_pos_vel_setpoints\",\n        .kind = AVLOS_EP_KIND_CALL_WITH_ARGS"));
    assert!(meta.contains(".num_args = 2"));

    let hpp = file("cpp/tm.hpp");
    assert!(hpp.contains("#include \"helpers.hpp\""));
    assert!(hpp.contains("class Tm : Node"));
    assert!(hpp.contains("class Controller_Position_ : Node"));
}

#[test]
fn test_missing_path_isolated_to_one_generator() {
    let tree = device();
    let endpoints = tree.endpoints();
    let out = Path::new("/tmp/avlos-out");
    let mut config = config(out);
    config
        .generators
        .get_mut("generator_c")
        .unwrap()
        .paths
        .remove("output_impl");

    let outcome = Dispatcher::default().run(&tree, &endpoints, &config);
    assert!(!outcome.is_success());

    let c = outcome.get("generator_c").unwrap();
    assert!(matches!(
        c.result,
        Err(DispatchError::Config(ConfigError::MissingPath { ref key, .. })) if key == "output_impl"
    ));
    let cpp = outcome.get("generator_cpp").unwrap();
    assert_eq!(cpp.result.as_ref().unwrap().files.len(), 3);
}

#[test]
fn test_output_is_deterministic() {
    let tree = device();
    let endpoints = tree.endpoints();
    let config = config(Path::new("/tmp/avlos-out"));
    let dispatcher = Dispatcher::default();

    let first = dispatcher.run(&tree, &endpoints, &config).into_result().unwrap();
    let second = dispatcher
        .run_parallel(&tree, &endpoints, &config)
        .into_result()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let tree = device();
    let endpoints = tree.endpoints();

    let code = Dispatcher::default()
        .run(&tree, &endpoints, &config(dir.path()))
        .into_result()
        .unwrap();
    let written = writer::write_all(&code.files).unwrap();
    assert_eq!(written, 8);
    assert!(dir.path().join("c/fw_metadata.h").exists());
    assert!(dir.path().join("cpp/tm.cpp").exists());
}
