/// Codegen Library - shared code generation logic
///
/// Turns a device tree plus its canonical endpoint list into firmware and
/// host artifacts. Each target implements [`Generator`]; the [`Dispatcher`]
/// validates per-generator config and invokes every enabled target.

pub mod c_firmware;
pub mod c_metadata;
pub mod config;
pub mod cpp_client;
pub mod dispatch;
pub mod filters;
pub mod writer;

use std::path::{Path, PathBuf};

use avlos_ir::{DeviceTree, Endpoint};

pub use config::{ConfigError, GeneratorConfig, RunConfig};
pub use dispatch::{DispatchError, DispatchOutcome, Dispatcher, GenerationError, GeneratorOutcome};

/// Generator trait - implement this for each output target.
///
/// Implementations only read the tree and endpoint list, so any number of
/// them can run concurrently.
pub trait Generator: Send + Sync {
    /// Config key under `generators:` (e.g. `generator_c`).
    fn name(&self) -> &str;

    /// Path keys that must be present for the generator to run.
    fn required_paths(&self) -> &[&'static str];

    /// Path keys that unlock additional outputs.
    fn optional_paths(&self) -> &[&'static str] {
        &[]
    }

    fn generate(
        &self,
        tree: &DeviceTree,
        endpoints: &[Endpoint<'_>],
        config: &GeneratorConfig,
    ) -> anyhow::Result<GeneratedCode>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedCode {
    pub files: Vec<GeneratedFile>,
}

impl GeneratedCode {
    pub fn push(&mut self, path: impl Into<PathBuf>, content: String) {
        self.files.push(GeneratedFile {
            path: path.into(),
            content,
        });
    }

    pub fn file(&self, path: &Path) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: String,
}

/// Generators shipped with the library, in dispatch order.
pub fn default_generators() -> Vec<Box<dyn Generator>> {
    vec![
        Box::new(c_firmware::CFirmwareGenerator),
        Box::new(cpp_client::CppClientGenerator),
    ]
}
