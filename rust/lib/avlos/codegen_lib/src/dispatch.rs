//! Generator dispatch.
//!
//! All enabled generators are validated first; only then does anything run.
//! A generator whose config fails validation produces no files, and its
//! error is reported next to the results of the others.

use avlos_ir::{DeviceTree, Endpoint};
use rayon::prelude::*;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{ConfigError, GeneratorConfig, RunConfig};
use crate::{default_generators, GeneratedCode, Generator};

/// Opaque failure raised by a generator while rendering.
#[derive(Error, Debug)]
#[error("generator '{generator}' failed: {cause:#}")]
pub struct GenerationError {
    pub generator: String,
    #[source]
    pub cause: anyhow::Error,
}

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}

/// Result of one enabled generator.
#[derive(Debug)]
pub struct GeneratorOutcome {
    pub generator: String,
    pub result: Result<GeneratedCode, DispatchError>,
}

#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub outcomes: Vec<GeneratorOutcome>,
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn get(&self, generator: &str) -> Option<&GeneratorOutcome> {
        self.outcomes.iter().find(|o| o.generator == generator)
    }

    /// All-or-nothing view: every generated file, or the first error.
    pub fn into_result(self) -> Result<GeneratedCode, DispatchError> {
        let mut all = GeneratedCode::default();
        for outcome in self.outcomes {
            all.files.extend(outcome.result?.files);
        }
        Ok(all)
    }
}

pub struct Dispatcher {
    generators: Vec<Box<dyn Generator>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self {
            generators: default_generators(),
        }
    }
}

impl Dispatcher {
    /// A dispatcher with no generators registered.
    pub fn empty() -> Self {
        Self {
            generators: Vec::new(),
        }
    }

    pub fn register(&mut self, generator: Box<dyn Generator>) -> &mut Self {
        self.generators.push(generator);
        self
    }

    pub fn generator_names(&self) -> Vec<&str> {
        self.generators.iter().map(|g| g.name()).collect()
    }

    /// Check every enabled generator's config. Disabled or unconfigured
    /// generators are left out.
    pub fn validate<'c>(
        &self,
        config: &'c RunConfig,
    ) -> Vec<(&dyn Generator, Result<&'c GeneratorConfig, ConfigError>)> {
        for name in config.generators.keys() {
            if !self.generators.iter().any(|g| g.name() == name) {
                warn!("config names unknown generator '{}', ignoring", name);
            }
        }

        self.generators
            .iter()
            .filter_map(|g| {
                let entry = config.generator(g.name())?;
                if !entry.enabled {
                    debug!("generator '{}' disabled", g.name());
                    return None;
                }
                Some((g.as_ref(), validate_one(g.as_ref(), entry).map(|()| entry)))
            })
            .collect()
    }

    /// Run enabled generators one after another.
    pub fn run(
        &self,
        tree: &DeviceTree,
        endpoints: &[Endpoint<'_>],
        config: &RunConfig,
    ) -> DispatchOutcome {
        let outcomes = self
            .validate(config)
            .into_iter()
            .map(|(generator, checked)| invoke(generator, checked, tree, endpoints))
            .collect();
        finish(outcomes)
    }

    /// Same as [`Dispatcher::run`], generators on the rayon pool. Outcome
    /// order matches registration order.
    pub fn run_parallel(
        &self,
        tree: &DeviceTree,
        endpoints: &[Endpoint<'_>],
        config: &RunConfig,
    ) -> DispatchOutcome {
        let outcomes = self
            .validate(config)
            .into_par_iter()
            .map(|(generator, checked)| invoke(generator, checked, tree, endpoints))
            .collect();
        finish(outcomes)
    }
}

fn validate_one(generator: &dyn Generator, config: &GeneratorConfig) -> Result<(), ConfigError> {
    for key in generator.required_paths() {
        if config.path(key).is_none() {
            return Err(ConfigError::MissingPath {
                generator: generator.name().to_string(),
                key: key.to_string(),
            });
        }
    }
    for (key, path) in &config.paths {
        let unresolvable = |reason: String| ConfigError::UnresolvablePath {
            generator: generator.name().to_string(),
            key: key.clone(),
            reason,
        };
        if path.as_os_str().is_empty() {
            return Err(unresolvable("path is empty".into()));
        }
        if !path.is_absolute() {
            return Err(unresolvable(format!("'{}' is not absolute", path.display())));
        }
        let known = generator.required_paths().contains(&key.as_str())
            || generator.optional_paths().contains(&key.as_str());
        if !known {
            warn!("generator '{}': unused path key '{}'", generator.name(), key);
        }
    }
    Ok(())
}

fn invoke(
    generator: &dyn Generator,
    checked: Result<&GeneratorConfig, ConfigError>,
    tree: &DeviceTree,
    endpoints: &[Endpoint<'_>],
) -> GeneratorOutcome {
    let name = generator.name().to_string();
    let result = match checked {
        Err(e) => Err(DispatchError::Config(e)),
        Ok(config) => generator
            .generate(tree, endpoints, config)
            .map_err(|cause| {
                DispatchError::Generation(GenerationError {
                    generator: name.clone(),
                    cause,
                })
            }),
    };
    match &result {
        Ok(code) => debug!("generator '{}' produced {} files", name, code.files.len()),
        Err(e) => warn!("{}", e),
    }
    GeneratorOutcome {
        generator: name,
        result,
    }
}

fn finish(outcomes: Vec<GeneratorOutcome>) -> DispatchOutcome {
    let ok = outcomes.iter().filter(|o| o.result.is_ok()).count();
    info!("dispatched {} generators, {} succeeded", outcomes.len(), ok);
    DispatchOutcome { outcomes }
}
