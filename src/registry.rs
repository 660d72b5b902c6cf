//! Plugin registry for virta
//!
//! Name-keyed factory maps for Input and Output plugins, populated once at
//! startup and read-only afterwards. Holding factories rather than
//! instances lets one registration serve any number of configured
//! pipeline instances.

use crate::error::PluginError;
use crate::metric::Metric;
use crate::sink::{InfluxSink, Sink, StdoutSink};
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tracing::info;

/// Input plugin trait - gathers metrics from a source
///
/// Collectors (CPU and memory samplers, etc.) live behind this boundary;
/// the delivery core only ever sees the gathered metrics.
pub trait Input: Send + Sync {
    /// Plugin name for identification and logging
    fn name(&self) -> &'static str;

    /// Collect one round of metrics
    fn gather(&self) -> Result<Vec<Metric>, PluginError>;
}

/// Zero-argument constructor for an Input plugin
pub type InputFactory = Box<dyn Fn() -> Result<Arc<dyn Input>, PluginError> + Send + Sync>;

/// Zero-argument constructor for an Output (sink) plugin
pub type SinkFactory = Box<dyn Fn() -> Result<Arc<dyn Sink>, PluginError> + Send + Sync>;

/// Registry of plugin constructors
///
/// Two independent mappings, one per plugin kind. There is no removal;
/// write-once at startup, read-many thereafter.
pub struct PluginRegistry {
    inputs: HashMap<String, InputFactory>,
    outputs: HashMap<String, SinkFactory>,
}

impl PluginRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            inputs: HashMap::new(),
            outputs: HashMap::new(),
        }
    }

    /// Register an input plugin constructor under a name
    pub fn register_input<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Arc<dyn Input>, PluginError> + Send + Sync + 'static,
    {
        let name = name.into();
        info!(input = %name, "registered input plugin");
        self.inputs.insert(name, Box::new(factory));
    }

    /// Register an output plugin constructor under a name
    pub fn register_output<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Arc<dyn Sink>, PluginError> + Send + Sync + 'static,
    {
        let name = name.into();
        info!(output = %name, "registered output plugin");
        self.outputs.insert(name, Box::new(factory));
    }

    /// Look up an input constructor by name
    pub fn input(&self, name: &str) -> Option<&InputFactory> {
        self.inputs.get(name)
    }

    /// Look up an output constructor by name
    pub fn output(&self, name: &str) -> Option<&SinkFactory> {
        self.outputs.get(name)
    }

    /// Construct an input plugin by name
    pub fn create_input(&self, name: &str) -> Result<Arc<dyn Input>, PluginError> {
        let factory = self
            .input(name)
            .ok_or_else(|| PluginError::Init(format!("no input plugin named '{name}'")))?;
        factory()
    }

    /// Construct an output plugin by name
    pub fn create_output(&self, name: &str) -> Result<Arc<dyn Sink>, PluginError> {
        let factory = self
            .output(name)
            .ok_or_else(|| PluginError::Init(format!("no output plugin named '{name}'")))?;
        factory()
    }

    /// Names of all registered input plugins, sorted
    pub fn input_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inputs.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of all registered output plugins, sorted
    pub fn output_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.outputs.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered input plugins
    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    /// Number of registered output plugins
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the bundled output plugins
///
/// "stdout" serializes with line protocol for debugging; "influxdb" posts
/// to the server named by `VIRTA_INFLUX_URL` (default localhost).
pub fn register_builtins(registry: &mut PluginRegistry) {
    registry.register_output("stdout", || Ok(Arc::new(StdoutSink::default())));

    registry.register_output("influxdb", || {
        let url = env::var("VIRTA_INFLUX_URL")
            .unwrap_or_else(|_| "http://localhost:8086".to_string());
        let database =
            env::var("VIRTA_INFLUX_DATABASE").unwrap_or_else(|_| "virta".to_string());
        let sink = InfluxSink::new(url)?.database(database);
        Ok(Arc::new(sink))
    });
}
