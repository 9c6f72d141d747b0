//! The YAML surface: a thin translator from a linear task list into the same
//! [`crate::builder::ProcessBuilder`] calls a caller would make directly. No
//! semantics live here beyond what the Builder already exposes — this module only
//! decides *which* builder calls to issue and in what order.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::builder::{create_executable_workflow, ProcessBuilder};
use crate::error::{ParseError, ValidationError};
use crate::ids::IdBytes;
use crate::model::{OutputBehavior, WorkflowDefinition};

/// `{source, target}`, as declared under a task's `inputs`/`outputs` list.
#[derive(Debug, Clone, Deserialize)]
pub struct YamlMapping {
    pub source: String,
    pub target: String,
}

fn default_retries() -> i32 {
    3
}

/// One entry in the `tasks` list. Order in the document defines the linear
/// workflow: task *n* feeds task *n+1* via an implicit sequence flow, exactly as
/// successive `service_task()` builder calls would.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YamlTask {
    #[serde(rename = "type")]
    pub task_type: String,
    #[serde(default = "default_retries")]
    pub retries: i32,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub inputs: Vec<YamlMapping>,
    #[serde(default)]
    pub outputs: Vec<YamlMapping>,
    #[serde(default)]
    pub output_behavior: Option<String>,
}

/// The document root: a `name` and an ordered `tasks` list.
#[derive(Debug, Clone, Deserialize)]
pub struct YamlWorkflow {
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<YamlTask>,
}

/// Parses the YAML surface described in §6 into its DTO. Performs no semantic
/// interpretation of the document's contents — that happens in
/// [`workflow_from_yaml`], via the same Builder every other entry point uses.
pub fn parse_workflow_yaml(yaml: &str) -> Result<YamlWorkflow, ParseError> {
    tracing::debug!(bytes = yaml.len(), "parsing YAML workflow source");
    serde_yaml::from_str(yaml).map_err(|e| {
        tracing::warn!(error = %e, "malformed YAML workflow source");
        ParseError::MalformedYaml {
            message: e.to_string(),
        }
    })
}

/// Translates a parsed [`YamlWorkflow`] into the equivalent builder calls, then
/// finalizes through the same transform+validate path as every other Builder use,
/// via the crate's default compilers.
pub fn workflow_from_yaml(doc: &YamlWorkflow) -> Result<WorkflowDefinition, ValidationError> {
    build(doc).done()
}

/// Same as [`workflow_from_yaml`] but threads caller-supplied compilers through the
/// Transformer, for use by a [`crate::facade::Facade`] constructed with non-default
/// ones.
pub fn workflow_from_yaml_with(
    doc: &YamlWorkflow,
    json_path_compiler: &dyn crate::compile::JsonPathCompiler,
    condition_compiler: &dyn crate::compile::JsonConditionCompiler,
) -> Result<WorkflowDefinition, ValidationError> {
    build(doc).done_with(json_path_compiler, condition_compiler)
}

fn build(doc: &YamlWorkflow) -> ProcessBuilder {
    let mut builder = create_executable_workflow(IdBytes::from(doc.name.as_str()));
    builder.start_event(None);
    for task in &doc.tasks {
        apply_task(&mut builder, task);
    }
    builder.end_event(None);
    builder
}

fn apply_task(builder: &mut ProcessBuilder, task: &YamlTask) {
    builder.service_task(None).task_type(task.task_type.as_str());
    builder.task_retries(task.retries);
    for (key, value) in &task.headers {
        builder.header(key.as_str(), value.as_str());
    }
    for mapping in &task.inputs {
        builder.input(mapping.source.as_str(), mapping.target.as_str());
    }
    for mapping in &task.outputs {
        builder.output(mapping.source.as_str(), mapping.target.as_str());
    }
    if let Some(raw) = &task.output_behavior {
        builder.output_behavior_raw(raw.as_str());
    }
}

/// Parses and builds in one call — the path [`crate::facade::Facade::read_yaml`] uses.
pub fn read_yaml(yaml: &str) -> Result<WorkflowDefinition, YamlReadError> {
    let doc = parse_workflow_yaml(yaml)?;
    let definitions = workflow_from_yaml(&doc)?;
    Ok(definitions)
}

/// Union of the two ways reading a YAML workflow can fail: the document itself is
/// malformed, or it parses but fails executable-subset validation.
#[derive(Debug, thiserror::Error)]
pub enum YamlReadError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
