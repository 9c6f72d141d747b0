//! The typed BPMN graph: entities, relations, and the invariants transformation and
//! validation operate over. This module exposes accessors only — all state-changing
//! logic lives in [`crate::builder`], [`crate::xml`], and [`crate::transform`].
//!
//! Ownership is a rooted tree (`WorkflowDefinition` → `Process` → `FlowElement` →
//! `ExtensionElements`), with back-references (`SequenceFlow::source_node`/
//! `target_node`, `ExclusiveGateway::default_flow`) represented as plain `usize`
//! indices into the owning `Process::flow_elements` vector rather than pointers or
//! `Rc`/`Weak`. Indices may be transiently unresolved (`None`) before transformation.

use std::collections::HashMap;

use crate::compile::{CompiledCondition, CompiledJsonPathQuery};
use crate::ids::IdBytes;

/// Engine-level classification of a flow node's runtime behavior on token arrival.
/// Computed by the Transformer; `None` is purely descriptive and must never be
/// treated by downstream consumers as meaning a particular runtime behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BpmnAspect {
    #[default]
    None,
    ConsumeToken,
    TakeSequenceFlow,
    ExclusiveSplit,
}

/// How output mapping results are merged into process variables.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputBehavior {
    #[default]
    Merge,
    Overwrite,
    None,
}

impl OutputBehavior {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputBehavior::Merge => "MERGE",
            OutputBehavior::Overwrite => "OVERWRITE",
            OutputBehavior::None => "NONE",
        }
    }

    /// Parses one of the three canonical names. Any other text is a caller error to
    /// be reported by the Validator, not a panic here.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "MERGE" => Some(OutputBehavior::Merge),
            "OVERWRITE" => Some(OutputBehavior::Overwrite),
            "NONE" => Some(OutputBehavior::None),
            _ => None,
        }
    }
}

/// Fields shared by every flow node (start/end event, service task, exclusive
/// gateway) but not by `SequenceFlow`, which is an edge rather than a node.
#[derive(Clone, Debug, Default)]
pub struct FlowNodeCommon {
    pub id: IdBytes,
    pub name: Option<IdBytes>,
    pub bpmn_aspect: BpmnAspect,
    /// Indices into the owning `Process::flow_elements`, pointing at `SequenceFlow` entries.
    pub incoming: Vec<usize>,
    pub outgoing: Vec<usize>,
    /// 1-based source line, set by the XML parser bridge when the element came from
    /// an XML document; `None` for builder- or YAML-constructed elements.
    pub source_line: Option<u32>,
}

impl FlowNodeCommon {
    pub fn new(id: IdBytes) -> Self {
        FlowNodeCommon {
            id,
            name: None,
            bpmn_aspect: BpmnAspect::None,
            incoming: Vec::new(),
            outgoing: Vec::new(),
            source_line: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct StartEvent {
    pub common: FlowNodeCommon,
}

#[derive(Clone, Debug)]
pub struct EndEvent {
    pub common: FlowNodeCommon,
}

#[derive(Clone, Debug)]
pub struct ServiceTask {
    pub common: FlowNodeCommon,
    /// Absent until either supplied at construction or normalized in by the
    /// Transformer's step 5 (which replaces `None` with an empty instance).
    pub extension_elements: Option<ExtensionElements>,
}

#[derive(Clone, Debug)]
pub struct ExclusiveGateway {
    pub common: FlowNodeCommon,
    pub default_flow_ref: Option<IdBytes>,
    /// Resolved by the Transformer: index of the default flow within `outgoing`'s
    /// owning `flow_elements` vector.
    pub default_flow: Option<usize>,
    /// Resolved by the Transformer: subsequence of `outgoing` carrying a condition.
    pub outgoing_with_conditions: Vec<usize>,
}

/// A directed edge linking two flow nodes by id. `source_node`/`target_node` are
/// resolved indices, set by the Transformer; they remain `None` on a raw, unlinked
/// model.
#[derive(Clone, Debug)]
pub struct SequenceFlow {
    pub id: IdBytes,
    pub name: Option<IdBytes>,
    pub source_ref: IdBytes,
    pub target_ref: IdBytes,
    pub source_node: Option<usize>,
    pub target_node: Option<usize>,
    pub condition_expression: Option<ConditionExpression>,
    /// 1-based source line, set by the XML parser bridge; `None` otherwise.
    pub source_line: Option<u32>,
}

impl SequenceFlow {
    pub fn has_condition(&self) -> bool {
        self.condition_expression.is_some()
    }
}

#[derive(Clone, Debug)]
pub struct ConditionExpression {
    pub text: IdBytes,
    /// `None` before the Transformer's condition-compilation step has run.
    pub compiled: Option<CompiledCondition>,
}

impl ConditionExpression {
    pub fn new(text: IdBytes) -> Self {
        ConditionExpression {
            text,
            compiled: None,
        }
    }
}

/// A source/target JSON-path pair, as declared (uncompiled).
#[derive(Clone, Debug)]
pub struct Mapping {
    pub source_path: IdBytes,
    pub target_path: IdBytes,
}

/// A mapping after the Transformer has compiled its source JSON-path.
#[derive(Clone, Debug)]
pub struct CompiledMapping {
    pub source: CompiledJsonPathQuery,
    pub target: IdBytes,
}

#[derive(Clone, Debug, Default)]
pub struct InputOutputMapping {
    pub inputs: Vec<Mapping>,
    pub outputs: Vec<Mapping>,
    /// Raw, unparsed text of the output behavior attribute (e.g. from an XML
    /// attribute or YAML field). Defaults to `"MERGE"`. Parsing into
    /// [`OutputBehavior`] — and rejecting unrecognized text — is the Validator's job,
    /// not the Parser's or Transformer's: the Parser performs no validation, and the
    /// Transformer only normalizes structure.
    pub output_behavior_raw: IdBytes,
    /// Populated by the Transformer's mapping-compilation step.
    pub compiled_inputs: Vec<CompiledMapping>,
    pub compiled_outputs: Vec<CompiledMapping>,
}

impl InputOutputMapping {
    pub fn new() -> Self {
        InputOutputMapping {
            inputs: Vec::new(),
            outputs: Vec::new(),
            output_behavior_raw: IdBytes::from("MERGE"),
            compiled_inputs: Vec::new(),
            compiled_outputs: Vec::new(),
        }
    }

    pub fn output_behavior(&self) -> Option<OutputBehavior> {
        OutputBehavior::parse(&self.output_behavior_raw.as_str_lossy())
    }
}

#[derive(Clone, Debug)]
pub struct TaskDefinition {
    pub task_type: IdBytes,
    pub retries: i32,
}

impl TaskDefinition {
    pub fn new(task_type: IdBytes) -> Self {
        TaskDefinition {
            task_type,
            retries: 3,
        }
    }
}

/// A single declared header. `key`/`value` may transiently be absent (e.g. an XML
/// `<zeebe:header>` missing one of its attributes); the Validator reports that, the
/// Transformer's msgpack encoding step must still complete without panicking.
#[derive(Clone, Debug)]
pub struct TaskHeader {
    pub key: Option<IdBytes>,
    pub value: Option<IdBytes>,
}

#[derive(Clone, Debug, Default)]
pub struct TaskHeaders {
    pub headers: Vec<TaskHeader>,
    /// Populated by the Transformer's msgpack encoding step; empty until then and
    /// when `headers` is empty.
    pub encoded_msgpack: Vec<u8>,
}

impl TaskHeaders {
    pub fn new() -> Self {
        TaskHeaders::default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExtensionElements {
    pub task_definition: Option<TaskDefinition>,
    pub task_headers: TaskHeaders,
    pub io_mapping: InputOutputMapping,
}

impl ExtensionElements {
    pub fn new() -> Self {
        ExtensionElements {
            task_definition: None,
            task_headers: TaskHeaders::new(),
            io_mapping: InputOutputMapping::new(),
        }
    }
}

/// The tagged sum over every kind of flow element. Replaces what would otherwise be
/// a `FlowElement -> FlowNode -> {StartEvent, EndEvent, ServiceTask, ExclusiveGateway}`
/// inheritance chain with `SequenceFlow` as a structural sibling: capability checks
/// ("is this a FlowNode", "is this a ServiceTask") are a `match`, not a type test.
#[derive(Clone, Debug)]
pub enum FlowElement {
    Start(StartEvent),
    End(EndEvent),
    ServiceTask(ServiceTask),
    Gateway(ExclusiveGateway),
    SequenceFlow(SequenceFlow),
}

impl FlowElement {
    pub fn id(&self) -> &IdBytes {
        match self {
            FlowElement::Start(e) => &e.common.id,
            FlowElement::End(e) => &e.common.id,
            FlowElement::ServiceTask(e) => &e.common.id,
            FlowElement::Gateway(e) => &e.common.id,
            FlowElement::SequenceFlow(e) => &e.id,
        }
    }

    pub fn qname(&self) -> &'static str {
        match self {
            FlowElement::Start(_) => "bpmn:startEvent",
            FlowElement::End(_) => "bpmn:endEvent",
            FlowElement::ServiceTask(_) => "bpmn:serviceTask",
            FlowElement::Gateway(_) => "bpmn:exclusiveGateway",
            FlowElement::SequenceFlow(_) => "bpmn:sequenceFlow",
        }
    }

    /// `Some` for every variant except `SequenceFlow`, which is an edge, not a node.
    pub fn common(&self) -> Option<&FlowNodeCommon> {
        match self {
            FlowElement::Start(e) => Some(&e.common),
            FlowElement::End(e) => Some(&e.common),
            FlowElement::ServiceTask(e) => Some(&e.common),
            FlowElement::Gateway(e) => Some(&e.common),
            FlowElement::SequenceFlow(_) => None,
        }
    }

    pub fn common_mut(&mut self) -> Option<&mut FlowNodeCommon> {
        match self {
            FlowElement::Start(e) => Some(&mut e.common),
            FlowElement::End(e) => Some(&mut e.common),
            FlowElement::ServiceTask(e) => Some(&mut e.common),
            FlowElement::Gateway(e) => Some(&mut e.common),
            FlowElement::SequenceFlow(_) => None,
        }
    }

    pub fn as_sequence_flow(&self) -> Option<&SequenceFlow> {
        match self {
            FlowElement::SequenceFlow(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_sequence_flow_mut(&mut self) -> Option<&mut SequenceFlow> {
        match self {
            FlowElement::SequenceFlow(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_gateway(&self) -> Option<&ExclusiveGateway> {
        match self {
            FlowElement::Gateway(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_gateway_mut(&mut self) -> Option<&mut ExclusiveGateway> {
        match self {
            FlowElement::Gateway(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_service_task(&self) -> Option<&ServiceTask> {
        match self {
            FlowElement::ServiceTask(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_service_task_mut(&mut self) -> Option<&mut ServiceTask> {
        match self {
            FlowElement::ServiceTask(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_end_event(&self) -> Option<&EndEvent> {
        match self {
            FlowElement::End(e) => Some(e),
            _ => None,
        }
    }

    /// The 1-based source line this element was read from, when it came from XML.
    pub fn line(&self) -> Option<u32> {
        match self {
            FlowElement::SequenceFlow(f) => f.source_line,
            _ => self.common().and_then(|c| c.source_line),
        }
    }
}

/// A single BPMN process (workflow). Owns an ordered `flow_elements` arena; every
/// back-reference elsewhere in the graph is an index into this vector.
#[derive(Clone, Debug, Default)]
pub struct Process {
    pub bpmn_process_id: IdBytes,
    pub is_executable: bool,
    pub flow_elements: Vec<FlowElement>,
    pub flow_element_map: HashMap<IdBytes, usize>,
    pub initial_start_event: Option<usize>,
}

impl Process {
    pub fn new(bpmn_process_id: IdBytes, is_executable: bool) -> Self {
        Process {
            bpmn_process_id,
            is_executable,
            flow_elements: Vec::new(),
            flow_element_map: HashMap::new(),
            initial_start_event: None,
        }
    }

    pub fn find_by_id(&self, id: &IdBytes) -> Option<usize> {
        self.flow_element_map.get(id).copied()
    }
}

/// The root of the model: an ordered sequence of processes plus an id index.
#[derive(Clone, Debug, Default)]
pub struct WorkflowDefinition {
    pub processes: Vec<Process>,
    pub process_map: HashMap<IdBytes, usize>,
}

impl WorkflowDefinition {
    pub fn new() -> Self {
        WorkflowDefinition::default()
    }

    pub fn executable_processes(&self) -> impl Iterator<Item = &Process> {
        self.processes.iter().filter(|p| p.is_executable)
    }

    pub fn executable_processes_mut(&mut self) -> impl Iterator<Item = &mut Process> {
        self.processes.iter_mut().filter(|p| p.is_executable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_behavior_round_trips_through_text() {
        for b in [
            OutputBehavior::Merge,
            OutputBehavior::Overwrite,
            OutputBehavior::None,
        ] {
            assert_eq!(OutputBehavior::parse(b.as_str()), Some(b));
        }
        assert_eq!(OutputBehavior::parse("asdf"), None);
    }

    #[test]
    fn flow_element_id_dispatches_across_variants() {
        let start = FlowElement::Start(StartEvent {
            common: FlowNodeCommon::new(IdBytes::from("start")),
        });
        assert_eq!(start.id(), &IdBytes::from("start"));

        let flow = FlowElement::SequenceFlow(SequenceFlow {
            id: IdBytes::from("flow1"),
            name: None,
            source_ref: IdBytes::from("start"),
            target_ref: IdBytes::from("end"),
            source_node: None,
            target_node: None,
            condition_expression: None,
            source_line: None,
        });
        assert_eq!(flow.id(), &IdBytes::from("flow1"));
        assert!(flow.common().is_none());
    }

    #[test]
    fn process_find_by_id_uses_the_map() {
        let mut process = Process::new(IdBytes::from("p"), true);
        process.flow_elements.push(FlowElement::Start(StartEvent {
            common: FlowNodeCommon::new(IdBytes::from("start")),
        }));
        process
            .flow_element_map
            .insert(IdBytes::from("start"), 0);
        assert_eq!(process.find_by_id(&IdBytes::from("start")), Some(0));
        assert_eq!(process.find_by_id(&IdBytes::from("missing")), None);
    }
}
