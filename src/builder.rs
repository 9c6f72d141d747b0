//! Fluent construction of a single executable `Process`, mirroring the contract
//! surface of fluent BPMN model builders: `start_event`/`end_event`/`service_task`/
//! `exclusive_gateway` append nodes and auto-wire an implicit sequence flow from the
//! previously-added node; `sequence_flow`/`condition`/`default_flow` let a caller
//! take over that wiring explicitly, which is how gateway branches are built.

use crate::ids::IdBytes;
use crate::model::{
    EndEvent, ExclusiveGateway, ExtensionElements, FlowElement, FlowNodeCommon, Mapping,
    OutputBehavior, Process, SequenceFlow, ServiceTask, StartEvent, TaskDefinition, TaskHeader,
    WorkflowDefinition,
};
use crate::compile::{JsonConditionCompiler, JsonPathCompiler};
use crate::transform::{transform, transform_with};
use crate::validate::validate;
use crate::error::ValidationError;

/// Entry point: initializes a `WorkflowDefinition` containing a single executable
/// `Process` and returns a builder positioned at its (currently empty) start.
pub fn create_executable_workflow(id: impl Into<IdBytes>) -> ProcessBuilder {
    let mut definitions = WorkflowDefinition::new();
    let process = Process::new(id.into(), true);
    definitions.processes.push(process);
    ProcessBuilder {
        definitions,
        process_index: 0,
        next_auto_id: 1,
        last_node_id: None,
        open_flow_index: None,
        last_flow_index: None,
        current_service_task_id: None,
    }
}

pub struct ProcessBuilder {
    definitions: WorkflowDefinition,
    process_index: usize,
    next_auto_id: u64,
    /// Id of the most recently added flow node (the builder's "current position").
    last_node_id: Option<IdBytes>,
    /// Index, within the process's `flow_elements`, of a `SequenceFlow` created by an
    /// explicit `sequence_flow()` call that has not yet been finalized against a
    /// following node (its `target_ref` is still empty).
    open_flow_index: Option<usize>,
    /// Index of the most recently created `SequenceFlow`, open or not — the target of
    /// `condition()`/`default_flow()`.
    last_flow_index: Option<usize>,
    current_service_task_id: Option<IdBytes>,
}

impl ProcessBuilder {
    fn process(&mut self) -> &mut Process {
        &mut self.definitions.processes[self.process_index]
    }

    fn auto_id(&mut self, prefix: &str) -> IdBytes {
        let id = format!("_{prefix}_{}", self.next_auto_id);
        self.next_auto_id += 1;
        IdBytes::from(id)
    }

    fn push_element(&mut self, element: FlowElement) -> usize {
        let process = self.process();
        let index = process.flow_elements.len();
        process.flow_elements.push(element);
        index
    }

    /// Auto-wires from `last_node_id` to `new_id`, either by consuming a still-open
    /// explicit flow or by generating a brand new implicit one.
    fn link_predecessor(&mut self, new_id: &IdBytes) {
        if let Some(flow_index) = self.open_flow_index.take() {
            let process = self.process();
            if let Some(flow) = process.flow_elements[flow_index].as_sequence_flow_mut() {
                flow.target_ref = new_id.clone();
            }
            return;
        }
        if let Some(prev_id) = self.last_node_id.clone() {
            let flow_id = self.auto_id("flow");
            let flow = SequenceFlow {
                id: flow_id,
                name: None,
                source_ref: prev_id,
                target_ref: new_id.clone(),
                source_node: None,
                target_node: None,
                condition_expression: None,
                source_line: None,
            };
            self.push_element(FlowElement::SequenceFlow(flow));
        }
    }

    fn add_node(&mut self, id: Option<IdBytes>, build: impl FnOnce(FlowNodeCommon) -> FlowElement) -> &mut Self {
        let id = id.unwrap_or_else(|| self.auto_id("id"));
        self.link_predecessor(&id);
        let common = FlowNodeCommon::new(id.clone());
        self.push_element(build(common));
        self.last_node_id = Some(id);
        self
    }

    pub fn start_event(&mut self, id: impl Into<Option<IdBytes>>) -> &mut Self {
        self.add_node(id.into(), |common| FlowElement::Start(StartEvent { common }))
    }

    pub fn end_event(&mut self, id: impl Into<Option<IdBytes>>) -> &mut Self {
        self.add_node(id.into(), |common| FlowElement::End(EndEvent { common }))
    }

    pub fn service_task(&mut self, id: impl Into<Option<IdBytes>>) -> &mut Self {
        self.add_node(id.into(), |common| {
            FlowElement::ServiceTask(ServiceTask {
                common,
                extension_elements: None,
            })
        });
        self.current_service_task_id = self.last_node_id.clone();
        self
    }

    pub fn exclusive_gateway(&mut self, id: impl Into<Option<IdBytes>>) -> &mut Self {
        self.add_node(id.into(), |common| {
            FlowElement::Gateway(ExclusiveGateway {
                common,
                default_flow_ref: None,
                default_flow: None,
                outgoing_with_conditions: Vec::new(),
            })
        })
    }

    /// Repositions the builder's cursor to a previously declared flow element, so a
    /// second (or further) branch can be attached to an already-visited gateway.
    pub fn move_to(&mut self, id: impl Into<IdBytes>) -> &mut Self {
        self.last_node_id = Some(id.into());
        self.open_flow_index = None;
        self
    }

    /// Starts an explicit sequence flow from the current node. Its target is left
    /// unresolved (empty) until the next node-adding call consumes it, or is left
    /// permanently unresolved if another `sequence_flow()` call follows instead —
    /// which is how two conditioned/defaulted branches are attached directly to the
    /// same gateway without needing a real downstream target in each.
    pub fn sequence_flow(&mut self, id: impl Into<Option<IdBytes>>) -> &mut Self {
        let id = id.into().unwrap_or_else(|| self.auto_id("flow"));
        let source_ref = self.last_node_id.clone().unwrap_or_else(IdBytes::empty);
        let flow = SequenceFlow {
            id,
            name: None,
            source_ref,
            target_ref: IdBytes::empty(),
            source_node: None,
            target_node: None,
            condition_expression: None,
            source_line: None,
        };
        let index = self.push_element(FlowElement::SequenceFlow(flow));
        self.open_flow_index = Some(index);
        self.last_flow_index = Some(index);
        self
    }

    /// Sets the condition expression on the most recently created sequence flow.
    pub fn condition(&mut self, expr_text: impl Into<IdBytes>) -> &mut Self {
        if let Some(index) = self.last_flow_index {
            let process = self.process();
            if let Some(flow) = process.flow_elements[index].as_sequence_flow_mut() {
                flow.condition_expression =
                    Some(crate::model::ConditionExpression::new(expr_text.into()));
            }
        }
        self
    }

    /// Marks the most recently created sequence flow as its gateway's default flow.
    /// A no-op unless the current node (the flow's source) is an `ExclusiveGateway`.
    pub fn default_flow(&mut self) -> &mut Self {
        let Some(flow_index) = self.last_flow_index else {
            return self;
        };
        let Some(gateway_id) = self.last_node_id.clone() else {
            return self;
        };
        let flow_id = {
            let process = self.process();
            process.flow_elements[flow_index].id().clone()
        };
        let process = self.process();
        if let Some(gateway_index) = process.find_by_id(&gateway_id) {
            if let Some(gateway) = process.flow_elements[gateway_index].as_gateway_mut() {
                gateway.default_flow_ref = Some(flow_id);
            }
        }
        self
    }

    fn current_service_task_extensions(&mut self) -> Option<&mut ExtensionElements> {
        let task_id = self.current_service_task_id.clone()?;
        let process = self.process();
        let index = process.find_by_id(&task_id)?;
        let task = process.flow_elements[index].as_service_task_mut()?;
        Some(task.extension_elements.get_or_insert_with(ExtensionElements::new))
    }

    pub fn task_type(&mut self, task_type: impl Into<IdBytes>) -> &mut Self {
        let task_type = task_type.into();
        if let Some(ext) = self.current_service_task_extensions() {
            match &mut ext.task_definition {
                Some(def) => def.task_type = task_type,
                None => ext.task_definition = Some(TaskDefinition::new(task_type)),
            }
        }
        self
    }

    pub fn task_retries(&mut self, retries: i32) -> &mut Self {
        if let Some(ext) = self.current_service_task_extensions() {
            match &mut ext.task_definition {
                Some(def) => def.retries = retries,
                None => {
                    let mut def = TaskDefinition::new(IdBytes::empty());
                    def.retries = retries;
                    ext.task_definition = Some(def);
                }
            }
        }
        self
    }

    pub fn header(&mut self, key: impl Into<IdBytes>, value: impl Into<IdBytes>) -> &mut Self {
        if let Some(ext) = self.current_service_task_extensions() {
            ext.task_headers.headers.push(TaskHeader {
                key: Some(key.into()),
                value: Some(value.into()),
            });
        }
        self
    }

    pub fn input(&mut self, source: impl Into<IdBytes>, target: impl Into<IdBytes>) -> &mut Self {
        if let Some(ext) = self.current_service_task_extensions() {
            ext.io_mapping.inputs.push(Mapping {
                source_path: source.into(),
                target_path: target.into(),
            });
        }
        self
    }

    pub fn output(&mut self, source: impl Into<IdBytes>, target: impl Into<IdBytes>) -> &mut Self {
        if let Some(ext) = self.current_service_task_extensions() {
            ext.io_mapping.outputs.push(Mapping {
                source_path: source.into(),
                target_path: target.into(),
            });
        }
        self
    }

    pub fn output_behavior(&mut self, behavior: OutputBehavior) -> &mut Self {
        if let Some(ext) = self.current_service_task_extensions() {
            ext.io_mapping.output_behavior_raw = IdBytes::from(behavior.as_str());
        }
        self
    }

    /// Sets the output behavior attribute verbatim, without requiring it to parse
    /// into a known [`OutputBehavior`] variant — mirrors how the XML parser stores an
    /// unrecognized `outputBehavior` attribute so the Validator, not the Builder, is
    /// what rejects it.
    pub fn output_behavior_raw(&mut self, behavior: impl Into<IdBytes>) -> &mut Self {
        if let Some(ext) = self.current_service_task_extensions() {
            ext.io_mapping.output_behavior_raw = behavior.into();
        }
        self
    }

    /// Finalizes construction: runs the Transformer then the Validator, returning the
    /// transformed `WorkflowDefinition` on success or a `ValidationError` carrying
    /// the diagnostic bag when at least one `ERROR` diagnostic was produced.
    pub fn done(&mut self) -> Result<WorkflowDefinition, ValidationError> {
        let mut definitions = std::mem::take(&mut self.definitions);
        transform(&mut definitions);
        finish(definitions)
    }

    /// Same as [`Self::done`] but threads caller-supplied compilers through the
    /// Transformer, for use by a [`crate::facade::Facade`] constructed with
    /// non-default ones.
    pub fn done_with(
        &mut self,
        json_path_compiler: &dyn JsonPathCompiler,
        condition_compiler: &dyn JsonConditionCompiler,
    ) -> Result<WorkflowDefinition, ValidationError> {
        let mut definitions = std::mem::take(&mut self.definitions);
        transform_with(&mut definitions, json_path_compiler, condition_compiler);
        finish(definitions)
    }
}

fn finish(definitions: WorkflowDefinition) -> Result<WorkflowDefinition, ValidationError> {
    let diagnostics = validate(&definitions);
    if diagnostics.iter().any(|d| d.severity == crate::error::Severity::Error) {
        Err(ValidationError::new(diagnostics))
    } else {
        Ok(definitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_happy_path_auto_wires_sequence_flows() {
        let result = create_executable_workflow("process")
            .start_event(None)
            .service_task(None)
            .task_type("t")
            .end_event(None)
            .done();
        let definitions = result.expect("valid linear process");
        let process = &definitions.processes[0];
        // start, end, service task, and two auto-generated sequence flows.
        assert_eq!(process.flow_elements.len(), 5);
    }

    #[test]
    fn missing_start_event_fails_validation() {
        let err = create_executable_workflow("process").done().unwrap_err();
        assert!(err.contains("The process must contain at least one none start event."));
    }

    #[test]
    fn branching_gateway_uses_move_to_for_the_second_branch() {
        let result = create_executable_workflow("process")
            .start_event(Some(IdBytes::from("start")))
            .exclusive_gateway(Some(IdBytes::from("xor")))
            .sequence_flow(Some(IdBytes::from("to_a")))
            .condition("flag == true")
            .service_task(Some(IdBytes::from("a")))
            .task_type("t")
            .end_event(None)
            .move_to("xor")
            .sequence_flow(Some(IdBytes::from("to_b")))
            .default_flow()
            .service_task(Some(IdBytes::from("b")))
            .task_type("t")
            .end_event(None)
            .done();
        assert!(result.is_ok(), "{:?}", result.err());
    }
}
