//! Executable-subset semantic validation: walks a *transformed* [`WorkflowDefinition`]
//! and produces an ordered sequence of [`Diagnostic`]s. Pure — never mutates the
//! model, never raises; callers that want a hard failure wrap the result in
//! [`crate::error::ValidationError`] themselves (see [`crate::builder::ProcessBuilder::done`]
//! and [`crate::facade::Facade::read_xml`]).

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Diagnostic, ElementRef, Severity};
use crate::ids::ID_MAX_LEN;
use crate::model::{BpmnAspect, FlowElement, Process, WorkflowDefinition};

/// `(\.\*)|(\[.*,.*\])` — matches a JSONPath wildcard segment or a multi-index
/// selector, both of which the runtime refuses to evaluate.
static PROHIBITED_EXPRESSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\.\*)|(\[.*,.*\])").expect("prohibited-expression regex is valid"));

const ROOT_PATH: &[u8] = b"$";

/// Runs every rule in §4.5 against `definitions`, returning diagnostics in stable
/// traversal order (process order, then flow-element declaration order, then
/// rule-listed order within an element).
pub fn validate(definitions: &WorkflowDefinition) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    if definitions.executable_processes().next().is_none() {
        diagnostics.push(Diagnostic::error(
            ElementRef::new("bpmn:definitions"),
            "BPMN model must contain at least one executable process.",
        ));
        return diagnostics;
    }

    for process in definitions.executable_processes() {
        validate_process(process, &mut diagnostics);
    }

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    tracing::debug!(
        errors,
        warnings = diagnostics.len() - errors,
        "validated BPMN model"
    );

    diagnostics
}

fn validate_process(process: &Process, out: &mut Vec<Diagnostic>) {
    let process_ref = ElementRef::new("bpmn:process").with_id(process.bpmn_process_id.as_str_lossy().into_owned());

    if process.bpmn_process_id.is_empty() {
        out.push(Diagnostic::error(
            process_ref.clone(),
            "BPMN process id is required.",
        ));
    } else if process.bpmn_process_id.len() > ID_MAX_LEN {
        out.push(Diagnostic::error(
            process_ref.clone(),
            format!("BPMN process id must not be longer than {ID_MAX_LEN}."),
        ));
    }

    if process.initial_start_event.is_none() {
        out.push(Diagnostic::error(
            process_ref,
            "The process must contain at least one none start event.",
        ));
    }

    for element in &process.flow_elements {
        validate_element(process, element, out);
    }
}

fn validate_element(process: &Process, element: &FlowElement, out: &mut Vec<Diagnostic>) {
    let qname = element.qname();
    let mut element_ref = ElementRef::new(qname).with_id(element.id().as_str_lossy().into_owned());
    if let Some(line) = element.line() {
        element_ref = element_ref.with_line(line);
    }

    if element.id().is_empty() {
        out.push(Diagnostic::error(element_ref.clone(), "Activity id is required."));
    } else if element.id().len() > ID_MAX_LEN {
        out.push(Diagnostic::error(
            element_ref.clone(),
            format!("Activity id must not be longer than {ID_MAX_LEN}."),
        ));
    }

    match element {
        FlowElement::Start(e) => validate_flow_node(process, &element_ref, &e.common, out),
        FlowElement::End(e) => {
            validate_flow_node(process, &element_ref, &e.common, out);
            if !e.common.outgoing.is_empty() {
                out.push(Diagnostic::error(
                    element_ref,
                    "An end event must not have an outgoing sequence flow.",
                ));
            }
        }
        FlowElement::ServiceTask(t) => {
            validate_flow_node(process, &element_ref, &t.common, out);
            validate_service_task(&element_ref, t, out);
        }
        FlowElement::Gateway(g) => validate_gateway(process, &element_ref, g, out),
        FlowElement::SequenceFlow(_) => {}
    }
}

/// Validates a non-gateway flow node (start event, end event, service task): an
/// `ExclusiveGateway` goes through [`validate_gateway`] instead, which allows more
/// than one outgoing flow.
fn validate_flow_node(
    process: &Process,
    element_ref: &ElementRef,
    common: &crate::model::FlowNodeCommon,
    out: &mut Vec<Diagnostic>,
) {
    if common.outgoing.len() > 1 {
        out.push(Diagnostic::error(
            element_ref.clone(),
            "The flow element must not have more than one outgoing sequence flow.",
        ));
    }

    for &incoming_index in &common.incoming {
        if let Some(flow) = process.flow_elements[incoming_index].as_sequence_flow() {
            if flow.source_node.is_none() {
                out.push(Diagnostic::error(
                    element_ref.clone(),
                    "Cannot find source of sequence flow.",
                ));
            }
        }
    }
    for &outgoing_index in &common.outgoing {
        if let Some(flow) = process.flow_elements[outgoing_index].as_sequence_flow() {
            if flow.target_node.is_none() {
                out.push(Diagnostic::error(
                    element_ref.clone(),
                    "Cannot find target of sequence flow.",
                ));
            }
        }
    }
}

fn validate_service_task(
    element_ref: &ElementRef,
    task: &crate::model::ServiceTask,
    out: &mut Vec<Diagnostic>,
) {
    let Some(ext) = &task.extension_elements else {
        out.push(Diagnostic::error(
            element_ref.clone(),
            "A service task must contain a 'taskDefinition' extension element.",
        ));
        return;
    };

    match &ext.task_definition {
        None => out.push(Diagnostic::error(
            element_ref.clone(),
            "A service task must contain a 'taskDefinition' extension element.",
        )),
        Some(def) => {
            if def.task_type.is_empty() {
                out.push(Diagnostic::error(
                    element_ref.clone(),
                    "Task definition type is required.",
                ));
            }
            if def.retries < 1 {
                out.push(Diagnostic::error(
                    element_ref.clone(),
                    "Task definition retries must be greater than or equal to 1.",
                ));
            }
        }
    }

    for header in &ext.task_headers.headers {
        if header.key.is_none() {
            out.push(Diagnostic::error(
                element_ref.clone(),
                "Task header key is required.",
            ));
        }
        if header.value.is_none() {
            out.push(Diagnostic::error(
                element_ref.clone(),
                "Task header value is required.",
            ));
        }
    }

    validate_io_mapping(element_ref, &ext.io_mapping, out);
}

fn validate_io_mapping(
    element_ref: &ElementRef,
    mapping: &crate::model::InputOutputMapping,
    out: &mut Vec<Diagnostic>,
) {
    match mapping.output_behavior() {
        Some(behavior) => {
            if matches!(behavior, crate::model::OutputBehavior::None) && !mapping.outputs.is_empty() {
                out.push(Diagnostic::error(
                    element_ref.clone(),
                    "Output behavior 'NONE' must not be combined with output mappings.",
                ));
            }
        }
        None => out.push(Diagnostic::error(
            element_ref.clone(),
            format!(
                "Output behavior '{}' is not supported. Valid values are [MERGE, OVERWRITE, NONE].",
                mapping.output_behavior_raw.as_str_lossy()
            ),
        )),
    }

    validate_mapping_list(&mapping.inputs, &mapping.compiled_inputs, element_ref, out);
    validate_mapping_list(&mapping.outputs, &mapping.compiled_outputs, element_ref, out);
}

fn validate_mapping_list(
    declared: &[crate::model::Mapping],
    compiled: &[crate::model::CompiledMapping],
    element_ref: &ElementRef,
    out: &mut Vec<Diagnostic>,
) {
    let multiple = declared.len() >= 2;

    for mapping in declared {
        let source_text = mapping.source_path.as_str_lossy();
        let target_text = mapping.target_path.as_str_lossy();

        if PROHIBITED_EXPRESSION.is_match(&source_text) {
            out.push(Diagnostic::error(
                element_ref.clone(),
                format!("Source mapping: JSON path '{source_text}' contains prohibited expression"),
            ));
        }
        if PROHIBITED_EXPRESSION.is_match(&target_text) {
            out.push(Diagnostic::error(
                element_ref.clone(),
                format!("Target mapping: JSON path '{target_text}' contains prohibited expression"),
            ));
        }
        if multiple && mapping.target_path.as_bytes() == ROOT_PATH {
            out.push(Diagnostic::error(
                element_ref.clone(),
                "A mapping's target must not be the root path '$' when more than one mapping is declared.",
            ));
        }
    }

    for compiled_mapping in compiled {
        if !compiled_mapping.source.is_valid() {
            let path = compiled_mapping.source.source().as_str_lossy();
            let reason = compiled_mapping.source.reason().unwrap_or("invalid JSON path");
            out.push(Diagnostic::error(
                element_ref.clone(),
                format!("JSON path query '{path}' is not valid! {reason}"),
            ));
        }
    }
}

fn validate_gateway(
    process: &Process,
    element_ref: &ElementRef,
    gateway: &crate::model::ExclusiveGateway,
    out: &mut Vec<Diagnostic>,
) {
    for &incoming_index in &gateway.common.incoming {
        if let Some(flow) = process.flow_elements[incoming_index].as_sequence_flow() {
            if flow.source_node.is_none() {
                out.push(Diagnostic::error(
                    element_ref.clone(),
                    "Cannot find source of sequence flow.",
                ));
            }
        }
    }
    for &outgoing_index in &gateway.common.outgoing {
        if let Some(flow) = process.flow_elements[outgoing_index].as_sequence_flow() {
            if flow.target_node.is_none() {
                out.push(Diagnostic::error(
                    element_ref.clone(),
                    "Cannot find target of sequence flow.",
                ));
            }
        }
    }

    if !matches!(gateway.common.bpmn_aspect, BpmnAspect::ExclusiveSplit) {
        if gateway.common.outgoing.len() > 1 {
            out.push(Diagnostic::error(
                element_ref.clone(),
                "An exclusive gateway with more than one outgoing sequence flow must have conditions on the sequence flows.",
            ));
        }
        return;
    }

    match gateway.default_flow {
        Some(default_index) => {
            let default_flow = process.flow_elements[default_index].as_sequence_flow();
            if let Some(flow) = default_flow {
                if flow.has_condition() {
                    out.push(Diagnostic::error(
                        element_ref.clone(),
                        "A default sequence flow must not have a condition.",
                    ));
                }
            }
            if !gateway.common.outgoing.contains(&default_index) {
                out.push(Diagnostic::error(
                    element_ref.clone(),
                    "The default sequence flow must be one of the gateway's outgoing sequence flows.",
                ));
            }
        }
        None => out.push(Diagnostic::warning(
            element_ref.clone(),
            "An exclusive gateway should have a default sequence flow without condition.",
        )),
    }

    for &condition_index in &gateway.outgoing_with_conditions {
        if let Some(flow) = process.flow_elements[condition_index].as_sequence_flow() {
            if let Some(condition) = &flow.condition_expression {
                if let Some(compiled) = &condition.compiled {
                    if !compiled.is_valid() {
                        let text = compiled.text().as_str_lossy();
                        let reason = compiled.reason().unwrap_or("invalid condition expression");
                        out.push(Diagnostic::error(
                            element_ref.clone(),
                            format!("Condition expression '{text}' is not valid: {reason}"),
                        ));
                    }
                }
            }
        }
    }

    for &outgoing_index in &gateway.common.outgoing {
        let is_default = gateway.default_flow == Some(outgoing_index);
        let has_condition = process.flow_elements[outgoing_index]
            .as_sequence_flow()
            .map(|f| f.has_condition())
            .unwrap_or(false);
        if !is_default && !has_condition {
            out.push(Diagnostic::error(
                element_ref.clone(),
                "A sequence flow on an exclusive gateway must have a condition, if it is not the default flow.",
            ));
        }
    }
}
