//! Post-construction graph closure: link resolution, default extension insertion,
//! aspect tagging, and pre-encoding. Pure with respect to the caller-visible API
//! (returns the same root it was given, mutated) — it never fails; any
//! irregularity it can't resolve is left for the Validator to detect.

use crate::compile::{FlagConditionCompiler, JsonConditionCompiler, JsonPathCompiler, JsonPathLibCompiler};
use crate::ids::IdBytes;
use crate::model::{BpmnAspect, ExtensionElements, FlowElement, Process, WorkflowDefinition};
use crate::msgpack::encode_headers;

/// Runs the Transformer using the crate's default JSON-path and condition
/// compilers. This is what [`crate::builder::ProcessBuilder::done`] and
/// [`crate::yaml::parse_workflow_yaml`] use.
pub fn transform(definitions: &mut WorkflowDefinition) {
    transform_with(definitions, &JsonPathLibCompiler, &FlagConditionCompiler);
}

/// Runs the Transformer with caller-supplied compilers, as the Facade does when it
/// was constructed with non-default ones.
pub fn transform_with(
    definitions: &mut WorkflowDefinition,
    json_path_compiler: &dyn JsonPathCompiler,
    condition_compiler: &dyn JsonConditionCompiler,
) {
    for process in &mut definitions.processes {
        transform_process(process, json_path_compiler, condition_compiler);
    }
}

fn transform_process(
    process: &mut Process,
    json_path_compiler: &dyn JsonPathCompiler,
    condition_compiler: &dyn JsonConditionCompiler,
) {
    tracing::trace!(
        process_id = %process.bpmn_process_id,
        elements = process.flow_elements.len(),
        "transforming process"
    );
    collect_flow_elements(process);
    assign_initial_start_event(process);
    link_sequence_flows(process);
    compile_conditions(process, condition_compiler);
    normalize_service_tasks(process);
    encode_task_headers(process);
    compile_mappings(process, json_path_compiler);
    classify_aspects(process);
    annotate_gateway_defaults(process);
}

/// Step 1: re-orders `flow_elements` into the canonical sequence — start events, end
/// events, sequence flows, service tasks, exclusive gateways — and rebuilds
/// `flow_element_map` (last write wins on a duplicate id).
fn collect_flow_elements(process: &mut Process) {
    let elements = std::mem::take(&mut process.flow_elements);
    let mut starts = Vec::new();
    let mut ends = Vec::new();
    let mut flows = Vec::new();
    let mut tasks = Vec::new();
    let mut gateways = Vec::new();

    for element in elements {
        match element {
            FlowElement::Start(_) => starts.push(element),
            FlowElement::End(_) => ends.push(element),
            FlowElement::SequenceFlow(_) => flows.push(element),
            FlowElement::ServiceTask(_) => tasks.push(element),
            FlowElement::Gateway(_) => gateways.push(element),
        }
    }

    let mut ordered = Vec::with_capacity(starts.len() + ends.len() + flows.len() + tasks.len() + gateways.len());
    ordered.append(&mut starts);
    ordered.append(&mut ends);
    ordered.append(&mut flows);
    ordered.append(&mut tasks);
    ordered.append(&mut gateways);

    let mut map = std::collections::HashMap::with_capacity(ordered.len());
    for (index, element) in ordered.iter().enumerate() {
        map.insert(element.id().clone(), index);
    }

    process.flow_elements = ordered;
    process.flow_element_map = map;
}

/// Step 2: the first declared StartEvent becomes the process's initial start event.
fn assign_initial_start_event(process: &mut Process) {
    process.initial_start_event = process
        .flow_elements
        .iter()
        .position(|e| matches!(e, FlowElement::Start(_)));
}

/// Step 3: resolves every sequence flow's source/target by id and appends it to the
/// corresponding node's `outgoing`/`incoming`. Unresolved references are left `None`.
///
/// Clears every node's `outgoing`/`incoming` first so re-running the Transformer on
/// an already-linked model (idempotence, §4.4/§8) re-derives them rather than
/// appending duplicates.
fn link_sequence_flows(process: &mut Process) {
    for element in &mut process.flow_elements {
        if let Some(common) = element.common_mut() {
            common.outgoing.clear();
            common.incoming.clear();
        }
    }

    let flow_indices: Vec<usize> = process
        .flow_elements
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.as_sequence_flow().map(|_| i))
        .collect();

    for flow_index in flow_indices {
        let (source_ref, target_ref) = {
            let flow = process.flow_elements[flow_index].as_sequence_flow().unwrap();
            (flow.source_ref.clone(), flow.target_ref.clone())
        };
        let source_index = process.find_by_id(&source_ref);
        let target_index = process.find_by_id(&target_ref);

        if let Some(flow) = process.flow_elements[flow_index].as_sequence_flow_mut() {
            flow.source_node = source_index;
            flow.target_node = target_index;
        }
        if let Some(source_index) = source_index {
            if let Some(common) = process.flow_elements[source_index].common_mut() {
                common.outgoing.push(flow_index);
            }
        }
        if let Some(target_index) = target_index {
            if let Some(common) = process.flow_elements[target_index].common_mut() {
                common.incoming.push(flow_index);
            }
        }
    }
}

/// Step 4: compiles every sequence flow's condition expression, if any. Never fails —
/// an unparsable expression becomes an `Invalid` compiled form, surfaced later by the
/// Validator.
fn compile_conditions(process: &mut Process, compiler: &dyn JsonConditionCompiler) {
    for element in &mut process.flow_elements {
        if let Some(flow) = element.as_sequence_flow_mut() {
            if let Some(condition) = &mut flow.condition_expression {
                if condition.compiled.is_none() {
                    condition.compiled = Some(compiler.compile(condition.text.as_bytes()));
                }
            }
        }
    }
}

/// Step 5: ensures every ServiceTask carries an (possibly empty) `ExtensionElements`.
fn normalize_service_tasks(process: &mut Process) {
    for element in &mut process.flow_elements {
        if let FlowElement::ServiceTask(task) = element {
            if task.extension_elements.is_none() {
                task.extension_elements = Some(ExtensionElements::new());
            }
        }
    }
}

/// Step 6: encodes task headers as msgpack, in declaration order.
fn encode_task_headers(process: &mut Process) {
    for element in &mut process.flow_elements {
        if let FlowElement::ServiceTask(task) = element {
            if let Some(ext) = &mut task.extension_elements {
                ext.task_headers.encoded_msgpack = encode_headers(&ext.task_headers.headers);
            }
        }
    }
}

/// Step 7: compiles input/output mappings, eliding the sole root-identity mapping.
fn compile_mappings(process: &mut Process, compiler: &dyn JsonPathCompiler) {
    for element in &mut process.flow_elements {
        if let FlowElement::ServiceTask(task) = element {
            if let Some(ext) = &mut task.extension_elements {
                ext.io_mapping.compiled_inputs = compile_mapping_list(&ext.io_mapping.inputs, compiler);
                ext.io_mapping.compiled_outputs = compile_mapping_list(&ext.io_mapping.outputs, compiler);
            }
        }
    }
}

fn compile_mapping_list(
    mappings: &[crate::model::Mapping],
    compiler: &dyn JsonPathCompiler,
) -> Vec<crate::model::CompiledMapping> {
    const ROOT: &[u8] = b"$";
    if mappings.len() == 1
        && mappings[0].source_path.as_bytes() == ROOT
        && mappings[0].target_path.as_bytes() == ROOT
    {
        return Vec::new();
    }
    mappings
        .iter()
        .map(|m| {
            let source = compiler
                .compile(m.source_path.as_bytes())
                .unwrap_or_else(|e| crate::compile::CompiledJsonPathQuery::Invalid {
                    source: m.source_path.clone(),
                    reason: e.reason,
                });
            crate::model::CompiledMapping {
                source,
                target: m.target_path.clone(),
            }
        })
        .collect()
}

/// Step 8: classifies each flow node's aspect from its resolved outgoing flows.
fn classify_aspects(process: &mut Process) {
    let gateway_indices: Vec<usize> = process
        .flow_elements
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.as_gateway().map(|_| i))
        .collect();

    for index in 0..process.flow_elements.len() {
        let is_gateway = gateway_indices.contains(&index);
        let Some(common) = process.flow_elements[index].common() else {
            continue;
        };
        let outgoing = common.outgoing.clone();

        let aspect = if outgoing.is_empty() {
            BpmnAspect::ConsumeToken
        } else if outgoing.len() == 1 && !has_condition(process, outgoing[0]) {
            BpmnAspect::TakeSequenceFlow
        } else if is_gateway {
            BpmnAspect::ExclusiveSplit
        } else {
            BpmnAspect::None
        };

        if let Some(common) = process.flow_elements[index].common_mut() {
            common.bpmn_aspect = aspect;
        }
    }
}

fn has_condition(process: &Process, flow_index: usize) -> bool {
    process.flow_elements[flow_index]
        .as_sequence_flow()
        .map(|f| f.has_condition())
        .unwrap_or(false)
}

/// Step 9: populates `outgoing_with_conditions` and resolves `default_flow`.
fn annotate_gateway_defaults(process: &mut Process) {
    let gateway_indices: Vec<usize> = process
        .flow_elements
        .iter()
        .enumerate()
        .filter_map(|(i, e)| e.as_gateway().map(|_| i))
        .collect();

    for gateway_index in gateway_indices {
        let (outgoing, default_flow_ref) = {
            let gateway = process.flow_elements[gateway_index].as_gateway().unwrap();
            (gateway.common.outgoing.clone(), gateway.default_flow_ref.clone())
        };

        let outgoing_with_conditions: Vec<usize> = outgoing
            .iter()
            .copied()
            .filter(|&i| has_condition(process, i))
            .collect();

        let default_flow = default_flow_ref
            .as_ref()
            .and_then(|id| process.find_by_id(id));

        if let Some(gateway) = process.flow_elements[gateway_index].as_gateway_mut() {
            gateway.outgoing_with_conditions = outgoing_with_conditions;
            gateway.default_flow = default_flow;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::create_executable_workflow;
    use crate::ids::IdBytes;

    #[test]
    fn aspects_match_scenario_nine() {
        let definitions = create_executable_workflow("process")
            .start_event(None)
            .service_task(None)
            .task_type("t")
            .end_event(None)
            .done()
            .expect("valid model");
        let process = &definitions.processes[0];

        let start = process.flow_elements.iter().find(|e| matches!(e, FlowElement::Start(_))).unwrap();
        assert_eq!(start.common().unwrap().bpmn_aspect, BpmnAspect::TakeSequenceFlow);

        let task = process.flow_elements.iter().find_map(|e| e.as_service_task()).unwrap();
        assert_eq!(task.common.bpmn_aspect, BpmnAspect::TakeSequenceFlow);

        let end = process.flow_elements.iter().find_map(|e| e.as_end_event()).unwrap();
        assert_eq!(end.common.bpmn_aspect, BpmnAspect::ConsumeToken);
    }

    #[test]
    fn gateway_with_no_outgoing_flows_is_consume_token_not_exclusive_split() {
        let mut definitions = crate::model::WorkflowDefinition::new();
        let mut process = crate::model::Process::new(IdBytes::from("process"), true);
        process
            .flow_elements
            .push(FlowElement::Gateway(crate::model::ExclusiveGateway {
                common: crate::model::FlowNodeCommon::new(IdBytes::from("xor")),
                default_flow_ref: None,
                default_flow: None,
                outgoing_with_conditions: Vec::new(),
            }));
        definitions.processes.push(process);
        transform(&mut definitions);

        let gateway = definitions.processes[0]
            .flow_elements
            .iter()
            .find_map(|e| e.as_gateway())
            .unwrap();
        assert_eq!(gateway.common.bpmn_aspect, BpmnAspect::ConsumeToken);
    }

    #[test]
    fn gateway_with_one_unconditioned_outgoing_flow_is_take_sequence_flow() {
        let mut definitions = crate::model::WorkflowDefinition::new();
        let mut process = crate::model::Process::new(IdBytes::from("process"), true);
        process
            .flow_elements
            .push(FlowElement::Gateway(crate::model::ExclusiveGateway {
                common: crate::model::FlowNodeCommon::new(IdBytes::from("xor")),
                default_flow_ref: None,
                default_flow: None,
                outgoing_with_conditions: Vec::new(),
            }));
        process
            .flow_elements
            .push(FlowElement::End(crate::model::EndEvent {
                common: crate::model::FlowNodeCommon::new(IdBytes::from("end")),
            }));
        process
            .flow_elements
            .push(FlowElement::SequenceFlow(crate::model::SequenceFlow {
                id: IdBytes::from("f1"),
                name: None,
                source_ref: IdBytes::from("xor"),
                target_ref: IdBytes::from("end"),
                source_node: None,
                target_node: None,
                condition_expression: None,
                source_line: None,
            }));
        definitions.processes.push(process);
        transform(&mut definitions);

        let gateway = definitions.processes[0]
            .flow_elements
            .iter()
            .find_map(|e| e.as_gateway())
            .unwrap();
        assert_eq!(gateway.common.bpmn_aspect, BpmnAspect::TakeSequenceFlow);
    }

    #[test]
    fn transform_is_idempotent_on_an_already_transformed_model() {
        let mut definitions = create_executable_workflow("process")
            .start_event(None)
            .service_task(None)
            .task_type("t")
            .end_event(None)
            .done()
            .expect("valid model");

        let before = format!("{:?}", definitions.processes[0].flow_elements.len());
        let start_outgoing_before = definitions.processes[0]
            .flow_elements
            .iter()
            .find(|e| matches!(e, FlowElement::Start(_)))
            .unwrap()
            .common()
            .unwrap()
            .outgoing
            .len();

        transform(&mut definitions);

        let after = format!("{:?}", definitions.processes[0].flow_elements.len());
        let start_outgoing_after = definitions.processes[0]
            .flow_elements
            .iter()
            .find(|e| matches!(e, FlowElement::Start(_)))
            .unwrap()
            .common()
            .unwrap()
            .outgoing
            .len();

        assert_eq!(before, after);
        assert_eq!(
            start_outgoing_before, start_outgoing_after,
            "re-running the Transformer must not duplicate resolved sequence flow links"
        );
    }

    #[test]
    fn root_identity_mapping_is_elided() {
        let mut process = Process::new(IdBytes::from("p"), true);
        let mut common = crate::model::FlowNodeCommon::new(IdBytes::from("task"));
        common.bpmn_aspect = BpmnAspect::None;
        let mut ext = ExtensionElements::new();
        ext.io_mapping.inputs.push(crate::model::Mapping {
            source_path: IdBytes::from("$"),
            target_path: IdBytes::from("$"),
        });
        process.flow_elements.push(FlowElement::ServiceTask(crate::model::ServiceTask {
            common,
            extension_elements: Some(ext),
        }));

        compile_mappings(&mut process, &crate::compile::JsonPathLibCompiler);
        let task = process.flow_elements[0].as_service_task().unwrap();
        assert!(task.extension_elements.as_ref().unwrap().io_mapping.compiled_inputs.is_empty());
    }
}
