//! The XML parser bridge and its symmetric writer.
//!
//! The reader is a streaming pull parser over `quick-xml`'s event stream rather than
//! a DOM: a small explicit state machine tracks the currently-open element and
//! accumulates its children across `Event::Start`/`Event::Empty`/`Event::Text`/
//! `Event::End` callbacks, materializing each BPMN element directly into its tagged
//! `FlowElement` variant as its closing tag is seen. It performs no validation and no
//! link resolution — sequence flow `source_ref`/`target_ref` are stored verbatim and
//! resolved later by the Transformer.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::error::ParseError;
use crate::ids::IdBytes;
use crate::model::{
    EndEvent, ExclusiveGateway, ExtensionElements, FlowElement, FlowNodeCommon,
    InputOutputMapping, Mapping, Process, SequenceFlow, ServiceTask, StartEvent, TaskDefinition,
    TaskHeader, WorkflowDefinition,
};

/// Strips any namespace prefix, e.g. `bpmn:startEvent` → `startEvent`,
/// `zeebe:taskDefinition` → `taskDefinition`.
fn local_name(qualified: &[u8]) -> String {
    let s = String::from_utf8_lossy(qualified);
    match s.split_once(':') {
        Some((_, local)) => local.to_string(),
        None => s.into_owned(),
    }
}

fn line_at(xml: &str, byte_pos: usize) -> u32 {
    1 + xml.as_bytes()[..byte_pos.min(xml.len())]
        .iter()
        .filter(|&&b| b == b'\n')
        .count() as u32
}

fn get_attr_opt(e: &BytesStart) -> Vec<(String, String)> {
    e.attributes()
        .filter_map(|a| a.ok())
        .map(|a| {
            let key = local_name(a.key.as_ref());
            let value = String::from_utf8_lossy(&a.value).into_owned();
            (key, value)
        })
        .collect()
}

fn attr(attrs: &[(String, String)], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}

fn require_attr(
    attrs: &[(String, String)],
    name: &str,
    qname: &str,
    line: u32,
) -> Result<String, ParseError> {
    attr(attrs, name).ok_or_else(|| ParseError::MissingAttribute {
        qname: qname.to_string(),
        attribute: name.to_string(),
        line,
    })
}

/// Rejects any attribute on a Zeebe-namespace element outside `allowed`, per
/// spec.md:191's "unknown attributes ... in the Zeebe namespace are rejected".
fn check_known_attrs(
    attrs: &[(String, String)],
    allowed: &[&str],
    qname: &str,
    line: u32,
) -> Result<(), ParseError> {
    for (key, _) in attrs {
        if !allowed.contains(&key.as_str()) {
            return Err(ParseError::UnknownAttribute {
                qname: qname.to_string(),
                attribute: key.clone(),
                line,
            });
        }
    }
    Ok(())
}

/// The element currently being accumulated while its children are read.
enum OpenElement {
    EndEvent {
        id: IdBytes,
        name: Option<IdBytes>,
        line: u32,
    },
    ServiceTask {
        id: IdBytes,
        name: Option<IdBytes>,
        extension_elements: Option<ExtensionElements>,
        line: u32,
    },
    SequenceFlow {
        id: IdBytes,
        name: Option<IdBytes>,
        source_ref: IdBytes,
        target_ref: IdBytes,
        condition_text: Option<String>,
        line: u32,
    },
    TaskHeader {
        key: Option<IdBytes>,
        value: Option<IdBytes>,
    },
}

struct ParserState {
    in_process: bool,
    open: Option<OpenElement>,
    in_extension_elements: bool,
    in_task_headers: bool,
    in_io_mapping: bool,
    in_condition_expression: bool,
    /// Depth of an unrecognized plain-BPMN element's subtree currently being skipped.
    /// `0` means nothing is being skipped.
    ignore_depth: u32,
}

/// Parses BPMN 2.0 XML restricted to the executable subset into a raw, unresolved
/// `WorkflowDefinition`.
pub fn parse_bpmn(xml: &str) -> Result<WorkflowDefinition, ParseError> {
    tracing::debug!(bytes = xml.len(), "parsing BPMN XML source");
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut definitions = WorkflowDefinition::new();
    let mut state = ParserState {
        in_process: false,
        open: None,
        in_extension_elements: false,
        in_task_headers: false,
        in_io_mapping: false,
        in_condition_expression: false,
        ignore_depth: 0,
    };

    let mut buf = Vec::new();
    loop {
        let pos_before = reader.buffer_position() as usize;
        let event = reader.read_event_into(&mut buf);
        match event {
            Ok(Event::Start(ref e)) => {
                handle_open_tag(e, false, xml, pos_before, &mut definitions, &mut state)?;
            }
            Ok(Event::Empty(ref e)) => {
                handle_open_tag(e, true, xml, pos_before, &mut definitions, &mut state)?;
            }
            Ok(Event::End(ref e)) => {
                let local = local_name(e.name().as_ref());
                handle_close_tag(&local, &mut definitions, &mut state);
            }
            Ok(Event::Text(ref e)) => {
                if let Ok(text) = e.unescape() {
                    let text = text.trim().to_string();
                    if !text.is_empty() && state.in_condition_expression {
                        if let Some(OpenElement::SequenceFlow { condition_text, .. }) =
                            &mut state.open
                        {
                            *condition_text = Some(text);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                let line = line_at(xml, pos_before);
                tracing::warn!(line, error = %e, "malformed BPMN XML");
                return Err(ParseError::MalformedXml {
                    line,
                    message: e.to_string(),
                });
            }
            _ => {}
        }
        buf.clear();
    }

    tracing::debug!(processes = definitions.processes.len(), "parsed BPMN XML source");
    Ok(definitions)
}

fn current_process(definitions: &mut WorkflowDefinition) -> &mut Process {
    definitions
        .processes
        .last_mut()
        .expect("process element must have been opened before a child element is parsed")
}

fn handle_open_tag(
    e: &BytesStart,
    is_empty: bool,
    xml: &str,
    pos: usize,
    definitions: &mut WorkflowDefinition,
    state: &mut ParserState,
) -> Result<(), ParseError> {
    if state.ignore_depth > 0 {
        if !is_empty {
            state.ignore_depth += 1;
        }
        return Ok(());
    }

    let local = local_name(e.name().as_ref());
    let attrs = get_attr_opt(e);
    let line = line_at(xml, pos);

    match local.as_str() {
        "process" => {
            let id = require_attr(&attrs, "id", "bpmn:process", line)?;
            let is_executable = attr(&attrs, "isExecutable")
                .map(|v| v == "true")
                .unwrap_or(false);
            definitions
                .processes
                .push(Process::new(IdBytes::from(id), is_executable));
            state.in_process = true;
        }
        "startEvent" if state.in_process => {
            let id = require_attr(&attrs, "id", "bpmn:startEvent", line)?;
            let name = attr(&attrs, "name").map(IdBytes::from);
            let mut common = FlowNodeCommon::new(IdBytes::from(id));
            common.name = name;
            common.source_line = Some(line);
            current_process(definitions)
                .flow_elements
                .push(FlowElement::Start(StartEvent { common }));
        }
        "endEvent" if state.in_process => {
            let id = require_attr(&attrs, "id", "bpmn:endEvent", line)?;
            let name = attr(&attrs, "name").map(IdBytes::from);
            if is_empty {
                push_end_event(definitions, IdBytes::from(id), name, line);
            } else {
                state.open = Some(OpenElement::EndEvent {
                    id: IdBytes::from(id),
                    name,
                    line,
                });
            }
        }
        "serviceTask" if state.in_process => {
            let id = require_attr(&attrs, "id", "bpmn:serviceTask", line)?;
            let name = attr(&attrs, "name").map(IdBytes::from);
            if is_empty {
                push_service_task(definitions, IdBytes::from(id), name, None, line);
            } else {
                state.open = Some(OpenElement::ServiceTask {
                    id: IdBytes::from(id),
                    name,
                    extension_elements: None,
                    line,
                });
            }
        }
        "exclusiveGateway" if state.in_process => {
            let id = require_attr(&attrs, "id", "bpmn:exclusiveGateway", line)?;
            let name = attr(&attrs, "name").map(IdBytes::from);
            let default_flow_ref = attr(&attrs, "default").map(IdBytes::from);
            let mut common = FlowNodeCommon::new(IdBytes::from(id));
            common.name = name;
            common.source_line = Some(line);
            current_process(definitions)
                .flow_elements
                .push(FlowElement::Gateway(ExclusiveGateway {
                    common,
                    default_flow_ref,
                    default_flow: None,
                    outgoing_with_conditions: Vec::new(),
                }));
        }
        "sequenceFlow" if state.in_process => {
            let id = require_attr(&attrs, "id", "bpmn:sequenceFlow", line)?;
            let source = require_attr(&attrs, "sourceRef", "bpmn:sequenceFlow", line)?;
            let target = require_attr(&attrs, "targetRef", "bpmn:sequenceFlow", line)?;
            let name = attr(&attrs, "name").map(IdBytes::from);
            if is_empty {
                push_sequence_flow(
                    definitions,
                    IdBytes::from(id),
                    name,
                    IdBytes::from(source),
                    IdBytes::from(target),
                    None,
                    line,
                );
            } else {
                state.open = Some(OpenElement::SequenceFlow {
                    id: IdBytes::from(id),
                    name,
                    source_ref: IdBytes::from(source),
                    target_ref: IdBytes::from(target),
                    condition_text: None,
                    line,
                });
            }
        }
        "conditionExpression" => {
            state.in_condition_expression = true;
        }
        "extensionElements" => {
            state.in_extension_elements = true;
            if let Some(OpenElement::ServiceTask {
                extension_elements,
                ..
            }) = &mut state.open
            {
                if extension_elements.is_none() {
                    *extension_elements = Some(ExtensionElements::new());
                }
            }
        }
        "taskDefinition" if state.in_extension_elements => {
            check_known_attrs(&attrs, &["type", "retries"], "zeebe:taskDefinition", line)?;
            let task_type = attr(&attrs, "type").unwrap_or_default();
            let retries = attr(&attrs, "retries")
                .and_then(|v| v.parse::<i32>().ok())
                .unwrap_or(3);
            if let Some(OpenElement::ServiceTask {
                extension_elements, ..
            }) = &mut state.open
            {
                let ext = extension_elements.get_or_insert_with(ExtensionElements::new);
                let mut def = TaskDefinition::new(IdBytes::from(task_type));
                def.retries = retries;
                ext.task_definition = Some(def);
            }
        }
        "taskHeaders" if state.in_extension_elements => {
            check_known_attrs(&attrs, &[], "zeebe:taskHeaders", line)?;
            state.in_task_headers = true;
        }
        "header" if state.in_task_headers => {
            check_known_attrs(&attrs, &["key", "value"], "zeebe:header", line)?;
            let key = attr(&attrs, "key").map(IdBytes::from);
            let value = attr(&attrs, "value").map(IdBytes::from);
            if let Some(OpenElement::ServiceTask {
                extension_elements, ..
            }) = &mut state.open
            {
                extension_elements
                    .get_or_insert_with(ExtensionElements::new)
                    .task_headers
                    .headers
                    .push(TaskHeader { key, value });
            }
        }
        "ioMapping" if state.in_extension_elements => {
            check_known_attrs(&attrs, &["outputBehavior"], "zeebe:ioMapping", line)?;
            state.in_io_mapping = true;
            let behavior = attr(&attrs, "outputBehavior").unwrap_or_else(|| "MERGE".to_string());
            if let Some(OpenElement::ServiceTask {
                extension_elements, ..
            }) = &mut state.open
            {
                extension_elements
                    .get_or_insert_with(ExtensionElements::new)
                    .io_mapping
                    .output_behavior_raw = IdBytes::from(behavior);
            }
        }
        "input" if state.in_io_mapping => {
            check_known_attrs(&attrs, &["source", "target"], "zeebe:input", line)?;
            push_mapping(state, &attrs, true);
        }
        "output" if state.in_io_mapping => {
            check_known_attrs(&attrs, &["source", "target"], "zeebe:output", line)?;
            push_mapping(state, &attrs, false);
        }
        "definitions" => {}
        _ if state.in_extension_elements => {
            return Err(ParseError::UnsupportedElement {
                qname: format!("zeebe:{local}"),
                line,
            });
        }
        _ => {
            // Unknown plain-BPMN elements are ignored for read (their subtree is
            // skipped) rather than rejected; only the Zeebe namespace is strict.
            tracing::debug!(qname = %format!("bpmn:{local}"), line, "ignoring unrecognized BPMN element");
            if !is_empty {
                state.ignore_depth = 1;
            }
        }
    }

    Ok(())
}

fn push_mapping(state: &mut ParserState, attrs: &[(String, String)], is_input: bool) {
    let Some(OpenElement::ServiceTask {
        extension_elements, ..
    }) = &mut state.open
    else {
        return;
    };
    let ext = extension_elements.get_or_insert_with(ExtensionElements::new);
    let mapping = Mapping {
        source_path: IdBytes::from(attr(attrs, "source").unwrap_or_default()),
        target_path: IdBytes::from(attr(attrs, "target").unwrap_or_default()),
    };
    if is_input {
        ext.io_mapping.inputs.push(mapping);
    } else {
        ext.io_mapping.outputs.push(mapping);
    }
}

fn handle_close_tag(local: &str, definitions: &mut WorkflowDefinition, state: &mut ParserState) {
    if state.ignore_depth > 0 {
        state.ignore_depth -= 1;
        return;
    }

    match local {
        "endEvent" => {
            if let Some(OpenElement::EndEvent { id, name, line }) = state.open.take() {
                push_end_event(definitions, id, name, line);
            }
        }
        "serviceTask" => {
            if let Some(OpenElement::ServiceTask {
                id,
                name,
                extension_elements,
                line,
            }) = state.open.take()
            {
                push_service_task(definitions, id, name, extension_elements, line);
            }
        }
        "sequenceFlow" => {
            if let Some(OpenElement::SequenceFlow {
                id,
                name,
                source_ref,
                target_ref,
                condition_text,
                line,
            }) = state.open.take()
            {
                push_sequence_flow(definitions, id, name, source_ref, target_ref, condition_text, line);
            }
        }
        "conditionExpression" => {
            state.in_condition_expression = false;
        }
        "extensionElements" => {
            state.in_extension_elements = false;
        }
        "taskHeaders" => {
            state.in_task_headers = false;
        }
        "ioMapping" => {
            state.in_io_mapping = false;
        }
        "process" => {
            state.in_process = false;
        }
        _ => {}
    }
}

fn push_end_event(definitions: &mut WorkflowDefinition, id: IdBytes, name: Option<IdBytes>, line: u32) {
    let mut common = FlowNodeCommon::new(id);
    common.name = name;
    common.source_line = Some(line);
    current_process(definitions)
        .flow_elements
        .push(FlowElement::End(EndEvent { common }));
}

fn push_service_task(
    definitions: &mut WorkflowDefinition,
    id: IdBytes,
    name: Option<IdBytes>,
    extension_elements: Option<ExtensionElements>,
    line: u32,
) {
    let mut common = FlowNodeCommon::new(id);
    common.name = name;
    common.source_line = Some(line);
    current_process(definitions)
        .flow_elements
        .push(FlowElement::ServiceTask(ServiceTask {
            common,
            extension_elements,
        }));
}

fn push_sequence_flow(
    definitions: &mut WorkflowDefinition,
    id: IdBytes,
    name: Option<IdBytes>,
    source_ref: IdBytes,
    target_ref: IdBytes,
    condition_text: Option<String>,
    line: u32,
) {
    let condition_expression = condition_text
        .map(|text| crate::model::ConditionExpression::new(IdBytes::from(text)));
    current_process(definitions)
        .flow_elements
        .push(FlowElement::SequenceFlow(SequenceFlow {
            id,
            name,
            source_ref,
            target_ref,
            source_node: None,
            target_node: None,
            condition_expression,
            source_line: Some(line),
        }));
}

/// Writes a `WorkflowDefinition` back to BPMN 2.0 XML. Symmetric with [`parse_bpmn`]
/// but, unlike it, is given a *transformed* model and so can rely on resolved
/// indices rather than re-deriving them; it re-emits the executable subset only.
pub fn write_bpmn(definitions: &WorkflowDefinition) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(
        "<bpmn:definitions xmlns:bpmn=\"http://www.omg.org/spec/BPMN/20100524/MODEL\" xmlns:zeebe=\"http://camunda.org/schema/zeebe/1.0\">\n",
    );

    for process in &definitions.processes {
        write_process(&mut out, process);
    }

    out.push_str("</bpmn:definitions>\n");
    out
}

fn write_process(out: &mut String, process: &Process) {
    use std::fmt::Write as _;
    let _ = writeln!(
        out,
        "  <bpmn:process id=\"{}\" isExecutable=\"{}\">",
        xml_escape(&process.bpmn_process_id.as_str_lossy()),
        process.is_executable
    );

    for element in &process.flow_elements {
        match element {
            FlowElement::Start(e) => {
                let _ = writeln!(out, "    <bpmn:startEvent id=\"{}\" />", xml_escape(&e.common.id.as_str_lossy()));
            }
            FlowElement::End(e) => {
                let _ = writeln!(out, "    <bpmn:endEvent id=\"{}\" />", xml_escape(&e.common.id.as_str_lossy()));
            }
            FlowElement::Gateway(g) => {
                if let Some(default_ref) = &g.default_flow_ref {
                    let _ = writeln!(
                        out,
                        "    <bpmn:exclusiveGateway id=\"{}\" default=\"{}\" />",
                        xml_escape(&g.common.id.as_str_lossy()),
                        xml_escape(&default_ref.as_str_lossy())
                    );
                } else {
                    let _ = writeln!(
                        out,
                        "    <bpmn:exclusiveGateway id=\"{}\" />",
                        xml_escape(&g.common.id.as_str_lossy())
                    );
                }
            }
            FlowElement::SequenceFlow(f) => {
                if let Some(cond) = &f.condition_expression {
                    let _ = writeln!(
                        out,
                        "    <bpmn:sequenceFlow id=\"{}\" sourceRef=\"{}\" targetRef=\"{}\">",
                        xml_escape(&f.id.as_str_lossy()),
                        xml_escape(&f.source_ref.as_str_lossy()),
                        xml_escape(&f.target_ref.as_str_lossy())
                    );
                    let _ = writeln!(
                        out,
                        "      <bpmn:conditionExpression>{}</bpmn:conditionExpression>",
                        xml_escape(&cond.text.as_str_lossy())
                    );
                    let _ = writeln!(out, "    </bpmn:sequenceFlow>");
                } else {
                    let _ = writeln!(
                        out,
                        "    <bpmn:sequenceFlow id=\"{}\" sourceRef=\"{}\" targetRef=\"{}\" />",
                        xml_escape(&f.id.as_str_lossy()),
                        xml_escape(&f.source_ref.as_str_lossy()),
                        xml_escape(&f.target_ref.as_str_lossy())
                    );
                }
            }
            FlowElement::ServiceTask(t) => write_service_task(out, t),
        }
    }

    out.push_str("  </bpmn:process>\n");
}

fn write_service_task(out: &mut String, task: &ServiceTask) {
    use std::fmt::Write as _;
    let has_extensions = task.extension_elements.is_some();
    if !has_extensions {
        let _ = writeln!(out, "    <bpmn:serviceTask id=\"{}\" />", xml_escape(&task.common.id.as_str_lossy()));
        return;
    }
    let ext = task.extension_elements.as_ref().unwrap();
    let _ = writeln!(out, "    <bpmn:serviceTask id=\"{}\">", xml_escape(&task.common.id.as_str_lossy()));
    out.push_str("      <bpmn:extensionElements>\n");
    if let Some(def) = &ext.task_definition {
        let _ = writeln!(
            out,
            "        <zeebe:taskDefinition type=\"{}\" retries=\"{}\" />",
            xml_escape(&def.task_type.as_str_lossy()),
            def.retries
        );
    }
    if !ext.task_headers.headers.is_empty() {
        out.push_str("        <zeebe:taskHeaders>\n");
        for header in &ext.task_headers.headers {
            let key = header.key.as_ref().map(|k| k.as_str_lossy()).unwrap_or_default();
            let value = header.value.as_ref().map(|v| v.as_str_lossy()).unwrap_or_default();
            let _ = writeln!(
                out,
                "          <zeebe:header key=\"{}\" value=\"{}\" />",
                xml_escape(&key),
                xml_escape(&value)
            );
        }
        out.push_str("        </zeebe:taskHeaders>\n");
    }
    if !ext.io_mapping.inputs.is_empty() || !ext.io_mapping.outputs.is_empty() {
        let _ = writeln!(
            out,
            "        <zeebe:ioMapping outputBehavior=\"{}\">",
            xml_escape(&ext.io_mapping.output_behavior_raw.as_str_lossy())
        );
        for m in &ext.io_mapping.inputs {
            let _ = writeln!(
                out,
                "          <zeebe:input source=\"{}\" target=\"{}\" />",
                xml_escape(&m.source_path.as_str_lossy()),
                xml_escape(&m.target_path.as_str_lossy())
            );
        }
        for m in &ext.io_mapping.outputs {
            let _ = writeln!(
                out,
                "          <zeebe:output source=\"{}\" target=\"{}\" />",
                xml_escape(&m.source_path.as_str_lossy()),
                xml_escape(&m.target_path.as_str_lossy())
            );
        }
        out.push_str("        </zeebe:ioMapping>\n");
    }
    out.push_str("      </bpmn:extensionElements>\n");
    out.push_str("    </bpmn:serviceTask>\n");
}

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        <bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
                          xmlns:zeebe="http://camunda.org/schema/zeebe/1.0">
          <bpmn:process id="p" isExecutable="true">
            <bpmn:startEvent id="start" />
            <bpmn:serviceTask id="task">
              <bpmn:extensionElements>
                <zeebe:taskDefinition type="t" />
              </bpmn:extensionElements>
            </bpmn:serviceTask>
            <bpmn:endEvent id="end" />
            <bpmn:sequenceFlow id="f1" sourceRef="start" targetRef="task" />
            <bpmn:sequenceFlow id="f2" sourceRef="task" targetRef="end" />
          </bpmn:process>
        </bpmn:definitions>
    "#;

    #[test]
    fn minimal_process_parses() {
        let definitions = parse_bpmn(MINIMAL).unwrap();
        assert_eq!(definitions.processes.len(), 1);
        let process = &definitions.processes[0];
        assert!(process.is_executable);
        assert_eq!(process.flow_elements.len(), 5);
    }

    #[test]
    fn task_type_is_read_from_zeebe_extension() {
        let definitions = parse_bpmn(MINIMAL).unwrap();
        let process = &definitions.processes[0];
        let task = process
            .flow_elements
            .iter()
            .find_map(|e| e.as_service_task())
            .unwrap();
        let def = task.extension_elements.as_ref().unwrap().task_definition.as_ref().unwrap();
        assert_eq!(def.task_type.as_str_lossy(), "t");
    }

    #[test]
    fn unrecognized_plain_bpmn_element_is_ignored_for_read() {
        let xml = r#"
            <bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL">
              <bpmn:process id="p" isExecutable="true">
                <bpmn:userTask id="u">
                  <bpmn:documentation>nested text, ignored too</bpmn:documentation>
                </bpmn:userTask>
                <bpmn:startEvent id="start" />
              </bpmn:process>
            </bpmn:definitions>
        "#;
        let definitions = parse_bpmn(xml).expect("unrecognized elements are skipped, not rejected");
        assert_eq!(definitions.processes[0].flow_elements.len(), 1);
    }

    #[test]
    fn unrecognized_zeebe_element_is_rejected() {
        let xml = r#"
            <bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
                              xmlns:zeebe="http://camunda.org/schema/zeebe/1.0">
              <bpmn:process id="p" isExecutable="true">
                <bpmn:serviceTask id="t">
                  <bpmn:extensionElements>
                    <zeebe:bogus />
                  </bpmn:extensionElements>
                </bpmn:serviceTask>
              </bpmn:process>
            </bpmn:definitions>
        "#;
        let err = parse_bpmn(xml).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedElement { .. }));
    }

    #[test]
    fn unknown_attribute_on_a_zeebe_element_is_rejected() {
        let xml = r#"
            <bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
                              xmlns:zeebe="http://camunda.org/schema/zeebe/1.0">
              <bpmn:process id="p" isExecutable="true">
                <bpmn:serviceTask id="t">
                  <bpmn:extensionElements>
                    <zeebe:taskDefinition type="t" retries="3" bogus="x" />
                  </bpmn:extensionElements>
                </bpmn:serviceTask>
              </bpmn:process>
            </bpmn:definitions>
        "#;
        let err = parse_bpmn(xml).unwrap_err();
        match err {
            ParseError::UnknownAttribute { attribute, .. } => assert_eq!(attribute, "bogus"),
            other => panic!("expected UnknownAttribute, got {other:?}"),
        }
    }

    #[test]
    fn xor_condition_expressions_round_trip_through_write_and_read() {
        let definitions = parse_bpmn(MINIMAL).unwrap();
        let xml = write_bpmn(&definitions);
        let reparsed = parse_bpmn(&xml).unwrap();
        assert_eq!(reparsed.processes[0].flow_elements.len(), 5);
    }

    #[test]
    fn output_behavior_attribute_is_preserved_verbatim_even_when_invalid() {
        let xml = r#"
            <bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL"
                              xmlns:zeebe="http://camunda.org/schema/zeebe/1.0">
              <bpmn:process id="p" isExecutable="true">
                <bpmn:serviceTask id="task">
                  <bpmn:extensionElements>
                    <zeebe:taskDefinition type="t" />
                    <zeebe:ioMapping outputBehavior="asdf">
                      <zeebe:output source="$.bar" target="$.a" />
                    </zeebe:ioMapping>
                  </bpmn:extensionElements>
                </bpmn:serviceTask>
              </bpmn:process>
            </bpmn:definitions>
        "#;
        let definitions = parse_bpmn(xml).unwrap();
        let task = definitions.processes[0]
            .flow_elements
            .iter()
            .find_map(|e| e.as_service_task())
            .unwrap();
        let raw = &task
            .extension_elements
            .as_ref()
            .unwrap()
            .io_mapping
            .output_behavior_raw;
        assert_eq!(raw.as_str_lossy(), "asdf");
    }
}
