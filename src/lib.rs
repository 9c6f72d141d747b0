//! A typed BPMN 2.0 workflow model library for an executable subset used by a
//! workflow engine: a graph builder, an XML/YAML parser bridge, a transformer that
//! closes the graph (link resolution, aspect classification, msgpack pre-encoding,
//! condition/JSON-path compilation), and a validator that checks the executable
//! subset's semantic rules and reports structured, locatable diagnostics.
//!
//! The typical entry point is [`facade::Facade`]:
//!
//! ```
//! use bpmn_model::facade::Facade;
//!
//! let facade = Facade::new();
//! let definitions = facade.read_yaml("name: wf\ntasks:\n  - type: charge-card\n")
//!     .expect("valid workflow");
//! assert_eq!(definitions.processes.len(), 1);
//! ```
//!
//! Building a process directly, without a textual surface, goes through the same
//! [`builder::ProcessBuilder`] the YAML translator uses internally:
//!
//! ```
//! use bpmn_model::builder::create_executable_workflow;
//!
//! let definitions = create_executable_workflow("process")
//!     .start_event(None)
//!     .service_task(None)
//!         .task_type("charge-card")
//!     .end_event(None)
//!     .done()
//!     .expect("valid workflow");
//! ```

pub mod builder;
pub mod compile;
pub mod error;
pub mod facade;
pub mod ids;
pub mod model;
pub mod msgpack;
pub mod transform;
pub mod validate;
pub mod xml;
pub mod yaml;

pub use error::{CompileError, Diagnostic, ElementRef, ParseError, Severity, ValidationError};
pub use facade::{Facade, FacadeError};
pub use ids::{IdBytes, ID_MAX_LEN};
pub use model::{BpmnAspect, OutputBehavior, Process, WorkflowDefinition};
