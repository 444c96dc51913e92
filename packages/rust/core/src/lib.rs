//! Enrichment engine and pipeline orchestration for docsmith.
//!
//! Two products come out of the same parsed sections:
//! - enhanced markdown ([`SectionEnhancer`]): original content plus appended
//!   subsections, annotated code, and a synthesized workflow
//! - QA pairs ([`QaGenerator`]), rendered as an FAQ by [`format_qa_section`]
//!
//! [`pipeline::run`] ties both to file discovery and output assembly.

mod composers;

pub mod answers;
pub mod assembler;
pub mod code_enhancer;
pub mod enhancer;
pub mod extract;
pub mod format;
pub mod pipeline;
pub mod qa;
pub mod questions;
pub mod toc;
pub mod workflow;

pub use assembler::validate_output;
pub use code_enhancer::{describe_code_block, enhance_code_block};
pub use enhancer::{SectionEnhancer, resolve_section_type};
pub use extract::{extract_actions, extract_commands, extract_concepts};
pub use format::{format_qa, format_qa_section};
pub use pipeline::{ProgressReporter, RunConfig, RunResult, SilentProgress, run};
pub use qa::{QaGenerator, generate_qa_pairs};
pub use workflow::synthesize_workflow;
