use crate::script::{Namespace, Value};
use crate::sim::{MockEnvironment, SimulationState};
use crate::splice::Payload;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

pub const REPORT_SCHEMA_VERSION: u32 = 1;

/// Machine-readable summary of one harness run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub schema_version: u32,
    pub target: String,
    pub cut_index: Option<usize>,
    pub payload_lines: usize,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub final_state: SimulationState,
    pub calls: BTreeMap<String, u64>,
    pub variables: BTreeMap<String, Value>,
    pub procedures: Vec<String>,
}

impl RunReport {
    pub fn new(
        target: &Path,
        payload: &Payload,
        env: &MockEnvironment,
        ns: &Namespace,
        outcome: &Result<()>,
    ) -> Self {
        Self {
            schema_version: REPORT_SCHEMA_VERSION,
            target: target.display().to_string(),
            cut_index: payload.cut_index,
            payload_lines: payload.line_count(),
            succeeded: outcome.is_ok(),
            error: outcome.as_ref().err().map(|err| format!("{err:#}")),
            final_state: env.state(),
            calls: env
                .call_counts()
                .iter()
                .map(|(op, count)| (op.to_string(), *count))
                .collect(),
            variables: ns.vars().clone(),
            procedures: ns.procedure_names().map(str::to_string).collect(),
        }
    }
}

pub fn write_report(path: &Path, report: &RunReport) -> Result<()> {
    let text = serde_json::to_string_pretty(report).context("serialize run report")?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create parent dir {}", parent.display()))?;
    }
    std::fs::write(path, text.as_bytes()).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}
