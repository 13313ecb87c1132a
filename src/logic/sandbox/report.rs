//! Sandbox report parsing
//!
//! Report schemas differ per backend; each supported schema gets its own
//! serde model and is normalised into [`BehaviorReport`].

use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use super::types::{BehaviorReport, ProcessTrace, SandboxError};

/// Syscalls whose path argument is recorded as an opened file
const OPEN_CALLS: &[&str] = &["open", "openat", "creat"];
const PATH_ARGUMENTS: &[&str] = &["filename", "pathname", "path"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    /// `pid` and an argument object per call
    #[default]
    Cuckoo,
    /// `process_id` and a name/value argument list per call
    Cape,
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cuckoo" => Ok(ReportFormat::Cuckoo),
            "cape" => Ok(ReportFormat::Cape),
            other => Err(format!("unknown report format '{}'", other)),
        }
    }
}

// ============================================================================
// CUCKOO
// ============================================================================

#[derive(Deserialize)]
struct CuckooReport {
    behavior: Option<CuckooBehavior>,
}

#[derive(Deserialize)]
struct CuckooBehavior {
    #[serde(default)]
    processes: Vec<CuckooProcess>,
}

#[derive(Deserialize)]
struct CuckooProcess {
    pid: u64,
    #[serde(default)]
    process_name: String,
    #[serde(default)]
    calls: Vec<CuckooCall>,
}

#[derive(Deserialize)]
struct CuckooCall {
    api: String,
    #[serde(default)]
    arguments: serde_json::Map<String, Value>,
}

// ============================================================================
// CAPE
// ============================================================================

#[derive(Deserialize)]
struct CapeReport {
    behavior: Option<CapeBehavior>,
}

#[derive(Deserialize)]
struct CapeBehavior {
    #[serde(default)]
    processes: Vec<CapeProcess>,
}

#[derive(Deserialize)]
struct CapeProcess {
    process_id: u64,
    #[serde(default)]
    process_name: String,
    #[serde(default)]
    calls: Vec<CapeCall>,
}

#[derive(Deserialize)]
struct CapeCall {
    api: String,
    #[serde(default)]
    arguments: Vec<CapeArgument>,
}

#[derive(Deserialize)]
struct CapeArgument {
    name: String,
    value: Value,
}

/// Parse a finished report; a missing or empty behavioral section is an error
pub fn parse_report(task_id: u64, body: &[u8], format: ReportFormat) -> Result<BehaviorReport, SandboxError> {
    let processes = match format {
        ReportFormat::Cuckoo => {
            let report: CuckooReport = serde_json::from_slice(body).map_err(|e| SandboxError::Parse(e.to_string()))?;
            let behavior = report.behavior.ok_or(SandboxError::NoBehavior { task_id })?;
            behavior.processes.into_iter().map(cuckoo_trace).collect::<Vec<_>>()
        }
        ReportFormat::Cape => {
            let report: CapeReport = serde_json::from_slice(body).map_err(|e| SandboxError::Parse(e.to_string()))?;
            let behavior = report.behavior.ok_or(SandboxError::NoBehavior { task_id })?;
            behavior.processes.into_iter().map(cape_trace).collect::<Vec<_>>()
        }
    };

    if processes.is_empty() {
        return Err(SandboxError::NoBehavior { task_id });
    }

    Ok(BehaviorReport { task_id, processes })
}

fn cuckoo_trace(process: CuckooProcess) -> ProcessTrace {
    let mut trace = ProcessTrace {
        pid: process.pid,
        process_name: process.process_name,
        ..Default::default()
    };

    for call in process.calls {
        if OPEN_CALLS.contains(&call.api.as_str()) {
            let path = PATH_ARGUMENTS.iter().find_map(|k| call.arguments.get(*k)).and_then(Value::as_str);
            if let Some(path) = path {
                trace.opened_files.push(path.to_string());
            }
        }
        trace.syscalls.push(call.api);
    }

    trace
}

fn cape_trace(process: CapeProcess) -> ProcessTrace {
    let mut trace = ProcessTrace {
        pid: process.process_id,
        process_name: process.process_name,
        ..Default::default()
    };

    for call in process.calls {
        if OPEN_CALLS.contains(&call.api.as_str()) {
            let path = call
                .arguments
                .iter()
                .find(|a| PATH_ARGUMENTS.contains(&a.name.as_str()))
                .and_then(|a| a.value.as_str());
            if let Some(path) = path {
                trace.opened_files.push(path.to_string());
            }
        }
        trace.syscalls.push(call.api);
    }

    trace
}
