#![allow(dead_code)]

use datascribe::{ExecutionRequest, ExecutionResult, Result, ScribeError, ToolRunner};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

/// Canned tool output keyed by program name, consumed in order.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: RefCell<HashMap<String, VecDeque<ExecutionResult>>>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, program: &str, stdout: &str) -> Self {
        self.push(program, ExecutionResult::new(Some(0), stdout, ""))
    }

    pub fn fail(self, program: &str, status: i32, stderr: &str) -> Self {
        self.push(program, ExecutionResult::new(Some(status), "", stderr))
    }

    fn push(self, program: &str, result: ExecutionResult) -> Self {
        self.responses
            .borrow_mut()
            .entry(program.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    pub fn programs(&self) -> Vec<String> {
        self.calls.borrow().iter().map(|c| c[0].clone()).collect()
    }
}

impl ToolRunner for ScriptedRunner {
    /// Unscripted programs behave as if they were not installed.
    fn spawn(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        self.calls.borrow_mut().push(request.tokens());
        let program = request.program_name();
        self.responses
            .borrow_mut()
            .get_mut(&program)
            .and_then(|queue| queue.pop_front())
            .ok_or(ScribeError::ToolNotFound(program))
    }
}

pub const BINWALK_HEADER: &str = "\nDECIMAL       HEXADECIMAL     DESCRIPTION\n--------------------------------------------------------------------------------\n";

pub fn binwalk_report(lines: &[&str]) -> String {
    let mut report = BINWALK_HEADER.to_string();
    for line in lines {
        report.push_str(line);
        report.push('\n');
    }
    report
}
