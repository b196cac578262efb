//! Interactive value sources.
//!
//! The last resolution layer asks a [`ValueSource`] for keys nothing else
//! could resolve. On a terminal that is the operator: the label
//! `"<resolver-name>.<key> = "` is written to stdout and one line is read from
//! stdin. The line is used as-is, without escaping or type coercion.
//!
//! Tests and unattended runs substitute [`CannedAnswers`] or [`Unattended`].

use crate::error::{ConfError, ConfResult};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::io::{self, BufRead, BufReader, Write};
use std::rc::Rc;

/// Source of values for otherwise unresolved keys.
pub trait ValueSource {
    /// Produce a value for `key` or fail. `label` is what an operator would
    /// be shown.
    fn resolve_or_fail(&self, label: &str, key: &str) -> ConfResult<Value>;
}

/// Prompts on a line-oriented terminal.
pub struct TerminalPrompt {
    input: RefCell<Box<dyn BufRead>>,
    output: RefCell<Box<dyn Write>>,
}

impl TerminalPrompt {
    /// Prompt on stdout, read from stdin.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }

    pub fn new(input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        Self {
            input: RefCell::new(Box::new(input)),
            output: RefCell::new(Box::new(output)),
        }
    }

    fn read_answer(&self, label: &str) -> io::Result<Option<String>> {
        {
            let mut output = self.output.borrow_mut();
            output.write_all(label.as_bytes())?;
            output.flush()?;
        }

        let mut line = String::new();
        if self.input.borrow_mut().read_line(&mut line)? == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}

impl ValueSource for TerminalPrompt {
    fn resolve_or_fail(&self, label: &str, key: &str) -> ConfResult<Value> {
        match self.read_answer(label) {
            Ok(Some(line)) => Ok(Value::String(line)),
            Ok(None) => Err(ConfError::prompt_failed(key, "end of input")),
            Err(err) => Err(ConfError::prompt_failed(key, err)),
        }
    }
}

/// Fixed answers keyed by configuration key; records every label asked.
///
/// Clones share state, so a test can keep a handle after giving one to a run.
#[derive(Clone, Default)]
pub struct CannedAnswers {
    answers: Rc<RefCell<BTreeMap<String, Value>>>,
    asked: Rc<RefCell<Vec<String>>>,
}

impl CannedAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an answer (builder pattern).
    pub fn answer(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.answers.borrow_mut().insert(key.into(), value.into());
        self
    }

    /// Labels shown so far, in order.
    pub fn asked(&self) -> Vec<String> {
        self.asked.borrow().clone()
    }
}

impl ValueSource for CannedAnswers {
    fn resolve_or_fail(&self, label: &str, key: &str) -> ConfResult<Value> {
        self.asked.borrow_mut().push(label.to_string());
        self.answers
            .borrow()
            .get(key)
            .cloned()
            .ok_or_else(|| ConfError::missing("", key).with_details("no canned answer"))
    }
}

/// Never answers; every unresolved key is a missing value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unattended;

impl ValueSource for Unattended {
    fn resolve_or_fail(&self, _label: &str, key: &str) -> ConfResult<Value> {
        Err(ConfError::missing("", key).with_details("prompting disabled"))
    }
}
