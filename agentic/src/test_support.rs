//! Scripted collaborators for exercising phases without spawning processes.

use std::cell::RefCell;
use std::collections::VecDeque;

use anyhow::{Result, anyhow};

use crate::core::types::TestResult;
use crate::io::provider::LlmProvider;
use crate::io::shipper::{ShipRequest, Shipper};
use crate::io::tester::{TestRequest, TestRunner};
use crate::resolve::{InputSource, Reporter};

/// Returns queued responses in order and records every prompt it was given.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    responses: RefCell<VecDeque<String>>,
    prompts: RefCell<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: RefCell::new(responses.into_iter().map(Into::into).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.borrow().clone()
    }

    pub fn remaining(&self) -> usize {
        self.responses.borrow().len()
    }
}

impl LlmProvider for ScriptedProvider {
    fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted provider has no response left"))
    }
}

/// Reports a fixed outcome and remembers the code it was asked to test.
#[derive(Debug)]
pub struct ScriptedTestRunner {
    passed: bool,
    diagnostic: String,
    seen: RefCell<Vec<String>>,
}

impl ScriptedTestRunner {
    pub fn passing() -> Self {
        Self::with_outcome(true, "ok")
    }

    pub fn failing(diagnostic: &str) -> Self {
        Self::with_outcome(false, diagnostic)
    }

    fn with_outcome(passed: bool, diagnostic: &str) -> Self {
        Self {
            passed,
            diagnostic: diagnostic.to_string(),
            seen: RefCell::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.borrow().clone()
    }
}

impl TestRunner for ScriptedTestRunner {
    fn run(&self, request: &TestRequest) -> Result<TestResult> {
        self.seen.borrow_mut().push(request.code.clone());
        Ok(TestResult {
            passed: self.passed,
            diagnostic: self.diagnostic.clone(),
            exit_code: Some(if self.passed { 0 } else { 1 }),
            duration_ms: 0,
        })
    }
}

/// Ships to a fixed URL (or none) and records commit messages.
#[derive(Debug, Default)]
pub struct ScriptedShipper {
    url: Option<String>,
    messages: RefCell<Vec<String>>,
}

impl ScriptedShipper {
    pub fn new(url: Option<&str>) -> Self {
        Self {
            url: url.map(str::to_string),
            messages: RefCell::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Shipper for ScriptedShipper {
    fn ship(&self, request: &ShipRequest) -> Result<Option<String>> {
        self.messages
            .borrow_mut()
            .push(request.commit_message.clone());
        Ok(self.url.clone())
    }
}

/// In-memory stand-in for stdin.
#[derive(Debug, Clone)]
pub struct FakeInput {
    pub terminal: bool,
    pub content: String,
}

impl FakeInput {
    pub fn tty() -> Self {
        Self {
            terminal: true,
            content: String::new(),
        }
    }

    pub fn piped(content: &str) -> Self {
        Self {
            terminal: false,
            content: content.to_string(),
        }
    }
}

impl InputSource for FakeInput {
    fn is_terminal(&self) -> bool {
        self.terminal
    }

    fn read_all(&mut self) -> std::io::Result<String> {
        Ok(std::mem::take(&mut self.content))
    }
}

/// Collects reported diagnostics.
#[derive(Debug, Default)]
pub struct CapturingReporter {
    messages: RefCell<Vec<String>>,
}

impl CapturingReporter {
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }
}

impl Reporter for CapturingReporter {
    fn error(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }
}
