use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::error::ProcessError;
use super::runner::{ExitStatus, ProcessCommand, ProcessOutput, ProcessRunner};

/// Scripted process runner for tests.
///
/// Expectations are matched by program name (and an optional args predicate)
/// in registration order; an unmatched command is an error so tests fail
/// loudly instead of silently succeeding.
#[derive(Clone, Default)]
pub struct MockProcessRunner {
    expectations: Arc<Mutex<Vec<MockExpectation>>>,
    call_history: Arc<Mutex<Vec<ProcessCommand>>>,
}

struct MockExpectation {
    program: String,
    #[allow(clippy::type_complexity)]
    args_matcher: Option<Box<dyn Fn(&[String]) -> bool + Send + Sync>>,
    response: MockResponse,
}

enum MockResponse {
    Output(ProcessOutput),
    Error(String),
    Timeout(Duration),
}

impl MockProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a successful response for `program`.
    pub fn expect_success(&self, program: &str, stdout: &str) {
        self.push(
            program,
            None,
            MockResponse::Output(output(ExitStatus::Success, stdout, "")),
        );
    }

    /// Register a failing exit for `program`.
    pub fn expect_failure(&self, program: &str, code: i32, stderr: &str) {
        self.push(
            program,
            None,
            MockResponse::Output(output(ExitStatus::Error(code), "", stderr)),
        );
    }

    /// Register a hard error (spawn failure and the like) for `program`.
    pub fn expect_error(&self, program: &str, message: &str) {
        self.push(program, None, MockResponse::Error(message.to_string()));
    }

    /// Register a timeout for `program`, as if it outran its deadline.
    pub fn expect_timeout(&self, program: &str, after: Duration) {
        self.push(program, None, MockResponse::Timeout(after));
    }

    /// Register a successful response gated on an argument predicate.
    pub fn expect_success_matching<F>(&self, program: &str, matcher: F, stdout: &str)
    where
        F: Fn(&[String]) -> bool + Send + Sync + 'static,
    {
        self.push(
            program,
            Some(Box::new(matcher)),
            MockResponse::Output(output(ExitStatus::Success, stdout, "")),
        );
    }

    fn push(
        &self,
        program: &str,
        args_matcher: Option<Box<dyn Fn(&[String]) -> bool + Send + Sync>>,
        response: MockResponse,
    ) {
        self.expectations.lock().unwrap().push(MockExpectation {
            program: program.to_string(),
            args_matcher,
            response,
        });
    }

    pub fn calls_to(&self, program: &str) -> usize {
        self.call_history
            .lock()
            .unwrap()
            .iter()
            .filter(|cmd| cmd.program == program)
            .count()
    }
}

fn output(status: ExitStatus, stdout: &str, stderr: &str) -> ProcessOutput {
    ProcessOutput {
        status,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
        duration: Duration::from_millis(1),
    }
}

#[async_trait]
impl ProcessRunner for MockProcessRunner {
    async fn run(&self, command: ProcessCommand) -> Result<ProcessOutput, ProcessError> {
        self.call_history.lock().unwrap().push(command.clone());

        let expectations = self.expectations.lock().unwrap();
        for expectation in expectations.iter() {
            if expectation.program != command.program {
                continue;
            }
            if let Some(ref matcher) = expectation.args_matcher {
                if !matcher(&command.args) {
                    continue;
                }
            }
            return match &expectation.response {
                MockResponse::Output(out) => Ok(out.clone()),
                MockResponse::Error(message) => {
                    Err(ProcessError::MockExpectationNotMet(message.clone()))
                }
                MockResponse::Timeout(after) => Err(ProcessError::Timeout(*after)),
            };
        }

        Err(ProcessError::MockExpectationNotMet(format!(
            "No expectation registered for command '{}'",
            command.program
        )))
    }
}
