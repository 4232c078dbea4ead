//! Scripted collaborators for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crate::context::StageContext;
use crate::core::{PipelinePhase, StageOutput};
use crate::errors::{DeployResult, DeployflowError};
use crate::exec::{CommandOutput, CommandRunner, CommandSpec};
use crate::http::HttpTransport;
use crate::notify::{NotificationEvent, Notifier};
use crate::pipeline::FailureMode;
use crate::stages::Stage;

#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    Timeout,
}

#[derive(Debug, Clone)]
struct Rule {
    program: String,
    prefix: Vec<String>,
    reply: Reply,
}

impl Rule {
    fn matches(&self, spec: &CommandSpec) -> bool {
        let prefix: Vec<&str> = self.prefix.iter().map(String::as_str).collect();
        spec.has_prefix(&self.program, &prefix)
    }
}

/// A command runner that records every call and answers from a script.
///
/// Unscripted commands succeed with empty output and every tool is found
/// unless removed with [`ScriptedCommandRunner::remove_tool`]. When several
/// rules match, the most recently added wins.
#[derive(Debug, Default)]
pub struct ScriptedCommandRunner {
    rules: Mutex<Vec<Rule>>,
    missing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedCommandRunner {
    /// Creates a runner where everything succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers commands of `program` whose arguments start with `prefix`.
    pub fn respond(&self, program: &str, prefix: &[&str], output: CommandOutput) {
        self.push_rule(program, prefix, Reply::Output(output));
    }

    /// Makes matching commands fail with a timeout.
    pub fn time_out(&self, program: &str, prefix: &[&str]) {
        self.push_rule(program, prefix, Reply::Timeout);
    }

    /// Hides `tool` from [`CommandRunner::locate`] and fails its spawns.
    pub fn remove_tool(&self, tool: &str) {
        self.missing.lock().insert(tool.to_string());
    }

    /// Every command run so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().clone()
    }

    /// Every command run so far, rendered as command lines.
    #[must_use]
    pub fn call_lines(&self) -> Vec<String> {
        self.calls.lock().iter().map(ToString::to_string).collect()
    }

    /// Returns true if a matching command was run.
    #[must_use]
    pub fn was_called(&self, program: &str, prefix: &[&str]) -> bool {
        self.count_calls(program, prefix) > 0
    }

    /// Number of matching commands run.
    #[must_use]
    pub fn count_calls(&self, program: &str, prefix: &[&str]) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.has_prefix(program, prefix))
            .count()
    }

    fn push_rule(&self, program: &str, prefix: &[&str], reply: Reply) {
        self.rules.lock().push(Rule {
            program: program.to_string(),
            prefix: prefix.iter().map(|p| (*p).to_string()).collect(),
            reply,
        });
    }
}

#[async_trait]
impl CommandRunner for ScriptedCommandRunner {
    async fn run(&self, spec: &CommandSpec) -> DeployResult<CommandOutput> {
        self.calls.lock().push(spec.clone());

        if self.missing.lock().contains(&spec.program) {
            return Err(DeployflowError::Spawn {
                command: spec.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "not found"),
            });
        }

        let reply = self
            .rules
            .lock()
            .iter()
            .rev()
            .find(|rule| rule.matches(spec))
            .map(|rule| rule.reply.clone());

        match reply {
            Some(Reply::Output(output)) => Ok(output),
            Some(Reply::Timeout) => Err(DeployflowError::timeout(
                spec.to_string(),
                spec.timeout.unwrap_or(Duration::ZERO),
            )),
            None => Ok(CommandOutput::success(Vec::new())),
        }
    }

    async fn locate(&self, program: &str) -> Option<PathBuf> {
        if self.missing.lock().contains(program) {
            None
        } else {
            Some(PathBuf::from("/usr/bin").join(program))
        }
    }
}

/// An HTTP transport that records requests.
///
/// GETs answer with queued statuses in order, then 200. POSTs always answer
/// with the configured status.
#[derive(Debug)]
pub struct RecordingTransport {
    post_status: u16,
    get_statuses: Mutex<VecDeque<u16>>,
    gets: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, serde_json::Value)>>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            post_status: 200,
            get_statuses: Mutex::new(VecDeque::new()),
            gets: Mutex::new(Vec::new()),
            posts: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingTransport {
    /// Creates a transport answering 200 to everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status returned to every POST.
    #[must_use]
    pub fn with_post_status(mut self, status: u16) -> Self {
        self.post_status = status;
        self
    }

    /// Queues the status for the next unanswered GET.
    pub fn push_get_status(&self, status: u16) {
        self.get_statuses.lock().push_back(status);
    }

    /// URLs requested with GET.
    #[must_use]
    pub fn gets(&self) -> Vec<String> {
        self.gets.lock().clone()
    }

    /// URLs and bodies sent with POST.
    #[must_use]
    pub fn posts(&self) -> Vec<(String, serde_json::Value)> {
        self.posts.lock().clone()
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn get(&self, url: &str) -> DeployResult<u16> {
        self.gets.lock().push(url.to_string());
        Ok(self.get_statuses.lock().pop_front().unwrap_or(200))
    }

    async fn post_json(&self, url: &str, body: &serde_json::Value) -> DeployResult<u16> {
        self.posts.lock().push((url.to_string(), body.clone()));
        Ok(self.post_status)
    }
}

/// A notifier that records events and optionally fails delivery.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
    fail: bool,
}

impl RecordingNotifier {
    /// Creates a notifier that accepts everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a notifier that records, then reports a delivery error.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// Events received so far.
    #[must_use]
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &NotificationEvent) -> DeployResult<()> {
        self.events.lock().push(event.clone());
        if self.fail {
            Err(DeployflowError::Notification("webhook unreachable".to_string()))
        } else {
            Ok(())
        }
    }
}

/// A stage with a fixed outcome that counts its executions.
#[derive(Debug)]
pub struct ScriptedStage {
    name: String,
    phase: PipelinePhase,
    mode: FailureMode,
    error: Option<String>,
    output: StageOutput,
    call_count: Mutex<usize>,
}

impl ScriptedStage {
    /// A stage that succeeds.
    #[must_use]
    pub fn succeeding(name: impl Into<String>, phase: PipelinePhase) -> Self {
        Self {
            name: name.into(),
            phase,
            mode: FailureMode::FailFast,
            error: None,
            output: StageOutput::ok_empty(),
            call_count: Mutex::new(0),
        }
    }

    /// A stage that fails with a command failure carrying `stderr`.
    #[must_use]
    pub fn failing(name: impl Into<String>, phase: PipelinePhase, stderr: impl Into<String>) -> Self {
        Self {
            error: Some(stderr.into()),
            ..Self::succeeding(name, phase)
        }
    }

    /// Sets the output returned on success.
    #[must_use]
    pub fn with_output(mut self, output: StageOutput) -> Self {
        self.output = output;
        self
    }

    /// Sets the failure mode.
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.mode = mode;
        self
    }

    /// Number of executions.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl Stage for ScriptedStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn phase(&self) -> PipelinePhase {
        self.phase
    }

    fn failure_mode(&self) -> FailureMode {
        self.mode
    }

    async fn execute(&self, _ctx: &StageContext) -> DeployResult<StageOutput> {
        *self.call_count.lock() += 1;
        match &self.error {
            Some(stderr) => Err(DeployflowError::command_failure(
                self.name.as_str(),
                Some(1),
                stderr.as_str(),
            )),
            None => Ok(self.output.clone()),
        }
    }
}
