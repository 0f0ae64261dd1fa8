//! The execution engine: drives one [`Session`] through scripts and command
//! groups.

use crate::cancel::CancelToken;
use crate::error::{ConnectError, RunError};
use crate::group::CommandGroup;
use crate::render::{Renderer, TreePosition};
use crate::script::{ExecModule, Module, ScriptDefinition, WaitModule};
use crate::session::{Connector, Session};
use chrono::{DateTime, Local};
use std::io::{self, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

type OutputHandler = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// Lifecycle of one engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Connecting,
    Running,
    Completed,
    Failed,
}

impl EngineState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// How often a running wait recomputes its remaining time and redraws.
    pub poll_interval: Duration,
    /// Emit ANSI colors and translate `§` codes instead of stripping them.
    pub color: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            color: true,
        }
    }
}

/// The outcome of a single command, rendered as it happens.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionReport {
    pub command: String,
    pub outcome: Result<String, String>,
    pub timestamp: DateTime<Local>,
}

/// Counters for one script or group run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub commands_sent: usize,
    pub commands_failed: usize,
    pub waits: usize,
    pub warnings: Vec<String>,
}

/// Executes scripts and command groups over an exclusively owned session.
///
/// Commands are sent strictly one at a time. A failing command is reported
/// and skipped; a fatal session error or a cancellation aborts the run and
/// closes the session.
pub struct Engine<S: Session> {
    session: Option<S>,
    state: EngineState,
    output: OutputHandler,
    options: EngineOptions,
    renderer: Renderer,
    cancel: CancelToken,
}

impl<S: Session> Engine<S> {
    /// Create an idle engine that writes its output to stdout.
    pub fn new(options: EngineOptions) -> Self {
        Self::with_handler(options, |data| {
            let mut stdout = io::stdout();
            let _ = stdout.write_all(data);
            let _ = stdout.flush();
        })
    }

    /// Create an idle engine that passes all output to `handler`.
    pub fn with_handler(
        options: EngineOptions,
        handler: impl Fn(&[u8]) + Send + Sync + 'static,
    ) -> Self {
        Self {
            session: None,
            state: EngineState::Idle,
            output: Arc::new(handler),
            renderer: Renderer::new(options.color),
            options,
            cancel: CancelToken::never(),
        }
    }

    /// Create a running engine around an already established session.
    pub fn with_session(
        session: S,
        options: EngineOptions,
        handler: impl Fn(&[u8]) + Send + Sync + 'static,
    ) -> Self {
        let mut engine = Self::with_handler(options, handler);
        engine.session = Some(session);
        engine.state = EngineState::Running;
        engine
    }

    /// Abort waits and sends when `token` fires.
    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Pass bytes through the output handler.
    pub fn emit(&self, data: &[u8]) {
        (self.output)(data);
    }

    fn emit_line(&self, line: &str) {
        self.emit(format!("{line}\n").as_bytes());
    }

    fn warn(&self, message: String, summary: &mut RunSummary) {
        warn!("{message}");
        self.emit_line(&self.renderer.warning(&message));
        summary.warnings.push(message);
    }

    /// Open and authenticate the session.
    pub async fn connect<C>(
        &mut self,
        connector: &C,
        addr: SocketAddr,
        password: &str,
    ) -> Result<(), ConnectError>
    where
        C: Connector<Session = S>,
    {
        self.state = EngineState::Connecting;
        info!(%addr, "connecting to RCON");
        match connector.connect(addr, password).await {
            Ok(session) => {
                info!(%addr, "RCON session established");
                self.session = Some(session);
                self.state = EngineState::Running;
                Ok(())
            }
            Err(err) => {
                error!("{err}");
                self.state = EngineState::Failed;
                Err(err)
            }
        }
    }

    /// Close the session and mark the run completed.
    pub async fn finish(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        if self.state == EngineState::Running {
            self.state = EngineState::Completed;
        }
    }

    fn ensure_running(&self) -> Result<(), RunError> {
        match (self.state, &self.session) {
            (EngineState::Running, Some(_)) => Ok(()),
            (state, _) => Err(RunError::NotRunning(state.as_str())),
        }
    }

    /// Report an aborting error once, release the session and fail the run.
    async fn fail(&mut self, err: RunError) -> RunError {
        match &err {
            RunError::Fatal(cause) => {
                error!("{cause}");
                self.emit_line(&self.renderer.fatal(&cause.to_string()));
            }
            RunError::Cancelled => {
                warn!("run cancelled");
                self.emit_line(&self.renderer.fatal("cancelled"));
            }
            RunError::NotRunning(_) => {}
        }
        self.state = EngineState::Failed;
        if let Some(mut session) = self.session.take() {
            session.close().await;
        }
        err
    }

    /// Run every loop of `script` in order, then close the session.
    ///
    /// Loops without modules are skipped with a warning.
    pub async fn run_script(&mut self, script: &ScriptDefinition) -> Result<RunSummary, RunError> {
        self.ensure_running()?;
        self.cancel.reset();
        let mut summary = RunSummary::default();

        self.emit_line(
            &self
                .renderer
                .script_header(script.loops.len(), script.total_commands()),
        );
        for function in &script.loops {
            if function.modules.is_empty() {
                self.warn(
                    format!("loop `{}` has no modules, skipping", function.name),
                    &mut summary,
                );
                continue;
            }
            info!(loop = %function.name, repeat = function.repeat_count, "running loop");
            self.emit_line(
                &self
                    .renderer
                    .loop_header(&function.name, function.repeat_count),
            );
            if let Err(err) = self
                .run_modules(&function.modules, function.repeat_count, &mut summary)
                .await
            {
                return Err(self.fail(err).await);
            }
            self.emit_line("");
        }

        self.emit_line(&self.renderer.script_complete());
        info!(
            sent = summary.commands_sent,
            failed = summary.commands_failed,
            "script complete"
        );
        self.finish().await;
        Ok(summary)
    }

    /// Run a flushed command group, then clear it whether or not the run
    /// succeeded. The session stays open for further groups.
    pub async fn run_group(&mut self, group: &mut CommandGroup) -> Result<RunSummary, RunError> {
        let result = self.run_group_modules(group).await;
        group.clear();
        result
    }

    async fn run_group_modules(&mut self, group: &CommandGroup) -> Result<RunSummary, RunError> {
        self.ensure_running()?;
        self.cancel.reset();
        let mut summary = RunSummary::default();

        let modules = group.to_modules();
        if modules.is_empty() {
            self.warn("command group is empty, nothing to run".to_string(), &mut summary);
            return Ok(summary);
        }
        self.emit_line(&self.renderer.loop_header("group", group.repeat_count));
        if let Err(err) = self
            .run_modules(&modules, group.repeat_count, &mut summary)
            .await
        {
            return Err(self.fail(err).await);
        }
        self.emit_line("");
        Ok(summary)
    }

    /// Send a single command and print its translated response.
    pub async fn execute_one(&mut self, command: &str) -> Result<ExecutionReport, RunError> {
        self.ensure_running()?;
        self.cancel.reset();
        match self.send(command).await {
            Ok(report) => {
                let (label, text, failed) = match &report.outcome {
                    Ok(raw) => {
                        let (label, text) = display_response(command, &self.renderer.response(raw));
                        (label, text, false)
                    }
                    Err(message) => ("error", message.clone(), true),
                };
                let position = TreePosition::new(0, 1, 0, 1, 0, 1);
                self.emit_line(&self.renderer.command(command, position, 1, failed));
                self.emit_line(&self.renderer.result(label, &text, position, 1, failed));
                Ok(report)
            }
            Err(err) => Err(self.fail(err).await),
        }
    }

    /// Repeat `modules` in order `repeat_count` times.
    async fn run_modules(
        &mut self,
        modules: &[Module],
        repeat_count: u32,
        summary: &mut RunSummary,
    ) -> Result<(), RunError> {
        let total_iterations = repeat_count as usize;
        let total_modules = modules.len();
        for iteration in 0..total_iterations {
            if total_iterations > 1 {
                self.emit_line(&self.renderer.iteration_header(iteration + 1, total_iterations));
            }
            for (module_index, module) in modules.iter().enumerate() {
                if self.cancel.is_cancelled() {
                    return Err(RunError::Cancelled);
                }
                match module {
                    Module::Wait(wait) => {
                        let position = TreePosition::new(
                            module_index,
                            total_modules,
                            0,
                            1,
                            iteration,
                            total_iterations,
                        );
                        let next = modules[module_index + 1..]
                            .iter()
                            .find_map(Module::first_command);
                        self.wait(wait, position, next).await?;
                        summary.waits += 1;
                    }
                    Module::Exec(exec) => {
                        self.run_exec(
                            exec,
                            (module_index, total_modules),
                            (iteration, total_iterations),
                            summary,
                        )
                        .await?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn run_exec(
        &mut self,
        exec: &ExecModule,
        (module_index, total_modules): (usize, usize),
        (iteration, total_iterations): (usize, usize),
        summary: &mut RunSummary,
    ) -> Result<(), RunError> {
        let total_commands = exec.len();
        if total_commands > 1 {
            let position = TreePosition::new(
                module_index,
                total_modules,
                0,
                total_commands,
                iteration,
                total_iterations,
            );
            self.emit_line(&self.renderer.module_header(&exec.name, position));
        }

        for (command_index, command) in exec.commands.iter().enumerate() {
            let position = TreePosition::new(
                module_index,
                total_modules,
                command_index,
                total_commands,
                iteration,
                total_iterations,
            );
            let report = self.send(command).await?;
            summary.commands_sent += 1;
            if report.outcome.is_err() {
                summary.commands_failed += 1;
            }
            self.render_report(&report, position, total_commands);
        }
        Ok(())
    }

    /// Send one command. Per-command failures come back inside the report;
    /// only fatal errors and cancellation are returned as `Err`.
    async fn send(&mut self, command: &str) -> Result<ExecutionReport, RunError> {
        let session = self
            .session
            .as_mut()
            .ok_or(RunError::NotRunning(self.state.as_str()))?;
        let result = tokio::select! {
            result = session.send(command) => result,
            _ = self.cancel.cancelled() => return Err(RunError::Cancelled),
        };

        let outcome = match result {
            Ok(response) => Ok(response),
            Err(err) if err.is_fatal() => return Err(RunError::Fatal(err)),
            Err(err) => {
                warn!(command, error = %err, "command failed");
                Err(err.to_string())
            }
        };
        let report = ExecutionReport {
            command: command.to_string(),
            outcome,
            timestamp: Local::now(),
        };
        debug!(
            command,
            at = %report.timestamp.format("%H:%M:%S%.3f"),
            ok = report.outcome.is_ok(),
            "command finished"
        );
        Ok(report)
    }

    fn render_report(&self, report: &ExecutionReport, position: TreePosition, total_commands: usize) {
        let failed = report.outcome.is_err();
        self.emit_line(
            &self
                .renderer
                .command(&report.command, position, total_commands, failed),
        );
        let (label, text) = match &report.outcome {
            Ok(raw) => display_response(&report.command, &self.renderer.response(raw)),
            Err(message) => ("error", message.clone()),
        };
        self.emit_line(
            &self
                .renderer
                .result(label, &text, position, total_commands, failed),
        );
    }

    /// Block for the wait's duration in `poll_interval` steps. Remaining time
    /// is always recomputed from the start instant.
    async fn wait(
        &mut self,
        wait: &WaitModule,
        position: TreePosition,
        next: Option<&str>,
    ) -> Result<(), RunError> {
        let total = wait.duration();
        let poll = self.options.poll_interval.max(Duration::from_millis(1));
        self.emit_line(&self.renderer.wait_start(wait.seconds, position));

        let start = Instant::now();
        loop {
            let remaining = total.saturating_sub(start.elapsed());
            self.emit(
                self.renderer
                    .wait_progress(total, remaining, position, next)
                    .as_bytes(),
            );
            if remaining.is_zero() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(remaining.min(poll)) => {}
                _ = self.cancel.cancelled() => {
                    self.emit(b"\n");
                    return Err(RunError::Cancelled);
                }
            }
        }
        self.emit_line(&self.renderer.wait_done(position));
        Ok(())
    }
}

/// Pick the label and text shown for a successful response. A `say` with an
/// empty response shows what was said.
fn display_response(command: &str, response: &str) -> (&'static str, String) {
    let response = response.trim();
    let said = command
        .get(..4)
        .filter(|prefix| prefix.eq_ignore_ascii_case("say "))
        .map(|_| command[4..].trim());
    match said {
        Some(text) if response.is_empty() => ("output", text.to_string()),
        Some(_) => ("output", response.to_string()),
        None => ("result", response.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel;
    use crate::error::SessionError;
    use crate::group::Directive;
    use crate::parser::parse_str;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Log {
        sent: Vec<(String, Instant)>,
        closed: bool,
    }

    struct MockSession {
        log: Rc<RefCell<Log>>,
        failing: Vec<&'static str>,
        fatal_on: Option<&'static str>,
    }

    impl MockSession {
        fn new() -> (Self, Rc<RefCell<Log>>) {
            let log = Rc::new(RefCell::new(Log::default()));
            let session = Self {
                log: log.clone(),
                failing: Vec::new(),
                fatal_on: None,
            };
            (session, log)
        }
    }

    #[async_trait(?Send)]
    impl Session for MockSession {
        async fn send(&mut self, command: &str) -> Result<String, SessionError> {
            self.log
                .borrow_mut()
                .sent
                .push((command.to_string(), Instant::now()));
            if self.fatal_on == Some(command) {
                return Err(SessionError::Fatal("connection reset".into()));
            }
            if self.failing.contains(&command) {
                return Err(SessionError::Command("unknown command".into()));
            }
            if command.starts_with("say ") {
                return Ok(String::new());
            }
            Ok(format!("§aok: {command}"))
        }

        async fn close(&mut self) {
            self.log.borrow_mut().closed = true;
        }
    }

    struct MockConnector {
        refuse: bool,
    }

    #[async_trait(?Send)]
    impl Connector for MockConnector {
        type Session = MockSession;

        async fn connect(
            &self,
            addr: SocketAddr,
            _password: &str,
        ) -> Result<MockSession, ConnectError> {
            if self.refuse {
                return Err(ConnectError::Refused {
                    addr: addr.to_string(),
                    port: addr.port(),
                });
            }
            Ok(MockSession::new().0)
        }
    }

    fn options() -> EngineOptions {
        EngineOptions {
            poll_interval: Duration::from_millis(100),
            color: false,
        }
    }

    fn engine(session: MockSession) -> (Engine<MockSession>, Arc<Mutex<Vec<u8>>>) {
        let captured = Arc::new(Mutex::new(Vec::new()));
        let sink = captured.clone();
        let engine = Engine::with_session(session, options(), move |data| {
            sink.lock().unwrap().extend_from_slice(data);
        });
        (engine, captured)
    }

    fn output(captured: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8_lossy(&captured.lock().unwrap()).into_owned()
    }

    fn sent(log: &Rc<RefCell<Log>>) -> Vec<String> {
        log.borrow().sent.iter().map(|(c, _)| c.clone()).collect()
    }

    const EXAMPLE: &str = r#"
LOGIN host:25565
RCONCFG[PORT=25575,PWD=abc]
LOOP main(freq=2) {
    EXEC a { "say hi" }
    WAIT 1
    EXEC b { "list" }
}
"#;

    #[tokio::test(start_paused = true)]
    async fn test_script_example_order_and_waits() {
        let script = parse_str(EXAMPLE).unwrap();
        let (session, log) = MockSession::new();
        let (mut engine, _) = engine(session);

        let summary = engine.run_script(&script).await.unwrap();

        assert_eq!(sent(&log), ["say hi", "list", "say hi", "list"]);
        assert_eq!(summary.commands_sent, 4);
        assert_eq!(summary.waits, 2);
        assert!(summary.warnings.is_empty());

        let log = log.borrow();
        for pair in [(0, 1), (2, 3)] {
            let gap = log.sent[pair.1].1 - log.sent[pair.0].1;
            assert!(gap >= Duration::from_secs(1), "gap was {gap:?}");
            assert!(gap < Duration::from_millis(1100), "gap was {gap:?}");
        }
        assert!(log.closed);
        assert_eq!(engine.state(), EngineState::Completed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_line_shapes() {
        let script = parse_str(EXAMPLE).unwrap();
        let (session, _) = MockSession::new();
        let (mut engine, captured) = engine(session);
        engine.run_script(&script).await.unwrap();

        let text = output(&captured);
        let lines: Vec<&str> = text.lines().filter(|l| !l.contains('\r')).collect();
        assert_eq!(
            lines,
            [
                ">> script: 1 loop(s), 4 command(s)",
                "┌── loop: main (2x)",
                "│",
                "├─ iteration 1/2",
                "├─ say hi",
                "│   output: hi",
                "├─ wait 1s",
                "├─ list",
                "│   result: ok: list",
                "│",
                "├─ iteration 2/2",
                "├─ say hi",
                "│   output: hi",
                "├─ wait 1s",
                "└─ list",
                "     result: ok: list",
                "",
                ">> script complete",
            ]
        );
        assert!(text.contains("next: list"));
        assert!(text.contains("\r│   └─ wait complete"));
    }

    #[tokio::test]
    async fn test_empty_loop_is_no_op_with_one_warning() {
        let script = parse_str(
            "LOGIN h:1\nRCONCFG[PORT=2,PWD=p]\nLOOP first(freq=1) { EXEC a { one } }\n\
             LOOP empty(freq=5) { }\nLOOP last(freq=1) { EXEC b { two } }",
        )
        .unwrap();
        let (session, log) = MockSession::new();
        let (mut engine, _) = engine(session);

        let summary = engine.run_script(&script).await.unwrap();
        assert_eq!(sent(&log), ["one", "two"]);
        assert_eq!(summary.warnings.len(), 1);
        assert!(summary.warnings[0].contains("empty"));
    }

    #[tokio::test]
    async fn test_only_empty_loop_makes_no_session_calls() {
        let script = parse_str("LOGIN h:1\nRCONCFG[PORT=2,PWD=p]\nLOOP idle(freq=3) {}").unwrap();
        let (session, log) = MockSession::new();
        let (mut engine, _) = engine(session);

        let summary = engine.run_script(&script).await.unwrap();
        assert!(log.borrow().sent.is_empty());
        assert_eq!(summary.warnings.len(), 1);
        assert_eq!(engine.state(), EngineState::Completed);
    }

    #[tokio::test]
    async fn test_failing_command_is_isolated() {
        let script = parse_str(
            "LOGIN h:1\nRCONCFG[PORT=2,PWD=p]\n\
             LOOP l(freq=2) { EXEC m {\na\nbad\nc\n} EXEC n { d } }",
        )
        .unwrap();
        let (mut session, log) = MockSession::new();
        session.failing = vec!["bad"];
        let (mut engine, captured) = engine(session);

        let summary = engine.run_script(&script).await.unwrap();
        assert_eq!(sent(&log), ["a", "bad", "c", "d", "a", "bad", "c", "d"]);
        assert_eq!(summary.commands_sent, 8);
        assert_eq!(summary.commands_failed, 2);
        assert_eq!(engine.state(), EngineState::Completed);
        assert!(output(&captured).contains("│   │    error: unknown command"));
    }

    #[tokio::test]
    async fn test_fatal_error_aborts_and_closes() {
        let script = parse_str(
            "LOGIN h:1\nRCONCFG[PORT=2,PWD=p]\n\
             LOOP l(freq=3) { EXEC m {\na\nboom\nc\n} }\nLOOP after(freq=1) { EXEC x { y } }",
        )
        .unwrap();
        let (mut session, log) = MockSession::new();
        session.fatal_on = Some("boom");
        let (mut engine, captured) = engine(session);

        let err = engine.run_script(&script).await.unwrap_err();
        assert!(matches!(err, RunError::Fatal(SessionError::Fatal(_))));
        assert_eq!(sent(&log), ["a", "boom"]);
        assert!(log.borrow().closed);
        assert_eq!(engine.state(), EngineState::Failed);
        assert_eq!(output(&captured).matches("session lost").count(), 1);

        let mut group = CommandGroup {
            directives: vec![Directive::Command("z".into())],
            repeat_count: 1,
        };
        assert!(matches!(
            engine.run_group(&mut group).await,
            Err(RunError::NotRunning("failed"))
        ));
        assert!(group.is_empty());
    }

    #[tokio::test]
    async fn test_group_repeats_then_clears() {
        let (session, log) = MockSession::new();
        let (mut engine, _) = engine(session);
        let mut group = CommandGroup {
            directives: vec![
                Directive::Command("foo".into()),
                Directive::Command("bar".into()),
            ],
            repeat_count: 3,
        };

        let summary = engine.run_group(&mut group).await.unwrap();
        assert_eq!(sent(&log), ["foo", "bar", "foo", "bar", "foo", "bar"]);
        assert_eq!(summary.commands_sent, 6);
        assert!(group.is_empty());
        assert_eq!(group.repeat_count, 1);
        assert_eq!(engine.state(), EngineState::Running);
    }

    #[tokio::test]
    async fn test_empty_group_warns_once() {
        let (session, log) = MockSession::new();
        let (mut engine, _) = engine(session);
        let summary = engine.run_group(&mut CommandGroup::default()).await.unwrap();
        assert!(log.borrow().sent.is_empty());
        assert_eq!(summary.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_group_cleared_after_fatal_error() {
        let (mut session, _) = MockSession::new();
        session.fatal_on = Some("stop");
        let (mut engine, _) = engine(session);
        let mut group = CommandGroup {
            directives: vec![Directive::Command("stop".into()), Directive::Command("list".into())],
            repeat_count: 2,
        };
        assert!(engine.run_group(&mut group).await.is_err());
        assert!(group.is_empty());
        assert_eq!(group.repeat_count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_wait_aborts_run() {
        let (session, log) = MockSession::new();
        let (handle, token) = cancel::channel();
        let (engine, _) = engine(session);
        let mut engine = engine.with_cancel(token);
        let mut group = CommandGroup {
            directives: vec![
                Directive::Command("first".into()),
                Directive::Wait(30.0),
                Directive::Command("second".into()),
            ],
            repeat_count: 1,
        };

        let (result, _) = tokio::join!(engine.run_group(&mut group), async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            handle.cancel();
        });

        assert_eq!(result.unwrap_err(), RunError::Cancelled);
        assert_eq!(sent(&log), ["first"]);
        assert!(log.borrow().closed);
        assert_eq!(engine.state(), EngineState::Failed);
    }

    #[tokio::test]
    async fn test_signal_before_run_is_ignored() {
        let (session, log) = MockSession::new();
        let (handle, token) = cancel::channel();
        let (engine, _) = engine(session);
        let mut engine = engine.with_cancel(token);
        handle.cancel();

        let mut group = CommandGroup {
            directives: vec![Directive::Command("list".into())],
            repeat_count: 1,
        };
        engine.run_group(&mut group).await.unwrap();
        assert_eq!(sent(&log), ["list"]);
    }

    #[tokio::test]
    async fn test_connect_state_transitions() {
        let addr: SocketAddr = "127.0.0.1:25575".parse().unwrap();

        let mut refused: Engine<MockSession> = Engine::with_handler(options(), |_| {});
        assert_eq!(refused.state(), EngineState::Idle);
        let err = refused
            .connect(&MockConnector { refuse: true }, addr, "pw")
            .await
            .unwrap_err();
        assert!(matches!(err, ConnectError::Refused { port: 25575, .. }));
        assert_eq!(refused.state(), EngineState::Failed);

        let mut ok: Engine<MockSession> = Engine::with_handler(options(), |_| {});
        ok.connect(&MockConnector { refuse: false }, addr, "pw")
            .await
            .unwrap();
        assert_eq!(ok.state(), EngineState::Running);
        ok.finish().await;
        assert_eq!(ok.state(), EngineState::Completed);
    }

    #[tokio::test]
    async fn test_execute_one_renders_translated_response() {
        let (session, log) = MockSession::new();
        let (mut engine, captured) = engine(session);
        let report = engine.execute_one("list").await.unwrap();
        assert_eq!(report.outcome, Ok("§aok: list".to_string()));
        assert_eq!(sent(&log), ["list"]);
        assert_eq!(output(&captured), "└─ list\n     result: ok: list\n");
    }

    #[test]
    fn test_display_response_for_say() {
        assert_eq!(display_response("say hello", ""), ("output", "hello".to_string()));
        assert_eq!(display_response("SAY  hi ", "  "), ("output", "hi".to_string()));
        assert_eq!(display_response("list", " 3 players \n"), ("result", "3 players".to_string()));
        assert_eq!(display_response("sa", ""), ("result", String::new()));
    }
}
