//! Drives a script through the tokenizer, the parser and the registry.
//!
//! The pipeline is pulled from the end: each `step` asks the parser for one
//! command, which asks the tokenizer for tokens, which reads bytes. Nothing is
//! read ahead beyond one buffered chunk, and stopping early just drops the
//! upstream stages.

use std::io::Read;

use tracing::{debug, info, warn};

use crate::error::LineError;
use crate::parser::Parser;
use crate::registry::Registry;
use crate::tokenizer::Tokenizer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Succeeded,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed)
    }
}

/// A single run over one source. Not restartable.
pub struct Runner<'r, R> {
    registry: &'r Registry,
    commands: Parser<Tokenizer<R>>,
    state: RunState,
    dispatched: usize,
}

impl<'r, R: Read> Runner<'r, R> {
    pub fn new(registry: &'r Registry, source: R) -> Self {
        Self {
            registry,
            commands: Parser::new(Tokenizer::new(source)),
            state: RunState::Idle,
            dispatched: 0,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Number of commands whose handler completed successfully.
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Dispatch at most one command.
    ///
    /// Returns the line of the command that ran, or `None` once the source is
    /// exhausted. After the run has succeeded or failed this is a no-op that
    /// returns `Ok(None)`; check [`Runner::state`] to tell the two apart.
    pub fn step(&mut self) -> Result<Option<usize>, LineError> {
        match self.state {
            RunState::Succeeded | RunState::Failed => return Ok(None),
            RunState::Idle => {
                debug!(commands = self.registry.len(), "run started");
                self.state = RunState::Running;
            }
            RunState::Running => {}
        }

        let command = match self.commands.next() {
            Some(Ok(command)) => command,
            Some(Err(err)) => return Err(self.fail(err)),
            None => {
                self.state = RunState::Succeeded;
                info!(dispatched = self.dispatched, "run finished");
                return Ok(None);
            }
        };

        let Some(handler) = self.registry.lookup(&command.name) else {
            return Err(self.fail(LineError::unknown_command(command.line, command.name)));
        };

        debug!(
            command = %command.name,
            line = command.line,
            params = command.params.len(),
            "dispatch"
        );
        if let Err(err) = handler(command.params.as_slice()) {
            return Err(self.fail(LineError::handler(command.line, err)));
        }

        self.dispatched += 1;
        Ok(Some(command.line))
    }

    /// Dispatch every remaining command, stopping at the first failure.
    pub fn run(mut self) -> Result<(), LineError> {
        while self.step()?.is_some() {}
        Ok(())
    }

    fn fail(&mut self, err: LineError) -> LineError {
        self.state = RunState::Failed;
        warn!(line = err.line, error = %err.cause, "run failed");
        err
    }
}

/// Execute every command in `source` against `registry`.
pub fn run<R: Read>(registry: &Registry, source: R) -> Result<(), LineError> {
    Runner::new(registry, source).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::tokenizer::tests::FailingReader;
    use std::sync::{Arc, Mutex};

    type Log = Arc<Mutex<Vec<(String, Vec<String>)>>>;

    /// Registry whose handlers record `(name, params)` into the returned log.
    fn recording(names: &[&str]) -> (Registry, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = Registry::new();
        for name in names {
            let log = Arc::clone(&log);
            let owned = name.to_string();
            registry.register(*name, move |params| {
                log.lock().unwrap().push((owned.clone(), params.to_vec()));
                Ok(())
            });
        }
        (registry, log)
    }

    fn names(log: &Log) -> Vec<String> {
        log.lock().unwrap().iter().map(|(n, _)| n.clone()).collect()
    }

    #[test]
    fn test_run_in_order() {
        let (registry, log) = recording(&["a", "b", "c"]);
        run(&registry, &b"a\nb\nc\n"[..]).unwrap();
        assert_eq!(names(&log), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_run_passes_params() {
        let (registry, log) = recording(&["a"]);
        run(&registry, &b"a b\\ c\n"[..]).unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec![("a".to_string(), vec!["b c".to_string()])]
        );
    }

    #[test]
    fn test_empty_input_succeeds() {
        let (registry, log) = recording(&[]);
        run(&registry, &b""[..]).unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_command_line_one() {
        let registry = Registry::new();
        let err = run(&registry, &b"foo\n"[..]).unwrap_err();
        assert_eq!(err.line, 1);
        assert!(matches!(&err.cause, ErrorKind::UnknownCommand(name) if name == "foo"));
    }

    #[test]
    fn test_unknown_command_stops_dispatch() {
        let (registry, log) = recording(&["a"]);
        let err = run(&registry, &b"a\n\nmissing x\na\n"[..]).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.unknown_command_name(), Some("missing"));
        assert_eq!(names(&log), vec!["a"]);
    }

    #[test]
    fn test_handler_error_halts_run() {
        let (mut registry, log) = recording(&["ok"]);
        registry.register("fail", |_| Err(anyhow::anyhow!("boom")));

        let err = run(&registry, &b"ok 1\nok 2\nfail\nok 4\nok 5\n"[..]).unwrap_err();
        assert_eq!(err.line, 3);
        assert_eq!(err.handler_error().unwrap().to_string(), "boom");
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_io_error_after_parsed_commands() {
        let (registry, log) = recording(&["a", "b"]);
        let err = run(&registry, FailingReader::new(b"a\nb\nc")).unwrap_err();
        assert!(matches!(err.cause, ErrorKind::Io(_)));
        assert_eq!(err.line, 3);
        assert_eq!(names(&log), vec!["a", "b"]);
    }

    #[test]
    fn test_state_transitions() {
        let (registry, _log) = recording(&["a"]);
        let mut runner = Runner::new(&registry, &b"a\n\na\n"[..]);
        assert_eq!(runner.state(), RunState::Idle);

        assert_eq!(runner.step().unwrap(), Some(1));
        assert_eq!(runner.state(), RunState::Running);
        assert_eq!(runner.step().unwrap(), Some(3));
        assert_eq!(runner.step().unwrap(), None);
        assert_eq!(runner.state(), RunState::Succeeded);
        assert_eq!(runner.dispatched(), 2);
    }

    #[test]
    fn test_failed_runner_is_inert() {
        let (registry, log) = recording(&["a"]);
        let mut runner = Runner::new(&registry, &b"nope\na\n"[..]);
        assert!(runner.step().is_err());
        assert_eq!(runner.state(), RunState::Failed);
        assert!(runner.state().is_terminal());

        assert_eq!(runner.step().unwrap(), None);
        assert_eq!(runner.state(), RunState::Failed);
        assert!(log.lock().unwrap().is_empty());
    }
}
