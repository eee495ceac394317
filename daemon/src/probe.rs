//! Bounded runner for external line-emitting probes
//!
//! A probe is an external program that prints one whitespace-separated
//! sample per line. [`ProbeRunner::run`] starts it, folds each line into a
//! [`ProbeGrammar`] accumulator until the deadline passes or the program
//! exits, then makes sure the child is gone before returning.

mod grammar;

pub use grammar::{BindSnoop, BioPattern, CacheStat, TcpConnect};

use crate::config::{ProfilerConfig, PID_PLACEHOLDER};
use crate::error::{Error, LineError};
use crate::executor::{send_signal, Signal};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

/// Line grammar and running totals of one probe.
pub trait ProbeGrammar: Default + Send + 'static {
    const NAME: &'static str;

    /// First tokens that identify a header line.
    const HEADER_TOKENS: &'static [&'static str];

    /// Folds one data line. On error the accumulator must be left untouched.
    fn fold(&mut self, fields: &[&str]) -> Result<(), LineError>;

    fn is_header(fields: &[&str]) -> bool {
        fields
            .first()
            .is_some_and(|first| Self::HEADER_TOKENS.contains(first))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ProbeCommand {
    pub fn new(program: impl Into<String>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Builds a command from a configured argv, substituting the target pid.
    /// Returns `None` for an empty argv.
    pub fn from_argv(argv: &[String], pid: u32) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        let pid = pid.to_string();
        Some(Self {
            program: program.clone(),
            args: args.iter().map(|a| a.replace(PID_PLACEHOLDER, &pid)).collect(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The observation window elapsed.
    Deadline,
    /// The probe closed its output.
    Eof,
    /// Reading the probe's output failed.
    ReadError,
    /// The probe could not be started; the accumulator is empty.
    SpawnFailed,
}

/// Accumulated result of one probe run, owned by the caller once returned.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRun<G> {
    pub grammar: G,
    pub pid: Option<u32>,
    /// Data lines folded into the accumulator.
    pub folded: u64,
    /// Data lines that failed to parse and were dropped.
    pub malformed: u64,
    pub stop: StopReason,
}

impl<G: ProbeGrammar> ProbeRun<G> {
    /// A run with nothing folded, as reported for a probe that never started.
    pub fn empty() -> Self {
        Self {
            grammar: G::default(),
            pid: None,
            folded: 0,
            malformed: 0,
            stop: StopReason::SpawnFailed,
        }
    }

    fn started(pid: Option<u32>) -> Self {
        Self {
            pid,
            stop: StopReason::Deadline,
            ..Self::empty()
        }
    }

    /// Feeds one raw output line. Blank and header lines are ignored;
    /// malformed lines are counted and dropped.
    pub fn ingest(&mut self, line: &str) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.is_empty() || G::is_header(&fields) {
            return;
        }
        match self.grammar.fold(&fields) {
            Ok(()) => self.folded += 1,
            Err(e) => {
                self.malformed += 1;
                debug!(probe = G::NAME, "skipping line {:?}: {}", line.trim_end(), e);
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProbeRunner {
    backoff: Duration,
    terminate_grace: Duration,
}

impl ProbeRunner {
    pub fn new(backoff: Duration, terminate_grace: Duration) -> Self {
        Self {
            backoff,
            terminate_grace,
        }
    }

    pub fn from_config(config: &ProfilerConfig) -> Self {
        Self::new(config.backoff(), config.terminate_grace())
    }

    /// Runs `command` for at most `duration`, folding its output into `G`.
    ///
    /// Waits for output in slices of at most one backoff, so the deadline is
    /// overshot by no more than one backoff plus the termination grace. A
    /// probe that cannot be started yields an empty accumulator.
    pub async fn run<G: ProbeGrammar>(&self, command: &ProbeCommand, duration: Duration) -> ProbeRun<G> {
        let deadline = Instant::now() + duration;

        let mut child = match Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(source) => {
                let err = Error::ProbeSpawn {
                    probe: G::NAME,
                    source,
                };
                warn!("{}", err);
                return ProbeRun::empty();
            }
        };

        let mut run = ProbeRun::<G>::started(child.id());
        let Some(stdout) = child.stdout.take() else {
            warn!(probe = G::NAME, "probe stdout was not captured");
            self.terminate(&mut child, G::NAME).await;
            run.stop = StopReason::ReadError;
            return run;
        };

        let mut reader = BufReader::new(stdout);
        let mut buf = Vec::new();
        let stop = loop {
            let now = Instant::now();
            if now >= deadline {
                break StopReason::Deadline;
            }
            let wait = self.backoff.min(deadline - now);
            // Bytes of a partially read line stay in `buf` across timeouts.
            match tokio::time::timeout(wait, reader.read_until(b'\n', &mut buf)).await {
                Ok(Ok(0)) => {
                    if !buf.is_empty() {
                        run.ingest(&String::from_utf8_lossy(&buf));
                    }
                    break StopReason::Eof;
                }
                Ok(Ok(_)) => {
                    run.ingest(&String::from_utf8_lossy(&buf));
                    buf.clear();
                }
                Ok(Err(e)) => {
                    warn!(probe = G::NAME, "read error: {}", e);
                    break StopReason::ReadError;
                }
                Err(_) => {}
            }
        };
        run.stop = stop;

        self.terminate(&mut child, G::NAME).await;
        info!(
            probe = G::NAME,
            folded = run.folded,
            malformed = run.malformed,
            stop = ?run.stop,
            "probe finished"
        );
        run
    }

    /// SIGTERM, then SIGKILL if the child outlives the grace period. Always reaps.
    async fn terminate(&self, child: &mut Child, probe: &'static str) {
        if let Ok(Some(_)) = child.try_wait() {
            return;
        }
        if let Some(pid) = child.id() {
            if let Err(e) = send_signal(pid, Signal::Term) {
                debug!(probe, "SIGTERM failed: {}", e);
            }
        }
        if tokio::time::timeout(self.terminate_grace, child.wait())
            .await
            .is_ok()
        {
            return;
        }
        debug!(probe, "probe ignored SIGTERM, killing");
        if let Some(pid) = child.id() {
            if let Err(e) = send_signal(pid, Signal::Kill) {
                debug!(probe, "SIGKILL failed: {}", e);
            }
        }
        if let Err(e) = child.wait().await {
            warn!(probe, "failed to reap probe: {}", e);
        }
    }
}
