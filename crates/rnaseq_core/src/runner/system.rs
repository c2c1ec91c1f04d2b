//! Runner backed by real child processes.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use super::errors::{RunError, RunResult};
use super::types::{ExitOutcome, OutputSink, RunOptions};
use super::CommandRunner;
use crate::command::Invocation;

/// How long output may keep arriving after the tool itself exited. Past
/// this, whatever it left running is killed.
const STREAM_GRACE: Duration = Duration::from_secs(2);

/// One line read from the child.
struct Line {
    text: String,
    is_stderr: bool,
}

/// Spawns processes directly (no shell) and forwards their output to the
/// sink.
///
/// On unix each tool leads its own process group, so deadline expiry and
/// cancellation take down everything it forked, not just the direct
/// child. Reader threads are detached and hand lines over a channel; the
/// calling thread never blocks on them.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn wait(
        &self,
        child: &mut Child,
        program: &str,
        options: &RunOptions,
        lines: &Receiver<Line>,
        sink: &dyn OutputSink,
    ) -> RunResult<ExitOutcome> {
        let started = Instant::now();
        let mut exited: Option<(ExitStatus, Instant)> = None;
        let mut streams_open = true;

        loop {
            if exited.is_none() {
                if let Some(status) = child.try_wait().map_err(|e| RunError::io(program, e))? {
                    exited = Some((status, Instant::now()));
                }
            }

            if let Some((status, at)) = exited {
                if !streams_open {
                    return Ok(ExitOutcome::from_status(status, at - started));
                }
                if at.elapsed() >= STREAM_GRACE {
                    tracing::debug!("{} exited with output still open; killing leftovers", program);
                    terminate(child, program);
                    forward_pending(lines, sink);
                    return Ok(ExitOutcome::from_status(status, at - started));
                }
            }

            if options.is_cancelled() {
                terminate(child, program);
                forward_pending(lines, sink);
                return Err(RunError::cancelled(program));
            }

            if let Some(limit) = options.timeout {
                if started.elapsed() >= limit {
                    terminate(child, program);
                    forward_pending(lines, sink);
                    return Err(RunError::timeout(program, limit));
                }
            }

            if streams_open {
                match lines.recv_timeout(options.poll_interval) {
                    Ok(line) => {
                        sink.line(&line.text, line.is_stderr);
                        forward_pending(lines, sink);
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => streams_open = false,
                }
            } else {
                thread::sleep(options.poll_interval);
            }
        }
    }
}

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        invocation: &Invocation,
        options: &RunOptions,
        sink: &dyn OutputSink,
    ) -> RunResult<ExitOutcome> {
        let program = invocation.program.as_str();

        let mut command = invocation.to_command();
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = command.spawn().map_err(|e| RunError::spawn(program, e))?;
        tracing::debug!("Spawned {} (pid {})", program, child.id());

        let (tx, rx) = mpsc::channel();
        if let Some(out) = child.stdout.take() {
            pump(out, tx.clone(), false);
        }
        if let Some(err) = child.stderr.take() {
            pump(err, tx.clone(), true);
        }
        drop(tx);

        self.wait(&mut child, program, options, &rx, sink)
    }
}

/// Read `stream` on a detached thread until EOF or the receiver is gone.
fn pump(stream: impl Read + Send + 'static, tx: Sender<Line>, is_stderr: bool) {
    thread::spawn(move || {
        let reader = BufReader::new(stream);
        for line in reader.split(b'\n') {
            let Ok(bytes) = line else { break };
            let text = String::from_utf8_lossy(&bytes)
                .trim_end_matches('\r')
                .to_string();
            if tx.send(Line { text, is_stderr }).is_err() {
                break;
            }
        }
    });
}

fn forward_pending(lines: &Receiver<Line>, sink: &dyn OutputSink) {
    for line in lines.try_iter() {
        sink.line(&line.text, line.is_stderr);
    }
}

/// Kill the child's process group (unix) and the child, then reap it.
fn terminate(child: &mut Child, program: &str) {
    #[cfg(unix)]
    kill_group(child.id(), program);

    if let Err(e) = child.kill() {
        tracing::debug!("Kill {}: {}", program, e);
    }
    let _ = child.wait();
}

#[cfg(unix)]
fn kill_group(pgid: u32, program: &str) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: kill(2) has no memory effects; a negative pid names the
    // group this child leads.
    if unsafe { libc::kill(-pgid, libc::SIGKILL) } != 0 {
        tracing::debug!(
            "Process group of {} not signalled: {}",
            program,
            std::io::Error::last_os_error()
        );
    }
}
