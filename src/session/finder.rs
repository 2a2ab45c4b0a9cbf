//! Fuzzy-finder process

use anyhow::{anyhow, Context, Result};
use std::ffi::OsString;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::constants::{finder_exit, programs, timing};
use crate::font::FontSelection;

/// How a finder run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinderOutcome {
    Chosen(String),
    Cancelled,
}

/// Interactive selector running alongside the session loop
pub trait Finder {
    /// Non-blocking; `Some` once the finder has exited
    fn try_finish(&mut self) -> Result<Option<FinderOutcome>>;

    /// Stop the finder if it is still running and reap it
    fn abort(&mut self) -> Result<()>;
}

/// `fzf` fed with candidate lines, previews bound to a helper command
pub struct FzfProcess {
    child: Child,
    stdout: Option<ChildStdout>,
    finished: bool,
}

impl FzfProcess {
    pub fn spawn(
        prompt: &str,
        trigger: &str,
        exe: &Path,
        socket: &Path,
        fonts: Vec<FontSelection>,
    ) -> Result<Self> {
        let args = Self::args(prompt, trigger, exe, socket);
        debug!(args = ?args, "Spawning fuzzy-finder");

        let mut child = Command::new(programs::FUZZY_FINDER)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .spawn()
            .context("Failed to spawn fuzzy-finder")?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("fuzzy-finder stdin was not captured"))?;
        let stdout = child.stdout.take();

        // The finder reads candidates while the user types; never block the session on it
        thread::spawn(move || {
            if let Err(e) = feed_candidates(stdin, &fonts) {
                if e.kind() == io::ErrorKind::BrokenPipe {
                    debug!("Fuzzy-finder closed its input early");
                } else {
                    warn!(error = %e, "Failed to write candidates to fuzzy-finder");
                }
            }
        });

        info!(pid = child.id(), "Fuzzy-finder started");
        Ok(Self {
            child,
            stdout,
            finished: false,
        })
    }

    pub fn args(prompt: &str, trigger: &str, exe: &Path, socket: &Path) -> Vec<OsString> {
        let helper = format!(
            "{} __preview --socket {} -- {{}}",
            shell_quote(&exe.to_string_lossy()),
            shell_quote(&socket.to_string_lossy()),
        );
        vec![
            "--prompt".into(),
            prompt.into(),
            "--bind".into(),
            format!("{trigger}:execute-silent({helper})").into(),
        ]
    }

    fn read_choice(&mut self) -> Result<String> {
        let mut out = String::new();
        if let Some(mut stdout) = self.stdout.take() {
            stdout
                .read_to_string(&mut out)
                .context("Failed to read fuzzy-finder output")?;
        }
        Ok(out)
    }
}

impl Finder for FzfProcess {
    fn try_finish(&mut self) -> Result<Option<FinderOutcome>> {
        if self.finished {
            return Ok(None);
        }
        let Some(status) = self
            .child
            .try_wait()
            .context("Failed to query fuzzy-finder status")?
        else {
            return Ok(None);
        };
        self.finished = true;

        let outcome = match status.code() {
            Some(0) => {
                let choice = self.read_choice()?;
                match choice.lines().next().map(str::trim).filter(|l| !l.is_empty()) {
                    Some(line) => FinderOutcome::Chosen(line.to_string()),
                    None => FinderOutcome::Cancelled,
                }
            }
            Some(finder_exit::NO_MATCH) | Some(finder_exit::INTERRUPTED) | None => FinderOutcome::Cancelled,
            Some(code) => return Err(anyhow!("fuzzy-finder failed with exit status {code}")),
        };
        info!(outcome = ?outcome, "Fuzzy-finder finished");
        Ok(Some(outcome))
    }

    fn abort(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        let status = terminate_child(&mut self.child, timing::TERMINATE_GRACE, timing::POLL_INTERVAL)?;
        debug!(status = %status, "Fuzzy-finder stopped");
        Ok(())
    }
}

/// SIGTERM so the finder can restore the terminal, SIGKILL after `grace`. Always reaps.
fn terminate_child(child: &mut Child, grace: Duration, poll_interval: Duration) -> Result<ExitStatus> {
    if let Some(status) = child.try_wait().context("Failed to query fuzzy-finder status")? {
        return Ok(status);
    }
    send_sigterm(child).context("Failed to signal fuzzy-finder")?;

    let deadline = Instant::now() + grace;
    loop {
        if let Some(status) = child.try_wait().context("Failed to query fuzzy-finder status")? {
            return Ok(status);
        }
        if Instant::now() >= deadline {
            warn!(pid = child.id(), "Fuzzy-finder ignored SIGTERM, killing it");
            if let Err(e) = child.kill() {
                if e.kind() != io::ErrorKind::InvalidInput {
                    return Err(e).context("Failed to stop fuzzy-finder");
                }
            }
            return child.wait().context("Failed to reap fuzzy-finder");
        }
        thread::sleep(poll_interval);
    }
}

#[cfg(unix)]
fn send_sigterm(child: &mut Child) -> io::Result<()> {
    use nix::errno::Errno;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid = i32::try_from(child.id())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "pid out of range"))?;
    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(errno) => Err(io::Error::from(errno)),
    }
}

#[cfg(not(unix))]
fn send_sigterm(child: &mut Child) -> io::Result<()> {
    child.kill()
}

fn feed_candidates(mut stdin: impl Write, fonts: &[FontSelection]) -> io::Result<()> {
    let mut buf = io::BufWriter::new(&mut stdin);
    for font in fonts {
        writeln!(buf, "{}", font.to_line())?;
    }
    buf.flush()
}

/// Single-quote for `sh -c`
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}
