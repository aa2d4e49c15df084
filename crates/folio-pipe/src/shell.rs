use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::sink::{Sink, SinkError};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A sink that streams bytes into the stdin of a shell command.
///
/// The command is spawned on the first write and is waited for on
/// [`Sink::close`]. A non-zero exit status, or a command still running after
/// the timeout once its input is closed, is reported as an error.
///
/// # Notes
///
/// The command's stdout and stderr are inherited from the current process.
pub struct CommandSink {
    command: String,
    timeout: Duration,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    closed: bool,
}

impl CommandSink {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            timeout: DEFAULT_TIMEOUT,
            child: None,
            stdin: None,
            closed: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn stdin(&mut self) -> Result<&mut ChildStdin, SinkError> {
        if self.child.is_none() {
            let mut child = shell_command(&self.command)
                .stdin(Stdio::piped())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .spawn()?;
            self.stdin = child.stdin.take();
            self.child = Some(child);
        }
        self.stdin.as_mut().ok_or(SinkError::Closed)
    }
}

fn shell_command(command_str: &str) -> Command {
    if cfg!(target_os = "windows") {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command_str);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command_str);
        c
    }
}

impl Sink for CommandSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }
        self.stdin()?.write_all(bytes)?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // Dropping stdin delivers EOF to the command.
        drop(self.stdin.take());
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                child.kill()?;
                child.wait()?;
                return Err(SinkError::Timeout(self.command.clone(), self.timeout));
            }
        };
        if !status.success() {
            return Err(SinkError::CommandFailed(self.command.clone(), status));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("|{}", self.command)
    }
}

impl Drop for CommandSink {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.close();
        }
    }
}
