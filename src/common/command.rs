//! Single external tool invocation: argument list, stdio redirection, and
//! synchronous spawn/wait.
//!
//! The driver never has more than one child process outstanding. Each stage
//! builds a `ToolCommand`, runs it, and only proceeds once the child has
//! exited successfully. Redirected files and the child handle are released
//! on every exit path, including failure.

use std::fs::{File, OpenOptions};
use std::process::{Command, Stdio};

use log::debug;

use crate::common::error::{DriverError, Result};

/// Soft cap on the per-command argument count, retained from the fixed-size
/// argv buffer of earlier builds. Hitting it means the driver is
/// misassembling a command, not that the user asked for too much.
const MAX_ARGS: usize = 512;

/// One pending invocation of an external toolchain program.
///
/// Arguments accumulate in order. Standard input and output may each be
/// redirected to a file; stdin is opened read-only, stdout is
/// created/truncated writable. `run` consumes the command, waits for the
/// child, and maps any abnormal exit to a fatal pipeline error naming the
/// program.
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    stdin_path: Option<String>,
    stdout_path: Option<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin_path: None,
            stdout_path: None,
        }
    }

    /// Append one argument, enforcing the argument-count cap.
    pub fn arg(&mut self, arg: impl Into<String>) -> Result<()> {
        if self.args.len() >= MAX_ARGS {
            return Err(DriverError::TooManyArguments);
        }
        self.args.push(arg.into());
        Ok(())
    }

    /// Append every value in `values`, each preceded by `header` when one
    /// is given (`-I dir1 -I dir2 ...`).
    pub fn arg_list(&mut self, header: Option<&str>, values: &[String]) -> Result<()> {
        for value in values {
            if let Some(header) = header {
                self.arg(header)?;
            }
            self.arg(value.as_str())?;
        }
        Ok(())
    }

    /// Redirect the child's standard input to read from `path`.
    pub fn redirect_in(&mut self, path: impl Into<String>) {
        self.stdin_path = Some(path.into());
    }

    /// Redirect the child's standard output to write (create/truncate) `path`.
    pub fn redirect_out(&mut self, path: impl Into<String>) {
        self.stdout_path = Some(path.into());
    }

    /// Spawn the program and wait for it to exit. Signal death and nonzero
    /// exit are both pipeline failures reported with the program path.
    pub fn run(self) -> Result<()> {
        debug!("[{} {}]", self.program, self.args.join(" "));

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(path) = &self.stdin_path {
            debug!("[stdin from {}]", path);
            let file = File::open(path).map_err(|source| DriverError::Redirect {
                path: path.clone(),
                source,
            })?;
            cmd.stdin(Stdio::from(file));
        }
        if let Some(path) = &self.stdout_path {
            debug!("[stdout to {}]", path);
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(path)
                .map_err(|source| DriverError::Redirect {
                    path: path.clone(),
                    source,
                })?;
            cmd.stdout(Stdio::from(file));
        }

        let status = cmd.status().map_err(|source| DriverError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        // status.success() is false for both nonzero exit and termination
        // by signal, which is exactly the failure set we care about.
        if !status.success() {
            return Err(DriverError::ToolFailed {
                program: self.program,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_cap_is_enforced() {
        let mut cmd = ToolCommand::new("prog");
        for i in 0..MAX_ARGS {
            cmd.arg(format!("a{}", i)).unwrap();
        }
        assert!(matches!(
            cmd.arg("one-too-many"),
            Err(DriverError::TooManyArguments)
        ));
    }

    #[test]
    fn arg_list_interleaves_header() {
        let mut cmd = ToolCommand::new("prog");
        cmd.arg_list(Some("-I"), &["a".to_string(), "b".to_string()])
            .unwrap();
        cmd.arg_list(None, &["c".to_string()]).unwrap();
        assert_eq!(cmd.args, vec!["-I", "a", "-I", "b", "c"]);
    }

    #[test]
    fn successful_command_returns_ok() {
        let cmd = ToolCommand::new("true");
        assert!(cmd.run().is_ok());
    }

    #[test]
    fn nonzero_exit_is_tool_failure() {
        let cmd = ToolCommand::new("false");
        match cmd.run() {
            Err(DriverError::ToolFailed { program }) => assert_eq!(program, "false"),
            other => panic!("expected ToolFailed, got {:?}", other),
        }
    }

    #[test]
    fn missing_program_is_spawn_failure() {
        let cmd = ToolCommand::new("/nonexistent/tool-that-is-not-there");
        assert!(matches!(cmd.run(), Err(DriverError::Spawn { .. })));
    }

    #[test]
    fn missing_redirect_input_fails_before_spawn() {
        let mut cmd = ToolCommand::new("true");
        cmd.redirect_in("/nonexistent/input-file");
        assert!(matches!(cmd.run(), Err(DriverError::Redirect { .. })));
    }

    #[test]
    fn stdout_redirection_writes_file() {
        let out = std::env::temp_dir().join(format!("cc9995_cmd_test_{}", std::process::id()));
        let mut cmd = ToolCommand::new("echo");
        cmd.arg("hello").unwrap();
        cmd.redirect_out(out.to_str().unwrap());
        cmd.run().unwrap();
        let written = std::fs::read_to_string(&out).unwrap();
        assert_eq!(written.trim(), "hello");
        let _ = std::fs::remove_file(&out);
    }
}
