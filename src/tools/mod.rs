//! External command-line tools.
//!
//! Resampling between volumes and surfaces is delegated to FreeSurfer's
//! `mri_vol2surf`, `mri_surf2surf` and `mri_surf2vol`. This module only
//! assembles their arguments; processes are started through a
//! [`CommandRunner`] so callers (and tests) decide how commands execute.
//!
//! # Example
//!
//! ```no_run
//! use cortigraph::layout::{Hemisphere, Layout};
//! use cortigraph::tools::{SystemRunner, Vol2Surf};
//!
//! let layout = Layout::from_env().unwrap();
//! Vol2Surf::new("s01", Hemisphere::Left, "/results/s01/contrast.nii")
//!     .run(&layout, &SystemRunner::new())
//!     .unwrap();
//! ```

mod resample;

use std::process::{Command, Stdio};

use tracing::debug;

use crate::env::EnvVars;
use crate::error::{MeshError, Result};

pub use resample::{format_projfrac, Invocation, Outcome, Surf2Surf, Surf2Vol, Vol2Surf};

/// Capability to run external programs.
pub trait CommandRunner {
    /// Run `program` with `args`, failing if it exits unsuccessfully.
    fn run(&self, program: &str, args: &[String]) -> Result<()>;

    /// Run `program` with `args` and capture its standard output.
    fn output(&self, program: &str, args: &[String]) -> Result<String>;

    /// Like [`output`](Self::output), but the child starts from an empty
    /// environment.
    fn output_clean(&self, program: &str, args: &[String]) -> Result<String>;

    /// Return this runner with `vars` set in every child it starts.
    ///
    /// Later values override earlier ones with the same name.
    fn with_env(self, vars: EnvVars) -> Self
    where
        Self: Sized;
}

/// Runs programs as child processes of the current process.
///
/// Children inherit the caller's environment plus the variables added with
/// [`CommandRunner::with_env`].
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    env: EnvVars,
}

impl SystemRunner {
    /// Create a runner that adds no variables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables set on top of the inherited environment.
    pub fn env(&self) -> &EnvVars {
        &self.env
    }

    fn command(&self, program: &str, args: &[String]) -> Command {
        let mut command = Command::new(program);
        command.args(args).envs(&self.env);
        command
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<()> {
        debug!(program, ?args, extra_env = self.env.len(), "spawning");
        let status = self.command(program, args).status()?;
        if !status.success() {
            return Err(MeshError::CommandFailed {
                program: program.to_string(),
                status,
            });
        }
        Ok(())
    }

    fn output(&self, program: &str, args: &[String]) -> Result<String> {
        debug!(program, ?args, extra_env = self.env.len(), "spawning for output");
        capture(program, self.command(program, args))
    }

    fn output_clean(&self, program: &str, args: &[String]) -> Result<String> {
        debug!(program, ?args, "spawning for output in an empty environment");
        let mut command = Command::new(program);
        command.args(args).env_clear();
        capture(program, command)
    }

    fn with_env(mut self, vars: EnvVars) -> Self {
        self.env.extend(vars);
        self
    }
}

fn capture(program: &str, mut command: Command) -> Result<String> {
    let output = command.stderr(Stdio::inherit()).output()?;
    if !output.status.success() {
        return Err(MeshError::CommandFailed {
            program: program.to_string(),
            status: output.status,
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::*;

    /// Environment a recorded call would have started with.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum CallEnv {
        /// Caller's environment plus these variables.
        Inherited(EnvVars),
        /// Empty environment.
        Cleared,
    }

    /// One recorded invocation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct Call {
        pub program: String,
        pub args: Vec<String>,
        pub env: CallEnv,
    }

    /// Records invocations instead of running them.
    #[derive(Debug, Default)]
    pub struct RecordingRunner {
        pub calls: RefCell<Vec<Call>>,
        pub stdout: String,
        pub env: EnvVars,
    }

    impl RecordingRunner {
        pub fn with_stdout(stdout: &str) -> Self {
            Self {
                stdout: stdout.to_string(),
                ..Self::default()
            }
        }

        fn record(&self, program: &str, args: &[String], env: CallEnv) {
            self.calls.borrow_mut().push(Call {
                program: program.to_string(),
                args: args.to_vec(),
                env,
            });
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, program: &str, args: &[String]) -> Result<()> {
            self.record(program, args, CallEnv::Inherited(self.env.clone()));
            Ok(())
        }

        fn output(&self, program: &str, args: &[String]) -> Result<String> {
            self.run(program, args)?;
            Ok(self.stdout.clone())
        }

        fn output_clean(&self, program: &str, args: &[String]) -> Result<String> {
            self.record(program, args, CallEnv::Cleared);
            Ok(self.stdout.clone())
        }

        fn with_env(mut self, vars: EnvVars) -> Self {
            self.env.extend(vars);
            self
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_system_runner_success() {
        SystemRunner::new().run("true", &[]).unwrap();
    }

    #[test]
    fn test_system_runner_failure() {
        let err = SystemRunner::new().run("false", &[]).unwrap_err();
        assert!(matches!(err, MeshError::CommandFailed { ref program, .. } if program == "false"));
    }

    #[test]
    fn test_system_runner_output() {
        let out = SystemRunner::new()
            .output("sh", &["-c".to_string(), "echo A=1".to_string()])
            .unwrap();
        assert_eq!(out, "A=1\n");
    }

    #[test]
    fn test_missing_program_is_io_error() {
        let err = SystemRunner::new()
            .run("cortigraph-no-such-program", &[])
            .unwrap_err();
        assert!(matches!(err, MeshError::Io(_)));
    }

    #[test]
    fn test_system_runner_applies_env() {
        let mut vars = EnvVars::new();
        vars.insert("CORTIGRAPH_TEST_VAR".to_string(), "fs".to_string());
        let runner = SystemRunner::new().with_env(vars);

        let out = runner
            .output("sh", &["-c".to_string(), "echo $CORTIGRAPH_TEST_VAR".to_string()])
            .unwrap();
        assert_eq!(out, "fs\n");
    }

    #[test]
    fn test_output_clean_starts_empty() {
        let mut vars = EnvVars::new();
        vars.insert("CORTIGRAPH_TEST_VAR".to_string(), "fs".to_string());
        let runner = SystemRunner::new().with_env(vars);

        let script = "echo \"[$CORTIGRAPH_TEST_VAR]\"".to_string();
        let out = runner
            .output_clean("/bin/sh", &["-c".to_string(), script])
            .unwrap();
        assert_eq!(out, "[]\n");
    }
}
