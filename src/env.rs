//! FreeSurfer environment detection and bootstrap.
//!
//! The resampling tools need FreeSurfer's `bin` directory on `PATH` and its
//! setup variables defined. [`FreeSurferEnv::check`] inspects a set of
//! variables; [`bootstrap`] sources the system setup script through a
//! [`CommandRunner`] and returns the variables it defines;
//! [`prepare_runner`] hands those variables to the runner that starts the
//! tools. Nothing here modifies the process environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{MeshError, Result};
use crate::tools::CommandRunner;

/// Variable naming the FreeSurfer installation.
pub const FREESURFER_HOME_VAR: &str = "FREESURFER_HOME";

/// System-wide setup script.
pub const SETUP_SCRIPT: &str = "/etc/freesurfer.sh";

/// Environment variables as name/value pairs.
pub type EnvVars = BTreeMap<String, String>;

/// State of the FreeSurfer environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeSurferEnv {
    /// Installation directory.
    pub home: PathBuf,
    /// Whether `PATH` already starts with `$FREESURFER_HOME/bin`.
    pub path_configured: bool,
}

impl FreeSurferEnv {
    /// Inspect the current process environment.
    pub fn from_process() -> Result<Self> {
        Self::check(|name| std::env::var(name).ok())
    }

    /// Inspect an environment through a variable lookup.
    ///
    /// Fails with [`MeshError::MissingEnv`] if `FREESURFER_HOME` is unset.
    pub fn check<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let home = PathBuf::from(
            lookup(FREESURFER_HOME_VAR).ok_or(MeshError::MissingEnv(FREESURFER_HOME_VAR))?,
        );
        let bin = home.join("bin");
        let path_configured = lookup("PATH")
            .and_then(|path| path.split(':').next().map(|first| Path::new(first) == bin))
            .unwrap_or(false);

        Ok(Self {
            home,
            path_configured,
        })
    }
}

/// Parse `env` output into variables.
///
/// Empty lines, lines without `=` and the shell's `_` variable are skipped.
pub fn parse_env_output(output: &str) -> EnvVars {
    output
        .lines()
        .filter(|line| !line.is_empty() && !line.starts_with("_="))
        .filter_map(|line| line.split_once('='))
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

/// Variables defined by sourcing [`SETUP_SCRIPT`] in a clean shell.
///
/// The shell starts from an empty environment so only what the script
/// defines is reported.
pub fn source_setup_script(runner: &dyn CommandRunner) -> Result<EnvVars> {
    let script = format!("source {SETUP_SCRIPT} && env");
    let output = runner.output_clean("bash", &["-c".to_string(), script])?;
    let vars = parse_env_output(&output);
    debug!(count = vars.len(), "sourced FreeSurfer setup script");
    Ok(vars)
}

/// Variables to apply so FreeSurfer tools can run.
///
/// Returns `None` if the environment is already configured, otherwise the
/// variables produced by [`source_setup_script`].
pub fn bootstrap<F>(runner: &dyn CommandRunner, lookup: F) -> Result<Option<EnvVars>>
where
    F: Fn(&str) -> Option<String>,
{
    let env = FreeSurferEnv::check(lookup)?;
    if env.path_configured {
        return Ok(None);
    }
    info!(
        home = %env.home.display(),
        "FreeSurfer PATH not configured, sourcing {SETUP_SCRIPT}"
    );
    source_setup_script(runner).map(Some)
}

/// Bootstrap the environment and return `runner` set up to start tools in it.
///
/// If the environment is already configured the runner is returned as is.
/// Fails with [`MeshError::MissingEnv`] if `FREESURFER_HOME` is unset.
///
/// # Example
///
/// ```no_run
/// use cortigraph::env::prepare_runner;
/// use cortigraph::tools::SystemRunner;
///
/// let runner = prepare_runner(SystemRunner::new(), |name| std::env::var(name).ok()).unwrap();
/// ```
pub fn prepare_runner<R, F>(runner: R, lookup: F) -> Result<R>
where
    R: CommandRunner,
    F: Fn(&str) -> Option<String>,
{
    Ok(match bootstrap(&runner, lookup)? {
        Some(vars) => runner.with_env(vars),
        None => runner,
    })
}
