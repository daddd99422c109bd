//! Volume/surface resampling invocations.

use std::path::{Path, PathBuf};

use tracing::info;

use super::CommandRunner;
use crate::deps::is_up_to_date;
use crate::error::{MeshError, Result};
use crate::layout::{Hemisphere, Layout};

/// Default projection fraction along the cortical thickness.
pub const DEFAULT_PROJFRAC: f64 = 0.5;

/// A fully assembled command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Program name, resolved through `PATH`.
    pub program: &'static str,
    /// Arguments in order.
    pub args: Vec<String>,
}

impl Invocation {
    fn run(&self, runner: &dyn CommandRunner) -> Result<()> {
        info!(program = self.program, args = ?self.args, "running");
        runner.run(self.program, &self.args)
    }
}

/// What happened to a resampling request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The tool ran and wrote the contained path.
    Ran(PathBuf),
    /// The output was already newer than its input.
    Skipped(PathBuf),
}

impl Outcome {
    /// The output path, whether or not it was regenerated.
    pub fn path(&self) -> &Path {
        match self {
            Outcome::Ran(path) | Outcome::Skipped(path) => path,
        }
    }
}

/// Format a projection fraction like C's `%g`: six significant digits,
/// trailing zeros dropped, exponent form outside `1e-4..1e6`
/// (`0.5`, `1`, `0.123457`, `1e-05`).
pub fn format_projfrac(projfrac: f64) -> String {
    const PRECISION: i32 = 6;

    if projfrac == 0.0 || !projfrac.is_finite() {
        return projfrac.to_string();
    }

    // The exponent after rounding to PRECISION digits picks the notation
    let scientific = format!("{:.*e}", (PRECISION - 1) as usize, projfrac);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return scientific;
    };

    if (-4..PRECISION).contains(&exponent) {
        let decimals = (PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{projfrac:.decimals$}"))
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    }
}

fn trim_fraction(number: &str) -> String {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        number.to_string()
    }
}

fn check_projfrac(projfrac: f64) -> Result<()> {
    if projfrac.is_finite() {
        Ok(())
    } else {
        Err(MeshError::invalid_param("projfrac", projfrac, "must be finite"))
    }
}

/// Split `path` into its directory and the file name without `suffix`.
fn strip_suffix(path: &Path, suffix: &'static str) -> Result<(PathBuf, String)> {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    let stem = name
        .strip_suffix(suffix)
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| {
            MeshError::invalid_param("src", path.display(), "unexpected file extension")
        })?;
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
    Ok((dir, stem.to_string()))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Project a functional volume onto a hemisphere's surface (`mri_vol2surf`).
#[derive(Debug, Clone)]
pub struct Vol2Surf {
    /// Session whose registration maps the volume to the subject.
    pub session: String,
    /// Target hemisphere.
    pub hemi: Hemisphere,
    /// Source volume (`.nii`).
    pub src: PathBuf,
    /// Output overlay; defaults to `<dir>/<hemi>.<name>.mgh` beside `src`.
    pub out: Option<PathBuf>,
    /// Fraction of cortical thickness to sample at.
    pub projfrac: f64,
}

impl Vol2Surf {
    /// Create a request with default output path and projection fraction.
    pub fn new<S: Into<String>, P: Into<PathBuf>>(session: S, hemi: Hemisphere, src: P) -> Self {
        Self {
            session: session.into(),
            hemi,
            src: src.into(),
            out: None,
            projfrac: DEFAULT_PROJFRAC,
        }
    }

    /// Set the output path.
    pub fn with_output<P: Into<PathBuf>>(mut self, out: P) -> Self {
        self.out = Some(out.into());
        self
    }

    /// Set the projection fraction.
    pub fn with_projfrac(mut self, projfrac: f64) -> Self {
        self.projfrac = projfrac;
        self
    }

    /// Resolved output path.
    pub fn output_path(&self) -> Result<PathBuf> {
        if let Some(out) = &self.out {
            return Ok(out.clone());
        }
        let (dir, stem) = strip_suffix(&self.src, ".nii")?;
        Ok(dir.join(format!("{}.{}.mgh", self.hemi, stem)))
    }

    /// Assemble the command line.
    pub fn invocation(&self, layout: &Layout) -> Result<Invocation> {
        check_projfrac(self.projfrac)?;
        let out = self.output_path()?;
        Ok(Invocation {
            program: "mri_vol2surf",
            args: vec![
                "--src".into(),
                path_arg(&self.src),
                "--srcreg".into(),
                path_arg(&layout.registration_path(&self.session)),
                "--hemi".into(),
                self.hemi.to_string(),
                "--projfrac".into(),
                format_projfrac(self.projfrac),
                "--out".into(),
                path_arg(&out),
            ],
        })
    }

    /// Run the tool.
    pub fn run(&self, layout: &Layout, runner: &dyn CommandRunner) -> Result<Outcome> {
        self.invocation(layout)?.run(runner)?;
        Ok(Outcome::Ran(self.output_path()?))
    }
}

/// Resample a surface overlay between two sessions' subjects (`mri_surf2surf`).
#[derive(Debug, Clone)]
pub struct Surf2Surf {
    /// Source overlay; its file name starts with the hemisphere.
    pub src: PathBuf,
    /// Session the source overlay belongs to.
    pub source_session: String,
    /// Session whose subject receives the overlay.
    pub target_session: String,
    /// Output overlay.
    pub tgt: PathBuf,
}

impl Surf2Surf {
    /// Create a request.
    pub fn new<P, S, T, Q>(src: P, source_session: S, target_session: T, tgt: Q) -> Self
    where
        P: Into<PathBuf>,
        S: Into<String>,
        T: Into<String>,
        Q: Into<PathBuf>,
    {
        Self {
            src: src.into(),
            source_session: source_session.into(),
            target_session: target_session.into(),
            tgt: tgt.into(),
        }
    }

    /// Assemble the command line; resolves both sessions' subjects.
    pub fn invocation(&self, layout: &Layout) -> Result<Invocation> {
        let hemi = Hemisphere::from_file_name(&self.src)?;
        let source_subject = layout.subject_from_session(&self.source_session)?;
        let target_subject = layout.subject_from_session(&self.target_session)?;
        Ok(Invocation {
            program: "mri_surf2surf",
            args: vec![
                "--srcsubject".into(),
                source_subject,
                "--trgsubject".into(),
                target_subject,
                "--hemi".into(),
                hemi.to_string(),
                "--sval".into(),
                path_arg(&self.src),
                "--tval".into(),
                path_arg(&self.tgt),
            ],
        })
    }

    /// Run the tool unless the target is already up to date.
    pub fn run(&self, layout: &Layout, runner: &dyn CommandRunner) -> Result<Outcome> {
        if is_up_to_date(&[&self.tgt], &[&self.src])? {
            info!(output = %self.tgt.display(), "up to date, skipping mri_surf2surf");
            return Ok(Outcome::Skipped(self.tgt.clone()));
        }
        self.invocation(layout)?.run(runner)?;
        Ok(Outcome::Ran(self.tgt.clone()))
    }
}

/// Project a surface overlay back into a session's volume (`mri_surf2vol`).
#[derive(Debug, Clone)]
pub struct Surf2Vol {
    /// Session providing registration and template volume.
    pub session: String,
    /// Source overlay (`lh.*.mgh` / `rh.*.mgh`).
    pub src: PathBuf,
    /// Output volume; defaults to `src` with `.mgh` replaced by `.nii`.
    pub tgt: Option<PathBuf>,
    /// Fraction of cortical thickness to sample at.
    pub projfrac: f64,
}

impl Surf2Vol {
    /// Create a request with default output path and projection fraction.
    pub fn new<S: Into<String>, P: Into<PathBuf>>(session: S, src: P) -> Self {
        Self {
            session: session.into(),
            src: src.into(),
            tgt: None,
            projfrac: DEFAULT_PROJFRAC,
        }
    }

    /// Set the output path.
    pub fn with_output<P: Into<PathBuf>>(mut self, tgt: P) -> Self {
        self.tgt = Some(tgt.into());
        self
    }

    /// Set the projection fraction.
    pub fn with_projfrac(mut self, projfrac: f64) -> Self {
        self.projfrac = projfrac;
        self
    }

    /// Resolved output path.
    pub fn output_path(&self) -> Result<PathBuf> {
        if let Some(tgt) = &self.tgt {
            return Ok(tgt.clone());
        }
        let (dir, stem) = strip_suffix(&self.src, ".mgh")?;
        Ok(dir.join(format!("{stem}.nii")))
    }

    /// Template volume: `fmc.nii.gz` of the session's first BOLD run.
    pub fn template_path(&self, layout: &Layout) -> Result<PathBuf> {
        let runs = layout.bold_runs(&self.session)?;
        let first = runs.first().ok_or_else(|| {
            MeshError::InvalidState(format!("session {} has no BOLD runs", self.session))
        })?;
        Ok(layout.bold_dir(&self.session).join(first).join("fmc.nii.gz"))
    }

    /// Assemble the command line.
    pub fn invocation(&self, layout: &Layout) -> Result<Invocation> {
        check_projfrac(self.projfrac)?;
        let hemi = Hemisphere::from_file_name(&self.src)?;
        let template = self.template_path(layout)?;
        let tgt = self.output_path()?;
        Ok(Invocation {
            program: "mri_surf2vol",
            args: vec![
                "--surfval".into(),
                path_arg(&self.src),
                "--hemi".into(),
                hemi.to_string(),
                "--volreg".into(),
                path_arg(&layout.registration_path(&self.session)),
                "--template".into(),
                path_arg(&template),
                "--projfrac".into(),
                format_projfrac(self.projfrac),
                "--outvol".into(),
                path_arg(&tgt),
            ],
        })
    }

    /// Run the tool.
    pub fn run(&self, layout: &Layout, runner: &dyn CommandRunner) -> Result<Outcome> {
        self.invocation(layout)?.run(runner)?;
        Ok(Outcome::Ran(self.output_path()?))
    }
}
