//! FreeSurfer directory conventions.
//!
//! A [`Layout`] names the two roots the utilities work against: the
//! FreeSurfer subjects directory (reconstructed anatomy) and the functional
//! sessions directory. It is passed explicitly to everything that resolves
//! paths; [`Layout::from_env`] reads the conventional `SUBJECTS_DIR` and
//! `FUNCTIONALS_DIR` variables when the caller asks for it.
//!
//! ```text
//! <subjects_dir>/<subject>/surf/<hemi>.<surface>
//! <sessions_dir>/<session>/subjectname
//! <sessions_dir>/<session>/bold/register.dof6.dat
//! <sessions_dir>/<session>/bold/<run>/fmc.nii.gz
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::{MeshError, Result};
use crate::graph::{MeshGraph, WeightedMeshGraph};
use crate::io::{freesurfer, SurfaceMesh};

/// Environment variable naming the subjects directory.
pub const SUBJECTS_DIR_VAR: &str = "SUBJECTS_DIR";

/// Environment variable naming the functional sessions directory.
pub const SESSIONS_DIR_VAR: &str = "FUNCTIONALS_DIR";

/// Surface used when none is given.
pub const DEFAULT_SURFACE: &str = "white";

/// Cortical hemisphere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hemisphere {
    /// Left hemisphere (`lh`).
    Left,
    /// Right hemisphere (`rh`).
    Right,
}

impl Hemisphere {
    /// FreeSurfer file-name prefix.
    pub fn as_str(self) -> &'static str {
        match self {
            Hemisphere::Left => "lh",
            Hemisphere::Right => "rh",
        }
    }

    /// Hemisphere of a FreeSurfer-style file name (`lh.thickness.mgh`).
    pub fn from_file_name<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MeshError::invalid_param("path", path.display(), "no file name"))?;
        name.get(..2).unwrap_or(name).parse().map_err(|_| {
            MeshError::invalid_param("path", path.display(), "file name must start with lh or rh")
        })
    }
}

impl fmt::Display for Hemisphere {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Hemisphere {
    type Err = MeshError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lh" => Ok(Hemisphere::Left),
            "rh" => Ok(Hemisphere::Right),
            other => Err(MeshError::invalid_param("hemisphere", other, "expected lh or rh")),
        }
    }
}

/// Subjects and sessions directory roots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// FreeSurfer subjects directory.
    pub subjects_dir: PathBuf,
    /// Functional sessions directory.
    pub sessions_dir: PathBuf,
}

impl Layout {
    /// Create a layout from explicit directories.
    pub fn new<S: Into<PathBuf>, F: Into<PathBuf>>(subjects_dir: S, sessions_dir: F) -> Self {
        Self {
            subjects_dir: subjects_dir.into(),
            sessions_dir: sessions_dir.into(),
        }
    }

    /// Read the layout from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read the layout through a variable lookup.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let subjects_dir = lookup(SUBJECTS_DIR_VAR).ok_or(MeshError::MissingEnv(SUBJECTS_DIR_VAR))?;
        let sessions_dir = lookup(SESSIONS_DIR_VAR).ok_or(MeshError::MissingEnv(SESSIONS_DIR_VAR))?;
        Ok(Self::new(subjects_dir, sessions_dir))
    }

    /// `<subjects_dir>/<subject>/surf/<hemi>.<surface>`
    pub fn surface_path(&self, subject: &str, hemi: Hemisphere, surface: &str) -> PathBuf {
        self.subjects_dir
            .join(subject)
            .join("surf")
            .join(format!("{hemi}.{surface}"))
    }

    /// Directory of one session.
    pub fn session_dir(&self, session: &str) -> PathBuf {
        self.sessions_dir.join(session)
    }

    /// BOLD directory of one session.
    pub fn bold_dir(&self, session: &str) -> PathBuf {
        self.session_dir(session).join("bold")
    }

    /// Registration matrix for a session's functional data.
    pub fn registration_path(&self, session: &str) -> PathBuf {
        self.bold_dir(session).join("register.dof6.dat")
    }

    /// Subject a session was acquired from.
    ///
    /// Read from the first line of `<session>/subjectname`.
    pub fn subject_from_session(&self, session: &str) -> Result<String> {
        let path = self.session_dir(session).join("subjectname");
        let contents = fs::read_to_string(&path)?;
        let subject = contents.lines().next().unwrap_or_default().to_string();
        debug!(session, subject = %subject, "resolved session subject");
        Ok(subject)
    }

    /// BOLD run directories of a session: three-digit names, sorted.
    pub fn bold_runs(&self, session: &str) -> Result<Vec<String>> {
        let mut runs = Vec::new();
        for entry in fs::read_dir(self.bold_dir(session))? {
            let name = entry?.file_name();
            if let Some(name) = name.to_str() {
                if name.len() == 3 && name.bytes().all(|b| b.is_ascii_digit()) {
                    runs.push(name.to_string());
                }
            }
        }
        runs.sort();
        Ok(runs)
    }

    /// Load a subject's surface.
    pub fn load_surface(
        &self,
        subject: &str,
        hemi: Hemisphere,
        surface: &str,
    ) -> Result<SurfaceMesh> {
        freesurfer::read_geometry(self.surface_path(subject, hemi, surface))
    }

    /// Vertex adjacency graph of a subject's surface.
    pub fn surface_graph(
        &self,
        subject: &str,
        hemi: Hemisphere,
        surface: &str,
    ) -> Result<MeshGraph> {
        self.load_surface(subject, hemi, surface)?.unweighted_graph()
    }

    /// Edge-length weighted adjacency graph of a subject's surface.
    pub fn weighted_surface_graph(
        &self,
        subject: &str,
        hemi: Hemisphere,
        surface: &str,
    ) -> Result<WeightedMeshGraph> {
        self.load_surface(subject, hemi, surface)?.weighted_graph()
    }
}
