//! cortigraph CLI - cortical surface graphs and FreeSurfer resampling.
//!
//! Usage: cortigraph [OPTIONS] <COMMAND>
//!
//! Run `cortigraph --help` for available commands.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use cortigraph::deps::prepare_dirs;
use cortigraph::env::{bootstrap, prepare_runner, FreeSurferEnv};
use cortigraph::error::MeshError;
use cortigraph::graph::shortest_path::{dijkstra, DijkstraOptions};
use cortigraph::graph::{build_weighted_graph_with, GraphOptions};
use cortigraph::io::{self, SurfaceMesh};
use cortigraph::layout::{Hemisphere, Layout, DEFAULT_SURFACE, SESSIONS_DIR_VAR, SUBJECTS_DIR_VAR};
use cortigraph::tools::{Outcome, Surf2Surf, Surf2Vol, SystemRunner, Vol2Surf};

#[derive(Parser)]
#[command(name = "cortigraph")]
#[command(author, version, about = "Cortical surface graph CLI", long_about = None)]
struct Cli {
    /// FreeSurfer subjects directory
    #[arg(long, global = true, env = SUBJECTS_DIR_VAR)]
    subjects_dir: Option<PathBuf>,

    /// Functional sessions directory
    #[arg(long, global = true, env = SESSIONS_DIR_VAR)]
    sessions_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Display surface and graph information
    Info {
        #[command(flatten)]
        surface: SurfaceArgs,
    },

    /// Build the vertex adjacency graph and list its edges
    Graph {
        #[command(flatten)]
        surface: SurfaceArgs,

        /// Attach Euclidean edge lengths
        #[arg(short, long)]
        weighted: bool,

        /// Use single-threaded execution (for benchmarking)
        #[arg(long)]
        sequential: bool,
    },

    /// Edge-graph geodesic distance from a vertex
    Distance {
        #[command(flatten)]
        surface: SurfaceArgs,

        /// Source vertex
        #[arg(short, long)]
        source: usize,

        /// Target vertex (prints the path); defaults to the farthest vertex
        #[arg(short, long)]
        target: Option<usize>,

        /// Stop exploring beyond this distance
        #[arg(long)]
        max_distance: Option<f64>,
    },

    /// Project a volume onto a surface (mri_vol2surf)
    Vol2surf {
        /// Session providing the registration
        #[arg(long)]
        session: String,

        /// Target hemisphere
        #[arg(long, value_enum)]
        hemi: Hemi,

        /// Source volume (.nii)
        src: PathBuf,

        /// Output overlay (default: <hemi>.<name>.mgh beside the source)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Projection fraction
        #[arg(long, default_value = "0.5")]
        projfrac: f64,
    },

    /// Resample an overlay between sessions' subjects (mri_surf2surf)
    Surf2surf {
        /// Source overlay (lh.* / rh.*)
        src: PathBuf,

        /// Output overlay
        tgt: PathBuf,

        /// Session of the source overlay
        #[arg(long)]
        from_session: String,

        /// Session receiving the overlay
        #[arg(long)]
        to_session: String,
    },

    /// Project a surface overlay into a volume (mri_surf2vol)
    Surf2vol {
        /// Session providing registration and template
        #[arg(long)]
        session: String,

        /// Source overlay (lh.*.mgh / rh.*.mgh)
        src: PathBuf,

        /// Output volume (default: source with .mgh replaced by .nii)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Projection fraction
        #[arg(long, default_value = "0.5")]
        projfrac: f64,
    },

    /// Check the FreeSurfer environment
    CheckEnv,
}

/// Where to read a surface from: a file, or a subject's surface directory.
#[derive(Args)]
struct SurfaceArgs {
    /// Surface file (FreeSurfer geometry or PLY)
    #[arg(required_unless_present = "subject", conflicts_with = "subject")]
    input: Option<PathBuf>,

    /// Subject in the subjects directory
    #[arg(long, requires = "hemi")]
    subject: Option<String>,

    /// Hemisphere
    #[arg(long, value_enum)]
    hemi: Option<Hemi>,

    /// Surface name
    #[arg(long, default_value = DEFAULT_SURFACE)]
    surface: String,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Hemi {
    /// Left hemisphere
    Lh,
    /// Right hemisphere
    Rh,
}

impl From<Hemi> for Hemisphere {
    fn from(hemi: Hemi) -> Self {
        match hemi {
            Hemi::Lh => Hemisphere::Left,
            Hemi::Rh => Hemisphere::Right,
        }
    }
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult {
    let dirs = Dirs {
        subjects_dir: cli.subjects_dir,
        sessions_dir: cli.sessions_dir,
    };

    match cli.command {
        Commands::Info { surface } => cmd_info(&dirs, &surface)?,

        Commands::Graph {
            surface,
            weighted,
            sequential,
        } => cmd_graph(&dirs, &surface, weighted, sequential)?,

        Commands::Distance {
            surface,
            source,
            target,
            max_distance,
        } => cmd_distance(&dirs, &surface, source, target, max_distance)?,

        Commands::Vol2surf {
            session,
            hemi,
            src,
            out,
            projfrac,
        } => {
            let mut request = Vol2Surf::new(session, hemi.into(), src).with_projfrac(projfrac);
            if let Some(out) = out {
                request = request.with_output(out);
            }
            prepare_dirs(&[request.output_path()?])?;
            report(request.run(&dirs.layout()?, &tool_runner()?)?);
        }

        Commands::Surf2surf {
            src,
            tgt,
            from_session,
            to_session,
        } => {
            prepare_dirs(&[&tgt])?;
            let request = Surf2Surf::new(src, from_session, to_session, tgt);
            report(request.run(&dirs.layout()?, &tool_runner()?)?);
        }

        Commands::Surf2vol {
            session,
            src,
            out,
            projfrac,
        } => {
            let mut request = Surf2Vol::new(session, src).with_projfrac(projfrac);
            if let Some(out) = out {
                request = request.with_output(out);
            }
            prepare_dirs(&[request.output_path()?])?;
            report(request.run(&dirs.layout()?, &tool_runner()?)?);
        }

        Commands::CheckEnv => cmd_check_env()?,
    }

    Ok(())
}

/// Directory roots as given on the command line or in the environment.
struct Dirs {
    subjects_dir: Option<PathBuf>,
    sessions_dir: Option<PathBuf>,
}

impl Dirs {
    fn layout(&self) -> Result<Layout, MeshError> {
        let subjects = self
            .subjects_dir
            .clone()
            .ok_or(MeshError::MissingEnv(SUBJECTS_DIR_VAR))?;
        let sessions = self
            .sessions_dir
            .clone()
            .ok_or(MeshError::MissingEnv(SESSIONS_DIR_VAR))?;
        Ok(Layout::new(subjects, sessions))
    }

    fn surface_path(&self, args: &SurfaceArgs) -> Result<PathBuf, MeshError> {
        if let Some(input) = &args.input {
            return Ok(input.clone());
        }
        let (Some(subject), Some(hemi)) = (&args.subject, args.hemi) else {
            return Err(MeshError::InvalidState(
                "either a surface file or --subject with --hemi is required".to_string(),
            ));
        };
        let subjects = self
            .subjects_dir
            .as_deref()
            .ok_or(MeshError::MissingEnv(SUBJECTS_DIR_VAR))?;
        // Sessions are not needed to locate a subject's surface
        Ok(Layout::new(subjects, Path::new(""))
            .surface_path(subject, hemi.into(), &args.surface))
    }

    fn load(&self, args: &SurfaceArgs) -> Result<(PathBuf, SurfaceMesh), MeshError> {
        let path = self.surface_path(args)?;
        let surface = io::load(&path)?;
        Ok((path, surface))
    }
}

fn report(outcome: Outcome) {
    match outcome {
        Outcome::Ran(path) => println!("Wrote: {}", path.display()),
        Outcome::Skipped(path) => println!("Up to date: {}", path.display()),
    }
}

fn cmd_info(dirs: &Dirs, args: &SurfaceArgs) -> CliResult {
    let (path, surface) = dirs.load(args)?;

    println!("File: {}", path.display());
    println!("Vertices: {}", surface.num_vertices());
    println!("Faces: {}", surface.num_faces());

    if let Some((min, max)) = surface.bounding_box() {
        println!(
            "Bounding box: ({:.3}, {:.3}, {:.3}) to ({:.3}, {:.3}, {:.3})",
            min.x, min.y, min.z, max.x, max.y, max.z
        );
        let diag = max - min;
        println!("Dimensions: {:.3} x {:.3} x {:.3}", diag.x, diag.y, diag.z);
    }

    let graph = surface.weighted_graph()?;
    println!("Graph nodes: {}", graph.num_nodes());
    println!("Graph edges: {}", graph.num_edges());
    println!(
        "Isolated vertices: {}",
        surface.num_vertices() - graph.num_nodes()
    );
    println!("Average edge length: {:.6}", graph.mean_edge_length());

    let (min_len, max_len) = graph
        .edges()
        .fold((f64::INFINITY, 0.0_f64), |(lo, hi), (_, _, &w)| (lo.min(w), hi.max(w)));
    if graph.num_edges() > 0 {
        println!("Edge length range: [{:.6}, {:.6}]", min_len, max_len);
    }

    // Euler characteristic of the referenced part of the surface
    let euler = graph.num_nodes() as i64 - graph.num_edges() as i64 + surface.num_faces() as i64;
    println!("Euler characteristic: {}", euler);

    Ok(())
}

fn cmd_graph(dirs: &Dirs, args: &SurfaceArgs, weighted: bool, sequential: bool) -> CliResult {
    let (_, surface) = dirs.load(args)?;

    let start = Instant::now();
    if weighted {
        let options = GraphOptions::default().with_parallel(!sequential);
        let graph = build_weighted_graph_with(&surface.vertices, &surface.faces, &options)?;
        tracing::info!(
            edges = graph.num_edges(),
            elapsed = ?start.elapsed(),
            "built weighted graph"
        );
        for (a, b, w) in graph.edges() {
            println!("{} {} {}", a, b, w);
        }
    } else {
        let graph = surface.unweighted_graph()?;
        tracing::info!(edges = graph.num_edges(), elapsed = ?start.elapsed(), "built graph");
        for (a, b) in graph.edge_pairs() {
            println!("{} {}", a, b);
        }
    }

    Ok(())
}

fn cmd_distance(
    dirs: &Dirs,
    args: &SurfaceArgs,
    source: usize,
    target: Option<usize>,
    max_distance: Option<f64>,
) -> CliResult {
    let (_, surface) = dirs.load(args)?;
    let graph = surface.weighted_graph()?;

    if !graph.contains_node(source) {
        return Err(MeshError::invalid_param("source", source, "not a vertex of any face").into());
    }

    let mut options = DijkstraOptions::default().with_predecessors(true);
    if let Some(max) = max_distance {
        options = options.with_max_distance(max);
    }
    if let Some(t) = target {
        options = options.with_target(t);
    }

    let result = dijkstra(&graph, source, &options);

    match target {
        Some(t) => match result.path_to(t) {
            Some(path) => {
                println!("Distance: {:.6}", result.distance(t));
                let hops: Vec<String> = path.iter().map(usize::to_string).collect();
                println!("Path: {}", hops.join(" -> "));
            }
            None => println!("Vertex {} is unreachable from {}", t, source),
        },
        None => {
            println!("Reachable vertices: {}", result.reachable_count());
            if let Some((v, d)) = result.farthest_vertex() {
                println!("Farthest vertex: {} at {:.6}", v, d);
            }
        }
    }

    Ok(())
}

/// Runner for the FreeSurfer tools, with the setup script applied if needed.
fn tool_runner() -> Result<SystemRunner, MeshError> {
    prepare_runner(SystemRunner::new(), |name| std::env::var(name).ok())
}

fn cmd_check_env() -> CliResult {
    let env = FreeSurferEnv::from_process()?;
    println!("FREESURFER_HOME: {}", env.home.display());

    if env.path_configured {
        println!("PATH: configured");
        return Ok(());
    }

    println!("PATH: not configured");
    let runner = SystemRunner::new();
    if let Some(vars) = bootstrap(&runner, |name| std::env::var(name).ok())? {
        println!(
            "{} sets {} variables, applied to tool commands:",
            cortigraph::env::SETUP_SCRIPT,
            vars.len()
        );
        for (name, value) in &vars {
            println!("  {name}={value}");
        }
    }

    Ok(())
}
