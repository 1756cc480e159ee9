mod demos;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::{Context, IntoDiagnostic};

use glslice_ast::Diagnostics;
use glslice_glsl::ArtifactBundle;
use glslice_partition::PipelineConfig;

/// glslice — shader pipeline partitioning compiler
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Built-in demo pipeline to compile (see --list-demos)
    demo: Option<String>,

    /// Stage to print: vs, gs, fs, or all (default: all)
    #[arg(short, long, default_value = "all", value_parser = parse_stage)]
    stage: StageFilter,

    /// Output path; stage sources are written as <base>.vert/.geom/.frag
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Print the partition plan to stderr before emission
    #[arg(long)]
    emit_plan: bool,

    /// Insert a forwarding-only geometry stage
    #[arg(long)]
    geometry: bool,

    /// Allow texture sampling in the vertex stage
    #[arg(long)]
    vertex_texture_fetch: bool,

    /// List the available demo pipelines and exit
    #[arg(long)]
    list_demos: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StageFilter {
    All,
    Vs,
    Gs,
    Fs,
}

fn parse_stage(s: &str) -> Result<StageFilter, String> {
    match s {
        "all" => Ok(StageFilter::All),
        "vs" | "vert" => Ok(StageFilter::Vs),
        "gs" | "geom" => Ok(StageFilter::Gs),
        "fs" | "frag" => Ok(StageFilter::Fs),
        _ => Err(format!("invalid stage '{s}', expected vs, gs, fs, or all")),
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> miette::Result<()> {
    env_logger::try_init().ok();

    let cli = Cli::parse();

    if cli.list_demos {
        for name in demos::DEMO_NAMES {
            println!("{name}");
        }
        return Ok(());
    }

    let name = cli
        .demo
        .as_deref()
        .ok_or_else(|| miette::miette!("a demo name is required (use --list-demos)"))?;
    let program = demos::build(name).ok_or_else(|| {
        let available = demos::DEMO_NAMES.join(", ");
        miette::miette!("unknown demo '{name}' (available: {available})")
    })?;

    let config = PipelineConfig {
        geometry: cli.geometry,
        tessellation: false,
        vertex_texture_fetch: cli.vertex_texture_fetch,
    };

    if cli.emit_plan {
        let mut diags = Diagnostics::new();
        let plan = glslice_partition::partition(&program, &config, &mut diags)
            .map_err(|e| miette::miette!("{e}"))?;
        eprintln!("{}", glslice_partition::dump_plan(&program, &plan));
    }

    let bundle = glslice_glsl::compile(&program, &config)
        .map_err(|e| miette::miette!("{e}"))
        .wrap_err("compilation failed")?;

    for diag in &bundle.diagnostics {
        eprintln!("{diag}");
    }

    if let Some(base) = &cli.output {
        write_bundle(base, &bundle, cli.stage)?;
    } else {
        print_bundle(&bundle, cli.stage);
    }

    Ok(())
}

fn print_bundle(bundle: &ArtifactBundle, stage: StageFilter) {
    if matches!(stage, StageFilter::All | StageFilter::Vs) {
        print!("{}", bundle.vertex_shader);
    }
    if matches!(stage, StageFilter::All | StageFilter::Gs) {
        if let Some(gs) = &bundle.geometry_shader {
            if stage == StageFilter::All {
                println!();
            }
            print!("{gs}");
        }
    }
    if matches!(stage, StageFilter::All | StageFilter::Fs) {
        if stage == StageFilter::All {
            println!();
        }
        print!("{}", bundle.fragment_shader);
    }
}

fn write_bundle(
    base: &PathBuf,
    bundle: &ArtifactBundle,
    stage: StageFilter,
) -> miette::Result<()> {
    let write = |ext: &str, text: &str| -> miette::Result<()> {
        let path = base.with_extension(ext);
        std::fs::write(&path, text)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to write {}", path.display()))
    };

    if matches!(stage, StageFilter::All | StageFilter::Vs) {
        write("vert", &bundle.vertex_shader)?;
    }
    if matches!(stage, StageFilter::All | StageFilter::Gs) {
        if let Some(gs) = &bundle.geometry_shader {
            write("geom", gs)?;
        }
    }
    if matches!(stage, StageFilter::All | StageFilter::Fs) {
        write("frag", &bundle.fragment_shader)?;
    }
    Ok(())
}
