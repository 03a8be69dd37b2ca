//! relight: offline lightmap baker.
//!
//! ```bash
//! # Bake every static object of a scene into ./lightmaps
//! relight bake assets/scenes/courtyard.toml
//!
//! # Dump the generated UV atlases only
//! relight uv assets/scenes/courtyard.toml --out atlases
//! ```
#![forbid(unsafe_code)]

mod config;
mod output;
mod scene_desc;
mod texture_cache;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use relight_lighting::BakeError;
use relight_mesh::{Dcel, generate};
use relight_runtime::BakeSession;

use crate::config::{OpChoice, Preset, RelightConfig, TraversalChoice, WorkerChoice};
use crate::scene_desc::SceneDesc;
use crate::texture_cache::TextureLoader;

#[derive(Parser)]
#[command(name = "relight")]
#[command(about = "Bakes lightmaps for static scene geometry")]
#[command(version)]
struct Cli {
    /// Bake configuration (TOML); built-in defaults when omitted
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `relight_runtime=debug` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate lightmap UVs, bake, and write one image per static object
    Bake(BakeArgs),

    /// Generate UV atlases and write a preview per object
    Uv(UvArgs),
}

#[derive(Args)]
struct BakeArgs {
    /// Scene description (TOML)
    scene: PathBuf,

    /// Output directory
    #[arg(long, short, default_value = "lightmaps")]
    out: PathBuf,

    /// Worker count (0 = one per core)
    #[arg(long)]
    workers: Option<usize>,

    #[arg(long, value_enum)]
    worker_kind: Option<WorkerChoice>,

    #[arg(long, value_enum)]
    op: Option<OpChoice>,

    /// Indirect lighting preset
    #[arg(long, value_enum)]
    preset: Option<Preset>,

    #[arg(long, value_enum)]
    traversal: Option<TraversalChoice>,

    #[arg(long)]
    seed: Option<u64>,

    /// Only write these objects (repeatable)
    #[arg(long = "only", value_name = "NAME")]
    only: Vec<String>,
}

impl BakeArgs {
    fn apply(&self, cfg: &mut RelightConfig) {
        if let Some(n) = self.workers {
            cfg.workers.count = n;
        }
        if let Some(k) = self.worker_kind {
            cfg.workers.kind = k;
        }
        if let Some(op) = self.op {
            cfg.bake.op = op;
        }
        if let Some(p) = self.preset {
            cfg.indirect.preset = p;
        }
        if let Some(t) = self.traversal {
            cfg.bake.traversal = t;
        }
        if let Some(s) = self.seed {
            cfg.bake.seed = s;
        }
    }
}

#[derive(Args)]
struct UvArgs {
    /// Scene description (TOML)
    scene: PathBuf,

    /// Output directory
    #[arg(long, short, default_value = "atlases")]
    out: PathBuf,

    /// Preview resolution per atlas unit
    #[arg(long, default_value_t = 16)]
    texels_per_unit: u32,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref());
    let mut cfg = RelightConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Bake(args) => {
            args.apply(&mut cfg);
            cfg.validate()?;
            bake(&cfg, &args)
        }
        Commands::Uv(args) => uv(&cfg, &args),
    }
}

fn init_logging(filter: Option<&str>) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(f) = filter {
        builder.parse_filters(f);
    }
    builder.init();
}

fn scene_dir(scene: &Path) -> &Path {
    scene.parent().unwrap_or_else(|| Path::new("."))
}

fn bake(cfg: &RelightConfig, args: &BakeArgs) -> Result<()> {
    let desc = SceneDesc::load(&args.scene)?;
    let mut textures = TextureLoader::new();
    let loaded = desc.build(scene_dir(&args.scene), cfg, &mut textures)?;
    let scene = Arc::clone(&loaded.scene);
    let mut only = Vec::with_capacity(args.only.len());
    for name in &args.only {
        let id = loaded
            .instances
            .get(name)
            .with_context(|| format!("--only: no object named '{name}'"))?;
        only.push(id);
    }

    let mut session = BakeSession::new(cfg.workers.kind.into(), cfg.workers.resolved_count())?;
    let report = session.run(&scene, cfg.bake.op.into(), &cfg.bake_settings());

    for (id, err) in report.failed() {
        let name = loaded.instances.name_of(*id).unwrap_or("?");
        match err {
            BakeError::InvalidCall(_) => log::debug!("skipped '{name}': {err}"),
            BakeError::Cancelled => log::warn!("'{name}' was not finished"),
        }
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create {}", args.out.display()))?;
    let mut written = 0;
    for (name, id) in loaded.instances.iter() {
        let Some(inst) = scene.instance(id) else {
            continue;
        };
        if !only.is_empty() && !only.contains(&id) {
            continue;
        }
        if !inst.take_dirty() {
            continue;
        }
        if let Some(lm) = inst.lightmap() {
            let path = output::write_lightmap(&lm, &args.out, name)?;
            log::debug!("'{name}' rev {} -> {}", inst.revision(), path.display());
            written += 1;
        }
    }
    log::info!(
        "wrote {written} lightmap(s) to {} ({} job(s), {}ms)",
        args.out.display(),
        report.jobs.len(),
        report.t_total_ms
    );
    Ok(())
}

fn uv(cfg: &RelightConfig, args: &UvArgs) -> Result<()> {
    let desc = SceneDesc::load(&args.scene)?;
    let params = cfg.uv_params();
    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("create {}", args.out.display()))?;
    for obj in &desc.objects {
        let mesh = obj.shape.mesh();
        let dcel = Dcel::build(&mesh);
        let open: Vec<(u32, u32)> = dcel.boundary_edges().map(|e| dcel.endpoints(e)).collect();
        if !open.is_empty() {
            log::debug!("'{}': {} boundary edge(s): {open:?}", obj.name, open.len());
        }
        match generate(&mesh, &params) {
            Ok(atlas) => {
                let path = output::write_atlas(&atlas, args.texels_per_unit, &args.out, &obj.name)?;
                log::info!(
                    "'{}': {} chart(s), atlas {}x{} -> {}",
                    obj.name,
                    atlas.chart_count,
                    atlas.width,
                    atlas.height,
                    path.display()
                );
            }
            Err(e) => log::error!("'{}': {e}", obj.name),
        }
    }
    Ok(())
}
