use std::{num::NonZeroUsize, path::PathBuf};

use anyhow::{Context as _, bail};
use clap::{Parser, ValueEnum};
use indicatif::ProgressBar;
use tracing_subscriber::EnvFilter;

use rtcore::{
    Bvh, CoreConfig, PinholeCamera, ResumeRoute, RtCore, ScreenSize, reference,
    rtcore::{DEFAULT_MAX_WORKING_RAYS, DEFAULT_WATCHDOG_CYCLES},
    scene,
};

#[derive(Parser)]
#[command(
    name = "rtcore-sim",
    about = "Trace a grid of camera rays through the cycle level accelerator model"
)]
struct Cli {
    /// Wavefront OBJ scene, a random triangle soup is generated if not given
    #[arg(long)]
    obj: Option<PathBuf>,
    /// Triangle count of the generated scene
    #[arg(long, default_value_t = 1000)]
    triangles: usize,
    /// Seed of the generated scene
    #[arg(long, default_value_t = 0)]
    seed: u64,
    #[arg(long, default_value_t = 64)]
    width: u32,
    #[arg(long, default_value_t = 48)]
    height: u32,
    /// Ray state slots of the core
    #[arg(long, default_value_t = DEFAULT_MAX_WORKING_RAYS)]
    max_working_rays: NonZeroUsize,
    #[arg(long, value_enum, default_value_t = Route::TraversalFifo)]
    resume_route: Route,
    /// Cycles without progress before the run is aborted, 0 disables
    #[arg(long, default_value_t = DEFAULT_WATCHDOG_CYCLES)]
    watchdog_cycles: u64,
    /// Check every result against the functional traversal
    #[arg(long)]
    verify: bool,
    /// Dump the BVH before tracing
    #[arg(long)]
    print_tree: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum Route {
    TraversalFifo,
    WorkingQueue,
}

impl From<Route> for ResumeRoute {
    fn from(route: Route) -> Self {
        match route {
            Route::TraversalFifo => ResumeRoute::TraversalFifo,
            Route::WorkingQueue => ResumeRoute::WorkingQueue,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    let cli = Cli::parse();

    let triangles = match &cli.obj {
        Some(path) => scene::load_obj(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => scene::random_scene(cli.triangles, cli.seed),
    };
    let bvh = Bvh::build(triangles).with_internal_root();
    println!("{}", bvh.statistics());
    if cli.print_tree {
        print!("{}", bvh.tree_display(false));
    }

    let camera =
        PinholeCamera::framing(bvh.bounding_box(), ScreenSize::new(cli.width, cli.height))?;
    let resolution = camera.resolution();
    let rays: Vec<_> = camera.rays().collect();

    let config = CoreConfig::builder()
        .max_working_rays(cli.max_working_rays)
        .resume_route(cli.resume_route.into())
        .watchdog_cycles(cli.watchdog_cycles)
        .build();
    let mut core = RtCore::new(bvh, config)?;
    tracing::info!(
        width = resolution.x,
        height = resolution.y,
        config = ?core.config(),
        "tracing camera rays"
    );

    let bar = ProgressBar::new(rays.len() as u64);
    let results = core.trace_with(&rays, |_, _| bar.inc(1))?;
    bar.finish();

    let hits = results.iter().flatten().count();
    println!("{hits} of {} rays hit", rays.len());
    println!("{}", core.stats());

    if cli.verify {
        let mismatches = rays
            .iter()
            .zip(&results)
            .filter(|(ray, hit)| reference::traverse(core.bvh(), ray) != **hit)
            .count();
        if mismatches > 0 {
            bail!("{mismatches} results differ from the functional traversal");
        }
        println!("All results match the functional traversal");
    }

    Ok(())
}
