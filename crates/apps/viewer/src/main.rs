mod app;
mod config;
mod driver;
mod render;

use clap::Parser;
use formats::project_file::ProjectFile;
use formats::snapshot::SnapshotOptions;
use layers::query::QueryReport;
use scene::World;
use streaming::client::HttpBackend;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::AppContext;
use crate::config::Args;
use crate::driver::Driver;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = args.config()?;

    let mut world = World::new();
    let project = ProjectFile::load(&args.project)?.into_project(&mut world)?;
    info!(
        title = %project.title,
        crs = %project.crs,
        layers = project.layers().count(),
        "project loaded"
    );

    let wireframe = config.wireframe;
    let mut ctx = AppContext::new(project, world, config);
    ctx.set_wireframe(wireframe);
    for edit in &args.styles {
        let Some(layer) = ctx.project().layer_by_name(&edit.layer) else {
            warn!(layer = %edit.layer, "style for unknown layer ignored");
            continue;
        };
        let (id, mut style) = (layer.id, layer.style);
        edit.apply(&mut style);
        ctx.set_layer_style(id, style)?;
    }
    if let Some(color) = args.selection_color {
        ctx.set_selection_color(color);
    }

    let backend = HttpBackend::default();
    let mut driver = Driver::new(&backend);
    driver.submit(ctx.startup());
    info!(requests = driver.in_flight(), "startup requests issued");
    driver.settle(&mut ctx).await;

    if let Some(filter) = &args.search {
        match ctx.search(filter) {
            Some(tag) => println!("found {tag}"),
            None => println!("no feature with {} = {}", filter.key, filter.value),
        }
    }

    for &(x, y) in &args.clicks {
        let jobs = ctx.click(x, y);
        driver.submit(jobs);
        driver.settle(&mut ctx).await;
        debug!(
            selection = ?ctx.selection(),
            highlight = ?ctx.highlight().highlight_entity(),
            "click applied"
        );
        match ctx.popup() {
            Some(report) => print_popup(report),
            None => println!("({x}, {y}): nothing selected"),
        }
    }

    driver.run_frames(&mut ctx, args.frames).await;
    if ctx.is_animating() {
        debug!("exiting with layers still rising");
    }
    debug!(wireframe = ctx.wireframe(), "final view");
    println!("view: {}", ctx.current_view());

    if let Some(path) = &args.snapshot {
        let (width, height) = ctx.viewport_size();
        ctx.save_snapshot(
            path,
            SnapshotOptions {
                width,
                height,
                sky: !args.no_sky,
            },
        )?;
        info!("snapshot written to {}", path.display());
    }

    if let Some(path) = &args.save {
        ctx.export().save(path)?;
        info!("project saved to {}", path.display());
    }

    Ok(())
}

fn print_popup(report: &QueryReport) {
    if !report.layer_name.is_empty() {
        println!("[{}]", report.layer_name);
    }
    println!("  coordinates: {}", report.coordinates);
    for (k, v) in &report.rows {
        println!("  {k}: {v}");
    }
}
