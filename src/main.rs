use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use runtime_icons::cli::{Cli, Command};
use runtime_icons::config::{parse_euler, IconConfig};
use runtime_icons::generator::{sanitize_file_name, IconGenerator, IconOutcome, ItemInfo};
use runtime_icons::loaders::load_gltf_file;
use runtime_icons::math::rotate_euler_world;
use runtime_icons::scene::MemoryScene;
use runtime_icons::scheduler::RenderScheduler;

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let config = match &cli.config {
        Some(path) => IconConfig::load(path)
            .with_context(|| format!("Failed to load configuration {:?}", path))?,
        None => IconConfig::default(),
    };

    match cli.command {
        Command::Render { models, out } => render(config, &models, &out),
        Command::Rotate { euler, axis, angle } => {
            let angle = angle.clamp(-360.0, 360.0);
            let result = rotate_euler_world(parse_euler(&euler), axis.into(), angle);
            println!("{},{},{}", result.x, result.y, result.z);
            Ok(())
        }
        Command::InitConfig { path } => {
            IconConfig::default()
                .save(&path)
                .with_context(|| format!("Failed to write configuration {:?}", path))?;
            log::info!("default configuration written to {:?}", path);
            Ok(())
        }
    }
}

fn render(config: IconConfig, models: &[PathBuf], out: &Path) -> Result<()> {
    let mut scene = MemoryScene::new();
    scene.set_mesh_log_level(config.verbose_mesh_logs);
    let mut generator = IconGenerator::new(&mut scene, config);

    let mut scheduler = RenderScheduler::default();
    let mut failed = Vec::new();

    for path in models {
        match load_gltf_file(path, &mut scene, None) {
            Ok(root) => {
                let name = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("model")
                    .to_string();
                scheduler.submit(ItemInfo::new(name, root));
            }
            Err(err) => {
                log::error!("{err:#}");
                failed.push(path.display().to_string());
            }
        }
    }

    let started = chrono::Local::now();
    for item in scheduler.drain() {
        let outcome = generator.compute_icon(&mut scene, &item);
        match outcome.frame() {
            Some(frame) => {
                let path = out.join(format!("{}.png", sanitize_file_name(&item.name)));
                frame
                    .save_png(&path)
                    .with_context(|| format!("Failed to save icon for {}", item.name))?;
                log::info!("{} -> {:?}", item.name, path);
            }
            None if matches!(outcome, IconOutcome::Skipped) => {}
            None => failed.push(item.name.clone()),
        }
    }

    let elapsed = chrono::Local::now() - started;
    log::info!(
        "rendered {} models in {} ms",
        models.len(),
        elapsed.num_milliseconds()
    );

    if failed.is_empty() {
        log::info!("No items failed to render.");
    } else {
        log::info!("Items that failed to render: {}", failed.join(", "));
    }
    Ok(())
}
