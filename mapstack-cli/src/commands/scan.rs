//! Scan command - run one refresh cycle over a manifest directory and
//! print the resulting layer stack.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use mapstack::geo::LatLon;
use mapstack::layer::{LayerEvent, LayerManager};
use mapstack::resource::{ProviderRegistry, ResourceManager};

use crate::collaborators::{parse_lat_lon, ConsoleSurface, DirectoryRepository, ManifestProvider};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the scan command.
#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Directory containing *.layers manifests
    pub directory: PathBuf,

    /// Show every layer and wait for its elements to load
    #[arg(long)]
    pub show: bool,

    /// Click the map at this position after loading
    #[arg(long, value_name = "LAT,LON", value_parser = parse_lat_lon, allow_hyphen_values = true)]
    pub click: Option<LatLon>,

    /// Click the top-most visible primitive after loading
    #[arg(long)]
    pub pick: bool,
}

/// Run the scan command.
pub fn run(args: ScanArgs, config_path: Option<&Path>, debug: bool) -> Result<(), CliError> {
    if !args.directory.is_dir() {
        return Err(CliError::ScanDirectory {
            path: args.directory,
            reason: "not a directory".to_string(),
        });
    }

    let runner = CliRunner::new(config_path, debug)?;
    runner.log_startup("scan");
    let config = runner.config();

    let providers =
        Arc::new(ProviderRegistry::new().with_provider(Arc::new(ManifestProvider::new())));
    let mut resources = ResourceManager::new(runner.handle(), Arc::clone(&providers))
        .with_repository(Arc::new(DirectoryRepository::new(&args.directory)))
        .with_config(config.resource_config());
    let mut diffs = resources.subscribe();
    let mut layers = LayerManager::new(
        &mut resources,
        providers,
        ConsoleSurface::new(),
        runner.handle(),
        config.layer_config(),
    );
    let mut events = layers.subscribe_events();

    runner.block_on(async {
        resources.refresh_available();
        resources.run_until_idle().await;
        layers.pump();

        if args.show {
            for descriptor in layers.layers_in_z_order() {
                layers.show(&descriptor);
            }
            layers.run_until_idle().await;
        }
    });

    println!("Scanned {}", args.directory.display());
    if let Some(report) = resources.last_report() {
        println!("  Discovered: {}", report.discovered);
        println!("  Imported:   {}", report.imported);
        println!("  Refreshed:  {}", report.refreshed);
        println!("  Failures:   {}", report.failures.len());
        for failure in &report.failures {
            println!("    ! {}", failure);
        }
    }
    while let Ok(diff) = diffs.receiver.try_recv() {
        println!(
            "  Changes:    {} added, {} updated, {} removed",
            diff.added_count(),
            diff.updated_count(),
            diff.removed_count()
        );
    }
    println!();

    let order = layers.layers_in_z_order();
    println!("Layers (bottom to top):");
    if order.is_empty() {
        println!("  (none)");
    }
    for (z, descriptor) in order.iter().enumerate() {
        let state = layers
            .layer_state(descriptor)
            .map(|s| format!("{:?}", s))
            .unwrap_or_default();
        println!(
            "  {:>2}  {:<24} {:<10} {}",
            z,
            descriptor.title(),
            state,
            descriptor.key()
        );
    }
    while let Ok(event) = events.try_recv() {
        if let LayerEvent::LayerFailed { layer, reason } = event {
            println!("    ! {}: {}", layer, reason);
        }
    }
    println!(
        "Primitives: {} ({} visible)",
        layers.surface().primitive_count(),
        layers.surface().visible_count()
    );

    if let Some(position) = args.click {
        print_map_click(&mut layers, position);
    }
    if args.pick {
        match layers.surface().visible_handles().first().copied() {
            Some(handle) => match layers.on_primitive_click(handle) {
                Some(click) => println!("Picked {}: {}", handle, click.description),
                None => println!("Picked {}: no description", handle),
            },
            None => println!("Nothing to pick"),
        }
    }

    layers.dispose(&mut resources);
    resources.unsubscribe(diffs.id);
    Ok(())
}

fn print_map_click(layers: &mut LayerManager<ConsoleSurface>, position: LatLon) {
    let clicks = layers.on_map_click(position);
    if clicks.is_empty() {
        println!("Click at {}: nothing here", position);
        return;
    }
    println!("Click at {}:", position);
    for click in clicks {
        println!("  {}", click.description);
    }
}
