use crate::cli::{Commands, ScanArgs};
use crate::config::{Config, PartialConfig};
use crate::geometry::{fibonacci_sphere, outward_normal, rotation_outward};
use crate::metrics::ScanMetrics;
use crate::registry::RegistrySnapshot;
use crate::report::{export, ExportFormat, ScanSummary};
use crate::scan::Scanner;
use crate::{DiscoverError, Result};
use discover_common::Vec3;
use std::path::Path;
use tracing::info;

pub async fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Scan { scan, metrics_out } => handle_scan(scan, metrics_out.as_deref()).await,
        Commands::Planets {
            scan,
            format,
            output,
        } => handle_planets(scan, &format, output.as_deref()).await,
        Commands::Spawn {
            scan,
            planet,
            count,
            radius,
            min_distance,
        } => handle_spawn(scan, &planet, count, radius, min_distance).await,
        Commands::Closest { scan, point } => handle_closest(scan, &point).await,
    }
}

pub fn resolve_config(args: &ScanArgs) -> Result<Config> {
    let base = match &args.config {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            PartialConfig::load(path)?
        }
        None => PartialConfig::default(),
    };
    base.merge(args.overrides()).into_config()
}

async fn run_scan(args: &ScanArgs, metrics: Option<ScanMetrics>) -> Result<(Config, RegistrySnapshot)> {
    let config = resolve_config(args)?;
    let mut scanner = Scanner::new(config.clone())?;
    if let Some(metrics) = metrics {
        scanner = scanner.with_metrics(metrics);
    }
    scanner.scan_all().await;
    Ok((config, scanner.registry().snapshot().await))
}

async fn handle_scan(args: ScanArgs, metrics_out: Option<&Path>) -> Result<()> {
    let metrics = metrics_out.map(|_| ScanMetrics::new()).transpose()?;
    let (config, snapshot) = run_scan(&args, metrics.clone()).await?;

    println!("{}", ScanSummary::new(&snapshot, config.expected_results()));

    println!("\n-- Discovered Planets --");
    for (name, planet) in &snapshot.planets {
        println!(
            "{} at {:?} (host: {})",
            name, planet.coordinates, planet.host
        );
    }

    println!("\n-- Discovered Cubes --");
    for (cube, host) in &snapshot.cubes {
        println!("{} at {}", cube, host);
    }

    if let (Some(path), Some(metrics)) = (metrics_out, metrics) {
        std::fs::write(path, metrics.gather()?)?;
        info!("Metrics written to {}", path.display());
    }
    Ok(())
}

async fn handle_planets(args: ScanArgs, format: &str, output: Option<&Path>) -> Result<()> {
    let format: ExportFormat = format.parse()?;
    let (_, snapshot) = run_scan(&args, None).await?;
    let rendered = export(&snapshot, format)?;

    match output {
        Some(path) => {
            std::fs::write(path, rendered)?;
            info!("Planet export written to {}", path.display());
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

async fn handle_spawn(
    args: ScanArgs,
    planet: &str,
    count: usize,
    radius: f64,
    min_distance: Option<f64>,
) -> Result<()> {
    let (_, snapshot) = run_scan(&args, None).await?;
    let center = snapshot
        .planet(planet)
        .ok_or_else(|| DiscoverError::PlanetNotFound {
            name: planet.to_string(),
        })?
        .coordinates;
    let positions = fibonacci_sphere(count, radius, center);

    println!("== Spawning {} units around {} ==", count, planet);
    for (i, position) in positions.iter().enumerate() {
        let angle = rotation_outward(center, *position);
        let normal = outward_normal(center, *position);
        let clearance = match min_distance {
            Some(d) if snapshot.is_spawn_point_free(*position, d) => " | free",
            Some(_) => " | blocked",
            None => "",
        };
        println!(
            "Spawn {}: pos {} | Face angle: {:.2} | Normal: {}{}",
            i + 1,
            fmt_vec(position),
            angle,
            fmt_vec(&normal),
            clearance
        );
    }
    Ok(())
}

async fn handle_closest(args: ScanArgs, point: &[f64]) -> Result<()> {
    let point: Vec3 = point
        .try_into()
        .map_err(|_| DiscoverError::Config("--point expects exactly three values".into()))?;
    let (_, snapshot) = run_scan(&args, None).await?;

    match snapshot.closest_planet(point) {
        Some((name, distance)) => println!(
            "Closest planet to {} is {} (distance {:.2})",
            fmt_vec(&point),
            name,
            distance
        ),
        None => println!("No planets found."),
    }
    Ok(())
}

fn fmt_vec(v: &Vec3) -> String {
    format!("({:.3}, {:.3}, {:.3})", v[0], v[1], v[2])
}
