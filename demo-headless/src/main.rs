use clap::Parser;
use erosion_sim_core::{
    BackendPreference, ErosionError, ErosionParams, ErosionSimulation, GridResolution,
    SimulationConfig, TerrainSeed,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Hydraulic erosion demo with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "erosion-sim-demo")]
#[command(about = "Virtual pipe hydraulic erosion demo", long_about = None)]
struct Args {
    /// Grid width and height in cells (multiple of 16). Defaults to 256, or to a
    /// core-count based preset with `--cpu-only`.
    #[arg(short, long)]
    width: Option<usize>,

    /// Number of ticks to run
    #[arg(short = 'n', long, default_value_t = 500)]
    steps: u64,

    /// Terrain noise seed (random if omitted)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Noise octaves
    #[arg(long, default_value_t = 4)]
    octaves: u32,

    /// Terrain relief as a fraction of the grid extent
    #[arg(long, default_value_t = 0.25)]
    relief: f32,

    /// Timestep
    #[arg(long, default_value_t = 0.02)]
    dt: f32,

    /// Rainfall rate per unit time
    #[arg(short, long, default_value_t = 0.012)]
    rainfall: f32,

    /// Sediment capacity coefficient Kc
    #[arg(long, default_value_t = 0.1)]
    kc: f32,

    /// Dissolving coefficient Ks
    #[arg(long, default_value_t = 0.5)]
    ks: f32,

    /// Deposition coefficient Kd
    #[arg(long, default_value_t = 1.0)]
    kd: f32,

    /// Evaporation coefficient Ke
    #[arg(long, default_value_t = 0.015)]
    ke: f32,

    /// Run on the CPU even when a GPU is available
    #[arg(long)]
    cpu_only: bool,

    /// Fail instead of falling back to the CPU
    #[arg(long, conflicts_with = "cpu_only")]
    gpu_only: bool,

    /// Report interval in ticks
    #[arg(long, default_value_t = 50)]
    report_interval: u64,
}

impl Args {
    fn params(&self) -> ErosionParams {
        ErosionParams {
            dt: self.dt,
            rainfall: self.rainfall,
            kc: self.kc,
            ks: self.ks,
            kd: self.kd,
            ke: self.ke,
            ..ErosionParams::default()
        }
    }

    fn grid_width(&self) -> usize {
        self.width.unwrap_or_else(|| {
            if self.cpu_only {
                GridResolution::recommended_for_cpu().grid_width()
            } else {
                GridResolution::Medium.grid_width()
            }
        })
    }

    fn backend(&self) -> BackendPreference {
        if self.cpu_only {
            BackendPreference::CpuOnly
        } else if self.gpu_only {
            BackendPreference::GpuOnly
        } else {
            BackendPreference::Auto
        }
    }
}

fn main() -> Result<(), ErosionError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    println!("=== Hydraulic Erosion Demo ===\n");

    let config = SimulationConfig {
        grid_width: args.grid_width(),
        params: args.params(),
        terrain: TerrainSeed::Noise {
            seed: args.seed,
            octaves: args.octaves,
            relief: args.relief,
        },
        backend: args.backend(),
        start_running: true,
    };
    let mut sim = ErosionSimulation::new(config)?;

    println!(
        "Grid: {0}x{0}, backend: {1}, terrain seed: {2}",
        sim.grid_width(),
        if sim.is_gpu_accelerated() { "GPU" } else { "CPU" },
        sim.terrain_seed()
            .map_or_else(|| "heightfield".to_string(), |s| format!("{s}"))
    );
    let initial = sim.stats()?;
    println!("Initial bedrock volume: {:.1}\n", initial.total_bedrock);

    println!("  Tick | Water      | Sediment   | Bedrock    | Max depth | Max speed | ms/tick");
    println!("-------|------------|------------|------------|-----------|-----------|--------");

    let mut unstable_reported = false;
    for _ in 0..args.steps {
        sim.tick()?;

        let tick = sim.tick_count();
        if tick % args.report_interval.max(1) != 0 && tick != args.steps {
            continue;
        }

        let stats = sim.stats()?;
        println!(
            "{:6} | {:10.3} | {:10.4} | {:10.1} | {:9.4} | {:9.3} | {:7.3}",
            stats.tick_count,
            stats.total_water,
            stats.total_sediment,
            stats.total_bedrock,
            stats.max_depth,
            stats.max_speed,
            sim.profiler().last_tick_ms()
        );

        let stable = sim.params().stable_timestep(stats.max_depth);
        if !unstable_reported && sim.params().dt > stable {
            warn!(
                "dt={} exceeds the stable timestep {:.4} for depth {:.3}; expect oscillation",
                sim.params().dt,
                stable,
                stats.max_depth
            );
            unstable_reported = true;
        }
    }

    let last = sim.stats()?;
    println!("\n=== Simulation Complete ===");
    println!("Ticks: {}", last.tick_count);
    println!(
        "Material moved into suspension: {:.3}",
        initial.total_bedrock - last.total_bedrock
    );
    println!(
        "Bedrock + sediment drift: {:.4}",
        (last.total_bedrock + last.total_sediment)
            - (initial.total_bedrock + initial.total_sediment)
    );
    info!("Done");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cpu_only_default_width_follows_core_count() {
        let args = Args::parse_from(["erosion-sim-demo", "--cpu-only"]);
        assert_eq!(
            args.grid_width(),
            GridResolution::recommended_for_cpu().grid_width()
        );
        assert_eq!(args.backend(), BackendPreference::CpuOnly);
    }

    #[test]
    fn test_explicit_width_wins() {
        let args = Args::parse_from(["erosion-sim-demo", "--cpu-only", "--width", "48"]);
        assert_eq!(args.grid_width(), 48);
        let args = Args::parse_from(["erosion-sim-demo"]);
        assert_eq!(args.grid_width(), 256);
    }
}
