// demos/parallel_demo.rs
use fast_rng::math_utils::{sample_moments, Timer};
use fast_rng::{Algorithm, ParallelFill, RngConfig};
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("fast-rng Parallel Demo");
    println!("======================\n");
    println!("CPU cores: {}", num_cpus::get());
    println!("Rayon threads: {}\n", rayon::current_num_threads());

    let n = 20_000_000;

    for algorithm in Algorithm::ALL {
        let config = RngConfig {
            algorithm,
            seed: 42,
            ..Default::default()
        };
        let fill = ParallelFill::new(config, ParallelFill::DEFAULT_CHUNK_LEN)
            .expect("Valid configuration");

        // pi from points in the unit square
        let mut points = vec![0.0; 2 * n];
        let mut timer = Timer::new();
        timer.start();
        fill.fill_f64(&mut points).expect("Parallel fill should succeed");
        let fill_ms = timer.elapsed_ms();

        let inside = points
            .par_chunks_exact(2)
            .filter(|p| p[0] * p[0] + p[1] * p[1] < 1.0)
            .count();
        let pi = 4.0 * inside as f64 / n as f64;

        // terminal log-returns of a driftless random walk
        let mut normals = vec![0.0; n];
        timer.start();
        fill.fill_normal(0.0, 0.2, &mut normals)
            .expect("Parallel fill should succeed");
        let normal_ms = timer.elapsed_ms();
        let (mean, variance) = sample_moments(&normals);

        println!("{}:", algorithm);
        println!(
            "  {} uniforms in {:.1} ms, pi ≈ {:.6} (error {:.2e})",
            2 * n,
            fill_ms,
            pi,
            (pi - std::f64::consts::PI).abs()
        );
        println!(
            "  {} normals in {:.1} ms, mean {:.5}, stddev {:.5}",
            n,
            normal_ms,
            mean,
            variance.sqrt()
        );
    }
}
