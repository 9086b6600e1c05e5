// scripts/benchmark.rs
use fast_rng::config::FORCE_SIMD_ENV;
use fast_rng::math_utils::Timer;
use fast_rng::{Algorithm, CpuCapabilities, NormalMethod, RngConfig, SimdRng, SimdTier};
use fast_rng::{cpu, ParallelFill};
use std::env;
use std::fs::File;
use std::io::Write;
use tracing_subscriber::EnvFilter;

/// What a throughput number depends on: the host's vector support, the
/// tiers it unlocks, and any override in effect.
#[derive(Debug)]
struct HostInfo {
    target: String,
    cpu_cores: usize,
    rayon_threads: usize,
    capabilities: CpuCapabilities,
    tiers: Vec<SimdTier>,
    forced_tier: Option<String>,
    rustflags: Option<String>,
}

impl HostInfo {
    fn gather() -> Self {
        let capabilities = cpu::capabilities();
        Self {
            target: format!("{}-{}", env::consts::ARCH, env::consts::OS),
            cpu_cores: num_cpus::get(),
            rayon_threads: rayon::current_num_threads(),
            capabilities,
            tiers: capabilities.available_tiers(),
            forced_tier: env::var(FORCE_SIMD_ENV).ok().filter(|v| !v.trim().is_empty()),
            rustflags: env::var("RUSTFLAGS").ok(),
        }
    }

    /// `(label, value)` pairs shared by the console and CSV reports.
    fn fields(&self) -> Vec<(&'static str, String)> {
        let tiers = self
            .tiers
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        vec![
            ("Target", self.target.clone()),
            ("CPU Cores", self.cpu_cores.to_string()),
            ("Rayon Threads", self.rayon_threads.to_string()),
            ("CPU Capabilities", format!("{:?}", self.capabilities)),
            ("Available Tiers", tiers),
            (
                FORCE_SIMD_ENV,
                self.forced_tier.clone().unwrap_or_else(|| "unset".to_string()),
            ),
            (
                "RUSTFLAGS",
                self.rustflags.clone().unwrap_or_else(|| "default".to_string()),
            ),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputKind {
    U64,
    Double,
    Normal(NormalMethod),
}

impl OutputKind {
    fn label(self) -> String {
        match self {
            OutputKind::U64 => "u64".to_string(),
            OutputKind::Double => "f64".to_string(),
            OutputKind::Normal(method) => format!("normal/{}", method),
        }
    }
}

#[derive(Debug)]
struct BenchmarkResult {
    tier: SimdTier,
    algorithm: Algorithm,
    kind: String,
    values: usize,
    time_ms: f64,
    throughput_values_per_sec: f64,
    checksum: f64,
}

impl BenchmarkResult {
    fn new(
        tier: SimdTier,
        algorithm: Algorithm,
        kind: String,
        values: usize,
        time_ms: f64,
        checksum: f64,
    ) -> Self {
        Self {
            tier,
            algorithm,
            kind,
            values,
            time_ms,
            throughput_values_per_sec: values as f64 / (time_ms / 1000.0),
            checksum,
        }
    }

    fn gb_per_sec(&self) -> f64 {
        self.throughput_values_per_sec * 8.0 / 1e9
    }
}

const BATCH: usize = 1 << 16;

fn bench_single(
    tier: SimdTier,
    algorithm: Algorithm,
    kind: OutputKind,
    values: usize,
) -> BenchmarkResult {
    let config = RngConfig {
        algorithm,
        seed: 42,
        force_tier: Some(tier),
        normal_method: match kind {
            OutputKind::Normal(method) => Some(method),
            _ => None,
        },
        ..Default::default()
    };
    let mut rng = SimdRng::new(&config).expect("Valid configuration");
    assert_eq!(rng.simd_tier(), tier);

    let mut words = vec![0u64; BATCH];
    let mut doubles = vec![0f64; BATCH];
    let mut checksum = 0.0;

    let mut timer = Timer::new();
    timer.start();
    let mut produced = 0;
    while produced < values {
        match kind {
            OutputKind::U64 => {
                rng.generate_u64(&mut words);
                checksum += (words[0] >> 11) as f64;
            }
            OutputKind::Double => {
                rng.generate_double(&mut doubles);
                checksum += doubles[0];
            }
            OutputKind::Normal(_) => {
                rng.generate_normal(0.0, 1.0, &mut doubles);
                checksum += doubles[0];
            }
        }
        produced += BATCH;
    }
    let time_ms = timer.elapsed_ms();

    BenchmarkResult::new(tier, algorithm, kind.label(), produced, time_ms, checksum)
}

fn run_tier_benchmarks(values: usize) -> Vec<BenchmarkResult> {
    let mut results = Vec::new();
    let kinds = [
        OutputKind::U64,
        OutputKind::Double,
        OutputKind::Normal(NormalMethod::Ziggurat),
        OutputKind::Normal(NormalMethod::Polar),
    ];

    for tier in cpu::capabilities().available_tiers() {
        for algorithm in Algorithm::ALL {
            println!("Benchmarking {} / {}...", tier, algorithm);
            for kind in kinds {
                results.push(bench_single(tier, algorithm, kind, values));
            }
        }
    }

    results
}

fn run_parallel_benchmark(values: usize) -> Vec<BenchmarkResult> {
    let mut results = Vec::new();
    let mut out = vec![0f64; values];

    for algorithm in Algorithm::ALL {
        let config = RngConfig {
            algorithm,
            seed: 42,
            ..Default::default()
        };
        let fill = ParallelFill::new(config, ParallelFill::DEFAULT_CHUNK_LEN)
            .expect("Valid configuration");
        let tier = fill.worker(0).expect("Valid configuration").simd_tier();

        let mut timer = Timer::new();
        timer.start();
        fill.fill_normal(0.0, 1.0, &mut out)
            .expect("Parallel fill should succeed");
        let time_ms = timer.elapsed_ms();

        results.push(BenchmarkResult::new(
            tier,
            algorithm,
            "normal/parallel".to_string(),
            values,
            time_ms,
            out[0],
        ));
    }

    results
}

fn write_results_to_csv(results: &[BenchmarkResult], host: &HostInfo, filename: &str) {
    let mut file = File::create(filename).expect("Could not create CSV file");

    writeln!(file, "# Host").unwrap();
    for (label, value) in host.fields() {
        writeln!(file, "# {}: {}", label, value).unwrap();
    }
    writeln!(
        file,
        "# Benchmark Date: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
    .unwrap();
    writeln!(file, "#").unwrap();

    writeln!(
        file,
        "Tier,Algorithm,Output,Values,Time_ms,Throughput_values_per_sec,GB_per_sec,Checksum"
    )
    .unwrap();

    for result in results {
        writeln!(
            file,
            "{},{},{},{},{:.2},{:.0},{:.3},{:.6}",
            result.tier,
            result.algorithm,
            result.kind,
            result.values,
            result.time_ms,
            result.throughput_values_per_sec,
            result.gb_per_sec(),
            result.checksum
        )
        .unwrap();
    }

    println!("Results written to {}", filename);
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("fast-rng Throughput Benchmark");
    println!("=============================\n");

    let values: usize = env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(1 << 24);

    let host = HostInfo::gather();
    println!("Host:");
    for (label, value) in host.fields() {
        println!("  {}: {}", label, value);
    }
    println!();

    println!("Running single-instance benchmarks ({} values each)...", values);
    let mut all_results = run_tier_benchmarks(values);

    println!("\nRunning parallel fill benchmark...");
    all_results.extend(run_parallel_benchmark(values));

    println!("\n{:=<84}", "");
    println!("BENCHMARK RESULTS");
    println!("{:=<84}", "");
    println!(
        "{:<8} {:<14} {:<18} {:>12} {:>16} {:>10}",
        "Tier", "Algorithm", "Output", "Time (ms)", "Values/sec", "GB/s"
    );
    println!("{:-<84}", "");

    for result in &all_results {
        println!(
            "{:<8} {:<14} {:<18} {:>12.2} {:>16.0} {:>10.3}",
            result.tier.to_string(),
            result.algorithm.to_string(),
            result.kind,
            result.time_ms,
            result.throughput_values_per_sec,
            result.gb_per_sec()
        );
    }

    println!("{:=<84}", "");

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let filename = format!("benchmark_results_{}.csv", timestamp);
    write_results_to_csv(&all_results, &host, &filename);

    println!("\nBenchmark complete!");
    println!("\nTo reproduce these results:");
    println!("1. Run: cargo run --bin benchmark --release [values]");
    println!(
        "2. Pin the parallel benchmark to one tier with {}=<scalar|avx2|avx512|neon>",
        FORCE_SIMD_ENV
    );
}
