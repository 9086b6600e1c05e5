// demos/demo.rs
use fast_rng::math_utils::{ks_statistic, norm_cdf, sample_moments, Timer};
use fast_rng::{cpu, Algorithm, NormalMethod, RngConfig, RngError, SimdRng, SimdTier};
use rand::Rng;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("fast-rng Demo");
    println!("=============\n");

    let caps = cpu::capabilities();
    println!("CPU capabilities: {:?}", caps);
    println!(
        "Available tiers:  {}",
        caps.available_tiers()
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();

    run_golden_check();
    run_tier_tour(&caps.available_tiers());
    run_rand_interop();
    run_error_handling();
}

fn run_golden_check() {
    println!("1. Scalar golden sequence (seed 0xDEADBEEFCAFEBABE, stream 7)");
    let config = RngConfig {
        seed: 0xDEAD_BEEF_CAFE_BABE,
        stream: 7,
        force_tier: Some(SimdTier::Scalar),
        ..Default::default()
    };
    let mut rng = SimdRng::new(&config).expect("Valid configuration");
    let mut words = [0u64; 4];
    rng.generate_u64(&mut words);
    for w in words {
        println!("   {:#018x}", w);
    }
    println!();
}

fn run_tier_tour(tiers: &[SimdTier]) {
    println!("2. Every available tier and algorithm (1,000,000 draws each)");
    println!(
        "   {:<8} {:<14} {:<10} {:>10} {:>10} {:>10} {:>10}",
        "tier", "algorithm", "normal", "u-mean", "z-mean", "z-var", "KS D"
    );

    let n = 1_000_000;
    for &tier in tiers {
        for algorithm in Algorithm::ALL {
            let config = RngConfig {
                algorithm,
                seed: 2024,
                force_tier: Some(tier),
                ..Default::default()
            };
            let mut rng = SimdRng::new(&config).expect("Valid configuration");

            let mut uniforms = vec![0.0; n];
            rng.generate_double(&mut uniforms);
            let (u_mean, _) = sample_moments(&uniforms);

            let mut timer = Timer::new();
            timer.start();
            let mut normals = vec![0.0; n];
            rng.generate_normal(0.0, 1.0, &mut normals);
            let elapsed = timer.elapsed_ms();

            let (z_mean, z_var) = sample_moments(&normals);
            let d = ks_statistic(&mut normals, norm_cdf);

            println!(
                "   {:<8} {:<14} {:<10} {:>10.5} {:>10.5} {:>10.5} {:>10.5}   ({:.1} ms)",
                tier.to_string(),
                algorithm.to_string(),
                rng.normal_method().to_string(),
                u_mean,
                z_mean,
                z_var,
                d,
                elapsed
            );
        }
    }

    // both normal methods on the same tier
    let best = tiers.first().copied().unwrap_or(SimdTier::Scalar);
    for method in [NormalMethod::Ziggurat, NormalMethod::Polar] {
        let config = RngConfig {
            force_tier: Some(best),
            normal_method: Some(method),
            ..Default::default()
        };
        let mut rng = SimdRng::new(&config).expect("Valid configuration");
        let mut normals = vec![0.0; n];
        let mut timer = Timer::new();
        timer.start();
        rng.generate_normal(0.0, 1.0, &mut normals);
        println!(
            "   {} on {}: {:.1} ms for {} normals",
            method,
            best,
            timer.elapsed_ms(),
            n
        );
    }
    println!();
}

fn run_rand_interop() {
    println!("3. rand::Rng on top of SimdRng");
    let mut rng = SimdRng::from_seed(7).expect("Valid configuration");
    let dice: Vec<u32> = (0..10).map(|_| rng.gen_range(1..=6)).collect();
    let coin: bool = rng.gen();
    println!("   dice: {:?}", dice);
    println!("   coin: {}", coin);
    println!();
}

fn run_error_handling() {
    println!("4. Error handling");

    match "sse9".parse::<SimdTier>() {
        Ok(_) => println!("   Unexpected: Should have failed!"),
        Err(e) => println!("   ✓ Caught error: {}", e),
    }

    let oversized = RngConfig {
        buffer_capacity: usize::MAX,
        ..Default::default()
    };
    match SimdRng::new(&oversized) {
        Ok(_) => println!("   Unexpected: Should have failed!"),
        Err(e @ RngError::AllocationFailed { .. }) => println!("   ✓ Caught error: {}", e),
        Err(e) => println!("   ✓ Caught other error: {}", e),
    }

    // an unavailable tier is not an error, it falls back
    let config = RngConfig {
        force_tier: Some(SimdTier::VecNeon),
        ..Default::default()
    };
    let rng = SimdRng::new(&config).expect("Fallback never fails");
    println!("   requested neon, running on {}", rng.simd_tier());
}
