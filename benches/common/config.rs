use std::env;

/// Configuration for benchmarks, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Redis URL (from REDIS_URL env var). Redis benchmarks are skipped when unset.
    pub redis_url: Option<String>,

    /// Simulated database latency in microseconds (from DB_LATENCY_US env var, defaults to 200)
    pub db_latency_us: u64,

    /// Sample size for benchmarks (from BENCH_SAMPLE_SIZE env var, defaults to 100)
    pub sample_size: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            redis_url: env::var("REDIS_URL").ok(),
            db_latency_us: env::var("DB_LATENCY_US")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(200),
            sample_size: env::var("BENCH_SAMPLE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        let config = Self::default();
        eprintln!("Benchmark Configuration:");
        eprintln!(
            "  Redis URL: {}",
            config.redis_url.as_deref().unwrap_or("(unset, skipping redis)")
        );
        eprintln!("  DB Latency: {}us", config.db_latency_us);
        eprintln!("  Sample Size: {}", config.sample_size);
        config
    }
}
