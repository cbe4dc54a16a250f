use model_cache::Cachable;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Test entity for benchmarks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BenchPost {
    pub id: u64,
    pub title: String,
    pub body: String,
    pub likes: u32,
}

impl BenchPost {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            title: format!("Post {}", id),
            body: "lorem ipsum dolor sit amet ".repeat((id % 20 + 1) as usize),
            likes: (id % 1000) as u32,
        }
    }
}

impl Cachable for BenchPost {
    fn cache_id(&self) -> String {
        self.id.to_string()
    }
}

/// Simulated database with configurable latency.
///
/// Compute units are synchronous, so the latency blocks the calling thread.
#[derive(Clone)]
pub struct FakeDatabase {
    data: Arc<HashMap<u64, BenchPost>>,
    latency_us: u64,
    query_count: Arc<AtomicUsize>,
}

impl FakeDatabase {
    pub fn new(num_posts: usize, latency_us: u64) -> Self {
        let data = (0..num_posts as u64)
            .map(|id| (id, BenchPost::new(id)))
            .collect();

        Self {
            data: Arc::new(data),
            latency_us,
            query_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn post(&self, id: u64) -> Option<BenchPost> {
        self.query_count.fetch_add(1, Ordering::Relaxed);

        if self.latency_us > 0 {
            std::thread::sleep(Duration::from_micros(self.latency_us));
        }

        self.data.get(&id).cloned()
    }

    /// Total likes across all posts, an aggregate worth caching per type.
    pub fn total_likes(&self) -> u64 {
        self.query_count.fetch_add(1, Ordering::Relaxed);

        if self.latency_us > 0 {
            std::thread::sleep(Duration::from_micros(self.latency_us));
        }

        self.data.values().map(|p| p.likes as u64).sum()
    }

    #[allow(dead_code)]
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::Relaxed)
    }
}

/// Generate post ids for different workload patterns
pub struct IdGenerator {
    num_posts: u64,
}

impl IdGenerator {
    pub fn new(num_posts: u64) -> Self {
        Self { num_posts }
    }

    /// Every id once, in order
    pub fn sequential(&self) -> Vec<u64> {
        (0..self.num_posts).collect()
    }

    /// Random ids with uniform distribution
    #[allow(dead_code)]
    pub fn uniform_random(&self, count: usize) -> Vec<u64> {
        let mut rng = rand::thread_rng();
        (0..count)
            .map(|_| rng.gen_range(0..self.num_posts))
            .collect()
    }

    /// Random ids with Zipf-like distribution (realistic - few hot posts)
    pub fn zipf_random(&self, count: usize) -> Vec<u64> {
        let mut rng = rand::thread_rng();
        let hot = (self.num_posts / 5).max(1);

        (0..count)
            .map(|_| {
                // Simplified Zipf: 80% of requests go to 20% of posts
                if rng.gen_bool(0.8) || hot == self.num_posts {
                    rng.gen_range(0..hot)
                } else {
                    rng.gen_range(hot..self.num_posts)
                }
            })
            .collect()
    }

    /// A workload of reads interleaved with writes: `true` marks a save.
    pub fn read_write_mix(&self, count: usize, read_ratio: f64) -> Vec<(u64, bool)> {
        let mut rng = rand::thread_rng();
        self.zipf_random(count)
            .into_iter()
            .map(|id| (id, !rng.gen_bool(read_ratio)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_id_generator() {
        use super::IdGenerator;

        let ids = IdGenerator::new(100);

        let seq = ids.sequential();
        assert_eq!(seq.len(), 100);
        assert_eq!(seq[0], 0);

        let uniform = ids.uniform_random(50);
        assert_eq!(uniform.len(), 50);
        assert!(uniform.iter().all(|id| *id < 100));

        let zipf = ids.zipf_random(100);
        assert_eq!(zipf.len(), 100);

        let mix = ids.read_write_mix(100, 1.0);
        assert!(mix.iter().all(|(_, write)| !write));
    }
}
