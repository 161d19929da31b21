//! Random instance generation.
//!
//! Instances are drawn from a seeded `ChaCha8Rng`, so a given `(n, seed)`
//! always produces the same file. Batches follow the usual benchmark grid:
//! every size crossed with every seed, numbered `instance_0.txt`,
//! `instance_1.txt`, ... in that order.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::instance::Instance;

/// How the size of each subset is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsetSizeStrategy {
    /// Uniform in `1..=n`
    Uniform,
    /// Always `k`, clamped to `1..=n`
    Fixed(usize),
    /// Uniform in `1..=max(1, ceil(ln n))`
    Logarithmic,
    /// Placeholder for strategies without a sampler; generation yields nothing
    Unimplemented,
}

impl std::fmt::Display for SubsetSizeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubsetSizeStrategy::Uniform => write!(f, "uniform"),
            SubsetSizeStrategy::Fixed(k) => write!(f, "fixed({})", k),
            SubsetSizeStrategy::Logarithmic => write!(f, "logarithmic"),
            SubsetSizeStrategy::Unimplemented => write!(f, "unimplemented"),
        }
    }
}

/// Batch generation configuration
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    /// Instance sizes
    pub sizes: Vec<usize>,
    /// Seeds, one instance per size and seed
    pub seeds: Vec<u64>,
    /// Subset size strategy
    pub strategy: SubsetSizeStrategy,
    /// Repair the subsets so that every element is covered
    pub ensure_cover: bool,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            sizes: vec![25, 50, 100, 200, 400],
            seeds: vec![42, 69, 420],
            strategy: SubsetSizeStrategy::Uniform,
            ensure_cover: false,
        }
    }
}

/// Seeded instance generator
pub struct InstanceGenerator {
    rng: ChaCha8Rng,
}

impl InstanceGenerator {
    pub fn new(seed: u64) -> Self {
        InstanceGenerator {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn subset_size(&mut self, n: usize, strategy: SubsetSizeStrategy) -> Option<usize> {
        match strategy {
            SubsetSizeStrategy::Uniform => Some(self.rng.gen_range(1..=n)),
            SubsetSizeStrategy::Fixed(k) => Some(k.clamp(1, n)),
            SubsetSizeStrategy::Logarithmic => {
                let upper = ((n as f64).ln().ceil() as usize).clamp(1, n);
                Some(self.rng.gen_range(1..=upper))
            }
            SubsetSizeStrategy::Unimplemented => None,
        }
    }

    /// Generate one instance of size `n`.
    ///
    /// Elements are drawn with replacement, so a subset may end up smaller
    /// than its drawn size. Coefficients are integers in `-n..=n` on the
    /// upper triangle.
    pub fn generate(
        &mut self,
        n: usize,
        strategy: SubsetSizeStrategy,
        ensure_cover: bool,
    ) -> Option<Instance> {
        if n == 0 {
            return Instance::new(Vec::new(), Vec::new()).ok();
        }

        let mut sizes = Vec::with_capacity(n);
        for _ in 0..n {
            sizes.push(self.subset_size(n, strategy)?);
        }

        let mut subsets: Vec<BTreeSet<usize>> = sizes
            .iter()
            .map(|&size| (0..size).map(|_| self.rng.gen_range(1..=n)).collect())
            .collect();

        if ensure_cover {
            for element in 1..=n {
                if !subsets.iter().any(|s| s.contains(&element)) {
                    let target = self.rng.gen_range(0..n);
                    subsets[target].insert(element);
                }
            }
        }

        let bound = n as i64;
        let mut matrix = vec![vec![0.0; n]; n];
        for (i, row) in matrix.iter_mut().enumerate() {
            for value in row.iter_mut().skip(i) {
                *value = self.rng.gen_range(-bound..=bound) as f64;
            }
        }

        match Instance::new(matrix, subsets) {
            Ok(instance) => Some(instance),
            Err(e) => {
                log::error!("Generated instance rejected: {}", e);
                None
            }
        }
    }
}

/// Generate the full size x seed grid into `outdir`.
///
/// Returns the paths written. Combinations the strategy cannot produce are
/// skipped but still consume an id.
pub fn generate_batch<P: AsRef<Path>>(
    config: &GeneratorConfig,
    outdir: P,
) -> std::io::Result<Vec<PathBuf>> {
    let outdir = outdir.as_ref();
    std::fs::create_dir_all(outdir)?;

    let total = config.sizes.len() * config.seeds.len();
    let pb = ProgressBar::new(total as u64);
    if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}") {
        pb.set_style(style);
    }

    let mut written = Vec::with_capacity(total);
    let mut id = 0;

    for &n in &config.sizes {
        for &seed in &config.seeds {
            pb.set_message(format!("n={} seed={}", n, seed));

            let mut generator = InstanceGenerator::new(seed);
            match generator.generate(n, config.strategy, config.ensure_cover) {
                Some(instance) => {
                    let path = outdir.join(format!("instance_{}.txt", id));
                    instance.write_to(&path)?;
                    log::debug!("Wrote {:?} (n={}, seed={})", path, n, seed);
                    written.push(path);
                }
                None => {
                    log::warn!(
                        "Skipping instance_{} (n={}, seed={}): strategy {} produced nothing",
                        id,
                        n,
                        seed,
                        config.strategy
                    );
                }
            }

            id += 1;
            pb.inc(1);
        }
    }

    pb.finish_with_message("done");
    log::info!("Generated {} instances in {:?}", written.len(), outdir);
    Ok(written)
}
