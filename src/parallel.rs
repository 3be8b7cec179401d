//! Parallel processing configuration and management
//!
//! Group reductions in [`crate::aggregate`] run on Rayon's global thread pool;
//! this module sizes that pool.

use crate::errors::{CubeHelperError, Result};
use rayon::ThreadPoolBuilder;
use tracing::info;

/// Configuration for parallel processing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Thread count; Rayon's default when unset
    pub num_threads: Option<usize>,
}

impl ParallelConfig {
    /// Create a new parallel configuration
    pub fn new(num_threads: Option<usize>) -> Self {
        Self { num_threads }
    }

    /// Create a configuration that uses all available CPU cores
    pub fn all_cores() -> Self {
        Self::with_threads(num_cpus::get())
    }

    /// Create a configuration that uses a specific number of threads
    pub fn with_threads(num_threads: usize) -> Self {
        Self {
            num_threads: Some(num_threads),
        }
    }

    /// Set up the global Rayon thread pool with this configuration.
    ///
    /// The global pool can only be built once per process.
    pub fn setup_global_pool(&self) -> Result<()> {
        match self.num_threads {
            Some(num_threads) => {
                ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build_global()
                    .map_err(|e| {
                        CubeHelperError::ThreadPool(format!(
                            "Failed to initialize thread pool with {num_threads} threads: {e}"
                        ))
                    })?;
                info!(threads = num_threads, "configured parallel processing");
            }
            None => info!("using default thread pool configuration"),
        }
        Ok(())
    }

    /// Get the current number of threads being used
    pub fn current_threads(&self) -> usize {
        rayon::current_num_threads()
    }
}

/// Information about the parallel processing environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelInfo {
    pub current_threads: usize,
    pub available_cores: usize,
}

impl ParallelInfo {
    /// Snapshot of the current pool and machine
    pub fn current() -> Self {
        Self {
            current_threads: rayon::current_num_threads(),
            available_cores: num_cpus::get(),
        }
    }

    /// Print parallel processing information
    pub fn print_info(&self) {
        println!("📊 Parallel Processing Information:");
        println!("   Current threads: {}", self.current_threads);
        println!("   Available CPU cores: {}", self.available_cores);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_thread_count() {
        assert_eq!(ParallelConfig::default().num_threads, None);
        assert_eq!(ParallelConfig::with_threads(3).num_threads, Some(3));
        assert_eq!(ParallelConfig::all_cores().num_threads, Some(num_cpus::get()));
        assert!(ParallelInfo::current().current_threads >= 1);
    }
}
