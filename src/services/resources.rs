//! Host resource probing for admission control and extraction sizing.

use tracing::debug;

/// Host capacity as seen by the coordinator
pub trait ResourcePool: Send + Sync {
    fn cpu_core_count(&self) -> usize;

    fn available_memory_bytes(&self) -> u64;
}

/// Reads the live host: logical cores from `num_cpus`, memory from
/// `/proc/meminfo` on Linux.
#[derive(Debug, Clone)]
pub struct SystemResourcePool {
    fallback_memory_bytes: u64,
}

impl SystemResourcePool {
    /// `fallback_memory_bytes` is reported when available memory cannot be read
    pub fn new(fallback_memory_bytes: u64) -> Self {
        Self {
            fallback_memory_bytes,
        }
    }
}

impl ResourcePool for SystemResourcePool {
    fn cpu_core_count(&self) -> usize {
        num_cpus::get().max(1)
    }

    fn available_memory_bytes(&self) -> u64 {
        #[cfg(target_os = "linux")]
        {
            if let Some(bytes) = std::fs::read_to_string("/proc/meminfo")
                .ok()
                .and_then(|content| parse_meminfo_available(&content))
            {
                return bytes;
            }
        }
        debug!(
            fallback_bytes = self.fallback_memory_bytes,
            "Available memory unreadable, using fallback budget"
        );
        self.fallback_memory_bytes
    }
}

/// Fixed capacity, for tests and for callers that size the pool themselves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticResourcePool {
    pub cpu_cores: usize,
    pub memory_bytes: u64,
}

impl StaticResourcePool {
    pub fn new(cpu_cores: usize, memory_bytes: u64) -> Self {
        Self {
            cpu_cores,
            memory_bytes,
        }
    }
}

impl ResourcePool for StaticResourcePool {
    fn cpu_core_count(&self) -> usize {
        self.cpu_cores
    }

    fn available_memory_bytes(&self) -> u64 {
        self.memory_bytes
    }
}

/// Parse the `MemAvailable:` line of `/proc/meminfo` into bytes
pub fn parse_meminfo_available(content: &str) -> Option<u64> {
    content
        .lines()
        .find(|line| line.starts_with("MemAvailable:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|value| value.parse::<u64>().ok())
        .map(|kb| kb.saturating_mul(1024))
}
