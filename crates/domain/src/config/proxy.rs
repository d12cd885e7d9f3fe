use serde::{Deserialize, Serialize};

/// Tuning knobs for the forwarding pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Deadline for a single upstream resolve call, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Number of resolver workers. `0` means one per CPU core.
    #[serde(default)]
    pub workers: usize,
}

impl PipelineConfig {
    /// Worker count with the `0 = per-CPU` convention resolved.
    pub fn effective_workers(&self) -> usize {
        if self.workers > 0 {
            return self.workers;
        }
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            workers: 0,
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    5_000
}
