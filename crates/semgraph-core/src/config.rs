use serde::{Deserialize, Serialize};

/// Every tunable the spec names in §6, with its documented default.
/// Loaded with the `config` crate so an operator can layer a file and
/// `CODEGRAPH_`-prefixed environment overrides on top of the defaults,
/// the same pattern the teacher uses in `config.rs`/`config_manager.rs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Max lines of source kept per entity during extraction.
    pub max_body_lines: usize,
    /// Per-entity text length cap applied at embedding time.
    pub max_body_chars: usize,
    /// Tokenizer hard cap for an embedding request.
    pub embedding_max_tokens: usize,
    /// Debounce window for the incremental workflow, in milliseconds.
    pub quiet_period_ms: u64,
    /// Changed-file count above which incremental falls back to a full reindex.
    pub fallback_threshold_files: usize,
    /// Files per reindex batch in the incremental workflow.
    pub reindex_batch_size: usize,
    /// Documents per vector-index upsert call.
    pub embed_subbatch: usize,
    /// PageRank damping factor.
    pub pagerank_damping: f64,
    /// PageRank convergence epsilon.
    pub pagerank_epsilon: f64,
    /// PageRank iteration cap.
    pub pagerank_max_iterations: u32,
    /// fan_in/fan_out threshold for `risk_level = high`.
    pub blast_radius_high: u32,
    /// fan_in/fan_out threshold for `risk_level = medium`.
    pub blast_radius_medium: u32,
    /// Max file size in bytes before extraction quarantines a file.
    pub max_file_size_bytes: u64,
    /// Per-file extraction timeout before quarantine, in milliseconds.
    pub extraction_timeout_ms: u64,
    /// Depth of caller cascade re-justification on an incremental run.
    pub cascade_depth: usize,
    /// Minimum interval between heartbeats on long-running activities.
    pub heartbeat_interval_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_body_lines: 400,
            max_body_chars: 2000,
            embedding_max_tokens: 512,
            quiet_period_ms: 60_000,
            fallback_threshold_files: 200,
            reindex_batch_size: 5,
            embed_subbatch: 10,
            pagerank_damping: 0.85,
            pagerank_epsilon: 1e-6,
            pagerank_max_iterations: 100,
            blast_radius_high: 10,
            blast_radius_medium: 5,
            max_file_size_bytes: 2 * 1024 * 1024,
            extraction_timeout_ms: 30_000,
            cascade_depth: 1,
            heartbeat_interval_ms: 30_000,
        }
    }
}

impl PipelineConfig {
    /// Layer environment overrides (`CODEGRAPH_<FIELD>`) on top of the
    /// documented defaults, following `codegraph-core`'s config-loading
    /// convention.
    pub fn load() -> crate::Result<Self> {
        let cfg = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default()).map_err(|e| {
                crate::CodeGraphError::Configuration(format!("default source: {e}"))
            })?)
            .add_source(
                config::Environment::with_prefix("CODEGRAPH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::CodeGraphError::Configuration(e.to_string()))?;

        cfg.try_deserialize()
            .map_err(|e| crate::CodeGraphError::Configuration(e.to_string()))
    }

    pub fn risk_level(&self, fan_in: u32, fan_out: u32) -> crate::RiskLevel {
        let max = fan_in.max(fan_out);
        if max >= self.blast_radius_high {
            crate::RiskLevel::High
        } else if max >= self.blast_radius_medium {
            crate::RiskLevel::Medium
        } else {
            crate::RiskLevel::Normal
        }
    }
}
