//! Execution configuration that downstream crates can serialize/deserialize.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Join buffer size used when nothing else is configured (256 KiB).
pub const DEFAULT_JOIN_BUFFER_BYTES: usize = 262_144;

/// Largest accepted join buffer (1 GiB per side).
pub const MAX_JOIN_BUFFER_BYTES: usize = 1 << 30;

/// Algorithm a join operator uses to compute its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
    NestedLoop,
    #[default]
    BlockNestedLoop,
    SortMerge,
    Hash,
}

impl JoinStrategy {
    pub const ALL: [JoinStrategy; 4] = [
        JoinStrategy::NestedLoop,
        JoinStrategy::BlockNestedLoop,
        JoinStrategy::SortMerge,
        JoinStrategy::Hash,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JoinStrategy::NestedLoop => "nested_loop",
            JoinStrategy::BlockNestedLoop => "block_nested_loop",
            JoinStrategy::SortMerge => "sort_merge",
            JoinStrategy::Hash => "hash",
        }
    }
}

impl fmt::Display for JoinStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JoinStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nested_loop" | "nl" => Ok(JoinStrategy::NestedLoop),
            "block_nested_loop" | "bnl" => Ok(JoinStrategy::BlockNestedLoop),
            "sort_merge" | "merge" => Ok(JoinStrategy::SortMerge),
            "hash" => Ok(JoinStrategy::Hash),
            other => Err(Error::Config(format!("unknown join strategy '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Byte budget for one side of a block-nested-loop join. Each side sizes
    /// its block from this full amount.
    pub join_buffer_bytes: usize,

    /// Strategy new join operators use unless told otherwise.
    pub join_strategy: JoinStrategy,

    /// Tuples per page in the in-memory page store.
    pub scan_page_tuples: usize,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            join_buffer_bytes: DEFAULT_JOIN_BUFFER_BYTES,
            join_strategy: JoinStrategy::default(),
            scan_page_tuples: 64,
        }
    }
}

impl ExecConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `TUPLEFLOW_JOIN_BUFFER_BYTES`: join block budget in bytes
    /// - `TUPLEFLOW_JOIN_STRATEGY`: `nested_loop`, `block_nested_loop`, `sort_merge` or `hash`
    /// - `TUPLEFLOW_SCAN_PAGE_TUPLES`: tuples per in-memory page
    ///
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("TUPLEFLOW_JOIN_BUFFER_BYTES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.join_buffer_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("TUPLEFLOW_JOIN_STRATEGY") {
            if let Ok(v) = s.parse::<JoinStrategy>() {
                cfg.join_strategy = v;
            }
        }

        if let Ok(s) = std::env::var("TUPLEFLOW_SCAN_PAGE_TUPLES") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.scan_page_tuples = v;
            }
        }

        cfg
    }

    pub fn with_join_buffer_bytes(mut self, bytes: usize) -> Self {
        self.join_buffer_bytes = bytes;
        self
    }

    pub fn with_join_strategy(mut self, strategy: JoinStrategy) -> Self {
        self.join_strategy = strategy;
        self
    }

    /// Reject settings no operator can run with.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.join_buffer_bytes == 0 {
            return Err(Error::Config("join_buffer_bytes must be > 0".into()));
        }
        if self.join_buffer_bytes > MAX_JOIN_BUFFER_BYTES {
            return Err(Error::Config(format!(
                "join_buffer_bytes {} exceeds the maximum of {MAX_JOIN_BUFFER_BYTES}",
                self.join_buffer_bytes
            )));
        }
        if self.scan_page_tuples == 0 {
            return Err(Error::Config("scan_page_tuples must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_engine_constants() {
        let cfg = ExecConfig::default();
        assert_eq!(cfg.join_buffer_bytes, 262_144);
        assert_eq!(cfg.join_strategy, JoinStrategy::BlockNestedLoop);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn strategy_parses_names_and_aliases() {
        for s in JoinStrategy::ALL {
            assert_eq!(s.as_str().parse::<JoinStrategy>().unwrap(), s);
        }
        assert_eq!("BNL".parse::<JoinStrategy>().unwrap(), JoinStrategy::BlockNestedLoop);
        assert!("zigzag".parse::<JoinStrategy>().is_err());
    }

    #[test]
    fn config_roundtrips_through_json() {
        let cfg = ExecConfig::default()
            .with_join_buffer_bytes(1024)
            .with_join_strategy(JoinStrategy::SortMerge);
        let json = serde_json::to_string(&cfg).unwrap();
        assert!(json.contains("\"sort_merge\""));
        let back: ExecConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn zero_budget_is_rejected() {
        assert!(ExecConfig::default()
            .with_join_buffer_bytes(0)
            .validate()
            .is_err());
    }

    #[test]
    fn oversized_budget_is_rejected() {
        let at_max = ExecConfig::default().with_join_buffer_bytes(MAX_JOIN_BUFFER_BYTES);
        assert!(at_max.validate().is_ok());
        let huge = ExecConfig::default().with_join_buffer_bytes(usize::MAX / 4);
        assert!(matches!(huge.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn from_env_overlays_valid_values_only() {
        std::env::set_var("TUPLEFLOW_JOIN_BUFFER_BYTES", "4096");
        std::env::set_var("TUPLEFLOW_JOIN_STRATEGY", "hash");
        std::env::set_var("TUPLEFLOW_SCAN_PAGE_TUPLES", "not-a-number");
        let cfg = ExecConfig::from_env();
        assert_eq!(cfg.join_buffer_bytes, 4096);
        assert_eq!(cfg.join_strategy, JoinStrategy::Hash);
        assert_eq!(cfg.scan_page_tuples, ExecConfig::default().scan_page_tuples);

        std::env::set_var("TUPLEFLOW_JOIN_STRATEGY", "zigzag");
        std::env::remove_var("TUPLEFLOW_JOIN_BUFFER_BYTES");
        std::env::set_var("TUPLEFLOW_SCAN_PAGE_TUPLES", "8");
        let cfg = ExecConfig::from_env();
        assert_eq!(cfg.join_buffer_bytes, DEFAULT_JOIN_BUFFER_BYTES);
        assert_eq!(cfg.join_strategy, JoinStrategy::BlockNestedLoop);
        assert_eq!(cfg.scan_page_tuples, 8);

        for var in [
            "TUPLEFLOW_JOIN_BUFFER_BYTES",
            "TUPLEFLOW_JOIN_STRATEGY",
            "TUPLEFLOW_SCAN_PAGE_TUPLES",
        ] {
            std::env::remove_var(var);
        }
    }
}
