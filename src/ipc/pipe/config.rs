/*!
 * Pipe Configuration
 * Capacity, pairing policy and memory budget for a session coordinator
 */

use super::types::{PipeError, PipeResult, DEFAULT_PIPE_CAPACITY};
use crate::core::limits::{ENV_CAPACITY, ENV_MEMORY_BUDGET, ENV_PAIRING};
use crate::core::types::Size;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How an open is matched against a session that is awaiting its partner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingPolicy {
    /// Join the pending session whatever role it was opened with.
    /// Two writer opens in a row share one session.
    #[default]
    AnyRole,
    /// Only the opposite role may join; a second open of the same role fails
    /// with `RoleInUse`.
    MatchRole,
}

impl FromStr for PairingPolicy {
    type Err = PipeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "any" | "any_role" => Ok(PairingPolicy::AnyRole),
            "match" | "match_role" => Ok(PairingPolicy::MatchRole),
            other => Err(PipeError::InvalidConfig(format!(
                "unknown pairing policy '{}' (expected 'any' or 'match')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PipeConfig {
    /// Bytes of buffer per session
    pub capacity: Size,
    pub pairing: PairingPolicy,
    /// Total buffer bytes allowed live at once; unbounded when `None`
    pub memory_budget: Option<Size>,
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_PIPE_CAPACITY,
            pairing: PairingPolicy::AnyRole,
            memory_budget: None,
        }
    }
}

impl PipeConfig {
    /// Defaults overridden by `SYNCPIPE_CAPACITY`, `SYNCPIPE_PAIRING` and
    /// `SYNCPIPE_MEMORY_BUDGET`
    pub fn from_env() -> PipeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an explicit variable source
    pub fn from_lookup<F>(lookup: F) -> PipeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CAPACITY) {
            config.capacity = parse_size(ENV_CAPACITY, &raw)?;
        }
        if let Some(raw) = lookup(ENV_PAIRING) {
            config.pairing = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_MEMORY_BUDGET) {
            config.memory_budget = Some(parse_size(ENV_MEMORY_BUDGET, &raw)?);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> PipeResult<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| PipeError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_capacity(mut self, capacity: Size) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_pairing(mut self, pairing: PairingPolicy) -> Self {
        self.pairing = pairing;
        self
    }

    pub fn with_memory_budget(mut self, budget: Size) -> Self {
        self.memory_budget = Some(budget);
        self
    }

    pub fn validate(&self) -> PipeResult<()> {
        if self.capacity == 0 {
            return Err(PipeError::InvalidConfig(
                "capacity must be at least 1 byte".to_string(),
            ));
        }

        #[cfg(not(feature = "custom_limits"))]
        if self.capacity > super::types::MAX_PIPE_CAPACITY {
            return Err(PipeError::InvalidConfig(format!(
                "capacity {} exceeds maximum {}",
                self.capacity,
                super::types::MAX_PIPE_CAPACITY
            )));
        }

        Ok(())
    }
}

fn parse_size(key: &str, raw: &str) -> PipeResult<Size> {
    raw.trim()
        .parse::<Size>()
        .map_err(|e| PipeError::InvalidConfig(format!("{}={:?}: {}", key, raw, e)))
}
