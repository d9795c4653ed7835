//! Runtime configuration knobs (spec.md §6 "Runtime configuration knobs").
//!
//! Grounded on the teacher's `config.rs` (`GcConfig`, `GcConfig::validate`,
//! `ConfigError`) shape — a plain struct with a `Default` impl and a
//! `validate` pass — retargeted to spec.md's much smaller knob table (no
//! TLAB/NUMA/region sizing here; those belong to the teacher's
//! concurrent-region design, which this crate does not carry forward).

use thiserror::Error;

/// Bitmask selecting which categories of GC trace messages are emitted,
/// once the trace threshold has been reached (spec.md §6 "GC trace flags").
bitflags::bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GcTraceFlags: u8 {
        const BASIC      = 0b0000_0001;
        const ALLOCATION = 0b0000_0010;
        const COLLECTION = 0b0000_0100;
        const GRAPH_COPY = 0b0000_1000;
        const HEAP       = 0b0001_0000;
    }
}

/// `RuntimeConfig`: the knob table of spec.md §6.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Ideal size of the young generation as a percent of heap size.
    /// Default 10, clamped to `[10, 100]`.
    pub young_generation_percent: u8,
    /// When true, every allocation attempt is preceded by a collection
    /// (spec.md §4.4 "Excessive-GC mode"), a diagnostic used in tests to
    /// flush out collector bugs.
    pub excessive_gc: bool,
    /// Number of collections before trace messages begin.
    pub gc_trace_threshold: u32,
    pub gc_trace_flags: GcTraceFlags,
    /// Permits explicit user-level collection requests.
    pub allow_user_gc: bool,
    /// Retire a monitor on exit when it never had a waiter and no
    /// identity hash was taken (spec.md §9 "Smart monitors"), reclaiming
    /// its association slot instead of holding it for the object's
    /// lifetime.
    pub smart_monitors: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            young_generation_percent: 10,
            excessive_gc: false,
            gc_trace_threshold: 0,
            gc_trace_flags: GcTraceFlags::BASIC,
            allow_user_gc: true,
            smart_monitors: true,
        }
    }
}

impl RuntimeConfig {
    /// Clamp `young_generation_percent` into `[10, 100]` and reject other
    /// out-of-range knobs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.young_generation_percent < 10 || self.young_generation_percent > 100 {
            return Err(ConfigError::InvalidYoungGenerationPercent(self.young_generation_percent));
        }
        Ok(())
    }

    /// `young_generation_percent`, already clamped, as a fraction.
    pub fn young_generation_fraction(&self) -> f64 {
        self.young_generation_percent.clamp(10, 100) as f64 / 100.0
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("young_generation_percent must be in [10, 100], got {0}")]
    InvalidYoungGenerationPercent(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn young_generation_percent_out_of_range_is_rejected() {
        let cfg = RuntimeConfig { young_generation_percent: 5, ..RuntimeConfig::default() };
        assert!(cfg.validate().is_err());
        let cfg = RuntimeConfig { young_generation_percent: 101, ..RuntimeConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn young_generation_fraction_matches_percent() {
        let cfg = RuntimeConfig { young_generation_percent: 25, ..RuntimeConfig::default() };
        assert!((cfg.young_generation_fraction() - 0.25).abs() < 1e-9);
    }
}
