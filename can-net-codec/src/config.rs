//! Loader configuration types
//!
//! The loader is permissive by default: signals that do not fit the payload
//! are accepted and simply decode to truncated values. Strict mode rejects
//! them at load time instead.

use crate::signal::PAYLOAD_BITS;
use serde::{Deserialize, Serialize};

/// Configuration for loading a network description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadOptions {
    /// Reject signals with zero size or that exceed `frame_bits`
    #[serde(default)]
    pub strict_signals: bool,

    /// Usable payload width checked in strict mode (default: 64)
    #[serde(default = "default_frame_bits")]
    pub frame_bits: u32,
}

fn default_frame_bits() -> u32 {
    PAYLOAD_BITS
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict_signals: false,
            frame_bits: default_frame_bits(),
        }
    }
}

impl LoadOptions {
    /// Create load options with default (permissive) settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: enable or disable strict signal validation
    pub fn with_strict_signals(mut self, enabled: bool) -> Self {
        self.strict_signals = enabled;
        self
    }

    /// Builder method: set the payload width checked in strict mode
    pub fn with_frame_bits(mut self, bits: u32) -> Self {
        self.frame_bits = bits;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_options_builder() {
        let options = LoadOptions::new()
            .with_strict_signals(true)
            .with_frame_bits(32);

        assert!(options.strict_signals);
        assert_eq!(options.frame_bits, 32);
    }

    #[test]
    fn test_defaults_are_permissive() {
        let options = LoadOptions::new();
        assert!(!options.strict_signals);
        assert_eq!(options.frame_bits, 64);

        let parsed: LoadOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.frame_bits, 64);
    }
}
