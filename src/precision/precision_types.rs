//! Precision type definitions for mixed-precision training.

use super::conversions::{bf16_to_f32, f32_to_bf16, f32_to_fp16, fp16_to_f32};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Compute precision of a training run
///
/// Parsed from the trainer's `precision` key (`32-true`, `bf16-mixed`,
/// `16-mixed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Precision {
    /// 32-bit floating point (default)
    #[default]
    Fp32,
    /// 16-bit floating point (IEEE half precision)
    Fp16,
    /// 16-bit brain floating point (truncated mantissa)
    Bf16,
}

impl Precision {
    /// Size in bytes
    pub fn size_bytes(&self) -> usize {
        match self {
            Precision::Fp32 => 4,
            Precision::Fp16 | Precision::Bf16 => 2,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Precision::Fp32 => "fp32",
            Precision::Fp16 => "fp16",
            Precision::Bf16 => "bf16",
        }
    }

    /// Config-file spelling
    pub fn config_name(&self) -> &'static str {
        match self {
            Precision::Fp32 => "32-true",
            Precision::Fp16 => "16-mixed",
            Precision::Bf16 => "bf16-mixed",
        }
    }

    /// Whether this is a reduced precision type
    pub fn is_reduced(&self) -> bool {
        matches!(self, Precision::Fp16 | Precision::Bf16)
    }

    /// Round an f32 value to the nearest value representable in this precision
    #[inline]
    pub fn quantize(&self, value: f32) -> f32 {
        match self {
            Precision::Fp32 => value,
            Precision::Fp16 => fp16_to_f32(f32_to_fp16(value)),
            Precision::Bf16 => bf16_to_f32(f32_to_bf16(value)),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "32-true" | "32" | "fp32" | "32-mixed" => Ok(Precision::Fp32),
            "16-mixed" | "16" | "fp16" | "16-true" => Ok(Precision::Fp16),
            "bf16-mixed" | "bf16" | "bf16-true" => Ok(Precision::Bf16),
            other => Err(format!(
                "unknown precision '{other}' (expected one of: 32-true, 16-mixed, bf16-mixed)"
            )),
        }
    }
}

impl TryFrom<String> for Precision {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Precision> for String {
    fn from(value: Precision) -> Self {
        value.config_name().to_string()
    }
}
