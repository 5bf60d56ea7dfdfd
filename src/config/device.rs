//! Compute device selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UdfError};

/// Device a model is placed on
///
/// Parsed from the UDF's leading `device_id` column (`NULL` selects the CPU)
/// or from a device string such as `"cpu"` or `"cuda:0"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    /// Host CPU
    #[default]
    Cpu,
    /// CUDA device by ordinal
    Cuda(usize),
}

impl Device {
    /// Map the engine's device hint to a device
    ///
    /// `None` selects the CPU, a non-negative ordinal selects that CUDA device.
    pub fn from_device_id(device_id: Option<i64>) -> Result<Self> {
        match device_id {
            None => Ok(Device::Cpu),
            Some(id) if id >= 0 => Ok(Device::Cuda(id as usize)),
            Some(id) => Err(UdfError::column(
                "device_id",
                format!("device ordinal must be non-negative, got {}", id),
            )),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(id) => write!(f, "cuda:{}", id),
        }
    }
}

impl FromStr for Device {
    type Err = UdfError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "cpu" => Ok(Device::Cpu),
            "cuda" => Ok(Device::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|id| id.parse().ok())
                .map(Device::Cuda)
                .ok_or_else(|| UdfError::Config(format!("unknown device: '{}'", other))),
        }
    }
}

impl TryFrom<String> for Device {
    type Error = UdfError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}
