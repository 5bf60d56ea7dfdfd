//! Model and tokenizer loading
//!
//! The actual network implementations live outside this crate. UDFs receive
//! them through the capability traits below, which the dispatcher calls when
//! its model memo misses.

mod detect;

pub use detect::{detect_model_artifacts, find_model_dir, ModelArtifacts, WeightsFormat};

use crate::bucketfs::ModelLocation;
use crate::config::Device;
use crate::error::Result;
use crate::tokenizer::Tokenizer;

/// Loads pretrained models from a cache location
pub trait ModelLoader {
    /// Loaded model handle
    type Model;

    /// Load `model_name` from `location` and place it on `device`
    ///
    /// Fails with `ModelLoad` when artifacts are missing or corrupt and with
    /// `DeviceMemory` when the device cannot hold the model.
    fn load_model(
        &self,
        model_name: &str,
        location: &ModelLocation,
        device: &Device,
    ) -> Result<Self::Model>;

    /// Return cached device allocations to the device
    ///
    /// Called after a model was dropped and at the end of a run, whether or
    /// not a model was ever loaded.
    fn release_device_memory(&self, _device: &Device) {}
}

/// Loads tokenizers from a cache location
pub trait TokenizerLoader {
    type Tokenizer: Tokenizer;

    fn load_tokenizer(&self, model_name: &str, location: &ModelLocation)
        -> Result<Self::Tokenizer>;
}
