//! Single-slot caches for the loaded model and the active pipeline
//!
//! A dispatcher holds one `ModelMemo` and one `PipelineMemo`. The model slot
//! is replaced whenever the cache key changes; the pipeline slot whenever the
//! task parameter changes or the model underneath it was replaced.

use std::sync::Arc;

use tracing::{debug, info};

use crate::bucketfs::ModelLocator;
use crate::config::Device;
use crate::error::Result;
use crate::loader::{ModelLoader, TokenizerLoader};
use crate::pipeline::Pipeline;
use crate::udf::{CacheKey, Task};

/// A model and tokenizer loaded for one cache key
pub struct LoadedModel<M, K> {
    pub key: CacheKey,
    pub model: Arc<M>,
    pub tokenizer: Arc<K>,
}

/// Outcome of `ModelMemo::ensure`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reload {
    /// The slot already held the key
    Hit,
    /// The key was (re)loaded
    Loaded,
}

/// Holds at most one loaded model
///
/// Device memory is released before a replacement is loaded, on `release`,
/// and on drop.
pub struct ModelMemo<ML: ModelLoader, TL: TokenizerLoader> {
    slot: Option<LoadedModel<ML::Model, TL::Tokenizer>>,
    device: Device,
    model_loader: ML,
    tokenizer_loader: TL,
}

impl<ML: ModelLoader, TL: TokenizerLoader> ModelMemo<ML, TL> {
    pub fn new(model_loader: ML, tokenizer_loader: TL, device: Device) -> Self {
        Self {
            slot: None,
            device,
            model_loader,
            tokenizer_loader,
        }
    }

    pub fn device(&self) -> Device {
        self.device
    }

    /// Key of the loaded model, if any
    pub fn current_key(&self) -> Option<&CacheKey> {
        self.slot.as_ref().map(|loaded| &loaded.key)
    }

    /// Make `key` the loaded model, loading it unless it already is
    ///
    /// On failure the slot is left empty.
    pub fn ensure(
        &mut self,
        key: &CacheKey,
        locator: &ModelLocator,
    ) -> Result<(&LoadedModel<ML::Model, TL::Tokenizer>, Reload)> {
        let (entry, reload) = match self.slot.take() {
            Some(loaded) if loaded.key == *key => {
                debug!(key = %key, "Model cache hit");
                (loaded, Reload::Hit)
            }
            stale => {
                self.free(stale);
                (self.load(key, locator)?, Reload::Loaded)
            }
        };
        Ok((&*self.slot.insert(entry), reload))
    }

    fn load(
        &self,
        key: &CacheKey,
        locator: &ModelLocator,
    ) -> Result<LoadedModel<ML::Model, TL::Tokenizer>> {
        let location = locator.locate(key)?;
        info!(
            model = %key.model_name,
            connection = %key.bucketfs_conn,
            sub_dir = %key.sub_dir,
            device = %self.device,
            "Loading model"
        );

        let model = self
            .model_loader
            .load_model(&key.model_name, &location, &self.device)?;

        let tokenizer = match self
            .tokenizer_loader
            .load_tokenizer(&key.model_name, &location)
        {
            Ok(tokenizer) => tokenizer,
            Err(e) => {
                drop(model);
                self.model_loader.release_device_memory(&self.device);
                return Err(e);
            }
        };

        Ok(LoadedModel {
            key: key.clone(),
            model: Arc::new(model),
            tokenizer: Arc::new(tokenizer),
        })
    }

    /// Drop a replaced model and clear device memory
    fn free(&self, stale: Option<LoadedModel<ML::Model, TL::Tokenizer>>) {
        if let Some(loaded) = stale {
            info!(key = %loaded.key, "Releasing model");
        }
        self.model_loader.release_device_memory(&self.device);
    }

    /// Drop the loaded model, if any, and clear device memory
    pub fn release(&mut self) {
        let stale = self.slot.take();
        self.free(stale);
    }

    /// Switch devices; a model on the old device is released
    pub fn set_device(&mut self, device: Device) {
        if device != self.device && self.slot.is_some() {
            self.release();
        }
        self.device = device;
    }
}

impl<ML: ModelLoader, TL: TokenizerLoader> Drop for ModelMemo<ML, TL> {
    fn drop(&mut self) {
        if self.slot.is_some() {
            self.release();
        }
    }
}

/// Holds at most one pipeline and the parameter it was built with
pub struct PipelineMemo<T: Task> {
    param: Option<T::Param>,
    pipeline: Option<Box<dyn Pipeline<T>>>,
}

impl<T: Task> Default for PipelineMemo<T> {
    fn default() -> Self {
        Self {
            param: None,
            pipeline: None,
        }
    }
}

impl<T: Task> PipelineMemo<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pipeline for `param`, building it unless the cached one fits
    pub fn ensure<F>(&mut self, param: &T::Param, build: F) -> Result<&mut dyn Pipeline<T>>
    where
        F: FnOnce(&T::Param) -> Result<Box<dyn Pipeline<T>>>,
    {
        let pipeline = match self.pipeline.take() {
            Some(pipeline) if self.param.as_ref() == Some(param) => {
                debug!(param = ?param, "Pipeline cache hit");
                pipeline
            }
            stale => {
                drop(stale);
                self.param = None;
                debug!(task = %T::KIND, param = ?param, "Building pipeline");
                let pipeline = build(param)?;
                self.param = Some(param.clone());
                pipeline
            }
        };
        Ok(&mut **self.pipeline.insert(pipeline))
    }

    /// Drop the cached pipeline
    pub fn invalidate(&mut self) {
        self.pipeline = None;
        self.param = None;
    }

    pub fn is_empty(&self) -> bool {
        self.pipeline.is_none()
    }
}
