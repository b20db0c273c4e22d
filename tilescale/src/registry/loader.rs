//! Turning downloaded bytes into a runnable model.

use std::sync::Arc;

use crate::inference::{BackendHandle, KernelModel, ModelDefinition, ModelHandle};

use super::ModelId;

/// Builds a model from its serialized definition.
///
/// The registry does not know model formats; it hands the bytes it got from
/// the cache or the network to a loader. A load error on cached bytes makes
/// the registry fall back to the network.
pub trait ModelLoader: Send + Sync {
    fn load(&self, id: ModelId, bytes: &[u8], backend: &BackendHandle) -> Result<ModelHandle, String>;
}

/// Loader for [`KernelModel`] definitions.
#[derive(Debug, Default, Clone, Copy)]
pub struct KernelModelLoader;

impl ModelLoader for KernelModelLoader {
    fn load(&self, id: ModelId, bytes: &[u8], backend: &BackendHandle) -> Result<ModelHandle, String> {
        let definition = ModelDefinition::from_json(bytes)?;
        if definition.scale != id.scale() {
            return Err(format!(
                "definition scale {} does not match {} ({}x)",
                definition.scale,
                id,
                id.scale()
            ));
        }
        Ok(Arc::new(KernelModel::new(definition, backend)?))
    }
}
