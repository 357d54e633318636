use std::collections::BTreeMap;
use std::sync::Arc;

use kitfusion_contracts::errors::GenerationFailure;
use kitfusion_contracts::media::ImagePayload;
use serde_json::{Map, Value};

mod dryrun;
mod gemini;

pub use dryrun::DryrunClient;
pub use gemini::{
    clamp_timeout_seconds, GeminiClient, GeminiConfig, DEFAULT_GEMINI_API_BASE,
    DEFAULT_GEMINI_MODEL, DEFAULT_TIMEOUT_SECONDS, ROLE_PREAMBLE,
};

/// One fusion call: both inputs keep their own MIME tags, `instruction` is
/// already assembled with the shot and scene fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FusionRequest {
    pub person: ImagePayload,
    pub garment: ImagePayload,
    pub instruction: String,
}

#[derive(Debug, Clone)]
pub struct FusionResponse {
    pub image: ImagePayload,
    pub provider_request: Map<String, Value>,
    pub provider_response: Map<String, Value>,
}

pub trait GenerationClient: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> Option<&str> {
        None
    }
    fn fuse(&self, request: &FusionRequest) -> Result<FusionResponse, GenerationFailure>;
}

#[derive(Default)]
pub struct ClientRegistry {
    clients: BTreeMap<String, Arc<dyn GenerationClient>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<C: GenerationClient + 'static>(&mut self, client: C) {
        self.clients
            .insert(client.name().to_string(), Arc::new(client));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn GenerationClient>> {
        self.clients.get(name.trim()).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.clients.keys().cloned().collect()
    }
}

pub fn default_client_registry(gemini: GeminiConfig) -> ClientRegistry {
    let mut registry = ClientRegistry::new();
    registry.register(DryrunClient);
    registry.register(GeminiClient::new(gemini));
    registry
}
