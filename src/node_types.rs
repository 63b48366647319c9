// src/node_types.rs - Shared, fetch-once cache of known node types
//
// The fetch runs as its own task so it completes even if every caller
// that was waiting on it goes away.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::source::AlertSource;

/// Bump whenever [`FALLBACK_NODE_TYPES`] is re-synced with the backend list
pub const FALLBACK_NODE_TYPES_VERSION: &str = "2024-11-01";

/// Served when the backend node-type list is unreachable. This is a copy of
/// backend data and goes stale as new workloads are added.
pub const FALLBACK_NODE_TYPES: &[&str] = &[
    "EigenDA",
    "LagrangeStateCommittee",
    "LagrangeZkWorker",
    "Brevis",
    "WitnessChain",
    "AvaProtocol",
    "EOracle",
    "Hyperlane",
    "Omni",
    "Automata",
    "K3LabsAvs",
    "UnifiAVS",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeTypeOrigin {
    Backend,
    Fallback { version: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypes {
    pub names: Arc<Vec<String>>,
    pub origin: NodeTypeOrigin,
}

impl NodeTypes {
    fn fallback() -> Self {
        warn!(
            version = FALLBACK_NODE_TYPES_VERSION,
            "Serving fallback node type list; it may be out of date"
        );
        Self {
            names: Arc::new(FALLBACK_NODE_TYPES.iter().map(|s| s.to_string()).collect()),
            origin: NodeTypeOrigin::Fallback {
                version: FALLBACK_NODE_TYPES_VERSION,
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.origin, NodeTypeOrigin::Fallback { .. })
    }
}

#[derive(Default)]
struct CacheState {
    value: Option<NodeTypes>,
    inflight: Option<Shared<BoxFuture<'static, NodeTypes>>>,
}

/// One fetch shared by every consumer; failures resolve to the fallback list
#[derive(Clone)]
pub struct NodeTypeCache {
    source: Arc<dyn AlertSource>,
    state: Arc<Mutex<CacheState>>,
}

impl NodeTypeCache {
    pub fn new(source: Arc<dyn AlertSource>) -> Self {
        Self {
            source,
            state: Arc::new(Mutex::new(CacheState::default())),
        }
    }

    pub async fn get(&self) -> NodeTypes {
        let pending = {
            let mut state = self.state.lock().await;
            if let Some(value) = &state.value {
                return value.clone();
            }
            match &state.inflight {
                Some(inflight) => inflight.clone(),
                None => {
                    let source = self.source.clone();
                    let cache = self.state.clone();
                    let handle = tokio::spawn(async move {
                        let types = match source.node_types().await {
                            Ok(names) => {
                                debug!(count = names.len(), "Loaded node types");
                                NodeTypes {
                                    names: Arc::new(names),
                                    origin: NodeTypeOrigin::Backend,
                                }
                            }
                            Err(e) => {
                                warn!(error = %e, "Failed to load node types");
                                NodeTypes::fallback()
                            }
                        };
                        let mut state = cache.lock().await;
                        state.value = Some(types.clone());
                        state.inflight = None;
                        types
                    });
                    let fetch = async move {
                        handle.await.unwrap_or_else(|e| {
                            warn!(error = %e, "Node type fetch task ended abnormally");
                            NodeTypes::fallback()
                        })
                    }
                    .boxed()
                    .shared();
                    state.inflight = Some(fetch.clone());
                    fetch
                }
            }
        };
        pending.await
    }

    /// Drop the cached value so the next [`Self::get`] fetches again
    pub async fn invalidate(&self) {
        self.state.lock().await.value = None;
    }
}
