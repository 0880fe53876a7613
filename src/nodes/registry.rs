//! Capability-keyed lookup of node adapters.

use crate::error::{LnSimError, Result};
use crate::nodes::service::NodeService;
use crate::types::NodeImplementation;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps each node implementation to the adapter that talks to it.
#[derive(Default, Clone)]
pub struct ServiceRegistry {
    services: HashMap<NodeImplementation, Arc<dyn NodeService>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the adapter for an implementation
    pub fn register(&mut self, implementation: NodeImplementation, service: Arc<dyn NodeService>) {
        self.services.insert(implementation, service);
    }

    /// Register (builder style)
    pub fn with(mut self, implementation: NodeImplementation, service: Arc<dyn NodeService>) -> Self {
        self.register(implementation, service);
        self
    }

    pub fn get(&self, implementation: NodeImplementation) -> Result<Arc<dyn NodeService>> {
        self.services
            .get(&implementation)
            .cloned()
            .ok_or_else(|| LnSimError::MissingService(implementation.to_string()))
    }

    pub fn contains(&self, implementation: NodeImplementation) -> bool {
        self.services.contains_key(&implementation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::model::{ChannelLists, NodeInfo};
    use crate::types::LightningNode;
    use async_trait::async_trait;

    struct Fixed;

    #[async_trait]
    impl NodeService for Fixed {
        async fn get_info(&self, node: &LightningNode) -> Result<NodeInfo> {
            Ok(NodeInfo {
                identity_pubkey: format!("key-{}", node.name),
                ..Default::default()
            })
        }

        async fn get_channels(&self, _node: &LightningNode) -> Result<ChannelLists> {
            Ok(ChannelLists::default())
        }
    }

    #[tokio::test]
    async fn test_lookup_and_default_snapshot() {
        let registry = ServiceRegistry::new().with(NodeImplementation::Lnd, Arc::new(Fixed));
        assert!(registry.contains(NodeImplementation::Lnd));

        let node = LightningNode::new(0, "alice", NodeImplementation::Lnd, "backend1");
        let snapshot = registry
            .get(NodeImplementation::Lnd)
            .unwrap()
            .snapshot(&node)
            .await
            .unwrap();
        assert_eq!(snapshot.pubkey(), Some("key-alice"));
        assert!(snapshot.channels.is_some());
    }

    #[test]
    fn test_missing_service() {
        let registry = ServiceRegistry::new();
        let err = registry.get(NodeImplementation::Eclair).err().unwrap();
        assert!(matches!(err, LnSimError::MissingService(_)));
        assert!(err.to_string().contains("Eclair"));
    }
}
