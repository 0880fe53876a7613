//! Node adapter contract.
//!
//! Each node implementation gets one [`NodeService`] that knows how to fetch
//! identity and channel data for a running node. Adapters are injected
//! through a [`ServiceRegistry`](crate::nodes::ServiceRegistry) so the
//! refresh cycle can be tested with any implementation.

use crate::error::Result;
use crate::nodes::model::{ChannelLists, NodeInfo, NodeSnapshot};
use crate::types::LightningNode;
use async_trait::async_trait;

#[async_trait]
pub trait NodeService: Send + Sync {
    /// Fetch the node's identity and sync state
    async fn get_info(&self, node: &LightningNode) -> Result<NodeInfo>;

    /// Fetch the node's channels in every lifecycle state
    async fn get_channels(&self, node: &LightningNode) -> Result<ChannelLists>;

    /// Read a full snapshot. Fails if either call fails.
    async fn snapshot(&self, node: &LightningNode) -> Result<NodeSnapshot> {
        let info = self.get_info(node).await?;
        let channels = self.get_channels(node).await?;
        Ok(NodeSnapshot::new(Some(info), Some(channels)))
    }
}
