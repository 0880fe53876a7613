//! [`NodeService`] over the IPC correlator.
//!
//! The backend process owns the RPC connections to the node containers;
//! this adapter just asks it. Every request carries the node definition in
//! its `node` field, which the correlator elides from the log.

use crate::error::{Result, ResultExt};
use crate::ipc::IpcSender;
use crate::nodes::model::{ChannelLists, NodeInfo};
use crate::nodes::service::NodeService;
use crate::types::LightningNode;
use async_trait::async_trait;
use serde::Serialize;

/// Logical channel returning [`NodeInfo`]
pub const GET_INFO_CHANNEL: &str = "get-info";

/// Logical channel returning [`ChannelLists`]
pub const LIST_CHANNELS_CHANNEL: &str = "list-channels";

#[derive(Serialize)]
struct NodeRequest<'a> {
    node: &'a LightningNode,
}

pub struct IpcNodeService {
    sender: IpcSender,
}

impl IpcNodeService {
    pub fn new(sender: IpcSender) -> Self {
        Self { sender }
    }

    pub fn sender(&self) -> &IpcSender {
        &self.sender
    }
}

#[async_trait]
impl NodeService for IpcNodeService {
    async fn get_info(&self, node: &LightningNode) -> Result<NodeInfo> {
        self.sender
            .call(GET_INFO_CHANNEL, &NodeRequest { node })
            .await
            .with_context(|| format!("{} for {}", GET_INFO_CHANNEL, node.name))
    }

    async fn get_channels(&self, node: &LightningNode) -> Result<ChannelLists> {
        self.sender
            .call(LIST_CHANNELS_CHANNEL, &NodeRequest { node })
            .await
            .with_context(|| format!("{} for {}", LIST_CHANNELS_CHANNEL, node.name))
    }
}
