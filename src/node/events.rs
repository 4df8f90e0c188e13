use log::info;

use crate::blockchain::Block;
use crate::transaction::Transaction;

/// State changes the transport layer rebroadcasts to peers. Emitted only
/// after the mutation (including mempool reconciliation) has committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    /// A single block was appended to the head.
    ChainAdvanced(Block),
    /// The whole chain was swapped for a heavier one.
    ChainReplaced { length: usize, head: Block },
    /// The mempool changed; carries its new contents.
    MempoolChanged(Vec<Transaction>),
}

/// Consumer of [`NodeEvent`]s. Must not block: delivery is
/// fire-and-forget from the node's point of view.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: NodeEvent);
}

/// Sink that only records the events in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn publish(&self, event: NodeEvent) {
        match event {
            NodeEvent::ChainAdvanced(block) => {
                info!("broadcast latest block #{} ({})", block.index, block.hash)
            }
            NodeEvent::ChainReplaced { length, head } => {
                info!("broadcast replaced chain: {length} blocks, head {}", head.hash)
            }
            NodeEvent::MempoolChanged(txs) => info!("broadcast mempool: {} pending", txs.len()),
        }
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct RecordingSink {
    events: std::sync::Mutex<Vec<NodeEvent>>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn take(&self) -> Vec<NodeEvent> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

#[cfg(test)]
impl EventSink for RecordingSink {
    fn publish(&self, event: NodeEvent) {
        self.events.lock().unwrap().push(event);
    }
}
