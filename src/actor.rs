// src/actor.rs

//! Serializes all mutations of one block through a single owning task.
//!
//! Pile splitting does not commute across interleavings, so concurrent
//! submitters talk to the block only through a [`BlockHandle`]; the task
//! applies one command at a time in arrival order.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::block::{PouBlock, UsageReport};
use crate::config::ActorConfig;
use crate::error::Rejection;
use crate::stf::{try_apply, SharedLog};
use crate::types::{Applied, Transaction};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActorError {
    #[error("block task has stopped")]
    Stopped,
}

enum BlockCommand {
    Apply {
        tx: Transaction,
        log: Option<SharedLog>,
        reply: oneshot::Sender<Result<Applied, Rejection>>,
    },
    Report {
        address: String,
        reply: oneshot::Sender<Option<UsageReport>>,
    },
    Snapshot {
        reply: oneshot::Sender<PouBlock>,
    },
}

/// Cloneable front door to a block owned by a background task.
#[derive(Clone)]
pub struct BlockHandle {
    command_tx: mpsc::Sender<BlockCommand>,
}

/// Move `block` into a new task and return a handle to it. Must be called
/// inside a tokio runtime. The task stops when every handle is dropped.
pub fn spawn_block_actor(block: PouBlock, cfg: ActorConfig) -> BlockHandle {
    let (command_tx, command_rx) = mpsc::channel(cfg.queue_depth.max(1));
    let task = BlockTask { block, command_rx };
    tokio::spawn(task.run());
    BlockHandle { command_tx }
}

impl BlockHandle {
    pub async fn apply(&self, tx: Transaction) -> Result<Result<Applied, Rejection>, ActorError> {
        self.apply_logged(tx, None).await
    }

    /// Like [`apply`](Self::apply), and a rejection reason is also written to `log`.
    pub async fn apply_logged(
        &self,
        tx: Transaction,
        log: Option<SharedLog>,
    ) -> Result<Result<Applied, Rejection>, ActorError> {
        let (reply, rx) = oneshot::channel();
        self.send(BlockCommand::Apply { tx, log, reply }).await?;
        rx.await.map_err(|_| ActorError::Stopped)
    }

    pub async fn report(
        &self,
        address: impl Into<String>,
    ) -> Result<Option<UsageReport>, ActorError> {
        let (reply, rx) = oneshot::channel();
        self.send(BlockCommand::Report { address: address.into(), reply }).await?;
        rx.await.map_err(|_| ActorError::Stopped)
    }

    /// Copy of the block as of every command queued before this one.
    pub async fn snapshot(&self) -> Result<PouBlock, ActorError> {
        let (reply, rx) = oneshot::channel();
        self.send(BlockCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| ActorError::Stopped)
    }

    async fn send(&self, cmd: BlockCommand) -> Result<(), ActorError> {
        self.command_tx.send(cmd).await.map_err(|_| ActorError::Stopped)
    }
}

struct BlockTask {
    block: PouBlock,
    command_rx: mpsc::Receiver<BlockCommand>,
}

impl BlockTask {
    async fn run(mut self) {
        info!(chain_length = self.block.chain_length, "block task started");
        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd);
        }
        info!(
            chain_length = self.block.chain_length,
            "command channel closed, block task stopping"
        );
    }

    fn handle_command(&mut self, cmd: BlockCommand) {
        match cmd {
            BlockCommand::Apply { tx, log, reply } => {
                let res = try_apply(&tx, &mut self.block);
                if let Err(rejection) = &res {
                    info!(id = %tx.id, reason = %rejection, "transaction rejected");
                    if let Some(log) = log {
                        log.log(&rejection.to_string());
                    }
                }
                // The submitter may have gone away; the outcome stands either way.
                let _ = reply.send(res);
            }
            BlockCommand::Report { address, reply } => {
                let _ = reply.send(self.block.report(&address));
            }
            BlockCommand::Snapshot { reply } => {
                debug!("snapshot requested");
                let _ = reply.send(self.block.clone());
            }
        }
    }
}
