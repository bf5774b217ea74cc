// src/main.rs

use std::sync::Arc;

use ed25519_dalek::SigningKey;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pou_blockchain::account::{Account, PouAccount};
use pou_blockchain::actor::{spawn_block_actor, BlockHandle};
use pou_blockchain::block::PouBlock;
use pou_blockchain::config::{ActorConfig, POU_PARAMS};
use pou_blockchain::stf::{MemoryLog, SharedLog};
use pou_blockchain::types::{Output, Transaction};

struct Participant {
    name: &'static str,
    key: SigningKey,
    account: Account,
    nonce: u64,
    log: Arc<MemoryLog>,
}

impl Participant {
    fn client(name: &'static str, seed: u8) -> Self {
        let key = SigningKey::from_bytes(&[seed; 32]);
        let account = Account::client(name, &key.verifying_key());
        Self { name, key, account, nonce: 0, log: Arc::new(MemoryLog::new()) }
    }

    fn miner(name: &'static str, seed: u8) -> Self {
        let key = SigningKey::from_bytes(&[seed; 32]);
        let account = Account::miner(name, &key.verifying_key());
        Self { name, key, account, nonce: 0, log: Arc::new(MemoryLog::new()) }
    }

    fn address(&self) -> String {
        self.account.address.clone()
    }

    async fn pay(
        &mut self,
        block: &BlockHandle,
        amount: u64,
        to: &Participant,
    ) -> anyhow::Result<()> {
        info!("{} is transferring {} gold to {}", self.name, amount, to.name);
        let outputs = vec![Output::new(amount, to.address())];
        let tx = Transaction::signed(&self.key, self.nonce, outputs);
        let log: SharedLog = self.log.clone();
        match block.apply_logged(tx, Some(log)).await? {
            Ok(applied) => {
                self.nonce += 1;
                if !applied.cyclic_receivers.is_empty() {
                    info!("{} -> {} closed a cycle", self.name, to.name);
                }
            }
            Err(rejection) => info!("{} rejected: {}", self.name, rejection),
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut alice = Participant::client("Alice", 1);
    let mut bob = Participant::client("Bob", 2);
    let mut charlie = Participant::client("Charlie", 3);
    let minnie = Participant::miner("Minnie", 4);
    let mickey = Participant::miner("Mickey", 5);
    let donald = Participant::miner("Donald", 6);

    let mut genesis = PouBlock::genesis_with(
        POU_PARAMS,
        [&alice, &bob, &charlie, &minnie, &mickey]
            .into_iter()
            .map(|p| (p.account.clone(), 200)),
    );

    info!("Initial balances:");
    for r in genesis.reports() {
        info!("{} has {} gold.", r.name, r.balance);
    }

    // Donald joins after genesis with no funds.
    genesis.register(PouAccount::new(donald.account.clone()));

    let block = spawn_block_actor(genesis, ActorConfig::default());

    alice.pay(&block, 100, &bob).await?;
    charlie.pay(&block, 50, &alice).await?;
    // Bob routes part of Alice's gold straight back to her.
    bob.pay(&block, 60, &alice).await?;
    bob.pay(&block, 20, &charlie).await?;
    alice.pay(&block, 10, &donald).await?;
    // More than Charlie holds; rejected and logged.
    charlie.pay(&block, 1_000, &bob).await?;

    let snapshot = block.snapshot().await?;
    info!("Final balances:");
    for r in snapshot.reports() {
        info!("{} has {} gold, usage index {:.3}.", r.name, r.balance, r.usage_index);
    }
    println!("{}", serde_json::to_string_pretty(&snapshot.reports())?);

    for p in [&alice, &bob, &charlie] {
        for line in p.log.lines() {
            println!("{}: {}", p.name, line);
        }
    }

    Ok(())
}
