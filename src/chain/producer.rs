use log::info;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::Chain;

/// Spawn the block production loop for `chain`.
///
/// The genesis block (number 1) is produced immediately, before the first
/// timer tick. After that, one block is produced per tick while the chain
/// is running; a tick that fires on a stopped chain is skipped, not an
/// error. The loop exits when the chain's cancellation token fires, which
/// means a tick already past the select may still produce one last block.
pub fn spawn(chain: Arc<Chain>) -> JoinHandle<()> {
    let cancel = chain.cancel_token();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(chain.block_time());
        // First interval fire is immediate; consume it so ticks are evenly
        // spaced after the genesis block.
        ticker.tick().await;

        let genesis = chain.create_block();
        info!("block #{} created at {}", genesis.number, genesis.timestamp);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("block production loop stopped");
                    return;
                }
                _ = ticker.tick() => {
                    if chain.is_running() {
                        let block = chain.create_block();
                        info!("block #{} created at {}", block.number, block.timestamp);
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::spawn;
    use crate::chain::Chain;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn genesis_is_produced_before_the_first_tick() {
        let chain = Arc::new(Chain::new(Duration::from_secs(60)));
        chain.start();
        let handle = spawn(Arc::clone(&chain));

        // Long block time: any height we observe shortly after spawn must
        // come from the immediate genesis, not a timer tick.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(chain.height(), 1);
        assert_eq!(chain.latest_block().unwrap().number, 1);

        chain.stop();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn produces_blocks_while_running_and_exits_on_stop() {
        let chain = Arc::new(Chain::new(Duration::from_millis(10)));
        chain.start();
        let handle = spawn(Arc::clone(&chain));

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(chain.height() > 1);

        chain.stop();
        handle.await.unwrap();

        let height = chain.height();
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(chain.height(), height);
    }
}
