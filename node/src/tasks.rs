//! The message/task taxonomy (component F) and the node state-machine
//! transitions they drive (component E). Every `*_task_fire` function is
//! the body of a task scheduled through [`blocksim_core::Scheduler`]; the
//! `schedule_*`/`broadcast_*` functions are what constructs and enqueues
//! them.

use crate::context::SimContext;
use crate::node::DownloadState;
use blocksim_consensus_core::{Block, BlockId, NodeId};
use std::io::Write;
use std::sync::Arc;

/// Seeds node `id`'s first `MiningTask` against its current tip. Called once
/// per node during driver setup (§4.H step 3).
pub fn schedule_initial_mining_task<W: Write + 'static>(ctx: &mut SimContext<W>, node_id: NodeId) {
    let parent = ctx.node(node_id).tip().clone();
    schedule_mining_task(ctx, node_id, parent);
}

/// `MiningTask(node, delayMs, difficulty)`: samples the waiting time until
/// `node_id`'s next mining attempt succeeds against a child of `parent`, and
/// schedules the task that, if `parent` is still the tip when it fires,
/// mints the block.
fn schedule_mining_task<W: Write + 'static>(ctx: &mut SimContext<W>, node_id: NodeId, parent: Arc<Block>) {
    let powers = ctx.mining_power_snapshot();
    let mining_power = powers[node_id as usize];
    let (consensus, rng) = ctx.consensus_and_rng_mut();
    let delay = match consensus.mining_delay_ms(rng, mining_power, &parent, &|id| powers[id as usize]) {
        Ok(delay) => delay,
        Err(err) => panic!("fatal mining-delay sampler error for node {node_id}: {err}"),
    };
    let parent_id = parent.id();
    let cancel = ctx.scheduler_mut().schedule(delay, move |ctx: &mut SimContext<W>| mining_task_fire(ctx, node_id, parent_id));
    ctx.node_mut(node_id).set_mining_task(cancel);
}

/// Fires at the sampled mining delay. A no-op (stale task) if `node_id`'s
/// tip has since moved past `parent_id` — the tombstone-by-identity check
/// the spec requires in place of explicit task cancellation on adoption.
fn mining_task_fire<W: Write + 'static>(ctx: &mut SimContext<W>, node_id: NodeId, parent_id: BlockId) {
    if ctx.node(node_id).tip().id() != parent_id {
        return;
    }
    let now = ctx.current_time();
    let powers = ctx.mining_power_snapshot();
    let parent = ctx.node(node_id).tip().clone();
    let block_id = ctx.alloc_block_id();
    let block = ctx.consensus().mint_block(block_id, node_id, &parent, now, &|id| powers[id as usize]);
    adopt_block(ctx, node_id, block);
}

/// Common tail of both self-mined and received-and-valid blocks: install as
/// tip, record the arrival with the observer, tombstone any in-flight
/// mining task, replay any INVs that were waiting on this block, rebroadcast
/// INV to neighbors, and arm the next mining task.
fn adopt_block<W: Write + 'static>(ctx: &mut SimContext<W>, node_id: NodeId, block: Arc<Block>) {
    let now = ctx.current_time();
    if let Err(err) = ctx.observer_mut().arrive_block(&block, node_id, now) {
        log::error!("propagation observer I/O error recording block {} at node {node_id}: {err}", block.id());
    }

    let block_id = block.id();
    {
        let node = ctx.node_mut(node_id);
        node.set_tip(block.clone());
        node.mark_known(block_id);
        if let Some(cancel) = node.take_mining_task() {
            cancel.cancel();
        }
    }

    let replay = ctx.node_mut(node_id).take_orphans_waiting_on(block_id);
    for (from, orphaned) in replay {
        inv_task_fire(ctx, from, node_id, orphaned);
    }

    broadcast_inv(ctx, node_id, block.clone());
    schedule_mining_task(ctx, node_id, block);
}

/// On newly adopting `block`, sends `InvTask(self, peer, block)` to every
/// outbound neighbor, each scheduled at `now + messageLatency(self.region,
/// peer.region)`.
fn broadcast_inv<W: Write + 'static>(ctx: &mut SimContext<W>, from: NodeId, block: Arc<Block>) {
    let neighbors = ctx.node(from).neighbors().to_vec();
    let from_region = ctx.node(from).region();
    for to in neighbors {
        let to_region = ctx.node(to).region();
        let delay = {
            let (network, rng) = ctx.network_and_rng_mut();
            match network.message_latency_ms(from_region, to_region, rng) {
                Ok(delay) => delay,
                Err(err) => panic!("network model misconfiguration: {err}"),
            }
        };
        let block = block.clone();
        ctx.scheduler_mut().schedule(delay, move |ctx: &mut SimContext<W>| inv_task_fire(ctx, from, to, block));
    }
}

/// `InvTask(from, to, block)`: the Idle-state transition of §4.E's table.
/// Ignored if `block` does not beat `to`'s current tip, queued as an orphan
/// if its parent is not locally known yet, and otherwise starts a download
/// (compact or full, depending on both ends' CBR capability) unless one is
/// already in flight for this `(block, peer)` pair.
fn inv_task_fire<W: Write + 'static>(ctx: &mut SimContext<W>, from: NodeId, to: NodeId, block: Arc<Block>) {
    if block.total_difficulty() <= ctx.node(to).tip().total_difficulty() {
        return;
    }

    if !block.is_genesis() {
        let parent_id = block.parent().expect("not genesis").id();
        if !ctx.node(to).knows(parent_id) {
            ctx.node_mut(to).queue_orphan(parent_id, from, block);
            return;
        }
    }

    let key = (block.id(), from);
    if ctx.node(to).download_state(&key).is_some() {
        return;
    }

    let use_cbr = ctx.node(to).use_cbr() && ctx.node(from).use_cbr();
    if use_cbr {
        ctx.node_mut(to).set_download_state(key, DownloadState::AwaitingCmpct);
        let bytes = ctx.protocol().compact_block_size_bytes;
        schedule_cmpct_block_message_task(ctx, from, to, block, bytes);
    } else {
        ctx.node_mut(to).set_download_state(key, DownloadState::AwaitingFullBlock);
        let bytes = ctx.protocol().block_size_bytes;
        schedule_block_message_task(ctx, from, to, block, bytes);
    }
}

fn schedule_cmpct_block_message_task<W: Write + 'static>(ctx: &mut SimContext<W>, from: NodeId, to: NodeId, block: Arc<Block>, bytes: u64) {
    let from_region = ctx.node(from).region();
    let to_region = ctx.node(to).region();
    let delay = {
        let (network, rng) = ctx.network_and_rng_mut();
        match network.download_time_ms(from_region, to_region, bytes, rng) {
            Ok(delay) => delay,
            Err(err) => panic!("network model misconfiguration: {err}"),
        }
    };
    ctx.scheduler_mut().schedule(delay, move |ctx: &mut SimContext<W>| cmpct_block_message_task_fire(ctx, from, to, block));
}

fn schedule_block_message_task<W: Write + 'static>(ctx: &mut SimContext<W>, from: NodeId, to: NodeId, block: Arc<Block>, bytes: u64) {
    let from_region = ctx.node(from).region();
    let to_region = ctx.node(to).region();
    let delay = {
        let (network, rng) = ctx.network_and_rng_mut();
        match network.download_time_ms(from_region, to_region, bytes, rng) {
            Ok(delay) => delay,
            Err(err) => panic!("network model misconfiguration: {err}"),
        }
    };
    ctx.scheduler_mut().schedule(delay, move |ctx: &mut SimContext<W>| block_message_task_fire(ctx, from, to, block));
}

/// `CmpctBlockMessageTask`: fires after the compact-block's download time.
/// Simulates CBR success/failure; on failure, samples a fallback transfer
/// size and starts the `GetBlockTxnTask`/`RecBlockTxnTask` fallback leg
/// instead of delivering.
fn cmpct_block_message_task_fire<W: Write + 'static>(ctx: &mut SimContext<W>, from: NodeId, to: NodeId, block: Arc<Block>) {
    let failure_rate = ctx.protocol().cbr_failure_rate(ctx.node(to).is_churn());
    let failed = ctx.rng_mut().bernoulli(failure_rate);
    if !failed {
        deliver_block(ctx, from, to, block);
        return;
    }

    let key = (block.id(), from);
    ctx.node_mut(to).set_download_state(key, DownloadState::AwaitingFallback);
    let fallback_bytes = {
        let weights = ctx.protocol().cbr_failure_fallback_weights.clone();
        let sizes = ctx.protocol().cbr_failure_fallback_sizes_bytes.clone();
        let idx = ctx.rng_mut().weighted_index(&weights);
        sizes[idx]
    };
    schedule_get_block_txn_task(ctx, from, to, block, fallback_bytes);
}

/// `GetBlockTxnTask`: requests the fallback transfer; the response
/// (`RecBlockTxnTask`) arrives after that transfer's download time.
fn schedule_get_block_txn_task<W: Write + 'static>(ctx: &mut SimContext<W>, from: NodeId, to: NodeId, block: Arc<Block>, fallback_bytes: u64) {
    let from_region = ctx.node(from).region();
    let to_region = ctx.node(to).region();
    let delay = {
        let (network, rng) = ctx.network_and_rng_mut();
        match network.download_time_ms(from_region, to_region, fallback_bytes, rng) {
            Ok(delay) => delay,
            Err(err) => panic!("network model misconfiguration: {err}"),
        }
    };
    ctx.scheduler_mut().schedule(delay, move |ctx: &mut SimContext<W>| rec_block_txn_task_fire(ctx, from, to, block));
}

/// `RecBlockTxnTask`: the fallback transfer's arrival. Always succeeds (a
/// second CBR failure is not modeled) and delivers the block.
fn rec_block_txn_task_fire<W: Write + 'static>(ctx: &mut SimContext<W>, from: NodeId, to: NodeId, block: Arc<Block>) {
    deliver_block(ctx, from, to, block);
}

/// `BlockMessageTask`: the full-block transfer's arrival (the `AwaitingFullBlock` path).
fn block_message_task_fire<W: Write + 'static>(ctx: &mut SimContext<W>, from: NodeId, to: NodeId, block: Arc<Block>) {
    deliver_block(ctx, from, to, block);
}

/// The `Delivered` state: apply `isReceivedBlockValid` and, if valid, adopt
/// the block as the new tip. An invalid block is silently dropped — it is
/// not an error, and the node's total difficulty never regresses.
fn deliver_block<W: Write + 'static>(ctx: &mut SimContext<W>, from: NodeId, to: NodeId, block: Arc<Block>) {
    ctx.node_mut(to).clear_download_state(&(block.id(), from));
    let powers = ctx.mining_power_snapshot();
    let tip = ctx.node(to).tip().clone();
    let valid = ctx.consensus().is_received_block_valid(&block, Some(&tip), &|id| powers[id as usize]);
    if valid {
        adopt_block(ctx, to, block);
    }
}
