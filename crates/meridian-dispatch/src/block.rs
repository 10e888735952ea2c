//! End-of-block driver.
//!
//! Runs every per-block process in a fixed order, each one iterating its
//! due rows in ascending index order, so replaying the same operation log
//! reproduces the same post-state bit for bit.

use crate::DispatchError;
use meridian_protocol::VirtualOperation;
use meridian_services::ServiceRegistry;
use tracing::debug;

/// Run the per-block processing for the current head block and drain the
/// virtual operations it emitted.
pub fn process_block_end(reg: &mut ServiceRegistry) -> Result<Vec<VirtualOperation>, DispatchError> {
    let now = reg.clock().head_block_time;
    reg.token_sales().process_sales()?;
    reg.funds().allocate_funds()?;
    reg.funds().expire_due_funds()?;
    reg.proposals().clear_expired_proposals(now)?;
    reg.groups().clear_expired_invites(now)?;
    reg.groups().clear_expired_join_requests(now)?;
    reg.ndas().process_windows(now)?;
    reg.contents().close_due_windows(now)?;
    let emitted = reg.drain_virtual_ops();
    debug!(
        block = reg.clock().head_block_number,
        virtual_ops = emitted.len(),
        "block end processed"
    );
    Ok(emitted)
}

/// Advance the clock block by block, running end-of-block processing at
/// each step. Returns everything emitted, in emission order.
pub fn run_blocks(
    reg: &mut ServiceRegistry,
    blocks: u32,
) -> Result<Vec<VirtualOperation>, DispatchError> {
    let mut emitted = Vec::new();
    for _ in 0..blocks {
        reg.advance_clock(1);
        emitted.extend(process_block_end(reg)?);
    }
    Ok(emitted)
}
