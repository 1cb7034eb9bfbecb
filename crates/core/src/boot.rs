//! Boot monitor: watches the console until the OS reaches a login prompt.

use std::time::{Duration, Instant};

use tracing::info;

use bringup_expect::Session;

use crate::error::Result;
use crate::milestone::Milestone;

/// A cold boot on FPGA silicon is slow; give it a generous budget.
pub const BOOT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

const LOGIN_PROMPT: &str = "login:";
const KERNEL_PANIC: &str = "panic: trap";
const KERNEL_PANIC_DEBUGGER: &str = "KDB: enter: panic";

/// Blocks until the console shows a login prompt or a recognized boot
/// failure. `start` is when the target was released, for boot timing.
pub async fn wait_for_login(console: &mut Session, start: Instant) -> Result<()> {
	Milestone::exact("login prompt", LOGIN_PROMPT)
		.or_fail(KERNEL_PANIC)
		.or_fail(KERNEL_PANIC_DEBUGGER)
		.within(BOOT_TIMEOUT)
		.confirm(console)
		.await?;
	info!(elapsed = ?start.elapsed(), "target booted to login prompt");
	Ok(())
}
