//! Sequential port allocation for agent capability servers

use std::sync::atomic::{AtomicU16, Ordering};

static NEXT_PORT: AtomicU16 = AtomicU16::new(8001);

/// Hand out the next agent-server port, starting at 8001.
///
/// The process-wide system server uses its own port (`MAIN_MCP_PORT`,
/// default 22222) and never draws from this range.
pub fn next_port() -> u16 {
    NEXT_PORT.fetch_add(1, Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ports_are_strictly_increasing() {
        let a = next_port();
        let b = next_port();
        assert!(b > a);
        assert!(a >= 8001);
    }
}
