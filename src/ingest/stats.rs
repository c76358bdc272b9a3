use core::sync::atomic::{AtomicU64, Ordering};

/// Service counters, shared by every connection task
#[derive(Debug, Default)]
pub struct Stats {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    messages: AtomicU64,
    bytes: AtomicU64,
    rejected_streams: AtomicU64,
}

/// Point-in-time copy of [`Stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub total_connections: u64,
    pub active_connections: u64,
    pub messages: u64,
    pub bytes: u64,
    pub rejected_streams: u64,
}

impl Stats {
    /// 增加连接计数，返回的守卫在释放时减少活跃计数
    #[inline]
    pub fn connection_opened(&self) -> ActiveGuard<'_> {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        ActiveGuard { stats: self }
    }

    #[inline(always)]
    pub fn record_bytes(&self, n: usize) { self.bytes.fetch_add(n as u64, Ordering::Relaxed); }

    #[inline(always)]
    pub fn increment_messages(&self) { self.messages.fetch_add(1, Ordering::Relaxed); }

    /// Stream closed because of a framing error
    #[inline(always)]
    pub fn increment_rejected(&self) { self.rejected_streams.fetch_add(1, Ordering::Relaxed); }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            messages: self.messages.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            rejected_streams: self.rejected_streams.load(Ordering::Relaxed),
        }
    }
}

pub struct ActiveGuard<'a> {
    stats: &'a Stats,
}

impl Drop for ActiveGuard<'_> {
    #[inline]
    fn drop(&mut self) { self.stats.active_connections.fetch_sub(1, Ordering::Relaxed); }
}
