/// Inclusive block range scanned in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub from: u64,
    pub to: u64,
}

impl ScanWindow {
    /// Pick the next window, or `None` when there is nothing new to scan.
    ///
    /// The scan resumes *at* the watermark rather than after it, so each
    /// window overlaps the previous one by exactly one block. `to` never
    /// exceeds `safe_head` and never runs more than `window_size` past `from`.
    pub fn next(
        watermark: Option<u64>,
        start_block: u64,
        safe_head: u64,
        window_size: u64,
    ) -> Option<Self> {
        let from = watermark.unwrap_or(start_block);
        let to = std::cmp::min(from.saturating_add(window_size), safe_head);

        if to < from {
            return None;
        }
        if let Some(committed) = watermark {
            if to <= committed {
                return None;
            }
        }

        Some(Self { from, to })
    }

    pub fn block_count(&self) -> u64 {
        self.to - self.from + 1
    }
}

/// The highest block considered safe to scan, `confirmations` behind the head.
pub fn safe_head(head: u64, confirmations: u64) -> u64 {
    head.saturating_sub(confirmations)
}
