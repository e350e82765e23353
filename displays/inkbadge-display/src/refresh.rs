//! Refresh cadence
//!
//! Fast (partial) e-paper updates leave ghosting behind. Every
//! `interval`-th image paint is promoted to a full refresh, which drives the
//! complete waveform and clears accumulated ghosts.

/// Image paints between full refreshes
pub const DEFAULT_FULL_REFRESH_INTERVAL: u16 = 60;

/// Panel update waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RefreshMode {
    /// Short partial update, may ghost
    Fast,
    /// Full ghost-clearing update (slow, flashes the panel)
    Normal,
}

/// Counts image paints since the last full refresh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RefreshCounter {
    count: u16,
    interval: u16,
}

impl Default for RefreshCounter {
    fn default() -> Self {
        Self::new(DEFAULT_FULL_REFRESH_INTERVAL)
    }
}

impl RefreshCounter {
    /// Create a counter promoting every `interval`-th paint
    ///
    /// An interval of 0 or 1 makes every paint a full refresh.
    pub const fn new(interval: u16) -> Self {
        Self { count: 0, interval }
    }

    /// Paints since the last full refresh
    pub fn count(&self) -> u16 {
        self.count
    }

    /// Configured full-refresh interval
    pub fn interval(&self) -> u16 {
        self.interval
    }

    /// Record one image paint and pick the refresh for it
    pub fn record_paint(&mut self) -> RefreshMode {
        self.count = self.count.saturating_add(1);
        if self.count >= self.interval {
            self.count = 0;
            RefreshMode::Normal
        } else {
            RefreshMode::Fast
        }
    }
}
