//! Viewport tracking and pagination over a sample store.
//!
//! The cursor never owns the store. Every operation that needs the store
//! length takes it as an argument, so the caller decides which lock guards
//! the pair.

use crate::collector::types::Sample;
use crate::core::store::SampleStore;
use crate::error::InvalidConfigError;
use serde::{Deserialize, Serialize};

/// Default number of samples shown at once.
pub const DEFAULT_WINDOW_SIZE: usize = 100;

/// The currently displayed window into the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub offset: usize,
    pub size: usize,
}

impl Viewport {
    /// Largest valid offset for a store of `len` samples.
    pub fn max_offset(&self, len: usize) -> usize {
        len.saturating_sub(self.size)
    }

    /// Whether this viewport shows the newest window of a store of `len`.
    pub fn is_at_latest(&self, len: usize) -> bool {
        self.offset >= self.max_offset(len)
    }
}

/// How the viewport reacts when a refresh appends new samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewportPolicy {
    /// Keep the user's position; the same samples stay on screen when
    /// eviction allows it.
    Preserve,
    /// Always show the newest window after a refresh.
    FollowLatest,
    /// Follow the newest window only if it was already shown before the
    /// refresh.
    #[default]
    FollowUnlessPaging,
}

impl ViewportPolicy {
    /// Parse a policy name as accepted on the command line.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "preserve" => Some(Self::Preserve),
            "follow_latest" | "latest" => Some(Self::FollowLatest),
            "follow_unless_paging" | "follow" => Some(Self::FollowUnlessPaging),
            _ => None,
        }
    }
}

/// Holds a viewport and exposes the pagination operations.
#[derive(Debug, Clone)]
pub struct WindowCursor {
    viewport: Viewport,
    default_size: usize,
}

impl WindowCursor {
    /// Create a cursor at offset 0 with the given window size.
    pub fn new(size: usize) -> Result<Self, InvalidConfigError> {
        if size == 0 {
            return Err(InvalidConfigError::NonPositiveSize);
        }
        Ok(Self {
            viewport: Viewport { offset: 0, size },
            default_size: size,
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Move towards newer samples, clamping to the last full window.
    pub fn advance(&mut self, step: i64, len: usize) -> Result<(), InvalidConfigError> {
        let step = checked_step(step)?;
        let max = self.viewport.max_offset(len);
        self.viewport.offset = self.viewport.offset.saturating_add(step).min(max);
        Ok(())
    }

    /// Move towards older samples, stopping at offset 0.
    pub fn retreat(&mut self, step: i64) -> Result<(), InvalidConfigError> {
        let step = checked_step(step)?;
        self.viewport.offset = self.viewport.offset.saturating_sub(step);
        Ok(())
    }

    /// Change the window size and re-clamp the offset.
    pub fn set_size(&mut self, size: i64, len: usize) -> Result<(), InvalidConfigError> {
        if size <= 0 {
            return Err(InvalidConfigError::NonPositiveSize);
        }
        self.viewport.size = usize::try_from(size).unwrap_or(usize::MAX);
        self.clamp(len);
        Ok(())
    }

    /// Show the newest window.
    pub fn jump_to_latest(&mut self, len: usize) {
        self.viewport.offset = self.viewport.max_offset(len);
    }

    /// Back to offset 0 and the size the cursor was created with.
    pub fn reset(&mut self) {
        self.viewport = Viewport {
            offset: 0,
            size: self.default_size,
        };
    }

    /// Samples currently in view.
    pub fn current_slice(&self, store: &SampleStore) -> Vec<Sample> {
        store.slice(self.viewport.offset, self.viewport.size)
    }

    /// Apply the refresh policy after new samples were appended.
    ///
    /// `len_before` is the store length before the append, `evicted` the
    /// number of samples dropped from the front by a capacity bound.
    pub fn on_data_arrived(
        &mut self,
        len_before: usize,
        len_after: usize,
        evicted: usize,
        policy: ViewportPolicy,
    ) {
        let follow = match policy {
            ViewportPolicy::Preserve => false,
            ViewportPolicy::FollowLatest => true,
            ViewportPolicy::FollowUnlessPaging => self.viewport.is_at_latest(len_before),
        };

        if follow {
            self.jump_to_latest(len_after);
        } else {
            self.viewport.offset = self.viewport.offset.saturating_sub(evicted);
            self.clamp(len_after);
        }
    }

    fn clamp(&mut self, len: usize) {
        self.viewport.offset = self.viewport.offset.min(self.viewport.max_offset(len));
    }
}

fn checked_step(step: i64) -> Result<usize, InvalidConfigError> {
    usize::try_from(step).map_err(|_| InvalidConfigError::NegativeStep(step))
}
