//! Navigation state machine: turns browsing intents into position changes.

pub mod browse;

use std::fmt;

use tracing::{debug, info};

use crate::error::NavigationError;
use crate::types::{Direction, PageSize, Spread, Step};

pub use browse::BrowseMetric;

/// Callback fired once per session when the container counts as browsed.
pub type BrowsedHook = Box<dyn FnMut() + Send>;

/// Current position within an opened container.
///
/// The position is `-1` for an empty container and otherwise stays within
/// `0..total_pages`. Relative moves clamp silently; absolute jumps are validated.
pub struct Navigator {
    total_pages: usize,
    position: isize,
    page_size: PageSize,
    direction: Direction,
    metric: BrowseMetric,
    on_browsed: Option<BrowsedHook>,
}

impl fmt::Debug for Navigator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Navigator")
            .field("total_pages", &self.total_pages)
            .field("position", &self.position)
            .field("page_size", &self.page_size)
            .field("direction", &self.direction)
            .field("metric", &self.metric)
            .field("on_browsed", &self.on_browsed.is_some())
            .finish()
    }
}

impl Navigator {
    pub fn new(total_pages: usize) -> Self {
        Self {
            total_pages,
            position: if total_pages == 0 { -1 } else { 0 },
            page_size: PageSize::default(),
            direction: Direction::default(),
            metric: BrowseMetric::new(total_pages),
            on_browsed: None,
        }
    }

    pub fn with_browsed_hook(mut self, hook: impl FnMut() + Send + 'static) -> Self {
        self.on_browsed = Some(Box::new(hook));
        self
    }

    /// Carry the display settings over from a previous navigator.
    pub fn with_layout(mut self, page_size: PageSize, direction: Direction) -> Self {
        self.page_size = page_size;
        self.direction = direction;
        self
    }

    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    pub fn position(&self) -> isize {
        self.position
    }

    /// Current page index, or `None` when nothing is shown.
    pub fn current(&self) -> Option<usize> {
        usize::try_from(self.position).ok()
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn metric(&self) -> &BrowseMetric {
        &self.metric
    }

    /// Advance. A page step only jumps the whole page size when more than a page size of
    /// pages remain ahead; otherwise it nudges by one so the last spread is not skipped.
    pub fn go_forward(&mut self, step: Step) -> isize {
        let size = self.page_size.pages() as isize;
        let ahead = self.total_pages as isize - 1 - self.position;
        let delta = match step {
            Step::Page if ahead > size => size,
            _ => 1,
        };
        self.move_to(self.position + delta)
    }

    /// Retreat. A page step jumps the whole page size once at least two pages precede.
    pub fn go_back(&mut self, step: Step) -> isize {
        let size = self.page_size.pages() as isize;
        let delta = match step {
            Step::Page if self.position >= 2 => size,
            _ => 1,
        };
        self.move_to(self.position - delta)
    }

    /// Jump to a 1-based page number.
    pub fn go_to_page(&mut self, page: usize) -> Result<isize, NavigationError> {
        if page == 0 || page > self.total_pages {
            return Err(NavigationError::OutOfRange { requested: page, total: self.total_pages });
        }
        Ok(self.move_to(page as isize - 1))
    }

    pub fn set_page_size(&mut self, page_size: PageSize) {
        self.page_size = page_size;
    }

    pub fn set_direction(&mut self, direction: Direction) {
        self.direction = direction;
    }

    /// Page indices for the left and right display slots.
    pub fn spread(&self) -> Spread {
        let Some(current) = self.current() else {
            return Spread::default();
        };

        let next = match self.page_size {
            PageSize::Single => None,
            PageSize::Double => Some(current + 1).filter(|&next| next < self.total_pages),
        };

        match (self.page_size, self.direction) {
            (PageSize::Single, _) => Spread { left: Some(current), right: None },
            (PageSize::Double, Direction::LeftToRight) => Spread { left: Some(current), right: next },
            (PageSize::Double, Direction::RightToLeft) => Spread { left: next, right: Some(current) },
        }
    }

    fn move_to(&mut self, target: isize) -> isize {
        let lower = if self.total_pages == 0 { -1 } else { 0 };
        let upper = self.total_pages as isize - 1;
        let target = target.clamp(lower, upper.max(lower));

        let delta = target - self.position;
        if delta == 0 {
            return self.position;
        }

        debug!(target: "nav", from = self.position, to = target, "position changed");
        self.position = target;

        if self.metric.record(delta) {
            info!(target: "nav", accumulated = self.metric.accumulated(), "container browsed");
            if let Some(hook) = self.on_browsed.as_mut() {
                hook();
            }
        }
        self.position
    }
}
