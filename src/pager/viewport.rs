//! Scroll state and movement rules. Pure: no terminal or process access.
//!
//! Offsets are signed. A relative move without `past_end` is clamped to
//! `[0, max(content - display, 0)]` and never moves against its direction, so a
//! view that already sits outside that range (after an unclamped move) is not
//! yanked back by an ordinary step. A view the user pushed past the content
//! with a `past_end` move stays there (and may draw nothing); other offsets at
//! or past the content end are pulled back to the last page once per frame by
//! [`Viewport::reconcile`].

#![allow(missing_docs)]

/// Content and screen dimensions for the frame being drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bounds {
    pub display_height: i64,
    pub display_width: i64,
    pub max_height: i64,
    pub max_width: i64,
}

impl Bounds {
    #[must_use]
    pub fn new(display_height: usize, display_width: usize, max_height: usize, max_width: usize) -> Self {
        Self {
            display_height: to_i64(display_height),
            display_width: to_i64(display_width),
            max_height: to_i64(max_height),
            max_width: to_i64(max_width),
        }
    }

    /// Vertical offset that puts the last line on the last row.
    #[must_use]
    pub fn end_offset(&self) -> i64 {
        (self.max_height - self.display_height).max(0)
    }

    fn end_column(&self) -> i64 {
        (self.max_width - self.display_width).max(0)
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Line,
    Page,
    HalfPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Backward,
    Forward,
}

/// A named movement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollIntent {
    Vertical {
        step: Step,
        direction: Direction,
        past_end: bool,
    },
    Horizontal {
        step: Step,
        direction: Direction,
        past_end: bool,
    },
    /// Top of the output; clears the pin.
    Start,
    /// Offset set to the line count, reconciled to the last page at draw time;
    /// clears the pin.
    End,
    /// Follow the newest output until the next vertical movement.
    PinToEnd,
}

impl ScrollIntent {
    #[must_use]
    pub const fn up(step: Step) -> Self {
        Self::Vertical {
            step,
            direction: Direction::Backward,
            past_end: false,
        }
    }

    #[must_use]
    pub const fn down(step: Step) -> Self {
        Self::Vertical {
            step,
            direction: Direction::Forward,
            past_end: false,
        }
    }
}

/// Vertical/horizontal offsets plus the pin-to-end flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    vertical: i64,
    horizontal: i64,
    pinned_to_end: bool,
    /// The vertical offset came from a `past_end` move and is left as is.
    overshoot: bool,
}

impl Viewport {
    #[must_use]
    pub const fn vertical(&self) -> i64 {
        self.vertical
    }

    #[must_use]
    pub const fn horizontal(&self) -> i64 {
        self.horizontal
    }

    #[must_use]
    pub const fn is_pinned(&self) -> bool {
        self.pinned_to_end
    }

    /// Apply one movement against the current frame's bounds.
    pub fn apply(&mut self, intent: ScrollIntent, bounds: &Bounds) {
        match intent {
            ScrollIntent::Vertical {
                step,
                direction,
                past_end,
            } => {
                if self.pinned_to_end {
                    self.vertical = bounds.end_offset();
                    self.pinned_to_end = false;
                }
                let delta = step_delta(step, direction, bounds.display_height);
                self.vertical = relative(self.vertical, delta, bounds.end_offset(), past_end);
                self.overshoot = past_end;
            }
            ScrollIntent::Horizontal {
                step,
                direction,
                past_end,
            } => {
                let delta = step_delta(step, direction, bounds.display_width);
                self.horizontal = relative(self.horizontal, delta, bounds.end_column(), past_end);
            }
            ScrollIntent::Start => {
                self.vertical = 0;
                self.pinned_to_end = false;
                self.overshoot = false;
            }
            ScrollIntent::End => {
                self.vertical = bounds.max_height;
                self.pinned_to_end = false;
                self.overshoot = false;
            }
            ScrollIntent::PinToEnd => {
                self.pinned_to_end = true;
                self.overshoot = false;
                self.vertical = bounds.end_offset();
            }
        }
    }

    /// Frame-time fix-up against possibly changed bounds.
    ///
    /// A pinned view follows the end. An offset at or past the end of the
    /// content (a jump to the end, or a cycle that produced fewer lines) is
    /// pulled back to the last page so the newest lines stay visible, unless
    /// the user deliberately scrolled past the end.
    pub fn reconcile(&mut self, bounds: &Bounds) {
        let beyond_content = self.vertical >= bounds.max_height && !self.overshoot;
        if self.pinned_to_end || beyond_content {
            self.vertical = bounds.end_offset();
        }
        if self.horizontal >= bounds.max_width {
            self.horizontal = bounds.end_column();
        }
    }

    /// Rows of content to draw for this frame.
    #[must_use]
    pub fn rows(&self, bounds: &Bounds) -> Option<VisibleSpan> {
        visible_span(self.vertical, bounds.display_height, bounds.max_height)
    }

    /// Columns of a line `line_width` wide to draw for this frame.
    #[must_use]
    pub fn columns(&self, bounds: &Bounds, line_width: usize) -> Option<VisibleSpan> {
        visible_span(self.horizontal, bounds.display_width, to_i64(line_width))
    }
}

/// Part of a content dimension that lands on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleSpan {
    /// First content index shown.
    pub first: usize,
    /// Screen position (row or column) where it is drawn.
    pub screen_offset: usize,
    /// Number of items drawn.
    pub count: usize,
}

/// Slice of `[0, content)` visible at `offset` through a window of `display`.
///
/// Offsets in `(-display, content)` are drawable; a negative offset leaves blank
/// space before the content starts. Anything else shows nothing.
#[must_use]
pub fn visible_span(offset: i64, display: i64, content: i64) -> Option<VisibleSpan> {
    if display <= 0 || offset <= -display || offset >= content {
        return None;
    }
    let first = offset.max(0);
    let end = offset.saturating_add(display).min(content);
    if end <= first {
        return None;
    }
    Some(VisibleSpan {
        first: usize::try_from(first).ok()?,
        screen_offset: usize::try_from((-offset).max(0)).ok()?,
        count: usize::try_from(end - first).ok()?,
    })
}

fn step_delta(step: Step, direction: Direction, display: i64) -> i64 {
    let magnitude = match step {
        Step::Line => 1,
        Step::Page => display,
        Step::HalfPage => display / 2,
    };
    match direction {
        Direction::Forward => magnitude,
        Direction::Backward => -magnitude,
    }
}

fn relative(offset: i64, delta: i64, end: i64, past_end: bool) -> i64 {
    if past_end {
        offset.saturating_add(delta)
    } else if delta > 0 {
        offset.max(offset.saturating_add(delta).min(end))
    } else if delta < 0 {
        offset.min(offset.saturating_add(delta).max(0))
    } else {
        offset
    }
}
