//! Frame composition and the terminal boundary the event loop draws through.
//!
//! Composition is pure: [`compose_title`] and [`frame_lines`] turn titles, an
//! index and a viewport into screen text. A [`Terminal`] only places that text.

#![allow(missing_docs)]

use std::io::{self, BufWriter, Stdin, Stdout, Write};
use std::os::fd::{AsFd, BorrowedFd};
use std::time::Duration;

use crossterm::event::{self, Event, KeyEvent};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{BeginSynchronizedUpdate, Clear, ClearType, EndSynchronizedUpdate};
use crossterm::{cursor::MoveTo, queue};

use crate::core::errors::{FollowError, Result};
use crate::pager::index::LineIndex;
use crate::pager::viewport::{Bounds, Viewport};

/// Rows taken by the title bar above the output.
pub const TITLE_HEIGHT: usize = 1;

const ELLIPSIS: &str = "...";

/// Input observed by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalEvent {
    Key(KeyEvent),
    Resize,
    /// Anything else (mouse, focus, paste); consumed and ignored.
    Other,
}

/// One piece of output placed on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLine<'a> {
    pub row: usize,
    pub column: usize,
    pub text: &'a str,
}

/// What the event loop needs from a terminal.
pub trait Terminal {
    /// `(columns, rows)`.
    fn screen_size(&self) -> Result<(usize, usize)>;
    fn begin_frame(&mut self) -> Result<()>;
    /// `title` is already exactly one screen row wide.
    fn draw_title_bar(&mut self, title: &str) -> Result<()>;
    fn draw_lines(&mut self, lines: &[FrameLine<'_>]) -> Result<()>;
    fn end_frame(&mut self) -> Result<()>;
    /// Next pending input event without blocking.
    fn poll_event(&mut self) -> Result<Option<TerminalEvent>>;
    /// Descriptor to include in the readiness wait, if any.
    fn input_fd(&self) -> Option<BorrowedFd<'_>>;
}

/// Lay out the title row: `right` right-aligned, `left` from column 0,
/// truncated with `...` when the two would collide and dropped when fewer than
/// five columns remain. When `right` alone is wider than the screen, its
/// leading part is cut off.
#[must_use]
pub fn compose_title(left: &str, right: &str, width: usize) -> String {
    let left: Vec<char> = left.chars().map(printable).collect();
    let right: Vec<char> = right.chars().map(printable).collect();

    if right.len() > width {
        return right[right.len() - width..].iter().collect();
    }

    let right_start = width - right.len();
    let mut row = String::with_capacity(width);
    let mut used = 0;
    if right_start > left.len() {
        row.extend(&left);
        used = left.len();
    } else if right_start > ELLIPSIS.len() + 1 {
        let keep = right_start - ELLIPSIS.len() - 1;
        row.extend(&left[..keep]);
        row.push_str(ELLIPSIS);
        used = keep + ELLIPSIS.len();
    }
    row.extend(std::iter::repeat_n(' ', right_start - used));
    row.extend(&right);
    row
}

fn printable(c: char) -> char {
    if c.is_control() { ' ' } else { c }
}

/// Output lines visible through `viewport`, in screen coordinates (the title
/// bar occupies row 0).
#[must_use]
pub fn frame_lines<'a>(index: &'a LineIndex, viewport: &Viewport, bounds: &Bounds) -> Vec<FrameLine<'a>> {
    let Some(rows) = viewport.rows(bounds) else {
        return Vec::new();
    };
    (0..rows.count)
        .filter_map(|i| {
            let row = rows.first + i;
            let columns = viewport.columns(bounds, index.line_width(row)?)?;
            let line = index.line(row)?;
            Some(FrameLine {
                row: TITLE_HEIGHT + rows.screen_offset + i,
                column: columns.screen_offset,
                text: char_slice(line, columns.first, columns.count),
            })
        })
        .collect()
}

/// Draw one complete frame. The viewport is reconciled against the current
/// screen size and content first.
pub fn render_frame<T: Terminal + ?Sized>(
    terminal: &mut T,
    left_title: &str,
    right_title: &str,
    index: &LineIndex,
    viewport: &mut Viewport,
) -> Result<()> {
    let (width, height) = terminal.screen_size()?;
    let bounds = Bounds::new(
        height.saturating_sub(TITLE_HEIGHT),
        width,
        index.max_height(),
        index.max_width(),
    );
    viewport.reconcile(&bounds);

    terminal.begin_frame()?;
    if height > 0 {
        terminal.draw_title_bar(&compose_title(left_title, right_title, width))?;
    }
    terminal.draw_lines(&frame_lines(index, viewport, &bounds))?;
    terminal.end_frame()
}

/// Columns are characters after indexing, so slicing by char is slicing by column.
fn char_slice(s: &str, first: usize, count: usize) -> &str {
    let start = s.char_indices().nth(first).map_or(s.len(), |(i, _)| i);
    let rest = &s[start..];
    let end = rest.char_indices().nth(count).map_or(rest.len(), |(i, _)| i);
    &rest[..end]
}

// ──────────────────── crossterm terminal ────────────────────

/// The process's controlling terminal, drawn with crossterm.
///
/// Expects raw mode and the alternate screen to be set up by a
/// [`TerminalGuard`](super::terminal_guard::TerminalGuard).
pub struct CrosstermTerminal {
    out: BufWriter<Stdout>,
    stdin: Stdin,
}

impl CrosstermTerminal {
    #[must_use]
    pub fn new() -> Self {
        Self {
            out: BufWriter::with_capacity(64 * 1024, io::stdout()),
            stdin: io::stdin(),
        }
    }
}

impl Default for CrosstermTerminal {
    fn default() -> Self {
        Self::new()
    }
}

fn terminal_error(source: io::Error) -> FollowError {
    FollowError::Terminal { source }
}

fn to_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

impl Terminal for CrosstermTerminal {
    fn screen_size(&self) -> Result<(usize, usize)> {
        let (columns, rows) = crossterm::terminal::size().map_err(terminal_error)?;
        Ok((usize::from(columns), usize::from(rows)))
    }

    fn begin_frame(&mut self) -> Result<()> {
        queue!(self.out, BeginSynchronizedUpdate, Clear(ClearType::All)).map_err(terminal_error)
    }

    fn draw_title_bar(&mut self, title: &str) -> Result<()> {
        queue!(
            self.out,
            MoveTo(0, 0),
            SetAttribute(Attribute::Reverse),
            Print(title),
            SetAttribute(Attribute::Reset)
        )
        .map_err(terminal_error)
    }

    fn draw_lines(&mut self, lines: &[FrameLine<'_>]) -> Result<()> {
        for line in lines {
            queue!(
                self.out,
                MoveTo(to_u16(line.column), to_u16(line.row)),
                Print(line.text)
            )
            .map_err(terminal_error)?;
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        queue!(self.out, EndSynchronizedUpdate).map_err(terminal_error)?;
        self.out.flush().map_err(terminal_error)
    }

    fn poll_event(&mut self) -> Result<Option<TerminalEvent>> {
        if !event::poll(Duration::ZERO).map_err(terminal_error)? {
            return Ok(None);
        }
        let event = match event::read().map_err(terminal_error)? {
            Event::Key(key) => TerminalEvent::Key(key),
            Event::Resize(..) => TerminalEvent::Resize,
            _ => TerminalEvent::Other,
        };
        Ok(Some(event))
    }

    fn input_fd(&self) -> Option<BorrowedFd<'_>> {
        Some(self.stdin.as_fd())
    }
}
