//! Headless terminal for driving the event loop in tests.
//!
//! Records every frame drawn and replays scripted input. Each scripted step is
//! released once a given number of frames has been drawn, so a test can say
//! "after the first output appears, press `G`". While a step is releasable the
//! terminal exposes an always-readable pipe as its input descriptor, which
//! wakes the readiness wait just like a real keypress.

use std::collections::VecDeque;
use std::fs::File;
use std::io::Write;
use std::os::fd::{AsFd, BorrowedFd, OwnedFd};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use super::render::{FrameLine, Terminal, TerminalEvent};
use crate::core::errors::Result;

/// One recorded frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub title: String,
    /// `(row, column, text)` as drawn.
    pub lines: Vec<(usize, usize, String)>,
}

impl Frame {
    /// Text of each drawn line, top to bottom.
    pub fn rows(&self) -> Vec<&str> {
        let mut lines: Vec<_> = self.lines.iter().collect();
        lines.sort_by_key(|(row, _, _)| *row);
        lines.into_iter().map(|(_, _, text)| text.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Event(TerminalEvent),
    Resize { columns: usize, rows: usize },
}

#[derive(Debug)]
pub struct ScriptedTerminal {
    columns: usize,
    rows: usize,
    frames: Vec<Frame>,
    drawing: Option<Frame>,
    script: VecDeque<(usize, Step)>,
    wake: OwnedFd,
    _wake_writer: File,
}

impl ScriptedTerminal {
    pub fn new(columns: usize, rows: usize) -> Self {
        let (wake, writer) = nix::unistd::pipe().expect("wake pipe");
        let mut writer = File::from(writer);
        writer.write_all(b"!").expect("prime wake pipe");
        Self {
            columns,
            rows,
            frames: Vec::new(),
            drawing: None,
            script: VecDeque::new(),
            wake,
            _wake_writer: writer,
        }
    }

    fn step_ready(&self) -> bool {
        self.script
            .front()
            .is_some_and(|(after, _)| *after <= self.frames.len())
    }

    /// Deliver `key` once `after_frames` frames have been drawn.
    pub fn key_after(mut self, after_frames: usize, key: KeyCode) -> Self {
        let event = TerminalEvent::Key(KeyEvent::new(key, KeyModifiers::NONE));
        self.script.push_back((after_frames, Step::Event(event)));
        self
    }

    pub fn char_after(self, after_frames: usize, c: char) -> Self {
        self.key_after(after_frames, KeyCode::Char(c))
    }

    /// Change the screen size (and report a resize) once `after_frames` frames
    /// have been drawn.
    pub fn resize_after(mut self, after_frames: usize, columns: usize, rows: usize) -> Self {
        self.script
            .push_back((after_frames, Step::Resize { columns, rows }));
        self
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn last_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn script_finished(&self) -> bool {
        self.script.is_empty()
    }
}

impl Terminal for ScriptedTerminal {
    fn screen_size(&self) -> Result<(usize, usize)> {
        Ok((self.columns, self.rows))
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.drawing = Some(Frame::default());
        Ok(())
    }

    fn draw_title_bar(&mut self, title: &str) -> Result<()> {
        if let Some(frame) = self.drawing.as_mut() {
            frame.title = title.to_string();
        }
        Ok(())
    }

    fn draw_lines(&mut self, lines: &[FrameLine<'_>]) -> Result<()> {
        if let Some(frame) = self.drawing.as_mut() {
            frame
                .lines
                .extend(lines.iter().map(|l| (l.row, l.column, l.text.to_string())));
        }
        Ok(())
    }

    fn end_frame(&mut self) -> Result<()> {
        if let Some(frame) = self.drawing.take() {
            self.frames.push(frame);
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Result<Option<TerminalEvent>> {
        if !self.step_ready() {
            return Ok(None);
        }
        let Some((_, step)) = self.script.pop_front() else {
            return Ok(None);
        };
        Ok(Some(match step {
            Step::Event(event) => event,
            Step::Resize { columns, rows } => {
                self.columns = columns;
                self.rows = rows;
                TerminalEvent::Resize
            }
        }))
    }

    fn input_fd(&self) -> Option<BorrowedFd<'_>> {
        self.step_ready().then(|| self.wake.as_fd())
    }
}
