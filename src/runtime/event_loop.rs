//! The single-threaded loop that multiplexes keyboard input, child output and
//! the refresh timer.
//!
//! Each iteration:
//! 1. stop if a signal or the quit key asked for it;
//! 2. when no child runs, start a cycle if a refresh is due or requested;
//! 3. draw if anything visible changed;
//! 4. wait for keyboard or child output (no timeout while a child runs,
//!    otherwise until the refresh deadline);
//! 5. read child output once if it is ready, publishing the cycle at end of
//!    stream;
//! 6. drain and apply every pending input event.
//!
//! The wait is the only place the loop blocks. Output is decoded only after the
//! stream has ended and the child has been reaped.

#![allow(missing_docs)]

use std::time::{Duration, Instant};

use crate::core::config::Config;
use crate::core::errors::Result;
use crate::logger::jsonl::{EventType, JsonlWriter, LogEntry, Severity};
use crate::pager::index::{LineIndex, TextIndexer};
use crate::pager::keys::{self, KeyAction};
use crate::pager::viewport::{Bounds, Viewport};
use crate::process::runner::CommandSpec;
use crate::runtime::cycle::{CycleResult, RunningCycle, Titles};
use crate::runtime::schedule::{RefreshRequest, RefreshTimer};
use crate::runtime::signals::SignalHandler;
use crate::tui::readiness::wait_ready;
use crate::tui::render::{self, TITLE_HEIGHT, Terminal, TerminalEvent};

/// Fixed inputs of a session.
#[derive(Debug, Clone)]
pub struct LoopSettings {
    pub command: CommandSpec,
    pub interval: Duration,
    pub byte_limit: Option<usize>,
    pub indexer: TextIndexer,
    /// Kill an in-flight child on exit instead of leaving it running.
    pub kill_child_on_exit: bool,
}

impl LoopSettings {
    #[must_use]
    pub fn from_config(config: &Config, command: CommandSpec) -> Self {
        Self {
            command,
            interval: config.refresh.interval(),
            byte_limit: config.output.byte_limit(),
            indexer: TextIndexer::new(config.output.decode, config.output.tab_width),
            kill_child_on_exit: config.command.kill_child_on_exit,
        }
    }
}

/// Why [`EventLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Quit,
    Signal,
}

/// Everything the loop mutates between iterations.
#[derive(Debug)]
struct LoopState {
    viewport: Viewport,
    timer: RefreshTimer,
    request: RefreshRequest,
    running: Option<RunningCycle>,
    published: Option<CycleResult>,
    cycles: u64,
    quit: bool,
    dirty: bool,
}

pub struct EventLoop<T: Terminal> {
    settings: LoopSettings,
    terminal: T,
    signals: SignalHandler,
    log: JsonlWriter,
    state: LoopState,
}

impl<T: Terminal> EventLoop<T> {
    pub fn new(settings: LoopSettings, terminal: T, signals: SignalHandler, log: JsonlWriter) -> Self {
        let timer = RefreshTimer::new(settings.interval, Instant::now());
        Self {
            settings,
            terminal,
            signals,
            log,
            state: LoopState {
                viewport: Viewport::default(),
                timer,
                request: RefreshRequest::None,
                running: None,
                published: None,
                cycles: 0,
                quit: false,
                dirty: false,
            },
        }
    }

    pub fn terminal(&self) -> &T {
        &self.terminal
    }

    pub fn viewport(&self) -> Viewport {
        self.state.viewport
    }

    /// Latest published cycle.
    pub fn published(&self) -> Option<&CycleResult> {
        self.state.published.as_ref()
    }

    /// Cycles published so far.
    pub fn cycles(&self) -> u64 {
        self.state.cycles
    }

    /// Run until quit or a terminating signal. An in-flight child is handled
    /// per [`LoopSettings::kill_child_on_exit`] on every exit path.
    pub fn run(&mut self) -> Result<ExitReason> {
        let mut entry = LogEntry::new(EventType::SessionStart, Severity::Info);
        entry.command = Some(self.settings.command.display().to_string());
        entry.interval_secs = Some(self.settings.interval.as_secs_f64());
        self.log.write_entry(&entry);

        self.state.request = RefreshRequest::Forced;
        let outcome = self.run_until_exit();
        self.shutdown();
        outcome
    }

    fn run_until_exit(&mut self) -> Result<ExitReason> {
        loop {
            if self.signals.should_shutdown() {
                return Ok(ExitReason::Signal);
            }
            if self.state.quit {
                return Ok(ExitReason::Quit);
            }

            let now = Instant::now();
            if self.state.running.is_none() {
                if self.state.timer.is_due(now) {
                    self.state.request = self.state.request.merge(RefreshRequest::Scheduled);
                }
                if self.state.request.is_pending() {
                    self.start_cycle(now);
                }
            }

            if self.state.dirty {
                self.draw()?;
            }

            let timeout = if self.state.running.is_some() {
                None
            } else {
                Some(self.state.timer.remaining(Instant::now()))
            };
            let ready = wait_ready(
                self.terminal.input_fd(),
                self.state.running.as_ref().and_then(RunningCycle::output_fd),
                timeout,
            )?;

            if ready.output {
                self.collect();
            }
            self.drain_input()?;
        }
    }

    fn start_cycle(&mut self, now: Instant) {
        let request = std::mem::take(&mut self.state.request);
        self.state.timer.on_cycle_start(request, now);
        let titles = Titles::capture(&self.settings.command);
        match RunningCycle::start(&self.settings.command, self.settings.byte_limit, titles, now) {
            Ok(cycle) => self.state.running = Some(cycle),
            Err(result) => self.publish(result),
        }
    }

    fn collect(&mut self) {
        let done = self.state.running.as_mut().is_some_and(RunningCycle::pump);
        if !done {
            return;
        }
        if let Some(cycle) = self.state.running.take() {
            let result = cycle.finish(&self.settings.indexer);
            self.publish(result);
        }
    }

    fn publish(&mut self, result: CycleResult) {
        self.log.write_entry(&self.cycle_entry(&result));
        self.state.cycles += 1;
        self.state.published = Some(result);
        self.state.dirty = true;
    }

    fn cycle_entry(&self, result: &CycleResult) -> LogEntry {
        let event = if result.is_ok() {
            EventType::CycleComplete
        } else {
            EventType::CycleFailed
        };
        let severity = if result.is_ok() {
            Severity::Info
        } else {
            Severity::Warning
        };
        let mut entry = LogEntry::new(event, severity);
        entry.command = Some(self.settings.command.display().to_string());
        entry.duration_ms = Some(u64::try_from(result.stats.duration.as_millis()).unwrap_or(u64::MAX));
        entry.bytes = Some(result.stats.bytes as u64);
        entry.discarded_bytes = (result.stats.discarded > 0).then_some(result.stats.discarded as u64);
        entry.exit_code = result.stats.exit_code;
        match &result.error {
            Some(error) => entry.with_error(error),
            None => {
                entry.ok = Some(true);
                entry.lines = Some(result.index.max_height() as u64);
                entry
            }
        }
    }

    fn drain_input(&mut self) -> Result<()> {
        while let Some(event) = self.terminal.poll_event()? {
            match event {
                TerminalEvent::Key(key) => match keys::resolve_key_event(&key) {
                    Some(KeyAction::Quit) => self.state.quit = true,
                    Some(KeyAction::RefreshNow) => {
                        self.state.request = self.state.request.merge(RefreshRequest::Forced);
                    }
                    Some(KeyAction::Scroll(intent)) => {
                        let bounds = self.bounds()?;
                        self.state.viewport.apply(intent, &bounds);
                        self.state.dirty = true;
                    }
                    None => {}
                },
                TerminalEvent::Resize => self.state.dirty = true,
                TerminalEvent::Other => {}
            }
        }
        Ok(())
    }

    /// Bounds of the frame currently on screen.
    fn bounds(&self) -> Result<Bounds> {
        let (width, height) = self.terminal.screen_size()?;
        let empty = LineIndex::empty();
        let index = self.state.published.as_ref().map_or(&empty, |r| &r.index);
        Ok(Bounds::new(
            height.saturating_sub(TITLE_HEIGHT),
            width,
            index.max_height(),
            index.max_width(),
        ))
    }

    fn draw(&mut self) -> Result<()> {
        self.state.dirty = false;
        let Some(result) = self.state.published.as_ref() else {
            return Ok(());
        };
        render::render_frame(
            &mut self.terminal,
            &result.titles.left,
            &result.titles.right,
            &result.index,
            &mut self.state.viewport,
        )
    }

    fn shutdown(&mut self) {
        if let Some(cycle) = self.state.running.take() {
            cycle.abandon(self.settings.kill_child_on_exit);
        }
        let mut entry = LogEntry::new(EventType::SessionStop, Severity::Info);
        entry.command = Some(self.settings.command.display().to_string());
        entry.cycles = Some(self.state.cycles);
        self.log.write_entry(&entry);
        self.log.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;

    use crossterm::event::KeyCode;

    use crate::logger::jsonl::JsonlConfig;
    use crate::tui::test_harness::ScriptedTerminal;

    fn settings(script: &str, interval: Duration) -> LoopSettings {
        LoopSettings {
            command: CommandSpec::shell(Path::new("/bin/sh"), &[script.to_string()]).unwrap(),
            interval,
            byte_limit: None,
            indexer: TextIndexer::default(),
            kill_child_on_exit: true,
        }
    }

    const LONG: Duration = Duration::from_secs(3600);

    fn run(settings: LoopSettings, terminal: ScriptedTerminal) -> (EventLoop<ScriptedTerminal>, ExitReason) {
        let mut event_loop = EventLoop::new(
            settings,
            terminal,
            SignalHandler::detached(),
            JsonlWriter::disabled(),
        );
        let reason = event_loop.run().unwrap();
        (event_loop, reason)
    }

    #[test]
    fn first_cycle_is_drawn_then_quit() {
        let terminal = ScriptedTerminal::new(40, 5).char_after(1, 'q');
        let (event_loop, reason) = run(settings("printf 'a\\nb\\n'", LONG), terminal);

        assert_eq!(reason, ExitReason::Quit);
        assert_eq!(event_loop.cycles(), 1);
        let frame = event_loop.terminal().last_frame().unwrap();
        assert_eq!(frame.rows(), ["a", "b"]);
        assert_eq!(frame.title.chars().count(), 40);
        assert!(frame.title.contains("printf"));
    }

    #[test]
    fn signal_stops_before_any_cycle() {
        let signals = SignalHandler::detached();
        signals.request_shutdown();
        let mut event_loop = EventLoop::new(
            settings("echo never", LONG),
            ScriptedTerminal::new(40, 5),
            signals,
            JsonlWriter::disabled(),
        );
        assert_eq!(event_loop.run().unwrap(), ExitReason::Signal);
        assert_eq!(event_loop.cycles(), 0);
        assert!(event_loop.terminal().frames().is_empty());
    }

    #[test]
    fn refresh_key_starts_cycle_immediately() {
        let terminal = ScriptedTerminal::new(40, 5)
            .char_after(1, 'r')
            .char_after(2, 'q');
        let started = Instant::now();
        let (event_loop, _) = run(settings("echo tick", LONG), terminal);

        assert_eq!(event_loop.cycles(), 2);
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn refresh_during_running_cycle_stays_pending() {
        let terminal = ScriptedTerminal::new(40, 5)
            .char_after(0, 'r')
            .char_after(2, 'q');
        let (event_loop, _) = run(settings("sleep 0.2; echo done", LONG), terminal);

        assert_eq!(event_loop.cycles(), 2);
        assert_eq!(event_loop.terminal().last_frame().unwrap().rows(), ["done"]);
    }

    #[test]
    fn timer_refreshes_without_input() {
        let terminal = ScriptedTerminal::new(40, 5).char_after(4, 'q');
        let (event_loop, _) = run(settings("echo tick", Duration::from_millis(20)), terminal);
        assert!(event_loop.cycles() >= 4);
    }

    #[test]
    fn spawn_failure_is_shown_in_place_of_output() {
        let mut settings = settings("unused", LONG);
        settings.command = CommandSpec::direct(vec!["/nonexistent/follow-loop-test".into()]).unwrap();
        let terminal = ScriptedTerminal::new(80, 5).char_after(1, 'q');
        let (event_loop, _) = run(settings, terminal);

        let frame = event_loop.terminal().last_frame().unwrap();
        assert!(frame.rows()[0].contains("FLW-2001"));
        assert!(!event_loop.published().unwrap().is_ok());
    }

    #[test]
    fn jump_to_end_then_resize() {
        let terminal = ScriptedTerminal::new(20, 4)
            .char_after(1, 'G')
            .resize_after(2, 20, 3)
            .char_after(3, 'q');
        let (event_loop, _) = run(settings("seq 0 9", LONG), terminal);

        let frames = event_loop.terminal().frames();
        assert_eq!(frames[0].rows(), ["0", "1", "2"]);
        assert_eq!(frames[1].rows(), ["7", "8", "9"]);
        assert_eq!(frames.last().unwrap().rows(), ["7", "8"]);
        assert_eq!(event_loop.viewport().vertical(), 7);
        assert!(event_loop.terminal().script_finished());
    }

    #[test]
    fn scrolling_past_the_end_is_not_undone_by_redraws() {
        let terminal = ScriptedTerminal::new(20, 4)
            .char_after(1, 'J')
            .char_after(2, 'J')
            .char_after(3, 'J')
            .char_after(4, 'J')
            .char_after(5, 'q');
        let (event_loop, _) = run(settings("seq 0 3", LONG), terminal);

        assert!(event_loop.terminal().script_finished());
        let rows: Vec<Vec<&str>> = event_loop.terminal().frames().iter().map(|f| f.rows()).collect();
        let expected: [&[&str]; 5] = [&["0", "1", "2"], &["1", "2", "3"], &["2", "3"], &["3"], &[]];
        assert_eq!(rows, expected);
        assert_eq!(event_loop.viewport().vertical(), 4);
    }

    #[test]
    fn pinned_view_follows_growing_output() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("grow.txt");
        fs::write(&file, b"").unwrap();
        let script = format!(
            "echo \"line $(wc -l < '{0}')\" >> '{0}'; cat '{0}'; echo end",
            file.display()
        );
        let terminal = ScriptedTerminal::new(20, 4)
            .char_after(1, 'F')
            .char_after(6, 'q');
        let (event_loop, _) = run(settings(&script, Duration::from_millis(20)), terminal);

        assert!(event_loop.viewport().is_pinned());
        let frames = event_loop.terminal().frames();
        for frame in &frames[2..] {
            let rows = frame.rows();
            assert_eq!(rows.last(), Some(&"end"), "frame {rows:?}");
        }
        assert_eq!(frames.last().unwrap().rows().len(), 3);
    }

    #[test]
    fn quit_kills_running_child() {
        let terminal = ScriptedTerminal::new(40, 5).char_after(0, 'q');
        let started = Instant::now();
        let (event_loop, reason) = run(settings("sleep 30", LONG), terminal);
        assert_eq!(reason, ExitReason::Quit);
        assert_eq!(event_loop.cycles(), 0);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn session_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("follow.jsonl");
        let log = JsonlWriter::open(JsonlConfig {
            path: path.clone(),
            fallback_path: None,
            max_size_bytes: 1024 * 1024,
            max_rotated_files: 2,
        });
        let mut event_loop = EventLoop::new(
            settings("printf 'x\\ny\\n'", LONG),
            ScriptedTerminal::new(40, 5).key_after(1, KeyCode::Char('q')),
            SignalHandler::detached(),
            log,
        );
        event_loop.run().unwrap();
        drop(event_loop);

        let events: Vec<serde_json::Value> = fs::read_to_string(&path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let names: Vec<_> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
        assert_eq!(names, ["session_start", "cycle_complete", "session_stop"]);
        assert_eq!(events[1]["lines"], 2);
        assert_eq!(events[1]["bytes"], 4);
        assert_eq!(events[1]["exit_code"], 0);
        assert_eq!(events[2]["cycles"], 1);
    }
}
