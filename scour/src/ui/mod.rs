pub mod navigate;
pub mod terminal;

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    cursor::MoveTo,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetForegroundColor},
    terminal::{Clear, ClearType},
};
use tracing::debug;

use crate::context::{subsearch, SearchContext};
use crate::editor;
use crate::errors::Result;
use crate::search::Engine;
use crate::store::Entry;
use navigate::Viewport;
use terminal::TerminalGuard;

const TICK: Duration = Duration::from_millis(10);
const SPINNER: [char; 4] = ['/', '-', '\\', '|'];
const PROMPT_WIDTH: u16 = 50;

/// What a key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Up,
    Down,
    PageUp,
    PageDown,
    Open,
    Subsearch,
    Back,
    Interrupt,
    None,
}

/// Both arrow keys and the vim-style letters drive the list.
pub fn action_for(key: &KeyEvent) -> Action {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Action::Interrupt,
            _ => Action::None,
        };
    }
    match key.code {
        KeyCode::Up | KeyCode::Char('k') => Action::Up,
        KeyCode::Down | KeyCode::Char('j') => Action::Down,
        KeyCode::PageUp | KeyCode::Char('K') => Action::PageUp,
        KeyCode::PageDown | KeyCode::Char('J') => Action::PageDown,
        KeyCode::Enter | KeyCode::Char('p') => Action::Open,
        KeyCode::Char('/') => Action::Subsearch,
        KeyCode::Char('q') => Action::Back,
        _ => Action::None,
    }
}

/// How the session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Quit,
    Interrupted,
}

/// The interactive session: a stack of search contexts over one running
/// engine, rendered from the main thread.
pub struct App {
    engine: Engine,
    contexts: Vec<SearchContext>,
    editor_template: String,
    case_suffix: &'static str,
    shutdown: Arc<AtomicBool>,
    rows: u16,
    cols: u16,
    spinner: usize,
    message: Option<String>,
    last_drawn: Option<(usize, u64)>,
}

impl App {
    pub fn new(
        engine: Engine,
        pattern: String,
        is_regex: bool,
        insensitive: bool,
        editor_template: String,
    ) -> Self {
        let root = SearchContext::new(pattern, is_regex, Arc::clone(engine.store()));
        Self {
            engine,
            contexts: vec![root],
            editor_template,
            case_suffix: if insensitive { "\\c" } else { "" },
            shutdown: Arc::new(AtomicBool::new(false)),
            rows: 24,
            cols: 80,
            spinner: 0,
            message: None,
            last_drawn: None,
        }
    }

    pub fn run(mut self) -> Result<Outcome> {
        let mut guard = TerminalGuard::new()?;
        terminal::install_signal_handler(guard.restorer(), Arc::clone(&self.shutdown))?;
        if let Ok((cols, rows)) = crossterm::terminal::size() {
            self.cols = cols;
            self.rows = rows;
        }

        let mut out = io::stdout();
        let outcome = self.event_loop(&mut out, &mut guard);

        drop(guard);
        self.engine.request_stop();
        self.engine.join();
        outcome
    }

    fn event_loop(&mut self, out: &mut io::Stdout, guard: &mut TerminalGuard) -> Result<Outcome> {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("shutdown requested");
                return Ok(Outcome::Interrupted);
            }

            let mut force_redraw = false;
            if event::poll(TICK)? {
                match event::read()? {
                    Event::Key(key) => {
                        self.message = None;
                        match action_for(&key) {
                            Action::Interrupt => return Ok(Outcome::Interrupted),
                            Action::Back => {
                                if self.contexts.len() > 1 {
                                    self.contexts.pop();
                                } else {
                                    return Ok(Outcome::Quit);
                                }
                            }
                            Action::Open => self.open_selection(guard)?,
                            Action::Subsearch => self.prompt_subsearch(out)?,
                            Action::None => {}
                            action => self.navigate(action),
                        }
                        force_redraw = true;
                    }
                    Event::Resize(cols, rows) => {
                        self.cols = cols;
                        self.rows = rows;
                        force_redraw = true;
                    }
                    _ => {}
                }
            }

            self.draw(out, force_redraw)?;

            // a finished scan with nothing found ends the session
            {
                let root = self.contexts[0].store.lock().unwrap();
                if root.is_done() && root.is_empty() {
                    return Ok(Outcome::Quit);
                }
            }
        }
    }

    fn active(&mut self) -> &mut SearchContext {
        self.contexts
            .last_mut()
            .expect("context stack is never empty")
    }

    fn navigate(&mut self, action: Action) {
        let rows = self.rows as usize;
        let ctx = self.active();
        let mut view = Viewport {
            top: ctx.top,
            cursor: ctx.cursor,
        };
        {
            let store = ctx.store.lock().unwrap();
            let len = store.len();
            let is_header = |i: usize| store.is_file(i);
            match action {
                Action::Up => navigate::cursor_up(&mut view, rows, len, &is_header),
                Action::Down => navigate::cursor_down(&mut view, rows, len, &is_header),
                Action::PageUp => navigate::page_up(&mut view, rows, len, &is_header),
                Action::PageDown => navigate::page_down(&mut view, rows, len, &is_header),
                _ => {}
            }
        }
        ctx.top = view.top;
        ctx.cursor = view.cursor;
    }

    /// Open the selected match in the configured editor, suspending the
    /// terminal session around it.
    fn open_selection(&mut self, guard: &mut TerminalGuard) -> Result<()> {
        let rows = self.rows as usize;
        let template = self.editor_template.clone();
        let case_suffix = self.case_suffix;
        let ctx = self.active();
        let pattern = editor::sanitize_pattern(&ctx.pattern);

        let command = {
            let store = ctx.store.lock().unwrap();
            if store.is_empty() {
                return Ok(());
            }
            // the selection must sit on a line before it can be opened
            let is_header = |i: usize| store.is_file(i);
            let mut view = Viewport {
                top: ctx.top,
                cursor: ctx.cursor,
            };
            navigate::settle_view(&mut view, rows, store.len(), &is_header);
            let selection = view.selection();

            let number = match store.entry(selection) {
                Some(Entry::Line { number, .. }) => *number,
                _ => return Ok(()),
            };
            let file = match store.find_file(selection).and_then(|i| store.entry(i)) {
                Some(Entry::File(path)) => path.clone(),
                _ => return Ok(()),
            };
            editor::expand_template(&template, number, &file, &pattern, case_suffix)
        };

        guard.suspend(|| editor::launch(&command))?;
        Ok(())
    }

    /// Read a subsearch pattern in a centered box; derive and push a child
    /// context unless the input was empty or the regex invalid.
    fn prompt_subsearch(&mut self, out: &mut io::Stdout) -> Result<()> {
        let pattern = match self.read_prompt(out)? {
            Some(pattern) if !pattern.is_empty() => pattern,
            _ => return Ok(()),
        };

        let child = {
            let store = self.active().store.lock().unwrap();
            subsearch(&store, &pattern)
        };
        match child {
            Ok(store) => {
                self.contexts
                    .push(SearchContext::new(pattern, true, store));
            }
            Err(err) => {
                debug!(%err, "subsearch rejected");
                self.message = Some(format!("Bad regexp: {pattern}"));
            }
        }
        Ok(())
    }

    fn read_prompt(&mut self, out: &mut io::Stdout) -> Result<Option<String>> {
        let width = PROMPT_WIDTH.min(self.cols);
        let x = self.cols.saturating_sub(width) / 2;
        let y = self.rows.saturating_sub(3) / 2;
        let mut input = String::new();

        loop {
            draw_prompt_box(out, x, y, width, &input)?;
            if !event::poll(Duration::from_millis(50))? {
                continue;
            }
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Enter => return Ok(Some(input)),
                    KeyCode::Esc => return Ok(None),
                    KeyCode::Backspace => {
                        input.pop();
                    }
                    KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                        return Ok(None)
                    }
                    KeyCode::Char(c) => {
                        if input.len() < 255 {
                            input.push(c);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn draw(&mut self, out: &mut io::Stdout, force: bool) -> Result<()> {
        let rows = self.rows as usize;
        let cols = self.cols as usize;
        let context_index = self.contexts.len() - 1;
        let scanning = !self.contexts[0].store.lock().unwrap().is_done();
        if scanning {
            self.spinner = (self.spinner + 1) % SPINNER.len();
        }

        let ctx = self
            .contexts
            .last_mut()
            .expect("context stack is never empty");
        let store = ctx.store.lock().unwrap();

        let drawn = (context_index, store.revision());
        if !force && !scanning && self.last_drawn == Some(drawn) {
            return Ok(());
        }
        self.last_drawn = Some(drawn);

        // keep the selection on a line as entries stream in
        if !store.is_empty() {
            let is_header = |i: usize| store.is_file(i);
            let mut view = Viewport {
                top: ctx.top,
                cursor: ctx.cursor,
            };
            navigate::settle_view(&mut view, rows, store.len(), &is_header);
            ctx.top = view.top;
            ctx.cursor = view.cursor;
        }

        let selection = ctx.top + ctx.cursor;
        for row in 0..rows {
            let index = ctx.top + row;
            queue!(out, MoveTo(0, row as u16), Clear(ClearType::UntilNewLine))?;
            match store.entry(index) {
                Some(Entry::File(path)) => draw_file(out, path, cols)?,
                Some(Entry::Line { number, text }) => {
                    let highlight = if ctx.is_regex {
                        None
                    } else {
                        find_insensitive(text, ctx.pattern.as_bytes())
                            .map(|at| (at, ctx.pattern.len()))
                    };
                    draw_line(out, *number, text, highlight, index == selection, cols)?;
                }
                None => {}
            }
        }

        // status overlays the top-right corner
        let status = if scanning {
            SPINNER[self.spinner].to_string()
        } else {
            "Done.".to_string()
        };
        let hits = match &self.message {
            Some(message) => message.clone(),
            None => format!("Hits: {}", store.match_lines()),
        };
        drop(store);

        queue!(
            out,
            MoveTo(self.cols.saturating_sub(status.chars().count() as u16), 0),
            Print(&status),
            MoveTo(self.cols.saturating_sub(hits.chars().count() as u16), 1),
            Print(&hits),
        )?;
        out.flush()?;
        Ok(())
    }
}

fn draw_file(out: &mut io::Stdout, path: &str, cols: usize) -> Result<()> {
    let shown: String = path.chars().take(cols).collect();
    queue!(
        out,
        SetForegroundColor(Color::Green),
        SetAttribute(Attribute::Bold),
        Print(shown),
        SetAttribute(Attribute::Reset),
        ResetColor,
    )?;
    Ok(())
}

fn draw_line(
    out: &mut io::Stdout,
    number: usize,
    text: &[u8],
    highlight: Option<(usize, usize)>,
    selected: bool,
    cols: usize,
) -> Result<()> {
    if selected {
        queue!(out, SetAttribute(Attribute::Reverse))?;
    }
    let label = format!("{number}:");
    let mut remaining = cols.saturating_sub(label.len());
    queue!(
        out,
        SetForegroundColor(Color::Yellow),
        Print(&label),
        ResetColor
    )?;

    match highlight {
        Some((at, len)) if at + len <= text.len() => {
            queue!(
                out,
                Print(clip(&String::from_utf8_lossy(&text[..at]), &mut remaining)),
                SetForegroundColor(Color::Red),
                Print(clip(
                    &String::from_utf8_lossy(&text[at..at + len]),
                    &mut remaining
                )),
                ResetColor,
                Print(clip(
                    &String::from_utf8_lossy(&text[at + len..]),
                    &mut remaining
                )),
            )?;
        }
        _ => {
            queue!(
                out,
                Print(clip(&String::from_utf8_lossy(text), &mut remaining))
            )?;
        }
    }

    if selected {
        queue!(out, SetAttribute(Attribute::Reset))?;
    }
    queue!(out, ResetColor)?;
    Ok(())
}

fn clip(text: &str, remaining: &mut usize) -> String {
    let shown: String = text.chars().take(*remaining).collect();
    *remaining -= shown.chars().count();
    shown
}

fn draw_prompt_box(out: &mut io::Stdout, x: u16, y: u16, width: u16, input: &str) -> Result<()> {
    let inner = width.saturating_sub(2) as usize;
    let horizontal: String = "─".repeat(inner);
    let label = "To search: ";

    // keep the tail of long input visible
    let avail = inner.saturating_sub(label.len());
    let tail_start = input
        .char_indices()
        .rev()
        .nth(avail.saturating_sub(1))
        .map_or(0, |(i, _)| i);
    let shown = if input.chars().count() > avail {
        &input[tail_start..]
    } else {
        input
    };

    let body = format!("{label}{shown}");
    let padding = " ".repeat(inner.saturating_sub(body.chars().count()));
    queue!(
        out,
        MoveTo(x, y),
        Print(format!("┌{horizontal}┐")),
        MoveTo(x, y + 1),
        Print(format!("│{body}{padding}│")),
        MoveTo(x, y + 2),
        Print(format!("└{horizontal}┘")),
    )?;
    out.flush()?;
    Ok(())
}

/// First ASCII-case-insensitive occurrence of `pattern` in `text`, used to
/// colorize the match inside a displayed line.
fn find_insensitive(text: &[u8], pattern: &[u8]) -> Option<usize> {
    if pattern.is_empty() || text.len() < pattern.len() {
        return None;
    }
    text.windows(pattern.len())
        .position(|window| window.eq_ignore_ascii_case(pattern))
}
