use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout};
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Terminal;

use crate::shell_state::{KeyOutcome, UiShellState};
use crate::UiMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiOptions {
    pub scroll_step: usize,
    pub poll_interval: Duration,
}

impl Default for UiOptions {
    fn default() -> Self {
        Self {
            scroll_step: 10,
            poll_interval: Duration::from_millis(250),
        }
    }
}

pub struct Ui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    options: UiOptions,
}

impl Ui {
    pub fn init(options: UiOptions) -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal, options })
    }

    pub fn run(&mut self, shell: &mut UiShellState) -> io::Result<()> {
        let mut force_draw = true;
        loop {
            if force_draw {
                self.draw(shell)?;
                force_draw = false;
            }

            if !event::poll(self.options.poll_interval)? {
                continue;
            }
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    force_draw = true;
                    match shell.handle_key(key) {
                        KeyOutcome::Continue => {}
                        KeyOutcome::Quit => return Ok(()),
                        KeyOutcome::Interactive(command) => {
                            self.suspend()?;
                            let outcome = shell.run_interactive(command);
                            self.resume()?;
                            if outcome == KeyOutcome::Quit {
                                return Ok(());
                            }
                        }
                    }
                }
                Event::Resize(_, _) => force_draw = true,
                _ => {}
            }
        }
    }

    fn draw(&mut self, shell: &UiShellState) -> io::Result<()> {
        let head = shell.head_text();
        let body = shell.body_text();
        let footer = shell.footer_text();
        let footer_style = match shell.mode() {
            UiMode::Command => Style::default().fg(Color::LightBlue),
            UiMode::Normal => Style::default(),
        };
        tracing::debug!(body_lines = body.lines().count(), "redraw");

        self.terminal.draw(|frame| {
            let layout = Layout::vertical([
                Constraint::Length(3),
                Constraint::Min(1),
                Constraint::Length(4),
            ]);
            let [head_area, body_area, footer_area] = layout.areas(frame.area());

            frame.render_widget(
                Paragraph::new(head).block(Block::default().title("pm").borders(Borders::ALL)),
                head_area,
            );
            frame.render_widget(
                Paragraph::new(body).block(Block::default().borders(Borders::ALL)),
                body_area,
            );
            frame.render_widget(
                Paragraph::new(footer).block(
                    Block::default()
                        .title(shell.mode().label())
                        .borders(Borders::ALL)
                        .border_style(footer_style),
                ),
                footer_area,
            );
        })?;
        Ok(())
    }

    /// Hands the terminal back to the shell for an interactive program.
    fn suspend(&mut self) -> io::Result<()> {
        disable_raw_mode()?;
        io::stdout().execute(LeaveAlternateScreen)?;
        Ok(())
    }

    fn resume(&mut self) -> io::Result<()> {
        enable_raw_mode()?;
        io::stdout().execute(EnterAlternateScreen)?;
        self.terminal.clear()
    }
}

impl Drop for Ui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = io::stdout().execute(LeaveAlternateScreen);
    }
}
