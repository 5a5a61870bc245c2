//! Terminal frontend.
//!
//! The game loop talks to a [`Frontend`] trait so the connection and the
//! mirror never touch the terminal; the crossterm implementation here is a
//! thin raw-mode wrapper around it.

use crate::client::game::GameMirror;
use crate::game::{Coord, Direction, BOARD_HEIGHT, BOARD_WIDTH};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::style::Print;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use crossterm::{cursor, queue, ExecutableCommand};
use std::io::{self, stdout, BufRead, Write};

/// What the player asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerInput {
    Move(Direction),
    Restart,
    Quit,
}

/// Presentation seam between the game loop and the terminal.
pub trait Frontend {
    fn render(&mut self, game: &GameMirror) -> io::Result<()>;
    fn next_input(&mut self) -> io::Result<PlayerInput>;
}

/// Raw-mode terminal frontend. Enters the alternate screen on creation
/// and restores the terminal on drop.
pub struct TerminalFrontend;

impl TerminalFrontend {
    pub fn new() -> io::Result<TerminalFrontend> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;
        stdout().execute(cursor::Hide)?;
        Ok(TerminalFrontend)
    }

    fn restore(&mut self) -> io::Result<()> {
        stdout().execute(cursor::Show)?;
        stdout().execute(LeaveAlternateScreen)?;
        disable_raw_mode()
    }
}

impl Drop for TerminalFrontend {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

impl Frontend for TerminalFrontend {
    fn render(&mut self, game: &GameMirror) -> io::Result<()> {
        let mut out = stdout();
        queue!(out, Clear(ClearType::All), cursor::MoveTo(0, 0))?;
        queue!(out, Print(format!("score: {}\r\n\r\n", game.score())))?;

        for y in 0..BOARD_HEIGHT {
            let mut row = String::new();
            for x in 0..BOARD_WIDTH {
                let block = game.board().get(Coord::new(x, y));
                if block.is_empty() {
                    row.push_str("     .");
                } else {
                    row.push_str(&format!("{:>6}", block.value()));
                }
            }
            queue!(out, Print(row), Print("\r\n"))?;
        }

        queue!(out, Print("\r\n"))?;
        if game.won() {
            queue!(out, Print("you reached 2048!\r\n"))?;
        }
        if game.lost() {
            queue!(out, Print("no moves left\r\n"))?;
        }
        queue!(
            out,
            Print("arrows: play   r: restart   q: quit\r\n")
        )?;
        out.flush()
    }

    fn next_input(&mut self) -> io::Result<PlayerInput> {
        loop {
            let Event::Key(key) = event::read()? else {
                continue;
            };
            if key.kind != KeyEventKind::Press {
                continue;
            }
            let input = match key.code {
                KeyCode::Left => PlayerInput::Move(Direction::Left),
                KeyCode::Right => PlayerInput::Move(Direction::Right),
                KeyCode::Up => PlayerInput::Move(Direction::Up),
                KeyCode::Down => PlayerInput::Move(Direction::Down),
                KeyCode::Char('r') => PlayerInput::Restart,
                KeyCode::Char('q') | KeyCode::Esc => PlayerInput::Quit,
                _ => continue,
            };
            return Ok(input);
        }
    }
}

/// Read one line from stdin after printing a prompt.
pub fn prompt_line(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Read a password from the terminal without echoing it. Raw mode is
/// restored before any read error propagates.
pub fn prompt_password(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    stdout().flush()?;
    enable_raw_mode()?;
    let entered = collect_password(std::iter::from_fn(|| Some(event::read())));
    disable_raw_mode()?;
    println!();
    entered
}

/// Fold key events into the entered password, up to the first Enter.
fn collect_password<I>(events: I) -> io::Result<String>
where
    I: IntoIterator<Item = io::Result<Event>>,
{
    let mut password = String::new();
    for event in events {
        let Event::Key(key) = event? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match key.code {
            KeyCode::Enter => break,
            KeyCode::Backspace => {
                password.pop();
            }
            KeyCode::Char(c) => password.push(c),
            _ => {}
        }
    }
    Ok(password)
}
