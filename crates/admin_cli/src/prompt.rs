//! Masked password input on the terminal.

use std::{error::Error, io::Write};

use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal::{self, ClearType},
};

const MAX_ATTEMPTS: usize = 3;

type PromptResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// Raw mode for as long as the guard lives.
struct RawMode;

impl RawMode {
    fn enter() -> PromptResult<Self> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

/// Print a message on its own line of stderr.
fn notice(out: &mut impl Write, message: &str) -> PromptResult<()> {
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(message),
        Print("\r\n")
    )?;
    Ok(())
}

/// Read a line, echoing `*` for every character.
fn read_masked(prompt: &str) -> PromptResult<String> {
    let _raw = RawMode::enter()?;
    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;

    let mut secret = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        let ctrl = modifiers.contains(KeyModifiers::CONTROL);
        match code {
            KeyCode::Enter => break,
            KeyCode::Char('c') if ctrl => {
                execute!(out, Print("\r\n"))?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !ctrl => {
                secret.push(ch);
                execute!(out, Print("*"))?;
            }
            KeyCode::Backspace if secret.pop().is_some() => {
                execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
            }
            _ => {}
        }
        out.flush()?;
    }
    execute!(out, Print("\r\n"))?;
    out.flush()?;
    Ok(secret)
}

/// Ask for a new password and its confirmation.
pub fn new_password() -> PromptResult<String> {
    let mut out = std::io::stderr();
    for _ in 0..MAX_ATTEMPTS {
        let password = read_masked("Password: ")?;
        if password.trim().is_empty() {
            notice(&mut out, "Password must not be empty.")?;
            continue;
        }
        if read_masked("Confirm password: ")? == password {
            return Ok(password);
        }
        notice(&mut out, "Passwords do not match. Try again.")?;
    }
    Err("too many attempts".into())
}
