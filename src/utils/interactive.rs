use anyhow::Result;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent},
    execute, style,
    terminal::{self, ClearType},
};
use std::io::{self, Write};

pub fn prompt_input(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(input.trim().to_string())
}

/// Single-line input with raw-mode editing. Esc cancels and returns None.
pub fn prompt_line(prompt: &str) -> Result<Option<String>> {
    print!("{}", prompt);
    io::stdout().flush()?;

    terminal::enable_raw_mode()?;

    let result = (|| {
        let mut input = String::new();

        loop {
            match event::read()? {
                Event::Key(KeyEvent {
                    code: KeyCode::Char(c),
                    ..
                }) => {
                    input.push(c);
                    execute!(
                        io::stdout(),
                        cursor::MoveToColumn(0),
                        terminal::Clear(ClearType::CurrentLine),
                        style::Print(prompt),
                        style::Print(&input)
                    )?;
                    io::stdout().flush()?;
                }
                Event::Key(KeyEvent {
                    code: KeyCode::Backspace,
                    ..
                }) => {
                    if !input.is_empty() {
                        input.pop();
                        execute!(
                            io::stdout(),
                            cursor::MoveToColumn(0),
                            terminal::Clear(ClearType::CurrentLine),
                            style::Print(prompt),
                            style::Print(&input)
                        )?;
                        io::stdout().flush()?;
                    }
                }
                Event::Key(KeyEvent {
                    code: KeyCode::Enter,
                    ..
                }) => {
                    println!();
                    return Ok(Some(input.trim().to_string()));
                }
                Event::Key(KeyEvent {
                    code: KeyCode::Esc, ..
                }) => {
                    println!();
                    return Ok(None);
                }
                _ => {}
            }
        }
    })();

    terminal::disable_raw_mode()?;
    result
}

pub fn prompt_yes_no(question: &str) -> Result<bool> {
    let answer = prompt_input(&format!("{} [y/N]: ", question))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}
