//! Interactive prompts for the dispatch command

use anyhow::{anyhow, Context, Result};
use std::fmt::Display;
use std::io::{self, BufRead, Write};
use std::str::FromStr;

/// Prints `message` and reads one trimmed line from stdin
pub fn prompt(message: &str) -> Result<String> {
    print!("{}", message);
    io::stdout().flush().context("failed to flush stdout")?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read from stdin")?;
    if read == 0 {
        return Err(anyhow!("stdin closed"));
    }
    Ok(line.trim().to_string())
}

/// Prompts for a value, using `default` when the answer is empty
pub fn prompt_or<T>(message: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let answer = prompt(&format!("{} (default {}): ", message, default))?;
    if answer.is_empty() {
        return Ok(default);
    }
    answer
        .parse()
        .with_context(|| format!("invalid value {:?}", answer))
}

/// Prompts until a non-empty value that parses is entered
pub fn prompt_required<T>(message: &str) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    loop {
        let answer = prompt(message)?;
        match answer.parse() {
            Ok(value) if !answer.is_empty() => return Ok(value),
            Ok(_) => println!("A value is required."),
            Err(e) => println!("Invalid value {:?}: {}", answer, e),
        }
    }
}

/// Asks a yes/no question; only `y`/`Y` count as yes
pub fn confirm(message: &str) -> Result<bool> {
    let answer = prompt(&format!("{} [y/n] ", message))?;
    Ok(answer.eq_ignore_ascii_case("y"))
}
