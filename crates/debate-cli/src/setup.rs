use std::io::Write;

use anyhow::{Result, bail};
use debate_core::provision::MAX_PARTICIPANTS;
use debate_core::{RoomKind, RoomSetupRequest, RosterForm, ValidationError};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

pub type Input = Lines<BufReader<Stdin>>;

pub fn stdin_lines() -> Input {
    BufReader::new(tokio::io::stdin()).lines()
}

/// Print `prompt` and read one trimmed line. `None` at end of input.
async fn ask(input: &mut Input, prompt: &str) -> Result<Option<String>> {
    print!("{prompt}");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?.map(|line| line.trim().to_string()))
}

/// Ask a yes/no question, defaulting to yes. End of input answers no.
pub async fn confirm(input: &mut Input, prompt: &str) -> Result<bool> {
    loop {
        let Some(line) = ask(input, &format!("{prompt} [Y/n]: ")).await? else {
            return Ok(false);
        };
        match parse_answer(&line) {
            Some(answer) => return Ok(answer),
            None => println!("please answer y or n"),
        }
    }
}

fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "" | "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

async fn ask_or_cancel(input: &mut Input, prompt: &str) -> Result<String> {
    match ask(input, prompt).await? {
        Some(line) => Ok(line),
        None => bail!("setup cancelled"),
    }
}

/// Use `current` when it is a usable name, otherwise prompt until one is given.
pub async fn ask_name(input: &mut Input, current: Option<String>) -> Result<String> {
    if let Some(name) = current.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
        return Ok(name);
    }
    loop {
        let name = ask_or_cancel(input, "Your name: ").await?;
        if !name.is_empty() {
            return Ok(name);
        }
        println!("{}", ValidationError::EmptyName);
    }
}

/// Walk the user through the setup form until it validates.
///
/// With `ask_roster` false the roster is taken as given and only the name is
/// prompted for; a roster that fails validation is then edited interactively.
pub async fn fill_form(form: &mut RosterForm, input: &mut Input, ask_roster: bool) -> Result<RoomSetupRequest> {
    let mut ask_roster = ask_roster;
    loop {
        if form.name.trim().is_empty() {
            form.name = ask_name(input, None).await?;
        }
        if ask_roster {
            ask_room_type(form, input).await?;
            ask_participants(form, input).await?;
        }
        match form.submit() {
            Ok(request) => return Ok(request),
            Err(e) => {
                println!("{e}");
                ask_roster = true;
            }
        }
    }
}

async fn ask_room_type(form: &mut RosterForm, input: &mut Input) -> Result<()> {
    println!("Room types:");
    for kind in [RoomKind::Discussion, RoomKind::Debate] {
        println!("  {:<12} {}", kind.to_string(), kind.label());
    }
    loop {
        let line = ask_or_cancel(input, &format!("Room type [{}]: ", form.room_type)).await?;
        if line.is_empty() {
            return Ok(());
        }
        match line.parse::<RoomKind>() {
            Ok(kind) => {
                form.room_type = kind;
                return Ok(());
            }
            Err(e) => println!("{e}"),
        }
    }
}

async fn ask_participants(form: &mut RosterForm, input: &mut Input) -> Result<()> {
    loop {
        let prompt = format!("Number of participants (1-{MAX_PARTICIPANTS}) [{}]: ", form.count());
        let line = ask_or_cancel(input, &prompt).await?;
        if line.is_empty() || form.set_count_input(&line) {
            break;
        }
        println!("please enter a number from 1 to {MAX_PARTICIPANTS}");
    }

    // Enter keeps the current name, "-" clears the slot.
    for index in 0..form.count() {
        let current = &form.participants()[index];
        let prompt = if current.is_empty() {
            format!("Participant {}: ", index + 1)
        } else {
            format!("Participant {} [{current}]: ", index + 1)
        };
        let line = ask_or_cancel(input, &prompt).await?;
        match line.as_str() {
            "" => {}
            "-" => form.set_participant(index, ""),
            name => form.set_participant(index, name),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answers_default_to_yes() {
        assert_eq!(parse_answer(""), Some(true));
        assert_eq!(parse_answer(" Y "), Some(true));
        assert_eq!(parse_answer("yes"), Some(true));
        assert_eq!(parse_answer("N"), Some(false));
        assert_eq!(parse_answer("no"), Some(false));
        assert_eq!(parse_answer("maybe"), None);
    }
}
