use shared::domain::ModuleId;

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Dashboard,
    Achievements,
    Continue,
    Open(ModuleId),
    NextConcept,
    PreviousConcept,
    Challenge { module: ModuleId, index: usize },
    /// Starts multi-line code entry, closed by a line holding only `.end`.
    Code,
    Submit,
    Hint,
    Retry,
    Advance,
    Ask(String),
    FollowUp { message: usize, question: usize },
    TutorOpen,
    TutorClose,
    GameRole(String),
    GameRegister(String),
    GameReset,
    Quit,
}

pub const CODE_TERMINATOR: &str = ".end";

pub const HELP: &str = "\
commands:
  dash | achievements | continue | quit
  open <module>            next | prev
  challenge <module> [n]   code (end with .end) | submit | hint | retry | advance
  ask <text>               follow <message#> <question#>
  tutor open|close
  role <name>              reg <register>   | game reset";

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map(|(w, r)| (w, r.trim()))
        .unwrap_or((line, ""));

    let command = match word {
        "help" | "?" => Command::Help,
        "dash" | "dashboard" => Command::Dashboard,
        "achievements" => Command::Achievements,
        "continue" => Command::Continue,
        "open" => Command::Open(module_arg(rest)?),
        "next" => Command::NextConcept,
        "prev" => Command::PreviousConcept,
        "challenge" => {
            let mut args = rest.split_whitespace();
            let module = module_arg(args.next().unwrap_or_default())?;
            let index = match args.next() {
                Some(raw) => index_arg(raw)?,
                None => 0,
            };
            Command::Challenge { module, index }
        }
        "code" => Command::Code,
        "submit" => Command::Submit,
        "hint" => Command::Hint,
        "retry" => Command::Retry,
        "advance" => Command::Advance,
        "ask" if !rest.is_empty() => Command::Ask(rest.to_string()),
        "ask" => return Err("usage: ask <text>".into()),
        "follow" => {
            let mut args = rest.split_whitespace();
            let message = index_arg(args.next().unwrap_or_default())?;
            let question = index_arg(args.next().unwrap_or_default())?;
            Command::FollowUp { message, question }
        }
        "tutor" => match rest {
            "open" => Command::TutorOpen,
            "close" => Command::TutorClose,
            _ => return Err("usage: tutor open|close".into()),
        },
        "role" if !rest.is_empty() => Command::GameRole(rest.to_string()),
        "reg" if !rest.is_empty() => Command::GameRegister(rest.to_ascii_uppercase()),
        "game" if rest == "reset" => Command::GameReset,
        "quit" | "exit" => Command::Quit,
        "" => return Err(String::new()),
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(command)
}

fn module_arg(raw: &str) -> Result<ModuleId, String> {
    raw.parse::<u32>()
        .map(ModuleId)
        .map_err(|_| format!("expected a module number, got '{raw}'"))
}

fn index_arg(raw: &str) -> Result<usize, String> {
    raw.parse::<usize>()
        .map_err(|_| format!("expected a number, got '{raw}'"))
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
