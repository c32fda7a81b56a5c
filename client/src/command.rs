//! REPL command parsing.

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    GetById(u64),
    GetByPair(String),
    Post(String),
    Empty,
    Invalid(String),
}

/// Parse a line. The command word is case-insensitive; numeric `get`
/// arguments are request ids, anything else is a currency pair.
pub fn parse(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    match word.to_ascii_lowercase().as_str() {
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "get" if rest.is_empty() => Command::Invalid("Missing parameter for GET.".to_string()),
        "get" => match rest.parse::<u64>() {
            Ok(id) => Command::GetById(id),
            Err(_) => Command::GetByPair(rest.to_string()),
        },
        "post" if rest.is_empty() => Command::Invalid("Missing JSON body for POST.".to_string()),
        "post" => Command::Post(rest.to_string()),
        other => Command::Invalid(format!("Unknown command: {other}")),
    }
}

pub const HELP: &str = "\
Available commands:
  help                   - Show this help message.
  quit                   - Quit.
  get  <request_id>      - Get an update request by id. Example: 'get 42'
  get  <currency_pair>   - Get the rate of a currency pair. Example: 'get EUR/MXN'
  post <json>            - Request a rate update. Example: 'post {\"currency_pair\":\"EUR/MXN\"}'";
