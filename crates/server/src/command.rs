//! Line commands understood by the server harness:
//!
//! ```text
//! user <user-id> [n]
//! profile <tt-id> <tt-id> ... [n=<k>]
//! popular [n]
//! quit
//! ```

use data_loader::UserId;
use std::str::FromStr;

pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    User { user_id: UserId, limit: usize },
    Profile { liked: Vec<String>, limit: usize },
    Popular { limit: usize },
    Quit,
}

fn parse_limit(raw: Option<&str>) -> Result<usize, String> {
    match raw {
        None => Ok(DEFAULT_LIMIT),
        Some(raw) => raw.parse().map_err(|_| format!("Invalid limit: {}", raw)),
    }
}

impl FromStr for Command {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = line.split_whitespace();
        let Some(verb) = tokens.next() else {
            return Err("Empty command".to_string());
        };

        match verb.to_lowercase().as_str() {
            "user" => {
                let raw = tokens.next().ok_or("Usage: user <user-id> [n]")?;
                let user_id = raw
                    .parse()
                    .map_err(|_| format!("Invalid user id: {}", raw))?;
                let limit = parse_limit(tokens.next())?;
                Ok(Command::User { user_id, limit })
            }
            "profile" => {
                let mut liked = Vec::new();
                let mut limit = DEFAULT_LIMIT;
                for token in tokens {
                    match token.strip_prefix("n=") {
                        Some(raw) => limit = parse_limit(Some(raw))?,
                        None => liked.push(token.to_string()),
                    }
                }
                Ok(Command::Profile { liked, limit })
            }
            "popular" => Ok(Command::Popular {
                limit: parse_limit(tokens.next())?,
            }),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(format!("Unknown command: {}", other)),
        }
    }
}
