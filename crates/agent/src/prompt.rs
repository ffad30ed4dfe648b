//! Interactive startup questions.

use std::io::{self, IsTerminal, Write};
use std::net::Ipv4Addr;

use dialoguer::{Input, Password};
use gt7_backend::BackendError;
use tracing::debug;

use crate::config::Storage;
use crate::error::AgentError;

const CONSOLE_PROMPT: &str = "Enter PlayStation IPv4 address";
const STORAGE_PROMPT: &str =
    "Do you want to save your laps locally [l] or remotely on GT Telemetry App [r]";
const TOKEN_PROMPT: &str = "Paste your JWT token (input hidden)";

/// Line-oriented operator I/O.
pub trait Prompter {
    /// Whether questions can be asked at all.
    fn interactive(&self) -> bool;
    fn ask(&mut self, prompt: &str) -> Result<String, AgentError>;
    fn ask_hidden(&mut self, prompt: &str) -> Result<String, AgentError>;
    fn say(&mut self, line: &str);
}

/// The real terminal, via dialoguer.
#[derive(Debug)]
pub struct Terminal {
    interactive: bool,
}

impl Terminal {
    pub fn detect() -> Self {
        Self {
            interactive: std::io::stdin().is_terminal(),
        }
    }
}

impl Prompter for Terminal {
    fn interactive(&self) -> bool {
        self.interactive
    }

    fn ask(&mut self, prompt: &str) -> Result<String, AgentError> {
        Ok(Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?)
    }

    fn ask_hidden(&mut self, prompt: &str) -> Result<String, AgentError> {
        Ok(Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()?)
    }

    fn say(&mut self, line: &str) {
        print_line(&mut io::stdout(), line);
    }
}

/// Write one operator message. A closed stdout (e.g. piped into `head`) is
/// logged and otherwise ignored.
pub fn print_line(out: &mut impl Write, line: &str) {
    if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
        debug!(error = %e, "could not write to stdout");
    }
}

/// Ask until the operator enters a dotted-quad IPv4 address.
pub fn console_address(prompter: &mut impl Prompter) -> Result<Ipv4Addr, AgentError> {
    if !prompter.interactive() {
        return Err(AgentError::NotInteractive("--ps-ip"));
    }
    loop {
        let answer = prompter.ask(CONSOLE_PROMPT)?;
        match answer.trim().parse::<Ipv4Addr>() {
            Ok(ip) => return Ok(ip),
            Err(_) => prompter.say("Invalid IPv4 address format. Please try again."),
        }
    }
}

/// Ask whether laps go to disk or to the backend.
pub fn storage(prompter: &mut impl Prompter) -> Result<Storage, AgentError> {
    if !prompter.interactive() {
        return Err(AgentError::NotInteractive("--local or a storage setting"));
    }
    loop {
        let answer = prompter.ask(STORAGE_PROMPT)?;
        match answer.trim().to_ascii_lowercase().as_str() {
            "l" => return Ok(Storage::Local),
            "r" => return Ok(Storage::Remote),
            _ => prompter.say("Invalid option. Please enter 'l' for local or 'r' for remote."),
        }
    }
}

/// Obtain a token the backend accepts.
///
/// `initial` (from the command line or environment) is tried first. A token
/// the backend rejects is asked for again; any other failure is final.
pub fn validated_token<T>(
    prompter: &mut impl Prompter,
    initial: Option<String>,
    mut validate: impl FnMut(String) -> Result<T, BackendError>,
) -> Result<T, AgentError> {
    let mut next = initial;
    loop {
        let token = match next.take() {
            Some(token) => token,
            None if prompter.interactive() => prompter.ask_hidden(TOKEN_PROMPT)?,
            None => return Err(AgentError::NotInteractive("--token")),
        };

        match validate(token) {
            Ok(accepted) => {
                prompter.say("JWT token is valid.");
                return Ok(accepted);
            }
            Err(e) if e.is_token_rejection() => {
                prompter.say("Invalid JWT token. Please try again.");
                debug!(error = %e, "token rejected");
                if !prompter.interactive() {
                    return Err(AgentError::TokenValidation(e));
                }
            }
            Err(e @ BackendError::Client(_)) => return Err(AgentError::Backend(e)),
            Err(e) => return Err(AgentError::TokenValidation(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gt7_backend::StatusCode;
    use std::collections::VecDeque;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    /// Replays canned answers; an exhausted script behaves like EOF.
    #[derive(Default)]
    struct Script {
        answers: VecDeque<&'static str>,
        said: Vec<String>,
        asked: usize,
        offline: bool,
    }

    impl Script {
        fn new(answers: &[&'static str]) -> Self {
            Self {
                answers: answers.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn next(&mut self) -> Result<String, AgentError> {
            self.asked += 1;
            self.answers
                .pop_front()
                .map(str::to_owned)
                .ok_or(AgentError::Cancelled)
        }
    }

    impl Prompter for Script {
        fn interactive(&self) -> bool {
            !self.offline
        }
        fn ask(&mut self, _prompt: &str) -> Result<String, AgentError> {
            self.next()
        }
        fn ask_hidden(&mut self, _prompt: &str) -> Result<String, AgentError> {
            self.next()
        }
        fn say(&mut self, line: &str) {
            self.said.push(line.to_owned());
        }
    }

    fn rejected() -> BackendError {
        BackendError::TokenRejected {
            status: StatusCode::UNAUTHORIZED,
        }
    }

    /// A stdout whose reader has gone away.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn print_line_survives_closed_stdout() {
        print_line(&mut ClosedPipe, "Lap 01-01-000 saved locally.");

        let mut out = Vec::new();
        print_line(&mut out, "Exiting...");
        assert_eq!(out, b"Exiting...\n");
    }

    #[test]
    fn console_address_reprompts_until_valid() -> TestResult {
        let mut script = Script::new(&["192.168.1", "300.1.1.1", " 192.168.1.20 "]);
        let ip = console_address(&mut script)?;
        assert_eq!(ip, Ipv4Addr::new(192, 168, 1, 20));
        assert_eq!(
            script.said,
            vec!["Invalid IPv4 address format. Please try again."; 2]
        );
        Ok(())
    }

    #[test]
    fn console_address_eof_cancels() {
        let mut script = Script::new(&[]);
        assert!(matches!(
            console_address(&mut script),
            Err(AgentError::Cancelled)
        ));
    }

    #[test]
    fn console_address_needs_a_terminal() {
        let mut script = Script {
            offline: true,
            ..Script::default()
        };
        assert!(matches!(
            console_address(&mut script),
            Err(AgentError::NotInteractive(_))
        ));
        assert_eq!(script.asked, 0);
    }

    #[test]
    fn storage_choice_is_case_insensitive() -> TestResult {
        assert_eq!(storage(&mut Script::new(&["R"]))?, Storage::Remote);
        assert_eq!(storage(&mut Script::new(&["l"]))?, Storage::Local);

        let mut script = Script::new(&["x", "", "r"]);
        assert_eq!(storage(&mut script)?, Storage::Remote);
        assert_eq!(script.said.len(), 2);
        Ok(())
    }

    #[test]
    fn rejected_token_is_asked_again() -> TestResult {
        let mut script = Script::new(&["bad", "good"]);
        let mut seen = Vec::new();
        let accepted = validated_token(&mut script, None, |token| {
            seen.push(token.clone());
            if token == "good" { Ok(token) } else { Err(rejected()) }
        })?;

        assert_eq!(accepted, "good");
        assert_eq!(seen, ["bad", "good"]);
        assert_eq!(
            script.said,
            ["Invalid JWT token. Please try again.", "JWT token is valid."]
        );
        Ok(())
    }

    #[test]
    fn given_token_is_tried_before_prompting() -> TestResult {
        let mut script = Script::new(&[]);
        let accepted = validated_token(&mut script, Some("env-token".into()), Ok)?;
        assert_eq!(accepted, "env-token");
        assert_eq!(script.asked, 0);
        Ok(())
    }

    #[test]
    fn transport_failure_is_final() {
        let mut script = Script::new(&["token", "unused"]);
        let result: Result<(), _> = validated_token(&mut script, None, |_| {
            Err(BackendError::Status {
                url: "http://backend/laps/".into(),
                status: StatusCode::INTERNAL_SERVER_ERROR,
            })
        });
        assert!(matches!(result, Err(AgentError::TokenValidation(_))));
        assert_eq!(script.asked, 1);
    }

    #[test]
    fn rejection_without_terminal_is_final() {
        let mut script = Script {
            offline: true,
            ..Script::default()
        };
        let result: Result<(), _> =
            validated_token(&mut script, Some("expired".into()), |_| Err(rejected()));
        let err = result.err();
        assert!(matches!(err, Some(AgentError::TokenValidation(_))));
        assert_eq!(err.map(|e| e.exit_code()), Some(3));
    }
}
