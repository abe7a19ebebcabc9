//! Operator interaction for the authorization step.
//!
//! The pipeline shows the authorization URL and then waits for exactly one
//! line of input: the authorization code, or the whole redirect URL.

use crate::error::{PipelineError, Result};
use reqwest::Url;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

/// Capability to show messages to the operator and read a line back
pub trait Console {
    fn show(&mut self, message: &str) -> io::Result<()>;
    fn read_line(&mut self, prompt: &str) -> io::Result<String>;
}

/// Console backed by the process stdin/stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdConsole;

impl Console for StdConsole {
    fn show(&mut self, message: &str) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", message)?;
        stdout.flush()
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<String> {
        {
            let mut stdout = io::stdout().lock();
            write!(stdout, "{}", prompt)?;
            stdout.flush()?;
        }

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "stdin closed before an authorization code was entered",
            ));
        }
        Ok(line)
    }
}

/// Console that answers from a fixed list of lines and records output
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    input: VecDeque<String>,
    shown: Vec<String>,
}

impl ScriptedConsole {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines.into_iter().map(Into::into).collect(),
            shown: Vec::new(),
        }
    }

    /// Everything passed to `show`, in order
    pub fn shown(&self) -> &[String] {
        &self.shown
    }
}

impl Console for ScriptedConsole {
    fn show(&mut self, message: &str) -> io::Result<()> {
        self.shown.push(message.to_string());
        Ok(())
    }

    fn read_line(&mut self, _prompt: &str) -> io::Result<String> {
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted input left"))
    }
}

/// What the operator pasted after authorizing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResponse {
    pub code: String,
    pub state: Option<String>,
}

impl AuthorizationResponse {
    /// Accepts a bare code, a `code=...&state=...` query string, or the
    /// full redirect URL.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            return Err(PipelineError::MissingAuthorizationCode);
        }

        let query_url = match Url::parse(input) {
            Ok(url) if url.query().is_some() => Some(url),
            _ if input.contains("code=") => {
                let query = input.trim_start_matches('?');
                Url::parse(&format!("http://localhost/?{}", query)).ok()
            }
            _ => None,
        };

        let Some(url) = query_url else {
            return Ok(Self {
                code: input.to_string(),
                state: None,
            });
        };

        let mut code = None;
        let mut state = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                _ => {}
            }
        }

        let code = code
            .filter(|c| !c.trim().is_empty())
            .ok_or(PipelineError::MissingAuthorizationCode)?;
        Ok(Self { code, state })
    }

    /// Return the code once the echoed state matches what was sent.
    ///
    /// With no expected state, any echoed state is ignored.
    pub fn verify_state(self, expected: Option<&str>) -> Result<String> {
        match expected {
            None => Ok(self.code),
            Some(expected) if self.state.as_deref() == Some(expected) => Ok(self.code),
            Some(_) => Err(PipelineError::StateMismatch),
        }
    }
}
