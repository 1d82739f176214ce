//! Command Line Compiler
//!
//! Turns argument tokens into [`Command`]s, resolving every character and
//! named key through the [`SymbolTable`] as it goes. Compilation happens
//! before any compositor connection is made, so bad arguments fail fast.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::time::Duration;

use tracing::debug;

use crate::command::{Command, Modifier, TextDecoder};
use crate::error::{Result, WtypeError};
use crate::symbols::SymbolTable;

/// Single-pass token compiler
pub struct Compiler<'a> {
    symbols: &'a mut SymbolTable,
    decoder: &'a mut TextDecoder,
    commands: Vec<Command>,
    delay: Duration,
    raw_text: bool,
    previous_was_text: bool,
    stdin_seen: bool,
}

impl<'a> Compiler<'a> {
    /// Create a compiler writing into `symbols`
    ///
    /// `default_delay` applies to text until the first `-d`.
    pub fn new(
        symbols: &'a mut SymbolTable,
        decoder: &'a mut TextDecoder,
        default_delay: Duration,
    ) -> Self {
        Self {
            symbols,
            decoder,
            commands: Vec::new(),
            delay: default_delay,
            raw_text: false,
            previous_was_text: false,
            stdin_seen: false,
        }
    }

    /// Compile a full token list (program name excluded)
    pub fn compile<I, S>(mut self, tokens: I) -> Result<Vec<Command>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut tokens = tokens.into_iter();
        let mut any = false;

        while let Some(token) = tokens.next() {
            any = true;
            let token = token.as_ref();
            let bytes = token.as_bytes();

            if !self.raw_text && bytes == b"--" {
                self.raw_text = true;
            } else if !self.raw_text && bytes == b"-" {
                self.stdin()?;
            } else if !self.raw_text && bytes.first() == Some(&b'-') {
                let flag = token.to_string_lossy().into_owned();
                let value = tokens
                    .next()
                    .ok_or_else(|| WtypeError::MissingValue(flag.clone()))?;
                self.flag(&flag, value.as_ref())?;
            } else {
                self.text(bytes)?;
            }
        }

        if !any {
            return Err(WtypeError::Usage);
        }

        debug!(
            "Compiled {} commands, {} keycodes allocated",
            self.commands.len(),
            self.symbols.len()
        );

        Ok(self.commands)
    }

    fn stdin(&mut self) -> Result<()> {
        if self.stdin_seen {
            return Err(WtypeError::DuplicateStdin);
        }
        self.stdin_seen = true;
        self.previous_was_text = false;
        self.commands
            .push(Command::TextStream { delay: self.delay });
        Ok(())
    }

    fn flag(&mut self, flag: &str, value: &OsStr) -> Result<()> {
        let value = value.to_string_lossy();

        match flag {
            "-M" => self.commands.push(Command::ModPress(modifier(&value)?)),
            "-m" => self.commands.push(Command::ModRelease(modifier(&value)?)),
            "-s" => self
                .commands
                .push(Command::Sleep(duration("sleep", &value)?)),
            "-d" => self.delay = duration("delay", &value)?,
            "-k" => {
                let id = self.symbols.resolve_key_name(&value)?;
                self.commands.push(Command::Text {
                    ids: vec![id],
                    delay: self.delay,
                });
            }
            "-P" => {
                let id = self.symbols.resolve_key_name(&value)?;
                self.commands.push(Command::KeyPress(id));
            }
            "-p" => {
                let id = self.symbols.resolve_key_name(&value)?;
                self.commands.push(Command::KeyRelease(id));
            }
            _ => return Err(WtypeError::UnknownFlag(flag.to_string())),
        }

        self.previous_was_text = false;
        Ok(())
    }

    fn text(&mut self, bytes: &[u8]) -> Result<()> {
        let decoded = self
            .decoder
            .decode(bytes)
            .map_err(|failure| WtypeError::Decode {
                origin: "argument",
                reason: failure.to_string(),
            })?;

        let mut ids = Vec::with_capacity(decoded.len() + 1);
        if self.previous_was_text {
            ids.push(self.symbols.resolve_char(' '));
        }
        ids.extend(decoded.into_iter().map(|ch| self.symbols.resolve_char(ch)));

        self.commands.push(Command::Text {
            ids,
            delay: self.delay,
        });
        self.previous_was_text = true;
        Ok(())
    }
}

fn modifier(name: &str) -> Result<Modifier> {
    Modifier::from_name(name).ok_or_else(|| WtypeError::UnknownModifier(name.to_string()))
}

fn duration(what: &str, value: &str) -> Result<Duration> {
    match value.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(WtypeError::InvalidDuration {
            flag: what.to_string(),
            value: value.to_string(),
        }),
    }
}
