//! Execution Engine
//!
//! Replays a compiled [`Session`] against a [`ProtocolGateway`], one command
//! at a time. Every protocol send is followed by a barrier, so the
//! compositor has handled each event before the next one goes out; the only
//! other pauses are the settle time around taps and the user's delays.
//!
//! # Keymap Uploads
//!
//! The compositor interprets keycodes through the last keymap it received.
//! A fresh keymap is uploaded before the first command and again whenever a
//! command refers to a keycode the last upload did not cover. Text read from
//! stdin is typed in batches; each batch uploads its own keymap first, so an
//! arbitrarily long stream never needs the whole table up front.

use std::ffi::OsStr;
use std::io::{BufReader, Read};
use std::thread;
use std::time::{Duration, Instant};

use enumflags2::BitFlags;
use tracing::{debug, info};

use crate::command::{split_mask, Command, Compiler, DecodeFailure, Modifier, TextDecoder};
use crate::error::{Result, WtypeError};
use crate::gateway::{KeyState, ProtocolGateway};
use crate::keymap::{synthesize, KeymapOptions};
use crate::symbols::{KeyId, SymbolTable};

/// Default pause after each press and each release of a tap
pub const DEFAULT_SETTLE: Duration = Duration::from_millis(2);

/// Default number of stdin characters typed per keymap upload
pub const DEFAULT_STREAM_BATCH: usize = 100;

/// Everything one run works on: the symbol table, the commands compiled
/// against it and the decoder shared by arguments and stdin
#[derive(Debug)]
pub struct Session {
    pub(crate) symbols: SymbolTable,
    pub(crate) commands: Vec<Command>,
    pub(crate) decoder: TextDecoder,
}

impl Session {
    /// Compile command tokens into a new session
    ///
    /// # Errors
    ///
    /// Any argument or decode error in the tokens.
    pub fn compile<I, S>(tokens: I, mut decoder: TextDecoder, default_delay: Duration) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut symbols = SymbolTable::new();
        let commands = Compiler::new(&mut symbols, &mut decoder, default_delay).compile(tokens)?;

        Ok(Self {
            symbols,
            commands,
            decoder,
        })
    }

    /// Compiled commands in execution order
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Symbol table; grows while stdin is typed
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
}

/// Pauses and batching used while typing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Pause after each press and each release of a tap
    pub settle: Duration,
    /// Characters typed per keymap upload when reading stdin
    pub stream_batch: usize,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle: DEFAULT_SETTLE,
            stream_batch: DEFAULT_STREAM_BATCH,
        }
    }
}

/// Command executor bound to one gateway
pub struct Engine<G> {
    gateway: G,
    timing: TimingConfig,
    keymap: KeymapOptions,
    mask: BitFlags<Modifier>,
    /// Table length at the last upload
    uploaded: Option<usize>,
    uploads: usize,
    epoch: Instant,
}

impl<G: ProtocolGateway> Engine<G> {
    /// Create an engine with an empty modifier mask
    pub fn new(gateway: G, timing: TimingConfig, keymap: KeymapOptions) -> Self {
        Self {
            gateway,
            timing,
            keymap,
            mask: BitFlags::empty(),
            uploaded: None,
            uploads: 0,
            epoch: Instant::now(),
        }
    }

    /// Current modifier mask
    pub fn mask(&self) -> BitFlags<Modifier> {
        self.mask
    }

    /// Keymaps uploaded so far
    pub fn uploads(&self) -> usize {
        self.uploads
    }

    /// Give back the gateway
    pub fn into_gateway(self) -> G {
        self.gateway
    }

    /// Execute every command of `session` in order
    ///
    /// `input` is only read if the session contains a stdin placeholder.
    ///
    /// # Errors
    ///
    /// The first synthesis, decode or gateway failure aborts the run. Keys
    /// and modifiers already pressed at that point are left as they are.
    pub fn run<R: Read>(&mut self, session: &mut Session, input: R) -> Result<()> {
        let Session {
            symbols,
            commands,
            decoder,
        } = session;
        let mut input = BufReader::new(input);

        info!("Executing {} commands", commands.len());

        for command in commands.iter() {
            self.ensure_keymap(symbols, command.key_ids())?;

            match command {
                Command::Sleep(duration) => {
                    debug!("Sleeping {:?}", duration);
                    thread::sleep(*duration);
                }
                Command::ModPress(modifier) => {
                    self.mask |= *modifier;
                    self.send_mask()?;
                }
                Command::ModRelease(modifier) => {
                    self.mask &= !BitFlags::from(*modifier);
                    self.send_mask()?;
                }
                Command::KeyPress(id) => self.send_key(*id, KeyState::Pressed)?,
                Command::KeyRelease(id) => self.send_key(*id, KeyState::Released)?,
                Command::Text { ids, delay } => self.type_keys(ids, *delay)?,
                Command::TextStream { delay } => {
                    self.type_stream(symbols, decoder, &mut input, *delay)?;
                }
            }
        }

        debug!("Run complete, {} keymap uploads", self.uploads);
        Ok(())
    }

    fn ensure_keymap(&mut self, symbols: &SymbolTable, ids: &[KeyId]) -> Result<()> {
        let stale = match self.uploaded {
            None => true,
            Some(covered) => ids.iter().any(|id| id.index() >= covered),
        };

        if stale {
            self.upload(symbols)?;
        }
        Ok(())
    }

    fn upload(&mut self, symbols: &SymbolTable) -> Result<()> {
        let document = synthesize(symbols, &self.keymap)?;
        self.gateway.upload_keymap(&document)?;
        self.gateway.barrier()?;

        self.uploaded = Some(symbols.len());
        self.uploads += 1;
        Ok(())
    }

    fn send_mask(&mut self) -> Result<()> {
        let (depressed, locked) = split_mask(self.mask);
        debug!("Modifiers depressed={:#x} locked={:#x}", depressed, locked);

        self.gateway.send_modifiers(depressed, 0, locked, 0)?;
        self.gateway.barrier()
    }

    fn send_key(&mut self, id: KeyId, state: KeyState) -> Result<()> {
        let time = self.timestamp();
        self.gateway.send_key(time, id, state)?;
        self.gateway.barrier()
    }

    fn type_keys(&mut self, ids: &[KeyId], delay: Duration) -> Result<()> {
        for &id in ids {
            self.send_key(id, KeyState::Pressed)?;
            pause(self.timing.settle);
            self.send_key(id, KeyState::Released)?;
            pause(self.timing.settle);
            pause(delay);
        }
        Ok(())
    }

    fn type_stream<R: Read>(
        &mut self,
        symbols: &mut SymbolTable,
        decoder: &mut TextDecoder,
        input: R,
        delay: Duration,
    ) -> Result<()> {
        let capacity = self.timing.stream_batch.max(1);
        let mut batch = Vec::with_capacity(capacity);
        let mut typed = 0usize;

        for byte in input.bytes() {
            let Some(ch) = decoder.push(byte?).map_err(stdin_error)? else {
                continue;
            };
            if ch == '\0' {
                continue;
            }

            batch.push(symbols.resolve_char(ch));
            if batch.len() == capacity {
                typed += batch.len();
                self.type_batch(symbols, &batch, delay)?;
                batch.clear();
            }
        }
        decoder.finish().map_err(stdin_error)?;

        if !batch.is_empty() {
            typed += batch.len();
            self.type_batch(symbols, &batch, delay)?;
        }

        debug!("Typed {} characters from stdin", typed);
        Ok(())
    }

    fn type_batch(&mut self, symbols: &SymbolTable, batch: &[KeyId], delay: Duration) -> Result<()> {
        self.upload(symbols)?;
        self.type_keys(batch, delay)
    }

    /// Milliseconds since the engine was created, wrapping at `u32::MAX`
    fn timestamp(&self) -> u32 {
        self.epoch.elapsed().as_millis() as u32
    }
}

fn pause(duration: Duration) {
    if !duration.is_zero() {
        thread::sleep(duration);
    }
}

fn stdin_error(failure: DecodeFailure) -> WtypeError {
    WtypeError::Decode {
        origin: "stdin",
        reason: failure.to_string(),
    }
}
