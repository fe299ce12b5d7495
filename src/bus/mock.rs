//! In-memory register file implementing [`Transport`].
//!
//! Tests preload register contents and queued raw responses, move a clone of
//! the bus into a driver, and keep the first handle to inspect the write
//! log or inject failures afterwards.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use super::Transport;
use crate::error::BusError;

/// A write observed on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Byte(u8),
    Register(u8, u8),
    Bytes(Vec<u8>),
}

#[derive(Debug)]
struct BusState {
    registers: Vec<u8>,
    words: HashMap<u8, [u8; 2]>,
    responses: VecDeque<Option<Vec<u8>>>,
    writes: Vec<Write>,
    failing: HashSet<u8>,
    fail_reads: bool,
    fail_writes: bool,
    closed: bool,
}

impl Default for BusState {
    fn default() -> Self {
        Self {
            registers: vec![0; 256],
            words: HashMap::new(),
            responses: VecDeque::new(),
            writes: Vec::new(),
            failing: HashSet::new(),
            fail_reads: false,
            fail_writes: false,
            closed: false,
        }
    }
}

/// Cloneable handle to a shared fake device
#[derive(Debug, Clone, Default)]
pub struct RegisterBus {
    state: Arc<Mutex<BusState>>,
}

impl RegisterBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `bytes` in consecutive registers starting at `start`
    pub fn load(&self, start: u8, bytes: &[u8]) -> &Self {
        let mut state = self.state();
        for (offset, byte) in bytes.iter().enumerate() {
            if let Some(slot) = state.registers.get_mut(start as usize + offset) {
                *slot = *byte;
            }
        }
        self
    }

    /// Back `register` with its own 16-bit value for `read_word`
    ///
    /// Chips with 16-bit registers at consecutive addresses cannot be laid
    /// out in the byte register file. `wire` is the byte order on the bus.
    pub fn load_word(&self, register: u8, wire: [u8; 2]) -> &Self {
        self.state().words.insert(register, wire);
        self
    }

    pub fn register(&self, register: u8) -> u8 {
        self.state().registers[register as usize]
    }

    /// Queue the payload returned by the next plain `read_bytes`
    pub fn push_response(&self, bytes: &[u8]) -> &Self {
        self.state().responses.push_back(Some(bytes.to_vec()));
        self
    }

    /// Make the next plain `read_bytes` fail
    pub fn push_failure(&self) -> &Self {
        self.state().responses.push_back(None);
        self
    }

    /// Fail every read while `fail` is set
    pub fn fail_reads(&self, fail: bool) -> &Self {
        self.state().fail_reads = fail;
        self
    }

    /// Fail every write while `fail` is set
    pub fn fail_writes(&self, fail: bool) -> &Self {
        self.state().fail_writes = fail;
        self
    }

    /// Fail register reads that touch `register`
    pub fn fail_register(&self, register: u8) -> &Self {
        self.state().failing.insert(register);
        self
    }

    pub fn heal_register(&self, register: u8) -> &Self {
        self.state().failing.remove(&register);
        self
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    fn read_range(&self, register: u8, count: usize) -> Result<Vec<u8>, BusError> {
        let state = self.state();
        if state.closed {
            return Err(BusError::Closed);
        }
        if state.fail_reads {
            return Err(BusError::Nack(register));
        }
        let start = register as usize;
        let end = start + count;
        if end > state.registers.len() {
            return Err(BusError::ShortRead {
                expected: count,
                actual: state.registers.len().saturating_sub(start),
            });
        }
        if (start..end).any(|r| state.failing.contains(&(r as u8))) {
            return Err(BusError::Nack(register));
        }
        Ok(state.registers[start..end].to_vec())
    }

    fn record(&self, write: Write) -> Result<(), BusError> {
        let mut state = self.state();
        if state.closed {
            return Err(BusError::Closed);
        }
        if state.fail_writes {
            let register = match &write {
                Write::Byte(value) | Write::Register(value, _) => *value,
                Write::Bytes(bytes) => bytes.first().copied().unwrap_or(0),
            };
            return Err(BusError::Nack(register));
        }
        if let Write::Register(register, value) = write {
            state.registers[register as usize] = value;
        }
        state.writes.push(write);
        Ok(())
    }
}

impl Transport for RegisterBus {
    fn read_byte(&mut self, register: u8) -> Result<u8, BusError> {
        Ok(self.read_range(register, 1)?[0])
    }

    fn read_word(&mut self, register: u8) -> Result<u16, BusError> {
        let word = self.state().words.get(&register).copied();
        let bytes = match word {
            Some(wire) => {
                self.read_range(register, 1)?;
                wire.to_vec()
            }
            None => self.read_range(register, 2)?,
        };
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_block(&mut self, register: u8, count: usize) -> Result<Vec<u8>, BusError> {
        self.read_range(register, count)
    }

    fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>, BusError> {
        let mut state = self.state();
        if state.closed {
            return Err(BusError::Closed);
        }
        if state.fail_reads {
            return Err(BusError::Nack(0));
        }
        match state.responses.pop_front() {
            Some(Some(bytes)) if bytes.len() >= count => Ok(bytes[..count].to_vec()),
            Some(Some(bytes)) => Err(BusError::ShortRead {
                expected: count,
                actual: bytes.len(),
            }),
            Some(None) => Err(BusError::Nack(0)),
            None => Err(BusError::ShortRead {
                expected: count,
                actual: 0,
            }),
        }
    }

    fn write_byte(&mut self, value: u8) -> Result<(), BusError> {
        self.record(Write::Byte(value))
    }

    fn write_byte_reg(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        self.record(Write::Register(register, value))
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BusError> {
        self.record(Write::Bytes(bytes.to_vec()))
    }

    fn close(&mut self) {
        self.state().closed = true;
    }
}
