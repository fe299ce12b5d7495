//! Settling delays between conversion triggers and result reads

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Blocking millisecond delay
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// Sleeps the calling thread
#[derive(Debug, Clone, Copy, Default)]
pub struct StdDelay;

impl Delay for StdDelay {
    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Records requested delays instead of sleeping
#[derive(Debug, Clone, Default)]
pub struct RecordingDelay {
    requested: Arc<Mutex<Vec<u32>>>,
}

impl RecordingDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requested(&self) -> Vec<u32> {
        self.requested
            .lock()
            .map(|r| r.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl Delay for RecordingDelay {
    fn delay_ms(&mut self, ms: u32) {
        match self.requested.lock() {
            Ok(mut requested) => requested.push(ms),
            Err(poisoned) => poisoned.into_inner().push(ms),
        }
    }
}
