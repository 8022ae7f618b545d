//! Monotonically ordered, URL-safe instance id generation.
//!
//! Encodes a millisecond wall-clock timestamp and a same-millisecond
//! counter as fixed-width base-62 digits, so two ids compare equal under
//! `(length, lexicographic)` exactly when they compare equal
//! numerically, and the fixed width means every id has the same length
//! — reducing the ordering contract to plain string comparison.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::models::ids::InstanceId;

const BASE62_ALPHABET: &[u8] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const TIMESTAMP_WIDTH: usize = 9;
const COUNTER_WIDTH: usize = 4;
const COUNTER_MODULUS: u64 = 62u64.pow(COUNTER_WIDTH as u32);

fn encode_base62_fixed(mut value: u64, width: usize) -> String {
    let mut buf = vec![b'0'; width];
    for slot in buf.iter_mut().rev() {
        *slot = BASE62_ALPHABET[(value % 62) as usize];
        value /= 62;
    }
    String::from_utf8(buf).expect("base62 alphabet is ASCII")
}

/// Seam over the wall clock so tests can force same-millisecond
/// collisions deterministically without changing production behavior.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Production clock: real wall time in milliseconds since the epoch.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the epoch")
            .as_millis() as u64
    }
}

struct GeneratorState {
    last_ms: u64,
    counter: u64,
}

/// Produces fresh [`InstanceId`] values, safe under concurrent callers.
pub struct IdGenerator {
    state: Mutex<GeneratorState>,
    clock: Box<dyn Clock>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::with_clock(Box::new(SystemClock))
    }

    pub fn with_clock(clock: Box<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(GeneratorState {
                last_ms: 0,
                counter: 0,
            }),
            clock,
        }
    }

    /// Produce the next id. Spins (busy-waits) to the next millisecond
    /// tick if the counter would overflow its fixed width within the
    /// current one — an astronomically unlikely event at any realistic
    /// submission rate.
    pub fn next(&self) -> InstanceId {
        loop {
            let now = self.clock.now_ms();
            let mut state = self.state.lock().expect("id generator mutex poisoned");

            if now > state.last_ms {
                state.last_ms = now;
                state.counter = 0;
            } else if state.counter + 1 >= COUNTER_MODULUS {
                drop(state);
                std::hint::spin_loop();
                continue;
            } else {
                state.counter += 1;
            }

            let ts = state.last_ms;
            let counter = state.counter;
            drop(state);

            let encoded = format!(
                "{}{}",
                encode_base62_fixed(ts, TIMESTAMP_WIDTH),
                encode_base62_fixed(counter, COUNTER_WIDTH)
            );
            return InstanceId::from_raw(encoded);
        }
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
