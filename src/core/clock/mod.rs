//! # Clock Module
//!
//! Supplies the current time in epoch milliseconds.
//!
//! ## Implementations
//! - `SystemClock` - Wall clock time
//! - `ScriptedClock` - Replays a fixed sequence of timestamps, for tests

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch
    fn now_ms(&self) -> i64;
}

/// Wall clock backed by `SystemTime`
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

/// Clock that returns pre-programmed timestamps in order
///
/// Each call to `now_ms` consumes the next scripted value. Once the script is
/// exhausted the last value keeps being returned, so a test that scripts fewer
/// values than calls sees time stand still rather than jump.
pub struct ScriptedClock {
    script: Mutex<Script>,
}

struct Script {
    pending: VecDeque<i64>,
    last: i64,
}

impl ScriptedClock {
    /// Create a clock that replays `times`
    pub fn new<I>(times: I) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        Self {
            script: Mutex::new(Script {
                pending: times.into_iter().collect(),
                last: 0,
            }),
        }
    }

    /// Create a clock frozen at a single instant
    pub fn fixed(now_ms: i64) -> Self {
        Self::new([now_ms])
    }

    /// Append more timestamps to the end of the script
    pub fn push(&self, now_ms: i64) {
        if let Ok(mut script) = self.script.lock() {
            script.pending.push_back(now_ms);
        }
    }

    /// Number of scripted values not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.pending.len()).unwrap_or(0)
    }
}

impl Clock for ScriptedClock {
    fn now_ms(&self) -> i64 {
        let mut script = match self.script.lock() {
            Ok(script) => script,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(next) = script.pending.pop_front() {
            script.last = next;
        }
        script.last
    }
}
