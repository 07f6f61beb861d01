//! Cross-process signal channel
//!
//! A durable single-slot handoff between the external decision process
//! and the controller. The producer overwrites one JSON record per
//! decision via write-temp-then-rename, so a reader never observes a
//! half-written record; the reader needs no locking at all.
//!
//! Reads are fail-open to "do nothing": any IO or parse problem yields
//! `None`, never a trade.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::Direction;

/// The latest trading decision, as written by the signal producer.
///
/// Field names are the wire format: `{"pair": "ETHUSDT", "signal":
/// "LONG", "tf": "5m", "ts": 1700000000}`. `ts` is informational only;
/// the controller deduplicates by direction, not timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub pair: String,
    pub signal: Direction,
    pub tf: String,
    pub ts: i64,
}

/// File-backed signal slot
#[derive(Debug, Clone)]
pub struct SignalChannel {
    path: PathBuf,
}

impl SignalChannel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SignalChannel { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the latest signal, if any.
    ///
    /// Never blocks and never errors: a missing file, unreadable file,
    /// or corrupt record all yield `None`.
    pub fn read_latest(&self) -> Option<TradingSignal> {
        let contents = fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&contents).ok()
    }

    /// Overwrite the slot with a new signal (producer side).
    ///
    /// Writes to a temp file in the same directory, then renames over
    /// the slot so concurrent readers see either the old record or the
    /// new one, never a torn write.
    pub fn publish(&self, signal: &TradingSignal) -> Result<()> {
        let payload = serde_json::to_string_pretty(signal)?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, payload)
            .with_context(|| format!("Failed to write signal to {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace signal file {}", self.path.display()))?;

        Ok(())
    }
}
