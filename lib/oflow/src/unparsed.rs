// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

// Copyright 2025 Oxide Computer Company

//! Policy for discriminator values we do not recognize.
//!
//! A decoder built against protocol revision N will meet TLV classes
//! and message types minted by revision N+1. Whether that aborts the
//! decode or skips the element is a deployment decision, so it is a
//! swappable strategy threaded through every read via
//! [`ReaderContext`] rather than baked into the codecs.

use crate::OflowError;
use slog::Logger;
use slog::debug;
use slog::warn;
use std::collections::HashMap;
use std::sync::Mutex;

/// Decides the fate of an unknown discriminator.
///
/// `kind` names the element being discriminated (e.g. "OFOxm"),
/// `discriminator` the header field holding the unknown value. An
/// `Ok(())` return tells the codec to skip the element -- the codec
/// guarantees the cursor lands exactly past the element's declared
/// length. An `Err` aborts the whole decode.
pub trait UnparsedHandler: Sync {
    fn unparsed(
        &self,
        kind: &'static str,
        discriminator: &'static str,
        value: u64,
    ) -> Result<(), OflowError>;
}

/// The default policy: any unknown discriminator is a parse error.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThrowOnUnparsed;

impl UnparsedHandler for ThrowOnUnparsed {
    fn unparsed(
        &self,
        kind: &'static str,
        discriminator: &'static str,
        value: u64,
    ) -> Result<(), OflowError> {
        Err(OflowError::UnknownDiscriminator { kind, discriminator, value })
    }
}

/// Skip-and-continue policy with rate-limited logging.
///
/// The first occurrence of each `(kind, value)` pair logs at warning
/// level, every later one at debug. The counters are the one piece of
/// shared mutable state in this crate; increments must not be lost
/// under concurrent decodes.
pub struct LogUnparsed {
    log: Logger,
    seen: Mutex<HashMap<(&'static str, u64), u64>>,
}

impl LogUnparsed {
    pub fn new(log: Logger) -> Self {
        Self { log, seen: Mutex::new(HashMap::new()) }
    }

    /// How many times the pair has been seen so far.
    pub fn occurrences(&self, kind: &'static str, value: u64) -> u64 {
        self.seen.lock().unwrap().get(&(kind, value)).copied().unwrap_or(0)
    }
}

impl UnparsedHandler for LogUnparsed {
    fn unparsed(
        &self,
        kind: &'static str,
        discriminator: &'static str,
        value: u64,
    ) -> Result<(), OflowError> {
        let prev = {
            let mut seen = self.seen.lock().unwrap();
            let count = seen.entry((kind, value)).or_insert(0);
            let prev = *count;
            *count += 1;
            prev
        };

        if prev == 0 {
            warn!(
                self.log,
                "unknown value {:#x} for discriminator {} of {}; \
                 element skipped",
                value, discriminator, kind
            );
        } else {
            debug!(
                self.log,
                "unknown value {:#x} for discriminator {} of {}; \
                 element skipped",
                value, discriminator, kind
            );
        }

        Ok(())
    }
}

/// Context for one decode operation.
///
/// There is deliberately no process-wide mutable default handler; the
/// caller that wants skip-and-continue passes it here.
#[derive(Clone, Copy)]
pub struct ReaderContext<'a> {
    handler: &'a dyn UnparsedHandler,
}

impl<'a> ReaderContext<'a> {
    /// Fail on anything unknown.
    pub const DEFAULT: ReaderContext<'static> =
        ReaderContext { handler: &ThrowOnUnparsed };

    pub fn new(handler: &'a dyn UnparsedHandler) -> Self {
        Self { handler }
    }

    pub fn unparsed_handler(&self) -> &dyn UnparsedHandler {
        self.handler
    }
}

impl Default for ReaderContext<'static> {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use slog::Discard;
    use slog::o;

    #[test]
    fn throw_policy_is_fatal() {
        let res = ThrowOnUnparsed.unparsed("OFOxm", "typeLen", 0xdead);
        assert_eq!(
            res,
            Err(OflowError::UnknownDiscriminator {
                kind: "OFOxm",
                discriminator: "typeLen",
                value: 0xdead,
            })
        );
    }

    #[test]
    fn log_policy_counts_per_pair() {
        let handler = LogUnparsed::new(Logger::root(Discard, o!()));
        assert_eq!(handler.occurrences("OFOxm", 7), 0);
        for _ in 0..3 {
            handler.unparsed("OFOxm", "typeLen", 7).unwrap();
        }
        handler.unparsed("OFMessage", "type", 7).unwrap();
        assert_eq!(handler.occurrences("OFOxm", 7), 3);
        assert_eq!(handler.occurrences("OFMessage", 7), 1);
        assert_eq!(handler.occurrences("OFMessage", 8), 0);
    }
}
