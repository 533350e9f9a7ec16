//! Reading and writing single VCP features.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::{
    cap::{describe_input, INPUT_SELECT_CODE},
    transport::{Transport, VcpReply},
};

/// How long a read-back is retried after a write.
pub const VERIFY_TIMEOUT: Duration = Duration::from_millis(3000);

const INPUT_HDMI: u32 = 0x11;
const INPUT_DISPLAY_PORT: u32 = 0x0F;

/// How a read-back after a write ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// A read returned the expected value.
    Confirmed,
    /// Reads succeeded but never returned the expected value. Holds the last
    /// value read.
    Mismatch(u32),
    /// No read succeeded before the deadline.
    Timeout,
}

impl VerifyOutcome {
    pub fn success(&self) -> bool {
        matches!(self, VerifyOutcome::Confirmed)
    }

    /// The last value read back, if any read succeeded.
    pub fn observed(&self, expected: u32) -> Option<u32> {
        match self {
            VerifyOutcome::Confirmed => Some(expected),
            VerifyOutcome::Mismatch(observed) => Some(*observed),
            VerifyOutcome::Timeout => None,
        }
    }
}

pub fn get<T: Transport>(
    transport: &T,
    monitor: &T::Monitor,
    code: u8,
) -> Option<VcpReply> {
    match transport.vcp_get(monitor, code) {
        Ok(reply) => Some(reply),
        Err(err) => {
            debug!("reading VCP feature 0x{:x} failed: {}", code, err);
            None
        }
    }
}

pub fn set<T: Transport>(
    transport: &T,
    monitor: &T::Monitor,
    code: u8,
    value: u32,
) -> bool {
    match transport.vcp_set(monitor, code, value) {
        Ok(()) => true,
        Err(err) => {
            warn!("writing VCP feature 0x{:x} failed: {}", code, err);
            false
        }
    }
}

/// Reads `code` back until it equals `expected` or [`VERIFY_TIMEOUT`] has
/// passed since the first read.
pub fn verify<T: Transport>(
    transport: &T,
    monitor: &T::Monitor,
    code: u8,
    expected: u32,
) -> VerifyOutcome {
    verify_within(transport, monitor, code, expected, VERIFY_TIMEOUT)
}

/// Like [`verify`] with an explicit deadline.
///
/// Reads are issued back to back without sleeping. Monitors often apply a
/// write within tens of milliseconds and every read already takes a while.
pub fn verify_within<T: Transport>(
    transport: &T,
    monitor: &T::Monitor,
    code: u8,
    expected: u32,
    timeout: Duration,
) -> VerifyOutcome {
    let start = Instant::now();
    let mut attempts = 0;
    let mut observed = None;

    loop {
        attempts += 1;
        if let Some(reply) = get(transport, monitor, code) {
            if reply.current == expected {
                debug!(
                    "VCP feature 0x{:x} confirmed after {} reads in {:?}",
                    code,
                    attempts,
                    start.elapsed()
                );
                return VerifyOutcome::Confirmed;
            }
            observed = Some(reply.current);
        }

        if start.elapsed() >= timeout {
            break;
        }
    }

    debug!(
        "gave up verifying VCP feature 0x{:x} after {} reads",
        code, attempts
    );
    match observed {
        Some(value) => VerifyOutcome::Mismatch(value),
        None => VerifyOutcome::Timeout,
    }
}

/// The input to switch to from `current`. HDMI goes to DisplayPort and
/// everything else goes to HDMI.
pub fn toggled_input(current: u32) -> u32 {
    if current == INPUT_HDMI {
        INPUT_DISPLAY_PORT
    } else {
        INPUT_HDMI
    }
}

/// Switches the input source between HDMI and DisplayPort.
pub fn toggle<T: Transport>(
    transport: &T,
    monitor: &T::Monitor,
    verify_write: bool,
) -> bool {
    toggle_within(transport, monitor, verify_write, VERIFY_TIMEOUT)
}

pub fn toggle_within<T: Transport>(
    transport: &T,
    monitor: &T::Monitor,
    verify_write: bool,
    timeout: Duration,
) -> bool {
    let Some(reply) = get(transport, monitor, INPUT_SELECT_CODE) else {
        warn!("failed to read the current input source");
        return false;
    };

    let target = toggled_input(reply.current);
    debug!(
        "switching input source from {} to {}",
        describe_input(reply.current),
        describe_input(target)
    );

    if !set(transport, monitor, INPUT_SELECT_CODE, target) {
        return false;
    }

    if verify_write {
        verify_within(transport, monitor, INPUT_SELECT_CODE, target, timeout)
            .success()
    } else {
        true
    }
}
