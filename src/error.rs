/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// A type of fault occurred because we received a bad packet.
///
/// An unauthenticated attacker can intentionally trigger any of these, so it is best
/// to treat them as raw user input that needs to be sanitized. Every fault is fatal
/// to the session: secret material is wiped and only teardown remains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultType {
    /// The received frame was not well formed: bad size prefix, inner length fields
    /// disagreeing with the outer size, or an unknown packet type.
    InvalidPacket,

    /// A well-formed message arrived in a state where it is not allowed, or carried
    /// a flag combination that is not allowed at this point of the protocol.
    OutOfSequence,

    /// AEAD or signature verification failed, the peer proved an identity other than
    /// the pinned one, or key agreement produced a degenerate secret.
    FailedAuthentication,

    /// The peer's timestamp regressed past the configured tolerance.
    ExpiredTimestamp,
}

/// Error type for every session operation, parameterized on the transport's own
/// error type.
#[derive(Debug, PartialEq, Eq)]
pub enum Error<IoError> {
    /// The transport would block. Not a failure; the operation saved its progress
    /// and must be invoked again once the transport is ready.
    Pending,

    /// The transport callback reported a fatal error.
    Transport(IoError),

    /// Bad or malicious wire input. `file`/`line` uniquely identify the check that
    /// tripped, which is useful when debugging an interop problem; be cautious about
    /// logging `fault` in production since an attacker chooses which one occurs.
    Fault {
        fault: FaultType,
        file: &'static str,
        line: u32,
    },

    /// The host refused the signing key pinned in M1, or an A1 query named a host
    /// that is not served here.
    NoSuchServer,

    /// Attempt to exchange application data before the handshake has completed.
    NotEstablished,

    /// The session is over: the peer set LastFlag, we sent a final frame, teardown
    /// was requested, or a previous fatal error already wiped it.
    SessionClosed,

    /// The supplied messages do not fit the session buffer, or exceed a wire limit
    /// such as the 16-bit per-message length of a MultiApp batch.
    DataTooLarge,
}

impl<IoError> Error<IoError> {
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, Error::Pending)
    }

    /// The fault type, if this error was caused by bad wire input.
    pub fn fault(&self) -> Option<FaultType> {
        match self {
            Error::Fault { fault, .. } => Some(*fault),
            _ => None,
        }
    }
}

/// Init-time rejection; no session exists afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The working buffer is smaller than the minimum `required` bytes.
    BufferTooSmall { required: usize },

    /// The AEAD backend failed the in-place zero-padding probe and can not be
    /// trusted with the session buffer.
    BadCryptoBackend,
}

/// Raise a wire-input fault, recording the site that detected it.
macro_rules! fault {
    ($fault:ident) => {
        $crate::error::Error::Fault {
            fault: $crate::error::FaultType::$fault,
            file: file!(),
            line: line!(),
        }
    };
}
pub(crate) use fault;
