/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Session events that might be interesting to log or aggregate into metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogEvent {
    SendM1 { pinned: bool },
    ReceiveValidM1 { pinned: bool },
    SendM2 { no_such_server: bool },
    ReceiveValidM2,
    SendM3,
    ReceiveValidM3,
    SendM4,
    ReceiveValidM4,
    /// Handshake complete; application I/O is now allowed.
    Established,
    /// Answered an A1 query with `pairs` protocol entries (host side).
    ServeDiscovery { pairs: usize, no_such_server: bool },
    /// Received an A2 answer listing `pairs` protocol entries (client side).
    ReceiveA2 { pairs: usize },
    SendAppFrame { messages: u16, last: bool },
    ReceiveAppFrame { messages: u16, last: bool },
    /// The session ended and its secrets were wiped. `by_peer` is true when the
    /// peer's LastFlag caused it.
    Closed { by_peer: bool },
}

/// Macro to turn off logging at compile time.
macro_rules! log {
    ($app:expr, $event:expr) => {
        #[cfg(feature = "logging")]
        $app.event_log($event);
    };
}
pub(crate) use log;
