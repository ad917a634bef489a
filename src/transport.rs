/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

/// Non-blocking byte transport supplied by the caller.
///
/// The engine never blocks; whenever a call returns `Ok(0)` the current session
/// operation saves its progress and surfaces `Error::Pending`, and the caller
/// re-invokes it once the transport is ready again. Readiness signalling (epoll,
/// poll, a serial ISR, busy spinning) is entirely the caller's concern.
///
/// A blocking implementation is acceptable too; the engine simply never observes
/// `Ok(0)` from it.
///
/// The transport must preserve byte order. It does not have to preserve message
/// boundaries; the engine reassembles frames from arbitrary chunkings.
pub trait Transport {
    type Error: core::fmt::Debug;

    /// Read up to `buf.len()` bytes. `Ok(0)` means the call would block.
    ///
    /// An end-of-stream condition must be mapped to `Err`: a peer that hangs up
    /// mid-session is a fatal transport condition, not an empty read.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Write up to `buf.len()` bytes, returning how many were accepted.
    /// `Ok(0)` means the call would block.
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
}
