/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use crate::crypto::AEAD_NONCE_SIZE;

/// Monotonic AEAD nonce counter.
///
/// One counter exists per direction. The client encrypts with 1, 3, 5, ... and the
/// host with 2, 4, 6, ..., so the low bit identifies the sender and the two
/// directions can never collide on the same session key. The counter is opaque on
/// purpose: the only way to obtain a nonce is `step`, which also advances, so a
/// value can not be reused or assigned from outside.
pub(crate) struct NonceCounter(u64);

impl NonceCounter {
    pub fn new(start: u64) -> Self {
        Self(start)
    }

    /// The 24-byte wire nonce for the current counter value: the counter
    /// little-endian in the first 8 bytes, zeros after. Advances by 2.
    ///
    /// Returns `None` on wraparound, at which point the session must end; a reused
    /// nonce with the same key would void every AEAD guarantee.
    pub fn step(&mut self) -> Option<[u8; AEAD_NONCE_SIZE]> {
        let mut nonce = [0u8; AEAD_NONCE_SIZE];
        nonce[..8].copy_from_slice(&self.0.to_le_bytes());
        self.0 = self.0.checked_add(2)?;
        Some(nonce)
    }
}
