/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub const SHA512_HASH_SIZE: usize = 64;

/// Streaming SHA-512.
///
/// The handshake feeds the M1 and M2 message bodies through this incrementally so the
/// transcript never has to be retained in the working buffer.
pub trait Sha512Hash: Sized {
    fn new() -> Self;

    fn update(&mut self, input: &[u8]);

    /// Write the digest to `output` and reset to the initial state.
    fn finish_and_reset(&mut self, output: &mut [u8; SHA512_HASH_SIZE]);

    /// One-shot digest of a single input.
    fn hash(input: &[u8]) -> [u8; SHA512_HASH_SIZE] {
        let mut h = Self::new();
        h.update(input);
        let mut out = [0u8; SHA512_HASH_SIZE];
        h.finish_and_reset(&mut out);
        out
    }
}
