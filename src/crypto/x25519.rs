/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use rand_core::{CryptoRng, RngCore};

use crate::crypto::secret::Secret;
use crate::crypto::secretbox::SESSION_KEY_SIZE;

pub const DH_PUBLIC_KEY_SIZE: usize = 32;
pub const DH_SECRET_KEY_SIZE: usize = 32;

/// An X25519 ephemeral key agreement pair.
///
/// Instances must securely delete the secret key when dropped.
pub trait DhKeyPair: Sized {
    /// Randomly generate a new keypair.
    /// This function may use the provided RNG or its own,
    /// so long as the produced keys are cryptographically random.
    fn generate(rng: &mut (impl RngCore + CryptoRng)) -> Self;

    /// Deterministically derive a keypair from a raw 32-byte secret.
    /// Mainly useful to reproduce published handshake traces; production
    /// sessions should always use `generate`.
    fn from_secret_bytes(secret: &[u8; DH_SECRET_KEY_SIZE]) -> Self;

    /// Get the raw bytes that uniquely define the public key.
    fn public_key_bytes(&self) -> [u8; DH_PUBLIC_KEY_SIZE];

    /// Derive the shared symmetric session key from this secret key and the remote
    /// public key, writing it to `output`.
    ///
    /// This is the NaCl box precomputation: the raw X25519 shared secret run through
    /// HSalsa20 with a zero block. The output must be directly usable as an
    /// XSalsa20-Poly1305 key.
    ///
    /// **CRITICAL**: This function must return `false` if agreement with `public_key`
    /// would produce a predictable or all-zero shared secret (e.g. a low-order point).
    fn agree(&self, public_key: &[u8; DH_PUBLIC_KEY_SIZE], output: &mut Secret<SESSION_KEY_SIZE>) -> bool;
}
