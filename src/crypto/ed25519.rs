/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use rand_core::{CryptoRng, RngCore};

pub const SIGN_PUBLIC_KEY_SIZE: usize = 32;
pub const SIGN_SECRET_KEY_SIZE: usize = 64;
pub const SIGN_SEED_SIZE: usize = 32;
pub const SIGNATURE_SIZE: usize = 64;

/// An Ed25519 public verification key.
pub trait SignPublicKey: Sized {
    /// Create a public key from raw bytes.
    ///
    /// **CRITICAL**: This function must return `None` if the input is not a valid
    /// curve point encoding.
    fn from_bytes(raw_key: &[u8; SIGN_PUBLIC_KEY_SIZE]) -> Option<Self>;

    /// Verify a detached signature over `message`.
    fn verify(&self, message: &[u8], signature: &[u8; SIGNATURE_SIZE]) -> bool;
}

/// An Ed25519 signing keypair, the long-term identity of a Salt Channel peer.
///
/// The 64-byte secret follows the NaCl layout: 32-byte seed followed by the 32-byte
/// public key. Instances must securely delete the seed when dropped.
pub trait SignKeyPair: Sized {
    type PublicKey: SignPublicKey;

    /// Randomly generate a new signing keypair.
    fn generate(rng: &mut (impl RngCore + CryptoRng)) -> Self;

    /// Reconstruct a keypair from the NaCl 64-byte secret-key encoding.
    /// Returns `None` if the trailing public half does not match the seed.
    fn from_secret_bytes(secret: &[u8; SIGN_SECRET_KEY_SIZE]) -> Option<Self>;

    /// Deterministically derive a keypair from a 32-byte seed.
    fn from_seed(seed: &[u8; SIGN_SEED_SIZE]) -> Self;

    fn public_key_bytes(&self) -> [u8; SIGN_PUBLIC_KEY_SIZE];

    /// Produce a detached signature over `message`.
    fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE];
}
