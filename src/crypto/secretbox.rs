/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub const SESSION_KEY_SIZE: usize = 32;
pub const AEAD_NONCE_SIZE: usize = 24;
pub const AEAD_TAG_SIZE: usize = 16;

/// Zero prefix required in front of plaintext (NaCl `crypto_secretbox` convention).
pub const AEAD_ZERO_SIZE: usize = 32;
/// Zero prefix remaining in front of ciphertext; the MAC occupies the 16 bytes after it.
pub const AEAD_BOX_ZERO_SIZE: usize = 16;

/// In-place XSalsa20-Poly1305, NaCl zero-padding convention.
///
/// Both operations work on a single buffer laid out the NaCl way:
///
/// ```text
/// plaintext view:   [0u8; 32] || message
/// ciphertext view:  [0u8; 16] || mac[16] || encrypted message
/// ```
///
/// `encrypt_in_place` consumes the plaintext view and leaves the ciphertext view in the
/// same buffer; `decrypt_in_place` is the reverse and must not disclose anything about
/// the plaintext when authentication fails.
///
/// Implementations must operate strictly in place; the framer hands them a window of
/// the session's working buffer and relies on every byte landing at its NaCl offset.
pub trait Aead {
    /// Returns false if the buffer is shorter than the 32-byte zero prefix or the
    /// backend refuses the operation.
    fn encrypt_in_place(key: &[u8; SESSION_KEY_SIZE], nonce: &[u8; AEAD_NONCE_SIZE], buffer: &mut [u8]) -> bool;

    /// Returns false on authentication failure. On success the plaintext view is
    /// restored, zero prefix included.
    fn decrypt_in_place(key: &[u8; SESSION_KEY_SIZE], nonce: &[u8; AEAD_NONCE_SIZE], buffer: &mut [u8]) -> bool;
}
