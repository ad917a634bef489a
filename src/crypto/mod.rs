/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

pub mod ed25519;
pub mod secret;
pub mod secretbox;
pub mod sha512;
pub mod x25519;

// We re-export our dependencies so it is less of a headache for the implementor to use the same
// exact version of them.
pub use rand_core;

pub use ed25519::{SignKeyPair, SignPublicKey, SIGNATURE_SIZE, SIGN_PUBLIC_KEY_SIZE, SIGN_SECRET_KEY_SIZE, SIGN_SEED_SIZE};
pub use secret::{secure_eq, Secret};
pub use secretbox::{Aead, AEAD_BOX_ZERO_SIZE, AEAD_NONCE_SIZE, AEAD_TAG_SIZE, AEAD_ZERO_SIZE, SESSION_KEY_SIZE};
pub use sha512::{Sha512Hash, SHA512_HASH_SIZE};
pub use x25519::{DhKeyPair, DH_PUBLIC_KEY_SIZE, DH_SECRET_KEY_SIZE};

/// Round-trip probe of the AEAD backend's in-place zero-padding contract.
///
/// The framer writes plaintext at offset 32 of a zero-prefixed buffer and expects the
/// MAC to land at offset 16 with the ciphertext following it in place. A backend that
/// shuffles data anywhere else would silently corrupt frames, so session init refuses
/// to proceed unless this probe passes.
pub(crate) fn probe_aead_contract<A: Aead>() -> bool {
    let key = Secret([0x17u8; SESSION_KEY_SIZE]);
    let nonce = [0x2au8; AEAD_NONCE_SIZE];
    let msg = *b"probe";

    let mut buf = [0u8; AEAD_ZERO_SIZE + 5];
    buf[AEAD_ZERO_SIZE..].copy_from_slice(&msg);
    if !A::encrypt_in_place(key.as_bytes(), &nonce, &mut buf) {
        return false;
    }
    // First 16 bytes stay zero, the MAC overlays 16..32, and something changed.
    if buf[..AEAD_BOX_ZERO_SIZE].iter().any(|&b| b != 0) || buf[AEAD_ZERO_SIZE..] == msg {
        return false;
    }
    if !A::decrypt_in_place(key.as_bytes(), &nonce, &mut buf) {
        return false;
    }
    buf[..AEAD_ZERO_SIZE].iter().all(|&b| b == 0) && buf[AEAD_ZERO_SIZE..] == msg
}
