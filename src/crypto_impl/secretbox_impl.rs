/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use crypto_secretbox::aead::{AeadInPlace, KeyInit};
use crypto_secretbox::{Key, Nonce, Tag, XSalsa20Poly1305};

use crate::crypto::secretbox::*;

impl Aead for XSalsa20Poly1305 {
    fn encrypt_in_place(key: &[u8; SESSION_KEY_SIZE], nonce: &[u8; AEAD_NONCE_SIZE], buffer: &mut [u8]) -> bool {
        if buffer.len() < AEAD_ZERO_SIZE {
            return false;
        }
        let cipher = XSalsa20Poly1305::new(Key::from_slice(key));
        match cipher.encrypt_in_place_detached(Nonce::from_slice(nonce), &[], &mut buffer[AEAD_ZERO_SIZE..]) {
            Ok(tag) => {
                buffer[AEAD_BOX_ZERO_SIZE..AEAD_ZERO_SIZE].copy_from_slice(tag.as_slice());
                true
            }
            Err(_) => false,
        }
    }

    fn decrypt_in_place(key: &[u8; SESSION_KEY_SIZE], nonce: &[u8; AEAD_NONCE_SIZE], buffer: &mut [u8]) -> bool {
        if buffer.len() < AEAD_ZERO_SIZE {
            return false;
        }
        let cipher = XSalsa20Poly1305::new(Key::from_slice(key));
        let tag: [u8; AEAD_TAG_SIZE] = buffer[AEAD_BOX_ZERO_SIZE..AEAD_ZERO_SIZE].try_into().unwrap();
        let ok = cipher
            .decrypt_in_place_detached(Nonce::from_slice(nonce), &[], &mut buffer[AEAD_ZERO_SIZE..], Tag::from_slice(&tag))
            .is_ok();
        if ok {
            // Restore the NaCl plaintext view: the MAC region reads as zeros again.
            buffer[..AEAD_ZERO_SIZE].fill(0);
        }
        ok
    }
}
