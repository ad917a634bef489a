/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use rand_core::{CryptoRng, RngCore};
use salsa20::cipher::consts::U10;
use salsa20::hsalsa;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::crypto::secret::Secret;
use crate::crypto::secretbox::SESSION_KEY_SIZE;
use crate::crypto::x25519::*;

impl DhKeyPair for StaticSecret {
    fn generate(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        StaticSecret::random_from_rng(&mut *rng)
    }

    fn from_secret_bytes(secret: &[u8; DH_SECRET_KEY_SIZE]) -> Self {
        StaticSecret::from(*secret)
    }

    fn public_key_bytes(&self) -> [u8; DH_PUBLIC_KEY_SIZE] {
        PublicKey::from(self).to_bytes()
    }

    fn agree(&self, public_key: &[u8; DH_PUBLIC_KEY_SIZE], output: &mut Secret<SESSION_KEY_SIZE>) -> bool {
        let shared = self.diffie_hellman(&PublicKey::from(*public_key));
        if !shared.was_contributory() {
            return false;
        }
        // NaCl crypto_box_beforenm: HSalsa20 of the raw shared secret with a zero block.
        let key = hsalsa::<U10>(shared.as_bytes().into(), &[0u8; 16].into());
        output.as_mut().copy_from_slice(key.as_slice());
        true
    }
}
