/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand_core::{CryptoRng, RngCore};

use crate::crypto::ed25519::*;

impl SignPublicKey for VerifyingKey {
    fn from_bytes(raw_key: &[u8; SIGN_PUBLIC_KEY_SIZE]) -> Option<Self> {
        VerifyingKey::from_bytes(raw_key).ok()
    }

    fn verify(&self, message: &[u8], signature: &[u8; SIGNATURE_SIZE]) -> bool {
        Verifier::verify(self, message, &Signature::from_bytes(signature)).is_ok()
    }
}

impl SignKeyPair for SigningKey {
    type PublicKey = VerifyingKey;

    fn generate(rng: &mut (impl RngCore + CryptoRng)) -> Self {
        SigningKey::generate(rng)
    }

    fn from_secret_bytes(secret: &[u8; SIGN_SECRET_KEY_SIZE]) -> Option<Self> {
        SigningKey::from_keypair_bytes(secret).ok()
    }

    fn from_seed(seed: &[u8; SIGN_SEED_SIZE]) -> Self {
        SigningKey::from_bytes(seed)
    }

    fn public_key_bytes(&self) -> [u8; SIGN_PUBLIC_KEY_SIZE] {
        self.verifying_key().to_bytes()
    }

    fn sign(&self, message: &[u8]) -> [u8; SIGNATURE_SIZE] {
        Signer::sign(self, message).to_bytes()
    }
}
