/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use sha2::{Digest, Sha512};

use crate::crypto::sha512::{Sha512Hash, SHA512_HASH_SIZE};

pub type Sha512Crate = Sha512;
impl Sha512Hash for Sha512Crate {
    fn new() -> Self {
        Digest::new()
    }

    fn update(&mut self, input: &[u8]) {
        Digest::update(self, input)
    }

    fn finish_and_reset(&mut self, output: &mut [u8; SHA512_HASH_SIZE]) {
        let mut hasher = Digest::new();
        std::mem::swap(self, &mut hasher);
        *output = hasher.finalize().into();
    }
}
