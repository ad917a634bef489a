/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

#[cfg(feature = "ed25519-dalek")]
mod ed25519_impl;
#[cfg(feature = "crypto_secretbox")]
mod secretbox_impl;
#[cfg(feature = "sha2")]
mod sha512;
#[cfg(feature = "x25519-dalek")]
mod x25519_impl;

#[cfg(feature = "ed25519-dalek")]
pub use ed25519_dalek;
#[cfg(feature = "crypto_secretbox")]
pub use crypto_secretbox;
#[cfg(feature = "crypto_secretbox")]
pub use salsa20;
#[cfg(feature = "sha2")]
pub use sha2;
#[cfg(feature = "x25519-dalek")]
pub use x25519_dalek;
