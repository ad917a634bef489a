/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use zeroize::Zeroize;

/// Constant time byte slice equality.
#[inline]
pub fn secure_eq<A: AsRef<[u8]> + ?Sized, B: AsRef<[u8]> + ?Sized>(a: &A, b: &B) -> bool {
    let (a, b) = (a.as_ref(), b.as_ref());
    if a.len() == b.len() {
        let mut x = 0u8;
        for (aa, bb) in a.iter().zip(b.iter()) {
            x |= *aa ^ *bb;
        }
        x == 0
    } else {
        false
    }
}

/// Container for secrets that clears them on drop.
///
/// We can't be totally sure that things like libraries are doing this and it's
/// hard to get every use of a secret anywhere, but using this in our code at
/// least reduces the number of secrets that are left lying around in memory.
#[derive(Clone)]
#[repr(transparent)]
pub struct Secret<const L: usize>(pub [u8; L]);

impl<const L: usize> Secret<L> {
    /// Create a new all-zero secret.
    #[inline(always)]
    pub fn new() -> Self {
        Self([0u8; L])
    }

    /// Copy bytes into a secret, then wipe the source. Panics if the slice length does not match.
    pub fn from_bytes_then_delete(b: &mut [u8]) -> Self {
        let ret = Self(b.try_into().unwrap());
        b.zeroize();
        ret
    }

    #[inline(always)]
    pub fn as_bytes(&self) -> &[u8; L] {
        &self.0
    }

    #[inline(always)]
    pub fn overwrite(&mut self, src: &Self) {
        self.0.copy_from_slice(&src.0);
    }

    /// Wipe the contents in place, leaving an all-zero secret.
    #[inline]
    pub fn clear(&mut self) {
        self.0.zeroize();
    }

    pub fn eq_bytes(&self, other: &[u8]) -> bool {
        secure_eq(&self.0, other)
    }
}

impl<const L: usize> Drop for Secret<L> {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl<const L: usize> Default for Secret<L> {
    #[inline(always)]
    fn default() -> Self {
        Self([0u8; L])
    }
}

impl<const L: usize> AsRef<[u8]> for Secret<L> {
    #[inline(always)]
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl<const L: usize> AsMut<[u8]> for Secret<L> {
    #[inline(always)]
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl<const L: usize> PartialEq for Secret<L> {
    fn eq(&self, other: &Self) -> bool {
        secure_eq(&self.0, &other.0)
    }
}
impl<const L: usize> Eq for Secret<L> {}
