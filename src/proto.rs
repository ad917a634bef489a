/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */

use crate::crypto::{AEAD_TAG_SIZE, DH_PUBLIC_KEY_SIZE, SIGNATURE_SIZE, SIGN_PUBLIC_KEY_SIZE};

/* Common constants */

/// Protocol identifier carried in M1 and advertised as P1 in A2.
pub const PROTOCOL_ID: [u8; 10] = *b"SCv2------";
/// Default P2 entry: any application layer.
pub const PROFILE_ANY: [u8; 10] = *b"----------";

pub(crate) const SIZE_PREFIX_SIZE: usize = 4;
pub(crate) const HEADER_SIZE: usize = 2;

/* Packet constants */

pub(crate) const PACKET_TYPE_M1: u8 = 1;
pub(crate) const PACKET_TYPE_M2: u8 = 2;
pub(crate) const PACKET_TYPE_M3: u8 = 3;
pub(crate) const PACKET_TYPE_M4: u8 = 4;
pub(crate) const PACKET_TYPE_APP: u8 = 5;
pub(crate) const PACKET_TYPE_ENCRYPTED: u8 = 6;
pub(crate) const PACKET_TYPE_A1: u8 = 8;
pub(crate) const PACKET_TYPE_A2: u8 = 9;
#[allow(unused)]
pub(crate) const PACKET_TYPE_TT: u8 = 10;
pub(crate) const PACKET_TYPE_MULTI_APP: u8 = 11;

pub(crate) const M1_FLAG_SIG_KEY_INCLUDED: u8 = 0x01;
#[allow(unused)]
pub(crate) const M1_FLAG_TICKET_REQUESTED: u8 = 0x10;
pub(crate) const M2_FLAG_NO_SUCH_SERVER: u8 = 0x01;
pub(crate) const M2_FLAG_RESUME_UNSUPPORTED: u8 = 0x10;
pub(crate) const A2_FLAG_NO_SUCH_SERVER: u8 = 0x01;
/// High bit of the App/MultiApp/A2 flags byte: no further messages from the sender.
pub(crate) const FLAG_LAST: u8 = 0x80;

/* Key exchange constants */

pub(crate) const SIG1_PREFIX: &[u8; 8] = b"SC-SIG01";
pub(crate) const SIG2_PREFIX: &[u8; 8] = b"SC-SIG02";

pub(crate) const M1_SIZE: usize = HEADER_SIZE + PROTOCOL_ID.len() + DH_PUBLIC_KEY_SIZE;
pub(crate) const M1_PINNED_SIZE: usize = M1_SIZE + SIGN_PUBLIC_KEY_SIZE;
pub(crate) const M2_SIZE: usize = HEADER_SIZE + DH_PUBLIC_KEY_SIZE;
/// Cleartext size of M3 and M4: header, signing key, detached signature.
pub(crate) const M3M4_SIZE: usize = HEADER_SIZE + SIGN_PUBLIC_KEY_SIZE + SIGNATURE_SIZE;

/* App layer constants */

pub(crate) const TIME_SIZE: usize = 4;
/// Inner header of App/MultiApp cleartext: type, flags, timestamp.
pub(crate) const APP_HEADER_SIZE: usize = HEADER_SIZE + TIME_SIZE;
/// Wire overhead of the encrypted container: its own header plus the AEAD MAC.
pub(crate) const ENCRYPTED_OVERHEAD: usize = HEADER_SIZE + AEAD_TAG_SIZE;

pub const MAX_A2_PAIRS: usize = 127;

/* Buffer layout */
/*
All frames are assembled and received at fixed offsets of the session buffer so that
encrypted bodies line up with the NaCl in-place offsets with no copying:

    [0..10]   scratch (part of the AEAD zero prefix)
    [10..14]  outgoing size prefix
    [14..16]  outer header (type, flags)
    [16..32]  AEAD MAC on the wire / zero prefix for the cipher
    [32..]    inner cleartext (or plaintext body of unencrypted frames at 14..)
*/
pub(crate) const WRITE_FRAME_OFFSET: usize = 10;
pub(crate) const BODY_OFFSET: usize = WRITE_FRAME_OFFSET + SIZE_PREFIX_SIZE;
pub(crate) const CLEAR_OFFSET: usize = 32;

/// Fixed per-frame cost over the application payload: the 32-byte AEAD zero prefix
/// (which also hosts the size prefix and outer header) plus the inner header and
/// timestamp.
pub const APP_OVERHEAD: usize = CLEAR_OFFSET + APP_HEADER_SIZE;

/// Floor that guarantees room for every handshake frame (the largest is M3/M4,
/// whose cleartext ends at buffer offset 130).
pub const MIN_BUFFER_SIZE: usize = 200;

/// Smallest working buffer able to carry application payloads of `app_max` bytes.
/// Sizing the buffer is how the caller sets its application message limit.
pub const fn buffer_size_for(app_max: usize) -> usize {
    let need = app_max + APP_OVERHEAD;
    if need > MIN_BUFFER_SIZE {
        need
    } else {
        MIN_BUFFER_SIZE
    }
}
