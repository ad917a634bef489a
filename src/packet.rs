/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use crate::crypto::{DH_PUBLIC_KEY_SIZE, SIGNATURE_SIZE, SIGN_PUBLIC_KEY_SIZE};
use crate::error::{fault, Error};
use crate::proto::*;

/* Handshake messages.
 *
 * Every codec function works on a message body: the bytes between the size prefix and
 * the end of the frame, type and flags included. Encoders return the number of bytes
 * written and never allocate; decoders are strict and reject any length disagreement
 * before a single field is handed out.
 */

#[derive(Debug)]
pub(crate) struct M1<'a> {
    pub client_dh_key: &'a [u8; DH_PUBLIC_KEY_SIZE],
    /// Set when the client pins the host identity it expects to talk to.
    pub pinned_host_key: Option<&'a [u8; SIGN_PUBLIC_KEY_SIZE]>,
}

impl<'a> M1<'a> {
    pub fn encode(&self, body: &mut [u8]) -> usize {
        body[0] = PACKET_TYPE_M1;
        body[1] = if self.pinned_host_key.is_some() { M1_FLAG_SIG_KEY_INCLUDED } else { 0 };
        body[2..12].copy_from_slice(&PROTOCOL_ID);
        body[12..12 + DH_PUBLIC_KEY_SIZE].copy_from_slice(self.client_dh_key);
        if let Some(pinned) = self.pinned_host_key {
            body[M1_SIZE..M1_PINNED_SIZE].copy_from_slice(pinned);
            M1_PINNED_SIZE
        } else {
            M1_SIZE
        }
    }

    pub fn decode<E>(body: &'a [u8]) -> Result<Self, Error<E>> {
        if body.len() < M1_SIZE || body[0] != PACKET_TYPE_M1 {
            return Err(fault!(InvalidPacket));
        }
        if body[2..12] != PROTOCOL_ID {
            return Err(fault!(InvalidPacket));
        }
        let pinned = body[1] & M1_FLAG_SIG_KEY_INCLUDED != 0;
        // Remaining flag bits (including a ticket request) are ignored, not rejected.
        let expected = if pinned { M1_PINNED_SIZE } else { M1_SIZE };
        if body.len() != expected {
            return Err(fault!(InvalidPacket));
        }
        Ok(Self {
            client_dh_key: (&body[12..12 + DH_PUBLIC_KEY_SIZE]).try_into().unwrap(),
            pinned_host_key: pinned.then(|| (&body[M1_SIZE..M1_PINNED_SIZE]).try_into().unwrap()),
        })
    }
}

pub(crate) struct M2<'a> {
    pub no_such_server: bool,
    pub host_dh_key: &'a [u8; DH_PUBLIC_KEY_SIZE],
}

impl<'a> M2<'a> {
    pub fn encode(&self, body: &mut [u8]) -> usize {
        body[0] = PACKET_TYPE_M2;
        // Resume tickets are never supported, so every M2 says so.
        body[1] = M2_FLAG_RESUME_UNSUPPORTED;
        if self.no_such_server {
            body[1] |= M2_FLAG_NO_SUCH_SERVER;
            body[2..M2_SIZE].fill(0);
        } else {
            body[2..M2_SIZE].copy_from_slice(self.host_dh_key);
        }
        M2_SIZE
    }

    pub fn decode<E>(body: &'a [u8]) -> Result<Self, Error<E>> {
        if body.len() != M2_SIZE || body[0] != PACKET_TYPE_M2 {
            return Err(fault!(InvalidPacket));
        }
        Ok(Self {
            no_such_server: body[1] & M2_FLAG_NO_SUCH_SERVER != 0,
            host_dh_key: (&body[2..M2_SIZE]).try_into().unwrap(),
        })
    }
}

/// Cleartext of M3 and M4, identical but for the type byte: the sender's long-term
/// signing key and its signature over the handshake transcript.
pub(crate) struct M3M4<'a> {
    pub sign_key: &'a [u8; SIGN_PUBLIC_KEY_SIZE],
    pub signature: &'a [u8; SIGNATURE_SIZE],
}

impl<'a> M3M4<'a> {
    pub fn encode(&self, packet_type: u8, body: &mut [u8]) -> usize {
        body[0] = packet_type;
        body[1] = 0;
        body[2..2 + SIGN_PUBLIC_KEY_SIZE].copy_from_slice(self.sign_key);
        body[2 + SIGN_PUBLIC_KEY_SIZE..M3M4_SIZE].copy_from_slice(self.signature);
        M3M4_SIZE
    }

    pub fn decode<E>(packet_type: u8, body: &'a [u8]) -> Result<Self, Error<E>> {
        if body.len() != M3M4_SIZE || body[0] != packet_type {
            return Err(fault!(InvalidPacket));
        }
        Ok(Self {
            sign_key: (&body[2..2 + SIGN_PUBLIC_KEY_SIZE]).try_into().unwrap(),
            signature: (&body[2 + SIGN_PUBLIC_KEY_SIZE..M3M4_SIZE]).try_into().unwrap(),
        })
    }
}

/* Application messages */

/// Cursor over the application messages contained in one decrypted frame.
///
/// Borrowed from the session's working buffer: the messages stay valid until the next
/// operation on the session reuses it. A plain App frame yields one message, a
/// MultiApp frame yields them in wire order. All lengths were validated at decode
/// time, so iteration itself can not fail.
#[derive(Debug)]
pub struct Messages<'b> {
    data: &'b [u8],
    remaining: u16,
    multi: bool,
    time: u32,
    last: bool,
}

impl<'b> Messages<'b> {
    /// Sender's timestamp: milliseconds since its handshake, or 0 if it has no clock.
    pub fn time(&self) -> u32 {
        self.time
    }

    /// True when the peer declared this its final frame; the session is closed.
    pub fn is_last(&self) -> bool {
        self.last
    }

    /// Messages not yet yielded.
    pub fn remaining(&self) -> u16 {
        self.remaining
    }
}

impl<'b> Iterator for Messages<'b> {
    type Item = &'b [u8];

    fn next(&mut self) -> Option<&'b [u8]> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        if !self.multi {
            return Some(std::mem::take(&mut self.data));
        }
        let len = u16::from_le_bytes(self.data[..2].try_into().unwrap()) as usize;
        let (item, rest) = self.data[2..].split_at(len);
        self.data = rest;
        Some(item)
    }
}

impl<'b> ExactSizeIterator for Messages<'b> {
    fn len(&self) -> usize {
        self.remaining as usize
    }
}

/// Validate and open the cleartext of an App or MultiApp frame.
pub(crate) fn decode_app<E>(clear: &[u8], max_multi_count: u16) -> Result<Messages<'_>, Error<E>> {
    if clear.len() < APP_HEADER_SIZE {
        return Err(fault!(InvalidPacket));
    }
    let last = clear[1] & FLAG_LAST != 0;
    let time = u32::from_le_bytes(clear[2..6].try_into().unwrap());
    match clear[0] {
        PACKET_TYPE_APP => Ok(Messages {
            data: &clear[APP_HEADER_SIZE..],
            remaining: 1,
            multi: false,
            time,
            last,
        }),
        PACKET_TYPE_MULTI_APP => {
            if clear.len() < APP_HEADER_SIZE + 2 {
                return Err(fault!(InvalidPacket));
            }
            let count = u16::from_le_bytes(clear[6..8].try_into().unwrap());
            if count > max_multi_count {
                return Err(fault!(InvalidPacket));
            }
            // Walk the batch once up front so the cursor never has to range-check.
            let mut at = APP_HEADER_SIZE + 2;
            for _ in 0..count {
                if clear.len() < at + 2 {
                    return Err(fault!(InvalidPacket));
                }
                let len = u16::from_le_bytes(clear[at..at + 2].try_into().unwrap()) as usize;
                at += 2 + len;
                if clear.len() < at {
                    return Err(fault!(InvalidPacket));
                }
            }
            if at != clear.len() {
                return Err(fault!(InvalidPacket));
            }
            Ok(Messages {
                data: &clear[APP_HEADER_SIZE + 2..],
                remaining: count,
                multi: true,
                time,
                last,
            })
        }
        _ => Err(fault!(InvalidPacket)),
    }
}

/// Encode the cleartext of an App (single message) or MultiApp (batch) frame.
/// Returns the cleartext length.
pub(crate) fn encode_app<E>(
    clear: &mut [u8],
    time: u32,
    messages: &[&[u8]],
    last: bool,
    max_multi_count: u16,
) -> Result<usize, Error<E>> {
    debug_assert!(!messages.is_empty());
    if clear.len() < APP_HEADER_SIZE + 2 {
        return Err(Error::DataTooLarge);
    }
    let flags = if last { FLAG_LAST } else { 0 };
    clear[1] = flags;
    clear[2..6].copy_from_slice(&time.to_le_bytes());
    if messages.len() == 1 {
        let msg = messages[0];
        let end = APP_HEADER_SIZE + msg.len();
        if clear.len() < end {
            return Err(Error::DataTooLarge);
        }
        clear[0] = PACKET_TYPE_APP;
        clear[APP_HEADER_SIZE..end].copy_from_slice(msg);
        Ok(end)
    } else {
        if messages.len() > max_multi_count as usize {
            return Err(Error::DataTooLarge);
        }
        clear[0] = PACKET_TYPE_MULTI_APP;
        if clear.len() < APP_HEADER_SIZE + 2 {
            return Err(Error::DataTooLarge);
        }
        clear[6..8].copy_from_slice(&(messages.len() as u16).to_le_bytes());
        let mut at = APP_HEADER_SIZE + 2;
        for msg in messages {
            if msg.len() > u16::MAX as usize || clear.len() < at + 2 + msg.len() {
                return Err(Error::DataTooLarge);
            }
            clear[at..at + 2].copy_from_slice(&(msg.len() as u16).to_le_bytes());
            clear[at + 2..at + 2 + msg.len()].copy_from_slice(msg);
            at += 2 + msg.len();
        }
        Ok(at)
    }
}

/* A1/A2 service discovery */

/// Address field of an A1 query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryAddress<'a> {
    /// Any host listening on this transport.
    Any,
    /// A host holding a specific Ed25519 signing key.
    SigKey(&'a [u8; SIGN_PUBLIC_KEY_SIZE]),
}

pub(crate) const ADDRESS_TYPE_ANY: u8 = 0;
pub(crate) const ADDRESS_TYPE_SIG_KEY: u8 = 1;

pub(crate) fn encode_a1(body: &mut [u8], address: DiscoveryAddress<'_>) -> usize {
    body[0] = PACKET_TYPE_A1;
    body[1] = 0;
    match address {
        DiscoveryAddress::Any => {
            body[2] = ADDRESS_TYPE_ANY;
            body[3..5].copy_from_slice(&0u16.to_le_bytes());
            5
        }
        DiscoveryAddress::SigKey(key) => {
            body[2] = ADDRESS_TYPE_SIG_KEY;
            body[3..5].copy_from_slice(&(SIGN_PUBLIC_KEY_SIZE as u16).to_le_bytes());
            body[5..5 + SIGN_PUBLIC_KEY_SIZE].copy_from_slice(key);
            5 + SIGN_PUBLIC_KEY_SIZE
        }
    }
}

pub(crate) struct A1<'a> {
    pub address_type: u8,
    pub address: &'a [u8],
}

impl<'a> A1<'a> {
    pub fn decode<E>(body: &'a [u8]) -> Result<Self, Error<E>> {
        if body.len() < 5 || body[0] != PACKET_TYPE_A1 {
            return Err(fault!(InvalidPacket));
        }
        let size = u16::from_le_bytes(body[3..5].try_into().unwrap()) as usize;
        if body.len() != 5 + size {
            return Err(fault!(InvalidPacket));
        }
        Ok(Self { address_type: body[2], address: &body[5..] })
    }
}

/// One (protocol, profile) entry of an A2 answer. P1 names the channel protocol,
/// P2 the application layer above it; both are 10 ASCII bytes padded with '-'.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolPair {
    pub protocol: [u8; 10],
    pub profile: [u8; 10],
}

impl ProtocolPair {
    /// The pair every Salt Channel v2 host can serve.
    pub const SALT_CHANNEL_V2: ProtocolPair = ProtocolPair { protocol: PROTOCOL_ID, profile: PROFILE_ANY };
}

pub(crate) fn encode_a2(body: &mut [u8], pairs: &[ProtocolPair], no_such_server: bool) -> usize {
    debug_assert!(pairs.len() <= MAX_A2_PAIRS);
    body[0] = PACKET_TYPE_A2;
    // An A2 is always the host's final word on a pre-session.
    body[1] = FLAG_LAST;
    if no_such_server {
        body[1] |= A2_FLAG_NO_SUCH_SERVER;
        body[2] = 0;
        return 3;
    }
    body[2] = pairs.len() as u8;
    let mut at = 3;
    for pair in pairs {
        body[at..at + 10].copy_from_slice(&pair.protocol);
        body[at + 10..at + 20].copy_from_slice(&pair.profile);
        at += 20;
    }
    at
}

pub(crate) struct A2 {
    pub no_such_server: bool,
    pub count: u8,
}

impl A2 {
    /// Validates the envelope; the caller reads pair `i` with `A2::pair`.
    pub fn decode<E>(body: &[u8]) -> Result<Self, Error<E>> {
        if body.len() < 3 || body[0] != PACKET_TYPE_A2 {
            return Err(fault!(InvalidPacket));
        }
        if body[1] & FLAG_LAST == 0 {
            return Err(fault!(InvalidPacket));
        }
        let count = body[2];
        if count as usize > MAX_A2_PAIRS || body.len() != 3 + count as usize * 20 {
            return Err(fault!(InvalidPacket));
        }
        Ok(Self { no_such_server: body[1] & A2_FLAG_NO_SUCH_SERVER != 0, count })
    }

    pub fn pair(&self, body: &[u8], i: usize) -> ProtocolPair {
        let at = 3 + i * 20;
        ProtocolPair {
            protocol: body[at..at + 10].try_into().unwrap(),
            profile: body[at + 10..at + 20].try_into().unwrap(),
        }
    }
}
