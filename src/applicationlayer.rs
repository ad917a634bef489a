/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use crate::crypto::rand_core::{CryptoRng, RngCore};
use crate::crypto::{Aead, DhKeyPair, Sha512Hash, SignKeyPair, SignPublicKey};
use crate::log_event::LogEvent;
use crate::packet::ProtocolPair;

/// Tunables of a session. Both sides work with independent values; nothing here has
/// to match the peer.
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// How far (in milliseconds) a peer timestamp may fall below the highest one seen
    /// before the session fails with a timestamp fault. `None` disables the guard.
    ///
    /// A timestamp of exactly 0 means "sender has no clock": it is never checked and
    /// does not move the watermark, even if earlier messages carried real timestamps.
    pub time_tolerance_ms: Option<u32>,

    /// Ceiling on the number of messages accepted in a single incoming MultiApp
    /// frame, bounding decode work per frame.
    pub max_multi_count: u16,
}

impl Settings {
    pub const TIME_TOLERANCE_MS: Option<u32> = Some(5 * 1000);
    pub const MAX_MULTI_COUNT: u16 = 127;

    pub const DEFAULT: Settings = Settings {
        time_tolerance_ms: Self::TIME_TOLERANCE_MS,
        max_multi_count: Self::MAX_MULTI_COUNT,
    };
}

/// Trait to implement to integrate the session into an application.
///
/// Templating the session on this trait lets the engine be entirely transport, OS,
/// and crypto-backend independent: the application picks concrete primitives, owns
/// the randomness, and decides whether a clock exists.
pub trait ApplicationLayer: Sized {
    const SETTINGS: Settings = Settings::DEFAULT;

    type Rng: RngCore + CryptoRng;

    type Hash: Sha512Hash;
    type Aead: Aead;
    type DhKeyPair: DhKeyPair;
    type SignPublicKey: SignPublicKey;
    type SignKeyPair: SignKeyPair<PublicKey = Self::SignPublicKey>;

    /// Monotonic millisecond clock, or `None` when the platform has none.
    ///
    /// The epoch is arbitrary; outgoing timestamps are reckoned from the value read
    /// at handshake entry. Returning `None` makes every outgoing timestamp 0, which
    /// peers treat as "no clock".
    fn clock_ms(&self) -> Option<u32> {
        None
    }

    /// The protocol/profile pairs served in response to an A1 discovery query.
    fn discovery_protocols(&self) -> &[ProtocolPair] {
        const DEFAULT: [ProtocolPair; 1] = [ProtocolPair::SALT_CHANNEL_V2];
        &DEFAULT
    }

    #[allow(unused)]
    fn event_log(&self, event: LogEvent) {}
}
