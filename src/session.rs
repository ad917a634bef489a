/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use arrayvec::ArrayVec;
use zeroize::Zeroize;

use crate::applicationlayer::ApplicationLayer;
use crate::crypto::{
    probe_aead_contract, secure_eq, Aead, DhKeyPair, Secret, Sha512Hash, SignKeyPair, SignPublicKey, DH_PUBLIC_KEY_SIZE,
    SESSION_KEY_SIZE, SHA512_HASH_SIZE, SIGN_PUBLIC_KEY_SIZE,
};
use crate::error::{fault, ConfigError, Error};
use crate::log_event::{log, LogEvent};
use crate::nonce::NonceCounter;
use crate::packet::{
    decode_app, encode_a1, encode_a2, encode_app, A1, A2, ADDRESS_TYPE_ANY, ADDRESS_TYPE_SIG_KEY, DiscoveryAddress,
    Messages, ProtocolPair, M1, M2, M3M4,
};
use crate::proto::*;
use crate::pump::{pump_read, pump_write, Pump};
use crate::transport::Transport;

/// Which side of the channel this session plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Host,
}

/// Successful outcome of `handshake`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeOk {
    /// The channel is up; `read` and `write` may be used.
    Established,
    /// Host only: the peer sent an A1 discovery query instead of M1. The A2 answer
    /// has been flushed and this session is closed; accept a fresh connection to
    /// continue.
    ProtocolsServed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    // Client
    Initial,
    SendM1,
    WaitM2,
    WaitM3,
    SendM4,
    SendA1,
    WaitA2,
    // Host
    WaitM1,
    SendM2,
    SendM3,
    WaitM4,
    SendM2Reject,
    SendA2,
    // Common terminals
    Established,
    Closed,
    Failed,
}

/// One Salt Channel v2 session over a caller-supplied transport and working buffer.
///
/// The session is a plain state machine: every operation either completes, returns
/// `Error::Pending` after saving its progress (re-invoke when the transport is
/// ready), or fails fatally. There is no internal thread and nothing blocks unless
/// the transport itself does.
///
/// The working buffer is borrowed for the whole session lifetime and is where frames
/// are assembled, received and encrypted in place. Its size sets the largest
/// application payload the session can carry; see `buffer_size_for`.
pub struct Session<'a, App: ApplicationLayer> {
    role: Role,
    state: State,
    buffer: &'a mut [u8],
    pump: Pump,
    rng: App::Rng,

    sign_keypair: App::SignKeyPair,
    /// Ephemeral DH keypair; lives from handshake entry until key agreement.
    eph: Option<App::DhKeyPair>,
    session_key: Secret<SESSION_KEY_SIZE>,
    peer_sign_key: Option<[u8; SIGN_PUBLIC_KEY_SIZE]>,
    expected_peer_key: Option<[u8; SIGN_PUBLIC_KEY_SIZE]>,

    transcript: Option<App::Hash>,
    handshake_hash: [u8; SHA512_HASH_SIZE],

    write_nonce: NonceCounter,
    read_nonce: NonceCounter,

    /// Clock value at handshake entry; outgoing timestamps are relative to it.
    t0: Option<u32>,
    /// Highest non-zero peer timestamp seen.
    time_watermark: u32,

    /// A flushed LastFlag frame closes the session once fully on the wire.
    pending_close: bool,
}

impl<'a, App: ApplicationLayer> Session<'a, App> {
    pub fn new_client(sign_keypair: App::SignKeyPair, rng: App::Rng, buffer: &'a mut [u8]) -> Result<Self, ConfigError> {
        Self::new(Role::Client, sign_keypair, rng, buffer)
    }

    pub fn new_host(sign_keypair: App::SignKeyPair, rng: App::Rng, buffer: &'a mut [u8]) -> Result<Self, ConfigError> {
        Self::new(Role::Host, sign_keypair, rng, buffer)
    }

    fn new(role: Role, sign_keypair: App::SignKeyPair, rng: App::Rng, buffer: &'a mut [u8]) -> Result<Self, ConfigError> {
        if buffer.len() < MIN_BUFFER_SIZE {
            return Err(ConfigError::BufferTooSmall { required: MIN_BUFFER_SIZE });
        }
        if !probe_aead_contract::<App::Aead>() {
            return Err(ConfigError::BadCryptoBackend);
        }
        // The client encrypts with odd nonces, the host with even ones.
        let (write_start, read_start) = match role {
            Role::Client => (1, 2),
            Role::Host => (2, 1),
        };
        Ok(Self {
            role,
            state: match role {
                Role::Client => State::Initial,
                Role::Host => State::WaitM1,
            },
            buffer,
            pump: Pump::Idle,
            rng,
            sign_keypair,
            eph: None,
            session_key: Secret::new(),
            peer_sign_key: None,
            expected_peer_key: None,
            transcript: None,
            handshake_hash: [0u8; SHA512_HASH_SIZE],
            write_nonce: NonceCounter::new(write_start),
            read_nonce: NonceCounter::new(read_start),
            t0: None,
            time_watermark: 0,
            pending_close: false,
        })
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_established(&self) -> bool {
        self.state == State::Established
    }

    /// The peer's long-term signing key, once it has proven possession of it.
    pub fn peer_sign_key(&self) -> Option<&[u8; SIGN_PUBLIC_KEY_SIZE]> {
        self.peer_sign_key.as_ref()
    }

    /// Largest application payload `write` can carry in one App frame.
    pub fn max_message_size(&self) -> usize {
        self.buffer.len() - APP_OVERHEAD
    }

    /// Pin the peer identity. On a client this puts the key into M1 (so a host
    /// serving a different key refuses the handshake early) and requires M3 to prove
    /// exactly this key. On a host it requires M4 to prove it. Must be called before
    /// `handshake` to take effect.
    pub fn expect_peer(&mut self, key: [u8; SIGN_PUBLIC_KEY_SIZE]) {
        self.expected_peer_key = Some(key);
    }

    /// Run the handshake until established, `Pending`, or failure.
    ///
    /// Idempotent once established. On a host this also answers a pre-handshake A1
    /// discovery query, reporting it as `HandshakeOk::ProtocolsServed`.
    pub fn handshake<T: Transport>(&mut self, app: &App, io: &mut T) -> Result<HandshakeOk, Error<T::Error>> {
        match self.handshake_inner(app, io) {
            Err(e) => Err(self.fatal_filter(e)),
            ok => ok,
        }
    }

    /// Encrypt and send one App frame (single message) or MultiApp frame (several).
    ///
    /// `last` sets the LastFlag: the frame is the session's goodbye and the session
    /// closes once it is flushed. On `Pending` the frame stays staged in the buffer;
    /// re-invoke (arguments are then ignored) until it completes. While an incoming
    /// frame is partially received the buffer is busy and `write` reports `Pending`
    /// without staging anything; drive `read` to completion first.
    pub fn write<T: Transport>(&mut self, app: &App, io: &mut T, messages: &[&[u8]], last: bool) -> Result<(), Error<T::Error>> {
        match self.write_inner(app, io, messages, last) {
            Err(e) => Err(self.fatal_filter(e)),
            ok => ok,
        }
    }

    /// Receive and decrypt one frame, returning a cursor over the application
    /// messages it contains. The cursor borrows the session buffer and is consumed
    /// by the next operation.
    ///
    /// A frame carrying the peer's LastFlag closes the session; the returned cursor
    /// is still valid, every later operation reports `SessionClosed`.
    pub fn read<T: Transport>(&mut self, app: &App, io: &mut T) -> Result<Messages<'_>, Error<T::Error>> {
        let clear_len = match self.read_inner(app, io) {
            Ok(n) => n,
            Err(e) => return Err(self.fatal_filter(e)),
        };
        let clear = &self.buffer[CLEAR_OFFSET..CLEAR_OFFSET + clear_len];
        // Validated in read_inner; re-opening the frame can not fail.
        Ok(decode_app::<T::Error>(clear, App::SETTINGS.max_multi_count).unwrap())
    }

    /// Client only, before `handshake`: send an A1 query and return the host's
    /// protocol/profile pairs. The exchange never establishes a channel; the session
    /// is closed afterwards and a fresh one is needed to actually connect.
    pub fn discover<T: Transport>(
        &mut self,
        app: &App,
        io: &mut T,
        address: DiscoveryAddress<'_>,
    ) -> Result<ArrayVec<ProtocolPair, MAX_A2_PAIRS>, Error<T::Error>> {
        match self.discover_inner(app, io, address) {
            Err(e) => Err(self.fatal_filter(e)),
            ok => ok,
        }
    }

    /// Tear the session down, wiping keys, transcript and the working buffer.
    pub fn close(&mut self) {
        self.wipe();
        if self.state != State::Failed {
            self.state = State::Closed;
        }
    }

    /* Handshake state machine */

    fn handshake_inner<T: Transport>(&mut self, app: &App, io: &mut T) -> Result<HandshakeOk, Error<T::Error>> {
        loop {
            match self.state {
                State::Initial => {
                    self.begin_handshake(app);
                    let eph_pk = self.eph.as_ref().unwrap().public_key_bytes();
                    let n = M1 {
                        client_dh_key: &eph_pk,
                        pinned_host_key: self.expected_peer_key.as_ref(),
                    }
                    .encode(&mut self.buffer[BODY_OFFSET..]);
                    if let Some(t) = self.transcript.as_mut() {
                        t.update(&self.buffer[BODY_OFFSET..BODY_OFFSET + n]);
                    }
                    self.stage_plain_frame(n);
                    log!(app, LogEvent::SendM1 { pinned: self.expected_peer_key.is_some() });
                    self.state = State::SendM1;
                }
                State::SendM1 => {
                    pump_write(&mut self.pump, io, self.buffer)?;
                    self.state = State::WaitM2;
                }
                State::WaitM2 => {
                    let n = pump_read(&mut self.pump, io, self.buffer)?;
                    if self.buffer[BODY_OFFSET] != PACKET_TYPE_M2 {
                        return Err(unexpected_type(self.buffer[BODY_OFFSET]));
                    }
                    let m2 = M2::decode(&self.buffer[BODY_OFFSET..BODY_OFFSET + n])?;
                    if m2.no_such_server {
                        return Err(Error::NoSuchServer);
                    }
                    let host_dh_key = *m2.host_dh_key;
                    if let Some(t) = self.transcript.as_mut() {
                        t.update(&self.buffer[BODY_OFFSET..BODY_OFFSET + n]);
                        t.finish_and_reset(&mut self.handshake_hash);
                    }
                    let eph = self.eph.take().unwrap();
                    if !eph.agree(&host_dh_key, &mut self.session_key) {
                        return Err(fault!(FailedAuthentication));
                    }
                    log!(app, LogEvent::ReceiveValidM2);
                    self.state = State::WaitM3;
                }
                State::WaitM3 => {
                    let n = pump_read(&mut self.pump, io, self.buffer)?;
                    let clear_len = self.open_encrypted(n)?;
                    let clear = &self.buffer[CLEAR_OFFSET..CLEAR_OFFSET + clear_len];
                    if clear[0] != PACKET_TYPE_M3 {
                        return Err(unexpected_type(clear[0]));
                    }
                    let m3 = M3M4::decode(PACKET_TYPE_M3, clear)?;
                    let host_sign_key = *m3.sign_key;
                    let signature = *m3.signature;
                    let msg = sig_message(SIG1_PREFIX, &self.handshake_hash);
                    let pk = App::SignPublicKey::from_bytes(&host_sign_key).ok_or(fault!(FailedAuthentication))?;
                    if !pk.verify(&msg, &signature) {
                        return Err(fault!(FailedAuthentication));
                    }
                    if let Some(expected) = &self.expected_peer_key {
                        if !secure_eq(expected, &host_sign_key) {
                            return Err(fault!(FailedAuthentication));
                        }
                    }
                    self.peer_sign_key = Some(host_sign_key);
                    log!(app, LogEvent::ReceiveValidM3);

                    let msg = sig_message(SIG2_PREFIX, &self.handshake_hash);
                    let signature = self.sign_keypair.sign(&msg);
                    let my_key = self.sign_keypair.public_key_bytes();
                    let n = M3M4 { sign_key: &my_key, signature: &signature }
                        .encode(PACKET_TYPE_M4, &mut self.buffer[CLEAR_OFFSET..]);
                    self.seal_and_stage(n)?;
                    log!(app, LogEvent::SendM4);
                    self.state = State::SendM4;
                }
                State::SendM4 => {
                    pump_write(&mut self.pump, io, self.buffer)?;
                    self.establish(app);
                    return Ok(HandshakeOk::Established);
                }

                State::WaitM1 => {
                    if self.transcript.is_none() {
                        self.begin_handshake(app);
                    }
                    let n = pump_read(&mut self.pump, io, self.buffer)?;
                    match self.buffer[BODY_OFFSET] {
                        PACKET_TYPE_A1 => self.serve_discovery(app, n)?,
                        PACKET_TYPE_M1 => self.accept_m1(app, n)?,
                        t => return Err(unexpected_type(t)),
                    }
                }
                State::SendM2Reject => {
                    pump_write(&mut self.pump, io, self.buffer)?;
                    return Err(Error::NoSuchServer);
                }
                State::SendA2 => {
                    pump_write(&mut self.pump, io, self.buffer)?;
                    self.wipe();
                    self.state = State::Closed;
                    return Ok(HandshakeOk::ProtocolsServed);
                }
                State::SendM2 => {
                    pump_write(&mut self.pump, io, self.buffer)?;
                    let msg = sig_message(SIG1_PREFIX, &self.handshake_hash);
                    let signature = self.sign_keypair.sign(&msg);
                    let my_key = self.sign_keypair.public_key_bytes();
                    let n = M3M4 { sign_key: &my_key, signature: &signature }
                        .encode(PACKET_TYPE_M3, &mut self.buffer[CLEAR_OFFSET..]);
                    self.seal_and_stage(n)?;
                    log!(app, LogEvent::SendM3);
                    self.state = State::SendM3;
                }
                State::SendM3 => {
                    pump_write(&mut self.pump, io, self.buffer)?;
                    self.state = State::WaitM4;
                }
                State::WaitM4 => {
                    let n = pump_read(&mut self.pump, io, self.buffer)?;
                    let clear_len = self.open_encrypted(n)?;
                    let clear = &self.buffer[CLEAR_OFFSET..CLEAR_OFFSET + clear_len];
                    if clear[0] != PACKET_TYPE_M4 {
                        return Err(unexpected_type(clear[0]));
                    }
                    let m4 = M3M4::decode(PACKET_TYPE_M4, clear)?;
                    let client_sign_key = *m4.sign_key;
                    let signature = *m4.signature;
                    let msg = sig_message(SIG2_PREFIX, &self.handshake_hash);
                    let pk = App::SignPublicKey::from_bytes(&client_sign_key).ok_or(fault!(FailedAuthentication))?;
                    if !pk.verify(&msg, &signature) {
                        return Err(fault!(FailedAuthentication));
                    }
                    if let Some(expected) = &self.expected_peer_key {
                        if !secure_eq(expected, &client_sign_key) {
                            return Err(fault!(FailedAuthentication));
                        }
                    }
                    self.peer_sign_key = Some(client_sign_key);
                    log!(app, LogEvent::ReceiveValidM4);
                    self.establish(app);
                    return Ok(HandshakeOk::Established);
                }

                State::Established => return Ok(HandshakeOk::Established),
                State::SendA1 | State::WaitA2 => return Err(Error::NotEstablished),
                State::Closed | State::Failed => return Err(Error::SessionClosed),
            }
        }
    }

    /// Host side of M1: transcript, optional pinning check, key agreement, M2.
    fn accept_m1<E: core::fmt::Debug>(&mut self, app: &App, body_len: usize) -> Result<(), Error<E>> {
        let m1 = M1::decode(&self.buffer[BODY_OFFSET..BODY_OFFSET + body_len])?;
        let client_dh_key = *m1.client_dh_key;
        let pinned = m1.pinned_host_key.copied();
        if let Some(t) = self.transcript.as_mut() {
            t.update(&self.buffer[BODY_OFFSET..BODY_OFFSET + body_len]);
        }
        log!(app, LogEvent::ReceiveValidM1 { pinned: pinned.is_some() });

        if let Some(pinned) = pinned {
            if !secure_eq(&pinned, &self.sign_keypair.public_key_bytes()) {
                // Wrong host. Say so in M2 and shut down; M3 is never produced.
                let n = M2 { no_such_server: true, host_dh_key: &[0u8; DH_PUBLIC_KEY_SIZE] }
                    .encode(&mut self.buffer[BODY_OFFSET..]);
                self.stage_plain_frame(n);
                log!(app, LogEvent::SendM2 { no_such_server: true });
                self.state = State::SendM2Reject;
                return Ok(());
            }
        }

        let eph = self.eph.take().unwrap();
        let eph_pk = eph.public_key_bytes();
        if !eph.agree(&client_dh_key, &mut self.session_key) {
            return Err(fault!(FailedAuthentication));
        }
        let n = M2 { no_such_server: false, host_dh_key: &eph_pk }.encode(&mut self.buffer[BODY_OFFSET..]);
        if let Some(t) = self.transcript.as_mut() {
            t.update(&self.buffer[BODY_OFFSET..BODY_OFFSET + n]);
            t.finish_and_reset(&mut self.handshake_hash);
        }
        self.stage_plain_frame(n);
        log!(app, LogEvent::SendM2 { no_such_server: false });
        self.state = State::SendM2;
        Ok(())
    }

    /// Host side of A1: answer with the configured protocol list, or NoSuchServer
    /// when the query names somebody else.
    fn serve_discovery<E: core::fmt::Debug>(&mut self, app: &App, body_len: usize) -> Result<(), Error<E>> {
        let a1 = A1::decode(&self.buffer[BODY_OFFSET..BODY_OFFSET + body_len])?;
        let served = match a1.address_type {
            ADDRESS_TYPE_ANY => true,
            ADDRESS_TYPE_SIG_KEY => {
                a1.address.len() == SIGN_PUBLIC_KEY_SIZE && secure_eq(a1.address, &self.sign_keypair.public_key_bytes())
            }
            _ => false,
        };
        let pairs: &[ProtocolPair] = if served { app.discovery_protocols() } else { &[] };
        // Serve what fits; the wire caps the list at MAX_A2_PAIRS anyway.
        let fit = ((self.buffer.len() - BODY_OFFSET - 3) / 20).min(MAX_A2_PAIRS);
        let pairs = &pairs[..pairs.len().min(fit)];
        let n = encode_a2(&mut self.buffer[BODY_OFFSET..], pairs, !served);
        self.stage_plain_frame(n);
        log!(app, LogEvent::ServeDiscovery { pairs: pairs.len(), no_such_server: !served });
        self.state = State::SendA2;
        Ok(())
    }

    fn discover_inner<T: Transport>(
        &mut self,
        app: &App,
        io: &mut T,
        address: DiscoveryAddress<'_>,
    ) -> Result<ArrayVec<ProtocolPair, MAX_A2_PAIRS>, Error<T::Error>> {
        loop {
            match self.state {
                State::Initial => {
                    let n = encode_a1(&mut self.buffer[BODY_OFFSET..], address);
                    self.stage_plain_frame(n);
                    self.state = State::SendA1;
                }
                State::SendA1 => {
                    pump_write(&mut self.pump, io, self.buffer)?;
                    self.state = State::WaitA2;
                }
                State::WaitA2 => {
                    let n = pump_read(&mut self.pump, io, self.buffer)?;
                    if self.buffer[BODY_OFFSET] != PACKET_TYPE_A2 {
                        return Err(unexpected_type(self.buffer[BODY_OFFSET]));
                    }
                    let body = &self.buffer[BODY_OFFSET..BODY_OFFSET + n];
                    let a2 = A2::decode(body)?;
                    if a2.no_such_server {
                        return Err(Error::NoSuchServer);
                    }
                    let mut pairs = ArrayVec::new();
                    for i in 0..a2.count as usize {
                        pairs.push(a2.pair(body, i));
                    }
                    log!(app, LogEvent::ReceiveA2 { pairs: pairs.len() });
                    self.wipe();
                    self.state = State::Closed;
                    return Ok(pairs);
                }
                State::Closed | State::Failed => return Err(Error::SessionClosed),
                _ => return Err(Error::NotEstablished),
            }
        }
    }

    /* Application framer */

    fn write_inner<T: Transport>(&mut self, app: &App, io: &mut T, messages: &[&[u8]], last: bool) -> Result<(), Error<T::Error>> {
        match self.state {
            State::Established => {}
            State::Closed | State::Failed => return Err(Error::SessionClosed),
            _ => return Err(Error::NotEstablished),
        }
        match self.pump {
            // A previous write is still on the wire; finish it before anything new.
            Pump::Write { .. } => return self.flush_staged(app, io),
            // A frame is partially received; the buffer is spoken for until the
            // caller drives read() to completion.
            Pump::ReadSize { .. } | Pump::ReadBody { .. } => return Err(Error::Pending),
            Pump::Idle => {}
        }
        if messages.is_empty() {
            return Ok(());
        }
        let time = self.now_ms(app);
        let n = encode_app(
            &mut self.buffer[CLEAR_OFFSET..],
            time,
            messages,
            last,
            App::SETTINGS.max_multi_count,
        )?;
        self.seal_and_stage(n)?;
        self.pending_close = last;
        log!(app, LogEvent::SendAppFrame { messages: messages.len() as u16, last });
        self.flush_staged(app, io)
    }

    fn flush_staged<T: Transport>(&mut self, app: &App, io: &mut T) -> Result<(), Error<T::Error>> {
        if let Pump::Write { .. } = self.pump {
            pump_write(&mut self.pump, io, self.buffer)?;
            if self.pending_close {
                self.wipe();
                self.state = State::Closed;
                log!(app, LogEvent::Closed { by_peer: false });
            }
        }
        Ok(())
    }

    fn read_inner<T: Transport>(&mut self, app: &App, io: &mut T) -> Result<usize, Error<T::Error>> {
        match self.state {
            State::Established => {}
            State::Closed | State::Failed => return Err(Error::SessionClosed),
            _ => return Err(Error::NotEstablished),
        }
        if let Pump::Write { .. } = self.pump {
            // Finish flushing an abandoned write before turning the buffer around.
            self.flush_staged(app, io)?;
            if self.state != State::Established {
                return Err(Error::SessionClosed);
            }
        }
        let n = pump_read(&mut self.pump, io, self.buffer)?;
        let clear_len = self.open_encrypted(n)?;
        let clear = &self.buffer[CLEAR_OFFSET..CLEAR_OFFSET + clear_len];
        let (time, last, count) = {
            let msgs = decode_app::<T::Error>(clear, App::SETTINGS.max_multi_count)?;
            (msgs.time(), msgs.is_last(), msgs.remaining())
        };
        self.check_time(time)?;
        log!(app, LogEvent::ReceiveAppFrame { messages: count, last });
        if last {
            // Keys go now; the buffer must survive until the caller consumed the
            // returned cursor, so it is wiped by the next operation or teardown.
            self.wipe_secrets();
            self.state = State::Closed;
            log!(app, LogEvent::Closed { by_peer: true });
        }
        Ok(clear_len)
    }

    fn check_time<E>(&mut self, t: u32) -> Result<(), Error<E>> {
        // 0 means the sender has no clock; nothing to check, nothing learned.
        if t == 0 {
            return Ok(());
        }
        if let Some(tolerance) = App::SETTINGS.time_tolerance_ms {
            if t < self.time_watermark && self.time_watermark - t > tolerance {
                return Err(fault!(ExpiredTimestamp));
            }
        }
        if t > self.time_watermark {
            self.time_watermark = t;
        }
        Ok(())
    }

    /* Internals */

    fn begin_handshake(&mut self, app: &App) {
        self.eph = Some(App::DhKeyPair::generate(&mut self.rng));
        self.t0 = app.clock_ms();
        self.transcript = Some(App::Hash::new());
    }

    /// Milliseconds since handshake entry, clamped away from the reserved 0.
    fn now_ms(&self, app: &App) -> u32 {
        match (self.t0, app.clock_ms()) {
            (Some(t0), Some(now)) => now.wrapping_sub(t0).max(1),
            _ => 0,
        }
    }

    /// Prefix `buffer[BODY_OFFSET..BODY_OFFSET + n]` with its size and hand the
    /// frame to the pump.
    fn stage_plain_frame(&mut self, n: usize) {
        self.buffer[WRITE_FRAME_OFFSET..BODY_OFFSET].copy_from_slice(&(n as u32).to_le_bytes());
        self.pump.begin_write(WRITE_FRAME_OFFSET, BODY_OFFSET + n);
    }

    /// Encrypt the cleartext at `CLEAR_OFFSET..CLEAR_OFFSET + clear_len` in place,
    /// wrap it in the encrypted container and hand the frame to the pump.
    fn seal_and_stage<E>(&mut self, clear_len: usize) -> Result<(), Error<E>> {
        let end = CLEAR_OFFSET + clear_len;
        self.buffer[..CLEAR_OFFSET].fill(0);
        let nonce = match self.write_nonce.step() {
            Some(nonce) => nonce,
            // Counter exhausted; reuse is never an option.
            None => {
                self.wipe();
                self.state = State::Failed;
                return Err(Error::SessionClosed);
            }
        };
        if !App::Aead::encrypt_in_place(self.session_key.as_bytes(), &nonce, &mut self.buffer[..end]) {
            return Err(fault!(FailedAuthentication));
        }
        self.buffer[BODY_OFFSET] = PACKET_TYPE_ENCRYPTED;
        self.buffer[BODY_OFFSET + 1] = 0;
        let body_len = end - BODY_OFFSET;
        self.buffer[WRITE_FRAME_OFFSET..BODY_OFFSET].copy_from_slice(&(body_len as u32).to_le_bytes());
        self.pump.begin_write(WRITE_FRAME_OFFSET, end);
        Ok(())
    }

    /// Unwrap and decrypt an encrypted container received at `BODY_OFFSET`,
    /// returning the cleartext length now sitting at `CLEAR_OFFSET`.
    fn open_encrypted<E>(&mut self, body_len: usize) -> Result<usize, Error<E>> {
        if self.buffer[BODY_OFFSET] != PACKET_TYPE_ENCRYPTED {
            return Err(unexpected_type(self.buffer[BODY_OFFSET]));
        }
        // Smallest possible cleartext is an inner header alone.
        if body_len < ENCRYPTED_OVERHEAD + HEADER_SIZE {
            return Err(fault!(InvalidPacket));
        }
        let end = BODY_OFFSET + body_len;
        let nonce = match self.read_nonce.step() {
            Some(nonce) => nonce,
            None => {
                self.wipe();
                self.state = State::Failed;
                return Err(Error::SessionClosed);
            }
        };
        // The container header was parsed; its bytes make way for the zero prefix.
        self.buffer[..BODY_OFFSET + HEADER_SIZE].fill(0);
        if !App::Aead::decrypt_in_place(self.session_key.as_bytes(), &nonce, &mut self.buffer[..end]) {
            return Err(fault!(FailedAuthentication));
        }
        Ok(end - CLEAR_OFFSET)
    }

    fn establish(&mut self, app: &App) {
        self.eph = None;
        self.transcript = None;
        self.handshake_hash.zeroize();
        self.time_watermark = 0;
        self.state = State::Established;
        log!(app, LogEvent::Established);
    }

    /// Wipe key material but leave the buffer: the caller may still hold a message
    /// cursor into it.
    fn wipe_secrets(&mut self) {
        self.session_key.clear();
        self.eph = None;
        self.transcript = None;
        self.handshake_hash.zeroize();
        self.pending_close = false;
    }

    fn wipe(&mut self) {
        self.wipe_secrets();
        self.buffer.zeroize();
        self.pump = Pump::Idle;
    }

    /// Every error other than the plain resumption/usage signals is terminal:
    /// secrets are wiped and the session only answers `SessionClosed` from then on.
    fn fatal_filter<E>(&mut self, e: Error<E>) -> Error<E> {
        match &e {
            Error::Pending | Error::NotEstablished | Error::DataTooLarge | Error::SessionClosed => {}
            _ => {
                self.wipe();
                self.state = State::Failed;
            }
        }
        e
    }
}

impl<'a, App: ApplicationLayer> Drop for Session<'a, App> {
    fn drop(&mut self) {
        self.wipe();
    }
}

fn sig_message(prefix: &[u8; 8], hash: &[u8; SHA512_HASH_SIZE]) -> [u8; 8 + SHA512_HASH_SIZE] {
    let mut msg = [0u8; 8 + SHA512_HASH_SIZE];
    msg[..8].copy_from_slice(prefix);
    msg[8..].copy_from_slice(hash);
    msg
}

/// A known packet type in the wrong state is a sequencing fault; an unknown byte is
/// a parse fault.
fn unexpected_type<E>(t: u8) -> Error<E> {
    match t {
        PACKET_TYPE_M1..=PACKET_TYPE_ENCRYPTED | PACKET_TYPE_A1..=PACKET_TYPE_MULTI_APP => fault!(OutOfSequence),
        _ => fault!(InvalidPacket),
    }
}
