/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use common::*;

use salt_channel::crypto_impl::{crypto_secretbox, ed25519_dalek, sha2, x25519_dalek};
use salt_channel::{
    ApplicationLayer, ConfigError, DiscoveryAddress, Error, FaultType, HandshakeOk, ProtocolPair, Session, Settings,
    Transport,
};

fn session_pair<'c, 'h>(
    cbuf: &'c mut [u8],
    hbuf: &'h mut [u8],
    seed: u64,
) -> (Session<'c, TestApp>, Session<'h, TestApp>) {
    let client = Session::<TestApp>::new_client(sign_keypair(1), rng(seed), cbuf).unwrap();
    let host = Session::<TestApp>::new_host(sign_keypair(2), rng(seed + 1000), hbuf).unwrap();
    (client, host)
}

#[test]
fn minimal_handshake_and_ping() {
    let capp = TestApp::new("client");
    let happ = TestApp::new("host");
    let mut cbuf = vec![0u8; 1024];
    let mut hbuf = vec![0u8; 1024];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 1);
    let (mut cio, mut hio) = pipe(7);

    let (c, h) = drive2(|| client.handshake(&capp, &mut cio), || host.handshake(&happ, &mut hio));
    assert_eq!(c.unwrap(), HandshakeOk::Established);
    assert_eq!(h.unwrap(), HandshakeOk::Established);
    assert!(client.is_established() && host.is_established());
    assert_eq!(client.peer_sign_key(), Some(&public_key(&sign_keypair(2))));
    assert_eq!(host.peer_sign_key(), Some(&public_key(&sign_keypair(1))));

    drive1(|| client.write(&capp, &mut cio, &[b"ping".as_slice()], true)).unwrap();

    let mut msgs = host.read(&happ, &mut hio).unwrap();
    assert!(msgs.is_last());
    assert_eq!(msgs.next(), Some(b"ping".as_slice()));
    assert_eq!(msgs.next(), None);
    drop(msgs);

    // LastFlag closed both ends.
    assert_eq!(client.write(&capp, &mut cio, &[b"more".as_slice()], false), Err(Error::SessionClosed));
    assert!(matches!(host.read(&happ, &mut hio), Err(Error::SessionClosed)));
}

#[test]
fn handshake_is_deterministic_for_fixed_seeds() {
    struct Recorder<'t> {
        inner: &'t mut PipeEnd,
        sent: Rc<RefCell<Vec<u8>>>,
    }
    impl<'t> Transport for Recorder<'t> {
        type Error = ();
        fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
            self.inner.read(buf)
        }
        fn write(&mut self, buf: &[u8]) -> Result<usize, ()> {
            let n = self.inner.write(buf)?;
            self.sent.borrow_mut().extend_from_slice(&buf[..n]);
            Ok(n)
        }
    }

    let run = || {
        let capp = TestApp::new("client");
        let happ = TestApp::new("host");
        let mut cbuf = vec![0u8; 512];
        let mut hbuf = vec![0u8; 512];
        let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 42);
        let (mut cio, mut hio) = pipe(64);
        let sent = Rc::new(RefCell::new(Vec::new()));
        let mut rec = Recorder { inner: &mut cio, sent: sent.clone() };
        let (c, h) = drive2(|| client.handshake(&capp, &mut rec), || host.handshake(&happ, &mut hio));
        c.unwrap();
        h.unwrap();
        let out = sent.borrow().clone();
        out
    };

    // Same long-term seeds, same RNG seeds: the whole client transcript repeats.
    let first = run();
    assert!(!first.is_empty());
    assert_eq!(first, run());
}

#[test]
fn pinning_success() {
    let capp = TestApp::new("client");
    let happ = TestApp::new("host");
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 2);
    client.expect_peer(public_key(&sign_keypair(2)));
    let (mut cio, mut hio) = pipe(16);

    let (c, h) = drive2(|| client.handshake(&capp, &mut cio), || host.handshake(&happ, &mut hio));
    assert_eq!(c.unwrap(), HandshakeOk::Established);
    assert_eq!(h.unwrap(), HandshakeOk::Established);
}

#[test]
fn pinning_failure_yields_no_such_server_and_no_m3() {
    let capp = TestApp::new("client");
    let happ = TestApp::new("host");
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 3);
    let mut wrong = public_key(&sign_keypair(2));
    wrong[17] ^= 0x04;
    client.expect_peer(wrong);
    let (mut cio, mut hio) = pipe(16);

    let (c, h) = drive2(|| client.handshake(&capp, &mut cio), || host.handshake(&happ, &mut hio));
    assert_eq!(c.unwrap_err(), Error::NoSuchServer);
    assert_eq!(h.unwrap_err(), Error::NoSuchServer);
    // M1 and the refusing M2 were consumed; nothing else was ever sent.
    assert!(cio.rx.borrow().is_empty());
    assert!(hio.rx.borrow().is_empty());
}

#[test]
fn discovery_lists_protocols_and_closes() {
    let capp = TestApp::new("client");
    let happ = TestApp::new("host");
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 4);
    let (mut cio, mut hio) = pipe(16);

    let (c, h) = drive2(
        || client.discover(&capp, &mut cio, DiscoveryAddress::Any),
        || host.handshake(&happ, &mut hio),
    );
    let pairs = c.unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0], ProtocolPair::SALT_CHANNEL_V2);
    assert_eq!(h.unwrap(), HandshakeOk::ProtocolsServed);

    // A1/A2 never establishes a channel.
    assert_eq!(client.handshake(&capp, &mut cio).unwrap_err(), Error::SessionClosed);
    assert_eq!(host.handshake(&happ, &mut hio).unwrap_err(), Error::SessionClosed);
}

#[test]
fn discovery_by_sig_key() {
    let capp = TestApp::new("client");
    let happ = TestApp::new("host");

    // Matching key: served.
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 5);
    let (mut cio, mut hio) = pipe(16);
    let host_key = public_key(&sign_keypair(2));
    let (c, h) = drive2(
        || client.discover(&capp, &mut cio, DiscoveryAddress::SigKey(&host_key)),
        || host.handshake(&happ, &mut hio),
    );
    assert_eq!(c.unwrap().len(), 1);
    assert_eq!(h.unwrap(), HandshakeOk::ProtocolsServed);

    // Unknown key: the A2 says no-such-server.
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 6);
    let (mut cio, mut hio) = pipe(16);
    let other_key = public_key(&sign_keypair(9));
    let (c, h) = drive2(
        || client.discover(&capp, &mut cio, DiscoveryAddress::SigKey(&other_key)),
        || host.handshake(&happ, &mut hio),
    );
    assert_eq!(c.unwrap_err(), Error::NoSuchServer);
    assert_eq!(h.unwrap(), HandshakeOk::ProtocolsServed);
}

#[test]
fn discovery_with_custom_protocol_list() {
    struct TwoProtoApp;
    impl ApplicationLayer for TwoProtoApp {
        type Rng = rand::rngs::StdRng;
        type Hash = sha2::Sha512;
        type Aead = crypto_secretbox::XSalsa20Poly1305;
        type DhKeyPair = x25519_dalek::StaticSecret;
        type SignPublicKey = ed25519_dalek::VerifyingKey;
        type SignKeyPair = ed25519_dalek::SigningKey;

        fn discovery_protocols(&self) -> &[ProtocolPair] {
            const PAIRS: [ProtocolPair; 2] = [
                ProtocolPair::SALT_CHANNEL_V2,
                ProtocolPair { protocol: *b"SCv2------", profile: *b"ECHO------" },
            ];
            &PAIRS
        }
    }

    let capp = TestApp::new("client");
    let happ = TwoProtoApp;
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let mut client = Session::<TestApp>::new_client(sign_keypair(1), rng(7), &mut cbuf).unwrap();
    let mut host = Session::<TwoProtoApp>::new_host(sign_keypair(2), rng(8), &mut hbuf).unwrap();
    let (mut cio, mut hio) = pipe(16);

    let (c, h) = drive2(
        || client.discover(&capp, &mut cio, DiscoveryAddress::Any),
        || host.handshake(&happ, &mut hio),
    );
    let pairs = c.unwrap();
    assert_eq!(pairs.len(), 2);
    assert_eq!(pairs[1].profile, *b"ECHO------");
    h.unwrap();
}

#[test]
fn multi_app_batch_in_order_with_monotonic_time() {
    let clock = Rc::new(Cell::new(500u32));
    let capp = TestApp::with_clock("client", clock.clone());
    let happ = TestApp::new("host");
    let mut cbuf = vec![0u8; 2048];
    let mut hbuf = vec![0u8; 2048];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 9);
    let (mut cio, mut hio) = pipe(32);

    let (c, h) = drive2(|| client.handshake(&capp, &mut cio), || host.handshake(&happ, &mut hio));
    c.unwrap();
    h.unwrap();

    let big = vec![0xabu8; client.max_message_size() - 120];
    let payloads: [&[u8]; 3] = [&[0x7f], &[0x11; 100], &big];
    clock.set(800);
    drive1(|| client.write(&capp, &mut cio, &payloads, false)).unwrap();

    let mut msgs = host.read(&happ, &mut hio).unwrap();
    let t1 = msgs.time();
    assert!(t1 > 0);
    assert_eq!(msgs.remaining(), 3);
    assert_eq!(msgs.next().unwrap(), payloads[0]);
    assert_eq!(msgs.next().unwrap(), payloads[1]);
    assert_eq!(msgs.next().unwrap(), payloads[2]);
    assert_eq!(msgs.next(), None);
    drop(msgs);

    // A later frame decrypts too, so each frame advanced the read nonce exactly once,
    // and its timestamp has not regressed.
    clock.set(1200);
    drive1(|| client.write(&capp, &mut cio, &[b"after".as_slice()], false)).unwrap();
    let mut msgs = host.read(&happ, &mut hio).unwrap();
    assert!(msgs.time() >= t1);
    assert_eq!(msgs.next(), Some(b"after".as_slice()));
}

#[test]
fn bidirectional_traffic() {
    let capp = TestApp::new("client");
    let happ = TestApp::new("host");
    let mut cbuf = vec![0u8; 1024];
    let mut hbuf = vec![0u8; 1024];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 10);
    let (mut cio, mut hio) = pipe(16);

    let (c, h) = drive2(|| client.handshake(&capp, &mut cio), || host.handshake(&happ, &mut hio));
    c.unwrap();
    h.unwrap();

    for round in 0u32..5 {
        let out = round.to_le_bytes();
        drive1(|| client.write(&capp, &mut cio, &[out.as_slice()], false)).unwrap();
        let mut msgs = host.read(&happ, &mut hio).unwrap();
        assert_eq!(msgs.next(), Some(out.as_slice()));
        drop(msgs);

        drive1(|| host.write(&happ, &mut hio, &[out.as_slice(), b"echo"], false)).unwrap();
        let mut msgs = client.read(&capp, &mut cio).unwrap();
        assert_eq!(msgs.next(), Some(out.as_slice()));
        assert_eq!(msgs.next(), Some(b"echo".as_slice()));
        drop(msgs);
    }
}

#[test]
fn empty_payload_app_frame() {
    let capp = TestApp::new("client");
    let happ = TestApp::new("host");
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 11);
    let (mut cio, mut hio) = pipe(16);
    let (c, h) = drive2(|| client.handshake(&capp, &mut cio), || host.handshake(&happ, &mut hio));
    c.unwrap();
    h.unwrap();

    drive1(|| client.write(&capp, &mut cio, &[b"".as_slice()], false)).unwrap();
    let mut msgs = host.read(&happ, &mut hio).unwrap();
    assert_eq!(msgs.next(), Some(b"".as_slice()));
}

#[test]
fn single_byte_transport_chunks() {
    let capp = TestApp::new("client");
    let happ = TestApp::new("host");
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 12);
    let (mut cio, mut hio) = pipe(1);

    let (c, h) = drive2(|| client.handshake(&capp, &mut cio), || host.handshake(&happ, &mut hio));
    assert_eq!(c.unwrap(), HandshakeOk::Established);
    assert_eq!(h.unwrap(), HandshakeOk::Established);

    drive1(|| host.write(&happ, &mut hio, &[b"trickled".as_slice()], false)).unwrap();
    let r = drive1(|| client.read(&capp, &mut cio).map(|mut m| m.next().map(|s| s.to_vec())));
    assert_eq!(r.unwrap().unwrap(), b"trickled");
}

#[test]
fn tampered_ciphertext_fails_authentication() {
    let capp = TestApp::new("client");
    let happ = TestApp::new("host");
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 13);
    let (mut cio, mut hio) = pipe(64);
    let (c, h) = drive2(|| client.handshake(&capp, &mut cio), || host.handshake(&happ, &mut hio));
    c.unwrap();
    h.unwrap();

    drive1(|| client.write(&capp, &mut cio, &[b"hello".as_slice()], false)).unwrap();
    // Flip one MAC bit while the frame sits in transit.
    {
        let mut q = hio.rx.borrow_mut();
        let b = q.get_mut(8).unwrap();
        *b ^= 0x01;
    }
    let err = host.read(&happ, &mut hio).unwrap_err();
    assert_eq!(err.fault(), Some(FaultType::FailedAuthentication));
    // Fatal: the session is gone.
    assert!(matches!(host.read(&happ, &mut hio), Err(Error::SessionClosed)));
    assert!(matches!(host.write(&happ, &mut hio, &[b"x".as_slice()], false), Err(Error::SessionClosed)));
}

#[test]
fn timestamp_regression_is_fatal() {
    let clock = Rc::new(Cell::new(1000u32));
    let capp = TestApp::with_clock("client", clock.clone());
    let happ = TestApp::new("host");
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 14);
    let (mut cio, mut hio) = pipe(32);
    let (c, h) = drive2(|| client.handshake(&capp, &mut cio), || host.handshake(&happ, &mut hio));
    c.unwrap();
    h.unwrap();

    clock.set(21_001);
    drive1(|| client.write(&capp, &mut cio, &[b"now".as_slice()], false)).unwrap();
    let mut msgs = host.read(&happ, &mut hio).unwrap();
    assert_eq!(msgs.time(), 20_001);
    msgs.next();
    drop(msgs);

    // 15 seconds into the past, far beyond the 1s tolerance.
    clock.set(6_000);
    drive1(|| client.write(&capp, &mut cio, &[b"then".as_slice()], false)).unwrap();
    let err = host.read(&happ, &mut hio).unwrap_err();
    assert_eq!(err.fault(), Some(FaultType::ExpiredTimestamp));
    assert!(matches!(host.read(&happ, &mut hio), Err(Error::SessionClosed)));
}

#[test]
fn timestamp_regression_allowed_when_guard_disabled() {
    struct LenientApp;
    impl ApplicationLayer for LenientApp {
        const SETTINGS: Settings = Settings { time_tolerance_ms: None, max_multi_count: 127 };
        type Rng = rand::rngs::StdRng;
        type Hash = sha2::Sha512;
        type Aead = crypto_secretbox::XSalsa20Poly1305;
        type DhKeyPair = x25519_dalek::StaticSecret;
        type SignPublicKey = ed25519_dalek::VerifyingKey;
        type SignKeyPair = ed25519_dalek::SigningKey;
    }

    let clock = Rc::new(Cell::new(1000u32));
    let capp = TestApp::with_clock("client", clock.clone());
    let happ = LenientApp;
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let mut client = Session::<TestApp>::new_client(sign_keypair(1), rng(15), &mut cbuf).unwrap();
    let mut host = Session::<LenientApp>::new_host(sign_keypair(2), rng(16), &mut hbuf).unwrap();
    let (mut cio, mut hio) = pipe(32);
    let (c, h) = drive2(|| client.handshake(&capp, &mut cio), || host.handshake(&happ, &mut hio));
    c.unwrap();
    h.unwrap();

    clock.set(21_001);
    drive1(|| client.write(&capp, &mut cio, &[b"now".as_slice()], false)).unwrap();
    host.read(&happ, &mut hio).unwrap();
    clock.set(6_000);
    drive1(|| client.write(&capp, &mut cio, &[b"then".as_slice()], false)).unwrap();
    host.read(&happ, &mut hio).unwrap();
}

#[test]
fn app_io_requires_established_session() {
    let capp = TestApp::new("client");
    let mut cbuf = vec![0u8; 512];
    let mut client = Session::<TestApp>::new_client(sign_keypair(1), rng(17), &mut cbuf).unwrap();
    let (mut cio, _hio) = pipe(16);

    assert_eq!(client.write(&capp, &mut cio, &[b"x".as_slice()], false), Err(Error::NotEstablished));
    assert!(matches!(client.read(&capp, &mut cio), Err(Error::NotEstablished)));
}

#[test]
fn host_refuses_app_frame_before_handshake() {
    let happ = TestApp::new("host");
    let mut hbuf = vec![0u8; 512];
    let mut host = Session::<TestApp>::new_host(sign_keypair(2), rng(18), &mut hbuf).unwrap();
    let (_cio, mut hio) = pipe(16);

    // A bare App packet where M1 belongs.
    hio.rx.borrow_mut().extend([2u8, 0, 0, 0, 5, 0]);
    let err = drive1(|| host.handshake(&happ, &mut hio)).unwrap_err();
    assert_eq!(err.fault(), Some(FaultType::OutOfSequence));
}

#[test]
fn oversized_message_is_rejected_without_killing_the_session() {
    let capp = TestApp::new("client");
    let happ = TestApp::new("host");
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 19);
    let (mut cio, mut hio) = pipe(32);
    let (c, h) = drive2(|| client.handshake(&capp, &mut cio), || host.handshake(&happ, &mut hio));
    c.unwrap();
    h.unwrap();

    let too_big = vec![0u8; client.max_message_size() + 1];
    assert_eq!(client.write(&capp, &mut cio, &[too_big.as_slice()], false), Err(Error::DataTooLarge));
    // Still usable.
    drive1(|| client.write(&capp, &mut cio, &[b"ok".as_slice()], false)).unwrap();
    let mut msgs = host.read(&happ, &mut hio).unwrap();
    assert_eq!(msgs.next(), Some(b"ok".as_slice()));
}

#[test]
fn init_rejects_small_buffer_and_broken_aead() {
    let mut small = vec![0u8; 100];
    match Session::<TestApp>::new_client(sign_keypair(1), rng(20), &mut small) {
        Err(ConfigError::BufferTooSmall { required }) => assert_eq!(required, salt_channel::MIN_BUFFER_SIZE),
        other => panic!("{:?}", other.err()),
    }

    // An AEAD that claims success but moves nothing must be refused at init.
    struct NoopAead;
    impl salt_channel::crypto::Aead for NoopAead {
        fn encrypt_in_place(_: &[u8; 32], _: &[u8; 24], _: &mut [u8]) -> bool {
            true
        }
        fn decrypt_in_place(_: &[u8; 32], _: &[u8; 24], _: &mut [u8]) -> bool {
            true
        }
    }
    struct BrokenApp;
    impl ApplicationLayer for BrokenApp {
        type Rng = rand::rngs::StdRng;
        type Hash = sha2::Sha512;
        type Aead = NoopAead;
        type DhKeyPair = x25519_dalek::StaticSecret;
        type SignPublicKey = ed25519_dalek::VerifyingKey;
        type SignKeyPair = ed25519_dalek::SigningKey;
    }
    let mut buf = vec![0u8; 512];
    assert_eq!(
        Session::<BrokenApp>::new_client(sign_keypair(1), rng(21), &mut buf).err(),
        Some(ConfigError::BadCryptoBackend)
    );
}

#[test]
fn host_last_flag_closes_client() {
    let capp = TestApp::new("client");
    let happ = TestApp::new("host");
    let mut cbuf = vec![0u8; 512];
    let mut hbuf = vec![0u8; 512];
    let (mut client, mut host) = session_pair(&mut cbuf, &mut hbuf, 22);
    let (mut cio, mut hio) = pipe(16);
    let (c, h) = drive2(|| client.handshake(&capp, &mut cio), || host.handshake(&happ, &mut hio));
    c.unwrap();
    h.unwrap();

    drive1(|| host.write(&happ, &mut hio, &[b"bye".as_slice()], true)).unwrap();
    assert!(matches!(host.write(&happ, &mut hio, &[b"x".as_slice()], false), Err(Error::SessionClosed)));

    let mut msgs = client.read(&capp, &mut cio).unwrap();
    assert!(msgs.is_last());
    assert_eq!(msgs.next(), Some(b"bye".as_slice()));
    drop(msgs);
    assert!(matches!(client.read(&capp, &mut cio), Err(Error::SessionClosed)));
}
