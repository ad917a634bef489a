/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use salt_channel::crypto::SignKeyPair;
use salt_channel::crypto_impl::{crypto_secretbox, ed25519_dalek, sha2, x25519_dalek};
use salt_channel::{ApplicationLayer, Settings, Transport};

pub type TErr = salt_channel::Error<()>;

pub struct TestApp {
    pub name: &'static str,
    pub clock: Option<Rc<Cell<u32>>>,
}

impl TestApp {
    pub fn new(name: &'static str) -> Self {
        Self { name, clock: None }
    }

    pub fn with_clock(name: &'static str, clock: Rc<Cell<u32>>) -> Self {
        Self { name, clock: Some(clock) }
    }
}

impl ApplicationLayer for TestApp {
    const SETTINGS: Settings = Settings {
        time_tolerance_ms: Some(1000),
        max_multi_count: 127,
    };
    type Rng = StdRng;
    type Hash = sha2::Sha512;
    type Aead = crypto_secretbox::XSalsa20Poly1305;
    type DhKeyPair = x25519_dalek::StaticSecret;
    type SignPublicKey = ed25519_dalek::VerifyingKey;
    type SignKeyPair = ed25519_dalek::SigningKey;

    fn clock_ms(&self) -> Option<u32> {
        self.clock.as_ref().map(|c| c.get())
    }

    fn event_log(&self, event: salt_channel::LogEvent) {
        println!("[{}] {:?}", self.name, event);
    }
}

pub fn rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Deterministic signing keypair from a one-byte seed pattern, e.g. `01 00 .. 00`.
pub fn sign_keypair(seed_byte: u8) -> ed25519_dalek::SigningKey {
    let mut seed = [0u8; 32];
    seed[0] = seed_byte;
    <ed25519_dalek::SigningKey as SignKeyPair>::from_seed(&seed)
}

pub fn public_key(keypair: &ed25519_dalek::SigningKey) -> [u8; 32] {
    SignKeyPair::public_key_bytes(keypair)
}

/// One end of an in-memory duplex pipe. `chunk` caps the bytes moved per call so
/// partial transfers and `Pending` resumption get exercised; an empty queue reads
/// as would-block.
pub struct PipeEnd {
    pub rx: Rc<RefCell<VecDeque<u8>>>,
    pub tx: Rc<RefCell<VecDeque<u8>>>,
    pub chunk: usize,
}

pub fn pipe(chunk: usize) -> (PipeEnd, PipeEnd) {
    let a_to_b = Rc::new(RefCell::new(VecDeque::new()));
    let b_to_a = Rc::new(RefCell::new(VecDeque::new()));
    (
        PipeEnd { rx: b_to_a.clone(), tx: a_to_b.clone(), chunk },
        PipeEnd { rx: a_to_b, tx: b_to_a, chunk },
    )
}

impl Transport for PipeEnd {
    type Error = ();

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, ()> {
        let mut q = self.rx.borrow_mut();
        let n = self.chunk.min(buf.len()).min(q.len());
        for (i, b) in q.drain(..n).enumerate() {
            buf[i] = b;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize, ()> {
        let n = self.chunk.min(buf.len());
        self.tx.borrow_mut().extend(buf[..n].iter());
        Ok(n)
    }
}

fn is_pending<R>(r: &Result<R, TErr>) -> bool {
    matches!(r, Err(e) if e.is_pending())
}

/// Alternate two session operations until neither is pending (or a bounded number
/// of rounds passes, in which case the last pending results are returned).
pub fn drive2<RA, RB>(
    mut a: impl FnMut() -> Result<RA, TErr>,
    mut b: impl FnMut() -> Result<RB, TErr>,
) -> (Result<RA, TErr>, Result<RB, TErr>) {
    let mut ra = None;
    let mut rb = None;
    for _ in 0..100_000 {
        if ra.as_ref().map_or(true, is_pending) {
            ra = Some(a());
        }
        if rb.as_ref().map_or(true, is_pending) {
            rb = Some(b());
        }
        if !ra.as_ref().map_or(true, is_pending) && !rb.as_ref().map_or(true, is_pending) {
            break;
        }
    }
    (ra.unwrap(), rb.unwrap())
}

/// Re-invoke one session operation through `Pending` until it resolves (bounded).
pub fn drive1<R>(mut f: impl FnMut() -> Result<R, TErr>) -> Result<R, TErr> {
    let mut r = f();
    for _ in 0..10_000 {
        if !is_pending(&r) {
            break;
        }
        r = f();
    }
    r
}
