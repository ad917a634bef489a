/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
// Salt Channel v2: mutually authenticated, forward-secret channel over any ordered
// byte stream (TCP, serial, BLE). This crate is the protocol engine only; crypto
// primitives, transport and clock are supplied by the application through traits.

pub mod crypto;
pub mod crypto_impl;

pub mod applicationlayer;
pub mod error;
pub mod log_event;
mod nonce;
pub mod packet;
pub mod proto;
mod pump;
pub mod session;
pub mod transport;

pub use crate::applicationlayer::{ApplicationLayer, Settings};
pub use crate::error::{ConfigError, Error, FaultType};
pub use crate::log_event::LogEvent;
pub use crate::packet::{DiscoveryAddress, Messages, ProtocolPair};
pub use crate::proto::{buffer_size_for, APP_OVERHEAD, MAX_A2_PAIRS, MIN_BUFFER_SIZE, PROFILE_ANY, PROTOCOL_ID};
pub use crate::session::{HandshakeOk, Role, Session};
pub use crate::transport::Transport;
