/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/.
 */
use crate::error::{fault, Error};
use crate::proto::{BODY_OFFSET, SIZE_PREFIX_SIZE};
use crate::transport::Transport;

/// Resumable progress of the frame currently in transfer.
///
/// No parsing and no crypto happens until a whole framed message has been
/// assembled; a partial transfer just parks here until the transport is ready
/// again. `Idle` means the buffer holds nothing in flight and may be reused.
pub(crate) enum Pump {
    Idle,
    /// Accumulating the 4-byte size prefix. It is staged here rather than in the
    /// session buffer so a torn read can never alias frame data.
    ReadSize { got: usize, size: [u8; SIZE_PREFIX_SIZE] },
    /// Accumulating `len` body bytes at `BODY_OFFSET`.
    ReadBody { got: usize, len: usize },
    /// Flushing `buf[off..end]`, `sent` bytes already on the wire.
    Write { off: usize, end: usize, sent: usize },
}

impl Pump {
    pub fn is_idle(&self) -> bool {
        matches!(self, Pump::Idle)
    }

    pub fn begin_write(&mut self, off: usize, end: usize) {
        debug_assert!(self.is_idle());
        *self = Pump::Write { off, end, sent: 0 };
    }
}

/// Drive an in-progress framed read to completion. Returns the body length once the
/// whole frame sits at `BODY_OFFSET`.
///
/// The declared size is validated against the buffer before a single body byte is
/// read: a frame that can not fit is a fatal parse fault, since an ordered stream
/// offers no way to resynchronize past it.
pub(crate) fn pump_read<T: Transport>(pump: &mut Pump, io: &mut T, buf: &mut [u8]) -> Result<usize, Error<T::Error>> {
    loop {
        match pump {
            Pump::Idle => {
                *pump = Pump::ReadSize { got: 0, size: [0u8; SIZE_PREFIX_SIZE] };
            }
            Pump::ReadSize { got, size } => {
                while *got < SIZE_PREFIX_SIZE {
                    let n = io.read(&mut size[*got..]).map_err(Error::Transport)?;
                    if n == 0 {
                        return Err(Error::Pending);
                    }
                    *got += n;
                }
                let len = u32::from_le_bytes(*size) as usize;
                if len < 2 || len > buf.len() - BODY_OFFSET {
                    return Err(fault!(InvalidPacket));
                }
                *pump = Pump::ReadBody { got: 0, len };
            }
            Pump::ReadBody { got, len } => {
                while *got < *len {
                    let n = io.read(&mut buf[BODY_OFFSET + *got..BODY_OFFSET + *len]).map_err(Error::Transport)?;
                    if n == 0 {
                        return Err(Error::Pending);
                    }
                    *got += n;
                }
                let len = *len;
                *pump = Pump::Idle;
                return Ok(len);
            }
            Pump::Write { .. } => unreachable!("read driven while a write is in flight"),
        }
    }
}

/// Flush the frame staged by `begin_write` to the transport.
pub(crate) fn pump_write<T: Transport>(pump: &mut Pump, io: &mut T, buf: &[u8]) -> Result<(), Error<T::Error>> {
    match pump {
        Pump::Write { off, end, sent } => {
            while *off + *sent < *end {
                let n = io.write(&buf[*off + *sent..*end]).map_err(Error::Transport)?;
                if n == 0 {
                    return Err(Error::Pending);
                }
                *sent += n;
            }
            *pump = Pump::Idle;
            Ok(())
        }
        _ => unreachable!("write driven with no frame staged"),
    }
}
