// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Byte transports frames are read from and written to.
//!
//! Castor and later hardware multiplex the USB CDC endpoint with other
//! traffic and hand out bytes as they arrive. Older hardware exposes the
//! raw UART, which delivers whole requests. The transport is chosen once
//! from the hardware version and stays fixed.

use crate::Error;
use consts::TKEY_VERSION_CASTOR;
use embedded_io::{Error as _, Read, ReadExactError, Write};

pub trait FrameTransport {
    /// Fill `buf` completely or fail.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error>;

    /// Send `buf` completely.
    fn write_all(&mut self, buf: &[u8]) -> Result<(), Error>;
}

fn write_flush<T: Write>(io: &mut T, buf: &[u8]) -> Result<(), Error> {
    io.write_all(buf).and_then(|_| io.flush()).map_err(|e| {
        warn!("write failed: {:?}", e.kind());
        Error::Io
    })
}

/// Multiplexed CDC endpoint. Reads return whatever is available.
pub struct CdcTransport<T> {
    io: T,
}

impl<T> CdcTransport<T> {
    pub fn new(io: T) -> Self {
        Self { io }
    }

    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: Read + Write> FrameTransport for CdcTransport<T> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let mut n = 0;
        while n < buf.len() {
            match self.io.read(&mut buf[n..]) {
                Ok(0) => {
                    warn!("end of stream after {} of {} bytes", n, buf.len());
                    return Err(Error::Io);
                }
                Ok(read) => {
                    trace!("read {} bytes", read);
                    n += read;
                }
                Err(e) => {
                    warn!("read failed: {:?}", e.kind());
                    return Err(Error::Io);
                }
            }
        }

        Ok(())
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Error> {
        write_flush(&mut self.io, buf)
    }
}

/// Raw UART of hardware older than Castor.
pub struct UartTransport<T> {
    io: T,
}

impl<T> UartTransport<T> {
    pub fn new(io: T) -> Self {
        Self { io }
    }

    pub fn into_inner(self) -> T {
        self.io
    }
}

impl<T: Read + Write> FrameTransport for UartTransport<T> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        self.io.read_exact(buf).map_err(|e| {
            match e {
                ReadExactError::UnexpectedEof => warn!("uart: unexpected end of stream"),
                ReadExactError::Other(e) => warn!("uart: read failed: {:?}", e.kind()),
            }
            Error::Io
        })
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Error> {
        write_flush(&mut self.io, buf)
    }
}

/// The transport matching the hardware the verifier runs on.
pub enum AnyTransport<T> {
    Cdc(CdcTransport<T>),
    Uart(UartTransport<T>),
}

impl<T: Read + Write> AnyTransport<T> {
    pub fn select(version: u32, io: T) -> Self {
        if version >= TKEY_VERSION_CASTOR {
            debug!("hardware version {}, using CDC", version);
            Self::Cdc(CdcTransport::new(io))
        } else {
            debug!("hardware version {}, using UART", version);
            Self::Uart(UartTransport::new(io))
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::Cdc(t) => t.into_inner(),
            Self::Uart(t) => t.into_inner(),
        }
    }
}

impl<T: Read + Write> FrameTransport for AnyTransport<T> {
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        match self {
            Self::Cdc(t) => t.read_exact(buf),
            Self::Uart(t) => t.read_exact(buf),
        }
    }

    fn write_all(&mut self, buf: &[u8]) -> Result<(), Error> {
        match self {
            Self::Cdc(t) => t.write_all(buf),
            Self::Uart(t) => t.write_all(buf),
        }
    }
}
