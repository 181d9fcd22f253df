// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

//! Host side of the verifier command protocol.

use {
    consts::{APP_MAX_SIZE, CHUNK_PAYLOAD_LEN, DIGEST_SIZE, PUBKEY_SIZE, SIGNATURE_SIZE},
    frame_protocol::{
        encode_request, parse_frame, parse_reply, AppCmd, EncodeError, NextApp, ParseError,
        ReplyError, ResetType, Status, FRAME_MAX,
    },
    std::{
        io::{ErrorKind, Read, Write},
        time::Duration,
    },
    tracing::{debug, info, trace},
    verifier::{
        crypto::{SchnorrVerifier, Sha256},
        verify::{Hasher, SignatureVerifier, VerificationResult},
    },
};

/// Frame id used for every request. Replies must echo it.
const ID: u8 = 1;

/// How long a read may block before the device is considered gone.
const READ_TIMEOUT: Duration = Duration::from_secs(2);

/// One request, one reply, over any byte stream.
pub struct Client<P> {
    port: P,
}

impl<P: Read + Write> Client<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    fn send(&mut self, cmd: AppCmd, payload: &[u8]) -> Result<(), Error> {
        let frame = encode_request(ID, cmd, payload).map_err(Error::Encode)?;
        trace!(?cmd, frame = %hex::encode(&frame), "tx");
        self.port.write_all(&frame).map_err(Error::Write)?;
        self.port.flush().map_err(Error::Write)
    }

    /// Read one reply to `expected` and return the bytes after the reply code.
    fn receive(&mut self, expected: AppCmd) -> Result<Vec<u8>, Error> {
        let mut lead = [0u8; 1];
        self.port.read_exact(&mut lead).map_err(Error::Read)?;
        let header = parse_frame(lead[0]).map_err(Error::Frame)?;
        let mut payload = vec![0u8; header.bytelen()];
        self.port.read_exact(&mut payload).map_err(Error::Read)?;
        trace!(?expected, lead = lead[0], payload = %hex::encode(&payload), "rx");

        if header.id != ID {
            return Err(Error::ReplyId(header.id));
        }
        parse_reply(header, &payload, expected)
            .map(<[u8]>::to_vec)
            .map_err(Error::Reply)
    }

    fn expect_ok(&mut self, cmd: AppCmd) -> Result<(), Error> {
        match self.receive(cmd)?.first() {
            Some(&status) if status == Status::Ok as u8 => Ok(()),
            _ => Err(Error::Rejected(cmd)),
        }
    }

    /// Read the key the verifier trusts.
    pub fn get_pubkey(&mut self) -> Result<[u8; PUBKEY_SIZE], Error> {
        self.send(AppCmd::GetPubkey, &[])?;
        let rest = self.receive(AppCmd::GetPubkey)?;
        rest.get(..PUBKEY_SIZE)
            .and_then(|key| key.try_into().ok())
            .ok_or(Error::Reply(ReplyError::UnexpectedLength(
                frame_protocol::CmdLen::Len128,
            )))
    }

    /// Ask the verifier to check `digest`. It resets without answering when
    /// the signature is good, which shows up here as [`Error::Read`].
    pub fn verify(
        &mut self,
        digest: &[u8; DIGEST_SIZE],
        signature: &[u8; SIGNATURE_SIZE],
    ) -> Result<(), Error> {
        let mut payload = [0u8; DIGEST_SIZE + SIGNATURE_SIZE];
        payload[..DIGEST_SIZE].copy_from_slice(digest);
        payload[DIGEST_SIZE..].copy_from_slice(signature);
        self.send(AppCmd::Verify, &payload)?;
        self.expect_ok(AppCmd::Verify)
    }

    /// Fire and forget, the device resets immediately.
    pub fn reset(&mut self, kind: ResetType, dst: NextApp) -> Result<(), Error> {
        self.send(AppCmd::Reset, &[kind as u8, dst as u8])
    }

    pub fn update_app_init(
        &mut self,
        size: u32,
        digest: &[u8; DIGEST_SIZE],
        signature: &[u8; SIGNATURE_SIZE],
    ) -> Result<(), Error> {
        let mut payload = [0u8; 4 + DIGEST_SIZE + SIGNATURE_SIZE];
        payload[..4].copy_from_slice(&size.to_le_bytes());
        payload[4..4 + DIGEST_SIZE].copy_from_slice(digest);
        payload[4 + DIGEST_SIZE..].copy_from_slice(signature);
        self.send(AppCmd::UpdateAppInit, &payload)?;
        self.expect_ok(AppCmd::UpdateAppInit)
    }

    /// At most [`CHUNK_PAYLOAD_LEN`] bytes per chunk.
    pub fn write_chunk(&mut self, chunk: &[u8]) -> Result<(), Error> {
        self.send(AppCmd::UpdateAppChunk, chunk)?;
        self.expect_ok(AppCmd::UpdateAppChunk)
    }

    /// Read until the device goes away or stays silent. Returns `true` if the
    /// port closed, `false` if it only timed out.
    pub fn wait_until_closed(&mut self) -> bool {
        let mut buf = [0u8; FRAME_MAX];
        loop {
            match self.port.read(&mut buf) {
                Ok(0) => return true,
                Ok(n) => trace!(n, "discarded"),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    return false
                }
                Err(e) => {
                    trace!(%e, "port closed");
                    return true;
                }
            }
        }
    }
}

/// Opens the port a device is reachable on. Called again every time the
/// device resets and its port disappears.
pub trait Connect {
    type Port: Read + Write;

    fn connect(&mut self) -> std::io::Result<Self::Port>;
}

#[derive(Debug, Clone)]
pub struct SerialConnector {
    pub path: String,
    pub baudrate: u32,
}

impl Connect for SerialConnector {
    type Port = Box<dyn serialport::SerialPort>;

    fn connect(&mut self) -> std::io::Result<Self::Port> {
        debug!(path = %self.path, baudrate = self.baudrate, "opening serial port");
        serialport::new(&self.path, self.baudrate)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(Into::into)
    }
}

/// Waits after a reset.
#[derive(Debug, Clone, Copy)]
pub struct Delays {
    /// Used when the port survives the reset
    pub settle: Duration,
    /// Before opening the port again
    pub reconnect: Duration,
}

impl Default for Delays {
    fn default() -> Self {
        Self {
            settle: Duration::from_secs(1),
            reconnect: Duration::from_secs(2),
        }
    }
}

/// A client that survives device resets.
pub struct Session<C: Connect> {
    connector: C,
    client: Client<C::Port>,
    expect_close: bool,
    delays: Delays,
}

impl<C: Connect> Session<C> {
    pub fn open(mut connector: C, expect_close: bool, delays: Delays) -> Result<Self, Error> {
        let port = connector.connect().map_err(Error::Connect)?;
        Ok(Self {
            connector,
            client: Client::new(port),
            expect_close,
            delays,
        })
    }

    pub fn client(&mut self) -> &mut Client<C::Port> {
        &mut self.client
    }

    /// Reset the device and come back once the verifier is serving commands.
    pub fn enter_command_mode(&mut self, kind: ResetType) -> Result<(), Error> {
        self.client.reset(kind, NextApp::WaitForCommand)?;
        self.await_reset()
    }

    fn await_reset(&mut self) -> Result<(), Error> {
        if self.expect_close {
            self.client.wait_until_closed();
            std::thread::sleep(self.delays.reconnect);
            let port = self.connector.connect().map_err(Error::Connect)?;
            self.client = Client::new(port);
        } else {
            std::thread::sleep(self.delays.settle);
        }
        Ok(())
    }

    /// Replace the app stored on the device.
    pub fn install(
        &mut self,
        app: &[u8],
        signature: &[u8; SIGNATURE_SIZE],
        expected_pubkey: Option<[u8; PUBKEY_SIZE]>,
    ) -> Result<(), Error> {
        let size = u32::try_from(app.len())
            .ok()
            .filter(|&size| size > 0 && size as usize <= APP_MAX_SIZE)
            .ok_or(Error::AppSize(app.len()))?;

        self.enter_command_mode(ResetType::StartFlash0)?;
        let pubkey = self.client.get_pubkey()?;
        check_pubkey(&pubkey, expected_pubkey)?;
        let digest = check_signature(app, signature, &pubkey)?;

        info!(size, "replacing app");
        self.client.update_app_init(size, &digest, signature)?;
        let chunks = app.len().div_ceil(CHUNK_PAYLOAD_LEN);
        for (i, chunk) in app.chunks(CHUNK_PAYLOAD_LEN).enumerate() {
            self.client.write_chunk(chunk)?;
            debug!("chunk {}/{chunks}", i + 1);
        }
        Ok(())
    }

    /// Have the verifier check `app` for a client that loads it next.
    pub fn boot(
        &mut self,
        app: &[u8],
        signature: &[u8; SIGNATURE_SIZE],
        expected_pubkey: Option<[u8; PUBKEY_SIZE]>,
    ) -> Result<(), Error> {
        self.enter_command_mode(ResetType::StartClient)?;
        let pubkey = self.client.get_pubkey()?;
        check_pubkey(&pubkey, expected_pubkey)?;
        let digest = check_signature(app, signature, &pubkey)?;

        match self.client.verify(&digest, signature) {
            Err(Error::Read(e)) if !self.expect_close => {
                debug!(%e, "no reply to verify, assuming the device reset");
                Ok(())
            }
            Err(Error::Read(e)) => {
                debug!(%e, "no reply to verify");
                if self.client.wait_until_closed() {
                    Ok(())
                } else {
                    Err(Error::NoReset)
                }
            }
            other => other,
        }
    }
}

fn check_pubkey(
    device: &[u8; PUBKEY_SIZE],
    expected: Option<[u8; PUBKEY_SIZE]>,
) -> Result<(), Error> {
    match expected {
        Some(expected) if expected != *device => Err(Error::KeyMismatch {
            device: *device,
            expected,
        }),
        _ => Ok(()),
    }
}

/// Check `signature` the way the verifier will and return the digest of `app`.
pub fn check_signature(
    app: &[u8],
    signature: &[u8; SIGNATURE_SIZE],
    pubkey: &[u8; PUBKEY_SIZE],
) -> Result<[u8; DIGEST_SIZE], Error> {
    let digest = Sha256.hash(app);
    match SchnorrVerifier::new().verify(&digest, signature, pubkey) {
        VerificationResult::Valid => Ok(digest),
        VerificationResult::Invalid => Err(Error::BadSignature),
    }
}

#[derive(Debug)]
pub enum Error {
    AppSize(usize),
    BadSignature,
    Connect(std::io::Error),
    Encode(EncodeError),
    Frame(ParseError),
    KeyMismatch {
        device: [u8; PUBKEY_SIZE],
        expected: [u8; PUBKEY_SIZE],
    },
    /// The device went silent after VERIFY but its port stayed open
    NoReset,
    Read(std::io::Error),
    Rejected(AppCmd),
    Reply(ReplyError),
    ReplyId(u8),
    Write(std::io::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::AppSize(size) => {
                write!(f, "app size {size} is not between 1 and {APP_MAX_SIZE} bytes")
            }
            Error::BadSignature => write!(f, "signature does not match the app and the device key"),
            Error::Connect(e) => write!(f, "failed to open serial port: {e}"),
            Error::Encode(e) => write!(f, "failed to encode request: {e}"),
            Error::Frame(e) => write!(f, "malformed reply: {e}"),
            Error::KeyMismatch { device, expected } => write!(
                f,
                "device trusts {}, expected {}",
                hex::encode(device),
                hex::encode(expected)
            ),
            Error::NoReset => {
                write!(f, "device stopped answering after verify without resetting")
            }
            Error::Read(e) => write!(f, "failed to read from device: {e}"),
            Error::Rejected(cmd) => write!(f, "device answered {cmd:?} with a bad status"),
            Error::Reply(e) => write!(f, "{e}"),
            Error::ReplyId(id) => write!(f, "reply has id {id}, expected {ID}"),
            Error::Write(e) => write!(f, "failed to write to device: {e}"),
        }
    }
}

impl std::error::Error for Error {}
