use crate::platform::{Indicator, Metadata, Platform, Preload, Reset, StorageError, SyscallError, System};
use crate::verify::{SignatureVerifier, VerificationResult};
use consts::{APP_MAX_SIZE, DIGEST_SIZE, PRELOAD_WRITE_SIZE, PUBKEY_SIZE, RESET_DATA_SIZE, SIGNATURE_SIZE};
use core::convert::Infallible;
use frame_protocol::{encode_request, AppCmd, CmdLen, Endpoint, FrameHeader};
use std::collections::VecDeque;

mod update;

const PUBKEY: [u8; PUBKEY_SIZE] = [0x5a; PUBKEY_SIZE];
const DIGEST: [u8; DIGEST_SIZE] = [0x11; DIGEST_SIZE];
const APP_END: u32 = 0x4000_8000;

/// Everything the verifier asked the board to do, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Call {
    Delete,
    Store { offset: u32 },
    StoreFinal {
        len: u32,
        digest: [u8; DIGEST_SIZE],
        signature: [u8; SIGNATURE_SIZE],
    },
    GetMetadata,
    ResetData,
    Reset(Reset),
    Protect { first: u32, last: u32 },
    Indicator(Indicator),
}

impl Call {
    fn is_storage(&self) -> bool {
        matches!(self, Call::Delete | Call::Store { .. } | Call::StoreFinal { .. })
    }
}

/// Board whose slot behaves like flash: erased to `0xff`, stores only clear bits.
struct FakeBoard {
    slot: Vec<u8>,
    calls: Vec<Call>,
    metadata: Metadata,
    reset_data: [u8; RESET_DATA_SIZE],
    version: u32,
    /// Fail the store with this index, counting from 0
    fail_store: Option<usize>,
    fail_delete: bool,
    fail_store_final: bool,
    fail_metadata: bool,
    fail_reset_data: bool,
    stores: usize,
}

impl FakeBoard {
    fn new() -> Self {
        Self {
            // Not erased, so an erase is visible
            slot: vec![0x00; APP_MAX_SIZE],
            calls: Vec::new(),
            metadata: Metadata {
                digest: DIGEST,
                signature: [0; SIGNATURE_SIZE],
                pubkey: PUBKEY,
            },
            reset_data: [0; RESET_DATA_SIZE],
            version: 6,
            fail_store: None,
            fail_delete: false,
            fail_store_final: false,
            fail_metadata: false,
            fail_reset_data: false,
            stores: 0,
        }
    }

    fn erased() -> Self {
        let mut board = Self::new();
        board.slot.fill(0xff);
        board
    }

    fn storage_calls(&self) -> Vec<Call> {
        self.calls.iter().filter(|c| c.is_storage()).cloned().collect()
    }

    fn resets(&self) -> Vec<Reset> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Reset(r) => Some(r.clone()),
                _ => None,
            })
            .collect()
    }

    fn indicators(&self) -> Vec<Indicator> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Indicator(i) => Some(*i),
                _ => None,
            })
            .collect()
    }
}

impl Preload for FakeBoard {
    fn delete(&mut self) -> Result<(), StorageError> {
        self.calls.push(Call::Delete);
        if self.fail_delete {
            return Err(StorageError(-1));
        }
        self.slot.fill(0xff);
        Ok(())
    }

    fn store(&mut self, offset: u32, block: &[u8; PRELOAD_WRITE_SIZE]) -> Result<(), StorageError> {
        self.calls.push(Call::Store { offset });
        let index = self.stores;
        self.stores += 1;
        if self.fail_store == Some(index) {
            return Err(StorageError(-2));
        }

        assert_eq!(offset as usize % PRELOAD_WRITE_SIZE, 0, "unaligned store at {offset}");
        let offset = offset as usize;
        for (cell, b) in self.slot[offset..offset + PRELOAD_WRITE_SIZE].iter_mut().zip(block) {
            *cell &= b;
        }
        Ok(())
    }

    fn store_final(
        &mut self,
        len: u32,
        digest: &[u8; DIGEST_SIZE],
        signature: &[u8; SIGNATURE_SIZE],
    ) -> Result<(), StorageError> {
        self.calls.push(Call::StoreFinal {
            len,
            digest: *digest,
            signature: *signature,
        });
        if self.fail_store_final {
            return Err(StorageError(-3));
        }
        Ok(())
    }

    fn get_metadata(&mut self) -> Result<Metadata, StorageError> {
        self.calls.push(Call::GetMetadata);
        if self.fail_metadata {
            return Err(StorageError(-4));
        }
        Ok(self.metadata.clone())
    }
}

impl System for FakeBoard {
    fn reset_data(&mut self) -> Result<[u8; RESET_DATA_SIZE], SyscallError> {
        self.calls.push(Call::ResetData);
        if self.fail_reset_data {
            return Err(SyscallError(-5));
        }
        Ok(self.reset_data)
    }

    // A real reset never comes back, so every recorded reset ends in an error.
    fn reset(&mut self, reset: &Reset) -> Result<Infallible, SyscallError> {
        self.calls.push(Call::Reset(reset.clone()));
        Err(SyscallError(-6))
    }
}

impl Platform for FakeBoard {
    fn version(&self) -> u32 {
        self.version
    }

    fn app_end(&self) -> u32 {
        APP_END
    }

    fn set_protected_range(&mut self, first: u32, last: u32) {
        self.calls.push(Call::Protect { first, last });
    }

    fn set_indicator(&mut self, indicator: Indicator) {
        self.calls.push(Call::Indicator(indicator));
    }

    fn halt(&mut self) -> ! {
        panic!("halted");
    }
}

/// Client side of the transport. Reads hand out at most `max_read` bytes.
struct ScriptedIo {
    input: VecDeque<u8>,
    output: Vec<u8>,
    max_read: usize,
    fail_read: bool,
}

impl ScriptedIo {
    fn new(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::new(),
            max_read: usize::MAX,
            fail_read: false,
        }
    }

    fn chunked(input: &[u8], max_read: usize) -> Self {
        Self {
            max_read,
            ..Self::new(input)
        }
    }
}

impl embedded_io::ErrorType for ScriptedIo {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Read for ScriptedIo {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.fail_read {
            return Err(embedded_io::ErrorKind::Other);
        }
        let n = buf.len().min(self.max_read).min(self.input.len());
        for (dst, src) in buf.iter_mut().zip(self.input.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }
}

impl embedded_io::Write for ScriptedIo {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Accepts exactly the signatures made by [`fake_sign`].
struct FakeVerifier;

impl SignatureVerifier for FakeVerifier {
    fn verify(
        &self,
        digest: &[u8; DIGEST_SIZE],
        signature: &[u8; SIGNATURE_SIZE],
        pubkey: &[u8; PUBKEY_SIZE],
    ) -> VerificationResult {
        if *signature == fake_sign(digest, pubkey) {
            VerificationResult::Valid
        } else {
            VerificationResult::Invalid
        }
    }
}

fn fake_sign(digest: &[u8; DIGEST_SIZE], pubkey: &[u8; PUBKEY_SIZE]) -> [u8; SIGNATURE_SIZE] {
    let mut signature = [0; SIGNATURE_SIZE];
    signature[..DIGEST_SIZE].copy_from_slice(digest);
    signature[DIGEST_SIZE..].copy_from_slice(pubkey);
    signature
}

/// Request frame for the app endpoint.
fn request(id: u8, cmd: AppCmd, payload: &[u8]) -> Vec<u8> {
    encode_request(id, cmd, payload).unwrap().to_vec()
}

/// Frame with an arbitrary header; the payload is zero padded to the length class.
fn raw_frame(endpoint: Endpoint, len: CmdLen, payload: &[u8]) -> Vec<u8> {
    let hdr = FrameHeader::new(1, endpoint, false, len);
    let mut frame = vec![hdr.encode()];
    frame.extend_from_slice(payload);
    frame.resize(1 + len.bytelen(), 0);
    frame
}

/// Deterministic image content that is never `0xff`.
fn image(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
