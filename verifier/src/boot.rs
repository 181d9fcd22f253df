// SPDX-FileCopyrightText: 2024 Foundation Devices, Inc. <hello@foundationdevices.com>
// SPDX-License-Identifier: GPL-3.0-or-later

use crate::command::{read_command, reply, Packet};
use crate::config::{VerifierConfig, TRUSTED_PUBKEY, TRUSTED_PUBKEY_IS_DEV};
use crate::error::{Error, Fatal, Violation};
use crate::platform::{Board, Indicator, Metadata, Reset};
use crate::transport::FrameTransport;
use crate::update::UpdateSession;
use crate::verify::{Gate, Hasher, SignatureVerifier};
use consts::{CHUNK_PAYLOAD_LEN, DIGEST_SIZE, RAM_BASE, RAM_SIZE, SIGNATURE_SIZE};
use core::convert::Infallible;
use frame_protocol::{AppCmd, NextApp, ResetType, Status};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Look at what the previous app asked for
    Started,
    /// Check the app in flash and boot it
    VerifyFlash,
    /// Serve client commands
    WaitForCommand,
    /// Receive the app announced by an update init
    WaitForAppChunk(UpdateSession),
}

pub struct Verifier<'a, B, T, V, H> {
    board: &'a mut B,
    transport: &'a mut T,
    gate: Gate<V, H>,
    config: VerifierConfig,
    metadata: Metadata,
    state: State,
}

impl<'a, B, T, V, H> Verifier<'a, B, T, V, H>
where
    B: Board,
    T: FrameTransport,
    V: SignatureVerifier,
    H: Hasher,
{
    /// Lock down RAM past the verifier and read the app metadata.
    pub fn new(board: &'a mut B, transport: &'a mut T, gate: Gate<V, H>, config: VerifierConfig) -> Result<Self, Error> {
        // Nothing may execute from RAM after the verifier's own image
        let first = board.app_end();
        board.set_protected_range(first, RAM_BASE + RAM_SIZE);

        let metadata = board.get_metadata().map_err(|e| {
            error!("reading app metadata failed: {}", e.0);
            Fatal::Metadata(e)
        })?;

        if TRUSTED_PUBKEY_IS_DEV && config.trusted_pubkey == TRUSTED_PUBKEY {
            warn!("trusting the development key");
        }
        // Only the compiled-in key is ever used
        if metadata.pubkey != config.trusted_pubkey {
            warn!("app metadata names a different key");
        }

        let state = if config.start_in_command_mode {
            State::WaitForCommand
        } else {
            State::Started
        };

        Ok(Self {
            board,
            transport,
            gate,
            config,
            metadata,
            state,
        })
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Run the current state once. Every error returned is fatal.
    pub fn step(&mut self) -> Result<(), Error> {
        self.state = match core::mem::replace(&mut self.state, State::Started) {
            State::Started => self.started()?,
            State::VerifyFlash => {
                debug!("state: verify flash");
                self.verify_flash()?
            }
            State::WaitForCommand => {
                debug!("state: wait for command");
                self.wait_for_command()?
            }
            State::WaitForAppChunk(session) => self.wait_for_app_chunk(session)?,
        };

        Ok(())
    }

    /// Step until the first error. Only returns with an error.
    pub fn serve(&mut self) -> Result<Infallible, Error> {
        loop {
            self.step()?;
        }
    }

    fn started(&mut self) -> Result<State, Error> {
        let next_app_data = self.board.reset_data().map_err(Fatal::ResetData)?;

        if next_app_data[0] == NextApp::WaitForCommand as u8 {
            Ok(State::WaitForCommand)
        } else {
            Ok(State::VerifyFlash)
        }
    }

    fn verify_flash(&mut self) -> Result<State, Error> {
        self.board.set_indicator(Indicator::Blue);

        let result = self.gate.reset_if_verified(
            &mut *self.board,
            &self.config.trusted_pubkey,
            ResetType::StartFlash1Ver,
            &self.metadata.digest,
            &self.metadata.signature,
        );
        match result {
            Ok(never) => match never {},
            Err(Error::VerificationFailure) => {
                warn!("app in flash failed verification");
                Ok(State::WaitForCommand)
            }
            Err(e) => Err(e),
        }
    }

    fn wait_for_command(&mut self) -> Result<State, Error> {
        self.board.set_indicator(Indicator::Green);

        let pkt = read_command(&mut *self.transport)?;
        let cmd = AppCmd::try_from(pkt.opcode()).map_err(Violation::Opcode)?;
        trace!("command {:?}", cmd);

        match cmd {
            AppCmd::FwProbe => Ok(State::WaitForCommand),
            AppCmd::GetPubkey => {
                pkt.expect_len(cmd)?;
                reply(&mut *self.transport, pkt.hdr, cmd, &self.config.trusted_pubkey)?;
                Ok(State::WaitForCommand)
            }
            AppCmd::Verify => {
                pkt.expect_len(cmd)?;
                let digest: [u8; DIGEST_SIZE] = field(&pkt, 1);
                let signature: [u8; SIGNATURE_SIZE] = field(&pkt, 1 + DIGEST_SIZE);

                let result = self.gate.reset_if_verified(
                    &mut *self.board,
                    &self.config.trusted_pubkey,
                    ResetType::StartClientVer,
                    &digest,
                    &signature,
                );
                match result {
                    Ok(never) => match never {},
                    Err(Error::VerificationFailure) => {
                        reply(&mut *self.transport, pkt.hdr, cmd, &[Status::Bad as u8])?;
                        Ok(State::WaitForCommand)
                    }
                    Err(e) => Err(e),
                }
            }
            AppCmd::Reset => {
                pkt.expect_len(cmd)?;
                let kind = ResetType::try_from(pkt.cmd[1]).map_err(Violation::ResetType)?;
                let next = NextApp::try_from(pkt.cmd[2]).map_err(Violation::NextApp)?;
                info!("client reset into {:?}, next {:?}", kind, next);

                self.reset(&Reset::to(kind, next))
            }
            AppCmd::UpdateAppInit => {
                pkt.expect_len(cmd)?;
                let size = u32::from_le_bytes(field(&pkt, 1));
                let digest: [u8; DIGEST_SIZE] = field(&pkt, 5);
                let signature: [u8; SIGNATURE_SIZE] = field(&pkt, 5 + DIGEST_SIZE);

                let session = UpdateSession::init(&mut *self.board, size, &digest, &signature)?;
                reply(&mut *self.transport, pkt.hdr, cmd, &[Status::Ok as u8])?;
                info!("receiving app of {} bytes", size);

                Ok(State::WaitForAppChunk(session))
            }
            AppCmd::UpdateAppChunk => Err(Violation::Opcode(pkt.opcode()).into()),
        }
    }

    fn wait_for_app_chunk(&mut self, mut session: UpdateSession) -> Result<State, Error> {
        self.board.set_indicator(Indicator::Yellow);

        let pkt = read_command(&mut *self.transport)?;
        match AppCmd::try_from(pkt.opcode()) {
            Ok(AppCmd::FwProbe) => Ok(State::WaitForAppChunk(session)),
            Ok(cmd @ AppCmd::UpdateAppChunk) => {
                pkt.expect_len(cmd)?;
                session.write(&mut *self.board, &pkt.cmd[1..1 + CHUNK_PAYLOAD_LEN])?;
                reply(&mut *self.transport, pkt.hdr, cmd, &[Status::Ok as u8])?;

                if !session.is_complete() {
                    return Ok(State::WaitForAppChunk(session));
                }

                session.finalize(&mut *self.board)?;
                info!("app written, resetting into it");
                self.reset(&Reset::to(ResetType::StartDefault, NextApp::BootApp1))
            }
            _ => Err(Violation::Opcode(pkt.opcode()).into()),
        }
    }

    fn reset(&mut self, reset: &Reset) -> Result<State, Error> {
        match self.board.reset(reset) {
            Ok(never) => match never {},
            Err(e) => Err(Fatal::ResetReturned(e).into()),
        }
    }
}

/// `N` bytes of the command starting at `offset`.
fn field<const N: usize>(pkt: &Packet, offset: usize) -> [u8; N] {
    let mut out = [0; N];
    out.copy_from_slice(&pkt.cmd[offset..offset + N]);
    out
}

/// Run the verifier until the first fatal error, then halt.
pub fn run<B, T, V, H>(board: &mut B, transport: &mut T, gate: Gate<V, H>, config: VerifierConfig) -> !
where
    B: Board,
    T: FrameTransport,
    V: SignatureVerifier,
    H: Hasher,
{
    info!("verifier");

    let result = Verifier::new(&mut *board, transport, gate, config).and_then(|mut verifier| verifier.serve());
    let e = match result {
        Ok(never) => match never {},
        Err(e) => e,
    };

    error!("halting: {}", e);
    board.set_indicator(Indicator::Red);
    board.halt()
}

/// Run on `board` with the default configuration, talking to the client
/// through `io`.
#[cfg(feature = "secp256k1")]
pub fn start<B, IO>(board: &mut B, io: IO) -> !
where
    B: Board,
    IO: embedded_io::Read + embedded_io::Write,
{
    use crate::crypto::{SchnorrVerifier, Sha256};
    use crate::transport::AnyTransport;

    let mut transport = AnyTransport::select(board.version(), io);
    let config = VerifierConfig::default();
    let gate = Gate::new(SchnorrVerifier::new(), Sha256, config.measurement);

    run(board, &mut transport, gate, config)
}
