/*
 * If not stated otherwise in this file or this component's LICENSE file the
 * following copyright and licenses apply:
 *
 * Copyright 2025 RDK Management
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 * http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
*/

// Standard library
use std::cell::Cell;
use std::io::{self, ErrorKind};
use std::rc::Rc;

// External crates
use thiserror::Error;
use tracing::{debug, error, instrument, trace, warn};

// Internal modules
use crate::callback_registry::{CallbackRegistry, HandlerAction};
use crate::linux::genetlink::{CtrlAttribute, CtrlCommand, GENL_ID_CTRL};
use crate::linux::netlink::{NLMSG_DONE, NLMSG_ERROR, NLMSG_NOOP, NLMSG_OVERRUN};
use crate::linux::nl80211::{Nl80211Attribute, Nl80211Command, NL80211_GENL_NAME};
use crate::netlink_codec::{
    find_attribute, messages, ErrorReply, GenlMessage, GenlRequest, NetlinkCodecError,
    NetlinkMessage,
};
use crate::next_task_id;

/// Receive buffer for one netlink datagram.
const RECV_BUFFER_SIZE: usize = 64 * 1024;

///////////////////////////////////////////////////////////////////////////
// NetlinkTransport
///////////////////////////////////////////////////////////////////////////
/// Datagram transport towards the kernel's generic netlink bus.
pub trait NetlinkTransport {
    fn send(&mut self, message: &[u8]) -> io::Result<usize>;
    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize>;
}

impl<T: NetlinkTransport + ?Sized> NetlinkTransport for &mut T {
    fn send(&mut self, message: &[u8]) -> io::Result<usize> {
        (**self).send(message)
    }

    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        (**self).recv(buffer)
    }
}

/// Opens transports on demand.
pub trait TransportConnector {
    type Transport: NetlinkTransport;

    fn connect(&self) -> io::Result<Self::Transport>;
}

///////////////////////////////////////////////////////////////////////////
// TransactionState
///////////////////////////////////////////////////////////////////////////
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    #[default]
    Pending,
    Success,
    /// negative errno reported by the kernel or the transport
    Failed(i32),
}

impl TransactionState {
    pub fn is_pending(&self) -> bool {
        matches!(self, TransactionState::Pending)
    }

    /// Integer form of the state: 1 while pending, 0 on success.
    pub fn code(&self) -> i32 {
        match self {
            TransactionState::Pending => 1,
            TransactionState::Success => 0,
            TransactionState::Failed(code) => *code,
        }
    }

    // A terminal state is final.
    fn settle(&mut self, outcome: TransactionState) {
        if self.is_pending() {
            *self = outcome;
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("failed to build netlink message: {0}")]
    MessageBuildFailed(#[from] NetlinkCodecError),
    #[error("failed to send netlink message: error {0}")]
    SendFailed(i32),
    #[error("generic netlink family {0:?} not found")]
    FamilyNotFound(String),
}

fn errno_of(error: &io::Error) -> i32 {
    -error.raw_os_error().unwrap_or(libc::EIO)
}

///////////////////////////////////////////////////////////////////////////
// Receive side
///////////////////////////////////////////////////////////////////////////
/// Dispatches every message of one received datagram.
///
/// Stops at the first terminal reply, at a handler asking to stop, or at the
/// first malformed message. Nothing here moves a terminal state back.
pub fn process_batch(
    datagram: &[u8],
    sequence: u32,
    state: &mut TransactionState,
    registry: &mut CallbackRegistry,
) {
    for message in messages(datagram) {
        if !state.is_pending() {
            break;
        }

        let message = match message {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping rest of netlink batch: {e}");
                break;
            }
        };

        let header = message.header;
        if header.sequence != 0 && header.sequence != sequence {
            debug!(
                "Skipping message with sequence {} (expected {sequence})",
                header.sequence
            );
            continue;
        }

        match header.message_type {
            NLMSG_NOOP => trace!("noop"),
            NLMSG_OVERRUN => warn!("netlink overrun reported, messages were lost"),
            NLMSG_DONE => {
                debug!("finish handler called");
                state.settle(TransactionState::Success);
            }
            NLMSG_ERROR => state.settle(on_error_message(&message)),
            _ => {
                if registry.dispatch(&message) == HandlerAction::Stop {
                    debug!("Handler stopped processing of the batch");
                    break;
                }
            }
        }
    }
}

fn on_error_message(message: &NetlinkMessage<'_>) -> TransactionState {
    let reply = match ErrorReply::parse(message) {
        Ok(reply) => reply,
        Err(e) => {
            error!("{e}");
            return TransactionState::Failed(-libc::EBADMSG);
        }
    };

    if reply.is_ack() {
        debug!("ack handler called");
        return TransactionState::Success;
    }

    debug!("error handler called");
    if let Some(text) = &reply.ext_ack.message {
        error!("kernel reports: {}", String::from_utf8_lossy(text));
    }
    if let Some(offset) = reply.ext_ack.bad_attribute_offset {
        error!("offending attribute at offset {offset}");
    }
    TransactionState::Failed(reply.error)
}

/// Receives until the transaction for `sequence` reaches a terminal state.
///
/// There is no timeout: a kernel that never answers blocks here.
pub fn await_completion<T: NetlinkTransport>(
    transport: &mut T,
    sequence: u32,
    registry: &mut CallbackRegistry,
) -> TransactionState {
    let mut state = TransactionState::Pending;
    let mut buffer = vec![0u8; RECV_BUFFER_SIZE];

    while state.is_pending() {
        let received = match transport.recv(&mut buffer) {
            Ok(0) => {
                error!("netlink socket returned no data");
                state.settle(TransactionState::Failed(-libc::ENODATA));
                break;
            }
            Ok(received) => received,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => {
                error!("Error receiving netlink reply: {e}");
                state.settle(TransactionState::Failed(errno_of(&e)));
                break;
            }
        };

        let Some(datagram) = buffer.get(..received) else {
            error!("recv returned invalid range: {received}");
            state.settle(TransactionState::Failed(-libc::EIO));
            break;
        };

        trace!("netlink batch: {:02x?}", datagram);
        process_batch(datagram, sequence, &mut state, registry);
    }

    debug!("transaction finished: {state:?}");
    state
}

///////////////////////////////////////////////////////////////////////////
// Send side
///////////////////////////////////////////////////////////////////////////
/// Completes the envelope of `request` and sends it to the kernel (port 0).
pub fn send_request<T: NetlinkTransport>(
    transport: &mut T,
    request: GenlRequest,
    sequence: u32,
) -> Result<usize, TransactionError> {
    let bytes = request.finish(sequence, 0)?;
    trace!("netlink request: {:02x?}", bytes);

    match transport.send(&bytes) {
        Ok(sent) if sent == bytes.len() => Ok(sent),
        Ok(sent) => {
            error!("short netlink send: {sent} of {} bytes", bytes.len());
            Err(TransactionError::SendFailed(-libc::EIO))
        }
        Err(e) => {
            error!("Failed to send netlink message: {e}");
            Err(TransactionError::SendFailed(errno_of(&e)))
        }
    }
}

/// Asks the generic netlink controller for the id of family `name`.
pub fn resolve_family<T: NetlinkTransport>(
    transport: &mut T,
    name: &str,
    sequence: u32,
) -> Result<u16, TransactionError> {
    let mut request = GenlRequest::new(GENL_ID_CTRL, CtrlCommand::GetFamily.into(), 1);
    request.put_string(CtrlAttribute::FamilyName.into(), name)?;
    send_request(transport, request, sequence)?;

    let family_id = Rc::new(Cell::new(None));
    let captured = Rc::clone(&family_id);
    let mut registry = CallbackRegistry::new();
    registry.register(move |message: &NetlinkMessage<'_>| {
        if message.header.message_type != GENL_ID_CTRL {
            return HandlerAction::Continue;
        }
        let Ok((_, genl)) = GenlMessage::parse(message.payload) else {
            return HandlerAction::Continue;
        };
        if genl.command == u8::from(CtrlCommand::NewFamily) {
            let attributes = genl.attributes();
            if let Some(id) = find_attribute(&attributes, CtrlAttribute::FamilyId.into())
                .and_then(|e| e.as_u16())
            {
                captured.set(Some(id));
            }
        }
        HandlerAction::Continue
    });

    let state = await_completion(transport, sequence, &mut registry);
    match (state, family_id.get()) {
        (TransactionState::Success, Some(id)) => {
            debug!("generic netlink family {name} has id {id}");
            Ok(id)
        }
        (state, _) => {
            error!("Failed to resolve family {name}: {state:?}");
            Err(TransactionError::FamilyNotFound(name.to_string()))
        }
    }
}

///////////////////////////////////////////////////////////////////////////
// Nl80211Session
///////////////////////////////////////////////////////////////////////////
/// A transport bound to the nl80211 family with its own sequence counter.
#[derive(Debug)]
pub struct Nl80211Session<T> {
    transport: T,
    family_id: u16,
    next_sequence: u32,
}

impl<T: NetlinkTransport> Nl80211Session<T> {
    /// Resolves the nl80211 family over `transport`.
    pub fn open(mut transport: T) -> Result<Self, TransactionError> {
        let family_id = resolve_family(&mut transport, NL80211_GENL_NAME, 1)?;
        Ok(Self {
            transport,
            family_id,
            next_sequence: 2,
        })
    }

    pub fn new(transport: T, family_id: u16) -> Self {
        Self {
            transport,
            family_id,
            next_sequence: 1,
        }
    }

    pub fn family_id(&self) -> u16 {
        self.family_id
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// `NL80211_CMD_FRAME` carrying the interface index and, when given, the
    /// channel frequency in MHz. The frame attribute is appended by the caller.
    pub fn frame_request(
        &self,
        if_index: u32,
        frequency: Option<u32>,
    ) -> Result<GenlRequest, TransactionError> {
        let mut request = GenlRequest::new(self.family_id, Nl80211Command::Frame.into(), 0);
        request.put_u32(Nl80211Attribute::IfIndex.into(), if_index)?;
        if let Some(frequency) = frequency {
            request.put_u32(Nl80211Attribute::WiphyFreq.into(), frequency)?;
        }
        Ok(request)
    }

    fn allocate_sequence(&mut self) -> u32 {
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1).max(1);
        sequence
    }

    /// Sends `request` and waits for its ack, finish or error reply.
    ///
    /// Only a failed send is an `Err`; kernel-reported failures come back as
    /// `TransactionState::Failed`.
    #[instrument(skip_all, name = "nl80211_transaction", fields(task = next_task_id()))]
    pub fn transact(
        &mut self,
        request: GenlRequest,
        registry: &mut CallbackRegistry,
    ) -> Result<TransactionState, TransactionError> {
        let sequence = self.allocate_sequence();
        let sent = send_request(&mut self.transport, request, sequence)?;
        debug!("sent {sent} bytes with sequence {sequence}");
        Ok(await_completion(&mut self.transport, sequence, registry))
    }
}
