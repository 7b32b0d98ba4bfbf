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

// External crates
use pnet::datalink::MacAddr;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

// Standard library
use std::collections::TryReserveError;
use std::io;

// Internal modules
use crate::callback_registry::{CallbackRegistry, HandlerAction, MessageHandler};
use crate::frame_codec::{build_frame, ensure_capacity, FrameError, DEFAULT_DESTINATION};
use crate::interface_resolver::{InterfaceError, InterfaceResolver};
use crate::linux::nl80211::{Nl80211Attribute, Nl80211Command};
use crate::netlink_codec::{find_attribute, GenlMessage, NetlinkCodecError, NetlinkMessage};
use crate::next_task_id;
use crate::transaction::{
    Nl80211Session, TransactionError, TransactionState, TransportConnector,
};

pub const DEFAULT_INTERFACE: &str = "wlan1";
/// Channel frequency in MHz.
pub const DEFAULT_FREQUENCY: u32 = 5220;
pub const DEFAULT_BUFFER_CAPACITY: usize = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSenderConfig {
    pub interface: String,
    pub destination: MacAddr,
    /// `None` leaves `NL80211_ATTR_WIPHY_FREQ` out of the request
    pub frequency: Option<u32>,
    /// capacity of the buffer the frame is built in
    pub buffer_capacity: usize,
}

impl Default for FrameSenderConfig {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.to_string(),
            destination: DEFAULT_DESTINATION,
            frequency: Some(DEFAULT_FREQUENCY),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

#[derive(Error, Debug)]
pub enum SendFrameError {
    #[error("interface {0} not found")]
    InterfaceNotFound(String),
    #[error("failed to open netlink socket: {0}")]
    Socket(#[source] io::Error),
    #[error("failed to allocate a {capacity} byte frame buffer: {source}")]
    BufferAllocation {
        capacity: usize,
        #[source]
        source: TryReserveError,
    },
    #[error("failed to read interface address: {0}")]
    MacAddress(#[from] InterfaceError),
    #[error("failed to build action frame: {0}")]
    FrameConstruction(#[from] FrameError),
    #[error("failed to attach frame: {0}")]
    MessageBuild(#[from] NetlinkCodecError),
    #[error(transparent)]
    Transaction(#[from] TransactionError),
    #[error("kernel rejected the frame: error {0}")]
    TransactionFailed(i32),
}

impl SendFrameError {
    /// Process exit status for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            SendFrameError::BufferAllocation { .. } => 2,
            SendFrameError::MessageBuild(_) => 4,
            SendFrameError::Transaction(TransactionError::MessageBuildFailed(_)) => 4,
            SendFrameError::MacAddress(_) | SendFrameError::FrameConstruction(_) => 8,
            _ => 1,
        }
    }
}

/// Transmits one test action frame on `config.interface` and waits for the
/// kernel to accept or reject it.
#[instrument(skip_all, name = "send_action_frame", fields(task = next_task_id(), interface = %config.interface))]
pub fn send_action_frame<R, C>(
    config: &FrameSenderConfig,
    resolver: &R,
    connector: &C,
    registry: &mut CallbackRegistry,
) -> Result<(), SendFrameError>
where
    R: InterfaceResolver + ?Sized,
    C: TransportConnector + ?Sized,
{
    let if_index = resolver.resolve_index(&config.interface);
    if if_index == 0 {
        error!("Interface {} not found", config.interface);
        return Err(SendFrameError::InterfaceNotFound(config.interface.clone()));
    }
    debug!("interface {} has index {if_index}", config.interface);

    let transport = connector.connect().map_err(SendFrameError::Socket)?;
    let mut session = Nl80211Session::open(transport)?;
    let mut request = session.frame_request(if_index, config.frequency)?;

    let mut buffer = allocate_buffer(config.buffer_capacity)?;
    ensure_capacity(buffer.len())?;
    let source = resolver.resolve_mac(&config.interface)?;
    let frame_len = build_frame(config.destination, source, &mut buffer)?;
    buffer.truncate(frame_len);

    request.put_bytes(Nl80211Attribute::Frame.into(), &buffer)?;

    info!(
        "Sending {frame_len} byte action frame {source} -> {}",
        config.destination
    );
    match session.transact(request, registry)? {
        TransactionState::Success => {
            info!("Frame accepted by the kernel");
            Ok(())
        }
        state => {
            error!("Frame transmission failed: {state:?}");
            Err(SendFrameError::TransactionFailed(state.code()))
        }
    }
}

fn allocate_buffer(capacity: usize) -> Result<Vec<u8>, SendFrameError> {
    let mut buffer = Vec::new();
    if let Err(source) = buffer.try_reserve_exact(capacity) {
        error!("Cannot allocate {capacity} byte frame buffer: {source}");
        return Err(SendFrameError::BufferAllocation { capacity, source });
    }
    buffer.resize(capacity, 0);
    Ok(buffer)
}

///////////////////////////////////////////////////////////////////////////
// FrameTxObserver
///////////////////////////////////////////////////////////////////////////
/// Logs the cookie the kernel assigns to an accepted frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct FrameTxObserver;

impl MessageHandler for FrameTxObserver {
    fn on_message(&mut self, message: &NetlinkMessage<'_>) -> HandlerAction {
        let Ok((_, genl)) = GenlMessage::parse(message.payload) else {
            return HandlerAction::Continue;
        };

        match Nl80211Command::from(genl.command) {
            Nl80211Command::Frame => {
                let attributes = genl.attributes();
                match find_attribute(&attributes, Nl80211Attribute::Cookie.into())
                    .and_then(|e| e.as_u64())
                {
                    Some(cookie) => info!("Frame queued with cookie {cookie:#x}"),
                    None => debug!("Frame reply without cookie"),
                }
            }
            _ => debug!("Ignoring nl80211 command {}", genl.command),
        }
        HandlerAction::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = FrameSenderConfig::default();
        assert_eq!(config.interface, "wlan1");
        assert_eq!(config.destination, MacAddr::new(0x01, 0x00, 0x5e, 0x40, 0x01, 0x02));
        assert_eq!(config.frequency, Some(5220));
        assert_eq!(config.buffer_capacity, 2048);
    }

    #[test]
    fn test_exit_codes() {
        let codec = NetlinkCodecError::AttributeTooLarge {
            attr_type: 51,
            len: 70000,
        };
        let frame = FrameError::BufferTooSmall {
            required: 126,
            capacity: 50,
        };
        let mac = InterfaceError::InvalidName(String::new());

        assert_eq!(SendFrameError::InterfaceNotFound("wlan9".into()).exit_code(), 1);
        assert_eq!(SendFrameError::Socket(io::Error::other("x")).exit_code(), 1);
        assert_eq!(SendFrameError::TransactionFailed(-22).exit_code(), 1);
        assert_eq!(SendFrameError::from(TransactionError::SendFailed(-1)).exit_code(), 1);
        assert_eq!(
            SendFrameError::from(TransactionError::FamilyNotFound("nl80211".into())).exit_code(),
            1
        );
        assert_eq!(SendFrameError::from(codec.clone()).exit_code(), 4);
        assert_eq!(SendFrameError::from(TransactionError::from(codec)).exit_code(), 4);
        assert_eq!(SendFrameError::from(frame).exit_code(), 8);
        assert_eq!(SendFrameError::from(mac).exit_code(), 8);

        let overflow = allocate_buffer(usize::MAX).unwrap_err();
        assert_eq!(overflow.exit_code(), 2);
    }

    #[test]
    fn test_allocate_buffer() {
        assert_eq!(allocate_buffer(2048).unwrap(), vec![0u8; 2048]);
        assert!(allocate_buffer(0).unwrap().is_empty());
        assert!(matches!(
            allocate_buffer(usize::MAX),
            Err(SendFrameError::BufferAllocation {
                capacity: usize::MAX,
                ..
            })
        ));
    }
}
