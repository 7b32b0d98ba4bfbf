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

///////////////////////////////////////////////////////////////////////////
//DEFINITION OF 802.11 MANAGEMENT FRAME CONSTANTS
///////////////////////////////////////////////////////////////////////////

/// Frame type field of the frame control word (bits 2-3).
pub const IEEE80211_FTYPE_MGMT: u16 = 0x0000;
/// Frame subtype field of the frame control word (bits 4-7).
pub const IEEE80211_STYPE_ACTION: u16 = 0x00D0;

/// Action category carried by the test frame.
pub const TEST_ACTION_CATEGORY: u8 = 40;
/// Action code carried by the test frame.
pub const TEST_ACTION_CODE: u8 = 0;
/// Length of the synthetic content following the action code.
pub const CONTENT_LEN: usize = 100;

/// Multicast destination used when none is configured.
pub const DEFAULT_DESTINATION: MacAddr = MacAddr(0x01, 0x00, 0x5e, 0x40, 0x01, 0x02);

// Field offsets of `struct ieee80211_mgmt` with an action body.
const FRAME_CONTROL_OFFSET: usize = 0;
const DURATION_OFFSET: usize = 2;
const DA_OFFSET: usize = 4;
const SA_OFFSET: usize = 10;
const BSSID_OFFSET: usize = 16;
const SEQUENCE_CONTROL_OFFSET: usize = 22;
const CATEGORY_OFFSET: usize = 24;
const ACTION_CODE_OFFSET: usize = 25;
const CONTENT_OFFSET: usize = 26;

/// Bytes from the start of the frame up to the content field.
pub const ACTION_HEADER_LEN: usize = CONTENT_OFFSET;
/// Exact length of an encoded test frame.
pub const ACTION_FRAME_LEN: usize = ACTION_HEADER_LEN + CONTENT_LEN;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("buffer is too small: {capacity} bytes, frame needs {required}")]
    BufferTooSmall { required: usize, capacity: usize },
}

/// Fails unless a buffer of `capacity` bytes can hold a whole test frame.
pub fn ensure_capacity(capacity: usize) -> Result<(), FrameError> {
    if capacity < ACTION_FRAME_LEN {
        return Err(FrameError::BufferTooSmall {
            required: ACTION_FRAME_LEN,
            capacity,
        });
    }
    Ok(())
}

///////////////////////////////////////////////////////////////////////////
/// An 802.11 management frame with a vendor-neutral action body.
///
/// Layout (no padding between fields):
/// - 0: frame control (2 bytes, little-endian)
/// - 2: duration (2 bytes)
/// - 4: destination address (6 bytes)
/// - 10: source address (6 bytes)
/// - 16: BSSID (6 bytes)
/// - 22: sequence control (2 bytes)
/// - 24: action category (1 byte)
/// - 25: action code (1 byte)
/// - 26: content (`CONTENT_LEN` bytes, `content[i] = i mod 256`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionFrame {
    pub frame_control: u16,
    pub duration: u16,
    pub destination: MacAddr,
    pub source: MacAddr,
    pub bssid: MacAddr,
    pub sequence_control: u16,
    pub category: u8,
    pub action_code: u8,
}

impl ActionFrame {
    /// The diagnostic frame: BSSID is the transmitter's own address.
    pub fn test_frame(destination: MacAddr, source: MacAddr) -> Self {
        Self {
            frame_control: IEEE80211_FTYPE_MGMT | IEEE80211_STYPE_ACTION,
            duration: 0,
            destination,
            source,
            bssid: source,
            sequence_control: 0,
            category: TEST_ACTION_CATEGORY,
            action_code: TEST_ACTION_CODE,
        }
    }

    /// Writes the frame into `buffer` and returns the number of bytes used.
    ///
    /// The whole buffer is zeroed first so nothing beyond the frame carries
    /// stale data. Nothing is written when the buffer is too small.
    pub fn serialize_into(&self, buffer: &mut [u8]) -> Result<usize, FrameError> {
        ensure_capacity(buffer.len())?;
        buffer.fill(0);

        put(buffer, FRAME_CONTROL_OFFSET, &self.frame_control.to_le_bytes());
        put(buffer, DURATION_OFFSET, &self.duration.to_le_bytes());
        put(buffer, DA_OFFSET, &self.destination.octets());
        put(buffer, SA_OFFSET, &self.source.octets());
        put(buffer, BSSID_OFFSET, &self.bssid.octets());
        put(buffer, SEQUENCE_CONTROL_OFFSET, &self.sequence_control.to_le_bytes());
        buffer[CATEGORY_OFFSET] = self.category;
        buffer[ACTION_CODE_OFFSET] = self.action_code;

        let content = &mut buffer[CONTENT_OFFSET..ACTION_FRAME_LEN];
        for (i, byte) in content.iter_mut().enumerate() {
            *byte = (i % 0x100) as u8;
        }

        tracing::trace!("action frame: {:02x?}", &buffer[..ACTION_FRAME_LEN]);
        Ok(ACTION_FRAME_LEN)
    }
}

fn put(buffer: &mut [u8], offset: usize, bytes: &[u8]) {
    buffer[offset..offset + bytes.len()].copy_from_slice(bytes);
}

/// Lays out the test action frame from `source` to `destination` into `buffer`.
pub fn build_frame(
    destination: MacAddr,
    source: MacAddr,
    buffer: &mut [u8],
) -> Result<usize, FrameError> {
    ActionFrame::test_frame(destination, source).serialize_into(buffer)
}
