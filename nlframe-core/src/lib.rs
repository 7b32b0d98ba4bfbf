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

#![deny(warnings)]
// ───── Base modules ─────
pub mod callback_registry;
pub mod frame_codec;
pub mod frame_sender;
pub mod interface_resolver;
pub mod linux;
pub mod netlink_codec;
pub mod nl80211_socket;
pub mod transaction;

use std::sync::atomic::{AtomicU32, Ordering};
// ───── Reexports: commonly used components ─────
pub use callback_registry::{CallbackRegistry, HandlerAction, MessageHandler};
pub use frame_codec::{build_frame, ActionFrame, FrameError};
pub use frame_sender::{send_action_frame, FrameSenderConfig, FrameTxObserver, SendFrameError};
pub use interface_resolver::{InterfaceError, InterfaceResolver, LinuxInterfaceResolver};
pub use nl80211_socket::{Nl80211Connector, Nl80211Socket};
pub use transaction::{
    NetlinkTransport, Nl80211Session, TransactionError, TransactionState, TransportConnector,
};

pub fn next_task_id() -> u32 {
    static TASK_ID: AtomicU32 = AtomicU32::new(0);
    TASK_ID.fetch_add(1, Ordering::Relaxed)
}
