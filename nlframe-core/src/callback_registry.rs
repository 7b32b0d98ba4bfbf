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

use crate::netlink_codec::NetlinkMessage;
use std::fmt;
use tracing::trace;

/// What the receive loop does after a handler has seen a message.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum HandlerAction {
    /// keep processing the current batch
    #[default]
    Continue,
    /// drop the rest of the batch
    Stop,
}

///////////////////////////////////////////////////////////////////////////
// MessageHandler
///////////////////////////////////////////////////////////////////////////
pub trait MessageHandler {
    fn on_message(&mut self, message: &NetlinkMessage<'_>) -> HandlerAction;
}

impl<F> MessageHandler for F
where
    F: FnMut(&NetlinkMessage<'_>) -> HandlerAction,
{
    fn on_message(&mut self, message: &NetlinkMessage<'_>) -> HandlerAction {
        self(message)
    }
}

///////////////////////////////////////////////////////////////////////////
// CallbackRegistry
///////////////////////////////////////////////////////////////////////////
/// Holds the handler for valid (non-control) replies of one transaction.
///
/// Only one handler is kept; registering again replaces it.
#[derive(Default)]
pub struct CallbackRegistry {
    handler: Option<Box<dyn MessageHandler>>,
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("registered", &self.is_registered())
            .finish()
    }
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, handler: impl MessageHandler + 'static) {
        if self.handler.replace(Box::new(handler)).is_some() {
            trace!("valid message handler replaced");
        }
    }

    pub fn is_registered(&self) -> bool {
        self.handler.is_some()
    }

    /// Runs the registered handler, or continues when there is none.
    pub fn dispatch(&mut self, message: &NetlinkMessage<'_>) -> HandlerAction {
        match self.handler.as_mut() {
            Some(handler) => handler.on_message(message),
            None => {
                trace!(
                    "no handler for message type {}",
                    message.header.message_type
                );
                HandlerAction::Continue
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink_codec::NlMsgHeader;
    use std::cell::Cell;
    use std::rc::Rc;

    fn message() -> NetlinkMessage<'static> {
        NetlinkMessage {
            header: NlMsgHeader {
                length: 20,
                message_type: 0x1c,
                ..Default::default()
            },
            payload: &[59, 0, 0, 0],
        }
    }

    #[test]
    fn test_dispatch_without_handler_continues() {
        let mut registry = CallbackRegistry::new();
        assert!(!registry.is_registered());
        assert_eq!(registry.dispatch(&message()), HandlerAction::Continue);
    }

    #[test]
    fn test_register_replaces_previous_handler() {
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));

        let mut registry = CallbackRegistry::new();
        let counter = Rc::clone(&first);
        registry.register(move |_: &NetlinkMessage<'_>| {
            counter.set(counter.get() + 1);
            HandlerAction::Continue
        });
        let counter = Rc::clone(&second);
        registry.register(move |_: &NetlinkMessage<'_>| {
            counter.set(counter.get() + 1);
            HandlerAction::Stop
        });

        assert!(registry.is_registered());
        assert_eq!(registry.dispatch(&message()), HandlerAction::Stop);
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }
}
