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

use crate::linux::netlink::{NETLINK_EXT_ACK, SOL_NETLINK};
use crate::transaction::{NetlinkTransport, TransportConnector};
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use tracing::{debug, warn};

/// Default SO_SNDBUF / SO_RCVBUF of the netlink socket.
pub const DEFAULT_SOCKET_BUFFER_SIZE: usize = 8192;

///////////////////////////////////////////////////////////////////////////
// Nl80211Socket
///////////////////////////////////////////////////////////////////////////
/// Blocking `NETLINK_GENERIC` socket bound to a kernel assigned port.
#[derive(Debug)]
#[repr(transparent)]
pub struct Nl80211Socket(RawFd);

impl Nl80211Socket {
    pub fn open(send_buffer_size: usize, recv_buffer_size: usize) -> io::Result<Self> {
        let socket_type = libc::SOCK_RAW | libc::SOCK_CLOEXEC;

        let socket = unsafe { libc::socket(libc::AF_NETLINK, socket_type, libc::NETLINK_GENERIC) };
        let socket = match socket {
            -1 => return Err(io::Error::last_os_error()),
            _ => Self(socket),
        };

        // nl_pid 0 lets the kernel pick the port id
        let mut socket_addr: libc::sockaddr_nl = unsafe { std::mem::zeroed() };
        socket_addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;

        let bind_addr_len = size_of::<libc::sockaddr_nl>() as libc::socklen_t;
        let bind_addr = std::ptr::from_ref(&socket_addr).cast::<libc::sockaddr>();

        let result = unsafe { libc::bind(socket.0, bind_addr, bind_addr_len) };
        if result == -1 {
            return Err(io::Error::last_os_error());
        }

        socket.set_option(libc::SOL_SOCKET, libc::SO_SNDBUF, clamp(send_buffer_size))?;
        socket.set_option(libc::SOL_SOCKET, libc::SO_RCVBUF, clamp(recv_buffer_size))?;

        if let Err(e) = socket.set_option(SOL_NETLINK, NETLINK_EXT_ACK, 1) {
            warn!("Extended netlink acks unavailable: {e}");
        }

        debug!(
            "netlink socket {} open (sndbuf {send_buffer_size}, rcvbuf {recv_buffer_size})",
            socket.0
        );
        Ok(socket)
    }

    fn set_option(
        &self,
        level: libc::c_int,
        name: libc::c_int,
        value: libc::c_int,
    ) -> io::Result<()> {
        let value_len = size_of::<libc::c_int>() as libc::socklen_t;
        let value_ptr = std::ptr::from_ref(&value).cast();

        let result = unsafe { libc::setsockopt(self.0, level, name, value_ptr, value_len) };
        if result == -1 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

fn clamp(size: usize) -> libc::c_int {
    libc::c_int::try_from(size).unwrap_or(libc::c_int::MAX)
}

impl NetlinkTransport for Nl80211Socket {
    fn send(&mut self, message: &[u8]) -> io::Result<usize> {
        let mut kernel_addr: libc::sockaddr_nl = unsafe { std::mem::zeroed() };
        kernel_addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;

        let send_addr_len = size_of::<libc::sockaddr_nl>() as libc::socklen_t;
        let send_addr = std::ptr::from_ref(&kernel_addr).cast::<libc::sockaddr>();

        let result = unsafe {
            libc::sendto(
                self.0,
                message.as_ptr().cast(),
                message.len(),
                0,
                send_addr,
                send_addr_len,
            )
        };

        match result {
            -1 => Err(io::Error::last_os_error()),
            sent => Ok(sent as usize),
        }
    }

    fn recv(&mut self, buffer: &mut [u8]) -> io::Result<usize> {
        let result = unsafe { libc::recv(self.0, buffer.as_mut_ptr().cast(), buffer.len(), 0) };

        match result {
            -1 => Err(io::Error::last_os_error()),
            received => Ok(received as usize),
        }
    }
}

impl AsRawFd for Nl80211Socket {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl Drop for Nl80211Socket {
    fn drop(&mut self) {
        let _ = unsafe { libc::close(self.as_raw_fd()) };
    }
}

///////////////////////////////////////////////////////////////////////////
// Nl80211Connector
///////////////////////////////////////////////////////////////////////////
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Nl80211Connector {
    pub send_buffer_size: usize,
    pub recv_buffer_size: usize,
}

impl Nl80211Connector {
    pub fn new(socket_buffer_size: usize) -> Self {
        Self {
            send_buffer_size: socket_buffer_size,
            recv_buffer_size: socket_buffer_size,
        }
    }
}

impl Default for Nl80211Connector {
    fn default() -> Self {
        Self::new(DEFAULT_SOCKET_BUFFER_SIZE)
    }
}

impl TransportConnector for Nl80211Connector {
    type Transport = Nl80211Socket;

    fn connect(&self) -> io::Result<Nl80211Socket> {
        Nl80211Socket::open(self.send_buffer_size, self.recv_buffer_size)
    }
}
