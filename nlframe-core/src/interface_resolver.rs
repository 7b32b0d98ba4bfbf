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

// Standard library
use std::ffi::CString;
use std::io;
use std::os::fd::{AsRawFd, RawFd};

#[derive(Error, Debug)]
pub enum InterfaceError {
    #[error("invalid interface name {0:?}")]
    InvalidName(String),
    #[error("failed to open ioctl socket: {0}")]
    SocketOpenFailed(#[source] io::Error),
    #[error("SIOCGIFHWADDR failed for {name}: {source}")]
    IoctlFailed {
        name: String,
        #[source]
        source: io::Error,
    },
}

/// Name to index and name to hardware address lookups.
pub trait InterfaceResolver {
    /// Kernel index of `name`, 0 when there is no such interface.
    fn resolve_index(&self, name: &str) -> u32;
    fn resolve_mac(&self, name: &str) -> Result<MacAddr, InterfaceError>;
}

/// Resolver backed by the running kernel.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxInterfaceResolver;

impl InterfaceResolver for LinuxInterfaceResolver {
    fn resolve_index(&self, name: &str) -> u32 {
        resolve_index(name)
    }

    fn resolve_mac(&self, name: &str) -> Result<MacAddr, InterfaceError> {
        resolve_mac(name)
    }
}

pub fn resolve_index(name: &str) -> u32 {
    let Ok(name) = CString::new(name) else {
        return 0;
    };
    unsafe { libc::if_nametoindex(name.as_ptr()) }
}

/// **Reads the hardware address of `name` with `SIOCGIFHWADDR`**
pub fn resolve_mac(name: &str) -> Result<MacAddr, InterfaceError> {
    if name.is_empty() || name.len() >= libc::IFNAMSIZ || name.contains('\0') {
        return Err(InterfaceError::InvalidName(name.to_string()));
    }

    let socket = DatagramSocket::open().map_err(InterfaceError::SocketOpenFailed)?;

    let mut request: libc::ifreq = unsafe { std::mem::zeroed() };
    for (dst, src) in request.ifr_name.iter_mut().zip(name.bytes()) {
        *dst = src as libc::c_char;
    }

    let result = unsafe {
        libc::ioctl(
            socket.as_raw_fd(),
            libc::SIOCGIFHWADDR as _,
            std::ptr::from_mut(&mut request),
        )
    };
    if result == -1 {
        return Err(InterfaceError::IoctlFailed {
            name: name.to_string(),
            source: io::Error::last_os_error(),
        });
    }

    let sa_data = unsafe { request.ifr_ifru.ifru_hwaddr.sa_data };
    let [a, b, c, d, e, f] = [0, 1, 2, 3, 4, 5].map(|i| sa_data[i] as u8);
    let mac = MacAddr::new(a, b, c, d, e, f);

    tracing::debug!("interface {name} has address {mac}");
    Ok(mac)
}

///////////////////////////////////////////////////////////////////////////
// DatagramSocket
///////////////////////////////////////////////////////////////////////////
#[derive(Debug)]
#[repr(transparent)]
struct DatagramSocket(RawFd);

impl DatagramSocket {
    fn open() -> io::Result<Self> {
        let socket_type = libc::SOCK_DGRAM | libc::SOCK_CLOEXEC;

        match unsafe { libc::socket(libc::AF_INET, socket_type, 0) } {
            -1 => Err(io::Error::last_os_error()),
            socket => Ok(Self(socket)),
        }
    }
}

impl AsRawFd for DatagramSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.0
    }
}

impl Drop for DatagramSocket {
    fn drop(&mut self) {
        let _ = unsafe { libc::close(self.as_raw_fd()) };
    }
}
