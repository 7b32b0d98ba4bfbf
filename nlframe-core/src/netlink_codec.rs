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
use nom::Err as NomErr;
use nom::{
    bytes::complete::take,
    error::{Error as NomError, ErrorKind},
    number::complete as number,
    number::Endianness,
    IResult,
};
use thiserror::Error;

// Internal modules
use crate::linux::genetlink::GENL_HDRLEN;
use crate::linux::netlink::{
    nlmsg_align, NlmsgerrAttribute, NLA_HDRLEN, NLA_TYPE_MASK, NLMSG_HDRLEN, NLM_F_ACK,
    NLM_F_ACK_TLVS, NLM_F_CAPPED, NLM_F_REQUEST,
};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetlinkCodecError {
    #[error("attribute {attr_type} with {len} payload bytes does not fit a netlink attribute")]
    AttributeTooLarge { attr_type: u16, len: usize },
    #[error("netlink message of {0} bytes does not fit the length field")]
    MessageTooLarge(usize),
    #[error("malformed netlink data ({0} bytes left)")]
    Malformed(usize),
    #[error("truncated error reply ({0} payload bytes)")]
    TruncatedError(usize),
}

///////////////////////////////////////////////////////////////////////////
// NlMsgHeader
///////////////////////////////////////////////////////////////////////////
/// `struct nlmsghdr`, host byte order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NlMsgHeader {
    pub length: u32,
    pub message_type: u16,
    pub flags: u16,
    pub sequence: u32,
    pub port_id: u32,
}

impl NlMsgHeader {
    pub fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, length) = number::u32(Endianness::Native)(input)?;
        let (input, message_type) = number::u16(Endianness::Native)(input)?;
        let (input, flags) = number::u16(Endianness::Native)(input)?;
        let (input, sequence) = number::u32(Endianness::Native)(input)?;
        let (input, port_id) = number::u32(Endianness::Native)(input)?;

        Ok((
            input,
            NlMsgHeader {
                length,
                message_type,
                flags,
                sequence,
                port_id,
            },
        ))
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(NLMSG_HDRLEN);
        bytes.extend_from_slice(&self.length.to_ne_bytes());
        bytes.extend_from_slice(&self.message_type.to_ne_bytes());
        bytes.extend_from_slice(&self.flags.to_ne_bytes());
        bytes.extend_from_slice(&self.sequence.to_ne_bytes());
        bytes.extend_from_slice(&self.port_id.to_ne_bytes());
        bytes
    }
}

///////////////////////////////////////////////////////////////////////////
// GenlRequest
///////////////////////////////////////////////////////////////////////////
/// Append-only generic netlink request.
///
/// The netlink header is left blank until [`GenlRequest::finish`], which
/// consumes the request and hands out the immutable wire bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenlRequest {
    family: u16,
    buffer: Vec<u8>,
}

impl GenlRequest {
    pub fn new(family: u16, command: u8, version: u8) -> Self {
        let mut buffer = vec![0u8; NLMSG_HDRLEN];
        buffer.extend_from_slice(&[command, version, 0, 0]);
        Self { family, buffer }
    }

    /// Current encoded length, header included.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.len() <= NLMSG_HDRLEN + GENL_HDRLEN
    }

    pub fn put_bytes(&mut self, attr_type: u16, payload: &[u8]) -> Result<(), NetlinkCodecError> {
        let Ok(nla_len) = u16::try_from(NLA_HDRLEN + payload.len()) else {
            return Err(NetlinkCodecError::AttributeTooLarge {
                attr_type,
                len: payload.len(),
            });
        };

        self.buffer.extend_from_slice(&nla_len.to_ne_bytes());
        self.buffer.extend_from_slice(&attr_type.to_ne_bytes());
        self.buffer.extend_from_slice(payload);
        self.buffer.resize(nlmsg_align(self.buffer.len()), 0);
        Ok(())
    }

    pub fn put_u16(&mut self, attr_type: u16, value: u16) -> Result<(), NetlinkCodecError> {
        self.put_bytes(attr_type, &value.to_ne_bytes())
    }

    pub fn put_u32(&mut self, attr_type: u16, value: u32) -> Result<(), NetlinkCodecError> {
        self.put_bytes(attr_type, &value.to_ne_bytes())
    }

    pub fn put_u64(&mut self, attr_type: u16, value: u64) -> Result<(), NetlinkCodecError> {
        self.put_bytes(attr_type, &value.to_ne_bytes())
    }

    /// NUL terminated string attribute.
    pub fn put_string(&mut self, attr_type: u16, value: &str) -> Result<(), NetlinkCodecError> {
        let mut payload = Vec::with_capacity(value.len() + 1);
        payload.extend_from_slice(value.as_bytes());
        payload.push(0);
        self.put_bytes(attr_type, &payload)
    }

    /// Completes the envelope (length, `NLM_F_REQUEST | NLM_F_ACK`, sequence,
    /// port id) and returns the wire bytes.
    pub fn finish(mut self, sequence: u32, port_id: u32) -> Result<Vec<u8>, NetlinkCodecError> {
        let length = u32::try_from(self.buffer.len())
            .map_err(|_| NetlinkCodecError::MessageTooLarge(self.buffer.len()))?;

        let header = NlMsgHeader {
            length,
            message_type: self.family,
            flags: NLM_F_REQUEST | NLM_F_ACK,
            sequence,
            port_id,
        };
        self.buffer[..NLMSG_HDRLEN].copy_from_slice(&header.serialize());
        Ok(self.buffer)
    }
}

///////////////////////////////////////////////////////////////////////////
// NetlinkMessage
///////////////////////////////////////////////////////////////////////////
/// One netlink message borrowed from a received datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetlinkMessage<'a> {
    pub header: NlMsgHeader,
    pub payload: &'a [u8],
}

impl<'a> NetlinkMessage<'a> {
    pub fn parse(input: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (rest, header) = NlMsgHeader::parse(input)?;

        // The declared length covers the header and must fit the datagram.
        let length = header.length as usize;
        if length < NLMSG_HDRLEN || length > input.len() {
            return Err(NomErr::Failure(NomError::new(input, ErrorKind::LengthValue)));
        }

        let (_, payload) = take(length - NLMSG_HDRLEN)(rest)?;
        let next = input.get(nlmsg_align(length)..).unwrap_or_default();

        Ok((next, NetlinkMessage { header, payload }))
    }
}

/// Iterator over the netlink messages packed into one datagram.
///
/// Yields an error and stops at the first malformed message.
pub struct NetlinkMessages<'a> {
    remaining: &'a [u8],
}

impl<'a> Iterator for NetlinkMessages<'a> {
    type Item = Result<NetlinkMessage<'a>, NetlinkCodecError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        match NetlinkMessage::parse(self.remaining) {
            Ok((rest, message)) => {
                self.remaining = rest;
                Some(Ok(message))
            }
            Err(_) => {
                let left = self.remaining.len();
                self.remaining = &[];
                Some(Err(NetlinkCodecError::Malformed(left)))
            }
        }
    }
}

pub fn messages(datagram: &[u8]) -> NetlinkMessages<'_> {
    NetlinkMessages {
        remaining: datagram,
    }
}

///////////////////////////////////////////////////////////////////////////
// NlAttr
///////////////////////////////////////////////////////////////////////////
/// A netlink TLV attribute. `attr_type` has the nested/byte-order bits masked off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NlAttr<'a> {
    pub attr_type: u16,
    pub payload: &'a [u8],
}

impl<'a> NlAttr<'a> {
    pub fn parse(input: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (rest, nla_len) = number::u16(Endianness::Native)(input)?;
        let (rest, nla_type) = number::u16(Endianness::Native)(rest)?;

        let length = nla_len as usize;
        if length < NLA_HDRLEN {
            return Err(NomErr::Failure(NomError::new(input, ErrorKind::LengthValue)));
        }

        let (_, payload) = take(length - NLA_HDRLEN)(rest)?;
        let next = input.get(nlmsg_align(length)..).unwrap_or_default();

        Ok((
            next,
            NlAttr {
                attr_type: nla_type & NLA_TYPE_MASK,
                payload,
            },
        ))
    }

    pub fn as_u16(&self) -> Option<u16> {
        Some(u16::from_ne_bytes(self.payload.get(..2)?.try_into().ok()?))
    }

    pub fn as_u32(&self) -> Option<u32> {
        Some(u32::from_ne_bytes(self.payload.get(..4)?.try_into().ok()?))
    }

    pub fn as_u64(&self) -> Option<u64> {
        Some(u64::from_ne_bytes(self.payload.get(..8)?.try_into().ok()?))
    }

    /// Payload bounded by the attribute length and cut at the first NUL, if
    /// any. The bytes are returned as received; no encoding is assumed.
    pub fn as_bounded_bytes(&self) -> &'a [u8] {
        let end = self
            .payload
            .iter()
            .position(|b| *b == 0)
            .unwrap_or(self.payload.len());
        &self.payload[..end]
    }
}

/// Parses consecutive attributes, stopping at the first one that does not fit.
pub fn parse_attributes(mut input: &[u8]) -> Vec<NlAttr<'_>> {
    let mut attributes = Vec::new();
    while !input.is_empty() {
        match NlAttr::parse(input) {
            Ok((rest, attribute)) => {
                attributes.push(attribute);
                input = rest;
            }
            Err(_) => {
                tracing::debug!("ignoring {} trailing attribute bytes", input.len());
                break;
            }
        }
    }
    attributes
}

pub fn find_attribute<'a>(attributes: &[NlAttr<'a>], attr_type: u16) -> Option<NlAttr<'a>> {
    attributes.iter().find(|e| e.attr_type == attr_type).copied()
}

///////////////////////////////////////////////////////////////////////////
// GenlMessage
///////////////////////////////////////////////////////////////////////////
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenlMessage<'a> {
    pub command: u8,
    pub version: u8,
    pub attributes: &'a [u8],
}

impl<'a> GenlMessage<'a> {
    pub fn parse(input: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (attributes, header) = take(GENL_HDRLEN)(input)?;
        Ok((
            &attributes[attributes.len()..],
            GenlMessage {
                command: header[0],
                version: header[1],
                attributes,
            },
        ))
    }

    pub fn attributes(&self) -> Vec<NlAttr<'a>> {
        parse_attributes(self.attributes)
    }
}

///////////////////////////////////////////////////////////////////////////
// ErrorReply
///////////////////////////////////////////////////////////////////////////
/// Extended ack information attached by the kernel to an error reply.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtendedAck {
    /// message text exactly as sent by the kernel
    pub message: Option<Vec<u8>>,
    pub bad_attribute_offset: Option<u32>,
}

/// Payload of an `NLMSG_ERROR` message: `struct nlmsgerr` plus optional TLVs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReply {
    /// 0 for an ack, negative errno otherwise
    pub error: i32,
    /// header of the request this reply refers to, if echoed completely
    pub original: Option<NlMsgHeader>,
    pub ext_ack: ExtendedAck,
}

impl ErrorReply {
    pub fn parse(message: &NetlinkMessage<'_>) -> Result<Self, NetlinkCodecError> {
        let payload = message.payload;
        let parsed: IResult<&[u8], i32> = number::i32(Endianness::Native)(payload);
        let Ok((rest, error)) = parsed else {
            return Err(NetlinkCodecError::TruncatedError(payload.len()));
        };

        let original = NlMsgHeader::parse(rest).ok().map(|(_, header)| header);
        let ext_ack = parse_extended_ack(message.header.flags, payload, original);

        Ok(ErrorReply {
            error,
            original,
            ext_ack,
        })
    }

    pub fn is_ack(&self) -> bool {
        self.error == 0
    }
}

fn parse_extended_ack(flags: u16, payload: &[u8], original: Option<NlMsgHeader>) -> ExtendedAck {
    let mut ext_ack = ExtendedAck::default();
    if flags & NLM_F_ACK_TLVS == 0 {
        return ext_ack;
    }

    // error code + echoed request header, then the echoed request payload
    // unless the kernel capped it
    let mut ack_len = std::mem::size_of::<i32>() + NLMSG_HDRLEN;
    if flags & NLM_F_CAPPED == 0 {
        let Some(original) = original else {
            return ext_ack;
        };
        let Some(echoed) = (original.length as usize).checked_sub(NLMSG_HDRLEN) else {
            return ext_ack;
        };
        ack_len = nlmsg_align(ack_len.saturating_add(echoed));
    }

    let Some(region) = payload.get(ack_len..).filter(|e| !e.is_empty()) else {
        return ext_ack;
    };

    for attribute in parse_attributes(region) {
        match NlmsgerrAttribute::from(attribute.attr_type) {
            NlmsgerrAttribute::Msg => ext_ack.message = Some(attribute.as_bounded_bytes().to_vec()),
            NlmsgerrAttribute::Offs => ext_ack.bad_attribute_offset = attribute.as_u32(),
            _ => {}
        }
    }
    ext_ack
}
