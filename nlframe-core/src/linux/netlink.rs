//
// /usr/include/linux/netlink.h
//

use neli::consts::genl::NlAttrType;
use neli::neli_enum;

/// size of struct nlmsghdr
pub const NLMSG_HDRLEN: usize = 16;
/// size of struct nlattr
pub const NLA_HDRLEN: usize = 4;
/// both messages and attributes are padded to 4 bytes
pub const NLMSG_ALIGNTO: usize = 4;

pub const fn nlmsg_align(len: usize) -> usize {
    (len + NLMSG_ALIGNTO - 1) & !(NLMSG_ALIGNTO - 1)
}

// reserved control messages
pub const NLMSG_NOOP: u16 = 0x1;
pub const NLMSG_ERROR: u16 = 0x2;
pub const NLMSG_DONE: u16 = 0x3;
pub const NLMSG_OVERRUN: u16 = 0x4;

// flags values
pub const NLM_F_REQUEST: u16 = 0x01;
pub const NLM_F_MULTI: u16 = 0x02;
pub const NLM_F_ACK: u16 = 0x04;
// flags for ACK message
pub const NLM_F_CAPPED: u16 = 0x100;
pub const NLM_F_ACK_TLVS: u16 = 0x200;

// nla_type carries two flag bits on top of the attribute type
pub const NLA_F_NESTED: u16 = 1 << 15;
pub const NLA_F_NET_BYTEORDER: u16 = 1 << 14;
pub const NLA_TYPE_MASK: u16 = !(NLA_F_NESTED | NLA_F_NET_BYTEORDER);

/// socket option level and option for extended acks
pub const SOL_NETLINK: libc::c_int = 270;
pub const NETLINK_EXT_ACK: libc::c_int = 11;

///
/// enum nlmsgerr_attrs - nlmsgerr attributes
///
#[neli_enum(serialized_type = "u16")]
#[non_exhaustive]
pub enum NlmsgerrAttribute {
    /// unused
    Unused = 0,
    /// error message string (string)
    Msg = 1,
    /// offset of the invalid attribute in the original message, counting from
    /// the beginning of the header (u32)
    Offs = 2,
    /// arbitrary subsystem specific cookie to be used - in the success case -
    /// to identify a created object or operation or similar (binary)
    Cookie = 3,
    /// policy for a rejected attribute
    Policy = 4,
    /// type of a missing required attribute
    MissType = 5,
    /// offset of the nest where attribute was missing
    MissNest = 6,
}
impl NlAttrType for NlmsgerrAttribute {}
