//
// /usr/include/linux/genetlink.h
//

use neli::consts::genl::{Cmd, NlAttrType};
use neli::neli_enum;

/// size of struct genlmsghdr (cmd, version, reserved)
pub const GENL_HDRLEN: usize = 4;

/// generic netlink controller family id
pub const GENL_ID_CTRL: u16 = 0x10;

///
/// CTRL_CMD_* - generic netlink controller commands
///
#[neli_enum(serialized_type = "u8")]
#[non_exhaustive]
pub enum CtrlCommand {
    Unspecified = 0,
    NewFamily = 1,
    DelFamily = 2,
    GetFamily = 3,
}
impl Cmd for CtrlCommand {}

///
/// CTRL_ATTR_* - generic netlink controller attributes
///
#[neli_enum(serialized_type = "u16")]
#[non_exhaustive]
pub enum CtrlAttribute {
    Unspecified = 0,
    /// family id (u16)
    FamilyId = 1,
    /// family name (NUL terminated string)
    FamilyName = 2,
    Version = 3,
    HdrSize = 4,
    MaxAttr = 5,
    Ops = 6,
    McastGroups = 7,
}
impl NlAttrType for CtrlAttribute {}
