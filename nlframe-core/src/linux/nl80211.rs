//
// /usr/include/linux/nl80211.h
//

use neli::consts::genl::{Cmd, NlAttrType};
use neli::neli_enum;

pub const NL80211_GENL_NAME: &str = "nl80211";

///
/// enum nl80211_commands - supported nl80211 commands
///
#[neli_enum(serialized_type = "u8")]
#[non_exhaustive]
pub enum Nl80211Command {
    /// Management frame TX request and RX notification.
    /// %NL80211_ATTR_FRAME carries the frame contents (including header) and
    /// %NL80211_ATTR_WIPHY_FREQ the channel it is to be transmitted on.
    /// The kernel answers with %NL80211_ATTR_COOKIE identifying the TX request.
    Frame = 59,
    /// Report TX status of a management frame transmitted with %NL80211_CMD_FRAME.
    FrameTxStatus = 60,
}
impl Cmd for Nl80211Command {}

///
/// enum nl80211_attrs - nl80211 netlink attributes
///
#[neli_enum(serialized_type = "u16")]
#[non_exhaustive]
pub enum Nl80211Attribute {
    /// attribute number 0 is reserved
    Unspecified = 0,
    /// index of wiphy to operate on, cf. /sys/class/ieee80211/<phyname>/index
    Wiphy = 1,
    /// network interface index of the device to operate on
    IfIndex = 3,
    /// frequency of the selected channel in MHz
    WiphyFreq = 38,
    /// frame data (binary attribute), including frame header and body
    Frame = 51,
    /// duration of an operation in milliseconds (u32)
    Duration = 87,
    /// generic 64-bit cookie to identify objects
    Cookie = 88,
    /// flag attribute, frame was acknowledged by the recipient
    Ack = 92,
}
impl NlAttrType for Nl80211Attribute {}
