pub mod genetlink;
pub mod netlink;
pub mod nl80211;
