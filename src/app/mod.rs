//! Dialplan applications executed on a channel.

pub mod dptools;
