pub mod channel;
pub mod compress;
pub mod consts;
pub mod error;
pub mod msg;
pub mod net;
pub mod oob;
pub mod protocol;
