use std::num::TryFromIntError;

use thiserror::*;

pub type Result<T> = std::result::Result<T, NetchanError>;

/// An error for the channel layer
#[derive(Error, Debug)]
pub enum NetchanError {
    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Message of {size} bytes exceeds the single datagram payload of {limit}")]
    MessageTooLarge { size: usize, limit: usize },

    #[error("Message of {size} bytes exceeds the maximum message length of {limit}")]
    OversizeMessage { size: usize, limit: usize },

    #[error("Reassembly of {length} + {incoming} bytes exceeds the fragment buffer capacity of {capacity}")]
    FragmentOverflow {
        length: usize,
        incoming: usize,
        capacity: usize,
    },

    #[error("Message payload failed to decompress")]
    DecompressionFailed,

    #[error("A fragmented message is still being sent")]
    FragmentsPending,

    #[error("Bad conversion: {0}")]
    IntConversion(#[from] TryFromIntError),
}

/// An error from the bounded message buffer
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Not enough data, {0} < {1}")]
    NotEnoughData(usize, usize),

    #[error("Write of {write} bytes overflows buffer, {len} of {maxsize} used")]
    Overflow {
        write: usize,
        len: usize,
        maxsize: usize,
    },
}
