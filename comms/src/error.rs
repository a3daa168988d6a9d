use std::{error::Error, fmt, io};

use crate::codec::ELEM_SIZE;

/// Failures of the wire codec and the ring link.
///
/// Everything here is a degraded-round outcome for the caller; none of these
/// variants carries protocol state across rounds.
#[derive(Debug)]
pub enum CommsErr {
    /// Every connect attempt toward the successor failed.
    Exhausted { attempts: usize },
    /// Inbound payload length is zero or not a multiple of the element width.
    MalformedPayload { len: usize },
    /// A decoded element was NaN/Inf under a strict codec.
    NonFinite { index: usize },
    /// A peer connected but did not close within the read deadline.
    Stalled { buffered: usize },
    Io(io::Error),
}

impl fmt::Display for CommsErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommsErr::Exhausted { attempts } => {
                write!(f, "gradient delivery abandoned after {attempts} connect attempts")
            }
            CommsErr::MalformedPayload { len } => write!(
                f,
                "payload length {len} is not a positive multiple of {ELEM_SIZE} bytes"
            ),
            CommsErr::NonFinite { index } => {
                write!(f, "non-finite element at index {index}")
            }
            CommsErr::Stalled { buffered } => write!(
                f,
                "peer connected but did not close within the read deadline ({buffered} bytes buffered)"
            ),
            CommsErr::Io(e) => write!(f, "io error: {e}"),
        }
    }
}

impl Error for CommsErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CommsErr::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CommsErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}
