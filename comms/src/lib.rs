mod codec;
mod error;
mod link;

pub use codec::{ELEM_SIZE, GradientCodec};
pub use error::CommsErr;
pub use link::{RecvWindow, RetryPolicy, RingReceiver, RingSender, edge};
