//! Body-section parser states.
//!
//! One state per framing strategy, mirroring how the header section declares
//! the body:
//!
//! - [`LengthBodyParser`]: counts down a declared `Content-Length`
//! - [`ChunkedBodyParser`]: walks chunked transfer coding, counting decoded
//!   payload
//! - [`UntilCloseBodyParser`]: counts until the connection closes
//!
//! None of them retain payload — the observer counts bytes, it does not
//! buffer them.

mod chunked_body;
mod length_body;
mod until_close;

pub use chunked_body::ChunkProgress;
pub use chunked_body::ChunkedBodyParser;
pub use length_body::LengthBodyParser;
pub use until_close::UntilCloseBodyParser;
