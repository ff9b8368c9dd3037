//! Upstream forwarding.

mod proxy;

pub use proxy::{HOP_BY_HOP_HEADERS, UpstreamProxy};
