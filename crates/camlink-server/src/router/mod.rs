//! Dispatch of inbound bus traffic.

mod inbound;
mod lanes;

pub use inbound::TopicRouter;
pub use lanes::{DeviceLanes, Persisted};
