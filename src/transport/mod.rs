// MIT License - Copyright (c) 2026 Peter Wright
// Socket and byte-stream handling

pub mod buffer;
pub mod link;
pub mod tcp;

pub use buffer::{PatternScan, ReceiveBuffer};
pub use link::PatternLink;
