//! hashpool: a bounded pool of checksum workers for large byte sources.
//!
//! A [`pool::ChecksumPool`] owns up to `max_workers` isolated workers, a FIFO
//! task queue, and all lifecycle policy: creation on demand, task-count
//! recycling, idle-timeout eviction, task timeouts, and replace-on-fault.
//! Workers compute streaming MD5 digests, switching to the S3-style
//! multipart composition (`"<hex>-<parts>"`) when a source exceeds the
//! caller-supplied threshold.

pub mod config;
pub mod logging;

pub mod error;
pub mod hasher;
pub mod pool;
pub mod source;

pub use config::{MultipartPolicy, PoolConfig};
pub use error::ChecksumError;
pub use pool::{Checksum, ChecksumPool};
