//! Stack construction, bucket storage, and the transfer protocol.

/// Decklist-to-stack conversion.
pub mod builder;
/// Bucket store and its snapshot format.
pub mod store;
/// Move, merge, and split transitions over the bucket store.
pub mod transfer;
