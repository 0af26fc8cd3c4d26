// ── Reactive cache store ──
//
// Keyed cache entries with push-based change notification.

mod cache_store;
mod entry;
mod optimistic;
mod subscription;

pub use cache_store::{CacheStore, Invalidation};
pub use entry::{CacheEntry, Payload, QueryStatus};
pub use optimistic::{OptimisticSnapshot, Restoration};
pub use subscription::{EntryStream, Subscription};
