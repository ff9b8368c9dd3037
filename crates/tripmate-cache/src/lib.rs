//! Read-through response cache for TripMate upstream services.
//!
//! Services that front rate-limited or slow third-party providers (weather,
//! places, currency) share this crate. A [`CacheLayer`] wraps any
//! [`CacheStore`] backend and never lets a backend fault fail a request:
//! read errors count as misses and writes are detached from the response.
//!
//! ```text
//! request ──► read_through ──► hit?  ──yes──► {"success":true,"data":…,"cached":true}
//!                 │                                  
//!                 └──no──► handler ──► 2xx + success ──► detached SET key ttl
//!                                            └────────► response + "cached": false
//! ```
//!
//! The backend is chosen at startup by [`CacheSettings::connect`]: Redis when
//! `REDIS_URL` is set, an in-process map otherwise.

pub mod error;
pub mod key;
pub mod layer;
pub mod read_through;
pub mod settings;
pub mod store;

pub use error::{CacheError, CacheResult};
pub use key::{KeySpec, cache_key, normalize_part};
pub use layer::{CacheLayer, Lookup};
pub use read_through::{
    CachePolicy, CacheWrite, CheckOutcome, ReadThrough, cache_check, cache_populate, read_through,
};
pub use settings::CacheSettings;
pub use store::{CacheStore, MemoryCacheStore, RedisCacheStore};
