//! Raw chain data: decoding, fetching, response caching.

mod cache;
pub mod decode;
pub(crate) mod fetch;

pub use cache::{Cache, CacheError, CachedResponse};
pub use decode::{
    decode_account, decode_validators, DecodeError, FrozenBalance, RawAccount, RawValidator,
    ValidationError,
};
pub use fetch::{FetchConfig, FetchError, Fetcher, DEFAULT_BAKERS_URL, DEFAULT_RPC_URL};
