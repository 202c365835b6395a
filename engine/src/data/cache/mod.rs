//! Cache key layout for filtered query results

mod key;

pub use key::CacheKey;
