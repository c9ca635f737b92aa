//! Codec Module
//!
//! Maps application values onto the cache's flat storage model: a byte
//! payload plus a 32-bit flags word that carries the value's type tag.
//!
//! ## Tags
//! - 0: RAW      - bytes verbatim
//! - 1: NUMBER   - fixed-point decimal text
//! - 2: NIL      - "nil"
//! - 3: BOOLEAN  - "1" / "0"
//! - 4: GENERIC  - JSON text of a structured value
//!
//! Tags are shared by every client of a cache and are never renumbered.
//! Unknown tags decode as RAW so older clients degrade instead of failing.

mod tag;
mod value;
#[allow(clippy::module_inception)]
mod codec;

pub use tag::TypeTag;
pub use value::{Serializable, Value};
pub use codec::{
    decode, encode, CacheValue, FALSE_PAYLOAD, NIL_PAYLOAD, NUMBER_FRACTION_DIGITS, TRUE_PAYLOAD,
};
