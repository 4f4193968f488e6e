//! Resource identifier handling.
//!
//! - [`DenormalizerChain`] - ordered converters from raw strings to [`TypedValue`](crate::types::TypedValue)
//! - [`IdentifierCodec`] - decodes simple and composite path identifiers, and encodes them back

mod codec;
mod denormalizer;

pub use codec::{IdentifierCodec, KEY_VALUE_SEPARATOR, PAIR_SEPARATOR};
pub use denormalizer::{
    BooleanDenormalizer, DateDenormalizer, DateTimeDenormalizer, DecimalDenormalizer,
    Denormalizer, DenormalizerChain, IntegerDenormalizer, UlidDenormalizer, UuidDenormalizer,
};
