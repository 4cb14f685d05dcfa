//! # appdatastore codec
//!
//! Turns application values into self-delimiting byte frames and back.
//!
//! Every backend stores frames, never raw values. A frame is a kind byte
//! followed by one CBOR item, optionally sealed with AES-256-GCM. A sealed
//! frame is bound to the item name it was written under. Frames survive
//! being zero-padded to a fixed capacity, which is how the shared-memory
//! backend stores them.
//!
//! ## Usage
//!
//! ```
//! use appds_codec::Codec;
//!
//! let codec = Codec::with_password(b"simple_password", None).unwrap();
//!
//! let mut frame = codec.encode("numbers", &vec![1, 2, 3], true).unwrap();
//! frame.resize(64, 0);
//!
//! let decoded: Vec<i32> = codec.decode("numbers", &frame).unwrap();
//! assert_eq!(decoded, vec![1, 2, 3]);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod crypto;
mod error;
mod frame;

pub use ciborium::Value;
pub use crypto::{SealKey, Sealer, DEFAULT_SALT, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::{CodecError, CodecResult};
pub use frame::{is_blank, is_sealed, Codec, FRAME_PLAIN, FRAME_SEALED};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn padded_frames_decode(
            text in ".{0,64}",
            numbers in prop::collection::vec(any::<i64>(), 0..16),
            padding in 0usize..64,
            encrypt in any::<bool>(),
        ) {
            let codec = Codec::with_key(&SealKey::from_slice(&[9u8; KEY_SIZE]).unwrap());
            let value = (text, numbers);

            let mut frame = codec.encode("pair", &value, encrypt).unwrap();
            prop_assert!(!is_blank(&frame));
            frame.extend(std::iter::repeat(0u8).take(padding));

            let decoded: (String, Vec<i64>) = codec.decode("pair", &frame).unwrap();
            prop_assert_eq!(decoded, value);
        }
    }
}
