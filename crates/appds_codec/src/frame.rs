//! Value frames.
//!
//! A frame is one kind byte followed by exactly one CBOR item:
//!
//! ```text
//! 0x01 | cbor(value)                                  plain
//! 0x02 | cbor(bytes(nonce || seal(cbor(value)) || tag)) sealed
//! ```
//!
//! CBOR items carry their own length, so a frame can be recovered from a
//! buffer that is zero-padded to any capacity. Because the kind byte is
//! never zero, a buffer of nothing but zeros is always "no frame".

use crate::crypto::{binding, SealKey, Sealer, DEFAULT_SALT};
use crate::error::{CodecError, CodecResult};
use ciborium::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Kind byte of a plain frame.
pub const FRAME_PLAIN: u8 = 0x01;
/// Kind byte of a sealed (encrypted) frame.
pub const FRAME_SEALED: u8 = 0x02;

/// Returns `true` if the payload holds no frame at all.
#[must_use]
pub fn is_blank(payload: &[u8]) -> bool {
    payload.iter().all(|b| *b == 0)
}

/// Returns `true` if the payload starts with a sealed frame.
#[must_use]
pub fn is_sealed(payload: &[u8]) -> bool {
    payload.first() == Some(&FRAME_SEALED)
}

/// Encodes values into frames and back.
///
/// Every call names the item the frame belongs to. Plain frames ignore it;
/// sealed frames authenticate it, so a sealed frame only decodes under the
/// item name it was encoded for.
///
/// A codec without a key can still read and write plain frames; sealing or
/// opening a frame then fails with [`CodecError::EncryptionNotConfigured`].
#[derive(Debug, Default)]
pub struct Codec {
    sealer: Option<Sealer>,
}

impl Codec {
    /// Creates a codec that only handles plain frames.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a codec sealing with the given key.
    #[must_use]
    pub fn with_key(key: &SealKey) -> Self {
        Self {
            sealer: Some(Sealer::new(key)),
        }
    }

    /// Creates a codec whose key is derived from `password`.
    ///
    /// When `salt` is `None` the built-in [`DEFAULT_SALT`] is used.
    pub fn with_password(password: &[u8], salt: Option<&[u8]>) -> CodecResult<Self> {
        let key = SealKey::from_password(password, salt.unwrap_or(DEFAULT_SALT))?;
        Ok(Self::with_key(&key))
    }

    /// Returns `true` if this codec can seal and open frames.
    #[must_use]
    pub fn can_encrypt(&self) -> bool {
        self.sealer.is_some()
    }

    /// Encodes `value` as the frame of `item`, sealing it when `encrypt`
    /// is set.
    pub fn encode<T>(&self, item: &str, value: &T, encrypt: bool) -> CodecResult<Vec<u8>>
    where
        T: Serialize + ?Sized,
    {
        if !encrypt {
            let mut frame = vec![FRAME_PLAIN];
            write_cbor(value, &mut frame)?;
            return Ok(frame);
        }

        let sealer = self.sealer()?;
        let mut body = Vec::new();
        write_cbor(value, &mut body)?;
        let sealed = sealer.seal(&binding(FRAME_SEALED, item), &body)?;

        let mut frame = vec![FRAME_SEALED];
        write_cbor(&Value::Bytes(sealed), &mut frame)?;
        Ok(frame)
    }

    /// Decodes the frame of `item`, opening it first if it is sealed.
    ///
    /// Anything after the first CBOR item (normally zero padding) is ignored.
    pub fn decode<T>(&self, item: &str, payload: &[u8]) -> CodecResult<T>
    where
        T: DeserializeOwned,
    {
        match self.body(item, payload)? {
            Body::Plain(cbor) => read_cbor(cbor),
            Body::Sealed(plain) => read_cbor(&plain),
        }
    }

    /// Decodes the frame of `item` into a dynamic CBOR value.
    pub fn decode_value(&self, item: &str, payload: &[u8]) -> CodecResult<Value> {
        self.decode(item, payload)
    }

    fn sealer(&self) -> CodecResult<&Sealer> {
        self.sealer
            .as_ref()
            .ok_or(CodecError::EncryptionNotConfigured)
    }

    fn body<'a>(&self, item: &str, payload: &'a [u8]) -> CodecResult<Body<'a>> {
        let (&kind, rest) = payload.split_first().ok_or(CodecError::EmptyFrame)?;
        match kind {
            0 => Err(CodecError::EmptyFrame),
            FRAME_PLAIN => Ok(Body::Plain(rest)),
            FRAME_SEALED => {
                let sealer = self.sealer()?;
                match read_cbor::<Value>(rest)? {
                    Value::Bytes(sealed) => Ok(Body::Sealed(
                        sealer.open(&binding(kind, item), &sealed)?,
                    )),
                    _ => Err(CodecError::decoding_failed(
                        "sealed frame does not hold a byte string",
                    )),
                }
            }
            kind => Err(CodecError::UnknownFrame { kind }),
        }
    }
}

enum Body<'a> {
    Plain(&'a [u8]),
    Sealed(Vec<u8>),
}

fn write_cbor<T: Serialize + ?Sized>(value: &T, out: &mut Vec<u8>) -> CodecResult<()> {
    ciborium::into_writer(value, out).map_err(|e| CodecError::encoding_failed(e.to_string()))
}

fn read_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    ciborium::from_reader(bytes).map_err(|e| CodecError::decoding_failed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Reading {
        sensor: String,
        values: Vec<i64>,
    }

    fn padded(mut frame: Vec<u8>, capacity: usize) -> Vec<u8> {
        frame.resize(capacity, 0);
        frame
    }

    #[test]
    fn plain_frame_ignores_padding() {
        let codec = Codec::new();
        let value = Reading {
            sensor: "t1".into(),
            values: vec![1, -2, 3],
        };
        let frame = codec.encode("reading", &value, false).unwrap();
        assert_eq!(frame[0], FRAME_PLAIN);

        let decoded: Reading = codec.decode("reading", &padded(frame, 256)).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn zero_value_is_not_blank() {
        let codec = Codec::new();
        let frame = padded(codec.encode("zero", &0u8, false).unwrap(), 32);
        assert!(!is_blank(&frame));
        assert_eq!(codec.decode::<u8>("zero", &frame).unwrap(), 0);
    }

    #[test]
    fn blank_payload_is_empty_frame() {
        let codec = Codec::new();
        assert!(is_blank(&[0u8; 16]));
        assert_eq!(
            codec.decode::<String>("k", &[0u8; 16]).unwrap_err(),
            CodecError::EmptyFrame
        );
        assert_eq!(codec.decode::<String>("k", &[]).unwrap_err(), CodecError::EmptyFrame);
    }

    #[test]
    fn unknown_kind_rejected() {
        let codec = Codec::new();
        assert_eq!(
            codec.decode::<String>("k", &[0x7f, 0x00]).unwrap_err(),
            CodecError::UnknownFrame { kind: 0x7f }
        );
    }

    #[test]
    fn sealed_frame_roundtrip() {
        let codec = Codec::with_password(b"simple_password", None).unwrap();
        let mut map = BTreeMap::new();
        map.insert("value_string".to_string(), "a string stored in the dict".to_string());

        let frame = codec.encode("dict", &map, true).unwrap();
        assert!(is_sealed(&frame));

        let decoded: BTreeMap<String, String> = codec.decode("dict", &padded(frame, 512)).unwrap();
        assert_eq!(decoded, map);
    }

    #[test]
    fn sealing_without_key_fails() {
        let codec = Codec::new();
        assert!(!codec.can_encrypt());
        assert_eq!(
            codec.encode("token", "secret", true).unwrap_err(),
            CodecError::EncryptionNotConfigured
        );
    }

    #[test]
    fn sealed_frame_needs_matching_password() {
        let writer = Codec::with_password(b"right", None).unwrap();
        let reader = Codec::with_password(b"wrong", None).unwrap();
        let frame = writer.encode("token", "secret", true).unwrap();

        assert!(matches!(
            reader.decode::<String>("token", &frame),
            Err(CodecError::DecryptionFailed { .. })
        ));
        assert_eq!(
            Codec::new().decode::<String>("token", &frame).unwrap_err(),
            CodecError::EncryptionNotConfigured
        );
    }

    #[test]
    fn decode_value_exposes_structure() {
        let codec = Codec::new();
        let frame = codec.encode("pair", &vec!["a", "b"], false).unwrap();
        let value = codec.decode_value("pair", &frame).unwrap();
        assert!(matches!(value, Value::Array(ref items) if items.len() == 2));
    }

    #[test]
    fn wrong_shape_is_decoding_error() {
        let codec = Codec::new();
        let frame = codec.encode("k", "not a list", false).unwrap();
        assert!(matches!(
            codec.decode::<Vec<String>>("k", &frame),
            Err(CodecError::DecodingFailed { .. })
        ));
    }

    #[test]
    fn sealed_frame_is_bound_to_its_item() {
        let codec = Codec::with_password(b"pw", None).unwrap();
        let frame = codec.encode("alice.token", "secret", true).unwrap();
        assert_eq!(codec.decode::<String>("alice.token", &frame).unwrap(), "secret");
        assert!(matches!(
            codec.decode::<String>("mallory.token", &frame),
            Err(CodecError::DecryptionFailed { .. })
        ));
    }

    #[test]
    fn plain_frames_ignore_the_item() {
        let codec = Codec::new();
        let frame = codec.encode("a", &7u32, false).unwrap();
        assert_eq!(codec.decode::<u32>("b", &frame).unwrap(), 7);
    }
}
