use std::fmt;

/// A single key/value pair stored on a leaf page.
///
/// Duplicate keys are permitted — the tree is a multimap — so `KeyValue`
/// carries no identity beyond the pair itself; ordering among entries that
/// share a key is whatever insertion left them in (stable).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyValue<K, V> {
    pub key: K,
    pub value: V,
}

impl<K, V> KeyValue<K, V> {
    pub fn new(key: K, value: V) -> Self {
        Self { key, value }
    }
}

/// Bridges an arbitrary key type to the byte-oriented compression layer.
///
/// `to_bytes`/`from_bytes` must round-trip (`from_bytes(&to_bytes(x)) == x`)
/// — every strategy's reversibility guarantee depends on it. `as_i64` is an
/// optional hint: keys that represent themselves as a monotonic integer
/// domain (plain integers, not strings) should return `Some`, which makes
/// them eligible for the DELTA strategy; everything else returns `None`.
pub trait CompressibleKey: Ord + Clone + fmt::Debug {
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(bytes: &[u8]) -> Self;

    fn as_i64(&self) -> Option<i64> {
        None
    }

    /// Reconstructs a key from the numeric domain opted into by
    /// `as_i64`. Only ever called by the DELTA strategy, and only on a
    /// key type whose `as_i64` returned `Some` for every entry on the
    /// page being decoded.
    fn from_i64(v: i64) -> Self {
        let _ = v;
        unreachable!("from_i64 called on a key type that does not opt into numeric delta encoding")
    }

    /// Length of the shared leading byte run with `other`. Used by the
    /// PREFIX strategy's fingerprinting step; the default byte-wise
    /// comparison is correct for any type, but is only a useful signal
    /// for string-like keys.
    fn common_prefix_len(&self, other: &Self) -> usize {
        let a = self.to_bytes();
        let b = other.to_bytes();
        a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
    }
}

/// Bridges an arbitrary value type to the byte-oriented compression layer.
/// See [`CompressibleKey`] for the round-trip contract. `as_i64`/`from_i64`
/// mirror the key trait's numeric hint, letting the DELTA strategy
/// delta-encode values as well as keys when both are integers.
pub trait CompressibleValue: Clone + Eq + fmt::Debug {
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(bytes: &[u8]) -> Self;

    fn as_i64(&self) -> Option<i64> {
        None
    }

    fn from_i64(v: i64) -> Self {
        let _ = v;
        unreachable!("from_i64 called on a value type that does not opt into numeric delta encoding")
    }
}

macro_rules! impl_compressible_int_key {
    ($t:ty) => {
        impl CompressibleKey for $t {
            fn to_bytes(&self) -> Vec<u8> {
                self.to_be_bytes().to_vec()
            }

            fn from_bytes(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
                <$t>::from_be_bytes(buf)
            }

            fn as_i64(&self) -> Option<i64> {
                Some(*self as i64)
            }

            fn from_i64(v: i64) -> Self {
                v as $t
            }
        }
    };
}

impl_compressible_int_key!(i32);
impl_compressible_int_key!(i64);
impl_compressible_int_key!(u32);
impl_compressible_int_key!(u64);

impl CompressibleKey for String {
    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl CompressibleKey for Vec<u8> {
    fn to_bytes(&self) -> Vec<u8> {
        self.clone()
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        bytes.to_vec()
    }
}

macro_rules! impl_compressible_int_value {
    ($t:ty) => {
        impl CompressibleValue for $t {
            fn to_bytes(&self) -> Vec<u8> {
                self.to_be_bytes().to_vec()
            }

            fn from_bytes(bytes: &[u8]) -> Self {
                let mut buf = [0u8; std::mem::size_of::<$t>()];
                buf.copy_from_slice(&bytes[..std::mem::size_of::<$t>()]);
                <$t>::from_be_bytes(buf)
            }

            fn as_i64(&self) -> Option<i64> {
                Some(*self as i64)
            }

            fn from_i64(v: i64) -> Self {
                v as $t
            }
        }
    };
}

impl_compressible_int_value!(i32);
impl_compressible_int_value!(i64);
impl_compressible_int_value!(u32);
impl_compressible_int_value!(u64);

impl CompressibleValue for String {
    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        String::from_utf8_lossy(bytes).into_owned()
    }
}

impl CompressibleValue for Vec<u8> {
    fn to_bytes(&self) -> Vec<u8> {
        self.clone()
    }

    fn from_bytes(bytes: &[u8]) -> Self {
        bytes.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_key_round_trips() {
        let k: i64 = -4821;
        assert_eq!(i64::from_bytes(&k.to_bytes()), k);
    }

    #[test]
    fn string_key_round_trips() {
        let k = "user_001".to_string();
        assert_eq!(String::from_bytes(&k.to_bytes()), k);
    }

    #[test]
    fn common_prefix_len_counts_shared_bytes() {
        let a = "user_001".to_string();
        let b = "user_002".to_string();
        assert_eq!(a.common_prefix_len(&b), 7);
    }
}
