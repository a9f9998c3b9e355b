//! The host interface.
//!
//! Everything that crosses the execution boundary goes through this
//! trait: storage slabs, UUID allocation, randomness, cryptography, and
//! the event sink. The bundled [`TestHost`] is a deterministic in-memory
//! implementation for tests and local runs.

use std::collections::BTreeMap;

use cadence_ir::PathDomain;

use crate::bridge::ExportedEvent;
use crate::value::Value;

/// Host-side signature algorithm selector, by enum raw value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum SignatureAlgorithm {
    EcdsaP256,
    EcdsaSecp256k1,
    BlsBls12381,
}

impl SignatureAlgorithm {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(SignatureAlgorithm::EcdsaP256),
            1 => Some(SignatureAlgorithm::EcdsaSecp256k1),
            2 => Some(SignatureAlgorithm::BlsBls12381),
            _ => None,
        }
    }
}

/// Host-side hash algorithm selector, by enum raw value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum HashAlgorithm {
    Sha2_256,
    Sha2_384,
    Sha3_256,
    Sha3_384,
    Kmac128Bls,
}

impl HashAlgorithm {
    pub fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(HashAlgorithm::Sha2_256),
            1 => Some(HashAlgorithm::Sha2_384),
            2 => Some(HashAlgorithm::Sha3_256),
            3 => Some(HashAlgorithm::Sha3_384),
            4 => Some(HashAlgorithm::Kmac128Bls),
            _ => None,
        }
    }
}

/// The services a host provides to one transaction.
///
/// Storage payloads are interpreter values here; the persistent slab
/// encoding behind them is the host's concern and opaque to the
/// evaluator.
pub trait Host {
    // Storage.
    fn storage_read(
        &self,
        address: [u8; 8],
        domain: PathDomain,
        identifier: &str,
    ) -> Option<Value>;
    fn storage_write(
        &mut self,
        address: [u8; 8],
        domain: PathDomain,
        identifier: &str,
        value: Option<Value>,
    );
    /// Identifiers present in a domain, in deterministic (sorted) order.
    fn storage_keys(&self, address: [u8; 8], domain: PathDomain) -> Vec<String>;

    // Identity and randomness.
    fn next_uuid(&mut self) -> u64;
    fn unsafe_random(&mut self) -> u64;

    // Crypto.
    fn hash(&self, algorithm: HashAlgorithm, tag: Option<&str>, data: &[u8]) -> Vec<u8>;
    #[allow(clippy::too_many_arguments)]
    fn verify_signature(
        &self,
        signature_algorithm: SignatureAlgorithm,
        hash_algorithm: HashAlgorithm,
        public_key: &[u8],
        signature: &[u8],
        signed_data: &[u8],
        domain_tag: &str,
    ) -> bool;
    fn bls_aggregate_signatures(&self, signatures: &[Vec<u8>]) -> Option<Vec<u8>>;
    fn bls_aggregate_public_keys(&self, public_keys: &[Vec<u8>]) -> Option<Vec<u8>>;

    // Events.
    fn emit_event(&mut self, event: ExportedEvent);
}

type StorageKey = ([u8; 8], u8, String);

/// Deterministic in-memory host for tests.
///
/// UUIDs are monotonic from 1; randomness is a fixed-seed xorshift;
/// hashing is a stable non-cryptographic digest; signature verification
/// answers a configurable constant.
pub struct TestHost {
    storage: BTreeMap<StorageKey, Value>,
    next_uuid: u64,
    random_state: u64,
    pub verify_result: bool,
    pub events: Vec<ExportedEvent>,
}

impl TestHost {
    pub fn new() -> Self {
        TestHost {
            storage: BTreeMap::new(),
            next_uuid: 0,
            random_state: 0x2545_F491_4F6C_DD1D,
            verify_result: true,
            events: Vec::new(),
        }
    }

    fn domain_tag(domain: PathDomain) -> u8 {
        match domain {
            PathDomain::Storage => 0,
            PathDomain::Private => 1,
            PathDomain::Public => 2,
        }
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for TestHost {
    fn storage_read(
        &self,
        address: [u8; 8],
        domain: PathDomain,
        identifier: &str,
    ) -> Option<Value> {
        self.storage
            .get(&(address, Self::domain_tag(domain), identifier.to_string()))
            .cloned()
    }

    fn storage_write(
        &mut self,
        address: [u8; 8],
        domain: PathDomain,
        identifier: &str,
        value: Option<Value>,
    ) {
        let key = (address, Self::domain_tag(domain), identifier.to_string());
        match value {
            Some(value) => {
                self.storage.insert(key, value);
            }
            None => {
                self.storage.remove(&key);
            }
        }
    }

    fn storage_keys(&self, address: [u8; 8], domain: PathDomain) -> Vec<String> {
        let tag = Self::domain_tag(domain);
        self.storage
            .keys()
            .filter(|(a, d, _)| *a == address && *d == tag)
            .map(|(_, _, identifier)| identifier.clone())
            .collect()
    }

    fn next_uuid(&mut self) -> u64 {
        self.next_uuid += 1;
        self.next_uuid
    }

    fn unsafe_random(&mut self) -> u64 {
        // xorshift64*, fixed seed for determinism.
        let mut x = self.random_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.random_state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    fn hash(&self, algorithm: HashAlgorithm, tag: Option<&str>, data: &[u8]) -> Vec<u8> {
        // FNV-1a over (algorithm, tag, data), widened to 32 bytes. Stable
        // and collision-poor enough for tests; not cryptographic.
        let mut state: u64 = 0xcbf2_9ce4_8422_2325;
        let mut feed = |byte: u8| {
            state ^= u64::from(byte);
            state = state.wrapping_mul(0x0000_0100_0000_01B3);
        };
        feed(algorithm as u8);
        if let Some(tag) = tag {
            for byte in tag.bytes() {
                feed(byte);
            }
        }
        for &byte in data {
            feed(byte);
        }
        let mut out = Vec::with_capacity(32);
        let mut x = state;
        for _ in 0..4 {
            out.extend_from_slice(&x.to_be_bytes());
            x = x.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(31);
        }
        out
    }

    fn verify_signature(
        &self,
        _signature_algorithm: SignatureAlgorithm,
        _hash_algorithm: HashAlgorithm,
        _public_key: &[u8],
        _signature: &[u8],
        _signed_data: &[u8],
        _domain_tag: &str,
    ) -> bool {
        self.verify_result
    }

    fn bls_aggregate_signatures(&self, signatures: &[Vec<u8>]) -> Option<Vec<u8>> {
        if signatures.is_empty() {
            return None;
        }
        // XOR-fold for determinism in tests.
        let len = signatures.iter().map(Vec::len).max()?;
        let mut out = vec![0u8; len];
        for signature in signatures {
            for (i, byte) in signature.iter().enumerate() {
                out[i] ^= byte;
            }
        }
        Some(out)
    }

    fn bls_aggregate_public_keys(&self, public_keys: &[Vec<u8>]) -> Option<Vec<u8>> {
        self.bls_aggregate_signatures(public_keys)
    }

    fn emit_event(&mut self, event: ExportedEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuids_are_monotonic() {
        let mut host = TestHost::new();
        assert_eq!(host.next_uuid(), 1);
        assert_eq!(host.next_uuid(), 2);
        assert_eq!(host.next_uuid(), 3);
    }

    #[test]
    fn test_storage_round_trip() {
        let mut host = TestHost::new();
        let address = [0, 0, 0, 0, 0, 0, 0, 1];
        host.storage_write(address, PathDomain::Storage, "vault", Some(Value::int(7)));
        let value = host.storage_read(address, PathDomain::Storage, "vault").unwrap();
        assert!(value.equals(&Value::int(7)));

        host.storage_write(address, PathDomain::Storage, "vault", None);
        assert!(host.storage_read(address, PathDomain::Storage, "vault").is_none());
    }

    #[test]
    fn test_storage_keys_sorted_and_scoped() {
        let mut host = TestHost::new();
        let address = [0; 8];
        host.storage_write(address, PathDomain::Storage, "b", Some(Value::int(1)));
        host.storage_write(address, PathDomain::Storage, "a", Some(Value::int(2)));
        host.storage_write(address, PathDomain::Public, "c", Some(Value::int(3)));
        assert_eq!(host.storage_keys(address, PathDomain::Storage), vec!["a", "b"]);
        assert_eq!(host.storage_keys(address, PathDomain::Public), vec!["c"]);
    }

    #[test]
    fn test_hash_is_deterministic() {
        let host = TestHost::new();
        let a = host.hash(HashAlgorithm::Sha3_256, None, b"data");
        let b = host.hash(HashAlgorithm::Sha3_256, None, b"data");
        let c = host.hash(HashAlgorithm::Sha2_256, None, b"data");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }
}
