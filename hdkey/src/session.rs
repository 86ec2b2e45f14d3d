//! Derivation session: the master node is built once, then every request
//! walks from it.

use std::collections::HashMap;
use std::fmt;

use secp256k1::{All, Secp256k1};
use tracing::{debug, trace};

use crate::derivation::{self, DerivationPath};
use crate::error::{HdError, Result};
use crate::extended_key::ExtendedPrivKey;
use crate::keypair::HdKeyPair;
use crate::seed::{BIP39_MNEMONIC_NO_PASSPHRASE, Seed, SeedSource};

/// Derives key pairs at arbitrary paths below one master key.
///
/// Immutable after construction, so a single instance can be shared across
/// threads (e.g. behind an `Arc`) and queried concurrently.
pub struct HdKeyPairDerivation {
    secp: Secp256k1<All>,
    master: ExtendedPrivKey,
    /// Compressed master public key, identifies the session to caches.
    master_public: [u8; 33],
}

impl HdKeyPairDerivation {
    pub fn from_master(master: ExtendedPrivKey) -> Self {
        debug!("created derivation session");
        let secp = Secp256k1::new();
        let master_public = master.public_key(&secp).serialize();
        HdKeyPairDerivation {
            secp,
            master,
            master_public,
        }
    }

    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        let seed = Seed::from_bytes(seed)?;
        Ok(Self::from_master(ExtendedPrivKey::new_master(seed.as_bytes())?))
    }

    pub fn from_seed_hex(seed_hex: &str) -> Result<Self> {
        Self::from_source(&SeedSource::Hex(seed_hex.to_owned()))
    }

    pub fn from_mnemonic_words<S: AsRef<str>>(words: &[S], passphrase: &str) -> Result<Self> {
        let seed = Seed::from_mnemonic_words(words, passphrase)?;
        Ok(Self::from_master(ExtendedPrivKey::new_master(seed.as_bytes())?))
    }

    pub fn from_mnemonic_words_no_passphrase<S: AsRef<str>>(words: &[S]) -> Result<Self> {
        Self::from_mnemonic_words(words, BIP39_MNEMONIC_NO_PASSPHRASE)
    }

    /// Whitespace-separated mnemonic plus passphrase.
    pub fn from_mnemonic(mnemonic: &str, passphrase: &str) -> Result<Self> {
        let seed = Seed::from_mnemonic(mnemonic, passphrase)?;
        Ok(Self::from_master(ExtendedPrivKey::new_master(seed.as_bytes())?))
    }

    pub fn mnemonic_no_passphrase(mnemonic: &str) -> Result<Self> {
        Self::from_mnemonic(mnemonic, BIP39_MNEMONIC_NO_PASSPHRASE)
    }

    pub fn from_source(source: &SeedSource) -> Result<Self> {
        let seed = source.to_seed()?;
        Ok(Self::from_master(ExtendedPrivKey::new_master(seed.as_bytes())?))
    }

    pub fn master(&self) -> &ExtendedPrivKey {
        &self.master
    }

    pub fn root_private_key_hex(&self) -> String {
        hex::encode(self.master.private_key_bytes())
    }

    /// Compressed (33-byte) master public key as hex.
    pub fn root_public_key_hex(&self) -> String {
        hex::encode(self.master_public)
    }

    /// Empty cache bound to this session, holding at most
    /// [`DEFAULT_CACHE_CAPACITY`] ancestors.
    pub fn new_cache(&self) -> DerivationCache {
        let mut cache = DerivationCache::new();
        cache.bind(self.master_public);
        cache
    }

    /// Walks `path` from the master and returns the leaf key pair.
    ///
    /// Nothing is cached; each call recomputes the full walk.
    pub fn derive_key_at_path(&self, path: &DerivationPath) -> Result<HdKeyPair> {
        let leaf = path.derive_private(&self.secp, &self.master)?;
        debug!(%path, "derived key pair");
        HdKeyPair::from_extended_key(&self.secp, &leaf, path.clone())
    }

    /// Parses `path` ("m/44'/0'/0'/0/0") then derives as `derive_key_at_path`.
    pub fn derive_key_at_path_str(&self, path: &str) -> Result<HdKeyPair> {
        self.derive_key_at_path(&path.parse()?)
    }

    /// Like `derive_key_at_path`, but starts from the deepest ancestor of
    /// `path` found in `cache` and records the ancestors derived on the way.
    /// The leaf itself is not cached. A cache last used by another session is
    /// emptied and rebound to this one before use.
    pub fn derive_key_at_path_cached(
        &self,
        path: &DerivationPath,
        cache: &mut DerivationCache,
    ) -> Result<HdKeyPair> {
        let parent_len = path.len().checked_sub(1).ok_or(HdError::EmptyPathError)?;
        let components = path.components();
        cache.bind(self.master_public);

        let (mut node, start) = match cache.deepest_ancestor(path, parent_len) {
            Some((len, node)) => (node.clone(), len),
            None => (self.master.clone(), 0),
        };
        trace!(%path, cached_depth = start, "resuming walk from cache");

        for depth in start..parent_len {
            node = derivation::walk(&self.secp, &node, &components[depth..=depth])?;
            cache.insert(path.prefix(depth + 1), node.clone());
        }
        let leaf = derivation::walk(&self.secp, &node, &components[parent_len..])?;
        HdKeyPair::from_extended_key(&self.secp, &leaf, path.clone())
    }
}

impl fmt::Debug for HdKeyPairDerivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HdKeyPairDerivation").finish_non_exhaustive()
    }
}

/// Ancestor count a cache holds unless built with another limit.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Ancestor nodes keyed by the path that reaches them from the master.
///
/// Owned by the caller and passed to
/// [`HdKeyPairDerivation::derive_key_at_path_cached`]. The cache remembers
/// which master filled it and never serves nodes to a different one. When
/// full, the deepest entry is evicted first.
#[derive(Debug)]
pub struct DerivationCache {
    nodes: HashMap<DerivationPath, ExtendedPrivKey>,
    /// Compressed public key of the master the nodes descend from.
    owner: Option<[u8; 33]>,
    capacity: usize,
}

impl Default for DerivationCache {
    fn default() -> Self {
        Self::with_capacity_limit(DEFAULT_CACHE_CAPACITY)
    }
}

impl DerivationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `capacity` ancestors; zero disables caching.
    pub fn with_capacity_limit(capacity: usize) -> Self {
        DerivationCache {
            nodes: HashMap::new(),
            owner: None,
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, path: &DerivationPath) -> Option<&ExtendedPrivKey> {
        self.nodes.get(path)
    }

    pub fn contains(&self, path: &DerivationPath) -> bool {
        self.nodes.contains_key(path)
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Ties the cache to `owner`, dropping nodes that belong to another master.
    fn bind(&mut self, owner: [u8; 33]) {
        if self.owner != Some(owner) {
            if !self.nodes.is_empty() {
                debug!(dropped = self.nodes.len(), "cache rebound to another master");
            }
            self.nodes.clear();
            self.owner = Some(owner);
        }
    }

    fn insert(&mut self, path: DerivationPath, node: ExtendedPrivKey) {
        if self.capacity == 0 {
            return;
        }
        if self.nodes.len() >= self.capacity && !self.nodes.contains_key(&path) {
            let deepest = self.nodes.keys().max_by_key(|p| p.len()).cloned();
            if let Some(deepest) = deepest {
                self.nodes.remove(&deepest);
            }
        }
        self.nodes.insert(path, node);
    }

    /// Longest cached prefix of `path` no longer than `max_len`.
    fn deepest_ancestor(
        &self,
        path: &DerivationPath,
        max_len: usize,
    ) -> Option<(usize, &ExtendedPrivKey)> {
        (1..=max_len)
            .rev()
            .find_map(|len| self.nodes.get(&path.prefix(len)).map(|node| (len, node)))
    }
}
