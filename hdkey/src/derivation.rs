use crate::{HdError, Result, extended_key::ExtendedPrivKey};
use secp256k1::{All, Secp256k1};
use std::fmt;
use std::str::FromStr;
use tracing::{trace, warn};

/// Index offset for hardened children, 0x80000000 = 2³¹
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// One step of a derivation path: a 31-bit index plus the hardened flag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChildIndex {
    index: u32,
    hardened: bool,
}

impl ChildIndex {
    /// Normal (non-hardened) child, `index` must be below 2³¹.
    pub fn normal(index: u32) -> Result<Self> {
        Self::new(index, false)
    }

    /// Hardened child, `index` must be below 2³¹.
    pub fn hardened(index: u32) -> Result<Self> {
        Self::new(index, true)
    }

    pub fn new(index: u32, hardened: bool) -> Result<Self> {
        if index >= HARDENED_OFFSET {
            return Err(HdError::InvalidPathSyntax(format!(
                "child index {index} is not below 2^31"
            )));
        }
        Ok(ChildIndex { index, hardened })
    }

    /// Decode a serialized 32-bit index; the top bit selects hardened.
    pub fn from_serialized(value: u32) -> Self {
        ChildIndex {
            index: value & !HARDENED_OFFSET,
            hardened: value & HARDENED_OFFSET != 0,
        }
    }

    /// Value fed into CKD: `index + 2³¹` when hardened, `index` otherwise.
    pub fn to_serialized(self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    pub fn is_hardened(self) -> bool {
        self.hardened
    }
}

impl fmt::Display for ChildIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

impl FromStr for ChildIndex {
    type Err = HdError;

    /// Parses one path segment: `digits`, `digits'` or `digitsH`.
    fn from_str(segment: &str) -> Result<Self> {
        let (digits, hardened) = match segment.strip_suffix(['\'', 'H']) {
            Some(stripped) => (stripped, true),
            None => (segment, false),
        };
        // u32::from_str alone would also accept a leading '+'
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HdError::InvalidPathSyntax(format!(
                "malformed segment {segment:?}"
            )));
        }
        let index: u32 = digits
            .parse()
            .map_err(|_| HdError::InvalidPathSyntax(format!("index {digits} is out of range")))?;
        ChildIndex::new(index, hardened)
    }
}

/// A BIP-32 derivation path (e.g., "m/44'/0'/0'/0/1"), in walk order from the master.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath(Vec<ChildIndex>);

impl DerivationPath {
    /// The path that denotes the master node itself ("m").
    pub fn master() -> Self {
        DerivationPath(Vec::new())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChildIndex> {
        self.0.iter()
    }

    pub fn components(&self) -> &[ChildIndex] {
        &self.0
    }

    /// Last component, the index of the leaf this path names.
    pub fn last(&self) -> Option<ChildIndex> {
        self.0.last().copied()
    }

    /// New path with `index` appended.
    pub fn child(&self, index: ChildIndex) -> Self {
        let mut components = self.0.clone();
        components.push(index);
        DerivationPath(components)
    }

    /// Path with the last component removed; `None` for the master path.
    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.0.split_last()?;
        Some(DerivationPath(head.to_vec()))
    }

    /// New path with every component of `suffix` appended.
    pub fn extend(&self, suffix: &DerivationPath) -> Self {
        let mut components = self.0.clone();
        components.extend_from_slice(&suffix.0);
        DerivationPath(components)
    }

    /// Prefix made of the first `len` components.
    pub fn prefix(&self, len: usize) -> Self {
        DerivationPath(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Walk from `from` applying CKDpriv once per component, in order.
    ///
    /// `from` may be the master or any ancestor; the result sits
    /// `self.len()` levels below it. An empty path is rejected.
    pub fn derive_private(
        &self,
        secp: &Secp256k1<All>,
        from: &ExtendedPrivKey,
    ) -> Result<ExtendedPrivKey> {
        if self.is_empty() {
            return Err(HdError::EmptyPathError);
        }
        walk(secp, from, &self.0)
    }
}

/// Applies CKDpriv for each index in `steps`. An empty slice returns `from` unchanged.
pub(crate) fn walk(
    secp: &Secp256k1<All>,
    from: &ExtendedPrivKey,
    steps: &[ChildIndex],
) -> Result<ExtendedPrivKey> {
    let mut key = from.clone();
    for &index in steps {
        trace!(depth = key.depth(), %index, "deriving child");
        key = key.derive_private_child(secp, index).inspect_err(|err| {
            warn!(%err, "child derivation failed");
        })?;
    }
    Ok(key)
}

impl From<Vec<ChildIndex>> for DerivationPath {
    fn from(components: Vec<ChildIndex>) -> Self {
        DerivationPath(components)
    }
}

impl<'a> IntoIterator for &'a DerivationPath {
    type Item = &'a ChildIndex;
    type IntoIter = std::slice::Iter<'a, ChildIndex>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromStr for DerivationPath {
    type Err = HdError;

    /// Parses "m", "m/44'/0'/0'" or "m/0H/1". The leading "m" is required.
    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split('/');
        if parts.next() != Some("m") {
            return Err(HdError::InvalidPathSyntax(format!(
                "path {s:?} must start with \"m\""
            )));
        }
        let components = parts
            .map(ChildIndex::from_str)
            .collect::<Result<Vec<_>>>()?;
        Ok(DerivationPath(components))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}
