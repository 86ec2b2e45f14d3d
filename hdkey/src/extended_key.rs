use crate::derivation::{ChildIndex, DerivationPath};
use crate::error::{HdError, Result};
use crypto_utils::hmac::{hmac_sha512, hmac_sha512_chunks, split_halves};
use secp256k1::{All, PublicKey, Scalar, Secp256k1, SecretKey};
use tracing::debug;

/// HMAC key used to turn a seed into the master node.
pub const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// `IL` as the master scalar; `None` if it is zero or not below n.
fn master_scalar(il: &[u8; 32]) -> Option<SecretKey> {
    SecretKey::from_slice(il).ok()
}

/// `(IL + k_par) mod n`; `None` if `IL >= n` or the sum is zero.
fn child_scalar(parent: &SecretKey, il: [u8; 32]) -> Option<SecretKey> {
    let tweak = Scalar::from_be_bytes(il).ok()?;
    parent.add_tweak(&tweak).ok()
}

/// Extended private key: a private scalar together with its chain code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedPrivKey {
    depth: u8,
    /// Index this node was derived with; `None` for the master.
    child_index: Option<ChildIndex>,
    chain_code: [u8; 32],
    private_key: SecretKey,
}

impl ExtendedPrivKey {
    /// Master extended private key from a seed.
    ///
    /// `IL` of HMAC-SHA512("Bitcoin seed", seed) becomes the scalar, `IR` the
    /// chain code. Any seed length is accepted.
    pub fn new_master(seed: &[u8]) -> Result<Self> {
        let i = hmac_sha512(MASTER_HMAC_KEY, seed);
        let (il, ir) = split_halves(&i);
        let private_key = master_scalar(&il).ok_or(HdError::InvalidMasterKey)?;
        debug!(seed_len = seed.len(), "constructed master extended key");
        Ok(ExtendedPrivKey {
            depth: 0,
            child_index: None,
            chain_code: ir,
            private_key,
        })
    }

    /// Child key derivation for private keys (CKDpriv)
    pub fn derive_private_child(&self, secp: &Secp256k1<All>, index: ChildIndex) -> Result<Self> {
        let invalid = || HdError::InvalidChildKey {
            depth: self.depth.saturating_add(1),
            index,
        };
        let child_depth = self.depth.checked_add(1).ok_or_else(invalid)?;

        // Hardened: 0x00 || ser256(k_par) || ser32(i)
        // Normal:   serP(K_par) || ser32(i)
        let serialized_index = index.to_serialized().to_be_bytes();
        let i = if index.is_hardened() {
            let secret = self.private_key.secret_bytes();
            hmac_sha512_chunks(&self.chain_code, &[&[0u8], &secret, &serialized_index])
        } else {
            let parent_pub = self.public_key(secp).serialize();
            hmac_sha512_chunks(&self.chain_code, &[&parent_pub, &serialized_index])
        };
        let (il, ir) = split_halves(&i);

        let private_key = child_scalar(&self.private_key, il).ok_or_else(invalid)?;

        Ok(ExtendedPrivKey {
            depth: child_depth,
            child_index: Some(index),
            chain_code: ir,
            private_key,
        })
    }

    /// Walk `path` starting at this node.
    pub fn derive_path(&self, secp: &Secp256k1<All>, path: &DerivationPath) -> Result<Self> {
        path.derive_private(secp, self)
    }

    /// 33-byte compressed public key of this node.
    pub fn public_key(&self, secp: &Secp256k1<All>) -> PublicKey {
        PublicKey::from_secret_key(secp, &self.private_key)
    }

    pub fn private_key(&self) -> &SecretKey {
        &self.private_key
    }

    /// Big-endian private scalar.
    pub fn private_key_bytes(&self) -> [u8; 32] {
        self.private_key.secret_bytes()
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn child_index(&self) -> Option<ChildIndex> {
        self.child_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;
    use crate::derivation::HARDENED_OFFSET;
    use proptest::prelude::*;
    use secp256k1::constants::CURVE_ORDER;

    struct Step {
        path: &'static str,
        private_key: [u8; 32],
        chain_code: [u8; 32],
    }

    fn check_vector(seed: &[u8], steps: &[Step]) {
        let secp = Secp256k1::new();
        let master = ExtendedPrivKey::new_master(seed).unwrap();
        for step in steps {
            let path: DerivationPath = step.path.parse().unwrap();
            let key = if path.is_empty() {
                master.clone()
            } else {
                master.derive_path(&secp, &path).unwrap()
            };
            assert_eq!(
                key.private_key_bytes(),
                step.private_key,
                "private key mismatch at {}",
                step.path
            );
            assert_eq!(
                key.chain_code(),
                &step.chain_code,
                "chain code mismatch at {}",
                step.path
            );
            assert_eq!(key.depth() as usize, path.len());
            assert_eq!(key.child_index(), path.last());
        }
    }

    /// BIP32 Test vector 1
    #[test]
    fn test_vector1() {
        let seed = hex!("000102030405060708090a0b0c0d0e0f");
        check_vector(
            &seed,
            &[
                Step {
                    path: "m",
                    private_key: hex!("e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"),
                    chain_code: hex!("873dff81c02f525623fd1fe5167eac3a55a049de3d314bb42ee227ffed37d508"),
                },
                Step {
                    path: "m/0'",
                    private_key: hex!("edb2e14f9ee77d26dd93b4ecede8d16ed408ce149b6cd80b0715a2d911a0afea"),
                    chain_code: hex!("47fdacbd0f1097043b78c63c20c34ef4ed9a111d980047ad16282c7ae6236141"),
                },
                Step {
                    path: "m/0'/1",
                    private_key: hex!("3c6cb8d0f6a264c91ea8b5030fadaa8e538b020f0a387421a12de9319dc93368"),
                    chain_code: hex!("2a7857631386ba23dacac34180dd1983734e444fdbf774041578e9b6adb37c19"),
                },
                Step {
                    path: "m/0'/1/2'",
                    private_key: hex!("cbce0d719ecf7431d88e6a89fa1483e02e35092af60c042b1df2ff59fa424dca"),
                    chain_code: hex!("04466b9cc8e161e966409ca52986c584f07e9dc81f735db683c3ff6ec7b1503f"),
                },
                Step {
                    path: "m/0'/1/2'/2",
                    private_key: hex!("0f479245fb19a38a1954c5c7c0ebab2f9bdfd96a17563ef28a6a4b1a2a764ef4"),
                    chain_code: hex!("cfb71883f01676f587d023cc53a35bc7f88f724b1f8c2892ac1275ac822a3edd"),
                },
                Step {
                    path: "m/0'/1/2'/2/1000000000",
                    private_key: hex!("471b76e389e528d6de6d816857e012c5455051cad6660850e58372a6c3e6e7c8"),
                    chain_code: hex!("c783e67b921d2beb8f6b389cc646d7263b4145701dadd2161548a8b078e65e9e"),
                },
            ],
        );
    }

    /// BIP32 Test vector 2, 64-byte seed
    #[test]
    fn test_vector2() {
        let seed = hex!(
            "fffcf9f6f3f0edeae7e4e1dedbd8d5d2cfccc9c6c3c0bdbab7b4b1aeaba8a5a2"
            "9f9c999693908d8a8784817e7b7875726f6c696663605d5a5754514e4b484542"
        );
        check_vector(
            &seed,
            &[
                Step {
                    path: "m",
                    private_key: hex!("4b03d6fc340455b363f51020ad3ecca4f0850280cf436c70c727923f6db46c3e"),
                    chain_code: hex!("60499f801b896d83179a4374aeb7822aaeaceaa0db1f85ee3e904c4defbd9689"),
                },
                Step {
                    path: "m/0",
                    private_key: hex!("abe74a98f6c7eabee0428f53798f0ab8aa1bd37873999041703c742f15ac7e1e"),
                    chain_code: hex!("f0909affaa7ee7abe5dd4e100598d4dc53cd709d5a5c2cac40e7412f232f7c9c"),
                },
                Step {
                    path: "m/0/2147483647'",
                    private_key: hex!("877c779ad9687164e9c2f4f0f4ff0340814392330693ce95a58fe18fd52e6e93"),
                    chain_code: hex!("be17a268474a6bb9c61e1d720cf6215e2a88c5406c4aee7b38547f585c9a37d9"),
                },
                Step {
                    path: "m/0/2147483647'/1",
                    private_key: hex!("704addf544a06e5ee4bea37098463c23613da32020d604506da8c0518e1da4b7"),
                    chain_code: hex!("f366f48f1ea9f2d1d3fe958c95ca84ea18e4c4ddb9366c336c927eb246fb38cb"),
                },
                Step {
                    path: "m/0/2147483647'/1/2147483646'",
                    private_key: hex!("f1c7c871a54a804afe328b4c83a1c33b8e5ff48f5087273f04efa83b247d6a2d"),
                    chain_code: hex!("637807030d55d01f9a0cb3a7839515d796bd07706386a6eddf06cc29a65a0e29"),
                },
                Step {
                    path: "m/0/2147483647'/1/2147483646'/2",
                    private_key: hex!("bb7d39bdb83ecf58f2fd82b6d918341cbef428661ef01ab97c28a4842125ac23"),
                    chain_code: hex!("9452b549be8cea3ecb7a84bec10dcfd94afe4d129ebfd3b3cb58eedf394ed271"),
                },
            ],
        );
    }

    /// BIP32 Test vector 3, leading zeros in the master scalar are retained
    #[test]
    fn test_vector3() {
        let seed = hex!(
            "4b381541583be4423346c643850da4b320e46a87ae3d2a4e6da11eba819cd4ac"
            "ba45d239319ac14f863b8d5ab5a0d0c64d2e8a1e7d1457df2e5a3c51c73235be"
        );
        let secp = Secp256k1::new();
        let master = ExtendedPrivKey::new_master(&seed).unwrap();
        assert_eq!(
            master.private_key_bytes(),
            hex!("00ddb80b067e0d4993197fe10f2657a844a384589847602d56f0c629c81aae32")
        );
        let child = master
            .derive_private_child(&secp, ChildIndex::hardened(0).unwrap())
            .unwrap();
        assert_eq!(
            child.private_key_bytes(),
            hex!("491f7a2eebc7b57028e0d3faa0acda02e75c33b03c48fb288c41e2ea44e1daef")
        );
    }

    /// BIP32 Test vector 4, leading zeros across hardened children
    #[test]
    fn test_vector4() {
        let seed = hex!("3ddd5602285899a946114506157c7997e5444528f3003f6134712147db19b678");
        check_vector(
            &seed,
            &[
                Step {
                    path: "m",
                    private_key: hex!("12c0d59c7aa3a10973dbd3f478b65f2516627e3fe61e00c345be9a477ad2e215"),
                    chain_code: hex!("d0c8a1f6edf2500798c3e0b54f1b56e45f6d03e6076abd36e5e2f54101e44ce6"),
                },
                Step {
                    path: "m/0'",
                    private_key: hex!("00d948e9261e41362a688b916f297121ba6bfb2274a3575ac0e456551dfd7f7e"),
                    chain_code: hex!("cdc0f06456a14876c898790e0b3b1a41c531170aec69da44ff7b7265bfe7743b"),
                },
                Step {
                    path: "m/0'/1'",
                    private_key: hex!("3a2086edd7d9df86c3487a5905a1712a9aa664bce8cc268141e07549eaa8661d"),
                    chain_code: hex!("a48ee6674c5264a237703fd383bccd9fad4d9378ac98ab05e6e7029b06360c0d"),
                },
            ],
        );
    }

    #[test]
    fn master_public_key_matches_vector1() {
        let secp = Secp256k1::new();
        let master = ExtendedPrivKey::new_master(&hex!("000102030405060708090a0b0c0d0e0f")).unwrap();
        assert_eq!(
            master.public_key(&secp).serialize(),
            hex!("0339a36013301597daef41fbe593a02cc513d0b55527ec2df1050e2e8ff49c85c2")
        );
        assert_eq!(master.depth(), 0);
        assert_eq!(master.child_index(), None);
    }

    #[test]
    fn path_prefix_consistency() {
        let secp = Secp256k1::new();
        let master = ExtendedPrivKey::new_master(&[7u8; 32]).unwrap();
        let full: DerivationPath = "m/1/2".parse().unwrap();
        let head: DerivationPath = "m/1".parse().unwrap();
        let tail: DerivationPath = "m/2".parse().unwrap();

        let direct = master.derive_path(&secp, &full).unwrap();
        let stepped = master
            .derive_path(&secp, &head)
            .unwrap()
            .derive_path(&secp, &tail)
            .unwrap();
        assert_eq!(direct, stepped);
    }

    #[test]
    fn empty_path_is_rejected() {
        let secp = Secp256k1::new();
        let master = ExtendedPrivKey::new_master(&[1u8; 16]).unwrap();
        assert_eq!(
            master.derive_path(&secp, &DerivationPath::master()),
            Err(HdError::EmptyPathError)
        );
    }

    #[test]
    fn master_scalar_range() {
        assert!(master_scalar(&[0u8; 32]).is_none());
        assert!(master_scalar(&CURVE_ORDER).is_none());
        assert!(master_scalar(&[0xff; 32]).is_none());

        let mut below_order = CURVE_ORDER;
        below_order[31] -= 1;
        assert!(master_scalar(&below_order).is_some());
    }

    #[test]
    fn child_scalar_range() {
        let mut one = [0u8; 32];
        one[31] = 1;
        let parent = SecretKey::from_slice(&one).unwrap();

        // IL >= n
        assert!(child_scalar(&parent, CURVE_ORDER).is_none());
        assert!(child_scalar(&parent, [0xff; 32]).is_none());

        // IL = n - 1, so IL + 1 wraps to zero
        let mut minus_one = CURVE_ORDER;
        minus_one[31] -= 1;
        assert!(child_scalar(&parent, minus_one).is_none());

        let mut two = [0u8; 32];
        two[31] = 2;
        assert_eq!(child_scalar(&parent, one).unwrap().secret_bytes(), two);
    }

    #[test]
    fn depth_overflow_is_an_invalid_child() {
        let secp = Secp256k1::new();
        let index = ChildIndex::hardened(0).unwrap();
        let mut key = ExtendedPrivKey::new_master(&[3u8; 32]).unwrap();
        for _ in 0..u8::MAX {
            key = key.derive_private_child(&secp, index).unwrap();
        }
        assert_eq!(key.depth(), u8::MAX);
        assert_eq!(
            key.derive_private_child(&secp, index),
            Err(HdError::InvalidChildKey { depth: 255, index })
        );

        let too_deep = DerivationPath::from(vec![index; 256]);
        let master = ExtendedPrivKey::new_master(&[3u8; 32]).unwrap();
        assert_eq!(
            master.derive_path(&secp, &too_deep),
            Err(HdError::InvalidChildKey { depth: 255, index })
        );
    }

    #[test]
    fn short_seed_is_accepted() {
        assert!(ExtendedPrivKey::new_master(&[0x42]).is_ok());
    }

    proptest! {
        #[test]
        fn derivation_is_deterministic(seed in prop::collection::vec(any::<u8>(), 16..64), index in 0u32..HARDENED_OFFSET) {
            let secp = Secp256k1::new();
            let a = ExtendedPrivKey::new_master(&seed).unwrap();
            let b = ExtendedPrivKey::new_master(&seed).unwrap();
            prop_assert_eq!(&a, &b);
            let idx = ChildIndex::normal(index).unwrap();
            prop_assert_eq!(
                a.derive_private_child(&secp, idx).unwrap(),
                b.derive_private_child(&secp, idx).unwrap()
            );
        }

        #[test]
        fn hardened_and_normal_children_differ(seed in prop::collection::vec(any::<u8>(), 16..64), index in 0u32..HARDENED_OFFSET) {
            let secp = Secp256k1::new();
            let master = ExtendedPrivKey::new_master(&seed).unwrap();
            let normal = master.derive_private_child(&secp, ChildIndex::normal(index).unwrap()).unwrap();
            let hardened = master.derive_private_child(&secp, ChildIndex::hardened(index).unwrap()).unwrap();
            prop_assert_ne!(normal.private_key_bytes(), hardened.private_key_bytes());
            prop_assert_ne!(normal.chain_code(), hardened.chain_code());
        }

        #[test]
        fn scalars_stay_below_curve_order(seed in prop::collection::vec(any::<u8>(), 16..64), index in any::<u32>()) {
            let secp = Secp256k1::new();
            let master = ExtendedPrivKey::new_master(&seed).unwrap();
            let child = master.derive_private_child(&secp, ChildIndex::from_serialized(index)).unwrap();
            for key in [&master, &child] {
                let bytes = key.private_key_bytes();
                prop_assert!(bytes != [0u8; 32]);
                prop_assert!(bytes < CURVE_ORDER);
            }
        }
    }
}
