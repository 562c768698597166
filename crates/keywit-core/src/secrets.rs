//! Long-lived key material for servers and auditors.

use ed25519_dalek::SigningKey;
use keywit_types::Hash;
use rand::RngCore;

use crate::sig::PublicKey;
use crate::vrf::VrfSecretKey;

const SIG_CONTEXT: &str = "keywit 2024 signing key";
const VRF_CONTEXT: &str = "keywit 2024 vrf key";
const COMMIT_CONTEXT: &str = "keywit 2024 commit secret";

/// Fresh random 32-byte seed.
pub fn random_seed() -> [u8; 32] {
    let mut seed = [0u8; 32];
    rand::rng().fill_bytes(&mut seed);
    seed
}

/// Signing key derived from `seed`.
pub fn signing_key_from_seed(seed: &[u8; 32]) -> SigningKey {
    SigningKey::from_bytes(&blake3::derive_key(SIG_CONTEXT, seed))
}

/// Everything a directory server keeps secret.
pub struct Secrets {
    /// Signs link and VRF key attestations.
    pub sig: SigningKey,
    /// Computes map labels.
    pub vrf: VrfSecretKey,
    /// Seeds commitment randomness.
    pub commit: Hash,
}

impl Secrets {
    /// Generate fresh secrets.
    pub fn generate() -> Self {
        Self::from_seed(&random_seed())
    }

    /// Derive all secrets from one seed, each under its own context.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            sig: signing_key_from_seed(seed),
            vrf: VrfSecretKey::from_seed(&blake3::derive_key(VRF_CONTEXT, seed)),
            commit: blake3::derive_key(COMMIT_CONTEXT, seed),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(&self.sig)
    }
}
