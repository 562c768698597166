//! ed25519 signatures and the two signed statements of the protocol.
//!
//! Parties only ever sign two kinds of statement, each behind its own
//! one-byte tag so a signature on one can never be replayed as the other:
//!
//! - a VRF key attestation, `[VRF_SIG_TAG] ‖ len ‖ vrf_pk`
//! - a link attestation, `[LINK_SIG_TAG] ‖ epoch ‖ len ‖ link`

use std::fmt;

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use keywit_types::{Epoch, Hash, Preimage, short_hex};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::vrf::VrfPublicKey;

/// Domain tag for VRF key attestations.
pub const VRF_SIG_TAG: u8 = 1;
/// Domain tag for hashchain link attestations.
pub const LINK_SIG_TAG: u8 = 2;

/// An ed25519 verifying key in wire form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey(pub [u8; 32]);

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", short_hex(&self.0))
    }
}

impl From<&SigningKey> for PublicKey {
    fn from(sk: &SigningKey) -> Self {
        Self(sk.verifying_key().to_bytes())
    }
}

impl PublicKey {
    fn verifying_key(&self) -> Result<VerifyingKey, CoreError> {
        VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)
    }

    /// Strictly verify `sig` over `msg`. `what` names the statement in errors.
    pub fn verify(&self, msg: &[u8], sig: &Signature, what: &'static str) -> Result<(), CoreError> {
        let vk = self.verifying_key()?;
        let sig = ed25519_dalek::Signature::from_bytes(&sig.to_bytes());
        vk.verify_strict(msg, &sig)
            .map_err(|_| CoreError::BadSignature(what))
    }
}

/// An ed25519 signature.
///
/// Stored as two 32-byte halves since serde does not derive for `[u8; 64]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl Signature {
    /// Reassemble the 64-byte signature.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }

    fn from_bytes(bytes: &[u8; 64]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Self { r, s }
    }
}

/// Sign raw bytes.
pub fn sign(sk: &SigningKey, msg: &[u8]) -> Signature {
    Signature::from_bytes(&sk.sign(msg).to_bytes())
}

fn vrf_preimage(vrf_pk: &VrfPublicKey) -> Vec<u8> {
    Preimage::tagged(VRF_SIG_TAG).bytes(&vrf_pk.0).finish()
}

fn link_preimage(epoch: Epoch, link: &Hash) -> Vec<u8> {
    Preimage::tagged(LINK_SIG_TAG).u64(epoch).bytes(link).finish()
}

/// Attest that `vrf_pk` is the directory's VRF key.
pub fn sign_vrf(sk: &SigningKey, vrf_pk: &VrfPublicKey) -> Signature {
    sign(sk, &vrf_preimage(vrf_pk))
}

/// Check a VRF key attestation.
pub fn verify_vrf_sig(pk: &PublicKey, vrf_pk: &VrfPublicKey, sig: &Signature) -> Result<(), CoreError> {
    pk.verify(&vrf_preimage(vrf_pk), sig, "vrf key")
}

/// Attest that `link` is the hashchain link for `epoch`.
pub fn sign_link(sk: &SigningKey, epoch: Epoch, link: &Hash) -> Signature {
    sign(sk, &link_preimage(epoch, link))
}

/// Check a link attestation.
pub fn verify_link_sig(
    pk: &PublicKey,
    epoch: Epoch,
    link: &Hash,
    sig: &Signature,
) -> Result<(), CoreError> {
    pk.verify(&link_preimage(epoch, link), sig, "link")
}
