//! ECVRF over ristretto255 with SHA-512 hashing.
//!
//! The construction follows the RFC 9381 shape (`Γ = x·H(input)` plus a
//! Chaum-Pedersen proof that `log_B(Y) = log_H(Γ)`), with ristretto
//! encodings and a full-width challenge. The output is a blake3 hash of
//! `Γ`, so it is hash-length and usable directly as a map label.

use std::fmt;

use curve25519_dalek::constants::RISTRETTO_BASEPOINT_POINT;
use curve25519_dalek::ristretto::{CompressedRistretto, RistrettoPoint};
use curve25519_dalek::scalar::Scalar;
use keywit_types::{Hash, hash_parts, short_hex};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};

use crate::error::CoreError;

const HASH_TO_CURVE_DST: &[u8] = b"keywit vrf hash to curve";
const NONCE_DST: &[u8] = b"keywit vrf nonce";
const CHALLENGE_DST: &[u8] = b"keywit vrf challenge";
const OUTPUT_DST: &[u8] = b"keywit vrf output";

/// Compressed ristretto public key of a VRF.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VrfPublicKey(pub [u8; 32]);

impl fmt::Debug for VrfPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VrfPublicKey({})", short_hex(&self.0))
    }
}

/// Proof that a VRF output was computed with the key behind a public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfProof {
    /// Compressed `Γ = x·H(input)`.
    pub gamma: [u8; 32],
    /// Challenge scalar.
    pub c: [u8; 32],
    /// Response scalar.
    pub s: [u8; 32],
}

/// VRF secret key.
pub struct VrfSecretKey {
    x: Scalar,
    nonce_seed: [u8; 32],
    public: VrfPublicKey,
}

impl VrfSecretKey {
    /// Derive a key deterministically from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let expanded = sha512(&[seed]);
        let mut wide = [0u8; 64];
        wide[..32].copy_from_slice(&expanded[..32]);
        let x = Scalar::from_bytes_mod_order_wide(&wide);
        let mut nonce_seed = [0u8; 32];
        nonce_seed.copy_from_slice(&expanded[32..]);
        let public = VrfPublicKey((RISTRETTO_BASEPOINT_POINT * x).compress().to_bytes());
        Self {
            x,
            nonce_seed,
            public,
        }
    }

    pub fn public(&self) -> VrfPublicKey {
        self.public
    }

    /// Compute the output for `input` together with its proof.
    pub fn prove(&self, input: &[u8]) -> (Hash, VrfProof) {
        let h = hash_to_curve(&self.public, input);
        let gamma = h * self.x;
        let k = self.nonce(&h);
        let c = challenge(&self.public, &h, &gamma, &(RISTRETTO_BASEPOINT_POINT * k), &(h * k));
        let s = k + c * self.x;
        let gamma_bytes = gamma.compress().to_bytes();
        let proof = VrfProof {
            gamma: gamma_bytes,
            c: c.to_bytes(),
            s: s.to_bytes(),
        };
        (output(&gamma_bytes), proof)
    }

    /// Compute the output for `input` without a proof.
    pub fn evaluate(&self, input: &[u8]) -> Hash {
        let gamma = hash_to_curve(&self.public, input) * self.x;
        output(&gamma.compress().to_bytes())
    }

    fn nonce(&self, h: &RistrettoPoint) -> Scalar {
        let digest = sha512(&[NONCE_DST, &self.nonce_seed, h.compress().as_bytes()]);
        Scalar::from_bytes_mod_order_wide(&digest)
    }
}

impl VrfPublicKey {
    /// Check `proof` for `input` and return the VRF output it proves.
    pub fn verify(&self, input: &[u8], proof: &VrfProof) -> Result<Hash, CoreError> {
        let y = decompress(&self.0).ok_or(CoreError::InvalidPublicKey)?;
        let gamma = decompress(&proof.gamma).ok_or(CoreError::BadVrfProof)?;
        let c = canonical_scalar(proof.c).ok_or(CoreError::BadVrfProof)?;
        let s = canonical_scalar(proof.s).ok_or(CoreError::BadVrfProof)?;

        let h = hash_to_curve(self, input);
        let u = RISTRETTO_BASEPOINT_POINT * s - y * c;
        let v = h * s - gamma * c;
        if challenge(self, &h, &gamma, &u, &v) != c {
            return Err(CoreError::BadVrfProof);
        }
        Ok(output(&proof.gamma))
    }
}

fn hash_to_curve(pk: &VrfPublicKey, input: &[u8]) -> RistrettoPoint {
    let digest = sha512(&[HASH_TO_CURVE_DST, &pk.0, input]);
    RistrettoPoint::from_uniform_bytes(&digest)
}

fn challenge(
    pk: &VrfPublicKey,
    h: &RistrettoPoint,
    gamma: &RistrettoPoint,
    u: &RistrettoPoint,
    v: &RistrettoPoint,
) -> Scalar {
    let digest = sha512(&[
        CHALLENGE_DST,
        &pk.0,
        h.compress().as_bytes(),
        gamma.compress().as_bytes(),
        u.compress().as_bytes(),
        v.compress().as_bytes(),
    ]);
    Scalar::from_bytes_mod_order_wide(&digest)
}

fn sha512(parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = Sha512::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 64];
    out.copy_from_slice(&hasher.finalize());
    out
}

fn output(gamma: &[u8; 32]) -> Hash {
    hash_parts(&[OUTPUT_DST, gamma])
}

fn decompress(bytes: &[u8; 32]) -> Option<RistrettoPoint> {
    CompressedRistretto(*bytes).decompress()
}

fn canonical_scalar(bytes: [u8; 32]) -> Option<Scalar> {
    Scalar::from_canonical_bytes(bytes).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> VrfSecretKey {
        VrfSecretKey::from_seed(&[seed; 32])
    }

    #[test]
    fn test_prove_verify() {
        let sk = key(1);
        let (out, proof) = sk.prove(b"input");
        assert_eq!(sk.public().verify(b"input", &proof).unwrap(), out);
        assert_eq!(sk.evaluate(b"input"), out);
    }

    #[test]
    fn test_deterministic() {
        let a = key(2).prove(b"x");
        let b = key(2).prove(b"x");
        assert_eq!(a, b);
        assert_ne!(key(2).evaluate(b"x"), key(2).evaluate(b"y"));
        assert_ne!(key(2).evaluate(b"x"), key(3).evaluate(b"x"));
    }

    #[test]
    fn test_wrong_input_rejected() {
        let sk = key(4);
        let (_, proof) = sk.prove(b"a");
        assert_eq!(sk.public().verify(b"b", &proof), Err(CoreError::BadVrfProof));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let (_, proof) = key(5).prove(b"a");
        assert_eq!(key(6).public().verify(b"a", &proof), Err(CoreError::BadVrfProof));
    }

    #[test]
    fn test_tampered_proof_rejected() {
        let sk = key(7);
        let (_, proof) = sk.prove(b"a");

        let mut p = proof;
        p.s[0] ^= 1;
        assert!(sk.public().verify(b"a", &p).is_err());

        let mut p = proof;
        p.c[0] ^= 1;
        assert!(sk.public().verify(b"a", &p).is_err());

        // Swap in another valid gamma.
        let (_, other) = sk.prove(b"b");
        let mut p = proof;
        p.gamma = other.gamma;
        assert!(sk.public().verify(b"a", &p).is_err());
    }

    #[test]
    fn test_garbage_public_key_rejected() {
        let (_, proof) = key(8).prove(b"a");
        let bad = VrfPublicKey([0xff; 32]);
        assert_eq!(bad.verify(b"a", &proof), Err(CoreError::InvalidPublicKey));
    }
}
