//! Portable proof that a party signed two contradictory statements.

use keywit_types::{Epoch, Hash};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::sig::{PublicKey, Signature, verify_link_sig, verify_vrf_sig};
use crate::vrf::VrfPublicKey;

/// Two signatures by the same key over conflicting statements.
///
/// Anyone holding the accused party's public key can check it with
/// [`Evidence::check`]; nothing else is trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Evidence {
    Vrf(VrfEvidence),
    Link(LinkEvidence),
}

/// Attestations of two different VRF keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VrfEvidence {
    pub vrf_pk0: VrfPublicKey,
    pub sig0: Signature,
    pub vrf_pk1: VrfPublicKey,
    pub sig1: Signature,
}

/// Attestations of two different links for the same epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEvidence {
    pub epoch: Epoch,
    pub link0: Hash,
    pub sig0: Signature,
    pub link1: Hash,
    pub sig1: Signature,
}

impl Evidence {
    /// `Ok(())` iff the owner of `pk` signed both statements and they
    /// differ, i.e. the evidence convicts `pk`.
    pub fn check(&self, pk: &PublicKey) -> Result<(), CoreError> {
        match self {
            Evidence::Vrf(e) => e.check(pk),
            Evidence::Link(e) => e.check(pk),
        }
    }
}

impl VrfEvidence {
    fn check(&self, pk: &PublicKey) -> Result<(), CoreError> {
        verify_vrf_sig(pk, &self.vrf_pk0, &self.sig0)?;
        verify_vrf_sig(pk, &self.vrf_pk1, &self.sig1)?;
        if self.vrf_pk0 == self.vrf_pk1 {
            return Err(CoreError::NotContradictory);
        }
        Ok(())
    }
}

impl LinkEvidence {
    fn check(&self, pk: &PublicKey) -> Result<(), CoreError> {
        verify_link_sig(pk, self.epoch, &self.link0, &self.sig0)?;
        verify_link_sig(pk, self.epoch, &self.link1, &self.sig1)?;
        if self.link0 == self.link1 {
            return Err(CoreError::NotContradictory);
        }
        Ok(())
    }
}
