//! Checks shared by every party that consumes server replies.

use keywit_hashchain::Extension;
use keywit_types::{Epoch, Hash, Uid};

use crate::error::CoreError;
use crate::kt::{label_input, map_val};
use crate::msg::{MapUpdate, Memb, NonMemb, SigDig, StartReply};
use crate::sig::{PublicKey, Signature, verify_link_sig, verify_vrf_sig};
use crate::vrf::VrfPublicKey;

type Result<T> = std::result::Result<T, CoreError>;

/// Server identity as established from a verified `Start` reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerKeys {
    pub sig_pk: PublicKey,
    pub vrf_pk: VrfPublicKey,
    /// Server's attestation of `vrf_pk`.
    pub vrf_sig: Signature,
}

/// Verify a `Start` reply against the server's signing key, returning the
/// signed tip epoch and the attested VRF key.
pub fn verify_start(sig_pk: &PublicKey, reply: &StartReply) -> Result<(SigDig, ServerKeys)> {
    let ext = keywit_hashchain::verify(&reply.prev_link, &reply.chain_proof)?;
    let Some(dig) = ext.last_val else {
        return Err(CoreError::EmptyStart);
    };
    let epoch = reply
        .prev_epoch_len
        .checked_add(ext.len - 1)
        .ok_or(CoreError::EpochOverflow)?;
    verify_link_sig(sig_pk, epoch, &ext.link, &reply.link_sig)?;
    verify_vrf_sig(sig_pk, &reply.vrf_pk, &reply.vrf_sig)?;
    let tip = SigDig {
        epoch,
        dig,
        link: ext.link,
        sig: reply.link_sig,
    };
    let keys = ServerKeys {
        sig_pk: *sig_pk,
        vrf_pk: reply.vrf_pk,
        vrf_sig: reply.vrf_sig,
    };
    Ok((tip, keys))
}

/// Extend a verified epoch with a chain proof and the signature on the
/// new tip. An empty proof leaves `last` unchanged.
pub fn extend_chain(
    sig_pk: &PublicKey,
    last: &SigDig,
    chain_proof: &[u8],
    link_sig: &Signature,
) -> Result<SigDig> {
    let Extension {
        len,
        last_val,
        link,
    } = keywit_hashchain::verify(&last.link, chain_proof)?;
    let Some(dig) = last_val else {
        return Ok(*last);
    };
    let epoch = last.epoch.checked_add(len).ok_or(CoreError::EpochOverflow)?;
    verify_link_sig(sig_pk, epoch, &link, link_sig)?;
    Ok(SigDig {
        epoch,
        dig,
        link,
        sig: *link_sig,
    })
}

/// Check that version `ver` of `uid` is in the map with digest `dig`.
pub fn check_memb(vrf_pk: &VrfPublicKey, uid: Uid, ver: u64, dig: &Hash, memb: &Memb) -> Result<()> {
    let label = vrf_pk.verify(&label_input(uid, ver), &memb.label_proof)?;
    let val = map_val(memb.epoch_added, &memb.pk_open);
    memb.merkle.verify(&label, &val, dig)?;
    Ok(())
}

/// Check consecutive versions starting at `prefix_len`.
pub fn check_hist(
    vrf_pk: &VrfPublicKey,
    uid: Uid,
    prefix_len: u64,
    dig: &Hash,
    hist: &[Memb],
) -> Result<()> {
    for (ver, memb) in (prefix_len..).zip(hist) {
        check_memb(vrf_pk, uid, ver, dig, memb)?;
    }
    Ok(())
}

/// Check that `epoch_added` never decreases across versions, starts no
/// earlier than `floor`, and never exceeds the verified `epoch`.
pub fn check_epochs_added(prefix_len: u64, hist: &[Memb], floor: Epoch, epoch: Epoch) -> Result<()> {
    let mut min = floor;
    for (ver, memb) in (prefix_len..).zip(hist) {
        if memb.epoch_added < min || memb.epoch_added > epoch {
            return Err(CoreError::BadEpochAdded {
                ver,
                added: memb.epoch_added,
                min,
                max: epoch,
            });
        }
        min = memb.epoch_added;
    }
    Ok(())
}

/// Check that version `ver` of `uid` is absent from the map with digest `dig`.
pub fn check_non_memb(
    vrf_pk: &VrfPublicKey,
    uid: Uid,
    ver: u64,
    dig: &Hash,
    non_memb: &NonMemb,
) -> Result<()> {
    let label = vrf_pk.verify(&label_input(uid, ver), &non_memb.label_proof)?;
    non_memb.merkle.verify(&label, dig)?;
    Ok(())
}

/// Replay an epoch's insertions from `prev_dig` and return the new digest.
pub fn replay_updates(prev_dig: &Hash, updates: &[MapUpdate]) -> Result<Hash> {
    let mut dig = *prev_dig;
    for (index, u) in updates.iter().enumerate() {
        let (prev, next) = u.non_memb.insert_roots(&u.label, &u.val)?;
        if prev != dig {
            return Err(CoreError::UpdateOutOfOrder { index });
        }
        dig = next;
    }
    Ok(dig)
}
