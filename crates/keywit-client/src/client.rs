//! [`Client`]: Put / Get / SelfMon / Audit with full verification.

use std::collections::BTreeMap;
use std::sync::Arc;

use keywit_auditor::call_get;
use keywit_core::sig::{verify_link_sig, verify_vrf_sig};
use keywit_core::verify::{
    check_epochs_added, check_hist, check_non_memb, extend_chain, verify_start,
};
use keywit_core::{
    CoreError, Evidence, HistoryArgs, HistoryReply, LinkEvidence, Memb, Party, PublicKey, PutArgs,
    ServerKeys, SigDig, Suspects, VrfEvidence,
};
use keywit_net::Transport;
use keywit_server::{call_history, call_put, call_start};
use keywit_types::{Epoch, Uid, short_hex};
use tracing::{debug, info, trace, warn};

use crate::config::ClientConfig;
use crate::error::ClientError;

type Result<T> = std::result::Result<T, ClientError>;

/// Result of [`Client::get`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    /// Epoch the lookup was verified against.
    pub epoch: Epoch,
    /// Every registered key of the uid, oldest first.
    pub history: Vec<Vec<u8>>,
}

impl Lookup {
    /// Whether the uid has any key.
    pub fn is_registered(&self) -> bool {
        !self.history.is_empty()
    }

    /// Latest key, if any.
    pub fn pk(&self) -> Option<&[u8]> {
        self.history.last().map(Vec::as_slice)
    }
}

/// Result of [`Client::self_mon`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonStatus {
    /// Epoch through which the uid's history checked out.
    pub epoch: Epoch,
    /// Whether the pending key was confirmed by this call.
    pub changed: bool,
}

/// The next version of the client's own uid.
#[derive(Debug, Default)]
pub(crate) struct NextVer {
    ver: u64,
    pub(crate) pending: Option<Vec<u8>>,
    /// Latest epoch at which `ver` was proven absent.
    absent_at: Option<Epoch>,
}

/// A key transparency client for one uid.
///
/// Holds the latest verified epoch and every signed link it has verified,
/// keyed by epoch. Two different signed links for the same epoch become
/// [`Evidence`].
pub struct Client {
    uid: Uid,
    net: Arc<dyn Transport>,
    server_addr: String,
    server: ServerKeys,
    config: ClientConfig,
    pub(crate) pend: NextVer,
    /// Keys confirmed for our own uid, by version.
    confirmed: Vec<Vec<u8>>,
    last: SigDig,
    pub(crate) seen: BTreeMap<Epoch, SigDig>,
}

impl Client {
    /// Connect to the server at `server_addr` and verify its signed tip.
    pub async fn new(
        uid: Uid,
        net: Arc<dyn Transport>,
        server_addr: impl Into<String>,
        server_pk: PublicKey,
        config: ClientConfig,
    ) -> Result<Self> {
        let server_addr = server_addr.into();
        let reply = call_start(net.as_ref(), &server_addr)
            .await
            .map_err(|e| ClientError::call(Party::ServerFull, e))?;
        let (last, server) =
            verify_start(&server_pk, &reply).map_err(|e| ClientError::blame(Party::ServerFull, e))?;
        debug!(uid, epoch = last.epoch, "client connected");
        Ok(Self {
            uid,
            net,
            server_addr,
            server,
            config,
            pend: NextVer::default(),
            confirmed: Vec::new(),
            last,
            seen: BTreeMap::from([(last.epoch, last)]),
        })
    }

    pub fn uid(&self) -> Uid {
        self.uid
    }

    /// Latest verified epoch. Share it with peers for [`Client::compare`].
    pub fn last(&self) -> SigDig {
        self.last
    }

    /// Register `pk` as the next version of our uid and wait until it is
    /// confirmed.
    ///
    /// A put may be lost in transit, so it is resubmitted once it looks
    /// lost: the server sealed two epochs past the submission without it,
    /// or `resubmit_polls` polls went by. A copy that arrives after the
    /// first landed is rejected by the server and seals an empty epoch.
    pub async fn put(&mut self, pk: Vec<u8>) -> Result<Epoch> {
        match &self.pend.pending {
            Some(p) if *p != pk => return Err(ClientError::PendingMismatch),
            Some(_) => {}
            None => self.pend.pending = Some(pk.clone()),
        }
        let args = PutArgs {
            uid: self.uid,
            pk,
            ver: self.pend.ver,
        };
        // First epoch observed after the latest submission.
        let mut sent_at: Option<Epoch> = None;
        let mut polls = 0;
        let mut delivered = false;
        let mut resubmit = true;
        loop {
            if resubmit {
                delivered = match call_put(self.net.as_ref(), &self.server_addr, &args).await {
                    Ok(()) => true,
                    Err(e) => {
                        debug!(uid = self.uid, ver = args.ver, error = %e, "put not delivered");
                        false
                    }
                };
                sent_at = None;
                polls = 0;
            }
            tokio::time::sleep(self.config.poll_interval).await;
            polls += 1;
            match self.self_mon().await {
                Ok(MonStatus {
                    epoch,
                    changed: true,
                }) => {
                    info!(uid = self.uid, ver = args.ver, epoch, "key confirmed");
                    return Ok(epoch);
                }
                Ok(status) => {
                    trace!(uid = self.uid, epoch = status.epoch, "put still pending");
                    sent_at.get_or_insert(status.epoch);
                }
                Err(ClientError::Transport(e)) => debug!(error = %e, "self-monitor not delivered"),
                Err(e) => return Err(e),
            }
            let overtaken = sent_at.is_some_and(|e| self.last.epoch >= e + 2);
            resubmit = !delivered || overtaken || polls >= self.config.resubmit_polls;
        }
    }

    /// Look up the full key history of `uid` at the server's latest epoch.
    pub async fn get(&mut self, uid: Uid) -> Result<Lookup> {
        let reply = self.history(uid, 0).await?;
        let last = self.extend(&reply)?;
        self.check_versions(uid, 0, &last, &reply, None)?;

        if uid == self.uid {
            let changed = self
                .confirmed
                .iter()
                .zip(&reply.hist)
                .position(|(ours, memb)| *ours != memb.pk_open.pk);
            if let Some(ver) = changed {
                return Err(ClientError::blame(
                    Suspects::of(&[Party::ServerFull, Party::Clients]),
                    format!("confirmed version {ver} of own uid changed"),
                ));
            }
        }

        self.advance(last);
        Ok(Lookup {
            epoch: last.epoch,
            history: reply.hist.into_iter().map(|m| m.pk_open.pk).collect(),
        })
    }

    /// Check that our uid has gained no versions except the pending one.
    pub async fn self_mon(&mut self) -> Result<MonStatus> {
        let ver = self.pend.ver;
        let reply = self.history(self.uid, ver).await?;
        let last = self.extend(&reply)?;
        let floor = self.pend.absent_at.map(|e| e + 1);
        self.check_versions(self.uid, ver, &last, &reply, floor)?;

        let unexpected = |reason: String| {
            ClientError::blame(Suspects::of(&[Party::ServerFull, Party::Clients]), reason)
        };
        let changed = match (&self.pend.pending, reply.hist.as_slice()) {
            (_, []) => false,
            (None, [..]) => {
                return Err(unexpected(format!(
                    "{} unsubmitted version(s) appeared at version {ver}",
                    reply.hist.len()
                )));
            }
            (Some(pk), [memb]) if memb.pk_open.pk == *pk => true,
            (Some(_), [_]) => return Err(unexpected(format!("version {ver} has a foreign key"))),
            (Some(_), _) => {
                return Err(unexpected(format!(
                    "{} versions appeared for one pending put",
                    reply.hist.len()
                )));
            }
        };

        if changed {
            if let Some(pk) = self.pend.pending.take() {
                self.confirmed.push(pk);
            }
            self.pend.ver += 1;
        }
        self.pend.absent_at = Some(last.epoch);
        self.advance(last);
        Ok(MonStatus {
            epoch: last.epoch,
            changed,
        })
    }

    /// Cross-check our latest epoch against an auditor.
    pub async fn audit(&self, auditor_addr: &str, auditor_pk: &PublicKey) -> Result<()> {
        let last = self.last;
        let reply = call_get(self.net.as_ref(), auditor_addr, last.epoch)
            .await
            .map_err(|e| ClientError::call(Party::AuditorFull, e))?;
        let adtr_fault = |e: CoreError| ClientError::blame(Party::AuditorFull, e);

        verify_vrf_sig(auditor_pk, &reply.vrf_pk, &reply.adtr_vrf_sig).map_err(adtr_fault)?;
        verify_vrf_sig(&self.server.sig_pk, &reply.vrf_pk, &reply.serv_vrf_sig)
            .map_err(adtr_fault)?;
        if reply.vrf_pk != self.server.vrf_pk {
            warn!(auditor = auditor_addr, "server attested two VRF keys");
            return Err(Evidence::Vrf(VrfEvidence {
                vrf_pk0: self.server.vrf_pk,
                sig0: self.server.vrf_sig,
                vrf_pk1: reply.vrf_pk,
                sig1: reply.serv_vrf_sig,
            })
            .into());
        }

        verify_link_sig(auditor_pk, last.epoch, &reply.link, &reply.adtr_link_sig)
            .map_err(adtr_fault)?;
        verify_link_sig(&self.server.sig_pk, last.epoch, &reply.link, &reply.serv_link_sig)
            .map_err(adtr_fault)?;
        if reply.link != last.link {
            warn!(auditor = auditor_addr, epoch = last.epoch, "server signed two links");
            return Err(Evidence::Link(LinkEvidence {
                epoch: last.epoch,
                link0: last.link,
                sig0: last.sig,
                link1: reply.link,
                sig1: reply.serv_link_sig,
            })
            .into());
        }
        trace!(auditor = auditor_addr, epoch = last.epoch, "audit passed");
        Ok(())
    }

    /// Compare a signed epoch from a peer with what we have seen.
    pub fn compare(&self, theirs: &SigDig) -> Result<()> {
        verify_link_sig(&self.server.sig_pk, theirs.epoch, &theirs.link, &theirs.sig)
            .map_err(|e| ClientError::blame(Party::Unknown, e))?;
        let Some(ours) = self.seen.get(&theirs.epoch) else {
            return Ok(());
        };
        if ours.link != theirs.link {
            warn!(
                epoch = theirs.epoch,
                ours = %short_hex(&ours.link),
                theirs = %short_hex(&theirs.link),
                "server signed two links"
            );
            return Err(Evidence::Link(LinkEvidence {
                epoch: theirs.epoch,
                link0: ours.link,
                sig0: ours.sig,
                link1: theirs.link,
                sig1: theirs.sig,
            })
            .into());
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn history(&self, uid: Uid, prev_ver_len: u64) -> Result<HistoryReply> {
        let args = HistoryArgs {
            uid,
            prev_epoch: self.last.epoch,
            prev_ver_len,
        };
        call_history(self.net.as_ref(), &self.server_addr, &args)
            .await
            .map_err(|e| ClientError::call(Party::ServerFull, e))
    }

    /// Verify the chain extension in a history reply.
    fn extend(&self, reply: &HistoryReply) -> Result<SigDig> {
        extend_chain(&self.server.sig_pk, &self.last, &reply.chain_proof, &reply.link_sig)
            .map_err(|e| ClientError::blame(Party::ServerFull, e))
    }

    /// Verify `reply.hist` as versions `prefix_len..` of `uid` and the bound
    /// right after them, all against `last`.
    fn check_versions(
        &self,
        uid: Uid,
        prefix_len: u64,
        last: &SigDig,
        reply: &HistoryReply,
        floor: Option<Epoch>,
    ) -> Result<()> {
        let vrf_pk = &self.server.vrf_pk;
        let hist: &[Memb] = &reply.hist;
        let bound_ver = prefix_len + hist.len() as u64;
        check_hist(vrf_pk, uid, prefix_len, &last.dig, hist)
            .and_then(|()| check_epochs_added(prefix_len, hist, floor.unwrap_or(0), last.epoch))
            .and_then(|()| check_non_memb(vrf_pk, uid, bound_ver, &last.dig, &reply.bound))
            .map_err(|e| ClientError::blame(Party::ServerFull, e))
    }

    fn advance(&mut self, last: SigDig) {
        if last.epoch > self.last.epoch {
            trace!(uid = self.uid, epoch = last.epoch, "advanced");
            self.seen.insert(last.epoch, last);
            self.last = last;
        }
    }
}
