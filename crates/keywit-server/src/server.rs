//! [`Server`]: the key directory, its epoch history, and its query API.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use keywit_core::kt::{commit_rand, prove_label};
use keywit_core::sig::{sign_link, sign_vrf};
use keywit_core::{
    CommitOpen, HistoryArgs, HistoryReply, Memb, NonMemb, PublicKey, PutArgs, Secrets, SigDig,
    Signature, StartReply, UpdateProof, VrfPublicKey,
};
use keywit_hashchain::HashChain;
use keywit_merkle::{Map, Proof};
use keywit_types::{Epoch, Hash, Uid};
use tokio::sync::mpsc;
use tracing::info;

use crate::batch;
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::workq::{PutOutcome, PutTicket, WorkItem};

pub(crate) type Result<T> = std::result::Result<T, ServerError>;

/// One registered version of a uid.
#[derive(Debug, Clone)]
pub(crate) struct KeyEntry {
    pub(crate) pk: Vec<u8>,
    pub(crate) epoch: Epoch,
}

/// Everything guarded by the server's reader/writer lock.
pub(crate) struct State {
    /// Hidden directory: label -> map value.
    pub(crate) map: Map,
    /// Plain directory: uid -> versions in order.
    pub(crate) plain: HashMap<Uid, Vec<KeyEntry>>,
    /// One link per sealed epoch.
    pub(crate) chain: HashChain,
    /// `audits[e]` replays epoch `e`. Epoch 0 has no updates.
    pub(crate) audits: Vec<UpdateProof>,
}

impl State {
    pub(crate) fn latest_epoch(&self) -> Epoch {
        (self.audits.len() - 1) as Epoch
    }

    pub(crate) fn versions(&self, uid: Uid) -> u64 {
        self.plain.get(&uid).map_or(0, |v| v.len() as u64)
    }

    pub(crate) fn latest(&self) -> SigDig {
        let epoch = self.latest_epoch();
        SigDig {
            epoch,
            dig: self.map.digest(),
            link: self.chain.last_link(),
            sig: self.audits[epoch as usize].link_sig,
        }
    }
}

/// Shared between the query API and the batch engine.
pub(crate) struct Inner {
    pub(crate) secrets: Secrets,
    pub(crate) vrf_sig: Signature,
    pub(crate) state: RwLock<State>,
}

impl Inner {
    /// Membership proof for registered version `ver` of `uid`.
    pub(crate) fn memb(&self, state: &State, uid: Uid, ver: u64) -> Result<Memb> {
        let entry = state
            .plain
            .get(&uid)
            .and_then(|v| v.get(ver as usize))
            .ok_or_else(|| ServerError::Internal(format!("uid {uid} has no version {ver}")))?;
        let (label, label_proof) = prove_label(&self.secrets.vrf, uid, ver);
        let Proof::Membership { proof, .. } = state.map.prove(&label)? else {
            return Err(ServerError::Internal(format!(
                "uid {uid} version {ver} missing from map"
            )));
        };
        Ok(Memb {
            label_proof,
            epoch_added: entry.epoch,
            pk_open: CommitOpen {
                pk: entry.pk.clone(),
                rand: commit_rand(&self.secrets.commit, &label),
            },
            merkle: proof,
        })
    }

    /// Non-membership proof for the unregistered version `ver` of `uid`.
    pub(crate) fn bound(&self, state: &State, uid: Uid, ver: u64) -> Result<NonMemb> {
        let (label, label_proof) = prove_label(&self.secrets.vrf, uid, ver);
        match state.map.prove(&label)? {
            Proof::NonMembership(merkle) => Ok(NonMemb {
                label_proof,
                merkle,
            }),
            Proof::Membership { .. } => Err(ServerError::Internal(format!(
                "uid {uid} version {ver} unexpectedly in map"
            ))),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, State> {
        self.state.read().expect("server state lock poisoned")
    }
}

/// A key transparency server.
///
/// Holds the hidden and plain directories and the epoch history behind one
/// reader/writer lock. Queries take the read side; only the background
/// batch engine takes the write side, once per sealed epoch.
pub struct Server {
    inner: Arc<Inner>,
    queue: mpsc::Sender<Vec<WorkItem>>,
}

impl Server {
    /// Create a server with the empty map committed as epoch 0, and start
    /// its batch engine. Must be called inside a tokio runtime.
    pub fn new(secrets: Secrets, config: ServerConfig) -> Result<Self> {
        let map = Map::new();
        let mut chain = HashChain::new();
        let link = chain.append(&map.digest())?;
        let genesis = UpdateProof {
            updates: Vec::new(),
            link_sig: sign_link(&secrets.sig, 0, &link),
        };
        let vrf_sig = sign_vrf(&secrets.sig, &secrets.vrf.public());
        info!(
            pk = %hex::encode(secrets.public_key().0),
            vrf_pk = %hex::encode(secrets.vrf.public().0),
            "server started at epoch 0"
        );

        let inner = Arc::new(Inner {
            secrets,
            vrf_sig,
            state: RwLock::new(State {
                map,
                plain: HashMap::new(),
                chain,
                audits: vec![genesis],
            }),
        });
        let (queue, rx) = mpsc::channel(config.queue_capacity.max(1));
        tokio::spawn(batch::run(inner.clone(), rx, config));
        Ok(Self { inner, queue })
    }

    /// Server's signing key.
    pub fn public_key(&self) -> PublicKey {
        self.inner.secrets.public_key()
    }

    pub fn vrf_public_key(&self) -> VrfPublicKey {
        self.inner.secrets.vrf.public()
    }

    /// Latest sealed epoch.
    pub fn epoch(&self) -> Epoch {
        self.inner.read().latest_epoch()
    }

    /// Digest of the latest sealed epoch.
    pub fn digest(&self) -> Hash {
        self.inner.read().map.digest()
    }

    /// Signed tip of the history.
    pub fn latest(&self) -> SigDig {
        self.inner.read().latest()
    }

    /// Bootstrap info: the chain tip, its signature, and the attested VRF key.
    pub fn start(&self) -> Result<StartReply> {
        let state = self.inner.read();
        let latest = state.latest_epoch();
        let (prev_link, last) = state.chain.bootstrap()?;
        Ok(StartReply {
            prev_epoch_len: latest,
            prev_link,
            chain_proof: last.to_vec(),
            link_sig: state.audits[latest as usize].link_sig,
            vrf_pk: self.inner.secrets.vrf.public(),
            vrf_sig: self.inner.vrf_sig,
        })
    }

    /// Queue a put. The ticket resolves once the put's epoch is sealed.
    pub async fn submit(&self, args: PutArgs) -> Result<PutTicket> {
        let mut tickets = self.submit_batch(vec![args]).await?;
        tickets
            .pop()
            .ok_or_else(|| ServerError::Internal("no ticket for submission".into()))
    }

    /// Queue several puts so that they are processed in the same batch.
    pub async fn submit_batch(&self, puts: Vec<PutArgs>) -> Result<Vec<PutTicket>> {
        if puts.is_empty() {
            return Ok(Vec::new());
        }
        let mut items = Vec::with_capacity(puts.len());
        let mut tickets = Vec::with_capacity(puts.len());
        for args in puts {
            let (done, ticket) = PutTicket::new();
            items.push(WorkItem { args, done });
            tickets.push(ticket);
        }
        self.queue
            .send(items)
            .await
            .map_err(|_| ServerError::Stopped)?;
        Ok(tickets)
    }

    /// Submit a put and wait for its epoch to seal.
    pub async fn put(&self, uid: Uid, pk: Vec<u8>, ver: u64) -> Result<PutOutcome> {
        self.submit(PutArgs { uid, pk, ver }).await?.wait().await
    }

    /// Key history of `uid` past `prev_ver_len` versions, relative to a
    /// caller that has verified up to `prev_epoch`.
    pub fn history(&self, args: HistoryArgs) -> Result<HistoryReply> {
        let HistoryArgs {
            uid,
            prev_epoch,
            prev_ver_len,
        } = args;
        let state = self.inner.read();
        let latest = state.latest_epoch();
        if prev_epoch > latest {
            return Err(ServerError::EpochOutOfRange {
                epoch: prev_epoch,
                latest,
            });
        }
        let versions = state.versions(uid);
        if prev_ver_len > versions {
            return Err(ServerError::VersionOutOfRange {
                ver_len: prev_ver_len,
                versions,
            });
        }

        let hist = (prev_ver_len..versions)
            .map(|ver| self.inner.memb(&state, uid, ver))
            .collect::<Result<Vec<_>>>()?;
        Ok(HistoryReply {
            chain_proof: state.chain.prove(prev_epoch + 1)?,
            link_sig: state.audits[latest as usize].link_sig,
            hist,
            bound: self.inner.bound(&state, uid, versions)?,
        })
    }

    /// Update proofs for every epoch after `prev_epoch`.
    pub fn audit(&self, prev_epoch: Epoch) -> Result<Vec<UpdateProof>> {
        let state = self.inner.read();
        let latest = state.latest_epoch();
        if prev_epoch > latest {
            return Err(ServerError::EpochOutOfRange {
                epoch: prev_epoch,
                latest,
            });
        }
        Ok(state.audits[prev_epoch as usize + 1..].to_vec())
    }
}
