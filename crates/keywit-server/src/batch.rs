//! The batch engine: turns a drained batch of puts into one sealed epoch.
//!
//! Per batch:
//!
//! 1. Reject stale versions and all but the first put per uid.
//! 2. Under the read lock, compute each accepted put's label and value in
//!    parallel.
//! 3. Under the write lock, check every label is absent, then insert all
//!    entries, append the digest to the chain, sign the link and record the
//!    update proof. Nothing is mutated unless every entry can be applied.
//! 4. Under the read lock, build each put's proofs in parallel.
//! 5. Complete every item exactly once.
//!
//! A drained batch always seals exactly one epoch. If every put was
//! rejected, the epoch carries an empty update list and a fresh signed link.
//!
//! The engine is the only writer, so the state read in step 2 is the state
//! written in step 3.

use std::collections::HashSet;
use std::sync::Arc;

use keywit_core::kt::{CommitOpen, commit_rand, eval_label, map_val};
use keywit_core::sig::sign_link;
use keywit_core::{MapUpdate, PutArgs, SigDig, UpdateProof};
use keywit_merkle::Proof;
use keywit_types::{Epoch, Hash, Uid, short_hex};
use rayon::prelude::*;
use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::server::{Inner, KeyEntry, Result, State};
use crate::workq::{Completion, PutOutcome, WorkItem, next_batch};

/// Drive the engine until the queue closes or an invariant fails.
pub(crate) async fn run(inner: Arc<Inner>, mut rx: mpsc::Receiver<Vec<WorkItem>>, config: ServerConfig) {
    while let Some(batch) = next_batch(&mut rx, &config).await {
        let inner = inner.clone();
        match tokio::task::spawn_blocking(move || process(&inner, batch)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(error = %e, "batch engine stopped");
                return;
            }
            Err(e) => {
                error!(error = %e, "batch task failed, batch engine stopped");
                return;
            }
        }
    }
    debug!("work queue closed, batch engine exiting");
}

/// A put that passed the version checks, with its computed map entry.
struct Entry {
    uid: Uid,
    ver: u64,
    pk: Vec<u8>,
    label: Hash,
    val: Hash,
}

/// Per-item verdict from the version checks.
fn check_work(state: &State, puts: &[PutArgs]) -> Vec<Result<()>> {
    let mut seen = HashSet::with_capacity(puts.len());
    puts.iter()
        .map(|p| {
            let expected = state.versions(p.uid);
            if p.ver != expected {
                return Err(ServerError::StaleVersion {
                    uid: p.uid,
                    ver: p.ver,
                    expected,
                });
            }
            if !seen.insert(p.uid) {
                return Err(ServerError::DuplicateUid { uid: p.uid });
            }
            Ok(())
        })
        .collect()
}

fn make_entry(inner: &Inner, put: &PutArgs, epoch: Epoch) -> Entry {
    let label = eval_label(&inner.secrets.vrf, put.uid, put.ver);
    let open = CommitOpen {
        pk: put.pk.clone(),
        rand: commit_rand(&inner.secrets.commit, &label),
    };
    Entry {
        uid: put.uid,
        ver: put.ver,
        pk: put.pk.clone(),
        label,
        val: map_val(epoch, &open),
    }
}

/// Apply `entries` as epoch `epoch`. All-or-nothing.
fn seal(inner: &Inner, state: &mut State, entries: &[Entry], epoch: Epoch) -> Result<SigDig> {
    if state.latest_epoch() + 1 != epoch {
        return Err(ServerError::Internal(format!(
            "sealing epoch {epoch} on top of epoch {}",
            state.latest_epoch()
        )));
    }
    for e in entries {
        if state.versions(e.uid) != e.ver {
            return Err(ServerError::Internal(format!(
                "uid {} moved past version {} during batch",
                e.uid, e.ver
            )));
        }
        if state.map.get(&e.label)?.is_some() {
            return Err(ServerError::Internal(format!(
                "label {} already in map",
                short_hex(&e.label)
            )));
        }
    }

    let mut updates = Vec::with_capacity(entries.len());
    for e in entries {
        let Proof::NonMembership(non_memb) = state.map.prove(&e.label)? else {
            return Err(ServerError::Internal("label appeared mid-batch".into()));
        };
        state.map.put(&e.label, e.val.to_vec())?;
        state.plain.entry(e.uid).or_default().push(KeyEntry {
            pk: e.pk.clone(),
            epoch,
        });
        updates.push(MapUpdate {
            label: e.label,
            val: e.val,
            non_memb,
        });
    }

    let dig = state.map.digest();
    let link = state.chain.append(&dig)?;
    let sig = sign_link(&inner.secrets.sig, epoch, &link);
    state.audits.push(UpdateProof {
        updates,
        link_sig: sig,
    });
    Ok(SigDig {
        epoch,
        dig,
        link,
        sig,
    })
}

fn process(inner: &Inner, batch: Vec<WorkItem>) -> Result<()> {
    let (puts, dones): (Vec<PutArgs>, Vec<Completion>) =
        batch.into_iter().map(|w| (w.args, w.done)).unzip();

    let (verdicts, entries, epoch) = {
        let state = inner.state.read().expect("server state lock poisoned");
        let epoch = state.latest_epoch() + 1;
        let verdicts = check_work(&state, &puts);
        let entries: Vec<Entry> = puts
            .par_iter()
            .zip(verdicts.par_iter())
            .filter(|(_, v)| v.is_ok())
            .map(|(p, _)| make_entry(inner, p, epoch))
            .collect();
        (verdicts, entries, epoch)
    };

    let rejected = puts.len() - entries.len();
    if entries.is_empty() {
        trace!(rejected, epoch, "sealing epoch with no accepted puts");
    }

    let sig_dig = {
        let mut state = inner.state.write().expect("server state lock poisoned");
        seal(inner, &mut state, &entries, epoch)?
    };
    debug!(
        epoch,
        entries = entries.len(),
        rejected,
        digest = %short_hex(&sig_dig.dig),
        "sealed epoch"
    );

    let outcomes: Vec<PutOutcome> = {
        let state = inner.state.read().expect("server state lock poisoned");
        entries
            .par_iter()
            .map(|e| {
                Ok(PutOutcome {
                    sig_dig,
                    memb: inner.memb(&state, e.uid, e.ver)?,
                    bound: inner.bound(&state, e.uid, e.ver + 1)?,
                })
            })
            .collect::<Result<_>>()?
    };

    let mut outcomes = outcomes.into_iter();
    for (done, verdict) in dones.into_iter().zip(verdicts) {
        let reply = match verdict {
            Ok(()) => outcomes
                .next()
                .ok_or_else(|| ServerError::Internal("missing outcome".into())),
            Err(e) => Err(e),
        };
        // The caller may have stopped waiting.
        let _ = done.send(reply);
    }
    Ok(())
}
