//! [`Auditor`]: replays server updates and countersigns verified links.

use std::sync::{Arc, RwLock};

use ed25519_dalek::SigningKey;
use keywit_core::sig::{sign_link, sign_vrf, verify_link_sig};
use keywit_core::verify::{replay_updates, verify_start};
use keywit_core::{AuditorGetReply, AuditorUpdateArgs, PublicKey, ServerKeys, Signature};
use keywit_hashchain::next_link;
use keywit_net::Transport;
use keywit_server::{call_audit, call_start};
use keywit_types::{Epoch, Hash, short_hex};
use tracing::{debug, info, trace, warn};

use crate::config::AuditorConfig;
use crate::error::AuditorError;

type Result<T> = std::result::Result<T, AuditorError>;

/// One verified epoch.
#[derive(Debug, Clone, Copy)]
struct Attested {
    link: Hash,
    serv_sig: Signature,
    adtr_sig: Signature,
}

struct State {
    /// First epoch the auditor verified (its bootstrap point).
    start: Epoch,
    /// Digest of the latest verified epoch.
    dig: Hash,
    /// `epochs[i]` is epoch `start + i`.
    epochs: Vec<Attested>,
}

impl State {
    fn latest_epoch(&self) -> Epoch {
        self.start + self.epochs.len() as Epoch - 1
    }

    fn latest_link(&self) -> Hash {
        self.epochs[self.epochs.len() - 1].link
    }
}

/// An independent replica that checks every server update.
///
/// The auditor never stores the map. It keeps the latest digest and link,
/// replays each epoch's insertion proofs to derive the next digest, chains
/// it, and checks the server's signature on the resulting link before
/// adding its own.
pub struct Auditor {
    sk: SigningKey,
    server: ServerKeys,
    adtr_vrf_sig: Signature,
    net: Arc<dyn Transport>,
    server_addr: String,
    config: AuditorConfig,
    state: RwLock<State>,
}

impl Auditor {
    /// Bootstrap from the server's `Start` reply and countersign its tip.
    pub async fn new(
        net: Arc<dyn Transport>,
        server_addr: impl Into<String>,
        server_pk: PublicKey,
        sk: SigningKey,
        config: AuditorConfig,
    ) -> Result<Self> {
        let server_addr = server_addr.into();
        let reply = call_start(net.as_ref(), &server_addr).await?;
        let (tip, server) = verify_start(&server_pk, &reply)?;
        let adtr_vrf_sig = sign_vrf(&sk, &server.vrf_pk);
        let first = Attested {
            link: tip.link,
            serv_sig: tip.sig,
            adtr_sig: sign_link(&sk, tip.epoch, &tip.link),
        };
        info!(
            server = %server_addr,
            epoch = tip.epoch,
            link = %short_hex(&tip.link),
            "auditor bootstrapped"
        );
        Ok(Self {
            sk,
            server,
            adtr_vrf_sig,
            net,
            server_addr,
            config,
            state: RwLock::new(State {
                start: tip.epoch,
                dig: tip.dig,
                epochs: vec![first],
            }),
        })
    }

    /// Auditor's signing key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(&self.sk)
    }

    /// Latest verified epoch.
    pub fn epoch(&self) -> Epoch {
        self.state.read().expect("auditor state lock poisoned").latest_epoch()
    }

    /// Pull every epoch past the latest verified one and apply it.
    /// Returns the number of new epochs.
    pub async fn update(&self) -> Result<u64> {
        let latest = self.epoch();
        let proofs = call_audit(self.net.as_ref(), &self.server_addr, latest).await?;
        self.apply(AuditorUpdateArgs {
            first_epoch: latest + 1,
            proofs,
        })
    }

    /// Verify and apply a run of update proofs. All-or-nothing: if any
    /// epoch fails to verify, none are applied.
    ///
    /// Epochs already verified are skipped, so a repeated push is harmless.
    pub fn apply(&self, args: AuditorUpdateArgs) -> Result<u64> {
        let mut state = self.state.write().expect("auditor state lock poisoned");
        let next = state.latest_epoch() + 1;
        if args.first_epoch > next {
            return Err(AuditorError::Gap {
                expected: next,
                got: args.first_epoch,
            });
        }
        let skip = (next - args.first_epoch) as usize;
        let fresh = args.proofs.get(skip..).unwrap_or_default();
        if fresh.is_empty() {
            trace!(latest = next - 1, "no new epochs");
            return Ok(0);
        }

        let mut dig = state.dig;
        let mut link = state.latest_link();
        let mut verified = Vec::with_capacity(fresh.len());
        for (epoch, proof) in (next..).zip(fresh) {
            let checked = replay_updates(&dig, &proof.updates).and_then(|d| {
                let l = next_link(&link, &d);
                verify_link_sig(&self.server.sig_pk, epoch, &l, &proof.link_sig)?;
                Ok((d, l))
            });
            let (d, l) = match checked {
                Ok(v) => v,
                Err(e) => {
                    warn!(epoch, error = %e, "rejecting server update");
                    return Err(e.into());
                }
            };
            dig = d;
            link = l;
            verified.push(Attested {
                link,
                serv_sig: proof.link_sig,
                adtr_sig: sign_link(&self.sk, epoch, &link),
            });
        }

        let added = verified.len() as u64;
        state.dig = dig;
        state.epochs.extend(verified);
        debug!(
            epochs = added,
            latest = state.latest_epoch(),
            digest = %short_hex(&dig),
            "applied server update"
        );
        Ok(added)
    }

    /// Link and VRF attestations for `epoch`, countersigned by this auditor.
    pub fn get(&self, epoch: Epoch) -> Result<AuditorGetReply> {
        let state = self.state.read().expect("auditor state lock poisoned");
        let end = state.latest_epoch() + 1;
        let Some(att) = epoch
            .checked_sub(state.start)
            .and_then(|i| state.epochs.get(i as usize))
        else {
            return Err(AuditorError::NotSynced {
                epoch,
                start: state.start,
                end,
            });
        };
        Ok(AuditorGetReply {
            link: att.link,
            serv_link_sig: att.serv_sig,
            adtr_link_sig: att.adtr_sig,
            vrf_pk: self.server.vrf_pk,
            serv_vrf_sig: self.server.vrf_sig,
            adtr_vrf_sig: self.adtr_vrf_sig,
        })
    }

    /// Poll the server forever. Failures are logged and retried next tick.
    pub async fn run(&self) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match self.update().await {
                Ok(0) => {}
                Ok(n) => trace!(epochs = n, "auditor caught up"),
                Err(AuditorError::Call(e)) => debug!(error = %e, "server unreachable"),
                Err(e) => warn!(error = %e, "auditor update failed"),
            }
        }
    }
}
