//! Tests for the key transparency server.


use keywit_core::sig::verify_link_sig;
use keywit_core::verify::{check_memb, check_non_memb};
use keywit_core::{Secrets, SigDig};
use keywit_types::Uid;

use crate::config::ServerConfig;
use crate::server::Server;
use crate::workq::PutOutcome;

fn test_server(seed: u8) -> Server {
    Server::new(Secrets::from_seed(&[seed; 32]), ServerConfig::default()).unwrap()
}

fn key_for(uid: Uid, ver: u64) -> Vec<u8> {
    format!("pk-{uid}-{ver}").into_bytes()
}

/// Check every proof a put outcome carries against the server's keys.
fn assert_outcome_valid(server: &Server, uid: Uid, ver: u64, out: &PutOutcome) {
    let SigDig {
        epoch,
        dig,
        link,
        sig,
    } = out.sig_dig;
    verify_link_sig(&server.public_key(), epoch, &link, &sig).unwrap();
    check_memb(&server.vrf_public_key(), uid, ver, &dig, &out.memb).unwrap();
    check_non_memb(&server.vrf_public_key(), uid, ver + 1, &dig, &out.bound).unwrap();
    assert_eq!(out.memb.epoch_added, epoch);
    assert_eq!(out.memb.pk_open.pk, key_for(uid, ver));
}
