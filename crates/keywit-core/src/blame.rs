//! Which parties may be at fault when something goes wrong.

use std::fmt;

/// A party that could be responsible for a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Party {
    /// The server's signing key alone. Irrefutable evidence implicates only this.
    ServerSig = 0,
    /// The server's full RPC behavior, a superset of `ServerSig`.
    ServerFull = 1,
    AuditorSig = 2,
    AuditorFull = 3,
    /// Other clients sharing the uid.
    Clients = 4,
    /// Unattributable, e.g. a network failure.
    Unknown = 5,
}

impl Party {
    const ALL: [Party; 6] = [
        Party::ServerSig,
        Party::ServerFull,
        Party::AuditorSig,
        Party::AuditorFull,
        Party::Clients,
        Party::Unknown,
    ];

    fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// A set of [`Party`] tags.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Suspects(u8);

impl Suspects {
    pub const NONE: Suspects = Suspects(0);

    pub fn of(parties: &[Party]) -> Self {
        parties.iter().fold(Self::NONE, |s, p| s.with(*p))
    }

    pub fn with(self, party: Party) -> Self {
        Self(self.0 | party.bit())
    }

    pub fn contains(&self, party: Party) -> bool {
        self.0 & party.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether every suspect here is also in `allowed`.
    pub fn is_within(&self, allowed: Suspects) -> bool {
        self.0 & !allowed.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Party> + '_ {
        Party::ALL.into_iter().filter(|p| self.contains(*p))
    }
}

impl From<Party> for Suspects {
    fn from(p: Party) -> Self {
        Self::NONE.with(p)
    }
}

impl fmt::Debug for Suspects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for Suspects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<String> = self.iter().map(|p| format!("{p:?}")).collect();
        f.write_str(&names.join("|"))
    }
}
