use crate::core::constants::INTERMEDIATE_COUNT;
use crate::error::{DisperseError, Result};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use std::fmt;

/// Position of an account in a run. Paths and hops are 0-based; the labels
/// are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WalletRole {
    Funding,
    Intermediate { path: usize, hop: usize },
    Landing { path: usize },
}

impl fmt::Display for WalletRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletRole::Funding => write!(f, "Funding Wallet"),
            WalletRole::Intermediate { path, hop } => {
                write!(f, "Proxy {} for Landing Wallet {}", hop + 1, path + 1)
            },
            WalletRole::Landing { path } => write!(f, "Landing Wallet {}", path + 1),
        }
    }
}

/// One chain `funding -> intermediates[0..3] -> landing`.
#[derive(Debug)]
pub struct LandingPath {
    /// Relay accounts, in forwarding order
    pub intermediates: [Keypair; INTERMEDIATE_COUNT],

    /// Terminal account of the path
    pub landing: Keypair,
}

impl LandingPath {
    fn generate() -> Self {
        Self {
            intermediates: std::array::from_fn(|_| Keypair::new()),
            landing: Keypair::new(),
        }
    }

    /// Account that receives the seed transfer
    pub fn entry(&self) -> Pubkey {
        self.intermediates[0].pubkey()
    }

    /// Signer and destination of relay hop `hop` (0-based), `None` past the
    /// last intermediate
    pub fn hop(&self, hop: usize) -> Option<(&Keypair, Pubkey)> {
        let signer = self.intermediates.get(hop)?;
        let next = match self.intermediates.get(hop + 1) {
            Some(kp) => kp.pubkey(),
            None => self.landing.pubkey(),
        };
        Some((signer, next))
    }

    /// Every relay hop in forwarding order
    pub fn hops(&self) -> impl Iterator<Item = (usize, &Keypair, Pubkey)> + '_ {
        (0..INTERMEDIATE_COUNT)
            .filter_map(move |hop| self.hop(hop).map(|(kp, next)| (hop, kp, next)))
    }
}

/// The account hierarchy of a single dispersal run.
///
/// Every keypair is drawn from the OS RNG and lives only in memory.
/// Use [`Run::export_landing_keys`] to hand landing keys to the caller.
#[derive(Debug)]
pub struct Run {
    pub funding: Keypair,
    pub paths: Vec<LandingPath>,
}

impl Run {
    /// Generate a funding account and `path_count` paths
    pub fn generate(path_count: usize) -> Result<Self> {
        if path_count == 0 {
            return Err(DisperseError::AllocationImpossible(
                "at least one landing wallet is required".to_string(),
            ));
        }

        Ok(Self {
            funding: Keypair::new(),
            paths: (0..path_count).map(|_| LandingPath::generate()).collect(),
        })
    }

    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    pub fn funding_address(&self) -> Pubkey {
        self.funding.pubkey()
    }

    pub fn landing_addresses(&self) -> Vec<Pubkey> {
        self.paths.iter().map(|p| p.landing.pubkey()).collect()
    }

    /// All `1 + 4P` addresses: funding first, then per path the intermediates and landing
    pub fn addresses(&self) -> Vec<Pubkey> {
        let mut out = Vec::with_capacity(1 + self.paths.len() * (INTERMEDIATE_COUNT + 1));
        out.push(self.funding.pubkey());
        for path in &self.paths {
            out.extend(path.intermediates.iter().map(|kp| kp.pubkey()));
            out.push(path.landing.pubkey());
        }
        out
    }

    /// Every account of the run: funding first, then per path the
    /// intermediates in forwarding order and the landing account
    pub fn wallets(&self) -> Vec<(WalletRole, &Keypair)> {
        let mut out = Vec::with_capacity(1 + self.paths.len() * (INTERMEDIATE_COUNT + 1));
        out.push((WalletRole::Funding, &self.funding));
        for (path, p) in self.paths.iter().enumerate() {
            for (hop, kp) in p.intermediates.iter().enumerate() {
                out.push((WalletRole::Intermediate { path, hop }, kp));
            }
            out.push((WalletRole::Landing { path }, &p.landing));
        }
        out
    }

    /// Keypair holding `role`, if the run has such an account
    pub fn keypair(&self, role: WalletRole) -> Option<&Keypair> {
        match role {
            WalletRole::Funding => Some(&self.funding),
            WalletRole::Intermediate { path, hop } => {
                self.paths.get(path)?.intermediates.get(hop)
            },
            WalletRole::Landing { path } => self.paths.get(path).map(|p| &p.landing),
        }
    }

    /// Hex encoded 64-byte secret of the account holding `role`
    pub fn secret_key(&self, role: WalletRole) -> Option<String> {
        self.keypair(role).map(|kp| hex::encode(kp.to_bytes()))
    }

    /// Every account as `label<TAB>address<TAB>hex secret`, one per line.
    /// Covers the intermediates too, so stranded funds stay recoverable.
    pub fn export_keys(&self) -> String {
        self.wallets()
            .into_iter()
            .map(|(role, kp)| {
                format!("{}\t{}\t{}", role, kp.pubkey(), hex::encode(kp.to_bytes()))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Landing keypairs as hex encoded 64-byte secrets, one per line
    pub fn export_landing_keys(&self) -> String {
        self.paths
            .iter()
            .map(|p| hex::encode(p.landing.to_bytes()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
