//! Key material sources.
//!
//! Every random byte the engine consumes (hello randoms, ephemeral seeds, KEM
//! coins, identity keys) is drawn through [`KeySource`]. Production runs use
//! [`SystemKeys`]; tests and replays use [`FixedKeys`] so a run is a pure
//! function of its seed and overrides.

use std::collections::BTreeMap;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

use crate::event::Side;

/// What a requested buffer is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyPurpose {
    /// 32-byte `random` field of a hello message
    HelloRandom,
    /// Seed for the ephemeral key exchange key pair
    Ephemeral,
    /// Coins for KEM encapsulation
    Encapsulation,
    /// Seed for the long-term signing key
    Identity,
}

/// Source of secret and random bytes for one session.
///
/// # Invariants
///
/// - Given the same seed and overrides, the same sequence of requests yields
///   the same bytes
/// - `fill` never fails; a source that cannot produce entropy must panic
pub trait KeySource {
    /// Fill `buffer` with bytes for `purpose` on `side`.
    fn fill(&mut self, side: Side, purpose: KeyPurpose, buffer: &mut [u8]);
}

/// OS randomness. Not reproducible.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemKeys;

impl KeySource for SystemKeys {
    #[allow(clippy::expect_used)]
    fn fill(&mut self, _side: Side, _purpose: KeyPurpose, buffer: &mut [u8]) {
        getrandom::fill(buffer)
            .expect("invariant: OS RNG failure is unrecoverable - keys cannot be generated");
    }
}

/// Seeded, reproducible key source with per-slot overrides.
///
/// An override replaces every request for its `(side, purpose)` slot. When the
/// requested buffer is longer than the override bytes, they are repeated.
#[derive(Debug, Clone)]
pub struct FixedKeys {
    seed: u64,
    rng: ChaCha20Rng,
    overrides: BTreeMap<(Side, KeyPurpose), Vec<u8>>,
}

impl FixedKeys {
    /// Source seeded with `seed`.
    pub fn from_seed(seed: u64) -> Self {
        Self { seed, rng: ChaCha20Rng::seed_from_u64(seed), overrides: BTreeMap::new() }
    }

    /// Force the bytes returned for one slot. Empty overrides are ignored.
    #[must_use]
    pub fn with_override(
        mut self,
        side: Side,
        purpose: KeyPurpose,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        let bytes = bytes.into();
        if !bytes.is_empty() {
            self.overrides.insert((side, purpose), bytes);
        }
        self
    }

    /// Seed this source was created with.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Same seed and overrides, with the generator rewound to the start.
    #[must_use]
    pub fn rewound(&self) -> Self {
        Self {
            seed: self.seed,
            rng: ChaCha20Rng::seed_from_u64(self.seed),
            overrides: self.overrides.clone(),
        }
    }
}

impl KeySource for FixedKeys {
    fn fill(&mut self, side: Side, purpose: KeyPurpose, buffer: &mut [u8]) {
        match self.overrides.get(&(side, purpose)) {
            Some(bytes) => {
                for (slot, byte) in buffer.iter_mut().zip(bytes.iter().cycle()) {
                    *slot = *byte;
                }
            },
            None => self.rng.fill_bytes(buffer),
        }
    }
}
