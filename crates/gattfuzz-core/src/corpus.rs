//! Adversarial payload corpus
//!
//! Every entry targets a different boundary class. Only the `RandomFill` entry
//! changes between generations; its size and position are fixed.

use std::fmt;

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const ASCENDING_LEN: u8 = 20;
const UNIFORM_SHORT_LEN: usize = 20;
const UNIFORM_LARGE_LEN: usize = 512;
const RANDOM_FILL_LEN: usize = 512;
const ALTERNATING_REPEATS: usize = 10;
const OVERSIZED_LEN: usize = 1000;

// ----------------------------------------------------------------------------
// Payloads
// ----------------------------------------------------------------------------

/// Boundary class a payload belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadClass {
    /// Zero-length write
    Empty,
    /// Single `0x00`
    MinByte,
    /// Single `0xFF`
    MaxByte,
    /// `0x00..0x14`
    AscendingRun,
    /// 20 x `0xFF`
    UniformShort,
    /// 512 x `0x00`
    UniformLarge,
    /// 512 random bytes
    RandomFill,
    /// `00 FF` repeated
    Alternating,
    /// 1000 x `0xAA`, larger than any link-layer MTU
    Oversized,
}

impl fmt::Display for PayloadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PayloadClass::Empty => "empty",
            PayloadClass::MinByte => "min-byte",
            PayloadClass::MaxByte => "max-byte",
            PayloadClass::AscendingRun => "ascending-run",
            PayloadClass::UniformShort => "uniform-short",
            PayloadClass::UniformLarge => "uniform-large",
            PayloadClass::RandomFill => "random-fill",
            PayloadClass::Alternating => "alternating",
            PayloadClass::Oversized => "oversized",
        };
        f.write_str(name)
    }
}

/// One immutable corpus entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    class: PayloadClass,
    bytes: Vec<u8>,
}

impl Payload {
    fn new(class: PayloadClass, bytes: Vec<u8>) -> Self {
        Self { class, bytes }
    }

    pub fn class(&self) -> PayloadClass {
        self.class
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Corpus
// ----------------------------------------------------------------------------

/// The fixed, ordered set of payloads used by write-fuzz
#[derive(Debug, Clone)]
pub struct Corpus {
    payloads: Vec<Payload>,
}

impl Corpus {
    pub fn payloads(&self) -> &[Payload] {
        &self.payloads
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    /// Uniform pick with replacement
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Payload> {
        self.payloads.choose(rng)
    }

    /// Entry of a given class
    pub fn get(&self, class: PayloadClass) -> Option<&Payload> {
        self.payloads.iter().find(|p| p.class == class)
    }
}

/// Build the corpus, drawing the random-fill entry from `rng`
pub fn generate_payloads<R: Rng + ?Sized>(rng: &mut R) -> Corpus {
    let mut random_fill = vec![0u8; RANDOM_FILL_LEN];
    rng.fill(random_fill.as_mut_slice());

    let payloads = vec![
        Payload::new(PayloadClass::Empty, Vec::new()),
        Payload::new(PayloadClass::MinByte, vec![0x00]),
        Payload::new(PayloadClass::MaxByte, vec![0xFF]),
        Payload::new(PayloadClass::AscendingRun, (0..ASCENDING_LEN).collect()),
        Payload::new(PayloadClass::UniformShort, vec![0xFF; UNIFORM_SHORT_LEN]),
        Payload::new(PayloadClass::UniformLarge, vec![0x00; UNIFORM_LARGE_LEN]),
        Payload::new(PayloadClass::RandomFill, random_fill),
        Payload::new(PayloadClass::Alternating, [0x00, 0xFF].repeat(ALTERNATING_REPEATS)),
        Payload::new(PayloadClass::Oversized, vec![0xAA; OVERSIZED_LEN]),
    ];

    Corpus { payloads }
}

/// Payload RNG: reproducible with a seed, entropy-seeded otherwise
pub fn payload_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}
