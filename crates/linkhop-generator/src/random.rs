use crate::{CodeGenerator, RandomSourceError};
use linkhop_core::shortcode::{ALPHABET, MAX_LENGTH, MIN_LENGTH};
use linkhop_core::ShortCode;
use parking_lot::Mutex;
use rand::rngs::{OsRng, StdRng};
use rand::{CryptoRng, RngCore, SeedableRng};

/// Largest multiple of 62 that fits in a byte. Bytes at or above it are
/// rejected so every alphabet index is equally likely.
const REJECTION_BOUND: u8 = (u8::MAX / ALPHABET.len() as u8) * ALPHABET.len() as u8;

/// Picks every character independently and uniformly from the 62-character
/// alphabet, giving 62^length possible codes.
///
/// The random source is owned by the generator instead of being process
/// global: production uses [`RandomCodeGenerator::os`], tests can use
/// [`RandomCodeGenerator::seeded`] for reproducible sequences.
pub struct RandomCodeGenerator<R> {
    rng: Mutex<R>,
}

impl RandomCodeGenerator<OsRng> {
    /// Generator backed by the operating system's entropy source.
    pub fn os() -> Self {
        Self::new(OsRng)
    }
}

impl RandomCodeGenerator<StdRng> {
    /// Deterministic generator for tests.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: RngCore + CryptoRng + Send + 'static> RandomCodeGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    fn fill(&self, length: usize) -> Result<String, RandomSourceError> {
        let mut code = String::with_capacity(length);
        let mut buf = vec![0_u8; length * 2];
        let mut rng = self.rng.lock();

        while code.len() < length {
            rng.try_fill_bytes(&mut buf)
                .map_err(|e| RandomSourceError::Entropy(e.to_string()))?;

            for byte in buf.iter().copied().filter(|b| *b < REJECTION_BOUND) {
                code.push(ALPHABET[byte as usize % ALPHABET.len()] as char);
                if code.len() == length {
                    break;
                }
            }
        }

        Ok(code)
    }
}

impl<R: RngCore + CryptoRng + Send + 'static> CodeGenerator for RandomCodeGenerator<R> {
    fn generate(&self, length: usize) -> Result<ShortCode, RandomSourceError> {
        if !(MIN_LENGTH..=MAX_LENGTH).contains(&length) {
            return Err(RandomSourceError::InvalidLength {
                length,
                min: MIN_LENGTH,
                max: MAX_LENGTH,
            });
        }

        let code = self.fill(length)?;
        Ok(ShortCode::new_unchecked(code))
    }
}
