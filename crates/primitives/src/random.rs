use alloy_primitives::{B256, keccak256};

/// A generator of pseudo-random hashes. Every value is the Keccak-256 hash
/// of the previous one, so sequences are reproducible from their seed.
#[derive(Clone, Debug)]
pub struct RandomHashGenerator {
    next_value: B256,
}

impl RandomHashGenerator {
    /// Constructs an instance with the provided seed.
    pub fn with_seed(seed: impl AsRef<[u8]>) -> Self {
        Self {
            next_value: keccak256(seed),
        }
    }

    /// Constructs an instance seeded from the operating system's entropy.
    pub fn with_random_seed() -> Self {
        Self::with_seed(B256::random())
    }

    /// Constructs an instance that will return the provided value next.
    pub fn with_value(next_value: B256) -> Self {
        Self { next_value }
    }

    /// Returns the next value in the sequence.
    pub fn next_value(&mut self) -> B256 {
        let value = self.next_value;
        self.next_value = keccak256(value);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_reproducible() {
        let mut first = RandomHashGenerator::with_seed("seed");
        let mut second = RandomHashGenerator::with_seed("seed");

        let a = first.next_value();
        let b = first.next_value();
        assert_ne!(a, b);

        assert_eq!(second.next_value(), a);
        assert_eq!(second.next_value(), b);
    }

    #[test]
    fn with_value_returns_value_first() {
        let value = B256::repeat_byte(0x11);
        let mut generator = RandomHashGenerator::with_value(value);

        assert_eq!(generator.next_value(), value);
        assert_eq!(generator.next_value(), keccak256(value));
    }
}
