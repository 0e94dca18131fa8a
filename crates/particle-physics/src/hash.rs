//! Stateless index hash
//!
//! PCG-style integer hash mapped to `[0, 1)`. The WGSL kernels carry the same
//! function (`shaders/common.wgsl` in `particle-simulation`); the final value is
//! built from the top 24 bits so the float conversion is exact on both sides.

/// Hash a particle index to a float in `[0, 1)`.
pub fn hash(seed: u32) -> f32 {
    let state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    let word = ((state >> ((state >> 28) + 4)) ^ state).wrapping_mul(277_803_737);
    let result = (word >> 22) ^ word;
    (result >> 8) as f32 / 16_777_216.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        for i in [0, 1, 2, 1_000, 199_999, u32::MAX] {
            assert_eq!(hash(i), hash(i));
        }
    }

    #[test]
    fn test_hash_range() {
        for i in 0..10_000 {
            let h = hash(i);
            assert!((0.0..1.0).contains(&h), "hash({i}) = {h}");
        }
        assert!(hash(u32::MAX) < 1.0);
    }

    #[test]
    fn test_hash_spreads_neighbours() {
        // Adjacent indices should not land in the same bucket pattern.
        let mut buckets = [0u32; 10];
        for i in 0..10_000u32 {
            buckets[(hash(i) * 10.0) as usize] += 1;
        }
        for count in buckets {
            assert!(count > 800 && count < 1200, "bucket count {count}");
        }
    }
}
