use super::RandomImpl;

/// Xoroshiro128++ generator.
pub struct Xoroshiro {
    seed: XoroshiroSeed,
}

impl Xoroshiro {
    fn new(lo: i64, hi: i64) -> Self {
        // An all-zero state would only ever produce zeros.
        if (lo | hi) == 0 {
            return Self {
                seed: XoroshiroSeed {
                    lo: -7046029254386353131i64,
                    hi: 7640891576956012809i64,
                },
            };
        }
        Self {
            seed: XoroshiroSeed { lo, hi },
        }
    }

    fn next_i64(&mut self) -> i64 {
        self.seed.next()
    }

    fn next_bits(&mut self, bits: u64) -> u64 {
        (self.next_i64() as u64) >> (64 - bits)
    }
}

impl RandomImpl for Xoroshiro {
    fn from_seed(seed: u64) -> Self {
        let seed = XoroshiroSeed::mixed_seed(seed as i64);
        Self::new(seed.lo, seed.hi)
    }

    fn next_f64(&mut self) -> f64 {
        // 53 significant bits scaled by 2^-53.
        self.next_bits(53) as f64 * (f64::EPSILON / 2.0)
    }
}

struct XoroshiroSeed {
    lo: i64,
    hi: i64,
}

fn mix_stafford_13(seed: i64) -> i64 {
    let seed = (seed ^ ((seed as u64) >> 30) as i64).wrapping_mul(-4658895280553007687i64);
    let seed = (seed ^ ((seed as u64) >> 27) as i64).wrapping_mul(-7723592293110705685i64);
    seed ^ ((seed as u64) >> 31) as i64
}

impl XoroshiroSeed {
    fn mix(&self) -> Self {
        Self {
            lo: mix_stafford_13(self.lo),
            hi: mix_stafford_13(self.hi),
        }
    }

    fn next(&mut self) -> i64 {
        let l = self.lo;
        let m = self.hi;
        let n = l.wrapping_add(m).rotate_left(17).wrapping_add(l);
        let o = m ^ l;
        self.lo = l.rotate_left(49) ^ o ^ (o << 21);
        self.hi = o.rotate_left(28);
        n
    }

    fn unmixed_seed(seed: i64) -> Self {
        let lo = seed ^ 7640891576956012809i64;
        let hi = lo.wrapping_add(-7046029254386353131i64);
        Self { lo, hi }
    }

    fn mixed_seed(seed: i64) -> Self {
        Self::unmixed_seed(seed).mix()
    }
}
