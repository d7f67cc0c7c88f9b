// ============================================================================
// Rational Exponents
// Exact exponents for derived-unit factors (m^2, s^-1, m^1/2)
// ============================================================================

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Exact rational exponent, always stored in lowest terms with a positive
/// denominator.
///
/// Integer exponents are by far the common case; fractional ones appear when
/// taking roots (`sqrt` of an area is a length).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Exponent {
    num: i32,
    den: i32,
}

const fn gcd(mut a: i32, mut b: i32) -> i32 {
    if a < 0 {
        a = -a;
    }
    if b < 0 {
        b = -b;
    }
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a
}

impl Exponent {
    /// Zero exponent (factor vanishes)
    pub const ZERO: Self = Self { num: 0, den: 1 };

    /// Unit exponent
    pub const ONE: Self = Self { num: 1, den: 1 };

    /// Create a reduced exponent. Returns `None` for a zero denominator.
    pub fn new(num: i32, den: i32) -> Option<Self> {
        if den == 0 {
            return None;
        }
        let g = gcd(num, den).max(1);
        let sign = if den < 0 { -1 } else { 1 };
        Some(Self {
            num: sign * num / g,
            den: sign * den / g,
        })
    }

    /// Integer exponent
    #[inline]
    pub const fn integer(n: i32) -> Self {
        Self { num: n, den: 1 }
    }

    #[inline]
    pub const fn numerator(self) -> i32 {
        self.num
    }

    #[inline]
    pub const fn denominator(self) -> i32 {
        self.den
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.num == 0
    }

    #[inline]
    pub const fn is_integer(self) -> bool {
        self.den == 1
    }

    #[inline]
    pub fn as_f64(self) -> f64 {
        f64::from(self.num) / f64::from(self.den)
    }

    fn reduced(num: i64, den: i64) -> Self {
        // Unit exponents stay tiny; saturate rather than wrap on absurd input.
        let clamp = |v: i64| v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        Self::new(clamp(num), clamp(den)).unwrap_or(Self::ZERO)
    }
}

impl Default for Exponent {
    #[inline]
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for Exponent {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let num =
            i64::from(self.num) * i64::from(rhs.den) + i64::from(rhs.num) * i64::from(self.den);
        let den = i64::from(self.den) * i64::from(rhs.den);
        Self::reduced(num, den)
    }
}

impl Sub for Exponent {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Neg for Exponent {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            num: -self.num,
            den: self.den,
        }
    }
}

impl Mul for Exponent {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::reduced(
            i64::from(self.num) * i64::from(rhs.num),
            i64::from(self.den) * i64::from(rhs.den),
        )
    }
}

impl PartialOrd for Exponent {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Exponent {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = i64::from(self.num) * i64::from(other.den);
        lhs.cmp(&(i64::from(other.num) * i64::from(self.den)))
    }
}

impl From<i32> for Exponent {
    #[inline]
    fn from(n: i32) -> Self {
        Self::integer(n)
    }
}

impl fmt::Display for Exponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}
