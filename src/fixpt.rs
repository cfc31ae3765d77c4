/// Saturating fixed point number with 8 fractional bits.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, Default)]
pub struct Fixpt(i32);

macro_rules! fixpt {
    ($numerator:literal / $denominator:literal) => {
        $crate::fixpt::Fixpt::from_fraction($numerator, $denominator)
    };
    ($numerator:literal / $denominator:ident) => {
        $crate::fixpt::Fixpt::from_fraction($numerator, $denominator)
    };
    ($numerator:ident / $denominator:literal) => {
        $crate::fixpt::Fixpt::from_fraction($numerator, $denominator)
    };
    ($numerator:ident / $denominator:ident) => {
        $crate::fixpt::Fixpt::from_fraction($numerator, $denominator)
    };
    ($numerator:literal) => {
        $crate::fixpt::Fixpt::from_int($numerator)
    };
    ($numerator:ident) => {
        $crate::fixpt::Fixpt::from_int($numerator)
    };
}
pub(crate) use fixpt;

impl Fixpt {
    pub const SHIFT: usize = 8;
    pub const MAX: Self = Self(i32::MAX);
    pub const MIN: Self = Self(i32::MIN);

    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn from_int(int: i32) -> Self {
        Self::from_q_sat((int as i64) << Self::SHIFT)
    }

    /// Construct `numerator / denominator`.
    ///
    /// A zero denominator saturates towards the sign of the numerator.
    pub const fn from_fraction(numerator: i32, denominator: i32) -> Self {
        if denominator == 0 {
            return Self::saturated(numerator);
        }
        let q = ((numerator as i64) << Self::SHIFT) / denominator as i64;
        Self::from_q_sat(q)
    }

    const fn saturated(sign: i32) -> Self {
        if sign < 0 {
            Self::MIN
        } else if sign > 0 {
            Self::MAX
        } else {
            Self(0)
        }
    }

    const fn from_q_sat(v: i64) -> Self {
        if v < i32::MIN as i64 {
            Self(i32::MIN)
        } else if v > i32::MAX as i64 {
            Self(i32::MAX)
        } else {
            Self(v as i32)
        }
    }

    /// Integer part, truncated towards zero.
    pub const fn to_int(self) -> i32 {
        if self.0 < 0 {
            -(self.0.saturating_neg() >> Self::SHIFT)
        } else {
            self.0 >> Self::SHIFT
        }
    }

    /// Integer part, rounded to the nearest integer.
    pub const fn to_int_round(self) -> i32 {
        let half = 1 << (Self::SHIFT - 1);
        if self.0 < 0 {
            -(self.0.saturating_neg().saturating_add(half) >> Self::SHIFT)
        } else {
            self.0.saturating_add(half) >> Self::SHIFT
        }
    }

    pub const fn to_q(self) -> i32 {
        self.0
    }

    pub const fn add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub const fn sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub const fn mul(self, other: Self) -> Self {
        let prod = (self.0 as i64 * other.0 as i64) >> Self::SHIFT;
        Self::from_q_sat(prod)
    }

    pub const fn div(self, other: Self) -> Self {
        if other.0 == 0 {
            return Self::saturated(self.0);
        }
        let tmp = ((self.0 as i64) << Self::SHIFT) / other.0 as i64;
        Self::from_q_sat(tmp)
    }

    pub const fn neg(self) -> Self {
        Self(self.0.saturating_neg())
    }

    pub const fn abs(self) -> Self {
        if self.0 < 0 { self.neg() } else { self }
    }

    pub fn clamp(self, lo: Self, hi: Self) -> Self {
        self.max(lo).min(hi)
    }
}

impl From<u8> for Fixpt {
    fn from(value: u8) -> Self {
        Self::from_int(value.into())
    }
}

impl From<i16> for Fixpt {
    fn from(value: i16) -> Self {
        Self::from_int(value.into())
    }
}

impl From<u16> for Fixpt {
    fn from(value: u16) -> Self {
        Self::from_int(value.into())
    }
}

impl From<i32> for Fixpt {
    fn from(value: i32) -> Self {
        Self::from_int(value)
    }
}

impl core::ops::Add for Fixpt {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Fixpt::add(self, other)
    }
}

impl core::ops::AddAssign for Fixpt {
    fn add_assign(&mut self, other: Self) {
        self.0 = (*self + other).0;
    }
}

impl core::ops::Sub for Fixpt {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Fixpt::sub(self, other)
    }
}

impl core::ops::SubAssign for Fixpt {
    fn sub_assign(&mut self, other: Self) {
        self.0 = (*self - other).0;
    }
}

impl core::ops::Mul for Fixpt {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Fixpt::mul(self, other)
    }
}

impl core::ops::MulAssign for Fixpt {
    fn mul_assign(&mut self, other: Self) {
        self.0 = (*self * other).0;
    }
}

impl core::ops::Div for Fixpt {
    type Output = Self;

    fn div(self, other: Self) -> Self {
        Fixpt::div(self, other)
    }
}

impl core::ops::DivAssign for Fixpt {
    fn div_assign(&mut self, other: Self) {
        self.0 = (*self / other).0;
    }
}

impl core::ops::Neg for Fixpt {
    type Output = Self;

    fn neg(self) -> Self {
        Fixpt::neg(self)
    }
}

impl curveipo::CurvePoint<Fixpt> for (Fixpt, Fixpt) {
    fn x(&self) -> Fixpt {
        self.0
    }

    fn y(&self) -> Fixpt {
        self.1
    }
}

impl curveipo::CurveIpo for Fixpt {
    fn lin_inter(
        &self,
        left: &impl curveipo::CurvePoint<Self>,
        right: &impl curveipo::CurvePoint<Self>,
    ) -> Self {
        let dx = right.x() - left.x();
        let dy = right.y() - left.y();
        if dx == fixpt!(0) {
            left.y()
        } else {
            ((*self - left.x()) * dy / dx) + left.y()
        }
    }
}


// vim: ts=4 sw=4 expandtab
