use derive_more::{Add, AddAssign, Sub, SubAssign};

/// Resolution of the system time base.
pub const TIMER_TICK_US: u32 = 1000; // 1 ms per tick.

macro_rules! impl_timestamp {
    ($rel:ident, $abs:ident, $reltype:ty, $abstype:ty) => {
        /// Absolute point in time. Wraps around.
        #[derive(PartialEq, Eq, Copy, Clone, Debug)]
        pub struct $abs(pub $abstype);

        impl $abs {
            #[inline]
            pub const fn new() -> Self {
                $abs(0)
            }

            #[inline]
            pub const fn from_ticks(ticks: $abstype) -> Self {
                $abs(ticks)
            }

            #[inline]
            pub const fn from_millis(ms: u32) -> $abs {
                $abs(((ms as u64 * 1000) / TIMER_TICK_US as u64) as $abstype)
            }
        }

        impl Default for $abs {
            #[inline]
            fn default() -> Self {
                Self::new()
            }
        }

        impl Ord for $abs {
            #[inline]
            fn cmp(&self, other: &Self) -> core::cmp::Ordering {
                if self.0 == other.0 {
                    core::cmp::Ordering::Equal
                } else if self.0.wrapping_sub(other.0) & (1 << (<$abstype>::BITS - 1)) == 0 {
                    core::cmp::Ordering::Greater
                } else {
                    core::cmp::Ordering::Less
                }
            }
        }

        impl PartialOrd for $abs {
            #[inline]
            fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl core::ops::Add<$rel> for $abs {
            type Output = Self;

            #[inline]
            fn add(self, other: $rel) -> Self::Output {
                $abs(self.0.wrapping_add(other.0 as $abstype))
            }
        }

        impl core::ops::Sub for $abs {
            type Output = $rel;

            #[inline]
            fn sub(self, other: Self) -> Self::Output {
                $rel(self.0.wrapping_sub(other.0) as $reltype)
            }
        }

        /// Signed distance between two points in time.
        #[derive(PartialEq, Eq, Copy, Clone, PartialOrd, Ord, Debug, Default)]
        #[derive(Add, Sub, AddAssign, SubAssign)]
        pub struct $rel(pub $reltype);

        impl $rel {
            #[inline]
            pub const fn from_ticks(ticks: $reltype) -> Self {
                $rel(ticks)
            }

            #[inline]
            pub const fn from_millis(ms: i32) -> $rel {
                $rel(((ms as i64 * 1000) / TIMER_TICK_US as i64) as $reltype)
            }

            #[inline]
            pub const fn from_secs(secs: i32) -> $rel {
                Self::from_millis(secs.saturating_mul(1000))
            }

            #[inline]
            pub const fn as_millis(self) -> i64 {
                (self.0 as i64 * TIMER_TICK_US as i64) / 1000
            }
        }
    };
}

impl_timestamp!(RelTimestamp, Timestamp, i32, u32);


// vim: ts=4 sw=4 expandtab
