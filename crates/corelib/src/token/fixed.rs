//! Fixed-width unsigned tokens.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::token::traits::Token;

macro_rules! fixed_width_token {
    ($(#[$meta:meta])* $name:ident, $repr:ty) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $repr);

        impl Token for $name {
            const BITS: u32 = <$repr>::BITS;

            fn is_zero(&self) -> bool {
                self.0 == 0
            }

            fn distance_to(&self, other: &Self) -> Self {
                $name(other.0.wrapping_sub(self.0))
            }

            fn as_u64(&self) -> u64 {
                u64::from(self.0)
            }
        }

        impl From<$repr> for $name {
            fn from(value: $repr) -> Self {
                $name(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:0width$x}", self.0, width = (<$repr>::BITS / 4) as usize)
            }
        }
    };
}

fixed_width_token!(
    /// 32-bit token, the width of a CRC-32 checksum.
    Token32,
    u32
);

fixed_width_token!(
    /// 64-bit token for wider hash functions.
    Token64,
    u64
);
