//! Built-in [`CommandState`] implementations.
//!
//! Scalars use the full-overwrite policy: the diff is the new value.
//! [`ActionMask`] shows a compact custom diff (XOR of the two masks).

use crate::delta::CommandState;
use crate::error::StreamError;
use crate::stream::{self, ByteReader, ByteWriter};

macro_rules! overwrite_state {
    ($($ty:ty => $write:path, $read:path;)*) => {
        $(
            impl CommandState for $ty {
                type Diff = $ty;

                fn compute_diff(previous: &Self, next: &Self) -> Option<Self::Diff> {
                    (!previous.same_state(next)).then_some(*next)
                }

                fn apply_diff(&mut self, diff: &Self::Diff) {
                    *self = *diff;
                }

                fn encode_diff(
                    diff: &Self::Diff,
                    w: &mut dyn ByteWriter,
                ) -> Result<(), StreamError> {
                    $write(w, *diff)
                }

                fn decode_diff(r: &mut dyn ByteReader) -> Result<Self::Diff, StreamError> {
                    $read(r)
                }
            }
        )*
    };
}

overwrite_state! {
    bool => stream::write_bool, stream::read_bool;
    u8 => stream::write_u8, stream::read_u8;
    u16 => stream::write_u16_le, stream::read_u16_le;
    u32 => stream::write_u32_le, stream::read_u32_le;
    u64 => stream::write_u64_le, stream::read_u64_le;
    i32 => stream::write_i32_le, stream::read_i32_le;
    i64 => stream::write_i64_le, stream::read_i64_le;
}

// Compared by bit pattern so NaN states settle instead of re-notifying
// on every frame, and -0.0 vs 0.0 is recorded as a change.
impl CommandState for f32 {
    type Diff = f32;

    fn compute_diff(previous: &Self, next: &Self) -> Option<Self::Diff> {
        (!previous.same_state(next)).then_some(*next)
    }

    fn apply_diff(&mut self, diff: &Self::Diff) {
        *self = *diff;
    }

    fn encode_diff(diff: &Self::Diff, w: &mut dyn ByteWriter) -> Result<(), StreamError> {
        stream::write_f32_le(w, *diff)
    }

    fn decode_diff(r: &mut dyn ByteReader) -> Result<Self::Diff, StreamError> {
        stream::read_f32_le(r)
    }

    fn same_state(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

/// A bitset of simultaneously held actions.
///
/// # Examples
///
/// ```
/// use reel_core::ActionMask;
///
/// let mask = ActionMask::default().with(0, true).with(3, true);
/// assert!(mask.contains(3));
/// assert!(!mask.contains(1));
/// assert_eq!(mask.with(0, false), ActionMask(0b1000));
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ActionMask(pub u32);

impl ActionMask {
    /// Whether action `bit` is held. Bits at or above 32 are never held.
    pub fn contains(self, bit: u32) -> bool {
        bit < 32 && self.0 & (1 << bit) != 0
    }

    /// This mask with action `bit` set or cleared.
    pub fn with(self, bit: u32, held: bool) -> Self {
        if bit >= 32 {
            return self;
        }
        if held {
            Self(self.0 | (1 << bit))
        } else {
            Self(self.0 & !(1 << bit))
        }
    }
}

impl CommandState for ActionMask {
    /// Bits that flipped.
    type Diff = u32;

    fn compute_diff(previous: &Self, next: &Self) -> Option<Self::Diff> {
        let flipped = previous.0 ^ next.0;
        (flipped != 0).then_some(flipped)
    }

    fn apply_diff(&mut self, diff: &Self::Diff) {
        self.0 ^= *diff;
    }

    fn encode_diff(diff: &Self::Diff, w: &mut dyn ByteWriter) -> Result<(), StreamError> {
        stream::write_u32_le(w, *diff)
    }

    fn decode_diff(r: &mut dyn ByteReader) -> Result<Self::Diff, StreamError> {
        stream::read_u32_le(r)
    }
}
