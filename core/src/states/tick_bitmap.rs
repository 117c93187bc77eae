//! Packed tick initialized state.
//!
//! Stores a mapping from 16 bit word positions to 256 bit words, where
//! each bit is the initialized flag of one spaced tick. All tick values
//! fit within 24 bits, so dividing by the tick spacing and splitting the
//! result into a high i16 key and a low 8 bit position addresses every
//! usable tick.

use std::collections::BTreeMap;

use crate::error::ErrorCode;
use crate::libraries::big_num::U256;
use crate::libraries::bit_math;

/// The word-packed set of initialized ticks. Words with no set bit are
/// not stored.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct TickBitmap {
    words: BTreeMap<i16, U256>,
}

/// Computes the word and bit position for a tick divided by the spacing.
fn position(tick_by_spacing: i32) -> (i16, u8) {
    (
        (tick_by_spacing >> 8) as i16,
        // begins with 255 for negative numbers
        (tick_by_spacing % 256) as u8,
    )
}

/// Divides a tick by the spacing, rounding toward negative infinity.
fn compress(tick: i32, tick_spacing: u16) -> i32 {
    let spacing = tick_spacing as i32;
    let mut compressed = tick / spacing;
    if tick < 0 && tick % spacing != 0 {
        compressed -= 1;
    }
    compressed
}

impl TickBitmap {
    /// Flips the initialized state for the given tick from false to
    /// true, or vice versa.
    ///
    /// # Arguments
    ///
    /// * `tick` - The tick to flip; must be a multiple of the spacing
    /// * `tick_spacing` - The spacing of usable ticks
    ///
    pub fn flip_tick(&mut self, tick: i32, tick_spacing: u16) -> Result<(), ErrorCode> {
        if tick % tick_spacing as i32 != 0 {
            return Err(ErrorCode::TickNotSpaced);
        }
        let (word_pos, bit_pos) = position(tick / tick_spacing as i32);
        let mask = U256::from(1) << bit_pos;
        let word = self.words.entry(word_pos).or_default();
        *word = *word ^ mask;
        if word.is_zero() {
            self.words.remove(&word_pos);
        }
        Ok(())
    }

    /// Returns the next initialized tick contained in the same word as
    /// the tick that is either to the left (less than or equal to) or
    /// right (greater than) of the given tick, along with whether that
    /// tick is initialized. On a miss the word's boundary tick is
    /// returned with `initialized = false`, so a caller loops by
    /// re-querying from the returned tick and consumes at most 256
    /// spaced ticks per call.
    ///
    /// # Arguments
    ///
    /// * `tick` - The starting tick
    /// * `tick_spacing` - The spacing of usable ticks
    /// * `lte` - Whether to search to the left (lte the starting tick)
    ///
    pub fn next_initialized_tick_within_one_word(
        &self,
        tick: i32,
        tick_spacing: u16,
        lte: bool,
    ) -> (i32, bool) {
        let spacing = tick_spacing as i32;
        let compressed = compress(tick, tick_spacing);

        if lte {
            let (word_pos, bit_pos) = position(compressed);
            // all the 1s at or to the right of the current bit_pos
            let mask = (U256::from(1) << bit_pos) - 1 + (U256::from(1) << bit_pos);
            let masked = self.word(word_pos) & mask;
            let initialized = !masked.is_zero();

            // on a miss, return the rightmost bit of the word
            let next = if initialized {
                (compressed - (bit_pos - bit_math::most_significant_bit(masked)) as i32) * spacing
            } else {
                (compressed - bit_pos as i32) * spacing
            };
            (next, initialized)
        } else {
            // start from the word of the next tick, since the current
            // tick state does not matter when searching upward
            let (word_pos, bit_pos) = position(compressed + 1);
            // all the 1s at or to the left of the bit_pos
            let mask = !((U256::from(1) << bit_pos) - 1);
            let masked = self.word(word_pos) & mask;
            let initialized = !masked.is_zero();

            // on a miss, return the leftmost bit of the word
            let next = if initialized {
                (compressed + 1 + (bit_math::least_significant_bit(masked) - bit_pos) as i32)
                    * spacing
            } else {
                (compressed + 1 + (u8::MAX - bit_pos) as i32) * spacing
            };
            (next, initialized)
        }
    }

    /// Whether the bit for the given tick is set.
    pub fn is_initialized(&self, tick: i32, tick_spacing: u16) -> bool {
        let (next, initialized) =
            self.next_initialized_tick_within_one_word(tick, tick_spacing, true);
        next == tick && initialized
    }

    fn word(&self, word_pos: i16) -> U256 {
        self.words.get(&word_pos).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap_with(ticks: &[i32]) -> TickBitmap {
        let mut bitmap = TickBitmap::default();
        for tick in ticks {
            bitmap.flip_tick(*tick, 1).unwrap();
        }
        bitmap
    }

    mod flip_tick {
        use super::*;

        #[test]
        fn is_false_at_first() {
            let bitmap = TickBitmap::default();
            assert!(!bitmap.is_initialized(1, 1));
        }

        #[test]
        fn is_flipped_by_flip_tick() {
            let bitmap = bitmap_with(&[1]);
            assert!(bitmap.is_initialized(1, 1));
        }

        #[test]
        fn is_flipped_back_by_second_flip() {
            let mut bitmap = bitmap_with(&[1]);
            bitmap.flip_tick(1, 1).unwrap();
            assert!(!bitmap.is_initialized(1, 1));
            // a word with no set bit is dropped entirely
            assert!(bitmap.words.is_empty());
        }

        #[test]
        fn is_not_changed_by_another_flip_to_a_different_tick() {
            let bitmap = bitmap_with(&[2]);
            assert!(!bitmap.is_initialized(1, 1));
        }

        #[test]
        fn flips_only_the_specified_tick() {
            let mut bitmap = bitmap_with(&[-230]);
            assert!(bitmap.is_initialized(-230, 1));
            assert!(!bitmap.is_initialized(-231, 1));
            assert!(!bitmap.is_initialized(-229, 1));
            assert!(!bitmap.is_initialized(-230 + 256, 1));
            assert!(!bitmap.is_initialized(-230 - 256, 1));

            bitmap.flip_tick(-230, 1).unwrap();
            assert!(!bitmap.is_initialized(-230, 1));
        }

        #[test]
        fn rejects_unspaced_ticks() {
            let mut bitmap = TickBitmap::default();
            assert_eq!(bitmap.flip_tick(5, 3), Err(ErrorCode::TickNotSpaced));
            assert_eq!(bitmap.flip_tick(-5, 3), Err(ErrorCode::TickNotSpaced));
            assert!(bitmap.flip_tick(-6, 3).is_ok());
        }

        #[test]
        fn respects_tick_spacing_in_bit_positions() {
            let mut bitmap = TickBitmap::default();
            bitmap.flip_tick(-600, 60).unwrap();
            assert!(bitmap.is_initialized(-600, 60));
            assert!(!bitmap.is_initialized(-660, 60));
            assert!(!bitmap.is_initialized(-540, 60));
        }
    }

    mod next_initialized_tick_gt {
        use super::*;

        #[test]
        fn returns_tick_to_right_if_at_initialized_tick() {
            let bitmap = bitmap_with(&[-200, -55, -4, 70, 78, 84, 139, 240, 535]);
            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(78, 1, false);
            assert!(initialized);
            assert_eq!(next, 84);
        }

        #[test]
        fn returns_the_next_words_initialized_tick_if_on_the_right_boundary() {
            let bitmap = bitmap_with(&[-200, -55, -4, 70, 78, 84, 139, 240, 535]);
            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(255, 1, false);
            assert!(!initialized);
            assert_eq!(next, 511);

            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(-257, 1, false);
            assert!(initialized);
            assert_eq!(next, -200);
        }

        #[test]
        fn does_not_exceed_boundary_if_no_initialized_bit() {
            let bitmap = bitmap_with(&[-200, -55, -4, 70, 78, 84, 139, 240, 535]);
            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(508, 1, false);
            assert!(!initialized);
            assert_eq!(next, 511);
        }

        #[test]
        fn finds_the_first_bit_of_the_next_word() {
            let bitmap = bitmap_with(&[-200, -55, -4, 70, 78, 84, 139, 240, 535]);
            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(511, 1, false);
            assert!(initialized);
            assert_eq!(next, 535);
        }

        #[test]
        fn honors_tick_spacing() {
            let mut bitmap = TickBitmap::default();
            bitmap.flip_tick(120, 60).unwrap();
            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(0, 60, false);
            assert!(initialized);
            assert_eq!(next, 120);
        }
    }

    mod next_initialized_tick_lte {
        use super::*;

        #[test]
        fn returns_same_tick_if_initialized() {
            let bitmap = bitmap_with(&[-200, -55, -4, 70, 78, 84, 139, 240, 535]);
            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(78, 1, true);
            assert!(initialized);
            assert_eq!(next, 78);
        }

        #[test]
        fn returns_tick_directly_to_the_left_if_not_initialized() {
            let bitmap = bitmap_with(&[-200, -55, -4, 70, 78, 84, 139, 240, 535]);
            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(79, 1, true);
            assert!(initialized);
            assert_eq!(next, 78);
        }

        #[test]
        fn will_not_exceed_the_word_boundary() {
            let bitmap = bitmap_with(&[-200, -55, -4, 70, 78, 84, 139, 240, 535]);
            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(258, 1, true);
            assert!(!initialized);
            assert_eq!(next, 256);
        }

        #[test]
        fn at_the_word_boundary() {
            let bitmap = bitmap_with(&[-200, -55, -4, 70, 78, 84, 139, 240, 535]);
            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(256, 1, true);
            assert!(!initialized);
            assert_eq!(next, 256);
        }

        #[test]
        fn word_boundary_in_negative_space() {
            let bitmap = bitmap_with(&[-200, -55, -4, 70, 78, 84, 139, 240, 535]);
            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(-257, 1, true);
            assert!(!initialized);
            assert_eq!(next, -512);
        }

        #[test]
        fn entire_empty_word() {
            let bitmap = bitmap_with(&[-200, -55, -4, 70, 78, 84, 139, 240, 535]);
            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(1023, 1, true);
            assert!(!initialized);
            assert_eq!(next, 768);
        }

        #[test]
        fn negative_unspaced_ticks_compress_toward_negative_infinity() {
            let mut bitmap = TickBitmap::default();
            bitmap.flip_tick(-300, 60).unwrap();
            // -290 compresses to word of -300, not -240
            let (next, initialized) = bitmap.next_initialized_tick_within_one_word(-290, 60, true);
            assert!(initialized);
            assert_eq!(next, -300);
        }
    }
}
