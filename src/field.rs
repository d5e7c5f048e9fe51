//! # Scrolling Text Fields
//!
//! A [`ScrollingField`] owns one piece of text and decides which window of it
//! is visible in a fixed number of display cells. Text that fits is static.
//! Text that overflows either scrolls one character at a time or flips through
//! width-sized pages, depending on the configured [`Motion`].
//!
//! ## Scroll Cycle
//!
//! ```text
//! dwell at start ──► scrolling ──► dwell at end ──► reset to offset 0 ─┐
//!        ▲                                                             │
//!        └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All timing is driven by the `elapsed` value handed to [`ScrollingField::tick`],
//! so the speed does not depend on how often the caller ticks. Fractional
//! progress is kept between ticks.
//!
//! Reaching the end of the text or leaving the end dwell finishes the current
//! tick, so both endpoints stay on screen for at least one frame even with
//! zero dwell durations. The unused part of that tick is charged to the
//! following dwell, which keeps the cycle length at
//! `start_dwell + overflow / rate + end_dwell` for any tick size.

use std::time::Duration;

/// How overflowing text moves.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    /// Slide one character at a time with dwells at both ends
    Scroll {
        chars_per_second: f64,
        start_dwell: Duration,
        end_dwell: Duration,
    },
    /// Show successive width-sized pages, each held for `hold`
    Page { hold: Duration },
}

impl Default for Motion {
    fn default() -> Self {
        Motion::Scroll {
            chars_per_second: 2.0,
            start_dwell: Duration::from_secs(1),
            end_dwell: Duration::from_secs(1),
        }
    }
}

/// Observable animation state of a field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum FieldState {
    /// Text fits; nothing moves
    Static,
    /// Holding the current offset for `remaining` longer
    Dwelling { at_end: bool, remaining: Duration },
    /// Offset is advancing
    Scrolling,
}

#[derive(Clone, Debug)]
pub struct ScrollingField {
    text: Vec<char>,
    width: usize,
    blank: char,
    motion: Motion,
    offset: usize,
    /// Fractional scroll position in characters (or elapsed page time)
    progress: f64,
    state: FieldState,
}

impl ScrollingField {
    /// Create an empty field `width` cells wide.
    pub fn new(width: usize, motion: Motion, blank: char) -> Self {
        Self {
            text: Vec::new(),
            width,
            blank,
            motion,
            offset: 0,
            progress: 0.0,
            state: FieldState::Static,
        }
    }

    pub fn text(&self) -> String {
        self.text.iter().collect()
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn state(&self) -> FieldState {
        self.state
    }

    /// Replace the text and restart the cycle from offset 0.
    ///
    /// This always resets, even if `text` equals the current text; callers
    /// that want to keep a running scroll should compare first.
    pub fn set_text(&mut self, text: &str) {
        self.text = text.chars().collect();
        self.offset = 0;
        self.progress = 0.0;
        self.state = if self.fits() {
            FieldState::Static
        } else {
            match self.motion {
                Motion::Scroll { start_dwell, .. } => FieldState::Dwelling {
                    at_end: false,
                    remaining: start_dwell,
                },
                Motion::Page { .. } => FieldState::Scrolling,
            }
        };
    }

    fn fits(&self) -> bool {
        self.text.len() <= self.width
    }

    /// Largest offset that still fills the window.
    fn max_offset(&self) -> usize {
        self.text.len().saturating_sub(self.width)
    }

    /// Advance the animation by `elapsed`.
    pub fn tick(&mut self, elapsed: Duration) {
        match self.motion {
            Motion::Scroll {
                chars_per_second,
                start_dwell,
                end_dwell,
            } => self.tick_scroll(elapsed, chars_per_second, start_dwell, end_dwell),
            Motion::Page { hold } => self.tick_page(elapsed, hold),
        }
    }

    fn tick_scroll(
        &mut self,
        elapsed: Duration,
        rate: f64,
        start_dwell: Duration,
        end_dwell: Duration,
    ) {
        let mut moving_for = match self.state {
            FieldState::Static => return,
            FieldState::Dwelling { at_end, remaining } => {
                if elapsed < remaining {
                    self.state = FieldState::Dwelling {
                        at_end,
                        remaining: remaining - elapsed,
                    };
                    return;
                }
                if at_end {
                    let leftover = elapsed - remaining;
                    self.offset = 0;
                    self.progress = 0.0;
                    self.state = FieldState::Dwelling {
                        at_end: false,
                        remaining: start_dwell.saturating_sub(leftover),
                    };
                    return;
                }
                self.state = FieldState::Scrolling;
                elapsed - remaining
            }
            FieldState::Scrolling => elapsed,
        };
        if rate <= 0.0 {
            moving_for = Duration::ZERO;
        }

        self.progress += rate * moving_for.as_secs_f64();
        let max = self.max_offset();
        // Small epsilon so 0.1 + 0.2 style sums land on the intended character
        let reached = (self.progress + 1e-9).floor() as usize;
        if reached >= max {
            // Time spent past the last character already counts as end dwell
            let overshoot = if rate > 0.0 {
                ((self.progress - max as f64) / rate).max(0.0)
            } else {
                0.0
            };
            self.offset = max;
            self.progress = max as f64;
            self.state = FieldState::Dwelling {
                at_end: true,
                remaining: end_dwell.saturating_sub(Duration::from_secs_f64(overshoot)),
            };
        } else {
            self.offset = reached;
        }
    }

    fn tick_page(&mut self, elapsed: Duration, hold: Duration) {
        if self.state == FieldState::Static || self.width == 0 {
            return;
        }
        let hold_secs = hold.as_secs_f64();
        if hold_secs <= 0.0 {
            return;
        }
        let pages = self.text.len().div_ceil(self.width);
        self.progress += elapsed.as_secs_f64();
        let flips = ((self.progress + 1e-9) / hold_secs).floor();
        if flips >= 1.0 {
            self.progress -= flips * hold_secs;
            let page = (self.offset / self.width + flips as usize) % pages;
            self.offset = page * self.width;
        }
    }

    /// Visible window: `width` characters starting at the current offset,
    /// right-padded with the blank character.
    pub fn render(&self) -> String {
        let mut out: String = self
            .text
            .iter()
            .skip(self.offset)
            .take(self.width)
            .collect();
        let shown = self.text.len().saturating_sub(self.offset).min(self.width);
        out.extend(std::iter::repeat(self.blank).take(self.width - shown));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scroll(rate: f64, start_ms: u64, end_ms: u64) -> Motion {
        Motion::Scroll {
            chars_per_second: rate,
            start_dwell: Duration::from_millis(start_ms),
            end_dwell: Duration::from_millis(end_ms),
        }
    }

    fn field(width: usize, motion: Motion, text: &str) -> ScrollingField {
        let mut field = ScrollingField::new(width, motion, ' ');
        field.set_text(text);
        field
    }

    #[test]
    fn test_fitting_text_is_static_forever() {
        let mut f = field(8, Motion::default(), "SHINJUKU");
        assert_eq!(f.state(), FieldState::Static);
        for _ in 0..50 {
            assert_eq!(f.render(), "SHINJUKU");
            f.tick(Duration::from_millis(700));
            assert_eq!(f.offset(), 0);
            assert_eq!(f.state(), FieldState::Static);
        }
    }

    #[test]
    fn test_short_text_is_padded() {
        let mut f = field(6, Motion::default(), "EXP");
        f.tick(Duration::from_secs(30));
        assert_eq!(f.render(), "EXP   ");

        let empty = field(4, Motion::default(), "");
        assert_eq!(empty.render(), "    ");
        assert_eq!(empty.state(), FieldState::Static);
    }

    #[test]
    fn test_scroll_sequence_one_char_per_tick() {
        let mut f = field(8, scroll(1.0, 0, 0), "SHIBUYA EXPRESS");
        let expected = [
            "SHIBUYA ", "HIBUYA E", "IBUYA EX", "BUYA EXP", "UYA EXPR", "YA EXPRE", "A EXPRES",
            " EXPRESS",
        ];

        for round in 0..3 {
            for (i, want) in expected.iter().enumerate() {
                assert_eq!(&f.render(), want, "round {round}, frame {i}");
                f.tick(Duration::from_secs(1));
            }
        }
    }

    #[test]
    fn test_offset_clamps_at_end() {
        let mut f = field(8, scroll(1.0, 0, 5_000), "SHIBUYA EXPRESS");
        f.tick(Duration::from_secs(100));
        assert_eq!(f.offset(), 7);
        assert_eq!(f.render(), " EXPRESS");
        assert!(matches!(
            f.state(),
            FieldState::Dwelling { at_end: true, .. }
        ));
    }

    #[test]
    fn test_start_dwell_holds_before_motion() {
        let mut f = field(4, scroll(1.0, 1_000, 0), "ABCDEFG");
        f.tick(Duration::from_millis(600));
        assert_eq!(f.offset(), 0);
        // 400ms finishes the dwell, the other 1600ms scroll
        f.tick(Duration::from_millis(2_000));
        assert_eq!(f.state(), FieldState::Scrolling);
        assert_eq!(f.offset(), 1);
    }

    #[test]
    fn test_rate_is_time_accurate_not_tick_accurate() {
        let mut coarse = field(5, scroll(2.0, 0, 0), "ABCDEFGHIJKLMNOP");
        let mut fine = coarse.clone();

        coarse.tick(Duration::from_millis(1_500));
        for _ in 0..10 {
            fine.tick(Duration::from_millis(150));
        }
        assert_eq!(coarse.offset(), 3);
        assert_eq!(fine.offset(), 3);
    }

    #[test]
    fn test_cycle_is_periodic() {
        // start 1s + 7 chars at 2 chars/s + end 1s = 5.5s per cycle
        let mut f = field(8, scroll(2.0, 1_000, 1_000), "SHIBUYA EXPRESS");
        let step = Duration::from_millis(500);
        let frames: Vec<String> = (0..33)
            .map(|_| {
                let shown = f.render();
                f.tick(step);
                shown
            })
            .collect();

        let period = 11;
        for i in 0..(frames.len() - period) {
            assert_eq!(frames[i], frames[i + period], "frame {i}");
        }
        assert!(frames[..period].iter().any(|s| s == " EXPRESS"));
        assert_eq!(frames[period], "SHIBUYA ");
    }

    #[test]
    fn test_cycle_length_holds_for_uneven_ticks() {
        // 300ms does not divide the 5.5s cycle; resets must not drift late
        let mut f = field(8, scroll(2.0, 1_000, 1_000), "SHIBUYA EXPRESS");
        let step_ms = 300;
        let mut resets = Vec::new();
        let mut previous = f.offset();
        for i in 1..=190u64 {
            f.tick(Duration::from_millis(step_ms));
            if previous > 0 && f.offset() == 0 {
                resets.push(i * step_ms);
            }
            previous = f.offset();
        }

        assert_eq!(resets.len(), 10, "resets at {resets:?}");
        for (k, at) in resets.iter().enumerate() {
            let due = 5_500 * (k as u64 + 1);
            assert!(*at >= due && *at <= due + step_ms, "reset {k} at {at}ms");
        }
    }

    #[test]
    fn test_overshoot_counts_towards_end_dwell() {
        let mut f = field(4, scroll(2.0, 0, 1_000), "ABCDEF");
        // 2 chars need 1s; the extra 500ms is already dwell time
        f.tick(Duration::from_millis(1_500));
        assert_eq!(f.render(), "CDEF");
        assert_eq!(
            f.state(),
            FieldState::Dwelling {
                at_end: true,
                remaining: Duration::from_millis(500)
            }
        );

        // 200ms past the end dwell comes off the next start dwell
        let mut g = field(4, scroll(2.0, 1_000, 500), "ABCDEF");
        g.tick(Duration::from_secs(2));
        g.tick(Duration::from_millis(700));
        assert_eq!(g.render(), "ABCD");
        assert_eq!(
            g.state(),
            FieldState::Dwelling {
                at_end: false,
                remaining: Duration::from_millis(800)
            }
        );
    }

    #[test]
    fn test_replacing_text_resets_mid_scroll() {
        let mut f = field(4, scroll(1.0, 500, 0), "ABCDEFGH");
        f.tick(Duration::from_secs(3));
        assert!(f.offset() > 0);

        f.set_text("HGFEDCBA");
        assert_eq!(f.offset(), 0);
        assert_eq!(
            f.state(),
            FieldState::Dwelling {
                at_end: false,
                remaining: Duration::from_millis(500)
            }
        );
        assert_eq!(f.render(), "HGFE");
    }

    #[test]
    fn test_paging_mode() {
        let hold = Duration::from_millis(1_500);
        let mut f = field(4, Motion::Page { hold }, "JIYUGAOKA");
        assert_eq!(f.render(), "JIYU");
        f.tick(Duration::from_millis(1_000));
        assert_eq!(f.render(), "JIYU");
        f.tick(Duration::from_millis(500));
        assert_eq!(f.render(), "GAOK");
        f.tick(hold);
        assert_eq!(f.render(), "A   ");
        f.tick(hold);
        assert_eq!(f.render(), "JIYU");

        let mut fits = field(4, Motion::Page { hold }, "OK");
        fits.tick(hold * 3);
        assert_eq!(fits.render(), "OK  ");
        assert_eq!(fits.state(), FieldState::Static);
    }

    #[test]
    fn test_multibyte_text_counts_characters() {
        let mut f = field(3, scroll(1.0, 0, 0), "自由が丘駅");
        assert_eq!(f.render(), "自由が");
        f.tick(Duration::from_secs(1));
        assert_eq!(f.render(), "由が丘");
    }
}
