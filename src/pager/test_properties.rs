//! Property-based tests for pager and collection invariants.
//!
//! Arbitrary key sequences against arbitrary bounds must keep clamped offsets in
//! range and keep a pinned view on the last page; arbitrary chunkings of a byte
//! stream must collect and index identically.

use std::io::{self, Read};

use proptest::prelude::*;

use super::index::TextIndexer;
use super::viewport::{Bounds, Direction, ScrollIntent, Step, Viewport, visible_span};
use crate::process::accumulator::{DrainOutcome, OutputBuffer, drain};

// ──────────────────── strategies ────────────────────

fn arb_bounds() -> impl Strategy<Value = Bounds> {
    (1i64..60, 1i64..120, 0i64..500, 0i64..400).prop_map(
        |(display_height, display_width, max_height, max_width)| Bounds {
            display_height,
            display_width,
            max_height,
            max_width,
        },
    )
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![Just(Step::Line), Just(Step::Page), Just(Step::HalfPage)]
}

fn arb_direction() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Backward), Just(Direction::Forward)]
}

fn arb_clamped_intent() -> impl Strategy<Value = ScrollIntent> {
    prop_oneof![
        (arb_step(), arb_direction()).prop_map(|(step, direction)| ScrollIntent::Vertical {
            step,
            direction,
            past_end: false,
        }),
        (arb_step(), arb_direction()).prop_map(|(step, direction)| ScrollIntent::Horizontal {
            step,
            direction,
            past_end: false,
        }),
        Just(ScrollIntent::Start),
        Just(ScrollIntent::PinToEnd),
    ]
}

fn arb_horizontal_intent() -> impl Strategy<Value = ScrollIntent> {
    (arb_step(), arb_direction(), any::<bool>()).prop_map(|(step, direction, past_end)| {
        ScrollIntent::Horizontal {
            step,
            direction,
            past_end,
        }
    })
}

/// Non-blocking pipe stand-in that yields `data` in the given chunk sizes.
struct ChunkedSource {
    data: Vec<u8>,
    pos: usize,
    chunks: Vec<usize>,
    turn: usize,
}

impl Read for ChunkedSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pos == self.data.len() {
            return Ok(0);
        }
        let want = self.chunks[self.turn % self.chunks.len()];
        self.turn += 1;
        if want == 0 {
            return Err(io::ErrorKind::WouldBlock.into());
        }
        let n = want.min(buf.len()).min(self.data.len() - self.pos);
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

fn collect(data: &[u8], chunks: Vec<usize>) -> Vec<u8> {
    let mut source = ChunkedSource {
        data: data.to_vec(),
        pos: 0,
        chunks,
        turn: 0,
    };
    let mut buffer = OutputBuffer::new();
    loop {
        match drain(&mut source, &mut buffer) {
            DrainOutcome::Pending => {}
            DrainOutcome::Finished => break,
            DrainOutcome::Error(e) => panic!("unexpected read error: {e}"),
        }
    }
    buffer.into_bytes()
}

// ──────────────────── properties ────────────────────

proptest! {
    #[test]
    fn clamped_moves_stay_in_range(
        bounds in arb_bounds(),
        intents in prop::collection::vec(arb_clamped_intent(), 0..80),
    ) {
        let mut vp = Viewport::default();
        let end = (bounds.max_height - bounds.display_height).max(0);
        let end_col = (bounds.max_width - bounds.display_width).max(0);
        for intent in intents {
            vp.apply(intent, &bounds);
            prop_assert!((0..=end).contains(&vp.vertical()), "vertical {}", vp.vertical());
            prop_assert!((0..=end_col).contains(&vp.horizontal()), "horizontal {}", vp.horizontal());
        }
    }

    #[test]
    fn pinned_view_tracks_last_page(
        display_height in 1i64..60,
        heights in prop::collection::vec(0i64..1000, 1..20),
        horizontal in prop::collection::vec(arb_horizontal_intent(), 0..10),
    ) {
        let mut vp = Viewport::default();
        let first = Bounds { display_height, display_width: 80, max_height: heights[0], max_width: 200 };
        vp.apply(ScrollIntent::PinToEnd, &first);
        for intent in horizontal {
            vp.apply(intent, &first);
        }
        for max_height in heights {
            let bounds = Bounds { display_height, display_width: 80, max_height, max_width: 200 };
            vp.reconcile(&bounds);
            prop_assert!(vp.is_pinned());
            prop_assert_eq!(vp.vertical(), (max_height - display_height).max(0));
        }
    }

    #[test]
    fn past_end_offsets_survive_reconcile(
        bounds in arb_bounds(),
        target in -200i64..800,
    ) {
        let mut vp = Viewport::default();
        // Walk to an arbitrary offset with unclamped moves.
        while vp.vertical() != target {
            let direction = if vp.vertical() < target { Direction::Forward } else { Direction::Backward };
            vp.apply(ScrollIntent::Vertical { step: Step::Line, direction, past_end: true }, &bounds);
        }
        vp.reconcile(&bounds);
        prop_assert_eq!(vp.vertical(), target);
        let drawable = bounds.max_height > 0
            && target > -bounds.display_height
            && target < bounds.max_height;
        prop_assert_eq!(vp.rows(&bounds).is_some(), drawable);
    }

    #[test]
    fn clamped_view_shows_content_after_shrink(
        before in arb_bounds(),
        after_height in 1i64..500,
        intents in prop::collection::vec(
            prop_oneof![arb_clamped_intent(), Just(ScrollIntent::End)],
            0..40,
        ),
    ) {
        let mut vp = Viewport::default();
        for intent in intents {
            vp.apply(intent, &before);
        }
        let after = Bounds { max_height: after_height, ..before };
        vp.reconcile(&after);
        let rows = vp.rows(&after).expect("content on screen");
        prop_assert!(rows.count > 0);
        prop_assert!(rows.first + rows.count <= usize::try_from(after.max_height).unwrap());
        prop_assert!(rows.screen_offset + rows.count <= usize::try_from(after.display_height).unwrap());
    }

    #[test]
    fn visible_span_never_exceeds_window_or_content(
        offset in -300i64..300,
        display in 0i64..100,
        content in 0i64..300,
    ) {
        if let Some(span) = visible_span(offset, display, content) {
            prop_assert!(span.count > 0);
            prop_assert!(span.first + span.count <= usize::try_from(content).unwrap());
            prop_assert!(span.screen_offset + span.count <= usize::try_from(display).unwrap());
        }
    }

    #[test]
    fn chunking_does_not_change_collected_bytes(
        data in prop::collection::vec(any::<u8>(), 0..20_000),
        chunks in prop::collection::vec(0usize..9000, 1..8),
    ) {
        prop_assume!(chunks.iter().any(|&c| c > 0));
        let whole = collect(&data, vec![data.len().max(1)]);
        let pieces = collect(&data, chunks);
        prop_assert_eq!(&whole, &data);
        prop_assert_eq!(pieces, whole);
    }

    #[test]
    fn line_count_matches_newlines(text in "[a-z \\t\\n]{0,400}") {
        let index = TextIndexer::default().index(text.as_bytes()).unwrap();
        let newlines = text.matches('\n').count();
        let tail = usize::from(!text.is_empty() && !text.ends_with('\n'));
        prop_assert_eq!(index.max_height(), newlines + tail);
        let widest = index.spans().iter().map(|s| s.width).max().unwrap_or(0);
        prop_assert_eq!(index.max_width(), widest);
    }
}
