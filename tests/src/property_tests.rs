//! Property-based tests over debounce, playback and editing invariants

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use sequencer_core::hal::mock::MockTone;
    use sequencer_core::{
        Column, Cursor, Debouncer, Direction, KeyMailbox, Playback, RowSample, Song,
        STEP_COUNT,
    };

    const HOLDOFF: u16 = 7500;

    proptest! {
        /// However a single key chatters, accepted transitions are never
        /// closer than the holdoff.
        #[test]
        fn accepted_transitions_respect_the_holdoff(
            samples in proptest::collection::vec((1u32..3000, any::<bool>()), 1..80)
        ) {
            let mailbox = KeyMailbox::new();
            let mut debouncer = Debouncer::new(HOLDOFF);

            let mut now = 0u32;
            let mut accepted_at: Vec<u32> = Vec::new();
            for (gap, level) in samples {
                now += gap;
                let sample = if level { RowSample::new(0b001) } else { RowSample::IDLE };
                let n = debouncer.feed(Column::Col0, sample, now as u16, &mailbox);
                prop_assert!(n <= 1);
                if n == 1 {
                    accepted_at.push(now);
                }
            }

            for pair in accepted_at.windows(2) {
                prop_assert!(pair[1] - pair[0] >= HOLDOFF as u32);
            }
        }

        /// The play-head never leaves the grid, whatever the tempo feed
        /// does.
        #[test]
        fn play_head_stays_on_the_grid(
            tempos in proptest::collection::vec(1u16..300, 1..40)
        ) {
            let song = Song::new();
            let playback = Playback::new();
            let mut tone = MockTone::new();
            playback.resume(&song, &mut tone);

            for ticks_per_step in tempos {
                for _ in 0..ticks_per_step {
                    playback.on_tick(&song, ticks_per_step, &mut tone);
                    prop_assert!((playback.head() as usize) < STEP_COUNT);
                }
            }
        }

        /// The cursor stays inside the grid under any move sequence.
        #[test]
        fn cursor_stays_on_the_grid(moves in proptest::collection::vec(0u8..4, 0..200)) {
            let mut cursor = Cursor::new();
            for code in moves {
                let dir = match code {
                    0 => Direction::Up,
                    1 => Direction::Down,
                    2 => Direction::Left,
                    _ => Direction::Right,
                };
                cursor.shift(dir);
                prop_assert!((cursor.step as usize) < STEP_COUNT);
                prop_assert!(cursor.row < 4);
                prop_assert!(cursor.pitch().is_some());
            }
        }

        /// The mailbox always yields the last published digit, or nothing.
        #[test]
        fn mailbox_yields_the_latest_publication(digits in proptest::collection::vec(1u8..=255, 0..30)) {
            let mailbox = KeyMailbox::new();
            for digit in &digits {
                mailbox.publish(*digit);
            }
            prop_assert_eq!(mailbox.take(), digits.last().copied());
            prop_assert_eq!(mailbox.take(), None);
        }

        /// Toggling a cell twice lands where the semantics say: identity
        /// for an empty or matching slot, cleared for a replaced one. The
        /// rest of the grid never moves.
        #[test]
        fn double_toggle_touches_only_its_cell(
            step in 0u8..20,
            lane in 0u8..4,
            seed in proptest::collection::vec((0u8..20, 0u8..4), 0..15)
        ) {
            use sequencer_core::Pitch;

            let song = Song::new();
            for (s, l) in seed {
                if let Some(pitch) = Pitch::from_row(l) {
                    song.toggle(s, pitch);
                }
            }
            let before = song.snapshot();
            let pitch = match Pitch::from_row(lane) {
                Some(p) => p,
                None => return Ok(()),
            };

            song.toggle(step, pitch);
            song.toggle(step, pitch);

            let after = song.snapshot();
            for (i, (b, a)) in before.iter().zip(after.iter()).enumerate() {
                if i != step as usize {
                    prop_assert_eq!(b, a);
                }
            }
            match before[step as usize] {
                // Empty or already holding this pitch: double toggle is identity
                None => prop_assert_eq!(after[step as usize], None),
                Some(p) if p == pitch => prop_assert_eq!(after[step as usize], Some(pitch)),
                // A different pitch gets replaced, then cleared
                Some(_) => prop_assert_eq!(after[step as usize], None),
            }
        }
    }
}
