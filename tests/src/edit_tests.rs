//! Editing flows: cursor movement, note toggling and song clearing

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use sequencer_core::{
        Command, Cursor, Direction, Pitch, Song, PITCH_COUNT, STEP_COUNT,
    };

    /// The main-loop dispatch for edit commands, as the firmware runs it
    fn apply(song: &Song, cursor: &mut Cursor, digit: u8) {
        match Command::from_digit(digit) {
            Some(Command::Move(dir)) => {
                cursor.shift(dir);
            }
            Some(Command::ToggleNote) => {
                if let Some(pitch) = cursor.pitch() {
                    song.toggle(cursor.step, pitch);
                }
            }
            Some(Command::ClearSong) => song.clear(),
            Some(Command::PlayPause) | None => {}
        }
    }

    #[rstest]
    #[case(Direction::Up, 0, 0)]
    #[case(Direction::Left, 0, 0)]
    #[case(Direction::Down, 0, 1)]
    #[case(Direction::Right, 1, 0)]
    fn single_move_from_home(#[case] dir: Direction, #[case] step: u8, #[case] row: u8) {
        let mut cursor = Cursor::new();
        cursor.shift(dir);
        assert_eq!(cursor.step, step);
        assert_eq!(cursor.row, row);
    }

    #[test]
    fn repeated_moves_saturate_at_the_edges() {
        let mut cursor = Cursor::new();
        for _ in 0..100 {
            cursor.shift(Direction::Right);
        }
        assert_eq!(cursor.step as usize, STEP_COUNT - 1);

        for _ in 0..100 {
            cursor.shift(Direction::Down);
        }
        assert_eq!(cursor.row as usize, PITCH_COUNT - 1);

        for _ in 0..100 {
            cursor.shift(Direction::Left);
        }
        assert_eq!(cursor.step, 0);

        for _ in 0..100 {
            cursor.shift(Direction::Up);
        }
        assert_eq!(cursor.row, 0);
    }

    #[test]
    fn toggle_through_key_digits_places_and_removes_a_note() {
        let song = Song::new();
        let mut cursor = Cursor::new();

        // Move to step 2, second pitch lane, and toggle
        apply(&song, &mut cursor, b'6');
        apply(&song, &mut cursor, b'6');
        apply(&song, &mut cursor, b'8');
        apply(&song, &mut cursor, b'5');
        assert_eq!(song.pitch_at(2), Some(Pitch::G5));

        // Toggling the same cell again erases it
        apply(&song, &mut cursor, b'5');
        assert_eq!(song.pitch_at(2), None);
        assert!(song.is_empty());
    }

    #[test]
    fn toggling_another_lane_replaces_the_note() {
        let song = Song::new();
        let mut cursor = Cursor::new();

        apply(&song, &mut cursor, b'5');
        assert_eq!(song.pitch_at(0), Some(Pitch::C6));

        // One lane down, same step: the slot holds one pitch at a time
        apply(&song, &mut cursor, b'8');
        apply(&song, &mut cursor, b'5');
        assert_eq!(song.pitch_at(0), Some(Pitch::G5));
    }

    #[test]
    fn clear_wipes_a_built_up_song() {
        let song = Song::new();
        let mut cursor = Cursor::new();

        for _ in 0..5 {
            apply(&song, &mut cursor, b'5');
            apply(&song, &mut cursor, b'6');
        }
        assert!(!song.is_empty());

        apply(&song, &mut cursor, b'9');
        assert!(song.is_empty());
        // The cursor is untouched by a clear
        assert_eq!(cursor.step, 5);
    }

    #[test]
    fn unassigned_keys_are_ignored() {
        let song = Song::new();
        let mut cursor = Cursor::new();
        song.set(0, Some(Pitch::C6));

        apply(&song, &mut cursor, b'1');
        apply(&song, &mut cursor, b'3');
        apply(&song, &mut cursor, 0xFF);

        assert_eq!(cursor, Cursor::new());
        assert_eq!(song.pitch_at(0), Some(Pitch::C6));
    }

    #[test]
    fn edits_land_while_the_grid_is_shared() {
        // The tick context reads whatever the edit just stored; emulate the
        // interleaving by reading after every edit
        let song = Song::new();
        let mut cursor = Cursor::new();

        apply(&song, &mut cursor, b'5');
        assert_eq!(song.snapshot()[0], Some(Pitch::C6));

        apply(&song, &mut cursor, b'5');
        assert_eq!(song.snapshot()[0], None);
    }
}
