//! embedded-hal pin adapter tests against mocked GPIO

#[cfg(test)]
mod tests {
    use embedded_hal_mock::eh1::pin::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use sequencer_core::hal::{ColumnDrive, PinColumns, PinRows, RowSense};
    use sequencer_core::{Column, KeyMailbox, Keypad, Row};

    #[test]
    fn active_low_columns_idle_high_and_drive_low() {
        let pin0 = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let pin1 = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let pin2 = PinMock::new(&[PinTransaction::set(PinState::High)]);

        let mut cols = PinColumns::new([pin0, pin1, pin2], true);
        cols.release_all();
        cols.activate(Column::Col1);
        cols.release(Column::Col1);

        for mut pin in cols.release_pins() {
            pin.done();
        }
    }

    #[test]
    fn active_high_columns_invert_the_polarity() {
        let pin0 = PinMock::new(&[
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
        let pin1 = PinMock::new(&[PinTransaction::set(PinState::Low)]);
        let pin2 = PinMock::new(&[PinTransaction::set(PinState::Low)]);

        let mut cols = PinColumns::new([pin0, pin1, pin2], false);
        cols.release_all();
        cols.activate(Column::Col0);
        cols.release(Column::Col0);

        for mut pin in cols.release_pins() {
            pin.done();
        }
    }

    #[test]
    fn pulled_up_rows_read_pressed_as_low() {
        let pin0 = PinMock::new(&[PinTransaction::get(PinState::Low)]);
        let pin1 = PinMock::new(&[PinTransaction::get(PinState::High)]);
        let pin2 = PinMock::new(&[PinTransaction::get(PinState::Low)]);

        let mut rows = PinRows::new([pin0, pin1, pin2], true);
        let sample = rows.sample();
        assert_eq!(sample.bits(), 0b101);
        assert!(sample.pressed(Row::Row0));
        assert!(!sample.pressed(Row::Row1));
        assert!(sample.pressed(Row::Row2));

        for mut pin in rows.release_pins() {
            pin.done();
        }
    }

    #[test]
    fn keypad_runs_one_column_slot_over_mock_pins() {
        // Start releases all three columns; column 0 is then driven for its
        // dwell and released after the sample
        let col0 = PinMock::new(&[
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
        ]);
        let col1 = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let col2 = PinMock::new(&[PinTransaction::set(PinState::High)]);
        // One read per row at the dwell end, nothing pressed
        let row_pins = [
            PinMock::new(&[PinTransaction::get(PinState::High)]),
            PinMock::new(&[PinTransaction::get(PinState::High)]),
            PinMock::new(&[PinTransaction::get(PinState::High)]),
        ];

        let mut col_handles = [col0.clone(), col1.clone(), col2.clone()];
        let mut row_handles = row_pins.clone();

        let mailbox = KeyMailbox::new();
        let mut keypad = Keypad::new(
            PinColumns::new([col0, col1, col2], true),
            PinRows::new(row_pins, true),
            1000,
            125,
            7500,
        );

        let armed = keypad.start(0);
        assert_eq!(armed, [125, 1250, 2375]);

        // Gap end: column 0 drive
        assert_eq!(keypad.on_compare(Column::Col0, &mailbox), Some((Column::Col0, 1125)));
        // Dwell end: sample and hand over to column 1
        assert_eq!(keypad.on_compare(Column::Col0, &mailbox), Some((Column::Col1, 1250)));
        assert_eq!(mailbox.take(), None);

        for pin in col_handles.iter_mut().chain(row_handles.iter_mut()) {
            pin.done();
        }
    }
}
