// src/defs.rs
// Shared constants for the 75-ball bingo layout.

pub type Number = u8;

pub struct CardLayout {
    pub columns: usize,
    pub rows: usize,
    pub free_col: usize,
    pub free_row: usize,
}

pub const CARDLAYOUT: CardLayout = CardLayout {
    columns: 5,  // B I N G O
    rows: 5,     // numbers per column
    free_col: 2, // column of the FREE cell
    free_row: 2, // row of the FREE cell
};

pub const FIRSTNUMBER: Number = 1;
pub const LASTNUMBER: Number = 75;
pub const NUMBERSPERCOLUMN: Number = (LASTNUMBER - FIRSTNUMBER + 1) / CARDLAYOUT.columns as Number;

pub const LETTERS: [char; CARDLAYOUT.columns] = ['B', 'I', 'N', 'G', 'O'];

pub const MAXCARDS: usize = 2;

/// Inclusive number range assigned to a card column.
pub const fn column_range(col: usize) -> (Number, Number) {
    let low = FIRSTNUMBER + col as Number * NUMBERSPERCOLUMN;
    (low, low + NUMBERSPERCOLUMN - 1)
}

/// Column index a called number belongs to.
pub fn column_of(number: Number) -> usize {
    ((number - FIRSTNUMBER) / NUMBERSPERCOLUMN) as usize
}

/// Letter announced together with a called number.
pub fn letter_of(number: Number) -> char {
    LETTERS[column_of(number)]
}
