/// Renders a 1-based column index as spreadsheet letters (`1` -> `A`, `28` -> `AB`).
/// Column `0` has no letter form and renders as `?`.
pub fn column_name(column: u32) -> String {
    if column == 0 {
        return "?".to_string();
    }
    let mut letters = Vec::new();
    let mut n = column;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Parses spreadsheet column letters back into a 1-based index. Case-insensitive.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as u8 - b'A') as u32 + 1;
        index = index.checked_mul(26)?.checked_add(digit)?;
    }
    Some(index)
}

/// Formats a 1-based `(row, column)` pair in A1 notation, e.g. `(4, 2)` -> `B4`.
pub fn cell_ref(row: u32, column: u32) -> String {
    format!("{}{}", column_name(column), row)
}

/// Splits an A1 reference such as `B4` into `(row, column)`.
pub fn parse_cell_ref(text: &str) -> Option<(u32, u32)> {
    let text = text.trim();
    let split = text.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = text.split_at(split);
    let column = column_index(letters)?;
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row, column))
}
