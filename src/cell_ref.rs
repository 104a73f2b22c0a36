//! A1-style cell references from zero-based coordinates

/// Append the column letters for a zero-based column index (`0` → `A`, `26` → `AA`).
pub fn push_column_letters(buffer: &mut Vec<u8>, col: usize) {
    let mut tmp = [0u8; 16];
    let mut len = 0;
    let mut n = col + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        tmp[len] = b'A' + rem as u8;
        len += 1;
        n = (n - 1) / 26;
    }
    for i in (0..len).rev() {
        buffer.push(tmp[i]);
    }
}

/// Append the reference of the cell at zero-based `(col, row)`.
#[inline]
pub fn push_cell_ref(buffer: &mut Vec<u8>, num_buffer: &mut itoa::Buffer, col: usize, row: usize) {
    push_column_letters(buffer, col);
    buffer.extend_from_slice(num_buffer.format(row + 1).as_bytes());
}

/// Reference of the cell at zero-based `(col, row)`, e.g. `(1, 0)` → `B1`.
pub fn cell_ref(col: usize, row: usize) -> String {
    let mut buffer = Vec::with_capacity(8);
    push_cell_ref(&mut buffer, &mut itoa::Buffer::new(), col, row);
    // Only ASCII letters and digits were pushed
    String::from_utf8_lossy(&buffer).into_owned()
}

/// The `ref` of a sheet's `dimension` element for a block anchored at `A1`.
///
/// An empty block (no columns or no rows) is declared as the anchor cell alone.
pub fn dimension_ref(column_count: usize, row_count: usize) -> String {
    if column_count == 0 || row_count == 0 {
        return "A1".to_string();
    }
    format!("A1:{}", cell_ref(column_count - 1, row_count - 1))
}
