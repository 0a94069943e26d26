use crate::Point;

/// Returns the maximum number of handicap stones for a given board size.
pub fn max_handicap(cols: u8, rows: u8) -> u8 {
    if cols != rows || cols < 7 || cols.is_multiple_of(2) {
        return 0;
    }
    if cols >= 13 {
        9
    } else {
        // Boards smaller than 13: only corners + center (no side hoshi)
        5
    }
}

/// Hoshi-based handicap stone placement for any odd square board ≥ 7.
///
/// Returns `None` if the board is non-square, even, too small, or count is invalid.
pub fn handicap_points(cols: u8, rows: u8, count: u8) -> Option<Vec<Point>> {
    if cols != rows || cols < 7 || cols.is_multiple_of(2) || count < 2 || count > max_handicap(cols, rows) {
        return None;
    }

    // Hoshi offset from edge: 3 for boards ≥ 13, 2 for smaller
    let off = if cols >= 13 { 3 } else { 2 };
    let far = cols - 1 - off;
    let mid = cols / 2;

    let tl = (off, off);
    let tr = (far, off);
    let bl = (off, far);
    let br = (far, far);
    let cc = (mid, mid);

    let ml = (off, mid);
    let mr = (far, mid);
    let tc = (mid, off);
    let bc = (mid, far);

    let pts = match count {
        2 => vec![tr, bl],
        3 => vec![tr, bl, br],
        4 => vec![tl, tr, bl, br],
        5 => vec![tl, tr, bl, br, cc],
        6 => vec![tl, tr, ml, mr, bl, br],
        7 => vec![tl, tr, ml, mr, bl, br, cc],
        8 => vec![tl, tr, ml, mr, bl, br, tc, bc],
        9 => vec![tl, tr, ml, mr, bl, br, tc, bc, cc],
        _ => unreachable!(),
    };

    Some(pts)
}
