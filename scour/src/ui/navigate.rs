/// Viewport arithmetic for the result list. Pure functions over the entry
/// count and a header predicate so every movement rule is testable without
/// a terminal.
///
/// The cursor is an offset into the visible page; `top + cursor` is the
/// selected entry. The selection must always rest on a match line, never on
/// a file header, no matter the input sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub top: usize,
    pub cursor: usize,
}

impl Viewport {
    pub fn selection(&self) -> usize {
        self.top + self.cursor
    }
}

pub fn cursor_down(v: &mut Viewport, rows: usize, len: usize, is_header: &impl Fn(usize) -> bool) {
    if len == 0 || rows == 0 {
        return;
    }
    if v.cursor >= rows - 1 {
        page_down(v, rows, len, is_header);
        return;
    }
    if v.selection() + 1 < len {
        v.cursor += 1;
    }
    if is_header(v.selection()) && v.selection() + 1 < len {
        v.cursor += 1;
    }
    if v.cursor > rows - 1 {
        page_down(v, rows, len, is_header);
        return;
    }
    settle(v, rows, len, is_header);
}

pub fn cursor_up(v: &mut Viewport, rows: usize, len: usize, is_header: &impl Fn(usize) -> bool) {
    if len == 0 || rows == 0 {
        return;
    }
    if v.cursor == 0 {
        page_up(v, rows, len, is_header);
        return;
    }
    v.cursor -= 1;
    if is_header(v.selection()) {
        if v.cursor == 0 {
            page_up(v, rows, len, is_header);
            return;
        }
        v.cursor -= 1;
    }
    settle(v, rows, len, is_header);
}

/// Scroll a page up; the selection lands on the last row of the new page
/// (or stays at the very first line when already on the first page).
pub fn page_up(v: &mut Viewport, rows: usize, len: usize, is_header: &impl Fn(usize) -> bool) {
    if len == 0 || rows == 0 {
        return;
    }
    v.cursor = if v.top == 0 { 0 } else { rows - 1 };
    v.top = v.top.saturating_sub(rows);
    if is_header(v.selection()) {
        if v.cursor > 0 {
            v.cursor -= 1;
        } else {
            v.cursor += 1;
        }
    }
    settle(v, rows, len, is_header);
}

/// Scroll a page down; the selection lands on the first row of the new
/// page (or on the final entry when already on the last page).
pub fn page_down(v: &mut Viewport, rows: usize, len: usize, is_header: &impl Fn(usize) -> bool) {
    if len == 0 || rows == 0 {
        return;
    }
    let max_top = if len % rows == 0 {
        len.saturating_sub(rows)
    } else {
        len - len % rows
    };
    v.cursor = if v.top == max_top { (len - 1) % rows } else { 0 };
    v.top = (v.top + rows).min(max_top);
    if is_header(v.selection()) {
        v.cursor += 1;
    }
    settle(v, rows, len, is_header);
}

/// Re-establish the selection invariant from outside a movement, e.g. when
/// entries stream in under a freshly created viewport.
pub fn settle_view(v: &mut Viewport, rows: usize, len: usize, is_header: &impl Fn(usize) -> bool) {
    settle(v, rows, len, is_header);
}

/// Safety net applied after every movement: clamp the selection into the
/// store, step off any header (downward first, then upward), and keep the
/// selection inside the visible page.
fn settle(v: &mut Viewport, rows: usize, len: usize, is_header: &impl Fn(usize) -> bool) {
    if len == 0 || rows == 0 {
        *v = Viewport::default();
        return;
    }
    let last = len - 1;
    let mut sel = v.selection().min(last);

    let mut down = sel;
    while down <= last && is_header(down) {
        down += 1;
    }
    if down <= last {
        sel = down;
    } else {
        while sel > 0 && is_header(sel) {
            sel -= 1;
        }
    }

    if sel < v.top {
        v.top = sel;
    }
    if sel >= v.top + rows {
        v.top = sel + 1 - rows;
    }
    v.cursor = sel - v.top;
}

#[cfg(test)]
mod tests {
    use super::*;

    // true marks a file header
    fn layout(headers: &[usize], len: usize) -> impl Fn(usize) -> bool + '_ {
        move |i| headers.contains(&i) && i < len
    }

    // header at 0, lines 1..=4, header 5, lines 6..=7
    const LEN: usize = 8;
    fn h(i: usize) -> bool {
        i == 0 || i == 5
    }

    #[test]
    fn down_skips_headers() {
        let mut v = Viewport { top: 0, cursor: 4 }; // selection 4, next is header 5
        cursor_down(&mut v, 10, LEN, &h);
        assert_eq!(v.selection(), 6);
    }

    #[test]
    fn up_skips_headers() {
        let mut v = Viewport { top: 0, cursor: 6 };
        cursor_up(&mut v, 10, LEN, &h);
        assert_eq!(v.selection(), 4);
    }

    #[test]
    fn up_at_first_line_stays_off_the_leading_header() {
        let mut v = Viewport { top: 0, cursor: 1 };
        cursor_up(&mut v, 10, LEN, &h);
        assert_eq!(v.selection(), 1);
    }

    #[test]
    fn down_at_last_entry_stays() {
        let mut v = Viewport { top: 0, cursor: 7 };
        cursor_down(&mut v, 10, LEN, &h);
        assert_eq!(v.selection(), 7);
    }

    #[test]
    fn down_past_the_page_scrolls() {
        let mut v = Viewport { top: 0, cursor: 3 }; // rows = 4, at last row
        cursor_down(&mut v, 4, LEN, &h);
        assert_eq!(v.top, 4);
        assert_eq!(v.selection(), 4);
    }

    #[test]
    fn page_down_lands_on_first_line_of_next_page() {
        let mut v = Viewport { top: 0, cursor: 1 };
        page_down(&mut v, 4, LEN, &h);
        assert_eq!(v.top, 4);
        // entry 4 is a line; selection starts the page
        assert_eq!(v.selection(), 4);
    }

    #[test]
    fn page_down_on_last_page_selects_final_entry() {
        let mut v = Viewport { top: 4, cursor: 0 };
        page_down(&mut v, 4, LEN, &h);
        assert_eq!(v.selection(), LEN - 1);
    }

    #[test]
    fn page_up_lands_on_last_row_of_previous_page() {
        let mut v = Viewport { top: 4, cursor: 2 };
        page_up(&mut v, 4, LEN, &h);
        assert_eq!(v.top, 0);
        assert_eq!(v.selection(), 3);
    }

    #[test]
    fn page_up_from_first_page_selects_first_line() {
        let mut v = Viewport { top: 0, cursor: 3 };
        page_up(&mut v, 4, LEN, &h);
        assert_eq!(v.selection(), 1);
    }

    #[test]
    fn empty_store_is_inert() {
        let mut v = Viewport::default();
        let none = layout(&[], 0);
        cursor_down(&mut v, 10, 0, &none);
        cursor_up(&mut v, 10, 0, &none);
        page_down(&mut v, 10, 0, &none);
        page_up(&mut v, 10, 0, &none);
        assert_eq!(v, Viewport::default());
    }

    /// The selection never rests on a header for any input sequence.
    #[test]
    fn selection_never_lands_on_a_header() {
        let headers = [0usize, 3, 4, 9];
        let len = 12;
        let is_header = layout(&headers, len);

        for rows in [1usize, 2, 4, 5, 30] {
            // every sequence of five movements
            for mut seq in 0..4usize.pow(5) {
                let mut v = Viewport { top: 0, cursor: 1 };
                for _ in 0..5 {
                    match seq % 4 {
                        0 => cursor_down(&mut v, rows, len, &is_header),
                        1 => cursor_up(&mut v, rows, len, &is_header),
                        2 => page_down(&mut v, rows, len, &is_header),
                        _ => page_up(&mut v, rows, len, &is_header),
                    }
                    seq /= 4;
                    assert!(v.selection() < len, "selection out of range");
                    assert!(
                        !is_header(v.selection()),
                        "selection on header at {} (rows {rows})",
                        v.selection()
                    );
                    assert!(v.cursor < rows, "cursor outside the page");
                }
            }
        }
    }
}
