//! Myers O(ND) shortest-edit-script diff over arbitrary sequences.
//!
//! Shared by the line diff and the word/character highlighter. The search
//! runs from both ends and splits on the middle snake, so memory stays
//! linear in the input even when every line changed. Common prefixes and
//! suffixes are trimmed at each level, which makes ties resolve toward
//! keeping the leading run unchanged.

use std::iter;
use std::ops::Range;

/// A changed region: `old` was replaced by `new`.
///
/// Either range may be empty (pure insertion or deletion), never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    pub old: Range<usize>,
    pub new: Range<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edit {
    Equal,
    Delete,
    Insert,
}

/// Compute the changed regions between `a` and `b`, in order.
///
/// Hunks are separated by at least one equal element.
pub fn diff_hunks<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Hunk> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];

    let mut hunks = Vec::new();
    let (mut i, mut j) = (prefix, prefix);
    let mut open: Option<(usize, usize)> = None;
    for edit in edit_script(a_mid, b_mid) {
        match edit {
            Edit::Equal => {
                if let Some((oi, oj)) = open.take() {
                    hunks.push(Hunk { old: oi..i, new: oj..j });
                }
                i += 1;
                j += 1;
            }
            Edit::Delete => {
                open.get_or_insert((i, j));
                i += 1;
            }
            Edit::Insert => {
                open.get_or_insert((i, j));
                j += 1;
            }
        }
    }
    if let Some((oi, oj)) = open {
        hunks.push(Hunk { old: oi..i, new: oj..j });
    }
    hunks
}

/// Number of elements `a` and `b` have in common along the shortest
/// edit script (the LCS length).
pub fn common_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let changed_old: usize = diff_hunks(a, b).iter().map(|h| h.old.len()).sum();
    a.len() - changed_old
}

fn edit_script<T: PartialEq>(a: &[T], b: &[T]) -> Vec<Edit> {
    let mut edits = Vec::with_capacity(a.len() + b.len());
    conquer(a, b, &mut edits);
    edits
}

/// Linear-space divide and conquer: split on a point of an optimal path,
/// then diff each half. Only two frontiers of `O(N + M)` are live at once.
fn conquer<T: PartialEq>(a: &[T], b: &[T], out: &mut Vec<Edit>) {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    out.extend(iter::repeat(Edit::Equal).take(prefix));
    let (a, b) = (&a[prefix..], &b[prefix..]);

    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let (a, b) = (&a[..a.len() - suffix], &b[..b.len() - suffix]);

    if a.is_empty() {
        out.extend(iter::repeat(Edit::Insert).take(b.len()));
    } else if b.is_empty() {
        out.extend(iter::repeat(Edit::Delete).take(a.len()));
    } else if let Some((x, y)) =
        middle_snake(a, b).filter(|&(x, y)| x + y > 0 && x + y < a.len() + b.len())
    {
        conquer(&a[..x], &b[..y], out);
        conquer(&a[x..], &b[y..], out);
    } else {
        out.extend(iter::repeat(Edit::Delete).take(a.len()));
        out.extend(iter::repeat(Edit::Insert).take(b.len()));
    }

    out.extend(iter::repeat(Edit::Equal).take(suffix));
}

/// Run the forward and reverse searches until they overlap and return
/// the forward endpoint there. `None` means `a` and `b` share nothing.
///
/// Both inputs must be non-empty with no common prefix or suffix, so the
/// split point is never `(0, 0)` or `(N, M)`.
fn middle_snake<T: PartialEq>(a: &[T], b: &[T]) -> Option<(usize, usize)> {
    let n = a.len() as isize;
    let m = b.len() as isize;
    let max_d = (n + m + 1) / 2;
    let offset = max_d;
    let len = 2 * max_d + 2;

    // -1 marks a diagonal neither search has reached yet.
    let mut vf = vec![-1isize; len as usize];
    let mut vb = vec![-1isize; len as usize];
    vf[(offset + 1) as usize] = 0;
    vb[(offset + 1) as usize] = 0;

    let delta = n - m;
    let front = delta % 2 != 0;

    // Diagonals that ran off the edge of the grid are skipped from then on.
    let (mut f_start, mut f_end, mut b_start, mut b_end) = (0, 0, 0, 0);

    for d in 0..max_d {
        let mut k = -d + f_start;
        while k <= d - f_end {
            let idx = (offset + k) as usize;
            let mut x = if k == -d || (k != d && vf[idx - 1] < vf[idx + 1]) {
                vf[idx + 1]
            } else {
                vf[idx - 1] + 1
            };
            let mut y = x - k;
            while (0..n).contains(&x) && (0..m).contains(&y) && a[x as usize] == b[y as usize] {
                x += 1;
                y += 1;
            }
            vf[idx] = x;
            if x > n {
                f_end += 2;
            } else if y > m {
                f_start += 2;
            } else if front {
                if let Some(bx) = reached(&vb, delta - k, offset, n, m) {
                    if x >= n - bx {
                        return Some((x as usize, y as usize));
                    }
                }
            }
            k += 2;
        }

        let mut k = -d + b_start;
        while k <= d - b_end {
            let idx = (offset + k) as usize;
            let mut x = if k == -d || (k != d && vb[idx - 1] < vb[idx + 1]) {
                vb[idx + 1]
            } else {
                vb[idx - 1] + 1
            };
            let mut y = x - k;
            while (0..n).contains(&x)
                && (0..m).contains(&y)
                && a[(n - x - 1) as usize] == b[(m - y - 1) as usize]
            {
                x += 1;
                y += 1;
            }
            vb[idx] = x;
            if x > n {
                b_end += 2;
            } else if y > m {
                b_start += 2;
            } else if !front {
                let other = delta - k;
                if let Some(fx) = reached(&vf, other, offset, n, m) {
                    if fx >= n - x {
                        return Some((fx as usize, (fx - other) as usize));
                    }
                }
            }
            k += 2;
        }
    }
    None
}

/// The x a search reached on diagonal `k`, if it did so inside the grid.
fn reached(v: &[isize], k: isize, offset: isize, n: isize, m: isize) -> Option<isize> {
    let x = *v.get(usize::try_from(offset + k).ok()?)?;
    (x >= 0 && x <= n && x - k >= 0 && x - k <= m).then_some(x)
}
