
/// Contiguous run of non-wear samples, as a pair of display-window indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NonWearSpan {
    pub start: usize,
    pub end: usize,
}

/// Indexes at which the non-wear flag changes value.
///
/// A sequence that starts in non-wear gets an implicit boundary at 0, and an
/// unterminated span is closed at the last index.
pub fn nonwear_changes<T: PartialEq + Default>(flags: &[T]) -> Vec<usize> {
    let mut changes: Vec<usize> = (1..flags.len())
        .filter(|&index| flags[index] != flags[index - 1])
        .collect();

    match flags.first() {
        Some(first) if *first != T::default() => changes.insert(0, 0),
        Some(_) => {}
        None => return changes,
    }

    if changes.len() % 2 != 0 {
        changes.push(flags.len() - 1);
    }
    changes
}

pub fn nonwear_spans<T: PartialEq + Default>(flags: &[T]) -> Vec<NonWearSpan> {
    nonwear_changes(flags)
        .chunks_exact(2)
        .map(|pair| NonWearSpan {
            start: pair[0],
            end: pair[1],
        })
        .collect()
}
