//! Interval algebra over minute-of-day spans. Shared by the availability
//! pipeline's conflict filter and the commit-time re-check.

use crate::model::Span;

/// Merge sorted overlapping/adjacent spans into disjoint spans.
pub fn merge_sorted(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end
        {
            last.end = last.end.max(span.end);
            continue;
        }
        merged.push(span);
    }
    merged
}

/// Overlapping portion of two spans, if any.
pub fn intersect(a: Span, b: Span) -> Option<Span> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    (start < end).then(|| Span::new(start, end))
}

/// Subtract `to_remove` (sorted by start) from `base` (sorted, disjoint).
/// Emits the surviving gaps; removed edges are clamped to each base span so
/// partial overlaps clip rather than drop.
pub fn subtract(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Span::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(Span::new(current_start, current_end));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtract_no_overlap() {
        let base = vec![Span::new(100, 200), Span::new(300, 400)];
        let remove = vec![Span::new(200, 300)];
        assert_eq!(subtract(&base, &remove), base);
    }

    #[test]
    fn subtract_full_overlap() {
        let base = vec![Span::new(100, 200)];
        let remove = vec![Span::new(50, 250)];
        assert!(subtract(&base, &remove).is_empty());
    }

    #[test]
    fn subtract_partial_left() {
        let base = vec![Span::new(100, 200)];
        let remove = vec![Span::new(50, 150)];
        assert_eq!(subtract(&base, &remove), vec![Span::new(150, 200)]);
    }

    #[test]
    fn subtract_partial_right() {
        let base = vec![Span::new(100, 200)];
        let remove = vec![Span::new(150, 250)];
        assert_eq!(subtract(&base, &remove), vec![Span::new(100, 150)]);
    }

    #[test]
    fn subtract_middle_punch() {
        let base = vec![Span::new(100, 300)];
        let remove = vec![Span::new(150, 200)];
        assert_eq!(
            subtract(&base, &remove),
            vec![Span::new(100, 150), Span::new(200, 300)]
        );
    }

    #[test]
    fn subtract_multiple_punches() {
        let base = vec![Span::new(0, 1000)];
        let remove = vec![Span::new(100, 200), Span::new(400, 500), Span::new(800, 900)];
        assert_eq!(
            subtract(&base, &remove),
            vec![
                Span::new(0, 100),
                Span::new(200, 400),
                Span::new(500, 800),
                Span::new(900, 1000),
            ]
        );
    }

    #[test]
    fn subtract_removal_spanning_two_bases() {
        let base = vec![Span::new(100, 200), Span::new(300, 400)];
        let remove = vec![Span::new(150, 350)];
        assert_eq!(
            subtract(&base, &remove),
            vec![Span::new(100, 150), Span::new(350, 400)]
        );
    }

    #[test]
    fn merge_sorted_basic() {
        let spans = vec![Span::new(100, 300), Span::new(200, 400), Span::new(500, 600)];
        assert_eq!(
            merge_sorted(&spans),
            vec![Span::new(100, 400), Span::new(500, 600)]
        );
    }

    #[test]
    fn merge_sorted_adjacent() {
        let spans = vec![Span::new(100, 200), Span::new(200, 300)];
        assert_eq!(merge_sorted(&spans), vec![Span::new(100, 300)]);
    }

    #[test]
    fn merge_sorted_contained() {
        let spans = vec![Span::new(100, 400), Span::new(150, 200)];
        assert_eq!(merge_sorted(&spans), vec![Span::new(100, 400)]);
    }

    #[test]
    fn intersect_overlapping() {
        assert_eq!(
            intersect(Span::new(100, 300), Span::new(200, 400)),
            Some(Span::new(200, 300))
        );
    }

    #[test]
    fn intersect_adjacent_is_empty() {
        assert_eq!(intersect(Span::new(100, 200), Span::new(200, 300)), None);
    }

    #[test]
    fn intersect_contained() {
        assert_eq!(
            intersect(Span::new(0, 1440), Span::new(540, 1080)),
            Some(Span::new(540, 1080))
        );
    }
}
