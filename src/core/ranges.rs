//! Styled ranges over the console's plain-text buffer
//!
//! The set is kept sorted by `start`, non-overlapping, free of empty ranges
//! and covering the buffer from offset 0 to its end. Writes follow terminal
//! overwrite semantics: what was under the written span is clipped, split or
//! removed, and neighbours with the same style are merged.

use crate::core::term::Hyperlink;

/// A run of buffer characters sharing one class and link
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRange {
    /// Stable identity, survives clipping and merging
    pub id: u64,
    /// Offset of the first character
    pub start: usize,
    pub len: usize,
    pub class: String,
    pub link: Option<Hyperlink>,
}

impl StyleRange {
    /// Offset one past the last character
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn same_style(&self, class: &str, link: Option<&Hyperlink>) -> bool {
        self.class == class && self.link.as_ref() == link
    }
}

/// A mutation of the range list.
///
/// Indices are valid when the changes are applied in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RangeChange {
    Inserted(usize, StyleRange),
    Updated(usize, StyleRange),
    /// The range grew by this many characters at its end
    Extended(usize, StyleRange, usize),
    /// The range lost this many characters at its start
    Clipped(usize, StyleRange, usize),
    Removed(usize),
}

/// Result of a single write
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WriteOutcome {
    pub changes: Vec<RangeChange>,
    /// Range now holding the written text
    pub target_id: Option<u64>,
}

/// Sorted, non-overlapping style ranges
#[derive(Clone, Debug, Default)]
pub struct RangeSet {
    ranges: Vec<StyleRange>,
    next_id: u64,
}

impl RangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn as_slice(&self) -> &[StyleRange] {
        &self.ranges
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StyleRange> {
        self.ranges.iter()
    }

    /// End of the covered region
    pub fn end(&self) -> usize {
        self.ranges.last().map(StyleRange::end).unwrap_or(0)
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    /// Record `len` characters written at `start` with the given style.
    ///
    /// `start` must not lie beyond the covered region. With `force_new` set,
    /// the written span never merges with existing ranges.
    pub fn write(
        &mut self,
        start: usize,
        len: usize,
        class: &str,
        link: Option<&Hyperlink>,
        force_new: bool,
    ) -> WriteOutcome {
        if len == 0 {
            return WriteOutcome::default();
        }
        debug_assert!(start <= self.end());

        if start >= self.end() {
            self.append(len, class, link, force_new)
        } else {
            self.overwrite(start, len, class, link, force_new)
        }
    }

    fn append(
        &mut self,
        len: usize,
        class: &str,
        link: Option<&Hyperlink>,
        force_new: bool,
    ) -> WriteOutcome {
        let index = self.ranges.len();
        if let Some(last) = self.ranges.last_mut() {
            if !force_new && last.same_style(class, link) {
                last.len += len;
                return WriteOutcome {
                    target_id: Some(last.id),
                    changes: vec![RangeChange::Extended(index - 1, last.clone(), len)],
                };
            }
        }

        let range = self.new_range(self.end(), len, class, link);
        let id = range.id;
        self.ranges.push(range.clone());
        WriteOutcome {
            changes: vec![RangeChange::Inserted(index, range)],
            target_id: Some(id),
        }
    }

    fn overwrite(
        &mut self,
        start: usize,
        len: usize,
        class: &str,
        link: Option<&Hyperlink>,
        force_new: bool,
    ) -> WriteOutcome {
        let end = start + len;
        let first = self.ranges.partition_point(|r| r.end() <= start);
        let last_excl = self.ranges.partition_point(|r| r.start < end);
        let matches = |r: &StyleRange| !force_new && r.same_style(class, link);

        let left = self.ranges[first].clone();
        let right = self.ranges[last_excl - 1].clone();
        let host = self.ranges[first..last_excl]
            .iter()
            .find(|r| matches(r))
            .map(|r| r.id);

        let merged_start = if matches(&left) { left.start } else { start };
        let merged_end = if matches(&right) {
            right.end().max(end)
        } else {
            end
        };

        let mut region = Vec::with_capacity(3);
        if !matches(&left) && left.start < start {
            region.push(StyleRange {
                len: start - left.start,
                ..left.clone()
            });
        }
        let merged = match host {
            Some(id) => StyleRange {
                id,
                start: merged_start,
                len: merged_end - merged_start,
                class: class.to_string(),
                link: link.cloned(),
            },
            None => self.new_range(merged_start, merged_end - merged_start, class, link),
        };
        let target_id = merged.id;
        region.push(merged);
        if !matches(&right) && right.end() > end {
            // Writing inside a single range splits it in two
            let id = if right.id == left.id && left.start < start {
                self.alloc_id()
            } else {
                right.id
            };
            region.push(StyleRange {
                id,
                start: end,
                len: right.end() - end,
                ..right
            });
        }

        let mut changes = Vec::new();
        for index in (first..last_excl).rev() {
            let id = self.ranges[index].id;
            if !region.iter().any(|r| r.id == id) {
                changes.push(RangeChange::Removed(index));
            }
        }
        let survivors: Vec<u64> = self.ranges[first..last_excl].iter().map(|r| r.id).collect();
        for (offset, range) in region.iter().enumerate() {
            let change = if survivors.contains(&range.id) {
                RangeChange::Updated(first + offset, range.clone())
            } else {
                RangeChange::Inserted(first + offset, range.clone())
            };
            changes.push(change);
        }

        self.ranges.splice(first..last_excl, region);
        WriteOutcome {
            changes,
            target_id: Some(target_id),
        }
    }

    /// Drop the first `n` buffer characters, shifting what remains to offset 0.
    ///
    /// Only removals and the clipped first range are reported; pure offset
    /// shifts do not change any range's text.
    pub fn remove_prefix(&mut self, n: usize) -> Vec<RangeChange> {
        let mut changes = Vec::new();
        if n == 0 {
            return changes;
        }

        let covered = self.ranges.partition_point(|r| r.end() <= n);
        self.ranges.drain(..covered);
        changes.extend(std::iter::repeat_with(|| RangeChange::Removed(0)).take(covered));

        for (index, range) in self.ranges.iter_mut().enumerate() {
            if index == 0 && range.start < n {
                let clipped = n - range.start;
                range.len -= clipped;
                range.start = 0;
                changes.push(RangeChange::Clipped(0, range.clone(), clipped));
            } else {
                range.start -= n;
            }
        }
        changes
    }

    fn new_range(
        &mut self,
        start: usize,
        len: usize,
        class: &str,
        link: Option<&Hyperlink>,
    ) -> StyleRange {
        StyleRange {
            id: self.alloc_id(),
            start,
            len,
            class: class.to_string(),
            link: link.cloned(),
        }
    }

    fn alloc_id(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Check ordering, coverage and that replaying `changes` reproduces the set
    fn check(set: &RangeSet, shadow: &mut Vec<StyleRange>, changes: &[RangeChange]) {
        for change in changes {
            match change {
                RangeChange::Inserted(i, r) => shadow.insert(*i, r.clone()),
                RangeChange::Updated(i, r)
                | RangeChange::Extended(i, r, _)
                | RangeChange::Clipped(i, r, _) => shadow[*i] = r.clone(),
                RangeChange::Removed(i) => {
                    shadow.remove(*i);
                }
            }
        }
        // Offsets shifted by trimming are not reported, only content
        let content = |ranges: &[StyleRange]| -> Vec<(u64, usize, String)> {
            ranges.iter().map(|r| (r.id, r.len, r.class.clone())).collect()
        };
        assert_eq!(content(shadow.as_slice()), content(set.as_slice()));

        let mut offset = 0;
        for r in set.iter() {
            assert_eq!(r.start, offset);
            assert!(r.len > 0);
            offset = r.end();
        }
    }

    fn write(
        set: &mut RangeSet,
        shadow: &mut Vec<StyleRange>,
        start: usize,
        len: usize,
        class: &str,
    ) -> WriteOutcome {
        let outcome = set.write(start, len, class, None, false);
        check(set, shadow, &outcome.changes);
        outcome
    }

    fn layout(set: &RangeSet) -> Vec<(usize, usize, &str)> {
        set.iter().map(|r| (r.start, r.len, r.class.as_str())).collect()
    }

    #[test]
    fn test_append_extends_same_style() {
        let mut set = RangeSet::new();
        let mut shadow = Vec::new();
        write(&mut set, &mut shadow, 0, 5, "a");
        write(&mut set, &mut shadow, 5, 5, "a");
        write(&mut set, &mut shadow, 10, 2, "b");
        assert_eq!(layout(&set), vec![(0, 10, "a"), (10, 2, "b")]);
    }

    #[test]
    fn test_append_reports_only_growth() {
        let mut set = RangeSet::new();
        let mut shadow = Vec::new();
        write(&mut set, &mut shadow, 0, 5, "a");
        let outcome = write(&mut set, &mut shadow, 5, 3, "a");
        assert_eq!(
            outcome.changes,
            vec![RangeChange::Extended(0, set.as_slice()[0].clone(), 3)]
        );
    }

    #[test]
    fn test_force_new_never_merges() {
        let mut set = RangeSet::new();
        let mut shadow = Vec::new();
        write(&mut set, &mut shadow, 0, 3, "a");
        let outcome = set.write(3, 3, "a", None, true);
        check(&set, &mut shadow, &outcome.changes);
        assert_eq!(layout(&set), vec![(0, 3, "a"), (3, 3, "a")]);
        assert_eq!(outcome.target_id, Some(set.as_slice()[1].id));
    }

    #[test]
    fn test_different_links_do_not_merge() {
        let mut set = RangeSet::new();
        let link = Hyperlink::new("https://example.com");
        set.write(0, 3, "", None, false);
        set.write(3, 4, "", Some(&link), false);
        assert_eq!(set.len(), 2);
        assert_eq!(set.as_slice()[1].link.as_ref(), Some(&link));
    }

    #[test]
    fn test_overwrite_same_style_in_place() {
        let mut set = RangeSet::new();
        let mut shadow = Vec::new();
        write(&mut set, &mut shadow, 0, 10, "a");
        let outcome = write(&mut set, &mut shadow, 2, 3, "a");
        assert_eq!(layout(&set), vec![(0, 10, "a")]);
        assert_eq!(
            outcome.changes,
            vec![RangeChange::Updated(0, set.as_slice()[0].clone())]
        );
    }

    #[test]
    fn test_overwrite_splits_range() {
        let mut set = RangeSet::new();
        let mut shadow = Vec::new();
        write(&mut set, &mut shadow, 0, 10, "a");
        let original = set.as_slice()[0].id;
        write(&mut set, &mut shadow, 3, 2, "b");
        assert_eq!(layout(&set), vec![(0, 3, "a"), (3, 2, "b"), (5, 5, "a")]);
        assert_eq!(set.as_slice()[0].id, original);
        assert_ne!(set.as_slice()[2].id, original);
    }

    #[test]
    fn test_overwrite_clips_and_removes() {
        let mut set = RangeSet::new();
        let mut shadow = Vec::new();
        write(&mut set, &mut shadow, 0, 4, "a");
        write(&mut set, &mut shadow, 4, 2, "b");
        write(&mut set, &mut shadow, 6, 4, "c");
        write(&mut set, &mut shadow, 2, 6, "d");
        assert_eq!(layout(&set), vec![(0, 2, "a"), (2, 6, "d"), (8, 2, "c")]);
    }

    #[test]
    fn test_overwrite_merges_neighbours_with_same_style() {
        let mut set = RangeSet::new();
        let mut shadow = Vec::new();
        write(&mut set, &mut shadow, 0, 4, "a");
        write(&mut set, &mut shadow, 4, 2, "b");
        write(&mut set, &mut shadow, 6, 4, "a");
        let first = set.as_slice()[0].id;
        let outcome = write(&mut set, &mut shadow, 3, 4, "a");
        assert_eq!(layout(&set), vec![(0, 10, "a")]);
        assert_eq!(outcome.target_id, Some(first));
    }

    #[test]
    fn test_overwrite_whole_range_leaves_no_empty_fragment() {
        let mut set = RangeSet::new();
        let mut shadow = Vec::new();
        write(&mut set, &mut shadow, 0, 3, "a");
        write(&mut set, &mut shadow, 3, 3, "b");
        write(&mut set, &mut shadow, 0, 3, "c");
        assert_eq!(layout(&set), vec![(0, 3, "c"), (3, 3, "b")]);
    }

    #[test]
    fn test_overwrite_past_end_extends_coverage() {
        let mut set = RangeSet::new();
        let mut shadow = Vec::new();
        write(&mut set, &mut shadow, 0, 5, "a");
        write(&mut set, &mut shadow, 5, 3, "b");
        write(&mut set, &mut shadow, 6, 5, "b");
        assert_eq!(layout(&set), vec![(0, 5, "a"), (5, 6, "b")]);
        write(&mut set, &mut shadow, 3, 10, "c");
        assert_eq!(layout(&set), vec![(0, 3, "a"), (3, 10, "c")]);
    }

    #[test]
    fn test_remove_prefix() {
        let mut set = RangeSet::new();
        let mut shadow = Vec::new();
        write(&mut set, &mut shadow, 0, 4, "a");
        write(&mut set, &mut shadow, 4, 4, "b");
        write(&mut set, &mut shadow, 8, 4, "c");

        let changes = set.remove_prefix(6);
        check(&set, &mut shadow, &changes);
        assert_eq!(layout(&set), vec![(0, 2, "b"), (2, 4, "c")]);
        assert_eq!(changes.last(), Some(&RangeChange::Clipped(0, set.as_slice()[0].clone(), 2)));

        let changes = set.remove_prefix(2);
        check(&set, &mut shadow, &changes);
        assert_eq!(layout(&set), vec![(0, 4, "c")]);
    }
}
