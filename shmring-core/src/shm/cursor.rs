// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Ring cursor arithmetic.
//!
//! All wraparound math for the ring lives here. The ring reserves one slot:
//! an empty ring has `write == read`, a full ring has
//! `(write + 1) % capacity == read`, so the two states never share an offset
//! pair and `pending + free == capacity - 1` always holds.

/// Validated snapshot of the ring header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursors {
    write: usize,
    read: usize,
    capacity: usize,
}

impl Cursors {
    /// Smallest capacity that can hold a byte next to the reserved slot.
    pub const MIN_CAPACITY: usize = 2;

    /// Returns `None` when the values cannot describe a ring.
    pub fn new(write: usize, read: usize, capacity: usize) -> Option<Self> {
        if capacity < Self::MIN_CAPACITY || write >= capacity || read >= capacity {
            return None;
        }
        Some(Self {
            write,
            read,
            capacity,
        })
    }

    pub const fn write(&self) -> usize {
        self.write
    }

    pub const fn read(&self) -> usize {
        self.read
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Bytes written but not yet read.
    pub const fn pending(&self) -> usize {
        (self.write + self.capacity - self.read) % self.capacity
    }

    /// Bytes that can be written without overtaking the reader.
    pub const fn free(&self) -> usize {
        self.capacity - self.pending() - 1
    }

    /// Offset `len` bytes past `offset`, wrapped.
    pub const fn advance(&self, offset: usize, len: usize) -> usize {
        (offset + len) % self.capacity
    }

    /// Physical ranges covering `len` bytes starting at `offset`.
    pub const fn spans(&self, offset: usize, len: usize) -> Spans {
        let first = if len < self.capacity - offset {
            len
        } else {
            self.capacity - offset
        };
        Spans {
            first: Span {
                start: offset,
                len: first,
            },
            second: Span {
                start: 0,
                len: len - first,
            },
        }
    }
}

/// A contiguous range of the payload region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub len: usize,
}

/// One logical access split at the end of the payload region.
/// `second.len` is zero when nothing wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spans {
    pub first: Span,
    pub second: Span,
}

impl Spans {
    /// Non-empty spans paired with their offset into the caller's buffer.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Span)> {
        let first = self.first;
        let second = self.second;
        [(0, first), (first.len, second)]
            .into_iter()
            .filter(|(_, span)| span.len > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_headers() {
        assert!(Cursors::new(0, 0, 0).is_none());
        assert!(Cursors::new(0, 0, 1).is_none());
        assert!(Cursors::new(10, 0, 10).is_none());
        assert!(Cursors::new(0, 10, 10).is_none());
        assert!(Cursors::new(9, 9, 10).is_some());
    }

    #[test]
    fn test_empty_and_full_are_distinct() {
        let empty = Cursors::new(3, 3, 8).unwrap();
        assert_eq!(empty.pending(), 0);
        assert_eq!(empty.free(), 7);

        let full = Cursors::new(2, 3, 8).unwrap();
        assert_eq!(full.pending(), 7);
        assert_eq!(full.free(), 0);

        for write in 0..8 {
            for read in 0..8 {
                let c = Cursors::new(write, read, 8).unwrap();
                assert_eq!(c.pending() + c.free(), 7);
            }
        }
    }

    #[test]
    fn test_spans_split_at_end() {
        let c = Cursors::new(0, 0, 10).unwrap();

        let s = c.spans(4, 3);
        assert_eq!(s.first, Span { start: 4, len: 3 });
        assert_eq!(s.second.len, 0);
        assert_eq!(s.iter().count(), 1);

        let s = c.spans(8, 5);
        assert_eq!(s.first, Span { start: 8, len: 2 });
        assert_eq!(s.second, Span { start: 0, len: 3 });
        assert_eq!(s.iter().collect::<Vec<_>>(), vec![(0, s.first), (2, s.second)]);

        let s = c.spans(6, 4);
        assert_eq!(s.first, Span { start: 6, len: 4 });
        assert_eq!(s.second.len, 0);

        assert_eq!(c.spans(3, 0).iter().count(), 0);
    }

    #[test]
    fn test_advance_wraps() {
        let c = Cursors::new(0, 0, 10).unwrap();
        assert_eq!(c.advance(8, 2), 0);
        assert_eq!(c.advance(8, 5), 3);
        assert_eq!(c.advance(0, 9), 9);
    }
}
