/// Fixed-capacity circular sample store.
///
/// `head` is the write cursor, `tail` the read cursor. `head == tail` means
/// empty unless `full` is set. No separate length counter is kept; the
/// available length is always derived from the cursors.
///
/// Overflow behavior: pushing more than the free space overwrites the oldest
/// samples and leaves the buffer full.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    buffer: Vec<f32>,
    head: usize,
    tail: usize,
    full: bool,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![0.0; capacity],
            head: 0,
            tail: 0,
            full: false,
        }
    }

    /// Write `input` at the head, wrapping as needed.
    ///
    /// If `input` does not fit in the free space the tail snaps to the head,
    /// discarding the oldest samples. Only the newest `capacity` samples of an
    /// oversized input are kept.
    pub fn push_front(&mut self, input: &[f32]) {
        let capacity = self.buffer.len();
        if input.is_empty() || capacity == 0 {
            return;
        }

        let free_length = capacity - self.data_length();
        let overflowed = free_length <= input.len();

        let input = if input.len() > capacity {
            &input[input.len() - capacity..]
        } else {
            input
        };

        let head_to_end = capacity - self.head;
        if head_to_end > input.len() {
            self.buffer[self.head..self.head + input.len()].copy_from_slice(input);
            self.head += input.len();
        } else {
            let (first, second) = input.split_at(head_to_end);
            self.buffer[self.head..].copy_from_slice(first);
            self.buffer[..second.len()].copy_from_slice(second);
            self.head = second.len();
        }

        if overflowed {
            self.tail = self.head;
            self.full = true;
        } else {
            self.full = false;
        }
    }

    /// The oldest `length` samples as up to two contiguous spans.
    ///
    /// Returns two empty spans when fewer than `length` samples are stored;
    /// a request is never partially fulfilled.
    pub fn back(&self, length: usize) -> (&[f32], &[f32]) {
        if length == 0 || self.data_length() < length {
            return (&[], &[]);
        }

        let tail_to_end = self.buffer.len() - self.tail;
        if tail_to_end < length {
            (&self.buffer[self.tail..], &self.buffer[..length - tail_to_end])
        } else {
            (&self.buffer[self.tail..self.tail + length], &[])
        }
    }

    /// Copy the oldest `out.len()` samples into `out` without consuming them.
    ///
    /// Returns `false` (leaving `out` untouched) if not enough samples are stored.
    pub fn copy_back(&self, out: &mut [f32]) -> bool {
        let (first, second) = self.back(out.len());
        if first.len() + second.len() != out.len() || out.is_empty() {
            return false;
        }
        out[..first.len()].copy_from_slice(first);
        out[first.len()..].copy_from_slice(second);
        true
    }

    /// Discard the oldest `length` samples (clamped to what is stored).
    pub fn pop_back(&mut self, length: usize) {
        let length = length.min(self.data_length());
        if length == 0 {
            return;
        }
        self.tail += length;
        if self.tail >= self.buffer.len() {
            self.tail -= self.buffer.len();
        }
        self.full = false;
    }

    /// Number of samples currently stored.
    pub fn data_length(&self) -> usize {
        if self.head == self.tail {
            if self.full {
                self.buffer.len()
            } else {
                0
            }
        } else if self.head < self.tail {
            self.buffer.len() - (self.tail - self.head)
        } else {
            self.head - self.tail
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data_length() == 0
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.full = false;
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(buf: &mut RingBuffer) -> Vec<f32> {
        let len = buf.data_length();
        let (first, second) = buf.back(len);
        let out: Vec<f32> = first.iter().chain(second).copied().collect();
        buf.pop_back(len);
        out
    }

    #[test]
    fn basic_push_pop() {
        let mut buf = RingBuffer::new(10);
        buf.push_front(&[1.0, 2.0, 3.0]);

        assert_eq!(buf.data_length(), 3);
        assert_eq!(buf.back(3), (&[1.0, 2.0, 3.0][..], &[][..]));
        buf.pop_back(3);
        assert!(buf.is_empty());
    }

    #[test]
    fn back_never_partially_fulfills() {
        let mut buf = RingBuffer::new(8);
        buf.push_front(&[1.0, 2.0]);

        let (first, second) = buf.back(3);
        assert!(first.is_empty());
        assert!(second.is_empty());
        assert_eq!(buf.data_length(), 2);
    }

    #[test]
    fn overflow_drops_oldest_and_marks_full() {
        let mut buf = RingBuffer::new(4);
        buf.push_front(&[1.0, 2.0, 3.0]);
        buf.push_front(&[4.0, 5.0, 6.0]); // free space 1, pushed 3

        assert!(buf.is_full());
        assert_eq!(buf.data_length(), 4);
        assert_eq!(drain(&mut buf), vec![3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn exact_fill_is_full() {
        let mut buf = RingBuffer::new(4);
        buf.push_front(&[1.0, 2.0, 3.0, 4.0]);

        assert!(buf.is_full());
        assert_eq!(buf.data_length(), 4);
        assert_eq!(drain(&mut buf), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn push_larger_than_capacity_keeps_newest() {
        let mut buf = RingBuffer::new(3);
        buf.push_front(&[1.0]);
        buf.push_front(&[2.0, 3.0, 4.0, 5.0, 6.0]);

        assert_eq!(buf.data_length(), 3);
        assert_eq!(drain(&mut buf), vec![4.0, 5.0, 6.0]);
    }

    #[test]
    fn back_splits_across_wrap() {
        let mut buf = RingBuffer::new(5);
        buf.push_front(&[1.0, 2.0, 3.0, 4.0]);
        buf.pop_back(3);
        buf.push_front(&[5.0, 6.0, 7.0]); // head wraps to 2

        let (first, second) = buf.back(4);
        assert_eq!(first, &[4.0, 5.0]);
        assert_eq!(second, &[6.0, 7.0]);
    }

    #[test]
    fn copy_back_does_not_consume() {
        let mut buf = RingBuffer::new(4);
        buf.push_front(&[1.0, 2.0, 3.0]);
        let mut out = [0.0; 2];

        assert!(buf.copy_back(&mut out));
        assert_eq!(out, [1.0, 2.0]);
        assert_eq!(buf.data_length(), 3);

        let mut too_long = [9.0; 4];
        assert!(!buf.copy_back(&mut too_long));
        assert_eq!(too_long, [9.0; 4]);
    }

    #[test]
    fn pop_zero_keeps_full_flag() {
        let mut buf = RingBuffer::new(2);
        buf.push_front(&[1.0, 2.0]);
        buf.pop_back(0);
        assert_eq!(buf.data_length(), 2);
    }

    #[test]
    fn clear_resets_cursors() {
        let mut buf = RingBuffer::new(3);
        buf.push_front(&[1.0, 2.0, 3.0, 4.0]);
        buf.clear();

        assert!(buf.is_empty());
        assert!(!buf.is_full());
        assert_eq!(buf.back(1), (&[][..], &[][..]));
    }

    #[test]
    fn length_tracks_a_reference_model() {
        // Deterministic pseudo-random push/pop sequence against a VecDeque.
        let capacity = 7;
        let mut buf = RingBuffer::new(capacity);
        let mut model = std::collections::VecDeque::new();
        let mut seed: u32 = 0x1234_5678;
        let mut next = || {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 16) as usize
        };
        let mut counter = 0.0f32;

        for _ in 0..2_000 {
            if next() % 3 == 0 {
                let n = next() % (capacity + 1);
                buf.pop_back(n);
                for _ in 0..n.min(model.len()) {
                    model.pop_front();
                }
            } else {
                let n = next() % (capacity * 2);
                let input: Vec<f32> = (0..n)
                    .map(|_| {
                        counter += 1.0;
                        counter
                    })
                    .collect();
                buf.push_front(&input);
                model.extend(input);
                while model.len() > capacity {
                    model.pop_front();
                }
            }

            let len = buf.data_length();
            assert!(len <= capacity);
            assert_eq!(len, model.len());

            let (first, second) = buf.back(len);
            let stored: Vec<f32> = first.iter().chain(second).copied().collect();
            let expected: Vec<f32> = model.iter().copied().collect();
            assert_eq!(stored, expected);

            let (a, b) = buf.back(len + 1);
            assert!(a.is_empty() && b.is_empty());
        }
    }
}
