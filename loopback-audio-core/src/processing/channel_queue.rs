use super::ring_buffer::RingBuffer;

/// Bounded, time-ordered sample queue for a single channel.
///
/// Backed by a [`RingBuffer`] whose capacity is the queue bound, so pushing
/// past the bound drops the oldest samples.
#[derive(Debug, Clone)]
pub struct ChannelQueue {
    ring: RingBuffer,
}

impl ChannelQueue {
    pub fn new(max_len: usize) -> Self {
        Self {
            ring: RingBuffer::new(max_len),
        }
    }

    /// Append samples, returning how many old samples were evicted.
    pub fn push(&mut self, samples: &[f32]) -> usize {
        let evicted = (self.len() + samples.len()).saturating_sub(self.max_len());
        self.ring.push_front(samples);
        evicted
    }

    /// Move exactly `out.len()` of the oldest samples into `out`.
    ///
    /// Leaves both the queue and `out` untouched and returns `false` when
    /// fewer samples are queued.
    pub fn pop_into(&mut self, out: &mut [f32]) -> bool {
        if !self.ring.copy_back(out) {
            return false;
        }
        self.ring.pop_back(out.len());
        true
    }

    /// Remove and return the oldest `count` samples; empty if fewer are queued.
    pub fn take(&mut self, count: usize) -> Vec<f32> {
        let (first, second) = self.ring.back(count);
        let mut taken = Vec::with_capacity(first.len() + second.len());
        taken.extend_from_slice(first);
        taken.extend_from_slice(second);
        self.ring.pop_back(taken.len());
        taken
    }

    /// Drop the oldest samples until at most `len` remain.
    pub fn truncate_oldest(&mut self, len: usize) {
        let excess = self.len().saturating_sub(len);
        self.ring.pop_back(excess);
    }

    pub fn len(&self) -> usize {
        self.ring.data_length()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn max_len(&self) -> usize {
        self.ring.capacity()
    }

    pub fn clear(&mut self) {
        self.ring.clear();
    }
}

/// One queue per channel, guarded as a unit by the engine.
#[derive(Debug, Clone, Default)]
pub struct ChannelQueues {
    queues: Vec<ChannelQueue>,
}

impl ChannelQueues {
    pub fn new(channels: usize, max_len: usize) -> Self {
        Self {
            queues: (0..channels).map(|_| ChannelQueue::new(max_len)).collect(),
        }
    }

    pub fn get_mut(&mut self, channel: usize) -> Option<&mut ChannelQueue> {
        self.queues.get_mut(channel)
    }

    /// Queued length of `channel`, or 0 for an unknown channel.
    pub fn len_of(&self, channel: usize) -> usize {
        self.queues.get(channel).map_or(0, ChannelQueue::len)
    }

    /// Shortest queue length across all channels.
    pub fn min_len(&self) -> usize {
        self.queues.iter().map(ChannelQueue::len).min().unwrap_or(0)
    }

    /// Trim `channel` down to the shortest queue so channels stay in phase.
    pub fn catch_up(&mut self, channel: usize) {
        let min_len = self.min_len();
        if let Some(queue) = self.queues.get_mut(channel) {
            queue.truncate_oldest(min_len);
        }
    }

    /// Push one de-interleaved block per channel, returning total evictions.
    pub fn push_all(&mut self, blocks: &[Vec<f32>]) -> usize {
        self.queues
            .iter_mut()
            .zip(blocks)
            .map(|(queue, block)| queue.push(block))
            .sum()
    }

    /// Take the largest common prefix, rounded down to a multiple of
    /// `alignment`, from every channel. `None` if not even one alignment is
    /// available on all channels.
    pub fn take_aligned(&mut self, alignment: usize) -> Option<Vec<Vec<f32>>> {
        if alignment == 0 || self.queues.is_empty() {
            return None;
        }
        let count = self.min_len() / alignment * alignment;
        if count == 0 {
            return None;
        }
        Some(self.queues.iter_mut().map(|queue| queue.take(count)).collect())
    }

    pub fn clear(&mut self) {
        for queue in &mut self.queues {
            queue.clear();
        }
    }
}
