use std::collections::VecDeque;
use std::ops::Index;

/// Fixed-length sliding window of per-block values, oldest first.
///
/// Starts full of zeros; every push evicts exactly one value, so the length
/// never changes after construction.
#[derive(Debug, Clone)]
pub struct AnalysisWindow {
    values: VecDeque<f32>,
}

impl AnalysisWindow {
    pub fn new(size: usize) -> Self {
        Self {
            values: std::iter::repeat(0.0).take(size).collect(),
        }
    }

    pub fn push(&mut self, value: f32) {
        if self.values.is_empty() {
            return;
        }
        self.values.pop_front();
        self.values.push_back(value);
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.values.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn fill_zero(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied()
    }
}

impl Index<usize> for AnalysisWindow {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.values[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_slides_without_changing_length() {
        let mut window = AnalysisWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            window.push(v);
            assert_eq!(window.len(), 3);
        }
        assert_eq!(window.iter().collect::<Vec<_>>(), vec![2.0, 3.0, 4.0]);
        assert_eq!(window[2], 4.0);
    }

    #[test]
    fn fill_zero_keeps_length() {
        let mut window = AnalysisWindow::new(4);
        window.push(1.0);
        window.fill_zero();
        assert_eq!(window.len(), 4);
        assert!(window.iter().all(|v| v == 0.0));
        assert_eq!(window.get(4), None);
    }
}
