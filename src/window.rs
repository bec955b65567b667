use std::collections::VecDeque;

/// Most recent latency samples in arrival order, capped at `capacity`.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    samples: VecDeque<f64>,
    capacity: usize,
    appended: u64,
}

impl SampleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::new(),
            capacity,
            appended: 0,
        }
    }

    pub fn append(&mut self, sample: f64) {
        self.samples.push_back(sample);
        self.appended += 1;
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples ever appended, evicted ones included.
    pub fn total_appended(&self) -> u64 {
        self.appended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_once_full() {
        let mut window = SampleWindow::new(3);
        for v in [1.0, 2.0, 5.0, 0.5] {
            window.append(v);
            assert!(window.len() <= 3);
        }
        assert_eq!(window.snapshot(), vec![2.0, 5.0, 0.5]);
        assert_eq!(window.total_appended(), 4);
    }

    #[test]
    fn keeps_sentinels() {
        let mut window = SampleWindow::new(2);
        window.append(-1.0);
        window.append(0.3);
        assert_eq!(window.snapshot(), vec![-1.0, 0.3]);
    }

    #[test]
    fn capacity_one_holds_latest() {
        let mut window = SampleWindow::new(1);
        window.append(1.0);
        window.append(2.0);
        assert_eq!(window.snapshot(), vec![2.0]);
        assert_eq!(window.capacity(), 1);
    }
}
