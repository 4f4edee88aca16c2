//! Multi-pass moving average

/// One averaging stage with its own ring of inputs
#[derive(Debug, Clone)]
struct Pass {
    ring: Vec<Vec<f32>>,
    sums: Vec<f64>,
    next: usize,
    filled: usize,
}

impl Pass {
    fn new(samples: usize, elements: usize) -> Self {
        Self {
            ring: vec![vec![0.0; elements]; samples],
            sums: vec![0.0; elements],
            next: 0,
            filled: 0,
        }
    }

    fn is_steady(&self) -> bool {
        self.filled == self.ring.len()
    }

    fn push(&mut self, input: &[f32]) {
        let window = self.ring.len();
        let full = self.filled == window;
        let slot = &mut self.ring[self.next];
        for ((sum, old), &new) in self.sums.iter_mut().zip(slot.iter_mut()).zip(input) {
            if full {
                *sum -= f64::from(*old);
            }
            *sum += f64::from(new);
            *old = new;
        }
        self.next = (self.next + 1) % window;
        self.filled = (self.filled + 1).min(window);
    }

    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    fn output(&self) -> Vec<f32> {
        if self.filled == 0 {
            return vec![0.0; self.sums.len()];
        }
        let count = self.filled as f64;
        self.sums.iter().map(|sum| (sum / count) as f32).collect()
    }

    fn prime(&mut self) {
        for slot in &mut self.ring {
            slot.fill(0.0);
        }
        self.sums.fill(0.0);
        self.next = 0;
        self.filled = self.ring.len();
    }
}

/// Cascaded moving-average filter over a fixed number of elements
///
/// Each pass averages the last `samples` outputs of the pass before it; the
/// first pass averages raw samples. A pass only starts collecting once the
/// pass before it has a full window, and the result comes from the deepest
/// pass collecting so far. A filter built with fewer than two samples or no
/// passes hands samples through unchanged.
#[derive(Debug, Clone)]
pub struct MovingAverageFilter {
    elements: usize,
    passes: Vec<Pass>,
    latest: Vec<f32>,
    sample_rate_hz: f64,
    last_timestamp: Option<i64>,
}

impl MovingAverageFilter {
    /// Create a filter over `elements` independent channels
    pub fn new(samples: usize, passes: usize, elements: usize) -> Self {
        let elements = elements.max(1);
        let passes = if samples > 1 && passes > 0 {
            (0..passes).map(|_| Pass::new(samples, elements)).collect()
        } else {
            log::debug!("Filter with {samples} samples and {passes} passes is a passthrough");
            Vec::new()
        };
        Self {
            elements,
            passes,
            latest: vec![0.0; elements],
            sample_rate_hz: 50.0,
            last_timestamp: None,
        }
    }

    /// Nominal rate used by [`MovingAverageFilter::add_sample_at`] to fill gaps
    pub fn with_sample_rate(mut self, hz: f64) -> Self {
        self.sample_rate_hz = hz;
        self
    }

    /// Whether samples are handed through unfiltered
    pub fn is_passthrough(&self) -> bool {
        self.passes.is_empty()
    }

    /// Number of channels filtered
    pub fn elements(&self) -> usize {
        self.elements
    }

    /// Behave as if every pass had already seen a full window of zeros
    pub fn prime(&mut self) {
        for pass in &mut self.passes {
            pass.prime();
        }
    }

    /// Add one sample
    ///
    /// A sample with the wrong number of elements is logged and dropped.
    pub fn add_sample(&mut self, sample: &[f32]) {
        if !self.accepts(sample) {
            return;
        }
        self.push(sample);
    }

    /// Add one sample taken at `timestamp_ns`, repeating it to fill gaps
    ///
    /// The sample is added once per nominal period elapsed since the
    /// previous timestamp (rounded), so a sample arriving early may not be
    /// added at all. The first sample is always added once. Long gaps are
    /// capped at the point where every window is full of the sample.
    pub fn add_sample_at(&mut self, sample: &[f32], timestamp_ns: i64) {
        if !self.accepts(sample) {
            return;
        }
        let repeats = match self.last_timestamp {
            None => 1,
            Some(_) if self.is_passthrough() => 1,
            Some(last) => whole_periods(timestamp_ns.saturating_sub(last), self.sample_rate_hz)
                .min(self.saturation_repeats()),
        };
        self.last_timestamp = Some(timestamp_ns);
        for _ in 0..repeats {
            self.push(sample);
        }
    }

    /// Latest filtered value
    pub fn result(&self) -> Vec<f32> {
        if self.is_passthrough() {
            return self.latest.clone();
        }
        self.passes
            .iter()
            .rev()
            .find(|pass| pass.filled > 0)
            .map_or_else(|| vec![0.0; self.elements], Pass::output)
    }

    /// Latest filtered value of a three-channel filter
    pub fn result3(&self) -> Option<[f32; 3]> {
        <[f32; 3]>::try_from(self.result()).ok()
    }

    /// Repeats after which every pass window holds only the repeated sample
    fn saturation_repeats(&self) -> usize {
        self.passes.iter().map(|pass| pass.ring.len()).sum()
    }

    fn accepts(&self, sample: &[f32]) -> bool {
        if sample.len() == self.elements {
            return true;
        }
        log::warn!(
            "Sample has {} elements, filter expects {}",
            sample.len(),
            self.elements
        );
        false
    }

    fn push(&mut self, sample: &[f32]) {
        if self.passes.is_empty() {
            self.latest.copy_from_slice(sample);
            return;
        }
        let mut input = sample.to_vec();
        for index in 0..self.passes.len() {
            let ready = index == 0 || self.passes[index - 1].is_steady();
            if !ready {
                break;
            }
            self.passes[index].push(&input);
            input = self.passes[index].output();
        }
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_periods(elapsed_ns: i64, hz: f64) -> usize {
    (elapsed_ns as f64 * hz * 1e-9).round().max(0.0) as usize
}
