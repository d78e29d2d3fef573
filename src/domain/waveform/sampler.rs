//! Waveform bar resampling
//!
//! Turns an amplitude series of any length into exactly `bar_count` heights
//! in [0, 1] for rendering.

/// Height used when a sample is missing or no pattern seed is known
pub const FALLBACK_LEVEL: f32 = 0.3;

/// Resample `series` to exactly `bar_count` bars.
///
/// Bar `i` takes `series[floor(i * len / bar_count)]`. An empty series
/// yields the flat fallback pattern.
pub fn sample_bars(series: &[f32], bar_count: usize) -> Vec<f32> {
    if series.is_empty() {
        return vec![FALLBACK_LEVEL; bar_count];
    }

    let len = series.len();
    (0..bar_count)
        .map(|i| {
            let index = i * len / bar_count;
            series
                .get(index)
                .copied()
                .filter(|v| v.is_finite())
                .map(|v| v.clamp(0.0, 1.0))
                .unwrap_or(FALLBACK_LEVEL)
        })
        .collect()
}

/// Resample `series`, falling back to a pattern seeded by `message_id` when
/// the series is empty.
///
/// The seeded pattern is deterministic: the same id always renders the
/// same bars, and different ids look different.
pub fn waveform_bars(series: &[f32], bar_count: usize, message_id: Option<&str>) -> Vec<f32> {
    match (series.is_empty(), message_id) {
        (true, Some(id)) => seeded_pattern(id, bar_count),
        _ => sample_bars(series, bar_count),
    }
}

/// Sine-plus-noise pattern derived from a stable identifier
pub fn seeded_pattern(seed: &str, bar_count: usize) -> Vec<f32> {
    let hash = fnv1a(seed.as_bytes());
    let mut rng = SplitMix64::new(hash);

    // Phase and frequency vary per message so adjacent bubbles differ
    let phase = (hash % 628) as f32 / 100.0;
    let frequency = 0.35 + ((hash >> 16) & 0xff) as f32 / 1024.0;

    (0..bar_count)
        .map(|i| {
            let wave = (i as f32 * frequency + phase).sin() * 0.25;
            let noise = (rng.next_unit() - 0.5) * 0.3;
            (0.45 + wave + noise).clamp(0.1, 1.0)
        })
        .collect()
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, &b| (hash ^ b as u64).wrapping_mul(PRIME))
}

/// Small deterministic generator; stable across platforms and releases
struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }

    /// Uniform value in [0, 1)
    fn next_unit(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}
