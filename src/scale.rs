//! Axis scales shared by the chart renderers. The linear scale rounds its
//! domain outward to tick-friendly bounds the way d3 does, so axis labels
//! land on 1/2/5 multiples of a power of ten.

#[derive(Debug, Clone, Copy)]
pub struct LinearScale {
    domain_min: f64,
    domain_max: f64,
    range_min: f64,
    range_max: f64,
    step: f64,
}

impl LinearScale {
    /// Scale over the exact `[min, max]` domain, no rounding.
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        let (domain_min, domain_max) = domain;
        let span = domain_max - domain_min;
        Self {
            domain_min,
            domain_max,
            range_min: range.0,
            range_max: range.1,
            step: tick_step(span.abs().max(f64::MIN_POSITIVE), 2),
        }
    }

    /// Scale fitted to `values`, with the domain widened to nice bounds.
    /// `zero_baseline` anchors the lower bound at zero for magnitude
    /// charts (bars, ranked values).
    pub fn nice(values: &[f64], range: (f64, f64), tick_count: usize, zero_baseline: bool) -> Self {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for &value in values {
            if value.is_finite() {
                min = min.min(value);
                max = max.max(value);
            }
        }
        if !min.is_finite() || !max.is_finite() {
            min = 0.0;
            max = 1.0;
        }
        if zero_baseline {
            min = min.min(0.0);
        }
        if max <= min {
            max = min + 1.0;
        }

        let step = tick_step(max - min, tick_count);
        let domain_min = (min / step).floor() * step;
        let domain_max = (max / step).ceil() * step;
        Self {
            domain_min,
            domain_max,
            range_min: range.0,
            range_max: range.1,
            step,
        }
    }

    pub fn scale(&self, value: f64) -> f64 {
        let span = self.domain_max - self.domain_min;
        if span == 0.0 {
            return self.range_min;
        }
        let t = (value - self.domain_min) / span;
        self.range_min + t * (self.range_max - self.range_min)
    }

    pub fn domain(&self) -> (f64, f64) {
        (self.domain_min, self.domain_max)
    }

    /// Tick values from the lower to the upper domain bound. Computed on an
    /// integer grid so floating point drift cannot skip the last tick.
    pub fn ticks(&self) -> Vec<f64> {
        let first = (self.domain_min / self.step).round() as i64;
        let last = (self.domain_max / self.step).round() as i64;
        (first..=last).map(|i| i as f64 * self.step).collect()
    }
}

/// d3's tick increment: the 1/2/5 multiple of a power of ten closest to
/// dividing `span` into `count` intervals.
fn tick_step(span: f64, count: usize) -> f64 {
    let count = count.max(1) as f64;
    let raw = span / count;
    let power = raw.log10().floor();
    let base = 10f64.powf(power);
    let error = raw / base;
    let factor = if error >= 50f64.sqrt() {
        10.0
    } else if error >= 10f64.sqrt() {
        5.0
    } else if error >= 2f64.sqrt() {
        2.0
    } else {
        1.0
    };
    factor * base
}

/// Evenly divided categorical scale with inner padding, used for bar
/// charts. Band `i` starts at `position(i)` and is `bandwidth()` wide.
#[derive(Debug, Clone, Copy)]
pub struct BandScale {
    range_min: f64,
    step: f64,
    bandwidth: f64,
}

impl BandScale {
    pub fn new(count: usize, range: (f64, f64), padding_ratio: f64) -> Self {
        let count = count.max(1);
        let step = (range.1 - range.0) / count as f64;
        let padding = step * padding_ratio.clamp(0.0, 0.45);
        Self {
            range_min: range.0,
            step,
            bandwidth: step - padding * 2.0,
        }
    }

    pub fn position(&self, index: usize) -> f64 {
        self.range_min + index as f64 * self.step + (self.step - self.bandwidth) / 2.0
    }

    pub fn center(&self, index: usize) -> f64 {
        self.position(index) + self.bandwidth / 2.0
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nice_scale_covers_data() {
        let scale = LinearScale::nice(&[3.0, 17.0, 42.0], (0.0, 100.0), 5, true);
        let (min, max) = scale.domain();
        assert!(min <= 0.0);
        assert!(max >= 42.0);
    }

    #[test]
    fn nice_ticks_are_round_and_ordered() {
        let scale = LinearScale::nice(&[0.0, 97.0], (0.0, 100.0), 5, true);
        let ticks = scale.ticks();
        assert!(ticks.len() >= 2);
        for pair in ticks.windows(2) {
            assert!(pair[1] > pair[0]);
        }
        assert_eq!(ticks.first().copied(), Some(scale.domain().0));
        assert_eq!(ticks.last().copied(), Some(scale.domain().1));
        for tick in &ticks {
            assert_eq!(tick % 20.0, 0.0, "tick {tick} is not on the step grid");
        }
    }

    #[test]
    fn scale_maps_domain_ends_to_range_ends() {
        let scale = LinearScale::new((0.0, 10.0), (0.0, 200.0));
        assert_eq!(scale.scale(0.0), 0.0);
        assert_eq!(scale.scale(10.0), 200.0);
        assert_eq!(scale.scale(5.0), 100.0);
    }

    #[test]
    fn inverted_range_flips_direction() {
        // SVG y grows downward, so value axes hand in a flipped range.
        let scale = LinearScale::new((0.0, 10.0), (300.0, 0.0));
        assert_eq!(scale.scale(0.0), 300.0);
        assert_eq!(scale.scale(10.0), 0.0);
    }

    #[test]
    fn constant_data_still_produces_a_span() {
        let scale = LinearScale::nice(&[5.0, 5.0, 5.0], (0.0, 100.0), 5, false);
        let (min, max) = scale.domain();
        assert!(max > min);
    }

    #[test]
    fn band_scale_partitions_range() {
        let band = BandScale::new(4, (0.0, 400.0), 0.1);
        assert!(band.bandwidth() > 0.0);
        assert!(band.position(0) >= 0.0);
        let last_end = band.position(3) + band.bandwidth();
        assert!(last_end <= 400.0 + 1e-9);
        assert!(band.center(1) > band.center(0));
    }

    #[test]
    fn band_scale_handles_single_category() {
        let band = BandScale::new(1, (0.0, 100.0), 0.2);
        assert!((band.center(0) - 50.0).abs() < 1e-9);
    }
}
