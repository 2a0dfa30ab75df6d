//! Ultrasonic ranging and proximity debouncing.
//!
//! [`HcSr04`] measures distance with a trigger/echo pin pair.
//! [`ProximityFilter`] turns a noisy stream of distances into a stable
//! "something is near" signal by majority vote over the last ten samples.
//!
//! # Example
//!
//! ```rust
//! use smartfarm_kit::config::ProximityConfig;
//! use smartfarm_kit::sonar::ProximityFilter;
//!
//! let mut filter = ProximityFilter::new(ProximityConfig::default());
//!
//! // Four hits out of ten: not yet near
//! for _ in 0..4 {
//!     assert!(!filter.update(8, 10));
//! }
//! // The fifth tips the vote
//! assert!(filter.update(8, 10));
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use heapless::HistoryBuffer;
use log::trace;

use crate::config::{ProximityConfig, SonarConfig};
use crate::traits::{Clock, SonarRanger};

/// Number of samples the proximity vote is taken over.
pub const WINDOW: usize = 10;

/// Round-trip echo time per centimeter of distance (µs).
pub const US_PER_CM: u32 = 58;

/// Converts an echo pulse width into whole centimeters.
#[inline]
pub fn pulse_to_cm(pulse_us: u64) -> u32 {
    (pulse_us / US_PER_CM as u64) as u32
}

// ============================================================================
// Proximity Filter
// ============================================================================

/// Sliding-window majority vote over distance samples.
///
/// The window starts full of misses, so the first `min_hits - 1` hits never
/// report near.
#[derive(Clone, Debug)]
pub struct ProximityFilter<const N: usize = WINDOW> {
    window: HistoryBuffer<bool, N>,
    config: ProximityConfig,
}

impl ProximityFilter {
    /// Creates a filter with the standard ten-sample window.
    pub fn new(config: ProximityConfig) -> Self {
        Self::with_window(config)
    }
}

impl<const N: usize> ProximityFilter<N> {
    /// Creates a filter with an `N`-sample window.
    pub fn with_window(config: ProximityConfig) -> Self {
        Self {
            window: HistoryBuffer::new_with(false),
            config,
        }
    }

    /// Returns the filter configuration.
    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    /// Whether a single reading counts as a hit.
    pub fn is_hit(&self, distance_cm: u32, threshold_cm: u32) -> bool {
        if self.config.ignore_zero && distance_cm == 0 {
            return false;
        }
        distance_cm <= threshold_cm
    }

    /// Records one reading and returns whether the vote says "near".
    pub fn update(&mut self, distance_cm: u32, threshold_cm: u32) -> bool {
        let hit = self.is_hit(distance_cm, threshold_cm);
        self.window.write(hit);
        let near = self.is_near();
        trace!(
            "proximity: {} cm vs {} cm -> {}/{} hits",
            distance_cm,
            threshold_cm,
            self.hits(),
            N
        );
        near
    }

    /// Current vote without recording a sample.
    pub fn is_near(&self) -> bool {
        self.hits() >= self.config.min_hits
    }

    /// Hits currently in the window.
    pub fn hits(&self) -> usize {
        self.window.as_slice().iter().filter(|&&hit| hit).count()
    }

    /// Samples in the window, oldest first.
    pub fn samples(&self) -> impl Iterator<Item = bool> + '_ {
        self.window.oldest_ordered().copied()
    }

    /// Refills the window with misses.
    pub fn reset(&mut self) {
        self.window.clear_with(false);
    }
}

// ============================================================================
// HC-SR04
// ============================================================================

/// HC-SR04 style ultrasonic sensor on a trigger/echo pin pair.
///
/// Owns its delay and clock so it can implement [`SonarRanger`] directly.
pub struct HcSr04<T, E, D, C> {
    trigger: T,
    echo: E,
    delay: D,
    clock: C,
    config: SonarConfig,
}

impl<T, E, D, C> HcSr04<T, E, D, C>
where
    T: OutputPin,
    E: InputPin<Error = <T as ErrorType>::Error>,
    D: DelayNs,
    C: Clock,
{
    /// Creates a sensor from its pins and time sources.
    pub fn new(trigger: T, echo: E, delay: D, clock: C, config: SonarConfig) -> Self {
        Self {
            trigger,
            echo,
            delay,
            clock,
            config,
        }
    }

    /// Returns the sonar configuration.
    pub fn config(&self) -> &SonarConfig {
        &self.config
    }

    /// Longest echo waited for, in microseconds.
    pub fn timeout_us(&self) -> u64 {
        self.config.max_distance_cm as u64 * US_PER_CM as u64
    }

    /// Fires one ping and returns the echo pulse width, or `None` if no
    /// echo arrived within range.
    pub fn ping_us(&mut self) -> Result<Option<u64>, <T as ErrorType>::Error> {
        self.trigger.set_low()?;
        self.delay.delay_us(2);
        self.trigger.set_high()?;
        self.delay.delay_us(10);
        self.trigger.set_low()?;

        let timeout = self.timeout_us();
        let start = self.clock.now_us();
        while !self.echo.is_high()? {
            if self.clock.elapsed_us(start) > timeout {
                trace!("sonar: no echo");
                return Ok(None);
            }
        }

        let rise = self.clock.now_us();
        while self.echo.is_high()? {
            if self.clock.elapsed_us(rise) > timeout {
                trace!("sonar: echo longer than {} us", timeout);
                return Ok(None);
            }
        }
        Ok(Some(self.clock.elapsed_us(rise)))
    }

    /// Consumes the sensor and returns its parts.
    pub fn release(self) -> (T, E, D, C) {
        (self.trigger, self.echo, self.delay, self.clock)
    }
}

impl<T, E, D, C> SonarRanger for HcSr04<T, E, D, C>
where
    T: OutputPin,
    E: InputPin<Error = <T as ErrorType>::Error>,
    D: DelayNs,
    C: Clock,
{
    type Error = <T as ErrorType>::Error;

    fn ping_cm(&mut self) -> Result<u32, Self::Error> {
        Ok(self.ping_us()?.map_or(0, pulse_to_cm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::{MockSonarBench, MockTimer};

    fn near_filter() -> ProximityFilter {
        ProximityFilter::new(ProximityConfig::default())
    }

    // =========================================================================
    // Proximity Filter Tests
    // =========================================================================

    #[test]
    fn starts_full_of_misses() {
        let filter = near_filter();
        assert_eq!(filter.hits(), 0);
        assert_eq!(filter.samples().count(), WINDOW);
        assert!(!filter.is_near());
    }

    #[test]
    fn five_of_ten_is_near_four_is_not() {
        let mut filter = near_filter();
        for _ in 0..6 {
            filter.update(50, 10);
        }
        for _ in 0..4 {
            filter.update(5, 10);
        }
        assert_eq!(filter.hits(), 4);
        assert!(!filter.is_near());

        // pushes out a miss
        assert!(filter.update(5, 10));
        assert_eq!(filter.hits(), 5);
    }

    #[test]
    fn eleventh_sample_evicts_oldest() {
        let mut filter = near_filter();
        filter.update(1, 10); // hit, will be evicted
        for _ in 0..10 {
            filter.update(99, 10);
        }
        assert_eq!(filter.hits(), 0);
        assert!(filter.samples().all(|hit| !hit));
    }

    #[test]
    fn samples_oldest_first() {
        let mut filter = ProximityFilter::<4>::with_window(ProximityConfig::default());
        filter.update(1, 10);
        filter.update(99, 10);
        filter.update(1, 10);
        let samples: Vec<bool> = filter.samples().collect();
        assert_eq!(samples, vec![false, true, false, true]);
    }

    #[test]
    fn threshold_is_inclusive() {
        let filter = near_filter();
        assert!(filter.is_hit(10, 10));
        assert!(!filter.is_hit(11, 10));
    }

    #[test]
    fn zero_distance_counts_unless_ignored() {
        let filter = near_filter();
        assert!(filter.is_hit(0, 10));

        let filter = ProximityFilter::new(ProximityConfig::default().with_ignore_zero(true));
        assert!(!filter.is_hit(0, 10));
        assert!(filter.is_hit(1, 10));
    }

    #[test]
    fn reset_clears_hits() {
        let mut filter = near_filter();
        for _ in 0..10 {
            filter.update(1, 10);
        }
        assert!(filter.is_near());
        filter.reset();
        assert_eq!(filter.hits(), 0);
        assert!(!filter.is_near());
    }

    // =========================================================================
    // HC-SR04 Tests
    // =========================================================================

    fn sensor(
        bench: &MockSonarBench,
        timer: &MockTimer,
    ) -> HcSr04<crate::hal::MockTrigger, crate::hal::MockEcho, MockTimer, MockTimer> {
        HcSr04::new(
            bench.trigger(),
            bench.echo(),
            timer.clone(),
            timer.clone(),
            SonarConfig::default(),
        )
    }

    #[test]
    fn pulse_conversion() {
        assert_eq!(pulse_to_cm(0), 0);
        assert_eq!(pulse_to_cm(57), 0);
        assert_eq!(pulse_to_cm(58), 1);
        assert_eq!(pulse_to_cm(58 * 42 + 10), 42);
    }

    #[test]
    fn measures_echo_width() {
        let timer = MockTimer::new();
        let bench = MockSonarBench::new(&timer);
        bench.queue_distance_cm(42);
        let mut sonar = sensor(&bench, &timer);

        assert_eq!(sonar.ping_cm().unwrap(), 42);
        assert_eq!(bench.pings(), 1);
        assert_eq!(bench.last_trigger_pulse_us(), Some(10));
    }

    #[test]
    fn no_echo_reads_zero() {
        let timer = MockTimer::new();
        let bench = MockSonarBench::new(&timer);
        bench.queue_silence();
        let mut sonar = sensor(&bench, &timer);

        let start = timer.now_us();
        assert_eq!(sonar.ping_cm().unwrap(), 0);
        // gave up after max_distance_cm * 58 µs
        assert!(timer.elapsed_us(start) < 500 * 58 + 100);
    }

    #[test]
    fn echo_beyond_range_reads_zero() {
        let timer = MockTimer::new();
        let bench = MockSonarBench::new(&timer);
        bench.queue_distance_cm(800);
        let mut sonar = sensor(&bench, &timer);
        assert_eq!(sonar.ping_cm().unwrap(), 0);
    }

    #[test]
    fn consecutive_pings() {
        let timer = MockTimer::new();
        let bench = MockSonarBench::new(&timer);
        bench.queue_distance_cm(10);
        bench.queue_distance_cm(120);
        let mut sonar = sensor(&bench, &timer);

        assert_eq!(sonar.ping_cm().unwrap(), 10);
        assert_eq!(sonar.ping_cm().unwrap(), 120);
        assert_eq!(bench.pings(), 2);
    }
}
