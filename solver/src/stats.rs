/// Standard deviations at or below this value are considered degenerate, normalizing
/// by them would blow up the values so only the mean is subtracted.
pub const STD_EPSILON: f64 = 1e-12;

/// Population statistics of a set of samples, used for z-score normalization.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Stats {
    mean: f64,
    std: f64,
}

impl Stats {
    /// Creates a new `Stats` from already known values.
    ///
    /// # Arguments
    /// * `mean` - The mean of the samples.
    /// * `std` - The population standard deviation of the samples.
    pub fn new(mean: f64, std: f64) -> Self {
        Self { mean, std }
    }

    /// Computes the mean and population standard deviation of `values`.
    ///
    /// Both passes accumulate in `f64`, an empty slice yields zeroed statistics.
    ///
    /// # Arguments
    /// * `values` - The samples.
    ///
    /// # Returns
    /// The statistics of the given samples.
    pub fn of<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a f32>,
        I::IntoIter: Clone,
    {
        let iter = values.into_iter();
        let (count, sum) = iter
            .clone()
            .fold((0usize, 0f64), |(n, acc), &x| (n + 1, acc + x as f64));

        if count == 0 {
            return Self::default();
        }

        let mean = sum / count as f64;
        let var = iter
            .map(|&x| {
                let d = x as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / count as f64;

        Self {
            mean,
            std: var.sqrt(),
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    pub fn std(&self) -> f64 {
        self.std
    }

    /// Whether the standard deviation is too small to divide by.
    pub fn is_degenerate(&self) -> bool {
        self.std <= STD_EPSILON
    }

    /// Normalizes a single value, falling back to mean subtraction when degenerate.
    ///
    /// # Arguments
    /// * `x` - The value to normalize.
    ///
    /// # Returns
    /// The z-score of `x`.
    #[inline]
    pub fn zscore(&self, x: f32) -> f32 {
        let centered = x as f64 - self.mean;

        if self.is_degenerate() {
            centered as f32
        } else {
            (centered / self.std) as f32
        }
    }

    /// Normalizes every value of `values` in place.
    ///
    /// # Arguments
    /// * `values` - The values to normalize.
    pub fn normalize(&self, values: &mut [f32]) {
        values.iter_mut().for_each(|x| *x = self.zscore(*x));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_population_std() {
        let values: [f32; 8] = [2., 4., 4., 4., 5., 5., 7., 9.];
        let stats = Stats::of(&values);
        assert_eq!(stats.mean(), 5.);
        assert_eq!(stats.std(), 2.);
        assert!(!stats.is_degenerate());
    }

    #[test]
    fn test_constant_values_only_subtract_the_mean() {
        let mut values = [3.5; 6];
        let stats = Stats::of(&values);
        assert!(stats.is_degenerate());

        stats.normalize(&mut values);
        assert_eq!(values, [0.; 6]);
    }

    #[test]
    fn test_normalized_values_have_unit_std() {
        let mut values: Vec<f32> = (0..100).map(|i| (i as f32).sin() * 10. + 3.).collect();
        Stats::of(&values).normalize(&mut values);

        let stats = Stats::of(&values);
        assert!(stats.mean().abs() < 1e-5);
        assert!((stats.std() - 1.).abs() < 1e-5);
    }

    #[test]
    fn test_empty_values() {
        let stats = Stats::of(&[] as &[f32]);
        assert_eq!(stats, Stats::default());
        assert!(stats.is_degenerate());
    }
}
