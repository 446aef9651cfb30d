use serde::{Deserialize, Serialize};

/// Running mean and variance of a stream of values (Welford's algorithm).
#[derive(Default)]
pub struct RunningStats {
    n_vals: usize,
    mean: f64,
    sq_dev_sum: f64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RunningStatsReport {
    pub n_vals: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl RunningStats {
    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;
        let dev_old = val - self.mean;
        self.mean += dev_old / self.n_vals as f64;
        let dev_new = val - self.mean;
        self.sq_dev_sum += dev_old * dev_new;
    }

    pub fn report(&self) -> RunningStatsReport {
        let std_dev = match self.n_vals {
            0 | 1 => f64::NAN,
            n_vals => (self.sq_dev_sum / (n_vals - 1) as f64).sqrt(),
        };
        RunningStatsReport {
            n_vals: self.n_vals,
            mean: if self.n_vals == 0 { f64::NAN } else { self.mean },
            std_dev,
        }
    }
}

/// Correlated sequence of values, such as an observable sampled every few ticks.
#[derive(Default)]
pub struct Series {
    vals: Vec<f64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SeriesReport {
    pub mean: f64,
    pub std_dev: f64,
    pub sem: f64,
    /// Number of leading values discarded as transient.
    pub n_discarded: usize,
    /// Whether the transient ended within the first half of the series.
    pub is_equil: bool,
}

impl Series {
    pub fn push(&mut self, val: f64) {
        self.vals.push(val);
    }

    /// Summarize the series after dropping the initial transient.
    pub fn report(&self) -> SeriesReport {
        let n_discarded = transient_len(&self.vals);
        let vals = &self.vals[n_discarded..];
        SeriesReport {
            mean: mean(vals),
            std_dev: variance(vals).sqrt(),
            sem: blocked_sem(vals),
            n_discarded,
            is_equil: n_discarded < self.vals.len() / 2,
        }
    }
}

fn mean(vals: &[f64]) -> f64 {
    if vals.is_empty() {
        return f64::NAN;
    }
    vals.iter().sum::<f64>() / vals.len() as f64
}

fn variance(vals: &[f64]) -> f64 {
    if vals.len() < 2 {
        return f64::NAN;
    }
    let mean = mean(vals);
    let sq_dev_sum: f64 = vals.iter().map(|&val| (val - mean).powi(2)).sum();
    sq_dev_sum / (vals.len() - 1) as f64
}

/// Standard error of the mean of correlated data (Flyvbjerg-Petersen blocking).
///
/// Neighboring values are averaged pairwise until the estimate stops growing
/// beyond its own uncertainty.
fn blocked_sem(vals: &[f64]) -> f64 {
    let mut blocks = vals.to_vec();
    let mut estimates = Vec::new();

    while blocks.len() >= 2 {
        let n_blocks = blocks.len() as f64;
        let sem2 = variance(&blocks) / n_blocks;
        estimates.push((sem2, sem2 * (2.0 / (n_blocks - 1.0)).sqrt()));

        blocks = blocks
            .chunks_exact(2)
            .map(|pair| (pair[0] + pair[1]) / 2.0)
            .collect();
    }

    for (i_est, &(sem2, _)) in estimates.iter().enumerate() {
        let plateau = estimates[i_est..]
            .iter()
            .map(|&(sem2, err)| sem2 - err)
            .fold(f64::NEG_INFINITY, f64::max);
        if sem2 > plateau {
            return sem2.sqrt();
        }
    }

    estimates.last().map_or(f64::NAN, |&(sem2, _)| sem2.sqrt())
}

/// Length of the initial transient, chosen by the marginal standard error rule
/// among the cut points `n / 2^k`. Ties go to the shorter transient.
fn transient_len(vals: &[f64]) -> usize {
    let n_vals = vals.len();
    if n_vals < 2 {
        return 0;
    }

    let mut best = (f64::INFINITY, 0);
    let mut cut = n_vals / 2;
    loop {
        let tail = &vals[cut..];
        let n_tail = tail.len() as f64;
        let mse = variance(tail) * (n_tail - 1.0) / n_tail.powi(2);
        if mse <= best.0 {
            best = (mse, cut);
        }
        if cut == 0 {
            break;
        }
        cut /= 2;
    }

    best.1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_stats_match_direct_computation() {
        let vals = [0.2, 0.4, 0.4, 0.6, 0.9];
        let mut stats = RunningStats::default();
        vals.iter().for_each(|&val| stats.add(val));
        let report = stats.report();
        assert_eq!(report.n_vals, 5);
        assert!((report.mean - mean(&vals)).abs() < 1e-12);
        assert!((report.std_dev - variance(&vals).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_running_stats_report_nan() {
        let report = RunningStats::default().report();
        assert!(report.mean.is_nan());
        assert!(report.std_dev.is_nan());
    }

    #[test]
    fn transient_is_discarded() {
        let mut series = Series::default();
        for i in 0..64 {
            series.push(if i < 8 { 100.0 } else { (i % 2) as f64 });
        }
        let report = series.report();
        assert!(report.n_discarded >= 8);
        assert!(report.is_equil);
        assert!((report.mean - 0.5).abs() < 0.05);
        assert!(report.sem.is_finite());
    }

    #[test]
    fn constant_series_has_zero_spread() {
        let mut series = Series::default();
        (0..32).for_each(|_| series.push(0.25));
        let report = series.report();
        assert_eq!(report.mean, 0.25);
        assert_eq!(report.std_dev, 0.0);
        assert_eq!(report.sem, 0.0);
        assert_eq!(report.n_discarded, 0);
        assert!(report.is_equil);
    }

    #[test]
    fn drifting_series_is_not_equilibrated() {
        let mut series = Series::default();
        (0..64).for_each(|i| series.push(i as f64));
        let report = series.report();
        assert!(!report.is_equil);
        assert_eq!(report.n_discarded, 32);
    }
}
