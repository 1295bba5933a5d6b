//! Small numeric helpers shared by the analysis modules.

/// `num` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f32, end: f32, num: usize) -> Vec<f32> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end as f64 - start as f64) / (num - 1) as f64;
            (0..num)
                .map(|i| (start as f64 + step * i as f64) as f32)
                .collect()
        }
    }
}

/// `num` values spaced evenly in `log10` between `10^start` and `10^end`.
pub fn logspace(start: f64, end: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![10f64.powf(start)],
        _ => {
            let step = (end - start) / (num - 1) as f64;
            (0..num)
                .map(|i| 10f64.powf(start + step * i as f64))
                .collect()
        }
    }
}

/// Index of the largest absolute value; the first one wins ties.
pub fn argmax_abs(data: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &x) in data.iter().enumerate() {
        let a = x.abs();
        match best {
            Some((_, b)) if a <= b => {}
            _ => best = Some((i, a)),
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the value closest to `target`; the first one wins ties.
pub fn nearest_index(values: &[f32], target: f32) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        let d = (v - target).abs();
        match best {
            Some((_, b)) if d >= b => {}
            _ => best = Some((i, d)),
        }
    }
    best.map(|(i, _)| i)
}

/// Linear interpolation of `ys` sampled at increasing `xs`, clamped at the ends.
pub fn interpolate(xs: &[f32], ys: &[f32], x: f32) -> f32 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    if x <= xs[0] {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    let upper = xs[..n].partition_point(|&v| v <= x);
    let lower = upper - 1;
    let span = xs[upper] - xs[lower];
    if span <= 0.0 {
        return ys[lower];
    }
    let frac = (x - xs[lower]) / span;
    ys[lower] + frac * (ys[upper] - ys[lower])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linspace_endpoints() {
        let v = linspace(-1.0, 1.0, 5);
        assert_eq!(v, vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(linspace(3.0, 4.0, 1), vec![3.0]);
        assert!(linspace(0.0, 1.0, 0).is_empty());
    }

    #[test]
    fn test_logspace_decades() {
        let v = logspace(1.0, 3.0, 3);
        assert!((v[0] - 10.0).abs() < 1e-9);
        assert!((v[1] - 100.0).abs() < 1e-9);
        assert!((v[2] - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn test_argmax_abs_prefers_first() {
        assert_eq!(argmax_abs(&[0.1, -0.9, 0.9, 0.2]), Some(1));
        assert_eq!(argmax_abs(&[]), None);
    }

    #[test]
    fn test_nearest_index() {
        let freqs = [0.0, 100.0, 200.0, 300.0];
        assert_eq!(nearest_index(&freqs, 140.0), Some(1));
        assert_eq!(nearest_index(&freqs, 1e6), Some(3));
    }

    #[test]
    fn test_interpolate() {
        let xs = [0.0, 1.0, 2.0];
        let ys = [0.0, 10.0, 30.0];
        assert!((interpolate(&xs, &ys, 1.5) - 20.0).abs() < 1e-6);
        assert_eq!(interpolate(&xs, &ys, -1.0), 0.0);
        assert_eq!(interpolate(&xs, &ys, 5.0), 30.0);
    }
}
