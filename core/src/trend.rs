use crate::assessment::{Assessment, TrendLabel};

/// Number of most recent scores the half-split comparison looks at.
pub const TREND_WINDOW: usize = 5;
/// Below this many scores the trend is reported as insufficient data.
pub const MIN_TREND_POINTS: usize = 3;
/// Minimum difference between half means that counts as movement.
pub const TREND_THRESHOLD: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendSignal {
    Degrading,
    Improving,
    Stable,
    InsufficientData,
}

/// Trend and maintenance context derived from an entity's recent history.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendAnalysis {
    pub signal: TrendSignal,
    /// Scores that took part in the comparison
    pub points: usize,
    pub older_mean: Option<f64>,
    pub newer_mean: Option<f64>,
    /// One-line description of the most recent maintenance in the window
    pub maintenance_fact: Option<String>,
}

impl TrendAnalysis {
    /// Downstream label; insufficient data reads as STABLE.
    pub fn label(&self) -> TrendLabel {
        match self.signal {
            TrendSignal::Degrading => TrendLabel::Degrading,
            TrendSignal::Improving => TrendLabel::Improving,
            TrendSignal::Stable | TrendSignal::InsufficientData => TrendLabel::Stable,
        }
    }

    pub fn summary(&self) -> String {
        match (self.signal, self.older_mean, self.newer_mean) {
            (TrendSignal::InsufficientData, _, _) => format!(
                "Insufficient data: {} prior assessment(s), at least {MIN_TREND_POINTS} needed for a trend",
                self.points
            ),
            (_, Some(older), Some(newer)) => format!(
                "{} over last {} assessments (older mean {older:.4}, newer mean {newer:.4}, change {:+.4})",
                self.label().as_str(),
                self.points,
                newer - older,
            ),
            _ => self.label().as_str().to_string(),
        }
    }

    pub fn maintenance_text(&self) -> String {
        self.maintenance_fact
            .clone()
            .unwrap_or_else(|| "No maintenance recorded in recent history".to_string())
    }
}

/// Analyze a history window ordered oldest to newest.
pub fn analyze(history: &[Assessment]) -> TrendAnalysis {
    let scores: Vec<f64> = history.iter().map(|a| a.final_score).collect();
    let (signal, older_mean, newer_mean) = half_split_signal(&scores);
    TrendAnalysis {
        signal,
        points: scores.len().min(TREND_WINDOW),
        older_mean,
        newer_mean,
        maintenance_fact: maintenance_fact(history),
    }
}

/// Compare the means of the older and newer halves of the last
/// `TREND_WINDOW` scores. The older half takes the extra point when the
/// count is odd.
pub fn half_split_signal(scores: &[f64]) -> (TrendSignal, Option<f64>, Option<f64>) {
    let window = &scores[scores.len().saturating_sub(TREND_WINDOW)..];
    if window.len() < MIN_TREND_POINTS {
        return (TrendSignal::InsufficientData, None, None);
    }

    let split = window.len().div_ceil(2);
    let older = mean(&window[..split]);
    let newer = mean(&window[split..]);
    let diff = newer - older;

    let signal = if diff > TREND_THRESHOLD {
        TrendSignal::Degrading
    } else if diff < -TREND_THRESHOLD {
        TrendSignal::Improving
    } else {
        TrendSignal::Stable
    };
    (signal, Some(older), Some(newer))
}

/// Describe the most recent maintenance-flagged assessment in the window.
pub fn maintenance_fact(history: &[Assessment]) -> Option<String> {
    let entry = history
        .iter()
        .rev()
        .find(|a| a.sample.service_performed || a.sample.topup_performed)?;

    let action = match (entry.sample.service_performed, entry.sample.topup_performed) {
        (true, true) => "oil change and top-up",
        (true, false) => "oil change",
        _ => "oil top-up",
    };
    Some(format!(
        "Last maintenance: {action} recorded at {:.1} oil hours / {:.1} total hours (assessment #{} on {})",
        entry.sample.oil_hrs,
        entry.sample.total_hrs,
        entry.id,
        entry.created_at.format("%Y-%m-%d"),
    ))
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::{TrendSignal, analyze, half_split_signal, maintenance_fact};
    use crate::assessment::TrendLabel;
    use crate::testing::assessment_fixture;

    #[test]
    fn half_split_detects_degradation() {
        let (signal, older, newer) = half_split_signal(&[0.10, 0.12, 0.30, 0.32, 0.35]);
        assert_eq!(signal, TrendSignal::Degrading);
        assert!((older.unwrap() - 0.173_333).abs() < 1e-4);
        assert!((newer.unwrap() - 0.335).abs() < 1e-9);
    }

    #[test]
    fn half_split_detects_improvement() {
        let (signal, _, _) = half_split_signal(&[0.60, 0.58, 0.40, 0.38]);
        assert_eq!(signal, TrendSignal::Improving);
    }

    #[test]
    fn half_split_is_stable_within_threshold() {
        let (signal, _, _) = half_split_signal(&[0.30, 0.31, 0.32, 0.33]);
        assert_eq!(signal, TrendSignal::Stable);
    }

    #[test]
    fn half_split_uses_only_last_five_points() {
        // The early spike falls outside the window.
        let (signal, older, _) = half_split_signal(&[0.95, 0.90, 0.30, 0.30, 0.31, 0.30, 0.31]);
        assert_eq!(signal, TrendSignal::Stable);
        assert!((older.unwrap() - (0.30 + 0.31 + 0.30) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn fewer_than_three_points_is_insufficient() {
        assert_eq!(half_split_signal(&[]).0, TrendSignal::InsufficientData);
        assert_eq!(half_split_signal(&[0.1, 0.9]).0, TrendSignal::InsufficientData);
    }

    #[test]
    fn insufficient_data_reads_as_stable() {
        let history = vec![assessment_fixture(1, None, 0.2), assessment_fixture(2, None, 0.9)];
        let analysis = analyze(&history);
        assert_eq!(analysis.signal, TrendSignal::InsufficientData);
        assert_eq!(analysis.label(), TrendLabel::Stable);
        assert!(analysis.summary().starts_with("Insufficient data"));
    }

    #[test]
    fn summary_names_the_label_and_means() {
        let history: Vec<_> = [0.10, 0.12, 0.30, 0.32, 0.35]
            .iter()
            .enumerate()
            .map(|(i, score)| assessment_fixture(i as i64 + 1, None, *score))
            .collect();
        let summary = analyze(&history).summary();
        assert!(summary.starts_with("DEGRADING over last 5 assessments"));
        assert!(summary.contains("newer mean 0.3350"));
    }

    #[test]
    fn maintenance_fact_picks_most_recent_flagged_entry() {
        let mut first = assessment_fixture(1, None, 0.2);
        first.sample.service_performed = true;
        let mut second = assessment_fixture(2, None, 0.25);
        second.sample.topup_performed = true;
        second.sample.oil_hrs = 812.0;
        let third = assessment_fixture(3, None, 0.3);

        let fact = maintenance_fact(&[first, second, third]).expect("fact expected");
        assert!(fact.contains("oil top-up"));
        assert!(fact.contains("812.0 oil hours"));
        assert!(fact.contains("assessment #2"));
    }

    #[test]
    fn maintenance_fact_absent_without_flags() {
        let history = vec![assessment_fixture(1, None, 0.2)];
        assert_eq!(maintenance_fact(&history), None);
        assert_eq!(
            analyze(&history).maintenance_text(),
            "No maintenance recorded in recent history"
        );
    }
}
