//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the dynamics/fitting code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::StudyOutput;
use crate::domain::{Diagnostic, FragilityFit};
use crate::report::{FitReport, RunReport};

/// Summary of a single time-history analysis.
pub fn format_run(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str("=== frag - Time-History Analysis ===\n");
    out.push_str(&format!(
        "Model: {} | steps={} | duration={:.2}s | PGA={:.3}g\n",
        report.model_type.display_name(),
        report.n_steps,
        report.duration,
        report.pga_g
    ));

    out.push('\n');
    out.push_str(&format!(
        "{:<6} {:>14} {:>12}\n",
        "story", "peak drift(m)", "PIDR"
    ));
    out.push_str(&format!("{:-<6} {:-<14} {:-<12}\n", "", "", ""));
    for (i, (d, r)) in report.peak_drift.iter().zip(report.pidr.iter()).enumerate() {
        out.push_str(&format!("{:<6} {:>14} {:>12}\n", i + 1, fmt_num(*d, 6), fmt_num(*r, 5)));
    }
    out.push_str(&format!("\nmax PIDR: {}\n", fmt_num(report.max_pidr, 5)));

    if !report.unconverged_steps.is_empty() {
        out.push_str(&format!(
            "Newton-Raphson did not converge at {} step(s); first: {}\n",
            report.unconverged_steps.len(),
            report.unconverged_steps[0]
        ));
    }
    out.push_str(&format_warnings(&report.diagnostics));

    out
}

/// Fitted parameters plus an observed-vs-fitted table.
pub fn format_fit(report: &FitReport) -> String {
    let mut out = String::new();

    out.push_str("=== frag - Fragility Fit (MLE) ===\n");
    out.push_str(&format_parameters(&report.fit));
    out.push('\n');

    out.push_str(&format!(
        "{:>8} {:>7} {:>7} {:>10} {:>10}\n",
        "IM", "exceed", "trials", "observed", "fitted"
    ));
    out.push_str(&format!("{:->8} {:->7} {:->7} {:->10} {:->10}\n", "", "", "", "", ""));
    for l in &report.levels {
        out.push_str(&format!(
            "{:>8.3} {:>7} {:>7} {:>10.3} {:>10}\n",
            l.im,
            l.num_exceed,
            l.num_trials,
            l.empirical,
            fmt_num(l.fitted, 3)
        ));
    }
    out.push_str(&format_warnings(&report.fit.diagnostics.warnings));

    out
}

/// Per-level counts of a study followed by the fit.
pub fn format_study(study: &StudyOutput, threshold: f64) -> String {
    let mut out = String::new();

    out.push_str("=== frag - Fragility Study ===\n");
    out.push_str(&format!(
        "Levels: {} | damage state: max PIDR >= {threshold}\n\n",
        study.levels.len()
    ));

    out.push_str(&format!(
        "{:>8} {:>7} {:>7} {:>8} {:>12}\n",
        "IM", "exceed", "trials", "excluded", "median PIDR"
    ));
    out.push_str(&format!("{:->8} {:->7} {:->7} {:->8} {:->12}\n", "", "", "", "", ""));
    for l in &study.levels {
        out.push_str(&format!(
            "{:>8.3} {:>7} {:>7} {:>8} {:>12}\n",
            l.im,
            l.num_exceed,
            l.num_trials,
            l.excluded,
            fmt_num(median(&l.max_pidr), 5)
        ));
    }
    out.push('\n');
    out.push_str(&format_parameters(&study.fit));
    if study.unconverged_steps > 0 {
        out.push_str(&format!(
            "Newton-Raphson non-convergence events: {}\n",
            study.unconverged_steps
        ));
    }
    out.push_str(&format_warnings(&study.warnings));
    out.push_str(&format_warnings(&study.fit.diagnostics.warnings));

    out
}

fn format_parameters(fit: &FragilityFit) -> String {
    let d = &fit.diagnostics;
    if fit.success {
        format!(
            "theta = {:.4} | beta = {:.4} | NLL = {:.4} | iterations = {}\n",
            fit.theta, fit.beta, d.neg_log_likelihood, d.iterations
        )
    } else {
        format!("Fit failed: {}\n", d.message)
    }
}

fn format_warnings(warnings: &[Diagnostic]) -> String {
    let mut out = String::new();
    for w in warnings {
        match w.step {
            Some(step) => out.push_str(&format!("warning [{:?} @ {step}]: {}\n", w.kind, w.message)),
            None => out.push_str(&format!("warning [{:?}]: {}\n", w.kind, w.message)),
        }
    }
    out
}

fn fmt_num(v: f64, decimals: usize) -> String {
    if v.is_finite() {
        format!("{v:.decimals$}")
    } else {
        "n/a".to_string()
    }
}

/// Median of finite values (NaN when there are none).
fn median(values: &[f64]) -> f64 {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| x.is_finite()).collect();
    if v.is_empty() {
        return f64::NAN;
    }
    v.sort_by(f64::total_cmp);
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        0.5 * (v[n / 2 - 1] + v[n / 2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DiagnosticKind, FitDiagnostics, ModelType, Parameterization};

    fn failed_fit() -> FragilityFit {
        FragilityFit::failed(FitDiagnostics {
            message: "All num_exceed are zero".to_string(),
            iterations: 0,
            neg_log_likelihood: f64::NAN,
            initial_theta: f64::NAN,
            initial_beta: f64::NAN,
            parameterization: Parameterization::LogTransform,
            warnings: vec![Diagnostic {
                kind: DiagnosticKind::DegenerateDataset,
                step: None,
                message: "All num_exceed are zero".to_string(),
            }],
        })
    }

    #[test]
    fn run_report_lists_each_story() {
        let report = RunReport {
            model_type: ModelType::Nonlinear,
            n_steps: 101,
            duration: 1.0,
            pga_g: 0.3,
            peak_drift: vec![0.01, 0.02],
            pidr: vec![0.0025, f64::NAN],
            max_pidr: 0.0025,
            unconverged_steps: vec![17],
            diagnostics: vec![Diagnostic {
                kind: DiagnosticKind::NonConvergence,
                step: Some(17),
                message: "did not converge".to_string(),
            }],
            story_state: None,
        };
        let text = format_run(&report);
        assert!(text.contains("nonlinear"));
        assert!(text.contains("0.00250"));
        assert!(text.contains("n/a"));
        assert!(text.contains("NonConvergence @ 17"));
    }

    #[test]
    fn failed_fit_prints_reason() {
        let text = format_parameters(&failed_fit());
        assert!(text.starts_with("Fit failed"));
    }

    #[test]
    fn median_ignores_non_finite() {
        assert_eq!(median(&[3.0, f64::NAN, 1.0, 2.0]), 2.0);
        assert_eq!(median(&[1.0, 4.0]), 2.5);
        assert!(median(&[f64::NAN]).is_nan());
    }
}
