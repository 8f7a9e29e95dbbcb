use anyhow::Result;
use colored::Colorize;
use std::io::Write;
use std::time::Duration;

use super::ScenarioResult;

fn success_rate(results: &[ScenarioResult]) -> f64 {
    let passed = results.iter().filter(|r| r.passed).count();
    if results.is_empty() {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let rate = (passed as f64 / results.len() as f64) * 100.0;
    rate
}

pub fn generate_console_report(
    out: &mut dyn Write,
    results: &[ScenarioResult],
    total_duration: Duration,
) -> Result<()> {
    writeln!(out)?;
    writeln!(out, "{}", "📊 Logic Test Results Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "==============================".cyan())?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "Total scenarios: {total_tests}")?;
    writeln!(out, "Passed: {}", passed_tests.to_string().green())?;
    writeln!(out, "Failed: {}", failed_tests.to_string().red())?;
    writeln!(out, "Success rate: {:.1}%", success_rate(results))?;
    writeln!(out, "Total time: {total_duration:?}")?;
    writeln!(out)?;

    for result in results {
        let status = if result.passed {
            "✅ PASS".green()
        } else {
            "❌ FAIL".red()
        };

        writeln!(
            out,
            "{} {} (seed {})",
            status,
            result.scenario_name.bold(),
            result.seed
        )?;
        writeln!(
            out,
            "   Iterations: {}/{} successful",
            result.successful_iterations, result.iterations_run
        )?;
        writeln!(
            out,
            "   Answers: {} | Mistakes: {} | Rollbacks: {} | Minigame moves: {}",
            result.totals.answers,
            result.totals.mistakes,
            result.totals.rollbacks,
            result.totals.minigame_moves
        )?;
        writeln!(out, "   Average time: {:?}", result.average_duration)?;

        if !result.failures.is_empty() {
            writeln!(out, "   Failures:")?;
            for failure in &result.failures {
                writeln!(out, "     • {}", failure.red())?;
            }
        }
        writeln!(out)?;
    }

    let fastest = results.iter().min_by_key(|r| r.average_duration);
    let slowest = results.iter().max_by_key(|r| r.average_duration);
    if let (Some(fastest), Some(slowest)) = (fastest, slowest) {
        writeln!(out, "{}", "⚡ Performance Summary".bright_yellow().bold())?;
        writeln!(out, "{}", "=====================".yellow())?;
        writeln!(
            out,
            "Fastest: {} ({:?})",
            fastest.scenario_name.green(),
            fastest.average_duration
        )?;
        writeln!(
            out,
            "Slowest: {} ({:?})",
            slowest.scenario_name.yellow(),
            slowest.average_duration
        )?;
    }
    Ok(())
}

pub fn generate_json_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    let json_output = serde_json::to_string_pretty(results)?;
    writeln!(out, "{json_output}")?;
    Ok(())
}

pub fn generate_markdown_report(out: &mut dyn Write, results: &[ScenarioResult]) -> Result<()> {
    writeln!(out, "# Questline Logic Test Results\n")?;

    let total_tests = results.len();
    let passed_tests = results.iter().filter(|r| r.passed).count();
    let failed_tests = total_tests - passed_tests;

    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Total scenarios**: {total_tests}")?;
    writeln!(out, "- **Passed**: {passed_tests}")?;
    writeln!(out, "- **Failed**: {failed_tests}")?;
    writeln!(out, "- **Success rate**: {:.1}%\n", success_rate(results))?;

    writeln!(out, "## Detailed Results\n")?;
    writeln!(out, "| Scenario | Seed | Iterations | Answers | Mistakes | Avg time |")?;
    writeln!(out, "|---|---|---|---|---|---|")?;
    for result in results {
        let status = if result.passed { "✅" } else { "❌" };
        writeln!(
            out,
            "| {status} {} | {} | {}/{} | {} | {} | {:?} |",
            result.scenario_name,
            result.seed,
            result.successful_iterations,
            result.iterations_run,
            result.totals.answers,
            result.totals.mistakes,
            result.average_duration
        )?;
    }

    let failing: Vec<&ScenarioResult> = results.iter().filter(|r| !r.passed).collect();
    if !failing.is_empty() {
        writeln!(out, "\n## Failures\n")?;
        for result in failing {
            writeln!(out, "### {} (seed {})\n", result.scenario_name, result.seed)?;
            for failure in &result.failures {
                writeln!(out, "- {failure}")?;
            }
            writeln!(out)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::RunSummary;

    fn result(name: &str, passed: bool) -> ScenarioResult {
        ScenarioResult {
            scenario_name: name.to_string(),
            seed: 42,
            passed,
            iterations_run: 2,
            successful_iterations: if passed { 2 } else { 1 },
            failures: if passed {
                Vec::new()
            } else {
                vec!["Iteration 2 (seed 43): boom".to_string()]
            },
            totals: RunSummary {
                answers: 14,
                mistakes: 3,
                ..RunSummary::default()
            },
            average_duration: Duration::from_millis(3),
            performance_data: vec![Duration::from_millis(3)],
        }
    }

    #[test]
    fn markdown_lists_failures_separately() {
        let mut out = Vec::new();
        generate_markdown_report(&mut out, &[result("smoke", true), result("resume", false)])
            .unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("- **Success rate**: 50.0%"));
        assert!(text.contains("| ✅ smoke | 42 | 2/2 | 14 | 3 |"));
        assert!(text.contains("### resume (seed 42)"));
        assert!(text.contains("- Iteration 2 (seed 43): boom"));
    }

    #[test]
    fn json_report_is_an_array() {
        let mut out = Vec::new();
        generate_json_report(&mut out, &[result("smoke", true)]).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value[0]["scenario_name"], "smoke");
        assert_eq!(value[0]["totals"]["answers"], 14);
    }

    #[test]
    fn console_report_handles_empty_results() {
        let mut out = Vec::new();
        generate_console_report(&mut out, &[], Duration::ZERO).unwrap();
        let text = String::from_utf8_lossy(&out);
        assert!(text.contains("Total scenarios: 0"));
        assert!(text.contains("Success rate: 0.0%"));
    }
}
