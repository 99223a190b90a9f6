use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::delta::{bar_percent, SimulationDelta};
use crate::models::{RecommendationResult, SimulationResult, Submission};
use crate::session::{CollegeSource, CollegeView};
use crate::stream::{CatalogStream, FallbackCatalog, TierBadge};

const BAR_WIDTH: usize = 20;

/// `round(value / max * 100)`, the way sub-scores are displayed.
pub fn percent(value: u32, max: u32) -> u32 {
    if max == 0 {
        return 0;
    }
    ((value as f64 / max as f64) * 100.0).round() as u32
}

pub fn bar(pct: u32) -> String {
    let filled = (bar_percent(pct) as usize * BAR_WIDTH + 50) / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn build_recommendation_report(
    submission: Option<&Submission>,
    result: &RecommendationResult,
    generated_at: DateTime<Utc>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Stream Recommendation");
    match submission {
        Some(s) => {
            let _ = writeln!(
                output,
                "Generated {} for {} ({}), submission {}",
                generated_at.format("%Y-%m-%d %H:%M UTC"),
                s.input().location,
                s.input().education_level.as_str(),
                s.id
            );
        }
        None => {
            let _ = writeln!(output, "Generated {}", generated_at.format("%Y-%m-%d %H:%M UTC"));
        }
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "Recommended: **{}**", result.recommended_stream);
    let _ = writeln!(output);
    let _ = writeln!(output, "## Confidence Score");
    let _ = writeln!(
        output,
        "{} {}%",
        bar(result.confidence_score),
        result.confidence_score
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Decision Intelligence");
    for (label, value) in result.decision_intelligence.sub_scores() {
        let pct = percent(value, 100);
        let _ = writeln!(output, "- {label}: {} {pct}%", bar(pct));
    }
    let _ = writeln!(output);
    let _ = writeln!(output, "### Risk Flags");
    if result.decision_intelligence.risk_flags.is_empty() {
        let _ = writeln!(output, "No risk flags shown.");
    } else {
        for flag in &result.decision_intelligence.risk_flags {
            let _ = writeln!(output, "- {flag}");
        }
    }

    if !result.degree_matches.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Degree Matches");
        for degree in &result.degree_matches {
            write_match(&mut output, &degree.degree, degree.match_score, degree.description.as_deref());
        }
    }

    if !result.career_matches.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Career Matches");
        for career in &result.career_matches {
            write_match(&mut output, &career.career, career.match_score, career.description.as_deref());
        }
    }

    if !result.institution_matches.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Institution Matches");
        for inst in &result.institution_matches {
            write_institution(&mut output, &inst.name, inst.tier.as_deref(), inst.match_score, inst.location.as_deref());
        }
    }

    if !result.improvement_plan.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Improvement Plan");
        for step in &result.improvement_plan {
            let _ = write!(output, "- {}", step.action);
            if !step.priority.is_empty() {
                let marker = if step.is_high_priority() { "!" } else { "" };
                let _ = write!(output, " [{}{} priority]", marker, step.priority);
            }
            let _ = writeln!(output);
            if let Some(description) = &step.description {
                let _ = writeln!(output, "  {description}");
            }
        }
    }

    if let Some(explanation) = result.explanation.as_deref().filter(|e| !e.is_empty()) {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Detailed Explanation");
        for line in explanation.lines() {
            // trailing double space keeps the break in markdown
            let _ = writeln!(output, "{line}  ");
        }
    }

    output
}

fn write_match(output: &mut String, name: &str, score: u32, description: Option<&str>) {
    let _ = writeln!(output, "- {name}: {} {score}%", bar(score));
    if let Some(description) = description {
        let _ = writeln!(output, "  {description}");
    }
}

fn write_institution(
    output: &mut String,
    name: &str,
    tier: Option<&str>,
    score: u32,
    location: Option<&str>,
) {
    let _ = write!(output, "- {name}");
    if let Some(tier) = tier {
        let _ = write!(output, " {} {tier}", TierBadge::from_tier(tier).marker());
    }
    if let Some(location) = location {
        let _ = write!(output, " ({location})");
    }
    let _ = writeln!(output, ": {} {score}%", bar(score));
}

pub fn build_simulation_report(result: &SimulationResult) -> String {
    let delta = SimulationDelta::from(result);
    let mut output = String::new();

    let _ = writeln!(output, "# What-If Simulation");
    let _ = writeln!(output);
    let _ = writeln!(output, "- Baseline: {}%", result.baseline_score);
    let _ = writeln!(output, "- Scenario: {}%", result.scenario_score);
    let _ = writeln!(
        output,
        "- Change: {} {}% ({})",
        delta.direction.arrow(),
        delta.magnitude,
        delta.direction.tone()
    );
    let _ = writeln!(output);
    let _ = writeln!(
        output,
        "Baseline      {} {}%",
        bar(delta.baseline_bar),
        result.baseline_score
    );
    let _ = writeln!(
        output,
        "With Changes  {} {}%",
        bar(delta.scenario_bar),
        result.scenario_score
    );

    output
}

pub fn build_college_report(view: &CollegeView<'_>) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# College Suggestions");
    match view.stream_label {
        Some(label) => {
            let _ = writeln!(output, "Based on your assessment for **{label}**");
        }
        None => {
            let _ = writeln!(output, "Based on academic interests");
        }
    }
    let _ = writeln!(output, "Stream bucket: {}", view.category.key());
    let _ = writeln!(output);

    match &view.source {
        CollegeSource::Matched(matches) => {
            let _ = writeln!(output, "## Matched Institutions");
            for inst in matches.iter() {
                write_institution(&mut output, &inst.name, inst.tier.as_deref(), inst.match_score, inst.location.as_deref());
            }
        }
        CollegeSource::Fallback(stream) => write_catalog_stream(&mut output, stream),
    }

    output
}

pub fn build_catalog_report(catalog: &FallbackCatalog) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# College Catalog");
    for stream in catalog.streams() {
        let _ = writeln!(output);
        write_catalog_stream(&mut output, stream);
    }
    output
}

fn write_catalog_stream(output: &mut String, stream: &CatalogStream) {
    let _ = writeln!(output, "## {} ({})", stream.label, stream.category.key());
    let _ = writeln!(output, "{}", stream.description);
    let _ = writeln!(output);
    for college in &stream.colleges {
        write_institution(output, &college.name, Some(&college.tier), college.match_score, college.location.as_deref());
        if !college.courses.is_empty() {
            let _ = writeln!(output, "  Popular courses: {}", college.courses.join(", "));
        }
    }
}
