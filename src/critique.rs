//! Design critique: a vision-capable model looks at the latest aero result
//! and proposes exactly one small geometric change for the next round.

use crate::config::LlmConfig;
use crate::llm::{ChatProvider, ChatRequest, first_nonempty_line, image_to_data_url};
use crate::solver::history::ConvergenceReport;
use crate::utils::error::AppResult;
use std::path::Path;

fn critique_system_prompt() -> String {
    "You are an aircraft aerodynamicist critiquing conceptual aircraft designs. \
     Always respond with exactly one short, imperative suggestion sentence \
     (max 10 words), all lowercase, no trailing period, no explanations."
        .to_string()
}

/// User-turn text combining the numeric result with the ask. Kept separate so
/// the wording is testable without a provider.
pub fn critique_user_text(report: Option<&ConvergenceReport>) -> String {
    let mut text = String::new();

    if let Some(report) = report {
        text.push_str(&format!(
            "Latest CFD result for this aircraft: CD = {:.4}",
            report.cd
        ));
        if let Some(cl) = report.cl {
            text.push_str(&format!(", CL = {:.4}", cl));
        }
        if let Some(ld) = report.l_over_d {
            text.push_str(&format!(", L/D = {:.2}", ld));
        }
        if !report.converged {
            text.push_str(" (solution not fully converged)");
        }
        text.push_str(".\n");
    }

    text.push_str(
        "Suggest one concrete geometric or shape improvement to reduce drag. \
         Keep it simple and local, nothing complex at all.",
    );
    text
}

pub async fn suggest_design_change<P: ChatProvider>(
    provider: &P,
    llm: &LlmConfig,
    report: Option<&ConvergenceReport>,
    flow_image: Option<&Path>,
) -> AppResult<String> {
    let mut request = ChatRequest::new(
        &llm.vision_model,
        llm.temperature,
        critique_system_prompt(),
    )
    .with_text(critique_user_text(report));

    if let Some(image_path) = flow_image {
        request = request.with_image(image_to_data_url(image_path)?);
    }

    let reply = provider.complete(request).await?;
    Ok(first_nonempty_line(&reply))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ConvergenceReport {
        ConvergenceReport {
            cd: 0.0312,
            cl: Some(0.41),
            l_over_d: Some(13.14),
            cd_spread: None,
            cl_spread: None,
            residual_drop: Some(6.0),
            final_residual: Some(1e-8),
            iterations: Some(800),
            converged: true,
        }
    }

    #[test]
    fn test_user_text_includes_coefficients() {
        let text = critique_user_text(Some(&report()));
        assert!(text.contains("CD = 0.0312"));
        assert!(text.contains("CL = 0.4100"));
        assert!(text.contains("L/D = 13.14"));
        assert!(!text.contains("not fully converged"));
    }

    #[test]
    fn test_user_text_flags_unconverged_runs() {
        let mut r = report();
        r.converged = false;
        assert!(critique_user_text(Some(&r)).contains("not fully converged"));
    }

    #[test]
    fn test_user_text_without_report_still_asks() {
        let text = critique_user_text(None);
        assert!(text.contains("reduce drag"));
        assert!(!text.contains("CD ="));
    }
}
