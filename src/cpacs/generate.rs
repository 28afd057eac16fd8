//! Prompt-driven CPACS generation.
//!
//! Two flows share the chat provider seam: patch mode asks the model for a
//! JSON edit list applied to a baseline document, from-scratch mode asks for
//! a full document body and repairs it against local structural checks.

use crate::config::LlmConfig;
use crate::cpacs::patch::{self, PatchReport};
use crate::cpacs::{CpacsDocument, wrap_body};
use crate::llm::{ChatProvider, ChatRequest, extract_json_object, image_to_data_url, strip_code_fences};
use crate::utils::error::{AppError, AppResult};
use std::path::Path;

/// Built-in single-wing baseline edited by prompt patches when no baseline
/// file is configured.
pub const BASELINE_CPACS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<cpacs xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
       xsi:noNamespaceSchemaLocation="https://www.cpacs.de/schema/v3_5_0/cpacs_schema.xsd">
    <header>
        <name>Prompt Plane</name>
        <version>1.0.0</version>
        <cpacsVersion>3.5</cpacsVersion>
        <versionInfos>
            <versionInfo version="1.0.0">
                <creator>flyai</creator>
                <timestamp>2024-01-01T00:00:00</timestamp>
                <description>Baseline wing model</description>
                <cpacsVersion>3.5</cpacsVersion>
            </versionInfo>
        </versionInfos>
    </header>
    <vehicles>
        <profiles>
            <wingAirfoils>
                <wingAirfoil uID="airfoil_main">
                    <name>Symmetric section</name>
                    <pointList>
                        <x mapType="vector">1.0;0.5;0.0;0.5;1.0</x>
                        <y mapType="vector">0.0;0.0;0.0;0.0;0.0</y>
                        <z mapType="vector">0.0;0.05;0.0;-0.05;0.0</z>
                    </pointList>
                </wingAirfoil>
            </wingAirfoils>
        </profiles>
        <aircraft>
            <model uID="promptPlane">
                <name>Prompt Plane</name>
                <wings>
                    <wing uID="MainWing">
                        <name>Main wing</name>
                        <symmetry>x-z-plane</symmetry>
                        <transformation>
                            <scaling><x>1</x><y>1</y><z>1</z></scaling>
                            <rotation><x>0</x><y>0</y><z>0</z></rotation>
                            <translation><x>0</x><y>0</y><z>0</z></translation>
                        </transformation>
                        <sections>
                            <section uID="MainWing_sec1">
                                <name>Root section</name>
                                <transformation>
                                    <scaling><x>1</x><y>1</y><z>1</z></scaling>
                                    <rotation><x>0</x><y>0</y><z>0</z></rotation>
                                    <translation><x>0</x><y>0</y><z>0</z></translation>
                                </transformation>
                                <elements>
                                    <element uID="MainWing_sec1_el1">
                                        <name>Root element</name>
                                        <airfoilUID>airfoil_main</airfoilUID>
                                        <transformation>
                                            <scaling><x>1</x><y>1</y><z>1</z></scaling>
                                            <rotation><x>0</x><y>0</y><z>0</z></rotation>
                                            <translation><x>0</x><y>0</y><z>0</z></translation>
                                        </transformation>
                                    </element>
                                </elements>
                            </section>
                            <section uID="MainWing_sec2">
                                <name>Tip section</name>
                                <transformation>
                                    <scaling><x>0.6</x><y>0.6</y><z>0.6</z></scaling>
                                    <rotation><x>0</x><y>0</y><z>0</z></rotation>
                                    <translation><x>0</x><y>0</y><z>0</z></translation>
                                </transformation>
                                <elements>
                                    <element uID="MainWing_sec2_el1">
                                        <name>Tip element</name>
                                        <airfoilUID>airfoil_main</airfoilUID>
                                        <transformation>
                                            <scaling><x>1</x><y>1</y><z>1</z></scaling>
                                            <rotation><x>0</x><y>0</y><z>0</z></rotation>
                                            <translation><x>0</x><y>0</y><z>0</z></translation>
                                        </transformation>
                                    </element>
                                </elements>
                            </section>
                        </sections>
                        <positionings>
                            <positioning uID="MainWing_pos1">
                                <name>Root</name>
                                <length>0</length>
                                <sweepAngle>0</sweepAngle>
                                <dihedralAngle>0</dihedralAngle>
                                <toSectionUID>MainWing_sec1</toSectionUID>
                            </positioning>
                            <positioning uID="MainWing_pos2">
                                <name>Tip</name>
                                <length>5</length>
                                <sweepAngle>15</sweepAngle>
                                <dihedralAngle>3</dihedralAngle>
                                <fromSectionUID>MainWing_sec1</fromSectionUID>
                                <toSectionUID>MainWing_sec2</toSectionUID>
                            </positioning>
                        </positionings>
                        <segments>
                            <segment uID="MainWing_seg1">
                                <name>Inner segment</name>
                                <fromElementUID>MainWing_sec1_el1</fromElementUID>
                                <toElementUID>MainWing_sec2_el1</toElementUID>
                            </segment>
                        </segments>
                    </wing>
                </wings>
            </model>
        </aircraft>
    </vehicles>
</cpacs>
"#;

fn edit_system_prompt() -> String {
    "You are a CPACS XML editing assistant.\n\
     You will be given:\n\
     1) A natural-language description of desired changes.\n\
     2) The full current CPACS XML document.\n\
     3) Optionally, a CFD image of the aircraft defined by the CPACS.\n\n\
     Your job is NOT to rewrite the XML.\n\
     Instead, you MUST output ONLY a JSON object describing edits.\n\n\
     JSON format (no surrounding markdown, no comments):\n\
     {\n\
       \"edits\": [\n\
         {\n\
           \"action\": \"set_text\",\n\
           \"xpath\": \"<a simple XPath from the document root, e.g. .//wing[@uID='MainWing']/sections/section[@uID='MainWing_sec2']/transformation/scaling/x>\",\n\
           \"value\": \"<new text content>\"\n\
         },\n\
         {\n\
           \"action\": \"set_attribute\",\n\
           \"xpath\": \"<XPath to element>\",\n\
           \"attribute\": \"<attribute_name>\",\n\
           \"value\": \"<new attribute value>\"\n\
         }\n\
       ]\n\
     }\n\n\
     Rules:\n\
     1. NEVER output XML in your response, only the JSON object.\n\
     2. Use only actions \"set_text\" and \"set_attribute\".\n\
     3. Use simple XPaths: child steps separated by '/', optionally starting\n\
        with './/' to search the whole document, with at most one attribute\n\
        filter like [@uID='MainWing'] per step. No functions, no indexing.\n\
     4. If multiple nodes should be changed the same way, either use a single\n\
        XPath that matches all of them, or add multiple edit objects.\n\
     5. Always include the top-level key \"edits\" (it can be an empty list if\n\
        nothing should change).\n\
     6. Do NOT wrap the JSON in ```json or any other markdown.\n\
     7. Prefer small, local changes that keep the design close to the\n\
        original, instead of large rewrites of the CPACS structure.\n"
        .to_string()
}

fn scratch_system_prompt() -> String {
    "You are an expert in CPACS 3.5 and TiGL.\n\
     I will wrap your output inside a CPACS document with a fixed header, so:\n\
     - Output ONLY the inner CPACS body that goes AFTER </header> and BEFORE </cpacs>.\n\
     - Do NOT output the XML declaration, <cpacs>, </cpacs>, or <header>.\n\
     - Output ONE well-formed XML fragment, no markdown, no code fences.\n\n\
     Structural requirements (keep it VERY SIMPLE but valid for TiGL):\n\
     1) Root part of your fragment:\n\
        <vehicles>\n\
          <profiles>\n\
            <fuselageProfiles>...</fuselageProfiles>\n\
            <wingAirfoils>...</wingAirfoils>\n\
          </profiles>\n\
          <aircraft>\n\
            <model uID=\"model1\"> ... </model>\n\
          </aircraft>\n\
        </vehicles>\n\
     2) Every profile pointList must carry x, y and z vectors with the same\n\
        number of entries.\n\
     3) Add transformations for fuselages, wings and sections.\n\
     4) Add positionings with names and valid fromSectionUID/toSectionUID.\n\
     5) Add elements with airfoilUID, and segments referencing elements\n\
        correctly. Every UID must be unique and every reference must point to\n\
        an existing UID.\n"
        .to_string()
}

pub struct DesignGenerator<'a, P: ChatProvider> {
    provider: &'a P,
    llm: &'a LlmConfig,
}

impl<'a, P: ChatProvider> DesignGenerator<'a, P> {
    pub fn new(provider: &'a P, llm: &'a LlmConfig) -> Self {
        Self { provider, llm }
    }

    /// Patch mode: ask for a JSON edit list against `baseline_xml` and apply
    /// it locally. Returns the edited document and the patch report.
    pub async fn apply_prompt_edits(
        &self,
        baseline_xml: &str,
        edit_prompt: &str,
        design_goal: Option<&str>,
        flow_image: Option<&Path>,
    ) -> AppResult<(String, PatchReport)> {
        if edit_prompt.trim().is_empty() {
            return Err(AppError::System(
                "Edit prompt must be a non-empty string".to_string(),
            ));
        }

        // Parse up front so a broken baseline fails before any API call.
        let mut doc = CpacsDocument::parse(baseline_xml)?;

        let mut system = edit_system_prompt();
        if let Some(goal) = design_goal {
            system.push_str(&format!(
                "\nAdditional high-level design goal (from the user):\n{}\n\
                 Use this goal to guide which small edits you propose.\n",
                goal
            ));
        }

        let mut request =
            ChatRequest::new(&self.llm.design_model, self.llm.temperature, system);

        let mut user_text = String::new();
        if flow_image.is_some() {
            user_text.push_str(
                "The attached image is a CFD visualization of the aircraft defined \
                 by the CPACS file.\n\
                 Use it as visual context when deciding small, aerodynamically \
                 meaningful changes.\n\n",
            );
        }
        user_text.push_str(&format!(
            "User requested changes (natural-language description):\n{}\n\n\
             Here is the current CPACS XML document:\n{}",
            edit_prompt, baseline_xml
        ));
        request = request.with_text(user_text);

        if let Some(image_path) = flow_image {
            request = request.with_image(image_to_data_url(image_path)?);
        }

        let reply = self.provider.complete(request).await?;
        let patch = patch::parse_patch(extract_json_object(&reply)?)?;
        let report = patch.apply(&mut doc)?;

        let edited = doc.to_xml_string()?;
        // The patch only touches text and attributes, so this re-check can
        // only fail on an internal serialization bug.
        CpacsDocument::parse(&edited)
            .map_err(|e| AppError::System(format!("Edited XML is not well-formed: {}", e)))?;

        Ok((edited, report))
    }

    /// From-scratch mode: generate a document body, wrap it in the fixed
    /// header and repair against structural checks up to the configured
    /// attempt budget.
    pub async fn generate_from_scratch(&self, design_prompt: &str) -> AppResult<String> {
        let mut current_xml: Option<String> = None;
        let mut errors: Vec<String> = Vec::new();

        for _ in 0..self.llm.max_repair_attempts {
            let user_text = match &current_xml {
                None => format!(
                    "User design prompt describing the desired aircraft:\n{}\n\n\
                     Generate a new CPACS 3.5 body fragment for this aircraft. \
                     Remember: output only the raw XML fragment, no markdown.",
                    design_prompt
                ),
                Some(previous) => format!(
                    "The following CPACS XML you previously generated did NOT pass \
                     the structural checks:\n\n\
                     ----- INVALID XML BEGIN -----\n{}\n----- INVALID XML END -----\n\n\
                     The checks reported these errors:\n{}\n\n\
                     Please return a corrected body fragment that fixes these issues. \
                     Do not explain anything; output only the XML fragment.",
                    previous,
                    errors.join("\n")
                ),
            };

            let request = ChatRequest::new(
                &self.llm.design_model,
                self.llm.temperature,
                scratch_system_prompt(),
            )
            .with_text(user_text);

            let body = strip_code_fences(&self.provider.complete(request).await?);
            let full = wrap_body(&body);

            match CpacsDocument::parse(&full) {
                Ok(doc) => {
                    errors = doc.structural_errors();
                    if errors.is_empty() {
                        return Ok(full);
                    }
                }
                Err(e) => {
                    errors = vec![e.to_string()];
                }
            }
            current_xml = Some(full);
        }

        Err(AppError::Llm(format!(
            "Generated CPACS still invalid after {} attempts:\n{}",
            self.llm.max_repair_attempts,
            errors.join("\n")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedProvider {
        replies: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<&str>) -> Self {
            let mut replies: Vec<String> = replies.into_iter().map(String::from).collect();
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
            }
        }
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn complete(&self, _request: ChatRequest) -> AppResult<String> {
            self.replies
                .lock()
                .unwrap()
                .pop()
                .ok_or_else(|| AppError::Llm("No scripted reply left".to_string()))
        }
    }

    fn llm_config() -> LlmConfig {
        crate::config::Config::default().llm
    }

    #[test]
    fn test_baseline_is_well_formed_and_structurally_valid() {
        let doc = CpacsDocument::parse(BASELINE_CPACS).unwrap();
        assert!(doc.structural_errors().is_empty());
        assert_eq!(doc.model_uids(), vec!["promptPlane".to_string()]);
    }

    #[tokio::test]
    async fn test_apply_prompt_edits_applies_patch() {
        let provider = ScriptedProvider::new(vec![
            r#"{"edits": [{"action": "set_text", "xpath": ".//positioning[@uID='MainWing_pos2']/sweepAngle", "value": "25"}]}"#,
        ]);
        let config = llm_config();
        let generator = DesignGenerator::new(&provider, &config);

        let (edited, report) = generator
            .apply_prompt_edits(BASELINE_CPACS, "sweep the wing back more", None, None)
            .await
            .unwrap();

        assert_eq!(report.applied, 1);
        assert!(edited.contains("25"));
        assert!(CpacsDocument::parse(&edited).is_ok());
    }

    #[tokio::test]
    async fn test_apply_prompt_edits_rejects_empty_prompt() {
        let provider = ScriptedProvider::new(vec![]);
        let config = llm_config();
        let generator = DesignGenerator::new(&provider, &config);

        assert!(
            generator
                .apply_prompt_edits(BASELINE_CPACS, "   ", None, None)
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_from_scratch_repairs_invalid_first_attempt() {
        let provider = ScriptedProvider::new(vec![
            // Missing profiles and model: fails structural checks.
            "<vehicles><aircraft/></vehicles>",
            // Repaired attempt.
            "<vehicles><profiles><wingAirfoils/></profiles>\
             <aircraft><model uID=\"m1\"/></aircraft></vehicles>",
        ]);
        let config = llm_config();
        let generator = DesignGenerator::new(&provider, &config);

        let xml = generator.generate_from_scratch("simple glider").await.unwrap();
        let doc = CpacsDocument::parse(&xml).unwrap();
        assert!(doc.structural_errors().is_empty());
    }

    #[tokio::test]
    async fn test_from_scratch_gives_up_after_budget() {
        let provider = ScriptedProvider::new(vec![
            "<vehicles/>",
            "<vehicles/>",
            "<vehicles/>",
        ]);
        let config = llm_config();
        let generator = DesignGenerator::new(&provider, &config);

        let err = generator
            .generate_from_scratch("simple glider")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("after 3 attempts"));
    }
}
