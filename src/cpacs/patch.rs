//! JSON edit patches produced by the design model.
//!
//! The model never rewrites the CPACS document. It answers with a JSON object
//! listing `set_text` / `set_attribute` edits addressed by path selectors;
//! the patch is applied locally so the document structure stays intact. A bad
//! edit is skipped with a note instead of failing the whole patch.

use crate::cpacs::{CpacsDocument, set_element_text};
use crate::cpacs::xpath::{self, Selector};
use crate::utils::error::{AppError, AppResult};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GeometryPatch {
    pub edits: Vec<EditSpec>,
}

#[derive(Debug, Deserialize)]
pub struct EditSpec {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub xpath: Option<String>,
    #[serde(default)]
    pub attribute: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Default)]
pub struct PatchReport {
    pub applied: usize,
    pub skipped: Vec<String>,
}

/// Parse a model reply into a patch, insisting on the top-level `edits` list.
pub fn parse_patch(json: &str) -> AppResult<GeometryPatch> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| AppError::Llm(format!("Failed to parse JSON from model: {}", e)))?;

    if !value.get("edits").is_some_and(|e| e.is_array()) {
        return Err(AppError::Llm(format!(
            "JSON does not have the expected 'edits' list: {}",
            value
        )));
    }

    serde_json::from_value(value)
        .map_err(|e| AppError::Llm(format!("Malformed edit patch: {}", e)))
}

impl GeometryPatch {
    pub fn apply(&self, doc: &mut CpacsDocument) -> AppResult<PatchReport> {
        let mut report = PatchReport::default();

        for edit in &self.edits {
            let (Some(action), Some(xpath_str)) = (edit.action.as_deref(), edit.xpath.as_deref())
            else {
                report
                    .skipped
                    .push("Edit without 'action' or 'xpath'".to_string());
                continue;
            };

            let selector = match Selector::parse(xpath_str) {
                Ok(selector) => selector,
                Err(e) => {
                    report.skipped.push(e.to_string());
                    continue;
                }
            };

            let paths = xpath::find_paths(doc.root(), &selector);
            if paths.is_empty() {
                report
                    .skipped
                    .push(format!("XPath did not match any elements: {}", xpath_str));
                continue;
            }

            let value = edit.value.as_deref().unwrap_or_default();

            match action {
                "set_text" => {
                    for path in &paths {
                        if let Some(element) = xpath::resolve_mut(doc.root_mut(), path) {
                            set_element_text(element, value);
                        }
                    }
                    report.applied += 1;
                }
                "set_attribute" => {
                    let Some(attr_name) = edit.attribute.as_deref() else {
                        report.skipped.push(format!(
                            "'set_attribute' edit without 'attribute' name: {}",
                            xpath_str
                        ));
                        continue;
                    };
                    for path in &paths {
                        if let Some(element) = xpath::resolve_mut(doc.root_mut(), path) {
                            element
                                .attributes
                                .insert(attr_name.to_string(), value.to_string());
                        }
                    }
                    report.applied += 1;
                }
                other => {
                    report
                        .skipped
                        .push(format!("Unknown action '{}'", other));
                }
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpacs::element_text;

    const DOC: &str = r#"<cpacs>
        <vehicles>
            <aircraft>
                <model uID="m1">
                    <wings>
                        <wing uID="MainWing"><span>10.0</span></wing>
                    </wings>
                </model>
            </aircraft>
        </vehicles>
    </cpacs>"#;

    #[test]
    fn test_parse_patch_requires_edits_list() {
        assert!(parse_patch(r#"{"edits": []}"#).is_ok());
        assert!(parse_patch(r#"{"changes": []}"#).is_err());
        assert!(parse_patch("not json").is_err());
    }

    #[test]
    fn test_apply_set_text() {
        let mut doc = CpacsDocument::parse(DOC).unwrap();
        let patch = parse_patch(
            r#"{"edits": [{"action": "set_text", "xpath": ".//wing[@uID='MainWing']/span", "value": "12.5"}]}"#,
        )
        .unwrap();

        let report = patch.apply(&mut doc).unwrap();
        assert_eq!(report.applied, 1);
        assert!(report.skipped.is_empty());

        let sel = Selector::parse(".//wing[@uID='MainWing']/span").unwrap();
        let paths = xpath::find_paths(doc.root(), &sel);
        let span = xpath::resolve_mut(doc.root_mut(), &paths[0]).unwrap();
        assert_eq!(element_text(span), "12.5");
    }

    #[test]
    fn test_apply_set_attribute() {
        let mut doc = CpacsDocument::parse(DOC).unwrap();
        let patch = parse_patch(
            r#"{"edits": [{"action": "set_attribute", "xpath": ".//wing[@uID='MainWing']", "attribute": "symmetry", "value": "x-z-plane"}]}"#,
        )
        .unwrap();

        let report = patch.apply(&mut doc).unwrap();
        assert_eq!(report.applied, 1);

        let sel = Selector::parse(".//wing[@uID='MainWing']").unwrap();
        let paths = xpath::find_paths(doc.root(), &sel);
        let wing = xpath::resolve_mut(doc.root_mut(), &paths[0]).unwrap();
        assert_eq!(
            wing.attributes.get("symmetry").map(String::as_str),
            Some("x-z-plane")
        );
    }

    #[test]
    fn test_unmatched_xpath_is_skipped_not_fatal() {
        let mut doc = CpacsDocument::parse(DOC).unwrap();
        let patch = parse_patch(
            r#"{"edits": [
                {"action": "set_text", "xpath": ".//rotor/rpm", "value": "900"},
                {"action": "set_text", "xpath": ".//wing[@uID='MainWing']/span", "value": "11.0"}
            ]}"#,
        )
        .unwrap();

        let report = patch.apply(&mut doc).unwrap();
        assert_eq!(report.applied, 1);
        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].contains(".//rotor/rpm"));
    }

    #[test]
    fn test_unknown_action_is_skipped() {
        let mut doc = CpacsDocument::parse(DOC).unwrap();
        let patch = parse_patch(
            r#"{"edits": [{"action": "delete_node", "xpath": ".//wing", "value": ""}]}"#,
        )
        .unwrap();

        let report = patch.apply(&mut doc).unwrap();
        assert_eq!(report.applied, 0);
        assert!(report.skipped[0].contains("delete_node"));
    }

    #[test]
    fn test_set_attribute_without_name_is_skipped() {
        let mut doc = CpacsDocument::parse(DOC).unwrap();
        let patch = parse_patch(
            r#"{"edits": [{"action": "set_attribute", "xpath": ".//wing", "value": "x"}]}"#,
        )
        .unwrap();

        let report = patch.apply(&mut doc).unwrap();
        assert_eq!(report.applied, 0);
        assert_eq!(report.skipped.len(), 1);
    }
}
