pub mod generate;
pub mod patch;
pub mod xpath;

use crate::utils::error::{AppError, AppResult};
use std::path::Path;
use xmltree::{Element, EmitterConfig, XMLNode};

pub const CPACS_SCHEMA_LOCATION: &str = "https://www.cpacs.de/schema/v3_5_0/cpacs_schema.xsd";

/// Fixed document header used when wrapping generated bodies. TiGL still
/// requires the deprecated <cpacsVersion> element to open the file.
pub const CPACS_HEADER: &str = r#"    <header>
        <name>Prompt Plane</name>
        <version>1.0.0</version>
        <cpacsVersion>3.5</cpacsVersion>
        <versionInfos>
            <versionInfo version="1.0.0">
                <creator>flyai</creator>
                <timestamp>2024-01-01T00:00:00</timestamp>
                <description>Generated aircraft concept</description>
                <cpacsVersion>3.5</cpacsVersion>
            </versionInfo>
        </versionInfos>
    </header>
"#;

/// Wrap a generated CPACS body (everything between </header> and </cpacs>)
/// into a complete document.
pub fn wrap_body(body: &str) -> String {
    let mut doc = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    doc.push_str("<cpacs xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\"\n");
    doc.push_str(&format!(
        "       xsi:noNamespaceSchemaLocation=\"{}\">\n",
        CPACS_SCHEMA_LOCATION
    ));
    doc.push_str(CPACS_HEADER);
    doc.push_str(body);
    doc.push_str("\n</cpacs>\n");
    doc
}

/// A parsed CPACS document on an element-tree model.
pub struct CpacsDocument {
    root: Element,
}

impl CpacsDocument {
    pub fn parse(text: &str) -> AppResult<Self> {
        let root = Element::parse(text.as_bytes())
            .map_err(|e| AppError::Geometry(format!("Input is not well-formed XML: {}", e)))?;
        Ok(Self { root })
    }

    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Io(format!("Failed to read '{}': {}", path.display(), e)))?;
        Self::parse(&content)
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    pub fn to_xml_string(&self) -> AppResult<String> {
        let mut buf = Vec::new();
        let config = EmitterConfig::new()
            .perform_indent(true)
            .write_document_declaration(true);
        self.root
            .write_with_config(&mut buf, config)
            .map_err(|e| AppError::Geometry(format!("Failed to serialize XML: {}", e)))?;
        String::from_utf8(buf).map_err(|e| AppError::Geometry(format!("Invalid UTF-8: {}", e)))
    }

    pub fn write_file(&self, path: &Path) -> AppResult<()> {
        let content = self.to_xml_string()?;
        std::fs::write(path, content)
            .map_err(|e| AppError::Io(format!("Failed to write '{}': {}", path.display(), e)))
    }

    /// uIDs of aircraft (and rotorcraft) configurations, used to pick the
    /// model the geometry converter should loft.
    pub fn model_uids(&self) -> Vec<String> {
        let mut uids = Vec::new();
        if let Some(vehicles) = self.root.get_child("vehicles") {
            for kind in ["aircraft", "rotorcraft"] {
                if let Some(group) = vehicles.get_child(kind) {
                    for node in &group.children {
                        if let XMLNode::Element(model) = node
                            && model.name == "model"
                            && let Some(uid) = model.attributes.get("uID")
                        {
                            uids.push(uid.clone());
                        }
                    }
                }
            }
        }
        uids
    }

    /// Structural checks applied to generated documents before they are
    /// handed to the geometry converter. Returned strings are fed back to
    /// the repair loop verbatim.
    pub fn structural_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.root.name != "cpacs" {
            errors.push(format!(
                "Root element must be <cpacs>, found <{}>",
                self.root.name
            ));
            return errors;
        }

        if self.root.get_child("header").is_none() {
            errors.push("Missing <header> element".to_string());
        }

        let Some(vehicles) = self.root.get_child("vehicles") else {
            errors.push("Missing <vehicles> element".to_string());
            return errors;
        };

        match vehicles.get_child("profiles") {
            None => errors.push("Missing <vehicles>/<profiles> element".to_string()),
            Some(profiles) => {
                if profiles.get_child("wingAirfoils").is_none() {
                    errors.push("Missing <profiles>/<wingAirfoils> element".to_string());
                }
            }
        }

        if self.model_uids().is_empty() {
            errors.push(
                "No configuration found at /cpacs/vehicles/(aircraft|rotorcraft)/model[@uID]"
                    .to_string(),
            );
        }

        errors
    }
}

/// Replace an element's text content.
pub fn set_element_text(element: &mut Element, value: &str) {
    element
        .children
        .retain(|node| !matches!(node, XMLNode::Text(_) | XMLNode::CData(_)));
    element.children.push(XMLNode::Text(value.to_string()));
}

/// Concatenated text content of an element.
pub fn element_text(element: &Element) -> String {
    let mut out = String::new();
    for node in &element.children {
        match node {
            XMLNode::Text(text) | XMLNode::CData(text) => out.push_str(text),
            _ => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<cpacs>
        <header><name>t</name></header>
        <vehicles>
            <profiles><wingAirfoils/></profiles>
            <aircraft>
                <model uID="plane1"><name>Plane</name></model>
            </aircraft>
        </vehicles>
    </cpacs>"#;

    #[test]
    fn test_parse_and_model_uids() {
        let doc = CpacsDocument::parse(SAMPLE).unwrap();
        assert_eq!(doc.model_uids(), vec!["plane1".to_string()]);
    }

    #[test]
    fn test_structural_errors_on_valid_doc() {
        let doc = CpacsDocument::parse(SAMPLE).unwrap();
        assert!(doc.structural_errors().is_empty());
    }

    #[test]
    fn test_structural_errors_on_missing_model() {
        let doc = CpacsDocument::parse("<cpacs><header/><vehicles><profiles><wingAirfoils/></profiles></vehicles></cpacs>").unwrap();
        let errors = doc.structural_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("No configuration found"));
    }

    #[test]
    fn test_structural_errors_on_wrong_root() {
        let doc = CpacsDocument::parse("<aircraft/>").unwrap();
        assert!(doc.structural_errors()[0].contains("Root element"));
    }

    #[test]
    fn test_wrap_body_is_well_formed() {
        let full = wrap_body("    <vehicles><aircraft><model uID=\"m\"/></aircraft></vehicles>");
        let doc = CpacsDocument::parse(&full).unwrap();
        assert_eq!(doc.root().name, "cpacs");
        assert_eq!(doc.model_uids(), vec!["m".to_string()]);
    }

    #[test]
    fn test_set_and_read_element_text() {
        let mut doc = CpacsDocument::parse("<cpacs><header><name>old</name></header></cpacs>")
            .unwrap();
        let name = doc
            .root_mut()
            .get_mut_child("header")
            .unwrap()
            .get_mut_child("name")
            .unwrap();
        set_element_text(name, "new");
        assert_eq!(element_text(name), "new");
    }

    #[test]
    fn test_serialize_round_trip() {
        let doc = CpacsDocument::parse(SAMPLE).unwrap();
        let text = doc.to_xml_string().unwrap();
        let again = CpacsDocument::parse(&text).unwrap();
        assert_eq!(again.model_uids(), vec!["plane1".to_string()]);
    }
}
