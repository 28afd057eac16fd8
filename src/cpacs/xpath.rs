//! Subset of ElementTree-style XPath used by the geometry edit protocol.
//!
//! Supported selectors: an optional leading `.//` (search all descendants for
//! the first step) or `./`, followed by `/`-separated child steps. Each step
//! may carry a single attribute predicate, e.g.
//! `.//wing[@uID='MainWing']/segments/segment`.

use crate::utils::error::{AppError, AppResult};
use xmltree::{Element, XMLNode};

#[derive(Debug, Clone, PartialEq)]
pub struct AttrPredicate {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub name: String,
    pub predicate: Option<AttrPredicate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub from_descendants: bool,
    pub steps: Vec<Step>,
}

impl Selector {
    pub fn parse(input: &str) -> AppResult<Self> {
        let mut rest = input.trim();
        let from_descendants = if let Some(stripped) = rest.strip_prefix(".//") {
            rest = stripped;
            true
        } else if let Some(stripped) = rest.strip_prefix("./") {
            rest = stripped;
            false
        } else {
            false
        };

        if rest.is_empty() || rest.contains("//") {
            return Err(AppError::Geometry(format!(
                "Unsupported XPath selector: '{}'",
                input
            )));
        }

        let steps = rest
            .split('/')
            .map(parse_step)
            .collect::<AppResult<Vec<_>>>()
            .map_err(|_| {
                AppError::Geometry(format!("Unsupported XPath selector: '{}'", input))
            })?;

        Ok(Self {
            from_descendants,
            steps,
        })
    }
}

fn parse_step(step: &str) -> AppResult<Step> {
    let step = step.trim();
    if step.is_empty() {
        return Err(AppError::Geometry("Empty path step".to_string()));
    }

    let Some(open) = step.find('[') else {
        return Ok(Step {
            name: step.to_string(),
            predicate: None,
        });
    };

    if !step.ends_with(']') {
        return Err(AppError::Geometry(format!("Malformed predicate in '{}'", step)));
    }

    let name = step[..open].trim();
    let inner = step[open + 1..step.len() - 1].trim();

    let attr = inner
        .strip_prefix('@')
        .ok_or_else(|| AppError::Geometry(format!("Malformed predicate in '{}'", step)))?;
    let (attr_name, quoted) = attr
        .split_once('=')
        .ok_or_else(|| AppError::Geometry(format!("Malformed predicate in '{}'", step)))?;

    let quoted = quoted.trim();
    let value = quoted
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .or_else(|| quoted.strip_prefix('"').and_then(|v| v.strip_suffix('"')))
        .ok_or_else(|| AppError::Geometry(format!("Malformed predicate in '{}'", step)))?;

    if name.is_empty() || attr_name.trim().is_empty() {
        return Err(AppError::Geometry(format!("Malformed predicate in '{}'", step)));
    }

    Ok(Step {
        name: name.to_string(),
        predicate: Some(AttrPredicate {
            name: attr_name.trim().to_string(),
            value: value.to_string(),
        }),
    })
}

fn element_matches(element: &Element, step: &Step) -> bool {
    if element.name != step.name {
        return false;
    }
    match &step.predicate {
        None => true,
        Some(pred) => element.attributes.get(&pred.name) == Some(&pred.value),
    }
}

/// All elements matched by `selector`, as index paths into the children
/// vectors of the tree below `root`. Index paths stay valid across text and
/// attribute mutations, so matches can be resolved mutably afterwards.
pub fn find_paths(root: &Element, selector: &Selector) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    let mut prefix = Vec::new();
    if selector.from_descendants {
        search_descendants(root, &selector.steps, &mut prefix, &mut out);
    } else {
        match_child_steps(root, &selector.steps, &mut prefix, &mut out);
    }
    out
}

fn match_child_steps(
    element: &Element,
    steps: &[Step],
    prefix: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    if steps.is_empty() {
        out.push(prefix.clone());
        return;
    }
    for (i, node) in element.children.iter().enumerate() {
        if let XMLNode::Element(child) = node
            && element_matches(child, &steps[0])
        {
            prefix.push(i);
            match_child_steps(child, &steps[1..], prefix, out);
            prefix.pop();
        }
    }
}

fn search_descendants(
    element: &Element,
    steps: &[Step],
    prefix: &mut Vec<usize>,
    out: &mut Vec<Vec<usize>>,
) {
    for (i, node) in element.children.iter().enumerate() {
        if let XMLNode::Element(child) = node {
            prefix.push(i);
            if element_matches(child, &steps[0]) {
                match_child_steps(child, &steps[1..], prefix, out);
            }
            search_descendants(child, steps, prefix, out);
            prefix.pop();
        }
    }
}

/// Resolve an index path produced by [`find_paths`] to a mutable element.
pub fn resolve_mut<'a>(root: &'a mut Element, path: &[usize]) -> Option<&'a mut Element> {
    let mut current = root;
    for &index in path {
        match current.children.get_mut(index)? {
            XMLNode::Element(child) => current = child,
            _ => return None,
        }
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpacs::element_text;

    fn sample() -> Element {
        Element::parse(
            r#"<cpacs>
                <vehicles>
                    <aircraft>
                        <model uID="m1">
                            <wings>
                                <wing uID="MainWing"><span>10.0</span></wing>
                                <wing uID="Tail"><span>3.0</span></wing>
                            </wings>
                        </model>
                    </aircraft>
                </vehicles>
            </cpacs>"#
                .as_bytes(),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_descendant_selector_with_predicate() {
        let sel = Selector::parse(".//wing[@uID='MainWing']/span").unwrap();
        assert!(sel.from_descendants);
        assert_eq!(sel.steps.len(), 2);
        assert_eq!(sel.steps[0].name, "wing");
        assert_eq!(
            sel.steps[0].predicate,
            Some(AttrPredicate {
                name: "uID".to_string(),
                value: "MainWing".to_string()
            })
        );
    }

    #[test]
    fn test_parse_rejects_malformed_predicate() {
        assert!(Selector::parse(".//wing[uID='x']").is_err());
        assert!(Selector::parse(".//wing[@uID=x]").is_err());
        assert!(Selector::parse("").is_err());
    }

    #[test]
    fn test_find_descendant_with_predicate() {
        let root = sample();
        let sel = Selector::parse(".//wing[@uID='MainWing']/span").unwrap();
        let paths = find_paths(&root, &sel);
        assert_eq!(paths.len(), 1);

        let mut root = root;
        let span = resolve_mut(&mut root, &paths[0]).unwrap();
        assert_eq!(element_text(span), "10.0");
    }

    #[test]
    fn test_find_all_matches_without_predicate() {
        let root = sample();
        let sel = Selector::parse(".//wing").unwrap();
        assert_eq!(find_paths(&root, &sel).len(), 2);
    }

    #[test]
    fn test_relative_child_path() {
        let root = sample();
        let sel = Selector::parse("vehicles/aircraft/model").unwrap();
        let paths = find_paths(&root, &sel);
        assert_eq!(paths.len(), 1);

        let mut root = root;
        let model = resolve_mut(&mut root, &paths[0]).unwrap();
        assert_eq!(model.name, "model");
        assert_eq!(model.attributes.get("uID").map(String::as_str), Some("m1"));
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let root = sample();
        let sel = Selector::parse(".//fuselage").unwrap();
        assert!(find_paths(&root, &sel).is_empty());
    }

    #[test]
    fn test_double_quoted_predicate() {
        let sel = Selector::parse(r#".//wing[@uID="Tail"]"#).unwrap();
        let root = sample();
        assert_eq!(find_paths(&root, &sel).len(), 1);
    }
}
