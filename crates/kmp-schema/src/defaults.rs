//! # Defaults Overlay
//!
//! Fills the optional gaps of a fragment from a defaults document of the
//! same shape. The defaults document is a template: a defaults `<policy>`
//! is applied to every `<policy>` of the target.
//!
//! Overlay rules, applied recursively from the roots down:
//!
//! 1. attributes missing on the target element are copied from defaults;
//! 2. a target leaf without text takes the defaults text;
//! 3. a defaults child whose tag the target lacks is deep-copied in, after
//!    the target's own children;
//! 4. a defaults child whose tag the target has is overlaid onto each of
//!    those target children.
//!
//! Direct children of the defaults root are item templates only. They are
//! overlaid onto matching target items and never appended, so an empty
//! `<policies/>` fragment stays empty.
//!
//! Explicit target values are never overridden, and neither input is
//! modified.

use std::fmt;

use kmp_core::Element;

use crate::engine::DocumentSchema;
use crate::error::SchemaError;

/// Overlays a defaults document onto a target document.
pub trait DefaultsMerger: fmt::Debug {
    /// Return a new root holding `target` with the gaps filled from
    /// `defaults`.
    fn apply_defaults(
        &self,
        schema: &dyn DocumentSchema,
        target: &Element,
        defaults: &Element,
    ) -> Result<Element, SchemaError>;
}

/// Schema-guided overlay.
///
/// Defaults for element paths the schema does not declare are skipped, so
/// a stale defaults file cannot smuggle undeclared structure into a
/// fragment.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaOverlay;

impl DefaultsMerger for SchemaOverlay {
    fn apply_defaults(
        &self,
        schema: &dyn DocumentSchema,
        target: &Element,
        defaults: &Element,
    ) -> Result<Element, SchemaError> {
        if target.tag != defaults.tag {
            return Err(SchemaError::DefaultsMismatch {
                target: target.tag.clone(),
                defaults: defaults.tag.clone(),
            });
        }
        let mut merged = target.clone();
        let mut path = vec![defaults.tag.as_str()];
        overlay(schema, &mut merged, defaults, &mut path);
        Ok(merged)
    }
}

fn overlay<'d>(
    schema: &dyn DocumentSchema,
    target: &mut Element,
    defaults: &'d Element,
    path: &mut Vec<&'d str>,
) {
    for (name, value) in &defaults.attributes {
        target
            .attributes
            .entry(name.clone())
            .or_insert_with(|| value.clone());
    }

    if target.children.is_empty() && !target.has_text() && defaults.has_text() {
        target.text = defaults.text.clone();
    }

    // Children appended below must not receive a second overlay.
    let original = target.children.len();
    let at_root = path.len() == 1;
    for default_child in &defaults.children {
        path.push(default_child.tag.as_str());
        if !schema.declares(path) {
            tracing::debug!(
                path = %path.join("/"),
                schema = schema.name(),
                "skipping default for undeclared element"
            );
            path.pop();
            continue;
        }

        let mut matched = false;
        for child in target.children[..original]
            .iter_mut()
            .filter(|c| c.tag == default_child.tag)
        {
            matched = true;
            overlay(schema, child, default_child, path);
        }
        if !matched && !at_root {
            target.children.push(default_child.clone());
        }
        path.pop();
    }
}
