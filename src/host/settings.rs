//! Host settings and partial updates.
//!
//! [`HostSettings`] is the full record with defaults. [`SettingsUpdate`] is a
//! partial update where every field is optional; only present fields are
//! merged, and live modes merge key by key. Updates deserialize from camelCase
//! JSON, ignoring unknown keys:
//!
//! ```ignore
//! let update = SettingsUpdate::from_json(r#"{
//!     "updateTimeout": null,
//!     "onlyRunInContainer": true,
//!     "updateLiveModes": { "props": "deep" },
//!     "someUnknownKey": 1
//! }"#)?;
//! host.modify_settings(&update);
//! ```

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Deserializer};

use crate::equality::CompareMode;
use crate::surface::DomNode;
use crate::error::Result;
use crate::types::Delay;

/// SVG namespace used for `<svg>` subtrees.
pub const SVG_NAMESPACE_URI: &str = "http://www.w3.org/2000/svg";

// =============================================================================
// Live modes
// =============================================================================

/// Compare mode per change category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LiveModes {
    pub props: CompareMode,
    pub state: CompareMode,
    /// Contextual data passed from outside.
    pub remote: CompareMode,
    /// Child definitions passed to a boundary.
    pub children: CompareMode,
}

impl Default for LiveModes {
    fn default() -> Self {
        Self {
            props: CompareMode::Shallow,
            state: CompareMode::Shallow,
            remote: CompareMode::Shallow,
            children: CompareMode::Changed,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LiveModesUpdate {
    pub props: Option<CompareMode>,
    pub state: Option<CompareMode>,
    pub remote: Option<CompareMode>,
    pub children: Option<CompareMode>,
}

impl LiveModes {
    fn merge(&mut self, update: &LiveModesUpdate) -> bool {
        let mut changed = false;
        for (slot, value) in [
            (&mut self.props, update.props),
            (&mut self.state, update.state),
            (&mut self.remote, update.remote),
            (&mut self.children, update.children),
        ] {
            if let Some(mode) = value {
                changed |= *slot != mode;
                *slot = mode;
            }
        }
        changed
    }
}

/// How the apply layer treats a surface node already used elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateBehaviour {
    #[default]
    Deep,
    Shallow,
    Empty,
}

/// Picks the node to use instead of a surface node already used elsewhere.
/// Returning `None` falls back to `duplicate_dom_node_behaviour`.
#[derive(Clone)]
pub struct DuplicateNodeHandler(pub Rc<dyn Fn(&DomNode) -> Option<DomNode>>);

impl DuplicateNodeHandler {
    pub fn new(handler: impl Fn(&DomNode) -> Option<DomNode> + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self, node: &DomNode) -> Option<DomNode> {
        (self.0)(node)
    }
}

impl PartialEq for DuplicateNodeHandler {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for DuplicateNodeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DuplicateNodeHandler(..)")
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Configuration of one host.
///
/// Timing, comparison and container policy are used by the core; the
/// `render_*` and duplicate knobs are handed to the applier untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct HostSettings {
    pub update_timeout: Delay,
    pub render_timeout: Delay,
    /// Ask components to run their "did" calls right away.
    pub ui_did_immediate_calls: bool,
    /// Compare mode for mini-component updates.
    pub update_mini_mode: CompareMode,
    pub update_live_modes: LiveModes,
    /// Disable the host while it has no container.
    pub only_run_in_container: bool,
    /// Inherit contextual data from a parent host.
    pub welcome_contexts_up_root: bool,
    /// Treat keys of array items as global within the parent.
    pub wide_keys_in_arrays: bool,
    /// Skip rendering plain values (strings, numbers) given as content.
    pub no_render_values_mode: bool,
    /// Extra update loops allowed for updates queued during an update pass.
    pub max_re_renders: usize,
    /// Skip element refreshes when props are shallow-equal.
    pub pre_equal_check_dom_props: bool,
    /// Reuse compatible unkeyed siblings regardless of position.
    pub reuse_sibling_tags: bool,
    pub should_update_with_nothing: bool,
    pub call_ref_move_even_if_no_dom_move: bool,
    /// Wrap text nodes in this tag (empty for bare text).
    pub render_text_tag: String,
    pub render_inner_html_tag: String,
    pub render_text_content: Option<String>,
    pub render_svg_namespace_uri: String,
    pub render_dom_props_on_swap: bool,
    pub duplicate_dom_node_behaviour: DuplicateBehaviour,
    pub duplicate_dom_node_handler: Option<DuplicateNodeHandler>,
    pub dev_log_warnings: bool,
    pub dev_log_render_infos: bool,
    pub dev_log_clean_up: bool,
}

impl Default for HostSettings {
    fn default() -> Self {
        Self {
            update_timeout: Delay::ms(0),
            render_timeout: Delay::ms(0),
            ui_did_immediate_calls: false,
            update_mini_mode: CompareMode::Shallow,
            update_live_modes: LiveModes::default(),
            only_run_in_container: false,
            welcome_contexts_up_root: true,
            wide_keys_in_arrays: false,
            no_render_values_mode: false,
            max_re_renders: 1,
            pre_equal_check_dom_props: true,
            reuse_sibling_tags: true,
            should_update_with_nothing: false,
            call_ref_move_even_if_no_dom_move: false,
            render_text_tag: String::new(),
            render_inner_html_tag: "span".to_string(),
            render_text_content: None,
            render_svg_namespace_uri: SVG_NAMESPACE_URI.to_string(),
            render_dom_props_on_swap: true,
            duplicate_dom_node_behaviour: DuplicateBehaviour::Deep,
            duplicate_dom_node_handler: None,
            dev_log_warnings: false,
            dev_log_render_infos: false,
            dev_log_clean_up: false,
        }
    }
}

/// Partial settings. `None` leaves a field as is.
///
/// For delays, `Some(Delay::Sync)` (JSON `null`) is an explicit value, not
/// "absent".
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(deserialize_with = "deserialize_some")]
    pub update_timeout: Option<Delay>,
    #[serde(deserialize_with = "deserialize_some")]
    pub render_timeout: Option<Delay>,
    pub ui_did_immediate_calls: Option<bool>,
    pub update_mini_mode: Option<CompareMode>,
    pub update_live_modes: Option<LiveModesUpdate>,
    pub only_run_in_container: Option<bool>,
    pub welcome_contexts_up_root: Option<bool>,
    pub wide_keys_in_arrays: Option<bool>,
    pub no_render_values_mode: Option<bool>,
    pub max_re_renders: Option<usize>,
    pub pre_equal_check_dom_props: Option<bool>,
    pub reuse_sibling_tags: Option<bool>,
    pub should_update_with_nothing: Option<bool>,
    pub call_ref_move_even_if_no_dom_move: Option<bool>,
    pub render_text_tag: Option<String>,
    pub render_inner_html_tag: Option<String>,
    #[serde(deserialize_with = "deserialize_some")]
    pub render_text_content: Option<Option<String>>,
    pub render_svg_namespace_uri: Option<String>,
    pub render_dom_props_on_swap: Option<bool>,
    pub duplicate_dom_node_behaviour: Option<DuplicateBehaviour>,
    /// Handlers cannot come from JSON; there only `null` (clear) is accepted.
    #[serde(deserialize_with = "deserialize_no_handler")]
    pub duplicate_dom_node_handler: Option<Option<DuplicateNodeHandler>>,
    pub dev_log_warnings: Option<bool>,
    pub dev_log_render_infos: Option<bool>,
    pub dev_log_clean_up: Option<bool>,
}

/// A present field (even `null`) is `Some`.
fn deserialize_some<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn deserialize_no_handler<'de, D>(deserializer: D) -> std::result::Result<Option<Option<DuplicateNodeHandler>>, D::Error>
where
    D: Deserializer<'de>,
{
    <()>::deserialize(deserializer).map(|()| Some(None))
}

impl SettingsUpdate {
    /// Parse a camelCase JSON document. Unknown keys are ignored.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

macro_rules! merge_fields {
    ($settings:ident, $update:ident, $changed:ident; $($field:ident),* $(,)?) => {
        $(
            if let Some(value) = &$update.$field {
                if $settings.$field != *value {
                    $settings.$field = value.clone();
                    $changed = true;
                }
            }
        )*
    };
}

impl HostSettings {
    /// Defaults with `update` merged in.
    pub fn with_update(update: &SettingsUpdate) -> Self {
        let mut settings = Self::default();
        settings.merge(update);
        settings
    }

    /// Merge present fields. Returns whether any value changed.
    pub fn merge(&mut self, update: &SettingsUpdate) -> bool {
        let mut changed = false;
        if let Some(modes) = &update.update_live_modes {
            changed |= self.update_live_modes.merge(modes);
        }
        let settings = self;
        merge_fields!(settings, update, changed;
            update_timeout,
            render_timeout,
            ui_did_immediate_calls,
            update_mini_mode,
            only_run_in_container,
            welcome_contexts_up_root,
            wide_keys_in_arrays,
            no_render_values_mode,
            max_re_renders,
            pre_equal_check_dom_props,
            reuse_sibling_tags,
            should_update_with_nothing,
            call_ref_move_even_if_no_dom_move,
            render_text_tag,
            render_inner_html_tag,
            render_text_content,
            render_svg_namespace_uri,
            render_dom_props_on_swap,
            duplicate_dom_node_behaviour,
            duplicate_dom_node_handler,
            dev_log_warnings,
            dev_log_render_infos,
            dev_log_clean_up,
        );
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = HostSettings::default();
        assert_eq!(settings.update_timeout, Delay::ms(0));
        assert_eq!(settings.update_live_modes.children, CompareMode::Changed);
        assert_eq!(settings.max_re_renders, 1);
        assert_eq!(settings.render_inner_html_tag, "span");
        assert!(settings.welcome_contexts_up_root);
        assert!(!settings.only_run_in_container);
    }

    #[test]
    fn test_merge_live_modes_key_by_key() {
        let mut settings = HostSettings::default();
        let update = SettingsUpdate {
            update_live_modes: Some(LiveModesUpdate {
                props: Some(CompareMode::Deep),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(settings.merge(&update));
        assert_eq!(settings.update_live_modes.props, CompareMode::Deep);
        assert_eq!(settings.update_live_modes.state, CompareMode::Shallow);

        // Same values again: nothing changes.
        assert!(!settings.merge(&update));
    }

    #[test]
    fn test_from_json() {
        let update = SettingsUpdate::from_json(
            r#"{
                "updateTimeout": null,
                "renderTimeout": 16,
                "onlyRunInContainer": true,
                "renderTextContent": null,
                "updateLiveModes": { "children": "shallow" },
                "duplicateDomNodeBehaviour": "empty",
                "notASetting": [1, 2]
            }"#,
        )
        .unwrap();
        assert_eq!(update.update_timeout, Some(Delay::Sync));
        assert_eq!(update.render_timeout, Some(Delay::ms(16)));
        assert_eq!(update.render_text_content, Some(None));
        assert_eq!(update.max_re_renders, None);

        let settings = HostSettings::with_update(&update);
        assert_eq!(settings.update_timeout, Delay::Sync);
        assert!(settings.only_run_in_container);
        assert_eq!(settings.update_live_modes.children, CompareMode::Shallow);
        assert_eq!(settings.duplicate_dom_node_behaviour, DuplicateBehaviour::Empty);
    }

    #[test]
    fn test_pass_through_knobs() {
        let settings = HostSettings::default();
        assert_eq!(settings.update_mini_mode, CompareMode::Shallow);
        assert!(!settings.ui_did_immediate_calls);
        assert!(!settings.wide_keys_in_arrays);
        assert!(!settings.no_render_values_mode);
        assert!(settings.duplicate_dom_node_handler.is_none());

        let update = SettingsUpdate::from_json(
            r#"{
                "uiDidImmediateCalls": true,
                "updateMiniMode": "deep",
                "wideKeysInArrays": true,
                "noRenderValuesMode": true,
                "duplicateDomNodeHandler": null
            }"#,
        )
        .unwrap();
        assert_eq!(update.duplicate_dom_node_handler, Some(None));

        let mut settings = HostSettings::default();
        assert!(settings.merge(&update));
        assert!(settings.ui_did_immediate_calls);
        assert_eq!(settings.update_mini_mode, CompareMode::Deep);
        assert!(settings.wide_keys_in_arrays);
        assert!(settings.no_render_values_mode);
        assert!(settings.duplicate_dom_node_handler.is_none());
        assert!(SettingsUpdate::from_json(r#"{ "duplicateDomNodeHandler": 3 }"#).is_err());
    }

    #[test]
    fn test_merge_handler() {
        let handler = DuplicateNodeHandler::new(|node| Some(node.clone()));
        let update = SettingsUpdate {
            duplicate_dom_node_handler: Some(Some(handler.clone())),
            ..Default::default()
        };
        let mut settings = HostSettings::default();
        assert!(settings.merge(&update));
        assert!(!settings.merge(&update));

        let node = DomNode::element("div");
        let picked = settings.duplicate_dom_node_handler.as_ref().and_then(|h| h.call(&node));
        assert_eq!(picked, Some(node));

        let clear = SettingsUpdate {
            duplicate_dom_node_handler: Some(None),
            ..Default::default()
        };
        assert!(settings.merge(&clear));
        assert!(settings.duplicate_dom_node_handler.is_none());
    }

    #[test]
    fn test_from_json_rejects_bad_values() {
        assert!(SettingsUpdate::from_json(r#"{ "maxReRenders": "many" }"#).is_err());
        assert!(SettingsUpdate::from_json(r#"{ "updateLiveModes": { "props": "sideways" } }"#).is_err());
    }
}
