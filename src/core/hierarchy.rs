//! Hierarchy diff rendering
//!
//! Class and property hierarchies share one shape and one renderer. A
//! payload is turned into a flat, pre-ordered [`TreeView`] that both the
//! dashboard and the CLI draw, and that can emit nested HTML markup.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, trace};

use super::api::format_count;

/// One node of a class or property hierarchy, as sent by the backend
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct HierarchyNode {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "cnt_instances_current", default, deserialize_with = "lenient_count")]
    pub instance_count: i64,
    #[serde(rename = "cnt_instances_prev", default, deserialize_with = "lenient_count")]
    pub previous_count: i64,
    #[serde(rename = "cnt_added", default, deserialize_with = "lenient_count")]
    pub added_count: i64,
    #[serde(rename = "cnt_deleted", default, deserialize_with = "lenient_count")]
    pub deleted_count: i64,
    #[serde(default, deserialize_with = "nullable_children")]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn new(label: &str, instances: i64, added: i64, deleted: i64) -> Self {
        Self {
            label: Some(label.to_string()),
            instance_count: instances,
            added_count: added,
            deleted_count: deleted,
            ..Default::default()
        }
    }

    pub fn with_children(mut self, children: Vec<HierarchyNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_changed(&self) -> bool {
        self.added_count > 0 || self.deleted_count > 0
    }

    pub fn display_label(&self) -> &str {
        self.label
            .as_deref()
            .filter(|l| !l.is_empty())
            .or(self.id.as_deref())
            .unwrap_or("(unnamed)")
    }
}

/// Numbers, numeric strings and null all count; anything else is 0
fn lenient_count<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Value::String(s) => s.trim().parse::<f64>().map(|f| f as i64).unwrap_or(0),
        _ => 0,
    })
}

fn nullable_children<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<HierarchyNode>, D::Error> {
    Ok(Option::<Vec<HierarchyNode>>::deserialize(d)?.unwrap_or_default())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeStatus {
    Changed,
    Unchanged,
}

/// A rendered node
#[derive(Clone, Debug, PartialEq)]
pub struct TreeRow {
    pub label: String,
    pub instances: i64,
    /// Present only when positive
    pub added: Option<i64>,
    /// Present only when positive
    pub deleted: Option<i64>,
    pub status: ChangeStatus,
    pub depth: usize,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub expanded: bool,
    /// Hidden by the changed-only filter
    pub hidden: bool,
    changed_below: bool,
}

impl TreeRow {
    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    pub fn is_changed(&self) -> bool {
        self.status == ChangeStatus::Changed
    }
}

/// Collapsible tree built from one hierarchy payload
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TreeView {
    rows: Vec<TreeRow>,
    roots: Vec<usize>,
    show_only_changed: bool,
}

impl TreeView {
    /// Build the tree; every node starts collapsed and unfiltered
    pub fn render(nodes: &[HierarchyNode]) -> Self {
        let mut view = Self::default();
        for node in nodes {
            let idx = view.push(node, 0, None);
            view.roots.push(idx);
        }
        debug!(
            nodes = view.rows.len(),
            roots = view.roots.len(),
            changed = view.changed_count(),
            "Hierarchy rendered"
        );
        view
    }

    fn push(&mut self, node: &HierarchyNode, depth: usize, parent: Option<usize>) -> usize {
        let idx = self.rows.len();
        let changed = node.is_changed();
        self.rows.push(TreeRow {
            label: node.display_label().to_string(),
            instances: node.instance_count,
            added: (node.added_count > 0).then_some(node.added_count),
            deleted: (node.deleted_count > 0).then_some(node.deleted_count),
            status: if changed {
                ChangeStatus::Changed
            } else {
                ChangeStatus::Unchanged
            },
            depth,
            parent,
            children: Vec::new(),
            expanded: false,
            hidden: false,
            changed_below: false,
        });

        let mut changed_below = false;
        for child in &node.children {
            let c = self.push(child, depth + 1, Some(idx));
            changed_below |= self.rows[c].is_changed() || self.rows[c].changed_below;
            self.rows[idx].children.push(c);
        }
        self.rows[idx].changed_below = changed_below;
        idx
    }

    /// Hide unchanged nodes (ancestors of changed nodes stay for context).
    ///
    /// Rendering replaces the whole tree, so this must be reapplied after
    /// every [`TreeView::render`].
    pub fn apply_change_filter(&mut self, show_only_changed: bool) {
        self.show_only_changed = show_only_changed;
        for row in &mut self.rows {
            row.hidden = show_only_changed && !row.is_changed() && !row.changed_below;
        }
        trace!(show_only_changed, "Change filter applied");
    }

    pub fn show_only_changed(&self) -> bool {
        self.show_only_changed
    }

    /// Flip expand/collapse of a node with children
    pub fn toggle(&mut self, idx: usize) {
        if let Some(row) = self.rows.get_mut(idx) {
            if row.has_children() {
                row.expanded = !row.expanded;
            }
        }
    }

    pub fn set_all_expanded(&mut self, expanded: bool) {
        for row in &mut self.rows {
            row.expanded = expanded && row.has_children();
        }
    }

    pub fn rows(&self) -> &[TreeRow] {
        &self.rows
    }

    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn row(&self, idx: usize) -> Option<&TreeRow> {
        self.rows.get(idx)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn changed_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_changed()).count()
    }

    /// Row is on screen: not filtered, and every ancestor expanded and shown
    pub fn is_visible(&self, idx: usize) -> bool {
        let Some(row) = self.rows.get(idx) else {
            return false;
        };
        if row.hidden {
            return false;
        }
        let mut parent = row.parent;
        while let Some(p) = parent {
            let prow = &self.rows[p];
            if prow.hidden || !prow.expanded {
                return false;
            }
            parent = prow.parent;
        }
        true
    }

    /// Indices of on-screen rows in display order
    pub fn visible_rows(&self) -> Vec<usize> {
        // rows are stored pre-order, display order is storage order
        (0..self.rows.len()).filter(|&i| self.is_visible(i)).collect()
    }

    /// Nested `section.tree-node` markup
    pub fn to_markup(&self) -> String {
        let mut html = String::from(r#"<section class="snapshot-tree">"#);
        for &root in &self.roots {
            self.write_markup(root, &mut html);
        }
        html.push_str("</section>");
        html
    }

    fn write_markup(&self, idx: usize, html: &mut String) {
        let row = &self.rows[idx];
        let changed = row.is_changed();

        html.push_str(r#"<section class="tree-node"#);
        if row.has_children() {
            html.push_str(" has-children");
        }
        html.push_str(if changed { " changed" } else { " unchanged" });
        if row.expanded {
            html.push_str(" expanded");
        }
        html.push('"');
        if row.hidden {
            html.push_str(r#" style="display:none""#);
        }
        html.push('>');

        if row.has_children() {
            html.push_str(r#"<span class="expand-btn"></span>"#);
        }

        let (label_class, info_class) = if changed {
            ("class-label-changed", "info info-changed")
        } else {
            ("class-label", "info")
        };
        html.push_str(&format!(
            r#"<span class="{label_class}">{}</span><div class="info-row"><span class="{info_class}">Instances: {}</span>"#,
            escape_html(&row.label),
            fmt_count(row.instances)
        ));
        if let Some(added) = row.added {
            html.push_str(&format!(
                r#"<span class="info info-added">Added: {}</span>"#,
                fmt_count(added)
            ));
        }
        if let Some(deleted) = row.deleted {
            html.push_str(&format!(
                r#"<span class="info info-deleted">Deleted: {}</span>"#,
                fmt_count(deleted)
            ));
        }
        html.push_str("</div>");

        if row.has_children() {
            html.push_str(r#"<section class="children">"#);
            for &child in &row.children {
                self.write_markup(child, html);
            }
            html.push_str("</section>");
        }
        html.push_str("</section>");
    }
}

pub fn fmt_count(n: i64) -> String {
    if n < 0 {
        format!("-{}", format_count(n.unsigned_abs()))
    } else {
        format_count(n as u64)
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Which hierarchy a panel shows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HierarchyKind {
    Classes,
    Properties,
}

impl HierarchyKind {
    pub fn title(&self) -> &'static str {
        match self {
            Self::Classes => "Classes",
            Self::Properties => "Properties",
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            Self::Classes => "class",
            Self::Properties => "property",
        }
    }
}

/// What a hierarchy panel currently shows
#[derive(Clone, Debug, Default, PartialEq)]
pub enum PanelState {
    #[default]
    Idle,
    Loading,
    Tree(TreeView),
    /// Empty payload with no reference snapshot: nothing tracked yet
    NoData,
    /// Network or backend failure
    Failed(String),
}

impl PanelState {
    /// Panel content for one hierarchy of a statistics response
    pub fn from_payload(
        nodes: Option<&[HierarchyNode]>,
        snapshot_ts: Option<&str>,
        show_only_changed: bool,
    ) -> Self {
        let nodes = nodes.unwrap_or_default();
        if nodes.is_empty() && snapshot_ts.is_none() {
            return Self::NoData;
        }
        let mut tree = TreeView::render(nodes);
        tree.apply_change_filter(show_only_changed);
        Self::Tree(tree)
    }

    pub fn tree(&self) -> Option<&TreeView> {
        match self {
            Self::Tree(t) => Some(t),
            _ => None,
        }
    }

    pub fn tree_mut(&mut self) -> Option<&mut TreeView> {
        match self {
            Self::Tree(t) => Some(t),
            _ => None,
        }
    }

    pub fn to_markup(&self, kind: HierarchyKind) -> String {
        match self {
            Self::Idle => String::new(),
            Self::Loading => r#"<div class="loading">Loading...</div>"#.to_string(),
            Self::Tree(t) => t.to_markup(),
            Self::NoData => format!(
                r#"<div class="notification is-warning mt-2"><strong>Notice:</strong> No {} statistics available for this repository.</div>"#,
                kind.noun()
            ),
            Self::Failed(msg) => format!(
                r#"<div class="notification is-danger"><strong>Error:</strong> {}</div>"#,
                escape_html(msg)
            ),
        }
    }
}
