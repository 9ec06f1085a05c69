use serde_json::Value;
use std::collections::HashSet;

/// Longest string preview before truncation.
const PREVIEW_MAX: usize = 60;

/// One visible line of the tree: a node whose ancestors are all expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    /// RFC 6901 JSON Pointer locating this node in the root document.
    pub pointer: String,
    /// Object key or array index, None for the document root.
    pub label: Option<String>,
    pub depth: usize,
    pub preview: String,
    pub has_children: bool,
    pub child_count: usize,
    pub expanded: bool,
}

/// Foldable view over an arbitrary JSON document.
///
/// The document itself is never reshaped - fold state lives in a pointer
/// set beside it, and the visible rows are recomputed whenever that set
/// changes. Selection is tracked as an index into the visible rows.
pub struct JsonTree {
    root: Value,
    expanded: HashSet<String>,
    rows: Vec<TreeRow>,
    selected: usize,
}

impl JsonTree {
    /// Builds a tree with every container shallower than `expand_depth`
    /// pre-expanded (the root sits at depth 0, so `expand_depth == 1`
    /// shows only the root's direct children).
    pub fn new(root: Value, expand_depth: usize) -> Self {
        let mut expanded = HashSet::new();
        collect_expanded(&root, "", 0, expand_depth, &mut expanded);
        let rows = flatten(&root, &expanded);
        Self {
            root,
            expanded,
            rows,
            selected: 0,
        }
    }

    pub fn rows(&self) -> &[TreeRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn selected_row(&self) -> Option<&TreeRow> {
        self.rows.get(self.selected)
    }

    /// The raw value under the selected row.
    pub fn selected_value(&self) -> Option<&Value> {
        let row = self.selected_row()?;
        self.root.pointer(&row.pointer)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.rows.len() {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_page_down(&mut self, page: usize) {
        if !self.rows.is_empty() {
            self.selected = (self.selected + page).min(self.rows.len() - 1);
        }
    }

    pub fn select_page_up(&mut self, page: usize) {
        self.selected = self.selected.saturating_sub(page);
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
    }

    pub fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }

    /// Expand a collapsed container, collapse an expanded one. Leaves are
    /// left alone.
    pub fn toggle_selected(&mut self) {
        let Some(row) = self.rows.get(self.selected) else {
            return;
        };
        if !row.has_children {
            return;
        }
        let pointer = row.pointer.clone();
        if !self.expanded.remove(&pointer) {
            self.expanded.insert(pointer.clone());
        }
        self.rebuild(&pointer);
    }

    pub fn expand_selected(&mut self) {
        let Some(row) = self.rows.get(self.selected) else {
            return;
        };
        if row.has_children && !row.expanded {
            let pointer = row.pointer.clone();
            self.expanded.insert(pointer.clone());
            self.rebuild(&pointer);
        }
    }

    /// Collapse the selected container; on a leaf or an already collapsed
    /// node, move the selection to its parent instead.
    pub fn collapse_selected(&mut self) {
        let Some(row) = self.rows.get(self.selected) else {
            return;
        };
        if row.has_children && row.expanded {
            let pointer = row.pointer.clone();
            self.expanded.remove(&pointer);
            self.rebuild(&pointer);
        } else if let Some(slash) = row.pointer.rfind('/') {
            let parent = row.pointer[..slash].to_string();
            self.rebuild(&parent);
        }
    }

    /// Recompute visible rows and re-seat the selection on `pointer`.
    fn rebuild(&mut self, pointer: &str) {
        self.rows = flatten(&self.root, &self.expanded);
        self.selected = self
            .rows
            .iter()
            .position(|r| r.pointer == pointer)
            .unwrap_or(0);
    }
}

/// Pre-expands containers shallower than `max_depth`.
fn collect_expanded(
    value: &Value,
    pointer: &str,
    depth: usize,
    max_depth: usize,
    expanded: &mut HashSet<String>,
) {
    match value {
        Value::Object(map) => {
            if depth < max_depth {
                expanded.insert(pointer.to_string());
                for (key, child) in map {
                    let child_pointer = format!("{}/{}", pointer, escape_pointer_token(key));
                    collect_expanded(child, &child_pointer, depth + 1, max_depth, expanded);
                }
            }
        }
        Value::Array(items) => {
            if depth < max_depth {
                expanded.insert(pointer.to_string());
                for (index, child) in items.iter().enumerate() {
                    let child_pointer = format!("{}/{}", pointer, index);
                    collect_expanded(child, &child_pointer, depth + 1, max_depth, expanded);
                }
            }
        }
        _ => {}
    }
}

fn flatten(root: &Value, expanded: &HashSet<String>) -> Vec<TreeRow> {
    let mut rows = Vec::new();
    push_rows(root, "", None, 0, expanded, &mut rows);
    rows
}

fn push_rows(
    value: &Value,
    pointer: &str,
    label: Option<String>,
    depth: usize,
    expanded: &HashSet<String>,
    rows: &mut Vec<TreeRow>,
) {
    let child_count = match value {
        Value::Object(map) => map.len(),
        Value::Array(items) => items.len(),
        _ => 0,
    };
    let has_children = child_count > 0;
    let is_expanded = has_children && expanded.contains(pointer);

    rows.push(TreeRow {
        pointer: pointer.to_string(),
        label,
        depth,
        preview: preview_for(value),
        has_children,
        child_count,
        expanded: is_expanded,
    });

    if !is_expanded {
        return;
    }

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_pointer = format!("{}/{}", pointer, escape_pointer_token(key));
                push_rows(
                    child,
                    &child_pointer,
                    Some(key.clone()),
                    depth + 1,
                    expanded,
                    rows,
                );
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let child_pointer = format!("{}/{}", pointer, index);
                push_rows(
                    child,
                    &child_pointer,
                    Some(index.to_string()),
                    depth + 1,
                    expanded,
                    rows,
                );
            }
        }
        _ => {}
    }
}

fn preview_for(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => {
            if s.chars().count() > PREVIEW_MAX {
                let truncated: String = s.chars().take(PREVIEW_MAX).collect();
                format!("\"{}...\"", truncated)
            } else {
                format!("\"{}\"", s)
            }
        }
        Value::Array(items) => format!("({} items)", items.len()),
        Value::Object(map) => format!("({} fields)", map.len()),
    }
}

/// RFC 6901 token escaping: `~` first, then `/`.
fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "studies": [
                {"id": "NCT001", "title": "Trial one"},
                {"id": "NCT002"}
            ],
            "totalCount": 2
        })
    }

    #[test]
    fn fully_expanded_tree_shows_every_node() {
        let tree = JsonTree::new(sample(), usize::MAX);
        // root + studies + 2 study objects + 3 study fields + totalCount
        assert_eq!(tree.len(), 8);
    }

    #[test]
    fn expand_depth_limits_initial_visibility() {
        let tree = JsonTree::new(sample(), 1);
        // root + studies + totalCount; study objects stay folded
        assert_eq!(tree.len(), 3);
        let studies = &tree.rows()[1];
        assert_eq!(studies.label.as_deref(), Some("studies"));
        assert!(studies.has_children);
        assert!(!studies.expanded);
        assert_eq!(studies.preview, "(2 items)");
    }

    #[test]
    fn toggle_collapses_and_restores_descendants() {
        let mut tree = JsonTree::new(sample(), usize::MAX);
        let full = tree.len();

        tree.select_next(); // "studies"
        tree.toggle_selected();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.selected_row().unwrap().pointer, "/studies");

        tree.toggle_selected();
        assert_eq!(tree.len(), full);
    }

    #[test]
    fn collapse_on_leaf_moves_to_parent() {
        let mut tree = JsonTree::new(sample(), usize::MAX);
        tree.select_last(); // "totalCount"
        assert_eq!(tree.selected_row().unwrap().pointer, "/totalCount");

        tree.collapse_selected();
        assert_eq!(tree.selected_row().unwrap().pointer, "");
    }

    #[test]
    fn selected_value_resolves_through_pointer() {
        let mut tree = JsonTree::new(sample(), usize::MAX);
        tree.select_last();
        assert_eq!(tree.selected_value(), Some(&json!(2)));
    }

    #[test]
    fn pointer_tokens_with_slashes_resolve() {
        let doc = json!({"a/b": {"c~d": true}});
        let mut tree = JsonTree::new(doc, usize::MAX);
        assert_eq!(tree.rows()[1].pointer, "/a~1b");
        tree.select_last();
        assert_eq!(tree.selected_row().unwrap().pointer, "/a~1b/c~0d");
        assert_eq!(tree.selected_value(), Some(&json!(true)));
    }

    #[test]
    fn navigation_stays_in_bounds() {
        let mut tree = JsonTree::new(json!({"a": 1}), usize::MAX);
        assert_eq!(tree.len(), 2);

        tree.select_prev();
        assert_eq!(tree.selected(), 0);

        tree.select_page_down(100);
        assert_eq!(tree.selected(), 1);

        tree.select_page_up(100);
        assert_eq!(tree.selected(), 0);
    }

    #[test]
    fn string_previews_are_quoted_and_truncated() {
        let long = "x".repeat(100);
        let tree = JsonTree::new(json!({"s": long}), usize::MAX);
        let preview = &tree.rows()[1].preview;
        assert!(preview.starts_with("\"xxx"));
        assert!(preview.ends_with("...\""));
    }
}
