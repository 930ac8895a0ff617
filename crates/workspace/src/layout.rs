use serde::{Deserialize, Serialize};

use crate::leaf::MountPoint;
use crate::view::ViewState;

/// Current layout format version.
pub const LAYOUT_FORMAT_VERSION: u32 = 1;

/// 工作區版面快照，可序列化以便還原。 / Serializable snapshot of every leaf and the active one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutSnapshot {
    pub format_version: u32,
    #[serde(default)]
    pub leaves: Vec<LayoutLeaf>,
    /// Index into `leaves`.
    #[serde(default)]
    pub active: Option<usize>,
}

impl LayoutSnapshot {
    pub fn new(leaves: Vec<LayoutLeaf>, active: Option<usize>) -> Self {
        Self {
            format_version: LAYOUT_FORMAT_VERSION,
            leaves,
            active,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

/// 單一分頁的快照。 / One leaf: its mount point and, when it hosts a view, the view state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutLeaf {
    pub mount: MountPoint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<ViewState>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn snapshot_json_uses_host_field_names() {
        let snapshot = LayoutSnapshot::new(
            vec![
                LayoutLeaf {
                    mount: MountPoint::RightSidebar,
                    view: Some(ViewState::new("chat").with_state(json!({}))),
                },
                LayoutLeaf {
                    mount: MountPoint::Editor,
                    view: None,
                },
            ],
            Some(0),
        );
        let value: serde_json::Value = serde_json::from_str(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(value["leaves"][0]["mount"], "right-sidebar");
        assert_eq!(value["leaves"][0]["view"]["type"], "chat");
        assert!(value["leaves"][1].get("view").is_none());

        let restored = LayoutSnapshot::from_json(&snapshot.to_json().unwrap()).unwrap();
        assert_eq!(restored, snapshot);
    }

    #[test]
    fn missing_fields_default() {
        let snapshot = LayoutSnapshot::from_json(r#"{"format_version":1}"#).unwrap();
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.active, None);
    }
}
