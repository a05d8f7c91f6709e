//! Right-click menu of a leaf region: split, join and editor switching.

use std::cell::Cell;
use std::rc::Rc;

use canvas_ui_interactive::{ContextMenu, MenuEntry, SplitDirection};

use crate::editor::EditorKind;
use crate::region::RegionId;

/// Layout change picked from a region's context menu
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegionAction {
    Split(SplitDirection),
    /// Collapse the region's parent back into a leaf
    Join,
    SetEditor(EditorKind),
}

impl RegionAction {
    pub fn label(&self) -> &'static str {
        match self {
            RegionAction::Split(SplitDirection::Horizontal) => "Split Horizontal",
            RegionAction::Split(SplitDirection::Vertical) => "Split Vertical",
            RegionAction::Join => "Join Areas",
            RegionAction::SetEditor(kind) => kind.label(),
        }
    }
}

/// Selection written by an open menu and applied by the tree after dispatch
pub(crate) type ActionSlot = Rc<Cell<Option<(RegionId, RegionAction)>>>;

/// What the region under the pointer allows
#[derive(Clone, Copy, Debug)]
pub(crate) struct MenuContext {
    pub split_horizontal: bool,
    pub split_vertical: bool,
    pub join: bool,
    pub current: EditorKind,
}

impl MenuContext {
    fn allows(&self, action: RegionAction) -> bool {
        match action {
            RegionAction::Split(SplitDirection::Horizontal) => self.split_horizontal,
            RegionAction::Split(SplitDirection::Vertical) => self.split_vertical,
            RegionAction::Join => self.join,
            RegionAction::SetEditor(kind) => kind != self.current,
        }
    }
}

/// Layout actions, a separator, then one entry per editor kind
pub fn region_actions() -> Vec<Option<RegionAction>> {
    let mut actions = vec![
        Some(RegionAction::Split(SplitDirection::Horizontal)),
        Some(RegionAction::Split(SplitDirection::Vertical)),
        Some(RegionAction::Join),
        None,
    ];
    actions.extend(EditorKind::ALL.iter().map(|kind| Some(RegionAction::SetEditor(*kind))));
    actions
}

pub(crate) fn region_menu(id: RegionId, context: MenuContext, slot: ActionSlot) -> ContextMenu {
    let actions = region_actions();
    let entries = actions
        .iter()
        .map(|action| match action {
            None => MenuEntry::Separator,
            Some(action) if context.allows(*action) => MenuEntry::item(action.label()),
            Some(action) => MenuEntry::disabled(action.label()),
        })
        .collect();
    ContextMenu::new(entries).on_select(move |index| {
        if let Some(Some(action)) = actions.get(index) {
            slot.set(Some((id, *action)));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn context() -> MenuContext {
        MenuContext {
            split_horizontal: true,
            split_vertical: false,
            join: false,
            current: EditorKind::Outliner,
        }
    }

    #[test]
    fn test_entries_follow_context() {
        let slot: ActionSlot = Rc::new(Cell::new(None));
        let mut ids: SlotMap<RegionId, ()> = SlotMap::with_key();
        let menu = region_menu(ids.insert(()), context(), slot);
        let entries = menu.entries();

        assert_eq!(entries.len(), 4 + EditorKind::ALL.len());
        assert_eq!(entries[0], MenuEntry::item("Split Horizontal"));
        assert_eq!(entries[1], MenuEntry::disabled("Split Vertical"));
        assert_eq!(entries[2], MenuEntry::disabled("Join Areas"));
        assert_eq!(entries[3], MenuEntry::Separator);
        let outliner = 4 + EditorKind::Outliner.index();
        assert_eq!(entries[outliner], MenuEntry::disabled(EditorKind::Outliner.label()));
    }
}
