//! Widget tree
//!
//! The set of buttons currently attached to a grid view. Attaching makes a
//! button visible to the renderer and hit testing; detaching removes it.
//! A detached [`Button`] handle stays usable but is no longer drawn, and its
//! id is never handed out again.

use indexmap::IndexMap;
use slotmap::{new_key_type, SlotMap};
use tally_core::Point;

use crate::button::Button;

new_key_type! {
    /// Identity of one attached widget
    pub struct WidgetId;
}

/// Attached buttons, in attachment order
///
/// Ids come from a slotmap, so a detached id is never handed out again
/// even when its slot is recycled. Drawing order lives in the index map:
/// later attachments sit on top.
#[derive(Default)]
pub struct WidgetTree {
    ids: SlotMap<WidgetId, ()>,
    widgets: IndexMap<WidgetId, Button>,
}

impl WidgetTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a widget with a fresh id and attach it on top
    pub fn attach_with<F>(&mut self, create: F) -> Button
    where
        F: FnOnce(WidgetId) -> Button,
    {
        let id = self.ids.insert(());
        let button = create(id);
        button.set_attached(true);
        self.widgets.insert(id, button.clone());
        button
    }

    /// Remove a widget; returns its handle if it was attached
    pub fn detach(&mut self, id: WidgetId) -> Option<Button> {
        self.ids.remove(id)?;
        let button = self.widgets.shift_remove(&id)?;
        button.set_attached(false);
        Some(button)
    }

    pub fn get(&self, id: WidgetId) -> Option<&Button> {
        self.widgets.get(&id)
    }

    pub fn contains(&self, id: WidgetId) -> bool {
        self.widgets.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.widgets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widgets.is_empty()
    }

    /// Attached buttons, bottom to top
    pub fn iter(&self) -> impl Iterator<Item = &Button> {
        self.widgets.values()
    }

    /// Topmost attached button whose frame contains `point`
    pub fn hit_test(&self, point: Point) -> Option<Button> {
        self.widgets
            .values()
            .rev()
            .find(|b| b.frame().contains(point))
            .cloned()
    }

    /// Detach everything
    pub fn clear(&mut self) -> Vec<Button> {
        self.ids.clear();
        self.widgets
            .drain(..)
            .map(|(_, button)| {
                button.set_attached(false);
                button
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_core::Rect;

    #[test]
    fn test_attach_detach() {
        let mut tree = WidgetTree::new();
        let a = tree.attach_with(Button::new);
        let b = tree.attach_with(Button::new);

        assert!(a.is_attached());
        assert_eq!(tree.len(), 2);
        assert_ne!(a.id(), b.id());

        let detached = tree.detach(a.id()).unwrap();
        assert!(detached.ptr_eq(&a));
        assert!(!a.is_attached());
        assert!(!tree.contains(a.id()));
        assert!(tree.detach(a.id()).is_none());
    }

    #[test]
    fn test_ids_not_reused() {
        let mut tree = WidgetTree::new();
        let a = tree.attach_with(Button::new);
        tree.detach(a.id());
        let b = tree.attach_with(Button::new);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_hit_test() {
        let mut tree = WidgetTree::new();
        let a = tree.attach_with(Button::new);
        a.set_frame(Rect::new(10.0, 20.0, 60.0, 30.0));

        assert!(tree.hit_test(Point::new(15.0, 25.0)).is_some());
        assert!(tree.hit_test(Point::new(200.0, 25.0)).is_none());
    }

    #[test]
    fn test_attachment_order_survives_slot_reuse() {
        let mut tree = WidgetTree::new();
        let a = tree.attach_with(Button::new);
        let b = tree.attach_with(Button::new);
        let c = tree.attach_with(Button::new);
        tree.detach(a.id());
        let d = tree.attach_with(Button::new);

        let order: Vec<WidgetId> = tree.iter().map(Button::id).collect();
        assert_eq!(order, vec![b.id(), c.id(), d.id()]);

        // Overlapping frames: the newest attachment is on top
        for button in [&b, &c, &d] {
            button.set_frame(Rect::new(0.0, 0.0, 50.0, 50.0));
        }
        assert!(tree.hit_test(Point::new(10.0, 10.0)).is_some_and(|hit| hit == d));

        tree.detach(d.id());
        assert!(tree.hit_test(Point::new(10.0, 10.0)).is_some_and(|hit| hit == c));
    }

    #[test]
    fn test_clear_detaches_all() {
        let mut tree = WidgetTree::new();
        let a = tree.attach_with(Button::new);
        let _b = tree.attach_with(Button::new);

        assert_eq!(tree.clear().len(), 2);
        assert!(tree.is_empty());
        assert!(!a.is_attached());
    }
}
