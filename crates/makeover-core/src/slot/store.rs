use super::{ELEMENT_SLOTS, GenerationInputs, PORTRAIT_SLOT, SLOT_COUNT, VIBE_SLOT};
use crate::error::{MakeoverError, Result};
use crate::image::ImageRef;

/// Fixed-size container of the seven optional input images.
///
/// Exactly [`SLOT_COUNT`] positions always exist; each holds at most one
/// image. The store itself knows nothing about dirty state or history; the
/// controller layers those side effects on top.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotStore {
    slots: [Option<ImageRef>; SLOT_COUNT],
}

impl SlotStore {
    /// Creates an all-empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces every slot from `images`, in order.
    ///
    /// Images beyond the last slot are discarded; missing ones leave the
    /// remaining slots empty. Returns the number of images placed.
    pub fn set_all<I>(&mut self, images: I) -> usize
    where
        I: IntoIterator<Item = ImageRef>,
    {
        self.slots = Default::default();
        let mut placed = 0;
        for (slot, image) in self.slots.iter_mut().zip(images) {
            *slot = Some(image);
            placed += 1;
        }
        placed
    }

    /// Replaces the content of one slot, preserving all others.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index` is not a slot position.
    pub fn set(&mut self, index: usize, image: ImageRef) -> Result<()> {
        let slot = self.slot_mut(index)?;
        *slot = Some(image);
        Ok(())
    }

    /// Empties one slot, preserving all others.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index` is not a slot position.
    pub fn clear(&mut self, index: usize) -> Result<()> {
        let slot = self.slot_mut(index)?;
        *slot = None;
        Ok(())
    }

    /// Empties every slot.
    pub fn clear_all(&mut self) {
        self.slots = Default::default();
    }

    /// Empties the style element slots (1..=5).
    pub fn clear_elements(&mut self) {
        for index in ELEMENT_SLOTS {
            self.slots[index] = None;
        }
    }

    /// Returns the image at `index`, or `None` if the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns `IndexOutOfRange` if `index` is not a slot position.
    pub fn get(&self, index: usize) -> Result<Option<&ImageRef>> {
        self.slots
            .get(index)
            .map(Option::as_ref)
            .ok_or(MakeoverError::IndexOutOfRange {
                index,
                max: SLOT_COUNT - 1,
            })
    }

    pub fn portrait(&self) -> Option<&ImageRef> {
        self.slots[PORTRAIT_SLOT].as_ref()
    }

    /// Style elements present in slots 1..=5, skipping empties, in slot order.
    pub fn elements(&self) -> Vec<&ImageRef> {
        self.slots[ELEMENT_SLOTS].iter().flatten().collect()
    }

    pub fn vibe(&self) -> Option<&ImageRef> {
        self.slots[VIBE_SLOT].as_ref()
    }

    /// True if any of the seven slots holds an image.
    pub fn has_any(&self) -> bool {
        self.slots.iter().any(Option::is_some)
    }

    /// Iterates over all positions in order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&ImageRef>> {
        self.slots.iter().map(Option::as_ref)
    }

    /// Captures the current contents for a full generation.
    ///
    /// Returns `None` when no portrait is present.
    pub fn generation_inputs(&self) -> Option<GenerationInputs> {
        let portrait = self.portrait()?.clone();
        Some(GenerationInputs {
            portrait,
            elements: self.elements().into_iter().cloned().collect(),
            vibe: self.vibe().cloned(),
        })
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut Option<ImageRef>> {
        self.slots.get_mut(index).ok_or(MakeoverError::IndexOutOfRange {
            index,
            max: SLOT_COUNT - 1,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(name: &str) -> ImageRef {
        ImageRef::new(name, "image/png", name.as_bytes().to_vec())
    }

    fn names(store: &SlotStore) -> Vec<Option<String>> {
        store
            .iter()
            .map(|slot| slot.map(|image| image.name().to_string()))
            .collect()
    }

    #[test]
    fn test_new_store_is_empty() {
        let store = SlotStore::new();
        assert!(!store.has_any());
        assert_eq!(store.iter().count(), SLOT_COUNT);
        assert!(store.portrait().is_none());
        assert!(store.elements().is_empty());
        assert!(store.vibe().is_none());
    }

    #[test]
    fn test_set_all_discards_excess() {
        let mut store = SlotStore::new();
        let files: Vec<ImageRef> = (0..9).map(|i| image(&format!("f{i}"))).collect();

        let placed = store.set_all(files);

        assert_eq!(placed, 7);
        let expected: Vec<Option<String>> = (0..7).map(|i| Some(format!("f{i}"))).collect();
        assert_eq!(names(&store), expected);
    }

    #[test]
    fn test_set_all_with_fewer_images_leaves_rest_empty() {
        let mut store = SlotStore::new();
        store.set_all((0..7).map(|i| image(&format!("old{i}"))));

        store.set_all(vec![image("a"), image("b")]);

        assert_eq!(store.portrait().map(ImageRef::name), Some("a"));
        assert_eq!(store.elements().len(), 1);
        assert!(store.vibe().is_none());
    }

    #[test]
    fn test_out_of_range_index_is_rejected() {
        let mut store = SlotStore::new();
        store.set(0, image("portrait")).unwrap();
        let before = store.clone();

        let err = store.set(7, image("x")).unwrap_err();
        assert_eq!(err, MakeoverError::IndexOutOfRange { index: 7, max: 6 });
        assert!(store.clear(42).unwrap_err().is_index_out_of_range());
        assert!(store.get(7).is_err());
        assert_eq!(store, before);
    }

    #[test]
    fn test_set_and_clear_touch_only_one_slot() {
        let mut store = SlotStore::new();
        store.set_all((0..7).map(|i| image(&format!("f{i}"))));

        store.set(3, image("replaced")).unwrap();
        store.clear(5).unwrap();

        assert_eq!(
            names(&store),
            vec![
                Some("f0".to_string()),
                Some("f1".to_string()),
                Some("f2".to_string()),
                Some("replaced".to_string()),
                Some("f4".to_string()),
                None,
                Some("f6".to_string()),
            ]
        );
    }

    #[test]
    fn test_elements_skip_empties_in_order() {
        let mut store = SlotStore::new();
        store.set(4, image("e4")).unwrap();
        store.set(2, image("e2")).unwrap();
        store.set(6, image("vibe")).unwrap();

        let elements: Vec<&str> = store.elements().into_iter().map(ImageRef::name).collect();
        assert_eq!(elements, vec!["e2", "e4"]);
        assert!(store.has_any());
    }

    #[test]
    fn test_generation_inputs_require_portrait() {
        let mut store = SlotStore::new();
        store.set(1, image("e1")).unwrap();
        assert!(store.generation_inputs().is_none());

        store.set(0, image("p")).unwrap();
        store.set(6, image("v")).unwrap();
        let inputs = store.generation_inputs().unwrap();
        assert_eq!(inputs.portrait.name(), "p");
        assert_eq!(inputs.elements.len(), 1);
        assert_eq!(inputs.vibe.as_ref().map(ImageRef::name), Some("v"));
        assert_eq!(inputs.image_count(), 3);
    }

    #[test]
    fn test_clear_elements_keeps_portrait_and_vibe() {
        let mut store = SlotStore::new();
        store.set_all((0..7).map(|i| image(&format!("f{i}"))));

        store.clear_elements();

        assert_eq!(store.portrait().map(ImageRef::name), Some("f0"));
        assert!(store.elements().is_empty());
        assert_eq!(store.vibe().map(ImageRef::name), Some("f6"));
    }
}
