//! Generational slot map with stable keys.

/// Stable handle into an [`Arena`].
///
/// Removing a value bumps its slot's generation, so keys taken before the
/// removal stop resolving instead of aliasing a later occupant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArenaKey {
    index: u32,
    generation: u32,
}

impl ArenaKey {
    /// Slot index the key refers to.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation the slot held when the key was issued.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Clone, Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot map that hands out [`ArenaKey`] handles.
///
/// Freed slots are reused in last-freed-first order, which keeps key
/// assignment deterministic for a given sequence of operations.
#[derive(Clone, Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }
}

impl<T> Arena<T> {
    /// Creates an empty arena.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` and returns its key.
    pub fn insert(&mut self, value: T) -> ArenaKey {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return ArenaKey {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        ArenaKey {
            index,
            generation: 0,
        }
    }

    /// Removes the value behind `key`, invalidating every copy of the key.
    pub fn remove(&mut self, key: ArenaKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(key.index);
        self.len -= 1;
        Some(value)
    }

    /// Shared access to the value behind `key`.
    #[must_use]
    pub fn get(&self, key: ArenaKey) -> Option<&T> {
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Mutable access to the value behind `key`.
    pub fn get_mut(&mut self, key: ArenaKey) -> Option<&mut T> {
        self.slots
            .get_mut(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_mut())
    }

    /// Reports whether `key` still resolves.
    #[must_use]
    pub fn contains(&self, key: ArenaKey) -> bool {
        self.get(key).is_some()
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Reports whether the arena holds no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live entries in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ArenaKey, &T)> + '_ {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    ArenaKey {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }

    /// Live entries in slot order, with mutable values.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (ArenaKey, &mut T)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| {
                let generation = slot.generation;
                slot.value.as_mut().map(|value| {
                    (
                        ArenaKey {
                            index: index as u32,
                            generation,
                        },
                        value,
                    )
                })
            })
    }
}
