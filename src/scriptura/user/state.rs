//! Mirrored remote data as an explicit `{ data, loading, error }` record.
//!
//! Repositories never mutate their mirror directly: every change goes
//! through [`reduce`], which makes the optimistic/eventual behavior testable
//! without any UI.

/// Items that can be addressed inside a mirrored list.
pub trait Keyed {
    fn key(&self) -> String;
}

/// Payloads a [`Resource`] can hold, together with the edits they accept.
pub trait Reducible: Default {
    type Patch;

    fn patch(&mut self, patch: Self::Patch);
}

#[derive(Debug, Clone, PartialEq)]
pub enum ListPatch<R> {
    /// Drop any item with the same key and insert at the front.
    Prepend(R),
    /// Replace the item with the same key where it stands; unknown keys are ignored.
    Replace(R),
    Remove(String),
}

impl<R: Keyed> Reducible for Vec<R> {
    type Patch = ListPatch<R>;

    fn patch(&mut self, patch: ListPatch<R>) {
        match patch {
            ListPatch::Prepend(item) => {
                let key = item.key();
                self.retain(|existing| existing.key() != key);
                self.insert(0, item);
            }
            ListPatch::Replace(item) => {
                let key = item.key();
                if let Some(slot) = self.iter_mut().find(|existing| existing.key() == key) {
                    *slot = item;
                }
            }
            ListPatch::Remove(key) => self.retain(|existing| existing.key() != key),
        }
    }
}

impl<T> Reducible for Option<T> {
    type Patch = T;

    fn patch(&mut self, value: T) {
        *self = Some(value);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resource<T> {
    pub data: T,
    pub loading: bool,
    pub error: Option<String>,
}

impl<T: Default> Default for Resource<T> {
    fn default() -> Self {
        Self {
            data: T::default(),
            loading: true,
            error: None,
        }
    }
}

pub enum Transition<T: Reducible> {
    Started,
    Loaded(T),
    Failed(String),
    Patched(T::Patch),
    Reset,
}

pub fn reduce<T: Reducible>(state: Resource<T>, transition: Transition<T>) -> Resource<T> {
    match transition {
        Transition::Started => Resource {
            loading: true,
            error: None,
            ..state
        },
        Transition::Loaded(data) => Resource {
            data,
            loading: false,
            error: None,
        },
        Transition::Failed(message) => Resource {
            loading: false,
            error: Some(message),
            ..state
        },
        Transition::Patched(patch) => {
            let mut data = state.data;
            data.patch(patch);
            Resource {
                data,
                loading: false,
                error: None,
            }
        }
        Transition::Reset => Resource {
            data: T::default(),
            loading: false,
            error: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item(&'static str, u32);

    impl Keyed for Item {
        fn key(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn starts_loading_then_loads() {
        let state: Resource<Vec<Item>> = Resource::default();
        assert!(state.loading);
        let state = reduce(state, Transition::Loaded(vec![Item("a", 1)]));
        assert!(!state.loading);
        assert_eq!(state.data.len(), 1);
    }

    #[test]
    fn failure_keeps_last_good_data() {
        let state = reduce(Resource::default(), Transition::Loaded(vec![Item("a", 1)]));
        let state = reduce(state, Transition::Failed("boom".into()));
        assert_eq!(state.error.as_deref(), Some("boom"));
        assert_eq!(state.data, vec![Item("a", 1)]);

        let state = reduce(state, Transition::Started);
        assert!(state.loading);
        assert!(state.error.is_none());
    }

    #[test]
    fn list_patches() {
        let state = reduce(
            Resource::default(),
            Transition::Loaded(vec![Item("a", 1), Item("b", 1)]),
        );
        let state = reduce(state, Transition::Patched(ListPatch::Prepend(Item("b", 2))));
        assert_eq!(state.data, vec![Item("b", 2), Item("a", 1)]);

        let state = reduce(state, Transition::Patched(ListPatch::Replace(Item("a", 3))));
        assert_eq!(state.data, vec![Item("b", 2), Item("a", 3)]);

        let state = reduce(state, Transition::Patched(ListPatch::Replace(Item("z", 9))));
        assert_eq!(state.data.len(), 2);

        let state = reduce(state, Transition::Patched(ListPatch::Remove("b".into())));
        assert_eq!(state.data, vec![Item("a", 3)]);
    }

    #[test]
    fn option_patch_sets_value_and_reset_clears() {
        let state: Resource<Option<u32>> = Resource::default();
        let state = reduce(state, Transition::Patched(7));
        assert_eq!(state.data, Some(7));
        let state = reduce(state, Transition::Reset);
        assert_eq!(state.data, None);
    }
}
