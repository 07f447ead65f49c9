// Task store: the collection, its mutations and write-through persistence

use crate::storage::{self, KeyValueStore, TASKS_KEY};
use crate::task::Task;
use crate::view::{self, DisplayedTask, SortKey, StateFilter};
use eyre::Result;
use tracing::{debug, info, warn};

/// Owns the task collection and the current view selection
///
/// Tasks are addressed by their index in canonical (insertion) order. An
/// index is only meaningful until the next mutation: after a create, edit
/// or delete, re-read indices from [`TaskStore::view`].
pub struct TaskStore<S: KeyValueStore> {
    storage: S,
    tasks: Vec<Task>,
    sort: SortKey,
    filter: StateFilter,
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Open a store over `storage`, loading any saved tasks
    pub fn open(storage: S) -> Self {
        let mut store = Self {
            storage,
            tasks: Vec::new(),
            sort: SortKey::default(),
            filter: StateFilter::default(),
        };
        store.load();
        store
    }

    /// Tasks in canonical order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, index: usize) -> Option<&Task> {
        self.tasks.get(index)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Append a task and persist; returns its index
    pub fn create(&mut self, task: Task) -> Result<usize> {
        self.tasks.push(task);
        let index = self.tasks.len() - 1;
        debug!(index, "Created task");

        self.save()?;
        Ok(index)
    }

    /// Remove the task at `index` and persist
    ///
    /// An out-of-range index is a no-op returning `Ok(None)`.
    pub fn delete(&mut self, index: usize) -> Result<Option<Task>> {
        if index >= self.tasks.len() {
            debug!(index, len = self.tasks.len(), "Delete ignored: index out of range");
            return Ok(None);
        }

        let removed = self.tasks.remove(index);
        debug!(index, "Deleted task");

        self.save()?;
        Ok(Some(removed))
    }

    /// Replace the task at `index` wholesale and persist; returns the old task
    ///
    /// An out-of-range index is a no-op returning `Ok(None)`.
    pub fn edit(&mut self, index: usize, task: Task) -> Result<Option<Task>> {
        let Some(slot) = self.tasks.get_mut(index) else {
            debug!(index, len = self.tasks.len(), "Edit ignored: index out of range");
            return Ok(None);
        };

        let previous = std::mem::replace(slot, task);
        debug!(index, "Edited task");

        self.save()?;
        Ok(Some(previous))
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Reload the collection from storage
    ///
    /// A missing, unreadable or malformed blob leaves the current collection
    /// unchanged.
    pub fn load(&mut self) -> &[Task] {
        let blob = match self.storage.get(TASKS_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!("No stored tasks");
                return &self.tasks;
            }
            Err(e) => {
                warn!(error = ?e, "Failed to read stored tasks, keeping current collection");
                return &self.tasks;
            }
        };

        if let Some(tasks) = storage::decode_tasks(&blob) {
            info!(count = tasks.len(), "Loaded tasks");
            self.tasks = tasks;
        }

        &self.tasks
    }

    /// Overwrite the stored blob with the whole collection
    pub fn save(&mut self) -> Result<()> {
        let blob = storage::encode_tasks(&self.tasks)?;
        self.storage.set(TASKS_KEY, &blob)?;
        debug!(count = self.tasks.len(), "Saved tasks");
        Ok(())
    }

    // ========================================================================
    // View
    // ========================================================================

    /// Sorted and filtered view for an explicit selection
    pub fn displayed_tasks(&self, sort: SortKey, filter: &StateFilter) -> Vec<DisplayedTask<'_>> {
        view::displayed_tasks(&self.tasks, sort, filter)
    }

    /// Sorted and filtered view for the current selection
    pub fn view(&self) -> Vec<DisplayedTask<'_>> {
        self.displayed_tasks(self.sort, &self.filter)
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    pub fn filter(&self) -> &StateFilter {
        &self.filter
    }

    pub fn set_filter(&mut self, filter: StateFilter) {
        self.filter = filter;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FileStorage, MemoryStorage};
    use crate::task::TaskState;
    use eyre::eyre;
    use tempfile::TempDir;

    /// Backend whose writes fail while `failing` is set
    #[derive(Default)]
    struct FlakyStorage {
        inner: MemoryStorage,
        failing: bool,
    }

    impl KeyValueStore for FlakyStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&mut self, key: &str, value: &str) -> Result<()> {
            if self.failing {
                return Err(eyre!("disk full"));
            }
            self.inner.set(key, value)
        }
    }

    fn task(title: &str, state: TaskState, deadline: &str) -> Task {
        Task::new(title, format!("{} summary", title), state, deadline)
    }

    fn store_with_three() -> TaskStore<MemoryStorage> {
        let mut store = TaskStore::open(MemoryStorage::new());
        store.create(task("one", TaskState::Done, "2024-03-01")).unwrap();
        store.create(task("two", TaskState::NotDone, "")).unwrap();
        store.create(task("three", TaskState::DoingRightNow, "2023-01-01")).unwrap();
        store
    }

    fn stored(store: &TaskStore<MemoryStorage>) -> Vec<Task> {
        let blob = store.storage().get(TASKS_KEY).unwrap().unwrap();
        storage::decode_tasks(&blob).unwrap()
    }

    #[test]
    fn test_open_empty_storage() {
        let store = TaskStore::open(MemoryStorage::new());
        assert!(store.is_empty());
        assert!(store.view().is_empty());
    }

    #[test]
    fn test_create_appends_and_persists() {
        let mut store = store_with_three();
        let previous = store.tasks().to_vec();

        let new_task = task("four", TaskState::NotDone, "2025-06-30");
        let index = store.create(new_task.clone()).unwrap();

        assert_eq!(index, 3);
        assert_eq!(store.len(), previous.len() + 1);
        assert_eq!(&store.tasks()[..3], previous.as_slice());
        assert_eq!(store.get(3), Some(&new_task));
        assert_eq!(stored(&store), store.tasks());
    }

    #[test]
    fn test_delete_shifts_later_tasks() {
        let mut store = store_with_three();

        let removed = store.delete(1).unwrap();

        assert_eq!(removed.map(|t| t.title), Some("two".to_string()));
        assert_eq!(store.len(), 2);
        assert_eq!(store.tasks()[0].title, "one");
        assert_eq!(store.tasks()[1].title, "three");
        assert_eq!(stored(&store), store.tasks());
    }

    #[test]
    fn test_delete_out_of_range_is_noop() {
        let mut store = store_with_three();
        let before = store.tasks().to_vec();

        assert!(store.delete(999).unwrap().is_none());
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn test_edit_replaces_only_target() {
        let mut store = store_with_three();
        let before = store.tasks().to_vec();

        let replacement = Task::new("two, edited", "", TaskState::Done, "2024-12-24");
        let previous = store.edit(1, replacement.clone()).unwrap();

        assert_eq!(previous.as_ref(), Some(&before[1]));
        assert_eq!(store.tasks()[1], replacement);
        assert_eq!(store.tasks()[0], before[0]);
        assert_eq!(store.tasks()[2], before[2]);
        assert_eq!(stored(&store), store.tasks());
    }

    #[test]
    fn test_edit_out_of_range_is_noop() {
        let mut store = store_with_three();
        let before = store.tasks().to_vec();

        assert!(store.edit(3, task("x", TaskState::Done, "")).unwrap().is_none());
        assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn test_round_trip_through_storage() {
        let store = store_with_three();
        let expected = store.tasks().to_vec();
        let storage = store.storage().clone();

        let reopened = TaskStore::open(storage);
        assert_eq!(reopened.tasks(), expected.as_slice());
    }

    #[test]
    fn test_load_corrupt_blob_keeps_collection() {
        let mut store = store_with_three();
        let before = store.tasks().to_vec();

        store.storage.set(TASKS_KEY, "{\"not\": \"an array\"}").unwrap();
        assert_eq!(store.load(), before.as_slice());

        store.storage.set(TASKS_KEY, "definitely not json").unwrap();
        assert_eq!(store.load(), before.as_slice());
    }

    #[test]
    fn test_open_corrupt_blob_starts_empty() {
        let store = TaskStore::open(MemoryStorage::with_blob(TASKS_KEY, "[1, 2"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_tolerates_unknown_and_missing_fields() {
        let blob = r#"[{"title":"legacy"},{"title":"odd","state":"Blocked"}]"#;
        let mut store = TaskStore::open(MemoryStorage::with_blob(TASKS_KEY, blob));

        assert_eq!(store.len(), 2);
        assert_eq!(store.tasks()[0].state.to_string(), "Not set");
        assert_eq!(store.tasks()[1].state.as_str(), "Blocked");

        // Saving keeps the foreign state verbatim
        store.save().unwrap();
        let saved = store.storage().get(TASKS_KEY).unwrap().unwrap();
        assert!(saved.contains("\"state\":\"Blocked\""));
    }

    #[test]
    fn test_load_keeps_tasks_with_null_fields() {
        let blob = r#"[{"title":"keep me","summary":null,"state":"Done","deadline":null},{"title":"other"}]"#;
        let mut store = TaskStore::open(MemoryStorage::with_blob(TASKS_KEY, blob));

        assert_eq!(store.len(), 2);
        assert_eq!(store.tasks()[0].title, "keep me");
        assert_eq!(store.tasks()[0].summary, "");
        assert_eq!(store.tasks()[0].deadline, "");
        assert_eq!(store.tasks()[0].state, TaskState::Done);

        store.create(task("new", TaskState::NotDone, "")).unwrap();

        let saved = stored(&store);
        let titles: Vec<&str> = saved.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["keep me", "other", "new"]);
    }

    #[test]
    fn test_failed_save_keeps_in_memory_mutation() {
        let mut store = TaskStore::open(FlakyStorage::default());
        store.create(task("one", TaskState::NotDone, "")).unwrap();
        store.create(task("two", TaskState::Done, "")).unwrap();

        store.storage.failing = true;

        assert!(store.create(task("three", TaskState::DoingRightNow, "")).is_err());
        assert_eq!(store.len(), 3);

        assert!(store.edit(0, task("one, edited", TaskState::Done, "")).is_err());
        assert_eq!(store.tasks()[0].title, "one, edited");

        assert!(store.delete(1).is_err());
        let titles: Vec<&str> = store.tasks().iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["one, edited", "three"]);

        // Storage still holds the last successful write
        let blob = store.storage().inner.get(TASKS_KEY).unwrap().unwrap();
        let persisted = storage::decode_tasks(&blob).unwrap();
        assert_eq!(persisted.len(), 2);
        assert_eq!(persisted[1].title, "two");

        // Out-of-range no-ops never touch the backend
        assert!(store.delete(99).unwrap().is_none());

        store.storage.failing = false;
        store.save().unwrap();

        let blob = store.storage().inner.get(TASKS_KEY).unwrap().unwrap();
        assert_eq!(storage::decode_tasks(&blob).unwrap(), store.tasks());
    }

    #[test]
    fn test_view_uses_current_selection() {
        let mut store = store_with_three();
        store.create(task("four", TaskState::Done, "")).unwrap();

        store.set_sort(SortKey::Done);
        let titles: Vec<&str> = store.view().iter().map(|d| d.task.title.as_str()).collect();
        assert_eq!(titles, vec!["one", "four", "two", "three"]);

        store.set_filter(StateFilter::State(TaskState::Done));
        let indices: Vec<usize> = store.view().iter().map(|d| d.original_index).collect();
        assert_eq!(indices, vec![0, 3]);

        store.set_sort(SortKey::Deadline);
        store.set_filter(StateFilter::All);
        let deadlines: Vec<&str> = store.view().iter().map(|d| d.task.deadline.as_str()).collect();
        assert_eq!(deadlines, vec!["2023-01-01", "2024-03-01", "", ""]);
    }

    #[test]
    fn test_view_index_addresses_canonical_task() {
        let mut store = store_with_three();
        let target = store
            .displayed_tasks(SortKey::Deadline, &StateFilter::All)
            .first()
            .map(|d| d.original_index)
            .unwrap();

        let removed = store.delete(target).unwrap().unwrap();
        assert_eq!(removed.title, "three");
    }

    #[test]
    fn test_file_backed_store_persists_across_opens() {
        let temp = TempDir::new().unwrap();

        {
            let mut store = TaskStore::open(FileStorage::open(temp.path()).unwrap());
            store.create(task("persisted", TaskState::NotDone, "2024-05-05")).unwrap();
            store.create(task("removed", TaskState::Done, "")).unwrap();
            store.delete(1).unwrap();
        }

        let store = TaskStore::open(FileStorage::open(temp.path()).unwrap());
        assert_eq!(store.len(), 1);
        assert_eq!(store.tasks()[0].title, "persisted");
        assert_eq!(store.tasks()[0].deadline, "2024-05-05");
    }
}
