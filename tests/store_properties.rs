use neotasks::{project, FilterMode, MemoryStore, NewTask, Priority, Task, TaskId, TaskStore};
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone)]
struct Spec {
    text: String,
    priority: Priority,
    tag: String,
    completed: bool,
}

fn spec_strategy() -> impl Strategy<Value = Spec> {
    (
        "[a-z]{1,8}( [a-z]{1,8})?",
        prop::sample::select(Priority::ALL.to_vec()),
        "[a-z]{0,5}",
        any::<bool>(),
    )
        .prop_map(|(text, priority, tag, completed)| Spec {
            text,
            priority,
            tag,
            completed,
        })
}

fn build(specs: &[Spec]) -> TaskStore {
    let mut store = TaskStore::open(Box::new(MemoryStore::new()));
    for spec in specs {
        let id = store
            .add(
                NewTask::new(spec.text.clone())
                    .priority(spec.priority)
                    .tag(spec.tag.clone()),
            )
            .unwrap()
            .unwrap();
        if spec.completed {
            store.toggle(id).unwrap();
        }
    }
    store
}

fn ids(view: &[&Task]) -> Vec<TaskId> {
    view.iter().map(|t| t.id).collect()
}

fn position(tasks: &[Task], id: TaskId) -> usize {
    tasks.iter().position(|t| t.id == id).unwrap()
}

proptest! {
    #[test]
    fn blank_text_never_adds(specs in prop::collection::vec(spec_strategy(), 0..8), blank in "[ \t]{0,6}") {
        let mut store = build(&specs);
        let before = store.tasks().to_vec();
        prop_assert_eq!(store.add(NewTask::new(blank)).unwrap(), None);
        prop_assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn toggle_is_an_involution(specs in prop::collection::vec(spec_strategy(), 1..10), pick in any::<prop::sample::Index>()) {
        let mut store = build(&specs);
        let before = store.tasks().to_vec();
        let id = before[pick.index(before.len())].id;
        store.toggle(id).unwrap();
        store.toggle(id).unwrap();
        prop_assert_eq!(store.tasks(), before.as_slice());

        let missing = before.iter().map(|t| t.id).max().unwrap() + 1;
        prop_assert!(!store.toggle(missing).unwrap());
        prop_assert_eq!(store.tasks(), before.as_slice());
    }

    #[test]
    fn view_is_sorted_and_stable(specs in prop::collection::vec(spec_strategy(), 0..20), query in "[a-z]{0,2}") {
        let store = build(&specs);
        let tasks = store.tasks();
        for mode in FilterMode::ALL {
            let view = project(tasks, mode, &query);
            prop_assert_eq!(ids(&view), ids(&project(tasks, mode, &query)));
            for pair in view.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                prop_assert!(a.priority.rank() >= b.priority.rank());
                if a.priority == b.priority {
                    prop_assert!(position(tasks, a.id) < position(tasks, b.id));
                }
            }
            for task in &view {
                prop_assert!(mode.admits(task));
                prop_assert!(task.text.contains(&query) || task.tag.to_lowercase().contains(&query));
            }
        }
    }

    #[test]
    fn active_and_completed_partition_all(specs in prop::collection::vec(spec_strategy(), 0..20), query in "[a-z]{0,1}") {
        let store = build(&specs);
        let tasks = store.tasks();
        let all: HashSet<TaskId> = ids(&project(tasks, FilterMode::All, &query)).into_iter().collect();
        let active: HashSet<TaskId> = ids(&project(tasks, FilterMode::Active, &query)).into_iter().collect();
        let completed: HashSet<TaskId> = ids(&project(tasks, FilterMode::Completed, &query)).into_iter().collect();
        prop_assert!(active.is_disjoint(&completed));
        prop_assert_eq!(&active | &completed, all);
    }

    #[test]
    fn export_import_round_trips(specs in prop::collection::vec(spec_strategy(), 0..12)) {
        let store = build(&specs);
        let exported = store.export().unwrap();
        let mut other = TaskStore::open(Box::new(MemoryStore::new()));
        other.add(NewTask::new("replaced")).unwrap();
        prop_assert_eq!(other.import(exported.as_bytes()).unwrap(), specs.len());
        prop_assert_eq!(other.tasks(), store.tasks());
    }

    #[test]
    fn stats_add_up(specs in prop::collection::vec(spec_strategy(), 0..20)) {
        let stats = build(&specs).stats();
        prop_assert_eq!(stats.total, specs.len());
        prop_assert_eq!(stats.active + stats.completed, stats.total);
        prop_assert_eq!(stats.completed, specs.iter().filter(|s| s.completed).count());
        prop_assert!((0.0..=1.0).contains(&stats.ratio()));
    }
}

#[test]
fn add_toggle_clear_scenario() {
    let mut store = TaskStore::open(Box::new(MemoryStore::new()));
    let id = store
        .add(NewTask::new("Buy milk").priority(Priority::High))
        .unwrap()
        .unwrap();
    let task = store.get(id).unwrap();
    assert_eq!(store.len(), 1);
    assert!(!task.completed);
    assert_eq!(task.tag, neotasks::task::DEFAULT_TAG);
    assert_eq!(task.priority, Priority::High);

    store.toggle(id).unwrap();
    assert!(store.get(id).unwrap().completed);
    assert_eq!(store.stats().progress_label(), "1/1 items");

    assert!(store.clear_all(&mut |_: &str| true).unwrap());
    let stats = store.stats();
    assert!(store.is_empty());
    assert_eq!(stats.progress_label(), "0/0 items");
    assert_eq!(stats.percent(), 0);
    assert_eq!(
        stats.ring_offset(neotasks::stats::RING_CIRCUMFERENCE),
        neotasks::stats::RING_CIRCUMFERENCE
    );
}

#[test]
fn low_then_high_shows_high_first() {
    let mut store = TaskStore::open(Box::new(MemoryStore::new()));
    let low = store
        .add(NewTask::new("low").priority(Priority::Low))
        .unwrap()
        .unwrap();
    let high = store
        .add(NewTask::new("high").priority(Priority::High))
        .unwrap()
        .unwrap();
    assert_eq!(ids(&project(store.tasks(), FilterMode::All, "")), vec![high, low]);
    assert_eq!(store.tasks()[0].id, low);
}

#[test]
fn file_backed_store_survives_reopen() {
    let dir = tempfile::TempDir::new().unwrap();
    let id = {
        let mut store = TaskStore::open(Box::new(neotasks::FileStore::new(dir.path())));
        store.add(NewTask::new("persist me").tag("disk")).unwrap().unwrap()
    };
    let store = TaskStore::open(Box::new(neotasks::FileStore::new(dir.path())));
    assert_eq!(store.get(id).map(|t| t.text.as_str()), Some("persist me"));
}
