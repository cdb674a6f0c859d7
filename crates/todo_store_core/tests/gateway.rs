use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use todo_store_core::db::migrations::latest_version;
use todo_store_core::db::open_db_in_memory;
use todo_store_core::{
    CrudRepository, PersistenceGateway, StorageError, StoreConfig, Todo, User, UserRepository,
};

#[test]
fn save_todo_without_id_assigns_new_id() {
    let gateway = PersistenceGateway::open_in_memory().unwrap();

    let saved = gateway.todos().save(Todo::new("buy milk")).unwrap();
    assert!(saved.id.unwrap() > 0);
    assert_eq!(gateway.todos().find_by_id(saved.id.unwrap()).unwrap(), Some(saved));
}

#[test]
fn save_user_then_find_by_email() {
    let gateway = PersistenceGateway::open_in_memory().unwrap();
    let users = gateway.users();

    let saved = users.save(User::new("a@x.com", "hash")).unwrap();
    assert_eq!(users.find_by_email("a@x.com").unwrap(), Some(saved));
    assert!(users.exists_by_email("a@x.com").unwrap());
}

#[test]
fn delete_of_never_assigned_id_succeeds() {
    let gateway = PersistenceGateway::open_in_memory().unwrap();

    gateway.todos().delete_by_id(999).unwrap();
    gateway.users().delete_by_id(999).unwrap();
    assert_eq!(gateway.todos().find_by_id(999).unwrap(), None);
}

#[test]
fn delete_then_find_returns_none() {
    let gateway = PersistenceGateway::open_in_memory().unwrap();
    let todos = gateway.todos();
    let saved = todos.save(Todo::new("short lived")).unwrap();
    let id = saved.id.unwrap();

    todos.delete_by_id(id).unwrap();
    assert_eq!(todos.find_by_id(id).unwrap(), None);
    assert!(!todos.exists_by_id(id).unwrap());
}

#[test]
fn todo_and_user_collections_are_independent() {
    let gateway = PersistenceGateway::open_in_memory().unwrap();
    gateway.todos().save(Todo::new("one")).unwrap();
    gateway.todos().save(Todo::new("two")).unwrap();
    gateway.users().save(User::new("a@x.com", "hash")).unwrap();

    assert_eq!(gateway.todos().count().unwrap(), 2);
    assert_eq!(gateway.users().count().unwrap(), 1);

    gateway.todos().delete_all().unwrap();
    assert_eq!(gateway.todos().count().unwrap(), 0);
    assert_eq!(gateway.users().count().unwrap(), 1);
}

#[test]
fn failed_batch_leaves_no_rows() {
    let gateway = PersistenceGateway::open_in_memory().unwrap();

    let err = gateway
        .users()
        .save_all(vec![User::new("a@x.com", "1"), User::new("A@x.com", "2")])
        .unwrap_err();
    assert!(matches!(err, StorageError::Constraint(_)));
    assert_eq!(gateway.users().count().unwrap(), 0);

    let saved = gateway
        .users()
        .save_all(vec![User::new("a@x.com", "1"), User::new("b@x.com", "2")])
        .unwrap();
    assert_eq!(gateway.users().find_all().unwrap(), saved);
}

#[test]
fn failed_write_does_not_poison_later_calls() {
    let gateway = PersistenceGateway::open_in_memory().unwrap();
    let mut ghost = Todo::new("ghost");
    ghost.id = Some(77);

    assert!(matches!(
        gateway.todos().save(ghost).unwrap_err(),
        StorageError::NotFound { id: 77, .. }
    ));
    assert!(gateway.todos().save(Todo::new("after")).is_ok());
}

#[test]
fn concurrent_saves_receive_distinct_ids() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("concurrent.sqlite3"));
    let gateway = Arc::new(PersistenceGateway::open(&config).unwrap());

    let handles: Vec<_> = (0..4)
        .map(|worker| {
            let gateway = Arc::clone(&gateway);
            thread::spawn(move || {
                (0..25)
                    .map(|n| {
                        gateway
                            .todos()
                            .save(Todo::new(format!("worker {worker} item {n}")))
                            .unwrap()
                            .id
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert!(ids.insert(id), "id {id} assigned twice");
        }
    }
    assert_eq!(ids.len(), 100);
    assert_eq!(gateway.todos().count().unwrap(), 100);
}

#[test]
fn file_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig::file(dir.path().join("reopen.sqlite3"));

    let saved = {
        let gateway = PersistenceGateway::open(&config).unwrap();
        gateway.users().save(User::new("keep@x.com", "hash")).unwrap()
    };

    let reopened = PersistenceGateway::open(&config).unwrap();
    assert_eq!(reopened.schema_version().unwrap(), latest_version());
    assert_eq!(reopened.users().find_by_email("keep@x.com").unwrap(), Some(saved));
}

#[test]
fn from_connection_rejects_unmigrated_connection() {
    let conn = rusqlite::Connection::open_in_memory().unwrap();
    let err = PersistenceGateway::from_connection(conn).err().unwrap();
    assert!(matches!(err, StorageError::UninitializedConnection { .. }));

    let migrated = open_db_in_memory().unwrap();
    assert!(PersistenceGateway::from_connection(migrated).is_ok());
}

#[test]
fn interrupt_while_idle_does_not_affect_next_call() {
    let gateway = PersistenceGateway::open_in_memory().unwrap();

    gateway.interrupt();
    let saved = gateway.todos().save(Todo::new("after idle interrupt")).unwrap();
    assert_eq!(gateway.todos().find_by_id(saved.id.unwrap()).unwrap(), Some(saved));
}

#[test]
fn interrupt_aborts_running_read_and_store_stays_usable() {
    const ROWS: usize = 200_000;
    const READS: usize = 20;

    let gateway = Arc::new(PersistenceGateway::open_in_memory().unwrap());
    gateway
        .todos()
        .save_all((0..ROWS).map(|n| Todo::new(format!("item {n}"))).collect())
        .unwrap();

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let gateway = Arc::clone(&gateway);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let outcomes: Vec<_> = (0..READS)
                .map(|_| gateway.todos().find_all().map(|todos| todos.len()))
                .collect();
            done.store(true, Ordering::SeqCst);
            outcomes
        })
    };

    while !done.load(Ordering::SeqCst) {
        gateway.interrupt();
        thread::sleep(Duration::from_micros(200));
    }

    let outcomes = reader.join().unwrap();
    let mut interrupted = 0;
    for outcome in outcomes {
        match outcome {
            Ok(len) => assert_eq!(len, ROWS),
            Err(StorageError::Db(err)) => {
                if err.is_interrupted() {
                    interrupted += 1;
                }
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert!(interrupted > 0, "no read was interrupted");

    assert_eq!(gateway.todos().count().unwrap(), ROWS as u64);
    assert!(gateway.todos().save(Todo::new("after interrupt")).is_ok());
}
