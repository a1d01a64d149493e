//! Board reconciliation against a service.
//!
//! Tests run on a current-thread runtime: requests spawned by `dispatch`
//! only run once the test awaits `settle`, so the model can be checked in
//! the window between the local change and the server's answer.

use std::sync::atomic::Ordering;

use taskdeck::api::TaskPatch;
use taskdeck::core::{Board, Column, DropTarget, FolderId, Scope, TaskId};
use taskdeck::tea::Message;
use taskdeck::Error;

use crate::fixtures::{column_ids, driver_for, task, InMemoryTaskService};

fn seeded() -> std::sync::Arc<InMemoryTaskService> {
    InMemoryTaskService::new(vec![
        task(1, "Write report", "TO DO", 5),
        task(2, "Call plumber", "TO DO", 1),
        task(3, "Fix bike", "ONGOING", 3),
        task(4, "Taxes", "DONE", 2),
    ])
}

#[tokio::test]
async fn test_initial_load_builds_columns_and_profile() {
    let service = InMemoryTaskService::new(vec![
        task(1, "Low", "TO DO", 1),
        task(2, "High", "TO DO", 4),
        task(3, "Archived", "ARCHIVED", 4),
        task(4, "Working", "ONGOING", 2),
    ]);
    let mut driver = driver_for(&service, Scope::Inbox);

    driver.dispatch(Message::Init);
    assert!(driver.model().loading);
    driver.settle().await;

    let model = driver.model();
    assert!(!model.loading);
    assert_eq!(column_ids(&driver, Column::Todo), vec![2, 1]);
    assert_eq!(column_ids(&driver, Column::Ongoing), vec![4]);
    assert!(column_ids(&driver, Column::Done).is_empty());
    assert_eq!(model.board.len(), 3, "unknown status is not shown");
    assert_eq!(
        model.user.as_ref().and_then(|u| u.username.as_deref()),
        Some("ada")
    );
}

#[tokio::test]
async fn test_move_is_applied_before_the_server_answers() {
    let service = seeded();
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;
    service.clear_calls();

    driver.dispatch(Message::Drop {
        active: TaskId(2),
        over: DropTarget::Column(Column::Ongoing),
    });

    // Local board already moved; the service has not been asked yet.
    assert_eq!(column_ids(&driver, Column::Ongoing), vec![3, 2]);
    assert!(service.calls().is_empty());
    assert_eq!(service.get(2).unwrap().status, "TO DO");

    driver.settle().await;
    assert_eq!(service.calls(), vec!["PUT /notes/2/status ONGOING"]);
    assert_eq!(service.get(2).unwrap().status, "ONGOING");
    assert_eq!(column_ids(&driver, Column::Ongoing), vec![3, 2]);
    assert!(driver.take_failures().is_empty());
}

#[tokio::test]
async fn test_drop_on_task_moves_into_its_column() {
    let service = seeded();
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;

    driver.dispatch(Message::Drop {
        active: TaskId(1),
        over: DropTarget::Task(TaskId(4)),
    });
    driver.settle().await;

    assert_eq!(column_ids(&driver, Column::Done), vec![1, 4]);
    assert_eq!(service.get(1).unwrap().status, "DONE");
}

#[tokio::test]
async fn test_failed_move_reconciles_with_server() {
    let service = seeded();
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;
    service.fail_status.store(true, Ordering::SeqCst);
    service.clear_calls();

    driver.dispatch(Message::Drop {
        active: TaskId(2),
        over: DropTarget::Column(Column::Done),
    });
    assert_eq!(column_ids(&driver, Column::Done), vec![4, 2]);

    driver.settle().await;

    assert_eq!(
        service.calls(),
        vec!["PUT /notes/2/status DONE", "GET /notes/"],
        "a failed move triggers a refetch"
    );
    assert_eq!(driver.model().board, Board::from_tasks(service.snapshot()));
    assert_eq!(column_ids(&driver, Column::Todo), vec![1, 2]);

    let failures = driver.take_failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].starts_with("Moving task #2 to 'DONE' failed"));
}

#[tokio::test]
async fn test_no_op_move_sends_nothing() {
    let service = seeded();
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;
    service.clear_calls();

    driver.dispatch(Message::Drop {
        active: TaskId(1),
        over: DropTarget::Task(TaskId(2)),
    });
    driver.dispatch(Message::Drop {
        active: TaskId(3),
        over: DropTarget::Unknown("somewhere".to_string()),
    });

    assert_eq!(driver.in_flight(), 0);
    driver.settle().await;
    assert!(service.calls().is_empty());
    assert_eq!(column_ids(&driver, Column::Todo), vec![1, 2]);
}

#[tokio::test]
async fn test_create_inserts_by_priority_after_server_assigns_id() {
    let service = seeded();
    service.set_next_id(42);
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;

    driver.dispatch(Message::CreateTask {
        title: "Buy milk".to_string(),
    });
    // Nothing is shown until the server answers.
    assert_eq!(column_ids(&driver, Column::Todo), vec![1, 2]);

    driver.settle().await;

    // Newest first among equal priorities.
    assert_eq!(column_ids(&driver, Column::Todo), vec![1, 42, 2]);
    let created = driver.model().board.task(TaskId(42)).unwrap();
    assert_eq!(created.title, "Buy milk");
    assert_eq!(created.priority, 1);
    assert_eq!(created.category.as_deref(), Some("Miscellaneous"));
}

#[tokio::test]
async fn test_blank_create_never_reaches_service() {
    let service = seeded();
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;
    service.clear_calls();

    driver.dispatch(Message::CreateTask {
        title: "   ".to_string(),
    });
    driver.settle().await;

    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn test_create_failure_is_only_logged() {
    let service = seeded();
    service.fail_create.store(true, Ordering::SeqCst);
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;
    let before = driver.model().board.clone();

    driver.dispatch(Message::CreateTask {
        title: "Buy milk".to_string(),
    });
    driver.settle().await;

    assert_eq!(driver.model().board, before);
    assert!(driver.model().notification.is_none());
    assert_eq!(driver.take_failures().len(), 1);
}

#[tokio::test]
async fn test_delete_is_optimistic_and_not_restored_on_failure() {
    let service = seeded();
    service.fail_delete.store(true, Ordering::SeqCst);
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;

    driver.dispatch(Message::DeleteTask { id: TaskId(3) });
    assert!(driver.model().board.task(TaskId(3)).is_none());

    driver.settle().await;

    assert!(driver.model().board.task(TaskId(3)).is_none());
    assert!(service.get(3).is_some(), "server still has the task");
    let failures = driver.take_failures();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].starts_with("Deleting task #3 failed"));

    // The next refetch brings it back.
    driver.dispatch(Message::Refresh);
    driver.settle().await;
    assert_eq!(column_ids(&driver, Column::Ongoing), vec![3]);
}

#[tokio::test]
async fn test_delete_removes_on_server() {
    let service = seeded();
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;

    driver.dispatch(Message::DeleteTask { id: TaskId(4) });
    driver.settle().await;

    assert!(service.get(4).is_none());
    assert!(column_ids(&driver, Column::Done).is_empty());
}

#[tokio::test]
async fn test_edit_saves_then_refetches() {
    let service = seeded();
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;
    service.clear_calls();

    driver.dispatch(Message::SaveEdit {
        id: TaskId(2),
        patch: TaskPatch {
            title: Some("Call the plumber".to_string()),
            priority: Some(4),
            ..Default::default()
        },
    });
    // The board is not touched until the refetch.
    assert_eq!(
        driver.model().board.task(TaskId(2)).unwrap().title,
        "Call plumber"
    );

    driver.settle().await;

    assert_eq!(service.calls(), vec!["PUT /notes/2", "GET /notes/"]);
    let edited = driver.model().board.task(TaskId(2)).unwrap();
    assert_eq!(edited.title, "Call the plumber");
    assert_eq!(column_ids(&driver, Column::Todo), vec![1, 2]);
    assert_eq!(edited.priority, 4);
}

#[tokio::test]
async fn test_invalid_edit_is_rejected_locally() {
    let service = seeded();
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;
    service.clear_calls();

    driver.dispatch(Message::SaveEdit {
        id: TaskId(2),
        patch: TaskPatch {
            priority: Some(9),
            ..Default::default()
        },
    });
    driver.settle().await;

    assert!(service.calls().is_empty());
    assert!(driver.model().notification.is_some());
}

#[tokio::test]
async fn test_failed_edit_keeps_board() {
    let service = seeded();
    service.fail_update.store(true, Ordering::SeqCst);
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;
    service.clear_calls();

    driver.dispatch(Message::SaveEdit {
        id: TaskId(1),
        patch: TaskPatch {
            title: Some("Renamed".to_string()),
            ..Default::default()
        },
    });
    driver.settle().await;

    assert_eq!(service.calls(), vec!["PUT /notes/1"]);
    assert_eq!(
        driver.model().board.task(TaskId(1)).unwrap().title,
        "Write report"
    );
    assert!(driver.model().notification.is_some());
}

#[tokio::test]
async fn test_later_move_wins() {
    let service = seeded();
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;

    driver.dispatch(Message::Drop {
        active: TaskId(1),
        over: DropTarget::Column(Column::Ongoing),
    });
    driver.dispatch(Message::Drop {
        active: TaskId(1),
        over: DropTarget::Column(Column::Done),
    });
    assert_eq!(driver.in_flight(), 2);

    driver.settle().await;

    assert_eq!(driver.model().board.column_of(TaskId(1)), Some(Column::Done));
    assert_eq!(service.get(1).unwrap().status, "DONE");
}

#[tokio::test]
async fn test_folder_scope_loads_and_creates_in_folder() {
    let service = seeded();
    service.add_folder(
        7,
        "Garden",
        vec![
            task(20, "Water plants", "TO DO", 2),
            task(21, "Mow lawn", "DONE", 1),
        ],
    );
    service.set_next_id(50);
    let mut driver = driver_for(&service, Scope::Folder(FolderId(7)));
    driver.dispatch(Message::Init);
    driver.settle().await;

    assert_eq!(driver.model().board.len(), 2);
    assert_eq!(column_ids(&driver, Column::Todo), vec![20]);
    assert!(service.calls().contains(&"GET /notebooks/7/".to_string()));

    driver.dispatch(Message::CreateTask {
        title: "Plant tulips".to_string(),
    });
    driver.settle().await;

    assert_eq!(service.folder_of(50), Some(FolderId(7)));
    assert_eq!(column_ids(&driver, Column::Todo), vec![20, 50]);
}

#[tokio::test]
async fn test_stale_listing_is_discarded_after_scope_switch() {
    let service = seeded();
    service.add_folder(7, "Garden", vec![task(20, "Water plants", "TO DO", 2)]);
    let mut driver = driver_for(&service, Scope::Inbox);

    // The inbox listing is requested, then the user opens a folder before
    // it arrives.
    driver.dispatch(Message::Init);
    driver.dispatch(Message::OpenScope {
        scope: Scope::Folder(FolderId(7)),
        title: "Garden".to_string(),
    });
    driver.settle().await;

    assert!(service.calls().contains(&"GET /notes/".to_string()));
    assert_eq!(driver.model().scope_title, "Garden");
    assert_eq!(column_ids(&driver, Column::Todo), vec![20]);
    assert_eq!(driver.model().board.len(), 1);

    // A late listing for another scope never replaces the board.
    driver.dispatch(Message::BoardLoaded {
        scope: Scope::Inbox,
        tasks: service.snapshot(),
    });
    assert_eq!(driver.model().board.len(), 1);
}

#[tokio::test]
async fn test_failed_load_keeps_previous_board() {
    let service = seeded();
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;
    service.fail_list.store(true, Ordering::SeqCst);

    driver.dispatch(Message::Refresh);
    driver.settle().await;

    assert_eq!(driver.model().board.len(), 4);
    assert!(!driver.model().loading);
    assert_eq!(driver.take_failures().len(), 1);
}

#[tokio::test]
async fn test_move_task_reports_persist_failure() {
    let service = seeded();
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;
    service.fail_status.store(true, Ordering::SeqCst);

    let err = driver
        .move_task(TaskId(2), DropTarget::parse("done"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert!(err.to_string().contains("Moving task #2 to 'DONE' failed"));
    // Board already reloaded from the server when the error is returned.
    assert_eq!(column_ids(&driver, Column::Todo), vec![1, 2]);
    assert!(driver.take_failures().is_empty());
}

#[tokio::test]
async fn test_move_task_outcomes() {
    let service = seeded();
    let mut driver = driver_for(&service, Scope::Inbox);
    driver.dispatch(Message::Init);
    driver.settle().await;

    let moved = driver
        .move_task(TaskId(2), DropTarget::parse("ongoing"))
        .await
        .unwrap();
    assert!(moved);
    assert_eq!(service.get(2).unwrap().status, "ONGOING");

    let moved = driver
        .move_task(TaskId(2), DropTarget::Task(TaskId(3)))
        .await
        .unwrap();
    assert!(!moved, "already in that column");
}
