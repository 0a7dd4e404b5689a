use chrono::NaiveDate;
use rusqlite::Connection;
use todo_core::db::open_db_in_memory;
use todo_core::{
    IndexError, NewTodo, PageRequest, PriorityService, SortDirection, SortField,
    SqlitePriorityStore, SqliteTodoStore, TodoChanges, TodoRecord, TodoService, TodoStatus,
};

fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
}

fn day(value: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, value).unwrap()
}

fn todo_service(conn: &Connection) -> TodoService<SqliteTodoStore<'_>> {
    TodoService::new(SqliteTodoStore::try_new(conn).unwrap()).with_today(fixed_today)
}

fn new_todo(title: &str, planned: u32) -> NewTodo {
    NewTodo {
        title: title.to_string(),
        description: None,
        priority: None,
        planned_date: day(planned),
    }
}

fn titles(records: &[TodoRecord]) -> Vec<&str> {
    records.iter().map(|record| record.payload.title.as_str()).collect()
}

#[test]
fn create_stamps_open_status_and_creation_date() {
    let conn = open_db_in_memory().unwrap();
    let service = todo_service(&conn);

    let created = service.create(new_todo("buy milk", 3), None).unwrap();

    assert_eq!(created.position, 0);
    assert_eq!(created.payload.status, TodoStatus::Open);
    assert_eq!(created.payload.creation_date, fixed_today());
    assert_eq!(created.payload.planned_date, day(3));
    assert_eq!(created.payload.completion_date, None);
    assert_eq!(service.get_by_id(created.id).unwrap(), created);
}

#[test]
fn create_with_position_inserts_between_existing_items() {
    let conn = open_db_in_memory().unwrap();
    let service = todo_service(&conn);
    service.create(new_todo("first", 2), None).unwrap();
    service.create(new_todo("third", 4), None).unwrap();

    let second = service.create(new_todo("second", 3), Some(1)).unwrap();

    assert_eq!(second.position, 1);
    assert_eq!(titles(&service.get_all().unwrap()), vec!["first", "second", "third"]);
}

#[test]
fn update_replaces_fields_but_keeps_position_and_creation_date() {
    let conn = open_db_in_memory().unwrap();
    let service = todo_service(&conn);
    service.create(new_todo("head", 2), None).unwrap();
    let target = service.create(new_todo("draft", 2), None).unwrap();

    let updated = service
        .update(
            target.id,
            TodoChanges {
                title: "final".to_string(),
                description: Some("ship it".to_string()),
                priority: None,
                status: TodoStatus::Closed,
                planned_date: day(9),
                completion_date: Some(day(8)),
            },
        )
        .unwrap();

    assert_eq!(updated.position, 1);
    assert_eq!(updated.payload.title, "final");
    assert_eq!(updated.payload.description.as_deref(), Some("ship it"));
    assert_eq!(updated.payload.status, TodoStatus::Closed);
    assert_eq!(updated.payload.creation_date, fixed_today());
    assert_eq!(updated.payload.completion_date, Some(day(8)));
}

#[test]
fn closing_a_todo_does_not_stamp_completion_date() {
    let conn = open_db_in_memory().unwrap();
    let service = todo_service(&conn);
    let created = service.create(new_todo("chore", 2), None).unwrap();

    let updated = service
        .update(
            created.id,
            TodoChanges {
                title: created.payload.title.clone(),
                description: None,
                priority: None,
                status: TodoStatus::Closed,
                planned_date: created.payload.planned_date,
                completion_date: None,
            },
        )
        .unwrap();

    assert_eq!(updated.payload.completion_date, None);
}

#[test]
fn update_unknown_todo_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = todo_service(&conn);

    let err = service
        .update(
            5,
            TodoChanges {
                title: "ghost".to_string(),
                description: None,
                priority: None,
                status: TodoStatus::Open,
                planned_date: day(1),
                completion_date: None,
            },
        )
        .unwrap_err();
    assert!(matches!(err, IndexError::NotFound(5)));
}

#[test]
fn deleting_priority_clears_todo_reference_without_reordering_todos() {
    let conn = open_db_in_memory().unwrap();
    let priorities = PriorityService::new(SqlitePriorityStore::try_new(&conn).unwrap());
    let todos = todo_service(&conn);

    let high = priorities.create("high", None).unwrap();
    let mut input = new_todo("pay rent", 1);
    input.priority = Some(high.id);
    let linked = todos.create(input, None).unwrap();
    todos.create(new_todo("water plants", 2), None).unwrap();
    assert_eq!(linked.payload.priority, Some(high.id));

    priorities.delete_by_id(high.id).unwrap();

    let reloaded = todos.get_by_id(linked.id).unwrap();
    assert_eq!(reloaded.payload.priority, None);
    assert_eq!(reloaded.position, 0);
    assert_eq!(todos.count().unwrap(), 2);
}

#[test]
fn collections_are_ordered_independently() {
    let conn = open_db_in_memory().unwrap();
    let priorities = PriorityService::new(SqlitePriorityStore::try_new(&conn).unwrap());
    let todos = todo_service(&conn);

    priorities.create("low", None).unwrap();
    priorities.create("high", None).unwrap();
    let todo = todos.create(new_todo("only", 1), None).unwrap();

    priorities.swap(0, 1).unwrap();
    priorities.delete_all().unwrap();

    assert_eq!(todo.position, 0);
    assert_eq!(todos.get_by_id(todo.id).unwrap().position, 0);
}

#[test]
fn bulk_delete_and_swap_keep_todo_positions_dense() {
    let conn = open_db_in_memory().unwrap();
    let service = todo_service(&conn);
    let created: Vec<TodoRecord> = (1..=6)
        .map(|n| service.create(new_todo(&format!("t{n}"), n), None).unwrap())
        .collect();

    service
        .delete_all_by_id([created[0].id, created[2].id, created[5].id])
        .unwrap();
    service.swap(0, 2).unwrap();

    let remaining = service.get_all().unwrap();
    assert_eq!(
        remaining.iter().map(|record| record.position).collect::<Vec<_>>(),
        vec![0, 1, 2]
    );
    assert_eq!(titles(&remaining), vec!["t5", "t4", "t2"]);
}

#[test]
fn page_sorts_by_planned_date_with_position_tie_break() {
    let conn = open_db_in_memory().unwrap();
    let service = todo_service(&conn);
    service.create(new_todo("late", 20), None).unwrap();
    service.create(new_todo("early-a", 5), None).unwrap();
    service.create(new_todo("early-b", 5), None).unwrap();

    let request = PageRequest::default().sorted_by(
        SortField::Payload("planned_date".to_string()),
        SortDirection::Ascending,
    );
    let page = service.page(&request).unwrap();

    assert_eq!(titles(&page.items), vec!["early-a", "early-b", "late"]);
    assert_eq!(page.total_count, 3);
}

#[test]
fn todo_record_serializes_with_snake_case_status() {
    let conn = open_db_in_memory().unwrap();
    let service = todo_service(&conn);
    let created = service.create(new_todo("json", 7), None).unwrap();

    let value = serde_json::to_value(&created).unwrap();

    assert_eq!(value["position"], 0);
    assert_eq!(value["payload"]["status"], "open");
    assert_eq!(value["payload"]["planned_date"], "2024-05-07");
}
