use chrono::{DateTime, Duration, TimeZone, Utc};
use greenlead_crm_lib::db::DbPool;
use greenlead_crm_lib::error::AppError;
use greenlead_crm_lib::models::context::{Principal, RequestContext, Role};
use greenlead_crm_lib::models::customer::CustomerCreateInput;
use greenlead_crm_lib::models::rep::RepCreateInput;
use greenlead_crm_lib::models::task::{TaskCreateInput, TaskStatus, TaskType, TaskUrgency};
use greenlead_crm_lib::services::customer_service::CustomerService;
use greenlead_crm_lib::services::rep_service::RepService;
use greenlead_crm_lib::services::task_service::{urgency, TaskService};
use tempfile::{tempdir, TempDir};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 7, 1, 10, 0, 0).unwrap()
}

fn admin() -> RequestContext {
    RequestContext::at(Principal::new("admin-1", Role::Admin), now())
}

fn as_rep(rep_id: &str) -> RequestContext {
    RequestContext::at(Principal::new(rep_id, Role::Rep), now())
}

/// Two reps and one unassigned customer.
fn setup_service() -> (TaskService, String, TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("tasks.sqlite")).expect("db pool");

    let reps = RepService::new(pool.clone());
    for id in ["rep-a", "rep-b"] {
        reps.add_rep(
            &admin(),
            RepCreateInput {
                id: id.into(),
                name: id.to_uppercase(),
                email: format!("{id}@example.com"),
                mobile: "07700900000".into(),
                region: "Wales".into(),
                ..RepCreateInput::default()
            },
        )
        .expect("add rep");
    }

    let customer = CustomerService::new(pool.clone())
        .create_customer(
            &admin(),
            CustomerCreateInput {
                name: "Mo Khan".into(),
                email: "mo@example.com".into(),
                mobile: "07700900321".into(),
                postcode: "CF10 1AA".into(),
                ..CustomerCreateInput::default()
            },
        )
        .expect("create customer")
        .value;

    (TaskService::new(pool), customer.id, dir)
}

fn input(customer_id: &str, task_type: &str, due: &str, rep_id: &str) -> TaskCreateInput {
    TaskCreateInput {
        customer_id: Some(customer_id.into()),
        task_type: Some(task_type.into()),
        due_date: Some(due.into()),
        assigned_rep_id: Some(rep_id.into()),
        ..TaskCreateInput::default()
    }
}

fn due_in(offset: Duration) -> String {
    (now() + offset).to_rfc3339()
}

#[test]
fn manual_task_fills_defaults_and_notifies_the_rep() {
    let (service, customer_id, _dir) = setup_service();

    let outcome = service
        .create_manual_task(
            &admin(),
            input(&customer_id, "generate_quote", &due_in(Duration::days(2)), "rep-a"),
        )
        .expect("create task");

    let task = &outcome.value;
    assert_eq!(task.task_type, TaskType::GenerateQuote);
    assert_eq!(task.title, "Generate Quote");
    assert_eq!(task.description, TaskType::GenerateQuote.description());
    assert_eq!(task.status, TaskStatus::NotStarted);
    assert_eq!(task.created_by, "admin-1");
    assert_eq!(task.due_date, now() + Duration::days(2));

    assert_eq!(outcome.notifications.len(), 1);
    assert_eq!(outcome.notifications[0].recipient_rep_id, "rep-a");
    assert_eq!(outcome.notifications[0].subject, "New task assigned");

    let stored = service.get_task(&task.id).expect("stored task");
    assert_eq!(&stored, task);
}

#[test]
fn explicit_title_and_plain_date_are_kept() {
    let (service, customer_id, _dir) = setup_service();
    let mut payload = input(&customer_id, "bus_grant", "2026-07-03", "rep-b");
    payload.title = Some("Chase BUS paperwork".into());
    payload.description = Some("Installer reference needed".into());

    let task = service
        .create_manual_task(&admin(), payload)
        .expect("create task")
        .value;
    assert_eq!(task.title, "Chase BUS paperwork");
    assert_eq!(task.description, "Installer reference needed");
    assert_eq!(task.due_date, Utc.with_ymd_and_hms(2026, 7, 3, 0, 0, 0).unwrap());
}

#[test]
fn missing_or_malformed_fields_are_validation_errors() {
    let (service, customer_id, _dir) = setup_service();
    let due = due_in(Duration::days(1));

    let mut no_customer = input(&customer_id, "welcome_call", &due, "rep-a");
    no_customer.customer_id = None;
    let mut blank_rep = input(&customer_id, "welcome_call", &due, "rep-a");
    blank_rep.assigned_rep_id = Some("  ".into());
    let mut no_due = input(&customer_id, "welcome_call", &due, "rep-a");
    no_due.due_date = None;

    let cases = vec![
        no_customer,
        blank_rep,
        no_due,
        input(&customer_id, "site_visit", &due, "rep-a"),
        input(&customer_id, "welcome_call", "tomorrow", "rep-a"),
    ];

    for payload in cases {
        let result = service.create_manual_task(&admin(), payload);
        assert!(
            matches!(result, Err(AppError::Validation { .. })),
            "expected validation error, got {result:?}"
        );
    }
}

#[test]
fn unknown_customer_or_rep_is_not_found() {
    let (service, customer_id, _dir) = setup_service();
    let due = due_in(Duration::days(1));

    let missing_customer = service.create_manual_task(
        &admin(),
        input("no-such-customer", "welcome_call", &due, "rep-a"),
    );
    assert!(matches!(missing_customer, Err(AppError::NotFound)));

    let missing_rep =
        service.create_manual_task(&admin(), input(&customer_id, "welcome_call", &due, "rep-z"));
    assert!(matches!(missing_rep, Err(AppError::NotFound)));

    assert!(service.tasks_for_customer(&admin(), &customer_id).expect("tasks").is_empty());
}

#[test]
fn completing_sets_status_and_timestamp() {
    let (service, customer_id, _dir) = setup_service();
    let task = service
        .create_manual_task(
            &admin(),
            input(&customer_id, "book_heat_loss", &due_in(-Duration::days(1)), "rep-a"),
        )
        .expect("create task")
        .value;
    assert_eq!(urgency(&task, now()), TaskUrgency::Overdue);

    let done_at = now() + Duration::hours(2);
    let done = service
        .complete_task(&RequestContext::at(Principal::new("rep-a", Role::Rep), done_at), &task.id)
        .expect("complete");
    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.completed_at, Some(done_at));
    assert_eq!(urgency(&done, now()), TaskUrgency::Normal);

    let redone_at = done_at + Duration::hours(1);
    let redone = service
        .complete_task(&RequestContext::at(Principal::new("rep-a", Role::Rep), redone_at), &task.id)
        .expect("complete again");
    assert_eq!(redone.completed_at, Some(redone_at));

    let missing = service.complete_task(&admin(), "no-such-task");
    assert!(matches!(missing, Err(AppError::NotFound)));
}

#[test]
fn reps_see_their_own_tasks_in_due_order() {
    let (service, customer_id, _dir) = setup_service();
    for (offset, rep_id) in [
        (Duration::days(5), "rep-a"),
        (Duration::hours(3), "rep-b"),
        (-Duration::days(2), "rep-a"),
        (Duration::days(1), "rep-a"),
    ] {
        service
            .create_manual_task(
                &admin(),
                input(&customer_id, "generate_quote", &due_in(offset), rep_id),
            )
            .expect("create task");
    }

    let mine = service.list_tasks(&as_rep("rep-a")).expect("rep tasks");
    assert_eq!(mine.len(), 3);
    assert!(mine.iter().all(|task| task.assigned_rep_id.as_deref() == Some("rep-a")));
    assert!(mine.windows(2).all(|pair| pair[0].due_date <= pair[1].due_date));

    assert_eq!(service.list_tasks(&admin()).expect("all tasks").len(), 4);
}

#[test]
fn urgent_tasks_are_open_and_due_within_a_day() {
    let (service, customer_id, _dir) = setup_service();
    let mut ids = Vec::new();
    for (offset, rep_id) in [
        (-Duration::days(3), "rep-a"),
        (Duration::hours(20), "rep-a"),
        (Duration::hours(30), "rep-a"),
        (Duration::hours(2), "rep-b"),
    ] {
        let task = service
            .create_manual_task(
                &admin(),
                input(&customer_id, "book_installation", &due_in(offset), rep_id),
            )
            .expect("create task")
            .value;
        ids.push(task.id);
    }

    let urgent = service.urgent_tasks(&as_rep("rep-a")).expect("urgent");
    let urgent_ids: Vec<&str> = urgent.iter().map(|task| task.id.as_str()).collect();
    assert_eq!(urgent_ids, vec![ids[0].as_str(), ids[1].as_str()]);

    service.complete_task(&as_rep("rep-a"), &ids[0]).expect("complete");
    let urgent = service.urgent_tasks(&as_rep("rep-a")).expect("urgent");
    assert_eq!(urgent.len(), 1);
    assert_eq!(urgent[0].id, ids[1]);
}
