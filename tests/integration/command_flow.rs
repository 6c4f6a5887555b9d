use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use greenlead_crm_lib::commands::{commissions, customers, dashboard, reps, tasks, AppState};
use greenlead_crm_lib::db::DbPool;
use greenlead_crm_lib::error::{AppError, AppResult};
use greenlead_crm_lib::models::context::{Principal, RequestContext, Role};
use greenlead_crm_lib::models::customer::{CustomerCreateInput, Staleness};
use greenlead_crm_lib::models::effect::Notification;
use greenlead_crm_lib::models::rep::{RepCreateInput, UserCreateInput};
use greenlead_crm_lib::models::task::TaskStatus;
use greenlead_crm_lib::models::task::{TaskCreateInput, TaskUrgency};
use greenlead_crm_lib::services::notification_service::{NotificationDispatcher, Notifier};
use tempfile::{tempdir, TempDir};

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<Notification> {
        self.sent.lock().expect("lock").clone()
    }

    async fn wait_for(&self, count: usize) -> Vec<Notification> {
        for _ in 0..100 {
            let sent = self.sent();
            if sent.len() >= count {
                return sent;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        self.sent()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: &Notification) -> AppResult<()> {
        self.sent.lock().expect("lock").push(notification.clone());
        Ok(())
    }
}

struct BrokenNotifier;

#[async_trait]
impl Notifier for BrokenNotifier {
    async fn send(&self, _notification: &Notification) -> AppResult<()> {
        Err(AppError::other("mail relay unreachable"))
    }
}

fn state_with(notifier: Arc<dyn Notifier>) -> (AppState, TempDir) {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("commands.sqlite")).expect("db pool");
    (
        AppState::new(pool, NotificationDispatcher::new(notifier), 10),
        dir,
    )
}

fn admin() -> RequestContext {
    RequestContext::new(Principal::new("admin-1", Role::Owner).with_name("Olwen"))
}

fn rep() -> RequestContext {
    RequestContext::new(Principal::new("rep-1", Role::Rep))
}

async fn seed_rep(state: &AppState) {
    reps::reps_add(
        state,
        admin(),
        RepCreateInput {
            id: "rep-1".into(),
            name: "Rhian".into(),
            email: "rhian@example.com".into(),
            mobile: "07700900111".into(),
            region: "Mid Wales".into(),
            postcodes: Some("SY23, SY24".into()),
            ..RepCreateInput::default()
        },
    )
    .await
    .expect("add rep");
}

async fn seed_customer(state: &AppState) -> String {
    customers::customers_create(
        state,
        admin(),
        CustomerCreateInput {
            name: "Tom Rees".into(),
            email: "tom@example.com".into(),
            mobile: "07700900222".into(),
            postcode: "SY23 1AB".into(),
            heating_system: Some("oil_boiler".into()),
            installation_type: Some("heat_pump_solar_battery".into()),
            assigned_rep_id: Some("rep-1".into()),
            ..CustomerCreateInput::default()
        },
    )
    .await
    .expect("create customer")
    .id
}

#[tokio::test(flavor = "multi_thread")]
async fn sale_and_install_notify_the_rep_after_commit() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (state, _dir) = state_with(notifier.clone());
    seed_rep(&state).await;
    let customer_id = seed_customer(&state).await;

    let commission = customers::customers_mark_sold(&state, admin(), customer_id.clone(), 35_000.0)
        .await
        .expect("mark sold");
    assert_eq!(commission.commission_amount, 1_750.0);

    let sent = notifier.wait_for(1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient_rep_id, "rep-1");
    assert_eq!(sent[0].subject, "Commission Alert: Deposit Received");

    let released = customers::customers_mark_installed(&state, admin(), customer_id.clone())
        .await
        .expect("mark installed");
    assert_eq!(released.len(), 1);

    let sent = notifier.wait_for(2).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[1].subject, "Ready to Invoice: Final Commission Available");

    let ledger = commissions::commissions_list(&state, rep()).await.expect("ledger");
    assert_eq!(ledger.items.len(), 1);
    assert_eq!(ledger.items[0].stage_label, "Complete");
    assert_eq!(ledger.rollup.completed, 1_750.0);

    let fetched = commissions::commissions_get(&state, rep(), commission.id.clone())
        .await
        .expect("commission");
    assert_eq!(fetched.commission.id, commission.id);
    assert!(fetched.commission.final_paid);

    let unknown = commissions::commissions_get(&state, admin(), "no-such-commission".into())
        .await
        .expect_err("unknown commission");
    assert_eq!(unknown.code, "NOT_FOUND");
}

#[tokio::test(flavor = "multi_thread")]
async fn delivery_failures_do_not_fail_the_command() {
    let (state, _dir) = state_with(Arc::new(BrokenNotifier));
    seed_rep(&state).await;
    let customer_id = seed_customer(&state).await;

    let result = customers::customers_mark_sold(&state, admin(), customer_id, 12_000.0).await;
    assert!(result.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn errors_surface_as_command_codes() {
    let (state, _dir) = state_with(Arc::new(RecordingNotifier::default()));
    seed_rep(&state).await;
    let customer_id = seed_customer(&state).await;

    let invalid = customers::customers_mark_sold(&state, admin(), customer_id.clone(), -5.0)
        .await
        .expect_err("invalid amount");
    assert_eq!(invalid.code, "INVALID_AMOUNT");

    let missing = customers::customers_mark_installed(&state, admin(), "ghost".into())
        .await
        .expect_err("missing customer");
    assert_eq!(missing.code, "NOT_FOUND");

    let bad_status =
        customers::customers_advance_status(&state, admin(), customer_id.clone(), "won".into())
            .await
            .expect_err("unknown status");
    assert_eq!(bad_status.code, "VALIDATION_ERROR");

    customers::customers_mark_sold(&state, admin(), customer_id.clone(), 1_000.0)
        .await
        .expect("sale");
    let again = customers::customers_mark_sold(&state, admin(), customer_id, 1_000.0)
        .await
        .expect_err("second sale");
    assert_eq!(again.code, "CONFLICT");

    let forbidden = reps::reps_add(&state, rep(), RepCreateInput::default())
        .await
        .expect_err("rep adding rep");
    assert_eq!(forbidden.code, "FORBIDDEN");
}

#[tokio::test(flavor = "multi_thread")]
async fn lists_carry_display_fields() {
    let (state, _dir) = state_with(Arc::new(RecordingNotifier::default()));
    seed_rep(&state).await;
    let customer_id = seed_customer(&state).await;

    let listed = customers::customers_list(&state, rep(), None)
        .await
        .expect("customers");
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].status_label, "Initial Enquiry");
    assert_eq!(listed[0].staleness, Staleness::Green);
    assert_eq!(listed[0].customer.estimated_value, 35_000.0);

    let json = serde_json::to_value(&listed[0]).expect("serialize");
    assert_eq!(json["statusLabel"], "Initial Enquiry");
    assert_eq!(json["busGrantEligible"], true);

    let my_tasks = tasks::tasks_list(&state, rep()).await.expect("tasks");
    assert_eq!(my_tasks.len(), 1);
    assert_eq!(my_tasks[0].urgency, TaskUrgency::Urgent);
    assert_eq!(my_tasks[0].days_until_due, 1);

    let urgent = tasks::tasks_urgent(&state, rep()).await.expect("urgent");
    assert_eq!(urgent.len(), 1);

    let created = tasks::tasks_create(
        &state,
        admin(),
        TaskCreateInput {
            customer_id: Some(customer_id.clone()),
            task_type: Some("complete_heat_loss".into()),
            due_date: Some("2099-01-01".into()),
            assigned_rep_id: Some("rep-1".into()),
            ..TaskCreateInput::default()
        },
    )
    .await
    .expect("manual task");
    assert_eq!(created.title, "Complete Heat Loss Survey");
    assert_eq!(
        tasks::tasks_describe_type("complete_heat_loss"),
        created.description
    );
    assert_eq!(tasks::tasks_describe_type("unknown"), "");
    assert_eq!(customers::customers_estimate("mvhr"), 5_000.0);

    let per_customer = tasks::tasks_for_customer(&state, rep(), customer_id)
        .await
        .expect("customer tasks");
    assert_eq!(per_customer.len(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn dashboard_and_feed_reflect_activity() {
    let (state, _dir) = state_with(Arc::new(RecordingNotifier::default()));
    seed_rep(&state).await;
    seed_customer(&state).await;

    let metrics = dashboard::dashboard_metrics(&state, admin())
        .await
        .expect("metrics");
    assert_eq!(metrics.total_customers, 1);
    assert_eq!(metrics.pipeline_value, 35_000.0);
    assert_eq!(metrics.conversion_rate, 0);

    let feed = dashboard::activity_feed(&state, None).await.expect("feed");
    let titles: Vec<&str> = feed.iter().map(|entry| entry.title.as_str()).collect();
    assert!(titles.contains(&"New customer: Tom Rees"));
    assert!(titles.contains(&"New rep added: Rhian"));

    assert_eq!(
        reps::reps_name(&state, "rep-1".into()).await.expect("name"),
        "Rhian"
    );
    assert_eq!(
        reps::reps_name(&state, "nobody".into()).await.expect("name"),
        "Unknown"
    );
    assert_eq!(reps::reps_list(&state).await.expect("reps").len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn reassignment_and_follow_up_commands() {
    let notifier = Arc::new(RecordingNotifier::default());
    let (state, _dir) = state_with(notifier.clone());
    seed_rep(&state).await;
    let customer_id = seed_customer(&state).await;

    let second = reps::users_create(
        &state,
        admin(),
        UserCreateInput {
            id: "rep-2".into(),
            name: "Siân".into(),
            email: "sian@example.com".into(),
            role: Role::Rep,
        },
    )
    .await
    .expect("create user");
    assert_eq!(reps::reps_get(&state, second.id.clone()).await.expect("rep").name, "Siân");
    assert_eq!(reps::users_list(&state, admin()).await.expect("users").len(), 2);
    assert_eq!(
        reps::users_list(&state, rep()).await.expect_err("rep listing users").code,
        "FORBIDDEN"
    );

    let touched = customers::customers_record_contact(&state, rep(), customer_id.clone())
        .await
        .expect("record contact");
    assert!(touched.last_contacted.is_some());

    let moved = customers::customers_assign_rep(&state, admin(), customer_id.clone(), "rep-2".into())
        .await
        .expect("assign rep");
    assert_eq!(moved.assigned_rep_id.as_deref(), Some("rep-2"));
    let sent = notifier.wait_for(1).await;
    assert!(sent.iter().any(|n| n.recipient_rep_id == "rep-2"));

    let hidden = customers::customers_get(&state, rep(), customer_id.clone())
        .await
        .expect_err("old rep lookup");
    assert_eq!(hidden.code, "FORBIDDEN");
    let visible = customers::customers_get(&state, admin(), customer_id.clone())
        .await
        .expect("admin lookup");
    assert_eq!(visible.customer.id, customer_id);

    let welcome = tasks::tasks_for_customer(&state, admin(), customer_id.clone())
        .await
        .expect("tasks");
    assert_eq!(welcome.len(), 1);
    let done = tasks::tasks_complete(&state, rep(), welcome[0].task.id.clone())
        .await
        .expect("complete");
    assert_eq!(done.status, TaskStatus::Completed);

    let none = commissions::commissions_for_customer(&state, admin(), customer_id)
        .await
        .expect("commissions");
    assert!(none.is_empty());
}
