use chrono::{DateTime, Duration, TimeZone, Utc};
use greenlead_crm_lib::db::DbPool;
use greenlead_crm_lib::models::commission::CommissionStage;
use greenlead_crm_lib::models::context::{Principal, RequestContext, Role};
use greenlead_crm_lib::models::customer::{
    CustomerCreateInput, CustomerFilter, CustomerRecord, CustomerStatus, InstallationType,
    Staleness,
};
use greenlead_crm_lib::models::rep::RepCreateInput;
use greenlead_crm_lib::models::task::{TaskStatus, TaskType};
use greenlead_crm_lib::services::activity_service::ActivityService;
use greenlead_crm_lib::services::commission_service::{self, CommissionService};
use greenlead_crm_lib::services::customer_service::{staleness, CustomerService};
use greenlead_crm_lib::services::metrics_service::MetricsService;
use greenlead_crm_lib::services::rep_service::RepService;
use greenlead_crm_lib::services::task_service::TaskService;
use tempfile::{tempdir, TempDir};

struct Fixture {
    pool: DbPool,
    customers: CustomerService,
    tasks: TaskService,
    commissions: CommissionService,
    activities: ActivityService,
    metrics: MetricsService,
    _dir: TempDir,
}

fn setup() -> Fixture {
    let dir = tempdir().expect("temp dir");
    let pool = DbPool::new(dir.path().join("lifecycle.sqlite")).expect("db pool");
    let customers = CustomerService::new(pool.clone());

    let reps = RepService::new(pool.clone());
    for (id, name) in [("rep-r", "Rhys"), ("rep-s", "Sian")] {
        reps.add_rep(
            &admin_at(start()),
            RepCreateInput {
                id: id.into(),
                name: name.into(),
                email: format!("{id}@example.com"),
                mobile: "07700900000".into(),
                region: "South West".into(),
                ..RepCreateInput::default()
            },
        )
        .expect("add rep");
    }

    Fixture {
        tasks: TaskService::new(pool.clone()),
        commissions: CommissionService::new(pool.clone()),
        activities: ActivityService::new(pool.clone()),
        metrics: MetricsService::new(customers.clone()),
        customers,
        pool,
        _dir: dir,
    }
}

fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 2, 9, 30, 0).unwrap()
}

fn admin_at(now: DateTime<Utc>) -> RequestContext {
    RequestContext::at(Principal::new("admin-1", Role::Admin).with_name("Alex Admin"), now)
}

fn rep_ctx(rep_id: &str) -> RequestContext {
    RequestContext::at(Principal::new(rep_id, Role::Rep), start())
}

fn new_customer(
    fixture: &Fixture,
    name: &str,
    installation_type: &str,
    rep_id: Option<&str>,
) -> CustomerRecord {
    fixture
        .customers
        .create_customer(
            &admin_at(start()),
            CustomerCreateInput {
                name: name.into(),
                email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
                mobile: "07700900123".into(),
                postcode: "BS1 4DJ".into(),
                heating_system: Some("gas_boiler".into()),
                installation_type: Some(installation_type.into()),
                assigned_rep_id: rep_id.map(str::to_string),
                ..CustomerCreateInput::default()
            },
        )
        .expect("create customer")
        .value
}

#[test]
fn new_customer_is_priced_flagged_and_gets_a_welcome_call() {
    let fixture = setup();
    let customer = new_customer(&fixture, "Ada Smith", "heat_pump_solar", Some("rep-r"));

    assert_eq!(customer.installation_type, Some(InstallationType::HeatPumpSolar));
    assert_eq!(customer.estimated_value, 25_000.0);
    assert!(customer.bus_grant_eligible);
    assert_eq!(customer.status, CustomerStatus::Enquiry);
    assert_eq!(customer.created_by, "admin-1");

    let tasks = fixture
        .tasks
        .tasks_for_customer(&admin_at(start()), &customer.id)
        .expect("tasks for customer");
    assert_eq!(tasks.len(), 1);
    let welcome = &tasks[0];
    assert_eq!(welcome.task_type, TaskType::WelcomeCall);
    assert_eq!(welcome.title, "Welcome Call");
    assert_eq!(welcome.assigned_rep_id.as_deref(), Some("rep-r"));
    assert_eq!(welcome.status, TaskStatus::NotStarted);
    assert_eq!(welcome.created_by, "system");
    assert!(welcome.due_date > start());
    assert!(welcome.due_date - start() <= Duration::hours(24));

    let feed = fixture.activities.recent(None).expect("feed");
    assert_eq!(feed[0].title, "New customer: Ada Smith");
    assert_eq!(feed[0].description, "Created by Alex Admin");
}

#[test]
fn unassigned_customer_gets_no_task() {
    let fixture = setup();
    let customer = new_customer(&fixture, "Bea Jones", "solar", None);
    assert!(fixture
        .tasks
        .tasks_for_customer(&admin_at(start()), &customer.id)
        .expect("tasks")
        .is_empty());
}

#[test]
fn sale_then_installation_pays_both_halves() {
    let fixture = setup();
    let customer = new_customer(&fixture, "Cai Evans", "heat_pump", Some("rep-r"));

    let sold_at = start() + Duration::days(3);
    let sale = fixture
        .customers
        .mark_sold(&admin_at(sold_at), &customer.id, 20_000.0)
        .expect("mark sold");
    let commission = &sale.value;
    assert_eq!(commission.commission_amount, 1_000.0);
    assert_eq!(commission.deposit_commission, 500.0);
    assert_eq!(commission.final_commission, 500.0);
    assert!(commission.deposit_paid);
    assert_eq!(commission.deposit_paid_date, Some(sold_at));
    assert!(!commission.final_paid);
    assert_eq!(commission.rep_id.as_deref(), Some("rep-r"));

    assert_eq!(sale.notifications.len(), 1);
    assert_eq!(sale.notifications[0].recipient_rep_id, "rep-r");
    assert_eq!(sale.notifications[0].subject, "Commission Alert: Deposit Received");
    assert!(sale.notifications[0].body.contains("£20,000.00"));

    let sold = fixture
        .customers
        .get_customer(&admin_at(sold_at), &customer.id)
        .expect("customer");
    assert_eq!(sold.status, CustomerStatus::Sold);
    assert!(sold.deposit_received);
    assert_eq!(sold.deposit_amount, Some(20_000.0));
    assert_eq!(sold.deposit_received_date, Some(sold_at));

    let feed = fixture.activities.recent(Some(1)).expect("feed");
    assert_eq!(feed[0].title, "Deposit received: Cai Evans");
    assert_eq!(feed[0].description, "Amount: £20,000.00, Commission: £500.00");

    let installed_at = sold_at + Duration::days(30);
    let install = fixture
        .customers
        .mark_installed(&admin_at(installed_at), &customer.id)
        .expect("mark installed");
    assert_eq!(install.value.len(), 1);
    let released = &install.value[0];
    assert!(released.final_paid);
    assert_eq!(released.final_paid_date, Some(installed_at));
    assert_eq!(CommissionStage::of(released), CommissionStage::Complete);
    assert_eq!(install.notifications.len(), 1);
    assert_eq!(
        install.notifications[0].subject,
        "Ready to Invoice: Final Commission Available"
    );

    let installed = fixture
        .customers
        .get_customer(&admin_at(installed_at), &customer.id)
        .expect("customer");
    assert_eq!(installed.status, CustomerStatus::Installed);
    assert_eq!(installed.installation_completed_date, Some(installed_at));

    let ledger = fixture.commissions.ledger(&rep_ctx("rep-r")).expect("ledger");
    assert_eq!(ledger.items.len(), 1);
    assert_eq!(ledger.rollup.total, 1_000.0);
    assert_eq!(ledger.rollup.completed, 1_000.0);
    assert_eq!(ledger.rollup.pending, 0.0);

    let feed = fixture.activities.recent(Some(1)).expect("feed");
    assert_eq!(feed[0].title, "Installation completed: Cai Evans");
    assert_eq!(feed[0].description, "Final commission ready to invoice");
}

#[test]
fn releasing_twice_changes_nothing() {
    let fixture = setup();
    let customer = new_customer(&fixture, "Dee Hughes", "battery", Some("rep-s"));
    fixture
        .customers
        .mark_sold(&admin_at(start()), &customer.id, 8_000.0)
        .expect("mark sold");
    fixture
        .customers
        .mark_installed(&admin_at(start()), &customer.id)
        .expect("mark installed");

    let before = fixture
        .commissions
        .for_customer(&admin_at(start()), &customer.id)
        .expect("before");
    let again = fixture
        .pool
        .with_transaction(|conn| {
            commission_service::release_final(conn, &customer.id, start() + Duration::days(9))
        })
        .expect("second release");
    assert!(again.is_empty());

    let after = fixture
        .commissions
        .for_customer(&admin_at(start()), &customer.id)
        .expect("after");
    assert_eq!(before, after);
}

#[test]
fn installing_without_a_sale_releases_nothing() {
    let fixture = setup();
    let customer = new_customer(&fixture, "Ed Price", "mvhr", Some("rep-r"));
    let outcome = fixture
        .customers
        .mark_installed(&admin_at(start()), &customer.id)
        .expect("mark installed");
    assert!(outcome.value.is_empty());
    assert!(outcome.notifications.is_empty());
}

#[test]
fn unassigned_sale_books_commission_without_notifying() {
    let fixture = setup();
    let customer = new_customer(&fixture, "Fay Bell", "solar", None);
    let sale = fixture
        .customers
        .mark_sold(&admin_at(start()), &customer.id, 15_000.0)
        .expect("mark sold");
    assert_eq!(sale.value.rep_id, None);
    assert!(sale.notifications.is_empty());
}

#[test]
fn search_and_status_filter_narrow_the_book() {
    let fixture = setup();
    let john = new_customer(&fixture, "John Smith", "solar", Some("rep-r"));
    let jane = new_customer(&fixture, "Jane Smith", "solar", Some("rep-r"));
    new_customer(&fixture, "Sam Smith", "solar", Some("rep-s"));
    let bob = new_customer(&fixture, "Bob Jones", "solar", Some("rep-s"));
    new_customer(&fixture, "Amy Lee", "solar", Some("rep-s"));

    for customer in [&john, &jane, &bob] {
        fixture
            .customers
            .mark_sold(&admin_at(start()), &customer.id, 10_000.0)
            .expect("mark sold");
    }

    let found = fixture
        .customers
        .search(
            &admin_at(start()),
            &CustomerFilter {
                search: Some("smith".into()),
                status: Some(CustomerStatus::Sold),
            },
        )
        .expect("search");
    let mut names: Vec<&str> = found.iter().map(|c| c.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["Jane Smith", "John Smith"]);

    let rep_view = fixture
        .customers
        .search(&rep_ctx("rep-s"), &CustomerFilter::default())
        .expect("rep search");
    assert_eq!(rep_view.len(), 3);
}

#[test]
fn dashboard_is_scoped_by_role() {
    let fixture = setup();
    let sold = new_customer(&fixture, "Gil Ford", "heat_pump", Some("rep-r"));
    new_customer(&fixture, "Hal Ward", "solar", Some("rep-r"));
    new_customer(&fixture, "Ivy Cole", "green_build", Some("rep-s"));
    fixture
        .customers
        .mark_sold(&admin_at(start()), &sold.id, 12_000.0)
        .expect("mark sold");

    let admin = fixture.metrics.dashboard(&admin_at(start())).expect("admin");
    assert_eq!(admin.total_customers, 3);
    assert_eq!(admin.pipeline_value, 65_000.0);
    assert_eq!(admin.conversion_rate, 33);

    let rep = fixture.metrics.dashboard(&rep_ctx("rep-r")).expect("rep");
    assert_eq!(rep.total_customers, 2);
    assert_eq!(rep.my_customers, 2);
    assert_eq!(rep.pipeline_value, 15_000.0);
    assert_eq!(rep.conversion_rate, 50);
}

#[test]
fn contact_resets_staleness() {
    let fixture = setup();
    let customer = new_customer(&fixture, "Jo Reed", "solar", Some("rep-r"));

    let later = start() + Duration::days(14);
    assert_eq!(staleness(&customer, later), Staleness::Red);

    let touched = fixture
        .customers
        .record_contact(&RequestContext::at(Principal::new("rep-r", Role::Rep), later), &customer.id)
        .expect("record contact");
    assert_eq!(touched.last_contacted, Some(later));
    assert_eq!(touched.version, customer.version + 1);
    assert_eq!(staleness(&touched, later + Duration::hours(6)), Staleness::Green);
}

#[test]
fn first_assignment_schedules_welcome_call_once() {
    let fixture = setup();
    let customer = new_customer(&fixture, "Kit Hall", "solar", None);

    let assigned = fixture
        .customers
        .assign_rep(&admin_at(start()), &customer.id, "rep-r")
        .expect("assign");
    assert_eq!(assigned.value.assigned_rep_id.as_deref(), Some("rep-r"));
    assert_eq!(assigned.notifications.len(), 1);

    fixture
        .customers
        .assign_rep(&admin_at(start()), &customer.id, "rep-s")
        .expect("reassign");

    let tasks = fixture
        .tasks
        .tasks_for_customer(&admin_at(start()), &customer.id)
        .expect("tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].assigned_rep_id.as_deref(), Some("rep-r"));
}

#[test]
fn pipeline_stages_are_recorded() {
    let fixture = setup();
    let customer = new_customer(&fixture, "Lou Page", "solar", Some("rep-r"));

    let outcome = fixture
        .customers
        .advance_status(&rep_ctx("rep-r"), &customer.id, CustomerStatus::Booked)
        .expect("advance");
    assert_eq!(outcome.value.status, CustomerStatus::Booked);

    let feed = fixture.activities.recent(Some(1)).expect("feed");
    assert_eq!(feed[0].title, "Status updated: Lou Page");
    assert_eq!(feed[0].description, "Initial Enquiry -> Survey Booked");
    assert_eq!(feed[0].created_by, "rep-r");
}
