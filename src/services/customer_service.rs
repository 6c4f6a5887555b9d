use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::db::repositories::customer_repository::{CustomerRepository, CustomerRow};
use crate::db::repositories::rep_repository::RepRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::commission::CommissionRecord;
use crate::models::context::{RequestContext, Scope};
use crate::models::customer::{
    CustomerCreateInput, CustomerFilter, CustomerRecord, CustomerStatus, InstallationType,
    Staleness,
};
use crate::models::effect::{Effect, Outcome};
use crate::models::rep::RepRecord;
use crate::models::task::TaskType;
use crate::services::task_service::{self, MILLIS_PER_DAY};
use crate::services::{activity_service, commission_service, estimation};
use crate::utils::format::{format_day, format_gbp};

const BUS_GRANT_HEATING_SYSTEMS: [&str; 2] = ["gas_boiler", "oil_boiler"];

/// Properties heated by a gas or oil boiler qualify for the Boiler Upgrade
/// Scheme grant.
pub fn is_bus_grant_eligible(heating_system: Option<&str>) -> bool {
    heating_system.map_or(false, |system| BUS_GRANT_HEATING_SYSTEMS.contains(&system))
}

/// Traffic-light bucket for time since the customer was last contacted.
pub fn staleness(customer: &CustomerRecord, now: DateTime<Utc>) -> Staleness {
    let reference = customer.last_contacted.unwrap_or(customer.created_at);
    let days = (now - reference).num_milliseconds() as f64 / MILLIS_PER_DAY;

    if days <= 2.0 {
        Staleness::Green
    } else if days <= 5.0 {
        Staleness::Yellow
    } else if days <= 12.0 {
        Staleness::Orange
    } else if days <= 20.0 {
        Staleness::Red
    } else {
        Staleness::Black
    }
}

/// Case-insensitive search over name and email, plain substring over the
/// mobile number, and an exact status match. Empty criteria match everything.
pub fn filter<'a>(
    customers: &'a [CustomerRecord],
    criteria: &CustomerFilter,
) -> Vec<&'a CustomerRecord> {
    let needle = criteria
        .search
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty());
    let needle_lower = needle.map(str::to_lowercase);

    customers
        .iter()
        .filter(|customer| match (needle, needle_lower.as_deref()) {
            (Some(raw), Some(lower)) => {
                customer.name.to_lowercase().contains(lower)
                    || customer.email.to_lowercase().contains(lower)
                    || customer.mobile.contains(raw)
            }
            _ => true,
        })
        .filter(|customer| criteria.status.map_or(true, |status| customer.status == status))
        .collect()
}

#[derive(Clone)]
pub struct CustomerService {
    db: DbPool,
}

impl CustomerService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub fn create_customer(
        &self,
        ctx: &RequestContext,
        input: CustomerCreateInput,
    ) -> AppResult<Outcome<CustomerRecord>> {
        let record = build_customer(ctx, input)?;

        let notifications = self.db.with_transaction(|conn| {
            if let Some(rep_id) = record.assigned_rep_id.as_deref() {
                load_rep(conn, rep_id)?;
            }

            CustomerRepository::insert(conn, &CustomerRow::from_record(&record))?;

            if let Some(rep_id) = record.assigned_rep_id.as_deref() {
                schedule_welcome_call(conn, &record.id, rep_id, ctx.now)?;
            }

            activity_service::apply_effects(
                conn,
                ctx,
                vec![Effect::activity(
                    format!("New customer: {}", record.name),
                    format!("Created by {}", ctx.principal.label()),
                )],
            )
        })?;

        info!(
            target: "crm::customer",
            customer_id = %record.id,
            rep_id = ?record.assigned_rep_id,
            estimated_value = record.estimated_value,
            "customer created"
        );
        Ok(Outcome::new(record, notifications))
    }

    /// Records the deposit that turns an enquiry into a sale and books the
    /// commission for it. A customer can only be sold once.
    pub fn mark_sold(
        &self,
        ctx: &RequestContext,
        customer_id: &str,
        deposit_amount: f64,
    ) -> AppResult<Outcome<CommissionRecord>> {
        if !deposit_amount.is_finite() || deposit_amount <= 0.0 {
            return Err(AppError::invalid_amount(deposit_amount));
        }

        let (commission, notifications) = self.db.with_transaction(|conn| {
            let mut customer = load_customer(conn, customer_id)?;
            ensure_visible(ctx, &customer)?;
            if customer.status.is_closed_won() {
                return Err(AppError::conflict(format!(
                    "customer {customer_id} is already {}",
                    customer.status
                )));
            }

            customer.status = CustomerStatus::Sold;
            customer.deposit_received = true;
            customer.deposit_received_date = Some(ctx.now);
            customer.deposit_amount = Some(deposit_amount);
            persist(conn, &mut customer, ctx.now)?;

            let commission = commission_service::build_commission(
                &customer.id,
                customer.assigned_rep_id.as_deref(),
                deposit_amount,
                ctx.now,
            )?;
            commission_service::insert(conn, &commission)?;

            let mut effects = vec![Effect::activity(
                format!("Deposit received: {}", customer.name),
                format!(
                    "Amount: {}, Commission: {}",
                    format_gbp(deposit_amount),
                    format_gbp(commission.deposit_commission)
                ),
            )];
            if let Some(rep_id) = commission.rep_id.as_deref() {
                effects.push(Effect::notify(
                    rep_id,
                    "Commission Alert: Deposit Received",
                    deposit_notice(&customer, &commission),
                ));
            }

            let notifications = activity_service::apply_effects(conn, ctx, effects)?;
            Ok((commission, notifications))
        })?;

        info!(
            target: "crm::customer",
            %customer_id,
            commission_id = %commission.id,
            deposit_amount,
            "customer marked sold"
        );
        Ok(Outcome::new(commission, notifications))
    }

    /// Completes the installation and releases the final commission half.
    pub fn mark_installed(
        &self,
        ctx: &RequestContext,
        customer_id: &str,
    ) -> AppResult<Outcome<Vec<CommissionRecord>>> {
        let (released, notifications) = self.db.with_transaction(|conn| {
            let mut customer = load_customer(conn, customer_id)?;
            ensure_visible(ctx, &customer)?;
            if customer.status == CustomerStatus::Installed {
                return Err(AppError::conflict(format!(
                    "customer {customer_id} is already installed"
                )));
            }

            customer.status = CustomerStatus::Installed;
            customer.installation_completed_date = Some(ctx.now);
            persist(conn, &mut customer, ctx.now)?;

            let released = commission_service::release_final(conn, &customer.id, ctx.now)?;

            let mut effects = vec![Effect::activity(
                format!("Installation completed: {}", customer.name),
                "Final commission ready to invoice",
            )];
            if let Some(rep_id) = customer.assigned_rep_id.as_deref() {
                effects.extend(released.iter().map(|commission| {
                    Effect::notify(
                        rep_id,
                        "Ready to Invoice: Final Commission Available",
                        final_notice(&customer, commission),
                    )
                }));
            }

            let notifications = activity_service::apply_effects(conn, ctx, effects)?;
            Ok((released, notifications))
        })?;

        info!(
            target: "crm::customer",
            %customer_id,
            released = released.len(),
            "installation completed"
        );
        Ok(Outcome::new(released, notifications))
    }

    /// Moves a customer through the pre-sale pipeline or disqualifies them.
    pub fn advance_status(
        &self,
        ctx: &RequestContext,
        customer_id: &str,
        status: CustomerStatus,
    ) -> AppResult<Outcome<CustomerRecord>> {
        match status {
            CustomerStatus::Sold => {
                return Err(AppError::validation(
                    "a customer is marked sold by recording the deposit",
                ))
            }
            CustomerStatus::Installed => {
                return Err(AppError::validation(
                    "a customer is marked installed by completing the installation",
                ))
            }
            CustomerStatus::Enquiry => {
                return Err(AppError::validation(
                    "a customer cannot be moved back to enquiry",
                ))
            }
            _ => {}
        }

        self.db.with_transaction(|conn| {
            let mut customer = load_customer(conn, customer_id)?;
            ensure_visible(ctx, &customer)?;
            if customer.status.is_closed_won() {
                return Err(AppError::conflict(format!(
                    "customer {customer_id} is already {}",
                    customer.status
                )));
            }
            if customer.status == status {
                return Ok(Outcome::quiet(customer));
            }

            let previous = customer.status;
            customer.status = status;
            persist(conn, &mut customer, ctx.now)?;

            let notifications = activity_service::apply_effects(
                conn,
                ctx,
                vec![Effect::activity(
                    format!("Status updated: {}", customer.name),
                    format!("{} -> {}", previous.label(), status.label()),
                )],
            )?;
            debug!(target: "crm::customer", %customer_id, from = %previous, to = %status, "status changed");
            Ok(Outcome::new(customer, notifications))
        })
    }

    pub fn record_contact(&self, ctx: &RequestContext, customer_id: &str) -> AppResult<CustomerRecord> {
        self.db.with_transaction(|conn| {
            let mut customer = load_customer(conn, customer_id)?;
            ensure_visible(ctx, &customer)?;
            customer.last_contacted = Some(ctx.now);
            persist(conn, &mut customer, ctx.now)?;
            Ok(customer)
        })
    }

    /// Hands a customer to a rep. The first assignment also schedules the
    /// welcome call.
    pub fn assign_rep(
        &self,
        ctx: &RequestContext,
        customer_id: &str,
        rep_id: &str,
    ) -> AppResult<Outcome<CustomerRecord>> {
        if !ctx.principal.role.sees_everything() {
            return Err(AppError::forbidden("only admins can assign customers"));
        }

        self.db.with_transaction(|conn| {
            let mut customer = load_customer(conn, customer_id)?;
            let rep = load_rep(conn, rep_id)?;
            let first_assignment = customer.assigned_rep_id.is_none();

            customer.assigned_rep_id = Some(rep.id.clone());
            persist(conn, &mut customer, ctx.now)?;

            if first_assignment {
                schedule_welcome_call(conn, &customer.id, &rep.id, ctx.now)?;
            }

            let notifications = activity_service::apply_effects(
                conn,
                ctx,
                vec![
                    Effect::activity(
                        format!("Customer assigned: {}", customer.name),
                        format!("Assigned to {}", rep.name),
                    ),
                    Effect::notify(
                        &rep.id,
                        "New customer assigned",
                        format!(
                            "{} ({}) has been assigned to you.",
                            customer.name, customer.postcode
                        ),
                    ),
                ],
            )?;
            Ok(Outcome::new(customer, notifications))
        })
    }

    pub fn get_customer(&self, ctx: &RequestContext, customer_id: &str) -> AppResult<CustomerRecord> {
        let customer = self
            .db
            .with_connection(|conn| load_customer(conn, customer_id))?;
        ensure_visible(ctx, &customer)?;
        Ok(customer)
    }

    /// Every customer for admins and owners; a rep's own book otherwise.
    /// Newest first.
    pub fn list_customers(&self, ctx: &RequestContext) -> AppResult<Vec<CustomerRecord>> {
        let rows = self.db.with_connection(|conn| match ctx.scope() {
            Scope::All => CustomerRepository::list_all(conn),
            Scope::Rep(rep_id) => CustomerRepository::list_by_rep(conn, &rep_id),
        })?;
        let customers = rows
            .into_iter()
            .map(|row| row.into_record())
            .collect::<AppResult<Vec<_>>>()?;
        debug!(target: "crm::customer", count = customers.len(), "customers listed");
        Ok(customers)
    }

    pub fn search(
        &self,
        ctx: &RequestContext,
        criteria: &CustomerFilter,
    ) -> AppResult<Vec<CustomerRecord>> {
        let customers = self.list_customers(ctx)?;
        Ok(filter(&customers, criteria).into_iter().cloned().collect())
    }
}

fn build_customer(ctx: &RequestContext, input: CustomerCreateInput) -> AppResult<CustomerRecord> {
    let name = required(&input.name, "name")?;
    let email = required(&input.email, "email")?;
    let mobile = required(&input.mobile, "mobile")?;
    let postcode = required(&input.postcode, "postcode")?;

    let heating_system = normalize_optional(input.heating_system);
    let installation_type =
        normalize_optional(input.installation_type).and_then(|raw| {
            match InstallationType::try_from(raw.as_str()) {
                Ok(kind) => Some(kind),
                Err(_) => {
                    warn!(target: "crm::customer", installation_type = %raw, "unknown installation type, valued at 0");
                    None
                }
            }
        });
    let estimated_value = installation_type.map_or(0.0, estimation::estimated_value);

    Ok(CustomerRecord {
        id: uuid::Uuid::new_v4().to_string(),
        name,
        email,
        mobile,
        postcode,
        address: normalize_optional(input.address).unwrap_or_default(),
        property_type: normalize_optional(input.property_type),
        bus_grant_eligible: is_bus_grant_eligible(heating_system.as_deref()),
        heating_system,
        installation_type,
        estimated_value,
        notes: normalize_optional(input.notes),
        status: CustomerStatus::Enquiry,
        assigned_rep_id: normalize_optional(input.assigned_rep_id),
        deposit_received: false,
        deposit_amount: None,
        deposit_received_date: None,
        installation_completed_date: None,
        created_by: ctx.actor_id().to_string(),
        created_at: ctx.now,
        last_contacted: Some(ctx.now),
        updated_at: ctx.now,
        version: 0,
    })
}

fn required(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|val| {
        let trimmed = val.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    })
}

pub(crate) fn load_customer(conn: &Connection, customer_id: &str) -> AppResult<CustomerRecord> {
    CustomerRepository::find_by_id(conn, customer_id)?
        .ok_or_else(AppError::not_found)?
        .into_record()
}

fn load_rep(conn: &Connection, rep_id: &str) -> AppResult<RepRecord> {
    RepRepository::find_by_id(conn, rep_id)?
        .ok_or_else(AppError::not_found)?
        .into_record()
}

fn persist(conn: &Connection, customer: &mut CustomerRecord, now: DateTime<Utc>) -> AppResult<()> {
    customer.updated_at = now;
    customer.version = CustomerRepository::update_versioned(conn, &CustomerRow::from_record(customer))?;
    Ok(())
}

fn schedule_welcome_call(
    conn: &Connection,
    customer_id: &str,
    rep_id: &str,
    now: DateTime<Utc>,
) -> AppResult<()> {
    let task = task_service::build_auto_task(
        customer_id,
        rep_id,
        TaskType::WelcomeCall,
        TaskType::WelcomeCall.label(),
        None,
        now,
    );
    task_service::insert(conn, &task)
}

/// Reps may only act on customers assigned to them.
pub(crate) fn ensure_visible(ctx: &RequestContext, customer: &CustomerRecord) -> AppResult<()> {
    match ctx.scope() {
        Scope::All => Ok(()),
        Scope::Rep(rep_id) if customer.assigned_rep_id.as_deref() == Some(rep_id.as_str()) => {
            Ok(())
        }
        Scope::Rep(_) => Err(AppError::forbidden(format!(
            "customer {} is assigned to another rep",
            customer.id
        ))),
    }
}

fn deposit_notice(customer: &CustomerRecord, commission: &CommissionRecord) -> String {
    let paid_on = commission
        .deposit_paid_date
        .unwrap_or(commission.created_at);
    format!(
        "Congratulations! Deposit received for {}.\n\n\
         Sale Value: {}\n\
         Your Commission (5% total): {}\n\n\
         50% now due to you: {}\n\
         Payment date: End of week {}\n\n\
         Remaining 50% due when installation completed.",
        customer.name,
        format_gbp(commission.total_sale_price),
        format_gbp(commission.commission_amount),
        format_gbp(commission.deposit_commission),
        format_day(&paid_on),
    )
}

fn final_notice(customer: &CustomerRecord, commission: &CommissionRecord) -> String {
    format!(
        "Installation completed for {}.\n\n\
         Total Commission: {}\n\
         First payment (deposit): {} (already paid)\n\
         Final payment due: {}",
        customer.name,
        format_gbp(commission.commission_amount),
        format_gbp(commission.deposit_commission),
        format_gbp(commission.final_commission),
    )
}
