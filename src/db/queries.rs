use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Appointment, AppointmentDetails, AppointmentStatus, Barber, Client, ClientWithPlan, Location,
    PaymentStatus, Plan, Service, TimeInterval, TimeOfDay,
};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const APPOINTMENT_COLUMNS: &str = "a.id, a.client_id, a.barber_id, a.location_id, a.service_id, \
     a.appointment_date, a.start_time, a.end_time, a.status, a.payment_method, a.payment_status, \
     a.notes, a.created_at, a.updated_at";

fn now_timestamp() -> String {
    Utc::now().naive_utc().format(TIMESTAMP_FORMAT).to_string()
}

// ── Locations ──

pub fn insert_location(conn: &Connection, location: &Location) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO locations (id, name, address) VALUES (?1, ?2, ?3)",
        params![location.id, location.name, location.address],
    )?;
    Ok(())
}

pub fn list_locations(conn: &Connection) -> anyhow::Result<Vec<Location>> {
    let mut stmt = conn.prepare("SELECT id, name, address FROM locations ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Location {
            id: row.get(0)?,
            name: row.get(1)?,
            address: row.get(2)?,
        })
    })?;

    let mut locations = vec![];
    for row in rows {
        locations.push(row?);
    }
    Ok(locations)
}

pub fn location_exists(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM locations WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

// ── Plans ──

pub fn insert_plan(conn: &Connection, plan: &Plan) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO plans (id, name, price_cents, cuts_per_month) VALUES (?1, ?2, ?3, ?4)",
        params![plan.id, plan.name, plan.price_cents, plan.cuts_per_month],
    )?;
    Ok(())
}

pub fn list_plans(conn: &Connection) -> anyhow::Result<Vec<Plan>> {
    let mut stmt =
        conn.prepare("SELECT id, name, price_cents, cuts_per_month FROM plans ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Plan {
            id: row.get(0)?,
            name: row.get(1)?,
            price_cents: row.get(2)?,
            cuts_per_month: row.get(3)?,
        })
    })?;

    let mut plans = vec![];
    for row in rows {
        plans.push(row?);
    }
    Ok(plans)
}

pub fn get_plan(conn: &Connection, id: &str) -> anyhow::Result<Option<Plan>> {
    let plan = conn
        .query_row(
            "SELECT id, name, price_cents, cuts_per_month FROM plans WHERE id = ?1",
            params![id],
            |row| {
                Ok(Plan {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    price_cents: row.get(2)?,
                    cuts_per_month: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(plan)
}

// ── Clients ──

pub fn insert_client(conn: &Connection, client: &Client) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO clients (id, name, phone, plan_id) VALUES (?1, ?2, ?3, ?4)",
        params![client.id, client.name, client.phone, client.plan_id],
    )?;
    Ok(())
}

pub fn list_clients(conn: &Connection) -> anyhow::Result<Vec<Client>> {
    let mut stmt = conn.prepare("SELECT id, name, phone, plan_id FROM clients ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Client {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            plan_id: row.get(3)?,
        })
    })?;

    let mut clients = vec![];
    for row in rows {
        clients.push(row?);
    }
    Ok(clients)
}

pub fn get_client(conn: &Connection, id: &str) -> anyhow::Result<Option<Client>> {
    let client = conn
        .query_row(
            "SELECT id, name, phone, plan_id FROM clients WHERE id = ?1",
            params![id],
            |row| {
                Ok(Client {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    phone: row.get(2)?,
                    plan_id: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(client)
}

// ── Barbers ──

pub fn insert_barber(conn: &Connection, barber: &Barber) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO barbers (id, name, location_id, active) VALUES (?1, ?2, ?3, ?4)",
        params![barber.id, barber.name, barber.location_id, barber.active],
    )?;
    Ok(())
}

pub fn list_barbers(conn: &Connection) -> anyhow::Result<Vec<Barber>> {
    let mut stmt =
        conn.prepare("SELECT id, name, location_id, active FROM barbers ORDER BY name ASC")?;
    let rows = stmt.query_map([], |row| {
        Ok(Barber {
            id: row.get(0)?,
            name: row.get(1)?,
            location_id: row.get(2)?,
            active: row.get(3)?,
        })
    })?;

    let mut barbers = vec![];
    for row in rows {
        barbers.push(row?);
    }
    Ok(barbers)
}

pub fn get_barber(conn: &Connection, id: &str) -> anyhow::Result<Option<Barber>> {
    let barber = conn
        .query_row(
            "SELECT id, name, location_id, active FROM barbers WHERE id = ?1",
            params![id],
            |row| {
                Ok(Barber {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    location_id: row.get(2)?,
                    active: row.get(3)?,
                })
            },
        )
        .optional()?;
    Ok(barber)
}

// ── Services ──

pub fn insert_service(conn: &Connection, service: &Service) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO services (id, name, duration_minutes, price_cents, active) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            service.id,
            service.name,
            service.duration_minutes,
            service.price_cents,
            service.active,
        ],
    )?;
    Ok(())
}

pub fn list_services(conn: &Connection) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, duration_minutes, price_cents, active FROM services ORDER BY name ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(Service {
            id: row.get(0)?,
            name: row.get(1)?,
            duration_minutes: row.get(2)?,
            price_cents: row.get(3)?,
            active: row.get(4)?,
        })
    })?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

pub fn get_service(conn: &Connection, id: &str) -> anyhow::Result<Option<Service>> {
    let service = conn
        .query_row(
            "SELECT id, name, duration_minutes, price_cents, active FROM services WHERE id = ?1",
            params![id],
            |row| {
                Ok(Service {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    duration_minutes: row.get(2)?,
                    price_cents: row.get(3)?,
                    active: row.get(4)?,
                })
            },
        )
        .optional()?;
    Ok(service)
}

// ── Appointments ──

pub fn insert_appointment(conn: &Connection, appt: &Appointment) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO appointments (id, client_id, barber_id, location_id, service_id, appointment_date,
                                   start_time, end_time, status, payment_method, payment_status, notes,
                                   created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            appt.id,
            appt.client_id,
            appt.barber_id,
            appt.location_id,
            appt.service_id,
            appt.appointment_date.format(DATE_FORMAT).to_string(),
            appt.start_time.to_string(),
            appt.end_time.to_string(),
            appt.status.as_str(),
            appt.payment_method,
            appt.payment_status.as_str(),
            appt.notes,
            appt.created_at.format(TIMESTAMP_FORMAT).to_string(),
            appt.updated_at.format(TIMESTAMP_FORMAT).to_string(),
        ],
    )?;
    Ok(())
}

/// Overwrites every mutable column of the row with `appt`'s values.
pub fn update_appointment(conn: &Connection, appt: &Appointment) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET client_id = ?1, barber_id = ?2, location_id = ?3, service_id = ?4,
                appointment_date = ?5, start_time = ?6, end_time = ?7, status = ?8,
                payment_method = ?9, payment_status = ?10, notes = ?11, updated_at = ?12
         WHERE id = ?13",
        params![
            appt.client_id,
            appt.barber_id,
            appt.location_id,
            appt.service_id,
            appt.appointment_date.format(DATE_FORMAT).to_string(),
            appt.start_time.to_string(),
            appt.end_time.to_string(),
            appt.status.as_str(),
            appt.payment_method,
            appt.payment_status.as_str(),
            appt.notes,
            now_timestamp(),
            appt.id,
        ],
    )?;
    Ok(count > 0)
}

/// Moves an appointment to a new date and interval, leaving every other column as stored.
pub fn reschedule_appointment(
    conn: &Connection,
    id: &str,
    interval: &TimeInterval,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE appointments SET appointment_date = ?1, start_time = ?2, end_time = ?3, updated_at = ?4
         WHERE id = ?5",
        params![
            interval.date.format(DATE_FORMAT).to_string(),
            interval.start.to_string(),
            interval.end.to_string(),
            now_timestamp(),
            id,
        ],
    )?;
    Ok(count > 0)
}

pub fn update_appointment_status(
    conn: &Connection,
    id: &str,
    status: AppointmentStatus,
    payment_status: Option<PaymentStatus>,
) -> anyhow::Result<bool> {
    let count = match payment_status {
        Some(payment) => conn.execute(
            "UPDATE appointments SET status = ?1, payment_status = ?2, updated_at = ?3 WHERE id = ?4",
            params![status.as_str(), payment.as_str(), now_timestamp(), id],
        )?,
        None => conn.execute(
            "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), now_timestamp(), id],
        )?,
    };
    Ok(count > 0)
}

pub fn delete_appointment(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM appointments WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

pub fn get_appointment(conn: &Connection, id: &str) -> anyhow::Result<Option<Appointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments a WHERE a.id = ?1");
    let result = conn
        .query_row(&sql, params![id], |row| Ok(parse_appointment_row(row)))
        .optional()?;

    match result {
        Some(appt) => Ok(Some(appt?)),
        None => Ok(None),
    }
}

/// Active appointments of one barber on one date, the conflict candidate set.
pub fn active_appointments_for_barber(
    conn: &Connection,
    barber_id: &str,
    date: NaiveDate,
) -> anyhow::Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments a
         WHERE a.barber_id = ?1 AND a.appointment_date = ?2 AND a.status != 'cancelled'
         ORDER BY a.start_time ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![barber_id, date.format(DATE_FORMAT).to_string()],
        |row| Ok(parse_appointment_row(row)),
    )?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub date: Option<NaiveDate>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub barber_id: Option<String>,
    pub status: Option<AppointmentStatus>,
}

pub fn list_appointments(
    conn: &Connection,
    filter: &AppointmentFilter,
) -> anyhow::Result<Vec<AppointmentDetails>> {
    let mut clauses: Vec<String> = vec![];
    let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = vec![];

    if let Some(date) = filter.date {
        params_vec.push(Box::new(date.format(DATE_FORMAT).to_string()));
        clauses.push(format!("a.appointment_date = ?{}", params_vec.len()));
    }
    if let Some(from) = filter.from {
        params_vec.push(Box::new(from.format(DATE_FORMAT).to_string()));
        clauses.push(format!("a.appointment_date >= ?{}", params_vec.len()));
    }
    if let Some(to) = filter.to {
        params_vec.push(Box::new(to.format(DATE_FORMAT).to_string()));
        clauses.push(format!("a.appointment_date <= ?{}", params_vec.len()));
    }
    if let Some(barber_id) = &filter.barber_id {
        params_vec.push(Box::new(barber_id.clone()));
        clauses.push(format!("a.barber_id = ?{}", params_vec.len()));
    }
    if let Some(status) = filter.status {
        params_vec.push(Box::new(status.as_str()));
        clauses.push(format!("a.status = ?{}", params_vec.len()));
    }

    let where_sql = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };

    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS},
                c.id, c.name, c.phone, c.plan_id,
                p.id, p.name, p.price_cents, p.cuts_per_month,
                s.id, s.name, s.duration_minutes, s.price_cents, s.active
         FROM appointments a
         JOIN clients c ON c.id = a.client_id
         JOIN services s ON s.id = a.service_id
         LEFT JOIN plans p ON p.id = c.plan_id
         {where_sql}
         ORDER BY a.appointment_date ASC, a.start_time ASC"
    );

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_details_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn get_appointment_details(
    conn: &Connection,
    id: &str,
) -> anyhow::Result<Option<AppointmentDetails>> {
    let Some(appt) = get_appointment(conn, id)? else {
        return Ok(None);
    };
    let Some(client) = get_client(conn, &appt.client_id)? else {
        return Ok(None);
    };
    let Some(service) = get_service(conn, &appt.service_id)? else {
        return Ok(None);
    };
    let plan = match &client.plan_id {
        Some(plan_id) => get_plan(conn, plan_id)?,
        None => None,
    };

    Ok(Some(AppointmentDetails {
        appointment: appt,
        client: ClientWithPlan { client, plan },
        service,
    }))
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let date_str: String = row.get(5)?;
    let start_str: String = row.get(6)?;
    let end_str: String = row.get(7)?;
    let status_str: String = row.get(8)?;
    let payment_status_str: String = row.get(10)?;
    let created_at_str: String = row.get(12)?;
    let updated_at_str: String = row.get(13)?;

    let status = AppointmentStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown appointment status: {status_str}"))?;
    let payment_status = PaymentStatus::parse(&payment_status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown payment status: {payment_status_str}"))?;

    Ok(Appointment {
        id: row.get(0)?,
        client_id: row.get(1)?,
        barber_id: row.get(2)?,
        location_id: row.get(3)?,
        service_id: row.get(4)?,
        appointment_date: NaiveDate::parse_from_str(&date_str, DATE_FORMAT)?,
        start_time: TimeOfDay::parse(&start_str)?,
        end_time: TimeOfDay::parse(&end_str)?,
        status,
        payment_method: row.get(9)?,
        payment_status,
        notes: row.get(11)?,
        created_at: NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
        updated_at: NaiveDateTime::parse_from_str(&updated_at_str, TIMESTAMP_FORMAT)
            .unwrap_or_else(|_| Utc::now().naive_utc()),
    })
}

fn parse_details_row(row: &rusqlite::Row) -> anyhow::Result<AppointmentDetails> {
    let appointment = parse_appointment_row(row)?;

    let client = Client {
        id: row.get(14)?,
        name: row.get(15)?,
        phone: row.get(16)?,
        plan_id: row.get(17)?,
    };

    let plan_id: Option<String> = row.get(18)?;
    let plan = match plan_id {
        Some(id) => Some(Plan {
            id,
            name: row.get(19)?,
            price_cents: row.get(20)?,
            cuts_per_month: row.get(21)?,
        }),
        None => None,
    };

    let service = Service {
        id: row.get(22)?,
        name: row.get(23)?,
        duration_minutes: row.get(24)?,
        price_cents: row.get(25)?,
        active: row.get(26)?,
    };

    Ok(AppointmentDetails {
        appointment,
        client: ClientWithPlan { client, plan },
        service,
    })
}
