use async_trait::async_trait;
use chrono::NaiveDate;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::error::AppError;
use crate::invoices::{
    CreateInvoicePayload, DashboardAnalytics, DashboardReport, DashboardStats, ExpectedCollection,
    Invoice, InvoiceStatus, InvoiceStore, MonthlyTrendPoint, OverdueInvoice, PaymentStatusCounts,
};
use crate::storage::database::Database;
use crate::storage::time::{parse_date_string, to_date_string};

fn row_to_invoice(row: &rusqlite::Row<'_>) -> rusqlite::Result<Invoice> {
    let issue_date_s: String = row.get(4)?;
    let due_date_s: String = row.get(5)?;
    let status_s: String = row.get(6)?;
    Ok(Invoice {
        id: row.get(0)?,
        invoice_number: row.get(1)?,
        customer_name: row.get(2)?,
        amount: row.get(3)?,
        issue_date: parse_date_string(&issue_date_s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?,
        due_date: parse_date_string(&due_date_s).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                5,
                rusqlite::types::Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?,
        status: InvoiceStatus::parse(&status_s).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(6, "status".into(), rusqlite::types::Type::Text)
        })?,
        user_id: row.get(7)?,
    })
}

fn month_label(mm: &str) -> &'static str {
    match mm {
        "01" => "Jan",
        "02" => "Feb",
        "03" => "Mar",
        "04" => "Apr",
        "05" => "May",
        "06" => "Jun",
        "07" => "Jul",
        "08" => "Aug",
        "09" => "Sep",
        "10" => "Oct",
        "11" => "Nov",
        "12" => "Dec",
        _ => "???",
    }
}

const INVOICE_COLUMNS: &str =
    "id, invoice_number, customer_name, amount, issue_date, due_date, status, user_id";

#[async_trait]
impl InvoiceStore for Database {
    async fn create_invoice(
        &self,
        user_id: &str,
        payload: CreateInvoicePayload,
    ) -> Result<Invoice, AppError> {
        let id = Uuid::new_v4().to_string();
        let conn = self.connection.lock().await;

        let exists: Option<String> = conn
            .query_row(
                "SELECT id FROM invoices WHERE invoice_number = ?1",
                [&payload.invoice_number],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(AppError::Conflict("Invoice number already in use".into()));
        }

        conn.execute(
            "INSERT INTO invoices (id, invoice_number, customer_name, amount, issue_date, due_date, status, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                &id,
                &payload.invoice_number,
                &payload.customer_name,
                payload.amount,
                to_date_string(&payload.issue_date),
                to_date_string(&payload.due_date),
                payload.status.as_str(),
                user_id,
            ],
        )?;

        Ok(Invoice {
            id,
            invoice_number: payload.invoice_number,
            customer_name: payload.customer_name,
            amount: payload.amount,
            issue_date: payload.issue_date,
            due_date: payload.due_date,
            status: payload.status,
            user_id: user_id.to_string(),
        })
    }

    async fn get_invoice(&self, id: &str) -> Result<Option<Invoice>, AppError> {
        let conn = self.connection.lock().await;
        let invoice = conn
            .query_row(
                &format!("SELECT {} FROM invoices WHERE id = ?1", INVOICE_COLUMNS),
                [id],
                row_to_invoice,
            )
            .optional()?;
        Ok(invoice)
    }

    async fn list_invoices_for_user(&self, user_id: &str) -> Result<Vec<Invoice>, AppError> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM invoices WHERE user_id = ?1 ORDER BY due_date, invoice_number",
            INVOICE_COLUMNS
        ))?;
        let invoice_iter = stmt.query_map([user_id], row_to_invoice)?;

        let mut invoices = Vec::new();
        for invoice in invoice_iter {
            invoices.push(invoice?);
        }
        Ok(invoices)
    }

    async fn list_invoices(&self) -> Result<Vec<Invoice>, AppError> {
        let conn = self.connection.lock().await;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM invoices ORDER BY due_date, invoice_number",
            INVOICE_COLUMNS
        ))?;
        let invoice_iter = stmt.query_map([], row_to_invoice)?;

        let mut invoices = Vec::new();
        for invoice in invoice_iter {
            invoices.push(invoice?);
        }
        Ok(invoices)
    }

    async fn dashboard_report(&self, today: NaiveDate) -> Result<DashboardReport, AppError> {
        let conn = self.connection.lock().await;
        let today_s = to_date_string(&today);
        let week_end_s = to_date_string(&(today + chrono::Duration::days(7)));
        let month_s = today.format("%Y-%m").to_string();

        let total_pending_amount: f64 = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM invoices WHERE status = 'pending'",
            [],
            |row| row.get(0),
        )?;

        let payments_due_today: i64 = conn.query_row(
            "SELECT COUNT(*) FROM invoices WHERE due_date = ?1 AND status = 'pending'",
            [&today_s],
            |row| row.get(0),
        )?;

        let completed_this_month: i64 = conn.query_row(
            "SELECT COUNT(*) FROM invoices
             WHERE status = 'paid' AND strftime('%Y-%m', issue_date) = ?1",
            [&month_s],
            |row| row.get(0),
        )?;

        let overdue_payments: i64 = conn.query_row(
            "SELECT COUNT(*) FROM invoices WHERE due_date < ?1 AND status = 'pending'",
            [&today_s],
            |row| row.get(0),
        )?;

        let expected_amount: f64 = conn.query_row(
            "SELECT COALESCE(SUM(amount), 0) FROM invoices
             WHERE due_date BETWEEN ?1 AND ?2 AND status = 'pending'",
            rusqlite::params![&today_s, &week_end_s],
            |row| row.get(0),
        )?;

        let mut top_overdue = Vec::new();
        {
            let mut stmt = conn.prepare(
                "SELECT customer_name, due_date, amount FROM invoices
                 WHERE due_date < ?1 AND status = 'pending'
                 ORDER BY due_date ASC LIMIT 3",
            )?;
            let rows = stmt.query_map([&today_s], |row| {
                let customer_name: String = row.get(0)?;
                let due_date_s: String = row.get(1)?;
                let amount: f64 = row.get(2)?;
                Ok((customer_name, due_date_s, amount))
            })?;
            for row in rows {
                let (customer_name, due_date_s, amount) = row?;
                let due_date = parse_date_string(&due_date_s)?;
                top_overdue.push(OverdueInvoice {
                    customer_name,
                    days_overdue: (today - due_date).num_days(),
                    amount,
                });
            }
        }

        let mut monthly_trend = Vec::new();
        {
            let mut stmt = conn.prepare(
                "SELECT strftime('%m', issue_date) AS month,
                        SUM(CASE WHEN status = 'paid' THEN amount ELSE 0 END) AS paid,
                        SUM(CASE WHEN status = 'pending' THEN amount ELSE 0 END) AS pending
                 FROM invoices GROUP BY month ORDER BY month",
            )?;
            let rows = stmt.query_map([], |row| {
                let month: String = row.get(0)?;
                let paid: f64 = row.get(1)?;
                let pending: f64 = row.get(2)?;
                Ok((month, paid, pending))
            })?;
            for row in rows {
                let (month, paid, pending) = row?;
                monthly_trend.push(MonthlyTrendPoint {
                    month: month_label(&month).to_string(),
                    paid,
                    pending,
                });
            }
        }

        let paid_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM invoices WHERE status = 'paid'",
            [],
            |row| row.get(0),
        )?;
        let pending_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM invoices WHERE status = 'pending' AND due_date >= ?1",
            [&today_s],
            |row| row.get(0),
        )?;

        Ok(DashboardReport {
            stats: DashboardStats {
                total_pending_amount,
                payments_due_today,
                completed_this_month,
                overdue_payments,
            },
            expected_collection: ExpectedCollection {
                amount: expected_amount,
                period: "this_week".to_string(),
            },
            top_overdue,
            analytics: DashboardAnalytics {
                monthly_trend,
                payment_status: PaymentStatusCounts {
                    paid: paid_count,
                    pending: pending_count,
                    overdue: overdue_payments,
                },
            },
        })
    }
}
