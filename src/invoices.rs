use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "pending",
            InvoiceStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(InvoiceStatus::Pending),
            "paid" => Some(InvoiceStatus::Paid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    pub customer_name: String,
    pub amount: f64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: InvoiceStatus,
    pub user_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInvoicePayload {
    pub invoice_number: String,
    pub customer_name: String,
    pub amount: f64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[serde(default = "default_status_pending")]
    pub status: InvoiceStatus,
}

fn default_status_pending() -> InvoiceStatus {
    InvoiceStatus::Pending
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_pending_amount: f64,
    pub payments_due_today: i64,
    pub completed_this_month: i64,
    pub overdue_payments: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpectedCollection {
    pub amount: f64,
    pub period: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverdueInvoice {
    pub customer_name: String,
    pub days_overdue: i64,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MonthlyTrendPoint {
    pub month: String,
    pub paid: f64,
    pub pending: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentStatusCounts {
    pub paid: i64,
    pub pending: i64,
    pub overdue: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardAnalytics {
    #[serde(rename = "monthlyTrend")]
    pub monthly_trend: Vec<MonthlyTrendPoint>,
    #[serde(rename = "paymentStatus")]
    pub payment_status: PaymentStatusCounts,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardReport {
    pub stats: DashboardStats,
    pub expected_collection: ExpectedCollection,
    pub top_overdue: Vec<OverdueInvoice>,
    pub analytics: DashboardAnalytics,
}

#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn create_invoice(
        &self,
        user_id: &str,
        payload: CreateInvoicePayload,
    ) -> Result<Invoice, AppError>;
    async fn get_invoice(&self, id: &str) -> Result<Option<Invoice>, AppError>;
    async fn list_invoices_for_user(&self, user_id: &str) -> Result<Vec<Invoice>, AppError>;
    async fn list_invoices(&self) -> Result<Vec<Invoice>, AppError>;
    async fn dashboard_report(&self, today: NaiveDate) -> Result<DashboardReport, AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invoice_status_roundtrip() {
        for (s, expected) in [
            ("pending", InvoiceStatus::Pending),
            ("paid", InvoiceStatus::Paid),
        ] {
            assert_eq!(InvoiceStatus::parse(s).unwrap().as_str(), expected.as_str());
        }
        assert!(InvoiceStatus::parse("overdue").is_none());
    }
}
