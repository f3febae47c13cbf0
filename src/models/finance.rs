// src/models/finance.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{query_builder::Separated, FromRow, Postgres};
use uuid::Uuid;
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    common::error::AppError,
    models::resource::{
        require_parent, DateWindow, Parent, ParentLinks, Record, Resource, ResourceKind,
        ScopeColumns, ScopeKeys, WindowSource, WorkflowMode,
    },
};

// =============================================================================
//  FACTURE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "invoice_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    #[default]
    #[serde(alias = "recue")]
    Received,
    #[serde(alias = "validee")]
    Validated,
    #[serde(alias = "payee")]
    Paid,
    #[serde(alias = "rejetee")]
    Rejected,
}

impl InvoiceStatus {
    pub fn can_become(self, next: InvoiceStatus) -> bool {
        use InvoiceStatus::*;

        self == next
            || matches!(
                (self, next),
                (Received, Validated) | (Received, Rejected) | (Validated, Paid) | (Validated, Rejected)
            )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct InvoiceFields {
    #[serde(rename = "numero_facture")]
    pub number: i32,

    #[serde(default)]
    #[validate(length(max = 300))]
    pub designation: String,

    #[serde(rename = "date_facturation")]
    pub billing_date: NaiveDate,

    #[serde(rename = "date_reception")]
    pub reception_date: NaiveDate,

    #[serde(rename = "brut_ht")]
    pub gross_amount: Decimal,

    #[serde(rename = "montant_net_ht")]
    pub net_amount: Decimal,

    #[serde(rename = "montant_tva")]
    pub vat_amount: Decimal,

    #[serde(rename = "montant_ttc")]
    pub total_amount: Decimal,

    #[serde(rename = "date_ordre_virement", default)]
    pub transfer_order_date: Option<NaiveDate>,

    #[serde(rename = "numero_ordre_virement", default)]
    pub transfer_order_number: Option<i32>,

    #[serde(rename = "statut", default)]
    pub status: InvoiceStatus,

    #[serde(rename = "id_projet", default)]
    pub project_id: Option<Uuid>,

    #[serde(rename = "id_sous_projet", default)]
    pub sub_project_id: Option<Uuid>,

    #[serde(rename = "id_marche", default)]
    pub market_id: Option<Uuid>,

    #[serde(rename = "id_ap", default)]
    pub budget_line_id: Option<Uuid>,
}

impl Record for InvoiceFields {
    const COLUMNS: &'static [&'static str] = &[
        "number",
        "designation",
        "billing_date",
        "reception_date",
        "gross_amount",
        "net_amount",
        "vat_amount",
        "total_amount",
        "transfer_order_date",
        "transfer_order_number",
        "status",
        "project_id",
        "sub_project_id",
        "market_id",
        "budget_line_id",
    ];

    fn push_values<'args>(self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.number)
            .push_bind(self.designation)
            .push_bind(self.billing_date)
            .push_bind(self.reception_date)
            .push_bind(self.gross_amount)
            .push_bind(self.net_amount)
            .push_bind(self.vat_amount)
            .push_bind(self.total_amount)
            .push_bind(self.transfer_order_date)
            .push_bind(self.transfer_order_number)
            .push_bind(self.status)
            .push_bind(self.project_id)
            .push_bind(self.sub_project_id)
            .push_bind(self.market_id)
            .push_bind(self.budget_line_id);
    }

    fn scope_keys(&self) -> ScopeKeys {
        ScopeKeys { project: self.project_id, sub_project: self.sub_project_id }
    }

    // Marché e AP também têm de ser do projeto da fatura
    fn links(&self) -> ParentLinks {
        ParentLinks {
            project: self.project_id,
            sub_project: self.sub_project_id,
            market: self.market_id,
            budget_line: self.budget_line_id,
        }
    }

    // A data de faturamento é comparada com o início do sous-projet, ou do projeto.
    fn window_source(&self) -> Option<WindowSource> {
        self.sub_project_id
            .map(WindowSource::SubProject)
            .or(self.project_id.map(WindowSource::Project))
    }

    fn check(&self, window: Option<&DateWindow>) -> Result<(), AppError> {
        require_parent(self.project_id, self.sub_project_id)?;

        if self.billing_date > self.reception_date {
            return Err(AppError::field(
                "date_facturation",
                "date_order",
                "A data de faturamento não pode ser posterior à data de recepção.",
            ));
        }

        let amounts = [
            ("brut_ht", self.gross_amount),
            ("montant_net_ht", self.net_amount),
            ("montant_tva", self.vat_amount),
            ("montant_ttc", self.total_amount),
        ];
        for (field, amount) in amounts {
            if amount < Decimal::ZERO {
                return Err(AppError::field(field, "negative", "O valor não pode ser negativo."));
            }
        }

        if self.total_amount < self.gross_amount {
            return Err(AppError::field(
                "montant_ttc",
                "amount_order",
                "O montante TTC deve ser maior ou igual ao bruto HT.",
            ));
        }

        if let Some(window) = window {
            if self.billing_date < window.start_date {
                return Err(AppError::field(
                    "date_facturation",
                    "before_parent",
                    "A data de faturamento não pode ser anterior ao início do projeto.",
                ));
            }
        }
        Ok(())
    }

    fn check_transition(&self, before: &Self, mode: WorkflowMode) -> Result<(), AppError> {
        if mode == WorkflowMode::Strict && !before.status.can_become(self.status) {
            return Err(AppError::field(
                "statut",
                "invalid_transition",
                format!("Transição de status não permitida: {:?} -> {:?}.", before.status, self.status),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Invoice {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: InvoiceFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for Invoice {
    type Fields = InvoiceFields;

    const KIND: ResourceKind = ResourceKind::Invoice;
    const LABEL: &'static str = "Fatura";
    const TABLE: &'static str = "invoices";
    const SCOPE: ScopeColumns = ScopeColumns::both("project_id", "sub_project_id");
    const ORDER_BY: &'static str = "billing_date DESC, created_at DESC";
    const PARENTS: &'static [Parent] = &[
        Parent { segment: "projet", column: "project_id" },
        Parent { segment: "sous-projet", column: "sub_project_id" },
        Parent { segment: "marche", column: "market_id" },
    ];

    fn id(&self) -> Uuid {
        self.id
    }

    fn fields(&self) -> &InvoiceFields {
        &self.fields
    }
}

// =============================================================================
//  AP (linha orçamentária)
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct BudgetLineFields {
    #[serde(rename = "id_projet")]
    pub project_id: Uuid,

    #[serde(rename = "libelle", default)]
    #[validate(length(max = 200))]
    pub label: String,

    #[serde(rename = "montant_ap")]
    pub amount: Decimal,
}

impl Record for BudgetLineFields {
    const COLUMNS: &'static [&'static str] = &["project_id", "label", "amount"];

    fn push_values<'args>(self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.project_id)
            .push_bind(self.label)
            .push_bind(self.amount);
    }

    fn scope_keys(&self) -> ScopeKeys {
        ScopeKeys { project: Some(self.project_id), sub_project: None }
    }

    fn check(&self, _window: Option<&DateWindow>) -> Result<(), AppError> {
        if self.amount <= Decimal::ZERO {
            return Err(AppError::field(
                "montant_ap",
                "positive",
                "O montante da AP deve ser maior que zero.",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct BudgetLine {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: BudgetLineFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for BudgetLine {
    type Fields = BudgetLineFields;

    const KIND: ResourceKind = ResourceKind::Budget;
    const LABEL: &'static str = "AP";
    const TABLE: &'static str = "budget_lines";
    const SCOPE: ScopeColumns = ScopeColumns::project("project_id");
    const PARENTS: &'static [Parent] = &[Parent { segment: "projet", column: "project_id" }];

    fn id(&self) -> Uuid {
        self.id
    }

    fn fields(&self) -> &BudgetLineFields {
        &self.fields
    }
}

// =============================================================================
//  MARCHÉ
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate, FromRow, ToSchema)]
pub struct MarketFields {
    #[serde(rename = "id_projet")]
    pub project_id: Uuid,

    #[serde(rename = "numero_marche")]
    pub number: i32,

    #[validate(length(min = 1, max = 300, message = "A descrição é obrigatória."))]
    pub description: String,

    #[serde(rename = "date_marche")]
    pub market_date: NaiveDate,

    #[serde(rename = "montant", default)]
    pub amount: Option<Decimal>,

    #[serde(rename = "titulaire", default)]
    #[validate(length(max = 100))]
    pub contractor: Option<String>,
}

impl Record for MarketFields {
    const COLUMNS: &'static [&'static str] = &[
        "project_id",
        "number",
        "description",
        "market_date",
        "amount",
        "contractor",
    ];

    fn push_values<'args>(self, values: &mut Separated<'_, 'args, Postgres, &'static str>) {
        values
            .push_bind(self.project_id)
            .push_bind(self.number)
            .push_bind(self.description)
            .push_bind(self.market_date)
            .push_bind(self.amount)
            .push_bind(self.contractor);
    }

    fn scope_keys(&self) -> ScopeKeys {
        ScopeKeys { project: Some(self.project_id), sub_project: None }
    }

    fn check(&self, _window: Option<&DateWindow>) -> Result<(), AppError> {
        if self.amount.is_some_and(|a| a < Decimal::ZERO) {
            return Err(AppError::field("montant", "negative", "O valor não pode ser negativo."));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
pub struct Market {
    pub id: Uuid,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub fields: MarketFields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for Market {
    type Fields = MarketFields;

    const KIND: ResourceKind = ResourceKind::Market;
    const LABEL: &'static str = "Marché";
    const TABLE: &'static str = "markets";
    const SCOPE: ScopeColumns = ScopeColumns::project("project_id");
    const ORDER_BY: &'static str = "market_date DESC, created_at DESC";
    const PARENTS: &'static [Parent] = &[Parent { segment: "projet", column: "project_id" }];

    fn id(&self) -> Uuid {
        self.id
    }

    fn fields(&self) -> &MarketFields {
        &self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn dec(v: f64) -> Decimal {
        Decimal::from_f64(v).unwrap()
    }

    fn invoice() -> InvoiceFields {
        InvoiceFields {
            number: 17,
            designation: "Situation n°1".into(),
            billing_date: date(2025, 3, 1),
            reception_date: date(2025, 3, 5),
            gross_amount: dec(1000.0),
            net_amount: dec(1000.0),
            vat_amount: dec(190.0),
            total_amount: dec(1190.0),
            transfer_order_date: None,
            transfer_order_number: None,
            status: InvoiceStatus::Received,
            project_id: Some(Uuid::new_v4()),
            sub_project_id: None,
            market_id: None,
            budget_line_id: None,
        }
    }

    #[test]
    fn valid_invoice_passes() {
        assert!(invoice().check(None).is_ok());
    }

    #[test]
    fn billing_after_reception_is_rejected() {
        let mut fields = invoice();
        fields.billing_date = date(2025, 3, 10);
        assert!(fields.check(None).is_err());
    }

    #[test]
    fn total_below_gross_is_rejected() {
        let mut fields = invoice();
        fields.total_amount = dec(999.0);
        assert!(fields.check(None).is_err());
    }

    #[test]
    fn billing_before_parent_start_is_rejected() {
        let window = DateWindow { start_date: date(2025, 4, 1), end_date: date(2025, 12, 31) };
        assert!(invoice().check(Some(&window)).is_err());
    }

    #[test]
    fn sub_project_window_wins_over_project() {
        let mut fields = invoice();
        let sub = Uuid::new_v4();
        fields.sub_project_id = Some(sub);
        assert_eq!(fields.window_source(), Some(WindowSource::SubProject(sub)));
    }

    #[test]
    fn market_and_budget_line_take_part_in_the_project_check() {
        let mut fields = invoice();
        assert!(!fields.links().needs_check());

        fields.market_id = Some(Uuid::new_v4());
        let links = fields.links();
        assert!(links.needs_check());
        assert_eq!(links.project, fields.project_id);
        assert_eq!(links.market, fields.market_id);
    }

    #[test]
    fn paid_invoice_cannot_go_back_in_strict_mode() {
        let mut before = invoice();
        before.status = InvoiceStatus::Paid;
        let after = invoice();

        assert!(after.check_transition(&before, WorkflowMode::Strict).is_err());
        assert!(after.check_transition(&before, WorkflowMode::Open).is_ok());
    }

    #[test]
    fn budget_amount_must_be_positive() {
        let mut line = BudgetLineFields {
            project_id: Uuid::new_v4(),
            label: "AP 2025".into(),
            amount: Decimal::ZERO,
        };
        assert!(line.check(None).is_err());
        line.amount = dec(50_000.0);
        assert!(line.check(None).is_ok());
    }
}
