// src/models/dashboard.rs

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{
    auth::Role,
    incident::Incident,
    meeting::Meeting,
    project::{Project, SubProject},
};

// O painel muda de forma conforme o papel
#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Dashboard {
    Overview(Overview),
    Assignments(Assignments),
}

// 1. Contagens e totais (só do que o papel pode listar)
#[derive(Debug, Serialize, ToSchema)]
pub struct Overview {
    pub role: Role,

    #[serde(rename = "nbr_projets", skip_serializing_if = "Option::is_none")]
    pub projects: Option<i64>,
    #[serde(rename = "nbr_sous_projets", skip_serializing_if = "Option::is_none")]
    pub sub_projects: Option<i64>,
    #[serde(rename = "nbr_reunions", skip_serializing_if = "Option::is_none")]
    pub meetings: Option<i64>,
    #[serde(rename = "nbr_incidents", skip_serializing_if = "Option::is_none")]
    pub incidents: Option<i64>,
    #[serde(rename = "nbr_documents", skip_serializing_if = "Option::is_none")]
    pub documents: Option<i64>,
    #[serde(rename = "nbr_factures", skip_serializing_if = "Option::is_none")]
    pub invoices: Option<i64>,
    #[serde(rename = "nbr_aps", skip_serializing_if = "Option::is_none")]
    pub budget_lines: Option<i64>,
    #[serde(rename = "nbr_marches", skip_serializing_if = "Option::is_none")]
    pub markets: Option<i64>,

    // Soma dos orçamentos dos projetos
    #[serde(rename = "total_marche", skip_serializing_if = "Option::is_none")]
    pub total_committed: Option<Decimal>,
    // Soma das AP
    #[serde(rename = "total_ap", skip_serializing_if = "Option::is_none")]
    pub total_authorised: Option<Decimal>,
    // Soma dos TTC faturados
    #[serde(rename = "total_facture", skip_serializing_if = "Option::is_none")]
    pub total_invoiced: Option<Decimal>,
}

impl Overview {
    pub fn empty(role: Role) -> Self {
        Self {
            role,
            projects: None,
            sub_projects: None,
            meetings: None,
            incidents: None,
            documents: None,
            invoices: None,
            budget_lines: None,
            markets: None,
            total_committed: None,
            total_authorised: None,
            total_invoiced: None,
        }
    }
}

// 2. Visão do funcionário: onde está alocado e o que decorre disso
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct Assignments {
    #[serde(rename = "projets")]
    pub projects: Vec<Project>,
    #[serde(rename = "sous_projets")]
    pub sub_projects: Vec<SubProject>,
    #[serde(rename = "reunions")]
    pub meetings: Vec<Meeting>,
    pub incidents: Vec<Incident>,
}
