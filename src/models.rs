// src/models.rs

pub mod auth;
pub mod dashboard;
pub mod document;
pub mod finance;
pub mod incident;
pub mod meeting;
pub mod member;
pub mod notification;
pub mod project;
pub mod resource;
