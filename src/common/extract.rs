// src/common/extract.rs

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts, Query, Request,
    },
    http::request::Parts,
    Json,
};
use serde::de::DeserializeOwned;

use crate::common::error::AppError;

// Json com a rejeição no mesmo envelope de erro do resto da API.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBody(value)),
            Err(rejection) => Err(reject(rejection)),
        }
    }
}

fn reject(rejection: JsonRejection) -> AppError {
    tracing::debug!("Corpo JSON recusado: {}", rejection.body_text());
    AppError::InvalidInput(format!("JSON inválido: {}", rejection.body_text()))
}

// Query string idem: `?page=abc` vira 400 no envelope padrão.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(QueryParams(value)),
            Err(rejection) => Err(reject_query(rejection)),
        }
    }
}

fn reject_query(rejection: QueryRejection) -> AppError {
    tracing::debug!("Query string recusada: {}", rejection.body_text());
    AppError::InvalidInput(format!("Parâmetros inválidos: {}", rejection.body_text()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::pagination::PageParams;
    use axum::http::Request as HttpRequest;

    async fn extract(uri: &str) -> Result<QueryParams<PageParams>, AppError> {
        let (mut parts, _) = HttpRequest::builder().uri(uri).body(()).unwrap().into_parts();
        QueryParams::<PageParams>::from_request_parts(&mut parts, &()).await
    }

    #[tokio::test]
    async fn bad_page_number_is_an_enveloped_validation_error() {
        let err = extract("/api/projet/?page=abc").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert_eq!(err.code(), "validation_error");
    }

    #[tokio::test]
    async fn valid_query_is_passed_through() {
        let QueryParams(params) = extract("/api/projet/?page=2&page_size=5").await.unwrap();
        assert_eq!(params.page, Some(2));
        assert_eq!(params.page_size, Some(5));
    }
}
