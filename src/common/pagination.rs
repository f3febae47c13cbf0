// src/common/pagination.rs

use axum::http::Uri;
use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

// Query string aceita nas listagens: ?page=2&page_size=20 (ou per_page)
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PageParams {
    /// Página pedida, começando em 1
    pub page: Option<u32>,
    /// Itens por página (máximo 100)
    #[serde(alias = "per_page")]
    pub page_size: Option<u32>,
}

/// Página já normalizada: nunca zero, nunca acima do teto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub size: u32,
}

impl PageRequest {
    pub fn offset(&self) -> i64 {
        i64::from(self.page - 1) * i64::from(self.size)
    }

    pub fn limit(&self) -> i64 {
        i64::from(self.size)
    }
}

impl From<&PageParams> for PageRequest {
    fn from(params: &PageParams) -> Self {
        let size = params
            .page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = params.page.unwrap_or(1).max(1);
        Self { page, size }
    }
}

pub fn total_pages(count: i64, size: u32) -> u32 {
    let size = i64::from(size.max(1));
    let pages = (count.max(0) + size - 1) / size;
    u32::try_from(pages).unwrap_or(u32::MAX).max(1)
}

// Envelope das listagens paginadas.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub success: bool,
    pub message: String,
    pub count: i64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub current_page: u32,
    pub total_pages: u32,
    pub data: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new(request: PageRequest, count: i64, data: Vec<T>, uri: &Uri) -> Self {
        let total_pages = total_pages(count, request.size);

        let next = (request.page < total_pages).then(|| page_link(uri, request.page + 1, request.size));
        let previous = (request.page > 1)
            .then(|| page_link(uri, (request.page - 1).min(total_pages), request.size));

        Self {
            success: true,
            message: "Dados recuperados com sucesso".to_string(),
            count,
            next,
            previous,
            current_page: request.page,
            total_pages,
            data,
        }
    }
}

// Mantém os outros filtros da query (ex.: search) e troca só a paginação.
fn page_link(uri: &Uri, page: u32, size: u32) -> String {
    let mut pairs: Vec<&str> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or("");
            !pair.is_empty() && !matches!(key, "page" | "page_size" | "per_page")
        })
        .collect();

    let paging = format!("page={}&page_size={}", page, size);
    pairs.push(&paging);

    format!("{}?{}", uri.path(), pairs.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(page: Option<u32>, page_size: Option<u32>) -> PageRequest {
        PageRequest::from(&PageParams { page, page_size })
    }

    #[test]
    fn defaults_to_first_page_of_ten() {
        assert_eq!(request(None, None), PageRequest { page: 1, size: 10 });
    }

    #[test]
    fn page_size_is_clamped() {
        assert_eq!(request(Some(1), Some(500)).size, MAX_PAGE_SIZE);
        assert_eq!(request(Some(0), Some(0)), PageRequest { page: 1, size: 1 });
    }

    #[test]
    fn per_page_is_accepted_as_alias() {
        let params: PageParams = serde_json::from_str(r#"{"page": 3, "per_page": 25}"#).unwrap();
        assert_eq!(PageRequest::from(&params), PageRequest { page: 3, size: 25 });
    }

    #[test]
    fn total_pages_is_never_zero() {
        assert_eq!(total_pages(0, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }

    #[test]
    fn page_beyond_the_last_is_empty_with_real_totals() {
        let uri: Uri = "/api/projet/?page=9".parse().unwrap();
        let page: Paginated<u8> = Paginated::new(request(Some(9), None), 25, vec![], &uri);

        assert!(page.data.is_empty());
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.current_page, 9);
        assert_eq!(page.next, None);
        assert_eq!(page.previous.as_deref(), Some("/api/projet/?page=3&page_size=10"));
    }

    #[test]
    fn links_keep_other_filters() {
        let uri: Uri = "/api/users/?search=ana&per_page=5&page=1".parse().unwrap();
        let page: Paginated<u8> = Paginated::new(request(Some(1), Some(5)), 12, vec![1, 2, 3, 4, 5], &uri);

        assert_eq!(page.next.as_deref(), Some("/api/users/?search=ana&page=2&page_size=5"));
        assert_eq!(page.previous, None);
    }
}
