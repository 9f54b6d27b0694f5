//! Success envelopes. Errors use [`crate::error::ErrorResponse`].

use crate::api::respond;
use crate::sql::Pagination;
use axum::{http::StatusCode, response::Response};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct SuccessOne<T> {
    pub data: T,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SuccessMany<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct PageMeta {
    pub count: u64,
    pub page: u32,
    pub per_page: u32,
}

pub fn success_one<T: Serialize>(status: StatusCode, data: T) -> Response {
    respond(status, SuccessOne { data })
}

pub fn success_many<T: Serialize>(data: Vec<T>, page: &Pagination) -> Response {
    let meta = PageMeta {
        count: data.len() as u64,
        page: page.page(),
        per_page: page.limit(),
    };
    respond(StatusCode::OK, SuccessMany { data, meta })
}
