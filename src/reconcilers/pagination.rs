// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Pagination for Kubernetes API list operations.
//!
//! The discovery snapshot promises every list runs to completion — cluster
//! nodes, spot-recommendation events, owned upgrade resources — so a list
//! that cannot complete must fail loudly rather than hang a reconcile or
//! silently truncate. This module pages with a bounded page budget and
//! treats a repeated or empty continue token as the end conditions they
//! actually signal.

use crate::constants::KUBE_LIST_PAGE_SIZE;
use anyhow::{bail, Result};
use kube::{api::ListParams, Api, Resource};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use tracing::debug;

/// Upper bound on pages per list. At the configured page size this allows
/// half a million objects; past that the API is looping, not listing.
pub const MAX_LIST_PAGES: u32 = 1_000;

/// Normalize a continue token: the API sometimes reports the final page
/// with `Some("")` instead of `None`.
#[must_use]
pub fn continuation(token: Option<String>) -> Option<String> {
    token.filter(|token| !token.is_empty())
}

/// List all resources, paginated to completion.
///
/// Every list the reconcile snapshot depends on goes through here. Pages
/// are fetched at [`KUBE_LIST_PAGE_SIZE`] until the server stops handing
/// out continue tokens; a token the server repeats, or a page budget
/// overrun, aborts the reconcile instead of spinning.
///
/// # Arguments
///
/// * `api` - Kubernetes API client for the resource type
/// * `list_params` - Base list parameters (labels, fields, etc.)
///
/// # Example
///
/// ```no_run
/// use kube::{Api, Client, api::ListParams};
/// use k8s_openapi::api::core::v1::Node;
/// use instance_manager::reconcilers::pagination::list_all_paginated;
///
/// # async fn example() -> anyhow::Result<()> {
/// let client = Client::try_default().await?;
/// let api: Api<Node> = Api::all(client);
///
/// let nodes = list_all_paginated(&api, ListParams::default()).await?;
/// println!("Found {} nodes", nodes.len());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if a page fetch fails, if the server repeats a
/// continue token, or if the page budget is exhausted.
pub async fn list_all_paginated<K>(api: &Api<K>, mut list_params: ListParams) -> Result<Vec<K>>
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug,
    K::DynamicType: Default,
{
    list_params.limit = Some(KUBE_LIST_PAGE_SIZE);

    let mut items = Vec::new();
    let mut previous_token: Option<String> = None;

    for page in 1..=MAX_LIST_PAGES {
        let list = api.list(&list_params).await?;
        let items_in_page = list.items.len();
        items.extend(list.items);

        debug!(
            page,
            items_in_page,
            total_items = items.len(),
            "Fetched list page"
        );

        let Some(token) = continuation(list.metadata.continue_) else {
            debug!(total_pages = page, total_items = items.len(), "List complete");
            return Ok(items);
        };

        if previous_token.as_deref() == Some(token.as_str()) {
            bail!("list repeated continue token after page {page}; aborting instead of looping");
        }
        previous_token = Some(token.clone());
        list_params.continue_token = Some(token);
    }

    bail!("list did not complete within {MAX_LIST_PAGES} pages")
}

#[cfg(test)]
#[path = "pagination_tests.rs"]
mod pagination_tests;
