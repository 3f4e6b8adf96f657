//! Server-sent events transport for ACL change notifications.
//!
//! `GET /acl/events?resource=a&resource=b` opens one subscription covering
//! every listed resource. Each committed change arrives as
//!
//! ```text
//! event: ACLModified
//! id: 0-3
//! data: a
//! ```
//!
//! The id is the audit id of the change. Nothing is replayed on reconnect;
//! clients re-fetch `/acl/{id}` instead. Closing the connection drops the
//! subscription.

use std::convert::Infallible;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use fabryk_acl::{AclEvent, Error as AclError};
use fabryk_core::ResourceId;
use futures::{Stream, StreamExt};

use crate::caller::CurrentCaller;
use crate::error::{Error, Result};
use crate::routes::parse_id;
use crate::state::AppState;

/// Handler for `GET /acl/events`.
pub async fn events(
    State(state): State<AppState>,
    CurrentCaller(caller): CurrentCaller,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    let mut resources: Vec<ResourceId> = Vec::new();
    for (key, value) in pairs {
        if key == "resource" {
            let id = parse_id(&value)?;
            if !resources.contains(&id) {
                resources.push(id);
            }
        }
    }
    if resources.is_empty() {
        return Err(Error::bad_request("at least one resource parameter is required"));
    }

    for resource in &resources {
        state.session.authorize(&caller, resource).await?;
        if !state.service().contains(resource) {
            return Err(AclError::ResourceNotFound {
                id: resource.clone(),
            }
            .into());
        }
    }

    log::debug!(
        "{} subscribed to {} resource(s)",
        caller.principal(),
        resources.len()
    );
    let subscription = state.service().notifier().subscribe_many(resources);
    let stream = subscription.map(|event| Ok(to_sse(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive)))
}

fn to_sse(event: &AclEvent) -> Event {
    let sse = Event::default()
        .event(event.kind.as_str())
        .data(event.resource.as_str());
    match event.id {
        Some(id) => sse.id(id.to_string()),
        None => sse,
    }
}
