// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker and base-resource-type registry rows.
//!
//! Mutated only by the worker reconciliation collaborator; read by cache
//! chain resolution and invalidation. A `WorkerBaseResourceType` row id is
//! the invalidation token: re-registration that changes or drops a type
//! retires the id, and every association recorded against it goes invalid.

use serde::{Deserialize, Serialize};

/// A registered worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worker {
    pub name: String,
}

/// One base resource type advertised by one worker at one version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerBaseResourceType {
    pub id: i32,
    pub worker_name: String,
    pub name: String,
    pub version: String,
}
