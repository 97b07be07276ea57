// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};
use stowage_core::BuildId;

/// A build artifact registered against a worker volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerArtifact {
    pub id: i32,
    pub name: String,
    pub build_id: BuildId,
    pub created_at_ms: u64,
}
