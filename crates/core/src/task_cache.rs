// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task cache identities and the identifier bookkeeping rows needed to
//! recover a task identifier from a stored owner.

use crate::id::{JobId, PipelineId};
use serde::{Deserialize, Serialize};

/// A logical task cache: one cached path of one step of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskCache {
    pub id: i32,
    pub job_id: JobId,
    pub step_name: String,
    pub path: String,
}

/// A task cache pinned to one worker. Volumes are worker-local, so the
/// association key always goes through this row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerTaskCache {
    pub id: i32,
    pub worker_name: String,
    pub task_cache_id: i32,
}

/// Where a task cache volume came from, recovered from its stored owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskIdentifier {
    pub pipeline_id: PipelineId,
    pub pipeline_ref: String,
    pub job_name: String,
    pub step_name: String,
}

/// Pipeline bookkeeping row. Supplied by the pipeline collaborator;
/// identifiers only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub id: PipelineId,
    pub name: String,
}

/// Job bookkeeping row. Supplied by the pipeline collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub name: String,
    pub pipeline_id: PipelineId,
}
