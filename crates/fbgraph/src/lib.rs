//! fbgraph - Facebook Graph API client
//!
//! Single chokepoint for every vendor HTTP call made by the tool server:
//!
//! - **Gateway** ([`GraphClient`]): URL assembly (`{host}/{version}{path}`),
//!   credential injection, vendor error-envelope extraction, and a
//!   test-mode guardrail that refuses to touch production hosts.
//! - **Batch** ([`batch`]): up to 50 logical sub-requests packed into one
//!   physical call, unpacked positionally with per-item status.
//! - **Video** ([`video`]): three-phase resumable upload with
//!   offset-desync recovery and encoding-ready polling.
//!
//! Responses are passed through as raw bytes; nothing here reshapes
//! vendor payloads.

pub mod batch;
pub mod client;
pub mod video;

pub use batch::{execute_batch, BatchBuilder, BatchHeader, BatchItem, BatchResult, MAX_BATCH_SIZE};
pub use client::{
    ApiError, GraphClient, GraphError, ACCESS_TOKEN_ENV, API_VERSION, GRAPH_HOST, TESTING_ENV,
    VIDEO_HOST,
};
pub use video::{UploadOptions, UploadOutcome, VideoUploader};
