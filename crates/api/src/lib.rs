// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mush-api: the remote queue client the job loop and link registration
//! depend on (§6).
//!
//! `RunnerApi` is the trait; [`http::HttpRunnerApi`] is the production
//! `reqwest` client; [`fake::FakeRunnerApi`] (behind the `test-support`
//! feature) is a scripted in-memory double for engine-crate tests.

pub mod error;
pub mod http;
pub mod runner_api;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

pub use error::ApiError;
pub use http::HttpRunnerApi;
pub use runner_api::RunnerApi;
pub use types::{
    ClientMetadata, CompleteJobRequest, LinkDeregisterRequest, LinkRegisterRequest,
    LinkRegisterResponse,
};

#[cfg(any(test, feature = "test-support"))]
pub use fake::{ApiCall, FakeRunnerApi};
