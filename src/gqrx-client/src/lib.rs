// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Async client for the Gqrx remote-control protocol.

pub mod client;
pub mod connection;
pub mod endpoint;

pub use client::GqrxClient;
pub use connection::{Connection, ConnectionOptions, CONNECT_TIMEOUT, IO_TIMEOUT};
pub use endpoint::{parse_endpoint, Endpoint};
pub use gqrx_core::{ConnectionState, GqrxError, GqrxResult, DEMOD_MODES};
