// /////////////////////////////////////////////////////////////////////////////
// Manual Bridge
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Application services: the bridge pipeline itself, and the background
//! loops `main` spawns alongside the HTTP server.

pub mod bridge_service;
pub mod monitoring_loops;
