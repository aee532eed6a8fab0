// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod agent;
mod common;
mod mapping;
mod rpc;
