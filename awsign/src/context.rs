// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use awsign_command_execute_tokio::TokioCommandExecute;
use awsign_core::{Context, OsEnv};
use awsign_file_read_tokio::TokioFileRead;
use awsign_http_send_reqwest::ReqwestHttpSend;

/// Create a context for the current process.
///
/// Files are read and credential processes are run with tokio. Requests
/// are sent with a fresh [`reqwest::Client`] and environment variables
/// come from the OS.
pub fn default_context() -> Context {
    Context::new()
        .with_file_read(TokioFileRead)
        .with_command_execute(TokioCommandExecute)
        .with_http_send(ReqwestHttpSend::default())
        .with_env(OsEnv)
}

/// Like [`default_context`] but sending through the given client.
pub fn default_context_with_client(client: reqwest::Client) -> Context {
    default_context().with_http_send(ReqwestHttpSend::new(client))
}
