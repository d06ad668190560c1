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

use async_trait::async_trait;
use awsign_core::time::{parse_rfc3339, FixedClock};
use awsign_core::{CommandExecute, CommandOutput, Context, Error, HttpSend, Result, StaticEnv};
use awsign_file_read_tokio::TokioFileRead;
use bytes::Bytes;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const TEST_NOW: &str = "2024-05-01T00:00:00Z";

/// A context that only sees `envs`, reads real files and is frozen at [`TEST_NOW`].
pub fn test_context(envs: &[(&str, &str)]) -> Context {
    test_context_with_home(None, envs)
}

pub fn test_context_with_home(home_dir: Option<PathBuf>, envs: &[(&str, &str)]) -> Context {
    let _ = env_logger::builder().is_test(true).try_init();
    Context::new()
        .with_file_read(TokioFileRead)
        .with_clock(FixedClock(parse_rfc3339(TEST_NOW).expect("time must be valid")))
        .with_env(StaticEnv {
            home_dir,
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        })
}

/// Request as seen by [`ScriptedHttpSend`].
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub method: http::Method,
    pub uri: http::Uri,
    pub headers: http::HeaderMap,
}

/// Answers by authority, or by authority plus path, and remembers every request.
///
/// When several routes match, the one added last wins. Requests without a
/// route fail like an unreachable host.
#[derive(Debug, Clone, Default)]
pub struct ScriptedHttpSend {
    routes: Arc<Vec<(String, u16, String)>>,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
}

impl ScriptedHttpSend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, target: &str, status: u16, body: &str) -> Self {
        Arc::make_mut(&mut self.routes).push((target.to_string(), status, body.to_string()));
        self
    }

    pub fn seen(&self) -> Vec<SeenRequest> {
        self.seen.lock().expect("lock must not be poisoned").clone()
    }
}

#[async_trait]
impl HttpSend for ScriptedHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let authority = req
            .uri()
            .authority()
            .map(|v| v.to_string())
            .unwrap_or_default();
        let target = format!("{authority}{}", req.uri().path());
        self.seen
            .lock()
            .expect("lock must not be poisoned")
            .push(SeenRequest {
                method: req.method().clone(),
                uri: req.uri().clone(),
                headers: req.headers().clone(),
            });

        let Some((_, status, body)) = self
            .routes
            .iter()
            .rev()
            .find(|(t, _, _)| *t == target || *t == authority)
        else {
            return Err(Error::transport(format!("connection refused: {target}")));
        };
        Ok(http::Response::builder()
            .status(*status)
            .body(Bytes::from(body.clone()))
            .expect("response must be valid"))
    }
}

/// Replays one output and records the command line.
#[derive(Debug, Clone, Default)]
pub struct ScriptedCommand {
    output: CommandOutput,
    seen: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedCommand {
    pub fn new(status: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            output: CommandOutput {
                status,
                stdout: stdout.as_bytes().to_vec(),
                stderr: stderr.as_bytes().to_vec(),
            },
            seen: Arc::default(),
        }
    }

    pub fn seen(&self) -> Vec<Vec<String>> {
        self.seen.lock().expect("lock must not be poisoned").clone()
    }
}

#[async_trait]
impl CommandExecute for ScriptedCommand {
    async fn command_execute(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut line = vec![program.to_string()];
        line.extend(args.iter().map(|v| v.to_string()));
        self.seen
            .lock()
            .expect("lock must not be poisoned")
            .push(line);
        Ok(self.output.clone())
    }
}
