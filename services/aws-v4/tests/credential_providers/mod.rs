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

mod env;
mod preference;
mod process;
mod profile;

use awsign_core::time::{parse_rfc3339, FixedClock};
use awsign_core::{Context, StaticEnv};
use awsign_file_read_tokio::TokioFileRead;
use std::collections::HashMap;
use std::io::Write;
use tempfile::NamedTempFile;

/// A context that only sees `envs`, reads real files and has a fixed clock.
pub fn create_test_context_with_env(envs: &[(&str, &str)]) -> Context {
    let _ = env_logger::builder().is_test(true).try_init();

    Context::new()
        .with_file_read(TokioFileRead)
        .with_clock(FixedClock(
            parse_rfc3339("2015-08-30T12:36:00Z").expect("time must be valid"),
        ))
        .with_env(StaticEnv {
            home_dir: None,
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        })
}

pub fn write_file(content: &str) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("tempfile must be created");
    f.write_all(content.as_bytes())
        .expect("tempfile must be written");
    f
}

pub fn path_of(f: &NamedTempFile) -> String {
    f.path().to_string_lossy().to_string()
}
