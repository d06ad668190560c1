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

use super::{compare_with_aws_sigv4, test_cases};
use anyhow::Result;

#[tokio::test]
async fn test_sign_in_headers() -> Result<()> {
    for (name, req) in test_cases() {
        compare_with_aws_sigv4(name, req, None, None).await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_sign_in_headers_with_session_token() -> Result<()> {
    for (name, req) in test_cases() {
        compare_with_aws_sigv4(name, req, Some("security_token"), None).await?;
    }
    Ok(())
}
