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

use super::{compare_with_aws_sigv4, get_request, sign_with_awsign, test_cases};
use anyhow::Result;
use awsign_core::time::now;
use awsign_core::ErrorKind;
use std::time::Duration;

#[tokio::test]
async fn test_presign() -> Result<()> {
    for (name, req) in test_cases() {
        compare_with_aws_sigv4(name, req, None, Some(Duration::from_secs(3600))).await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_presign_with_session_token() -> Result<()> {
    for (name, req) in test_cases() {
        compare_with_aws_sigv4(
            name,
            req,
            Some("security_token"),
            Some(Duration::from_secs(3600)),
        )
        .await?;
    }
    Ok(())
}

#[tokio::test]
async fn test_presign_expiry_over_seven_days() {
    let err = sign_with_awsign(
        get_request(),
        None,
        Some(Duration::from_secs(7 * 24 * 3600 + 1)),
        now(),
    )
    .await
    .expect_err("must fail");
    let err = err
        .downcast::<awsign_core::Error>()
        .expect("must be an awsign error");
    assert_eq!(err.kind(), ErrorKind::RequestInvalid);
}
