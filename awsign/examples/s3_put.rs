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

use awsign::auth_scheme::{AuthSchemeId, AuthSchemeOption};
use awsign::checksum::ChecksumAlgorithm;
use awsign::{default_orchestrator, Operation, Result, SigningProperties};
use bytes::Bytes;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let bucket = std::env::var("AWSIGN_S3_BUCKET").unwrap_or_else(|_| "my-bucket".to_string());
    let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());

    let orchestrator = default_orchestrator("s3", &region);

    let req = http::Request::put(format!(
        "https://{bucket}.s3.{region}.amazonaws.com/awsign/hello.txt"
    ))
    .body(Bytes::from_static(b"Hello, World!"))?;
    let op = Operation::new(
        req,
        vec![
            AuthSchemeOption::new(AuthSchemeId::SIGV4A, SigningProperties::s3(&region)),
            AuthSchemeOption::new(AuthSchemeId::SIGV4, SigningProperties::s3(&region)),
        ],
    )
    .with_checksums([ChecksumAlgorithm::Crc32]);

    let resp = orchestrator.execute(op).await?;
    println!("Response status: {}", resp.status());

    awsign::aws::shutdown().await;
    Ok(())
}
